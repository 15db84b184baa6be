//! Host graphics API seam.
//!
//! The translator never calls the host driver directly; every entry point it needs is a
//! method on [`GlApi`]. Production code drives [`GlEntryPoints`] (function pointers
//! resolved through the platform), tests drive the software host in [`crate::soft`].

pub mod consts;
mod loader;

pub use loader::{GlEntryPoints, REQUIRED_ENTRY_POINTS};

pub type GLenum = u32;
pub type GLbitfield = u32;
pub type GLuint = u32;
pub type GLint = i32;
pub type GLsizei = i32;
pub type GLfloat = f32;
pub type GLdouble = f64;

/// Entry points a conforming 3.0 driver may still lack; their absence degrades one
/// capability instead of failing power-on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OptionalEntryPoint {
    DrawInstanced,
    DrawBaseVertex,
    VertexAttribDivisor,
    StencilSeparate,
    BlendSeparate,
    ColorMaskIndexed,
    PointParameters,
    FogCoord,
    SecondaryColor,
}

impl OptionalEntryPoint {
    pub const ALL: [OptionalEntryPoint; 9] = [
        Self::DrawInstanced,
        Self::DrawBaseVertex,
        Self::VertexAttribDivisor,
        Self::StencilSeparate,
        Self::BlendSeparate,
        Self::ColorMaskIndexed,
        Self::PointParameters,
        Self::FogCoord,
        Self::SecondaryColor,
    ];
}

/// Width/height/depth of a texture image; depth is 1 for everything but 3D targets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Extent {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Extent {
    pub const fn new(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }
}

/// Texel offset of a sub-image update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Offset3 {
    pub x: u32,
    pub y: u32,
    pub z: u32,
}

impl Offset3 {
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }
}

/// Half-open source or destination rectangle of `glBlitFramebuffer`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlitRect {
    pub x0: i32,
    pub y0: i32,
    pub x1: i32,
    pub y1: i32,
}

/// Every host entry point the translator uses.
///
/// Object names are plain `u32`s like in the C API. Data pointers become slices; vertex
/// and index "pointers" are always byte offsets into the currently bound buffer object.
pub trait GlApi {
    fn supports(&self, entry_point: OptionalEntryPoint) -> bool;

    fn get_error(&mut self) -> GLenum;
    fn get_string(&mut self, name: GLenum) -> Option<String>;
    fn get_string_i(&mut self, name: GLenum, index: u32) -> Option<String>;
    fn get_integer_v(&mut self, pname: GLenum, out: &mut [GLint]);
    fn get_float_v(&mut self, pname: GLenum, out: &mut [GLfloat]);

    fn get_integer(&mut self, pname: GLenum) -> GLint {
        let mut v = [0];
        self.get_integer_v(pname, &mut v);
        v[0]
    }

    fn get_float(&mut self, pname: GLenum) -> GLfloat {
        let mut v = [0.0];
        self.get_float_v(pname, &mut v);
        v[0]
    }

    fn enable(&mut self, cap: GLenum);
    fn disable(&mut self, cap: GLenum);
    fn is_enabled(&mut self, cap: GLenum) -> bool;

    fn set_enabled(&mut self, cap: GLenum, on: bool) {
        if on {
            self.enable(cap);
        } else {
            self.disable(cap);
        }
    }

    fn flush(&mut self);
    fn finish(&mut self);

    // Textures.
    fn gen_texture(&mut self) -> GLuint;
    fn delete_texture(&mut self, name: GLuint);
    fn active_texture(&mut self, unit: GLenum);
    fn bind_texture(&mut self, target: GLenum, name: GLuint);
    fn tex_parameter_i(&mut self, target: GLenum, pname: GLenum, param: GLint);
    fn tex_parameter_f(&mut self, target: GLenum, pname: GLenum, param: GLfloat);
    fn tex_parameter_fv(&mut self, target: GLenum, pname: GLenum, params: &[GLfloat; 4]);
    #[allow(clippy::too_many_arguments)]
    fn tex_image(
        &mut self,
        target: GLenum,
        level: u32,
        internal_format: GLenum,
        extent: Extent,
        format: GLenum,
        ty: GLenum,
        data: Option<&[u8]>,
    );
    #[allow(clippy::too_many_arguments)]
    fn tex_sub_image(
        &mut self,
        target: GLenum,
        level: u32,
        offset: Offset3,
        extent: Extent,
        format: GLenum,
        ty: GLenum,
        data: &[u8],
    );
    fn compressed_tex_image(
        &mut self,
        target: GLenum,
        level: u32,
        internal_format: GLenum,
        extent: Extent,
        data: &[u8],
    );
    fn get_tex_image(
        &mut self,
        target: GLenum,
        level: u32,
        format: GLenum,
        ty: GLenum,
        out: &mut [u8],
    );
    fn get_compressed_tex_image(&mut self, target: GLenum, level: u32, out: &mut [u8]);
    fn generate_mipmap(&mut self, target: GLenum);
    fn pixel_store_i(&mut self, pname: GLenum, param: GLint);
    fn tex_env_i(&mut self, target: GLenum, pname: GLenum, param: GLint);
    fn tex_env_fv(&mut self, target: GLenum, pname: GLenum, params: &[GLfloat; 4]);
    fn tex_gen_i(&mut self, coord: GLenum, pname: GLenum, param: GLint);

    // Buffers.
    fn gen_buffer(&mut self) -> GLuint;
    fn delete_buffer(&mut self, name: GLuint);
    fn bind_buffer(&mut self, target: GLenum, name: GLuint);
    fn buffer_data(&mut self, target: GLenum, size: usize, data: Option<&[u8]>, usage: GLenum);
    fn buffer_sub_data(&mut self, target: GLenum, offset: usize, data: &[u8]);
    fn get_buffer_sub_data(&mut self, target: GLenum, offset: usize, out: &mut [u8]);

    // Renderbuffers and framebuffers.
    fn gen_renderbuffer(&mut self) -> GLuint;
    fn delete_renderbuffer(&mut self, name: GLuint);
    fn bind_renderbuffer(&mut self, name: GLuint);
    fn renderbuffer_storage(&mut self, internal_format: GLenum, width: u32, height: u32);
    fn gen_framebuffer(&mut self) -> GLuint;
    fn delete_framebuffer(&mut self, name: GLuint);
    fn bind_framebuffer(&mut self, target: GLenum, name: GLuint);
    /// Attaches a texture image; `layer` selects the slice of a 3D texture and is
    /// ignored for 2D targets and cube faces.
    fn framebuffer_texture(
        &mut self,
        target: GLenum,
        attachment: GLenum,
        tex_target: GLenum,
        texture: GLuint,
        level: u32,
        layer: u32,
    );
    fn framebuffer_renderbuffer(&mut self, target: GLenum, attachment: GLenum, rb: GLuint);
    fn check_framebuffer_status(&mut self, target: GLenum) -> GLenum;
    fn draw_buffers(&mut self, buffers: &[GLenum]);
    fn read_buffer(&mut self, mode: GLenum);
    fn blit_framebuffer(&mut self, src: BlitRect, dst: BlitRect, mask: GLbitfield, filter: GLenum);
    #[allow(clippy::too_many_arguments)]
    fn read_pixels(
        &mut self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        format: GLenum,
        ty: GLenum,
        out: &mut [u8],
    );

    // Per-fragment state.
    fn blend_func(&mut self, src: GLenum, dst: GLenum);
    fn blend_func_separate(&mut self, src_rgb: GLenum, dst_rgb: GLenum, src_a: GLenum, dst_a: GLenum);
    fn blend_equation(&mut self, mode: GLenum);
    fn blend_equation_separate(&mut self, mode_rgb: GLenum, mode_alpha: GLenum);
    fn blend_color(&mut self, rgba: [GLfloat; 4]);
    fn depth_func(&mut self, func: GLenum);
    fn depth_mask(&mut self, on: bool);
    fn depth_range(&mut self, near: GLdouble, far: GLdouble);
    fn stencil_func(&mut self, func: GLenum, reference: GLint, mask: GLuint);
    fn stencil_func_separate(&mut self, face: GLenum, func: GLenum, reference: GLint, mask: GLuint);
    fn stencil_op(&mut self, sfail: GLenum, dpfail: GLenum, dppass: GLenum);
    fn stencil_op_separate(&mut self, face: GLenum, sfail: GLenum, dpfail: GLenum, dppass: GLenum);
    fn stencil_mask(&mut self, mask: GLuint);
    fn alpha_func(&mut self, func: GLenum, reference: GLfloat);
    fn color_mask(&mut self, mask: [bool; 4]);
    fn color_mask_i(&mut self, index: u32, mask: [bool; 4]);

    // Rasterisation.
    fn cull_face(&mut self, mode: GLenum);
    fn front_face(&mut self, mode: GLenum);
    fn polygon_mode(&mut self, face: GLenum, mode: GLenum);
    fn shade_model(&mut self, mode: GLenum);
    fn polygon_offset(&mut self, factor: GLfloat, units: GLfloat);
    fn point_size(&mut self, size: GLfloat);
    fn point_parameter_f(&mut self, pname: GLenum, value: GLfloat);
    fn point_parameter_fv(&mut self, pname: GLenum, values: &[GLfloat; 3]);
    fn line_width(&mut self, width: GLfloat);
    fn line_stipple(&mut self, factor: GLint, pattern: u16);
    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32);
    fn scissor(&mut self, x: i32, y: i32, width: u32, height: u32);

    // Fog and lighting model.
    fn fog_i(&mut self, pname: GLenum, value: GLint);
    fn fog_f(&mut self, pname: GLenum, value: GLfloat);
    fn fog_fv(&mut self, pname: GLenum, values: &[GLfloat; 4]);
    fn light_model_i(&mut self, pname: GLenum, value: GLint);
    fn light_model_fv(&mut self, pname: GLenum, values: &[GLfloat; 4]);

    fn clear_color(&mut self, rgba: [GLfloat; 4]);
    fn clear_depth(&mut self, depth: GLdouble);
    fn clear_stencil(&mut self, s: GLint);
    fn clear(&mut self, mask: GLbitfield);

    // Fixed-function transform and lighting.
    fn matrix_mode(&mut self, mode: GLenum);
    fn load_matrix(&mut self, m: &[GLfloat; 16]);
    fn load_identity(&mut self);
    fn push_matrix(&mut self);
    fn pop_matrix(&mut self);
    fn light_fv(&mut self, light: GLenum, pname: GLenum, values: &[GLfloat]);
    fn light_f(&mut self, light: GLenum, pname: GLenum, value: GLfloat);
    fn material_fv(&mut self, face: GLenum, pname: GLenum, values: &[GLfloat]);
    fn material_f(&mut self, face: GLenum, pname: GLenum, value: GLfloat);
    fn color_material(&mut self, face: GLenum, mode: GLenum);
    fn clip_plane(&mut self, plane: GLenum, equation: &[GLdouble; 4]);

    // Fixed-function client arrays.
    fn enable_client_state(&mut self, array: GLenum);
    fn disable_client_state(&mut self, array: GLenum);
    fn client_active_texture(&mut self, unit: GLenum);
    fn vertex_pointer(&mut self, size: i32, ty: GLenum, stride: u32, offset: usize);
    fn normal_pointer(&mut self, ty: GLenum, stride: u32, offset: usize);
    fn color_pointer(&mut self, size: i32, ty: GLenum, stride: u32, offset: usize);
    fn secondary_color_pointer(&mut self, size: i32, ty: GLenum, stride: u32, offset: usize);
    fn tex_coord_pointer(&mut self, size: i32, ty: GLenum, stride: u32, offset: usize);
    fn fog_coord_pointer(&mut self, ty: GLenum, stride: u32, offset: usize);

    // Generic attributes.
    fn enable_vertex_attrib_array(&mut self, index: u32);
    fn disable_vertex_attrib_array(&mut self, index: u32);
    #[allow(clippy::too_many_arguments)]
    fn vertex_attrib_pointer(
        &mut self,
        index: u32,
        size: i32,
        ty: GLenum,
        normalized: bool,
        stride: u32,
        offset: usize,
    );
    fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32);

    // Current (constant) attribute values.
    fn vertex_attrib_4fv(&mut self, index: u32, v: &[GLfloat; 4]);
    fn color_4fv(&mut self, v: &[GLfloat; 4]);
    fn secondary_color_3fv(&mut self, v: &[GLfloat; 3]);
    fn normal_3fv(&mut self, v: &[GLfloat; 3]);
    fn multi_tex_coord_4fv(&mut self, unit: GLenum, v: &[GLfloat; 4]);
    fn fog_coord_f(&mut self, v: GLfloat);

    // Draws.
    fn draw_arrays(&mut self, mode: GLenum, first: i32, count: u32);
    fn draw_arrays_instanced(&mut self, mode: GLenum, first: i32, count: u32, instances: u32);
    fn draw_elements(&mut self, mode: GLenum, count: u32, ty: GLenum, offset: usize);
    fn draw_elements_instanced(
        &mut self,
        mode: GLenum,
        count: u32,
        ty: GLenum,
        offset: usize,
        instances: u32,
    );
    fn draw_elements_base_vertex(
        &mut self,
        mode: GLenum,
        count: u32,
        ty: GLenum,
        offset: usize,
        base_vertex: i32,
    );
    #[allow(clippy::too_many_arguments)]
    fn draw_elements_instanced_base_vertex(
        &mut self,
        mode: GLenum,
        count: u32,
        ty: GLenum,
        offset: usize,
        instances: u32,
        base_vertex: i32,
    );

    // Queries.
    fn gen_query(&mut self) -> GLuint;
    fn delete_query(&mut self, name: GLuint);
    fn begin_query(&mut self, target: GLenum, name: GLuint);
    fn end_query(&mut self, target: GLenum);
    fn get_query_object_u32(&mut self, name: GLuint, pname: GLenum) -> u32;
}

/// Symbolic name of a `glGetError` value.
pub fn error_name(err: GLenum) -> &'static str {
    match err {
        consts::NO_ERROR => "GL_NO_ERROR",
        consts::INVALID_ENUM => "GL_INVALID_ENUM",
        consts::INVALID_VALUE => "GL_INVALID_VALUE",
        consts::INVALID_OPERATION => "GL_INVALID_OPERATION",
        consts::STACK_OVERFLOW => "GL_STACK_OVERFLOW",
        consts::STACK_UNDERFLOW => "GL_STACK_UNDERFLOW",
        consts::OUT_OF_MEMORY => "GL_OUT_OF_MEMORY",
        consts::INVALID_FRAMEBUFFER_OPERATION => "GL_INVALID_FRAMEBUFFER_OPERATION",
        _ => "GL_UNKNOWN_ERROR",
    }
}

/// Drains the host error queue, logging each error against `op`. Returns the first one.
///
/// Drivers may queue several flags; the loop is bounded because a lost context can
/// report the same error forever.
pub fn drain_errors(gl: &mut dyn GlApi, op: &str) -> Option<GLenum> {
    let mut first = None;
    for _ in 0..16 {
        let err = gl.get_error();
        if err == consts::NO_ERROR {
            break;
        }
        tracing::warn!(op, error = error_name(err), code = err, "host GL error");
        first.get_or_insert(err);
    }
    first
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_names_cover_core_codes() {
        assert_eq!(error_name(consts::INVALID_ENUM), "GL_INVALID_ENUM");
        assert_eq!(error_name(consts::OUT_OF_MEMORY), "GL_OUT_OF_MEMORY");
        assert_eq!(error_name(0xdead), "GL_UNKNOWN_ERROR");
    }
}
