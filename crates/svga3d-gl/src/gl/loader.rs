//! Production [`GlApi`]: a table of driver entry points resolved once at power-on.

use core::ffi::{c_char, c_void};
use std::ffi::CStr;

use super::consts as gl;
use super::{
    BlitRect, Extent, GLbitfield, GLdouble, GLenum, GLfloat, GLint, GLsizei, GLuint, GlApi,
    Offset3, OptionalEntryPoint,
};
use crate::error::InitError;

type GLboolean = u8;
type GLsizeiptr = isize;
type GLintptr = isize;

fn gl_bool(b: bool) -> GLboolean {
    b as GLboolean
}

fn sz(v: u32) -> GLsizei {
    v.min(i32::MAX as u32) as GLsizei
}

fn ptr_of(data: Option<&[u8]>) -> *const c_void {
    data.map_or(core::ptr::null(), |d| d.as_ptr().cast())
}

fn offset_ptr(offset: usize) -> *const c_void {
    offset as *const c_void
}

macro_rules! entry_points {
    (
        required {
            $( $field:ident = $sym:literal : fn($($arg:ty),*) $(-> $ret:ty)?; )*
        }
        optional {
            $( $ofield:ident = [$($osym:literal),+] : fn($($oarg:ty),*) $(-> $oret:ty)?; )*
        }
    ) => {
        struct Fns {
            $( $field: unsafe extern "system" fn($($arg),*) $(-> $ret)?, )*
            $( $ofield: Option<unsafe extern "system" fn($($oarg),*) $(-> $oret)?>, )*
        }

        /// Entry points whose absence fails power-on.
        pub const REQUIRED_ENTRY_POINTS: &[&str] = &[$($sym),*];

        impl Fns {
            fn resolve(lookup: &mut dyn FnMut(&str) -> *const c_void) -> Result<Self, InitError> {
                Ok(Self {
                    $(
                        $field: {
                            let p = lookup($sym);
                            if p.is_null() {
                                return Err(InitError::MissingEntryPoint($sym));
                            }
                            // SAFETY: the driver exports this symbol with the declared C signature.
                            unsafe {
                                core::mem::transmute::<*const c_void, unsafe extern "system" fn($($arg),*) $(-> $ret)?>(p)
                            }
                        },
                    )*
                    $(
                        $ofield: {
                            let mut found = None;
                            for name in [$($osym),+] {
                                let p = lookup(name);
                                if !p.is_null() {
                                    // SAFETY: as above; aliases share one signature.
                                    found = Some(unsafe {
                                        core::mem::transmute::<*const c_void, unsafe extern "system" fn($($oarg),*) $(-> $oret)?>(p)
                                    });
                                    break;
                                }
                            }
                            found
                        },
                    )*
                })
            }
        }
    };
}

entry_points! {
    required {
        get_error = "glGetError": fn() -> GLenum;
        get_string = "glGetString": fn(GLenum) -> *const u8;
        get_integer_v = "glGetIntegerv": fn(GLenum, *mut GLint);
        get_float_v = "glGetFloatv": fn(GLenum, *mut GLfloat);
        enable = "glEnable": fn(GLenum);
        disable = "glDisable": fn(GLenum);
        is_enabled = "glIsEnabled": fn(GLenum) -> GLboolean;
        flush = "glFlush": fn();
        finish = "glFinish": fn();

        gen_textures = "glGenTextures": fn(GLsizei, *mut GLuint);
        delete_textures = "glDeleteTextures": fn(GLsizei, *const GLuint);
        active_texture = "glActiveTexture": fn(GLenum);
        bind_texture = "glBindTexture": fn(GLenum, GLuint);
        tex_parameter_i = "glTexParameteri": fn(GLenum, GLenum, GLint);
        tex_parameter_f = "glTexParameterf": fn(GLenum, GLenum, GLfloat);
        tex_parameter_fv = "glTexParameterfv": fn(GLenum, GLenum, *const GLfloat);
        tex_image_2d = "glTexImage2D": fn(GLenum, GLint, GLint, GLsizei, GLsizei, GLint, GLenum, GLenum, *const c_void);
        tex_image_3d = "glTexImage3D": fn(GLenum, GLint, GLint, GLsizei, GLsizei, GLsizei, GLint, GLenum, GLenum, *const c_void);
        tex_sub_image_2d = "glTexSubImage2D": fn(GLenum, GLint, GLint, GLint, GLsizei, GLsizei, GLenum, GLenum, *const c_void);
        tex_sub_image_3d = "glTexSubImage3D": fn(GLenum, GLint, GLint, GLint, GLint, GLsizei, GLsizei, GLsizei, GLenum, GLenum, *const c_void);
        compressed_tex_image_2d = "glCompressedTexImage2D": fn(GLenum, GLint, GLenum, GLsizei, GLsizei, GLint, GLsizei, *const c_void);
        compressed_tex_image_3d = "glCompressedTexImage3D": fn(GLenum, GLint, GLenum, GLsizei, GLsizei, GLsizei, GLint, GLsizei, *const c_void);
        get_tex_image = "glGetTexImage": fn(GLenum, GLint, GLenum, GLenum, *mut c_void);
        get_compressed_tex_image = "glGetCompressedTexImage": fn(GLenum, GLint, *mut c_void);
        generate_mipmap = "glGenerateMipmap": fn(GLenum);
        pixel_store_i = "glPixelStorei": fn(GLenum, GLint);
        tex_env_i = "glTexEnvi": fn(GLenum, GLenum, GLint);
        tex_env_fv = "glTexEnvfv": fn(GLenum, GLenum, *const GLfloat);
        tex_gen_i = "glTexGeni": fn(GLenum, GLenum, GLint);

        gen_buffers = "glGenBuffers": fn(GLsizei, *mut GLuint);
        delete_buffers = "glDeleteBuffers": fn(GLsizei, *const GLuint);
        bind_buffer = "glBindBuffer": fn(GLenum, GLuint);
        buffer_data = "glBufferData": fn(GLenum, GLsizeiptr, *const c_void, GLenum);
        buffer_sub_data = "glBufferSubData": fn(GLenum, GLintptr, GLsizeiptr, *const c_void);
        get_buffer_sub_data = "glGetBufferSubData": fn(GLenum, GLintptr, GLsizeiptr, *mut c_void);

        gen_renderbuffers = "glGenRenderbuffers": fn(GLsizei, *mut GLuint);
        delete_renderbuffers = "glDeleteRenderbuffers": fn(GLsizei, *const GLuint);
        bind_renderbuffer = "glBindRenderbuffer": fn(GLenum, GLuint);
        renderbuffer_storage = "glRenderbufferStorage": fn(GLenum, GLenum, GLsizei, GLsizei);
        gen_framebuffers = "glGenFramebuffers": fn(GLsizei, *mut GLuint);
        delete_framebuffers = "glDeleteFramebuffers": fn(GLsizei, *const GLuint);
        bind_framebuffer = "glBindFramebuffer": fn(GLenum, GLuint);
        framebuffer_texture_2d = "glFramebufferTexture2D": fn(GLenum, GLenum, GLenum, GLuint, GLint);
        framebuffer_texture_layer = "glFramebufferTextureLayer": fn(GLenum, GLenum, GLuint, GLint, GLint);
        framebuffer_renderbuffer = "glFramebufferRenderbuffer": fn(GLenum, GLenum, GLenum, GLuint);
        check_framebuffer_status = "glCheckFramebufferStatus": fn(GLenum) -> GLenum;
        draw_buffers = "glDrawBuffers": fn(GLsizei, *const GLenum);
        read_buffer = "glReadBuffer": fn(GLenum);
        blit_framebuffer = "glBlitFramebuffer": fn(GLint, GLint, GLint, GLint, GLint, GLint, GLint, GLint, GLbitfield, GLenum);
        read_pixels = "glReadPixels": fn(GLint, GLint, GLsizei, GLsizei, GLenum, GLenum, *mut c_void);

        blend_func = "glBlendFunc": fn(GLenum, GLenum);
        blend_equation = "glBlendEquation": fn(GLenum);
        blend_color = "glBlendColor": fn(GLfloat, GLfloat, GLfloat, GLfloat);
        depth_func = "glDepthFunc": fn(GLenum);
        depth_mask = "glDepthMask": fn(GLboolean);
        depth_range = "glDepthRange": fn(GLdouble, GLdouble);
        stencil_func = "glStencilFunc": fn(GLenum, GLint, GLuint);
        stencil_op = "glStencilOp": fn(GLenum, GLenum, GLenum);
        stencil_mask = "glStencilMask": fn(GLuint);
        alpha_func = "glAlphaFunc": fn(GLenum, GLfloat);
        color_mask = "glColorMask": fn(GLboolean, GLboolean, GLboolean, GLboolean);

        cull_face = "glCullFace": fn(GLenum);
        front_face = "glFrontFace": fn(GLenum);
        polygon_mode = "glPolygonMode": fn(GLenum, GLenum);
        shade_model = "glShadeModel": fn(GLenum);
        polygon_offset = "glPolygonOffset": fn(GLfloat, GLfloat);
        point_size = "glPointSize": fn(GLfloat);
        line_width = "glLineWidth": fn(GLfloat);
        line_stipple = "glLineStipple": fn(GLint, u16);
        viewport = "glViewport": fn(GLint, GLint, GLsizei, GLsizei);
        scissor = "glScissor": fn(GLint, GLint, GLsizei, GLsizei);

        fog_i = "glFogi": fn(GLenum, GLint);
        fog_f = "glFogf": fn(GLenum, GLfloat);
        fog_fv = "glFogfv": fn(GLenum, *const GLfloat);
        light_model_i = "glLightModeli": fn(GLenum, GLint);
        light_model_fv = "glLightModelfv": fn(GLenum, *const GLfloat);

        clear_color = "glClearColor": fn(GLfloat, GLfloat, GLfloat, GLfloat);
        clear_depth = "glClearDepth": fn(GLdouble);
        clear_stencil = "glClearStencil": fn(GLint);
        clear = "glClear": fn(GLbitfield);

        matrix_mode = "glMatrixMode": fn(GLenum);
        load_matrix_f = "glLoadMatrixf": fn(*const GLfloat);
        load_identity = "glLoadIdentity": fn();
        push_matrix = "glPushMatrix": fn();
        pop_matrix = "glPopMatrix": fn();
        light_fv = "glLightfv": fn(GLenum, GLenum, *const GLfloat);
        light_f = "glLightf": fn(GLenum, GLenum, GLfloat);
        material_fv = "glMaterialfv": fn(GLenum, GLenum, *const GLfloat);
        material_f = "glMaterialf": fn(GLenum, GLenum, GLfloat);
        color_material = "glColorMaterial": fn(GLenum, GLenum);
        clip_plane = "glClipPlane": fn(GLenum, *const GLdouble);

        enable_client_state = "glEnableClientState": fn(GLenum);
        disable_client_state = "glDisableClientState": fn(GLenum);
        client_active_texture = "glClientActiveTexture": fn(GLenum);
        vertex_pointer = "glVertexPointer": fn(GLint, GLenum, GLsizei, *const c_void);
        normal_pointer = "glNormalPointer": fn(GLenum, GLsizei, *const c_void);
        color_pointer = "glColorPointer": fn(GLint, GLenum, GLsizei, *const c_void);
        tex_coord_pointer = "glTexCoordPointer": fn(GLint, GLenum, GLsizei, *const c_void);

        enable_vertex_attrib_array = "glEnableVertexAttribArray": fn(GLuint);
        disable_vertex_attrib_array = "glDisableVertexAttribArray": fn(GLuint);
        vertex_attrib_pointer = "glVertexAttribPointer": fn(GLuint, GLint, GLenum, GLboolean, GLsizei, *const c_void);
        vertex_attrib_4fv = "glVertexAttrib4fv": fn(GLuint, *const GLfloat);
        color_4fv = "glColor4fv": fn(*const GLfloat);
        normal_3fv = "glNormal3fv": fn(*const GLfloat);
        multi_tex_coord_4fv = "glMultiTexCoord4fv": fn(GLenum, *const GLfloat);

        draw_arrays = "glDrawArrays": fn(GLenum, GLint, GLsizei);
        draw_elements = "glDrawElements": fn(GLenum, GLsizei, GLenum, *const c_void);

        gen_queries = "glGenQueries": fn(GLsizei, *mut GLuint);
        delete_queries = "glDeleteQueries": fn(GLsizei, *const GLuint);
        begin_query = "glBeginQuery": fn(GLenum, GLuint);
        end_query = "glEndQuery": fn(GLenum);
        get_query_object_uiv = "glGetQueryObjectuiv": fn(GLuint, GLenum, *mut GLuint);
    }
    optional {
        get_string_i = ["glGetStringi"]: fn(GLenum, GLuint) -> *const u8;
        draw_arrays_instanced = ["glDrawArraysInstanced", "glDrawArraysInstancedARB"]: fn(GLenum, GLint, GLsizei, GLsizei);
        draw_elements_instanced = ["glDrawElementsInstanced", "glDrawElementsInstancedARB"]: fn(GLenum, GLsizei, GLenum, *const c_void, GLsizei);
        draw_elements_base_vertex = ["glDrawElementsBaseVertex"]: fn(GLenum, GLsizei, GLenum, *const c_void, GLint);
        draw_elements_instanced_base_vertex = ["glDrawElementsInstancedBaseVertex"]: fn(GLenum, GLsizei, GLenum, *const c_void, GLsizei, GLint);
        vertex_attrib_divisor = ["glVertexAttribDivisor", "glVertexAttribDivisorARB"]: fn(GLuint, GLuint);
        stencil_func_separate = ["glStencilFuncSeparate"]: fn(GLenum, GLenum, GLint, GLuint);
        stencil_op_separate = ["glStencilOpSeparate"]: fn(GLenum, GLenum, GLenum, GLenum);
        blend_func_separate = ["glBlendFuncSeparate", "glBlendFuncSeparateEXT"]: fn(GLenum, GLenum, GLenum, GLenum);
        blend_equation_separate = ["glBlendEquationSeparate", "glBlendEquationSeparateEXT"]: fn(GLenum, GLenum);
        color_mask_i = ["glColorMaski", "glColorMaskIndexedEXT"]: fn(GLuint, GLboolean, GLboolean, GLboolean, GLboolean);
        point_parameter_f = ["glPointParameterf", "glPointParameterfARB"]: fn(GLenum, GLfloat);
        point_parameter_fv = ["glPointParameterfv", "glPointParameterfvARB"]: fn(GLenum, *const GLfloat);
        fog_coord_pointer = ["glFogCoordPointer", "glFogCoordPointerEXT"]: fn(GLenum, GLsizei, *const c_void);
        fog_coord_f = ["glFogCoordf", "glFogCoordfEXT"]: fn(GLfloat);
        secondary_color_pointer = ["glSecondaryColorPointer", "glSecondaryColorPointerEXT"]: fn(GLint, GLenum, GLsizei, *const c_void);
        secondary_color_3fv = ["glSecondaryColor3fv", "glSecondaryColor3fvEXT"]: fn(*const GLfloat);
    }
}

/// Driver entry points for one share group.
///
/// Function pointers obtained through `wglGetProcAddress` are only guaranteed valid for
/// contexts with the same pixel format; every context this backend creates uses one.
pub struct GlEntryPoints {
    fns: Fns,
}

impl GlEntryPoints {
    /// Resolves every entry point through `lookup`, which returns null for unknown names.
    pub fn load(mut lookup: impl FnMut(&str) -> *const c_void) -> Result<Self, InitError> {
        let fns = Fns::resolve(&mut lookup)?;
        let ep = Self { fns };
        for opt in OptionalEntryPoint::ALL {
            if !ep.supports(opt) {
                tracing::info!(entry_point = ?opt, "optional host entry point unavailable");
            }
        }
        Ok(ep)
    }

    fn missing(&self, name: &'static str) {
        tracing::debug!(name, "call to unavailable optional entry point ignored");
    }
}

fn c_string(p: *const u8) -> Option<String> {
    if p.is_null() {
        return None;
    }
    // SAFETY: GL returns NUL-terminated static strings owned by the driver.
    let s = unsafe { CStr::from_ptr(p.cast::<c_char>()) };
    Some(s.to_string_lossy().into_owned())
}

fn gen_one(f: unsafe extern "system" fn(GLsizei, *mut GLuint)) -> GLuint {
    let mut name = 0;
    // SAFETY: writes exactly one name into `name`.
    unsafe { f(1, &mut name) };
    name
}

fn delete_one(f: unsafe extern "system" fn(GLsizei, *const GLuint), name: GLuint) {
    if name != 0 {
        // SAFETY: reads exactly one name.
        unsafe { f(1, &name) };
    }
}

// SAFETY (whole impl): each method forwards to the resolved driver symbol. Slices passed
// down are sized by the caller from the format table for the image being transferred.
impl GlApi for GlEntryPoints {
    fn supports(&self, entry_point: OptionalEntryPoint) -> bool {
        let f = &self.fns;
        match entry_point {
            OptionalEntryPoint::DrawInstanced => {
                f.draw_arrays_instanced.is_some() && f.draw_elements_instanced.is_some()
            }
            OptionalEntryPoint::DrawBaseVertex => {
                f.draw_elements_base_vertex.is_some()
                    && f.draw_elements_instanced_base_vertex.is_some()
            }
            OptionalEntryPoint::VertexAttribDivisor => f.vertex_attrib_divisor.is_some(),
            OptionalEntryPoint::StencilSeparate => {
                f.stencil_func_separate.is_some() && f.stencil_op_separate.is_some()
            }
            OptionalEntryPoint::BlendSeparate => {
                f.blend_func_separate.is_some() && f.blend_equation_separate.is_some()
            }
            OptionalEntryPoint::ColorMaskIndexed => f.color_mask_i.is_some(),
            OptionalEntryPoint::PointParameters => {
                f.point_parameter_f.is_some() && f.point_parameter_fv.is_some()
            }
            OptionalEntryPoint::FogCoord => f.fog_coord_pointer.is_some() && f.fog_coord_f.is_some(),
            OptionalEntryPoint::SecondaryColor => {
                f.secondary_color_pointer.is_some() && f.secondary_color_3fv.is_some()
            }
        }
    }

    fn get_error(&mut self) -> GLenum {
        unsafe { (self.fns.get_error)() }
    }

    fn get_string(&mut self, name: GLenum) -> Option<String> {
        c_string(unsafe { (self.fns.get_string)(name) })
    }

    fn get_string_i(&mut self, name: GLenum, index: u32) -> Option<String> {
        let f = self.fns.get_string_i?;
        c_string(unsafe { f(name, index) })
    }

    fn get_integer_v(&mut self, pname: GLenum, out: &mut [GLint]) {
        // Multi-value queries write up to 4 values; never hand the driver a shorter slice.
        let mut tmp = [0; 16];
        unsafe { (self.fns.get_integer_v)(pname, tmp.as_mut_ptr()) };
        let n = out.len().min(tmp.len());
        out[..n].copy_from_slice(&tmp[..n]);
    }

    fn get_float_v(&mut self, pname: GLenum, out: &mut [GLfloat]) {
        let mut tmp = [0.0; 16];
        unsafe { (self.fns.get_float_v)(pname, tmp.as_mut_ptr()) };
        let n = out.len().min(tmp.len());
        out[..n].copy_from_slice(&tmp[..n]);
    }

    fn enable(&mut self, cap: GLenum) {
        unsafe { (self.fns.enable)(cap) }
    }

    fn disable(&mut self, cap: GLenum) {
        unsafe { (self.fns.disable)(cap) }
    }

    fn is_enabled(&mut self, cap: GLenum) -> bool {
        unsafe { (self.fns.is_enabled)(cap) != 0 }
    }

    fn flush(&mut self) {
        unsafe { (self.fns.flush)() }
    }

    fn finish(&mut self) {
        unsafe { (self.fns.finish)() }
    }

    fn gen_texture(&mut self) -> GLuint {
        gen_one(self.fns.gen_textures)
    }

    fn delete_texture(&mut self, name: GLuint) {
        delete_one(self.fns.delete_textures, name)
    }

    fn active_texture(&mut self, unit: GLenum) {
        unsafe { (self.fns.active_texture)(unit) }
    }

    fn bind_texture(&mut self, target: GLenum, name: GLuint) {
        unsafe { (self.fns.bind_texture)(target, name) }
    }

    fn tex_parameter_i(&mut self, target: GLenum, pname: GLenum, param: GLint) {
        unsafe { (self.fns.tex_parameter_i)(target, pname, param) }
    }

    fn tex_parameter_f(&mut self, target: GLenum, pname: GLenum, param: GLfloat) {
        unsafe { (self.fns.tex_parameter_f)(target, pname, param) }
    }

    fn tex_parameter_fv(&mut self, target: GLenum, pname: GLenum, params: &[GLfloat; 4]) {
        unsafe { (self.fns.tex_parameter_fv)(target, pname, params.as_ptr()) }
    }

    fn tex_image(
        &mut self,
        target: GLenum,
        level: u32,
        internal_format: GLenum,
        extent: Extent,
        format: GLenum,
        ty: GLenum,
        data: Option<&[u8]>,
    ) {
        let (w, h, d) = (sz(extent.width), sz(extent.height), sz(extent.depth));
        let level = level as GLint;
        let internal = internal_format as GLint;
        unsafe {
            if target == gl::TEXTURE_3D {
                (self.fns.tex_image_3d)(target, level, internal, w, h, d, 0, format, ty, ptr_of(data));
            } else {
                (self.fns.tex_image_2d)(target, level, internal, w, h, 0, format, ty, ptr_of(data));
            }
        }
    }

    fn tex_sub_image(
        &mut self,
        target: GLenum,
        level: u32,
        offset: Offset3,
        extent: Extent,
        format: GLenum,
        ty: GLenum,
        data: &[u8],
    ) {
        let (w, h, d) = (sz(extent.width), sz(extent.height), sz(extent.depth));
        let (x, y, z) = (offset.x as GLint, offset.y as GLint, offset.z as GLint);
        let p = data.as_ptr().cast();
        unsafe {
            if target == gl::TEXTURE_3D {
                (self.fns.tex_sub_image_3d)(target, level as GLint, x, y, z, w, h, d, format, ty, p);
            } else {
                (self.fns.tex_sub_image_2d)(target, level as GLint, x, y, w, h, format, ty, p);
            }
        }
    }

    fn compressed_tex_image(
        &mut self,
        target: GLenum,
        level: u32,
        internal_format: GLenum,
        extent: Extent,
        data: &[u8],
    ) {
        let (w, h, d) = (sz(extent.width), sz(extent.height), sz(extent.depth));
        let len = data.len().min(i32::MAX as usize) as GLsizei;
        let p = data.as_ptr().cast();
        unsafe {
            if target == gl::TEXTURE_3D {
                (self.fns.compressed_tex_image_3d)(target, level as GLint, internal_format, w, h, d, 0, len, p);
            } else {
                (self.fns.compressed_tex_image_2d)(target, level as GLint, internal_format, w, h, 0, len, p);
            }
        }
    }

    fn get_tex_image(&mut self, target: GLenum, level: u32, format: GLenum, ty: GLenum, out: &mut [u8]) {
        unsafe { (self.fns.get_tex_image)(target, level as GLint, format, ty, out.as_mut_ptr().cast()) }
    }

    fn get_compressed_tex_image(&mut self, target: GLenum, level: u32, out: &mut [u8]) {
        unsafe { (self.fns.get_compressed_tex_image)(target, level as GLint, out.as_mut_ptr().cast()) }
    }

    fn generate_mipmap(&mut self, target: GLenum) {
        unsafe { (self.fns.generate_mipmap)(target) }
    }

    fn pixel_store_i(&mut self, pname: GLenum, param: GLint) {
        unsafe { (self.fns.pixel_store_i)(pname, param) }
    }

    fn tex_env_i(&mut self, target: GLenum, pname: GLenum, param: GLint) {
        unsafe { (self.fns.tex_env_i)(target, pname, param) }
    }

    fn tex_env_fv(&mut self, target: GLenum, pname: GLenum, params: &[GLfloat; 4]) {
        unsafe { (self.fns.tex_env_fv)(target, pname, params.as_ptr()) }
    }

    fn tex_gen_i(&mut self, coord: GLenum, pname: GLenum, param: GLint) {
        unsafe { (self.fns.tex_gen_i)(coord, pname, param) }
    }

    fn gen_buffer(&mut self) -> GLuint {
        gen_one(self.fns.gen_buffers)
    }

    fn delete_buffer(&mut self, name: GLuint) {
        delete_one(self.fns.delete_buffers, name)
    }

    fn bind_buffer(&mut self, target: GLenum, name: GLuint) {
        unsafe { (self.fns.bind_buffer)(target, name) }
    }

    fn buffer_data(&mut self, target: GLenum, size: usize, data: Option<&[u8]>, usage: GLenum) {
        let size = data.map_or(size, |d| d.len().min(size));
        unsafe { (self.fns.buffer_data)(target, size as GLsizeiptr, ptr_of(data), usage) }
    }

    fn buffer_sub_data(&mut self, target: GLenum, offset: usize, data: &[u8]) {
        unsafe {
            (self.fns.buffer_sub_data)(target, offset as GLintptr, data.len() as GLsizeiptr, data.as_ptr().cast())
        }
    }

    fn get_buffer_sub_data(&mut self, target: GLenum, offset: usize, out: &mut [u8]) {
        unsafe {
            (self.fns.get_buffer_sub_data)(target, offset as GLintptr, out.len() as GLsizeiptr, out.as_mut_ptr().cast())
        }
    }

    fn gen_renderbuffer(&mut self) -> GLuint {
        gen_one(self.fns.gen_renderbuffers)
    }

    fn delete_renderbuffer(&mut self, name: GLuint) {
        delete_one(self.fns.delete_renderbuffers, name)
    }

    fn bind_renderbuffer(&mut self, name: GLuint) {
        unsafe { (self.fns.bind_renderbuffer)(gl::RENDERBUFFER, name) }
    }

    fn renderbuffer_storage(&mut self, internal_format: GLenum, width: u32, height: u32) {
        unsafe { (self.fns.renderbuffer_storage)(gl::RENDERBUFFER, internal_format, sz(width), sz(height)) }
    }

    fn gen_framebuffer(&mut self) -> GLuint {
        gen_one(self.fns.gen_framebuffers)
    }

    fn delete_framebuffer(&mut self, name: GLuint) {
        delete_one(self.fns.delete_framebuffers, name)
    }

    fn bind_framebuffer(&mut self, target: GLenum, name: GLuint) {
        unsafe { (self.fns.bind_framebuffer)(target, name) }
    }

    fn framebuffer_texture(
        &mut self,
        target: GLenum,
        attachment: GLenum,
        tex_target: GLenum,
        texture: GLuint,
        level: u32,
        layer: u32,
    ) {
        unsafe {
            if tex_target == gl::TEXTURE_3D {
                (self.fns.framebuffer_texture_layer)(target, attachment, texture, level as GLint, layer as GLint);
            } else {
                (self.fns.framebuffer_texture_2d)(target, attachment, tex_target, texture, level as GLint);
            }
        }
    }

    fn framebuffer_renderbuffer(&mut self, target: GLenum, attachment: GLenum, rb: GLuint) {
        unsafe { (self.fns.framebuffer_renderbuffer)(target, attachment, gl::RENDERBUFFER, rb) }
    }

    fn check_framebuffer_status(&mut self, target: GLenum) -> GLenum {
        unsafe { (self.fns.check_framebuffer_status)(target) }
    }

    fn draw_buffers(&mut self, buffers: &[GLenum]) {
        unsafe { (self.fns.draw_buffers)(buffers.len() as GLsizei, buffers.as_ptr()) }
    }

    fn read_buffer(&mut self, mode: GLenum) {
        unsafe { (self.fns.read_buffer)(mode) }
    }

    fn blit_framebuffer(&mut self, src: BlitRect, dst: BlitRect, mask: GLbitfield, filter: GLenum) {
        unsafe {
            (self.fns.blit_framebuffer)(
                src.x0, src.y0, src.x1, src.y1, dst.x0, dst.y0, dst.x1, dst.y1, mask, filter,
            )
        }
    }

    fn read_pixels(
        &mut self,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        format: GLenum,
        ty: GLenum,
        out: &mut [u8],
    ) {
        unsafe { (self.fns.read_pixels)(x, y, sz(width), sz(height), format, ty, out.as_mut_ptr().cast()) }
    }

    fn blend_func(&mut self, src: GLenum, dst: GLenum) {
        unsafe { (self.fns.blend_func)(src, dst) }
    }

    fn blend_func_separate(&mut self, src_rgb: GLenum, dst_rgb: GLenum, src_a: GLenum, dst_a: GLenum) {
        match self.fns.blend_func_separate {
            Some(f) => unsafe { f(src_rgb, dst_rgb, src_a, dst_a) },
            None => {
                self.missing("glBlendFuncSeparate");
                self.blend_func(src_rgb, dst_rgb);
            }
        }
    }

    fn blend_equation(&mut self, mode: GLenum) {
        unsafe { (self.fns.blend_equation)(mode) }
    }

    fn blend_equation_separate(&mut self, mode_rgb: GLenum, mode_alpha: GLenum) {
        match self.fns.blend_equation_separate {
            Some(f) => unsafe { f(mode_rgb, mode_alpha) },
            None => {
                self.missing("glBlendEquationSeparate");
                self.blend_equation(mode_rgb);
            }
        }
    }

    fn blend_color(&mut self, rgba: [GLfloat; 4]) {
        unsafe { (self.fns.blend_color)(rgba[0], rgba[1], rgba[2], rgba[3]) }
    }

    fn depth_func(&mut self, func: GLenum) {
        unsafe { (self.fns.depth_func)(func) }
    }

    fn depth_mask(&mut self, on: bool) {
        unsafe { (self.fns.depth_mask)(gl_bool(on)) }
    }

    fn depth_range(&mut self, near: GLdouble, far: GLdouble) {
        unsafe { (self.fns.depth_range)(near, far) }
    }

    fn stencil_func(&mut self, func: GLenum, reference: GLint, mask: GLuint) {
        unsafe { (self.fns.stencil_func)(func, reference, mask) }
    }

    fn stencil_func_separate(&mut self, face: GLenum, func: GLenum, reference: GLint, mask: GLuint) {
        match self.fns.stencil_func_separate {
            Some(f) => unsafe { f(face, func, reference, mask) },
            None => self.missing("glStencilFuncSeparate"),
        }
    }

    fn stencil_op(&mut self, sfail: GLenum, dpfail: GLenum, dppass: GLenum) {
        unsafe { (self.fns.stencil_op)(sfail, dpfail, dppass) }
    }

    fn stencil_op_separate(&mut self, face: GLenum, sfail: GLenum, dpfail: GLenum, dppass: GLenum) {
        match self.fns.stencil_op_separate {
            Some(f) => unsafe { f(face, sfail, dpfail, dppass) },
            None => self.missing("glStencilOpSeparate"),
        }
    }

    fn stencil_mask(&mut self, mask: GLuint) {
        unsafe { (self.fns.stencil_mask)(mask) }
    }

    fn alpha_func(&mut self, func: GLenum, reference: GLfloat) {
        unsafe { (self.fns.alpha_func)(func, reference) }
    }

    fn color_mask(&mut self, mask: [bool; 4]) {
        let [r, g, b, a] = mask.map(gl_bool);
        unsafe { (self.fns.color_mask)(r, g, b, a) }
    }

    fn color_mask_i(&mut self, index: u32, mask: [bool; 4]) {
        let [r, g, b, a] = mask.map(gl_bool);
        match self.fns.color_mask_i {
            Some(f) => unsafe { f(index, r, g, b, a) },
            None if index == 0 => unsafe { (self.fns.color_mask)(r, g, b, a) },
            None => self.missing("glColorMaski"),
        }
    }

    fn cull_face(&mut self, mode: GLenum) {
        unsafe { (self.fns.cull_face)(mode) }
    }

    fn front_face(&mut self, mode: GLenum) {
        unsafe { (self.fns.front_face)(mode) }
    }

    fn polygon_mode(&mut self, face: GLenum, mode: GLenum) {
        unsafe { (self.fns.polygon_mode)(face, mode) }
    }

    fn shade_model(&mut self, mode: GLenum) {
        unsafe { (self.fns.shade_model)(mode) }
    }

    fn polygon_offset(&mut self, factor: GLfloat, units: GLfloat) {
        unsafe { (self.fns.polygon_offset)(factor, units) }
    }

    fn point_size(&mut self, size: GLfloat) {
        unsafe { (self.fns.point_size)(size) }
    }

    fn point_parameter_f(&mut self, pname: GLenum, value: GLfloat) {
        match self.fns.point_parameter_f {
            Some(f) => unsafe { f(pname, value) },
            None => self.missing("glPointParameterf"),
        }
    }

    fn point_parameter_fv(&mut self, pname: GLenum, values: &[GLfloat; 3]) {
        match self.fns.point_parameter_fv {
            Some(f) => unsafe { f(pname, values.as_ptr()) },
            None => self.missing("glPointParameterfv"),
        }
    }

    fn line_width(&mut self, width: GLfloat) {
        unsafe { (self.fns.line_width)(width) }
    }

    fn line_stipple(&mut self, factor: GLint, pattern: u16) {
        unsafe { (self.fns.line_stipple)(factor, pattern) }
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        unsafe { (self.fns.viewport)(x, y, sz(width), sz(height)) }
    }

    fn scissor(&mut self, x: i32, y: i32, width: u32, height: u32) {
        unsafe { (self.fns.scissor)(x, y, sz(width), sz(height)) }
    }

    fn fog_i(&mut self, pname: GLenum, value: GLint) {
        unsafe { (self.fns.fog_i)(pname, value) }
    }

    fn fog_f(&mut self, pname: GLenum, value: GLfloat) {
        unsafe { (self.fns.fog_f)(pname, value) }
    }

    fn fog_fv(&mut self, pname: GLenum, values: &[GLfloat; 4]) {
        unsafe { (self.fns.fog_fv)(pname, values.as_ptr()) }
    }

    fn light_model_i(&mut self, pname: GLenum, value: GLint) {
        unsafe { (self.fns.light_model_i)(pname, value) }
    }

    fn light_model_fv(&mut self, pname: GLenum, values: &[GLfloat; 4]) {
        unsafe { (self.fns.light_model_fv)(pname, values.as_ptr()) }
    }

    fn clear_color(&mut self, rgba: [GLfloat; 4]) {
        unsafe { (self.fns.clear_color)(rgba[0], rgba[1], rgba[2], rgba[3]) }
    }

    fn clear_depth(&mut self, depth: GLdouble) {
        unsafe { (self.fns.clear_depth)(depth) }
    }

    fn clear_stencil(&mut self, s: GLint) {
        unsafe { (self.fns.clear_stencil)(s) }
    }

    fn clear(&mut self, mask: GLbitfield) {
        unsafe { (self.fns.clear)(mask) }
    }

    fn matrix_mode(&mut self, mode: GLenum) {
        unsafe { (self.fns.matrix_mode)(mode) }
    }

    fn load_matrix(&mut self, m: &[GLfloat; 16]) {
        unsafe { (self.fns.load_matrix_f)(m.as_ptr()) }
    }

    fn load_identity(&mut self) {
        unsafe { (self.fns.load_identity)() }
    }

    fn push_matrix(&mut self) {
        unsafe { (self.fns.push_matrix)() }
    }

    fn pop_matrix(&mut self) {
        unsafe { (self.fns.pop_matrix)() }
    }

    fn light_fv(&mut self, light: GLenum, pname: GLenum, values: &[GLfloat]) {
        let mut v = [0.0; 4];
        let n = values.len().min(4);
        v[..n].copy_from_slice(&values[..n]);
        unsafe { (self.fns.light_fv)(light, pname, v.as_ptr()) }
    }

    fn light_f(&mut self, light: GLenum, pname: GLenum, value: GLfloat) {
        unsafe { (self.fns.light_f)(light, pname, value) }
    }

    fn material_fv(&mut self, face: GLenum, pname: GLenum, values: &[GLfloat]) {
        let mut v = [0.0; 4];
        let n = values.len().min(4);
        v[..n].copy_from_slice(&values[..n]);
        unsafe { (self.fns.material_fv)(face, pname, v.as_ptr()) }
    }

    fn material_f(&mut self, face: GLenum, pname: GLenum, value: GLfloat) {
        unsafe { (self.fns.material_f)(face, pname, value) }
    }

    fn color_material(&mut self, face: GLenum, mode: GLenum) {
        unsafe { (self.fns.color_material)(face, mode) }
    }

    fn clip_plane(&mut self, plane: GLenum, equation: &[GLdouble; 4]) {
        unsafe { (self.fns.clip_plane)(plane, equation.as_ptr()) }
    }

    fn enable_client_state(&mut self, array: GLenum) {
        unsafe { (self.fns.enable_client_state)(array) }
    }

    fn disable_client_state(&mut self, array: GLenum) {
        unsafe { (self.fns.disable_client_state)(array) }
    }

    fn client_active_texture(&mut self, unit: GLenum) {
        unsafe { (self.fns.client_active_texture)(unit) }
    }

    fn vertex_pointer(&mut self, size: i32, ty: GLenum, stride: u32, offset: usize) {
        unsafe { (self.fns.vertex_pointer)(size, ty, sz(stride), offset_ptr(offset)) }
    }

    fn normal_pointer(&mut self, ty: GLenum, stride: u32, offset: usize) {
        unsafe { (self.fns.normal_pointer)(ty, sz(stride), offset_ptr(offset)) }
    }

    fn color_pointer(&mut self, size: i32, ty: GLenum, stride: u32, offset: usize) {
        unsafe { (self.fns.color_pointer)(size, ty, sz(stride), offset_ptr(offset)) }
    }

    fn secondary_color_pointer(&mut self, size: i32, ty: GLenum, stride: u32, offset: usize) {
        match self.fns.secondary_color_pointer {
            Some(f) => unsafe { f(size, ty, sz(stride), offset_ptr(offset)) },
            None => self.missing("glSecondaryColorPointer"),
        }
    }

    fn tex_coord_pointer(&mut self, size: i32, ty: GLenum, stride: u32, offset: usize) {
        unsafe { (self.fns.tex_coord_pointer)(size, ty, sz(stride), offset_ptr(offset)) }
    }

    fn fog_coord_pointer(&mut self, ty: GLenum, stride: u32, offset: usize) {
        match self.fns.fog_coord_pointer {
            Some(f) => unsafe { f(ty, sz(stride), offset_ptr(offset)) },
            None => self.missing("glFogCoordPointer"),
        }
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        unsafe { (self.fns.enable_vertex_attrib_array)(index) }
    }

    fn disable_vertex_attrib_array(&mut self, index: u32) {
        unsafe { (self.fns.disable_vertex_attrib_array)(index) }
    }

    fn vertex_attrib_pointer(
        &mut self,
        index: u32,
        size: i32,
        ty: GLenum,
        normalized: bool,
        stride: u32,
        offset: usize,
    ) {
        unsafe {
            (self.fns.vertex_attrib_pointer)(index, size, ty, gl_bool(normalized), sz(stride), offset_ptr(offset))
        }
    }

    fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32) {
        match self.fns.vertex_attrib_divisor {
            Some(f) => unsafe { f(index, divisor) },
            None if divisor == 0 => {}
            None => self.missing("glVertexAttribDivisor"),
        }
    }

    fn vertex_attrib_4fv(&mut self, index: u32, v: &[GLfloat; 4]) {
        unsafe { (self.fns.vertex_attrib_4fv)(index, v.as_ptr()) }
    }

    fn color_4fv(&mut self, v: &[GLfloat; 4]) {
        unsafe { (self.fns.color_4fv)(v.as_ptr()) }
    }

    fn secondary_color_3fv(&mut self, v: &[GLfloat; 3]) {
        match self.fns.secondary_color_3fv {
            Some(f) => unsafe { f(v.as_ptr()) },
            None => self.missing("glSecondaryColor3fv"),
        }
    }

    fn normal_3fv(&mut self, v: &[GLfloat; 3]) {
        unsafe { (self.fns.normal_3fv)(v.as_ptr()) }
    }

    fn multi_tex_coord_4fv(&mut self, unit: GLenum, v: &[GLfloat; 4]) {
        unsafe { (self.fns.multi_tex_coord_4fv)(unit, v.as_ptr()) }
    }

    fn fog_coord_f(&mut self, v: GLfloat) {
        match self.fns.fog_coord_f {
            Some(f) => unsafe { f(v) },
            None => self.missing("glFogCoordf"),
        }
    }

    fn draw_arrays(&mut self, mode: GLenum, first: i32, count: u32) {
        unsafe { (self.fns.draw_arrays)(mode, first, sz(count)) }
    }

    fn draw_arrays_instanced(&mut self, mode: GLenum, first: i32, count: u32, instances: u32) {
        match self.fns.draw_arrays_instanced {
            Some(f) => unsafe { f(mode, first, sz(count), sz(instances)) },
            None => self.missing("glDrawArraysInstanced"),
        }
    }

    fn draw_elements(&mut self, mode: GLenum, count: u32, ty: GLenum, offset: usize) {
        unsafe { (self.fns.draw_elements)(mode, sz(count), ty, offset_ptr(offset)) }
    }

    fn draw_elements_instanced(&mut self, mode: GLenum, count: u32, ty: GLenum, offset: usize, instances: u32) {
        match self.fns.draw_elements_instanced {
            Some(f) => unsafe { f(mode, sz(count), ty, offset_ptr(offset), sz(instances)) },
            None => self.missing("glDrawElementsInstanced"),
        }
    }

    fn draw_elements_base_vertex(&mut self, mode: GLenum, count: u32, ty: GLenum, offset: usize, base_vertex: i32) {
        match self.fns.draw_elements_base_vertex {
            Some(f) => unsafe { f(mode, sz(count), ty, offset_ptr(offset), base_vertex) },
            None => self.missing("glDrawElementsBaseVertex"),
        }
    }

    fn draw_elements_instanced_base_vertex(
        &mut self,
        mode: GLenum,
        count: u32,
        ty: GLenum,
        offset: usize,
        instances: u32,
        base_vertex: i32,
    ) {
        match self.fns.draw_elements_instanced_base_vertex {
            Some(f) => unsafe { f(mode, sz(count), ty, offset_ptr(offset), sz(instances), base_vertex) },
            None => self.missing("glDrawElementsInstancedBaseVertex"),
        }
    }

    fn gen_query(&mut self) -> GLuint {
        gen_one(self.fns.gen_queries)
    }

    fn delete_query(&mut self, name: GLuint) {
        delete_one(self.fns.delete_queries, name)
    }

    fn begin_query(&mut self, target: GLenum, name: GLuint) {
        unsafe { (self.fns.begin_query)(target, name) }
    }

    fn end_query(&mut self, target: GLenum) {
        unsafe { (self.fns.end_query)(target) }
    }

    fn get_query_object_u32(&mut self, name: GLuint, pname: GLenum) -> u32 {
        let mut v = 0;
        unsafe { (self.fns.get_query_object_uiv)(name, pname, &mut v) };
        v
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_entry_point_is_reported_by_name() {
        let err = match GlEntryPoints::load(|_| core::ptr::null()) {
            Err(err) => err,
            Ok(_) => panic!("loading against an empty symbol table must fail"),
        };
        match err {
            InitError::MissingEntryPoint(name) => assert_eq!(name, REQUIRED_ENTRY_POINTS[0]),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn required_names_are_unique() {
        let mut names = REQUIRED_ENTRY_POINTS.to_vec();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), REQUIRED_ENTRY_POINTS.len());
    }
}
