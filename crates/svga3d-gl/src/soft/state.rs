//! Object and context state of the software host.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::gl::{consts as gl, GLenum, GLuint};
use crate::math::{Mat4, IDENTITY};
use crate::platform::Profile;

/// One image of a texture: a (face, level) pair.
#[derive(Clone, Debug, Default)]
pub struct SoftImage {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
    pub internal_format: GLenum,
    /// Client layout the bytes are kept in (format, type); `(0, 0)` for compressed data.
    pub layout: (GLenum, GLenum),
    pub compressed: bool,
    pub bytes: Vec<u8>,
}

impl SoftImage {
    pub fn bpp(&self) -> usize {
        super::pixels::bytes_per_pixel(self.layout.0, self.layout.1).unwrap_or(4)
    }
}

#[derive(Clone, Debug, Default)]
pub struct SoftTexture {
    /// Target fixed by the first bind.
    pub target: GLenum,
    /// Keyed by (image target, level); the image target is the cube face for cube maps.
    pub images: BTreeMap<(GLenum, u32), SoftImage>,
    pub params_i: HashMap<GLenum, i32>,
    pub params_f: HashMap<GLenum, f32>,
    pub params_fv: HashMap<GLenum, [f32; 4]>,
    pub mipmaps_generated: u32,
}

#[derive(Clone, Debug, Default)]
pub struct SoftRenderbuffer {
    pub internal_format: GLenum,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
}

/// Objects visible to every context of one share group.
#[derive(Debug, Default)]
pub struct Namespace {
    pub textures: HashMap<GLuint, SoftTexture>,
    pub buffers: HashMap<GLuint, Vec<u8>>,
    pub renderbuffers: HashMap<GLuint, SoftRenderbuffer>,
    pub next_name: GLuint,
    pub contexts: usize,
}

impl Namespace {
    pub fn alloc_name(&mut self) -> GLuint {
        self.next_name += 1;
        self.next_name
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attachment {
    Texture {
        name: GLuint,
        /// 2D target, cube face or `TEXTURE_3D`.
        image_target: GLenum,
        level: u32,
        layer: u32,
    },
    Renderbuffer(GLuint),
}

#[derive(Clone, Debug)]
pub struct SoftFramebuffer {
    pub attachments: HashMap<GLenum, Attachment>,
    pub draw_buffers: Vec<GLenum>,
    pub read_buffer: GLenum,
}

impl Default for SoftFramebuffer {
    fn default() -> Self {
        Self {
            attachments: HashMap::new(),
            draw_buffers: vec![gl::COLOR_ATTACHMENT0],
            read_buffer: gl::COLOR_ATTACHMENT0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StencilFace {
    pub func: GLenum,
    pub reference: i32,
    pub value_mask: u32,
    pub fail: GLenum,
    pub zfail: GLenum,
    pub zpass: GLenum,
    pub write_mask: u32,
}

impl StencilFace {
    fn initial() -> Self {
        Self {
            func: gl::ALWAYS,
            reference: 0,
            value_mask: u32::MAX,
            fail: gl::KEEP,
            zfail: gl::KEEP,
            zpass: gl::KEEP,
            write_mask: u32::MAX,
        }
    }
}

/// Fixed-function light as the host stores it (position and direction in eye space).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SoftLight {
    pub ambient: [f32; 4],
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub position: [f32; 4],
    pub spot_direction: [f32; 3],
    pub spot_exponent: f32,
    pub spot_cutoff: f32,
    pub constant_attenuation: f32,
    pub linear_attenuation: f32,
    pub quadratic_attenuation: f32,
}

impl Default for SoftLight {
    fn default() -> Self {
        Self {
            ambient: [0.0, 0.0, 0.0, 1.0],
            diffuse: [0.0; 4],
            specular: [0.0; 4],
            position: [0.0, 0.0, 1.0, 0.0],
            spot_direction: [0.0, 0.0, -1.0],
            spot_exponent: 0.0,
            spot_cutoff: 180.0,
            constant_attenuation: 1.0,
            linear_attenuation: 0.0,
            quadratic_attenuation: 0.0,
        }
    }
}

/// Attribute source as seen by vertex fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AttribSlot {
    Position,
    Normal,
    Color,
    SecondaryColor,
    FogCoord,
    TexCoord(u32),
    Generic(u32),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArrayPointer {
    pub enabled: bool,
    /// Component count, or `GL_BGRA` for swizzled 4-component colours.
    pub size: i32,
    pub ty: GLenum,
    pub normalized: bool,
    pub stride: u32,
    pub offset: usize,
    /// `ARRAY_BUFFER` binding captured when the pointer was specified.
    pub buffer: GLuint,
    pub divisor: u32,
}

impl Default for ArrayPointer {
    fn default() -> Self {
        Self {
            enabled: false,
            size: 4,
            ty: gl::FLOAT,
            normalized: false,
            stride: 0,
            offset: 0,
            buffer: 0,
            divisor: 0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DrawRecord {
    pub mode: GLenum,
    pub count: u32,
    pub instances: u32,
    pub indexed: Option<GLenum>,
    pub first: i32,
    pub base_vertex: i32,
    /// Fetched attributes of every vertex of instance 0, in submission order.
    pub vertices: Vec<BTreeMap<AttribSlot, [f32; 4]>>,
    pub draw_framebuffer: GLuint,
}

#[derive(Clone, Debug, Default)]
pub struct SoftQuery {
    pub target: GLenum,
    pub result: u32,
    pub active: bool,
}

/// Everything one host context holds that isn't shared.
#[derive(Debug)]
pub struct SoftContextState {
    pub handle: u64,
    pub namespace: u64,
    pub profile: Profile,
    /// (capability, texture unit) pairs; the unit is 0 for non-texture capabilities.
    pub enabled: HashSet<(GLenum, u32)>,
    pub active_texture: u32,
    pub client_active_texture: u32,
    /// (unit, target) -> texture name.
    pub texture_bindings: HashMap<(u32, GLenum), GLuint>,
    pub tex_env_i: HashMap<(u32, GLenum), i32>,
    pub tex_env_fv: HashMap<(u32, GLenum), [f32; 4]>,
    pub tex_gen: HashMap<(u32, GLenum), i32>,
    pub pixel_store: HashMap<GLenum, i32>,
    pub buffer_bindings: HashMap<GLenum, GLuint>,
    pub renderbuffer_binding: GLuint,
    pub framebuffers: HashMap<GLuint, SoftFramebuffer>,
    pub next_fbo: GLuint,
    pub draw_framebuffer: GLuint,
    pub read_framebuffer: GLuint,

    pub blend_src: (GLenum, GLenum),
    pub blend_dst: (GLenum, GLenum),
    pub blend_equation: (GLenum, GLenum),
    pub blend_color: [f32; 4],
    pub depth_func: GLenum,
    pub depth_mask: bool,
    pub depth_range: (f64, f64),
    pub stencil_front: StencilFace,
    pub stencil_back: StencilFace,
    pub alpha_func: (GLenum, f32),
    pub color_masks: [[bool; 4]; 8],
    pub cull_face: GLenum,
    pub front_face: GLenum,
    pub polygon_mode: (GLenum, GLenum),
    pub shade_model: GLenum,
    pub polygon_offset: (f32, f32),
    pub point_size: f32,
    pub point_params: HashMap<GLenum, [f32; 3]>,
    pub line_width: f32,
    pub line_stipple: (i32, u16),
    pub viewport: [i32; 4],
    pub scissor: [i32; 4],
    pub fog_i: HashMap<GLenum, i32>,
    pub fog_f: HashMap<GLenum, f32>,
    pub fog_color: [f32; 4],
    pub light_model_i: HashMap<GLenum, i32>,
    pub light_model_ambient: [f32; 4],
    pub clear_color: [f32; 4],
    pub clear_depth: f64,
    pub clear_stencil: i32,

    pub matrix_mode: GLenum,
    pub modelview: Vec<Mat4>,
    pub projection: Vec<Mat4>,
    pub texture_matrices: Vec<Vec<Mat4>>,
    pub lights: Vec<SoftLight>,
    pub materials: HashMap<(GLenum, GLenum), Vec<f32>>,
    pub color_material: (GLenum, GLenum),
    /// Eye-space plane equations.
    pub clip_planes: Vec<[f64; 4]>,

    pub arrays: HashMap<AttribSlot, ArrayPointer>,
    pub current: HashMap<AttribSlot, [f32; 4]>,

    pub queries: HashMap<GLuint, SoftQuery>,
    pub next_query: GLuint,
    pub active_query: Option<(GLenum, GLuint)>,

    pub draws: Vec<DrawRecord>,
    pub errors: Vec<GLenum>,
}

impl SoftContextState {
    pub fn new(handle: u64, namespace: u64, profile: Profile, max_lights: usize, max_planes: usize) -> Self {
        let mut current = HashMap::new();
        current.insert(AttribSlot::Color, [1.0, 1.0, 1.0, 1.0]);
        current.insert(AttribSlot::Normal, [0.0, 0.0, 1.0, 0.0]);
        Self {
            handle,
            namespace,
            profile,
            enabled: [(gl::DITHER, 0), (gl::MULTISAMPLE, 0)].into_iter().collect(),
            active_texture: 0,
            client_active_texture: 0,
            texture_bindings: HashMap::new(),
            tex_env_i: HashMap::new(),
            tex_env_fv: HashMap::new(),
            tex_gen: HashMap::new(),
            pixel_store: [(gl::UNPACK_ALIGNMENT, 4), (gl::PACK_ALIGNMENT, 4)].into_iter().collect(),
            buffer_bindings: HashMap::new(),
            renderbuffer_binding: 0,
            framebuffers: HashMap::new(),
            next_fbo: 0,
            draw_framebuffer: 0,
            read_framebuffer: 0,
            blend_src: (gl::ONE, gl::ONE),
            blend_dst: (gl::ZERO, gl::ZERO),
            blend_equation: (gl::FUNC_ADD, gl::FUNC_ADD),
            blend_color: [0.0; 4],
            depth_func: gl::LESS,
            depth_mask: true,
            depth_range: (0.0, 1.0),
            stencil_front: StencilFace::initial(),
            stencil_back: StencilFace::initial(),
            alpha_func: (gl::ALWAYS, 0.0),
            color_masks: [[true; 4]; 8],
            cull_face: gl::BACK,
            front_face: gl::CCW,
            polygon_mode: (gl::FILL, gl::FILL),
            shade_model: gl::SMOOTH,
            polygon_offset: (0.0, 0.0),
            point_size: 1.0,
            point_params: HashMap::new(),
            line_width: 1.0,
            line_stipple: (1, 0xffff),
            viewport: [0; 4],
            scissor: [0; 4],
            fog_i: HashMap::new(),
            fog_f: HashMap::new(),
            fog_color: [0.0; 4],
            light_model_i: HashMap::new(),
            light_model_ambient: [0.2, 0.2, 0.2, 1.0],
            clear_color: [0.0; 4],
            clear_depth: 1.0,
            clear_stencil: 0,
            matrix_mode: gl::MODELVIEW,
            modelview: vec![IDENTITY],
            projection: vec![IDENTITY],
            texture_matrices: vec![vec![IDENTITY]; 8],
            lights: vec![SoftLight::default(); max_lights],
            materials: HashMap::new(),
            color_material: (gl::FRONT_AND_BACK, gl::AMBIENT_AND_DIFFUSE),
            clip_planes: vec![[0.0; 4]; max_planes],
            arrays: HashMap::new(),
            current,
            queries: HashMap::new(),
            next_query: 0,
            active_query: None,
            draws: Vec::new(),
            errors: Vec::new(),
        }
    }

    pub fn is_enabled(&self, cap: GLenum) -> bool {
        self.enabled.contains(&(cap, unit_scope(cap, self.active_texture)))
    }

    pub fn is_enabled_on_unit(&self, cap: GLenum, unit: u32) -> bool {
        self.enabled.contains(&(cap, unit_scope(cap, unit)))
    }

    pub fn modelview_top(&self) -> Mat4 {
        self.modelview.last().copied().unwrap_or(IDENTITY)
    }

    pub fn projection_top(&self) -> Mat4 {
        self.projection.last().copied().unwrap_or(IDENTITY)
    }

    pub fn texture_matrix_top(&self, unit: u32) -> Mat4 {
        self.texture_matrices
            .get(unit as usize)
            .and_then(|s| s.last().copied())
            .unwrap_or(IDENTITY)
    }

    pub fn bound_texture(&self, unit: u32, target: GLenum) -> GLuint {
        self.texture_bindings.get(&(unit, target)).copied().unwrap_or(0)
    }

    pub fn bound_buffer(&self, target: GLenum) -> GLuint {
        self.buffer_bindings.get(&target).copied().unwrap_or(0)
    }

    pub(crate) fn record_error(&mut self, err: GLenum) {
        self.errors.push(err);
    }
}

/// Capabilities that are tracked per texture unit.
pub(crate) fn unit_scope(cap: GLenum, unit: u32) -> u32 {
    match cap {
        gl::TEXTURE_2D
        | gl::TEXTURE_3D
        | gl::TEXTURE_CUBE_MAP
        | gl::TEXTURE_GEN_S
        | gl::TEXTURE_GEN_T
        | gl::TEXTURE_GEN_R
        | gl::TEXTURE_GEN_Q => unit,
        _ => 0,
    }
}
