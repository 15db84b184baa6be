//! Deterministic in-process host for tests and headless runs.
//!
//! [`SoftPlatform`] creates "native" contexts, [`SoftGl`] executes GL calls against plain
//! Rust data structures, and [`SoftHost`] lets tests look at the result. There is no
//! rasteriser: clears, blits, readbacks and mip generation operate on stored images, and
//! draws are recorded with every vertex's fetched attributes. Occlusion queries count
//! submitted vertices.

mod api;
mod fetch;
mod pixels;
mod state;

use std::cell::{Ref, RefCell};
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::error::{InitError, PlatformError};
use crate::gl::{consts as gl, GLenum, GLuint, GlApi, OptionalEntryPoint};
use crate::platform::{ContextRequest, NativeContext, PlatformContext, Profile};

pub use state::{
    ArrayPointer, Attachment, AttribSlot, DrawRecord, Namespace, SoftContextState,
    SoftFramebuffer, SoftImage, SoftLight, SoftRenderbuffer, SoftTexture, StencilFace,
};

/// Strings one profile of the software host reports.
#[derive(Clone, Debug)]
pub struct SoftProfileInfo {
    pub version: String,
    pub glsl_version: String,
    pub extensions: Vec<String>,
}

#[derive(Clone, Debug)]
pub struct SoftConfig {
    pub vendor: String,
    pub renderer: String,
    pub legacy: SoftProfileInfo,
    pub core: SoftProfileInfo,
    /// Values returned for limit queries (`glGetIntegerv`/`glGetFloatv`).
    pub limits: HashMap<GLenum, Vec<f32>>,
    pub missing_entry_points: HashSet<OptionalEntryPoint>,
    pub fail_context_creation: bool,
}

fn ext_list(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| (*s).to_owned()).collect()
}

impl Default for SoftConfig {
    fn default() -> Self {
        let limits: HashMap<GLenum, Vec<f32>> = [
            (gl::MAX_LIGHTS, vec![8.0]),
            (gl::MAX_CLIP_PLANES, vec![6.0]),
            (gl::MAX_TEXTURE_SIZE, vec![8192.0]),
            (gl::MAX_RECTANGLE_TEXTURE_SIZE, vec![16384.0]),
            (gl::MAX_3D_TEXTURE_SIZE, vec![2048.0]),
            (gl::MAX_CUBE_MAP_TEXTURE_SIZE, vec![16384.0]),
            (gl::MAX_TEXTURE_UNITS, vec![8.0]),
            (gl::MAX_TEXTURE_COORDS, vec![8.0]),
            (gl::MAX_TEXTURE_IMAGE_UNITS, vec![16.0]),
            (gl::MAX_VERTEX_TEXTURE_IMAGE_UNITS, vec![16.0]),
            (gl::MAX_DRAW_BUFFERS, vec![8.0]),
            (gl::MAX_COLOR_ATTACHMENTS, vec![8.0]),
            (gl::MAX_TEXTURE_MAX_ANISOTROPY, vec![16.0]),
            (gl::MAX_TEXTURE_LOD_BIAS, vec![15.0]),
            (gl::ALIASED_POINT_SIZE_RANGE, vec![1.0, 64.0]),
            (gl::SMOOTH_POINT_SIZE_RANGE, vec![1.0, 64.0]),
            (gl::ALIASED_LINE_WIDTH_RANGE, vec![1.0, 10.0]),
            (gl::MAX_VERTEX_ATTRIBS, vec![16.0]),
            (gl::MAX_VERTEX_UNIFORM_COMPONENTS, vec![4096.0]),
            (gl::MAX_FRAGMENT_UNIFORM_COMPONENTS, vec![4096.0]),
            (gl::MAX_ELEMENTS_VERTICES, vec![1_048_576.0]),
            (gl::MAX_ELEMENTS_INDICES, vec![1_048_576.0]),
            (gl::MAX_VIEWPORT_DIMS, vec![16384.0, 16384.0]),
            (gl::MAX_SAMPLES, vec![4.0]),
        ]
        .into_iter()
        .collect();

        Self {
            vendor: "svga3d".to_owned(),
            renderer: "svga3d soft host".to_owned(),
            legacy: SoftProfileInfo {
                version: "3.0 svga3d-soft".to_owned(),
                glsl_version: "1.30".to_owned(),
                extensions: ext_list(&[
                    "GL_ARB_vertex_program",
                    "GL_ARB_fragment_program",
                    "GL_ARB_shader_texture_lod",
                    "GL_ARB_texture_rectangle",
                    "GL_ARB_draw_instanced",
                    "GL_ARB_instanced_arrays",
                    "GL_ARB_draw_elements_base_vertex",
                    "GL_EXT_texture_compression_s3tc",
                    "GL_EXT_texture_filter_anisotropic",
                    "GL_EXT_secondary_color",
                    "GL_EXT_fog_coord",
                    "GL_NV_fog_distance",
                ]),
            },
            core: SoftProfileInfo {
                version: "4.1 svga3d-soft core".to_owned(),
                glsl_version: "4.10".to_owned(),
                extensions: ext_list(&[
                    "GL_ARB_instanced_arrays",
                    "GL_EXT_texture_compression_s3tc",
                    "GL_EXT_texture_filter_anisotropic",
                ]),
            },
            limits,
            missing_entry_points: HashSet::new(),
            fail_context_creation: false,
        }
    }
}

/// The whole simulated driver: contexts, share groups and the current binding.
#[derive(Debug)]
pub struct SoftWorld {
    pub config: SoftConfig,
    pub contexts: HashMap<u64, SoftContextState>,
    pub namespaces: HashMap<u64, Namespace>,
    pub current: Option<u64>,
    pub make_current_calls: usize,
    pub contexts_created: usize,
    pub shut_down: bool,
    next_handle: u64,
    next_namespace: u64,
    injected_errors: Vec<GLenum>,
}

impl SoftWorld {
    fn new(config: SoftConfig) -> Self {
        Self {
            config,
            contexts: HashMap::new(),
            namespaces: HashMap::new(),
            current: None,
            make_current_calls: 0,
            contexts_created: 0,
            shut_down: false,
            next_handle: 0,
            next_namespace: 0,
            injected_errors: Vec::new(),
        }
    }

    fn limit(&self, pname: GLenum) -> Option<f32> {
        self.config.limits.get(&pname).and_then(|v| v.first().copied())
    }

    /// The namespace a context's objects live in.
    pub fn namespace_of(&self, handle: u64) -> Option<&Namespace> {
        let ctx = self.contexts.get(&handle)?;
        self.namespaces.get(&ctx.namespace)
    }
}

/// Test-side view of the software host.
#[derive(Clone)]
pub struct SoftHost {
    world: Rc<RefCell<SoftWorld>>,
}

impl SoftHost {
    pub fn with_world<R>(&self, f: impl FnOnce(&SoftWorld) -> R) -> R {
        f(&self.world.borrow())
    }

    pub fn with_world_mut<R>(&self, f: impl FnOnce(&mut SoftWorld) -> R) -> R {
        f(&mut self.world.borrow_mut())
    }

    pub fn context(&self, handle: u64) -> Option<Ref<'_, SoftContextState>> {
        Ref::filter_map(self.world.borrow(), |w| w.contexts.get(&handle)).ok()
    }

    pub fn current_context(&self) -> Option<u64> {
        self.world.borrow().current
    }

    pub fn live_contexts(&self) -> usize {
        self.world.borrow().contexts.len()
    }

    pub fn texture_image(&self, ctx: u64, name: GLuint, image_target: GLenum, level: u32) -> Option<SoftImage> {
        self.with_world(|w| {
            w.namespace_of(ctx)?
                .textures
                .get(&name)?
                .images
                .get(&(image_target, level))
                .cloned()
        })
    }

    pub fn texture(&self, ctx: u64, name: GLuint) -> Option<SoftTexture> {
        self.with_world(|w| w.namespace_of(ctx)?.textures.get(&name).cloned())
    }

    pub fn buffer(&self, ctx: u64, name: GLuint) -> Option<Vec<u8>> {
        self.with_world(|w| w.namespace_of(ctx)?.buffers.get(&name).cloned())
    }

    pub fn renderbuffer(&self, ctx: u64, name: GLuint) -> Option<SoftRenderbuffer> {
        self.with_world(|w| w.namespace_of(ctx)?.renderbuffers.get(&name).cloned())
    }

    /// Live texture names of a context's share group.
    pub fn texture_count(&self, ctx: u64) -> usize {
        self.with_world(|w| w.namespace_of(ctx).map_or(0, |ns| ns.textures.len()))
    }

    /// Queues an error the next `glGetError` reports, regardless of the current context.
    pub fn inject_error(&self, err: GLenum) {
        self.world.borrow_mut().injected_errors.push(err);
    }

    pub fn is_shut_down(&self) -> bool {
        self.world.borrow().shut_down
    }
}

/// [`PlatformContext`] backed by the software host.
pub struct SoftPlatform {
    world: Rc<RefCell<SoftWorld>>,
}

impl SoftPlatform {
    pub fn new(config: SoftConfig) -> (Self, SoftHost) {
        let world = Rc::new(RefCell::new(SoftWorld::new(config)));
        let host = SoftHost {
            world: Rc::clone(&world),
        };
        (Self { world }, host)
    }

    pub fn with_defaults() -> (Self, SoftHost) {
        Self::new(SoftConfig::default())
    }
}

impl PlatformContext for SoftPlatform {
    fn name(&self) -> &'static str {
        "soft"
    }

    fn create_context(
        &mut self,
        request: &ContextRequest,
        share: Option<&NativeContext>,
    ) -> Result<NativeContext, PlatformError> {
        let mut w = self.world.borrow_mut();
        if w.config.fail_context_creation {
            return Err(PlatformError::ContextCreation("soft host configured to fail".into()));
        }
        let namespace = match share {
            Some(s) => w
                .contexts
                .get(&s.handle())
                .map(|c| c.namespace)
                .ok_or(PlatformError::UnknownContext)?,
            None => {
                w.next_namespace += 1;
                let id = w.next_namespace;
                w.namespaces.insert(id, Namespace::default());
                id
            }
        };
        w.next_handle += 1;
        let handle = w.next_handle;
        let max_lights = w.limit(gl::MAX_LIGHTS).unwrap_or(8.0) as usize;
        let max_planes = w.limit(gl::MAX_CLIP_PLANES).unwrap_or(6.0) as usize;
        w.contexts.insert(
            handle,
            SoftContextState::new(handle, namespace, request.profile, max_lights, max_planes),
        );
        if let Some(ns) = w.namespaces.get_mut(&namespace) {
            ns.contexts += 1;
        }
        w.contexts_created += 1;
        Ok(NativeContext::new(handle, request.profile))
    }

    fn destroy_context(&mut self, ctx: NativeContext) -> Result<(), PlatformError> {
        let mut w = self.world.borrow_mut();
        let state = w
            .contexts
            .remove(&ctx.handle())
            .ok_or(PlatformError::UnknownContext)?;
        if w.current == Some(ctx.handle()) {
            w.current = None;
        }
        let orphaned = match w.namespaces.get_mut(&state.namespace) {
            Some(ns) => {
                ns.contexts = ns.contexts.saturating_sub(1);
                ns.contexts == 0
            }
            None => false,
        };
        if orphaned {
            w.namespaces.remove(&state.namespace);
        }
        Ok(())
    }

    fn make_current(&mut self, ctx: Option<&NativeContext>) -> Result<(), PlatformError> {
        let mut w = self.world.borrow_mut();
        w.make_current_calls += 1;
        match ctx {
            Some(c) if !w.contexts.contains_key(&c.handle()) => Err(PlatformError::MakeCurrent),
            Some(c) => {
                w.current = Some(c.handle());
                Ok(())
            }
            None => {
                w.current = None;
                Ok(())
            }
        }
    }

    fn proc_address(&mut self, _name: &str) -> *const core::ffi::c_void {
        core::ptr::null()
    }

    fn load_gl(&mut self) -> Result<Box<dyn GlApi>, InitError> {
        Ok(Box::new(SoftGl {
            world: Rc::clone(&self.world),
        }))
    }

    fn shutdown(&mut self) -> Result<(), PlatformError> {
        let mut w = self.world.borrow_mut();
        w.current = None;
        w.shut_down = true;
        Ok(())
    }
}

/// [`GlApi`] over the software host; calls apply to the current context.
pub struct SoftGl {
    world: Rc<RefCell<SoftWorld>>,
}
