//! The device object: power-on, the command surface the dispatcher calls into, and
//! teardown.
//!
//! Commands validate their arguments before touching any table or host state, then run
//! on the context they address. Work that creates host objects for surfaces runs on the
//! Shared Context and returns to the caller's binding through [`BindGuard`].

use svga3d_protocol::state::{ClearFlags, ShaderType, StretchBltMode, TextureFilter, TextureStateId, TransferType};
use svga3d_protocol::{
    Box3, CopyBox, GuestImage, LightData, Material, PrimitiveRange, Rect, RenderState, SurfaceImageId, TextureState,
    VertexDecl, VertexDivisor, ZRange, SVGA3D_INVALID_ID,
};

use crate::blit::{self, Screens};
use crate::caps::{probe_profile, HostCaps};
use crate::config::{BackendConfig, MAX_CONTEXT_IDS, MAX_SURFACE_IDS};
use crate::context::{BindGuard, Binding, Host};
use crate::devcaps;
use crate::dma::{self, GuestMemory};
use crate::draw;
use crate::error::{status_of, CommandError, CommandStatus, InitError, PlatformError};
use crate::format::FormatConverter;
use crate::gl::{consts as gl, GLuint, GlApi};
use crate::math::Mat4;
use crate::platform::{ContextRequest, NativeContext, PlatformContext};
use crate::query::{query_type, OcclusionQuery, QueryState};
use crate::shader::{self, ContextShaders, DrawShaderState, ShaderBridge};
use crate::slots::SlotMap;
use crate::state::render::{restore_scissor, set_render_state, write_masks};
use crate::state::target::{self, set_render_target, target_type, TargetImage};
use crate::state::texture::set_texture_state;
use crate::state::{transform, BoundTexture, StateShadow};
use crate::surface::{BackingUsage, HostObject, Surface, SurfaceDesc};

/// One guest context: its shadow, framebuffer, query and shaders.
#[derive(Debug, Default)]
pub struct GuestContext {
    pub state: StateShadow,
    /// Context framebuffer object, created by the first render-target bind.
    pub fbo: GLuint,
    pub query: OcclusionQuery,
    pub shaders: ContextShaders,
}

/// An OpenGL-backed SVGA3D device.
pub struct Svga3dGl {
    host: Host,
    contexts: SlotMap<GuestContext>,
    surfaces: SlotMap<Surface>,
    screens: Screens,
    bridge: Box<dyn ShaderBridge>,
    converter: Box<dyn FormatConverter>,
    powered: bool,
}

impl std::fmt::Debug for Svga3dGl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Svga3dGl")
            .field("platform", &self.host.platform.name())
            .field("contexts", &self.contexts.len())
            .field("surfaces", &self.surfaces.len())
            .field("screens", &self.screens.len())
            .field("powered", &self.powered)
            .finish()
    }
}

/// Probes the legacy profile on the bootstrap context and, when asked, the other one
/// on a throwaway context. Leaves the bootstrap context current.
fn probe(
    platform: &mut dyn PlatformContext,
    boot: &NativeContext,
    config: &BackendConfig,
) -> Result<(Box<dyn GlApi>, HostCaps), InitError> {
    platform.make_current(Some(boot))?;
    let mut gl = platform.load_gl()?;
    let primary = probe_profile(&mut *gl, boot.profile())?;
    let other = if config.dual_profile {
        probe_other(platform, &mut *gl, boot)?
    } else {
        None
    };
    let caps = HostCaps::assemble(&mut *gl, primary, other)?;
    tracing::info!(
        vendor = %caps.vendor,
        renderer = %caps.renderer,
        version = %caps.primary.version,
        tier = ?caps.tier,
        features = ?caps.features,
        "host OpenGL capabilities"
    );
    Ok((gl, caps))
}

/// Best-effort: a profile that can't be created or probed is left out.
fn probe_other(
    platform: &mut dyn PlatformContext,
    gl: &mut dyn GlApi,
    boot: &NativeContext,
) -> Result<Option<crate::caps::ProfileCaps>, InitError> {
    let profile = boot.profile().other();
    let request = match profile {
        crate::platform::Profile::Core => ContextRequest::core(),
        crate::platform::Profile::Legacy => ContextRequest::legacy(),
    };
    let ctx = match platform.create_context(&request, None) {
        Ok(ctx) => ctx,
        Err(err) => {
            tracing::warn!(?profile, %err, "second profile unavailable; using one profile only");
            return Ok(None);
        }
    };
    let probed = platform
        .make_current(Some(&ctx))
        .map_err(InitError::from)
        .and_then(|()| probe_profile(gl, profile));
    platform.make_current(Some(boot))?;
    if let Err(err) = platform.destroy_context(ctx) {
        tracing::warn!(%err, "destroying the probe context failed");
    }
    match probed {
        Ok(caps) => Ok(Some(caps)),
        Err(err) => {
            tracing::warn!(?profile, %err, "probing the second profile failed");
            Ok(None)
        }
    }
}

fn bring_up(mut platform: Box<dyn PlatformContext>, config: &BackendConfig) -> Result<Host, InitError> {
    tracing::debug!(platform = platform.name(), ?config, "powering on");
    let boot = match platform.create_context(&ContextRequest::legacy(), None) {
        Ok(boot) => boot,
        Err(err) => {
            if let Err(err) = platform.shutdown() {
                tracing::warn!(%err, "platform shutdown after a failed power-on failed");
            }
            return Err(err.into());
        }
    };
    let probed = probe(&mut *platform, &boot, config);
    if let Err(err) = platform.make_current(None) {
        tracing::warn!(%err, "unbinding the bootstrap context failed");
    }
    if let Err(err) = platform.destroy_context(boot) {
        tracing::warn!(%err, "destroying the bootstrap context failed");
    }
    let (gl, caps) = match probed {
        Ok(v) => v,
        Err(err) => {
            if let Err(err) = platform.shutdown() {
                tracing::warn!(%err, "platform shutdown after a failed power-on failed");
            }
            return Err(err);
        }
    };

    let mut host = Host::new(platform, gl, caps, config.check_host_errors);
    if let Err(err) = host.create_native(Binding::Shared) {
        host.shutdown();
        return Err(PlatformError::ContextCreation(err.to_string()).into());
    }
    Ok(host)
}

fn rect_of(size: svga3d_protocol::Size3) -> Rect {
    Rect::new(0, 0, size.width, size.height)
}

impl Svga3dGl {
    /// Brings up the host side. Failure disables 3D for the VM; it is logged once here.
    pub fn power_on(
        platform: Box<dyn PlatformContext>,
        config: &BackendConfig,
        bridge: Box<dyn ShaderBridge>,
        converter: Box<dyn FormatConverter>,
    ) -> Result<Self, InitError> {
        let host = bring_up(platform, config).map_err(|err| {
            tracing::error!(%err, "host OpenGL unusable; 3D disabled");
            err
        })?;
        Ok(Self {
            host,
            contexts: SlotMap::with_limit(MAX_CONTEXT_IDS),
            surfaces: SlotMap::with_limit(MAX_SURFACE_IDS),
            screens: Screens::default(),
            bridge,
            converter,
            powered: true,
        })
    }

    pub fn caps(&self) -> &HostCaps {
        self.host.caps()
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn context(&self, cid: u32) -> Option<&GuestContext> {
        self.contexts.get(cid)
    }

    pub fn context_ids(&self) -> impl Iterator<Item = u32> + '_ {
        self.contexts.ids()
    }

    pub fn surface(&self, sid: u32) -> Option<&Surface> {
        self.surfaces.get(sid)
    }

    pub fn screens(&self) -> &Screens {
        &self.screens
    }

    /// Native handle of a guest context, or of the Shared Context for `None`.
    pub fn native_context(&self, cid: Option<u32>) -> Option<u64> {
        match cid {
            None => self.host.native_handle(Binding::Shared),
            Some(cid) => self.host.native_handle(Binding::Guest(self.contexts.key_of(cid)?)),
        }
    }

    fn binding(&self, cid: u32) -> Result<Binding, CommandError> {
        self.contexts
            .key_of(cid)
            .map(Binding::Guest)
            .ok_or(CommandError::InvalidContext(cid))
    }

    /// Makes context `cid` current until the guard drops.
    pub fn bind(&mut self, cid: u32) -> Result<BindGuard<'_>, CommandError> {
        let binding = self.binding(cid)?;
        self.host.bind(binding)
    }

    // ---- contexts ----

    /// Creates context `cid`, replacing any context already defined there.
    pub fn define_context(&mut self, cid: u32) -> Result<(), CommandError> {
        self.contexts
            .reserve_for(cid)
            .map_err(|e| CommandError::slot("context", cid, e))?;
        if self.contexts.contains(cid) {
            tracing::debug!(cid, "redefining context");
            self.destroy_context(cid)?;
        }
        let (key, _) = self
            .contexts
            .insert(cid, GuestContext::default())
            .map_err(|e| CommandError::slot("context", cid, e))?;
        let binding = Binding::Guest(key);
        if let Err(err) = self.host.create_native(binding) {
            self.contexts.remove(cid);
            return Err(err);
        }

        let mut g = self.host.bind(binding)?;
        let gl = g.gl();
        gl.depth_func(gl::LEQUAL);
        gl.matrix_mode(gl::MODELVIEW);
        g.drain("define context");
        tracing::debug!(cid, "defined context");
        Ok(())
    }

    /// Releases everything the context owns: shaders, framebuffer, query and the native
    /// context.
    pub fn destroy_context(&mut self, cid: u32) -> Result<(), CommandError> {
        let binding = self.binding(cid)?;
        let Some(mut ctx) = self.contexts.remove(cid) else {
            return Err(CommandError::InvalidContext(cid));
        };
        match self.host.bind(binding) {
            Ok(mut g) => {
                let gl = g.gl();
                ctx.shaders.destroy_all(&mut *self.bridge, gl, cid);
                ctx.query.destroy(gl);
                if ctx.fbo != 0 {
                    gl.bind_framebuffer(gl::FRAMEBUFFER, 0);
                    gl.delete_framebuffer(ctx.fbo);
                }
                self.bridge.destroy_context(gl, cid);
                g.drain("destroy context");
            }
            Err(err) => tracing::warn!(cid, %err, "context lost before destroy; skipping host cleanup"),
        }
        self.host.destroy_native(binding);
        tracing::debug!(cid, "destroyed context");
        Ok(())
    }

    // ---- surfaces ----

    /// Defines surface `sid` from `desc`, replacing any surface already there. Host
    /// objects are created on first use.
    pub fn define_surface(&mut self, sid: u32, desc: &SurfaceDesc) -> Result<(), CommandError> {
        let surface = Surface::define(sid, desc)?;
        self.surfaces
            .reserve_for(sid)
            .map_err(|e| CommandError::slot("surface", sid, e))?;
        if self.surfaces.contains(sid) {
            self.destroy_surface(sid)?;
        }
        tracing::debug!(sid, format = %surface.format, flags = ?surface.flags, kind = ?surface.kind(), "define surface");
        self.surfaces
            .insert(sid, surface)
            .map_err(|e| CommandError::slot("surface", sid, e))?;
        Ok(())
    }

    pub fn destroy_surface(&mut self, sid: u32) -> Result<(), CommandError> {
        let mut surface = self.surfaces.remove(sid).ok_or(CommandError::InvalidSurface(sid))?;
        for (_, ctx) in self.contexts.iter_mut() {
            ctx.state.forget_surface(sid);
        }
        surface.destroy_host(&mut self.host);
        tracing::debug!(sid, "destroy surface");
        Ok(())
    }

    /// Discards pending shadow writes of surface `sid`.
    pub fn invalidate_surface(&mut self, sid: u32) -> Result<(), CommandError> {
        let surface = self.surfaces.get_mut(sid).ok_or(CommandError::InvalidSurface(sid))?;
        surface.invalidate();
        Ok(())
    }

    /// Copies the host contents of `sid` into its shadows.
    pub fn read_back_surface(&mut self, sid: u32) -> Result<(), CommandError> {
        let surface = self.surfaces.get_mut(sid).ok_or(CommandError::InvalidSurface(sid))?;
        surface.read_back(&mut self.host)
    }

    /// Shadow bytes of one image, as last written or read back.
    pub fn surface_level_data(&self, image: SurfaceImageId) -> Result<&[u8], CommandError> {
        let surface = self.surfaces.get(image.sid).ok_or(CommandError::InvalidSurface(image.sid))?;
        surface
            .level(image.face, image.mipmap)
            .map(|l| l.data.as_slice())
            .ok_or(CommandError::InvalidImage {
                sid: image.sid,
                face: image.face,
                mipmap: image.mipmap,
            })
    }

    // ---- state ----

    /// Applies a batch of render states in order, stopping at the first rejected one.
    pub fn set_render_states(&mut self, cid: u32, states: &[RenderState]) -> Result<(), CommandError> {
        let binding = self.binding(cid)?;
        let ctx = self.contexts.get_mut(cid).ok_or(CommandError::InvalidContext(cid))?;
        let mut g = self.host.bind(binding)?;
        let mut a = g.apply(&mut ctx.state);
        for rs in states {
            set_render_state(&mut a, *rs)?;
        }
        Ok(())
    }

    /// Host texture of every surface the batch binds, up to the first one that can't be
    /// resolved.
    fn resolve_textures(
        &mut self,
        states: &[TextureState],
    ) -> (Vec<BoundTexture>, Option<(usize, CommandError)>) {
        let mut resolved: Vec<BoundTexture> = Vec::new();
        for (i, ts) in states.iter().enumerate() {
            if ts.name != TextureStateId::BindTexture as u32 || ts.value == SVGA3D_INVALID_ID {
                continue;
            }
            let sid = ts.value;
            if resolved.iter().any(|t| t.sid == sid) {
                continue;
            }
            let result = match self.surfaces.get_mut(sid) {
                None => Err(CommandError::InvalidSurface(sid)),
                Some(surface) => surface
                    .ensure_backing(&mut self.host, &mut *self.converter, BackingUsage::Texture)
                    .and_then(|()| match surface.object() {
                        Some(HostObject::Texture { name, target }) => Ok(BoundTexture { sid, target, name }),
                        _ => Err(CommandError::Unsupported("texture stage bound to a non-texture surface")),
                    }),
            };
            match result {
                Ok(t) => resolved.push(t),
                Err(err) => return (resolved, Some((i, err))),
            }
        }
        (resolved, None)
    }

    /// Applies a batch of texture states in order, stopping at the first rejected one.
    /// Surfaces bound to stages get their host textures first.
    pub fn set_texture_states(&mut self, cid: u32, states: &[TextureState]) -> Result<(), CommandError> {
        let binding = self.binding(cid)?;
        let (resolved, failure) = self.resolve_textures(states);
        let valid = failure.as_ref().map_or(states.len(), |(i, _)| *i);

        let ctx = self.contexts.get_mut(cid).ok_or(CommandError::InvalidContext(cid))?;
        let mut g = self.host.bind(binding)?;
        let mut a = g.apply(&mut ctx.state).with_textures(&resolved);
        for ts in &states[..valid] {
            set_texture_state(&mut a, *ts)?;
        }
        match failure {
            Some((_, err)) => {
                tracing::warn!(cid, %err, "texture bind rejected");
                Err(err)
            }
            None => Ok(()),
        }
    }

    /// Runs `f` on the bound context `cid` with its state view.
    fn with_state<R>(
        &mut self,
        cid: u32,
        f: impl FnOnce(&mut crate::state::Apply<'_>) -> Result<R, CommandError>,
    ) -> Result<R, CommandError> {
        let binding = self.binding(cid)?;
        let ctx = self.contexts.get_mut(cid).ok_or(CommandError::InvalidContext(cid))?;
        let mut g = self.host.bind(binding)?;
        let mut a = g.apply(&mut ctx.state);
        f(&mut a)
    }

    pub fn set_transform(&mut self, cid: u32, ty: u32, matrix: Mat4) -> Result<(), CommandError> {
        self.with_state(cid, |a| transform::set_transform(a, ty, matrix))
    }

    /// Maps to the host depth range.
    pub fn set_z_range(&mut self, cid: u32, range: ZRange) -> Result<(), CommandError> {
        tracing::debug!(cid, min = range.min, max = range.max, "set z range");
        self.with_state(cid, |a| {
            a.set_z_range(range);
            Ok(())
        })
    }

    pub fn set_viewport(&mut self, cid: u32, rect: Rect) -> Result<(), CommandError> {
        tracing::debug!(cid, ?rect, "set viewport");
        self.with_state(cid, |a| {
            a.set_viewport(rect);
            Ok(())
        })
    }

    pub fn set_scissor_rect(&mut self, cid: u32, rect: Rect) -> Result<(), CommandError> {
        tracing::debug!(cid, ?rect, "set scissor rect");
        self.with_state(cid, |a| {
            a.set_scissor(rect);
            Ok(())
        })
    }

    pub fn set_material(&mut self, cid: u32, material: Material) -> Result<(), CommandError> {
        self.with_state(cid, |a| {
            transform::set_material(a, material);
            Ok(())
        })
    }

    pub fn set_light_data(&mut self, cid: u32, index: u32, data: LightData) -> Result<(), CommandError> {
        self.with_state(cid, |a| transform::set_light_data(a, index, data))
    }

    pub fn set_light_enabled(&mut self, cid: u32, index: u32, enabled: bool) -> Result<(), CommandError> {
        self.with_state(cid, |a| transform::set_light_enabled(a, index, enabled))
    }

    pub fn set_clip_plane(&mut self, cid: u32, index: u32, plane: [f32; 4]) -> Result<(), CommandError> {
        self.with_state(cid, |a| transform::set_clip_plane(a, index, plane))
    }

    /// Attaches `image` to the context framebuffer at `ty`; an invalid sid detaches.
    pub fn set_render_target(&mut self, cid: u32, ty: u32, image: SurfaceImageId) -> Result<(), CommandError> {
        let binding = self.binding(cid)?;
        let ty = target_type(ty)?;
        let target = if image.sid == SVGA3D_INVALID_ID {
            None
        } else {
            let surface = self
                .surfaces
                .get_mut(image.sid)
                .ok_or(CommandError::InvalidSurface(image.sid))?;
            surface.check_image(image.face, image.mipmap)?;
            surface.ensure_backing(&mut self.host, &mut *self.converter, BackingUsage::RenderTarget)?;
            let object = surface
                .object()
                .ok_or(CommandError::Unsupported("render target without a host object"))?;
            Some(TargetImage {
                image,
                object,
                image_target: surface.image_target(image.face),
                has_stencil: surface.host_format.has_stencil(),
            })
        };

        let ctx = self.contexts.get_mut(cid).ok_or(CommandError::InvalidContext(cid))?;
        let mut g = self.host.bind(binding)?;
        let mut a = g.apply(&mut ctx.state);
        set_render_target(&mut a, &mut ctx.fbo, ty, target)
    }

    // ---- clear ----

    /// Clears the bound targets, everywhere or inside each of `rects`. Write masks are
    /// forced on for the clear and restored afterwards.
    #[allow(clippy::too_many_arguments)]
    pub fn clear(
        &mut self,
        cid: u32,
        flags: u32,
        color: u32,
        depth: f32,
        stencil: u32,
        rects: &[Rect],
    ) -> Result<(), CommandError> {
        let flags = ClearFlags::from_bits(flags).ok_or_else(|| CommandError::unknown("clear flags", flags))?;
        let binding = self.binding(cid)?;
        let ctx = self.contexts.get_mut(cid).ok_or(CommandError::InvalidContext(cid))?;
        tracing::debug!(cid, ?flags, color, depth, stencil, rects = rects.len(), "clear");

        let mut mask = 0;
        if flags.contains(ClearFlags::COLOR) {
            mask |= gl::COLOR_BUFFER_BIT;
        }
        if flags.contains(ClearFlags::DEPTH) {
            mask |= gl::DEPTH_BUFFER_BIT;
        }
        if flags.contains(ClearFlags::STENCIL) {
            mask |= gl::STENCIL_BUFFER_BIT;
        }
        if mask == 0 {
            return Ok(());
        }

        let mut g = self.host.bind(binding)?;
        let mut a = g.apply(&mut ctx.state);
        if ctx.fbo != 0 {
            a.gl.bind_framebuffer(gl::FRAMEBUFFER, ctx.fbo);
        }
        a.gl.clear_color(crate::state::argb(color));
        a.gl.clear_depth(f64::from(depth));
        a.gl.clear_stencil(stencil as i32);
        write_masks(&mut a, true);
        if rects.is_empty() {
            a.gl.disable(gl::SCISSOR_TEST);
            a.gl.clear(mask);
        } else {
            a.gl.enable(gl::SCISSOR_TEST);
            for r in rects {
                a.gl.scissor(r.x as i32, r.y as i32, r.w, r.h);
                a.gl.clear(mask);
            }
        }
        write_masks(&mut a, false);
        restore_scissor(&mut a);
        a.trace("clear");
        Ok(())
    }

    // ---- shaders ----

    pub fn define_shader(&mut self, cid: u32, shid: u32, ty: u32, bytecode: &[u8]) -> Result<(), CommandError> {
        let binding = self.binding(cid)?;
        let ctx = self.contexts.get_mut(cid).ok_or(CommandError::InvalidContext(cid))?;
        let mut g = self.host.bind(binding)?;
        ctx.shaders.define(&mut *self.bridge, g.gl(), cid, shid, ty, bytecode)
    }

    pub fn destroy_shader(&mut self, cid: u32, shid: u32, ty: u32) -> Result<(), CommandError> {
        let binding = self.binding(cid)?;
        let ctx = self.contexts.get_mut(cid).ok_or(CommandError::InvalidContext(cid))?;
        let mut g = self.host.bind(binding)?;
        ctx.shaders.destroy(&mut *self.bridge, g.gl(), cid, shid, ty)
    }

    /// Activates shader `shid` of type `ty`; `SVGA3D_INVALID_ID` unbinds.
    pub fn set_shader(&mut self, cid: u32, ty: u32, shid: u32) -> Result<(), CommandError> {
        let binding = self.binding(cid)?;
        let ctx = self.contexts.get_mut(cid).ok_or(CommandError::InvalidContext(cid))?;
        let mut g = self.host.bind(binding)?;
        tracing::debug!(cid, ty, shid, "set shader");
        ctx.shaders.set(&mut *self.bridge, g.gl(), cid, ty, shid)
    }

    pub fn set_shader_constants(
        &mut self,
        cid: u32,
        start: u32,
        ty: u32,
        const_type: u32,
        values: &[[u32; 4]],
    ) -> Result<(), CommandError> {
        let binding = self.binding(cid)?;
        let mut g = self.host.bind(binding)?;
        shader::set_constants(&mut *self.bridge, g.gl(), cid, start, ty, const_type, values)
    }

    // ---- draws ----

    pub fn draw_primitives(
        &mut self,
        cid: u32,
        decls: &[VertexDecl],
        ranges: &[PrimitiveRange],
        divisors: &[VertexDivisor],
    ) -> Result<(), CommandError> {
        let binding = self.binding(cid)?;
        let call = draw::prepare(
            &mut self.surfaces,
            &mut self.host,
            &mut *self.converter,
            decls,
            ranges,
            divisors,
        )?;

        let ctx = self.contexts.get_mut(cid).ok_or(CommandError::InvalidContext(cid))?;
        let mut g = self.host.bind(binding)?;
        let vertex = ctx.shaders.active_handle(ShaderType::Vs);
        let pixel = ctx.shaders.active_handle(ShaderType::Ps);
        if vertex.is_some() || pixel.is_some() {
            let state = DrawShaderState {
                vertex,
                pixel,
                viewport: ctx.state.viewport,
            };
            self.bridge
                .update_state(g.gl(), cid, &state)
                .map_err(CommandError::ShaderBridge)?;
        }
        let generic = vertex.is_some();
        let mut a = g.apply(&mut ctx.state);
        if ctx.fbo != 0 {
            target::bind_framebuffer(&mut a, &mut ctx.fbo);
        }
        draw::execute(&mut a, &call, generic)
    }

    // ---- transfers ----

    /// Moves `boxes` of `image` between guest memory and the surface.
    pub fn surface_dma(
        &mut self,
        memory: &dyn GuestMemory,
        guest: GuestImage,
        image: SurfaceImageId,
        transfer: u32,
        boxes: &[CopyBox],
    ) -> Result<(), CommandError> {
        let transfer =
            TransferType::from_u32(transfer).ok_or_else(|| CommandError::unknown("transfer type", transfer))?;
        let surface = self
            .surfaces
            .get_mut(image.sid)
            .ok_or(CommandError::InvalidSurface(image.sid))?;
        dma::surface_dma(
            surface,
            &mut self.host,
            &mut *self.converter,
            memory,
            guest,
            image,
            transfer,
            boxes,
        )
    }

    pub fn surface_copy(&mut self, src: SurfaceImageId, dst: SurfaceImageId, boxes: &[CopyBox]) -> Result<(), CommandError> {
        blit::surface_copy(&mut self.surfaces, &mut self.host, &mut *self.converter, src, dst, boxes)
    }

    pub fn surface_stretch_blt(
        &mut self,
        src: SurfaceImageId,
        dst: SurfaceImageId,
        src_box: Box3,
        dst_box: Box3,
        mode: u32,
    ) -> Result<(), CommandError> {
        let mode = StretchBltMode::from_u32(mode).ok_or_else(|| CommandError::unknown("stretch blt mode", mode))?;
        blit::surface_stretch_blt(
            &mut self.surfaces,
            &mut self.host,
            &mut *self.converter,
            src,
            dst,
            src_box,
            dst_box,
            mode,
        )
    }

    /// Rebuilds levels 1.. of `sid` from level 0 on the host.
    pub fn generate_mipmaps(&mut self, sid: u32, filter: u32) -> Result<(), CommandError> {
        let filter = TextureFilter::from_u32(filter).ok_or_else(|| CommandError::unknown("mipmap filter", filter))?;
        let surface = self.surfaces.get_mut(sid).ok_or(CommandError::InvalidSurface(sid))?;
        if surface.host_format.compressed || surface.host_format.emulated || surface.is_depth() {
            return Err(CommandError::Unsupported("mipmap generation for this format"));
        }
        surface.ensure_backing(&mut self.host, &mut *self.converter, BackingUsage::Texture)?;
        let Some(HostObject::Texture { name, target }) = surface.object() else {
            return Err(CommandError::Unsupported("mipmap generation without a texture"));
        };
        tracing::debug!(sid, %filter, "generate mipmaps");

        let mut g = self.host.bind(Binding::Shared)?;
        let gl = g.gl();
        gl.bind_texture(target, name);
        gl.generate_mipmap(target);
        gl.bind_texture(target, 0);
        g.drain("generate mipmaps");
        Ok(())
    }

    // ---- screens ----

    pub fn define_screen(&mut self, id: u32, width: u32, height: u32) -> Result<(), CommandError> {
        self.screens.define(&mut self.host, id, width, height)
    }

    pub fn destroy_screen(&mut self, id: u32) -> Result<(), CommandError> {
        if self.screens.destroy(&mut self.host, id) {
            Ok(())
        } else {
            Err(CommandError::InvalidScreen(id))
        }
    }

    pub fn blit_surface_to_screen(
        &mut self,
        screen: u32,
        dest: Rect,
        src: SurfaceImageId,
        src_rect: Rect,
    ) -> Result<(), CommandError> {
        self.screens.blit_from_surface(
            &mut self.surfaces,
            &mut self.host,
            &mut *self.converter,
            screen,
            dest,
            src,
            src_rect,
        )
    }

    /// The overlay of `screen` as BGRA rows, top row first.
    pub fn screen_contents(&mut self, screen: u32) -> Result<Vec<u8>, CommandError> {
        self.screens.contents(&mut self.host, screen)
    }

    /// Copies `rects` of surface `sid` to the same place on screen 0; no rects means the
    /// whole surface.
    pub fn present(&mut self, sid: u32, rects: &[Rect]) -> Result<(), CommandError> {
        let size = self
            .surfaces
            .get(sid)
            .ok_or(CommandError::InvalidSurface(sid))?
            .level(0, 0)
            .map(|l| l.size)
            .ok_or(CommandError::InvalidImage { sid, face: 0, mipmap: 0 })?;
        let whole = [rect_of(size)];
        let rects = if rects.is_empty() { &whole[..] } else { rects };
        let image = SurfaceImageId::new(sid, 0, 0);
        for r in rects {
            self.blit_surface_to_screen(0, *r, image, *r)?;
        }
        Ok(())
    }

    // ---- occlusion queries ----

    fn check_query_type(ty: u32) -> Result<(), CommandError> {
        query_type(ty).map(|_| ())
    }

    pub fn occlusion_query_begin(&mut self, cid: u32, ty: u32) -> Result<(), CommandError> {
        Self::check_query_type(ty)?;
        let binding = self.binding(cid)?;
        let ctx = self.contexts.get_mut(cid).ok_or(CommandError::InvalidContext(cid))?;
        let mut g = self.host.bind(binding)?;
        ctx.query.begin(g.gl());
        g.trace("begin query");
        Ok(())
    }

    pub fn occlusion_query_end(&mut self, cid: u32, ty: u32) -> Result<(), CommandError> {
        Self::check_query_type(ty)?;
        let binding = self.binding(cid)?;
        let ctx = self.contexts.get_mut(cid).ok_or(CommandError::InvalidContext(cid))?;
        let mut g = self.host.bind(binding)?;
        ctx.query.end(g.gl())?;
        g.trace("end query");
        Ok(())
    }

    /// Samples that passed between begin and end. Waits for the host.
    pub fn occlusion_query_get_data(&mut self, cid: u32, ty: u32) -> Result<u32, CommandError> {
        Self::check_query_type(ty)?;
        let binding = self.binding(cid)?;
        let ctx = self.contexts.get_mut(cid).ok_or(CommandError::InvalidContext(cid))?;
        let mut g = self.host.bind(binding)?;
        let samples = ctx.query.result(g.gl())?;
        tracing::trace!(cid, samples, "occlusion query result");
        Ok(samples)
    }

    pub fn occlusion_query_state(&self, cid: u32) -> Result<QueryState, CommandError> {
        self.contexts
            .get(cid)
            .map(|c| c.query.state())
            .ok_or(CommandError::InvalidContext(cid))
    }

    // ---- capabilities ----

    /// Value of device capability `index`; floating-point values come back as `f32` bits.
    pub fn query_capability(&self, index: u32) -> Result<u32, CommandError> {
        devcaps::query(self.host.caps(), index)
    }

    // ---- dispatcher statuses ----

    pub fn define_context_status(&mut self, cid: u32) -> CommandStatus {
        status_of("define context", &self.define_context(cid))
    }

    pub fn destroy_context_status(&mut self, cid: u32) -> CommandStatus {
        status_of("destroy context", &self.destroy_context(cid))
    }

    pub fn define_surface_status(&mut self, sid: u32, desc: &SurfaceDesc) -> CommandStatus {
        status_of("define surface", &self.define_surface(sid, desc))
    }

    pub fn destroy_surface_status(&mut self, sid: u32) -> CommandStatus {
        status_of("destroy surface", &self.destroy_surface(sid))
    }

    pub fn set_render_states_status(&mut self, cid: u32, states: &[RenderState]) -> CommandStatus {
        status_of("set render state", &self.set_render_states(cid, states))
    }

    pub fn set_texture_states_status(&mut self, cid: u32, states: &[TextureState]) -> CommandStatus {
        status_of("set texture state", &self.set_texture_states(cid, states))
    }

    pub fn draw_primitives_status(
        &mut self,
        cid: u32,
        decls: &[VertexDecl],
        ranges: &[PrimitiveRange],
        divisors: &[VertexDivisor],
    ) -> CommandStatus {
        status_of("draw primitives", &self.draw_primitives(cid, decls, ranges, divisors))
    }

    pub fn surface_dma_status(
        &mut self,
        memory: &dyn GuestMemory,
        guest: GuestImage,
        image: SurfaceImageId,
        transfer: u32,
        boxes: &[CopyBox],
    ) -> CommandStatus {
        status_of("surface dma", &self.surface_dma(memory, guest, image, transfer, boxes))
    }

    pub fn query_capability_status(&self, index: u32) -> (CommandStatus, u32) {
        let result = self.query_capability(index);
        let status = status_of("query capability", &result);
        (status, result.unwrap_or(0))
    }

    // ---- lifecycle ----

    /// Destroys every context, surface and screen. Capabilities and the Shared Context
    /// survive.
    pub fn reset(&mut self) {
        tracing::debug!(
            contexts = self.contexts.len(),
            surfaces = self.surfaces.len(),
            screens = self.screens.len(),
            "reset"
        );
        let cids: Vec<u32> = self.contexts.ids().collect();
        for cid in cids {
            if let Err(err) = self.destroy_context(cid) {
                tracing::warn!(cid, %err, "destroying context during reset failed");
            }
        }
        for (_, mut surface) in self.surfaces.drain() {
            surface.destroy_host(&mut self.host);
        }
        self.screens.destroy_all(&mut self.host);
        if let Ok(mut g) = self.host.bind(Binding::Shared) {
            g.release_blit_framebuffers();
        }
    }

    /// `reset()`, then the Shared Context and the platform go away.
    pub fn power_off(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if !self.powered {
            return;
        }
        self.reset();
        self.host.shutdown();
        self.powered = false;
        tracing::debug!("powered off");
    }
}

impl Drop for Svga3dGl {
    fn drop(&mut self) {
        self.shutdown();
    }
}
