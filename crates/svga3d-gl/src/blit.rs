//! Surface-to-surface copies, stretch blits and screen targets.
//!
//! Images the host can attach to a framebuffer are copied by the Shared Context with
//! `glBlitFramebuffer` through its two copy framebuffers. Everything else (buffers,
//! compressed data, writes into emulated formats) is copied between shadows when the
//! formats agree.

use std::collections::BTreeMap;

use svga3d_protocol::state::StretchBltMode;
use svga3d_protocol::{Box3, CopyBox, Rect, Size3, SurfaceImageId};

use crate::config::MAX_SCREENS;
use crate::context::{Binding, BlitFramebuffers, Host};
use crate::error::CommandError;
use crate::format::{FormatConverter, EMULATED_PRIMARY};
use crate::gl::{consts as gl, BlitRect, Extent, GLbitfield, GLenum, GLuint, GlApi};
use crate::slots::SlotMap;
use crate::surface::{with_pixel_store, BackingUsage, HostObject, Surface};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Aspect {
    Color,
    Depth,
    DepthStencil,
}

impl Aspect {
    fn of(surface: &Surface) -> Self {
        if !surface.is_depth() {
            Aspect::Color
        } else if surface.host_format.has_stencil() {
            Aspect::DepthStencil
        } else {
            Aspect::Depth
        }
    }

    fn attachment(self) -> GLenum {
        match self {
            Aspect::Color => gl::COLOR_ATTACHMENT0,
            Aspect::Depth => gl::DEPTH_ATTACHMENT,
            Aspect::DepthStencil => gl::DEPTH_STENCIL_ATTACHMENT,
        }
    }

    fn mask(self) -> GLbitfield {
        match self {
            Aspect::Color => gl::COLOR_BUFFER_BIT,
            Aspect::Depth => gl::DEPTH_BUFFER_BIT,
            Aspect::DepthStencil => gl::DEPTH_BUFFER_BIT | gl::STENCIL_BUFFER_BIT,
        }
    }
}

/// One attachable host image.
#[derive(Clone, Copy, Debug)]
struct Endpoint {
    object: HostObject,
    image_target: GLenum,
    level: u32,
    aspect: Aspect,
}

impl Endpoint {
    /// `None` when the image cannot be a framebuffer attachment.
    fn of(surface: &Surface, face: u32, level: u32, as_destination: bool) -> Option<Self> {
        let object = surface.object()?;
        match object {
            HostObject::Buffer { .. } => return None,
            HostObject::Texture { .. } if surface.host_format.compressed => return None,
            HostObject::Texture { .. } if as_destination && surface.host_format.emulated => return None,
            _ => {}
        }
        surface.level(face, level)?;
        Some(Self {
            object,
            image_target: surface.image_target(face),
            level,
            aspect: Aspect::of(surface),
        })
    }

    fn attach(&self, gl: &mut dyn GlApi, target: GLenum, layer: u32) {
        match self.object {
            HostObject::Texture { name, .. } => {
                gl.framebuffer_texture(target, self.aspect.attachment(), self.image_target, name, self.level, layer)
            }
            HostObject::Renderbuffer { name } => gl.framebuffer_renderbuffer(target, self.aspect.attachment(), name),
            HostObject::Buffer { .. } => {}
        }
    }

    fn detach(&self, gl: &mut dyn GlApi, target: GLenum) {
        match self.object {
            HostObject::Renderbuffer { .. } => gl.framebuffer_renderbuffer(target, self.aspect.attachment(), 0),
            _ => gl.framebuffer_texture(target, self.aspect.attachment(), self.image_target, 0, 0, 0),
        }
    }
}

/// One slice pair of a framebuffer blit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct BlitPass {
    src: BlitRect,
    src_layer: u32,
    dst: BlitRect,
    dst_layer: u32,
}

fn rect(x: u32, y: u32, w: u32, h: u32) -> BlitRect {
    BlitRect {
        x0: x as i32,
        y0: y as i32,
        x1: (x + w) as i32,
        y1: (y + h) as i32,
    }
}

fn blit_pass(
    gl: &mut dyn GlApi,
    fbs: BlitFramebuffers,
    src: &Endpoint,
    dst: &Endpoint,
    pass: &BlitPass,
    filter: GLenum,
) -> Result<(), CommandError> {
    gl.bind_framebuffer(gl::READ_FRAMEBUFFER, fbs.read);
    src.attach(gl, gl::READ_FRAMEBUFFER, pass.src_layer);
    gl.bind_framebuffer(gl::DRAW_FRAMEBUFFER, fbs.draw);
    dst.attach(gl, gl::DRAW_FRAMEBUFFER, pass.dst_layer);
    if src.aspect == Aspect::Color {
        gl.read_buffer(gl::COLOR_ATTACHMENT0);
        gl.draw_buffers(&[gl::COLOR_ATTACHMENT0]);
    }
    for target in [gl::READ_FRAMEBUFFER, gl::DRAW_FRAMEBUFFER] {
        let status = gl.check_framebuffer_status(target);
        if status != gl::FRAMEBUFFER_COMPLETE {
            return Err(CommandError::FramebufferIncomplete { op: "surface blit", status });
        }
    }
    gl.blit_framebuffer(pass.src, pass.dst, src.aspect.mask(), filter);
    Ok(())
}

/// Runs the passes on the Shared Context and leaves both copy framebuffers empty.
fn framebuffer_blit(
    host: &mut Host,
    src: &Endpoint,
    dst: &Endpoint,
    passes: &[BlitPass],
    filter: GLenum,
) -> Result<(), CommandError> {
    if src.aspect != dst.aspect {
        return Err(CommandError::Unsupported("blit between color and depth surfaces"));
    }
    // Depth and stencil data cannot be filtered.
    let filter = if src.aspect == Aspect::Color { filter } else { gl::NEAREST };

    let mut g = host.bind(Binding::Shared)?;
    let fbs = g.blit_framebuffers();
    let mut outcome = Ok(());
    for pass in passes {
        if let Err(err) = blit_pass(g.gl(), fbs, src, dst, pass, filter) {
            outcome = Err(err);
            break;
        }
    }
    let gl = g.gl();
    gl.bind_framebuffer(gl::READ_FRAMEBUFFER, fbs.read);
    src.detach(gl, gl::READ_FRAMEBUFFER);
    gl.bind_framebuffer(gl::DRAW_FRAMEBUFFER, fbs.draw);
    dst.detach(gl, gl::DRAW_FRAMEBUFFER);
    gl.bind_framebuffer(gl::FRAMEBUFFER, 0);
    if let Some(code) = g.drain("surface blit") {
        tracing::warn!(code, "host reported an error during a surface blit");
    }
    outcome
}

/// Copy box clipped so both the source and destination stay inside their levels.
fn clip_copy(b: &CopyBox, src: Size3, dst: Size3) -> Option<CopyBox> {
    if b.x >= dst.width || b.y >= dst.height || b.z >= dst.depth {
        return None;
    }
    if b.srcx >= src.width || b.srcy >= src.height || b.srcz >= src.depth {
        return None;
    }
    let w = b.w.min(dst.width - b.x).min(src.width - b.srcx);
    let h = b.h.min(dst.height - b.y).min(src.height - b.srcy);
    let d = b.d.min(dst.depth - b.z).min(src.depth - b.srcz);
    (w > 0 && h > 0 && d > 0).then_some(CopyBox { w, h, d, ..*b })
}

fn clip_box(b: &Box3, size: Size3) -> Option<Box3> {
    if b.x >= size.width || b.y >= size.height || b.z >= size.depth {
        return None;
    }
    let w = b.w.min(size.width - b.x);
    let h = b.h.min(size.height - b.y);
    let d = b.d.max(1).min(size.depth - b.z);
    (w > 0 && h > 0).then_some(Box3 { w, h, d, ..*b })
}

fn surface_pair<'a>(
    surfaces: &'a SlotMap<Surface>,
    src: &SurfaceImageId,
    dst: &SurfaceImageId,
) -> Result<(&'a Surface, &'a Surface), CommandError> {
    let s = surfaces.get(src.sid).ok_or(CommandError::InvalidSurface(src.sid))?;
    let d = surfaces.get(dst.sid).ok_or(CommandError::InvalidSurface(dst.sid))?;
    s.check_image(src.face, src.mipmap)?;
    d.check_image(dst.face, dst.mipmap)?;
    Ok((s, d))
}

fn ensure(
    surfaces: &mut SlotMap<Surface>,
    host: &mut Host,
    converter: &mut dyn FormatConverter,
    sid: u32,
) -> Result<(), CommandError> {
    surfaces
        .get_mut(sid)
        .ok_or(CommandError::InvalidSurface(sid))?
        .ensure_backing(host, converter, BackingUsage::Transfer)
}

/// Copies equal-format blocks between shadows, then pushes the destination level.
fn shadow_copy(
    surfaces: &mut SlotMap<Surface>,
    host: &mut Host,
    converter: &mut dyn FormatConverter,
    src: &SurfaceImageId,
    dst: &SurfaceImageId,
    boxes: &[CopyBox],
) -> Result<(), CommandError> {
    let (source, pitch, slice) = {
        let s = surfaces.get_mut(src.sid).ok_or(CommandError::InvalidSurface(src.sid))?;
        s.sync_level(host, src.face, src.mipmap)?;
        let level = s.level(src.face, src.mipmap).ok_or(CommandError::InvalidImage {
            sid: src.sid,
            face: src.face,
            mipmap: src.mipmap,
        })?;
        (level.data.clone(), level.pitch as usize, level.slice_bytes())
    };
    let d = surfaces.get_mut(dst.sid).ok_or(CommandError::InvalidSurface(dst.sid))?;
    let block = d.host_format.block;
    d.sync_level(host, dst.face, dst.mipmap)?;
    {
        let level = d.level_mut(dst.face, dst.mipmap).ok_or(CommandError::InvalidImage {
            sid: dst.sid,
            face: dst.face,
            mipmap: dst.mipmap,
        })?;
        let dst_pitch = level.pitch as usize;
        let dst_slice = level.slice_bytes();
        for b in boxes {
            if b.x % block.width != 0 || b.y % block.height != 0 || b.srcx % block.width != 0 || b.srcy % block.height != 0 {
                return Err(CommandError::InvalidBox { sid: dst.sid });
            }
            let row_bytes = (block.blocks_wide(b.w) * block.bytes) as usize;
            for z in 0..b.d {
                for row in 0..block.blocks_high(b.h) {
                    let s_off = (b.srcz + z) as usize * slice
                        + (b.srcy / block.height + row) as usize * pitch
                        + (b.srcx / block.width * block.bytes) as usize;
                    let d_off = (b.z + z) as usize * dst_slice
                        + (b.y / block.height + row) as usize * dst_pitch
                        + (b.x / block.width * block.bytes) as usize;
                    let (Some(from), Some(to)) = (
                        source.get(s_off..s_off + row_bytes),
                        level.data.get_mut(d_off..d_off + row_bytes),
                    ) else {
                        return Err(CommandError::InvalidBox { sid: dst.sid });
                    };
                    to.copy_from_slice(from);
                }
            }
        }
    }
    d.flush_level(host, converter, dst.face, dst.mipmap)
}

/// `SURFACE_COPY`: same-size copies of boxes between two images.
pub fn surface_copy(
    surfaces: &mut SlotMap<Surface>,
    host: &mut Host,
    converter: &mut dyn FormatConverter,
    src: SurfaceImageId,
    dst: SurfaceImageId,
    boxes: &[CopyBox],
) -> Result<(), CommandError> {
    let clipped: Vec<CopyBox> = {
        let (s, d) = surface_pair(surfaces, &src, &dst)?;
        let (Some(ss), Some(ds)) = (s.level(src.face, src.mipmap), d.level(dst.face, dst.mipmap)) else {
            return Err(CommandError::InvalidImage {
                sid: src.sid,
                face: src.face,
                mipmap: src.mipmap,
            });
        };
        boxes.iter().filter_map(|b| clip_copy(b, ss.size, ds.size)).collect()
    };
    if clipped.is_empty() {
        return Ok(());
    }
    ensure(surfaces, host, converter, src.sid)?;
    ensure(surfaces, host, converter, dst.sid)?;

    let (s, d) = surface_pair(surfaces, &src, &dst)?;
    let endpoints = (
        Endpoint::of(s, src.face, src.mipmap, false),
        Endpoint::of(d, dst.face, dst.mipmap, true),
    );
    let same_layout = s.host_format.block == d.host_format.block && s.is_depth() == d.is_depth();
    tracing::debug!(src = src.sid, dst = dst.sid, boxes = clipped.len(), "surface copy");
    match endpoints {
        (Some(se), Some(de)) => {
            let passes: Vec<BlitPass> = clipped
                .iter()
                .flat_map(|b| {
                    (0..b.d).map(move |z| BlitPass {
                        src: rect(b.srcx, b.srcy, b.w, b.h),
                        src_layer: b.srcz + z,
                        dst: rect(b.x, b.y, b.w, b.h),
                        dst_layer: b.z + z,
                    })
                })
                .collect();
            framebuffer_blit(host, &se, &de, &passes, gl::NEAREST)
        }
        _ if same_layout => {
            shadow_copy(surfaces, host, converter, &src, &dst, &clipped)
        }
        _ => Err(CommandError::Unsupported("copy between incompatible surface formats")),
    }
}

/// `SURFACE_STRETCHBLT`: scaled copy of one box, slice by slice.
#[allow(clippy::too_many_arguments)]
pub fn surface_stretch_blt(
    surfaces: &mut SlotMap<Surface>,
    host: &mut Host,
    converter: &mut dyn FormatConverter,
    src: SurfaceImageId,
    dst: SurfaceImageId,
    src_box: Box3,
    dst_box: Box3,
    mode: StretchBltMode,
) -> Result<(), CommandError> {
    let (sb, db) = {
        let (s, d) = surface_pair(surfaces, &src, &dst)?;
        let (Some(ss), Some(ds)) = (s.level(src.face, src.mipmap), d.level(dst.face, dst.mipmap)) else {
            return Err(CommandError::InvalidSurface(src.sid));
        };
        match (clip_box(&src_box, ss.size), clip_box(&dst_box, ds.size)) {
            (Some(sb), Some(db)) => (sb, db),
            _ => return Ok(()),
        }
    };
    ensure(surfaces, host, converter, src.sid)?;
    ensure(surfaces, host, converter, dst.sid)?;

    let (s, d) = surface_pair(surfaces, &src, &dst)?;
    let endpoints = (
        Endpoint::of(s, src.face, src.mipmap, false),
        Endpoint::of(d, dst.face, dst.mipmap, true),
    );
    let same_layout = s.host_format.block == d.host_format.block && s.is_depth() == d.is_depth();
    let filter = match mode {
        StretchBltMode::Point => gl::NEAREST,
        StretchBltMode::Linear => gl::LINEAR,
    };
    tracing::debug!(src = src.sid, dst = dst.sid, %mode, "stretch blit");
    match endpoints {
        (Some(se), Some(de)) => {
            let passes: Vec<BlitPass> = (0..sb.d.min(db.d))
                .map(|z| BlitPass {
                    src: rect(sb.x, sb.y, sb.w, sb.h),
                    src_layer: sb.z + z,
                    dst: rect(db.x, db.y, db.w, db.h),
                    dst_layer: db.z + z,
                })
                .collect();
            framebuffer_blit(host, &se, &de, &passes, filter)
        }
        _ if same_layout && (sb.w, sb.h) == (db.w, db.h) => {
            let copy = CopyBox {
                x: db.x,
                y: db.y,
                z: db.z,
                w: db.w,
                h: db.h,
                d: sb.d.min(db.d),
                srcx: sb.x,
                srcy: sb.y,
                srcz: sb.z,
            };
            shadow_copy(surfaces, host, converter, &src, &dst, &[copy])
        }
        _ => Err(CommandError::Unsupported("scaled blit of a surface the host cannot attach")),
    }
}

/// A guest screen: a BGRA overlay texture owned by the Shared Context.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Screen {
    pub width: u32,
    pub height: u32,
    texture: GLuint,
}

impl Screen {
    fn endpoint(&self) -> Endpoint {
        Endpoint {
            object: HostObject::Texture {
                name: self.texture,
                target: gl::TEXTURE_2D,
            },
            image_target: gl::TEXTURE_2D,
            level: 0,
            aspect: Aspect::Color,
        }
    }
}

#[derive(Debug, Default)]
pub struct Screens {
    screens: BTreeMap<u32, Screen>,
}

impl Screens {
    pub fn get(&self, id: u32) -> Option<&Screen> {
        self.screens.get(&id)
    }

    pub fn len(&self) -> usize {
        self.screens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.screens.is_empty()
    }

    /// Creates (or recreates at a new size) screen `id`.
    pub fn define(&mut self, host: &mut Host, id: u32, width: u32, height: u32) -> Result<(), CommandError> {
        if id >= MAX_SCREENS {
            return Err(CommandError::InvalidScreen(id));
        }
        if width == 0 || height == 0 {
            return Err(CommandError::Malformed("zero-sized screen"));
        }
        let max = host.caps().limits.max_texture_size;
        if width > max || height > max {
            return Err(CommandError::Unsupported("screen larger than the host texture limit"));
        }
        self.destroy(host, id);

        let mut g = host.bind(Binding::Shared)?;
        let gl = g.gl();
        let texture = gl.gen_texture();
        gl.bind_texture(gl::TEXTURE_2D, texture);
        gl.tex_parameter_i(gl::TEXTURE_2D, gl::TEXTURE_MIN_FILTER, gl::LINEAR as i32);
        gl.tex_parameter_i(gl::TEXTURE_2D, gl::TEXTURE_MAX_LEVEL, 0);
        let (internal, format, ty) = EMULATED_PRIMARY;
        gl.tex_image(gl::TEXTURE_2D, 0, internal, Extent::new(width, height, 1), format, ty, None);
        gl.bind_texture(gl::TEXTURE_2D, 0);
        g.drain("define screen");
        drop(g);

        tracing::debug!(id, width, height, texture, "defined screen");
        self.screens.insert(id, Screen { width, height, texture });
        Ok(())
    }

    pub fn destroy(&mut self, host: &mut Host, id: u32) -> bool {
        let Some(screen) = self.screens.remove(&id) else {
            return false;
        };
        match host.bind(Binding::Shared) {
            Ok(mut g) => g.gl().delete_texture(screen.texture),
            Err(err) => tracing::warn!(id, %err, "no Shared Context to delete a screen on"),
        }
        true
    }

    pub fn destroy_all(&mut self, host: &mut Host) {
        let ids: Vec<u32> = self.screens.keys().copied().collect();
        for id in ids {
            self.destroy(host, id);
        }
    }

    /// `BLIT_SURFACE_TO_SCREEN`: stretch `src_rect` of a surface image into `dest` on the screen.
    #[allow(clippy::too_many_arguments)]
    pub fn blit_from_surface(
        &self,
        surfaces: &mut SlotMap<Surface>,
        host: &mut Host,
        converter: &mut dyn FormatConverter,
        screen_id: u32,
        dest: Rect,
        src: SurfaceImageId,
        src_rect: Rect,
    ) -> Result<(), CommandError> {
        let screen = self.screens.get(&screen_id).ok_or(CommandError::InvalidScreen(screen_id))?;
        let surface = surfaces.get_mut(src.sid).ok_or(CommandError::InvalidSurface(src.sid))?;
        surface.check_image(src.face, src.mipmap)?;
        if surface.is_depth() {
            return Err(CommandError::Unsupported("presenting a depth surface"));
        }
        let size = surface
            .level(src.face, src.mipmap)
            .map(|l| l.size)
            .ok_or(CommandError::InvalidSurface(src.sid))?;
        let to_box = |r: &Rect| Box3 {
            x: r.x,
            y: r.y,
            z: 0,
            w: r.w,
            h: r.h,
            d: 1,
        };
        let (Some(sb), Some(db)) = (
            clip_box(&to_box(&src_rect), size),
            clip_box(&to_box(&dest), Size3::new(screen.width, screen.height, 1)),
        ) else {
            return Ok(());
        };
        surface.ensure_backing(host, converter, BackingUsage::Texture)?;
        let se = Endpoint::of(surface, src.face, src.mipmap, false)
            .ok_or(CommandError::Unsupported("presenting a surface the host cannot attach"))?;
        let pass = BlitPass {
            src: rect(sb.x, sb.y, sb.w, sb.h),
            src_layer: 0,
            dst: rect(db.x, db.y, db.w, db.h),
            dst_layer: 0,
        };
        tracing::debug!(screen = screen_id, sid = src.sid, "blit surface to screen");
        framebuffer_blit(host, &se, &screen.endpoint(), &[pass], gl::LINEAR)
    }

    /// The overlay as BGRA rows, top row first.
    pub fn contents(&self, host: &mut Host, screen_id: u32) -> Result<Vec<u8>, CommandError> {
        let screen = self.screens.get(&screen_id).ok_or(CommandError::InvalidScreen(screen_id))?;
        let mut out = Vec::new();
        out.try_reserve_exact(screen.width as usize * screen.height as usize * 4)
            .map_err(|_| CommandError::NoMemory("screen readback"))?;
        out.resize(screen.width as usize * screen.height as usize * 4, 0);

        let mut g = host.bind(Binding::Shared)?;
        let gl = g.gl();
        gl.bind_texture(gl::TEXTURE_2D, screen.texture);
        let (_, format, ty) = EMULATED_PRIMARY;
        with_pixel_store(gl, true, |gl| gl.get_tex_image(gl::TEXTURE_2D, 0, format, ty, &mut out));
        gl.bind_texture(gl::TEXTURE_2D, 0);
        g.drain("screen readback");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_boxes_clip_against_both_levels() {
        let b = CopyBox {
            x: 6,
            y: 0,
            z: 0,
            w: 10,
            h: 10,
            d: 1,
            srcx: 0,
            srcy: 2,
            srcz: 0,
        };
        let c = clip_copy(&b, Size3::new(16, 8, 1), Size3::new(8, 8, 1)).unwrap();
        assert_eq!((c.w, c.h), (2, 6));
        assert!(clip_copy(&CopyBox { x: 8, ..b }, Size3::new(16, 8, 1), Size3::new(8, 8, 1)).is_none());
    }

    #[test]
    fn stretch_boxes_keep_at_least_one_slice() {
        let b = Box3 {
            x: 1,
            y: 1,
            z: 0,
            w: 100,
            h: 2,
            d: 0,
        };
        let c = clip_box(&b, Size3::new(4, 4, 1)).unwrap();
        assert_eq!((c.w, c.h, c.d), (3, 2, 1));
    }

    #[test]
    fn blit_rect_is_half_open() {
        assert_eq!(
            rect(2, 3, 4, 5),
            BlitRect {
                x0: 2,
                y0: 3,
                x1: 6,
                y1: 8
            }
        );
    }
}
