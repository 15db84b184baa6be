use std::collections::BTreeMap;

use crate::gl::{
    consts as gl, BlitRect, Extent, GLbitfield, GLdouble, GLenum, GLfloat, GLint, GLuint, GlApi,
    Offset3, OptionalEntryPoint,
};
use crate::math::{self, IDENTITY};
use crate::platform::Profile;

use super::fetch::{element_size, fetch_element, fetch_indices};
use super::pixels::{self, DepthClear};
use super::state::{
    unit_scope, Attachment, AttribSlot, DrawRecord, Namespace, SoftContextState, SoftFramebuffer,
    SoftImage, SoftQuery, SoftRenderbuffer, SoftTexture, StencilFace,
};
use super::{SoftConfig, SoftGl, SoftProfileInfo};

/// Draws record at most this many vertices; the counters still see the full draw.
const MAX_RECORDED_VERTICES: usize = 4096;
const MAX_MATRIX_DEPTH: usize = 32;

enum DrawSource {
    Arrays { first: i32, count: u32 },
    Elements { count: u32, ty: GLenum, offset: usize },
}

/// One 2D image of a framebuffer attachment.
struct Plane<'a> {
    width: u32,
    height: u32,
    layout: (GLenum, GLenum),
    bytes: &'a mut [u8],
}

impl Plane<'_> {
    fn bpp(&self) -> usize {
        pixels::bytes_per_pixel(self.layout.0, self.layout.1).unwrap_or(4)
    }
}

fn profile_info(cfg: &SoftConfig, profile: Profile) -> &SoftProfileInfo {
    match profile {
        Profile::Legacy => &cfg.legacy,
        Profile::Core => &cfg.core,
    }
}

fn binding_target(target: GLenum) -> GLenum {
    if (gl::TEXTURE_CUBE_MAP_POSITIVE_X..gl::TEXTURE_CUBE_MAP_POSITIVE_X + 6).contains(&target) {
        gl::TEXTURE_CUBE_MAP
    } else {
        target
    }
}

fn bound_texture_mut<'a>(
    ctx: &mut SoftContextState,
    ns: &'a mut Namespace,
    target: GLenum,
) -> Option<&'a mut SoftTexture> {
    let name = ctx.bound_texture(ctx.active_texture, binding_target(target));
    let tex = ns.textures.get_mut(&name);
    if tex.is_none() {
        ctx.record_error(gl::INVALID_OPERATION);
    }
    tex
}

fn bound_buffer_mut<'a>(
    ctx: &mut SoftContextState,
    ns: &'a mut Namespace,
    target: GLenum,
) -> Option<&'a mut Vec<u8>> {
    let name = ctx.bound_buffer(target);
    let buf = ns.buffers.get_mut(&name);
    if buf.is_none() {
        ctx.record_error(gl::INVALID_OPERATION);
    }
    buf
}

fn align_up(v: usize, align: usize) -> usize {
    let align = align.max(1);
    v.div_ceil(align) * align
}

/// (row stride, image stride) of client memory for the given pixel-store direction.
fn client_strides(ctx: &SoftContextState, pack: bool, width: u32, height: u32, bpp: usize) -> (usize, usize) {
    let (row_len, align, image_height) = if pack {
        (gl::PACK_ROW_LENGTH, gl::PACK_ALIGNMENT, gl::PACK_IMAGE_HEIGHT)
    } else {
        (gl::UNPACK_ROW_LENGTH, gl::UNPACK_ALIGNMENT, gl::UNPACK_IMAGE_HEIGHT)
    };
    let get = |p| ctx.pixel_store.get(&p).copied().unwrap_or(0).max(0) as usize;
    let row_pixels = match get(row_len) {
        0 => width as usize,
        n => n,
    };
    let rows = match get(image_height) {
        0 => height as usize,
        n => n,
    };
    let row = align_up(row_pixels * bpp, get(align));
    (row, row * rows)
}

/// Copies a client box into a tightly packed image.
#[allow(clippy::too_many_arguments)]
fn copy_in(
    img: &mut SoftImage,
    bpp: usize,
    offset: Offset3,
    extent: Extent,
    src: &[u8],
    src_row: usize,
    src_image: usize,
) {
    let (w, h) = (img.width as usize, img.height as usize);
    let len = extent.width as usize * bpp;
    for z in 0..extent.depth as usize {
        for y in 0..extent.height as usize {
            let s = z * src_image + y * src_row;
            let d = (((offset.z as usize + z) * h + offset.y as usize + y) * w + offset.x as usize) * bpp;
            if let (Some(from), Some(to)) = (src.get(s..s + len), img.bytes.get_mut(d..d + len)) {
                to.copy_from_slice(from);
            }
        }
    }
}

fn in_bounds(img: &SoftImage, offset: Offset3, extent: Extent) -> bool {
    offset.x.checked_add(extent.width).is_some_and(|v| v <= img.width)
        && offset.y.checked_add(extent.height).is_some_and(|v| v <= img.height)
        && offset.z.checked_add(extent.depth).is_some_and(|v| v <= img.depth.max(1))
}

fn plane<'a>(ns: &'a mut Namespace, att: &Attachment) -> Option<Plane<'a>> {
    match *att {
        Attachment::Texture {
            name,
            image_target,
            level,
            layer,
        } => {
            let img = ns.textures.get_mut(&name)?.images.get_mut(&(image_target, level))?;
            if img.compressed || img.width == 0 || img.height == 0 {
                return None;
            }
            let (width, height, layout) = (img.width, img.height, img.layout);
            let slice = width as usize * height as usize * img.bpp();
            let start = layer as usize * slice;
            let bytes = img.bytes.get_mut(start..start + slice)?;
            Some(Plane {
                width,
                height,
                layout,
                bytes,
            })
        }
        Attachment::Renderbuffer(name) => {
            let rb = ns.renderbuffers.get_mut(&name)?;
            if rb.width == 0 || rb.height == 0 {
                return None;
            }
            Some(Plane {
                width: rb.width,
                height: rb.height,
                layout: pixels::renderbuffer_layout(rb.internal_format),
                bytes: &mut rb.bytes,
            })
        }
    }
}

/// Pixel rectangle `[x0, x1) x [y0, y1)` of a plane, clipped to the scissor box.
fn clip(width: u32, height: u32, scissor: Option<[i32; 4]>) -> (usize, usize, usize, usize) {
    let (mut x0, mut y0, mut x1, mut y1) = (0i64, 0i64, i64::from(width), i64::from(height));
    if let Some([sx, sy, sw, sh]) = scissor {
        x0 = x0.max(i64::from(sx));
        y0 = y0.max(i64::from(sy));
        x1 = x1.min(i64::from(sx) + i64::from(sw));
        y1 = y1.min(i64::from(sy) + i64::from(sh));
    }
    let c = |v: i64| v.max(0) as usize;
    (c(x0), c(y0), c(x1.max(x0)), c(y1.max(y0)))
}

fn fill(plane: Plane<'_>, scissor: Option<[i32; 4]>, mut f: impl FnMut(&mut [u8])) {
    let bpp = plane.bpp();
    let (x0, y0, x1, y1) = clip(plane.width, plane.height, scissor);
    for y in y0..y1 {
        for x in x0..x1 {
            let at = (y * plane.width as usize + x) * bpp;
            if let Some(texel) = plane.bytes.get_mut(at..at + bpp) {
                f(texel);
            }
        }
    }
}

fn blit_nearest(
    src: &[u8],
    src_size: (u32, u32),
    dst: Plane<'_>,
    src_rect: BlitRect,
    dst_rect: BlitRect,
    scissor: Option<[i32; 4]>,
) {
    let bpp = dst.bpp();
    let span_x = f64::from(dst_rect.x1 - dst_rect.x0);
    let span_y = f64::from(dst_rect.y1 - dst_rect.y0);
    if span_x == 0.0 || span_y == 0.0 {
        return;
    }
    let (cx0, cy0, cx1, cy1) = clip(dst.width, dst.height, scissor);
    let rx = (dst_rect.x0.min(dst_rect.x1).max(0) as usize, dst_rect.x0.max(dst_rect.x1).max(0) as usize);
    let ry = (dst_rect.y0.min(dst_rect.y1).max(0) as usize, dst_rect.y0.max(dst_rect.y1).max(0) as usize);
    for dy in ry.0.max(cy0)..ry.1.min(cy1) {
        let ty = (dy as f64 + 0.5 - f64::from(dst_rect.y0)) / span_y;
        let sy = (f64::from(src_rect.y0) + ty * f64::from(src_rect.y1 - src_rect.y0)).floor() as i64;
        if sy < 0 || sy >= i64::from(src_size.1) {
            continue;
        }
        for dx in rx.0.max(cx0)..rx.1.min(cx1) {
            let tx = (dx as f64 + 0.5 - f64::from(dst_rect.x0)) / span_x;
            let sx = (f64::from(src_rect.x0) + tx * f64::from(src_rect.x1 - src_rect.x0)).floor() as i64;
            if sx < 0 || sx >= i64::from(src_size.0) {
                continue;
            }
            let s = (sy as usize * src_size.0 as usize + sx as usize) * bpp;
            let d = (dy * dst.width as usize + dx) * bpp;
            if let (Some(from), Some(to)) = (src.get(s..s + bpp), dst.bytes.get_mut(d..d + bpp)) {
                to.copy_from_slice(from);
            }
        }
    }
}

fn set_attachment(fb: &mut SoftFramebuffer, attachment: GLenum, value: Option<Attachment>) {
    let points: &[GLenum] = if attachment == gl::DEPTH_STENCIL_ATTACHMENT {
        &[gl::DEPTH_ATTACHMENT, gl::STENCIL_ATTACHMENT]
    } else {
        std::slice::from_ref(&attachment)
    };
    for point in points {
        match value {
            Some(v) => {
                fb.attachments.insert(*point, v);
            }
            None => {
                fb.attachments.remove(point);
            }
        }
    }
}

fn framebuffer_for(ctx: &SoftContextState, target: GLenum) -> GLuint {
    if target == gl::READ_FRAMEBUFFER {
        ctx.read_framebuffer
    } else {
        ctx.draw_framebuffer
    }
}

fn for_faces(ctx: &mut SoftContextState, face: GLenum, f: impl Fn(&mut StencilFace)) {
    if matches!(face, gl::FRONT | gl::FRONT_AND_BACK) {
        f(&mut ctx.stencil_front);
    }
    if matches!(face, gl::BACK | gl::FRONT_AND_BACK) {
        f(&mut ctx.stencil_back);
    }
}

fn matrix_stack(ctx: &mut SoftContextState) -> Option<&mut Vec<math::Mat4>> {
    match ctx.matrix_mode {
        gl::MODELVIEW => Some(&mut ctx.modelview),
        gl::PROJECTION => Some(&mut ctx.projection),
        gl::TEXTURE => ctx.texture_matrices.get_mut(ctx.active_texture as usize),
        _ => None,
    }
}

fn vec4(values: &[f32], fill: [f32; 4]) -> [f32; 4] {
    let mut out = fill;
    for (o, v) in out.iter_mut().zip(values) {
        *o = *v;
    }
    out
}

fn array_slot(ctx: &SoftContextState, array: GLenum) -> Option<AttribSlot> {
    Some(match array {
        gl::VERTEX_ARRAY => AttribSlot::Position,
        gl::NORMAL_ARRAY => AttribSlot::Normal,
        gl::COLOR_ARRAY => AttribSlot::Color,
        gl::SECONDARY_COLOR_ARRAY => AttribSlot::SecondaryColor,
        gl::FOG_COORD_ARRAY => AttribSlot::FogCoord,
        gl::TEXTURE_COORD_ARRAY => AttribSlot::TexCoord(ctx.client_active_texture),
        _ => return None,
    })
}

fn is_integer_type(ty: GLenum) -> bool {
    !matches!(ty, gl::FLOAT | gl::HALF_FLOAT)
}

fn set_pointer(
    ctx: &mut SoftContextState,
    slot: AttribSlot,
    size: i32,
    ty: GLenum,
    normalized: bool,
    stride: u32,
    offset: usize,
) {
    let buffer = ctx.bound_buffer(gl::ARRAY_BUFFER);
    let p = ctx.arrays.entry(slot).or_default();
    p.size = size;
    p.ty = ty;
    p.normalized = normalized;
    p.stride = stride;
    p.offset = offset;
    p.buffer = buffer;
}

fn fetch_vertex(ctx: &SoftContextState, ns: &Namespace, index: i64) -> BTreeMap<AttribSlot, [f32; 4]> {
    let mut vertex: BTreeMap<_, _> = ctx.current.iter().map(|(k, v)| (*k, *v)).collect();
    for (slot, p) in &ctx.arrays {
        if !p.enabled {
            continue;
        }
        let (Some(bytes), Some(elem)) = (ns.buffers.get(&p.buffer), element_size(p)) else {
            continue;
        };
        // A zero stride means tightly packed.
        let stride = if p.stride == 0 { elem } else { p.stride as usize };
        // Only instance 0 is recorded, which always reads element 0 of instanced arrays.
        let element = if p.divisor > 0 { 0 } else { index };
        if element < 0 {
            continue;
        }
        if let Some(v) = fetch_element(bytes, p.offset + element as usize * stride, p) {
            vertex.insert(*slot, v);
        }
    }
    vertex
}

fn is_pixel_store(pname: GLenum) -> bool {
    matches!(
        pname,
        gl::UNPACK_ROW_LENGTH
            | gl::UNPACK_SKIP_ROWS
            | gl::UNPACK_SKIP_PIXELS
            | gl::UNPACK_ALIGNMENT
            | gl::UNPACK_SKIP_IMAGES
            | gl::UNPACK_IMAGE_HEIGHT
            | gl::PACK_ROW_LENGTH
            | gl::PACK_SKIP_ROWS
            | gl::PACK_SKIP_PIXELS
            | gl::PACK_ALIGNMENT
            | gl::PACK_SKIP_IMAGES
            | gl::PACK_IMAGE_HEIGHT
    )
}

/// Values of a `glGet*` query, or `None` for names the host doesn't know.
fn query(ctx: &SoftContextState, cfg: &SoftConfig, pname: GLenum) -> Option<Vec<f64>> {
    if let Some(v) = cfg.limits.get(&pname) {
        return Some(v.iter().map(|f| f64::from(*f)).collect());
    }
    fn one(v: f64) -> Option<Vec<f64>> {
        Some(vec![v])
    }
    fn e(v: GLenum) -> Option<Vec<f64>> {
        Some(vec![f64::from(v)])
    }
    fn b(v: bool) -> Option<Vec<f64>> {
        Some(vec![if v { 1.0 } else { 0.0 }])
    }
    fn fv(v: &[f32]) -> Option<Vec<f64>> {
        Some(v.iter().map(|f| f64::from(*f)).collect())
    }
    fn iv(v: &[i32]) -> Option<Vec<f64>> {
        Some(v.iter().map(|f| f64::from(*f)).collect())
    }
    let fog_f = |p: GLenum, d: f32| one(f64::from(ctx.fog_f.get(&p).copied().unwrap_or(d)));
    let point_f = |p: GLenum, d: f32| one(f64::from(ctx.point_params.get(&p).map_or(d, |v| v[0])));
    let s = (&ctx.stencil_front, &ctx.stencil_back);

    match pname {
        gl::NUM_EXTENSIONS => one(profile_info(cfg, ctx.profile).extensions.len() as f64),
        gl::CONTEXT_PROFILE_MASK => e(match ctx.profile {
            Profile::Core => gl::CONTEXT_CORE_PROFILE_BIT as GLenum,
            Profile::Legacy => gl::CONTEXT_COMPATIBILITY_PROFILE_BIT as GLenum,
        }),
        gl::VIEWPORT => iv(&ctx.viewport),
        gl::SCISSOR_BOX => iv(&ctx.scissor),
        gl::ACTIVE_TEXTURE => e(gl::TEXTURE0 + ctx.active_texture),
        gl::CLIENT_ACTIVE_TEXTURE => e(gl::TEXTURE0 + ctx.client_active_texture),
        gl::TEXTURE_BINDING_2D => e(ctx.bound_texture(ctx.active_texture, gl::TEXTURE_2D)),
        gl::TEXTURE_BINDING_3D => e(ctx.bound_texture(ctx.active_texture, gl::TEXTURE_3D)),
        gl::TEXTURE_BINDING_CUBE_MAP => e(ctx.bound_texture(ctx.active_texture, gl::TEXTURE_CUBE_MAP)),
        gl::ARRAY_BUFFER_BINDING => e(ctx.bound_buffer(gl::ARRAY_BUFFER)),
        gl::ELEMENT_ARRAY_BUFFER_BINDING => e(ctx.bound_buffer(gl::ELEMENT_ARRAY_BUFFER)),
        gl::DRAW_FRAMEBUFFER_BINDING => e(ctx.draw_framebuffer),
        gl::READ_FRAMEBUFFER_BINDING => e(ctx.read_framebuffer),
        gl::BLEND_SRC_RGB => e(ctx.blend_src.0),
        gl::BLEND_SRC_ALPHA => e(ctx.blend_src.1),
        gl::BLEND_DST_RGB => e(ctx.blend_dst.0),
        gl::BLEND_DST_ALPHA => e(ctx.blend_dst.1),
        gl::BLEND_EQUATION_RGB => e(ctx.blend_equation.0),
        gl::BLEND_EQUATION_ALPHA => e(ctx.blend_equation.1),
        gl::BLEND_COLOR => fv(&ctx.blend_color),
        gl::DEPTH_FUNC => e(ctx.depth_func),
        gl::DEPTH_WRITEMASK => b(ctx.depth_mask),
        gl::DEPTH_RANGE => Some(vec![ctx.depth_range.0, ctx.depth_range.1]),
        gl::STENCIL_FUNC => e(s.0.func),
        gl::STENCIL_REF => one(f64::from(s.0.reference)),
        gl::STENCIL_VALUE_MASK => e(s.0.value_mask),
        gl::STENCIL_WRITEMASK => e(s.0.write_mask),
        gl::STENCIL_FAIL => e(s.0.fail),
        gl::STENCIL_PASS_DEPTH_FAIL => e(s.0.zfail),
        gl::STENCIL_PASS_DEPTH_PASS => e(s.0.zpass),
        gl::STENCIL_BACK_FUNC => e(s.1.func),
        gl::STENCIL_BACK_REF => one(f64::from(s.1.reference)),
        gl::STENCIL_BACK_VALUE_MASK => e(s.1.value_mask),
        gl::STENCIL_BACK_WRITEMASK => e(s.1.write_mask),
        gl::STENCIL_BACK_FAIL => e(s.1.fail),
        gl::STENCIL_BACK_PASS_DEPTH_FAIL => e(s.1.zfail),
        gl::STENCIL_BACK_PASS_DEPTH_PASS => e(s.1.zpass),
        gl::ALPHA_TEST_FUNC => e(ctx.alpha_func.0),
        gl::ALPHA_TEST_REF => one(f64::from(ctx.alpha_func.1)),
        gl::COLOR_WRITEMASK => Some(ctx.color_masks[0].iter().map(|m| if *m { 1.0 } else { 0.0 }).collect()),
        gl::CULL_FACE_MODE => e(ctx.cull_face),
        gl::FRONT_FACE => e(ctx.front_face),
        gl::POLYGON_MODE => Some(vec![f64::from(ctx.polygon_mode.0), f64::from(ctx.polygon_mode.1)]),
        gl::SHADE_MODEL => e(ctx.shade_model),
        gl::POLYGON_OFFSET_FACTOR => one(f64::from(ctx.polygon_offset.0)),
        gl::POLYGON_OFFSET_UNITS => one(f64::from(ctx.polygon_offset.1)),
        gl::POINT_SIZE => one(f64::from(ctx.point_size)),
        gl::POINT_SIZE_MIN => point_f(gl::POINT_SIZE_MIN, 0.0),
        gl::POINT_SIZE_MAX => point_f(gl::POINT_SIZE_MAX, 1.0),
        gl::POINT_DISTANCE_ATTENUATION => ctx
            .point_params
            .get(&gl::POINT_DISTANCE_ATTENUATION)
            .map_or(Some(vec![1.0, 0.0, 0.0]), |v| fv(v)),
        gl::LINE_WIDTH => one(f64::from(ctx.line_width)),
        gl::LINE_STIPPLE_REPEAT => one(f64::from(ctx.line_stipple.0)),
        gl::LINE_STIPPLE_PATTERN => one(f64::from(ctx.line_stipple.1)),
        gl::FOG_MODE => e(ctx.fog_i.get(&gl::FOG_MODE).map_or(gl::EXP, |v| *v as GLenum)),
        gl::FOG_COORD_SRC => e(ctx.fog_i.get(&gl::FOG_COORD_SRC).map_or(gl::FRAGMENT_DEPTH, |v| *v as GLenum)),
        gl::FOG_DISTANCE_MODE_NV => e(ctx
            .fog_i
            .get(&gl::FOG_DISTANCE_MODE_NV)
            .map_or(gl::EYE_PLANE_ABSOLUTE_NV, |v| *v as GLenum)),
        gl::FOG_DENSITY => fog_f(gl::FOG_DENSITY, 1.0),
        gl::FOG_START => fog_f(gl::FOG_START, 0.0),
        gl::FOG_END => fog_f(gl::FOG_END, 1.0),
        gl::FOG_COLOR => fv(&ctx.fog_color),
        gl::LIGHT_MODEL_AMBIENT => fv(&ctx.light_model_ambient),
        gl::LIGHT_MODEL_COLOR_CONTROL => e(ctx
            .light_model_i
            .get(&gl::LIGHT_MODEL_COLOR_CONTROL)
            .map_or(gl::SINGLE_COLOR, |v| *v as GLenum)),
        gl::LIGHT_MODEL_LOCAL_VIEWER => {
            one(f64::from(ctx.light_model_i.get(&gl::LIGHT_MODEL_LOCAL_VIEWER).copied().unwrap_or(0)))
        }
        gl::COLOR_CLEAR_VALUE => fv(&ctx.clear_color),
        gl::DEPTH_CLEAR_VALUE => one(ctx.clear_depth),
        gl::STENCIL_CLEAR_VALUE => one(f64::from(ctx.clear_stencil)),
        gl::MATRIX_MODE => e(ctx.matrix_mode),
        gl::MODELVIEW_MATRIX => fv(&ctx.modelview_top()),
        gl::PROJECTION_MATRIX => fv(&ctx.projection_top()),
        gl::TEXTURE_MATRIX => fv(&ctx.texture_matrix_top(ctx.active_texture)),
        p if is_pixel_store(p) => one(f64::from(ctx.pixel_store.get(&p).copied().unwrap_or(0))),
        _ => None,
    }
}

impl SoftGl {
    /// Runs `f` against the current context and its share group. Without a current
    /// context the call is dropped, like on a real driver.
    fn with<R: Default>(
        &self,
        f: impl FnOnce(&mut SoftContextState, &mut Namespace, &SoftConfig) -> R,
    ) -> R {
        let mut guard = self.world.borrow_mut();
        let w = &mut *guard;
        let Some(handle) = w.current else {
            tracing::trace!("soft GL call without a current context");
            return R::default();
        };
        let Some(ctx) = w.contexts.get_mut(&handle) else {
            return R::default();
        };
        let Some(ns) = w.namespaces.get_mut(&ctx.namespace) else {
            return R::default();
        };
        f(ctx, ns, &w.config)
    }

    fn ctx(&self, f: impl FnOnce(&mut SoftContextState)) {
        self.with(|ctx, _, _| f(ctx));
    }

    fn draw(&mut self, mode: GLenum, source: DrawSource, instances: u32, base_vertex: i32) {
        self.with(|ctx, ns, _| {
            if !matches!(
                mode,
                gl::POINTS | gl::LINES | gl::LINE_STRIP | gl::TRIANGLES | gl::TRIANGLE_STRIP | gl::TRIANGLE_FAN
            ) {
                ctx.record_error(gl::INVALID_ENUM);
                return;
            }
            let (indices, count, first, indexed) = match source {
                DrawSource::Arrays { first, count } => {
                    let indices: Vec<i64> = (0..i64::from(count)).map(|i| i64::from(first) + i).collect();
                    (indices, count, first, None)
                }
                DrawSource::Elements { count, ty, offset } => {
                    let name = ctx.bound_buffer(gl::ELEMENT_ARRAY_BUFFER);
                    let Some(idx) = ns
                        .buffers
                        .get(&name)
                        .and_then(|b| fetch_indices(b, offset, count as usize, ty))
                    else {
                        ctx.record_error(gl::INVALID_OPERATION);
                        return;
                    };
                    let indices = idx.into_iter().map(|i| i + i64::from(base_vertex)).collect();
                    (indices, count, 0, Some(ty))
                }
            };
            let vertices = indices
                .iter()
                .take(MAX_RECORDED_VERTICES)
                .map(|&i| fetch_vertex(ctx, ns, i))
                .collect();
            if let Some((gl::SAMPLES_PASSED, name)) = ctx.active_query {
                if let Some(q) = ctx.queries.get_mut(&name) {
                    q.result = q.result.saturating_add(count.saturating_mul(instances.max(1)));
                }
            }
            ctx.draws.push(DrawRecord {
                mode,
                count,
                instances,
                indexed,
                first,
                base_vertex,
                vertices,
                draw_framebuffer: ctx.draw_framebuffer,
            });
        });
    }
}

impl GlApi for SoftGl {
    fn supports(&self, entry_point: OptionalEntryPoint) -> bool {
        !self.world.borrow().config.missing_entry_points.contains(&entry_point)
    }

    fn get_error(&mut self) -> GLenum {
        let mut guard = self.world.borrow_mut();
        let w = &mut *guard;
        if !w.injected_errors.is_empty() {
            return w.injected_errors.remove(0);
        }
        match w.current.and_then(|h| w.contexts.get_mut(&h)) {
            Some(ctx) if !ctx.errors.is_empty() => ctx.errors.remove(0),
            _ => gl::NO_ERROR,
        }
    }

    fn get_string(&mut self, name: GLenum) -> Option<String> {
        self.with(|ctx, _, cfg| {
            let info = profile_info(cfg, ctx.profile);
            match name {
                gl::VENDOR => Some(cfg.vendor.clone()),
                gl::RENDERER => Some(cfg.renderer.clone()),
                gl::VERSION => Some(info.version.clone()),
                gl::SHADING_LANGUAGE_VERSION => Some(info.glsl_version.clone()),
                gl::EXTENSIONS if ctx.profile == Profile::Legacy => Some(info.extensions.join(" ")),
                _ => {
                    ctx.record_error(gl::INVALID_ENUM);
                    None
                }
            }
        })
    }

    fn get_string_i(&mut self, name: GLenum, index: u32) -> Option<String> {
        self.with(|ctx, _, cfg| {
            let ext = (name == gl::EXTENSIONS)
                .then(|| profile_info(cfg, ctx.profile).extensions.get(index as usize).cloned())
                .flatten();
            if ext.is_none() {
                ctx.record_error(gl::INVALID_VALUE);
            }
            ext
        })
    }

    fn get_integer_v(&mut self, pname: GLenum, out: &mut [GLint]) {
        self.with(|ctx, _, cfg| match query(ctx, cfg, pname) {
            Some(values) => {
                for (o, v) in out.iter_mut().zip(values) {
                    *o = v.round() as GLint;
                }
            }
            None => ctx.record_error(gl::INVALID_ENUM),
        });
    }

    fn get_float_v(&mut self, pname: GLenum, out: &mut [GLfloat]) {
        self.with(|ctx, _, cfg| match query(ctx, cfg, pname) {
            Some(values) => {
                for (o, v) in out.iter_mut().zip(values) {
                    *o = v as GLfloat;
                }
            }
            None => ctx.record_error(gl::INVALID_ENUM),
        });
    }

    fn enable(&mut self, cap: GLenum) {
        self.ctx(|ctx| {
            let key = (cap, unit_scope(cap, ctx.active_texture));
            ctx.enabled.insert(key);
        });
    }

    fn disable(&mut self, cap: GLenum) {
        self.ctx(|ctx| {
            let key = (cap, unit_scope(cap, ctx.active_texture));
            ctx.enabled.remove(&key);
        });
    }

    fn is_enabled(&mut self, cap: GLenum) -> bool {
        self.with(|ctx, _, _| ctx.is_enabled(cap))
    }

    fn flush(&mut self) {}

    fn finish(&mut self) {}

    fn gen_texture(&mut self) -> GLuint {
        self.with(|_, ns, _| {
            let name = ns.alloc_name();
            ns.textures.insert(name, SoftTexture::default());
            name
        })
    }

    fn delete_texture(&mut self, name: GLuint) {
        self.with(|ctx, ns, _| {
            ns.textures.remove(&name);
            ctx.texture_bindings.retain(|_, bound| *bound != name);
        });
    }

    fn active_texture(&mut self, unit: GLenum) {
        self.ctx(|ctx| match unit.checked_sub(gl::TEXTURE0) {
            Some(u) if u < 32 => ctx.active_texture = u,
            _ => ctx.record_error(gl::INVALID_ENUM),
        });
    }

    fn bind_texture(&mut self, target: GLenum, name: GLuint) {
        self.with(|ctx, ns, _| {
            if name != 0 {
                let tex = ns.textures.entry(name).or_default();
                if tex.target == 0 {
                    tex.target = target;
                } else if tex.target != target {
                    ctx.record_error(gl::INVALID_OPERATION);
                    return;
                }
            }
            ctx.texture_bindings.insert((ctx.active_texture, target), name);
        });
    }

    fn tex_parameter_i(&mut self, target: GLenum, pname: GLenum, param: GLint) {
        self.with(|ctx, ns, _| {
            if let Some(tex) = bound_texture_mut(ctx, ns, target) {
                tex.params_i.insert(pname, param);
            }
        });
    }

    fn tex_parameter_f(&mut self, target: GLenum, pname: GLenum, param: GLfloat) {
        self.with(|ctx, ns, _| {
            if let Some(tex) = bound_texture_mut(ctx, ns, target) {
                tex.params_f.insert(pname, param);
            }
        });
    }

    fn tex_parameter_fv(&mut self, target: GLenum, pname: GLenum, params: &[GLfloat; 4]) {
        self.with(|ctx, ns, _| {
            if let Some(tex) = bound_texture_mut(ctx, ns, target) {
                tex.params_fv.insert(pname, *params);
            }
        });
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
        self.with(|ctx, ns, _| {
            let Some(bpp) = pixels::bytes_per_pixel(format, ty) else {
                ctx.record_error(gl::INVALID_ENUM);
                return;
            };
            let (row, image) = client_strides(ctx, false, extent.width, extent.height, bpp);
            let depth = extent.depth.max(1);
            let mut img = SoftImage {
                width: extent.width,
                height: extent.height,
                depth,
                internal_format,
                layout: (format, ty),
                compressed: false,
                bytes: vec![0; extent.width as usize * extent.height as usize * depth as usize * bpp],
            };
            if let Some(src) = data {
                copy_in(&mut img, bpp, Offset3::default(), Extent { depth, ..extent }, src, row, image);
            }
            if let Some(tex) = bound_texture_mut(ctx, ns, target) {
                tex.images.insert((target, level), img);
            }
        });
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
        self.with(|ctx, ns, _| {
            let (row, image) = match pixels::bytes_per_pixel(format, ty) {
                Some(bpp) => client_strides(ctx, false, extent.width, extent.height, bpp),
                None => {
                    ctx.record_error(gl::INVALID_ENUM);
                    return;
                }
            };
            let Some(tex) = bound_texture_mut(ctx, ns, target) else {
                return;
            };
            let Some(img) = tex.images.get_mut(&(target, level)) else {
                ctx.record_error(gl::INVALID_OPERATION);
                return;
            };
            if img.compressed || !in_bounds(img, offset, extent) {
                ctx.record_error(gl::INVALID_VALUE);
                return;
            }
            let Some(src) = pixels::convert_layout(data, (format, ty), img.layout) else {
                ctx.record_error(gl::INVALID_OPERATION);
                return;
            };
            let bpp = img.bpp();
            copy_in(img, bpp, offset, Extent { depth: extent.depth.max(1), ..extent }, &src, row, image);
        });
    }

    fn compressed_tex_image(
        &mut self,
        target: GLenum,
        level: u32,
        internal_format: GLenum,
        extent: Extent,
        data: &[u8],
    ) {
        self.with(|ctx, ns, _| {
            if let Some(tex) = bound_texture_mut(ctx, ns, target) {
                tex.images.insert(
                    (target, level),
                    SoftImage {
                        width: extent.width,
                        height: extent.height,
                        depth: extent.depth.max(1),
                        internal_format,
                        layout: (0, 0),
                        compressed: true,
                        bytes: data.to_vec(),
                    },
                );
            }
        });
    }

    fn get_tex_image(&mut self, target: GLenum, level: u32, format: GLenum, ty: GLenum, out: &mut [u8]) {
        self.with(|ctx, ns, _| {
            let Some(bpp) = pixels::bytes_per_pixel(format, ty) else {
                ctx.record_error(gl::INVALID_ENUM);
                return;
            };
            let Some(img) = bound_texture_mut(ctx, ns, target).and_then(|t| t.images.get(&(target, level)))
            else {
                ctx.record_error(gl::INVALID_OPERATION);
                return;
            };
            let Some(converted) = pixels::convert_layout(&img.bytes, img.layout, (format, ty)) else {
                ctx.record_error(gl::INVALID_OPERATION);
                return;
            };
            let (w, h, d) = (img.width as usize, img.height as usize, img.depth.max(1) as usize);
            let (row, image) = client_strides(ctx, true, img.width, img.height, bpp);
            let len = w * bpp;
            for z in 0..d {
                for y in 0..h {
                    let s = (z * h + y) * len;
                    let o = z * image + y * row;
                    if let (Some(from), Some(to)) = (converted.get(s..s + len), out.get_mut(o..o + len)) {
                        to.copy_from_slice(from);
                    }
                }
            }
        });
    }

    fn get_compressed_tex_image(&mut self, target: GLenum, level: u32, out: &mut [u8]) {
        self.with(|ctx, ns, _| {
            match bound_texture_mut(ctx, ns, target).and_then(|t| t.images.get(&(target, level))) {
                Some(img) if img.compressed => {
                    let n = img.bytes.len().min(out.len());
                    out[..n].copy_from_slice(&img.bytes[..n]);
                }
                _ => ctx.record_error(gl::INVALID_OPERATION),
            }
        });
    }

    fn generate_mipmap(&mut self, target: GLenum) {
        self.with(|ctx, ns, _| {
            let Some(tex) = bound_texture_mut(ctx, ns, target) else {
                return;
            };
            let faces: Vec<GLenum> = if target == gl::TEXTURE_CUBE_MAP {
                (0..6).map(|i| gl::TEXTURE_CUBE_MAP_POSITIVE_X + i).collect()
            } else {
                vec![target]
            };
            let base = tex.params_i.get(&gl::TEXTURE_BASE_LEVEL).copied().unwrap_or(0).max(0) as u32;
            let max = tex.params_i.get(&gl::TEXTURE_MAX_LEVEL).copied().unwrap_or(1000).max(0) as u32;
            for face in faces {
                let Some(mut img) = tex.images.get(&(face, base)).cloned() else {
                    continue;
                };
                let bpp = img.bpp();
                if img.compressed
                    || img.depth > 1
                    || img.bytes.len() < img.width as usize * img.height as usize * bpp
                {
                    tracing::debug!(face, "soft host skips mip generation for this image");
                    continue;
                }
                let lanes = pixels::channel_lanes(img.layout.0, img.layout.1).is_some();
                let mut level = base;
                while (img.width > 1 || img.height > 1) && level < max {
                    let (bytes, width, height) = pixels::downsample(&img.bytes, img.width, img.height, bpp, lanes);
                    level += 1;
                    img = SoftImage {
                        width,
                        height,
                        bytes,
                        ..img
                    };
                    tex.images.insert((face, level), img.clone());
                }
            }
            tex.mipmaps_generated += 1;
        });
    }

    fn pixel_store_i(&mut self, pname: GLenum, param: GLint) {
        self.ctx(|ctx| {
            if is_pixel_store(pname) {
                ctx.pixel_store.insert(pname, param);
            } else {
                ctx.record_error(gl::INVALID_ENUM);
            }
        });
    }

    fn tex_env_i(&mut self, _target: GLenum, pname: GLenum, param: GLint) {
        self.ctx(|ctx| {
            ctx.tex_env_i.insert((ctx.active_texture, pname), param);
        });
    }

    fn tex_env_fv(&mut self, _target: GLenum, pname: GLenum, params: &[GLfloat; 4]) {
        self.ctx(|ctx| {
            ctx.tex_env_fv.insert((ctx.active_texture, pname), *params);
        });
    }

    fn tex_gen_i(&mut self, coord: GLenum, pname: GLenum, param: GLint) {
        self.ctx(|ctx| {
            if pname == gl::TEXTURE_GEN_MODE {
                ctx.tex_gen.insert((ctx.active_texture, coord), param);
            } else {
                ctx.record_error(gl::INVALID_ENUM);
            }
        });
    }

    fn gen_buffer(&mut self) -> GLuint {
        self.with(|_, ns, _| {
            let name = ns.alloc_name();
            ns.buffers.insert(name, Vec::new());
            name
        })
    }

    fn delete_buffer(&mut self, name: GLuint) {
        self.with(|ctx, ns, _| {
            ns.buffers.remove(&name);
            ctx.buffer_bindings.retain(|_, bound| *bound != name);
        });
    }

    fn bind_buffer(&mut self, target: GLenum, name: GLuint) {
        self.with(|ctx, ns, _| {
            if name != 0 {
                ns.buffers.entry(name).or_default();
            }
            ctx.buffer_bindings.insert(target, name);
        });
    }

    fn buffer_data(&mut self, target: GLenum, size: usize, data: Option<&[u8]>, _usage: GLenum) {
        self.with(|ctx, ns, _| {
            if let Some(buf) = bound_buffer_mut(ctx, ns, target) {
                *buf = vec![0; size];
                if let Some(src) = data {
                    let n = src.len().min(size);
                    buf[..n].copy_from_slice(&src[..n]);
                }
            }
        });
    }

    fn buffer_sub_data(&mut self, target: GLenum, offset: usize, data: &[u8]) {
        self.with(|ctx, ns, _| {
            let Some(buf) = bound_buffer_mut(ctx, ns, target) else {
                return;
            };
            match buf.get_mut(offset..offset + data.len()) {
                Some(dst) => dst.copy_from_slice(data),
                None => ctx.record_error(gl::INVALID_VALUE),
            }
        });
    }

    fn get_buffer_sub_data(&mut self, target: GLenum, offset: usize, out: &mut [u8]) {
        self.with(|ctx, ns, _| {
            let Some(buf) = bound_buffer_mut(ctx, ns, target) else {
                return;
            };
            match buf.get(offset..offset + out.len()) {
                Some(src) => out.copy_from_slice(src),
                None => ctx.record_error(gl::INVALID_VALUE),
            }
        });
    }

    fn gen_renderbuffer(&mut self) -> GLuint {
        self.with(|_, ns, _| {
            let name = ns.alloc_name();
            ns.renderbuffers.insert(name, SoftRenderbuffer::default());
            name
        })
    }

    fn delete_renderbuffer(&mut self, name: GLuint) {
        self.with(|ctx, ns, _| {
            ns.renderbuffers.remove(&name);
            if ctx.renderbuffer_binding == name {
                ctx.renderbuffer_binding = 0;
            }
        });
    }

    fn bind_renderbuffer(&mut self, name: GLuint) {
        self.with(|ctx, ns, _| {
            if name != 0 {
                ns.renderbuffers.entry(name).or_default();
            }
            ctx.renderbuffer_binding = name;
        });
    }

    fn renderbuffer_storage(&mut self, internal_format: GLenum, width: u32, height: u32) {
        self.with(|ctx, ns, _| {
            let Some(rb) = ns.renderbuffers.get_mut(&ctx.renderbuffer_binding) else {
                ctx.record_error(gl::INVALID_OPERATION);
                return;
            };
            let (format, ty) = pixels::renderbuffer_layout(internal_format);
            let bpp = pixels::bytes_per_pixel(format, ty).unwrap_or(4);
            *rb = SoftRenderbuffer {
                internal_format,
                width,
                height,
                bytes: vec![0; width as usize * height as usize * bpp],
            };
        });
    }

    fn gen_framebuffer(&mut self) -> GLuint {
        self.with(|ctx, _, _| {
            ctx.next_fbo += 1;
            ctx.framebuffers.insert(ctx.next_fbo, SoftFramebuffer::default());
            ctx.next_fbo
        })
    }

    fn delete_framebuffer(&mut self, name: GLuint) {
        self.ctx(|ctx| {
            ctx.framebuffers.remove(&name);
            if ctx.draw_framebuffer == name {
                ctx.draw_framebuffer = 0;
            }
            if ctx.read_framebuffer == name {
                ctx.read_framebuffer = 0;
            }
        });
    }

    fn bind_framebuffer(&mut self, target: GLenum, name: GLuint) {
        self.ctx(|ctx| {
            if name != 0 {
                ctx.framebuffers.entry(name).or_default();
            }
            match target {
                gl::FRAMEBUFFER => {
                    ctx.draw_framebuffer = name;
                    ctx.read_framebuffer = name;
                }
                gl::DRAW_FRAMEBUFFER => ctx.draw_framebuffer = name,
                gl::READ_FRAMEBUFFER => ctx.read_framebuffer = name,
                _ => ctx.record_error(gl::INVALID_ENUM),
            }
        });
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
        self.ctx(|ctx| {
            let fbo = framebuffer_for(ctx, target);
            let value = (texture != 0).then_some(Attachment::Texture {
                name: texture,
                image_target: tex_target,
                level,
                layer: if tex_target == gl::TEXTURE_3D { layer } else { 0 },
            });
            match ctx.framebuffers.get_mut(&fbo) {
                Some(fb) if fbo != 0 => set_attachment(fb, attachment, value),
                _ => ctx.record_error(gl::INVALID_OPERATION),
            }
        });
    }

    fn framebuffer_renderbuffer(&mut self, target: GLenum, attachment: GLenum, rb: GLuint) {
        self.ctx(|ctx| {
            let fbo = framebuffer_for(ctx, target);
            let value = (rb != 0).then_some(Attachment::Renderbuffer(rb));
            match ctx.framebuffers.get_mut(&fbo) {
                Some(fb) if fbo != 0 => set_attachment(fb, attachment, value),
                _ => ctx.record_error(gl::INVALID_OPERATION),
            }
        });
    }

    fn check_framebuffer_status(&mut self, target: GLenum) -> GLenum {
        self.with(|ctx, ns, _| {
            let fbo = framebuffer_for(ctx, target);
            if fbo == 0 {
                return gl::FRAMEBUFFER_COMPLETE;
            }
            let Some(fb) = ctx.framebuffers.get(&fbo) else {
                return gl::FRAMEBUFFER_UNSUPPORTED;
            };
            if fb.attachments.is_empty() {
                return gl::FRAMEBUFFER_INCOMPLETE_MISSING_ATTACHMENT;
            }
            if fb.attachments.values().any(|att| plane(ns, att).is_none()) {
                return gl::FRAMEBUFFER_INCOMPLETE_ATTACHMENT;
            }
            gl::FRAMEBUFFER_COMPLETE
        })
    }

    fn draw_buffers(&mut self, buffers: &[GLenum]) {
        self.ctx(|ctx| {
            let fbo = ctx.draw_framebuffer;
            if let Some(fb) = ctx.framebuffers.get_mut(&fbo) {
                fb.draw_buffers = buffers.to_vec();
            }
        });
    }

    fn read_buffer(&mut self, mode: GLenum) {
        self.ctx(|ctx| {
            let fbo = ctx.read_framebuffer;
            if let Some(fb) = ctx.framebuffers.get_mut(&fbo) {
                fb.read_buffer = mode;
            }
        });
    }

    fn blit_framebuffer(&mut self, src: BlitRect, dst: BlitRect, mask: GLbitfield, filter: GLenum) {
        self.with(|ctx, ns, _| {
            let (Some(read_fb), Some(draw_fb)) = (
                ctx.framebuffers.get(&ctx.read_framebuffer).cloned(),
                ctx.framebuffers.get(&ctx.draw_framebuffer).cloned(),
            ) else {
                ctx.record_error(gl::INVALID_FRAMEBUFFER_OPERATION);
                return;
            };
            if mask & (gl::DEPTH_BUFFER_BIT | gl::STENCIL_BUFFER_BIT) != 0 && filter != gl::NEAREST {
                ctx.record_error(gl::INVALID_OPERATION);
                return;
            }
            let scissor = ctx.is_enabled(gl::SCISSOR_TEST).then_some(ctx.scissor);

            let mut pairs: Vec<(Attachment, Vec<Attachment>)> = Vec::new();
            if mask & gl::COLOR_BUFFER_BIT != 0 {
                if let Some(s) = read_fb.attachments.get(&read_fb.read_buffer) {
                    let dsts = draw_fb
                        .draw_buffers
                        .iter()
                        .filter_map(|b| draw_fb.attachments.get(b).copied())
                        .collect();
                    pairs.push((*s, dsts));
                }
            }
            let mut depth_pair = None;
            for (bit, point) in [
                (gl::DEPTH_BUFFER_BIT, gl::DEPTH_ATTACHMENT),
                (gl::STENCIL_BUFFER_BIT, gl::STENCIL_ATTACHMENT),
            ] {
                if mask & bit == 0 {
                    continue;
                }
                if let (Some(s), Some(d)) = (read_fb.attachments.get(&point), draw_fb.attachments.get(&point)) {
                    // A packed depth/stencil image is copied once.
                    if depth_pair == Some((*s, *d)) {
                        continue;
                    }
                    depth_pair = Some((*s, *d));
                    pairs.push((*s, vec![*d]));
                }
            }

            for (s, dsts) in pairs {
                let Some((sw, sh, slayout, sbytes)) =
                    plane(ns, &s).map(|p| (p.width, p.height, p.layout, p.bytes.to_vec()))
                else {
                    continue;
                };
                for d in dsts {
                    let Some(target) = plane(ns, &d) else {
                        continue;
                    };
                    let Some(converted) = pixels::convert_layout(&sbytes, slayout, target.layout) else {
                        ctx.record_error(gl::INVALID_OPERATION);
                        continue;
                    };
                    blit_nearest(&converted, (sw, sh), target, src, dst, scissor);
                }
            }
        });
    }

    fn read_pixels(&mut self, x: i32, y: i32, width: u32, height: u32, format: GLenum, ty: GLenum, out: &mut [u8]) {
        self.with(|ctx, ns, _| {
            let Some(bpp) = pixels::bytes_per_pixel(format, ty) else {
                ctx.record_error(gl::INVALID_ENUM);
                return;
            };
            let Some(fb) = ctx.framebuffers.get(&ctx.read_framebuffer).cloned() else {
                out.fill(0);
                return;
            };
            let point = match format {
                gl::DEPTH_COMPONENT | gl::DEPTH_STENCIL => gl::DEPTH_ATTACHMENT,
                gl::STENCIL_INDEX => gl::STENCIL_ATTACHMENT,
                _ => fb.read_buffer,
            };
            let Some(att) = fb.attachments.get(&point) else {
                ctx.record_error(gl::INVALID_OPERATION);
                return;
            };
            let Some(src) = plane(ns, att) else {
                ctx.record_error(gl::INVALID_OPERATION);
                return;
            };
            let Some(converted) = pixels::convert_layout(src.bytes, src.layout, (format, ty)) else {
                ctx.record_error(gl::INVALID_OPERATION);
                return;
            };
            let (row, _) = client_strides(ctx, true, width, height, bpp);
            for yy in 0..height as i64 {
                for xx in 0..width as i64 {
                    let (sx, sy) = (i64::from(x) + xx, i64::from(y) + yy);
                    if sx < 0 || sy < 0 || sx >= i64::from(src.width) || sy >= i64::from(src.height) {
                        continue;
                    }
                    let s = (sy as usize * src.width as usize + sx as usize) * bpp;
                    let o = yy as usize * row + xx as usize * bpp;
                    if let (Some(from), Some(to)) = (converted.get(s..s + bpp), out.get_mut(o..o + bpp)) {
                        to.copy_from_slice(from);
                    }
                }
            }
        });
    }

    fn blend_func(&mut self, src: GLenum, dst: GLenum) {
        self.ctx(|ctx| {
            ctx.blend_src = (src, src);
            ctx.blend_dst = (dst, dst);
        });
    }

    fn blend_func_separate(&mut self, src_rgb: GLenum, dst_rgb: GLenum, src_a: GLenum, dst_a: GLenum) {
        self.ctx(|ctx| {
            ctx.blend_src = (src_rgb, src_a);
            ctx.blend_dst = (dst_rgb, dst_a);
        });
    }

    fn blend_equation(&mut self, mode: GLenum) {
        self.ctx(|ctx| ctx.blend_equation = (mode, mode));
    }

    fn blend_equation_separate(&mut self, mode_rgb: GLenum, mode_alpha: GLenum) {
        self.ctx(|ctx| ctx.blend_equation = (mode_rgb, mode_alpha));
    }

    fn blend_color(&mut self, rgba: [GLfloat; 4]) {
        self.ctx(|ctx| ctx.blend_color = rgba);
    }

    fn depth_func(&mut self, func: GLenum) {
        self.ctx(|ctx| ctx.depth_func = func);
    }

    fn depth_mask(&mut self, on: bool) {
        self.ctx(|ctx| ctx.depth_mask = on);
    }

    fn depth_range(&mut self, near: GLdouble, far: GLdouble) {
        self.ctx(|ctx| ctx.depth_range = (near.clamp(0.0, 1.0), far.clamp(0.0, 1.0)));
    }

    fn stencil_func(&mut self, func: GLenum, reference: GLint, mask: GLuint) {
        self.stencil_func_separate(gl::FRONT_AND_BACK, func, reference, mask);
    }

    fn stencil_func_separate(&mut self, face: GLenum, func: GLenum, reference: GLint, mask: GLuint) {
        self.ctx(|ctx| {
            for_faces(ctx, face, |s| {
                s.func = func;
                s.reference = reference;
                s.value_mask = mask;
            })
        });
    }

    fn stencil_op(&mut self, sfail: GLenum, dpfail: GLenum, dppass: GLenum) {
        self.stencil_op_separate(gl::FRONT_AND_BACK, sfail, dpfail, dppass);
    }

    fn stencil_op_separate(&mut self, face: GLenum, sfail: GLenum, dpfail: GLenum, dppass: GLenum) {
        self.ctx(|ctx| {
            for_faces(ctx, face, |s| {
                s.fail = sfail;
                s.zfail = dpfail;
                s.zpass = dppass;
            })
        });
    }

    fn stencil_mask(&mut self, mask: GLuint) {
        self.ctx(|ctx| for_faces(ctx, gl::FRONT_AND_BACK, |s| s.write_mask = mask));
    }

    fn alpha_func(&mut self, func: GLenum, reference: GLfloat) {
        self.ctx(|ctx| ctx.alpha_func = (func, reference.clamp(0.0, 1.0)));
    }

    fn color_mask(&mut self, mask: [bool; 4]) {
        self.ctx(|ctx| ctx.color_masks = [mask; 8]);
    }

    fn color_mask_i(&mut self, index: u32, mask: [bool; 4]) {
        self.ctx(|ctx| match ctx.color_masks.get_mut(index as usize) {
            Some(m) => *m = mask,
            None => ctx.record_error(gl::INVALID_VALUE),
        });
    }

    fn cull_face(&mut self, mode: GLenum) {
        self.ctx(|ctx| ctx.cull_face = mode);
    }

    fn front_face(&mut self, mode: GLenum) {
        self.ctx(|ctx| ctx.front_face = mode);
    }

    fn polygon_mode(&mut self, face: GLenum, mode: GLenum) {
        self.ctx(|ctx| match face {
            gl::FRONT => ctx.polygon_mode.0 = mode,
            gl::BACK => ctx.polygon_mode.1 = mode,
            gl::FRONT_AND_BACK => ctx.polygon_mode = (mode, mode),
            _ => ctx.record_error(gl::INVALID_ENUM),
        });
    }

    fn shade_model(&mut self, mode: GLenum) {
        self.ctx(|ctx| ctx.shade_model = mode);
    }

    fn polygon_offset(&mut self, factor: GLfloat, units: GLfloat) {
        self.ctx(|ctx| ctx.polygon_offset = (factor, units));
    }

    fn point_size(&mut self, size: GLfloat) {
        self.ctx(|ctx| {
            if size <= 0.0 {
                ctx.record_error(gl::INVALID_VALUE);
            } else {
                ctx.point_size = size;
            }
        });
    }

    fn point_parameter_f(&mut self, pname: GLenum, value: GLfloat) {
        self.ctx(|ctx| {
            ctx.point_params.insert(pname, [value, 0.0, 0.0]);
        });
    }

    fn point_parameter_fv(&mut self, pname: GLenum, values: &[GLfloat; 3]) {
        self.ctx(|ctx| {
            ctx.point_params.insert(pname, *values);
        });
    }

    fn line_width(&mut self, width: GLfloat) {
        self.ctx(|ctx| ctx.line_width = width);
    }

    fn line_stipple(&mut self, factor: GLint, pattern: u16) {
        self.ctx(|ctx| ctx.line_stipple = (factor.clamp(1, 256), pattern));
    }

    fn viewport(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.ctx(|ctx| ctx.viewport = [x, y, width as i32, height as i32]);
    }

    fn scissor(&mut self, x: i32, y: i32, width: u32, height: u32) {
        self.ctx(|ctx| ctx.scissor = [x, y, width as i32, height as i32]);
    }

    fn fog_i(&mut self, pname: GLenum, value: GLint) {
        self.ctx(|ctx| {
            ctx.fog_i.insert(pname, value);
        });
    }

    fn fog_f(&mut self, pname: GLenum, value: GLfloat) {
        self.ctx(|ctx| {
            ctx.fog_f.insert(pname, value);
        });
    }

    fn fog_fv(&mut self, pname: GLenum, values: &[GLfloat; 4]) {
        self.ctx(|ctx| {
            if pname == gl::FOG_COLOR {
                ctx.fog_color = *values;
            } else {
                ctx.record_error(gl::INVALID_ENUM);
            }
        });
    }

    fn light_model_i(&mut self, pname: GLenum, value: GLint) {
        self.ctx(|ctx| {
            ctx.light_model_i.insert(pname, value);
        });
    }

    fn light_model_fv(&mut self, pname: GLenum, values: &[GLfloat; 4]) {
        self.ctx(|ctx| {
            if pname == gl::LIGHT_MODEL_AMBIENT {
                ctx.light_model_ambient = *values;
            } else {
                ctx.record_error(gl::INVALID_ENUM);
            }
        });
    }

    fn clear_color(&mut self, rgba: [GLfloat; 4]) {
        self.ctx(|ctx| ctx.clear_color = rgba.map(|c| c.clamp(0.0, 1.0)));
    }

    fn clear_depth(&mut self, depth: GLdouble) {
        self.ctx(|ctx| ctx.clear_depth = depth.clamp(0.0, 1.0));
    }

    fn clear_stencil(&mut self, s: GLint) {
        self.ctx(|ctx| ctx.clear_stencil = s);
    }

    fn clear(&mut self, mask: GLbitfield) {
        self.with(|ctx, ns, _| {
            let Some(fb) = ctx.framebuffers.get(&ctx.draw_framebuffer).cloned() else {
                tracing::trace!("soft host ignores clears of the window framebuffer");
                return;
            };
            let scissor = ctx.is_enabled(gl::SCISSOR_TEST).then_some(ctx.scissor);

            if mask & gl::COLOR_BUFFER_BIT != 0 {
                for (i, buffer) in fb.draw_buffers.iter().enumerate() {
                    let Some(att) = fb.attachments.get(buffer) else {
                        continue;
                    };
                    let Some(target) = plane(ns, att) else {
                        continue;
                    };
                    let Some(texel) = pixels::encode_color(target.layout.0, target.layout.1, ctx.clear_color)
                    else {
                        tracing::debug!(layout = ?target.layout, "soft host can't clear this colour layout");
                        continue;
                    };
                    let cmask = ctx.color_masks[i.min(7)];
                    let lanes = pixels::channel_lanes(target.layout.0, target.layout.1);
                    fill(target, scissor, |dst| match lanes {
                        Some(l) if cmask != [true; 4] => {
                            for ch in 0..4 {
                                if cmask[ch] {
                                    dst[l[ch]] = texel[l[ch]];
                                }
                            }
                        }
                        _ if cmask.iter().any(|m| *m) => dst.copy_from_slice(&texel),
                        _ => {}
                    });
                }
            }

            let depth = (mask & gl::DEPTH_BUFFER_BIT != 0 && ctx.depth_mask).then_some(ctx.clear_depth);
            let stencil = (mask & gl::STENCIL_BUFFER_BIT != 0 && ctx.stencil_front.write_mask & 0xff != 0)
                .then_some(ctx.clear_stencil as u8);
            let d = fb.attachments.get(&gl::DEPTH_ATTACHMENT).copied();
            let s = fb.attachments.get(&gl::STENCIL_ATTACHMENT).copied();
            let jobs = if d.is_some() && d == s {
                vec![(d, DepthClear { depth, stencil })]
            } else {
                vec![
                    (d, DepthClear { depth, stencil: None }),
                    (s, DepthClear { depth: None, stencil }),
                ]
            };
            for (att, job) in jobs {
                if job.depth.is_none() && job.stencil.is_none() {
                    continue;
                }
                let Some(att) = att else {
                    continue;
                };
                if let Some(target) = plane(ns, &att) {
                    let layout = target.layout;
                    fill(target, scissor, |texel| pixels::clear_depth_texel(layout.0, layout.1, texel, job));
                }
            }
        });
    }

    fn matrix_mode(&mut self, mode: GLenum) {
        self.ctx(|ctx| match mode {
            gl::MODELVIEW | gl::PROJECTION | gl::TEXTURE => ctx.matrix_mode = mode,
            _ => ctx.record_error(gl::INVALID_ENUM),
        });
    }

    fn load_matrix(&mut self, m: &[GLfloat; 16]) {
        self.ctx(|ctx| {
            if let Some(top) = matrix_stack(ctx).and_then(|s| s.last_mut()) {
                *top = *m;
            }
        });
    }

    fn load_identity(&mut self) {
        self.load_matrix(&IDENTITY);
    }

    fn push_matrix(&mut self) {
        self.ctx(|ctx| {
            let overflow = match matrix_stack(ctx) {
                Some(stack) if stack.len() < MAX_MATRIX_DEPTH => {
                    let top = stack.last().copied().unwrap_or(IDENTITY);
                    stack.push(top);
                    false
                }
                _ => true,
            };
            if overflow {
                ctx.record_error(gl::STACK_OVERFLOW);
            }
        });
    }

    fn pop_matrix(&mut self) {
        self.ctx(|ctx| {
            let underflow = match matrix_stack(ctx) {
                Some(stack) if stack.len() > 1 => {
                    stack.pop();
                    false
                }
                _ => true,
            };
            if underflow {
                ctx.record_error(gl::STACK_UNDERFLOW);
            }
        });
    }

    fn light_fv(&mut self, light: GLenum, pname: GLenum, values: &[GLfloat]) {
        self.ctx(|ctx| {
            let mv = ctx.modelview_top();
            let idx = light.wrapping_sub(gl::LIGHT0) as usize;
            let Some(l) = ctx.lights.get_mut(idx) else {
                ctx.record_error(gl::INVALID_ENUM);
                return;
            };
            match pname {
                gl::AMBIENT => l.ambient = vec4(values, [0.0, 0.0, 0.0, 1.0]),
                gl::DIFFUSE => l.diffuse = vec4(values, [0.0, 0.0, 0.0, 1.0]),
                gl::SPECULAR => l.specular = vec4(values, [0.0, 0.0, 0.0, 1.0]),
                gl::POSITION => l.position = math::transform(&mv, vec4(values, [0.0, 0.0, 0.0, 1.0])),
                gl::SPOT_DIRECTION => {
                    let v = vec4(values, [0.0; 4]);
                    l.spot_direction = math::transform_dir(&mv, [v[0], v[1], v[2]]);
                }
                _ => match values.first() {
                    Some(v) => set_light_scalar(ctx, idx, pname, *v),
                    None => ctx.record_error(gl::INVALID_VALUE),
                },
            }
        });
    }

    fn light_f(&mut self, light: GLenum, pname: GLenum, value: GLfloat) {
        self.ctx(|ctx| {
            let idx = light.wrapping_sub(gl::LIGHT0) as usize;
            set_light_scalar(ctx, idx, pname, value);
        });
    }

    fn material_fv(&mut self, face: GLenum, pname: GLenum, values: &[GLfloat]) {
        self.ctx(|ctx| {
            let faces: &[GLenum] = match face {
                gl::FRONT_AND_BACK => &[gl::FRONT, gl::BACK],
                gl::FRONT => &[gl::FRONT],
                gl::BACK => &[gl::BACK],
                _ => {
                    ctx.record_error(gl::INVALID_ENUM);
                    return;
                }
            };
            let pnames: &[GLenum] = if pname == gl::AMBIENT_AND_DIFFUSE {
                &[gl::AMBIENT, gl::DIFFUSE]
            } else {
                std::slice::from_ref(&pname)
            };
            for f in faces {
                for p in pnames {
                    ctx.materials.insert((*f, *p), values.to_vec());
                }
            }
        });
    }

    fn material_f(&mut self, face: GLenum, pname: GLenum, value: GLfloat) {
        self.material_fv(face, pname, &[value]);
    }

    fn color_material(&mut self, face: GLenum, mode: GLenum) {
        self.ctx(|ctx| ctx.color_material = (face, mode));
    }

    fn clip_plane(&mut self, plane: GLenum, equation: &[GLdouble; 4]) {
        self.ctx(|ctx| {
            let inv = math::inverse(&ctx.modelview_top()).unwrap_or(IDENTITY);
            let idx = plane.wrapping_sub(gl::CLIP_PLANE0) as usize;
            let Some(slot) = ctx.clip_planes.get_mut(idx) else {
                ctx.record_error(gl::INVALID_ENUM);
                return;
            };
            // Planes are row vectors: eye = p * M^-1.
            let mut eye = [0.0f64; 4];
            for (c, e) in eye.iter_mut().enumerate() {
                *e = (0..4).map(|r| equation[r] * f64::from(inv[c * 4 + r])).sum();
            }
            *slot = eye;
        });
    }

    fn enable_client_state(&mut self, array: GLenum) {
        self.ctx(|ctx| match array_slot(ctx, array) {
            Some(slot) => ctx.arrays.entry(slot).or_default().enabled = true,
            None => ctx.record_error(gl::INVALID_ENUM),
        });
    }

    fn disable_client_state(&mut self, array: GLenum) {
        self.ctx(|ctx| match array_slot(ctx, array) {
            Some(slot) => ctx.arrays.entry(slot).or_default().enabled = false,
            None => ctx.record_error(gl::INVALID_ENUM),
        });
    }

    fn client_active_texture(&mut self, unit: GLenum) {
        self.ctx(|ctx| match unit.checked_sub(gl::TEXTURE0) {
            Some(u) if u < 32 => ctx.client_active_texture = u,
            _ => ctx.record_error(gl::INVALID_ENUM),
        });
    }

    fn vertex_pointer(&mut self, size: i32, ty: GLenum, stride: u32, offset: usize) {
        self.ctx(|ctx| set_pointer(ctx, AttribSlot::Position, size, ty, false, stride, offset));
    }

    fn normal_pointer(&mut self, ty: GLenum, stride: u32, offset: usize) {
        self.ctx(|ctx| set_pointer(ctx, AttribSlot::Normal, 3, ty, is_integer_type(ty), stride, offset));
    }

    fn color_pointer(&mut self, size: i32, ty: GLenum, stride: u32, offset: usize) {
        self.ctx(|ctx| set_pointer(ctx, AttribSlot::Color, size, ty, is_integer_type(ty), stride, offset));
    }

    fn secondary_color_pointer(&mut self, size: i32, ty: GLenum, stride: u32, offset: usize) {
        self.ctx(|ctx| {
            set_pointer(ctx, AttribSlot::SecondaryColor, size, ty, is_integer_type(ty), stride, offset)
        });
    }

    fn tex_coord_pointer(&mut self, size: i32, ty: GLenum, stride: u32, offset: usize) {
        self.ctx(|ctx| {
            let slot = AttribSlot::TexCoord(ctx.client_active_texture);
            set_pointer(ctx, slot, size, ty, false, stride, offset)
        });
    }

    fn fog_coord_pointer(&mut self, ty: GLenum, stride: u32, offset: usize) {
        self.ctx(|ctx| set_pointer(ctx, AttribSlot::FogCoord, 1, ty, false, stride, offset));
    }

    fn enable_vertex_attrib_array(&mut self, index: u32) {
        self.ctx(|ctx| ctx.arrays.entry(AttribSlot::Generic(index)).or_default().enabled = true);
    }

    fn disable_vertex_attrib_array(&mut self, index: u32) {
        self.ctx(|ctx| ctx.arrays.entry(AttribSlot::Generic(index)).or_default().enabled = false);
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
        self.ctx(|ctx| set_pointer(ctx, AttribSlot::Generic(index), size, ty, normalized, stride, offset));
    }

    fn vertex_attrib_divisor(&mut self, index: u32, divisor: u32) {
        self.ctx(|ctx| ctx.arrays.entry(AttribSlot::Generic(index)).or_default().divisor = divisor);
    }

    fn vertex_attrib_4fv(&mut self, index: u32, v: &[GLfloat; 4]) {
        self.ctx(|ctx| {
            ctx.current.insert(AttribSlot::Generic(index), *v);
        });
    }

    fn color_4fv(&mut self, v: &[GLfloat; 4]) {
        self.ctx(|ctx| {
            ctx.current.insert(AttribSlot::Color, *v);
        });
    }

    fn secondary_color_3fv(&mut self, v: &[GLfloat; 3]) {
        self.ctx(|ctx| {
            ctx.current.insert(AttribSlot::SecondaryColor, [v[0], v[1], v[2], 1.0]);
        });
    }

    fn normal_3fv(&mut self, v: &[GLfloat; 3]) {
        self.ctx(|ctx| {
            ctx.current.insert(AttribSlot::Normal, [v[0], v[1], v[2], 0.0]);
        });
    }

    fn multi_tex_coord_4fv(&mut self, unit: GLenum, v: &[GLfloat; 4]) {
        self.ctx(|ctx| match unit.checked_sub(gl::TEXTURE0) {
            Some(u) => {
                ctx.current.insert(AttribSlot::TexCoord(u), *v);
            }
            None => ctx.record_error(gl::INVALID_ENUM),
        });
    }

    fn fog_coord_f(&mut self, v: GLfloat) {
        self.ctx(|ctx| {
            ctx.current.insert(AttribSlot::FogCoord, [v, 0.0, 0.0, 1.0]);
        });
    }

    fn draw_arrays(&mut self, mode: GLenum, first: i32, count: u32) {
        self.draw(mode, DrawSource::Arrays { first, count }, 1, 0);
    }

    fn draw_arrays_instanced(&mut self, mode: GLenum, first: i32, count: u32, instances: u32) {
        self.draw(mode, DrawSource::Arrays { first, count }, instances, 0);
    }

    fn draw_elements(&mut self, mode: GLenum, count: u32, ty: GLenum, offset: usize) {
        self.draw(mode, DrawSource::Elements { count, ty, offset }, 1, 0);
    }

    fn draw_elements_instanced(&mut self, mode: GLenum, count: u32, ty: GLenum, offset: usize, instances: u32) {
        self.draw(mode, DrawSource::Elements { count, ty, offset }, instances, 0);
    }

    fn draw_elements_base_vertex(&mut self, mode: GLenum, count: u32, ty: GLenum, offset: usize, base_vertex: i32) {
        self.draw(mode, DrawSource::Elements { count, ty, offset }, 1, base_vertex);
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
        self.draw(mode, DrawSource::Elements { count, ty, offset }, instances, base_vertex);
    }

    fn gen_query(&mut self) -> GLuint {
        self.with(|ctx, _, _| {
            ctx.next_query += 1;
            ctx.queries.insert(ctx.next_query, SoftQuery::default());
            ctx.next_query
        })
    }

    fn delete_query(&mut self, name: GLuint) {
        self.ctx(|ctx| {
            ctx.queries.remove(&name);
            if ctx.active_query.is_some_and(|(_, q)| q == name) {
                ctx.active_query = None;
            }
        });
    }

    fn begin_query(&mut self, target: GLenum, name: GLuint) {
        self.ctx(|ctx| {
            if ctx.active_query.is_some() || name == 0 {
                ctx.record_error(gl::INVALID_OPERATION);
                return;
            }
            ctx.queries.insert(
                name,
                SoftQuery {
                    target,
                    result: 0,
                    active: true,
                },
            );
            ctx.active_query = Some((target, name));
        });
    }

    fn end_query(&mut self, target: GLenum) {
        self.ctx(|ctx| match ctx.active_query.take() {
            Some((t, name)) if t == target => {
                if let Some(q) = ctx.queries.get_mut(&name) {
                    q.active = false;
                }
            }
            other => {
                ctx.active_query = other;
                ctx.record_error(gl::INVALID_OPERATION);
            }
        });
    }

    fn get_query_object_u32(&mut self, name: GLuint, pname: GLenum) -> u32 {
        self.with(|ctx, _, _| match (ctx.queries.get(&name), pname) {
            (Some(q), gl::QUERY_RESULT) => q.result,
            (Some(q), gl::QUERY_RESULT_AVAILABLE) => u32::from(!q.active),
            _ => {
                ctx.record_error(gl::INVALID_OPERATION);
                0
            }
        })
    }
}

/// Scalar light parameters.
fn set_light_scalar(ctx: &mut SoftContextState, idx: usize, pname: GLenum, value: f32) {
    let Some(l) = ctx.lights.get_mut(idx) else {
        ctx.record_error(gl::INVALID_ENUM);
        return;
    };
    match pname {
        gl::SPOT_EXPONENT => l.spot_exponent = value,
        gl::SPOT_CUTOFF => l.spot_cutoff = value,
        gl::CONSTANT_ATTENUATION => l.constant_attenuation = value,
        gl::LINEAR_ATTENUATION => l.linear_attenuation = value,
        gl::QUADRATIC_ATTENUATION => l.quadratic_attenuation = value,
        _ => ctx.record_error(gl::INVALID_ENUM),
    }
}
