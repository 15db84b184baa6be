//! Per-context state shadow and its translation to host state.
//!
//! Every settable value the guest sends is recorded in [`StateShadow`] and, when the host
//! can express it, programmed immediately. Composite host state (blending, stencil, fog,
//! colour material, point attenuation) is re-derived from the shadow as a whole whenever
//! one of its inputs changes, so the order in which the guest sets related states does
//! not matter.

pub(crate) mod render;
pub(crate) mod target;
pub(crate) mod texture;
pub(crate) mod transform;

use svga3d_protocol::state::{RenderStateId, TextureStateId, TransformType};
use svga3d_protocol::{LightData, Material, Rect, SurfaceImageId, ZRange};

use crate::caps::{HostCaps, HostFeatures};
use crate::config::{MAX_CLIP_PLANES, MAX_LIGHTS, MAX_RENDER_TARGETS, MAX_TEXTURE_STAGES};
use crate::gl::{drain_errors, GLenum, GLuint, GlApi};
use crate::math::Mat4;

/// A surface bound to a texture stage, resolved to its host object.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundTexture {
    pub sid: u32,
    pub target: GLenum,
    pub name: GLuint,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LightSlot {
    pub data: Option<LightData>,
    pub enabled: bool,
}

/// Number of render-target slots: depth, stencil and the colour targets.
pub const RENDER_TARGET_SLOTS: usize = 2 + MAX_RENDER_TARGETS;

/// The guest-visible state of one context, as last set by the guest.
///
/// `None` means "never set"; the host then still holds its own default.
#[derive(Clone, Debug)]
pub struct StateShadow {
    pub render: [Option<u32>; RenderStateId::MAX as usize],
    pub texture: [[Option<u32>; TextureStateId::MAX as usize]; MAX_TEXTURE_STAGES],
    pub transforms: [Option<Mat4>; TransformType::SLOTS],
    pub lights: [LightSlot; MAX_LIGHTS],
    pub clip_planes: [Option<[f32; 4]>; MAX_CLIP_PLANES],
    pub material: Option<Material>,
    pub viewport: Option<Rect>,
    pub scissor: Option<Rect>,
    pub z_range: Option<ZRange>,
    /// Indexed by `RenderTargetType`.
    pub render_targets: [Option<SurfaceImageId>; RENDER_TARGET_SLOTS],
    pub textures: [Option<BoundTexture>; MAX_TEXTURE_STAGES],
}

impl Default for StateShadow {
    fn default() -> Self {
        Self {
            render: [None; RenderStateId::MAX as usize],
            texture: [[None; TextureStateId::MAX as usize]; MAX_TEXTURE_STAGES],
            transforms: [None; TransformType::SLOTS],
            lights: [LightSlot::default(); MAX_LIGHTS],
            clip_planes: [None; MAX_CLIP_PLANES],
            material: None,
            viewport: None,
            scissor: None,
            z_range: None,
            render_targets: [None; RENDER_TARGET_SLOTS],
            textures: [None; MAX_TEXTURE_STAGES],
        }
    }
}

impl StateShadow {
    pub fn render_state(&self, id: RenderStateId) -> Option<u32> {
        self.render.get(id as usize).copied().flatten()
    }

    pub fn texture_state(&self, stage: usize, name: TextureStateId) -> Option<u32> {
        self.texture
            .get(stage)
            .and_then(|s| s.get(name as usize))
            .copied()
            .flatten()
    }

    pub fn transform(&self, ty: TransformType) -> Option<&Mat4> {
        self.transforms.get(ty as usize).and_then(Option::as_ref)
    }

    /// Texture coordinate set a fixed-function stage samples with.
    pub fn texcoord_index(&self, stage: usize) -> u32 {
        self.texture_state(stage, TextureStateId::TexCoordIndex)
            .map_or(stage as u32, |v| v & 0xffff)
    }

    /// Forgets every host object reference; used when a surface goes away.
    pub(crate) fn forget_surface(&mut self, sid: u32) {
        for slot in &mut self.render_targets {
            if slot.is_some_and(|img| img.sid == sid) {
                *slot = None;
            }
        }
        for slot in &mut self.textures {
            if slot.is_some_and(|t| t.sid == sid) {
                *slot = None;
            }
        }
    }
}

/// Everything a state handler needs: the host, its limits and the context's shadow.
/// The guest context must be current.
pub(crate) struct Apply<'a> {
    pub gl: &'a mut dyn GlApi,
    pub caps: &'a HostCaps,
    pub shadow: &'a mut StateShadow,
    /// Host objects of the surfaces a batch binds to texture stages.
    pub resolved: &'a [BoundTexture],
    check_errors: bool,
}

impl<'a> Apply<'a> {
    pub fn new(
        gl: &'a mut dyn GlApi,
        caps: &'a HostCaps,
        shadow: &'a mut StateShadow,
        check_errors: bool,
    ) -> Self {
        Self {
            gl,
            caps,
            shadow,
            resolved: &[],
            check_errors,
        }
    }

    pub fn with_textures(mut self, resolved: &'a [BoundTexture]) -> Self {
        self.resolved = resolved;
        self
    }

    pub fn supports(&self, f: HostFeatures) -> bool {
        self.caps.supports(f)
    }

    pub fn rs(&self, id: RenderStateId) -> Option<u32> {
        self.shadow.render_state(id)
    }

    pub fn rs_or(&self, id: RenderStateId, default: u32) -> u32 {
        self.rs(id).unwrap_or(default)
    }

    pub fn rs_f32(&self, id: RenderStateId, default: f32) -> f32 {
        self.rs(id).map_or(default, f32::from_bits)
    }

    pub fn trace(&mut self, op: &str) {
        if self.check_errors {
            drain_errors(&mut *self.gl, op);
        }
    }

    pub fn set_viewport(&mut self, rect: Rect) {
        self.shadow.viewport = Some(rect);
        self.gl.viewport(rect.x as i32, rect.y as i32, rect.w, rect.h);
        self.trace("set viewport");
    }

    pub fn set_scissor(&mut self, rect: Rect) {
        self.shadow.scissor = Some(rect);
        self.gl.scissor(rect.x as i32, rect.y as i32, rect.w, rect.h);
        self.trace("set scissor rect");
    }

    pub fn set_z_range(&mut self, range: ZRange) {
        self.shadow.z_range = Some(range);
        self.gl
            .depth_range(f64::from(range.min.clamp(0.0, 1.0)), f64::from(range.max.clamp(0.0, 1.0)));
        self.trace("set z range");
    }
}

/// D3D colour (`0xAARRGGBB`) to host RGBA floats.
pub(crate) fn argb(c: u32) -> [f32; 4] {
    let ch = |shift: u32| ((c >> shift) & 0xff) as f32 / 255.0;
    [ch(16), ch(8), ch(0), ch(24)]
}

/// Clamps without panicking on an inverted or NaN host range.
pub(crate) fn clamp_to(v: f32, range: [f32; 2]) -> f32 {
    v.max(range[0]).min(range[1])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argb_unpacks_in_rgba_order() {
        assert_eq!(argb(0xff00_00ff), [0.0, 0.0, 1.0, 1.0]);
        assert_eq!(argb(0x80ff_0000), [1.0, 0.0, 0.0, 128.0 / 255.0]);
    }

    #[test]
    fn clamp_survives_inverted_ranges() {
        assert_eq!(clamp_to(100.0, [1.0, 64.0]), 64.0);
        assert_eq!(clamp_to(0.5, [1.0, 64.0]), 1.0);
        assert_eq!(clamp_to(3.0, [4.0, 2.0]), 2.0);
    }

    #[test]
    fn forgetting_a_surface_clears_every_reference() {
        let mut s = StateShadow::default();
        s.render_targets[2] = Some(SurfaceImageId::new(5, 0, 0));
        s.textures[3] = Some(BoundTexture {
            sid: 5,
            target: crate::gl::consts::TEXTURE_2D,
            name: 9,
        });
        s.textures[4] = Some(BoundTexture {
            sid: 6,
            target: crate::gl::consts::TEXTURE_2D,
            name: 10,
        });
        s.forget_surface(5);
        assert_eq!(s.render_targets[2], None);
        assert_eq!(s.textures[3], None);
        assert!(s.textures[4].is_some());
    }

    #[test]
    fn texcoord_index_defaults_to_the_stage() {
        let mut s = StateShadow::default();
        assert_eq!(s.texcoord_index(3), 3);
        s.texture[3][TextureStateId::TexCoordIndex as usize] = Some(0x0003_0001);
        assert_eq!(s.texcoord_index(3), 1);
    }
}
