//! Fixed-layout structures embedded in command bodies.
//!
//! All structures are `#[repr(C)]` with 32-bit fields only, so command payloads can be
//! viewed with `bytemuck::pod_read_unaligned` by the dispatcher.

use bytemuck::{Pod, Zeroable};

use crate::draw::{DeclType, DeclUsage, PrimitiveType};
use crate::state::{LightType, RenderStateId, TextureStateId};

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub const fn new(x: u32, y: u32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }
}

/// `SVGA3dSize`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Size3 {
    pub width: u32,
    pub height: u32,
    pub depth: u32,
}

impl Size3 {
    pub const fn new(width: u32, height: u32, depth: u32) -> Self {
        Self {
            width,
            height,
            depth,
        }
    }
}

/// `SVGA3dBox`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct Box3 {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub w: u32,
    pub h: u32,
    pub d: u32,
}

/// `SVGA3dCopyBox`: destination box plus source origin.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct CopyBox {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub w: u32,
    pub h: u32,
    pub d: u32,
    pub srcx: u32,
    pub srcy: u32,
    pub srcz: u32,
}

impl CopyBox {
    /// A box whose source and destination origins coincide.
    pub const fn same_origin(x: u32, y: u32, z: u32, w: u32, h: u32, d: u32) -> Self {
        Self {
            x,
            y,
            z,
            w,
            h,
            d,
            srcx: x,
            srcy: y,
            srcz: z,
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Pod, Zeroable)]
pub struct SurfaceImageId {
    pub sid: u32,
    pub face: u32,
    pub mipmap: u32,
}

impl SurfaceImageId {
    pub const fn new(sid: u32, face: u32, mipmap: u32) -> Self {
        Self { sid, face, mipmap }
    }
}

/// Guest memory pointer: guest memory region (GMR) plus byte offset.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct GuestPtr {
    pub gmr_id: u32,
    pub offset: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct GuestImage {
    pub ptr: GuestPtr,
    /// Bytes between guest rows; 0 means tightly packed.
    pub pitch: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct VertexArrayIdentity {
    pub ty: u32,
    pub method: u32,
    pub usage: u32,
    pub usage_index: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ArrayDesc {
    pub surface_id: u32,
    pub offset: u32,
    pub stride: u32,
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct ArrayRangeHint {
    pub first: u32,
    pub last: u32,
}

/// `SVGA3dVertexDecl`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct VertexDecl {
    pub identity: VertexArrayIdentity,
    pub array: ArrayDesc,
    pub range_hint: ArrayRangeHint,
}

impl VertexDecl {
    pub fn decl_type(&self) -> Option<DeclType> {
        DeclType::from_u32(self.identity.ty)
    }

    pub fn usage(&self) -> Option<DeclUsage> {
        DeclUsage::from_u32(self.identity.usage)
    }
}

/// `SVGA3dPrimitiveRange`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct PrimitiveRange {
    pub prim_type: u32,
    pub primitive_count: u32,
    pub index_array: ArrayDesc,
    /// 0 for non-indexed draws, otherwise 2 or 4.
    pub index_width: u32,
    pub index_bias: i32,
}

impl PrimitiveRange {
    pub fn primitive_type(&self) -> Option<PrimitiveType> {
        PrimitiveType::from_u32(self.prim_type)
    }
}

/// `SVGA3dVertexDivisor`: count in bits 0..30, `indexedData` bit 30, `instanceData` bit 31.
#[repr(transparent)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct VertexDivisor(pub u32);

impl VertexDivisor {
    const COUNT_MASK: u32 = (1 << 30) - 1;

    pub const fn new(count: u32, indexed_data: bool, instance_data: bool) -> Self {
        let mut v = count & Self::COUNT_MASK;
        if indexed_data {
            v |= 1 << 30;
        }
        if instance_data {
            v |= 1 << 31;
        }
        Self(v)
    }

    pub const fn count(self) -> u32 {
        self.0 & Self::COUNT_MASK
    }

    pub const fn indexed_data(self) -> bool {
        self.0 & (1 << 30) != 0
    }

    pub const fn instance_data(self) -> bool {
        self.0 & (1 << 31) != 0
    }
}

/// `SVGA3dLightData`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct LightData {
    pub ty: u32,
    /// Boolean: position/direction are world-space (otherwise view-space).
    pub in_world_space: u32,
    pub diffuse: [f32; 4],
    pub specular: [f32; 4],
    pub ambient: [f32; 4],
    pub position: [f32; 4],
    pub direction: [f32; 4],
    pub range: f32,
    pub falloff: f32,
    pub attenuation0: f32,
    pub attenuation1: f32,
    pub attenuation2: f32,
    pub theta: f32,
    pub phi: f32,
}

impl LightData {
    pub fn light_type(&self) -> Option<LightType> {
        LightType::from_u32(self.ty)
    }
}

/// `SVGA3dMaterial`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Material {
    pub diffuse: [f32; 4],
    pub ambient: [f32; 4],
    pub specular: [f32; 4],
    pub emissive: [f32; 4],
    pub shininess: f32,
}

/// `SVGA3dRenderState`: the value is a u32 or an f32 depending on the state.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct RenderState {
    pub state: u32,
    pub value: u32,
}

impl RenderState {
    pub const fn new(state: RenderStateId, value: u32) -> Self {
        Self {
            state: state as u32,
            value,
        }
    }

    pub fn from_f32(state: RenderStateId, value: f32) -> Self {
        Self {
            state: state as u32,
            value: value.to_bits(),
        }
    }

    pub fn float_value(&self) -> f32 {
        f32::from_bits(self.value)
    }
}

/// `SVGA3dTextureState`.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Pod, Zeroable)]
pub struct TextureState {
    pub stage: u32,
    pub name: u32,
    pub value: u32,
}

impl TextureState {
    pub const fn new(stage: u32, name: TextureStateId, value: u32) -> Self {
        Self {
            stage,
            name: name as u32,
            value,
        }
    }

    pub fn from_f32(stage: u32, name: TextureStateId, value: f32) -> Self {
        Self {
            stage,
            name: name as u32,
            value: value.to_bits(),
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct ZRange {
    pub min: f32,
    pub max: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_struct_sizes_match_protocol() {
        assert_eq!(core::mem::size_of::<CopyBox>(), 36);
        assert_eq!(core::mem::size_of::<VertexDecl>(), 36);
        assert_eq!(core::mem::size_of::<PrimitiveRange>(), 28);
        assert_eq!(core::mem::size_of::<LightData>(), 116);
        assert_eq!(core::mem::size_of::<Material>(), 68);
    }

    #[test]
    fn divisor_bits_decode() {
        let d = VertexDivisor::new(7, false, true);
        assert_eq!(d.count(), 7);
        assert!(d.instance_data());
        assert!(!d.indexed_data());

        let raw = VertexDivisor(0x4000_0003);
        assert!(raw.indexed_data());
        assert_eq!(raw.count(), 3);
    }

    #[test]
    fn decl_is_readable_from_unaligned_bytes() {
        let mut bytes = vec![0u8; 1 + 36];
        let words: [u32; 9] = [2, 0, 3, 0, 5, 16, 12, 0, 0];
        for (i, w) in words.iter().enumerate() {
            bytes[1 + i * 4..1 + i * 4 + 4].copy_from_slice(&w.to_le_bytes());
        }
        let decl: VertexDecl = bytemuck::pod_read_unaligned(&bytes[1..]);
        assert_eq!(decl.decl_type(), Some(DeclType::Float3));
        assert_eq!(decl.usage(), Some(DeclUsage::Normal));
        assert_eq!(decl.array.surface_id, 5);
        assert_eq!(decl.array.stride, 12);
    }
}
