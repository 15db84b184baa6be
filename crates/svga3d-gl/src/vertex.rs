//! Vertex declaration types: host array formats and CPU decoding of single elements.

use half::f16;
use svga3d_protocol::draw::{DeclType, DeclUsage};
use svga3d_protocol::VertexDecl;

use crate::error::CommandError;
use crate::gl::{consts as gl, GLenum};

/// How the host reads one declared element.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArrayFormat {
    /// Component count, or `GL_BGRA` for D3DCOLOR.
    pub size: i32,
    pub ty: GLenum,
    pub normalized: bool,
}

impl ArrayFormat {
    const fn new(size: i32, ty: GLenum, normalized: bool) -> Self {
        Self { size, ty, normalized }
    }
}

pub fn array_format(ty: DeclType) -> ArrayFormat {
    match ty {
        DeclType::Float1 => ArrayFormat::new(1, gl::FLOAT, false),
        DeclType::Float2 => ArrayFormat::new(2, gl::FLOAT, false),
        DeclType::Float3 => ArrayFormat::new(3, gl::FLOAT, false),
        DeclType::Float4 => ArrayFormat::new(4, gl::FLOAT, false),
        DeclType::D3dColor => ArrayFormat::new(gl::BGRA as i32, gl::UNSIGNED_BYTE, true),
        DeclType::Ubyte4 => ArrayFormat::new(4, gl::UNSIGNED_BYTE, false),
        DeclType::Ubyte4N => ArrayFormat::new(4, gl::UNSIGNED_BYTE, true),
        DeclType::Short2 => ArrayFormat::new(2, gl::SHORT, false),
        DeclType::Short4 => ArrayFormat::new(4, gl::SHORT, false),
        DeclType::Short2N => ArrayFormat::new(2, gl::SHORT, true),
        DeclType::Short4N => ArrayFormat::new(4, gl::SHORT, true),
        DeclType::Ushort2N => ArrayFormat::new(2, gl::UNSIGNED_SHORT, true),
        DeclType::Ushort4N => ArrayFormat::new(4, gl::UNSIGNED_SHORT, true),
        DeclType::Udec3 => ArrayFormat::new(4, gl::UNSIGNED_INT_2_10_10_10_REV, false),
        DeclType::Dec3N => ArrayFormat::new(4, gl::INT_2_10_10_10_REV, true),
        DeclType::Float16x2 => ArrayFormat::new(2, gl::HALF_FLOAT, false),
        DeclType::Float16x4 => ArrayFormat::new(4, gl::HALF_FLOAT, false),
    }
}

/// A declaration with its enums checked.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CheckedDecl {
    pub decl: VertexDecl,
    pub ty: DeclType,
    pub usage: DeclUsage,
}

impl CheckedDecl {
    pub fn new(decl: &VertexDecl) -> Result<Self, CommandError> {
        let ty = decl
            .decl_type()
            .ok_or_else(|| CommandError::unknown("vertex declaration type", decl.identity.ty))?;
        let usage = decl
            .usage()
            .ok_or_else(|| CommandError::unknown("vertex declaration usage", decl.identity.usage))?;
        Ok(Self { decl: *decl, ty, usage })
    }

    pub fn format(&self) -> ArrayFormat {
        array_format(self.ty)
    }

    pub fn element_bytes(&self) -> usize {
        self.ty.size_bytes() as usize
    }

    pub fn is_constant(&self) -> bool {
        self.decl.array.stride == 0
    }
}

fn read2(b: &[u8], at: usize) -> [u8; 2] {
    bytemuck::pod_read_unaligned(&b[at..at + 2])
}

fn read4(b: &[u8], at: usize) -> [u8; 4] {
    bytemuck::pod_read_unaligned(&b[at..at + 4])
}

fn packed_1010102(word: u32, signed: bool) -> [f32; 4] {
    let field = |shift: u32, bits: u32| -> f32 {
        let raw = (word >> shift) & ((1 << bits) - 1);
        if signed {
            let v = ((raw << (32 - bits)) as i32) >> (32 - bits);
            (v as f32 / ((1 << (bits - 1)) - 1) as f32).max(-1.0)
        } else {
            raw as f32
        }
    };
    [field(0, 10), field(10, 10), field(20, 10), field(30, 2)]
}

/// Decodes one element as the host would read it; missing components are (0, 0, 0, 1).
/// `bytes` must hold at least `ty.size_bytes()` bytes.
pub fn decode_element(ty: DeclType, bytes: &[u8]) -> Option<[f32; 4]> {
    if bytes.len() < ty.size_bytes() as usize {
        return None;
    }
    let mut out = [0.0, 0.0, 0.0, 1.0];
    let f32_at = |i: usize| f32::from_le_bytes(read4(bytes, i * 4));
    let i16_at = |i: usize| i16::from_le_bytes(read2(bytes, i * 2));
    let u16_at = |i: usize| u16::from_le_bytes(read2(bytes, i * 2));
    match ty {
        DeclType::Float1 | DeclType::Float2 | DeclType::Float3 | DeclType::Float4 => {
            let n = (ty.size_bytes() / 4) as usize;
            for (i, o) in out.iter_mut().enumerate().take(n) {
                *o = f32_at(i);
            }
        }
        DeclType::D3dColor => {
            let c = |i: usize| f32::from(bytes[i]) / 255.0;
            out = [c(2), c(1), c(0), c(3)];
        }
        DeclType::Ubyte4 => out = [0, 1, 2, 3].map(|i| f32::from(bytes[i])),
        DeclType::Ubyte4N => out = [0, 1, 2, 3].map(|i| f32::from(bytes[i]) / 255.0),
        DeclType::Short2 | DeclType::Short4 | DeclType::Short2N | DeclType::Short4N => {
            let n = (ty.size_bytes() / 2) as usize;
            let norm = matches!(ty, DeclType::Short2N | DeclType::Short4N);
            for (i, o) in out.iter_mut().enumerate().take(n) {
                let v = f32::from(i16_at(i));
                *o = if norm { (v / 32767.0).max(-1.0) } else { v };
            }
        }
        DeclType::Ushort2N | DeclType::Ushort4N => {
            let n = (ty.size_bytes() / 2) as usize;
            for (i, o) in out.iter_mut().enumerate().take(n) {
                *o = f32::from(u16_at(i)) / 65535.0;
            }
        }
        DeclType::Udec3 | DeclType::Dec3N => {
            out = packed_1010102(u32::from_le_bytes(read4(bytes, 0)), ty == DeclType::Dec3N);
        }
        DeclType::Float16x2 | DeclType::Float16x4 => {
            let n = (ty.size_bytes() / 2) as usize;
            for (i, o) in out.iter_mut().enumerate().take(n) {
                *o = f16::from_bits(u16_at(i)).to_f32();
            }
        }
    }
    Some(out)
}

/// Where a declaration lands in the fixed-function pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FixedArray {
    Position,
    Normal,
    Color,
    SecondaryColor,
    /// Texture coordinate set, matched against each stage's coordinate index.
    TexCoord(u32),
    Fog,
}

pub fn fixed_array(usage: DeclUsage, usage_index: u32) -> Option<FixedArray> {
    Some(match usage {
        DeclUsage::Position | DeclUsage::PositionT => FixedArray::Position,
        DeclUsage::Normal => FixedArray::Normal,
        DeclUsage::Color if usage_index == 0 => FixedArray::Color,
        DeclUsage::Color if usage_index == 1 => FixedArray::SecondaryColor,
        DeclUsage::TexCoord => FixedArray::TexCoord(usage_index),
        DeclUsage::Fog => FixedArray::Fog,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn d3dcolor_decodes_to_rgba() {
        assert_eq!(
            decode_element(DeclType::D3dColor, &0xFF00_00FFu32.to_le_bytes()),
            Some([0.0, 0.0, 1.0, 1.0])
        );
    }

    #[test]
    fn short_floats_fill_defaults() {
        let bytes: Vec<u8> = [3.0f32, -1.5].iter().flat_map(|f| f.to_le_bytes()).collect();
        assert_eq!(decode_element(DeclType::Float2, &bytes), Some([3.0, -1.5, 0.0, 1.0]));
        assert_eq!(decode_element(DeclType::Float3, &bytes), None);
        let h: Vec<u8> = [f16::from_f32(0.25), f16::from_f32(2.0)]
            .iter()
            .flat_map(|v| v.to_bits().to_le_bytes())
            .collect();
        assert_eq!(decode_element(DeclType::Float16x2, &h), Some([0.25, 2.0, 0.0, 1.0]));
    }

    #[test]
    fn elements_decode_at_odd_offsets() {
        let mut buf = vec![0xEE];
        buf.extend([1.0f32, 2.0, 4.0].iter().flat_map(|f| f.to_le_bytes()));
        buf.extend(7u16.to_le_bytes());
        buf.extend(9u16.to_le_bytes());
        assert_eq!(decode_element(DeclType::Float3, &buf[1..]), Some([1.0, 2.0, 4.0, 1.0]));
        assert_eq!(decode_element(DeclType::Ushort2N, &buf[13..]).map(|v| v[3]), Some(1.0));
        assert_eq!(
            decode_element(DeclType::Short2, &buf[13..]),
            Some([7.0, 9.0, 0.0, 1.0])
        );
    }

    #[test]
    fn packed_and_normalized_integers() {
        let s: Vec<u8> = [i16::MIN, 32767].iter().flat_map(|v| v.to_le_bytes()).collect();
        assert_eq!(decode_element(DeclType::Short2N, &s), Some([-1.0, 1.0, 0.0, 1.0]));
        let word: u32 = 1 | (2 << 10) | (3 << 20) | (1 << 30);
        assert_eq!(decode_element(DeclType::Udec3, &word.to_le_bytes()), Some([1.0, 2.0, 3.0, 1.0]));
    }

    #[test]
    fn usages_map_to_fixed_arrays() {
        assert_eq!(fixed_array(DeclUsage::Color, 1), Some(FixedArray::SecondaryColor));
        assert_eq!(fixed_array(DeclUsage::TexCoord, 3), Some(FixedArray::TexCoord(3)));
        assert_eq!(fixed_array(DeclUsage::BlendWeight, 0), None);
        assert_eq!(array_format(DeclType::D3dColor).size, gl::BGRA as i32);
    }
}
