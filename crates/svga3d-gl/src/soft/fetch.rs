//! Vertex and index fetch for recorded draws.

use half::f16;

use crate::gl::{consts as gl, GLenum};

use super::state::ArrayPointer;

fn component_size(ty: GLenum) -> Option<usize> {
    Some(match ty {
        gl::BYTE | gl::UNSIGNED_BYTE => 1,
        gl::SHORT | gl::UNSIGNED_SHORT | gl::HALF_FLOAT => 2,
        gl::INT | gl::UNSIGNED_INT | gl::FLOAT => 4,
        _ => return None,
    })
}

/// Size in bytes of one element, which is also the effective stride of a tightly packed
/// array.
pub(crate) fn element_size(ptr: &ArrayPointer) -> Option<usize> {
    match ptr.ty {
        gl::UNSIGNED_INT_2_10_10_10_REV | gl::INT_2_10_10_10_REV => Some(4),
        ty => {
            let n = if ptr.size == gl::BGRA as i32 { 4 } else { ptr.size.clamp(1, 4) as usize };
            Some(component_size(ty)? * n)
        }
    }
}

fn read<const N: usize>(bytes: &[u8], at: usize) -> Option<[u8; N]> {
    bytes.get(at..at + N)?.try_into().ok()
}

fn scalar(bytes: &[u8], at: usize, ty: GLenum, normalized: bool) -> Option<f32> {
    let v = match ty {
        gl::FLOAT => f32::from_le_bytes(read(bytes, at)?),
        gl::HALF_FLOAT => f16::from_bits(u16::from_le_bytes(read(bytes, at)?)).to_f32(),
        gl::UNSIGNED_BYTE => {
            let v = f32::from(bytes.get(at).copied()?);
            if normalized { v / 255.0 } else { v }
        }
        gl::BYTE => {
            let v = f32::from(bytes.get(at).copied()? as i8);
            if normalized { (v / 127.0).max(-1.0) } else { v }
        }
        gl::UNSIGNED_SHORT => {
            let v = f32::from(u16::from_le_bytes(read(bytes, at)?));
            if normalized { v / 65535.0 } else { v }
        }
        gl::SHORT => {
            let v = f32::from(i16::from_le_bytes(read(bytes, at)?));
            if normalized { (v / 32767.0).max(-1.0) } else { v }
        }
        gl::UNSIGNED_INT => {
            let v = u32::from_le_bytes(read(bytes, at)?) as f32;
            if normalized { v / u32::MAX as f32 } else { v }
        }
        gl::INT => {
            let v = i32::from_le_bytes(read(bytes, at)?) as f32;
            if normalized { (v / i32::MAX as f32).max(-1.0) } else { v }
        }
        _ => return None,
    };
    Some(v)
}

fn packed_1010102(word: u32, signed: bool, normalized: bool) -> [f32; 4] {
    let field = |shift: u32, bits: u32| -> f32 {
        let raw = (word >> shift) & ((1 << bits) - 1);
        if signed {
            let v = ((raw << (32 - bits)) as i32 >> (32 - bits)) as f32;
            let max = ((1 << (bits - 1)) - 1) as f32;
            if normalized { (v / max).max(-1.0) } else { v }
        } else {
            let max = ((1u32 << bits) - 1) as f32;
            if normalized { raw as f32 / max } else { raw as f32 }
        }
    };
    [field(0, 10), field(10, 10), field(20, 10), field(30, 2)]
}

/// Decodes the element at `at`; missing components default to (0, 0, 0, 1). Reads past the
/// end of the buffer yield `None`.
pub(crate) fn fetch_element(bytes: &[u8], at: usize, ptr: &ArrayPointer) -> Option<[f32; 4]> {
    if matches!(ptr.ty, gl::UNSIGNED_INT_2_10_10_10_REV | gl::INT_2_10_10_10_REV) {
        let word = u32::from_le_bytes(read(bytes, at)?);
        return Some(packed_1010102(word, ptr.ty == gl::INT_2_10_10_10_REV, ptr.normalized));
    }
    let size = component_size(ptr.ty)?;
    if ptr.size == gl::BGRA as i32 {
        let c: Vec<f32> = (0..4)
            .map(|i| scalar(bytes, at + i * size, ptr.ty, true))
            .collect::<Option<_>>()?;
        return Some([c[2], c[1], c[0], c[3]]);
    }
    let mut out = [0.0, 0.0, 0.0, 1.0];
    for (i, o) in out.iter_mut().enumerate().take(ptr.size.clamp(1, 4) as usize) {
        *o = scalar(bytes, at + i * size, ptr.ty, ptr.normalized)?;
    }
    Some(out)
}

/// Reads `count` indices of type `ty` starting at byte `offset`.
pub(crate) fn fetch_indices(bytes: &[u8], offset: usize, count: usize, ty: GLenum) -> Option<Vec<i64>> {
    let width = match ty {
        gl::UNSIGNED_BYTE => 1,
        gl::UNSIGNED_SHORT => 2,
        gl::UNSIGNED_INT => 4,
        _ => return None,
    };
    (0..count)
        .map(|i| {
            let at = offset + i * width;
            Some(match width {
                1 => i64::from(*bytes.get(at)?),
                2 => i64::from(u16::from_le_bytes(read(bytes, at)?)),
                _ => i64::from(u32::from_le_bytes(read(bytes, at)?)),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ptr(size: i32, ty: GLenum, normalized: bool) -> ArrayPointer {
        ArrayPointer {
            enabled: true,
            size,
            ty,
            normalized,
            ..ArrayPointer::default()
        }
    }

    #[test]
    fn bgra_colours_are_swizzled() {
        // D3DCOLOR 0xFF0000FF: blue in the low byte.
        let bytes = 0xFF00_00FFu32.to_le_bytes();
        let v = fetch_element(&bytes, 0, &ptr(gl::BGRA as i32, gl::UNSIGNED_BYTE, true));
        assert_eq!(v, Some([0.0, 0.0, 1.0, 1.0]));
    }

    #[test]
    fn missing_components_default() {
        let bytes: Vec<u8> = [1.0f32, 2.0].iter().flat_map(|f| f.to_le_bytes()).collect();
        assert_eq!(fetch_element(&bytes, 0, &ptr(2, gl::FLOAT, false)), Some([1.0, 2.0, 0.0, 1.0]));
        assert_eq!(fetch_element(&bytes, 4, &ptr(2, gl::FLOAT, false)), None);
    }

    #[test]
    fn half_and_signed_normalized() {
        let mut bytes = f16::from_f32(0.5).to_bits().to_le_bytes().to_vec();
        bytes.extend_from_slice(&(-32768i16).to_le_bytes());
        assert_eq!(fetch_element(&bytes, 0, &ptr(1, gl::HALF_FLOAT, false)).map(|v| v[0]), Some(0.5));
        assert_eq!(fetch_element(&bytes, 2, &ptr(1, gl::SHORT, true)).map(|v| v[0]), Some(-1.0));
    }

    #[test]
    fn indices_of_each_width() {
        let bytes = [1u8, 0, 2, 0, 3, 0];
        assert_eq!(fetch_indices(&bytes, 2, 2, gl::UNSIGNED_SHORT), Some(vec![2, 3]));
        assert_eq!(fetch_indices(&bytes, 0, 3, gl::UNSIGNED_BYTE), Some(vec![1, 0, 2]));
        assert_eq!(fetch_indices(&bytes, 4, 1, gl::UNSIGNED_INT), None);
    }
}
