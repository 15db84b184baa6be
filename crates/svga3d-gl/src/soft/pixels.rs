//! Pixel layout helpers for the software host: sizes, clear-value encoding, filtering.

use half::f16;

use crate::gl::{consts as gl, GLenum};

/// Bytes per texel of a client transfer layout, or `None` for layouts the host can't size.
pub(crate) fn bytes_per_pixel(format: GLenum, ty: GLenum) -> Option<usize> {
    match ty {
        gl::UNSIGNED_INT_8_8_8_8_REV | gl::UNSIGNED_INT_2_10_10_10_REV | gl::UNSIGNED_INT_24_8 => {
            return Some(4)
        }
        gl::UNSIGNED_SHORT_5_6_5 | gl::UNSIGNED_SHORT_1_5_5_5_REV | gl::UNSIGNED_SHORT_4_4_4_4_REV => {
            return Some(2)
        }
        _ => {}
    }
    let components = match format {
        gl::RED | gl::ALPHA | gl::LUMINANCE | gl::DEPTH_COMPONENT | gl::STENCIL_INDEX => 1,
        gl::RG | gl::LUMINANCE_ALPHA => 2,
        gl::RGB | gl::BGR => 3,
        gl::RGBA | gl::BGRA => 4,
        _ => return None,
    };
    let size = match ty {
        gl::BYTE | gl::UNSIGNED_BYTE => 1,
        gl::SHORT | gl::UNSIGNED_SHORT | gl::HALF_FLOAT => 2,
        gl::INT | gl::UNSIGNED_INT | gl::FLOAT => 4,
        _ => return None,
    };
    Some(components * size)
}

/// Transfer layout a renderbuffer's storage is kept in.
pub(crate) fn renderbuffer_layout(internal_format: GLenum) -> (GLenum, GLenum) {
    match internal_format {
        gl::DEPTH24_STENCIL8 => (gl::DEPTH_STENCIL, gl::UNSIGNED_INT_24_8),
        gl::DEPTH_COMPONENT16 => (gl::DEPTH_COMPONENT, gl::UNSIGNED_SHORT),
        gl::DEPTH_COMPONENT24 | gl::DEPTH_COMPONENT32 => (gl::DEPTH_COMPONENT, gl::UNSIGNED_INT),
        gl::DEPTH_COMPONENT32F => (gl::DEPTH_COMPONENT, gl::FLOAT),
        _ => (gl::BGRA, gl::UNSIGNED_INT_8_8_8_8_REV),
    }
}

pub(crate) fn is_depth_layout(format: GLenum) -> bool {
    matches!(format, gl::DEPTH_COMPONENT | gl::DEPTH_STENCIL)
}

fn unorm(v: f32, max: u32) -> u32 {
    (v.clamp(0.0, 1.0) * max as f32 + 0.5) as u32
}

/// Encodes a clear colour into one texel of the given layout.
pub(crate) fn encode_color(format: GLenum, ty: GLenum, rgba: [f32; 4]) -> Option<Vec<u8>> {
    let [r, g, b, a] = rgba;
    let bytes = match (format, ty) {
        (gl::BGRA, gl::UNSIGNED_INT_8_8_8_8_REV) | (gl::BGRA, gl::UNSIGNED_BYTE) => {
            vec![unorm(b, 255) as u8, unorm(g, 255) as u8, unorm(r, 255) as u8, unorm(a, 255) as u8]
        }
        (gl::RGBA, gl::UNSIGNED_BYTE) => {
            vec![unorm(r, 255) as u8, unorm(g, 255) as u8, unorm(b, 255) as u8, unorm(a, 255) as u8]
        }
        (gl::RGB, gl::UNSIGNED_SHORT_5_6_5) => {
            let v = (unorm(r, 31) << 11) | (unorm(g, 63) << 5) | unorm(b, 31);
            (v as u16).to_le_bytes().to_vec()
        }
        (gl::BGRA, gl::UNSIGNED_SHORT_1_5_5_5_REV) => {
            let v = (unorm(a, 1) << 15) | (unorm(r, 31) << 10) | (unorm(g, 31) << 5) | unorm(b, 31);
            (v as u16).to_le_bytes().to_vec()
        }
        (gl::BGRA, gl::UNSIGNED_SHORT_4_4_4_4_REV) => {
            let v = (unorm(a, 15) << 12) | (unorm(r, 15) << 8) | (unorm(g, 15) << 4) | unorm(b, 15);
            (v as u16).to_le_bytes().to_vec()
        }
        (gl::RGBA, gl::FLOAT) => rgba.iter().flat_map(|c| c.to_le_bytes()).collect(),
        (gl::RGBA, gl::HALF_FLOAT) => rgba
            .iter()
            .flat_map(|c| f16::from_f32(*c).to_bits().to_le_bytes())
            .collect(),
        (gl::ALPHA, gl::UNSIGNED_BYTE) => vec![unorm(a, 255) as u8],
        (gl::LUMINANCE, gl::UNSIGNED_BYTE) | (gl::RED, gl::UNSIGNED_BYTE) => vec![unorm(r, 255) as u8],
        _ => return None,
    };
    Some(bytes)
}

/// Byte lanes of a 4-byte 8-bit layout that each colour channel (r, g, b, a) occupies.
pub(crate) fn channel_lanes(format: GLenum, ty: GLenum) -> Option<[usize; 4]> {
    match (format, ty) {
        (gl::BGRA, gl::UNSIGNED_INT_8_8_8_8_REV) | (gl::BGRA, gl::UNSIGNED_BYTE) => Some([2, 1, 0, 3]),
        (gl::RGBA, gl::UNSIGNED_BYTE) => Some([0, 1, 2, 3]),
        _ => None,
    }
}

/// Which parts of a depth/stencil texel a clear writes.
#[derive(Clone, Copy, Debug)]
pub(crate) struct DepthClear {
    pub depth: Option<f64>,
    pub stencil: Option<u8>,
}

/// Applies a depth/stencil clear to one texel in place.
pub(crate) fn clear_depth_texel(format: GLenum, ty: GLenum, texel: &mut [u8], clear: DepthClear) {
    match (format, ty) {
        (gl::DEPTH_STENCIL, gl::UNSIGNED_INT_24_8) => {
            let mut v = u32::from_le_bytes([texel[0], texel[1], texel[2], texel[3]]);
            if let Some(d) = clear.depth {
                v = (v & 0xff) | (unorm(d as f32, 0x00ff_ffff) << 8);
            }
            if let Some(s) = clear.stencil {
                v = (v & !0xff) | s as u32;
            }
            texel.copy_from_slice(&v.to_le_bytes());
        }
        (gl::DEPTH_COMPONENT, gl::UNSIGNED_SHORT) => {
            if let Some(d) = clear.depth {
                texel.copy_from_slice(&(unorm(d as f32, 0xffff) as u16).to_le_bytes());
            }
        }
        (gl::DEPTH_COMPONENT, gl::UNSIGNED_INT) => {
            if let Some(d) = clear.depth {
                let v = (d.clamp(0.0, 1.0) * u32::MAX as f64) as u32;
                texel.copy_from_slice(&v.to_le_bytes());
            }
        }
        (gl::DEPTH_COMPONENT, gl::FLOAT) => {
            if let Some(d) = clear.depth {
                texel.copy_from_slice(&(d as f32).to_le_bytes());
            }
        }
        _ => {}
    }
}

/// Converts between the two 8-bit RGBA orderings; other conversions are not modelled.
pub(crate) fn convert_layout(
    src: &[u8],
    from: (GLenum, GLenum),
    to: (GLenum, GLenum),
) -> Option<Vec<u8>> {
    if from == to {
        return Some(src.to_vec());
    }
    let a = channel_lanes(from.0, from.1)?;
    let b = channel_lanes(to.0, to.1)?;
    let mut out = vec![0u8; src.len()];
    for (s, d) in src.chunks_exact(4).zip(out.chunks_exact_mut(4)) {
        for ch in 0..4 {
            d[b[ch]] = s[a[ch]];
        }
    }
    Some(out)
}

/// Halves an image with a 2x2 box filter (per byte lane) for 8-bit layouts, otherwise
/// by point sampling.
pub(crate) fn downsample(
    src: &[u8],
    width: u32,
    height: u32,
    bpp: usize,
    byte_lanes: bool,
) -> (Vec<u8>, u32, u32) {
    let dw = (width / 2).max(1);
    let dh = (height / 2).max(1);
    let mut out = vec![0u8; dw as usize * dh as usize * bpp];
    let at = |x: u32, y: u32| (y.min(height - 1) as usize * width as usize + x.min(width - 1) as usize) * bpp;
    for y in 0..dh {
        for x in 0..dw {
            let d = (y as usize * dw as usize + x as usize) * bpp;
            if byte_lanes {
                let taps = [at(2 * x, 2 * y), at(2 * x + 1, 2 * y), at(2 * x, 2 * y + 1), at(2 * x + 1, 2 * y + 1)];
                for lane in 0..bpp {
                    let sum: u32 = taps.iter().map(|&t| src[t + lane] as u32).sum();
                    out[d + lane] = ((sum + 2) / 4) as u8;
                }
            } else {
                let s = at(2 * x, 2 * y);
                out[d..d + bpp].copy_from_slice(&src[s..s + bpp]);
            }
        }
    }
    (out, dw, dh)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bgra_clear_matches_argb_word() {
        let texel = encode_color(gl::BGRA, gl::UNSIGNED_INT_8_8_8_8_REV, [0.0, 0.0, 1.0, 1.0])
            .unwrap_or_default();
        assert_eq!(u32::from_le_bytes([texel[0], texel[1], texel[2], texel[3]]), 0xFF0000FF);
    }

    #[test]
    fn packed_sizes() {
        assert_eq!(bytes_per_pixel(gl::RGB, gl::UNSIGNED_SHORT_5_6_5), Some(2));
        assert_eq!(bytes_per_pixel(gl::RGBA, gl::HALF_FLOAT), Some(8));
        assert_eq!(bytes_per_pixel(gl::DEPTH_STENCIL, gl::UNSIGNED_INT_24_8), Some(4));
        assert_eq!(bytes_per_pixel(0x1234, gl::UNSIGNED_BYTE), None);
    }

    #[test]
    fn depth_stencil_clear_preserves_other_half() {
        let mut texel = 0xAABB_CC11u32.to_le_bytes();
        clear_depth_texel(
            gl::DEPTH_STENCIL,
            gl::UNSIGNED_INT_24_8,
            &mut texel,
            DepthClear {
                depth: None,
                stencil: Some(0x42),
            },
        );
        assert_eq!(u32::from_le_bytes(texel), 0xAABB_CC42);
    }

    #[test]
    fn box_filter_averages_quads() {
        let src = [0u8, 0, 0, 0, 4, 4, 4, 4, 8, 8, 8, 8, 12, 12, 12, 12];
        let (out, w, h) = downsample(&src, 2, 2, 4, true);
        assert_eq!((w, h), (1, 1));
        assert_eq!(out, vec![6, 6, 6, 6]);
    }
}
