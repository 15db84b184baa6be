//! Guest surface format to host texture format mapping.
//!
//! Every supported format maps to an (internal format, transfer format, transfer type)
//! triple plus the byte size of one compression block. Formats the host cannot sample
//! directly (packed YUV) are marked emulated: their guest bytes live in a raw secondary
//! texture and a [`FormatConverter`] produces the displayable BGRA primary.

use svga3d_protocol::SurfaceFormat;
use thiserror::Error;

use crate::gl::consts as gl;
use crate::gl::GLenum;

/// Footprint of one compression block; `1x1` for uncompressed formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockSize {
    pub width: u32,
    pub height: u32,
    pub bytes: u32,
}

impl BlockSize {
    const fn texel(bytes: u32) -> Self {
        Self {
            width: 1,
            height: 1,
            bytes,
        }
    }

    const fn block(width: u32, height: u32, bytes: u32) -> Self {
        Self {
            width,
            height,
            bytes,
        }
    }

    pub fn blocks_wide(self, width: u32) -> u32 {
        width.div_ceil(self.width)
    }

    pub fn blocks_high(self, height: u32) -> u32 {
        height.div_ceil(self.height)
    }

    /// Bytes in one row of blocks.
    pub fn pitch(self, width: u32) -> u32 {
        self.blocks_wide(width) * self.bytes
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HostFormat {
    pub internal: GLenum,
    pub format: GLenum,
    pub ty: GLenum,
    pub block: BlockSize,
    pub compressed: bool,
    /// Stored raw in a secondary texture and converted for sampling.
    pub emulated: bool,
}

/// Layout of the raw texture backing an emulated format: one RGBA8 texel per two pixels.
pub const EMULATED_RAW: (GLenum, GLenum, GLenum) = (gl::RGBA8, gl::RGBA, gl::UNSIGNED_BYTE);
/// Layout of the converted texture every emulated format is sampled from.
pub const EMULATED_PRIMARY: (GLenum, GLenum, GLenum) =
    (gl::RGBA8, gl::BGRA, gl::UNSIGNED_INT_8_8_8_8_REV);

impl HostFormat {
    const fn plain(internal: GLenum, format: GLenum, ty: GLenum, bytes: u32) -> Self {
        Self {
            internal,
            format,
            ty,
            block: BlockSize::texel(bytes),
            compressed: false,
            emulated: false,
        }
    }

    const fn compressed(internal: GLenum, bytes: u32) -> Self {
        Self {
            internal,
            format: 0,
            ty: 0,
            block: BlockSize::block(4, 4, bytes),
            compressed: true,
            emulated: false,
        }
    }

    const fn packed_yuv() -> Self {
        Self {
            internal: EMULATED_PRIMARY.0,
            format: EMULATED_PRIMARY.1,
            ty: EMULATED_PRIMARY.2,
            block: BlockSize::block(2, 1, 4),
            compressed: false,
            emulated: true,
        }
    }

    pub fn is_depth(&self) -> bool {
        matches!(self.format, gl::DEPTH_COMPONENT | gl::DEPTH_STENCIL)
    }

    pub fn has_stencil(&self) -> bool {
        self.format == gl::DEPTH_STENCIL
    }

    /// Width in texels of the raw secondary texture for an emulated level.
    pub fn raw_width(&self, width: u32) -> u32 {
        self.block.blocks_wide(width)
    }
}

/// Host layout for `format`, or `None` when the host cannot represent it.
pub fn host_format(format: SurfaceFormat) -> Option<HostFormat> {
    use SurfaceFormat as F;

    let hf = match format {
        F::X8R8G8B8 => HostFormat::plain(gl::RGB8, gl::BGRA, gl::UNSIGNED_INT_8_8_8_8_REV, 4),
        F::A8R8G8B8 => HostFormat::plain(gl::RGBA8, gl::BGRA, gl::UNSIGNED_INT_8_8_8_8_REV, 4),
        F::R5G6B5 => HostFormat::plain(gl::RGB565, gl::RGB, gl::UNSIGNED_SHORT_5_6_5, 2),
        F::X1R5G5B5 => HostFormat::plain(gl::RGB5, gl::BGRA, gl::UNSIGNED_SHORT_1_5_5_5_REV, 2),
        F::A1R5G5B5 => HostFormat::plain(gl::RGB5_A1, gl::BGRA, gl::UNSIGNED_SHORT_1_5_5_5_REV, 2),
        F::A4R4G4B4 => HostFormat::plain(gl::RGBA4, gl::BGRA, gl::UNSIGNED_SHORT_4_4_4_4_REV, 2),
        F::ZD32 => HostFormat::plain(gl::DEPTH_COMPONENT32, gl::DEPTH_COMPONENT, gl::UNSIGNED_INT, 4),
        F::ZD16 | F::ZDf16 | F::ZD15S1 => {
            HostFormat::plain(gl::DEPTH_COMPONENT16, gl::DEPTH_COMPONENT, gl::UNSIGNED_SHORT, 2)
        }
        F::ZD24S8 | F::ZDf24 | F::ZD24S8Int => {
            HostFormat::plain(gl::DEPTH24_STENCIL8, gl::DEPTH_STENCIL, gl::UNSIGNED_INT_24_8, 4)
        }
        F::ZD24X8 => HostFormat::plain(gl::DEPTH_COMPONENT24, gl::DEPTH_COMPONENT, gl::UNSIGNED_INT, 4),
        F::Luminance8 => HostFormat::plain(gl::LUMINANCE8, gl::LUMINANCE, gl::UNSIGNED_BYTE, 1),
        F::Luminance16 => HostFormat::plain(gl::LUMINANCE16, gl::LUMINANCE, gl::UNSIGNED_SHORT, 2),
        F::Luminance8Alpha8 => {
            HostFormat::plain(gl::LUMINANCE8_ALPHA8, gl::LUMINANCE_ALPHA, gl::UNSIGNED_BYTE, 2)
        }
        F::Alpha8 => HostFormat::plain(gl::ALPHA8, gl::ALPHA, gl::UNSIGNED_BYTE, 1),
        F::Dxt1 => HostFormat::compressed(gl::COMPRESSED_RGBA_S3TC_DXT1_EXT, 8),
        F::Dxt2 | F::Dxt3 => HostFormat::compressed(gl::COMPRESSED_RGBA_S3TC_DXT3_EXT, 16),
        F::Dxt4 | F::Dxt5 => HostFormat::compressed(gl::COMPRESSED_RGBA_S3TC_DXT5_EXT, 16),
        F::BumpU8V8 | F::V8U8 | F::CxV8U8 => HostFormat::plain(gl::RG8_SNORM, gl::RG, gl::BYTE, 2),
        F::Q8W8V8U8 => HostFormat::plain(gl::RGBA8_SNORM, gl::RGBA, gl::BYTE, 4),
        F::BumpX8L8V8U8 | F::X8L8V8U8 => {
            HostFormat::plain(gl::RGBA8, gl::BGRA, gl::UNSIGNED_INT_8_8_8_8_REV, 4)
        }
        F::A2R10G10B10 | F::A2W10V10U10 => {
            HostFormat::plain(gl::RGB10_A2, gl::BGRA, gl::UNSIGNED_INT_2_10_10_10_REV, 4)
        }
        F::V16U16 => HostFormat::plain(gl::RG16_SNORM, gl::RG, gl::SHORT, 4),
        F::G16R16 => HostFormat::plain(gl::RG16, gl::RG, gl::UNSIGNED_SHORT, 4),
        F::A16B16G16R16 => HostFormat::plain(gl::RGBA16, gl::RGBA, gl::UNSIGNED_SHORT, 8),
        F::ArgbS10e5 => HostFormat::plain(gl::RGBA16F, gl::RGBA, gl::HALF_FLOAT, 8),
        F::ArgbS23e8 => HostFormat::plain(gl::RGBA32F, gl::RGBA, gl::FLOAT, 16),
        F::RS10e5 => HostFormat::plain(gl::R16F, gl::RED, gl::HALF_FLOAT, 2),
        F::RS23e8 => HostFormat::plain(gl::R32F, gl::RED, gl::FLOAT, 4),
        F::RgS10e5 => HostFormat::plain(gl::RG16F, gl::RG, gl::HALF_FLOAT, 4),
        F::RgS23e8 => HostFormat::plain(gl::RG32F, gl::RG, gl::FLOAT, 8),
        F::Buffer => HostFormat::plain(0, 0, 0, 1),
        F::Uyvy | F::Yuy2 => HostFormat::packed_yuv(),
        F::Luminance4Alpha4
        | F::BumpL6V5U5
        | F::Nv12
        | F::Invalid
        | F::FormatDead1
        | F::FormatDead2 => return None,
    };
    Some(hf)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error("no conversion for {0}")]
    UnsupportedFormat(SurfaceFormat),
    #[error("conversion buffer too small: need {need} bytes, got {got}")]
    ShortBuffer { need: usize, got: usize },
}

/// Turns the guest bytes of an emulated format into the host's sampled layout.
pub trait FormatConverter {
    /// Converts one tightly packed `width`x`height` image into BGRA8, four bytes per pixel.
    fn to_bgra(
        &mut self,
        format: SurfaceFormat,
        width: u32,
        height: u32,
        src: &[u8],
        dst: &mut [u8],
    ) -> Result<(), ConversionError>;
}

/// BT.601 limited-range conversion for the packed 4:2:2 formats.
#[derive(Clone, Copy, Debug, Default)]
pub struct YuvConverter;

fn clamp_u8(v: i32) -> u8 {
    v.clamp(0, 255) as u8
}

fn yuv_to_bgra(y: u8, u: u8, v: u8) -> [u8; 4] {
    let c = i32::from(y) - 16;
    let d = i32::from(u) - 128;
    let e = i32::from(v) - 128;
    let r = clamp_u8((298 * c + 409 * e + 128) >> 8);
    let g = clamp_u8((298 * c - 100 * d - 208 * e + 128) >> 8);
    let b = clamp_u8((298 * c + 516 * d + 128) >> 8);
    [b, g, r, 0xff]
}

impl FormatConverter for YuvConverter {
    fn to_bgra(
        &mut self,
        format: SurfaceFormat,
        width: u32,
        height: u32,
        src: &[u8],
        dst: &mut [u8],
    ) -> Result<(), ConversionError> {
        // Byte positions of (Y0, U, Y1, V) within one macropixel.
        let lanes = match format {
            SurfaceFormat::Uyvy => [1, 0, 3, 2],
            SurfaceFormat::Yuy2 => [0, 1, 2, 3],
            other => return Err(ConversionError::UnsupportedFormat(other)),
        };
        let (w, h) = (width as usize, height as usize);
        let src_pitch = w.div_ceil(2) * 4;
        let need_src = src_pitch * h;
        let need_dst = w * h * 4;
        if src.len() < need_src {
            return Err(ConversionError::ShortBuffer {
                need: need_src,
                got: src.len(),
            });
        }
        if dst.len() < need_dst {
            return Err(ConversionError::ShortBuffer {
                need: need_dst,
                got: dst.len(),
            });
        }

        for row in 0..h {
            let src_row = &src[row * src_pitch..(row + 1) * src_pitch];
            let dst_row = &mut dst[row * w * 4..(row + 1) * w * 4];
            for (x, px) in dst_row.chunks_exact_mut(4).enumerate() {
                let mp = &src_row[(x / 2) * 4..(x / 2) * 4 + 4];
                let y = if x % 2 == 0 { mp[lanes[0]] } else { mp[lanes[2]] };
                px.copy_from_slice(&yuv_to_bgra(y, mp[lanes[1]], mp[lanes[3]]));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_known_format_is_classified() {
        for f in SurfaceFormat::ALL {
            let expected_none = matches!(
                f,
                SurfaceFormat::Luminance4Alpha4
                    | SurfaceFormat::BumpL6V5U5
                    | SurfaceFormat::Nv12
                    | SurfaceFormat::Invalid
                    | SurfaceFormat::FormatDead1
                    | SurfaceFormat::FormatDead2
            );
            assert_eq!(host_format(*f).is_none(), expected_none, "{f}");
        }
    }

    #[test]
    fn block_sizes() {
        let dxt1 = host_format(SurfaceFormat::Dxt1).unwrap();
        assert!(dxt1.compressed);
        assert_eq!(dxt1.block.pitch(16), 32);
        assert_eq!(dxt1.block.blocks_high(6), 2);
        let dxt5 = host_format(SurfaceFormat::Dxt5).unwrap();
        assert_eq!(dxt5.block.pitch(4), 16);
        let argb = host_format(SurfaceFormat::A8R8G8B8).unwrap();
        assert_eq!(argb.block.pitch(3), 12);
        let yuy2 = host_format(SurfaceFormat::Yuy2).unwrap();
        assert!(yuy2.emulated);
        assert_eq!(yuy2.block.pitch(5), 12);
        assert_eq!(yuy2.raw_width(5), 3);
    }

    #[test]
    fn depth_stencil_formats_share_packed_layout() {
        let d24s8 = host_format(SurfaceFormat::ZD24S8).unwrap();
        assert!(d24s8.is_depth());
        assert!(d24s8.has_stencil());
        let d16 = host_format(SurfaceFormat::ZD16).unwrap();
        assert!(d16.is_depth());
        assert!(!d16.has_stencil());
    }

    #[test]
    fn yuv_white_and_black() {
        let mut conv = YuvConverter;
        // Y=235 is white, Y=16 black, neutral chroma.
        let uyvy = [128, 235, 128, 16];
        let mut out = [0u8; 8];
        conv.to_bgra(SurfaceFormat::Uyvy, 2, 1, &uyvy, &mut out).unwrap();
        assert_eq!(out, [255, 255, 255, 255, 0, 0, 0, 255]);

        let yuy2 = [16, 128, 235, 128];
        conv.to_bgra(SurfaceFormat::Yuy2, 2, 1, &yuy2, &mut out).unwrap();
        assert_eq!(out, [0, 0, 0, 255, 255, 255, 255, 255]);
    }

    #[test]
    fn yuv_rejects_short_input_and_other_formats() {
        let mut conv = YuvConverter;
        let mut out = [0u8; 16];
        assert_eq!(
            conv.to_bgra(SurfaceFormat::Yuy2, 4, 1, &[0; 4], &mut out),
            Err(ConversionError::ShortBuffer { need: 8, got: 4 })
        );
        assert_eq!(
            conv.to_bgra(SurfaceFormat::A8R8G8B8, 1, 1, &[0; 4], &mut out),
            Err(ConversionError::UnsupportedFormat(SurfaceFormat::A8R8G8B8))
        );
    }
}
