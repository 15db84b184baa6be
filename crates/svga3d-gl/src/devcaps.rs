//! `query_capability`: device capability values derived from the host caps.

use svga3d_protocol::{DevCapIndex, FormatOps, SurfaceFormat};

use crate::caps::{HostCaps, HostFeatures, ShaderTier};
use crate::config::{MAX_CONTEXT_IDS, MAX_RENDER_TARGETS, MAX_SURFACE_IDS};
use crate::error::CommandError;
use crate::format::host_format;

const MAX_TEXTURE_REPEAT: u32 = 32768;
const MAX_TEXTURE_ASPECT_RATIO: u32 = 32768;
const MAX_PRIMITIVE_COUNT: u32 = 0x000f_ffff;
const MAX_VERTEX_INDEX: u32 = 0x000f_ffff;
/// `SVGA3D_QUERYTYPE_OCCLUSION` as a mask bit.
const QUERY_TYPES_OCCLUSION: u32 = 1;

/// The surface format a `SURFACEFMT_*` capability describes.
fn format_of(index: DevCapIndex) -> Option<SurfaceFormat> {
    use DevCapIndex as D;
    use SurfaceFormat as F;

    Some(match index {
        D::SurfaceFmtX8R8G8B8 => F::X8R8G8B8,
        D::SurfaceFmtA8R8G8B8 => F::A8R8G8B8,
        D::SurfaceFmtA2R10G10B10 => F::A2R10G10B10,
        D::SurfaceFmtX1R5G5B5 => F::X1R5G5B5,
        D::SurfaceFmtA1R5G5B5 => F::A1R5G5B5,
        D::SurfaceFmtA4R4G4B4 => F::A4R4G4B4,
        D::SurfaceFmtR5G6B5 => F::R5G6B5,
        D::SurfaceFmtLuminance16 => F::Luminance16,
        D::SurfaceFmtLuminance8Alpha8 => F::Luminance8Alpha8,
        D::SurfaceFmtAlpha8 => F::Alpha8,
        D::SurfaceFmtLuminance8 => F::Luminance8,
        D::SurfaceFmtZD16 => F::ZD16,
        D::SurfaceFmtZD24S8 => F::ZD24S8,
        D::SurfaceFmtZD24X8 => F::ZD24X8,
        D::SurfaceFmtDxt1 => F::Dxt1,
        D::SurfaceFmtDxt2 => F::Dxt2,
        D::SurfaceFmtDxt3 => F::Dxt3,
        D::SurfaceFmtDxt4 => F::Dxt4,
        D::SurfaceFmtDxt5 => F::Dxt5,
        D::SurfaceFmtBumpX8L8V8U8 => F::BumpX8L8V8U8,
        D::SurfaceFmtA2W10V10U10 => F::A2W10V10U10,
        D::SurfaceFmtBumpU8V8 => F::BumpU8V8,
        D::SurfaceFmtQ8W8V8U8 => F::Q8W8V8U8,
        D::SurfaceFmtCxV8U8 => F::CxV8U8,
        D::SurfaceFmtRS10e5 => F::RS10e5,
        D::SurfaceFmtRS23e8 => F::RS23e8,
        D::SurfaceFmtRgS10e5 => F::RgS10e5,
        D::SurfaceFmtRgS23e8 => F::RgS23e8,
        D::SurfaceFmtArgbS10e5 => F::ArgbS10e5,
        D::SurfaceFmtArgbS23e8 => F::ArgbS23e8,
        D::SurfaceFmtV16U16 => F::V16U16,
        D::SurfaceFmtG16R16 => F::G16R16,
        D::SurfaceFmtA16B16G16R16 => F::A16B16G16R16,
        D::SurfaceFmtUyvy => F::Uyvy,
        D::SurfaceFmtYuy2 => F::Yuy2,
        D::SurfaceFmtNv12 => F::Nv12,
        D::SurfaceFmtZDf16 => F::ZDf16,
        D::SurfaceFmtZDf24 => F::ZDf24,
        D::SurfaceFmtZD24S8Int => F::ZD24S8Int,
        _ => return None,
    })
}

/// Operations the host supports on surfaces of `format`.
pub fn format_ops(caps: &HostCaps, format: SurfaceFormat) -> FormatOps {
    let Some(hf) = host_format(format) else {
        return FormatOps::empty();
    };
    if format == SurfaceFormat::ZDf16 {
        // No floating-point 16-bit depth on the host; D16 stands in only for surfaces.
        return FormatOps::empty();
    }

    let mut ops = if hf.is_depth() {
        FormatOps::ZSTENCIL | FormatOps::ZSTENCIL_WITH_ARBITRARY_COLOR_DEPTH | FormatOps::TEXTURE
    } else if hf.compressed {
        if !caps.supports(HostFeatures::S3TC) {
            return FormatOps::empty();
        }
        FormatOps::TEXTURE | FormatOps::VOLUMETEXTURE | FormatOps::CUBETEXTURE | FormatOps::OFFSCREENPLAIN
    } else if hf.emulated {
        FormatOps::TEXTURE | FormatOps::OFFSCREENPLAIN | FormatOps::CONVERT_TO_ARGB
    } else {
        FormatOps::TEXTURE
            | FormatOps::VOLUMETEXTURE
            | FormatOps::CUBETEXTURE
            | FormatOps::OFFSCREENPLAIN
            | FormatOps::OFFSCREEN_RENDERTARGET
            | FormatOps::SAME_FORMAT_RENDERTARGET
            | FormatOps::AUTOGENMIPMAP
            | FormatOps::VERTEXTEXTURE
    };

    match format {
        SurfaceFormat::X8R8G8B8 | SurfaceFormat::X1R5G5B5 | SurfaceFormat::R5G6B5 => {
            ops |= FormatOps::MEMBEROFGROUP_ARGB
                | FormatOps::CONVERT_TO_ARGB
                | FormatOps::DISPLAYMODE
                | FormatOps::ACCELERATION_3D;
        }
        SurfaceFormat::A8R8G8B8 | SurfaceFormat::A2R10G10B10 | SurfaceFormat::A1R5G5B5 | SurfaceFormat::A4R4G4B4 => {
            ops |= FormatOps::MEMBEROFGROUP_ARGB
                | FormatOps::CONVERT_TO_ARGB
                | FormatOps::SAME_FORMAT_UP_TO_ALPHA_RENDERTARGET;
        }
        SurfaceFormat::BumpU8V8
        | SurfaceFormat::BumpX8L8V8U8
        | SurfaceFormat::Q8W8V8U8
        | SurfaceFormat::CxV8U8
        | SurfaceFormat::A2W10V10U10
        | SurfaceFormat::V16U16 => {
            ops |= FormatOps::BUMPMAP;
            ops.remove(FormatOps::OFFSCREEN_RENDERTARGET | FormatOps::SAME_FORMAT_RENDERTARGET);
        }
        _ => {}
    }
    ops
}

/// Value of capability `index`. Floating-point capabilities are returned as `f32` bits.
pub fn query(caps: &HostCaps, index: u32) -> Result<u32, CommandError> {
    use DevCapIndex as D;

    let cap = DevCapIndex::from_u32(index).ok_or_else(|| CommandError::unknown("device capability", index))?;
    let l = &caps.limits;
    let sm3 = caps.tier >= ShaderTier::Sm30;
    let value = match cap {
        D::Is3d => 1,
        D::MaxLights => l.max_lights,
        D::MaxTextures => l.max_texture_units,
        D::MaxClipPlanes => l.max_clip_planes,
        D::VertexShaderVersion => caps.tier.vertex_version(),
        D::FragmentShaderVersion => caps.tier.fragment_version(),
        D::VertexShader | D::FragmentShader => 1,
        D::MaxRenderTargets | D::MaxSimultaneousRenderTargets => l.max_draw_buffers.min(MAX_RENDER_TARGETS as u32),
        D::MaxFixedVertexBlend => 0,
        // Buffer-format capabilities are always reported; missing depth formats are emulated.
        D::D16BufferFormat | D::D24S8BufferFormat | D::D24X8BufferFormat => 1,
        D::QueryTypes => QUERY_TYPES_OCCLUSION,
        D::TextureGradientSampling => u32::from(sm3),
        D::MaxPointSize => l.point_size_range[1].to_bits(),
        D::MaxShaderTextures => l.max_texture_image_units,
        D::MaxTextureWidth | D::MaxTextureHeight => l.max_rectangle_texture_size,
        D::MaxVolumeExtent => l.max_3d_texture_size,
        D::MaxTextureRepeat => MAX_TEXTURE_REPEAT,
        D::MaxTextureAspectRatio => MAX_TEXTURE_ASPECT_RATIO,
        D::MaxTextureAnisotropy => l.max_anisotropy as u32,
        D::MaxPrimitiveCount => MAX_PRIMITIVE_COUNT,
        D::MaxVertexIndex => MAX_VERTEX_INDEX,
        D::MaxVertexShaderInstructions => if sm3 { 32768 } else { 256 },
        D::MaxFragmentShaderInstructions => if sm3 { 32768 } else { 96 },
        D::MaxVertexShaderTemps => if sm3 { 32 } else { 12 },
        D::MaxFragmentShaderTemps => if sm3 { 32 } else { 12 },
        D::TextureOps => 0,
        D::Dead4 | D::Dead5 | D::Dead6 | D::Dead7 | D::Dead10 => 0,
        D::AutoGenMipmaps => 1,
        D::MaxVertexShaderTextures => l.max_vertex_texture_image_units,
        D::MaxContextIds => MAX_CONTEXT_IDS,
        D::MaxSurfaceIds => MAX_SURFACE_IDS,
        D::S23e8Textures | D::S10e5Textures | D::SurfaceFmtAti1 | D::SurfaceFmtAti2 | D::Missing62 => {
            return Err(CommandError::unknown("device capability", index));
        }
        other => match format_of(other) {
            Some(format) => format_ops(caps, format).bits(),
            None => return Err(CommandError::unknown("device capability", index)),
        },
    };
    tracing::trace!(cap = cap.name(), value, "query capability");
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_format_capability_names_a_format() {
        for &cap in DevCapIndex::ALL {
            if cap.name().starts_with("SURFACEFMT_") && !matches!(cap, DevCapIndex::SurfaceFmtAti1 | DevCapIndex::SurfaceFmtAti2) {
                assert!(format_of(cap).is_some(), "{cap}");
            }
        }
        assert_eq!(format_of(DevCapIndex::MaxLights), None);
    }
}
