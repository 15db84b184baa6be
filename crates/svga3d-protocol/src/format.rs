//! Surface formats, surface flags and per-format operation bits.

use bitflags::bitflags;

wire_enum! {
    /// `SVGA3dSurfaceFormat`, legacy subset plus the depth formats legacy guests use.
    pub enum SurfaceFormat {
        Invalid = 0 => "INVALID",
        X8R8G8B8 = 1 => "X8R8G8B8",
        A8R8G8B8 = 2 => "A8R8G8B8",
        R5G6B5 = 3 => "R5G6B5",
        X1R5G5B5 = 4 => "X1R5G5B5",
        A1R5G5B5 = 5 => "A1R5G5B5",
        A4R4G4B4 = 6 => "A4R4G4B4",
        ZD32 = 7 => "Z_D32",
        ZD16 = 8 => "Z_D16",
        ZD24S8 = 9 => "Z_D24S8",
        ZD15S1 = 10 => "Z_D15S1",
        Luminance8 = 11 => "LUMINANCE8",
        Luminance4Alpha4 = 12 => "LUMINANCE4_ALPHA4",
        Luminance16 = 13 => "LUMINANCE16",
        Luminance8Alpha8 = 14 => "LUMINANCE8_ALPHA8",
        Dxt1 = 15 => "DXT1",
        Dxt2 = 16 => "DXT2",
        Dxt3 = 17 => "DXT3",
        Dxt4 = 18 => "DXT4",
        Dxt5 = 19 => "DXT5",
        BumpU8V8 = 20 => "BUMPU8V8",
        BumpL6V5U5 = 21 => "BUMPL6V5U5",
        BumpX8L8V8U8 = 22 => "BUMPX8L8V8U8",
        FormatDead1 = 23 => "FORMAT_DEAD1",
        ArgbS10e5 = 24 => "ARGB_S10E5",
        ArgbS23e8 = 25 => "ARGB_S23E8",
        A2R10G10B10 = 26 => "A2R10G10B10",
        V8U8 = 27 => "V8U8",
        Q8W8V8U8 = 28 => "Q8W8V8U8",
        CxV8U8 = 29 => "CxV8U8",
        X8L8V8U8 = 30 => "X8L8V8U8",
        A2W10V10U10 = 31 => "A2W10V10U10",
        Alpha8 = 32 => "ALPHA8",
        RS10e5 = 33 => "R_S10E5",
        RS23e8 = 34 => "R_S23E8",
        RgS10e5 = 35 => "RG_S10E5",
        RgS23e8 = 36 => "RG_S23E8",
        Buffer = 37 => "BUFFER",
        ZD24X8 = 38 => "Z_D24X8",
        V16U16 = 39 => "V16U16",
        G16R16 = 40 => "G16R16",
        A16B16G16R16 = 41 => "A16B16G16R16",
        Uyvy = 42 => "UYVY",
        Yuy2 = 43 => "YUY2",
        Nv12 = 44 => "NV12",
        FormatDead2 = 45 => "FORMAT_DEAD2",
        ZDf16 = 118 => "Z_DF16",
        ZDf24 = 119 => "Z_DF24",
        ZD24S8Int = 120 => "Z_D24S8_INT",
    }
}

impl SurfaceFormat {
    pub const fn is_depth_stencil(self) -> bool {
        matches!(
            self,
            Self::ZD32
                | Self::ZD16
                | Self::ZD24S8
                | Self::ZD15S1
                | Self::ZD24X8
                | Self::ZDf16
                | Self::ZDf24
                | Self::ZD24S8Int
        )
    }

    pub const fn has_stencil(self) -> bool {
        matches!(
            self,
            Self::ZD24S8 | Self::ZD15S1 | Self::ZD24S8Int | Self::ZDf24
        )
    }

    pub const fn is_block_compressed(self) -> bool {
        matches!(
            self,
            Self::Dxt1 | Self::Dxt2 | Self::Dxt3 | Self::Dxt4 | Self::Dxt5
        )
    }
}

bitflags! {
    /// `SVGA3dSurfaceFlags` (legacy bits).
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SurfaceFlags: u32 {
        const CUBEMAP = 1 << 0;
        const HINT_STATIC = 1 << 1;
        const HINT_DYNAMIC = 1 << 2;
        const HINT_INDEXBUFFER = 1 << 3;
        const HINT_VERTEXBUFFER = 1 << 4;
        const HINT_TEXTURE = 1 << 5;
        const HINT_RENDERTARGET = 1 << 6;
        const HINT_DEPTHSTENCIL = 1 << 7;
        const HINT_WRITEONLY = 1 << 8;
        const MASKABLE_ANTIALIAS = 1 << 9;
        const AUTOGENMIPMAPS = 1 << 10;
    }
}

bitflags! {
    /// `SVGA3DFORMAT_OP_*`: what a format may be used for, reported per surface-format cap.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FormatOps: u32 {
        const TEXTURE = 0x0000_0001;
        const VOLUMETEXTURE = 0x0000_0002;
        const CUBETEXTURE = 0x0000_0004;
        const OFFSCREEN_RENDERTARGET = 0x0000_0008;
        const SAME_FORMAT_RENDERTARGET = 0x0000_0010;
        const ZSTENCIL = 0x0000_0040;
        const ZSTENCIL_WITH_ARBITRARY_COLOR_DEPTH = 0x0000_0080;
        const SAME_FORMAT_UP_TO_ALPHA_RENDERTARGET = 0x0000_0100;
        const DISPLAYMODE = 0x0000_0400;
        const ACCELERATION_3D = 0x0000_0800;
        const PIXELSIZE = 0x0000_1000;
        const CONVERT_TO_ARGB = 0x0000_2000;
        const OFFSCREENPLAIN = 0x0000_4000;
        const SRGBREAD = 0x0000_8000;
        const BUMPMAP = 0x0001_0000;
        const DMAP = 0x0002_0000;
        const NOFILTER = 0x0004_0000;
        const MEMBEROFGROUP_ARGB = 0x0008_0000;
        const SRGBWRITE = 0x0010_0000;
        const NOALPHABLEND = 0x0020_0000;
        const AUTOGENMIPMAP = 0x0040_0000;
        const VERTEXTEXTURE = 0x0080_0000;
        const NOTEXCOORDWRAPNORMIP = 0x0100_0000;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_formats_are_classified() {
        assert!(SurfaceFormat::ZD24S8.is_depth_stencil());
        assert!(SurfaceFormat::ZD24S8.has_stencil());
        assert!(SurfaceFormat::ZD16.is_depth_stencil());
        assert!(!SurfaceFormat::ZD16.has_stencil());
        assert!(!SurfaceFormat::A8R8G8B8.is_depth_stencil());
    }

    #[test]
    fn sparse_depth_format_values_decode() {
        assert_eq!(SurfaceFormat::from_u32(118), Some(SurfaceFormat::ZDf16));
        assert_eq!(SurfaceFormat::from_u32(46), None);
        assert_eq!(SurfaceFormat::from_u32(121), None);
    }
}
