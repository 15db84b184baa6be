//! Device capability indices (`SVGA3D_DEVCAP_*`).
//!
//! Index values are fixed by the register interface; gaps are retired capabilities that
//! guests may still probe.

wire_enum! {
    pub enum DevCapIndex {
        Is3d = 0 => "3D",
        MaxLights = 1 => "MAX_LIGHTS",
        MaxTextures = 2 => "MAX_TEXTURES",
        MaxClipPlanes = 3 => "MAX_CLIP_PLANES",
        VertexShaderVersion = 4 => "VERTEX_SHADER_VERSION",
        VertexShader = 5 => "VERTEX_SHADER",
        FragmentShaderVersion = 6 => "FRAGMENT_SHADER_VERSION",
        FragmentShader = 7 => "FRAGMENT_SHADER",
        MaxRenderTargets = 8 => "MAX_RENDER_TARGETS",
        S23e8Textures = 9 => "S23E8_TEXTURES",
        S10e5Textures = 10 => "S10E5_TEXTURES",
        MaxFixedVertexBlend = 11 => "MAX_FIXED_VERTEXBLEND",
        D16BufferFormat = 12 => "D16_BUFFER_FORMAT",
        D24S8BufferFormat = 13 => "D24S8_BUFFER_FORMAT",
        D24X8BufferFormat = 14 => "D24X8_BUFFER_FORMAT",
        QueryTypes = 15 => "QUERY_TYPES",
        TextureGradientSampling = 16 => "TEXTURE_GRADIENT_SAMPLING",
        MaxPointSize = 17 => "MAX_POINT_SIZE",
        MaxShaderTextures = 18 => "MAX_SHADER_TEXTURES",
        MaxTextureWidth = 19 => "MAX_TEXTURE_WIDTH",
        MaxTextureHeight = 20 => "MAX_TEXTURE_HEIGHT",
        MaxVolumeExtent = 21 => "MAX_VOLUME_EXTENT",
        MaxTextureRepeat = 22 => "MAX_TEXTURE_REPEAT",
        MaxTextureAspectRatio = 23 => "MAX_TEXTURE_ASPECT_RATIO",
        MaxTextureAnisotropy = 24 => "MAX_TEXTURE_ANISOTROPY",
        MaxPrimitiveCount = 25 => "MAX_PRIMITIVE_COUNT",
        MaxVertexIndex = 26 => "MAX_VERTEX_INDEX",
        MaxVertexShaderInstructions = 27 => "MAX_VERTEX_SHADER_INSTRUCTIONS",
        MaxFragmentShaderInstructions = 28 => "MAX_FRAGMENT_SHADER_INSTRUCTIONS",
        MaxVertexShaderTemps = 29 => "MAX_VERTEX_SHADER_TEMPS",
        MaxFragmentShaderTemps = 30 => "MAX_FRAGMENT_SHADER_TEMPS",
        TextureOps = 31 => "TEXTURE_OPS",
        SurfaceFmtX8R8G8B8 = 32 => "SURFACEFMT_X8R8G8B8",
        SurfaceFmtA8R8G8B8 = 33 => "SURFACEFMT_A8R8G8B8",
        SurfaceFmtA2R10G10B10 = 34 => "SURFACEFMT_A2R10G10B10",
        SurfaceFmtX1R5G5B5 = 35 => "SURFACEFMT_X1R5G5B5",
        SurfaceFmtA1R5G5B5 = 36 => "SURFACEFMT_A1R5G5B5",
        SurfaceFmtA4R4G4B4 = 37 => "SURFACEFMT_A4R4G4B4",
        SurfaceFmtR5G6B5 = 38 => "SURFACEFMT_R5G6B5",
        SurfaceFmtLuminance16 = 39 => "SURFACEFMT_LUMINANCE16",
        SurfaceFmtLuminance8Alpha8 = 40 => "SURFACEFMT_LUMINANCE8_ALPHA8",
        SurfaceFmtAlpha8 = 41 => "SURFACEFMT_ALPHA8",
        SurfaceFmtLuminance8 = 42 => "SURFACEFMT_LUMINANCE8",
        SurfaceFmtZD16 = 43 => "SURFACEFMT_Z_D16",
        SurfaceFmtZD24S8 = 44 => "SURFACEFMT_Z_D24S8",
        SurfaceFmtZD24X8 = 45 => "SURFACEFMT_Z_D24X8",
        SurfaceFmtDxt1 = 46 => "SURFACEFMT_DXT1",
        SurfaceFmtDxt2 = 47 => "SURFACEFMT_DXT2",
        SurfaceFmtDxt3 = 48 => "SURFACEFMT_DXT3",
        SurfaceFmtDxt4 = 49 => "SURFACEFMT_DXT4",
        SurfaceFmtDxt5 = 50 => "SURFACEFMT_DXT5",
        SurfaceFmtBumpX8L8V8U8 = 51 => "SURFACEFMT_BUMPX8L8V8U8",
        SurfaceFmtA2W10V10U10 = 52 => "SURFACEFMT_A2W10V10U10",
        SurfaceFmtBumpU8V8 = 53 => "SURFACEFMT_BUMPU8V8",
        SurfaceFmtQ8W8V8U8 = 54 => "SURFACEFMT_Q8W8V8U8",
        SurfaceFmtCxV8U8 = 55 => "SURFACEFMT_CxV8U8",
        SurfaceFmtRS10e5 = 56 => "SURFACEFMT_R_S10E5",
        SurfaceFmtRS23e8 = 57 => "SURFACEFMT_R_S23E8",
        SurfaceFmtRgS10e5 = 58 => "SURFACEFMT_RG_S10E5",
        SurfaceFmtRgS23e8 = 59 => "SURFACEFMT_RG_S23E8",
        SurfaceFmtArgbS10e5 = 60 => "SURFACEFMT_ARGB_S10E5",
        SurfaceFmtArgbS23e8 = 61 => "SURFACEFMT_ARGB_S23E8",
        Missing62 = 62 => "MISSING62",
        MaxVertexShaderTextures = 63 => "MAX_VERTEX_SHADER_TEXTURES",
        MaxSimultaneousRenderTargets = 64 => "MAX_SIMULTANEOUS_RENDER_TARGETS",
        SurfaceFmtV16U16 = 65 => "SURFACEFMT_V16U16",
        SurfaceFmtG16R16 = 66 => "SURFACEFMT_G16R16",
        SurfaceFmtA16B16G16R16 = 67 => "SURFACEFMT_A16B16G16R16",
        SurfaceFmtUyvy = 68 => "SURFACEFMT_UYVY",
        SurfaceFmtYuy2 = 69 => "SURFACEFMT_YUY2",
        Dead4 = 70 => "DEAD4",
        Dead5 = 71 => "DEAD5",
        Dead7 = 72 => "DEAD7",
        Dead6 = 73 => "DEAD6",
        AutoGenMipmaps = 74 => "AUTOGENMIPMAPS",
        SurfaceFmtNv12 = 75 => "SURFACEFMT_NV12",
        Dead10 = 76 => "DEAD10",
        MaxContextIds = 77 => "MAX_CONTEXT_IDS",
        MaxSurfaceIds = 78 => "MAX_SURFACE_IDS",
        SurfaceFmtZDf16 = 79 => "SURFACEFMT_Z_DF16",
        SurfaceFmtZDf24 = 80 => "SURFACEFMT_Z_DF24",
        SurfaceFmtZD24S8Int = 81 => "SURFACEFMT_Z_D24S8_INT",
        SurfaceFmtAti1 = 82 => "SURFACEFMT_ATI1",
        SurfaceFmtAti2 = 83 => "SURFACEFMT_ATI2",
    }
}

impl DevCapIndex {
    /// Number of indices this backend answers; the DX-era indices above are not served.
    pub const COUNT: u32 = 84;
}

/// Values reported for the shader-version capabilities.
pub mod shader_version {
    pub const VS_NONE: u32 = 0;
    pub const VS_11: u32 = 3;
    pub const VS_20: u32 = 5;
    pub const VS_30: u32 = 7;
    pub const VS_40: u32 = 9;

    pub const PS_NONE: u32 = 0;
    pub const PS_11: u32 = 3;
    pub const PS_12: u32 = 5;
    pub const PS_13: u32 = 7;
    pub const PS_14: u32 = 9;
    pub const PS_20: u32 = 11;
    pub const PS_30: u32 = 13;
    pub const PS_40: u32 = 15;
}
