//! Render-state and texture-state identifiers and the value encodings they carry.

wire_enum! {
    /// `SVGA3dRenderStateName`.
    pub enum RenderStateId {
        Invalid = 0 => "INVALID",
        ZEnable = 1 => "ZENABLE",
        ZWriteEnable = 2 => "ZWRITEENABLE",
        AlphaTestEnable = 3 => "ALPHATESTENABLE",
        DitherEnable = 4 => "DITHERENABLE",
        BlendEnable = 5 => "BLENDENABLE",
        FogEnable = 6 => "FOGENABLE",
        SpecularEnable = 7 => "SPECULARENABLE",
        StencilEnable = 8 => "STENCILENABLE",
        LightingEnable = 9 => "LIGHTINGENABLE",
        NormalizeNormals = 10 => "NORMALIZENORMALS",
        PointSpriteEnable = 11 => "POINTSPRITEENABLE",
        PointScaleEnable = 12 => "POINTSCALEENABLE",
        StencilRef = 13 => "STENCILREF",
        StencilMask = 14 => "STENCILMASK",
        StencilWriteMask = 15 => "STENCILWRITEMASK",
        FogStart = 16 => "FOGSTART",
        FogEnd = 17 => "FOGEND",
        FogDensity = 18 => "FOGDENSITY",
        PointSize = 19 => "POINTSIZE",
        PointSizeMin = 20 => "POINTSIZEMIN",
        PointSizeMax = 21 => "POINTSIZEMAX",
        PointScaleA = 22 => "POINTSCALE_A",
        PointScaleB = 23 => "POINTSCALE_B",
        PointScaleC = 24 => "POINTSCALE_C",
        FogColor = 25 => "FOGCOLOR",
        Ambient = 26 => "AMBIENT",
        ClipPlaneEnable = 27 => "CLIPPLANEENABLE",
        FogMode = 28 => "FOGMODE",
        FillMode = 29 => "FILLMODE",
        ShadeMode = 30 => "SHADEMODE",
        LinePattern = 31 => "LINEPATTERN",
        SrcBlend = 32 => "SRCBLEND",
        DstBlend = 33 => "DSTBLEND",
        BlendEquation = 34 => "BLENDEQUATION",
        CullMode = 35 => "CULLMODE",
        ZFunc = 36 => "ZFUNC",
        AlphaFunc = 37 => "ALPHAFUNC",
        StencilFunc = 38 => "STENCILFUNC",
        StencilFail = 39 => "STENCILFAIL",
        StencilZFail = 40 => "STENCILZFAIL",
        StencilPass = 41 => "STENCILPASS",
        AlphaRef = 42 => "ALPHAREF",
        FrontWinding = 43 => "FRONTWINDING",
        CoordinateType = 44 => "COORDINATETYPE",
        ZBias = 45 => "ZBIAS",
        RangeFogEnable = 46 => "RANGEFOGENABLE",
        ColorWriteEnable = 47 => "COLORWRITEENABLE",
        VertexMaterialEnable = 48 => "VERTEXMATERIALENABLE",
        DiffuseMaterialSource = 49 => "DIFFUSEMATERIALSOURCE",
        SpecularMaterialSource = 50 => "SPECULARMATERIALSOURCE",
        AmbientMaterialSource = 51 => "AMBIENTMATERIALSOURCE",
        EmissiveMaterialSource = 52 => "EMISSIVEMATERIALSOURCE",
        TextureFactor = 53 => "TEXTUREFACTOR",
        LocalViewer = 54 => "LOCALVIEWER",
        ScissorTestEnable = 55 => "SCISSORTESTENABLE",
        BlendColor = 56 => "BLENDCOLOR",
        StencilEnable2Sided = 57 => "STENCILENABLE2SIDED",
        CcwStencilFunc = 58 => "CCWSTENCILFUNC",
        CcwStencilFail = 59 => "CCWSTENCILFAIL",
        CcwStencilZFail = 60 => "CCWSTENCILZFAIL",
        CcwStencilPass = 61 => "CCWSTENCILPASS",
        VertexBlend = 62 => "VERTEXBLEND",
        SlopeScaleDepthBias = 63 => "SLOPESCALEDEPTHBIAS",
        DepthBias = 64 => "DEPTHBIAS",
        OutputGamma = 65 => "OUTPUTGAMMA",
        ZVisible = 66 => "ZVISIBLE",
        LastPixel = 67 => "LASTPIXEL",
        Clipping = 68 => "CLIPPING",
        Wrap0 = 69 => "WRAP0",
        Wrap1 = 70 => "WRAP1",
        Wrap2 = 71 => "WRAP2",
        Wrap3 = 72 => "WRAP3",
        Wrap4 = 73 => "WRAP4",
        Wrap5 = 74 => "WRAP5",
        Wrap6 = 75 => "WRAP6",
        Wrap7 = 76 => "WRAP7",
        Wrap8 = 77 => "WRAP8",
        Wrap9 = 78 => "WRAP9",
        Wrap10 = 79 => "WRAP10",
        Wrap11 = 80 => "WRAP11",
        Wrap12 = 81 => "WRAP12",
        Wrap13 = 82 => "WRAP13",
        Wrap14 = 83 => "WRAP14",
        Wrap15 = 84 => "WRAP15",
        MultisampleAntialias = 85 => "MULTISAMPLEANTIALIAS",
        MultisampleMask = 86 => "MULTISAMPLEMASK",
        IndexedVertexBlendEnable = 87 => "INDEXEDVERTEXBLENDENABLE",
        TweenFactor = 88 => "TWEENFACTOR",
        AntialiasedLineEnable = 89 => "ANTIALIASEDLINEENABLE",
        ColorWriteEnable1 = 90 => "COLORWRITEENABLE1",
        ColorWriteEnable2 = 91 => "COLORWRITEENABLE2",
        ColorWriteEnable3 = 92 => "COLORWRITEENABLE3",
        SeparateAlphaBlendEnable = 93 => "SEPARATEALPHABLENDENABLE",
        SrcBlendAlpha = 94 => "SRCBLENDALPHA",
        DstBlendAlpha = 95 => "DSTBLENDALPHA",
        BlendEquationAlpha = 96 => "BLENDEQUATIONALPHA",
        TransparencyAntialias = 97 => "TRANSPARENCYANTIALIAS",
        LineWidth = 98 => "LINEWIDTH",
    }
}

impl RenderStateId {
    /// One past the highest valid render state.
    pub const MAX: u32 = 99;
}

wire_enum! {
    /// `SVGA3dTextureStateName`.
    pub enum TextureStateId {
        Invalid = 0 => "INVALID",
        BindTexture = 1 => "BIND_TEXTURE",
        ColorOp = 2 => "COLOROP",
        ColorArg1 = 3 => "COLORARG1",
        ColorArg2 = 4 => "COLORARG2",
        AlphaOp = 5 => "ALPHAOP",
        AlphaArg1 = 6 => "ALPHAARG1",
        AlphaArg2 = 7 => "ALPHAARG2",
        AddressU = 8 => "ADDRESSU",
        AddressV = 9 => "ADDRESSV",
        MipFilter = 10 => "MIPFILTER",
        MagFilter = 11 => "MAGFILTER",
        MinFilter = 12 => "MINFILTER",
        BorderColor = 13 => "BORDERCOLOR",
        TexCoordIndex = 14 => "TEXCOORDINDEX",
        TextureTransformFlags = 15 => "TEXTURETRANSFORMFLAGS",
        TexCoordGen = 16 => "TEXCOORDGEN",
        BumpEnvMat00 = 17 => "BUMPENVMAT00",
        BumpEnvMat01 = 18 => "BUMPENVMAT01",
        BumpEnvMat10 = 19 => "BUMPENVMAT10",
        BumpEnvMat11 = 20 => "BUMPENVMAT11",
        TextureMipmapLevel = 21 => "TEXTURE_MIPMAP_LEVEL",
        TextureLodBias = 22 => "TEXTURE_LOD_BIAS",
        TextureAnisotropicLevel = 23 => "TEXTURE_ANISOTROPIC_LEVEL",
        AddressW = 24 => "ADDRESSW",
        Gamma = 25 => "GAMMA",
        BumpEnvLScale = 26 => "BUMPENVLSCALE",
        BumpEnvLOffset = 27 => "BUMPENVLOFFSET",
        ColorArg0 = 28 => "COLORARG0",
        AlphaArg0 = 29 => "ALPHAARG0",
    }
}

impl TextureStateId {
    pub const MAX: u32 = 30;
}

wire_enum! {
    pub enum CmpFunc {
        Invalid = 0 => "INVALID",
        Never = 1 => "NEVER",
        Less = 2 => "LESS",
        Equal = 3 => "EQUAL",
        LessEqual = 4 => "LESSEQUAL",
        Greater = 5 => "GREATER",
        NotEqual = 6 => "NOTEQUAL",
        GreaterEqual = 7 => "GREATEREQUAL",
        Always = 8 => "ALWAYS",
    }
}

wire_enum! {
    pub enum StencilOp {
        Invalid = 0 => "INVALID",
        Keep = 1 => "KEEP",
        Zero = 2 => "ZERO",
        Replace = 3 => "REPLACE",
        IncrSat = 4 => "INCRSAT",
        DecrSat = 5 => "DECRSAT",
        Invert = 6 => "INVERT",
        Incr = 7 => "INCR",
        Decr = 8 => "DECR",
    }
}

wire_enum! {
    pub enum BlendOp {
        Invalid = 0 => "INVALID",
        Zero = 1 => "ZERO",
        One = 2 => "ONE",
        SrcColor = 3 => "SRCCOLOR",
        InvSrcColor = 4 => "INVSRCCOLOR",
        SrcAlpha = 5 => "SRCALPHA",
        InvSrcAlpha = 6 => "INVSRCALPHA",
        DestAlpha = 7 => "DESTALPHA",
        InvDestAlpha = 8 => "INVDESTALPHA",
        DestColor = 9 => "DESTCOLOR",
        InvDestColor = 10 => "INVDESTCOLOR",
        SrcAlphaSat = 11 => "SRCALPHASAT",
        BlendFactor = 12 => "BLENDFACTOR",
        InvBlendFactor = 13 => "INVBLENDFACTOR",
        Src1Color = 14 => "SRC1COLOR",
        InvSrc1Color = 15 => "INVSRC1COLOR",
        Src1Alpha = 16 => "SRC1ALPHA",
        InvSrc1Alpha = 17 => "INVSRC1ALPHA",
        BlendFactorAlpha = 18 => "BLENDFACTORALPHA",
        InvBlendFactorAlpha = 19 => "INVBLENDFACTORALPHA",
    }
}

wire_enum! {
    pub enum BlendEquation {
        Invalid = 0 => "INVALID",
        Add = 1 => "ADD",
        Subtract = 2 => "SUBTRACT",
        RevSubtract = 3 => "REVSUBTRACT",
        Minimum = 4 => "MINIMUM",
        Maximum = 5 => "MAXIMUM",
    }
}

wire_enum! {
    pub enum Face {
        Invalid = 0 => "INVALID",
        None = 1 => "NONE",
        Front = 2 => "FRONT",
        Back = 3 => "BACK",
        FrontBack = 4 => "FRONT_BACK",
    }
}

wire_enum! {
    pub enum FillMode {
        Invalid = 0 => "INVALID",
        Point = 1 => "POINT",
        Line = 2 => "LINE",
        Fill = 3 => "FILL",
    }
}

wire_enum! {
    pub enum ShadeMode {
        Invalid = 0 => "INVALID",
        Flat = 1 => "FLAT",
        Smooth = 2 => "SMOOTH",
        /// Not supported by guest drivers either; treated as smooth.
        Phong = 3 => "PHONG",
    }
}

wire_enum! {
    pub enum FrontWinding {
        Invalid = 0 => "INVALID",
        Cw = 1 => "CW",
        Ccw = 2 => "CCW",
    }
}

wire_enum! {
    pub enum FogFunction {
        Invalid = 0 => "INVALID",
        Exp = 1 => "EXP",
        Exp2 = 2 => "EXP2",
        Linear = 3 => "LINEAR",
        PerVertex = 4 => "PER_VERTEX",
    }
}

wire_enum! {
    pub enum VertexMaterialSource {
        None = 0 => "NONE",
        Diffuse = 1 => "DIFFUSE",
        Specular = 2 => "SPECULAR",
    }
}

/// `SVGA3dFillMode` packed into a render-state value: mode in bits 0..16, face in 16..32.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackedFillMode {
    pub mode: u32,
    pub face: u32,
}

impl PackedFillMode {
    pub const fn from_raw(v: u32) -> Self {
        Self {
            mode: v & 0xffff,
            face: v >> 16,
        }
    }
}

/// `SVGA3dFogMode`: function, type and base bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackedFogMode {
    pub function: u32,
    /// 0 = vertex fog, 1 = pixel fog.
    pub kind: u32,
    /// 0 = depth based, 1 = range based.
    pub base: u32,
}

impl PackedFogMode {
    pub const fn from_raw(v: u32) -> Self {
        Self {
            function: v & 0xff,
            kind: (v >> 8) & 0xff,
            base: (v >> 16) & 0xff,
        }
    }
}

/// `SVGA3dLinePattern`: repeat factor in bits 0..16, stipple bits in 16..32.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PackedLinePattern {
    pub repeat: u32,
    pub pattern: u16,
}

impl PackedLinePattern {
    pub const fn from_raw(v: u32) -> Self {
        Self {
            repeat: v & 0xffff,
            pattern: (v >> 16) as u16,
        }
    }
}

wire_enum! {
    /// `SVGA3dTextureCombiner`.
    pub enum TextureCombiner {
        Invalid = 0 => "INVALID",
        Disable = 1 => "DISABLE",
        SelectArg1 = 2 => "SELECTARG1",
        SelectArg2 = 3 => "SELECTARG2",
        Modulate = 4 => "MODULATE",
        Add = 5 => "ADD",
        AddSigned = 6 => "ADDSIGNED",
        Subtract = 7 => "SUBTRACT",
        BlendTextureAlpha = 8 => "BLENDTEXTUREALPHA",
        BlendDiffuseAlpha = 9 => "BLENDDIFFUSEALPHA",
        BlendCurrentAlpha = 10 => "BLENDCURRENTALPHA",
        BlendFactorAlpha = 11 => "BLENDFACTORALPHA",
        Modulate2x = 12 => "MODULATE2X",
        Modulate4x = 13 => "MODULATE4X",
        Dsdt = 14 => "DSDT",
        DotProduct3 = 15 => "DOTPRODUCT3",
        BlendTextureAlphaPm = 16 => "BLENDTEXTUREALPHAPM",
        AddSigned2x = 17 => "ADDSIGNED2X",
        AddSmooth = 18 => "ADDSMOOTH",
        PreModulate = 19 => "PREMODULATE",
        ModulateAlphaAddColor = 20 => "MODULATEALPHA_ADDCOLOR",
        ModulateColorAddAlpha = 21 => "MODULATECOLOR_ADDALPHA",
        ModulateInvAlphaAddColor = 22 => "MODULATEINVALPHA_ADDCOLOR",
        ModulateInvColorAddAlpha = 23 => "MODULATEINVCOLOR_ADDALPHA",
        BumpEnvMapLuminance = 24 => "BUMPENVMAPLUMINANCE",
        MultiplyAdd = 25 => "MULTIPLYADD",
        Lerp = 26 => "LERP",
    }
}

wire_enum! {
    /// `SVGA3dTextureArgData`, low bits of a texture argument.
    pub enum TextureArgSource {
        Invalid = 0 => "INVALID",
        Constant = 1 => "CONSTANT",
        Previous = 2 => "PREVIOUS",
        Diffuse = 3 => "DIFFUSE",
        Texture = 4 => "TEXTURE",
        Specular = 5 => "SPECULAR",
    }
}

/// Modifier bits OR-ed onto a texture argument.
pub const TEX_ARG_MODIFIER_COMPLEMENT: u32 = 0x10;
pub const TEX_ARG_MODIFIER_ALPHAREPLICATE: u32 = 0x20;
pub const TEX_ARG_SOURCE_MASK: u32 = 0x0f;

wire_enum! {
    pub enum TextureAddress {
        Invalid = 0 => "INVALID",
        Wrap = 1 => "WRAP",
        Mirror = 2 => "MIRROR",
        Clamp = 3 => "CLAMP",
        Border = 4 => "BORDER",
        MirrorOnce = 5 => "MIRRORONCE",
        Edge = 6 => "EDGE",
    }
}

wire_enum! {
    pub enum TextureFilter {
        None = 0 => "NONE",
        Nearest = 1 => "NEAREST",
        Linear = 2 => "LINEAR",
        Anisotropic = 3 => "ANISOTROPIC",
        FlatCubic = 4 => "FLATCUBIC",
        GaussianCubic = 5 => "GAUSSIANCUBIC",
        PyramidalQuad = 6 => "PYRAMIDALQUAD",
        GaussianQuad = 7 => "GAUSSIANQUAD",
    }
}

wire_enum! {
    pub enum TexCoordGen {
        Off = 0 => "OFF",
        EyePosition = 1 => "EYE_POSITION",
        EyeNormal = 2 => "EYE_NORMAL",
        ReflectionVector = 3 => "REFLECTIONVECTOR",
        Sphere = 4 => "SPHERE",
    }
}

/// `SVGA3D_TEX_TRANSFORM_*`: component count in the low byte, projected flag above it.
pub const TEX_TRANSFORM_OFF: u32 = 0;
pub const TEX_TRANSFORM_PROJECTED: u32 = 1 << 8;

wire_enum! {
    pub enum TransformType {
        Invalid = 0 => "INVALID",
        World = 1 => "WORLD",
        View = 2 => "VIEW",
        Projection = 3 => "PROJECTION",
        Texture0 = 4 => "TEXTURE0",
        Texture1 = 5 => "TEXTURE1",
        Texture2 = 6 => "TEXTURE2",
        Texture3 = 7 => "TEXTURE3",
        Texture4 = 8 => "TEXTURE4",
        Texture5 = 9 => "TEXTURE5",
        Texture6 = 10 => "TEXTURE6",
        Texture7 = 11 => "TEXTURE7",
        World1 = 12 => "WORLD1",
        World2 = 13 => "WORLD2",
        World3 = 14 => "WORLD3",
    }
}

impl TransformType {
    /// Shadow slots per context (one per transform id, including the unused 0 and 15).
    pub const SLOTS: usize = 16;

    pub const fn texture_stage(self) -> Option<usize> {
        let v = self as u32;
        if v >= Self::Texture0 as u32 && v <= Self::Texture7 as u32 {
            Some((v - Self::Texture0 as u32) as usize)
        } else {
            None
        }
    }
}

wire_enum! {
    pub enum LightType {
        Invalid = 0 => "INVALID",
        Point = 1 => "POINT",
        Spot1 = 2 => "SPOT1",
        Spot2 = 3 => "SPOT2",
        Directional = 4 => "DIRECTIONAL",
    }
}

wire_enum! {
    pub enum RenderTargetType {
        Depth = 0 => "DEPTH",
        Stencil = 1 => "STENCIL",
        Color0 = 2 => "COLOR0",
        Color1 = 3 => "COLOR1",
        Color2 = 4 => "COLOR2",
        Color3 = 5 => "COLOR3",
        Color4 = 6 => "COLOR4",
        Color5 = 7 => "COLOR5",
        Color6 = 8 => "COLOR6",
        Color7 = 9 => "COLOR7",
    }
}

impl RenderTargetType {
    pub const fn color_index(self) -> Option<usize> {
        match self {
            Self::Depth | Self::Stencil => None,
            other => Some((other as u32 - Self::Color0 as u32) as usize),
        }
    }
}

bitflags::bitflags! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct ClearFlags: u32 {
        const COLOR = 0x1;
        const DEPTH = 0x2;
        const STENCIL = 0x4;
    }
}

wire_enum! {
    pub enum StretchBltMode {
        Point = 0 => "POINT",
        Linear = 1 => "LINEAR",
    }
}

wire_enum! {
    pub enum TransferType {
        Invalid = 0 => "INVALID",
        WriteHostVram = 1 => "WRITE_HOST_VRAM",
        ReadHostVram = 2 => "READ_HOST_VRAM",
    }
}

wire_enum! {
    pub enum ShaderType {
        Invalid = 0 => "INVALID",
        Vs = 1 => "VS",
        Ps = 2 => "PS",
    }
}

wire_enum! {
    pub enum ShaderConstType {
        Float = 0 => "FLOAT",
        Int = 1 => "INT",
        Bool = 2 => "BOOL",
    }
}

wire_enum! {
    pub enum QueryType {
        Occlusion = 0 => "OCCLUSION",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_state_ids_are_dense_up_to_max() {
        assert_eq!(RenderStateId::ALL.len() as u32, RenderStateId::MAX);
        for (i, rs) in RenderStateId::ALL.iter().enumerate() {
            assert_eq!(rs.as_u32(), i as u32, "{rs} out of order");
        }
        assert_eq!(RenderStateId::from_u32(RenderStateId::MAX), None);
    }

    #[test]
    fn texture_state_ids_are_dense_up_to_max() {
        assert_eq!(TextureStateId::ALL.len() as u32, TextureStateId::MAX);
        assert_eq!(TextureStateId::from_u32(14), Some(TextureStateId::TexCoordIndex));
    }

    #[test]
    fn packed_values_split_into_fields() {
        let fill = PackedFillMode::from_raw((Face::FrontBack as u32) << 16 | FillMode::Line as u32);
        assert_eq!(fill.mode, FillMode::Line as u32);
        assert_eq!(fill.face, Face::FrontBack as u32);

        let fog = PackedFogMode::from_raw(0x0001_0103);
        assert_eq!(fog.function, FogFunction::Linear as u32);
        assert_eq!(fog.kind, 1);
        assert_eq!(fog.base, 1);

        let pattern = PackedLinePattern::from_raw(0xF0F0_0002);
        assert_eq!(pattern.repeat, 2);
        assert_eq!(pattern.pattern, 0xF0F0);
    }

    #[test]
    fn texture_transform_stage_index() {
        assert_eq!(TransformType::Texture3.texture_stage(), Some(3));
        assert_eq!(TransformType::View.texture_stage(), None);
        assert_eq!(RenderTargetType::Color5.color_index(), Some(5));
        assert_eq!(RenderTargetType::Depth.color_index(), None);
    }
}
