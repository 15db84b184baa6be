//! Vertex declaration and primitive vocabulary used by `DRAW_PRIMITIVES`.

wire_enum! {
    pub enum PrimitiveType {
        Invalid = 0 => "INVALID",
        TriangleList = 1 => "TRIANGLELIST",
        PointList = 2 => "POINTLIST",
        LineList = 3 => "LINELIST",
        LineStrip = 4 => "LINESTRIP",
        TriangleStrip = 5 => "TRIANGLESTRIP",
        TriangleFan = 6 => "TRIANGLEFAN",
    }
}

wire_enum! {
    pub enum DeclType {
        Float1 = 0 => "FLOAT1",
        Float2 = 1 => "FLOAT2",
        Float3 = 2 => "FLOAT3",
        Float4 = 3 => "FLOAT4",
        D3dColor = 4 => "D3DCOLOR",
        Ubyte4 = 5 => "UBYTE4",
        Short2 = 6 => "SHORT2",
        Short4 = 7 => "SHORT4",
        Ubyte4N = 8 => "UBYTE4N",
        Short2N = 9 => "SHORT2N",
        Short4N = 10 => "SHORT4N",
        Ushort2N = 11 => "USHORT2N",
        Ushort4N = 12 => "USHORT4N",
        Udec3 = 13 => "UDEC3",
        Dec3N = 14 => "DEC3N",
        Float16x2 = 15 => "FLOAT16_2",
        Float16x4 = 16 => "FLOAT16_4",
    }
}

impl DeclType {
    /// Size of one element in the vertex stream.
    pub const fn size_bytes(self) -> u32 {
        match self {
            Self::Float1 => 4,
            Self::Float2 => 8,
            Self::Float3 => 12,
            Self::Float4 => 16,
            Self::D3dColor | Self::Ubyte4 | Self::Ubyte4N => 4,
            Self::Short2 | Self::Short2N | Self::Ushort2N => 4,
            Self::Short4 | Self::Short4N | Self::Ushort4N => 8,
            Self::Udec3 | Self::Dec3N => 4,
            Self::Float16x2 => 4,
            Self::Float16x4 => 8,
        }
    }
}

wire_enum! {
    pub enum DeclMethod {
        Default = 0 => "DEFAULT",
        PartialU = 1 => "PARTIALU",
        PartialV = 2 => "PARTIALV",
        CrossUv = 3 => "CROSSUV",
        Uv = 4 => "UV",
        Lookup = 5 => "LOOKUP",
        LookupPresampled = 6 => "LOOKUPPRESAMPLED",
    }
}

wire_enum! {
    pub enum DeclUsage {
        Position = 0 => "POSITION",
        BlendWeight = 1 => "BLENDWEIGHT",
        BlendIndices = 2 => "BLENDINDICES",
        Normal = 3 => "NORMAL",
        PSize = 4 => "PSIZE",
        TexCoord = 5 => "TEXCOORD",
        Tangent = 6 => "TANGENT",
        Binormal = 7 => "BINORMAL",
        TessFactor = 8 => "TESSFACTOR",
        PositionT = 9 => "POSITIONT",
        Color = 10 => "COLOR",
        Fog = 11 => "FOG",
        Depth = 12 => "DEPTH",
        Sample = 13 => "SAMPLE",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decl_sizes_cover_packed_types() {
        assert_eq!(DeclType::Float3.size_bytes(), 12);
        assert_eq!(DeclType::D3dColor.size_bytes(), 4);
        assert_eq!(DeclType::Short4N.size_bytes(), 8);
        assert_eq!(DeclType::Float16x4.size_bytes(), 8);
    }
}
