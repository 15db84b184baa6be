//! Legacy (pre-DX) SVGA3D command IDs.
//!
//! The backend does not decode command bodies; the IDs are used for log attribution and by
//! the device model's dispatcher.

wire_enum! {
    pub enum Svga3dCmdId {
        SurfaceDefine = 1040 => "SURFACE_DEFINE",
        SurfaceDestroy = 1041 => "SURFACE_DESTROY",
        SurfaceCopy = 1042 => "SURFACE_COPY",
        SurfaceStretchBlt = 1043 => "SURFACE_STRETCHBLT",
        SurfaceDma = 1044 => "SURFACE_DMA",
        ContextDefine = 1045 => "CONTEXT_DEFINE",
        ContextDestroy = 1046 => "CONTEXT_DESTROY",
        SetTransform = 1047 => "SETTRANSFORM",
        SetZRange = 1048 => "SETZRANGE",
        SetRenderState = 1049 => "SETRENDERSTATE",
        SetRenderTarget = 1050 => "SETRENDERTARGET",
        SetTextureState = 1051 => "SETTEXTURESTATE",
        SetMaterial = 1052 => "SETMATERIAL",
        SetLightData = 1053 => "SETLIGHTDATA",
        SetLightEnabled = 1054 => "SETLIGHTENABLED",
        SetViewport = 1055 => "SETVIEWPORT",
        SetClipPlane = 1056 => "SETCLIPPLANE",
        Clear = 1057 => "CLEAR",
        Present = 1058 => "PRESENT",
        ShaderDefine = 1059 => "SHADER_DEFINE",
        ShaderDestroy = 1060 => "SHADER_DESTROY",
        SetShader = 1061 => "SET_SHADER",
        SetShaderConst = 1062 => "SET_SHADER_CONST",
        DrawPrimitives = 1063 => "DRAW_PRIMITIVES",
        SetScissorRect = 1064 => "SETSCISSORRECT",
        BeginQuery = 1065 => "BEGIN_QUERY",
        EndQuery = 1066 => "END_QUERY",
        WaitForQuery = 1067 => "WAIT_FOR_QUERY",
        PresentReadback = 1068 => "PRESENT_READBACK",
        BlitSurfaceToScreen = 1069 => "BLIT_SURFACE_TO_SCREEN",
        SurfaceDefineV2 = 1070 => "SURFACE_DEFINE_V2",
        GenerateMipmaps = 1071 => "GENERATE_MIPMAPS",
        ActivateSurface = 1080 => "ACTIVATE_SURFACE",
        DeactivateSurface = 1081 => "DEACTIVATE_SURFACE",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_id_decoding_rejects_the_gap_and_out_of_range_values() {
        assert_eq!(Svga3dCmdId::from_u32(1044), Some(Svga3dCmdId::SurfaceDma));
        assert_eq!(Svga3dCmdId::from_u32(1071), Some(Svga3dCmdId::GenerateMipmaps));
        assert_eq!(Svga3dCmdId::from_u32(1075), None);
        assert_eq!(Svga3dCmdId::from_u32(1039), None);
        assert_eq!(Svga3dCmdId::from_u32(1072), None);
    }
}
