mod common;

use std::collections::HashSet;

use common::{buffer_surface, guest_state, shared_handle, soft_device, soft_device_with};
use pretty_assertions::assert_eq;
use svga3d_gl::gl::consts as gl;
use svga3d_gl::gl::OptionalEntryPoint;
use svga3d_gl::soft::SoftConfig;
use svga3d_gl::{CommandError, CommandStatus, HostObject, NullShaderBridge, ShaderTier, SurfaceDesc};
use svga3d_protocol::state::{
    BlendOp, CmpFunc, Face, RenderStateId, StencilOp, TextureAddress, TextureFilter, TextureStateId,
};
use svga3d_protocol::{DevCapIndex, FormatOps, RenderState, SurfaceFlags, SurfaceFormat, TextureState, SVGA3D_INVALID_ID};

const CID: u32 = 4;

fn rs(id: RenderStateId, value: u32) -> RenderState {
    RenderState::new(id, value)
}

fn two_sided_stencil() -> Vec<RenderState> {
    vec![
        rs(RenderStateId::StencilEnable, 1),
        rs(RenderStateId::StencilFunc, CmpFunc::Equal as u32),
        rs(RenderStateId::StencilPass, StencilOp::Replace as u32),
        rs(RenderStateId::StencilRef, 5),
        rs(RenderStateId::StencilEnable2Sided, 1),
        rs(RenderStateId::CcwStencilFunc, CmpFunc::Never as u32),
        rs(RenderStateId::CcwStencilFail, StencilOp::Zero as u32),
    ]
}

#[test]
fn two_sided_stencil_programs_each_face() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    dev.set_render_states(CID, &two_sided_stencil()).unwrap();

    {
        let ctx = guest_state(&dev, &host, CID);
        assert!(ctx.is_enabled(gl::STENCIL_TEST));
        assert_eq!(
            (ctx.stencil_front.func, ctx.stencil_front.reference, ctx.stencil_front.zpass),
            (gl::EQUAL, 5, gl::REPLACE)
        );
        // Back-face states left unset follow the front face.
        assert_eq!(
            (ctx.stencil_back.func, ctx.stencil_back.fail, ctx.stencil_back.zpass),
            (gl::NEVER, gl::ZERO, gl::REPLACE)
        );
    }

    // The reference is shared, so changing it re-derives both faces.
    dev.set_render_states(CID, &[rs(RenderStateId::StencilRef, 9)]).unwrap();
    let ctx = guest_state(&dev, &host, CID);
    assert_eq!(ctx.stencil_front.reference, 9);
    assert_eq!(ctx.stencil_back.reference, 9);
    assert_eq!(ctx.stencil_back.func, gl::NEVER);
}

#[test]
fn enabling_two_sided_stencil_later_copies_the_front_face() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    dev.set_render_states(
        CID,
        &[
            rs(RenderStateId::StencilEnable, 1),
            rs(RenderStateId::StencilFunc, CmpFunc::Greater as u32),
            rs(RenderStateId::StencilFail, StencilOp::Invert as u32),
            rs(RenderStateId::StencilZFail, StencilOp::Decr as u32),
            rs(RenderStateId::StencilPass, StencilOp::Replace as u32),
            rs(RenderStateId::StencilRef, 3),
            rs(RenderStateId::StencilMask, 0x0F),
        ],
    )
    .unwrap();
    dev.set_render_states(CID, &[rs(RenderStateId::StencilEnable2Sided, 1)])
        .unwrap();

    let ctx = guest_state(&dev, &host, CID);
    assert!(ctx.is_enabled(gl::STENCIL_TEST));
    assert_eq!(
        (
            ctx.stencil_front.func,
            ctx.stencil_front.reference,
            ctx.stencil_front.value_mask,
            ctx.stencil_front.fail,
            ctx.stencil_front.zfail,
            ctx.stencil_front.zpass,
        ),
        (gl::GREATER, 3, 0x0F, gl::INVERT, gl::DECR_WRAP, gl::REPLACE)
    );
    assert_eq!(ctx.stencil_back, ctx.stencil_front);
}

#[test]
fn two_sided_stencil_without_separate_entry_points_uses_the_front_face() {
    let config = SoftConfig {
        missing_entry_points: HashSet::from([OptionalEntryPoint::StencilSeparate]),
        ..SoftConfig::default()
    };
    let (mut dev, host) = soft_device_with(config, Box::new(NullShaderBridge::default()));
    dev.define_context(CID).unwrap();
    dev.set_render_states(CID, &two_sided_stencil()).unwrap();

    let ctx = guest_state(&dev, &host, CID);
    assert_eq!(ctx.stencil_back, ctx.stencil_front);
    assert_eq!(ctx.stencil_back.func, gl::EQUAL);
}

#[test]
fn rejected_render_state_stops_the_batch() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();

    let batch = [
        rs(RenderStateId::ZFunc, CmpFunc::Greater as u32),
        // No dual-source blending on the soft host.
        rs(RenderStateId::SrcBlend, BlendOp::Src1Color as u32),
        rs(RenderStateId::CullMode, Face::Front as u32),
    ];
    let err = dev.set_render_states(CID, &batch).unwrap_err();
    assert!(matches!(err, CommandError::Unsupported(_)), "{err}");
    assert_eq!(dev.set_render_states_status(CID, &batch), CommandStatus::NotSupported);

    let shadow = &dev.context(CID).unwrap().state;
    assert_eq!(shadow.render_state(RenderStateId::ZFunc), Some(CmpFunc::Greater as u32));
    assert_eq!(shadow.render_state(RenderStateId::SrcBlend), None);
    assert_eq!(shadow.render_state(RenderStateId::CullMode), None);
    {
        let ctx = guest_state(&dev, &host, CID);
        assert_eq!(ctx.depth_func, gl::GREATER);
        assert!(!ctx.is_enabled(gl::CULL_FACE));
    }

    // An invalid value leaves the earlier one in place.
    assert!(matches!(
        dev.set_render_states(CID, &[rs(RenderStateId::ZFunc, 0)]),
        Err(CommandError::UnknownEnum { .. })
    ));
    assert_eq!(
        dev.context(CID).unwrap().state.render_state(RenderStateId::ZFunc),
        Some(CmpFunc::Greater as u32)
    );
    assert_eq!(guest_state(&dev, &host, CID).depth_func, gl::GREATER);

    assert!(matches!(
        dev.set_render_states(CID, &[RenderState { state: 9999, value: 1 }]),
        Err(CommandError::UnknownEnum { .. })
    ));
}

#[test]
fn separate_alpha_blend_falls_back_to_combined_factors() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    dev.set_render_states(
        CID,
        &[
            rs(RenderStateId::BlendEnable, 1),
            rs(RenderStateId::SrcBlend, BlendOp::SrcAlpha as u32),
            rs(RenderStateId::DstBlend, BlendOp::InvSrcAlpha as u32),
            rs(RenderStateId::SeparateAlphaBlendEnable, 1),
            rs(RenderStateId::SrcBlendAlpha, BlendOp::One as u32),
        ],
    )
    .unwrap();

    let ctx = guest_state(&dev, &host, CID);
    assert!(ctx.is_enabled(gl::BLEND));
    assert_eq!(ctx.blend_src, (gl::SRC_ALPHA, gl::SRC_ALPHA));
    assert_eq!(ctx.blend_dst, (gl::ONE_MINUS_SRC_ALPHA, gl::ONE_MINUS_SRC_ALPHA));
}

#[test]
fn cull_and_winding_states() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    dev.set_render_states(CID, &[rs(RenderStateId::CullMode, Face::Front as u32)])
        .unwrap();
    {
        let ctx = guest_state(&dev, &host, CID);
        assert!(ctx.is_enabled(gl::CULL_FACE));
        assert_eq!(ctx.cull_face, gl::FRONT);
    }
    dev.set_render_states(CID, &[rs(RenderStateId::CullMode, Face::None as u32)])
        .unwrap();
    assert!(!guest_state(&dev, &host, CID).is_enabled(gl::CULL_FACE));
}

#[test]
fn texture_binds_enable_the_unit_and_replay_sampler_state() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    dev.define_surface(3, &SurfaceDesc::texture_2d(SurfaceFormat::A8R8G8B8, 4, 4))
        .unwrap();

    // Sampler state set before the bind is replayed onto the texture.
    dev.set_texture_states(
        CID,
        &[
            TextureState::new(1, TextureStateId::AddressU, TextureAddress::Clamp as u32),
            TextureState::new(1, TextureStateId::MinFilter, TextureFilter::Linear as u32),
            TextureState::new(1, TextureStateId::BindTexture, 3),
        ],
    )
    .unwrap();
    let Some(HostObject::Texture { name, .. }) = dev.surface(3).unwrap().object() else {
        panic!("texture surface should be backed by a texture");
    };
    {
        let ctx = guest_state(&dev, &host, CID);
        assert_eq!(ctx.bound_texture(1, gl::TEXTURE_2D), name);
        assert!(ctx.is_enabled_on_unit(gl::TEXTURE_2D, 1));
        assert_eq!(ctx.active_texture, 0);
    }
    let tex = host.texture(shared_handle(&dev), name).unwrap();
    assert_eq!(tex.params_i.get(&gl::TEXTURE_WRAP_S), Some(&(gl::CLAMP_TO_EDGE as i32)));
    assert_eq!(tex.params_i.get(&gl::TEXTURE_MIN_FILTER), Some(&(gl::LINEAR as i32)));

    dev.set_texture_states(CID, &[TextureState::new(1, TextureStateId::BindTexture, SVGA3D_INVALID_ID)])
        .unwrap();
    let ctx = guest_state(&dev, &host, CID);
    assert_eq!(ctx.bound_texture(1, gl::TEXTURE_2D), 0);
    assert!(!ctx.is_enabled_on_unit(gl::TEXTURE_2D, 1));
    assert_eq!(dev.context(CID).unwrap().state.textures[1], None);
}

#[test]
fn unresolvable_texture_bind_stops_the_batch() {
    let (mut dev, _host) = soft_device();
    dev.define_context(CID).unwrap();
    buffer_surface(&mut dev, 8, SurfaceFlags::HINT_VERTEXBUFFER, &[0; 16]);

    let batch = [
        TextureState::new(0, TextureStateId::AddressU, TextureAddress::Wrap as u32),
        TextureState::new(0, TextureStateId::BindTexture, 77),
        TextureState::new(0, TextureStateId::AddressV, TextureAddress::Wrap as u32),
    ];
    assert!(matches!(
        dev.set_texture_states(CID, &batch),
        Err(CommandError::InvalidSurface(77))
    ));
    let shadow = &dev.context(CID).unwrap().state;
    assert_eq!(shadow.texture_state(0, TextureStateId::AddressU), Some(TextureAddress::Wrap as u32));
    assert_eq!(shadow.texture_state(0, TextureStateId::AddressV), None);

    // A buffer surface can't be sampled.
    assert_eq!(
        dev.set_texture_states_status(CID, &[TextureState::new(0, TextureStateId::BindTexture, 8)]),
        CommandStatus::NotSupported
    );
    assert!(matches!(
        dev.set_texture_states(CID, &[TextureState::new(40, TextureStateId::AddressU, 1)]),
        Err(CommandError::IndexOutOfRange { what: "texture stage", .. })
    ));
    assert!(matches!(
        dev.set_texture_states(CID, &[TextureState::new(0, TextureStateId::AddressU, 0)]),
        Err(CommandError::UnknownEnum { .. })
    ));
}

#[test]
fn capabilities_reflect_the_host() {
    let (dev, _host) = soft_device();
    let cap = |index: DevCapIndex| dev.query_capability(index.as_u32()).unwrap();

    assert_eq!(dev.caps().tier, ShaderTier::Sm30);
    assert_eq!(cap(DevCapIndex::Is3d), 1);
    assert_eq!(cap(DevCapIndex::MaxLights), 8);
    assert_eq!(cap(DevCapIndex::MaxClipPlanes), 6);
    assert_eq!(cap(DevCapIndex::MaxTextureWidth), 16384);
    assert_eq!(cap(DevCapIndex::MaxPointSize), 64.0f32.to_bits());
    assert_eq!(cap(DevCapIndex::QueryTypes), 1);
    assert_eq!(cap(DevCapIndex::VertexShaderVersion), dev.caps().tier.vertex_version());

    let argb = FormatOps::from_bits_truncate(cap(DevCapIndex::SurfaceFmtA8R8G8B8));
    assert!(argb.contains(FormatOps::TEXTURE | FormatOps::OFFSCREEN_RENDERTARGET));
    let dxt = FormatOps::from_bits_truncate(cap(DevCapIndex::SurfaceFmtDxt5));
    assert!(dxt.contains(FormatOps::TEXTURE));
    assert!(!dxt.contains(FormatOps::OFFSCREEN_RENDERTARGET));
    assert_eq!(cap(DevCapIndex::SurfaceFmtNv12), 0);

    assert_eq!(dev.query_capability_status(9999), (CommandStatus::InvalidParameter, 0));
    assert_eq!(
        dev.query_capability_status(DevCapIndex::MaxLights.as_u32()),
        (CommandStatus::Ok, 8)
    );
}

#[test]
fn state_on_unknown_contexts_is_rejected() {
    let (mut dev, _host) = soft_device();
    assert_eq!(
        dev.set_render_states_status(CID, &[rs(RenderStateId::ZEnable, 1)]),
        CommandStatus::InvalidParameter
    );
    assert_eq!(
        dev.set_texture_states_status(CID, &[TextureState::new(0, TextureStateId::AddressU, 1)]),
        CommandStatus::InvalidParameter
    );
}
