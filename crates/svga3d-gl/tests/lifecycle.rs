mod common;

use common::{backend_config, shared_handle, soft_device, soft_device_with, words};
use pretty_assertions::assert_eq;
use svga3d_gl::gl::consts as gl;
use svga3d_gl::shader::{ShaderCall, ShaderVersion};
use svga3d_gl::soft::{SoftConfig, SoftPlatform};
use svga3d_gl::{
    CommandError, CommandStatus, HostObject, NullShaderBridge, RecordingShaderBridge, SurfaceDesc, Svga3dGl,
    YuvConverter,
};
use svga3d_protocol::state::{ShaderConstType, ShaderType, TextureFilter};
use svga3d_protocol::{SurfaceFormat, SVGA3D_INVALID_ID};

const VS_2_0: [u32; 2] = [0xFFFE_0200, 0x0000_FFFF];
const PS_3_0: [u32; 2] = [0xFFFF_0300, 0x0000_FFFF];

#[test]
fn power_on_fails_when_the_host_cannot_create_contexts() {
    common::init_tracing();
    let (platform, host) = SoftPlatform::new(SoftConfig {
        fail_context_creation: true,
        ..Default::default()
    });
    let result = Svga3dGl::power_on(
        Box::new(platform),
        &backend_config(),
        Box::new(NullShaderBridge::default()),
        Box::new(YuvConverter),
    );
    assert!(result.is_err());
    assert_eq!(host.live_contexts(), 0);
}

#[test]
fn power_on_leaves_only_the_shared_context() {
    let (dev, host) = soft_device();
    assert_eq!(host.live_contexts(), 1);
    assert!(dev.native_context(None).is_some());
    assert_eq!(dev.context_ids().count(), 0);
}

#[test]
fn contexts_are_defined_redefined_and_destroyed() {
    let (mut dev, host) = soft_device();

    assert_eq!(dev.define_context_status(0), CommandStatus::Ok);
    dev.define_context(7).unwrap();
    assert_eq!(host.live_contexts(), 3);
    let first = dev.native_context(Some(7)).unwrap();

    dev.define_context(7).unwrap();
    assert_eq!(host.live_contexts(), 3);
    assert!(host.context(first).is_none());

    let mut ids: Vec<u32> = dev.context_ids().collect();
    ids.sort_unstable();
    assert_eq!(ids, vec![0, 7]);

    dev.destroy_context(7).unwrap();
    assert!(matches!(dev.destroy_context(7), Err(CommandError::InvalidContext(7))));
    assert_eq!(dev.destroy_context_status(7), CommandStatus::InvalidParameter);
    assert_eq!(host.live_contexts(), 2);
    assert!(dev.context(7).is_none());
}

#[test]
fn new_contexts_start_with_lequal_depth_and_modelview() {
    let (mut dev, host) = soft_device();
    dev.define_context(1).unwrap();
    let state = common::guest_state(&dev, &host, 1);
    assert_eq!(state.depth_func, gl::LEQUAL);
    assert_eq!(state.matrix_mode, gl::MODELVIEW);
}

#[test]
fn reset_keeps_the_shared_context() {
    let (mut dev, host) = soft_device();
    dev.define_context(1).unwrap();
    dev.define_context(2).unwrap();
    dev.define_surface(3, &SurfaceDesc::texture_2d(SurfaceFormat::A8R8G8B8, 4, 4))
        .unwrap();
    dev.define_screen(0, 64, 32).unwrap();

    dev.reset();

    assert_eq!(dev.context_ids().count(), 0);
    assert!(dev.surface(3).is_none());
    assert!(dev.screens().is_empty());
    assert_eq!(host.live_contexts(), 1);
    assert_eq!(dev.native_context(None), Some(shared_handle(&dev)));

    // The device stays usable.
    dev.define_context(1).unwrap();
}

#[test]
fn power_off_releases_the_host() {
    let (mut dev, host) = soft_device();
    dev.define_context(4).unwrap();
    dev.power_off();
    assert!(host.is_shut_down());
    assert_eq!(host.live_contexts(), 0);
    assert_eq!(host.current_context(), None);
}

#[test]
fn dropping_the_device_shuts_down() {
    let (dev, host) = soft_device();
    drop(dev);
    assert!(host.is_shut_down());
}

#[test]
fn surfaces_are_defined_and_destroyed() {
    let (mut dev, _host) = soft_device();
    let desc = SurfaceDesc::texture_2d(SurfaceFormat::X8R8G8B8, 16, 8);

    assert_eq!(dev.define_surface_status(5, &desc), CommandStatus::Ok);
    assert_eq!(dev.surface(5).map(|s| s.format), Some(SurfaceFormat::X8R8G8B8));

    // Redefinition replaces the surface in place.
    dev.define_surface(5, &SurfaceDesc::texture_2d(SurfaceFormat::R5G6B5, 2, 2))
        .unwrap();
    assert_eq!(dev.surface(5).map(|s| s.format), Some(SurfaceFormat::R5G6B5));

    assert_eq!(dev.destroy_surface_status(5), CommandStatus::Ok);
    assert!(matches!(dev.destroy_surface(5), Err(CommandError::InvalidSurface(5))));
    assert_eq!(dev.destroy_surface_status(5), CommandStatus::InvalidParameter);

    let nv12 = SurfaceDesc::texture_2d(SurfaceFormat::Nv12, 16, 16);
    assert_eq!(dev.define_surface_status(6, &nv12), CommandStatus::NotSupported);
    assert!(dev.surface(6).is_none());
}

#[test]
fn shaders_flow_through_the_bridge() {
    let bridge = RecordingShaderBridge::new();
    let log = bridge.log();
    let (mut dev, _host) = soft_device_with(SoftConfig::default(), Box::new(bridge));
    dev.define_context(2).unwrap();

    dev.define_shader(2, 10, ShaderType::Vs.as_u32(), &words(&VS_2_0)).unwrap();
    dev.define_shader(2, 10, ShaderType::Ps.as_u32(), &words(&PS_3_0)).unwrap();
    dev.set_shader(2, ShaderType::Vs.as_u32(), 10).unwrap();
    dev.set_shader_constants(2, 4, ShaderType::Vs.as_u32(), ShaderConstType::Float.as_u32(), &[[1, 2, 3, 4]])
        .unwrap();
    dev.set_shader(2, ShaderType::Vs.as_u32(), SVGA3D_INVALID_ID).unwrap();
    dev.destroy_shader(2, 10, ShaderType::Ps.as_u32()).unwrap();

    let calls = log.borrow().clone();
    assert_eq!(
        calls,
        vec![
            ShaderCall::Create {
                cid: 2,
                version: ShaderVersion {
                    ty: ShaderType::Vs,
                    major: 2,
                    minor: 0
                },
                tokens: 2,
                handle: 1,
            },
            ShaderCall::Create {
                cid: 2,
                version: ShaderVersion {
                    ty: ShaderType::Ps,
                    major: 3,
                    minor: 0
                },
                tokens: 2,
                handle: 2,
            },
            ShaderCall::Bind {
                cid: 2,
                ty: ShaderType::Vs,
                handle: Some(1)
            },
            ShaderCall::SetConstants {
                cid: 2,
                ty: ShaderType::Vs,
                const_type: ShaderConstType::Float,
                start: 4,
                values: vec![[1, 2, 3, 4]],
            },
            ShaderCall::Bind {
                cid: 2,
                ty: ShaderType::Vs,
                handle: None
            },
            ShaderCall::Destroy {
                cid: 2,
                ty: ShaderType::Ps,
                handle: 2
            },
        ]
    );
}

#[test]
fn redefining_a_shader_destroys_the_old_program() {
    let bridge = RecordingShaderBridge::new();
    let log = bridge.log();
    let (mut dev, _host) = soft_device_with(SoftConfig::default(), Box::new(bridge));
    dev.define_context(1).unwrap();

    dev.define_shader(1, 3, ShaderType::Vs.as_u32(), &words(&VS_2_0)).unwrap();
    dev.define_shader(1, 3, ShaderType::Vs.as_u32(), &words(&VS_2_0)).unwrap();

    let calls = log.borrow();
    assert_eq!(
        calls[1],
        ShaderCall::Destroy {
            cid: 1,
            ty: ShaderType::Vs,
            handle: 1
        }
    );
    assert!(matches!(calls[2], ShaderCall::Create { handle: 2, .. }));
    assert_eq!(dev.context(1).unwrap().shaders.len(), 1);
}

#[test]
fn destroying_a_context_releases_its_shaders() {
    let bridge = RecordingShaderBridge::new();
    let log = bridge.log();
    let (mut dev, _host) = soft_device_with(SoftConfig::default(), Box::new(bridge));
    dev.define_context(9).unwrap();
    dev.define_shader(9, 1, ShaderType::Vs.as_u32(), &words(&VS_2_0)).unwrap();
    dev.set_shader(9, ShaderType::Vs.as_u32(), 1).unwrap();
    log.borrow_mut().clear();

    dev.destroy_context(9).unwrap();

    assert_eq!(
        *log.borrow(),
        vec![
            ShaderCall::Bind {
                cid: 9,
                ty: ShaderType::Vs,
                handle: None
            },
            ShaderCall::Destroy {
                cid: 9,
                ty: ShaderType::Vs,
                handle: 1
            },
            ShaderCall::DestroyContext { cid: 9 },
        ]
    );
}

#[test]
fn shader_commands_are_validated() {
    let mut bridge = RecordingShaderBridge::new();
    bridge.fail_create = true;
    let log = bridge.log();
    let (mut dev, _host) = soft_device_with(SoftConfig::default(), Box::new(bridge));
    dev.define_context(1).unwrap();
    let vs = ShaderType::Vs.as_u32();

    assert!(matches!(
        dev.define_shader(1, 1, vs, &[0xAB, 0xCD]),
        Err(CommandError::Malformed(_))
    ));
    // A pixel version token under a vertex shader type.
    assert!(matches!(
        dev.define_shader(1, 1, vs, &words(&PS_3_0)),
        Err(CommandError::Malformed(_))
    ));
    assert!(matches!(
        dev.define_shader(1, 1, ShaderType::Invalid.as_u32(), &words(&VS_2_0)),
        Err(CommandError::UnknownEnum { .. })
    ));

    let refused = dev.define_shader(1, 1, vs, &words(&VS_2_0)).unwrap_err();
    assert!(matches!(refused, CommandError::ShaderBridge(_)));
    assert_eq!(refused.status(), CommandStatus::HostError);
    assert!(dev.context(1).unwrap().shaders.is_empty());

    assert!(matches!(
        dev.set_shader(1, vs, 1),
        Err(CommandError::InvalidShader { cid: 1, shid: 1, .. })
    ));
    assert!(matches!(
        dev.destroy_shader(1, 1, vs),
        Err(CommandError::InvalidShader { cid: 1, shid: 1, .. })
    ));
    assert!(matches!(
        dev.define_shader(4, 1, vs, &words(&VS_2_0)),
        Err(CommandError::InvalidContext(4))
    ));

    let float = ShaderConstType::Float.as_u32();
    assert!(matches!(
        dev.set_shader_constants(1, 0, vs, float, &[]),
        Err(CommandError::IndexOutOfRange { .. })
    ));
    assert!(matches!(
        dev.set_shader_constants(1, 8191, vs, float, &[[0; 4], [0; 4]]),
        Err(CommandError::IndexOutOfRange { .. })
    ));
    assert!(matches!(
        dev.set_shader_constants(1, 0, vs, 9, &[[0; 4]]),
        Err(CommandError::UnknownEnum { .. })
    ));
    dev.set_shader_constants(1, 8191, vs, float, &[[0; 4]]).unwrap();

    assert!(log.borrow().iter().all(|c| !matches!(c, ShaderCall::Create { .. })));
}

#[test]
fn mipmaps_are_generated_on_the_host() {
    let (mut dev, host) = soft_device();
    dev.define_surface(1, &SurfaceDesc::texture_2d(SurfaceFormat::A8R8G8B8, 8, 8))
        .unwrap();

    dev.generate_mipmaps(1, TextureFilter::Linear.as_u32()).unwrap();
    dev.generate_mipmaps(1, TextureFilter::Nearest.as_u32()).unwrap();

    let Some(HostObject::Texture { name, .. }) = dev.surface(1).unwrap().object() else {
        panic!("surface has no texture");
    };
    let texture = host.texture(shared_handle(&dev), name).unwrap();
    assert_eq!(texture.mipmaps_generated, 2);

    assert!(matches!(
        dev.generate_mipmaps(1, 99),
        Err(CommandError::UnknownEnum { .. })
    ));
    assert!(matches!(dev.generate_mipmaps(2, 1), Err(CommandError::InvalidSurface(2))));

    dev.define_surface(2, &SurfaceDesc::texture_2d(SurfaceFormat::Dxt1, 8, 8))
        .unwrap();
    assert!(matches!(
        dev.generate_mipmaps(2, TextureFilter::Linear.as_u32()),
        Err(CommandError::Unsupported(_))
    ));
}
