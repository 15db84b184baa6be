mod common;

use common::{assert_close, guest_state, scale, soft_device, translation};
use pretty_assertions::assert_eq;
use svga3d_gl::gl::consts as gl;
use svga3d_gl::math::{mul, DEPTH_FIXUP, IDENTITY};
use svga3d_gl::CommandError;
use svga3d_protocol::state::{LightType, TextureStateId, TransformType};
use svga3d_protocol::{LightData, Rect, TextureState, ZRange};

const CID: u32 = 3;

fn point_light(in_world_space: bool, position: [f32; 3]) -> LightData {
    LightData {
        ty: LightType::Point.as_u32(),
        in_world_space: in_world_space as u32,
        diffuse: [1.0, 1.0, 1.0, 1.0],
        position: [position[0], position[1], position[2], 1.0],
        attenuation0: 1.0,
        ..Default::default()
    }
}

#[test]
fn world_space_lights_follow_the_view() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    dev.set_light_data(CID, 0, point_light(true, [1.0, 0.0, 0.0])).unwrap();
    assert_close(&guest_state(&dev, &host, CID).lights[0].position, &[1.0, 0.0, 0.0, 1.0]);

    // Changing VIEW re-specifies the light against the new matrix.
    dev.set_transform(CID, TransformType::View.as_u32(), translation(0.0, 0.0, -5.0))
        .unwrap();
    assert_close(&guest_state(&dev, &host, CID).lights[0].position, &[1.0, 0.0, -5.0, 1.0]);

    // A light set after the view is transformed the same way.
    dev.set_light_data(CID, 1, point_light(true, [0.0, 2.0, 0.0])).unwrap();
    assert_close(&guest_state(&dev, &host, CID).lights[1].position, &[0.0, 2.0, -5.0, 1.0]);
}

#[test]
fn view_space_lights_ignore_the_view() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    dev.set_transform(CID, TransformType::View.as_u32(), translation(0.0, 0.0, -5.0))
        .unwrap();
    dev.set_light_data(CID, 2, point_light(false, [1.0, 0.0, 0.0])).unwrap();
    dev.set_transform(CID, TransformType::World.as_u32(), translation(3.0, 0.0, 0.0))
        .unwrap();

    assert_close(&guest_state(&dev, &host, CID).lights[2].position, &[1.0, 0.0, 0.0, 1.0]);
}

#[test]
fn directional_lights_point_at_the_source() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    dev.set_transform(CID, TransformType::View.as_u32(), translation(0.0, 0.0, -5.0))
        .unwrap();
    let light = LightData {
        ty: LightType::Directional.as_u32(),
        in_world_space: 1,
        direction: [0.0, 0.0, 1.0, 0.0],
        ..Default::default()
    };
    dev.set_light_data(CID, 0, light).unwrap();
    dev.set_light_enabled(CID, 0, true).unwrap();

    let ctx = guest_state(&dev, &host, CID);
    // Directions are unaffected by the translation.
    assert_close(&ctx.lights[0].position, &[0.0, 0.0, -1.0, 0.0]);
    assert_eq!(ctx.lights[0].spot_cutoff, 180.0);
    assert!(ctx.is_enabled(gl::LIGHT0));
}

#[test]
fn modelview_is_world_times_view() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    let world = translation(1.0, 2.0, 3.0);
    let view = mul(&scale(2.0), &translation(0.0, 0.0, -5.0));
    dev.set_transform(CID, TransformType::World.as_u32(), world).unwrap();
    dev.set_transform(CID, TransformType::View.as_u32(), view).unwrap();

    // Lights and planes reload VIEW on the way; the final matrix is still the product.
    dev.set_light_data(CID, 0, point_light(true, [0.0; 3])).unwrap();
    dev.set_clip_plane(CID, 0, [1.0, 0.0, 0.0, 0.0]).unwrap();

    assert_close(&guest_state(&dev, &host, CID).modelview_top(), &mul(&world, &view));
    assert_eq!(
        dev.context(CID).unwrap().state.transforms[TransformType::World as usize],
        Some(world)
    );
}

#[test]
fn clip_planes_are_specified_in_view_space() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    dev.set_transform(CID, TransformType::View.as_u32(), translation(0.0, 0.0, -5.0))
        .unwrap();
    dev.set_transform(CID, TransformType::World.as_u32(), scale(4.0)).unwrap();
    dev.set_clip_plane(CID, 1, [0.0, 0.0, 1.0, 0.0]).unwrap();

    let eye = guest_state(&dev, &host, CID).clip_planes[1];
    assert_eq!(eye, [0.0, 0.0, 1.0, 5.0]);
    assert_eq!(dev.context(CID).unwrap().state.clip_planes[1], Some([0.0, 0.0, 1.0, 0.0]));
}

#[test]
fn projection_gets_the_depth_fixup() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    let p = scale(0.5);
    dev.set_transform(CID, TransformType::Projection.as_u32(), p).unwrap();

    let ctx = guest_state(&dev, &host, CID);
    assert_close(&ctx.projection_top(), &mul(&p, &DEPTH_FIXUP));
    assert_eq!(ctx.matrix_mode, gl::MODELVIEW);
}

#[test]
fn texture_matrices_load_only_while_enabled() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    let m = scale(3.0);
    dev.set_transform(CID, TransformType::Texture0.as_u32(), m).unwrap();
    assert_eq!(guest_state(&dev, &host, CID).texture_matrix_top(0), IDENTITY);

    dev.set_texture_states(CID, &[TextureState::new(0, TextureStateId::TextureTransformFlags, 2)])
        .unwrap();
    assert_eq!(guest_state(&dev, &host, CID).texture_matrix_top(0), m);

    dev.set_texture_states(CID, &[TextureState::new(0, TextureStateId::TextureTransformFlags, 0)])
        .unwrap();
    let ctx = guest_state(&dev, &host, CID);
    assert_eq!(ctx.texture_matrix_top(0), IDENTITY);
    assert_eq!(ctx.active_texture, 0);
}

#[test]
fn viewport_and_depth_range_reach_the_host() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    dev.set_viewport(CID, Rect::new(4, 8, 64, 32)).unwrap();
    dev.set_z_range(CID, ZRange { min: 0.25, max: 1.5 }).unwrap();

    let ctx = guest_state(&dev, &host, CID);
    assert_eq!(ctx.viewport, [4, 8, 64, 32]);
    assert_eq!(ctx.depth_range, (0.25, 1.0));
}

#[test]
fn lights_past_the_host_limit_stay_in_the_shadow() {
    let (mut dev, _host) = soft_device();
    dev.define_context(CID).unwrap();
    dev.set_light_data(CID, 20, point_light(true, [1.0, 1.0, 1.0])).unwrap();
    dev.set_light_enabled(CID, 20, true).unwrap();

    let slot = &dev.context(CID).unwrap().state.lights[20];
    assert!(slot.enabled);
    assert!(slot.data.is_some());
}

#[test]
fn bad_indices_and_types_are_rejected() {
    let (mut dev, _host) = soft_device();
    dev.define_context(CID).unwrap();

    assert!(matches!(
        dev.set_transform(CID, TransformType::Invalid.as_u32(), IDENTITY),
        Err(CommandError::UnknownEnum { .. })
    ));
    assert!(matches!(
        dev.set_transform(CID, 99, IDENTITY),
        Err(CommandError::UnknownEnum { .. })
    ));
    assert!(matches!(
        dev.set_light_data(CID, 32, point_light(true, [0.0; 3])),
        Err(CommandError::IndexOutOfRange { what: "light", .. })
    ));
    assert!(matches!(
        dev.set_light_data(CID, 0, LightData::default()),
        Err(CommandError::UnknownEnum { .. })
    ));
    assert!(matches!(
        dev.set_light_enabled(CID, 40, true),
        Err(CommandError::IndexOutOfRange { .. })
    ));
    assert!(matches!(
        dev.set_clip_plane(CID, 6, [0.0; 4]),
        Err(CommandError::IndexOutOfRange { what: "clip plane", .. })
    ));
    assert!(matches!(
        dev.set_transform(CID + 1, TransformType::World.as_u32(), IDENTITY),
        Err(CommandError::InvalidContext(_))
    ));
    assert!(dev.context(CID).unwrap().state.lights[0].data.is_none());
}
