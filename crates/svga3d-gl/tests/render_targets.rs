mod common;

use common::{guest, guest_state, image, shared_handle, soft_device, whole};
use pretty_assertions::assert_eq;
use svga3d_gl::gl::consts as gl;
use svga3d_gl::soft::Attachment;
use svga3d_gl::{CommandError, CommandStatus, HostObject, SurfaceDesc, VecGuestMemory};
use svga3d_protocol::state::{ClearFlags, RenderStateId, RenderTargetType, TransferType};
use svga3d_protocol::{Rect, RenderState, Size3, SurfaceFlags, SurfaceFormat, SVGA3D_INVALID_ID};

const CID: u32 = 1;

fn color0() -> u32 {
    RenderTargetType::Color0.as_u32()
}

fn pixel(data: &[u8], width: u32, x: u32, y: u32) -> u32 {
    let at = ((y * width + x) * 4) as usize;
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

#[test]
fn clear_reaches_the_guest_through_readback_and_dma() {
    let (mut dev, _host) = soft_device();
    dev.define_context(CID).unwrap();
    dev.define_surface(5, &SurfaceDesc::texture_2d(SurfaceFormat::A8R8G8B8, 64, 64))
        .unwrap();
    dev.set_render_target(CID, color0(), image(5)).unwrap();
    dev.clear(CID, ClearFlags::COLOR.bits(), 0xFF00_00FF, 1.0, 0, &[])
        .unwrap();

    dev.read_back_surface(5).unwrap();
    let data = dev.surface_level_data(image(5)).unwrap();
    assert_eq!(data.len(), 64 * 64 * 4);
    assert!(data
        .chunks_exact(4)
        .all(|px| u32::from_le_bytes([px[0], px[1], px[2], px[3]]) == 0xFF00_00FF));

    let memory = VecGuestMemory::new();
    memory.define_region(3, 64 * 64 * 4);
    dev.surface_dma(
        &memory,
        guest(3, 0, 64 * 4),
        image(5),
        TransferType::ReadHostVram.as_u32(),
        &[whole(64, 64)],
    )
    .unwrap();
    let region = memory.region(3).unwrap();
    assert_eq!(pixel(&region, 64, 0, 0), 0xFF00_00FF);
    assert_eq!(pixel(&region, 64, 63, 63), 0xFF00_00FF);
}

#[test]
fn clear_rects_only_touch_their_area() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    dev.define_surface(5, &SurfaceDesc::texture_2d(SurfaceFormat::A8R8G8B8, 64, 64))
        .unwrap();
    dev.set_render_target(CID, color0(), image(5)).unwrap();
    dev.clear(CID, ClearFlags::COLOR.bits(), 0xFF00_0000, 1.0, 0, &[])
        .unwrap();
    dev.clear(
        CID,
        ClearFlags::COLOR.bits(),
        0xFF00_FF00,
        1.0,
        0,
        &[Rect::new(8, 8, 16, 16), Rect::new(40, 40, 4, 4)],
    )
    .unwrap();

    dev.read_back_surface(5).unwrap();
    let data = dev.surface_level_data(image(5)).unwrap();
    assert_eq!(pixel(data, 64, 10, 10), 0xFF00_FF00);
    assert_eq!(pixel(data, 64, 23, 23), 0xFF00_FF00);
    assert_eq!(pixel(data, 64, 42, 41), 0xFF00_FF00);
    assert_eq!(pixel(data, 64, 0, 0), 0xFF00_0000);
    assert_eq!(pixel(data, 64, 24, 24), 0xFF00_0000);
    assert_eq!(pixel(data, 64, 30, 30), 0xFF00_0000);

    // The guest never enabled scissoring, so the clear leaves it off.
    assert!(!guest_state(&dev, &host, CID).is_enabled(gl::SCISSOR_TEST));
}

#[test]
fn clear_ignores_and_restores_guest_scissor_and_masks() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    dev.define_surface(5, &SurfaceDesc::texture_2d(SurfaceFormat::A8R8G8B8, 16, 16))
        .unwrap();
    dev.set_render_target(CID, color0(), image(5)).unwrap();
    dev.set_scissor_rect(CID, Rect::new(0, 0, 4, 4)).unwrap();
    dev.set_render_states(
        CID,
        &[
            RenderState::new(RenderStateId::ScissorTestEnable, 1),
            RenderState::new(RenderStateId::ColorWriteEnable, 0),
            RenderState::new(RenderStateId::ZWriteEnable, 0),
        ],
    )
    .unwrap();

    dev.clear(CID, ClearFlags::COLOR.bits(), 0xFFFF_FFFF, 1.0, 0, &[])
        .unwrap();

    {
        let ctx = guest_state(&dev, &host, CID);
        assert!(ctx.is_enabled(gl::SCISSOR_TEST));
        assert_eq!(ctx.scissor, [0, 0, 4, 4]);
        assert_eq!(ctx.color_masks[0], [false; 4]);
        assert!(!ctx.depth_mask);
    }

    dev.read_back_surface(5).unwrap();
    let data = dev.surface_level_data(image(5)).unwrap();
    assert_eq!(pixel(data, 16, 15, 15), 0xFFFF_FFFF);
}

#[test]
fn render_target_backing_is_created_once() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    dev.define_surface(5, &SurfaceDesc::texture_2d(SurfaceFormat::X8R8G8B8, 32, 32))
        .unwrap();
    assert!(!dev.surface(5).unwrap().is_backed());
    assert_eq!(dev.context(CID).unwrap().fbo, 0);

    let before = host.texture_count(shared_handle(&dev));
    dev.set_render_target(CID, color0(), image(5)).unwrap();
    let fbo = dev.context(CID).unwrap().fbo;
    let object = dev.surface(5).unwrap().object();
    assert_ne!(fbo, 0);

    dev.set_render_target(CID, color0(), image(5)).unwrap();
    assert_eq!(dev.context(CID).unwrap().fbo, fbo);
    assert_eq!(dev.surface(5).unwrap().object(), object);
    assert_eq!(host.texture_count(shared_handle(&dev)), before + 1);

    let Some(HostObject::Texture { name, .. }) = object else {
        panic!("colour target backed by {object:?}");
    };
    let ctx = guest_state(&dev, &host, CID);
    let fb = &ctx.framebuffers[&fbo];
    assert_eq!(
        fb.attachments.get(&gl::COLOR_ATTACHMENT0),
        Some(&Attachment::Texture {
            name,
            image_target: gl::TEXTURE_2D,
            level: 0,
            layer: 0,
        })
    );
    assert_eq!(fb.draw_buffers, vec![gl::COLOR_ATTACHMENT0]);
}

#[test]
fn mip_level_targets_attach_that_level() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    let desc = SurfaceDesc::with_mips(
        SurfaceFormat::A8R8G8B8,
        SurfaceFlags::HINT_RENDERTARGET,
        1,
        Size3::new(32, 32, 1),
        3,
    );
    dev.define_surface(7, &desc).unwrap();
    dev.set_render_target(CID, color0(), svga3d_protocol::SurfaceImageId::new(7, 0, 2))
        .unwrap();

    let fbo = dev.context(CID).unwrap().fbo;
    let ctx = guest_state(&dev, &host, CID);
    match ctx.framebuffers[&fbo].attachments.get(&gl::COLOR_ATTACHMENT0) {
        Some(Attachment::Texture { level, .. }) => assert_eq!(*level, 2),
        other => panic!("unexpected attachment {other:?}"),
    }
}

#[test]
fn depth_stencil_renderbuffer_attaches_both_points() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    let mut desc = SurfaceDesc::texture_2d(SurfaceFormat::ZD24S8, 8, 8);
    desc.flags = SurfaceFlags::HINT_DEPTHSTENCIL.bits();
    dev.define_surface(6, &desc).unwrap();
    dev.set_render_target(CID, RenderTargetType::Depth.as_u32(), image(6))
        .unwrap();

    let Some(HostObject::Renderbuffer { name }) = dev.surface(6).unwrap().object() else {
        panic!("depth/stencil surface should be a renderbuffer");
    };
    {
        let fbo = dev.context(CID).unwrap().fbo;
        let ctx = guest_state(&dev, &host, CID);
        let fb = &ctx.framebuffers[&fbo];
        assert_eq!(fb.attachments.get(&gl::DEPTH_ATTACHMENT), Some(&Attachment::Renderbuffer(name)));
        assert_eq!(fb.attachments.get(&gl::STENCIL_ATTACHMENT), Some(&Attachment::Renderbuffer(name)));
        // No colour target yet.
        assert_eq!(fb.draw_buffers, vec![gl::NONE]);
    }

    dev.clear(
        CID,
        (ClearFlags::DEPTH | ClearFlags::STENCIL).bits(),
        0,
        1.0,
        0x7f,
        &[],
    )
    .unwrap();
    let rb = host.renderbuffer(shared_handle(&dev), name).unwrap();
    assert!(rb
        .bytes
        .chunks_exact(4)
        .all(|t| u32::from_le_bytes([t[0], t[1], t[2], t[3]]) == 0xFFFF_FF7F));
}

#[test]
fn invalid_sid_detaches_the_target() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    dev.define_surface(5, &SurfaceDesc::texture_2d(SurfaceFormat::A8R8G8B8, 8, 8))
        .unwrap();
    dev.set_render_target(CID, color0(), image(5)).unwrap();
    dev.set_render_target(CID, color0(), image(SVGA3D_INVALID_ID))
        .unwrap();

    let fbo = dev.context(CID).unwrap().fbo;
    assert_eq!(dev.context(CID).unwrap().state.render_targets[RenderTargetType::Color0 as usize], None);
    let ctx = guest_state(&dev, &host, CID);
    assert!(!ctx.framebuffers[&fbo].attachments.contains_key(&gl::COLOR_ATTACHMENT0));
}

#[test]
fn rejected_targets_leave_nothing_behind() {
    let (mut dev, _host) = soft_device();
    dev.define_context(CID).unwrap();
    dev.define_surface(5, &SurfaceDesc::texture_2d(SurfaceFormat::Dxt1, 16, 16))
        .unwrap();

    let err = dev.set_render_target(CID, color0(), image(5)).unwrap_err();
    assert!(matches!(err, CommandError::Unsupported(_)), "{err}");
    assert_eq!(err.status(), CommandStatus::NotSupported);
    assert!(!dev.surface(5).unwrap().is_backed());

    assert!(matches!(
        dev.set_render_target(CID, color0(), image(99)),
        Err(CommandError::InvalidSurface(99))
    ));
    assert!(matches!(
        dev.set_render_target(CID, 42, image(5)),
        Err(CommandError::UnknownEnum { .. })
    ));
    assert!(matches!(
        dev.set_render_target(CID, color0(), svga3d_protocol::SurfaceImageId::new(5, 0, 1)),
        Err(CommandError::InvalidImage { sid: 5, face: 0, mipmap: 1 })
    ));
    assert!(matches!(
        dev.set_render_target(9, color0(), image(5)),
        Err(CommandError::InvalidContext(9))
    ));
    assert_eq!(dev.context(CID).unwrap().fbo, 0);
}

#[test]
fn unknown_clear_flags_are_rejected() {
    let (mut dev, _host) = soft_device();
    dev.define_context(CID).unwrap();
    let err = dev.clear(CID, 0x10, 0, 1.0, 0, &[]).unwrap_err();
    assert_eq!(err.status(), CommandStatus::InvalidParameter);
    // Nothing to clear is a no-op.
    dev.clear(CID, 0, 0, 1.0, 0, &[]).unwrap();
}
