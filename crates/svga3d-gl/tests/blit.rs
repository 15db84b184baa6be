mod common;

use common::{buffer_surface, image, shared_handle, soft_device, write_level};
use pretty_assertions::assert_eq;
use svga3d_gl::config::MAX_SCREENS;
use svga3d_gl::{CommandError, CommandStatus, HostObject, SurfaceDesc, Svga3dGl};
use svga3d_protocol::state::StretchBltMode;
use svga3d_protocol::{Box3, CopyBox, Rect, SurfaceFlags, SurfaceFormat};

const RED: u32 = 0xFFFF_0000;
const GREEN: u32 = 0xFF00_FF00;
const BLUE: u32 = 0xFF00_00FF;
const WHITE: u32 = 0xFFFF_FFFF;

fn solid(pixels: usize, argb: u32) -> Vec<u8> {
    argb.to_le_bytes().repeat(pixels)
}

fn pixel(data: &[u8], width: u32, x: u32, y: u32) -> u32 {
    let at = ((y * width + x) * 4) as usize;
    u32::from_le_bytes([data[at], data[at + 1], data[at + 2], data[at + 3]])
}

fn argb_surface(dev: &mut Svga3dGl, sid: u32, w: u32, h: u32, pixels: &[u32]) {
    dev.define_surface(sid, &SurfaceDesc::texture_2d(SurfaceFormat::A8R8G8B8, w, h))
        .unwrap();
    let bytes: Vec<u8> = pixels.iter().flat_map(|p| p.to_le_bytes()).collect();
    write_level(dev, image(sid), w, h, &bytes);
}

fn box3(x: u32, y: u32, w: u32, h: u32) -> Box3 {
    Box3 { x, y, z: 0, w, h, d: 1 }
}

#[test]
fn copy_between_textures_goes_through_the_host() {
    let (mut dev, _host) = soft_device();
    argb_surface(&mut dev, 1, 4, 4, &[RED; 16]);
    dev.define_surface(2, &SurfaceDesc::texture_2d(SurfaceFormat::A8R8G8B8, 4, 4))
        .unwrap();

    let b = CopyBox {
        x: 1,
        y: 1,
        z: 0,
        w: 2,
        h: 2,
        d: 1,
        srcx: 0,
        srcy: 0,
        srcz: 0,
    };
    dev.surface_copy(image(1), image(2), &[b]).unwrap();
    assert!(dev.surface(1).unwrap().is_backed());
    assert!(dev.surface(2).unwrap().is_backed());

    dev.read_back_surface(2).unwrap();
    let data = dev.surface_level_data(image(2)).unwrap();
    assert_eq!(pixel(data, 4, 1, 1), RED);
    assert_eq!(pixel(data, 4, 2, 2), RED);
    assert_eq!(pixel(data, 4, 0, 0), 0);
    assert_eq!(pixel(data, 4, 3, 3), 0);
}

#[test]
fn copy_boxes_are_clipped_to_both_images() {
    let (mut dev, _host) = soft_device();
    argb_surface(&mut dev, 1, 2, 2, &[GREEN; 4]);
    dev.define_surface(2, &SurfaceDesc::texture_2d(SurfaceFormat::A8R8G8B8, 4, 4))
        .unwrap();

    dev.surface_copy(image(1), image(2), &[CopyBox::same_origin(0, 0, 0, 100, 100, 1)])
        .unwrap();
    dev.read_back_surface(2).unwrap();
    let data = dev.surface_level_data(image(2)).unwrap();
    assert_eq!(pixel(data, 4, 1, 1), GREEN);
    assert_eq!(pixel(data, 4, 2, 0), 0);

    // Nothing left after clipping is a no-op, even for a surface never backed.
    dev.define_surface(3, &SurfaceDesc::texture_2d(SurfaceFormat::A8R8G8B8, 4, 4))
        .unwrap();
    dev.surface_copy(image(1), image(3), &[CopyBox::same_origin(2, 2, 0, 1, 1, 1)])
        .unwrap();
    assert!(!dev.surface(3).unwrap().is_backed());
}

#[test]
fn compressed_copies_use_the_shadows() {
    let (mut dev, _host) = soft_device();
    for sid in [1, 2] {
        dev.define_surface(sid, &SurfaceDesc::texture_2d(SurfaceFormat::Dxt1, 8, 8))
            .unwrap();
    }
    let blocks: Vec<u8> = (0..32).collect();
    write_level(&mut dev, image(1), 8, 8, &blocks);

    // Top-left block of the source into the top-right block of the destination.
    let b = CopyBox {
        x: 4,
        y: 0,
        z: 0,
        w: 4,
        h: 4,
        d: 1,
        srcx: 0,
        srcy: 0,
        srcz: 0,
    };
    dev.surface_copy(image(1), image(2), &[b]).unwrap();
    let data = dev.surface_level_data(image(2)).unwrap();
    assert_eq!(&data[8..16], &blocks[..8]);
    assert!(data[..8].iter().chain(&data[16..]).all(|b| *b == 0));

    let misaligned = CopyBox { x: 2, ..b };
    assert!(matches!(
        dev.surface_copy(image(1), image(2), &[misaligned]),
        Err(CommandError::InvalidBox { sid: 2 })
    ));
}

#[test]
fn buffer_copies_update_the_host_buffer() {
    let (mut dev, host) = soft_device();
    buffer_surface(&mut dev, 1, SurfaceFlags::HINT_VERTEXBUFFER, &[1, 2, 3, 4, 5, 6, 7, 8]);
    buffer_surface(&mut dev, 2, SurfaceFlags::HINT_VERTEXBUFFER, &[0; 8]);

    let b = CopyBox {
        x: 4,
        y: 0,
        z: 0,
        w: 4,
        h: 1,
        d: 1,
        srcx: 0,
        srcy: 0,
        srcz: 0,
    };
    dev.surface_copy(image(1), image(2), &[b]).unwrap();
    let Some(HostObject::Buffer { name }) = dev.surface(2).unwrap().object() else {
        panic!("buffer surface should be backed by a buffer");
    };
    assert_eq!(host.buffer(shared_handle(&dev), name).unwrap(), vec![0, 0, 0, 0, 1, 2, 3, 4]);
}

#[test]
fn incompatible_copies_are_rejected() {
    let (mut dev, _host) = soft_device();
    dev.define_surface(1, &SurfaceDesc::texture_2d(SurfaceFormat::Dxt1, 8, 8))
        .unwrap();
    dev.define_surface(2, &SurfaceDesc::texture_2d(SurfaceFormat::A8R8G8B8, 8, 8))
        .unwrap();
    let err = dev
        .surface_copy(image(1), image(2), &[CopyBox::same_origin(0, 0, 0, 4, 4, 1)])
        .unwrap_err();
    assert_eq!(err.status(), CommandStatus::NotSupported);

    assert!(matches!(
        dev.surface_copy(image(1), image(9), &[CopyBox::same_origin(0, 0, 0, 4, 4, 1)]),
        Err(CommandError::InvalidSurface(9))
    ));
    assert!(matches!(
        dev.surface_copy(svga3d_protocol::SurfaceImageId::new(1, 0, 3), image(2), &[]),
        Err(CommandError::InvalidImage { sid: 1, .. })
    ));
}

#[test]
fn stretch_blit_scales_with_point_sampling() {
    let (mut dev, _host) = soft_device();
    argb_surface(&mut dev, 1, 2, 2, &[RED, GREEN, BLUE, WHITE]);
    dev.define_surface(2, &SurfaceDesc::texture_2d(SurfaceFormat::A8R8G8B8, 4, 4))
        .unwrap();

    dev.surface_stretch_blt(
        image(1),
        image(2),
        box3(0, 0, 2, 2),
        box3(0, 0, 4, 4),
        StretchBltMode::Point.as_u32(),
    )
    .unwrap();
    dev.read_back_surface(2).unwrap();
    let data = dev.surface_level_data(image(2)).unwrap();
    assert_eq!(pixel(data, 4, 0, 0), RED);
    assert_eq!(pixel(data, 4, 1, 1), RED);
    assert_eq!(pixel(data, 4, 3, 0), GREEN);
    assert_eq!(pixel(data, 4, 0, 3), BLUE);
    assert_eq!(pixel(data, 4, 2, 2), WHITE);

    assert!(matches!(
        dev.surface_stretch_blt(image(1), image(2), box3(0, 0, 2, 2), box3(0, 0, 4, 4), 7),
        Err(CommandError::UnknownEnum { .. })
    ));
}

#[test]
fn unscaled_stretch_of_compressed_data_copies_shadows() {
    let (mut dev, _host) = soft_device();
    for sid in [1, 2] {
        dev.define_surface(sid, &SurfaceDesc::texture_2d(SurfaceFormat::Dxt5, 8, 8))
            .unwrap();
    }
    let blocks: Vec<u8> = (0..64).collect();
    write_level(&mut dev, image(1), 8, 8, &blocks);

    dev.surface_stretch_blt(
        image(1),
        image(2),
        box3(0, 0, 8, 8),
        box3(0, 0, 8, 8),
        StretchBltMode::Linear.as_u32(),
    )
    .unwrap();
    assert_eq!(dev.surface_level_data(image(2)).unwrap(), blocks.as_slice());

    let err = dev
        .surface_stretch_blt(
            image(1),
            image(2),
            box3(0, 0, 8, 8),
            box3(0, 0, 4, 4),
            StretchBltMode::Linear.as_u32(),
        )
        .unwrap_err();
    assert!(matches!(err, CommandError::Unsupported(_)), "{err}");
}

#[test]
fn screens_show_blitted_surfaces() {
    let (mut dev, _host) = soft_device();
    dev.define_screen(0, 8, 8).unwrap();
    assert_eq!(dev.screens().len(), 1);
    assert_eq!(dev.screens().get(0).map(|s| (s.width, s.height)), Some((8, 8)));
    assert!(dev.screen_contents(0).unwrap().iter().all(|b| *b == 0));

    argb_surface(&mut dev, 1, 4, 4, &[BLUE; 16]);
    dev.blit_surface_to_screen(0, Rect::new(4, 4, 4, 4), image(1), Rect::new(0, 0, 4, 4))
        .unwrap();
    let screen = dev.screen_contents(0).unwrap();
    assert_eq!(screen.len(), 8 * 8 * 4);
    assert_eq!(pixel(&screen, 8, 4, 4), BLUE);
    assert_eq!(pixel(&screen, 8, 7, 7), BLUE);
    assert_eq!(pixel(&screen, 8, 3, 3), 0);

    // A smaller source rect is stretched over the destination.
    argb_surface(&mut dev, 2, 1, 1, &[GREEN]);
    dev.blit_surface_to_screen(0, Rect::new(0, 0, 2, 2), image(2), Rect::new(0, 0, 1, 1))
        .unwrap();
    let screen = dev.screen_contents(0).unwrap();
    assert_eq!(pixel(&screen, 8, 1, 1), GREEN);
    assert_eq!(pixel(&screen, 8, 2, 2), 0);
}

#[test]
fn present_targets_screen_zero() {
    let (mut dev, _host) = soft_device();
    dev.define_screen(0, 4, 4).unwrap();
    argb_surface(&mut dev, 1, 4, 4, &[RED; 16]);

    dev.present(1, &[Rect::new(0, 0, 2, 2)]).unwrap();
    let screen = dev.screen_contents(0).unwrap();
    assert_eq!(pixel(&screen, 4, 1, 1), RED);
    assert_eq!(pixel(&screen, 4, 3, 3), 0);

    // No rects presents the whole surface.
    dev.present(1, &[]).unwrap();
    let screen = dev.screen_contents(0).unwrap();
    assert_eq!(screen, solid(16, RED));

    assert!(matches!(dev.present(7, &[]), Err(CommandError::InvalidSurface(7))));
}

#[test]
fn screen_lifecycle_and_errors() {
    let (mut dev, _host) = soft_device();
    assert!(matches!(
        dev.blit_surface_to_screen(0, Rect::new(0, 0, 1, 1), image(1), Rect::new(0, 0, 1, 1)),
        Err(CommandError::InvalidScreen(0))
    ));
    assert!(matches!(dev.define_screen(MAX_SCREENS, 4, 4), Err(CommandError::InvalidScreen(_))));
    assert!(matches!(dev.define_screen(1, 0, 4), Err(CommandError::Malformed(_))));
    assert!(matches!(dev.define_screen(1, 1 << 20, 4), Err(CommandError::Unsupported(_))));

    dev.define_screen(1, 4, 4).unwrap();
    // Redefining resizes.
    dev.define_screen(1, 2, 2).unwrap();
    assert_eq!(dev.screen_contents(1).unwrap().len(), 2 * 2 * 4);

    let mut depth = SurfaceDesc::texture_2d(SurfaceFormat::ZD24S8, 2, 2);
    depth.flags = SurfaceFlags::HINT_DEPTHSTENCIL.bits();
    dev.define_surface(3, &depth).unwrap();
    assert!(matches!(
        dev.blit_surface_to_screen(1, Rect::new(0, 0, 2, 2), image(3), Rect::new(0, 0, 2, 2)),
        Err(CommandError::Unsupported(_))
    ));

    dev.destroy_screen(1).unwrap();
    assert!(dev.screens().is_empty());
    assert!(matches!(dev.destroy_screen(1), Err(CommandError::InvalidScreen(1))));
    assert!(matches!(dev.screen_contents(1), Err(CommandError::InvalidScreen(1))));
}
