mod common;

use common::{buffer_surface, floats, guest, image, shared_handle, soft_device, whole, write_level};
use pretty_assertions::assert_eq;
use svga3d_gl::gl::consts as gl;
use svga3d_gl::{CommandError, CommandStatus, GuestMemory, HostObject, SurfaceDesc, Svga3dGl, VecGuestMemory};
use svga3d_protocol::draw::{DeclType, DeclUsage, PrimitiveType};
use svga3d_protocol::state::{TextureStateId, TransferType};
use svga3d_protocol::{
    ArrayDesc, CopyBox, PrimitiveRange, SurfaceFlags, SurfaceFormat, SurfaceImageId, TextureState, VertexArrayIdentity,
    VertexDecl, SVGA3D_INVALID_ID,
};

const CID: u32 = 1;

fn read() -> u32 {
    TransferType::ReadHostVram.as_u32()
}

fn write() -> u32 {
    TransferType::WriteHostVram.as_u32()
}

/// Bytes 0, 1, 2, ... wrapping at 256.
fn ramp(len: usize) -> Vec<u8> {
    (0..len).map(|i| i as u8).collect()
}

fn bind_texture(dev: &mut Svga3dGl, sid: u32) {
    dev.set_texture_states(CID, &[TextureState::new(0, TextureStateId::BindTexture, sid)])
        .unwrap();
}

fn texture_name(dev: &Svga3dGl, sid: u32) -> u32 {
    match dev.surface(sid).unwrap().object() {
        Some(HostObject::Texture { name, .. }) => name,
        other => panic!("surface {sid} backed by {other:?}"),
    }
}

fn read_level(dev: &mut Svga3dGl, img: SurfaceImageId, w: u32, h: u32, len: usize) -> Vec<u8> {
    let memory = VecGuestMemory::new();
    memory.define_region(9, len);
    dev.surface_dma(&memory, guest(9, 0, 0), img, read(), &[whole(w, h)])
        .unwrap();
    let bytes = memory.region(9).unwrap().to_vec();
    bytes
}

#[test]
fn uncompressed_texture_round_trip() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    dev.define_surface(4, &SurfaceDesc::texture_2d(SurfaceFormat::A8R8G8B8, 8, 8))
        .unwrap();
    let data = ramp(8 * 8 * 4);

    // Before the host texture exists the write only lands in the shadow.
    write_level(&mut dev, image(4), 8, 8, &data);
    assert!(!dev.surface(4).unwrap().is_backed());
    assert!(dev.surface(4).unwrap().level(0, 0).unwrap().dirty);

    bind_texture(&mut dev, 4);
    let name = texture_name(&dev, 4);
    let img = host.texture_image(shared_handle(&dev), name, gl::TEXTURE_2D, 0).unwrap();
    assert_eq!((img.width, img.height), (8, 8));
    assert_eq!(img.bytes, data);
    assert!(!dev.surface(4).unwrap().level(0, 0).unwrap().dirty);

    // Writes to a backed texture go straight to the host.
    let update: Vec<u8> = data.iter().map(|b| b.wrapping_add(1)).collect();
    write_level(&mut dev, image(4), 8, 8, &update);
    let img = host.texture_image(shared_handle(&dev), name, gl::TEXTURE_2D, 0).unwrap();
    assert_eq!(img.bytes, update);

    assert_eq!(read_level(&mut dev, image(4), 8, 8, update.len()), update);
}

#[test]
fn guest_pitch_and_offset_are_honoured() {
    let (mut dev, _host) = soft_device();
    dev.define_surface(4, &SurfaceDesc::texture_2d(SurfaceFormat::A8R8G8B8, 4, 2))
        .unwrap();
    // Two guest rows of 4 texels, 24 bytes apart, starting 8 bytes into the region.
    let memory = VecGuestMemory::new();
    memory.define_region(2, 8 + 24 + 16);
    memory.write(2, 8, &[0x11; 16]).unwrap();
    memory.write(2, 8 + 24, &[0x22; 16]).unwrap();

    dev.surface_dma(&memory, guest(2, 8, 24), image(4), write(), &[whole(4, 2)])
        .unwrap();
    let level = dev.surface_level_data(image(4)).unwrap();
    assert_eq!(&level[..16], &[0x11; 16]);
    assert_eq!(&level[16..], &[0x22; 16]);

    // A sub-box reads back into its own guest origin.
    let out = VecGuestMemory::new();
    out.define_region(3, 64);
    let b = CopyBox {
        x: 2,
        y: 1,
        z: 0,
        w: 2,
        h: 1,
        d: 1,
        srcx: 1,
        srcy: 0,
        srcz: 0,
    };
    dev.surface_dma(&out, guest(3, 0, 32), image(4), read(), &[b]).unwrap();
    let region = out.region(3).unwrap();
    assert_eq!(&region[..4], &[0; 4]);
    assert_eq!(&region[4..12], &[0x22; 8]);
    assert!(region[12..].iter().all(|b| *b == 0));
}

#[test]
fn boxes_are_clipped_to_the_level() {
    let (mut dev, _host) = soft_device();
    dev.define_surface(4, &SurfaceDesc::texture_2d(SurfaceFormat::Luminance8, 4, 4))
        .unwrap();
    let memory = VecGuestMemory::new();
    memory.define_region(1, 64);
    memory.write(1, 0, &[0xAB; 64]).unwrap();

    let oversized = CopyBox::same_origin(2, 2, 0, 100, 100, 5);
    dev.surface_dma(&memory, guest(1, 0, 4), image(4), write(), &[oversized])
        .unwrap();
    let level = dev.surface_level_data(image(4)).unwrap();
    let expected: Vec<u8> = (0..16)
        .map(|i| if i % 4 >= 2 && i / 4 >= 2 { 0xAB } else { 0 })
        .collect();
    assert_eq!(level, expected.as_slice());
}

#[test]
fn compressed_surfaces_move_whole_blocks() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    dev.define_surface(6, &SurfaceDesc::texture_2d(SurfaceFormat::Dxt1, 8, 8))
        .unwrap();
    {
        let level = dev.surface(6).unwrap().level(0, 0).unwrap();
        // 2 x 2 blocks of 8 bytes.
        assert_eq!((level.pitch, level.rows, level.data.len()), (16, 2, 32));
    }

    let blocks = ramp(32);
    write_level(&mut dev, image(6), 8, 8, &blocks);
    bind_texture(&mut dev, 6);
    let name = texture_name(&dev, 6);
    let img = host.texture_image(shared_handle(&dev), name, gl::TEXTURE_2D, 0).unwrap();
    assert!(img.compressed);
    assert_eq!(img.internal_format, gl::COMPRESSED_RGBA_S3TC_DXT1_EXT);
    assert_eq!(img.bytes, blocks);

    // Patch the second block row only; the whole level is re-uploaded.
    let memory = VecGuestMemory::new();
    memory.define_region(1, 32);
    memory.write(1, 16, &[0xEE; 16]).unwrap();
    dev.surface_dma(&memory, guest(1, 0, 0), image(6), write(), &[CopyBox::same_origin(0, 4, 0, 8, 4, 1)])
        .unwrap();
    let img = host.texture_image(shared_handle(&dev), name, gl::TEXTURE_2D, 0).unwrap();
    assert_eq!(&img.bytes[..16], &blocks[..16]);
    assert_eq!(&img.bytes[16..], &[0xEE; 16]);

    // The shadow stays authoritative, so reads don't touch the host.
    assert_eq!(read_level(&mut dev, image(6), 8, 8, 32), img.bytes);

    let misaligned = CopyBox::same_origin(2, 0, 0, 4, 4, 1);
    assert!(matches!(
        dev.surface_dma(&memory, guest(1, 0, 0), image(6), write(), &[misaligned]),
        Err(CommandError::InvalidBox { sid: 6 })
    ));
}

#[test]
fn packed_yuv_is_converted_for_sampling() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    dev.define_surface(8, &SurfaceDesc::texture_2d(SurfaceFormat::Uyvy, 2, 1))
        .unwrap();
    // U, Y0, V, Y1 of a white macropixel.
    write_level(&mut dev, image(8), 2, 1, &[128, 235, 128, 235]);
    bind_texture(&mut dev, 8);

    let surface = dev.surface(8).unwrap();
    assert!(surface.raw_texture().is_some());
    let name = texture_name(&dev, 8);
    let img = host.texture_image(shared_handle(&dev), name, gl::TEXTURE_2D, 0).unwrap();
    assert_eq!(img.bytes, vec![0xFF; 8]);
    assert_eq!(read_level(&mut dev, image(8), 2, 1, 4), vec![128, 235, 128, 235]);
}

#[test]
fn buffer_surfaces_update_the_host_buffer() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    let triangle = floats(&[0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0]);
    buffer_surface(&mut dev, 10, SurfaceFlags::HINT_VERTEXBUFFER, &triangle);
    assert!(!dev.surface(10).unwrap().is_backed());

    // A draw creates the host buffer from the shadow.
    let decl = VertexDecl {
        identity: VertexArrayIdentity {
            ty: DeclType::Float3.as_u32(),
            usage: DeclUsage::Position.as_u32(),
            ..Default::default()
        },
        array: ArrayDesc {
            surface_id: 10,
            offset: 0,
            stride: 12,
        },
        ..Default::default()
    };
    let range = PrimitiveRange {
        prim_type: PrimitiveType::TriangleList.as_u32(),
        primitive_count: 1,
        index_array: ArrayDesc {
            surface_id: SVGA3D_INVALID_ID,
            ..Default::default()
        },
        ..Default::default()
    };
    dev.draw_primitives(CID, &[decl], &[range], &[]).unwrap();
    let Some(HostObject::Buffer { name }) = dev.surface(10).unwrap().object() else {
        panic!("vertex buffer surface should be a buffer");
    };
    assert_eq!(host.buffer(shared_handle(&dev), name).unwrap(), triangle);

    // Patch the second vertex's x.
    let memory = VecGuestMemory::new();
    memory.define_region(1, 16);
    memory.write(1, 12, &2.0f32.to_le_bytes()).unwrap();
    dev.surface_dma(&memory, guest(1, 0, 0), image(10), write(), &[CopyBox::same_origin(12, 0, 0, 4, 1, 1)])
        .unwrap();
    let mut expected = triangle.clone();
    expected[12..16].copy_from_slice(&2.0f32.to_le_bytes());
    assert_eq!(host.buffer(shared_handle(&dev), name).unwrap(), expected);

    // Reading the patched box back returns what was written.
    let readback = VecGuestMemory::new();
    readback.define_region(2, 16);
    dev.surface_dma(&readback, guest(2, 0, 0), image(10), read(), &[CopyBox::same_origin(12, 0, 0, 4, 1, 1)])
        .unwrap();
    assert_eq!(&readback.region(2).unwrap()[12..16], &2.0f32.to_le_bytes());
    assert_eq!(read_level(&mut dev, image(10), expected.len() as u32, 1, expected.len()), expected);
}

#[test]
fn faulting_guest_write_leaves_the_level_untouched() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    dev.define_surface(6, &SurfaceDesc::texture_2d(SurfaceFormat::A8R8G8B8, 8, 8))
        .unwrap();
    let original = ramp(8 * 8 * 4);
    write_level(&mut dev, image(6), 8, 8, &original);
    bind_texture(&mut dev, 6);
    let name = texture_name(&dev, 6);

    // The region holds only the first four of the eight rows.
    let memory = VecGuestMemory::new();
    memory.define_region(3, 4 * 8 * 4);
    memory.write(3, 0, &[0xAB; 4 * 8 * 4]).unwrap();
    let result = dev.surface_dma(&memory, guest(3, 0, 0), image(6), write(), &[whole(8, 8)]);
    assert!(matches!(result, Err(CommandError::GuestMemory(_))));

    assert_eq!(dev.surface(6).unwrap().level(0, 0).unwrap().data, original);
    let img = host.texture_image(shared_handle(&dev), name, gl::TEXTURE_2D, 0).unwrap();
    assert_eq!(img.bytes, original);
    assert_eq!(read_level(&mut dev, image(6), 8, 8, original.len()), original);
}

#[test]
fn depth_surfaces_only_transfer_before_backing() {
    let (mut dev, _host) = soft_device();
    dev.define_context(CID).unwrap();
    let memory = VecGuestMemory::new();
    memory.define_region(1, 256);

    let mut rb = SurfaceDesc::texture_2d(SurfaceFormat::ZD24S8, 4, 4);
    rb.flags = SurfaceFlags::HINT_DEPTHSTENCIL.bits();
    dev.define_surface(20, &rb).unwrap();
    assert_eq!(
        dev.surface_dma_status(&memory, guest(1, 0, 0), image(20), write(), &[whole(4, 4)]),
        CommandStatus::NotSupported
    );

    let mut tex = SurfaceDesc::texture_2d(SurfaceFormat::ZD16, 4, 4);
    tex.flags = (SurfaceFlags::HINT_DEPTHSTENCIL | SurfaceFlags::HINT_TEXTURE).bits();
    dev.define_surface(21, &tex).unwrap();
    dev.surface_dma(&memory, guest(1, 0, 0), image(21), write(), &[whole(4, 4)])
        .unwrap();
    bind_texture(&mut dev, 21);
    assert!(matches!(
        dev.surface_dma(&memory, guest(1, 0, 0), image(21), write(), &[whole(4, 4)]),
        Err(CommandError::Unsupported(_))
    ));
}

#[test]
fn bad_transfers_are_rejected() {
    let (mut dev, _host) = soft_device();
    dev.define_surface(4, &SurfaceDesc::texture_2d(SurfaceFormat::A8R8G8B8, 8, 8))
        .unwrap();
    let memory = VecGuestMemory::new();
    memory.define_region(1, 64);

    let err = dev
        .surface_dma(&memory, guest(1, 0, 0), image(4), write(), &[whole(8, 8)])
        .unwrap_err();
    assert!(matches!(err, CommandError::GuestMemory(_)), "{err}");
    assert_eq!(err.status(), CommandStatus::InvalidParameter);
    assert!(matches!(
        dev.surface_dma(&memory, guest(7, 0, 0), image(4), read(), &[whole(1, 1)]),
        Err(CommandError::GuestMemory(_))
    ));
    assert!(matches!(
        dev.surface_dma(&memory, guest(1, 0, 0), image(4), 0, &[whole(1, 1)]),
        Err(CommandError::UnknownEnum { .. })
    ));
    assert!(matches!(
        dev.surface_dma(&memory, guest(1, 0, 0), SurfaceImageId::new(4, 0, 1), write(), &[whole(1, 1)]),
        Err(CommandError::InvalidImage { sid: 4, face: 0, mipmap: 1 })
    ));
    assert!(matches!(
        dev.surface_dma(&memory, guest(1, 0, 0), image(5), write(), &[whole(1, 1)]),
        Err(CommandError::InvalidSurface(5))
    ));
    assert!(matches!(
        dev.surface_dma(&memory, guest(1, 0, 0), image(4), write(), &[CopyBox::same_origin(8, 0, 0, 1, 1, 1)]),
        Err(CommandError::InvalidBox { sid: 4 })
    ));
    // Empty boxes are a no-op.
    dev.surface_dma(&memory, guest(1, 0, 0), image(4), write(), &[CopyBox::same_origin(0, 0, 0, 0, 4, 1)])
        .unwrap();
}

#[test]
fn invalidate_discards_pending_writes() {
    let (mut dev, _host) = soft_device();
    dev.define_surface(4, &SurfaceDesc::texture_2d(SurfaceFormat::A8R8G8B8, 2, 2))
        .unwrap();
    write_level(&mut dev, image(4), 2, 2, &ramp(16));
    assert!(dev.surface(4).unwrap().level(0, 0).unwrap().dirty);
    dev.invalidate_surface(4).unwrap();
    assert!(!dev.surface(4).unwrap().level(0, 0).unwrap().dirty);
    assert!(matches!(dev.invalidate_surface(5), Err(CommandError::InvalidSurface(5))));
}
