mod common;

use common::{buffer_surface, floats, guest_state, image, soft_device, soft_device_with, words, write_level};
use pretty_assertions::assert_eq;
use svga3d_gl::gl::consts as gl;
use svga3d_gl::query::QueryState;
use svga3d_gl::shader::{DrawShaderState, ShaderCall};
use svga3d_gl::soft::{AttribSlot, SoftConfig};
use svga3d_gl::{BackingKind, CommandError, CommandStatus, RecordingShaderBridge, SurfaceDesc};
use svga3d_protocol::draw::{DeclMethod, DeclType, DeclUsage, PrimitiveType};
use svga3d_protocol::state::{QueryType, ShaderType};
use svga3d_protocol::{
    ArrayDesc, ArrayRangeHint, PrimitiveRange, SurfaceFlags, SurfaceFormat, VertexArrayIdentity, VertexDecl,
    VertexDivisor, SVGA3D_INVALID_ID,
};

const CID: u32 = 2;
const VS_2_0: u32 = 0xFFFE_0200;
const END: u32 = 0x0000_FFFF;

fn decl(ty: DeclType, usage: DeclUsage, usage_index: u32, sid: u32, offset: u32, stride: u32) -> VertexDecl {
    VertexDecl {
        identity: VertexArrayIdentity {
            ty: ty.as_u32(),
            method: DeclMethod::Default.as_u32(),
            usage: usage.as_u32(),
            usage_index,
        },
        array: ArrayDesc {
            surface_id: sid,
            offset,
            stride,
        },
        range_hint: ArrayRangeHint::default(),
    }
}

fn triangles(count: u32) -> PrimitiveRange {
    PrimitiveRange {
        prim_type: PrimitiveType::TriangleList.as_u32(),
        primitive_count: count,
        index_array: ArrayDesc {
            surface_id: SVGA3D_INVALID_ID,
            offset: 0,
            stride: 0,
        },
        index_width: 0,
        index_bias: 0,
    }
}

const TRIANGLE: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];

#[test]
fn zero_stride_colour_is_constant_and_reset() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    buffer_surface(&mut dev, 10, SurfaceFlags::HINT_VERTEXBUFFER, &floats(&TRIANGLE));
    buffer_surface(&mut dev, 11, SurfaceFlags::HINT_VERTEXBUFFER, &0xFF00_FF00u32.to_le_bytes());

    dev.draw_primitives(
        CID,
        &[
            decl(DeclType::Float3, DeclUsage::Position, 0, 10, 0, 12),
            decl(DeclType::D3dColor, DeclUsage::Color, 0, 11, 0, 0),
        ],
        &[triangles(1)],
        &[],
    )
    .unwrap();

    let ctx = guest_state(&dev, &host, CID);
    assert_eq!(ctx.draws.len(), 1);
    let draw = &ctx.draws[0];
    assert_eq!((draw.mode, draw.count, draw.instances, draw.indexed), (gl::TRIANGLES, 3, 1, None));
    let positions: Vec<[f32; 4]> = draw.vertices.iter().map(|v| v[&AttribSlot::Position]).collect();
    assert_eq!(
        positions,
        vec![[0.0, 0.0, 0.0, 1.0], [1.0, 0.0, 0.0, 1.0], [0.0, 1.0, 0.0, 1.0]]
    );
    assert!(draw.vertices.iter().all(|v| v[&AttribSlot::Color] == [0.0, 1.0, 0.0, 1.0]));

    // The constant went through the current colour and is back to the default.
    assert_eq!(ctx.current[&AttribSlot::Color], [1.0, 1.0, 1.0, 1.0]);
    assert!(!ctx.arrays[&AttribSlot::Position].enabled);
    assert_eq!(ctx.bound_buffer(gl::ARRAY_BUFFER), 0);
}

#[test]
fn constant_positions_are_expanded() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    buffer_surface(&mut dev, 10, SurfaceFlags::HINT_VERTEXBUFFER, &floats(&[2.0, 3.0, 4.0]));

    dev.draw_primitives(
        CID,
        &[decl(DeclType::Float3, DeclUsage::Position, 0, 10, 0, 0)],
        &[triangles(2)],
        &[],
    )
    .unwrap();

    let ctx = guest_state(&dev, &host, CID);
    let draw = &ctx.draws[0];
    assert_eq!(draw.vertices.len(), 6);
    assert!(draw.vertices.iter().all(|v| v[&AttribSlot::Position] == [2.0, 3.0, 4.0, 1.0]));
}

#[test]
fn constant_positions_past_the_expansion_cap_are_rejected() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    buffer_surface(&mut dev, 10, SurfaceFlags::HINT_VERTEXBUFFER, &floats(&[2.0, 3.0, 4.0]));

    let far = PrimitiveRange {
        index_bias: 1 << 20,
        ..triangles(1)
    };
    assert!(matches!(
        dev.draw_primitives(CID, &[decl(DeclType::Float3, DeclUsage::Position, 0, 10, 0, 0)], &[far], &[]),
        Err(CommandError::Malformed(_))
    ));
    assert!(guest_state(&dev, &host, CID).draws.is_empty());
}

#[test]
fn indexed_draws_apply_the_base_vertex() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    let positions: Vec<f32> = (0..6).flat_map(|i| [i as f32, 0.0]).collect();
    buffer_surface(&mut dev, 10, SurfaceFlags::HINT_VERTEXBUFFER, &floats(&positions));
    let indices: Vec<u8> = [0u16, 2, 1].iter().flat_map(|i| i.to_le_bytes()).collect();
    buffer_surface(&mut dev, 12, SurfaceFlags::HINT_INDEXBUFFER, &indices);

    let range = PrimitiveRange {
        index_array: ArrayDesc {
            surface_id: 12,
            offset: 0,
            stride: 2,
        },
        index_width: 2,
        index_bias: 3,
        ..triangles(1)
    };
    dev.draw_primitives(CID, &[decl(DeclType::Float2, DeclUsage::Position, 0, 10, 0, 8)], &[range], &[])
        .unwrap();

    let ctx = guest_state(&dev, &host, CID);
    let draw = &ctx.draws[0];
    assert_eq!(draw.indexed, Some(gl::UNSIGNED_SHORT));
    assert_eq!(draw.base_vertex, 3);
    let xs: Vec<f32> = draw.vertices.iter().map(|v| v[&AttribSlot::Position][0]).collect();
    assert_eq!(xs, vec![3.0, 5.0, 4.0]);
    assert_eq!(ctx.bound_buffer(gl::ELEMENT_ARRAY_BUFFER), 0);
}

#[test]
fn non_indexed_bias_is_the_first_vertex() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    let positions: Vec<f32> = (0..5).flat_map(|i| [i as f32, 0.0]).collect();
    buffer_surface(&mut dev, 10, SurfaceFlags::HINT_VERTEXBUFFER, &floats(&positions));

    let range = PrimitiveRange {
        prim_type: PrimitiveType::LineStrip.as_u32(),
        primitive_count: 2,
        index_bias: 1,
        ..triangles(0)
    };
    dev.draw_primitives(CID, &[decl(DeclType::Float2, DeclUsage::Position, 0, 10, 0, 8)], &[range], &[])
        .unwrap();

    let ctx = guest_state(&dev, &host, CID);
    let draw = &ctx.draws[0];
    assert_eq!((draw.mode, draw.first, draw.count), (gl::LINE_STRIP, 1, 3));
    assert_eq!(draw.vertices[0][&AttribSlot::Position][0], 1.0);
}

#[test]
fn texture_surfaces_used_as_vertex_data_become_buffers() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    // 9 texels of 4 bytes hold the 9 floats of one triangle.
    dev.define_surface(10, &SurfaceDesc::texture_2d(SurfaceFormat::A8R8G8B8, 9, 1))
        .unwrap();
    write_level(&mut dev, image(10), 9, 1, &floats(&TRIANGLE));

    dev.draw_primitives(
        CID,
        &[decl(DeclType::Float3, DeclUsage::Position, 0, 10, 0, 12)],
        &[triangles(1)],
        &[],
    )
    .unwrap();

    assert_eq!(dev.surface(10).unwrap().kind(), BackingKind::Buffer);
    let ctx = guest_state(&dev, &host, CID);
    assert_eq!(ctx.draws[0].vertices[1][&AttribSlot::Position], [1.0, 0.0, 0.0, 1.0]);
}

#[test]
fn vertex_shaders_read_generic_attributes_and_instance_data() {
    let bridge = RecordingShaderBridge::new();
    let log = bridge.log();
    let (mut dev, host) = soft_device_with(SoftConfig::default(), Box::new(bridge));
    dev.define_context(CID).unwrap();
    dev.define_shader(CID, 7, ShaderType::Vs.as_u32(), &words(&[VS_2_0, END]))
        .unwrap();
    dev.set_shader(CID, ShaderType::Vs.as_u32(), 7).unwrap();

    buffer_surface(&mut dev, 10, SurfaceFlags::HINT_VERTEXBUFFER, &floats(&TRIANGLE));
    let per_instance: Vec<f32> = (0..4).flat_map(|i| [i as f32, 0.5]).collect();
    buffer_surface(&mut dev, 11, SurfaceFlags::HINT_VERTEXBUFFER, &floats(&per_instance));

    dev.draw_primitives(
        CID,
        &[
            decl(DeclType::Float3, DeclUsage::Position, 0, 10, 0, 12),
            decl(DeclType::Float2, DeclUsage::TexCoord, 0, 11, 0, 8),
        ],
        &[triangles(1)],
        &[VertexDivisor::new(4, true, false), VertexDivisor::new(1, false, true)],
    )
    .unwrap();

    {
        let ctx = guest_state(&dev, &host, CID);
        let draw = &ctx.draws[0];
        assert_eq!(draw.instances, 4);
        assert_eq!(draw.vertices[2][&AttribSlot::Generic(0)], [0.0, 1.0, 0.0, 1.0]);
        // Instance 0 reads the first per-instance element for every vertex.
        assert!(draw.vertices.iter().all(|v| v[&AttribSlot::Generic(1)] == [0.0, 0.5, 0.0, 1.0]));
        assert!(!draw.vertices[0].contains_key(&AttribSlot::Position));
        assert_eq!(ctx.arrays[&AttribSlot::Generic(1)].divisor, 0);
    }

    let calls = log.borrow();
    assert!(calls.contains(&ShaderCall::UpdateState {
        cid: CID,
        state: DrawShaderState {
            vertex: Some(1),
            pixel: None,
            viewport: None,
        },
    }));
}

#[test]
fn instance_data_needs_a_vertex_shader() {
    let (mut dev, _host) = soft_device();
    dev.define_context(CID).unwrap();
    buffer_surface(&mut dev, 10, SurfaceFlags::HINT_VERTEXBUFFER, &floats(&TRIANGLE));

    let err = dev
        .draw_primitives(
            CID,
            &[decl(DeclType::Float3, DeclUsage::Position, 0, 10, 0, 12)],
            &[triangles(1)],
            &[VertexDivisor::new(1, false, true)],
        )
        .unwrap_err();
    assert!(matches!(err, CommandError::Unsupported(_)), "{err}");
}

#[test]
fn malformed_draws_are_rejected() {
    let (mut dev, host) = soft_device();
    dev.define_context(CID).unwrap();
    buffer_surface(&mut dev, 10, SurfaceFlags::HINT_VERTEXBUFFER, &floats(&TRIANGLE));
    let position = [decl(DeclType::Float3, DeclUsage::Position, 0, 10, 0, 12)];

    let bad_type = PrimitiveRange {
        prim_type: 42,
        ..triangles(1)
    };
    assert_eq!(
        dev.draw_primitives_status(CID, &position, &[bad_type], &[]),
        CommandStatus::InvalidParameter
    );
    assert_eq!(
        dev.draw_primitives_status(CID, &position, &[], &[]),
        CommandStatus::InvalidParameter
    );
    assert_eq!(
        dev.draw_primitives_status(CID, &[decl(DeclType::Float3, DeclUsage::Position, 0, 99, 0, 12)], &[triangles(1)], &[]),
        CommandStatus::InvalidParameter
    );
    let bad_width = PrimitiveRange {
        index_array: ArrayDesc {
            surface_id: 10,
            offset: 0,
            stride: 0,
        },
        index_width: 3,
        ..triangles(1)
    };
    assert!(matches!(
        dev.draw_primitives(CID, &position, &[bad_width], &[]),
        Err(CommandError::UnknownEnum { what: "index width", .. })
    ));
    let past_end = PrimitiveRange {
        index_array: ArrayDesc {
            surface_id: 10,
            offset: 32,
            stride: 0,
        },
        index_width: 4,
        ..triangles(1)
    };
    assert!(matches!(
        dev.draw_primitives(CID, &position, &[past_end], &[]),
        Err(CommandError::Malformed(_))
    ));

    assert!(guest_state(&dev, &host, CID).draws.is_empty());
}

#[test]
fn occlusion_queries_count_drawn_vertices() {
    let (mut dev, _host) = soft_device();
    dev.define_context(CID).unwrap();
    buffer_surface(&mut dev, 10, SurfaceFlags::HINT_VERTEXBUFFER, &floats(&TRIANGLE));
    let position = [decl(DeclType::Float3, DeclUsage::Position, 0, 10, 0, 0)];
    let occlusion = QueryType::Occlusion.as_u32();

    assert_eq!(dev.occlusion_query_state(CID).unwrap(), QueryState::Idle);
    assert!(matches!(
        dev.occlusion_query_get_data(CID, occlusion),
        Err(CommandError::Malformed(_))
    ));

    dev.occlusion_query_begin(CID, occlusion).unwrap();
    assert_eq!(dev.occlusion_query_state(CID).unwrap(), QueryState::Building);
    dev.draw_primitives(CID, &position, &[triangles(2)], &[]).unwrap();
    dev.occlusion_query_end(CID, occlusion).unwrap();
    assert_eq!(dev.occlusion_query_state(CID).unwrap(), QueryState::Issued);
    assert_eq!(dev.occlusion_query_get_data(CID, occlusion).unwrap(), 6);

    // A second round starts from zero on the same query object.
    dev.occlusion_query_begin(CID, occlusion).unwrap();
    dev.draw_primitives(CID, &position, &[triangles(1)], &[]).unwrap();
    dev.occlusion_query_end(CID, occlusion).unwrap();
    assert_eq!(dev.occlusion_query_get_data(CID, occlusion).unwrap(), 3);

    assert!(matches!(
        dev.occlusion_query_begin(CID, 1),
        Err(CommandError::UnknownEnum { .. })
    ));
    assert!(matches!(
        dev.occlusion_query_end(CID, occlusion),
        Err(CommandError::Malformed(_))
    ));
}
