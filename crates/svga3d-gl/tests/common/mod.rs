//! Shared helpers for `svga3d-gl` integration tests.
//!
//! Everything except `native_smoke` runs against the in-process soft host, so the tests
//! need no display and no GL driver.

#![allow(dead_code)]

use std::cell::Ref;

use svga3d_gl::soft::{SoftConfig, SoftContextState, SoftHost, SoftPlatform};
use svga3d_gl::{
    BackendConfig, GuestMemory, NullShaderBridge, ShaderBridge, SurfaceDesc, Svga3dGl, VecGuestMemory, YuvConverter,
};
use svga3d_protocol::state::TransferType;
use svga3d_protocol::{CopyBox, GuestImage, GuestPtr, SurfaceFlags, SurfaceImageId};

pub const REQUIRE_GL_ENV: &str = "SVGA3D_REQUIRE_GL";

pub fn require_gl() -> bool {
    let Ok(raw) = std::env::var(REQUIRE_GL_ENV) else {
        return false;
    };

    let v = raw.trim();
    v == "1"
        || v.eq_ignore_ascii_case("true")
        || v.eq_ignore_ascii_case("yes")
        || v.eq_ignore_ascii_case("on")
}

pub fn skip_or_panic(test_name: &str, reason: &str) {
    if require_gl() {
        panic!("{REQUIRE_GL_ENV} is enabled but {test_name} cannot run: {reason}");
    }
    eprintln!("skipping {test_name}: {reason}");
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn backend_config() -> BackendConfig {
    BackendConfig {
        check_host_errors: true,
        dual_profile: false,
        gl_library: None,
    }
}

pub fn soft_device() -> (Svga3dGl, SoftHost) {
    soft_device_with(SoftConfig::default(), Box::new(NullShaderBridge::default()))
}

pub fn soft_device_with(config: SoftConfig, bridge: Box<dyn ShaderBridge>) -> (Svga3dGl, SoftHost) {
    init_tracing();
    let (platform, host) = SoftPlatform::new(config);
    let dev = Svga3dGl::power_on(Box::new(platform), &backend_config(), bridge, Box::new(YuvConverter))
        .expect("soft host powers on");
    (dev, host)
}

/// Host-side state of guest context `cid`.
pub fn guest_state<'a>(dev: &Svga3dGl, host: &'a SoftHost, cid: u32) -> Ref<'a, SoftContextState> {
    let handle = dev.native_context(Some(cid)).expect("context has a native handle");
    host.context(handle).expect("soft host knows the context")
}

pub fn shared_handle(dev: &Svga3dGl) -> u64 {
    dev.native_context(None).expect("shared context exists")
}

pub fn image(sid: u32) -> SurfaceImageId {
    SurfaceImageId::new(sid, 0, 0)
}

pub fn guest(gmr_id: u32, offset: u32, pitch: u32) -> GuestImage {
    GuestImage {
        ptr: GuestPtr { gmr_id, offset },
        pitch,
    }
}

pub fn whole(w: u32, h: u32) -> CopyBox {
    CopyBox::same_origin(0, 0, 0, w, h, 1)
}

/// Defines `sid` as a buffer surface holding `bytes`, written through a guest DMA.
pub fn buffer_surface(dev: &mut Svga3dGl, sid: u32, flags: SurfaceFlags, bytes: &[u8]) {
    dev.define_surface(sid, &SurfaceDesc::buffer(bytes.len() as u32, flags))
        .expect("buffer surface defined");
    write_level(dev, image(sid), bytes.len() as u32, 1, bytes);
}

/// Writes `bytes`, packed at the level's pitch, into the `w` x `h` top-left box of `img`.
pub fn write_level(dev: &mut Svga3dGl, img: SurfaceImageId, w: u32, h: u32, bytes: &[u8]) {
    let memory = VecGuestMemory::new();
    memory.define_region(1, bytes.len());
    memory.write(1, 0, bytes).expect("region sized for the data");
    dev.surface_dma(&memory, guest(1, 0, 0), img, TransferType::WriteHostVram.as_u32(), &[whole(w, h)])
        .expect("upload dma");
}

pub fn floats(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

pub fn words(tokens: &[u32]) -> Vec<u8> {
    tokens.iter().flat_map(|t| t.to_le_bytes()).collect()
}

/// A row-major translation in guest (row-vector) convention.
pub fn translation(x: f32, y: f32, z: f32) -> [f32; 16] {
    [
        1.0, 0.0, 0.0, 0.0, //
        0.0, 1.0, 0.0, 0.0, //
        0.0, 0.0, 1.0, 0.0, //
        x, y, z, 1.0,
    ]
}

pub fn scale(s: f32) -> [f32; 16] {
    [
        s, 0.0, 0.0, 0.0, //
        0.0, s, 0.0, 0.0, //
        0.0, 0.0, s, 0.0, //
        0.0, 0.0, 0.0, 1.0,
    ]
}

pub fn assert_close(actual: &[f32], expected: &[f32]) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!((a - e).abs() < 1e-5, "component {i}: {actual:?} != {expected:?}");
    }
}
