//! Runs a minimal command sequence against the host's real OpenGL driver.
//!
//! Skips when no display or driver is available unless `SVGA3D_REQUIRE_GL` is set.

mod common;

use common::{image, skip_or_panic};
use svga3d_gl::platform::native_platform;
use svga3d_gl::{NullShaderBridge, SurfaceDesc, Svga3dGl, YuvConverter};
use svga3d_protocol::state::{ClearFlags, RenderTargetType};
use svga3d_protocol::SurfaceFormat;

const TEST: &str = "native_smoke::clear_and_read_back";

#[test]
fn clear_and_read_back() {
    common::init_tracing();
    let config = common::backend_config();
    let platform = match native_platform(&config) {
        Ok(p) => p,
        Err(err) => {
            skip_or_panic(TEST, &format!("no native platform: {err}"));
            return;
        }
    };
    let mut dev = match Svga3dGl::power_on(
        platform,
        &config,
        Box::new(NullShaderBridge::default()),
        Box::new(YuvConverter),
    ) {
        Ok(dev) => dev,
        Err(err) => {
            skip_or_panic(TEST, &format!("host OpenGL unusable: {err}"));
            return;
        }
    };

    dev.define_context(1).unwrap();
    dev.define_surface(2, &SurfaceDesc::texture_2d(SurfaceFormat::A8R8G8B8, 16, 16))
        .unwrap();
    dev.set_render_target(1, RenderTargetType::Color0.as_u32(), image(2))
        .unwrap();
    dev.clear(1, ClearFlags::COLOR.bits(), 0xFF20_4060, 1.0, 0, &[])
        .unwrap();
    dev.read_back_surface(2).unwrap();

    let data = dev.surface_level_data(image(2)).unwrap();
    assert_eq!(data.len(), 16 * 16 * 4);
    assert_eq!(&data[..4], &0xFF20_4060u32.to_le_bytes());

    dev.destroy_context(1).unwrap();
    dev.power_off();
}
