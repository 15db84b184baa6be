//! Powers the backend on, prints what the host offers and exits.
//!
//! `svga3d-gl-probe` uses the native platform; `--soft` uses the in-process host.

use anyhow::Context as _;
use svga3d_gl::platform::{native_platform, PlatformContext};
use svga3d_gl::soft::SoftPlatform;
use svga3d_gl::{BackendConfig, NullShaderBridge, Svga3dGl, YuvConverter};
use svga3d_protocol::DevCapIndex;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let soft = std::env::args().skip(1).any(|a| a == "--soft");
    let config = BackendConfig::from_env();
    let platform: Box<dyn PlatformContext> = if soft {
        Box::new(SoftPlatform::with_defaults().0)
    } else {
        native_platform(&config).context("opening the native platform")?
    };

    let device = Svga3dGl::power_on(
        platform,
        &config,
        Box::new(NullShaderBridge::default()),
        Box::new(YuvConverter),
    )
    .context("powering on")?;

    let caps = device.caps();
    println!("vendor:   {}", caps.vendor);
    println!("renderer: {}", caps.renderer);
    println!("version:  {} ({:?})", caps.primary.version, caps.primary.profile);
    if let Some(other) = &caps.other {
        println!("other:    {} ({:?})", other.version, other.profile);
    }
    println!("tier:     {:?}", caps.tier);
    println!("features: {:?}", caps.features);
    println!();
    for &cap in DevCapIndex::ALL {
        match device.query_capability(cap.as_u32()) {
            Ok(v) => println!("{:>3} {:<40} {v:#010x}", cap.as_u32(), cap.name()),
            Err(err) => println!("{:>3} {:<40} ({err})", cap.as_u32(), cap.name()),
        }
    }

    device.power_off();
    Ok(())
}
