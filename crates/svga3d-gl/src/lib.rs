//! OpenGL backend for the SVGA3D virtual GPU.
//!
//! The guest speaks a Direct3D-shaped protocol (fixed-function state, shader model
//! bytecode, surfaces addressed by id); [`Svga3dGl`] reproduces it on the host's legacy
//! OpenGL. Host objects are created lazily, every guest context shares its objects with
//! one Shared Context, and per-context state is shadowed so composite host state can be
//! re-derived whenever one of its inputs changes.
//!
//! The host API and the windowing system sit behind [`gl::GlApi`] and
//! [`platform::PlatformContext`]; [`soft`] implements both in-process for tests and
//! headless runs.

pub mod blit;
pub mod caps;
pub mod config;
pub mod context;
pub mod devcaps;
pub mod device;
pub mod dma;
mod draw;
pub mod error;
pub mod format;
pub mod gl;
pub mod math;
pub mod platform;
pub mod query;
pub mod shader;
pub mod slots;
pub mod soft;
pub mod state;
pub mod surface;
pub mod vertex;

pub use caps::{HostCaps, HostFeatures, Limits, ShaderTier};
pub use config::BackendConfig;
pub use context::{BindGuard, Binding, Host};
pub use device::{GuestContext, Svga3dGl};
pub use dma::{GuestMemory, GuestMemoryError, VecGuestMemory};
pub use error::{status_of, CommandError, CommandStatus, InitError, PlatformError};
pub use format::{FormatConverter, YuvConverter};
pub use shader::{NullShaderBridge, RecordingShaderBridge, ShaderBridge};
pub use surface::{BackingKind, BackingUsage, HostObject, Surface, SurfaceDesc};
