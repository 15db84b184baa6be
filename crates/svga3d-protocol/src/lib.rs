//! SVGA3D guest protocol vocabulary.
//!
//! This crate only describes the values the guest driver puts on the wire: command IDs,
//! device-capability indices, surface formats, render/texture state IDs and the value
//! enums they carry, plus the fixed-layout structures embedded in command bodies.
//!
//! Everything here is plain data; the OpenGL backend lives in `svga3d-gl`.

#[macro_use]
mod macros;

pub mod cmd;
pub mod devcaps;
pub mod draw;
pub mod format;
pub mod state;
pub mod types;

pub use devcaps::DevCapIndex;
pub use format::{FormatOps, SurfaceFlags, SurfaceFormat};
pub use types::*;

/// Guest ID value meaning "no object" (contexts, surfaces, shaders).
pub const SVGA3D_INVALID_ID: u32 = u32::MAX;

pub const SVGA3D_MAX_CONTEXT_IDS: u32 = 256;
pub const SVGA3D_MAX_SURFACE_IDS: u32 = 32 * 1024;
pub const SVGA3D_MAX_SHADERIDS: u32 = 5000;

pub const SVGA3D_MAX_LIGHTS: usize = 32;
pub const SVGA3D_MAX_CLIP_PLANES: usize = 6;
pub const SVGA3D_MAX_TEXTURE_STAGES: usize = 16;
/// Fixed-function texture units; stages at or above this index are shader samplers only.
pub const SVGA3D_MAX_FIXED_TEXTURE_STAGES: usize = 8;
pub const SVGA3D_MAX_RENDER_TARGETS: usize = 8;
pub const SVGA3D_MAX_VERTEX_ARRAYS: usize = 32;
pub const SVGA3D_MAX_DRAW_PRIMITIVE_RANGES: usize = 32;
pub const SVGA3D_MAX_SURFACE_FACES: usize = 6;
pub const SVGA3D_MAX_SHADER_CONSTANT_REGISTERS: u32 = 8192;
