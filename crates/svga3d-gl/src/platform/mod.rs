//! Native rendering-context creation, one implementation per windowing system.
//!
//! The translator only ever sees [`PlatformContext`]: create a context (optionally sharing
//! objects with another), make one current, resolve entry points. How a backend gets
//! there (a direct call, or a request proxied to a helper thread that owns the windows)
//! is its own business.

mod channel;

#[cfg(target_os = "macos")]
mod cgl;
#[cfg(all(unix, not(target_os = "macos")))]
mod glx;
#[cfg(windows)]
mod wgl;

use core::ffi::c_void;

use crate::config::BackendConfig;
use crate::error::{InitError, PlatformError};
use crate::gl::{GlApi, GlEntryPoints};

pub use channel::{request_channel, HelperThread, RequestChannel, RequestServer, ServeOutcome};

/// Host API profile of a native context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Profile {
    /// Compatibility profile: fixed function plus whatever the driver offers on top.
    Legacy,
    /// Forward-compatible core profile (3.2+).
    Core,
}

impl Profile {
    pub fn other(self) -> Self {
        match self {
            Self::Legacy => Self::Core,
            Self::Core => Self::Legacy,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ContextRequest {
    pub profile: Profile,
    pub debug: bool,
}

impl ContextRequest {
    pub const fn legacy() -> Self {
        Self {
            profile: Profile::Legacy,
            debug: false,
        }
    }

    pub const fn core() -> Self {
        Self {
            profile: Profile::Core,
            debug: false,
        }
    }
}

/// Opaque native context owned by the caller; the backend maps the handle to whatever
/// windowing-system objects it created.
#[derive(Debug, PartialEq, Eq)]
pub struct NativeContext {
    handle: u64,
    profile: Profile,
}

impl NativeContext {
    pub(crate) fn new(handle: u64, profile: Profile) -> Self {
        Self { handle, profile }
    }

    pub fn handle(&self) -> u64 {
        self.handle
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }
}

pub trait PlatformContext {
    fn name(&self) -> &'static str;

    /// Creates a context. With `share`, the new context sees the same textures, buffers
    /// and renderbuffers as `share`.
    fn create_context(
        &mut self,
        request: &ContextRequest,
        share: Option<&NativeContext>,
    ) -> Result<NativeContext, PlatformError>;

    fn destroy_context(&mut self, ctx: NativeContext) -> Result<(), PlatformError>;

    /// Binds `ctx` on the calling thread, or unbinds with `None`.
    fn make_current(&mut self, ctx: Option<&NativeContext>) -> Result<(), PlatformError>;

    /// Address of a host entry point, or null. Only meaningful with a context current.
    fn proc_address(&mut self, name: &str) -> *const c_void;

    /// Resolves every host entry point. Called once with the bootstrap context current.
    fn load_gl(&mut self) -> Result<Box<dyn GlApi>, InitError> {
        let gl = GlEntryPoints::load(|name| self.proc_address(name))?;
        Ok(Box::new(gl))
    }

    /// Releases process-wide resources (display connections, helper threads).
    fn shutdown(&mut self) -> Result<(), PlatformError>;
}

/// The windowing-system backend for this build target.
pub fn native_platform(config: &BackendConfig) -> Result<Box<dyn PlatformContext>, PlatformError> {
    #[cfg(target_os = "macos")]
    {
        Ok(Box::new(cgl::CglPlatform::open(config)?))
    }
    #[cfg(all(unix, not(target_os = "macos")))]
    {
        Ok(Box::new(glx::GlxPlatform::open(config)?))
    }
    #[cfg(windows)]
    {
        Ok(Box::new(wgl::WglPlatform::open(config)?))
    }
    #[cfg(not(any(unix, windows)))]
    {
        let _ = config;
        Err(PlatformError::NoDisplay)
    }
}
