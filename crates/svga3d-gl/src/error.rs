use thiserror::Error;

use crate::gl::GLenum;
use crate::slots::SlotError;

/// Conditions that disable the 3D subsystem at power-on. The VM keeps running without 3D.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("required host entry point {0} is missing")]
    MissingEntryPoint(&'static str),
    #[error("required host extension {0} is missing")]
    MissingExtension(&'static str),
    #[error("host GL {found_major}.{found_minor} is below the required {required_major}.{required_minor}")]
    VersionTooLow {
        found_major: u32,
        found_minor: u32,
        required_major: u32,
        required_minor: u32,
    },
    #[error("host GL version string {0:?} could not be parsed")]
    UnparsableVersion(String),
    #[error(transparent)]
    Platform(#[from] PlatformError),
}

/// Native windowing-system and context-creation failures.
#[derive(Debug, Error)]
pub enum PlatformError {
    #[error("failed to load {library}: {reason}")]
    LibraryLoad { library: String, reason: String },
    #[error("symbol {0} not found in the host GL library")]
    MissingSymbol(&'static str),
    #[error("no display connection available")]
    NoDisplay,
    #[error("no suitable pixel format or framebuffer config")]
    NoPixelFormat,
    #[error("native window creation failed: {0}")]
    WindowCreation(String),
    #[error("native context creation failed: {0}")]
    ContextCreation(String),
    #[error("making the context current failed")]
    MakeCurrent,
    #[error("context sharing failed")]
    ShareLists,
    #[error("helper thread is gone")]
    HelperThreadGone,
    #[error("helper thread did not stop within {0:?}")]
    HelperThreadTimeout(std::time::Duration),
    #[error("unknown native context handle")]
    UnknownContext,
}

/// Status handed back to the command dispatcher. Only this value crosses the boundary.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandStatus {
    Ok,
    InvalidParameter,
    NoMemory,
    NotSupported,
    HostError,
}

/// Per-command failure. Validation variants are raised before any state is touched.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("invalid context id {0:#x}")]
    InvalidContext(u32),
    #[error("invalid surface id {0:#x}")]
    InvalidSurface(u32),
    #[error("invalid shader id {shid} (type {ty}) on context {cid}")]
    InvalidShader { cid: u32, shid: u32, ty: u32 },
    #[error("invalid screen id {0}")]
    InvalidScreen(u32),
    #[error("unknown {what} value {value}")]
    UnknownEnum { what: &'static str, value: u32 },
    #[error("{what} index {index} out of range (limit {limit})")]
    IndexOutOfRange {
        what: &'static str,
        index: u32,
        limit: u32,
    },
    #[error("surface {sid}: face {face} mip {mipmap} does not exist")]
    InvalidImage { sid: u32, face: u32, mipmap: u32 },
    #[error("box outside surface {sid} bounds or not block aligned")]
    InvalidBox { sid: u32 },
    #[error("malformed {0}")]
    Malformed(&'static str),
    #[error("guest memory access failed: {0}")]
    GuestMemory(String),
    #[error("out of memory growing {0}")]
    NoMemory(&'static str),
    #[error("host GL reported {error} during {op}")]
    Host { op: &'static str, error: &'static str },
    #[error("framebuffer incomplete (status {status:#x}) during {op}")]
    FramebufferIncomplete { op: &'static str, status: GLenum },
    #[error("shader bridge failure: {0}")]
    ShaderBridge(String),
    #[error("format conversion failed: {0}")]
    Conversion(String),
    #[error("not supported: {0}")]
    Unsupported(&'static str),
}

impl CommandError {
    pub fn status(&self) -> CommandStatus {
        match self {
            Self::InvalidContext(_)
            | Self::InvalidSurface(_)
            | Self::InvalidShader { .. }
            | Self::InvalidScreen(_)
            | Self::UnknownEnum { .. }
            | Self::IndexOutOfRange { .. }
            | Self::InvalidImage { .. }
            | Self::InvalidBox { .. }
            | Self::Malformed(_)
            | Self::GuestMemory(_) => CommandStatus::InvalidParameter,
            Self::NoMemory(_) => CommandStatus::NoMemory,
            Self::Unsupported(_) => CommandStatus::NotSupported,
            Self::Host { .. }
            | Self::FramebufferIncomplete { .. }
            | Self::ShaderBridge(_)
            | Self::Conversion(_) => CommandStatus::HostError,
        }
    }

    pub(crate) fn unknown(what: &'static str, value: u32) -> Self {
        Self::UnknownEnum { what, value }
    }

    /// A failed slot-table insert for guest id `id`.
    pub(crate) fn slot(what: &'static str, id: u32, err: SlotError) -> Self {
        match err {
            SlotError::OutOfRange { limit } => Self::IndexOutOfRange { what, index: id, limit },
            SlotError::NoMemory => Self::NoMemory(what),
        }
    }
}

impl From<std::collections::TryReserveError> for CommandError {
    fn from(_: std::collections::TryReserveError) -> Self {
        Self::NoMemory("host table")
    }
}

/// Maps a command result to the dispatcher status, logging failures.
pub fn status_of<T>(op: &str, result: &Result<T, CommandError>) -> CommandStatus {
    match result {
        Ok(_) => CommandStatus::Ok,
        Err(err) => {
            tracing::warn!(op, %err, "command rejected");
            err.status()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_map_to_invalid_parameter() {
        assert_eq!(CommandError::InvalidContext(3).status(), CommandStatus::InvalidParameter);
        assert_eq!(
            CommandError::unknown("render state", 400).status(),
            CommandStatus::InvalidParameter
        );
        assert_eq!(CommandError::NoMemory("contexts").status(), CommandStatus::NoMemory);
        assert_eq!(
            CommandError::Unsupported("renderbuffer dma").status(),
            CommandStatus::NotSupported
        );
        assert_eq!(
            CommandError::Host {
                op: "clear",
                error: "GL_OUT_OF_MEMORY"
            }
            .status(),
            CommandStatus::HostError
        );
    }

    #[test]
    fn status_of_passes_success_through() {
        let ok: Result<(), CommandError> = Ok(());
        assert_eq!(status_of("noop", &ok), CommandStatus::Ok);
        let err: Result<(), CommandError> = Err(CommandError::InvalidSurface(9));
        assert_eq!(status_of("dma", &err), CommandStatus::InvalidParameter);
    }
}
