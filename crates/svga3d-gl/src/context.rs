//! Host-side context bookkeeping: which native context is current, and temporary
//! switches to the Shared Context that restore the previous binding when done.

use std::collections::HashMap;
use std::ops::{Deref, DerefMut};

use crate::caps::HostCaps;
use crate::error::CommandError;
use crate::gl::{consts as gl, drain_errors, GLenum, GLuint, GlApi};
use crate::platform::{ContextRequest, NativeContext, PlatformContext};
use crate::slots::SlotKey;
use crate::state::{Apply, StateShadow};

/// Which native context a piece of work runs on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Binding {
    /// Owns every surface's host objects; guest contexts share with it.
    Shared,
    Guest(SlotKey),
}

/// Framebuffers the Shared Context uses for surface-to-surface copies.
#[derive(Clone, Copy, Debug)]
pub(crate) struct BlitFramebuffers {
    pub read: GLuint,
    pub draw: GLuint,
}

pub struct Host {
    pub(crate) platform: Box<dyn PlatformContext>,
    pub(crate) gl: Box<dyn GlApi>,
    pub(crate) caps: HostCaps,
    pub(crate) check_errors: bool,
    natives: HashMap<Binding, NativeContext>,
    current: Option<Binding>,
    make_current_calls: u64,
    blit: Option<BlitFramebuffers>,
}

impl Host {
    pub(crate) fn new(
        platform: Box<dyn PlatformContext>,
        gl: Box<dyn GlApi>,
        caps: HostCaps,
        check_errors: bool,
    ) -> Self {
        Self {
            platform,
            gl,
            caps,
            check_errors,
            natives: HashMap::new(),
            current: None,
            make_current_calls: 0,
            blit: None,
        }
    }

    pub fn gl(&mut self) -> &mut dyn GlApi {
        &mut *self.gl
    }

    pub fn caps(&self) -> &HostCaps {
        &self.caps
    }

    pub fn current(&self) -> Option<Binding> {
        self.current
    }

    /// Number of native make-current switches actually issued.
    pub fn make_current_calls(&self) -> u64 {
        self.make_current_calls
    }

    pub fn native_handle(&self, binding: Binding) -> Option<u64> {
        self.natives.get(&binding).map(NativeContext::handle)
    }

    /// Creates a native context for `binding`, sharing objects with the Shared Context
    /// when that one already exists.
    pub(crate) fn create_native(&mut self, binding: Binding) -> Result<(), CommandError> {
        let share = self.natives.get(&Binding::Shared);
        let native = self
            .platform
            .create_context(&ContextRequest::legacy(), share)
            .map_err(|err| {
                tracing::warn!(?binding, %err, "native context creation failed");
                CommandError::Host {
                    op: "create context",
                    error: "native context creation failed",
                }
            })?;
        if let Some(old) = self.natives.insert(binding, native) {
            self.release_native(binding, old);
        }
        Ok(())
    }

    pub(crate) fn destroy_native(&mut self, binding: Binding) {
        if let Some(native) = self.natives.remove(&binding) {
            self.release_native(binding, native);
        }
    }

    fn release_native(&mut self, binding: Binding, native: NativeContext) {
        if self.current == Some(binding) {
            if let Err(err) = self.platform.make_current(None) {
                tracing::warn!(%err, "unbinding context before destroy failed");
            }
            self.current = None;
        }
        if let Err(err) = self.platform.destroy_context(native) {
            tracing::warn!(?binding, %err, "destroying native context failed");
        }
    }

    /// Makes `binding` current. A no-op when it already is.
    pub(crate) fn make_current(&mut self, binding: Option<Binding>) -> Result<(), CommandError> {
        if self.current == binding {
            return Ok(());
        }
        let native = match binding {
            Some(b) => Some(self.natives.get(&b).ok_or(CommandError::Host {
                op: "make current",
                error: "no native context",
            })?),
            None => None,
        };
        self.platform.make_current(native).map_err(|err| {
            tracing::warn!(?binding, %err, "make current failed");
            CommandError::Host {
                op: "make current",
                error: "platform refused",
            }
        })?;
        self.make_current_calls += 1;
        self.current = binding;
        Ok(())
    }

    /// Switches to `binding` until the returned guard drops.
    pub fn bind(&mut self, binding: Binding) -> Result<BindGuard<'_>, CommandError> {
        let previous = self.current;
        self.make_current(Some(binding))?;
        Ok(BindGuard {
            host: self,
            previous,
        })
    }

    /// A state-translation view of the current context over `shadow`.
    pub(crate) fn apply<'a>(&'a mut self, shadow: &'a mut StateShadow) -> Apply<'a> {
        Apply::new(&mut *self.gl, &self.caps, shadow, self.check_errors)
    }

    /// Logs host errors after a state-translation call when error checking is on.
    pub(crate) fn trace(&mut self, op: &str) {
        if self.check_errors {
            drain_errors(&mut *self.gl, op);
        }
    }

    /// Drains host errors unconditionally; used after object creation and transfers.
    pub(crate) fn drain(&mut self, op: &str) -> Option<GLenum> {
        drain_errors(&mut *self.gl, op)
    }

    /// The Shared Context's copy framebuffers, created on first use. The Shared Context
    /// must be current.
    pub(crate) fn blit_framebuffers(&mut self) -> BlitFramebuffers {
        debug_assert_eq!(self.current, Some(Binding::Shared));
        if let Some(b) = self.blit {
            return b;
        }
        let b = BlitFramebuffers {
            read: self.gl.gen_framebuffer(),
            draw: self.gl.gen_framebuffer(),
        };
        self.blit = Some(b);
        b
    }

    pub(crate) fn release_blit_framebuffers(&mut self) {
        if let Some(b) = self.blit.take() {
            self.gl.bind_framebuffer(gl::FRAMEBUFFER, 0);
            self.gl.delete_framebuffer(b.read);
            self.gl.delete_framebuffer(b.draw);
        }
    }

    /// Unbinds, destroys every native context and releases the platform.
    pub(crate) fn shutdown(&mut self) {
        if let Err(err) = self.make_current(None) {
            tracing::warn!(%err, "unbinding before shutdown failed");
        }
        let bindings: Vec<Binding> = self.natives.keys().copied().collect();
        for b in bindings {
            self.destroy_native(b);
        }
        if let Err(err) = self.platform.shutdown() {
            tracing::warn!(%err, "platform shutdown failed");
        }
    }
}

/// Restores the previously current context on drop.
pub struct BindGuard<'a> {
    host: &'a mut Host,
    previous: Option<Binding>,
}

impl BindGuard<'_> {
    pub fn gl(&mut self) -> &mut dyn GlApi {
        &mut *self.host.gl
    }
}

impl Deref for BindGuard<'_> {
    type Target = Host;

    fn deref(&self) -> &Host {
        self.host
    }
}

impl DerefMut for BindGuard<'_> {
    fn deref_mut(&mut self) -> &mut Host {
        self.host
    }
}

impl Drop for BindGuard<'_> {
    fn drop(&mut self) {
        // A previous binding may have been destroyed while the guard was held.
        let previous = self.previous.filter(|b| self.host.natives.contains_key(b));
        if let Err(err) = self.host.make_current(previous) {
            tracing::warn!(%err, "restoring the previous context failed");
        }
    }
}
