//! macOS/CGL backend. Contexts are offscreen; every rendering target is an FBO anyway.

use core::ffi::{c_int, c_void};
use std::collections::HashMap;
use std::ffi::CString;

use libloading::Library;

use super::{ContextRequest, NativeContext, PlatformContext, Profile};
use crate::config::BackendConfig;
use crate::error::PlatformError;

type CglPixelFormatObj = *mut c_void;
type CglContextObj = *mut c_void;
type CglError = c_int;

const CGL_PFA_DOUBLE_BUFFER: c_int = 5;
const CGL_PFA_COLOR_SIZE: c_int = 8;
const CGL_PFA_ALPHA_SIZE: c_int = 11;
const CGL_PFA_DEPTH_SIZE: c_int = 12;
const CGL_PFA_STENCIL_SIZE: c_int = 13;
const CGL_PFA_ACCELERATED: c_int = 73;
const CGL_PFA_OPENGL_PROFILE: c_int = 99;
const CGL_OGLP_VERSION_LEGACY: c_int = 0x1000;
const CGL_OGLP_VERSION_3_2_CORE: c_int = 0x3200;

const OPENGL_FRAMEWORK: &str = "/System/Library/Frameworks/OpenGL.framework/OpenGL";

#[derive(Clone, Copy)]
struct CglFns {
    choose_pixel_format: unsafe extern "C" fn(*const c_int, *mut CglPixelFormatObj, *mut c_int) -> CglError,
    destroy_pixel_format: unsafe extern "C" fn(CglPixelFormatObj) -> CglError,
    create_context: unsafe extern "C" fn(CglPixelFormatObj, CglContextObj, *mut CglContextObj) -> CglError,
    destroy_context: unsafe extern "C" fn(CglContextObj) -> CglError,
    set_current_context: unsafe extern "C" fn(CglContextObj) -> CglError,
}

pub struct CglPlatform {
    cgl: CglFns,
    contexts: HashMap<u64, CglContextObj>,
    next_handle: u64,
    framework: Library,
}

unsafe fn sym<T: Copy>(lib: &Library, name: &'static str) -> Result<T, PlatformError> {
    let raw = format!("{name}\0");
    lib.get::<T>(raw.as_bytes())
        .map(|s| *s)
        .map_err(|_| PlatformError::MissingSymbol(name))
}

impl CglPlatform {
    pub fn open(config: &BackendConfig) -> Result<Self, PlatformError> {
        let path = config.gl_library.as_deref().unwrap_or(OPENGL_FRAMEWORK);
        // SAFETY: system framework.
        let framework = unsafe { Library::new(path) }.map_err(|e| PlatformError::LibraryLoad {
            library: path.to_owned(),
            reason: e.to_string(),
        })?;
        // SAFETY: signatures follow CGLTypes.h / OpenGL.h.
        let cgl = unsafe {
            CglFns {
                choose_pixel_format: sym(&framework, "CGLChoosePixelFormat")?,
                destroy_pixel_format: sym(&framework, "CGLDestroyPixelFormat")?,
                create_context: sym(&framework, "CGLCreateContext")?,
                destroy_context: sym(&framework, "CGLDestroyContext")?,
                set_current_context: sym(&framework, "CGLSetCurrentContext")?,
            }
        };
        tracing::info!(library = path, "CGL platform opened");
        Ok(Self {
            cgl,
            contexts: HashMap::new(),
            next_handle: 0,
            framework,
        })
    }

    fn pixel_format(&self, profile: Profile) -> Result<CglPixelFormatObj, PlatformError> {
        let version = match profile {
            Profile::Legacy => CGL_OGLP_VERSION_LEGACY,
            Profile::Core => CGL_OGLP_VERSION_3_2_CORE,
        };
        let attribs = [
            CGL_PFA_ACCELERATED,
            CGL_PFA_DOUBLE_BUFFER,
            CGL_PFA_COLOR_SIZE,
            24,
            CGL_PFA_ALPHA_SIZE,
            8,
            CGL_PFA_DEPTH_SIZE,
            24,
            CGL_PFA_STENCIL_SIZE,
            8,
            CGL_PFA_OPENGL_PROFILE,
            version,
            0,
        ];
        let mut pix: CglPixelFormatObj = core::ptr::null_mut();
        let mut count = 0;
        // SAFETY: zero-terminated attribute list; out-pointers are valid.
        let err = unsafe { (self.cgl.choose_pixel_format)(attribs.as_ptr(), &mut pix, &mut count) };
        if err != 0 || pix.is_null() {
            return Err(PlatformError::NoPixelFormat);
        }
        Ok(pix)
    }
}

impl PlatformContext for CglPlatform {
    fn name(&self) -> &'static str {
        "cgl"
    }

    fn create_context(
        &mut self,
        request: &ContextRequest,
        share: Option<&NativeContext>,
    ) -> Result<NativeContext, PlatformError> {
        let share_ctx = match share {
            Some(s) => *self.contexts.get(&s.handle()).ok_or(PlatformError::UnknownContext)?,
            None => core::ptr::null_mut(),
        };
        let pix = self.pixel_format(request.profile)?;
        let mut ctx: CglContextObj = core::ptr::null_mut();
        // SAFETY: pix is live until destroyed below; share is null or a live context.
        let err = unsafe {
            let err = (self.cgl.create_context)(pix, share_ctx, &mut ctx);
            (self.cgl.destroy_pixel_format)(pix);
            err
        };
        if err != 0 || ctx.is_null() {
            return Err(PlatformError::ContextCreation(format!("CGL error {err}")));
        }
        self.next_handle += 1;
        self.contexts.insert(self.next_handle, ctx);
        tracing::debug!(handle = self.next_handle, profile = ?request.profile, shared = share.is_some(), "CGL context created");
        Ok(NativeContext::new(self.next_handle, request.profile))
    }

    fn destroy_context(&mut self, ctx: NativeContext) -> Result<(), PlatformError> {
        let c = self.contexts.remove(&ctx.handle()).ok_or(PlatformError::UnknownContext)?;
        // SAFETY: no longer referenced.
        unsafe { (self.cgl.destroy_context)(c) };
        Ok(())
    }

    fn make_current(&mut self, ctx: Option<&NativeContext>) -> Result<(), PlatformError> {
        let c = match ctx {
            Some(c) => *self.contexts.get(&c.handle()).ok_or(PlatformError::UnknownContext)?,
            None => core::ptr::null_mut(),
        };
        // SAFETY: null or live.
        if unsafe { (self.cgl.set_current_context)(c) } != 0 {
            return Err(PlatformError::MakeCurrent);
        }
        Ok(())
    }

    fn proc_address(&mut self, name: &str) -> *const c_void {
        let Ok(c) = CString::new(name) else {
            return core::ptr::null();
        };
        // SAFETY: only the address is read.
        match unsafe { self.framework.get::<*const c_void>(c.as_bytes_with_nul()) } {
            Ok(p) => *p,
            Err(_) => core::ptr::null(),
        }
    }

    fn shutdown(&mut self) -> Result<(), PlatformError> {
        if self.contexts.is_empty() {
            return Ok(());
        }
        if let Err(err) = self.make_current(None) {
            tracing::warn!(%err, "releasing the current CGL context failed");
        }
        for (_, c) in self.contexts.drain() {
            // SAFETY: as in destroy_context.
            unsafe { (self.cgl.destroy_context)(c) };
        }
        Ok(())
    }
}

impl Drop for CglPlatform {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!(error = %e, "CGL platform shutdown failed");
        }
    }
}
