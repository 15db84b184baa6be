//! Win32/WGL backend.
//!
//! Windows belong to the thread that created them, and their messages must be pumped on
//! that thread. A dedicated window thread therefore owns every hidden window and answers
//! create/destroy requests over a [`RequestChannel`]; contexts themselves are created and
//! made current on the caller's thread using the window's DC.

use core::ffi::c_void;
use std::collections::HashMap;
use std::ffi::CString;
use std::time::Duration;

use libloading::Library;
use windows_sys::Win32::Foundation::{HWND, LPARAM, LRESULT, WPARAM};
use windows_sys::Win32::Graphics::Gdi::{GetDC, ReleaseDC, HDC};
use windows_sys::Win32::Graphics::OpenGL::{
    wglCreateContext, wglDeleteContext, wglGetProcAddress, wglMakeCurrent, wglShareLists,
    ChoosePixelFormat, SetPixelFormat, HGLRC, PFD_DOUBLEBUFFER, PFD_DRAW_TO_WINDOW,
    PFD_MAIN_PLANE, PFD_SUPPORT_OPENGL, PFD_TYPE_RGBA, PIXELFORMATDESCRIPTOR,
};
use windows_sys::Win32::System::LibraryLoader::GetModuleHandleW;
use windows_sys::Win32::UI::WindowsAndMessaging::{
    CreateWindowExW, DefWindowProcW, DestroyWindow, DispatchMessageW, PeekMessageW,
    RegisterClassW, TranslateMessage, CS_OWNDC, MSG, PM_REMOVE, WNDCLASSW, WS_CLIPCHILDREN,
    WS_CLIPSIBLINGS, WS_OVERLAPPEDWINDOW,
};

use super::{
    request_channel, ContextRequest, HelperThread, NativeContext, PlatformContext, Profile,
    RequestChannel, RequestServer, ServeOutcome,
};
use crate::config::BackendConfig;
use crate::error::PlatformError;

const WGL_CONTEXT_MAJOR_VERSION_ARB: i32 = 0x2091;
const WGL_CONTEXT_MINOR_VERSION_ARB: i32 = 0x2092;
const WGL_CONTEXT_FLAGS_ARB: i32 = 0x2094;
const WGL_CONTEXT_PROFILE_MASK_ARB: i32 = 0x9126;
const WGL_CONTEXT_CORE_PROFILE_BIT_ARB: i32 = 1;
const WGL_CONTEXT_COMPATIBILITY_PROFILE_BIT_ARB: i32 = 2;
const WGL_CONTEXT_DEBUG_BIT_ARB: i32 = 1;

const PUMP_INTERVAL: Duration = Duration::from_millis(16);
const WINDOW_THREAD_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

type CreateContextAttribs = unsafe extern "system" fn(HDC, HGLRC, *const i32) -> HGLRC;

/// Handles cross the thread boundary as integers.
enum WindowRequest {
    Create,
    Destroy { hwnd: usize, hdc: usize },
}

enum WindowReply {
    Created { hwnd: usize, hdc: usize },
    Destroyed,
    Failed(String),
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(core::iter::once(0)).collect()
}

unsafe extern "system" fn window_proc(hwnd: HWND, msg: u32, wparam: WPARAM, lparam: LPARAM) -> LRESULT {
    DefWindowProcW(hwnd, msg, wparam, lparam)
}

fn pump_messages() {
    // SAFETY: MSG is plain data; only this thread's queue is touched.
    unsafe {
        let mut msg: MSG = core::mem::zeroed();
        while PeekMessageW(&mut msg, core::ptr::null_mut(), 0, 0, PM_REMOVE) != 0 {
            TranslateMessage(&msg);
            DispatchMessageW(&msg);
        }
    }
}

fn create_hidden_window(class: &[u16]) -> Result<(usize, usize), String> {
    let title = wide("svga3d");
    // SAFETY: the class was registered on this thread; every handle is checked.
    unsafe {
        let hwnd = CreateWindowExW(
            0,
            class.as_ptr(),
            title.as_ptr(),
            WS_OVERLAPPEDWINDOW | WS_CLIPSIBLINGS | WS_CLIPCHILDREN,
            0,
            0,
            16,
            16,
            core::ptr::null_mut(),
            core::ptr::null_mut(),
            GetModuleHandleW(core::ptr::null()),
            core::ptr::null(),
        );
        if hwnd.is_null() {
            return Err("CreateWindowExW failed".into());
        }
        let hdc = GetDC(hwnd);
        if hdc.is_null() {
            DestroyWindow(hwnd);
            return Err("GetDC failed".into());
        }
        let mut pfd: PIXELFORMATDESCRIPTOR = core::mem::zeroed();
        pfd.nSize = core::mem::size_of::<PIXELFORMATDESCRIPTOR>() as u16;
        pfd.nVersion = 1;
        pfd.dwFlags = PFD_DRAW_TO_WINDOW | PFD_SUPPORT_OPENGL | PFD_DOUBLEBUFFER;
        pfd.iPixelType = PFD_TYPE_RGBA;
        pfd.cColorBits = 32;
        pfd.cAlphaBits = 8;
        pfd.cDepthBits = 24;
        pfd.cStencilBits = 8;
        pfd.iLayerType = PFD_MAIN_PLANE as u8;
        let format = ChoosePixelFormat(hdc, &pfd);
        if format == 0 || SetPixelFormat(hdc, format, &pfd) == 0 {
            ReleaseDC(hwnd, hdc);
            DestroyWindow(hwnd);
            return Err("no usable pixel format".into());
        }
        Ok((hwnd as usize, hdc as usize))
    }
}

fn window_thread(server: RequestServer<WindowRequest, WindowReply>, stop: crossbeam_channel::Receiver<()>) {
    let class = wide("Svga3dGlWindow");
    let wc = WNDCLASSW {
        style: CS_OWNDC,
        lpfnWndProc: Some(window_proc),
        cbClsExtra: 0,
        cbWndExtra: 0,
        // SAFETY: null selects the current module.
        hInstance: unsafe { GetModuleHandleW(core::ptr::null()) },
        hIcon: core::ptr::null_mut(),
        hCursor: core::ptr::null_mut(),
        hbrBackground: core::ptr::null_mut(),
        lpszMenuName: core::ptr::null(),
        lpszClassName: class.as_ptr(),
    };
    // SAFETY: wc and the class name outlive the call. Re-registration after a restart
    // fails harmlessly.
    unsafe { RegisterClassW(&wc) };

    loop {
        if stop.try_recv().is_ok() {
            break;
        }
        let outcome = server.serve_timeout(PUMP_INTERVAL, |req| match req {
            WindowRequest::Create => match create_hidden_window(&class) {
                Ok((hwnd, hdc)) => WindowReply::Created { hwnd, hdc },
                Err(e) => WindowReply::Failed(e),
            },
            WindowRequest::Destroy { hwnd, hdc } => {
                // SAFETY: both were created on this thread by create_hidden_window.
                unsafe {
                    ReleaseDC(hwnd as HWND, hdc as HDC);
                    DestroyWindow(hwnd as HWND);
                }
                WindowReply::Destroyed
            }
        });
        pump_messages();
        if outcome == ServeOutcome::Disconnected {
            break;
        }
    }
}

struct WglWindow {
    context: HGLRC,
    hwnd: usize,
    hdc: usize,
}

pub struct WglPlatform {
    windows: RequestChannel<WindowRequest, WindowReply>,
    thread: Option<HelperThread>,
    contexts: HashMap<u64, WglWindow>,
    next_handle: u64,
    opengl32: Library,
}

impl WglPlatform {
    pub fn open(config: &BackendConfig) -> Result<Self, PlatformError> {
        let name = config.gl_library.as_deref().unwrap_or("opengl32.dll");
        // SAFETY: opengl32 is designed to be loaded dynamically.
        let opengl32 = unsafe { Library::new(name) }.map_err(|e| PlatformError::LibraryLoad {
            library: name.to_owned(),
            reason: e.to_string(),
        })?;
        let (windows, server) = request_channel();
        let thread = HelperThread::spawn("svga3d-wgl-windows", move |stop| window_thread(server, stop))?;
        tracing::info!(library = name, "WGL platform opened");
        Ok(Self {
            windows,
            thread: Some(thread),
            contexts: HashMap::new(),
            next_handle: 0,
            opengl32,
        })
    }

    fn destroy_window(&self, hwnd: usize, hdc: usize) {
        if let Err(e) = self.windows.call(WindowRequest::Destroy { hwnd, hdc }) {
            tracing::warn!(error = %e, "window thread did not destroy a window");
        }
    }

    fn create_wgl_context(&self, request: &ContextRequest, hdc: HDC) -> Result<HGLRC, PlatformError> {
        // SAFETY: hdc has a pixel format set; the temporary context is only current on
        // this thread while the ARB entry point is looked up.
        unsafe {
            let legacy = wglCreateContext(hdc);
            if legacy.is_null() {
                return Err(PlatformError::ContextCreation("wglCreateContext failed".into()));
            }
            if request.profile == Profile::Legacy && !request.debug {
                return Ok(legacy);
            }
            if wglMakeCurrent(hdc, legacy) == 0 {
                wglDeleteContext(legacy);
                return Err(PlatformError::MakeCurrent);
            }
            let create: Option<CreateContextAttribs> = wglGetProcAddress(b"wglCreateContextAttribsARB\0".as_ptr())
                .map(|f| core::mem::transmute::<unsafe extern "system" fn() -> isize, CreateContextAttribs>(f));
            wglMakeCurrent(core::ptr::null_mut(), core::ptr::null_mut());
            let Some(create) = create else {
                if request.profile == Profile::Legacy {
                    return Ok(legacy);
                }
                wglDeleteContext(legacy);
                return Err(PlatformError::ContextCreation("wglCreateContextAttribsARB unavailable".into()));
            };
            let (major, minor, mask) = match request.profile {
                Profile::Legacy => (3, 0, WGL_CONTEXT_COMPATIBILITY_PROFILE_BIT_ARB),
                Profile::Core => (3, 2, WGL_CONTEXT_CORE_PROFILE_BIT_ARB),
            };
            let flags = if request.debug { WGL_CONTEXT_DEBUG_BIT_ARB } else { 0 };
            let attribs = [
                WGL_CONTEXT_MAJOR_VERSION_ARB,
                major,
                WGL_CONTEXT_MINOR_VERSION_ARB,
                minor,
                WGL_CONTEXT_PROFILE_MASK_ARB,
                mask,
                WGL_CONTEXT_FLAGS_ARB,
                flags,
                0,
            ];
            let ctx = create(hdc, core::ptr::null_mut(), attribs.as_ptr());
            wglDeleteContext(legacy);
            if ctx.is_null() {
                return Err(PlatformError::ContextCreation(format!("{:?} profile", request.profile)));
            }
            Ok(ctx)
        }
    }
}

impl PlatformContext for WglPlatform {
    fn name(&self) -> &'static str {
        "wgl"
    }

    fn create_context(
        &mut self,
        request: &ContextRequest,
        share: Option<&NativeContext>,
    ) -> Result<NativeContext, PlatformError> {
        let share_ctx = match share {
            Some(s) => Some(self.contexts.get(&s.handle()).ok_or(PlatformError::UnknownContext)?.context),
            None => None,
        };
        let (hwnd, hdc) = match self.windows.call(WindowRequest::Create)? {
            WindowReply::Created { hwnd, hdc } => (hwnd, hdc),
            WindowReply::Failed(e) => return Err(PlatformError::WindowCreation(e)),
            WindowReply::Destroyed => return Err(PlatformError::HelperThreadGone),
        };
        let context = match self.create_wgl_context(request, hdc as HDC) {
            Ok(c) => c,
            Err(e) => {
                self.destroy_window(hwnd, hdc);
                return Err(e);
            }
        };
        if let Some(share_ctx) = share_ctx {
            // SAFETY: both contexts are live and neither has created objects yet on the
            // new side.
            if unsafe { wglShareLists(share_ctx, context) } == 0 {
                // SAFETY: context was created above.
                unsafe { wglDeleteContext(context) };
                self.destroy_window(hwnd, hdc);
                return Err(PlatformError::ShareLists);
            }
        }
        self.next_handle += 1;
        self.contexts.insert(self.next_handle, WglWindow { context, hwnd, hdc });
        tracing::debug!(handle = self.next_handle, profile = ?request.profile, shared = share.is_some(), "WGL context created");
        Ok(NativeContext::new(self.next_handle, request.profile))
    }

    fn destroy_context(&mut self, ctx: NativeContext) -> Result<(), PlatformError> {
        let w = self.contexts.remove(&ctx.handle()).ok_or(PlatformError::UnknownContext)?;
        // SAFETY: the context is no longer referenced.
        unsafe { wglDeleteContext(w.context) };
        self.destroy_window(w.hwnd, w.hdc);
        Ok(())
    }

    fn make_current(&mut self, ctx: Option<&NativeContext>) -> Result<(), PlatformError> {
        let ok = match ctx {
            Some(c) => {
                let w = self.contexts.get(&c.handle()).ok_or(PlatformError::UnknownContext)?;
                // SAFETY: live DC and context.
                unsafe { wglMakeCurrent(w.hdc as HDC, w.context) }
            }
            // SAFETY: unbinding is always valid.
            None => unsafe { wglMakeCurrent(core::ptr::null_mut(), core::ptr::null_mut()) },
        };
        if ok == 0 {
            return Err(PlatformError::MakeCurrent);
        }
        Ok(())
    }

    fn proc_address(&mut self, name: &str) -> *const c_void {
        let Ok(c) = CString::new(name) else {
            return core::ptr::null();
        };
        // SAFETY: NUL-terminated name.
        if let Some(f) = unsafe { wglGetProcAddress(c.as_ptr().cast()) } {
            let p = f as usize as isize;
            // Some ICDs return small sentinels instead of null for unknown names.
            if !matches!(p, 0 | 1 | 2 | 3 | -1) {
                return p as *const c_void;
            }
        }
        // OpenGL 1.1 functions are only exported from opengl32 itself.
        // SAFETY: only the address is read.
        match unsafe { self.opengl32.get::<*const c_void>(c.as_bytes_with_nul()) } {
            Ok(p) => *p,
            Err(_) => core::ptr::null(),
        }
    }

    fn shutdown(&mut self) -> Result<(), PlatformError> {
        let Some(thread) = self.thread.take() else {
            return Ok(());
        };
        let mut first_err = None;
        if let Err(err) = self.make_current(None) {
            tracing::warn!(%err, "releasing the current WGL context failed");
        }
        let handles: Vec<u64> = self.contexts.keys().copied().collect();
        for handle in handles {
            if let Err(err) = self.destroy_context(NativeContext::new(handle, Profile::Legacy)) {
                tracing::warn!(handle, %err, "destroying WGL context during shutdown failed");
                first_err.get_or_insert(err);
            }
        }
        if let Err(err) = thread.stop(WINDOW_THREAD_JOIN_TIMEOUT) {
            first_err.get_or_insert(err);
        }
        first_err.map_or(Ok(()), Err)
    }
}

impl Drop for WglPlatform {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!(error = %e, "WGL platform shutdown failed");
        }
    }
}
