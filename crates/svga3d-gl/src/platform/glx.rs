//! X11/GLX backend.
//!
//! `libX11` and `libGL` are opened at runtime so the crate builds and runs on machines
//! without them. Every context gets its own hidden (never mapped) window. A pump thread
//! drains the display's event queue so the X server never blocks on us.

use core::ffi::{c_char, c_int, c_long, c_uint, c_ulong, c_void};
use std::collections::HashMap;
use std::ffi::CString;
use std::time::Duration;

use crossbeam_channel::RecvTimeoutError;
use libloading::Library;

use super::{ContextRequest, HelperThread, NativeContext, PlatformContext, Profile};
use crate::config::BackendConfig;
use crate::error::PlatformError;

type Display = c_void;
type Window = c_ulong;
type Colormap = c_ulong;
type GlxContext = *mut c_void;
type GlxFbConfig = *mut c_void;

#[repr(C)]
struct XVisualInfo {
    visual: *mut c_void,
    visualid: c_ulong,
    screen: c_int,
    depth: c_int,
    class: c_int,
    red_mask: c_ulong,
    green_mask: c_ulong,
    blue_mask: c_ulong,
    colormap_size: c_int,
    bits_per_rgb: c_int,
}

#[repr(C)]
struct XSetWindowAttributes {
    background_pixmap: c_ulong,
    background_pixel: c_ulong,
    border_pixmap: c_ulong,
    border_pixel: c_ulong,
    bit_gravity: c_int,
    win_gravity: c_int,
    backing_store: c_int,
    backing_planes: c_ulong,
    backing_pixel: c_ulong,
    save_under: c_int,
    event_mask: c_long,
    do_not_propagate_mask: c_long,
    override_redirect: c_int,
    colormap: Colormap,
    cursor: c_ulong,
}

const X_TRUE: c_int = 1;
const INPUT_OUTPUT: c_uint = 1;
const ALLOC_NONE: c_int = 0;
const CW_BORDER_PIXEL: c_ulong = 1 << 3;
const CW_EVENT_MASK: c_ulong = 1 << 11;
const CW_COLORMAP: c_ulong = 1 << 13;
const STRUCTURE_NOTIFY_MASK: c_long = 1 << 17;

const GLX_DOUBLEBUFFER: c_int = 5;
const GLX_RED_SIZE: c_int = 8;
const GLX_GREEN_SIZE: c_int = 9;
const GLX_BLUE_SIZE: c_int = 10;
const GLX_ALPHA_SIZE: c_int = 11;
const GLX_DEPTH_SIZE: c_int = 12;
const GLX_STENCIL_SIZE: c_int = 13;
const GLX_DRAWABLE_TYPE: c_int = 0x8010;
const GLX_RENDER_TYPE: c_int = 0x8011;
const GLX_X_RENDERABLE: c_int = 0x8012;
const GLX_RGBA_TYPE: c_int = 0x8014;
const GLX_WINDOW_BIT: c_int = 1;
const GLX_RGBA_BIT: c_int = 1;
const GLX_CONTEXT_MAJOR_VERSION_ARB: c_int = 0x2091;
const GLX_CONTEXT_MINOR_VERSION_ARB: c_int = 0x2092;
const GLX_CONTEXT_FLAGS_ARB: c_int = 0x2094;
const GLX_CONTEXT_PROFILE_MASK_ARB: c_int = 0x9126;
const GLX_CONTEXT_CORE_PROFILE_BIT_ARB: c_int = 1;
const GLX_CONTEXT_COMPATIBILITY_PROFILE_BIT_ARB: c_int = 2;
const GLX_CONTEXT_DEBUG_BIT_ARB: c_int = 1;

const EVENT_PUMP_INTERVAL: Duration = Duration::from_millis(16);
const EVENT_PUMP_JOIN_TIMEOUT: Duration = Duration::from_secs(2);

type XEvent = [c_long; 24];

/// Resolved Xlib and GLX functions. Plain fn pointers so the pump thread can copy them.
#[derive(Clone, Copy)]
struct XFns {
    init_threads: unsafe extern "C" fn() -> c_int,
    open_display: unsafe extern "C" fn(*const c_char) -> *mut Display,
    close_display: unsafe extern "C" fn(*mut Display) -> c_int,
    default_screen: unsafe extern "C" fn(*mut Display) -> c_int,
    root_window: unsafe extern "C" fn(*mut Display, c_int) -> Window,
    create_colormap: unsafe extern "C" fn(*mut Display, Window, *mut c_void, c_int) -> Colormap,
    free_colormap: unsafe extern "C" fn(*mut Display, Colormap) -> c_int,
    #[allow(clippy::type_complexity)]
    create_window: unsafe extern "C" fn(
        *mut Display,
        Window,
        c_int,
        c_int,
        c_uint,
        c_uint,
        c_uint,
        c_int,
        c_uint,
        *mut c_void,
        c_ulong,
        *mut XSetWindowAttributes,
    ) -> Window,
    destroy_window: unsafe extern "C" fn(*mut Display, Window) -> c_int,
    free: unsafe extern "C" fn(*mut c_void) -> c_int,
    pending: unsafe extern "C" fn(*mut Display) -> c_int,
    next_event: unsafe extern "C" fn(*mut Display, *mut XEvent) -> c_int,
    sync: unsafe extern "C" fn(*mut Display, c_int) -> c_int,
}

#[derive(Clone, Copy)]
struct GlxFns {
    choose_fb_config: unsafe extern "C" fn(*mut Display, c_int, *const c_int, *mut c_int) -> *mut GlxFbConfig,
    visual_from_fb_config: unsafe extern "C" fn(*mut Display, GlxFbConfig) -> *mut XVisualInfo,
    create_new_context: unsafe extern "C" fn(*mut Display, GlxFbConfig, c_int, GlxContext, c_int) -> GlxContext,
    make_current: unsafe extern "C" fn(*mut Display, Window, GlxContext) -> c_int,
    destroy_context: unsafe extern "C" fn(*mut Display, GlxContext),
    get_proc_address: unsafe extern "C" fn(*const u8) -> *const c_void,
}

type CreateContextAttribs =
    unsafe extern "C" fn(*mut Display, GlxFbConfig, GlxContext, c_int, *const c_int) -> GlxContext;

fn open_library(name: &str) -> Result<Library, PlatformError> {
    // SAFETY: loading a system library runs its initialisers; Xlib and libGL are designed
    // to be dlopen'ed.
    unsafe { Library::new(name) }.map_err(|e| PlatformError::LibraryLoad {
        library: name.to_owned(),
        reason: e.to_string(),
    })
}

/// Copies a function pointer out of `lib`.
///
/// # Safety
/// `T` must be the symbol's actual signature.
unsafe fn sym<T: Copy>(lib: &Library, name: &'static str) -> Result<T, PlatformError> {
    let raw = format!("{name}\0");
    lib.get::<T>(raw.as_bytes())
        .map(|s| *s)
        .map_err(|_| PlatformError::MissingSymbol(name))
}

struct GlxWindow {
    context: GlxContext,
    window: Window,
    colormap: Colormap,
}

pub struct GlxPlatform {
    x: XFns,
    glx: GlxFns,
    create_context_attribs: Option<CreateContextAttribs>,
    display: *mut Display,
    fb_config: GlxFbConfig,
    fb_configs: *mut GlxFbConfig,
    contexts: HashMap<u64, GlxWindow>,
    next_handle: u64,
    pump: Option<HelperThread>,
    // The fn pointers above borrow from these.
    gl_lib: Library,
    _x11: Library,
}

impl GlxPlatform {
    pub fn open(config: &BackendConfig) -> Result<Self, PlatformError> {
        let x11 = open_library("libX11.so.6")?;
        let gl_name = config.gl_library.as_deref().unwrap_or("libGL.so.1");
        let gl = open_library(gl_name)?;

        // SAFETY: signatures follow Xlib.h / glx.h.
        let (x, glx) = unsafe {
            (
                XFns {
                    init_threads: sym(&x11, "XInitThreads")?,
                    open_display: sym(&x11, "XOpenDisplay")?,
                    close_display: sym(&x11, "XCloseDisplay")?,
                    default_screen: sym(&x11, "XDefaultScreen")?,
                    root_window: sym(&x11, "XRootWindow")?,
                    create_colormap: sym(&x11, "XCreateColormap")?,
                    free_colormap: sym(&x11, "XFreeColormap")?,
                    create_window: sym(&x11, "XCreateWindow")?,
                    destroy_window: sym(&x11, "XDestroyWindow")?,
                    free: sym(&x11, "XFree")?,
                    pending: sym(&x11, "XPending")?,
                    next_event: sym(&x11, "XNextEvent")?,
                    sync: sym(&x11, "XSync")?,
                },
                GlxFns {
                    choose_fb_config: sym(&gl, "glXChooseFBConfig")?,
                    visual_from_fb_config: sym(&gl, "glXGetVisualFromFBConfig")?,
                    create_new_context: sym(&gl, "glXCreateNewContext")?,
                    make_current: sym(&gl, "glXMakeCurrent")?,
                    destroy_context: sym(&gl, "glXDestroyContext")?,
                    get_proc_address: sym(&gl, "glXGetProcAddressARB")?,
                },
            )
        };

        // SAFETY: must precede every other Xlib call because the pump thread shares the
        // display connection.
        unsafe { (x.init_threads)() };
        // SAFETY: a null name selects $DISPLAY.
        let display = unsafe { (x.open_display)(core::ptr::null()) };
        if display.is_null() {
            return Err(PlatformError::NoDisplay);
        }

        let attribs = [
            GLX_X_RENDERABLE,
            X_TRUE,
            GLX_DRAWABLE_TYPE,
            GLX_WINDOW_BIT,
            GLX_RENDER_TYPE,
            GLX_RGBA_BIT,
            GLX_RED_SIZE,
            8,
            GLX_GREEN_SIZE,
            8,
            GLX_BLUE_SIZE,
            8,
            GLX_ALPHA_SIZE,
            8,
            GLX_DEPTH_SIZE,
            24,
            GLX_STENCIL_SIZE,
            8,
            GLX_DOUBLEBUFFER,
            X_TRUE,
            0,
        ];
        let mut count = 0;
        // SAFETY: display is open; the attribute list is zero terminated.
        let fb_configs = unsafe {
            (glx.choose_fb_config)(display, (x.default_screen)(display), attribs.as_ptr(), &mut count)
        };
        if fb_configs.is_null() || count <= 0 {
            // SAFETY: display came from XOpenDisplay.
            unsafe { (x.close_display)(display) };
            return Err(PlatformError::NoPixelFormat);
        }
        // SAFETY: count > 0 entries were returned.
        let fb_config = unsafe { *fb_configs };

        // SAFETY: name is NUL terminated; the returned pointer has this signature when
        // non-null.
        let create_context_attribs = unsafe {
            let p = (glx.get_proc_address)(b"glXCreateContextAttribsARB\0".as_ptr());
            (!p.is_null()).then(|| core::mem::transmute::<*const c_void, CreateContextAttribs>(p))
        };

        let pump = Self::spawn_pump(x, display)?;
        tracing::info!(
            attribs_arb = create_context_attribs.is_some(),
            library = gl_name,
            "GLX platform opened"
        );

        Ok(Self {
            x,
            glx,
            create_context_attribs,
            display,
            fb_config,
            fb_configs,
            contexts: HashMap::new(),
            next_handle: 0,
            pump: Some(pump),
            gl_lib: gl,
            _x11: x11,
        })
    }

    fn spawn_pump(x: XFns, display: *mut Display) -> Result<HelperThread, PlatformError> {
        // Raw pointers aren't Send; the connection is thread-safe after XInitThreads.
        let display = display as usize;
        HelperThread::spawn("svga3d-x11-events", move |stop| loop {
            match stop.recv_timeout(EVENT_PUMP_INTERVAL) {
                Err(RecvTimeoutError::Timeout) => {
                    let dpy = display as *mut Display;
                    let mut event: XEvent = [0; 24];
                    // SAFETY: shutdown closes the display only after the pump has joined and
                    // leaks it otherwise.
                    unsafe {
                        while (x.pending)(dpy) > 0 {
                            (x.next_event)(dpy, &mut event);
                        }
                    }
                }
                _ => break,
            }
        })
    }

    fn create_window(&mut self) -> Result<(Window, Colormap), PlatformError> {
        let (x, dpy) = (self.x, self.display);
        // SAFETY: display and fb_config are valid for the platform's lifetime; the visual
        // info is freed before returning.
        unsafe {
            let vi = (self.glx.visual_from_fb_config)(dpy, self.fb_config);
            if vi.is_null() {
                return Err(PlatformError::NoPixelFormat);
            }
            let screen = (*vi).screen;
            let root = (x.root_window)(dpy, screen);
            let colormap = (x.create_colormap)(dpy, root, (*vi).visual, ALLOC_NONE);
            let mut swa: XSetWindowAttributes = core::mem::zeroed();
            swa.colormap = colormap;
            swa.border_pixel = 0;
            swa.event_mask = STRUCTURE_NOTIFY_MASK;
            let window = (x.create_window)(
                dpy,
                root,
                0,
                0,
                16,
                16,
                0,
                (*vi).depth,
                INPUT_OUTPUT,
                (*vi).visual,
                CW_BORDER_PIXEL | CW_COLORMAP | CW_EVENT_MASK,
                &mut swa,
            );
            (x.free)(vi.cast());
            if window == 0 {
                (x.free_colormap)(dpy, colormap);
                return Err(PlatformError::WindowCreation("XCreateWindow returned None".into()));
            }
            Ok((window, colormap))
        }
    }

    fn create_glx_context(&self, request: &ContextRequest, share: GlxContext) -> GlxContext {
        let dpy = self.display;
        if let Some(create) = self.create_context_attribs {
            let (major, minor, mask) = match request.profile {
                Profile::Legacy => (3, 0, GLX_CONTEXT_COMPATIBILITY_PROFILE_BIT_ARB),
                Profile::Core => (3, 2, GLX_CONTEXT_CORE_PROFILE_BIT_ARB),
            };
            let flags = if request.debug { GLX_CONTEXT_DEBUG_BIT_ARB } else { 0 };
            let attribs = [
                GLX_CONTEXT_MAJOR_VERSION_ARB,
                major,
                GLX_CONTEXT_MINOR_VERSION_ARB,
                minor,
                GLX_CONTEXT_PROFILE_MASK_ARB,
                mask,
                GLX_CONTEXT_FLAGS_ARB,
                flags,
                0,
            ];
            // SAFETY: zero-terminated attribute list; share is null or a live context.
            let ctx = unsafe { create(dpy, self.fb_config, share, X_TRUE, attribs.as_ptr()) };
            if !ctx.is_null() {
                return ctx;
            }
            tracing::debug!(profile = ?request.profile, "glXCreateContextAttribsARB failed, trying legacy creation");
        }
        if request.profile == Profile::Core {
            return core::ptr::null_mut();
        }
        // SAFETY: as above.
        unsafe { (self.glx.create_new_context)(dpy, self.fb_config, GLX_RGBA_TYPE, share, X_TRUE) }
    }
}

impl PlatformContext for GlxPlatform {
    fn name(&self) -> &'static str {
        "glx"
    }

    fn create_context(
        &mut self,
        request: &ContextRequest,
        share: Option<&NativeContext>,
    ) -> Result<NativeContext, PlatformError> {
        let share_ctx = match share {
            Some(s) => {
                self.contexts
                    .get(&s.handle())
                    .ok_or(PlatformError::UnknownContext)?
                    .context
            }
            None => core::ptr::null_mut(),
        };
        let (window, colormap) = self.create_window()?;
        let context = self.create_glx_context(request, share_ctx);
        if context.is_null() {
            // SAFETY: both objects were just created on this display.
            unsafe {
                (self.x.destroy_window)(self.display, window);
                (self.x.free_colormap)(self.display, colormap);
            }
            return Err(PlatformError::ContextCreation(format!("{:?} profile", request.profile)));
        }
        self.next_handle += 1;
        self.contexts.insert(
            self.next_handle,
            GlxWindow {
                context,
                window,
                colormap,
            },
        );
        tracing::debug!(handle = self.next_handle, profile = ?request.profile, shared = share.is_some(), "GLX context created");
        Ok(NativeContext::new(self.next_handle, request.profile))
    }

    fn destroy_context(&mut self, ctx: NativeContext) -> Result<(), PlatformError> {
        let w = self
            .contexts
            .remove(&ctx.handle())
            .ok_or(PlatformError::UnknownContext)?;
        // SAFETY: objects belong to this display and are no longer referenced.
        unsafe {
            (self.glx.destroy_context)(self.display, w.context);
            (self.x.destroy_window)(self.display, w.window);
            (self.x.free_colormap)(self.display, w.colormap);
            (self.x.sync)(self.display, 0);
        }
        Ok(())
    }

    fn make_current(&mut self, ctx: Option<&NativeContext>) -> Result<(), PlatformError> {
        let (window, context) = match ctx {
            Some(c) => {
                let w = self.contexts.get(&c.handle()).ok_or(PlatformError::UnknownContext)?;
                (w.window, w.context)
            }
            None => (0, core::ptr::null_mut()),
        };
        // SAFETY: window/context are live or both None.
        if unsafe { (self.glx.make_current)(self.display, window, context) } == 0 {
            return Err(PlatformError::MakeCurrent);
        }
        Ok(())
    }

    fn proc_address(&mut self, name: &str) -> *const c_void {
        let Ok(c) = CString::new(name) else {
            return core::ptr::null();
        };
        // Core 1.x entry points are plain exports; glXGetProcAddress returns non-null
        // stubs for unknown names, so prefer the export table.
        // SAFETY: only the address is read.
        if let Ok(p) = unsafe { self.gl_lib.get::<*const c_void>(c.as_bytes_with_nul()) } {
            return *p;
        }
        // SAFETY: NUL-terminated name.
        unsafe { (self.glx.get_proc_address)(c.as_ptr().cast()) }
    }

    fn shutdown(&mut self) -> Result<(), PlatformError> {
        if self.display.is_null() {
            return Ok(());
        }
        let mut first_err = None;
        if let Err(err) = self.make_current(None) {
            tracing::warn!(%err, "releasing the current GLX context failed");
        }
        let handles: Vec<u64> = self.contexts.keys().copied().collect();
        for handle in handles {
            if let Err(err) = self.destroy_context(NativeContext::new(handle, Profile::Legacy)) {
                tracing::warn!(handle, %err, "destroying GLX context during shutdown failed");
                first_err.get_or_insert(err);
            }
        }
        let pump = match self.pump.take() {
            Some(p) => p.stop(EVENT_PUMP_JOIN_TIMEOUT),
            None => Ok(()),
        };
        // SAFETY: fb_configs came from glXChooseFBConfig and is not used after this.
        unsafe { (self.x.free)(self.fb_configs.cast()) };
        self.fb_configs = core::ptr::null_mut();
        match pump {
            // SAFETY: the pump has joined; nothing else holds the display.
            Ok(()) => unsafe {
                (self.x.close_display)(self.display);
            },
            Err(err) => {
                tracing::warn!(%err, "X event pump still running; leaking the display connection");
                first_err.get_or_insert(err);
            }
        }
        self.display = core::ptr::null_mut();
        first_err.map_or(Ok(()), Err)
    }
}

impl Drop for GlxPlatform {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            tracing::warn!(error = %e, "GLX platform shutdown failed");
        }
    }
}
