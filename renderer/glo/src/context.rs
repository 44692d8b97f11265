use std::ffi::{c_void, CStr};
use std::ops::Deref;
use std::ptr::null;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};

use common::*;
use gl::types::*;

use crate::driver::Driver;
use crate::error::{GlError, GlResult};
use crate::gl_driver::GlDriver;

/// Handle to the driver of the current context. Cheap to clone; every wrapper keeps one.
///
/// Not `Send`: GL objects belong to the thread their context is current on.
#[derive(Clone)]
pub struct Gl(Rc<GlInner>);

struct GlInner {
    driver: Box<dyn Driver>,
    options: GlOptions,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GlOptions {
    pub debug_output: bool,
    pub trace_notifications: bool,
    /// Applies to links triggered by `Program::add_shader`
    pub validate_on_link: bool,
    pub log_diagnostics: bool,
}

static TRACE_NOTIFICATIONS: AtomicBool = AtomicBool::new(false);

struct GlHex(u64);
struct GlString<'a>(&'a CStr);

extern "system" fn on_debug_message(
    source: GLenum,
    gltype: GLenum,
    _id: GLuint,
    severity: GLenum,
    _length: GLsizei,
    message: *const GLchar,
    _user_param: *mut c_void,
) {
    let trace = cfg!(feature = "gl-trace-log") || TRACE_NOTIFICATIONS.load(Ordering::Relaxed);
    let level = match debug_message_level(gltype, severity, trace) {
        Some(level) => level,
        // shush
        None => return,
    };

    if message.is_null() {
        return;
    }

    let msg = GlString(unsafe { CStr::from_ptr(message) });
    log_debug_message(level, source, gltype, severity, msg);
}

/// None if the message should be dropped
fn debug_message_level(gltype: GLenum, severity: GLenum, trace_notifications: bool) -> Option<slog::Level> {
    if gltype == gl::DEBUG_TYPE_ERROR {
        return Some(slog::Level::Error);
    }

    match severity {
        gl::DEBUG_SEVERITY_HIGH => Some(slog::Level::Warning),
        gl::DEBUG_SEVERITY_MEDIUM => Some(slog::Level::Info),
        gl::DEBUG_SEVERITY_NOTIFICATION if !trace_notifications => None,
        _ => Some(slog::Level::Debug),
    }
}

fn log_debug_message(level: slog::Level, source: GLenum, gltype: GLenum, severity: GLenum, msg: GlString) {
    if level == slog::Level::Error {
        error!("GL error"; "severity" => GlHex(severity.into()), "message" => msg);
        return;
    }

    let o = o!("source" => GlHex(source.into()), "type" => GlHex(gltype.into()), "message" => msg);
    match level {
        slog::Level::Warning => warn!("GL message"; o),
        slog::Level::Info => info!("GL message"; o),
        _ => debug!("GL message"; o),
    };
}

impl Gl {
    /// Loads the GL function pointers for the context that is current on this thread
    pub fn load_with(
        loader: impl FnMut(&'static str) -> *const c_void,
        options: GlOptions,
    ) -> Self {
        gl::load_with(loader);

        if options.debug_output {
            if gl::DebugMessageCallback::is_loaded() {
                TRACE_NOTIFICATIONS.store(options.trace_notifications, Ordering::Relaxed);
                unsafe {
                    gl::Enable(gl::DEBUG_OUTPUT);
                    gl::DebugMessageCallback(Some(on_debug_message), null());
                }
                debug!("installed GL debug message callback");
            } else {
                warn!("GL debug output is unavailable in this context");
            }
        }

        Self::with_driver(GlDriver::new(), options)
    }

    pub fn with_driver(driver: impl Driver + 'static, options: GlOptions) -> Self {
        Self(Rc::new(GlInner {
            driver: Box::new(driver),
            options,
        }))
    }

    pub fn options(&self) -> &GlOptions {
        &self.0.options
    }

    /// `glGetError`
    pub fn check(&self) -> GlResult<()> {
        match self.0.driver.get_error() {
            gl::NO_ERROR => Ok(()),
            err => Err(GlError::Gl(err)),
        }
    }

    /// Installs no program, i.e. fixed functionality in a compatibility context
    pub fn use_fixed_paths(&self) {
        self.0.driver.use_program(0);
    }

    /// 0 if none
    pub fn current_program(&self) -> GLuint {
        self.0.driver.get_integer(gl::CURRENT_PROGRAM) as GLuint
    }

    pub fn same_context(&self, other: &Gl) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl Deref for Gl {
    type Target = dyn Driver;

    fn deref(&self) -> &Self::Target {
        &*self.0.driver
    }
}

impl Default for GlOptions {
    fn default() -> Self {
        (&config::Gl::default()).into()
    }
}

impl From<&config::Gl> for GlOptions {
    fn from(cfg: &config::Gl) -> Self {
        Self {
            debug_output: cfg.debug_output,
            trace_notifications: cfg.trace_notifications,
            validate_on_link: cfg.validate_on_link,
            log_diagnostics: cfg.log_diagnostics,
        }
    }
}

impl Debug for Gl {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Gl").field(&self.0.options).finish()
    }
}

impl slog::Value for GlHex {
    fn serialize(
        &self,
        _: &Record,
        key: Key,
        serializer: &mut dyn Serializer,
    ) -> SlogResult<()> {
        serializer.emit_arguments(key, &format_args!("{:#x}", self.0))
    }
}

impl slog::Value for GlString<'_> {
    fn serialize(
        &self,
        _: &Record,
        key: Key,
        serializer: &mut dyn Serializer,
    ) -> SlogResult<()> {
        serializer.emit_arguments(key, &format_args!("{:?}", self.0))
    }
}
