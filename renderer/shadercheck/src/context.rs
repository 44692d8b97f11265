use common::*;
use glo::Gl;
use sdl2::video::{GLContext, GLProfile, Window, WindowBuildError};
use sdl2::{Sdl, VideoSubsystem};

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("SDL error: {0}")]
    Sdl(String),

    #[error("Failed to create window: {0}")]
    WindowCreation(#[from] WindowBuildError),
}

/// A GL context on a window that is never shown
pub struct HiddenContext {
    gl: Gl,
    _context: GLContext,
    _window: Window,
    _video: VideoSubsystem,
    _sdl: Sdl,
}

impl HiddenContext {
    pub fn new(cfg: &config::Gl) -> Result<Self, ContextError> {
        let sdl = sdl2::init().map_err(ContextError::Sdl)?;
        let video = sdl.video().map_err(ContextError::Sdl)?;

        let (major, minor) = cfg.context_version;
        let attr = video.gl_attr();
        attr.set_context_profile(GLProfile::Core);
        attr.set_context_version(major, minor);
        if cfg.debug_output {
            attr.set_context_flags().debug().set();
        }

        let window = video
            .window(env!("CARGO_PKG_NAME"), 1, 1)
            .hidden()
            .opengl()
            .build()?;

        let context = window.gl_create_context().map_err(ContextError::Sdl)?;
        window
            .gl_make_current(&context)
            .map_err(ContextError::Sdl)?;

        info!(
            "created OpenGL context";
            "major" => attr.context_major_version(),
            "minor" => attr.context_minor_version()
        );

        let gl = Gl::load_with(|s| video.gl_get_proc_address(s) as *const _, cfg.into());

        Ok(Self {
            gl,
            _context: context,
            _window: window,
            _video: video,
            _sdl: sdl,
        })
    }

    pub fn gl(&self) -> &Gl {
        &self.gl
    }
}
