use std::error::Error;
use std::fmt::{Display, Formatter};

use slog::{Drain, Level};
use slog_scope::GlobalLoggerGuard;

const LEVEL_ENV: &str = "GLO_LOG";

pub struct LoggerBuilder {
    level: Level,
    asynchronous: bool,
}

/// Keeps the global logger installed until dropped
pub struct Logger(Level, #[allow(dead_code)] GlobalLoggerGuard);

#[derive(Debug)]
pub enum LogError {
    BadLevel(String),
}

impl LoggerBuilder {
    /// Reads the level from `GLO_LOG` if set, e.g. `GLO_LOG=debug`
    pub fn with_env() -> Result<Self, LogError> {
        let mut builder = Self::default();

        if let Ok(env) = std::env::var(LEVEL_ENV) {
            builder = builder.level_str(&env)?;
        }

        Ok(builder)
    }

    pub fn level(mut self, level: Level) -> Self {
        self.level = level;
        self
    }

    pub fn level_str(self, level: &str) -> Result<Self, LogError> {
        let level = level
            .parse()
            .map_err(|_| LogError::BadLevel(level.to_owned()))?;
        Ok(self.level(level))
    }

    /// Log from the calling thread instead of a background one, so nothing is lost if the
    /// process exits abruptly (e.g. a driver crash inside a GL call)
    pub fn synchronous(mut self) -> Self {
        self.asynchronous = false;
        self
    }

    pub fn init(self) -> Result<Logger, LogError> {
        let decorator = slog_term::TermDecorator::new().stderr().build();
        let drain = slog_term::CompactFormat::new(decorator).build().fuse();
        let drain = drain.filter_level(self.level).fuse();

        let logger = if self.asynchronous {
            let drain = slog_async::Async::new(drain)
                .thread_name("logging".to_owned())
                .chan_size(1024)
                .build_no_guard()
                .fuse();
            slog::Logger::root(drain, slog::o!())
        } else {
            let drain = std::sync::Mutex::new(drain).fuse();
            slog::Logger::root(drain, slog::o!())
        };

        let global = slog_scope::set_global_logger(logger);
        Ok(Logger(self.level, global))
    }
}

impl Default for LoggerBuilder {
    fn default() -> Self {
        Self {
            level: Level::Info,
            asynchronous: true,
        }
    }
}

impl Logger {
    pub fn level(&self) -> Level {
        self.0
    }
}

impl Display for LogError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            LogError::BadLevel(s) => write!(f, "Invalid level {:?}", s),
        }
    }
}

impl Error for LogError {}
