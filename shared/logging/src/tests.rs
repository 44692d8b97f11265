use once_cell::sync::OnceCell;
use slog_scope::GlobalLoggerGuard;

static LOGGER: OnceCell<GlobalLoggerGuard> = OnceCell::new();

/// Installs a synchronous stdout logger at trace level, once per process
#[allow(dead_code)]
pub fn for_tests() {
    LOGGER.get_or_init(|| slog_scope::set_global_logger(test_logger()));
}

#[cfg(feature = "binary")]
fn test_logger() -> slog::Logger {
    use slog::Drain;
    use std::sync::Mutex;

    let drain = slog_term::PlainSyncDecorator::new(slog_term::TestStdoutWriter);
    let drain = slog_term::CompactFormat::new(drain).build();
    let drain = Mutex::new(drain).fuse();
    slog::Logger::root(drain, slog::o!())
}

#[cfg(not(feature = "binary"))]
fn test_logger() -> slog::Logger {
    slog::Logger::root(slog::Discard, slog::o!())
}
