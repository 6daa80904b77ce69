//! Log file setup
//!
//! Every processed command ends up as one line in an append-only log file,
//! formatted `HH:MM:SS,mmm LEVEL message fields`. Stderr output is enabled
//! when `RUST_LOG` is set, which is handy while debugging connection issues.

use std::path::Path;

use tracing::Subscriber;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::CheckError;

/// Timestamp format of log lines: hours, minutes, seconds and milliseconds
const LOG_TIME_FORMAT: &str = "%H:%M:%S,%3f";

/// Filter used when `RUST_LOG` is unset; russh is chatty at info
const DEFAULT_FILTER: &str = "info,russh=warn";

/// Keeps the log writer alive
///
/// Dropping it flushes buffered lines and closes the file, so it must be held
/// until the run is over.
#[must_use = "dropping the guard stops logging"]
pub struct LogGuard {
    _guard: WorkerGuard,
}

/// Formatting layer used for the log file
pub fn file_layer<S, W>(writer: W) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(false)
        .with_timer(ChronoLocal::new(LOG_TIME_FORMAT.to_string()))
}

/// Install the global subscriber writing to `log_file`
///
/// The parent directory is created if needed and the file is opened in
/// append mode.
///
/// # Errors
/// Returns `CheckError::Logging` if the file cannot be opened or a global
/// subscriber is already installed
pub fn init(log_file: &Path) -> Result<LogGuard, CheckError> {
    let dir = match log_file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let file_name = log_file
        .file_name()
        .ok_or_else(|| CheckError::Logging(format!("{} is not a file path", log_file.display())))?;

    std::fs::create_dir_all(dir).map_err(|e| {
        CheckError::Logging(format!("could not create {}: {e}", dir.display()))
    })?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(dir)
        .map_err(|e| CheckError::Logging(e.to_string()))?;
    let (non_blocking, guard) = tracing_appender::non_blocking(appender);

    let stderr_layer = std::env::var("RUST_LOG").is_ok().then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
    });

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer(non_blocking))
        .with(stderr_layer)
        .try_init()
        .map_err(|e| CheckError::Logging(e.to_string()))?;

    Ok(LogGuard { _guard: guard })
}

/// In-memory log file for tests
#[cfg(test)]
pub(crate) mod capture {
    use std::io;
    use std::sync::{Arc, Mutex};

    use tracing::Subscriber;
    use tracing_subscriber::fmt::MakeWriter;
    use tracing_subscriber::layer::SubscriberExt;

    /// Collects what the file layer writes
    #[derive(Clone, Default)]
    pub(crate) struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl CapturedLog {
        /// Subscriber that formats exactly like the log file
        pub(crate) fn subscriber(&self) -> impl Subscriber + Send + Sync + 'static {
            tracing_subscriber::registry().with(super::file_layer(self.clone()))
        }

        pub(crate) fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    impl io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for CapturedLog {
        type Writer = CapturedLog;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }
}
