///! Logging setup
///!
///! Human-readable events go to stderr so command output on stdout stays
///! parseable. Setting `ARKDASH_LOG_PATH` adds a JSON log file.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const LOG_PATH_ENV: &str = "ARKDASH_LOG_PATH";

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory receiving `arkdash.log`
    pub file_path: Option<String>,
}

impl LoggingConfig {
    pub fn from_env(verbose: bool) -> Self {
        Self {
            level: if verbose { "debug" } else { "warn" }.to_string(),
            file_path: std::env::var(LOG_PATH_ENV).ok().filter(|p| !p.is_empty()),
        }
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.level))
    }

    /// Install the global subscriber; keep the guard alive until exit so
    /// buffered file output is flushed
    pub fn init(&self) -> anyhow::Result<Option<WorkerGuard>> {
        let console_layer = fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr);

        if let Some(ref path) = self.file_path {
            let (writer, guard) = non_blocking(rolling::never(path, "arkdash.log"));
            let file_layer = fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .json()
                .with_writer(writer);

            tracing_subscriber::registry()
                .with(self.filter())
                .with(console_layer)
                .with(file_layer)
                .try_init()?;
            Ok(Some(guard))
        } else {
            tracing_subscriber::registry()
                .with(self.filter())
                .with(console_layer)
                .try_init()?;
            Ok(None)
        }
    }
}
