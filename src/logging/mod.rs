/*!
 * Logging
 * Console plus daily-rolling files, JSON in production.
 */
pub mod middleware;

use std::io;
use std::path::PathBuf;

use tracing_appender::{non_blocking, non_blocking::WorkerGuard, rolling};
use tracing_subscriber::{
    filter::LevelFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer,
};

#[derive(Debug, Clone)]
pub struct LogSettings {
    pub dir: PathBuf,
    pub level: String,
    pub production: bool,
}

impl LogSettings {
    pub fn from_env() -> Self {
        let production = std::env::var("ENVIRONMENT").is_ok_and(|env| env == "production");
        Self {
            dir: PathBuf::from(std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string())),
            level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| {
                if production { "info" } else { "debug" }.to_string()
            }),
            production,
        }
    }

    /// Filter used when `RUST_LOG` is unset.
    pub fn default_directives(&self) -> String {
        format!(
            "portfolio_cms={level},tower_http={level},axum=info,sqlx=warn",
            level = self.level
        )
    }
}

/// Install the global subscriber. The returned guards flush the background
/// writers on drop and must live as long as the process.
pub fn init(settings: &LogSettings) -> Vec<WorkerGuard> {
    if let Err(e) = std::fs::create_dir_all(&settings.dir) {
        eprintln!("cannot create log directory {}: {e}", settings.dir.display());
    }

    let (file_writer, file_guard) = non_blocking(rolling::daily(&settings.dir, "app.log"));
    let (error_writer, error_guard) = non_blocking(rolling::daily(&settings.dir, "error.log"));
    let (console_writer, console_guard) = non_blocking(io::stdout());

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(settings.default_directives()));

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if settings.production {
        let file_layer = fmt::layer()
            .json()
            .with_writer(file_writer)
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        let error_layer = fmt::layer()
            .json()
            .with_writer(error_writer)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .with_filter(LevelFilter::ERROR);

        let console_layer = fmt::layer()
            .json()
            .with_writer(console_writer)
            .with_target(false);

        subscriber
            .with(file_layer)
            .with(error_layer)
            .with(console_layer)
            .init();
    } else {
        let file_layer = fmt::layer()
            .with_writer(file_writer)
            .with_target(true)
            .with_ansi(false);

        let error_layer = fmt::layer()
            .with_writer(error_writer)
            .with_ansi(false)
            .with_filter(LevelFilter::ERROR);

        let console_layer = fmt::layer()
            .with_writer(console_writer)
            .with_target(true)
            .pretty();

        subscriber
            .with(file_layer)
            .with(error_layer)
            .with(console_layer)
            .init();
    }

    tracing::info!(
        production = settings.production,
        dir = %settings.dir.display(),
        "Logging initialized"
    );

    vec![file_guard, error_guard, console_guard]
}
