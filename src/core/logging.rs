use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use crate::core::config::Settings;

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Installs the global subscriber: stdout always, plus a daily-rolling
/// `app.log` when file logging is enabled for a local environment.
pub fn init(settings: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(true);

    let file_layer = if settings.file_logging_enabled() {
        let log_dir = &settings.log_dir;
        let _ = std::fs::create_dir_all(log_dir);

        let file_appender = tracing_appender::rolling::daily(log_dir, "app.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let _ = LOG_GUARD.set(guard);

        Some(
            tracing_subscriber::fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(non_blocking),
        )
    } else {
        None
    };

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .try_init()
        .is_ok();

    if !installed {
        return;
    }

    if settings.file_logging_enabled() {
        tracing::info!(
            "File logging enabled ({} environment) at {}",
            settings.environment,
            settings.log_dir.display()
        );
    } else {
        tracing::info!(
            "Running in {}; logging to console only",
            settings.environment.to_uppercase()
        );
    }
}
