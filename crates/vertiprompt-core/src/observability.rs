use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

static INIT: OnceCell<()> = OnceCell::new();

fn parse_bool_env(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" | "enabled" => Some(true),
        "0" | "false" | "no" | "off" | "disabled" => Some(false),
        _ => None,
    }
}

fn observability_enabled() -> bool {
    std::env::var("VERTIPROMPT_OBSERVABILITY_ENABLED")
        .map(|value| parse_bool_env(&value).unwrap_or(true))
        .unwrap_or(true)
}

fn resolve_env_filter(default_level: &str) -> tracing_subscriber::EnvFilter {
    if let Ok(level) = std::env::var("VERTIPROMPT_LOG_LEVEL")
        && let Ok(filter) = tracing_subscriber::EnvFilter::try_new(level)
    {
        return filter;
    }
    tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level))
}

fn json_log_path() -> Option<PathBuf> {
    std::env::var_os("VERTIPROMPT_JSON_LOG_PATH")
        .filter(|raw| !raw.is_empty())
        .map(PathBuf::from)
}

/// Non-rolling file appender for `path`; creates the parent directory.
fn json_log_writer(path: &Path) -> RollingFileAppender {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            let _ = std::fs::create_dir_all(parent);
            parent
        }
        _ => Path::new("."),
    };
    let file_name = path
        .file_name()
        .map_or_else(|| "vertiprompt.logs.jsonl".into(), |n| n.to_string_lossy());
    tracing_appender::rolling::never(dir, file_name.as_ref())
}

/// Initialize logging once per process.
///
/// Environment variables:
/// - `VERTIPROMPT_OBSERVABILITY_ENABLED`: optional enable/disable flag (default enabled).
/// - `VERTIPROMPT_LOG_LEVEL`: optional level/filter override (`info`, `debug`, etc.).
/// - `VERTIPROMPT_JSON_LOG_PATH`: optional log file path. If set, logs are JSONL in that file.
///   If unset, logs go to stderr in a compact console format so stdout stays
///   free for command output.
/// - `RUST_LOG`: optional filter override.
///
/// `default_level` applies when no filter variable is set.
pub fn init_observability(default_level: &str) {
    INIT.get_or_init(|| {
        if !observability_enabled() {
            return;
        }

        let registry = tracing_subscriber::registry().with(resolve_env_filter(default_level));
        let _ = match json_log_path() {
            Some(path) => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_current_span(true)
                        .with_span_list(true)
                        .with_target(false)
                        .with_writer(json_log_writer(&path)),
                )
                .try_init(),
            None => registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .compact()
                        .with_target(false)
                        .with_writer(std::io::stderr),
                )
                .try_init(),
        };
    });
}
