//! Tracing setup and log-line helpers.

use std::env;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::OnceLock;

use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

static TRACING_INIT: OnceLock<()> = OnceLock::new();

/// Longest URL written to a trace line.
pub const MAX_URL_LOG: usize = 120;
/// Longest payload preview written to a trace line.
pub const MAX_PAYLOAD_LOG: usize = 80;

/// JSON trace file, if `QUIETSHELL_TRACE_LOG` is set.
pub fn trace_log_path() -> Option<PathBuf> {
    env::var("QUIETSHELL_TRACE_LOG").ok().map(PathBuf::from)
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env("QUIETSHELL_LOG").unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber once. Later calls are no-ops.
pub fn init_tracing() {
    let _ = TRACING_INIT.get_or_init(|| {
        if let Some(path) = trace_log_path() {
            if let Ok(file) = OpenOptions::new().create(true).append(true).open(&path) {
                let subscriber = tracing_subscriber::fmt()
                    .json()
                    .with_env_filter(env_filter())
                    .with_timer(UtcTime::rfc_3339())
                    .with_writer(file)
                    .with_current_span(false)
                    .with_span_list(false)
                    .finish();
                let _ = tracing::subscriber::set_global_default(subscriber);
                return;
            }
        }
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_writer(std::io::stderr)
            .with_target(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    });
}

/// Cut `s` to at most `max` characters, marking the cut with an ellipsis.
pub fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
