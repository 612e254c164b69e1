//! Environment helpers: dotenv loading, optional getters and redacted config snapshots.
//! Call `init_env()` once early in the binary (or rely on lazy Once).
use std::sync::Once;
use tracing::info;

static INIT: Once = Once::new();

/// Load .env exactly once. Safe to call many times.
pub fn init_env() {
    INIT.call_once(|| {
        let _ = dotenv::dotenv();
    });
}

/// Get optional env var (None if unset or empty).
pub fn env_opt(key: &str) -> Option<String> {
    init_env();
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

pub(crate) fn redact_value(key: &str, val: &str) -> String {
    let k = key.to_ascii_uppercase();
    if k.contains("PASSWORD")
        || k.contains("SECRET")
        || k.contains("KEY")
        || k.contains("TOKEN")
        || k.contains("COOKIE")
    {
        return "***".to_string();
    }
    // Keep query strings (API keys) out of logged URLs.
    let val_trim = val.trim();
    if k.contains("URL") {
        if let Some((base, _query)) = val_trim.split_once('?') {
            return format!("{base}?***");
        }
    }
    val_trim.to_string()
}

/// Log a consolidated, redacted snapshot of configuration values.
pub fn log_snapshot<'a>(title: &str, entries: impl IntoIterator<Item = (&'a str, String)>) {
    let snapshot: Vec<(String, String)> = entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), redact_value(k, &v)))
        .collect();
    info!(target: "preflight", title, snapshot = ?snapshot, "configuration snapshot");
}
