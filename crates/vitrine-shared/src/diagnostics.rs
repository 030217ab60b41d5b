//! Opt-in file diagnostics for lifecycle debugging.
//!
//! Disabled by default. Enable with `VITRINE_DIAG=1` or an explicit
//! [`set_enabled`] call early in startup. Lines are appended to
//! `~/.vitrine/logs/diagnostics.log` with RFC3339 timestamps, so a support
//! dump can be collected without reconfiguring the host app's logger.

use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{
    OnceLock,
    atomic::{AtomicBool, Ordering},
};

use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

const DIAG_ENV: &str = "VITRINE_DIAG";

static ENABLED: AtomicBool = AtomicBool::new(false);
static ENABLED_INIT: OnceLock<()> = OnceLock::new();

/// Explicitly set the diagnostics state. If never called, the first log
/// attempt falls back to checking the `VITRINE_DIAG` env var.
pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
    let _ = ENABLED_INIT.set(());
}

pub fn enabled() -> bool {
    if ENABLED_INIT.get().is_some() {
        return ENABLED.load(Ordering::Relaxed);
    }

    let env_enabled = std::env::var(DIAG_ENV)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(false);
    if env_enabled {
        ENABLED.store(true, Ordering::Relaxed);
    }
    let _ = ENABLED_INIT.set(());
    env_enabled
}

pub fn log_dir() -> Option<PathBuf> {
    static DIR: OnceLock<Option<PathBuf>> = OnceLock::new();
    DIR.get_or_init(|| {
        let home = dirs::home_dir()?;
        Some(home.join(".vitrine").join("logs"))
    })
    .clone()
}

fn diagnostics_path() -> Option<PathBuf> {
    Some(log_dir()?.join("diagnostics.log"))
}

/// Appends one diagnostics line. No-op unless diagnostics are enabled;
/// write failures are swallowed so diagnostics can never take the app down.
pub fn log(message: impl AsRef<str>) {
    if !enabled() {
        return;
    }

    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| "unknown-time".to_string());
    let line = format!("[{}] {}\n", timestamp, message.as_ref());

    if let Some(path) = diagnostics_path() {
        if let Some(parent) = path.parent() {
            let _ = create_dir_all(parent);
        }
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&path) {
            let _ = file.write_all(line.as_bytes());
        }
    }

    log::debug!(target: "vitrine::diag", "{}", message.as_ref());
}
