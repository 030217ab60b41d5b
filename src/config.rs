//! Runtime configuration, loaded from `~/.vitrine/config.toml`.
//!
//! Missing files yield defaults; a malformed file is logged and ignored
//! rather than failing startup. Writes are atomic (temp file + rename).

use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

const HOME_ENV: &str = "VITRINE_HOME";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Upper bound on waiting for child windows to finish closing during a
    /// parent close. On timeout a warning is logged and the parent close
    /// proceeds.
    #[serde(default = "default_child_close_timeout_secs")]
    pub child_close_timeout_secs: u64,

    /// Emit a diagnostic when an ownership handle is dropped without being
    /// disposed while its surface is still reachable.
    #[serde(default = "default_true")]
    pub leak_diagnostics: bool,

    /// Default for sessions created without explicit options: close the
    /// session once its last window closes.
    #[serde(default)]
    pub auto_close_empty_sessions: bool,
}

fn default_child_close_timeout_secs() -> u64 {
    100
}

fn default_true() -> bool {
    true
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            child_close_timeout_secs: default_child_close_timeout_secs(),
            leak_diagnostics: true,
            auto_close_empty_sessions: false,
        }
    }
}

impl RuntimeConfig {
    pub fn child_close_timeout(&self) -> Duration {
        Duration::from_secs(self.child_close_timeout_secs)
    }

    /// Loads the config file, falling back to defaults when it is missing
    /// or unreadable.
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match fs::read_to_string(&path) {
            Ok(contents) => match toml::from_str(&contents) {
                Ok(config) => config,
                Err(err) => {
                    log::warn!("ignoring malformed {}: {err}", path.display());
                    Self::default()
                }
            },
            Err(err) => {
                log::warn!("failed to read {}: {err}", path.display());
                Self::default()
            }
        }
    }

    /// Writes the config atomically: serialize to a temp file, then rename
    /// over the destination.
    pub fn save(&self) -> anyhow::Result<()> {
        let path = config_path()
            .ok_or_else(|| anyhow::anyhow!("cannot determine config directory"))?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        let temp_path = path.with_extension("toml.tmp");
        fs::write(&temp_path, contents)?;
        fs::rename(&temp_path, &path)?;
        Ok(())
    }
}

fn config_root() -> Option<PathBuf> {
    if let Ok(home) = std::env::var(HOME_ENV) {
        if !home.is_empty() {
            return Some(PathBuf::from(home));
        }
    }
    Some(dirs::home_dir()?.join(".vitrine"))
}

fn config_path() -> Option<PathBuf> {
    Some(config_root()?.join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::{Mutex, MutexGuard};
    use tempfile::TempDir;

    // Tests share the VITRINE_HOME env var; serialize them.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn with_home(temp: &TempDir) -> MutexGuard<'static, ()> {
        let guard = ENV_LOCK.lock();
        // Rust 2024: modifying process env is `unsafe` due to potential UB
        // with concurrent readers.
        unsafe {
            std::env::set_var(HOME_ENV, temp.path());
        }
        guard
    }

    #[test]
    fn defaults_when_missing() {
        let temp = TempDir::new().unwrap();
        let _env = with_home(&temp);

        let config = RuntimeConfig::load();
        assert_eq!(config, RuntimeConfig::default());
        assert_eq!(config.child_close_timeout(), Duration::from_secs(100));
        assert!(config.leak_diagnostics);
    }

    #[test]
    fn save_then_load_roundtrip() {
        let temp = TempDir::new().unwrap();
        let _env = with_home(&temp);

        let config = RuntimeConfig {
            child_close_timeout_secs: 5,
            leak_diagnostics: false,
            auto_close_empty_sessions: true,
        };
        config.save().unwrap();

        assert_eq!(RuntimeConfig::load(), config);
        assert!(temp.path().join("config.toml").exists());
    }

    #[test]
    fn malformed_file_falls_back_to_defaults() {
        let temp = TempDir::new().unwrap();
        let _env = with_home(&temp);

        fs::write(temp.path().join("config.toml"), "child_close_timeout_secs = \"nope\"").unwrap();
        assert_eq!(RuntimeConfig::load(), RuntimeConfig::default());
    }

    #[test]
    fn partial_file_fills_defaults() {
        let temp = TempDir::new().unwrap();
        let _env = with_home(&temp);

        fs::write(temp.path().join("config.toml"), "child_close_timeout_secs = 7").unwrap();
        let config = RuntimeConfig::load();
        assert_eq!(config.child_close_timeout_secs, 7);
        assert!(config.leak_diagnostics);
    }
}
