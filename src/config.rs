//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$EPISTLE_CONFIG` (environment variable)
//! 2. `~/.config/epistle/config.toml` (Linux/macOS)
//!    `%APPDATA%\epistle\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// How to reach the index.
    pub notmuch: NotmuchConfig,
    /// HTML rendering.
    pub render: RenderConfig,
    /// The polling loop of `epistle watch`.
    pub watch: WatchConfig,
    /// Terminal output.
    pub display: DisplayConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Index access settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotmuchConfig {
    /// Name or path of the notmuch executable.
    pub program: String,
    /// Seconds between checks of the index lock marker.
    pub lock_poll_interval_secs: u64,
}

/// HTML rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Command that reads HTML on stdin and writes text on stdout.
    pub html_command: Vec<String>,
}

/// Watch loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Seconds between unread checks.
    pub interval_secs: u64,
}

/// Terminal output settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Clip message lines to this many columns (0 = no clipping).
    pub max_width: usize,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for NotmuchConfig {
    fn default() -> Self {
        Self {
            program: "notmuch".to_string(),
            lock_poll_interval_secs: 10,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            html_command: ["w3m", "-T", "text/html", "-dump"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { interval_secs: 60 }
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("EPISTLE_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    dirs::config_dir().map(|d| d.join("epistle").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("epistle")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.notmuch.program, "notmuch");
        assert_eq!(cfg.notmuch.lock_poll_interval_secs, 10);
        assert_eq!(cfg.render.html_command[0], "w3m");
        assert_eq!(cfg.watch.interval_secs, 60);
        assert_eq!(cfg.display.max_width, 0);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[notmuch]
program = "/opt/notmuch/bin/notmuch"

[render]
html_command = ["lynx", "-stdin", "-dump"]
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.notmuch.program, "/opt/notmuch/bin/notmuch");
        assert_eq!(cfg.render.html_command, vec!["lynx", "-stdin", "-dump"]);
        // Other fields use defaults
        assert_eq!(cfg.notmuch.lock_poll_interval_secs, 10);
        assert_eq!(cfg.general.log_level, "warn");
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.notmuch.program, cfg.notmuch.program);
        assert_eq!(parsed.render.html_command, cfg.render.html_command);
    }
}
