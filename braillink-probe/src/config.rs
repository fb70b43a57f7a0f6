//! Configuration for the probe.

use std::path::{Path, PathBuf};
use std::time::Duration;

use braillink_core::{BrlError, Credential, Endpoint};
use serde::{Deserialize, Serialize};

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Where and how to connect.
    pub connection: ConnectionConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionConfig {
    /// Service endpoint: "" or ":N" for a local socket, "host[:N]" for TCP.
    pub host: String,
    /// Key file presented when the service asks for one. Empty for none.
    pub auth: String,
    /// Terminal slot to take; absent means the foreground one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tty: Option<u32>,
    /// Round-trip limit in milliseconds (0 = wait forever).
    pub request_timeout_ms: u64,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            auth: braillink_core::protocol::DEFAULT_KEY_FILE.into(),
            tty: None,
            request_timeout_ms: 5_000,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ProbeConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the default configuration to a file (for bootstrapping).
    pub fn write_default(path: &Path) -> std::io::Result<()> {
        let text = toml::to_string_pretty(&Self::default()).map_err(std::io::Error::other)?;
        std::fs::write(path, text)
    }

    pub fn endpoint(&self) -> Result<Endpoint, BrlError> {
        self.connection.host.parse()
    }

    pub fn credential(&self) -> Credential {
        match self.connection.auth.trim() {
            "" => Credential::None,
            path => Credential::KeyFile(PathBuf::from(path)),
        }
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        match self.connection.request_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let text = toml::to_string_pretty(&ProbeConfig::default()).unwrap();
        assert!(text.contains("[connection]"));
        assert!(text.contains("request_timeout_ms"));
        assert!(!text.contains("tty"));
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let text = "[connection]\nhost = \"braille:1\"\ntty = 2\n";
        let cfg: ProbeConfig = toml::from_str(text).unwrap();
        assert_eq!(cfg.endpoint().unwrap(), Endpoint::tcp("braille", 1));
        assert_eq!(cfg.connection.tty, Some(2));
        assert_eq!(cfg.request_timeout(), Some(Duration::from_secs(5)));
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn empty_auth_means_no_credential() {
        let mut cfg = ProbeConfig::default();
        assert_eq!(
            cfg.credential(),
            Credential::KeyFile(PathBuf::from("/etc/brlapi.key"))
        );
        cfg.connection.auth.clear();
        assert_eq!(cfg.credential(), Credential::None);
    }

    #[test]
    fn zero_timeout_waits_forever() {
        let mut cfg = ProbeConfig::default();
        cfg.connection.request_timeout_ms = 0;
        assert_eq!(cfg.request_timeout(), None);
    }

    #[test]
    fn missing_file_falls_back() {
        let cfg = ProbeConfig::load(Path::new("/nonexistent/braillink-probe.toml"));
        assert_eq!(cfg.connection.host, "");
        assert!(cfg.endpoint().is_ok());
    }

    #[test]
    fn write_default_then_load() {
        let path =
            std::env::temp_dir().join(format!("braillink-probe-{}.toml", std::process::id()));
        ProbeConfig::write_default(&path).unwrap();
        let cfg = ProbeConfig::load(&path);
        assert_eq!(cfg.connection.request_timeout_ms, 5_000);
        std::fs::remove_file(path).ok();
    }
}
