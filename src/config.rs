//! Configuration file support for the DXCC watcher.
//!
//! Loads settings from `~/.config/dxcc-watcher/config.toml` on Linux
//! (or platform-appropriate location on other OSes).

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::band::Band;
use crate::confirmed::FileConfirmedSource;
use crate::listener::{DEFAULT_HOST, DEFAULT_PORT, ListenerConfig};

/// Application configuration loaded from TOML file.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address to receive WSJT-X datagrams on.
    pub host: String,

    /// UDP port to receive WSJT-X datagrams on.
    pub port: u16,

    /// Path to the cty.dat prefix table.
    pub cty_file: PathBuf,

    /// Confirmed country list per band, keyed by band label ("20m").
    /// Replaces the default map entirely when given.
    pub confirmed_files: HashMap<String, PathBuf>,

    /// Confirmed country list for bands without their own file.
    pub confirmed_default: PathBuf,

    /// Print statistics every N seconds (0 disables).
    pub stats_interval: u64,

    /// Print alerts as JSON lines instead of text.
    pub json: bool,

    /// Enable Prometheus metrics HTTP endpoint.
    pub metrics_enabled: bool,

    /// Port for Prometheus metrics HTTP endpoint.
    pub metrics_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        let confirmed_files = Band::ALL
            .iter()
            .map(|band| {
                (
                    band.to_string(),
                    PathBuf::from(format!("data/confirmed_countries_{}.txt", band)),
                )
            })
            .collect();

        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            cty_file: PathBuf::from("data/cty.dat"),
            confirmed_files,
            confirmed_default: PathBuf::from("data/confirmed_countries.txt"),
            stats_interval: 60,
            json: false,
            metrics_enabled: false,
            metrics_port: 9090,
        }
    }
}

impl Config {
    /// Load configuration from the default config file location.
    ///
    /// Returns default config if the file doesn't exist.
    /// Returns an error if the file exists but is malformed.
    pub fn load() -> Result<Self> {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Config::default()),
        }
    }

    /// Load configuration from a specific file.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in config file: {}", path.display()))
    }

    /// Returns the path to the config file.
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("dxcc-watcher/config.toml"))
    }

    /// Listener settings derived from this configuration.
    pub fn listener_config(&self) -> ListenerConfig {
        ListenerConfig::with_addr(self.host.clone(), self.port)
    }

    /// Build the confirmed list source.
    ///
    /// Returns an error if a `confirmed_files` key is not a known band.
    pub fn confirmed_source(&self) -> Result<FileConfirmedSource> {
        let per_band = self
            .confirmed_files
            .iter()
            .map(|(label, path)| {
                label
                    .parse::<Band>()
                    .map(|band| (band, path.clone()))
                    .map_err(|e| anyhow!("Invalid confirmed_files entry: {}", e))
            })
            .collect::<Result<HashMap<_, _>>>()?;

        Ok(FileConfirmedSource::new(
            per_band,
            self.confirmed_default.clone(),
        ))
    }

    /// Validate all configuration settings.
    pub fn validate(&self) -> Result<()> {
        self.confirmed_source().map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.cty_file, PathBuf::from("data/cty.dat"));
        assert_eq!(config.confirmed_files.len(), 14);
        assert_eq!(
            config.confirmed_files["1.25m"],
            PathBuf::from("data/confirmed_countries_1.25m.txt")
        );
        assert!(!config.metrics_enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_minimal_toml() {
        let toml = r#"
            port = 2237
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.port, 2237);
        // Other fields should use defaults
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.stats_interval, 60);
        assert_eq!(config.confirmed_files.len(), 14);
    }

    #[test]
    fn test_parse_full_toml() {
        let toml = r#"
            host = "0.0.0.0"
            port = 2237
            cty_file = "/usr/share/cty/cty.dat"
            confirmed_default = "/srv/dxcc/all.txt"
            stats_interval = 0
            json = true
            metrics_enabled = true
            metrics_port = 9091

            [confirmed_files]
            "20m" = "/srv/dxcc/20m.txt"
            "1.25m" = "/srv/dxcc/125cm.txt"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.cty_file, PathBuf::from("/usr/share/cty/cty.dat"));
        assert_eq!(config.stats_interval, 0);
        assert!(config.json);
        assert!(config.metrics_enabled);
        assert_eq!(config.metrics_port, 9091);
        assert_eq!(config.confirmed_files.len(), 2);

        let source = config.confirmed_source().unwrap();
        assert_eq!(
            source.path_for(Some(Band::M20)),
            &PathBuf::from("/srv/dxcc/20m.txt")
        );
        assert_eq!(
            source.path_for(Some(Band::M1_25)),
            &PathBuf::from("/srv/dxcc/125cm.txt")
        );
        assert_eq!(
            source.path_for(Some(Band::M40)),
            &PathBuf::from("/srv/dxcc/all.txt")
        );
        assert_eq!(source.path_for(None), &PathBuf::from("/srv/dxcc/all.txt"));
    }

    #[test]
    fn test_unknown_band_key_rejected() {
        let toml = r#"
            [confirmed_files]
            "11m" = "cb.txt"
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_listener_config() {
        let config = Config {
            port: 2239,
            ..Default::default()
        };
        let listener = config.listener_config();
        assert_eq!(listener.host, DEFAULT_HOST);
        assert_eq!(listener.port, 2239);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "json = true\n").unwrap();
        assert!(Config::load_from(&path).unwrap().json);

        fs::write(&path, "json = \"maybe\"\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
