//! Configuration module for freqmeter-rs
//!
//! The configuration is a read-only TOML file that seeds the serial
//! settings, the initial display toggles, the graph options and an optional
//! filter script. The application never writes it back.
//!
//! # Location
//!
//! An explicit `--config <path>` argument wins. Otherwise `config.toml` is
//! looked up in the platform configuration directory:
//! - **Linux**: `~/.config/freqmeter-rs/config.toml`
//! - **macOS**: `~/Library/Application Support/freqmeter-rs/config.toml`
//! - **Windows**: `%APPDATA%\freqmeter-rs\config.toml`
//!
//! # Example
//!
//! ```toml
//! [serial]
//! port = "/dev/ttyUSB0"
//! baud = 57600
//!
//! [display]
//! autorange = true
//! multiplier = 4
//!
//! [filter]
//! enabled = true
//! script = "smooth(value, 0.8)"
//! ```

pub mod serial;

pub use serial::{Parity, SerialConfig, BAUD_RATES};

use crate::error::{FreqMeterError, Result, ResultExt};
use crate::types::{Multiplier, SamplingSpeed};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "freqmeter-rs";

/// Config filename
pub const CONFIG_FILE: &str = "config.toml";

/// Get the application config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID))
}

/// Get the default config file path
pub fn default_config_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join(CONFIG_FILE))
}

/// Initial state of the display toggles
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Choose Hz/kHz/MHz automatically
    pub autorange: bool,
    /// Route samples through the filter slot
    pub filter: bool,
    /// External prescaler factor
    pub multiplier: Multiplier,
    /// Sampling speed requested after connecting
    pub speed: SamplingSpeed,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            autorange: true,
            filter: false,
            multiplier: Multiplier::ONE,
            speed: SamplingSpeed::Slow,
        }
    }
}

/// Graph rendering options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    pub x_grid: bool,
    pub y_grid: bool,
    /// Logarithmic frequency axis
    pub log_y: bool,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self {
            x_grid: true,
            y_grid: true,
            log_y: false,
        }
    }
}

/// Filter script to install at startup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Inline Rhai source
    pub script: Option<String>,
    /// Path to a Rhai source file, used when `script` is unset
    pub script_path: Option<PathBuf>,
}

impl FilterConfig {
    /// Resolve the script source, reading `script_path` if needed
    pub fn source(&self) -> Result<Option<String>> {
        if let Some(ref script) = self.script {
            return Ok(Some(script.clone()));
        }
        match self.script_path {
            Some(ref path) => std::fs::read_to_string(path)
                .map(Some)
                .map_err(FreqMeterError::from)
                .with_context(|| format!("Failed to read filter script {}", path.display())),
            None => Ok(None),
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub serial: SerialConfig,
    pub display: DisplayConfig,
    pub graph: GraphConfig,
    pub filter: FilterConfig,
}

impl AppConfig {
    /// Parse a config from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Load a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(FreqMeterError::from)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("Failed to parse {}", path.display()))
    }

    /// Load from `path` (or the default location), falling back to defaults
    ///
    /// A missing file is silent; an unreadable or malformed one is logged.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(p) => p,
            None => return Self::default(),
        };
        if !path.exists() {
            tracing::debug!("No config file at {:?}, using defaults", path);
            return Self::default();
        }
        match Self::load(&path) {
            Ok(config) => {
                tracing::info!("Loaded configuration from {:?}", path);
                config
            }
            Err(e) => {
                tracing::warn!("Ignoring configuration: {}", e);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_empty_config_is_default() {
        let config = AppConfig::from_toml_str("").unwrap();
        assert_eq!(config, AppConfig::default());
        assert!(config.display.autorange);
        assert!(!config.display.filter);
    }

    #[test]
    fn test_partial_config() {
        let config = AppConfig::from_toml_str(
            r#"
[serial]
port = "/dev/ttyUSB0"
baud = 115200
parity = "even"

[display]
multiplier = 16
speed = "fast"

[graph]
log_y = true
"#,
        )
        .unwrap();
        assert_eq!(config.serial.port, "/dev/ttyUSB0");
        assert_eq!(config.serial.baud, 115200);
        assert_eq!(config.serial.parity, Parity::Even);
        assert_eq!(config.serial.data_bits, 8);
        assert_eq!(config.display.multiplier.factor(), 16);
        assert_eq!(config.display.speed, SamplingSpeed::Fast);
        assert!(config.graph.log_y);
        assert!(config.graph.x_grid);
    }

    #[test]
    fn test_invalid_multiplier_rejected() {
        let err = AppConfig::from_toml_str("[display]\nmultiplier = 3\n").unwrap_err();
        assert!(matches!(err, FreqMeterError::Toml(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[serial]\nport = \"COM4\"").unwrap();
        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.serial.port, "COM4");
    }

    #[test]
    fn test_load_or_default_on_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "this is = = not toml").unwrap();
        let config = AppConfig::load_or_default(Some(file.path()));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = AppConfig::load_or_default(Some(&dir.path().join("nope.toml")));
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_filter_source_resolution() {
        assert_eq!(FilterConfig::default().source().unwrap(), None);

        let inline = FilterConfig {
            script: Some("value".to_string()),
            script_path: Some(PathBuf::from("/does/not/matter.rhai")),
        };
        assert_eq!(inline.source().unwrap().as_deref(), Some("value"));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "smooth(value, 0.5)").unwrap();
        let from_file = FilterConfig {
            script: None,
            script_path: Some(file.path().to_path_buf()),
        };
        assert_eq!(
            from_file.source().unwrap().as_deref(),
            Some("smooth(value, 0.5)")
        );

        let missing = FilterConfig {
            script: None,
            script_path: Some(PathBuf::from("/nonexistent/filter.rhai")),
        };
        assert!(missing.source().is_err());
    }
}
