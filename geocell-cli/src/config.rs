//! Configuration file handling for ~/.geocell/config.ini.
//!
//! Loads user defaults for the cover and streaming commands. A missing
//! file means defaults; a malformed value falls back to its default
//! with a warning rather than failing the whole run.

use std::path::{Path, PathBuf};

use geocell::stream::{DEFAULT_SORT_BUFFER_BYTES, SortConfig};
use ini::Ini;
use tracing::warn;

/// Defaults applied to the `cover` command.
#[derive(Debug, Clone)]
pub struct CoverSettings {
    /// Target resolution; zero or negative selects one from the shape
    pub resolution: i32,
    /// Clustering thresholds, one nibble per resolution level
    pub thresholds: u64,
}

/// Defaults applied to the streaming commands.
#[derive(Debug, Clone)]
pub struct StreamSettings {
    /// Memory budget of the external sort, in bytes
    pub sort_buffer_bytes: usize,
    /// Directory for sort spill files; system temp when unset
    pub tmp_dir: Option<PathBuf>,
}

/// Logging defaults.
#[derive(Debug, Clone)]
pub struct LoggingSettings {
    /// Filter directive used when RUST_LOG is unset
    pub level: String,
}

/// All CLI settings, overlaid from the INI file onto defaults.
#[derive(Debug, Clone)]
pub struct Settings {
    pub cover: CoverSettings,
    pub stream: StreamSettings,
    pub logging: LoggingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            cover: CoverSettings {
                resolution: 0,
                thresholds: 0,
            },
            stream: StreamSettings {
                sort_buffer_bytes: DEFAULT_SORT_BUFFER_BYTES,
                tmp_dir: None,
            },
            logging: LoggingSettings {
                level: "info".to_string(),
            },
        }
    }
}

impl Settings {
    /// Load settings from the default path (~/.geocell/config.ini).
    ///
    /// A missing file yields defaults.
    pub fn load() -> Result<Self, ini::Error> {
        Self::load_from(&config_file_path())
    }

    /// Load settings from a specific path, defaults when absent.
    pub fn load_from(path: &Path) -> Result<Self, ini::Error> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        Ok(Self::from_ini(&ini))
    }

    fn from_ini(ini: &Ini) -> Self {
        let mut settings = Settings::default();

        if let Some(section) = ini.section(Some("cover")) {
            if let Some(v) = section.get("resolution") {
                match v.trim().parse() {
                    Ok(resolution) => settings.cover.resolution = resolution,
                    Err(_) => warn!("ignoring cover.resolution = {:?}: not an integer", v),
                }
            }
            if let Some(v) = section.get("thresholds") {
                match parse_thresholds(v) {
                    Ok(thresholds) => settings.cover.thresholds = thresholds,
                    Err(_) => warn!("ignoring cover.thresholds = {:?}: not a hex value", v),
                }
            }
        }

        if let Some(section) = ini.section(Some("stream")) {
            if let Some(v) = section.get("sort_buffer_bytes") {
                match v.trim().parse() {
                    Ok(bytes) => settings.stream.sort_buffer_bytes = bytes,
                    Err(_) => warn!("ignoring stream.sort_buffer_bytes = {:?}: not a size", v),
                }
            }
            if let Some(v) = section.get("tmp_dir") {
                let v = v.trim();
                if !v.is_empty() {
                    settings.stream.tmp_dir = Some(PathBuf::from(v));
                }
            }
        }

        if let Some(section) = ini.section(Some("logging")) {
            if let Some(v) = section.get("level") {
                let v = v.trim();
                if !v.is_empty() {
                    settings.logging.level = v.to_string();
                }
            }
        }

        settings
    }

    /// External-sort configuration built from the stream settings.
    pub fn sort_config(&self) -> SortConfig {
        let config = SortConfig::new().with_buffer_bytes(self.stream.sort_buffer_bytes);
        match &self.stream.tmp_dir {
            Some(dir) => config.with_tmp_dir(dir),
            None => config,
        }
    }
}

/// Parse a thresholds value: up to 16 hex nibbles, optional 0x prefix.
pub fn parse_thresholds(text: &str) -> Result<u64, std::num::ParseIntError> {
    let text = text.trim();
    let text = text.strip_prefix("0x").unwrap_or(text);
    u64::from_str_radix(text, 16)
}

/// Path of the config directory (~/.geocell).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".geocell")
}

/// Path of the config file (~/.geocell/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

/// Directory log files are written to (~/.geocell/logs).
pub fn log_directory() -> PathBuf {
    config_directory().join("logs")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.cover.resolution, 0);
        assert_eq!(settings.cover.thresholds, 0);
        assert_eq!(settings.stream.sort_buffer_bytes, DEFAULT_SORT_BUFFER_BYTES);
        assert!(settings.stream.tmp_dir.is_none());
        assert_eq!(settings.logging.level, "info");
    }

    #[test]
    fn test_load_nonexistent_returns_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load_from(&dir.path().join("missing.ini")).unwrap();
        assert_eq!(settings.cover.resolution, 0);
    }

    #[test]
    fn test_load_overlays_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(
            &path,
            "[cover]\nresolution = 14\nthresholds = 0x2000000000000000\n\
             [stream]\nsort_buffer_bytes = 1024\ntmp_dir = /tmp/geocell\n\
             [logging]\nlevel = debug\n",
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.cover.resolution, 14);
        assert_eq!(settings.cover.thresholds, 0x2000_0000_0000_0000);
        assert_eq!(settings.stream.sort_buffer_bytes, 1024);
        assert_eq!(settings.stream.tmp_dir, Some(PathBuf::from("/tmp/geocell")));
        assert_eq!(settings.logging.level, "debug");
    }

    #[test]
    fn test_malformed_value_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.ini");
        std::fs::write(&path, "[cover]\nresolution = quite-fine\n").unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.cover.resolution, 0, "bad value keeps the default");
    }

    #[test]
    fn test_parse_thresholds_accepts_bare_and_prefixed_hex() {
        assert_eq!(parse_thresholds("20").unwrap(), 0x20);
        assert_eq!(parse_thresholds("0x20").unwrap(), 0x20);
        assert!(parse_thresholds("xyz").is_err());
    }
}
