//! Configuration management for hwhouse
//!
//! Config file location:
//! - Linux: ~/.config/hwhouse/config.toml
//! - macOS: ~/Library/Application Support/com.hwhouse.hwhouse/config.toml
//! - Windows: %APPDATA%/hwhouse/hwhouse/config/config.toml
//!
//! You can override the config location by setting `HWHOUSE_CONFIG_PATH` or
//! passing `--config`. The file is only ever read; hwhouse keeps no state
//! between runs.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::benchmark_runner::{
    BenchmarkSettings, DEFAULT_CPU_ITERATIONS, DEFAULT_DISK_BYTES, DEFAULT_MEMORY_BYTES,
};

pub const CONFIG_PATH_ENV: &str = "HWHOUSE_CONFIG_PATH";

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Where reports are written
    #[serde(default)]
    pub export: ExportConfig,

    /// Benchmark work sizes
    #[serde(default)]
    pub benchmark: BenchmarkConfig,

    /// Log filter
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location, or defaults if absent
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`, or defaults if the file does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))?;

        config
            .validate()
            .with_context(|| format!("Invalid config in {}", path.display()))?;

        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return Ok(PathBuf::from(trimmed));
            }
        }

        Ok(project_dirs()?.config_dir().join("config.toml"))
    }

    fn validate(&self) -> Result<()> {
        if self.export.file_stem.trim().is_empty() {
            anyhow::bail!("export.file_stem must not be empty");
        }
        if self.benchmark.cpu_iterations == 0 {
            anyhow::bail!("benchmark.cpu_iterations must be greater than zero");
        }
        if self.benchmark.memory_bytes == 0 || self.benchmark.disk_bytes == 0 {
            anyhow::bail!("benchmark sizes must be greater than zero");
        }
        Ok(())
    }

    /// Directory exports are written to: configured, else the working directory
    pub fn export_dir(&self) -> PathBuf {
        self.export
            .directory
            .clone()
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn benchmark_settings(&self) -> BenchmarkSettings {
        BenchmarkSettings {
            cpu_iterations: self.benchmark.cpu_iterations,
            memory_bytes: self.benchmark.memory_bytes,
            disk_bytes: self.benchmark.disk_bytes,
        }
    }
}

/// Directory holding the window-mode log file
pub fn data_dir() -> Result<PathBuf> {
    Ok(project_dirs()?.data_dir().to_path_buf())
}

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from("com", "hwhouse", "hwhouse")
        .context("Could not determine project directories")
}

/// Export configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Target directory for reports (defaults to the working directory)
    #[serde(default)]
    pub directory: Option<PathBuf>,

    /// Report file name without extension
    #[serde(default = "default_file_stem")]
    pub file_stem: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            directory: None,
            file_stem: default_file_stem(),
        }
    }
}

fn default_file_stem() -> String {
    "hardware_report".to_string()
}

/// Benchmark configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkConfig {
    /// Iterations of the CPU integer mix
    #[serde(default = "default_cpu_iterations")]
    pub cpu_iterations: u64,

    /// Size of the memory fill buffer in bytes
    #[serde(default = "default_memory_bytes")]
    pub memory_bytes: u64,

    /// Size of the disk round-trip file in bytes
    #[serde(default = "default_disk_bytes")]
    pub disk_bytes: u64,
}

impl Default for BenchmarkConfig {
    fn default() -> Self {
        Self {
            cpu_iterations: default_cpu_iterations(),
            memory_bytes: default_memory_bytes(),
            disk_bytes: default_disk_bytes(),
        }
    }
}

fn default_cpu_iterations() -> u64 {
    DEFAULT_CPU_ITERATIONS
}

fn default_memory_bytes() -> u64 {
    DEFAULT_MEMORY_BYTES
}

fn default_disk_bytes() -> u64 {
    DEFAULT_DISK_BYTES
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, used when no env var is set
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn default_log_filter() -> String {
    "info".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.export.file_stem, "hardware_report");
        assert_eq!(config.export_dir(), PathBuf::from("."));
        assert_eq!(config.benchmark.cpu_iterations, 50_000_000);
        assert_eq!(config.benchmark.memory_bytes, 64 * 1024 * 1024);
        assert_eq!(config.logging.filter, "info");
        assert_eq!(config.benchmark_settings(), BenchmarkSettings::default());
    }

    #[test]
    fn test_partial_config_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[export]\ndirectory = \"/tmp/reports\"\n\n[benchmark]\ncpu_iterations = 1000\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.export_dir(), PathBuf::from("/tmp/reports"));
        assert_eq!(config.export.file_stem, "hardware_report");
        assert_eq!(config.benchmark.cpu_iterations, 1000);
        assert_eq!(config.benchmark.disk_bytes, 16 * 1024 * 1024);
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_config_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[benchmark]\ncpu_iterations = 0\n").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(format!("{err:#}").contains("config.toml"));

        fs::write(&path, "[benchmark\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
