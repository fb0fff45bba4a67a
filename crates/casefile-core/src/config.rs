//! Runtime settings
//!
//! ## Configuration Resolution
//!
//! Settings are loaded with a two-layer resolution:
//! 1. Check for override in data dir (~/.local/share/casefile/config/casefile.toml)
//!    or an explicitly given path
//! 2. Fall back to embedded defaults (compiled into binary)
//!
//! Environment variables are applied on top of whichever file was used.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};

/// Embedded default config (compiled into binary)
const DEFAULT_CONFIG: &str = include_str!("../../../config/casefile.toml");

/// Where and how to reach the statement analyzer
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerSettings {
    pub base_url: String,
    pub analyze_path: String,
    pub category_edit_path: String,
    pub health_path: String,
    pub timeout: Duration,
}

impl AnalyzerSettings {
    pub fn analyze_url(&self) -> String {
        join_url(&self.base_url, &self.analyze_path)
    }

    pub fn category_edit_url(&self) -> String {
        join_url(&self.base_url, &self.category_edit_path)
    }

    pub fn health_url(&self) -> String {
        join_url(&self.base_url, &self.health_path)
    }
}

impl Default for AnalyzerSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:7500".to_string(),
            analyze_path: "/analyze-statements/".to_string(),
            category_edit_path: "/edit-category/".to_string(),
            health_path: "/health".to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

/// Ingestion tunables
#[derive(Debug, Clone, PartialEq)]
pub struct IngestSettings {
    /// Root for per-case upload directories and the `failed_pdfs` namespace
    pub temp_dir: PathBuf,
    /// Rows per insert chunk in the deduplicating writer
    pub chunk_size: usize,
    /// Owner recorded on newly created cases
    pub owner_id: i64,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            temp_dir: std::env::temp_dir().join("casefile"),
            chunk_size: 50,
            owner_id: 1,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub analyzer: AnalyzerSettings,
    pub ingest: IngestSettings,
}

impl Settings {
    /// Load from the default override location (or embedded defaults), then the environment
    pub fn load() -> Result<Self> {
        let mut settings = load_file(None)?;
        settings.apply_env()?;
        Ok(settings)
    }

    /// Load from an explicit path, then the environment
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut settings = load_file(Some(path))?;
        settings.apply_env()?;
        Ok(settings)
    }

    /// Parse settings from TOML content (no environment overrides)
    pub fn from_toml(content: &str) -> Result<Self> {
        parse_config(content)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(url) = std::env::var("CASEFILE_ANALYZER_URL") {
            if !url.trim().is_empty() {
                self.analyzer.base_url = url;
            }
        }
        if let Ok(secs) = std::env::var("CASEFILE_ANALYZER_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                Error::Config(format!("CASEFILE_ANALYZER_TIMEOUT_SECS is not a number: {}", secs))
            })?;
            self.analyzer.timeout = Duration::from_secs(secs);
        }
        if let Ok(dir) = std::env::var("CASEFILE_TEMP_DIR") {
            if !dir.trim().is_empty() {
                self.ingest.temp_dir = PathBuf::from(dir);
            }
        }
        Ok(())
    }
}

/// Default config override path
pub fn default_config_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("casefile").join("config").join("casefile.toml"))
}

fn load_file(override_path: Option<&Path>) -> Result<Settings> {
    let path = match override_path {
        Some(path) => Some(path.to_path_buf()),
        None => default_config_path(),
    };

    let content = match path {
        Some(path) if path.exists() => fs::read_to_string(&path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {}", path.display(), e))
        })?,
        _ => DEFAULT_CONFIG.to_string(),
    };

    parse_config(&content)
}

/// Raw config structure for TOML parsing
#[derive(Debug, Deserialize)]
struct RawConfig {
    analyzer: Option<RawAnalyzer>,
    ingest: Option<RawIngest>,
}

#[derive(Debug, Deserialize)]
struct RawAnalyzer {
    base_url: Option<String>,
    analyze_path: Option<String>,
    category_edit_path: Option<String>,
    health_path: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct RawIngest {
    temp_dir: Option<PathBuf>,
    chunk_size: Option<usize>,
    owner_id: Option<i64>,
}

fn parse_config(content: &str) -> Result<Settings> {
    let raw: RawConfig = toml::from_str(content)
        .map_err(|e| Error::Config(format!("Invalid config TOML: {}", e)))?;

    let mut settings = Settings::default();

    if let Some(analyzer) = raw.analyzer {
        if let Some(url) = analyzer.base_url {
            settings.analyzer.base_url = url;
        }
        if let Some(path) = analyzer.analyze_path {
            settings.analyzer.analyze_path = path;
        }
        if let Some(path) = analyzer.category_edit_path {
            settings.analyzer.category_edit_path = path;
        }
        if let Some(path) = analyzer.health_path {
            settings.analyzer.health_path = path;
        }
        if let Some(secs) = analyzer.timeout_secs {
            settings.analyzer.timeout = Duration::from_secs(secs);
        }
    }

    if let Some(ingest) = raw.ingest {
        if let Some(dir) = ingest.temp_dir {
            settings.ingest.temp_dir = dir;
        }
        if let Some(size) = ingest.chunk_size {
            if size == 0 {
                return Err(Error::Config("ingest.chunk_size must be at least 1".into()));
            }
            settings.ingest.chunk_size = size;
        }
        if let Some(owner) = ingest.owner_id {
            settings.ingest.owner_id = owner;
        }
    }

    Ok(settings)
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
