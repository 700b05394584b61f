use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Environment variable that overrides the default config path.
pub const CONFIG_ENV: &str = "SPACEXP_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "spacexp.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub index: IndexConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexConfig {
    #[serde(default = "default_excludes")]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub follow_symlinks: bool,

    #[serde(default)]
    pub include_hidden: bool,

    /// Files larger than this keep only their generic attributes.
    #[serde(default = "default_max_extract_size_mb")]
    pub max_extract_size_mb: u64,

    /// Reported for PDFs and Office documents that carry no author.
    #[serde(default = "default_author")]
    pub default_author: String,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            exclude: default_excludes(),
            follow_symlinks: false,
            include_hidden: false,
            max_extract_size_mb: default_max_extract_size_mb(),
            default_author: default_author(),
        }
    }
}

impl IndexConfig {
    pub fn extractor(&self) -> ExtractorConfig {
        ExtractorConfig {
            max_size_bytes: self.max_extract_size_mb.saturating_mul(1024 * 1024),
            default_author: self.default_author.clone(),
        }
    }
}

/// The subset of settings the format handlers need.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    pub max_size_bytes: u64,
    pub default_author: String,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        IndexConfig::default().extractor()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_csv")]
    pub csv: PathBuf,
    #[serde(default = "default_database")]
    pub database: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { csv: default_csv(), database: default_database() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { bind: default_bind() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LogConfig {
    /// Also write logs to this file (appended, no ANSI colours).
    #[serde(default)]
    pub file: Option<PathBuf>,
    /// Regexes matched against `"<target>: <message>"`; matching events are dropped.
    #[serde(default)]
    pub ignore: Vec<String>,
}

fn default_excludes() -> Vec<String> {
    vec![
        "**/.git/**".into(),
        "**/node_modules/**".into(),
        "**/target/**".into(),
        "**/__pycache__/**".into(),
        "**/.venv/**".into(),
        "**/venv/**".into(),
        "**/*.pyc".into(),
    ]
}

fn default_max_extract_size_mb() -> u64 { 1024 }
fn default_author() -> String { "Unknown Author".into() }
fn default_csv() -> PathBuf { PathBuf::from("output_analysis.csv") }
fn default_database() -> PathBuf { PathBuf::from("spacexp.db") }
fn default_bind() -> String { "127.0.0.1:8000".into() }

/// Parse a TOML config, warning about keys that do not map to any setting.
pub fn parse_config(s: &str) -> Result<Config> {
    let de = toml::Deserializer::new(s);
    let mut unknown = Vec::new();
    let config: Config = serde_ignored::deserialize(de, |path| unknown.push(path.to_string()))
        .context("parsing config")?;
    for key in unknown {
        tracing::warn!("unknown config key: {key}");
    }
    Ok(config)
}

/// `$SPACEXP_CONFIG`, else `./spacexp.toml`.
pub fn default_config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
}

/// Load the config.  An explicitly named file must exist; the default path
/// may be absent, in which case built-in defaults apply.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let (path, required) = match explicit {
        Some(p) => (p.to_path_buf(), true),
        None => (default_config_path(), std::env::var_os(CONFIG_ENV).is_some()),
    };
    if !required && !path.exists() {
        return Ok(Config::default());
    }
    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("reading config {}", path.display()))?;
    parse_config(&text).with_context(|| format!("in {}", path.display()))
}
