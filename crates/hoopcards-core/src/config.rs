// Configuration loading and parsing (hoopcards.toml, credentials.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreConfig,
    pub index: IndexConfig,
    pub loader: LoaderConfig,
    pub credentials: CredentialsConfig,
    /// Directory relative paths in the config are resolved against.
    pub base_dir: PathBuf,
}

impl Config {
    /// Resolve a configured path against the base directory.
    pub fn resolve(&self, path: &str) -> PathBuf {
        self.base_dir.join(path)
    }
}

// ---------------------------------------------------------------------------
// hoopcards.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire hoopcards.toml file.
#[derive(Debug, Clone, Deserialize)]
struct HoopcardsFile {
    store: StoreConfig,
    index: IndexConfig,
    loader: LoaderConfig,
}

/// Connection settings for the search engine.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    pub url: String,
    pub timeout_secs: u64,
    #[serde(default = "default_verify_certs")]
    pub verify_certs: bool,
    /// Extra attempts for a request that timed out or could not connect.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each further attempt.
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexConfig {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoaderConfig {
    pub stats_csv: String,
    pub mapping: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_chunk_size() -> usize {
    crate::loader::DEFAULT_CHUNK_SIZE
}

fn default_verify_certs() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    500
}

// ---------------------------------------------------------------------------
// credentials.toml structs
// ---------------------------------------------------------------------------

/// Optional HTTP basic auth for the search engine.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    pub username: Option<String>,
    pub password: Option<String>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/hoopcards.toml` and
/// (optionally) `config/credentials.toml`, relative to `base_dir`.
///
/// This does not copy defaults; prefer [`load_config`] which does.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    // --- hoopcards.toml (required) ---
    let main_path = config_dir.join("hoopcards.toml");
    let main_text = read_file(&main_path)?;
    let file: HoopcardsFile = toml::from_str(&main_text).map_err(|e| ConfigError::ParseError {
        path: main_path.clone(),
        source: e,
    })?;

    // --- credentials.toml (optional) ---
    let credentials_path = config_dir.join("credentials.toml");
    let credentials = if credentials_path.exists() {
        let cred_text = read_file(&credentials_path)?;
        toml::from_str(&cred_text).map_err(|e| ConfigError::ParseError {
            path: credentials_path.clone(),
            source: e,
        })?
    } else {
        CredentialsConfig::default()
    };

    let config = Config {
        store: file.store,
        index: file.index,
        loader: file.loader,
        credentials,
        base_dir: base_dir.to_path_buf(),
    };

    validate(&config)?;
    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the copied files in name order. Skips `.example` files.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or pass --config",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(copy_error("create", &config_dir))?;

    let mut sources = Vec::new();
    for entry in std::fs::read_dir(&defaults_dir).map_err(copy_error("read", &defaults_dir))? {
        let path = entry.map_err(copy_error("read", &defaults_dir))?.path();
        if is_shipped_default(&path) {
            sources.push(path);
        }
    }
    sources.sort();

    let mut copied = Vec::new();
    for source in sources {
        let Some(file_name) = source.file_name() else {
            continue;
        };
        let target = config_dir.join(file_name);
        if copy_if_missing(&source, &target)? {
            copied.push(target);
        }
    }
    Ok(copied)
}

/// A regular file under `defaults/` that is meant to be copied as-is.
fn is_shipped_default(path: &Path) -> bool {
    path.is_file()
        && path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| !n.ends_with(".example"))
}

/// Copy `source` to `target` unless `target` already exists. Returns whether
/// a copy was made. Never overwrites.
fn copy_if_missing(source: &Path, target: &Path) -> Result<bool, ConfigError> {
    let mut src = std::fs::File::open(source).map_err(copy_error("read", source))?;
    let mut dest = match std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(target)
    {
        Ok(dest) => dest,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => return Ok(false),
        Err(e) => return Err(copy_error("create", target)(e)),
    };
    std::io::copy(&mut src, &mut dest).map_err(copy_error("write", target))?;
    Ok(true)
}

fn copy_error(action: &'static str, path: &Path) -> impl FnOnce(std::io::Error) -> ConfigError {
    let path = path.display().to_string();
    move |e| ConfigError::DefaultsCopyError {
        message: format!("failed to {action} {path}: {e}"),
    }
}

/// Load config relative to `base_dir`, or the current working directory when
/// `None`. Default config files are copied in first.
pub fn load_config(base_dir: Option<&Path>) -> Result<Config, ConfigError> {
    let base = match base_dir {
        Some(dir) => dir.to_path_buf(),
        None => std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
            path: PathBuf::from("."),
        })?,
    };
    ensure_config_files(&base)?;
    load_config_from(&base)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let url = config.store.url.trim();
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::ValidationError {
            field: "store.url".into(),
            message: format!("must be an http(s) URL, got `{url}`"),
        });
    }

    if config.store.timeout_secs == 0 {
        return Err(ConfigError::ValidationError {
            field: "store.timeout_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    // Elasticsearch rejects empty and mixed-case index names.
    let index = &config.index.name;
    if index.is_empty() || index.chars().any(|c| c.is_uppercase() || c.is_whitespace()) {
        return Err(ConfigError::ValidationError {
            field: "index.name".into(),
            message: format!("must be non-empty lowercase without spaces, got `{index}`"),
        });
    }

    if config.loader.chunk_size == 0 {
        return Err(ConfigError::ValidationError {
            field: "loader.chunk_size".into(),
            message: "must be greater than 0".into(),
        });
    }

    let creds = &config.credentials;
    if creds.username.is_some() != creds.password.is_some() {
        return Err(ConfigError::ValidationError {
            field: "credentials".into(),
            message: "username and password must be set together".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
