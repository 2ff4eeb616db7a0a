use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::warn;
use url::Url;

/// Longest accepted cache stale time (30 days)
const MAX_STALE_SECS: i64 = 30 * 24 * 60 * 60;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  pub api: ApiConfig,
  /// Custom title for header (defaults to the API host if not set)
  pub title: Option<String>,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub downloads: DownloadsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
  /// Origin of the maintenance API, e.g. "https://cmms.example.com".
  /// Request paths are absolute (`/api/...`), so a path here is rejected.
  pub base_url: String,
  /// Per-request timeout in seconds
  #[serde(default = "default_timeout_secs")]
  pub timeout_secs: u64,
  #[serde(default)]
  pub retry: RetryConfig,
}

impl ApiConfig {
  /// Scheme, host and port of the API; persisted cache entries are keyed by it.
  pub fn origin(&self) -> Result<String> {
    let url = parse_base_url(&self.base_url)?;
    Ok(url.origin().ascii_serialization())
  }
}

fn parse_base_url(base_url: &str) -> Result<Url> {
  let trimmed = base_url.trim();
  if trimmed.is_empty() {
    return Err(eyre!("api.base_url must not be empty"));
  }
  let url = Url::parse(trimmed).map_err(|e| eyre!("Invalid api.base_url '{}': {}", trimmed, e))?;
  if !matches!(url.scheme(), "http" | "https") {
    return Err(eyre!("api.base_url must be an http(s) URL, got '{}'", trimmed));
  }
  if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
    return Err(eyre!(
      "api.base_url must be an origin such as https://cmms.example.com, got '{}'",
      trimmed
    ));
  }
  Ok(url)
}

/// Retry policy for idempotent reads. Writes are never retried.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
  #[serde(default = "default_max_attempts")]
  pub max_attempts: u32,
  #[serde(default = "default_initial_backoff_ms")]
  pub initial_backoff_ms: u64,
}

impl Default for RetryConfig {
  fn default() -> Self {
    Self {
      max_attempts: default_max_attempts(),
      initial_backoff_ms: default_initial_backoff_ms(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// Keep the cache in SQLite between runs (enables offline browsing)
  #[serde(default = "default_true")]
  pub persist: bool,
  /// Seconds before a cached read is refetched even without invalidation
  #[serde(default = "default_stale_secs")]
  pub stale_secs: i64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      persist: true,
      stale_secs: default_stale_secs(),
    }
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DownloadsConfig {
  /// Where downloaded documents are written (defaults to the user's download dir)
  pub dir: Option<PathBuf>,
}

impl DownloadsConfig {
  pub fn resolve_dir(&self) -> PathBuf {
    self
      .dir
      .clone()
      .or_else(dirs::download_dir)
      .or_else(|| std::env::current_dir().ok())
      .unwrap_or_else(|| PathBuf::from("."))
  }
}

fn default_timeout_secs() -> u64 {
  30
}

fn default_max_attempts() -> u32 {
  3
}

fn default_initial_backoff_ms() -> u64 {
  250
}

fn default_stale_secs() -> i64 {
  300
}

fn default_true() -> bool {
  true
}

/// Credentials used to prefill the login form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
  pub username: String,
  pub password: String,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./m9s.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/m9s/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/m9s/config.yaml\n\
                 See config.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("m9s.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("m9s").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::parse(&contents).map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    config.validate()?;
    Ok(config)
  }

  /// Check values serde cannot: the base URL and the cache stale time.
  pub fn validate(&self) -> Result<()> {
    parse_base_url(&self.api.base_url)?;
    if !(0..=MAX_STALE_SECS).contains(&self.cache.stale_secs) {
      return Err(eyre!(
        "cache.stale_secs must be between 0 and {}, got {}",
        MAX_STALE_SECS,
        self.cache.stale_secs
      ));
    }
    Ok(())
  }

  /// Combine the result of `load` with a `--base-url` override.
  ///
  /// Without an explicit `--config`, a base URL alone is enough to run: a
  /// missing or unusable file is replaced by defaults, and the load error is
  /// logged so dropped settings do not go unnoticed.
  pub fn resolve(
    loaded: Result<Self>,
    base_url: Option<String>,
    explicit_path: bool,
  ) -> Result<Self> {
    let config = match (loaded, base_url) {
      (Ok(mut config), Some(base_url)) => {
        config.api.base_url = base_url;
        config
      }
      (Ok(config), None) => config,
      (Err(e), Some(base_url)) if !explicit_path => {
        warn!(error = %e, "config file not usable, running with --base-url and default settings");
        Self::from_base_url(base_url)
      }
      (Err(e), _) => return Err(e),
    };
    config.validate()?;
    Ok(config)
  }

  /// Build a config from just a base URL (used when `--base-url` is given
  /// and no config file exists).
  pub fn from_base_url(base_url: String) -> Self {
    Self {
      api: ApiConfig {
        base_url,
        timeout_secs: default_timeout_secs(),
        retry: RetryConfig::default(),
      },
      title: None,
      cache: CacheConfig::default(),
      downloads: DownloadsConfig::default(),
    }
  }

  /// Login form prefill from the environment.
  ///
  /// Reads M9S_USERNAME and M9S_PASSWORD; missing values are left empty.
  pub fn env_credentials() -> Credentials {
    Credentials {
      username: std::env::var("M9S_USERNAME").unwrap_or_default(),
      password: std::env::var("M9S_PASSWORD").unwrap_or_default(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_minimal_config_uses_defaults() {
    let config = Config::parse("api:\n  base_url: http://localhost:5000\n").unwrap();
    assert_eq!(config.api.timeout_secs, 30);
    assert_eq!(config.api.retry.max_attempts, 3);
    assert_eq!(config.api.retry.initial_backoff_ms, 250);
    assert!(config.cache.persist);
    assert_eq!(config.cache.stale_secs, 300);
    assert!(config.title.is_none());
  }

  #[test]
  fn test_full_config() {
    let yaml = r#"
api:
  base_url: https://cmms.example.com
  timeout_secs: 10
  retry:
    max_attempts: 5
    initial_backoff_ms: 100
title: Plant 3
cache:
  persist: false
  stale_secs: 60
downloads:
  dir: /tmp/m9s
"#;
    let config = Config::parse(yaml).unwrap();
    assert_eq!(config.api.timeout_secs, 10);
    assert_eq!(config.api.retry.max_attempts, 5);
    assert_eq!(config.title.as_deref(), Some("Plant 3"));
    assert!(!config.cache.persist);
    assert_eq!(config.downloads.resolve_dir(), PathBuf::from("/tmp/m9s"));
  }

  #[test]
  fn test_empty_base_url_is_rejected() {
    assert!(Config::parse("api:\n  base_url: \"\"\n").is_err());
  }

  #[test]
  fn test_base_url_must_be_an_origin() {
    assert!(Config::parse("api:\n  base_url: https://cmms.example.com/\n").is_ok());
    assert!(Config::parse("api:\n  base_url: https://host.example.com/cmms/\n").is_err());
    assert!(Config::parse("api:\n  base_url: https://host.example.com?tenant=3\n").is_err());
    assert!(Config::parse("api:\n  base_url: ftp://host.example.com\n").is_err());
    assert!(Config::parse("api:\n  base_url: not a url\n").is_err());
  }

  #[test]
  fn test_origin_ignores_trailing_slash_and_default_port() {
    let a = Config::from_base_url("https://cmms.example.com/".to_string());
    let b = Config::from_base_url("https://cmms.example.com:443".to_string());
    let c = Config::from_base_url("http://localhost:5000".to_string());
    assert_eq!(a.api.origin().unwrap(), "https://cmms.example.com");
    assert_eq!(b.api.origin().unwrap(), "https://cmms.example.com");
    assert_eq!(c.api.origin().unwrap(), "http://localhost:5000");
  }

  #[test]
  fn test_stale_secs_range() {
    let yaml = |secs: &str| format!("api:\n  base_url: http://localhost:5000\ncache:\n  stale_secs: {}\n", secs);
    assert!(Config::parse(&yaml("0")).is_ok());
    assert!(Config::parse(&yaml("-1")).is_err());
    assert!(Config::parse(&yaml("9223372036854775807")).is_err());
  }

  #[test]
  fn test_base_url_override_keeps_file_settings() {
    let loaded = Config::parse("api:\n  base_url: http://localhost:5000\n  timeout_secs: 5\n");
    let config = Config::resolve(loaded, Some("https://plant-b.example.com".to_string()), false).unwrap();
    assert_eq!(config.api.base_url, "https://plant-b.example.com");
    assert_eq!(config.api.timeout_secs, 5);
  }

  #[test]
  fn test_base_url_alone_replaces_unusable_file() {
    let loaded = Config::parse("api:\n  base_url: \"\"\n");
    let config = Config::resolve(loaded, Some("http://localhost:5000".to_string()), false).unwrap();
    assert_eq!(config.api.base_url, "http://localhost:5000");
    assert_eq!(config.api.timeout_secs, 30);

    // An explicitly named file must load
    let loaded = Config::load(Some(Path::new("/nonexistent/m9s.yaml")));
    assert!(Config::resolve(loaded, Some("http://localhost:5000".to_string()), true).is_err());
  }

  #[test]
  fn test_override_is_validated() {
    let loaded = Config::parse("api:\n  base_url: http://localhost:5000\n");
    assert!(Config::resolve(loaded, Some("https://host.example.com/cmms/".to_string()), false).is_err());
  }

  #[test]
  fn test_missing_explicit_path() {
    assert!(Config::load(Some(Path::new("/nonexistent/m9s.yaml"))).is_err());
  }
}
