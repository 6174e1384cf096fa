use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub origin: OriginConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub sync: SyncConfig,
  #[serde(default)]
  pub push: PushConfig,
  /// Directory for the rolling log file (stderr only if unset)
  pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OriginConfig {
  /// Base URL every relative manifest entry and route resolves against
  #[serde(default = "default_origin")]
  pub url: String,
}

impl Default for OriginConfig {
  fn default() -> Self {
    Self {
      url: default_origin(),
    }
  }
}

fn default_origin() -> String {
  "http://localhost:8080/".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
  /// Generation token, e.g. "freightflow-v1.0.0". Bumping it invalidates every partition.
  pub version: String,
  /// Name prefix shared by every partition this manager owns
  pub prefix: String,
  /// Assets cached eagerly at install, in order
  pub manifest: Vec<String>,
  /// Path prefixes served network-first
  pub api_routes: Vec<String>,
  /// Navigation fallback document
  pub offline_page: String,
  /// SQLite file (default: $XDG_DATA_HOME/freightflow/cache.db)
  pub database: Option<PathBuf>,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      version: "freightflow-v1.0.0".to_string(),
      prefix: "freightflow-".to_string(),
      manifest: DEFAULT_MANIFEST.iter().map(|s| s.to_string()).collect(),
      api_routes: vec![
        "/api/trucks".to_string(),
        "/api/bookings".to_string(),
        "/api/tracking".to_string(),
      ],
      offline_page: "/offline.html".to_string(),
      database: None,
    }
  }
}

const DEFAULT_MANIFEST: &[&str] = &[
  "/",
  "/index.html",
  "/booking.html",
  "/dashboard.html",
  "/tracking.html",
  "/about.html",
  "/faq.html",
  "/css/variables.css",
  "/css/style.css",
  "/css/booking.css",
  "/css/checkout.css",
  "/css/dashboard.css",
  "/css/testimonials.css",
  "/css/mobile.css",
  "/js/main.js",
  "/js/search.js",
  "/js/payment.js",
  "/js/tracking.js",
  "/js/animations.js",
  "/data/cities.json",
  "https://fonts.googleapis.com/css2?family=Inter:wght@400;500;600;700&family=Space+Grotesk:wght@500;600;700&display=swap",
  "https://unpkg.com/feather-icons",
  "/offline.html",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
  /// Sync tag that triggers a replay of queued bookings
  pub tag: String,
  /// Endpoint queued writes are POSTed to
  pub endpoint: String,
}

impl Default for SyncConfig {
  fn default() -> Self {
    Self {
      tag: "sync-bookings".to_string(),
      endpoint: "/api/bookings".to_string(),
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PushConfig {
  pub default_title: String,
  pub default_body: String,
  pub icon: String,
  pub badge: String,
}

impl Default for PushConfig {
  fn default() -> Self {
    Self {
      default_title: "FreightFlow Update".to_string(),
      default_body: "New update available".to_string(),
      icon: "/assets/icons/icon-192x192.png".to_string(),
      badge: "/assets/icons/badge-72x72.png".to_string(),
    }
  }
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./freightflow.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/freightflow/config.yaml
  ///
  /// Falls back to the built-in defaults when no file is found.
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
      None => Ok(Self::default()),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("freightflow.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("freightflow").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  /// Parse configuration from a YAML document. An empty document yields the defaults.
  pub fn from_yaml(contents: &str) -> Result<Self> {
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    serde_yaml::from_str(contents).map_err(|e| eyre!("{}", e))
  }

  /// Resolve the cache database path.
  pub fn database_path(&self) -> Result<PathBuf> {
    if let Some(path) = &self.cache.database {
      return Ok(path.clone());
    }

    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("freightflow").join("cache.db"))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_empty_document_gives_defaults() {
    let config = Config::from_yaml("").unwrap();
    assert_eq!(config.cache.version, "freightflow-v1.0.0");
    assert_eq!(config.cache.manifest.len(), 23);
    assert_eq!(config.cache.offline_page, "/offline.html");
    assert_eq!(config.sync.tag, "sync-bookings");
    assert_eq!(config.origin.url, "http://localhost:8080/");
  }

  #[test]
  fn test_partial_sections_keep_other_defaults() {
    let yaml = r#"
origin:
  url: https://freightflow.example/
cache:
  version: freightflow-v2.0.0
"#;
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.origin.url, "https://freightflow.example/");
    assert_eq!(config.cache.version, "freightflow-v2.0.0");
    assert_eq!(config.cache.prefix, "freightflow-");
    assert_eq!(config.cache.api_routes.len(), 3);
    assert_eq!(config.push.default_title, "FreightFlow Update");
  }

  #[test]
  fn test_explicit_database_path_wins() {
    let yaml = "cache:\n  database: /tmp/ff.db\n";
    let config = Config::from_yaml(yaml).unwrap();
    assert_eq!(config.database_path().unwrap(), PathBuf::from("/tmp/ff.db"));
  }

  #[test]
  fn test_missing_explicit_file_is_an_error() {
    let result = Config::load(Some(Path::new("/nonexistent/freightflow.yaml")));
    assert!(result.is_err());
  }
}
