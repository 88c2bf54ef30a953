use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{AppError, Result};
use crate::routes::RouteConfig;

/// Environment variable overriding every other state directory setting
pub const STATE_DIR_ENV: &str = "GOAT_STATE_DIR";

/// App controller configuration, read from JSON or TOML with camelCase keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AppConfig {
    pub name: String,
    pub lang: String,
    pub fallback_lang: Option<String>,
    /// `{"en": {"key": "text"}, ...}`
    pub dictionaries: Map<String, Value>,
    /// Base URL relative request URLs are resolved against
    pub api: Option<String>,
    pub headers: BTreeMap<String, String>,
    /// 0 disables the request timeout
    pub timeout_ms: u64,
    /// Floor on how long a request takes to settle
    pub min_latency_ms: u64,
    pub state_dir: Option<PathBuf>,
    /// Values put in memory at startup unless the key is already persisted
    pub initial_state: Map<String, Value>,
    pub routes: Vec<RouteConfig>,
    /// Views by route name
    pub views: Map<String, Value>,
    /// Shared schema fragments, reachable as `$definitions/...`
    pub definitions: Map<String, Value>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "app".to_string(),
            lang: "en".to_string(),
            fallback_lang: None,
            dictionaries: Map::new(),
            api: None,
            headers: BTreeMap::new(),
            timeout_ms: 0,
            min_latency_ms: 1000,
            state_dir: None,
            initial_state: Map::new(),
            routes: Vec::new(),
            views: Map::new(),
            definitions: Map::new(),
        }
    }
}

impl AppConfig {
    /// Load from a `.json` or `.toml` file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| AppError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let parse_error = |message: String| AppError::ConfigParse {
            path: path.to_path_buf(),
            message,
        };
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&content).map_err(|e| parse_error(e.to_string())),
            Some("json") => serde_json::from_str(&content).map_err(|e| parse_error(e.to_string())),
            _ => Err(parse_error("expected a .json or .toml file".to_string())),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn min_latency(&self) -> Duration {
        Duration::from_millis(self.min_latency_ms)
    }

    /// Get the state directory path
    ///
    /// Priority order:
    /// 1. Environment variable GOAT_STATE_DIR (highest priority)
    /// 2. `stateDir` from the config
    /// 3. Platform data directory
    pub fn state_dir(&self) -> Result<PathBuf> {
        if let Ok(custom_dir) = std::env::var(STATE_DIR_ENV) {
            return Ok(PathBuf::from(custom_dir));
        }
        if let Some(dir) = &self.state_dir {
            return Ok(dir.clone());
        }
        let dirs = ProjectDirs::from("com", "goat", &self.name).ok_or(AppError::NoStateDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config: AppConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AppConfig::default());
        assert_eq!(config.timeout(), Duration::ZERO);
        assert_eq!(config.min_latency(), Duration::from_secs(1));
    }

    #[test]
    fn test_json_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.json");
        std::fs::write(
            &path,
            r#"{"name": "shop", "fallbackLang": "en", "timeoutMs": 500,
                "routes": [{"path": "/", "name": "home"}],
                "initialState": {"cart": []},
                "views": {"home": {"name": "home", "content": "Hi"}}}"#,
        )
        .unwrap();
        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.name, "shop");
        assert_eq!(config.fallback_lang.as_deref(), Some("en"));
        assert_eq!(config.timeout_ms, 500);
        assert_eq!(config.initial_state["cart"], json!([]));
        assert_eq!(config.routes[0].name.as_deref(), Some("home"));
        assert_eq!(config.views["home"]["content"], json!("Hi"));
    }

    #[test]
    fn test_toml_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("app.toml");
        std::fs::write(
            &path,
            r#"
name = "docs"
lang = "es"
api = "https://api.example.com/v1/"
minLatencyMs = 250

[headers]
Accept = "application/json"

[[routes]]
path = "/guides"
name = "guides"

[[routes.routes]]
path = ":slug"
name = "guide"
"#,
        )
        .unwrap();
        let config = AppConfig::from_file(&path).unwrap();
        assert_eq!(config.lang, "es");
        assert_eq!(config.min_latency(), Duration::from_millis(250));
        assert_eq!(config.headers["Accept"], "application/json");
        assert_eq!(config.routes[0].routes[0].path, ":slug");
    }

    #[test]
    fn test_bad_files() {
        let dir = TempDir::new().unwrap();
        let yaml = dir.path().join("app.yaml");
        std::fs::write(&yaml, "name: x").unwrap();
        assert!(matches!(AppConfig::from_file(&yaml), Err(AppError::ConfigParse { .. })));
        assert!(matches!(
            AppConfig::from_file(&dir.path().join("none.json")),
            Err(AppError::ConfigRead { .. })
        ));
    }

    #[test]
    fn test_state_dir_from_config() {
        if std::env::var(STATE_DIR_ENV).is_ok() {
            return;
        }
        let config = AppConfig {
            state_dir: Some(PathBuf::from("/tmp/goat-state")),
            ..AppConfig::default()
        };
        assert_eq!(config.state_dir().unwrap(), PathBuf::from("/tmp/goat-state"));
    }
}
