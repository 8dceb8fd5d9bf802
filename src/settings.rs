//! Server configuration and persisted host settings.

use crate::llm::LlmConfig;
use crate::types::{HouseRules, MAX_DIFFICULTY, MIN_DIFFICULTY};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

const DEFAULT_DATA_DIR: &str = "data";
/// Shown instead of stored secrets
pub const REDACTED: &str = "********";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Settings I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings JSON invalid: {0}")]
    Json(#[from] serde_json::Error),
}

/// Process-level configuration from the environment
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub data_dir: PathBuf,
}

impl ServerConfig {
    pub fn from_env() -> Self {
        let addr = std::env::var("WHEELDASH_ADDR")
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .and_then(|raw| match raw.parse() {
                Ok(addr) => Some(addr),
                Err(e) => {
                    tracing::warn!("Ignoring WHEELDASH_ADDR={:?}: {}", raw, e);
                    None
                }
            })
            .unwrap_or_else(default_addr);

        let data_dir = std::env::var("WHEELDASH_DATA_DIR")
            .ok()
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));

        Self { addr, data_dir }
    }

    pub fn settings_path(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }

    pub fn puzzles_path(&self) -> PathBuf {
        self.data_dir.join("puzzles.json")
    }
}

fn default_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 6574))
}

/// Host preferences saved from the settings screen
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    pub openai_api_key: Option<String>,
    pub openai_model: Option<String>,
    pub ollama_base_url: Option<String>,
    pub ollama_model: Option<String>,
    pub house_rules: HouseRules,
    /// Difficulty given to computer players added without one
    pub default_difficulty: u8,
    pub preferred_category: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_model: None,
            ollama_base_url: None,
            ollama_model: None,
            house_rules: HouseRules::default(),
            default_difficulty: 2,
            preferred_category: None,
        }
    }
}

fn filled(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl Settings {
    /// Stored provider values win over the environment
    pub fn apply_to(&self, config: &mut LlmConfig) {
        if let Some(key) = filled(&self.openai_api_key) {
            config.openai_api_key = Some(key);
        }
        if let Some(model) = filled(&self.openai_model) {
            config.openai_model = model;
        }
        if let Some(url) = filled(&self.ollama_base_url) {
            config.ollama_base_url = Some(url);
        }
        if let Some(model) = filled(&self.ollama_model) {
            config.ollama_model = model;
        }
    }

    /// Copy safe to send to clients
    pub fn redacted(&self) -> Self {
        Self {
            openai_api_key: self.openai_api_key.as_ref().map(|_| REDACTED.to_string()),
            ..self.clone()
        }
    }

    fn sanitized(mut self, previous: &Settings) -> Self {
        // A redacted key coming back from the UI means "unchanged"
        if self.openai_api_key.as_deref() == Some(REDACTED) {
            self.openai_api_key = previous.openai_api_key.clone();
        }
        self.default_difficulty = self.default_difficulty.clamp(MIN_DIFFICULTY, MAX_DIFFICULTY);
        self.house_rules.vowel_cost = self.house_rules.vowel_cost.max(0);
        self
    }
}

/// Settings bound to their file
pub struct SettingsStore {
    path: Option<PathBuf>,
    settings: Settings,
}

impl SettingsStore {
    /// Defaults that are never written to disk
    pub fn in_memory() -> Self {
        Self {
            path: None,
            settings: Settings::default(),
        }
    }

    /// Read settings; a missing or corrupt file yields defaults
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let settings = match std::fs::read_to_string(&path) {
            Ok(text) => match serde_json::from_str::<Settings>(&text) {
                Ok(settings) => settings.sanitized(&Settings::default()),
                Err(e) => {
                    tracing::warn!("Settings at {} invalid ({}), using defaults", path.display(), e);
                    Settings::default()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Settings::default(),
            Err(e) => {
                tracing::warn!("Settings at {} unreadable ({}), using defaults", path.display(), e);
                Settings::default()
            }
        };
        Self {
            path: Some(path),
            settings,
        }
    }

    pub fn get(&self) -> &Settings {
        &self.settings
    }

    /// Replace and persist
    pub fn save(&mut self, settings: Settings) -> Result<&Settings, SettingsError> {
        let settings = settings.sanitized(&self.settings);
        if let Some(path) = &self.path {
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(path, serde_json::to_string_pretty(&settings)?)?;
            tracing::info!("Settings saved to {}", path.display());
        }
        self.settings = settings;
        Ok(&self.settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let store = SettingsStore::load(dir.path().join("settings.json"));
        assert_eq!(store.get(), &Settings::default());
    }

    #[test]
    fn test_corrupt_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert_eq!(SettingsStore::load(&path).get(), &Settings::default());
    }

    #[test]
    fn test_save_round_trips_and_keeps_redacted_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        let mut store = SettingsStore::load(&path);

        let mut settings = Settings {
            openai_api_key: Some("sk-secret".to_string()),
            default_difficulty: 9,
            ..Settings::default()
        };
        store.save(settings.clone()).unwrap();
        assert_eq!(store.get().default_difficulty, MAX_DIFFICULTY);

        let shown = store.get().redacted();
        assert_eq!(shown.openai_api_key.as_deref(), Some(REDACTED));

        settings = shown;
        settings.preferred_category = Some("Food".to_string());
        store.save(settings).unwrap();

        let reloaded = SettingsStore::load(&path);
        assert_eq!(reloaded.get().openai_api_key.as_deref(), Some("sk-secret"));
        assert_eq!(reloaded.get().preferred_category.as_deref(), Some("Food"));
    }

    #[test]
    fn test_in_memory_store_keeps_secret() {
        let mut store = SettingsStore::in_memory();
        store
            .save(Settings {
                openai_api_key: Some("sk-a".to_string()),
                ..Settings::default()
            })
            .unwrap();
        store.save(store.get().redacted()).unwrap();
        assert_eq!(store.get().openai_api_key.as_deref(), Some("sk-a"));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, r#"{"preferred_category": "Animal"}"#).unwrap();
        let store = SettingsStore::load(&path);
        assert_eq!(store.get().preferred_category.as_deref(), Some("Animal"));
        assert_eq!(store.get().house_rules, HouseRules::default());
    }

    #[test]
    fn test_settings_override_llm_config() {
        let settings = Settings {
            openai_api_key: Some(" sk-x ".to_string()),
            ollama_model: Some("   ".to_string()),
            ..Settings::default()
        };
        let mut config = LlmConfig::default();
        settings.apply_to(&mut config);
        assert_eq!(config.openai_api_key.as_deref(), Some("sk-x"));
        assert_eq!(config.ollama_model, "llama3.2");
    }

    #[test]
    #[serial]
    fn test_server_config_from_env() {
        std::env::set_var("WHEELDASH_ADDR", "127.0.0.1:9000");
        std::env::set_var("WHEELDASH_DATA_DIR", "/tmp/wheeldash");
        let config = ServerConfig::from_env();
        assert_eq!(config.addr, "127.0.0.1:9000".parse().unwrap());
        assert_eq!(config.puzzles_path(), PathBuf::from("/tmp/wheeldash/puzzles.json"));

        std::env::set_var("WHEELDASH_ADDR", "not an address");
        std::env::remove_var("WHEELDASH_DATA_DIR");
        let config = ServerConfig::from_env();
        assert_eq!(config.addr.to_string(), "0.0.0.0:6574");
        assert_eq!(config.data_dir, PathBuf::from("data"));

        std::env::remove_var("WHEELDASH_ADDR");
    }
}
