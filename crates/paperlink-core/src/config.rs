use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};

/// Root application configuration, loaded from `~/.config/paperlink/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub paths: PathsConfig,
    pub crawl: CrawlConfig,
    pub http: HttpConfig,
    pub uci: UciConfig,
    pub semantic_scholar: SemanticScholarConfig,
    pub knowledge_base: KnowledgeBaseConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub data_dir: String,
    pub dump_file: String,
    pub mapping_file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Progress is flushed after every record whose ID is a multiple of this value.
    pub checkpoint_interval: u32,
    /// Highest dataset ID crawled when the catalog listing is not used.
    pub last_index: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
    pub min_interval_ms: u64,
    pub max_retries: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UciConfig {
    pub site_url: String,
    pub api_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SemanticScholarConfig {
    pub base_url: String,
    pub api_key_env: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeBaseConfig {
    pub api_url: String,
    pub arxiv_property: String,
    pub cites_work_property: String,
    pub extracted_from_property: String,
    pub user_env: String,
    pub password_env: String,
}

// ─── Defaults ──────────────────────────────────────────────

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            dump_file: "uci_datasets_final.json".to_string(),
            mapping_file: "uci2mardi_dataset_mapping.txt".to_string(),
        }
    }
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            checkpoint_interval: 10,
            last_index: 968,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("paperlink/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            min_interval_ms: 250,
            max_retries: 0,
        }
    }
}

impl Default for UciConfig {
    fn default() -> Self {
        Self {
            site_url: "https://archive.ics.uci.edu".to_string(),
            api_url: "https://archive.ics.uci.edu/api".to_string(),
        }
    }
}

impl Default for SemanticScholarConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.semanticscholar.org/graph/v1".to_string(),
            api_key_env: "SEMANTIC_SCHOLAR_API_KEY".to_string(),
        }
    }
}

impl Default for KnowledgeBaseConfig {
    fn default() -> Self {
        Self {
            api_url: "https://portal.mardi4nfdi.de/w/api.php".to_string(),
            arxiv_property: "P21".to_string(),
            cites_work_property: "P223".to_string(),
            extracted_from_property: "P1689".to_string(),
            user_env: "MARDI_KG_USER".to_string(),
            password_env: "MARDI_KG_PASSWORD".to_string(),
        }
    }
}

// ─── Load / Save ───────────────────────────────────────────

impl AppConfig {
    /// Standard config file path: `~/.config/paperlink/config.toml`
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var("PAPERLINK_CONFIG") {
            return PathBuf::from(path);
        }

        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("paperlink")
            .join("config.toml")
    }

    /// Load config from disk, falling back to defaults if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        Self::load_from(&path)
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the pipeline cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.paths.dump_file.trim().is_empty() {
            return Err(CoreError::ConfigError("paths.dump_file is empty".into()));
        }
        let kb = &self.knowledge_base;
        for (key, value) in [
            ("arxiv_property", &kb.arxiv_property),
            ("cites_work_property", &kb.cites_work_property),
            ("extracted_from_property", &kb.extracted_from_property),
        ] {
            let valid = value.len() > 1
                && value.starts_with('P')
                && value[1..].chars().all(|c| c.is_ascii_digit());
            if !valid {
                return Err(CoreError::ConfigError(format!(
                    "knowledge_base.{key} is not a property ID: {value:?}"
                )));
            }
        }
        Ok(())
    }

    /// Save config to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let toml_str = toml::to_string_pretty(self)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }

    // ─── Derived paths ─────────────────────────────────────

    /// Path to the final crawl output (the "dump").
    pub fn dump_path(&self) -> PathBuf {
        PathBuf::from(&self.paths.data_dir).join(&self.paths.dump_file)
    }

    /// Path to the dataset → knowledge-base item mapping CSV.
    pub fn mapping_path(&self) -> PathBuf {
        PathBuf::from(&self.paths.data_dir).join(&self.paths.mapping_file)
    }

    /// Reads an optional secret from the environment variable named by `var`.
    pub fn secret_from_env(var: &str) -> Option<String> {
        std::env::var(var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = AppConfig::default();
        assert_eq!(cfg.crawl.checkpoint_interval, 10);
        assert_eq!(cfg.knowledge_base.cites_work_property, "P223");
        assert_eq!(cfg.knowledge_base.extracted_from_property, "P1689");
        assert_eq!(cfg.http.max_retries, 0);
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        let mut cfg = AppConfig::default();
        cfg.crawl.last_index = 12;
        cfg.save_to(&path).unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.crawl.last_index, 12);
        assert_eq!(loaded.uci.site_url, cfg.uci.site_url);
        assert_eq!(loaded.knowledge_base.api_url, cfg.knowledge_base.api_url);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[crawl]\ncheckpoint_interval = 5\n").unwrap();

        let loaded = AppConfig::load_from(&path).unwrap();
        assert_eq!(loaded.crawl.checkpoint_interval, 5);
        assert_eq!(loaded.crawl.last_index, 968);
        assert_eq!(loaded.paths.dump_file, "uci_datasets_final.json");
    }

    #[test]
    fn test_load_nonexistent_returns_default() {
        let cfg = AppConfig::load_from(Path::new("/tmp/nonexistent_paperlink_config.toml")).unwrap();
        assert_eq!(cfg.paths.data_dir, "./data");
    }

    #[test]
    fn test_invalid_property_is_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[knowledge_base]\ncites_work_property = \"cites\"\n").unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, CoreError::ConfigError(msg) if msg.contains("cites_work_property")));
        assert!(AppConfig::default().validate().is_ok());
    }

    #[test]
    fn test_derived_paths() {
        let cfg = AppConfig::default();
        assert!(cfg.dump_path().ends_with("uci_datasets_final.json"));
        assert!(cfg.mapping_path().ends_with("uci2mardi_dataset_mapping.txt"));
    }
}
