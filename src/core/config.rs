use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct BuffProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct MarketProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProvidersConfig {
    pub buff: Option<BuffProviderConfig>,
    pub market: Option<MarketProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            buff: Some(BuffProviderConfig {
                base_url: "https://buff.163.com".to_string(),
            }),
            market: Some(MarketProviderConfig {
                base_url: "https://market.csgo.com".to_string(),
            }),
        }
    }
}

/// Remote spreadsheet the `sheet` command appends to. The endpoint is
/// Google-Sheets-v4 shaped; `base_url` is overridable for tests.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SheetConfig {
    #[serde(default = "default_sheet_base_url")]
    pub base_url: String,
    pub spreadsheet_id: String,
    #[serde(default = "default_sheet_range")]
    pub range: String,
    pub token: String,
}

fn default_sheet_base_url() -> String {
    "https://sheets.googleapis.com".to_string()
}

fn default_sheet_range() -> String {
    "Sheet1".to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Path to the goods JSON file (item name -> buff163_goods_id).
    pub goods_file: String,
    #[serde(default)]
    pub providers: ProvidersConfig,
    pub sheet: Option<SheetConfig>,
    /// Overrides the default session file location.
    pub session_path: Option<String>,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("io", "castle", "skinarb")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn session_path(&self) -> Result<PathBuf> {
        if let Some(custom_path) = &self.session_path {
            return Ok(PathBuf::from(custom_path));
        }
        let proj_dirs = ProjectDirs::from("io", "castle", "skinarb")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.data_dir().join("session.json"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
