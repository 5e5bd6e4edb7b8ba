//! On-disk session state: the market.csgo API key, the user's exchange
//! rates and the rows from the most recent scan. The last rows are kept
//! only so `export` and `sheet` can reuse them without re-fetching.

use crate::core::quote::MergedRow;
use crate::core::valuation::ExchangeRates;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    pub api_key: Option<String>,
    #[serde(default)]
    pub rates: ExchangeRates,
    #[serde(default)]
    pub last_results: Vec<MergedRow>,
    pub scanned_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Loads the session file, or a default session if none exists yet.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("No session file at {}, starting fresh", path.display());
            return Ok(Session::default());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read session file: {}", path.display()))?;
        let session = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse session file: {}", path.display()))?;
        Ok(session)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write session file: {}", path.display()))?;
        debug!("Saved session to {}", path.display());
        Ok(())
    }

    /// The stored API key, or an empty token when none was set. The
    /// remote side rejects an empty token, which then degrades to an
    /// empty quote list like any other remote failure.
    pub fn api_key_or_empty(&self) -> &str {
        self.api_key.as_deref().unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_file_yields_default() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::load(&dir.path().join("session.json")).unwrap();

        assert!(session.api_key.is_none());
        assert_eq!(session.api_key_or_empty(), "");
        assert_eq!(session.rates, ExchangeRates::default());
        assert!(session.last_results.is_empty());
        assert!(session.scanned_at.is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let session = Session {
            api_key: Some("secret-key".to_string()),
            rates: ExchangeRates {
                usdt_to_rub: 80.0,
                cny_to_usdt: 7.0,
            },
            last_results: vec![MergedRow {
                description: "AK-47 | Redline".to_string(),
                buff_price: 100.0,
                market_price: 95.0,
            }],
            scanned_at: Some(Utc::now()),
        };
        session.save(&path).unwrap();

        let loaded = Session::load(&path).unwrap();
        assert_eq!(loaded.api_key.as_deref(), Some("secret-key"));
        assert_eq!(loaded.rates.usdt_to_rub, 80.0);
        assert_eq!(loaded.last_results, session.last_results);
        assert!(loaded.scanned_at.is_some());
    }

    #[test]
    fn test_corrupt_session_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "not json").unwrap();

        assert!(Session::load(&path).is_err());
    }
}
