//! Configuration for the toll booth.
//!
//! Looked up from `$TOLLGATE_CONFIG`, then `./tollgate.json`, then built-in
//! defaults. `TOLLGATE_DB`, `TOLLGATE_BIND` and `TOLLGATE_RECOGNIZER_URL`
//! override the file.

use crate::db::{default_seed, load_seed_csv, Ledger};
use crate::engine::TollEngine;
use crate::money::Amount;
use crate::outcome::Presentation;
use crate::pipeline::TollBooth;
use crate::recognizer::{HttpRecognizer, Recognizer, UnconfiguredRecognizer};
use anyhow::{bail, Context, Result};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

pub const CONFIG_ENV: &str = "TOLLGATE_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "tollgate.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// SQLite ledger file
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Address the HTTP server listens on
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Fixed amount charged per passage
    #[serde(default = "default_toll_amount")]
    pub toll_amount: Amount,

    #[serde(default = "default_currency_symbol")]
    pub currency_symbol: String,

    /// Fractional digits shown in response messages
    #[serde(default = "default_decimal_places")]
    pub decimal_places: u32,

    /// OCR sidecar endpoint; recognition is unavailable when unset
    #[serde(default)]
    pub recognizer_url: Option<String>,

    #[serde(default = "default_recognizer_timeout_secs")]
    pub recognizer_timeout_secs: u64,

    /// Longest frame side passed to the recognizer
    #[serde(default = "default_max_frame_dim")]
    pub max_frame_dim: u32,

    #[serde(default = "default_max_payload_bytes")]
    pub max_payload_bytes: usize,

    /// CSV used instead of the demo vehicles when the ledger is created
    #[serde(default)]
    pub seed_file: Option<PathBuf>,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("plates.db")
}

fn default_bind_addr() -> String {
    "0.0.0.0:5000".to_string()
}

fn default_toll_amount() -> Amount {
    Amount::from_minor(5000).unwrap_or_default()
}

fn default_currency_symbol() -> String {
    "₹".to_string()
}

fn default_decimal_places() -> u32 {
    2
}

fn default_recognizer_timeout_secs() -> u64 {
    10
}

fn default_max_frame_dim() -> u32 {
    crate::frame::DEFAULT_MAX_DIM
}

fn default_max_payload_bytes() -> usize {
    10 * 1024 * 1024
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            bind_addr: default_bind_addr(),
            toll_amount: default_toll_amount(),
            currency_symbol: default_currency_symbol(),
            decimal_places: default_decimal_places(),
            recognizer_url: None,
            recognizer_timeout_secs: default_recognizer_timeout_secs(),
            max_frame_dim: default_max_frame_dim(),
            max_payload_bytes: default_max_payload_bytes(),
            seed_file: None,
        }
    }
}

impl Config {
    /// Resolve the config file, apply env overrides, validate
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::from_file(Path::new(&path))?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Config::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;
        let config: Config = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {:?}", path))?;
        Ok(config)
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(db) = lookup("TOLLGATE_DB") {
            self.database_path = PathBuf::from(db);
        }
        if let Some(bind) = lookup("TOLLGATE_BIND") {
            self.bind_addr = bind;
        }
        if let Some(url) = lookup("TOLLGATE_RECOGNIZER_URL") {
            self.recognizer_url = Some(url).filter(|u| !u.trim().is_empty());
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.toll_amount.is_zero() {
            bail!("toll_amount must be positive");
        }
        if self.decimal_places > 6 {
            bail!("decimal_places must be at most 6 (got {})", self.decimal_places);
        }
        if self.recognizer_timeout_secs == 0 {
            bail!("recognizer_timeout_secs must be at least 1");
        }
        Ok(())
    }

    pub fn presentation(&self) -> Presentation {
        Presentation {
            currency_symbol: self.currency_symbol.clone(),
            decimal_places: self.decimal_places,
        }
    }

    pub fn recognizer(&self) -> Result<Arc<dyn Recognizer>> {
        match self.recognizer_url.as_deref() {
            Some(url) => {
                let timeout = Duration::from_secs(self.recognizer_timeout_secs);
                let recognizer = HttpRecognizer::new(url, timeout)?;
                info!("Recognizer: OCR server at {}", url);
                Ok(Arc::new(recognizer))
            }
            None => {
                warn!("No recognizer_url configured; frames will be rejected");
                Ok(Arc::new(UnconfiguredRecognizer))
            }
        }
    }

    /// Open the ledger, seeding it while it holds no vehicles
    pub fn open_ledger(&self) -> Result<Ledger> {
        // Validate seed data before anything touches the database
        let records = match &self.seed_file {
            Some(path) => load_seed_csv(path)?,
            None => default_seed(),
        };

        let ledger = Ledger::open(&self.database_path)
            .with_context(|| format!("Failed to open ledger {:?}", self.database_path))?;

        if ledger.count_vehicles()? == 0 {
            ledger.seed(&records)?;
        }

        Ok(ledger)
    }

    pub fn build_booth(&self) -> Result<TollBooth> {
        self.build_booth_with(self.recognizer()?)
    }

    /// Same as `build_booth` with a caller-supplied recognizer
    pub fn build_booth_with(&self, recognizer: Arc<dyn Recognizer>) -> Result<TollBooth> {
        let ledger = Arc::new(self.open_ledger()?);
        let engine = TollEngine::new(ledger, self.toll_amount)?;

        Ok(TollBooth::new(
            recognizer,
            engine,
            self.presentation(),
            self.max_frame_dim,
        ))
    }
}

impl std::fmt::Display for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Database:       {}", self.database_path.display())?;
        writeln!(f, "Bind address:   {}", self.bind_addr)?;
        writeln!(f, "Toll amount:    {}{}", self.currency_symbol, self.toll_amount)?;
        writeln!(
            f,
            "Recognizer:     {}",
            self.recognizer_url.as_deref().unwrap_or("(not configured)")
        )?;
        write!(f, "Max frame dim:  {}", self.max_frame_dim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.toll_amount, Amount::parse("50").unwrap());
        assert_eq!(config.max_frame_dim, 640);
        assert!(config.recognizer_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"toll_amount": "75.50", "currency_symbol": "$"}}"#).unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.toll_amount, Amount::parse("75.5").unwrap());
        assert_eq!(config.currency_symbol, "$");
        assert_eq!(config.bind_addr, "0.0.0.0:5000");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("TOLLGATE_DB", "/tmp/other.db"),
            ("TOLLGATE_RECOGNIZER_URL", "http://127.0.0.1:8000/ocr"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.database_path, PathBuf::from("/tmp/other.db"));
        assert_eq!(config.recognizer_url.as_deref(), Some("http://127.0.0.1:8000/ocr"));
        assert_eq!(config.bind_addr, "0.0.0.0:5000");
    }

    #[test]
    fn test_validation_rejects_zero_toll() {
        let config = Config {
            toll_amount: Amount::ZERO,
            ..Config::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_open_ledger_seeds_only_new_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            database_path: dir.path().join("plates.db"),
            ..Config::default()
        };

        let ledger = config.open_ledger().unwrap();
        assert_eq!(ledger.count_vehicles().unwrap(), 3);

        ledger
            .compare_and_deduct("HR99G1000", Amount::parse("50").unwrap())
            .unwrap();

        // Second start leaves existing data alone
        let reopened = config.open_ledger().unwrap();
        let record = reopened.get("HR99G1000").unwrap().unwrap();
        assert_eq!(record.balance, Amount::parse("250").unwrap());
    }

    #[test]
    fn test_bad_seed_file_does_not_block_later_seeding() {
        let dir = tempfile::tempdir().unwrap();
        let seed_path = dir.path().join("vehicles.csv");
        let header = "plate_id,owner_name,model,balance\n";
        std::fs::write(&seed_path, format!("{}AB12,Ann,Polo,-5\n", header)).unwrap();

        let config = Config {
            database_path: dir.path().join("plates.db"),
            seed_file: Some(seed_path.clone()),
            ..Config::default()
        };
        assert!(config.open_ledger().is_err());

        std::fs::write(&seed_path, format!("{}AB12,Ann,Polo,5\n", header)).unwrap();
        let ledger = config.open_ledger().unwrap();
        assert_eq!(ledger.count_vehicles().unwrap(), 1);
        assert_eq!(
            ledger.get("AB12").unwrap().unwrap().balance,
            Amount::parse("5").unwrap()
        );
    }
}
