//! Configuration
//!
//! Suggested network parameters are read from a JSON file. Integer fields
//! are signed in the file, as node tooling writes them, and are validated
//! before they become [`SuggestedParams`].

use std::fs;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::SuggestedParams;
use crate::crypto::Digest;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("all integer arguments must be >= 0: {field} is {value}")]
    Negative { field: &'static str, value: i64 },
    #[error("Invalid genesis hash: {0}")]
    GenesisHash(String),
}

/// Suggested parameters as stored on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuggestedParamsFile {
    pub fee: i64,
    #[serde(default)]
    pub genesis_id: String,
    /// Standard base64 of the 32-byte genesis hash
    pub genesis_hash: String,
    pub first_valid: i64,
    pub last_valid: i64,
    #[serde(default)]
    pub flat_fee: bool,
}

impl SuggestedParamsFile {
    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        let file = serde_json::from_str(&json)?;
        log::debug!("Loaded suggested params from {:?}", path);
        Ok(file)
    }

    /// Write as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Validate and convert
    ///
    /// # Errors
    /// A negative integer field or a genesis hash that is not 32 bytes of
    /// base64.
    pub fn to_params(&self) -> Result<SuggestedParams, ConfigError> {
        let bytes = STANDARD
            .decode(self.genesis_hash.as_bytes())
            .map_err(|e| ConfigError::GenesisHash(e.to_string()))?;
        let genesis_hash = Digest::from_slice(&bytes)
            .ok_or_else(|| ConfigError::GenesisHash(format!("{} bytes, expected 32", bytes.len())))?;

        Ok(SuggestedParams {
            fee: non_negative("fee", self.fee)?,
            genesis_id: self.genesis_id.clone(),
            genesis_hash,
            first_valid: non_negative("first_valid", self.first_valid)?,
            last_valid: non_negative("last_valid", self.last_valid)?,
            flat_fee: self.flat_fee,
        })
    }
}

impl From<&SuggestedParams> for SuggestedParamsFile {
    fn from(params: &SuggestedParams) -> Self {
        Self {
            fee: clamp(params.fee),
            genesis_id: params.genesis_id.clone(),
            genesis_hash: params.genesis_hash.to_base64(),
            first_valid: clamp(params.first_valid),
            last_valid: clamp(params.last_valid),
            flat_fee: params.flat_fee,
        }
    }
}

fn non_negative(field: &'static str, value: i64) -> Result<u64, ConfigError> {
    u64::try_from(value).map_err(|_| ConfigError::Negative { field, value })
}

fn clamp(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Settings of the command-line tool
#[derive(Debug, Clone)]
pub struct CliConfig {
    /// Suggested params file used when a command needs one
    pub params_file: PathBuf,
    /// `env_logger` filter when `RUST_LOG` is unset
    pub log_filter: String,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            params_file: PathBuf::from("suggested_params.json"),
            log_filter: "info".to_string(),
        }
    }
}
