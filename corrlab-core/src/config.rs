//! Run-scoped fetch configuration.
//!
//! Built once at startup and passed in; the core never reads environment
//! variables or globals on its own. A missing credential is the only fault
//! that aborts a run.

use crate::data::DataError;
use std::path::PathBuf;

/// Environment variable holding the API credential.
pub const API_KEY_VAR: &str = "POLYGON_API_KEY";

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub api_key: String,
    pub cache_dir: PathBuf,
    pub adjusted: bool,
}

impl FetchConfig {
    pub fn new(api_key: impl Into<String>, cache_dir: impl Into<PathBuf>, adjusted: bool) -> Self {
        Self {
            api_key: api_key.into(),
            cache_dir: cache_dir.into(),
            adjusted,
        }
    }

    /// Read the credential from [`API_KEY_VAR`]. Unset or empty is fatal.
    pub fn from_env(cache_dir: impl Into<PathBuf>, adjusted: bool) -> Result<Self, DataError> {
        let api_key = std::env::var(API_KEY_VAR)
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(DataError::MissingApiKey)?;
        Ok(Self::new(api_key, cache_dir, adjusted))
    }
}
