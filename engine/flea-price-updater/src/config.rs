use crate::error::{Result, UpdaterError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Default source for the remote price table
pub const DEFAULT_PRICES_URL: &str =
    "https://raw.githubusercontent.com/DrakiaXYZ/SPT-LiveFleaPriceDB/main/prices.json";

/// File name of the persisted updater config inside the data directory
pub const CONFIG_FILE_NAME: &str = "config.json";

/// File name of the price cache inside the data directory
pub const PRICES_FILE_NAME: &str = "prices.json";

/// Upper bound accepted for `maxRetries`
pub const MAX_RETRIES_LIMIT: u32 = 1_000;

/// Persisted updater state, stored as `config.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdaterConfig {
    /// Epoch seconds after which startup forces a live fetch
    pub next_update: i64,

    /// Upper bound on a fetched price as a multiple of its base price
    pub max_increase_mult: f64,

    /// Retries allowed after the first failed fetch attempt
    pub max_retries: u32,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self { next_update: 0, max_increase_mult: 2.0, max_retries: 3 }
    }
}

impl UpdaterConfig {
    /// Load the config from disk. A missing or malformed file is an error.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !tokio::fs::try_exists(path).await? {
            return Err(UpdaterError::MissingConfig(path.to_path_buf()));
        }

        let json_content = tokio::fs::read_to_string(path).await?;
        let config: Self = serde_json::from_str(&json_content)?;
        config.validate()?;

        debug!(?config, "Loaded updater config from {:?}", path);
        Ok(config)
    }

    /// Overwrite the config file with the current values
    pub async fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_json_pretty(path.as_ref(), self).await
    }

    /// Reject multipliers that would make every clamp meaningless and
    /// retry counts that would keep a dead endpoint busy indefinitely
    pub fn validate(&self) -> Result<()> {
        if self.max_retries > MAX_RETRIES_LIMIT {
            return Err(UpdaterError::config(format!(
                "maxRetries must be at most {}, got {}",
                MAX_RETRIES_LIMIT, self.max_retries
            )));
        }

        if !self.max_increase_mult.is_finite() || self.max_increase_mult <= 0.0 {
            return Err(UpdaterError::config(format!(
                "maxIncreaseMult must be a positive number, got {}",
                self.max_increase_mult
            )));
        }
        Ok(())
    }
}

/// Process settings, read from `FLEA_`-prefixed environment variables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceSettings {
    /// Directory holding `config.json` and `prices.json`
    pub data_dir: PathBuf,

    /// Remote price table location
    pub prices_url: String,

    /// Request timeout for the price endpoint
    pub http_timeout_secs: u64,

    /// Host tables file used by the standalone binary
    pub host_database: PathBuf,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("config"),
            prices_url: DEFAULT_PRICES_URL.to_string(),
            http_timeout_secs: 30,
            host_database: PathBuf::from("database.json"),
        }
    }
}

impl ServiceSettings {
    /// Load settings from the environment (and `.env`), falling back to defaults
    pub fn from_env() -> Result<Self> {
        // dotenv loads .env, but doesn't override already-set env vars
        dotenv::dotenv().ok();

        let defaults = Self::default();
        let settings: Self = config::Config::builder()
            .set_default("data_dir", defaults.data_dir.to_string_lossy().to_string())?
            .set_default("prices_url", defaults.prices_url)?
            .set_default("http_timeout_secs", defaults.http_timeout_secs)?
            .set_default("host_database", defaults.host_database.to_string_lossy().to_string())?
            .add_source(config::Environment::with_prefix("FLEA").try_parsing(true))
            .build()?
            .try_deserialize()?;

        if settings.prices_url.is_empty() {
            return Err(UpdaterError::config("FLEA_PRICES_URL must not be empty"));
        }

        Ok(settings)
    }

    pub fn config_path(&self) -> PathBuf {
        self.data_dir.join(CONFIG_FILE_NAME)
    }

    pub fn prices_path(&self) -> PathBuf {
        self.data_dir.join(PRICES_FILE_NAME)
    }
}

/// Serialize `value` with 4-space indentation and overwrite `path`
pub(crate) async fn write_json_pretty<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut serializer)?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    tokio::fs::write(path, buf).await?;
    Ok(())
}
