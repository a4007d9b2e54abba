//! On-disk copy of the last fetched price table

use crate::config::write_json_pretty;
use crate::error::Result;
use crate::models::PriceTable;
use std::path::{Path, PathBuf};
use tracing::debug;

/// The `prices.json` fallback used when no live fetch is requested
#[derive(Debug, Clone)]
pub struct PriceCacheFile {
    path: PathBuf,
}

impl PriceCacheFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn exists(&self) -> Result<bool> {
        Ok(tokio::fs::try_exists(&self.path).await?)
    }

    /// Read the cached table as-is; no staleness check
    pub async fn load(&self) -> Result<PriceTable> {
        let json_content = tokio::fs::read_to_string(&self.path).await?;
        let prices: PriceTable = serde_json::from_str(&json_content)?;
        debug!("Loaded {} cached prices from {:?}", prices.len(), self.path);
        Ok(prices)
    }

    /// Overwrite the cache with a freshly fetched table
    pub async fn store(&self, prices: &PriceTable) -> Result<()> {
        write_json_pretty(&self.path, prices).await?;
        debug!("Stored {} prices to {:?}", prices.len(), self.path);
        Ok(())
    }
}
