use crate::cache::PriceCacheFile;
use crate::config::UpdaterConfig;
use crate::error::{Result, UpdaterError};
use crate::models::PriceTable;
use crate::scheduler::ScheduleHandle;
use crate::UPDATE_INTERVAL_SECS;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{error, info, warn};

/// Where live price tables come from
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch and parse the full remote table
    async fn fetch(&self) -> Result<PriceTable>;

    /// Human-readable location, for logs
    fn location(&self) -> &str;
}

/// Price table served as a flat JSON object over HTTP
pub struct HttpPriceSource {
    client: Client,
    url: String,
}

impl HttpPriceSource {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, url: url.into() })
    }
}

#[async_trait]
impl PriceSource for HttpPriceSource {
    async fn fetch(&self) -> Result<PriceTable> {
        let response = self.client.get(&self.url).send().await?.error_for_status()?;
        let prices: PriceTable = response.json().await?;
        Ok(prices)
    }

    fn location(&self) -> &str {
        &self.url
    }
}

/// Pulls the remote table, keeps the cache file and `nextUpdate` current,
/// and retries failed pulls up to `maxRetries` times
pub struct PriceFetcher {
    source: Arc<dyn PriceSource>,
    cache: PriceCacheFile,
    config_path: PathBuf,
    config: Mutex<UpdaterConfig>,
    schedule: ScheduleHandle,
}

impl PriceFetcher {
    pub fn new(
        source: Arc<dyn PriceSource>,
        cache: PriceCacheFile,
        config_path: impl Into<PathBuf>,
        config: UpdaterConfig,
        schedule: ScheduleHandle,
    ) -> Self {
        Self { source, cache, config_path: config_path.into(), config: Mutex::new(config), schedule }
    }

    /// Current copy of the persisted config
    pub async fn config(&self) -> UpdaterConfig {
        self.config.lock().await.clone()
    }

    /// Schedule this fetcher cancels once retries run out
    pub fn schedule(&self) -> &ScheduleHandle {
        &self.schedule
    }

    /// Return the current price table.
    ///
    /// Goes to the network when `force` is set or no cache file exists;
    /// otherwise returns the cache file contents unchanged.
    pub async fn fetch_prices(&self, force: bool) -> Result<PriceTable> {
        let fetch_required = force || !self.cache.exists().await?;
        if !fetch_required {
            info!("Using cached flea prices from {:?}", self.cache.path());
            return self.cache.load().await;
        }

        let max_retries = self.config.lock().await.max_retries;
        let mut attempts: u32 = 0;

        loop {
            attempts = attempts.saturating_add(1);
            info!("Fetching flea prices from {}...", self.source.location());

            match self.fetch_and_persist().await {
                Ok(prices) => return Ok(prices),
                Err(e) if attempts <= max_retries => {
                    warn!("Error fetching flea prices: {}, retrying. Attempt #{}", e, attempts);
                }
                Err(e) => {
                    error!("Retry count reached, stopping fetch attempts.");
                    self.schedule.cancel();
                    return Err(UpdaterError::FetchExhausted { attempts, last_error: Box::new(e) });
                }
            }
        }
    }

    /// One attempt: download, then write the cache and config. A failed write
    /// counts as a failed attempt.
    async fn fetch_and_persist(&self) -> Result<PriceTable> {
        let prices = self.source.fetch().await?;
        info!("Successfully fetched {} flea prices", prices.len());
        self.persist(&prices).await?;
        Ok(prices)
    }

    /// Overwrite the cache file and push `nextUpdate` one interval ahead
    async fn persist(&self, prices: &PriceTable) -> Result<()> {
        self.cache.store(prices).await?;

        let mut config = self.config.lock().await;
        config.next_update = Utc::now().timestamp() + UPDATE_INTERVAL_SECS;
        config.save(&self.config_path).await?;

        info!("Next flea price update due at {}", config.next_update);
        Ok(())
    }
}
