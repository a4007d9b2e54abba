use crate::cache::PriceCacheFile;
use crate::config::{ServiceSettings, UpdaterConfig};
use crate::error::Result;
use crate::fetcher::{HttpPriceSource, PriceFetcher, PriceSource};
use crate::host::HostServices;
use crate::merger::PriceMerger;
use crate::models::PriceSnapshot;
use crate::UPDATE_INTERVAL_SECS;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Cancellation flag for the recurring update task.
///
/// Shared between the scheduler and the fetcher; cancelling more than once is a no-op.
#[derive(Debug, Clone, Default)]
pub struct ScheduleHandle {
    token: CancellationToken,
}

impl ScheduleHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            info!("Cancelling recurring flea price updates");
            self.token.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the schedule has been cancelled
    pub async fn cancelled(&self) {
        self.token.cancelled().await
    }
}

/// Owns the update cycle: one run at startup, then one per interval
pub struct PriceUpdateScheduler {
    merger: Arc<PriceMerger>,
    schedule: ScheduleHandle,
    period: Duration,
    task: Option<JoinHandle<()>>,
}

impl PriceUpdateScheduler {
    /// Build a scheduler pulling from the configured HTTP endpoint
    pub async fn new(settings: &ServiceSettings, host: HostServices) -> Result<Self> {
        let source = HttpPriceSource::new(
            settings.prices_url.clone(),
            Duration::from_secs(settings.http_timeout_secs),
        )?;
        Self::with_source(Arc::new(source), settings, host).await
    }

    /// Build a scheduler around any price source.
    ///
    /// Loads the persisted config and captures the price snapshot before any
    /// cycle can touch the host tables.
    pub async fn with_source(
        source: Arc<dyn PriceSource>,
        settings: &ServiceSettings,
        host: HostServices,
    ) -> Result<Self> {
        let config = UpdaterConfig::load(settings.config_path()).await?;
        let schedule = ScheduleHandle::new();

        let fetcher = Arc::new(PriceFetcher::new(
            source,
            PriceCacheFile::new(settings.prices_path()),
            settings.config_path(),
            config,
            schedule.clone(),
        ));

        let snapshot = PriceSnapshot::capture(&host.database.read().await.prices);
        info!("Captured {} original flea prices", snapshot.len());

        Ok(Self {
            merger: Arc::new(PriceMerger::new(fetcher, snapshot, host)),
            schedule,
            period: Duration::from_secs(UPDATE_INTERVAL_SECS as u64),
            task: None,
        })
    }

    /// Override the time between scheduled cycles
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn schedule(&self) -> &ScheduleHandle {
        &self.schedule
    }

    pub fn merger(&self) -> &Arc<PriceMerger> {
        &self.merger
    }

    /// Whether the recurring task is alive
    pub fn is_running(&self) -> bool {
        self.task.as_ref().map_or(false, |task| !task.is_finished())
    }

    /// Run the startup cycle and, if it succeeds, start the recurring task.
    ///
    /// A live fetch is forced only when `nextUpdate` has passed; a failed
    /// startup cycle is returned without scheduling anything.
    pub async fn start(&mut self) -> Result<()> {
        let next_update = self.merger.fetcher().config().await.next_update;
        let force_fetch = Utc::now().timestamp() > next_update;
        info!(force_fetch, next_update, "Running startup flea price update");

        self.merger.apply_prices(force_fetch).await?;

        let merger = Arc::clone(&self.merger);
        let schedule = self.schedule.clone();
        let period = self.period;
        self.task = Some(tokio::spawn(async move {
            Self::run_recurring_updates(merger, schedule, period).await;
        }));

        info!("Scheduled flea price updates every {:?}", self.period);
        Ok(())
    }

    async fn run_recurring_updates(merger: Arc<PriceMerger>, schedule: ScheduleHandle, period: Duration) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = schedule.cancelled() => {
                    info!("Recurring flea price updates stopped");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = merger.apply_prices(true).await {
                        error!("Scheduled flea price update failed: {}", e);
                    }
                }
            }
        }
    }
}
