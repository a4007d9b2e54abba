use crate::error::Result;
use crate::fetcher::PriceFetcher;
use crate::host::{HostServices, HostTables};
use crate::models::{Handbook, MergeSummary, PriceSnapshot, PriceTable};
use std::sync::Arc;
use tracing::{debug, info};

/// Base price for the clamp: startup snapshot, then handbook, then zero
pub fn resolve_base_price(item_id: &str, snapshot: &PriceSnapshot, handbook: &Handbook) -> f64 {
    snapshot.get(item_id).or_else(|| handbook.price_of(item_id)).unwrap_or(0.0)
}

/// Bound `fetched` to `base * max_increase_mult`.
///
/// A zero maximum is still a valid target, so items without any known base
/// price end up at zero. Returns the price to write and whether it was clamped.
pub fn clamp_price(fetched: f64, base: f64, max_increase_mult: f64) -> (f64, bool) {
    let max_price = base * max_increase_mult;
    if max_price != 0.0 && fetched <= max_price {
        (fetched, false)
    } else {
        (max_price, true)
    }
}

/// Write clamped fetched prices into the host price table.
/// Items missing from the host item table are left alone.
pub fn merge_prices(
    fetched: &PriceTable,
    snapshot: &PriceSnapshot,
    tables: &mut HostTables,
    max_increase_mult: f64,
) -> MergeSummary {
    let mut summary = MergeSummary::default();

    for (item_id, &fetched_price) in fetched {
        if !tables.items.contains_key(item_id) {
            summary.skipped += 1;
            continue;
        }

        let base = resolve_base_price(item_id, snapshot, &tables.handbook);
        let (price, clamped) = clamp_price(fetched_price, base, max_increase_mult);
        if clamped {
            debug!(item_id = %item_id, fetched = fetched_price, base, price, "clamped flea price");
            summary.clamped += 1;
        } else {
            summary.passed_through += 1;
        }

        tables.prices.insert(item_id.clone(), price);
    }

    summary
}

/// Runs one fetch-and-apply cycle against the host tables
pub struct PriceMerger {
    fetcher: Arc<PriceFetcher>,
    snapshot: PriceSnapshot,
    host: HostServices,
}

impl PriceMerger {
    pub fn new(fetcher: Arc<PriceFetcher>, snapshot: PriceSnapshot, host: HostServices) -> Self {
        Self { fetcher, snapshot, host }
    }

    pub fn fetcher(&self) -> &Arc<PriceFetcher> {
        &self.fetcher
    }

    pub fn snapshot(&self) -> &PriceSnapshot {
        &self.snapshot
    }

    /// Fetch prices (live when `force` is set), merge them, then have the host
    /// regenerate its dynamic prices. Only fails when the fetch does.
    pub async fn apply_prices(&self, force: bool) -> Result<bool> {
        let fetched = self.fetcher.fetch_prices(force).await?;
        let max_increase_mult = self.fetcher.config().await.max_increase_mult;

        info!("Applying flea data...");
        let summary = {
            let mut tables = self.host.database.write().await;
            merge_prices(&fetched, &self.snapshot, &mut tables, max_increase_mult)
        };
        debug!(
            passed_through = summary.passed_through,
            clamped = summary.clamped,
            skipped = summary.skipped,
            "merge complete"
        );

        self.host.regenerator.regenerate_dynamic_prices();
        info!("Flea Prices Updated!");

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::PriceCacheFile;
    use crate::config::UpdaterConfig;
    use crate::fetcher::tests::{table, MockSource};
    use crate::host::DynamicPriceRegenerator;
    use crate::models::HandbookItem;
    use crate::scheduler::ScheduleHandle;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingRegenerator {
        calls: AtomicU32,
    }

    impl DynamicPriceRegenerator for CountingRegenerator {
        fn regenerate_dynamic_prices(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn host_tables() -> HostTables {
        let mut tables = HostTables {
            prices: table(&[("known", 100.0), ("cheap", 100.0)]),
            handbook: Handbook {
                items: vec![HandbookItem { id: "handbook_only".to_string(), price: 40.0 }],
            },
            ..Default::default()
        };
        for id in ["known", "cheap", "handbook_only", "unpriced"] {
            tables.items.insert(id.to_string(), serde_json::json!({ "_id": id }));
        }
        tables
    }

    #[test]
    fn test_clamp_passes_through_at_or_below_max() {
        assert_eq!(clamp_price(120.0, 100.0, 1.5), (120.0, false));
        assert_eq!(clamp_price(150.0, 100.0, 1.5), (150.0, false));
    }

    #[test]
    fn test_clamp_bounds_above_max() {
        assert_eq!(clamp_price(200.0, 100.0, 1.5), (150.0, true));
    }

    #[test]
    fn test_zero_max_zeroes_price() {
        assert_eq!(clamp_price(50.0, 0.0, 1.5), (0.0, true));
        assert_eq!(clamp_price(0.0, 0.0, 1.5), (0.0, true));
    }

    #[test]
    fn test_base_price_prefers_snapshot() {
        let snapshot = PriceSnapshot::capture(&table(&[("a", 100.0)]));
        let handbook = Handbook { items: vec![HandbookItem { id: "a".to_string(), price: 5.0 }] };
        assert_eq!(resolve_base_price("a", &snapshot, &handbook), 100.0);
    }

    #[test]
    fn test_base_price_falls_back_to_handbook() {
        let snapshot = PriceSnapshot::default();
        let handbook = Handbook { items: vec![HandbookItem { id: "a".to_string(), price: 5.0 }] };
        assert_eq!(resolve_base_price("a", &snapshot, &handbook), 5.0);
    }

    #[test]
    fn test_base_price_defaults_to_zero() {
        assert_eq!(resolve_base_price("a", &PriceSnapshot::default(), &Handbook::default()), 0.0);
    }

    #[test]
    fn test_merge_scenario() {
        let mut tables = host_tables();
        let snapshot = PriceSnapshot::capture(&tables.prices);
        let fetched = table(&[
            ("known", 200.0),
            ("cheap", 120.0),
            ("handbook_only", 70.0),
            ("unpriced", 50.0),
            ("removed_item", 10.0),
        ]);

        let summary = merge_prices(&fetched, &snapshot, &mut tables, 1.5);

        assert_eq!(tables.prices.get("known"), Some(&150.0));
        assert_eq!(tables.prices.get("cheap"), Some(&120.0));
        assert_eq!(tables.prices.get("handbook_only"), Some(&60.0));
        assert_eq!(tables.prices.get("unpriced"), Some(&0.0));
        assert!(!tables.prices.contains_key("removed_item"));
        assert_eq!(summary, MergeSummary { passed_through: 1, clamped: 3, skipped: 1 });
        assert_eq!(summary.written(), 4);
    }

    #[test]
    fn test_merge_uses_snapshot_not_live_values() {
        let mut tables = host_tables();
        let snapshot = PriceSnapshot::capture(&tables.prices);

        // A previous cycle raised the live price; the bound still comes from the snapshot
        tables.prices.insert("known".to_string(), 1000.0);
        merge_prices(&table(&[("known", 900.0)]), &snapshot, &mut tables, 1.5);

        assert_eq!(tables.prices.get("known"), Some(&150.0));
    }

    #[tokio::test]
    async fn test_apply_prices_updates_host_and_regenerates() {
        let temp_dir = TempDir::new().unwrap();
        let source = MockSource::serving(table(&[("known", 200.0), ("cheap", 120.0), ("ghost", 1.0)]));
        let fetcher = Arc::new(PriceFetcher::new(
            source,
            PriceCacheFile::new(temp_dir.path().join("prices.json")),
            temp_dir.path().join("config.json"),
            UpdaterConfig { max_increase_mult: 1.5, ..Default::default() },
            ScheduleHandle::new(),
        ));

        let regenerator = Arc::new(CountingRegenerator::default());
        let tables = host_tables();
        let snapshot = PriceSnapshot::capture(&tables.prices);
        let host = HostServices::new(tables, regenerator.clone());
        let merger = PriceMerger::new(fetcher, snapshot, host.clone());

        assert!(merger.apply_prices(true).await.unwrap());

        let tables = host.database.read().await;
        assert_eq!(tables.prices.get("known"), Some(&150.0));
        assert_eq!(tables.prices.get("cheap"), Some(&120.0));
        assert!(!tables.prices.contains_key("ghost"));
        assert_eq!(regenerator.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_apply_prices_propagates_fetch_failure() {
        let temp_dir = TempDir::new().unwrap();
        let fetcher = Arc::new(PriceFetcher::new(
            MockSource::failing(u32::MAX, table(&[])),
            PriceCacheFile::new(temp_dir.path().join("prices.json")),
            temp_dir.path().join("config.json"),
            UpdaterConfig { max_retries: 1, ..Default::default() },
            ScheduleHandle::new(),
        ));

        let regenerator = Arc::new(CountingRegenerator::default());
        let tables = host_tables();
        let snapshot = PriceSnapshot::capture(&tables.prices);
        let merger = PriceMerger::new(fetcher, snapshot, HostServices::new(tables, regenerator.clone()));

        assert!(merger.apply_prices(true).await.is_err());
        assert_eq!(regenerator.calls.load(Ordering::SeqCst), 0);
    }
}
