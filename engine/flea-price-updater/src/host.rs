//! Collaborators provided by the host application
//!
//! The host owns the game tables and the dynamic price cache; the updater only
//! gets a shared handle to the tables and a narrow regeneration capability.

use crate::error::Result;
use crate::models::{Handbook, PriceTable};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Host tables touched by the updater
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HostTables {
    /// Live flea prices, mutated in place by the merger
    #[serde(default)]
    pub prices: PriceTable,

    /// Item templates; only key presence matters here
    #[serde(default)]
    pub items: HashMap<String, serde_json::Value>,

    #[serde(default)]
    pub handbook: Handbook,
}

impl HostTables {
    /// Load host tables from a JSON dump (used by the standalone binary)
    pub async fn load_from_file<P: AsRef<Path>>(file_path: P) -> Result<Self> {
        info!("Loading host tables from: {:?}", file_path.as_ref());

        let json_content = tokio::fs::read_to_string(&file_path).await?;
        let tables: Self = serde_json::from_str(&json_content)?;

        info!(
            "Loaded {} prices, {} items, {} handbook entries",
            tables.prices.len(),
            tables.items.len(),
            tables.handbook.items.len()
        );
        Ok(tables)
    }
}

/// Shared handle to the host's database tables
pub type HostDatabase = Arc<RwLock<HostTables>>;

/// Host capability to rebuild its dynamic price cache after the price table changed
pub trait DynamicPriceRegenerator: Send + Sync {
    fn regenerate_dynamic_prices(&self);
}

/// Regenerator for hosts without a dynamic price cache
pub struct NoopRegenerator;

impl DynamicPriceRegenerator for NoopRegenerator {
    fn regenerate_dynamic_prices(&self) {
        info!("No dynamic price cache to regenerate");
    }
}

/// Dependencies the host hands to the updater at construction time
#[derive(Clone)]
pub struct HostServices {
    pub database: HostDatabase,
    pub regenerator: Arc<dyn DynamicPriceRegenerator>,
}

impl HostServices {
    pub fn new(tables: HostTables, regenerator: Arc<dyn DynamicPriceRegenerator>) -> Self {
        Self { database: Arc::new(RwLock::new(tables)), regenerator }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_load_host_tables_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("database.json");
        std::fs::write(
            &path,
            r#"{
                "prices": {"a": 100},
                "items": {"a": {"_name": "item_a"}},
                "handbook": {"Items": [{"Id": "a", "Price": 90}]}
            }"#,
        )
        .unwrap();

        let tables = HostTables::load_from_file(&path).await.unwrap();
        assert_eq!(tables.prices.get("a"), Some(&100.0));
        assert!(tables.items.contains_key("a"));
        assert_eq!(tables.handbook.price_of("a"), Some(90.0));
    }

    #[tokio::test]
    async fn test_missing_sections_default_to_empty() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("database.json");
        std::fs::write(&path, "{}").unwrap();

        let tables = HostTables::load_from_file(&path).await.unwrap();
        assert!(tables.prices.is_empty());
        assert!(tables.items.is_empty());
        assert!(tables.handbook.items.is_empty());
    }
}
