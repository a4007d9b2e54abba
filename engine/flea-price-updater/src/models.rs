use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Item identifier to flea price, as served by the remote table and the cache file
pub type PriceTable = HashMap<String, f64>;

/// Startup copy of the host price table, used as the clamp baseline.
///
/// Owns its map outright so later writes to the live table never leak in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSnapshot {
    prices: PriceTable,
}

impl PriceSnapshot {
    /// Deep-copy the given live table
    pub fn capture(live: &PriceTable) -> Self {
        Self { prices: live.clone() }
    }

    pub fn get(&self, item_id: &str) -> Option<f64> {
        self.prices.get(item_id).copied()
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// Handbook entry giving the default price of an item
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HandbookItem {
    #[serde(rename = "Id")]
    pub id: String,

    #[serde(rename = "Price")]
    pub price: f64,
}

/// Host handbook table
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct Handbook {
    #[serde(rename = "Items", default)]
    pub items: Vec<HandbookItem>,
}

impl Handbook {
    /// First handbook price recorded for `item_id`
    pub fn price_of(&self, item_id: &str) -> Option<f64> {
        self.items.iter().find(|item| item.id == item_id).map(|item| item.price)
    }
}

/// Outcome counts of one merge pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeSummary {
    /// Fetched value written unchanged
    pub passed_through: usize,

    /// Bounded to the computed maximum (including zero)
    pub clamped: usize,

    /// Not present in the host item table
    pub skipped: usize,
}

impl MergeSummary {
    pub fn written(&self) -> usize {
        self.passed_through + self.clamped
    }
}
