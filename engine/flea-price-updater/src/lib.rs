//! Flea Price Updater
//!
//! Pulls a remote flea price table once an hour and writes it into the host's
//! price table, bounding every price to a multiple of its original value.
//! The last fetched table and the next due time are kept on disk so a restart
//! within the hour reuses the cached table instead of hitting the network.

pub mod cache;
pub mod config;
pub mod error;
pub mod fetcher;
pub mod host;
pub mod merger;
pub mod models;
pub mod scheduler;

pub use crate::cache::PriceCacheFile;
pub use crate::config::{ServiceSettings, UpdaterConfig};
pub use crate::error::{Result, UpdaterError};
pub use crate::fetcher::{HttpPriceSource, PriceFetcher, PriceSource};
pub use crate::host::{DynamicPriceRegenerator, HostDatabase, HostServices, HostTables, NoopRegenerator};
pub use crate::merger::PriceMerger;
pub use crate::models::*;
pub use crate::scheduler::{PriceUpdateScheduler, ScheduleHandle};

/// Seconds between scheduled updates, also the offset applied to `nextUpdate`
pub const UPDATE_INTERVAL_SECS: i64 = 3600;
