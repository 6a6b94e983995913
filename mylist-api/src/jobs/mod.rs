//! Background Jobs for the MyList API
//!
//! - `cache_sweep`: purges expired cache entries, including the page entries
//!   orphaned by version bumps
//!
//! # Usage
//!
//! ```ignore
//! use mylist_api::jobs::{cache_sweep_task, CacheSweepConfig};
//! use tokio::sync::watch;
//!
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//! tokio::spawn(cache_sweep_task(backend, CacheSweepConfig::default(), shutdown_rx));
//!
//! // On shutdown
//! let _ = shutdown_tx.send(true);
//! ```

pub mod cache_sweep;

pub use cache_sweep::{cache_sweep_task, CacheSweepConfig, CacheSweepMetrics, CacheSweepSnapshot};
