//! # Rollout
//!
//! A release flag service: percentage rollouts, per-pilot overrides and
//! delegated enrollment decisions, usable both as a standalone binary and as a
//! library.
//!
//! ## Library Usage
//!
//! ```toml
//! [dependencies]
//! rollout = { version = "0.0.1", default-features = false }
//! ```
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use rollout::cache::CacheOverlay;
//! use rollout::rollout::{FlagChecker, RolloutManager};
//! use rollout::store::MemoryStore;
//! use rollout::types::Flag;
//!
//! let cache = Arc::new(CacheOverlay::new(Arc::new(MemoryStore::new())));
//! cache.start()?;
//!
//! let manager = RolloutManager::new(cache.clone());
//! manager.create_feature_flag(Flag::new("checkout-v2").with_percentage(25))?;
//!
//! let checker = FlagChecker::new(cache.clone())?;
//! let states = checker.get_pilot_flag_states("user-42", &["checkout-v2"]).await?;
//! ```
//!
//! ## Feature Flags
//!
//! - `cli` (default): Includes CLI module. Disable with `default-features = false`.

pub mod cache;
#[cfg(feature = "cli")]
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod rollout;
pub mod server;
pub mod store;
pub mod types;

pub use error::{Error, Result};
