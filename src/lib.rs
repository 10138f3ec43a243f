//! # chargesync - ChargePoint home charger bridge
//!
//! Polls the ChargePoint cloud service for one or more accounts and exposes
//! account, charger and session state as entities (sensors, switches,
//! selects, numbers and buttons) with a handful of actions: start and stop a
//! charging session, set the amperage limit and restart a charger.
//!
//! ## Architecture
//!
//! - `client`: typed facade over the remote service (implemented by the host)
//! - `snapshot`: one poll cycle, assembled into an immutable snapshot
//! - `coordinator`: per-account poll loop, single-flight refresh, re-login
//! - `entities`: read views over snapshots and action handlers
//! - `setup`: account lifecycle (setup, unload, options, re-authentication)
//! - `persistence`: config entry storage and legacy token migration
//! - `config`: YAML configuration with validation
//! - `logging`: structured logging and tracing
//! - `web`: HTTP host surface (feature `web`)

pub mod client;
pub mod config;
pub mod coordinator;
pub mod entities;
pub mod error;
pub mod logging;
pub mod persistence;
pub mod setup;
pub mod snapshot;
#[cfg(feature = "web")]
pub mod web;

// Re-export commonly used types
pub use client::{ApiError, ChargePointApi, ClientConnector};
pub use config::Config;
pub use coordinator::{UpdateCoordinator, UpdateStatus};
pub use error::{ChargeSyncError, Result};
pub use setup::{AccountContext, AccountManager};
pub use snapshot::Snapshot;
