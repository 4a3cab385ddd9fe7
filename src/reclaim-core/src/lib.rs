//! Reclaim Core Library
//!
//! Keeps a recordings directory within its storage quota: the eviction engine,
//! its configuration, completion notifiers and the periodic trigger.

pub mod config;
pub mod error;
pub mod evictor;
pub mod logging;
pub mod notifier;
pub mod scheduler;
pub mod usage;

#[cfg(test)]
mod testing;

pub use config::{
    Config, ConfigOverrides, ConfigSource, FileConfigSource, QuotaSnapshot, StaticConfig,
};
pub use error::{ConfigError, SweepError};
pub use evictor::{select_for_eviction, Evictor, SweepReport};
pub use notifier::{BroadcastNotifier, CompletionNotifier, LogNotifier, SweepCompleted};
pub use scheduler::{Scheduler, SweepTrigger};
pub use usage::{usage, UsageReport};
