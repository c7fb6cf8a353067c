//! Background Tasks Module
//!
//! Contains background tasks that run periodically alongside a store.
//!
//! # Tasks
//! - Purge: Physically removes expired rows at a configured interval

mod purge;

pub use purge::{spawn_purge_task, PurgeScheduler};
