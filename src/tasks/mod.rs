//! Background Tasks Module
//!
//! Contains tasks that run beside the cache on a tokio runtime.
//!
//! # Tasks
//! - Expiry: one trigger per stored entry, evicting it once its TTL elapses

mod expiry;

pub(crate) use expiry::spawn_expiry;
