//! In-memory snapshot cache with a time-to-live
//!
//! This module provides the refresh controller that sits between the UI and
//! the sheet loader. A snapshot is reused until its TTL elapses or a refresh
//! is forced; a failed refresh never touches the stored snapshot.

mod clock;
mod controller;

pub use clock::{Clock, ManualClock, SystemClock};
pub use controller::{CacheEntry, CacheState, RefreshController, DEFAULT_TTL};
