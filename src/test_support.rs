//! Shared fixtures for unit tests

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::{NaiveDate, Utc};

use crate::data::{DataLoader, LoadError, Record, Snapshot};

/// Loader that replays scripted results and counts calls
#[derive(Default)]
pub struct ScriptedLoader {
    responses: Mutex<VecDeque<Result<Snapshot, LoadError>>>,
    calls: AtomicUsize,
}

impl ScriptedLoader {
    pub fn new(responses: Vec<Result<Snapshot, LoadError>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DataLoader for ScriptedLoader {
    async fn fetch(&self) -> Result<Snapshot, LoadError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(LoadError::SourceUnavailable("no more responses".into())))
    }
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
}

/// One US row with the given revenue
pub fn snapshot(revenue: f64) -> Snapshot {
    Snapshot::new(vec![Record::new(day(1), "US", revenue, 10, 50.0)], Utc::now())
}

/// Three markets over several days
pub fn market_snapshot() -> Snapshot {
    Snapshot::new(
        vec![
            Record::new(day(1), "US", 1000.0, 20, 100.0),
            Record::new(day(1), "UK", 400.0, 0, 30.0),
            Record::new(day(2), "US", 1200.0, 30, 90.0),
            Record::new(day(20), "AU", 300.0, 5, 25.0),
        ],
        Utc::now(),
    )
}

pub fn unavailable() -> LoadError {
    LoadError::SourceUnavailable("connection refused".to_string())
}
