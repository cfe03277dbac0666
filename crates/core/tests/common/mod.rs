//! Shared helpers for integration tests

use std::sync::{Arc, Once};

use chrono::{TimeZone, Utc};
use kv_store::KeyValueBackend;
use todo_core::ports::ManualClock;
use todo_core::task::TaskStore;

static TRACING: Once = Once::new();

/// Route store logs to the test harness. Filter with `RUST_LOG`.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "todo_core=debug,kv_store=debug".into()),
            )
            .with_test_writer()
            .try_init();
    });
}

pub fn frozen_clock() -> Arc<ManualClock> {
    Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2024, 3, 7, 17, 5, 0).unwrap(),
    ))
}

pub fn store_over(backend: Arc<dyn KeyValueBackend>) -> TaskStore {
    init_tracing();
    TaskStore::builder(backend).with_clock(frozen_clock()).build()
}
