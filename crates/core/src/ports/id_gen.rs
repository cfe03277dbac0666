//! Id generator port

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use super::clock::Clock;

/// Generates unique identifiers
pub trait IdGenerator: Send + Sync {
    /// Generates a new identifier. Never returns the same value twice.
    fn generate_id(&self) -> String;

    /// Record an id issued elsewhere (e.g. loaded from storage) so it is
    /// not handed out again
    fn observe(&self, _id: &str) {}
}

/// Ids taken from the clock as decimal milliseconds since the epoch.
///
/// When the clock has not advanced since the previous id (or went
/// backwards) the previous value plus one is used instead, so ids are
/// strictly increasing for the lifetime of the generator.
pub struct TimestampIdGenerator {
    clock: Arc<dyn Clock>,
    last: AtomicI64,
}

impl TimestampIdGenerator {
    /// Create a generator reading from `clock`
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            last: AtomicI64::new(i64::MIN),
        }
    }
}

impl IdGenerator for TimestampIdGenerator {
    fn generate_id(&self) -> String {
        let now = self.clock.now().timestamp_millis();
        let next = |last: i64| now.max(last.saturating_add(1));
        let (Ok(prev) | Err(prev)) =
            self.last
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(next(last)));
        next(prev).to_string()
    }

    fn observe(&self, id: &str) {
        if let Ok(value) = id.parse::<i64>() {
            self.last.fetch_max(value, Ordering::SeqCst);
        }
    }
}
