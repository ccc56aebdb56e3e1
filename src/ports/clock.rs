use chrono::{DateTime, Utc};

/// Source of "now" for borrow, due and return date computations.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
