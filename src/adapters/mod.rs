pub mod memory;
pub mod mock;
pub mod postgres;
pub mod retry;
pub mod system_clock;

pub use retry::RetryPolicy;
pub use system_clock::SystemClock;
