//! Hermes Clock Infrastructure
//!
//! Time abstractions for live trading and deterministic replay:
//!
//! - [`SystemClock`]: wall-clock time for production
//! - [`TestClock`]: settable/advancable time for replay and tests
//! - [`TimerScheduler`]: label-keyed alerts and repeating timers, advanced
//!   only through injected clock time
//!
//! The scheduler never reads wall-clock time itself. A driver (live loop or
//! replay feed) advances it with `advance_to(clock.now())` and dispatches the
//! returned [`TimeEvent`]s.

mod system;
mod timer;

pub use system::SystemClock;
pub use test::TestClock;
pub use timer::{TimeEvent, TimerError, TimerScheduler};

// Re-export the Clock trait for convenience
pub use hermes_ports::Clock;
