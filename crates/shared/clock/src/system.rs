use chrono::Utc;
use hermes_core::Timestamp;
use hermes_ports::Clock;

/// Real system clock for live trading
///
/// Simply returns the current wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Utc::now()
    }

    fn name(&self) -> &str {
        "SystemClock"
    }
}
