use hermes_core::Timestamp;

/// Port for time abstraction
///
/// Everything below the runner reads time through this trait, never from the
/// wall clock directly:
/// - Real system time for live trading
/// - Settable/advancable time for deterministic replay and tests
pub trait Clock: Send + Sync {
    /// Get the current time according to this clock
    fn now(&self) -> Timestamp;

    /// Get the clock's name/identifier for debugging
    fn name(&self) -> &str {
        "Clock"
    }
}
