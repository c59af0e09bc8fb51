use hermes_core::Bar;

/// Port for a streaming indicator driven by bar updates
///
/// Implementations are self-contained: `update` must not read state from any
/// sibling indicator. Indicators bound to the same bar type are updated in
/// registration order before the strategy's own bar callback runs.
pub trait Indicator: Send {
    /// Indicator name for diagnostics
    fn name(&self) -> &str;

    /// Feed the indicator one bar
    fn update(&mut self, bar: &Bar);

    /// Returns true once the warm-up period has elapsed
    fn is_initialized(&self) -> bool;

    /// Discard all accumulated state
    fn reset(&mut self);
}
