use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};

/// Doubling backoff from `initial`, capped at `max`, giving up after `budget`.
pub fn doubling_backoff(initial: Duration, max: Duration, budget: Duration) -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_initial_interval(initial)
        .with_multiplier(2.0)
        .with_randomization_factor(0.0)
        .with_max_interval(max.max(initial))
        .with_max_elapsed_time(Some(budget))
        .build()
}
