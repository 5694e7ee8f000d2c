//! Shared handler utilities

use std::time::Instant;

/// Record billing operation duration with result label.
///
/// Centralized so every handler emits the same metric names and labels.
#[inline]
pub fn record_op_duration(operation: &'static str, start: Instant, success: bool) {
    let result = if success { "ok" } else { "err" };
    metrics::histogram!(
        "billing_operation_duration_seconds",
        "operation" => operation,
        "result" => result
    )
    .record(start.elapsed().as_secs_f64());
}
