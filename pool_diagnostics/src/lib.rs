/**
 * `tracing`-backed `Diagnostics` sink, for embedders who want the worker
 * pool's forwarded logs and progress counters folded into their own
 * structured logging instead of going to stdout/stderr directly.
 */
use pool_core::Diagnostics;

/// Routes forwarded worker messages through `tracing`, tagging every
/// event with the originating worker's name.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn log_info(&self, worker: &str, text: &str) {
        tracing::info!(worker, "{text}");
    }

    fn log_err(&self, worker: &str, text: &str) {
        tracing::error!(worker, "{text}");
    }

    fn progress(&self, worker: &str, count: u64) {
        tracing::debug!(worker, count, "progress");
    }
}
