/**
 * The diagnostics surface: where forwarded `LOG_INFO`/`LOG_ERR`/`PROGRESS`
 * messages go. Default is best-effort stdout/stderr, matching the
 * teacher's own "never propagate, just print" philosophy for anything
 * that isn't the SDK's core contract.
 */

/// A sink for the textual log lines and progress deltas workers emit.
/// No structured schema beyond spec.md §3's tag table is required.
pub trait Diagnostics: Send + Sync {
    fn log_info(&self, worker: &str, text: &str);
    fn log_err(&self, worker: &str, text: &str);
    fn progress(&self, worker: &str, count: u64);
}

/// Default sink: informational lines to stdout, everything else to
/// stderr. Never panics, never blocks meaningfully.
pub struct StdoutDiagnostics;

impl Diagnostics for StdoutDiagnostics {
    fn log_info(&self, worker: &str, text: &str) {
        println!("[{worker}] {text}");
    }

    fn log_err(&self, worker: &str, text: &str) {
        eprintln!("[{worker}] {text}");
    }

    fn progress(&self, worker: &str, count: u64) {
        println!("[{worker}] progress +{count}");
    }
}
