/**
 * Coordinator-level constructor configuration — spec.md §6's four
 * constructor options. `worker_stub_factory` is not a config field here:
 * in the process-isolation model it is `PoolDriver::worker_command`, i.e.
 * "the `Command` to exec for this worker."
 */
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Identifier for diagnostics and error messages.
    pub name: String,

    /// Per-dispatch liveness bound. `Duration::ZERO` disables the timeout
    /// entirely — a worker that never responds keeps its `inflight_item`
    /// forever and prevents DRAIN from starting, reproducing the
    /// original's `no_response_time_sec == 0` behavior verbatim.
    pub no_response_timeout: Duration,

    /// Sleep between RUN loop iterations. `Duration::ZERO` is a valid busy
    /// loop.
    pub loop_sleep: Duration,

    /// If true, each worker is driven to `READY` before the next is
    /// spawned. Used when initialization contends for a scarce resource.
    pub initialize_in_serial: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            name: "pool".to_string(),
            no_response_timeout: Duration::ZERO,
            loop_sleep: Duration::from_millis(5),
            initialize_in_serial: false,
        }
    }
}

impl PoolConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Fixed shutdown deadline per worker during DRAIN (spec.md §5, §8).
pub(crate) const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll interval used while waiting out SPAWN (serial mode) and INIT_WAIT,
/// matching the original's fixed `time.sleep(0.005)`.
pub(crate) const INIT_POLL_INTERVAL: Duration = Duration::from_millis(5);
