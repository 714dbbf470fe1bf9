/**
 * The worker-side contract: what runs inside a spawned subprocess.
 *
 * A `Processor` is instantiated once per worker process, from the
 * `worker_config` the coordinator sent it (see `message::WorkerInit`), and
 * then asked to handle a sequence of items. `pool_worker::serve` is the
 * harness that drives a `Processor` through the lifecycle described in
 * §4.1 of the spec: initialize, emit `INIT_OK`, loop on `DATA`/`CLOSE`,
 * finalize, emit `FINALIZED`.
 */
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A processing failure reported by a worker.
pub enum ProcessError {
    /// The processor intentionally declines to explain the failure.
    /// Equivalent to the original's `Subprocessor.SilenceException`.
    Silent,

    /// The processor failed and has something useful to say about it.
    Diagnostic(String),
}

impl ProcessError {
    pub fn diagnostic(text: impl Into<String>) -> Self {
        ProcessError::Diagnostic(text.into())
    }
}

/// User-supplied processing capability hosted inside a worker process.
///
/// None of these methods may block indefinitely — a wedged `process` call
/// is exactly what `no_response_timeout` on the host side exists to catch.
pub trait Processor: Sized {
    /// Per-worker configuration, sent once at spawn time.
    type Config: DeserializeOwned;

    /// A unit of work.
    type Item: Serialize + DeserializeOwned + Send + Clone + 'static;

    /// The result of processing one item.
    type Output: Serialize + DeserializeOwned + Send + 'static;

    /// Runs once before the worker announces `INIT_OK`. A returned `Err`
    /// is reported as an initialization failure and the worker exits
    /// without ever emitting `INIT_OK`.
    fn initialize(config: Self::Config) -> Result<Self, String>;

    /// Processes one item. Called once per `DATA` message.
    fn process(
        &mut self,
        item: &Self::Item,
        ctx: &WorkerContext,
    ) -> Result<Self::Output, ProcessError>;

    /// Runs once after the `CLOSE` message is observed, before `FINALIZED`
    /// is emitted. Default is a no-op.
    fn finalize(&mut self) {}
}

// ---------------------------------------------------------------------------
// WorkerContext — helpers available to a Processor while processing
// ---------------------------------------------------------------------------

/// Lets a `Processor::process` implementation emit diagnostics mid-flight.
///
/// Stateless: every call writes one framed `WorkerMessage` directly to
/// stdout. Because a worker process is single-threaded, interleaving these
/// writes with the harness's own `Success`/`Error` writes is never a
/// concern — everything happens sequentially on the one thread that is
/// driving the `Processor`.
pub struct WorkerContext {
    _private: (),
}

impl WorkerContext {
    pub fn new() -> Self {
        Self { _private: () }
    }

    pub fn log_info(&self, text: impl Into<String>) {
        self.emit(crate::message::WorkerMessage::LogInfo { text: text.into() });
    }

    pub fn log_err(&self, text: impl Into<String>) {
        self.emit(crate::message::WorkerMessage::LogErr { text: text.into() });
    }

    pub fn progress(&self, count: u64) {
        self.emit(crate::message::WorkerMessage::Progress { count });
    }

    /// The `()`/`()` instantiation is never actually observed: none of the
    /// three variants emitted here carries an `Item` or `Output` field, so
    /// the JSON this produces is identical regardless of which concrete
    /// `Item`/`Output` types the worker's real `Processor` uses.
    fn emit(&self, msg: crate::message::WorkerMessage<(), ()>) {
        let mut stdout = std::io::stdout();
        let _ = crate::framing::write_frame(&mut stdout, &msg);
    }
}

impl Default for WorkerContext {
    fn default() -> Self {
        Self::new()
    }
}
