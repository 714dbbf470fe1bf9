/**
 * Wire message types for the host <-> worker protocol.
 *
 * These are the tagged records that flow over each worker's pair of
 * unidirectional pipes. Variants are closed by design (§9 of the spec this
 * crate implements): adding one is a protocol break, not something a user
 * extends.
 *
 * `WorkerInit` is not part of the tag table — it is a one-shot preamble the
 * coordinator writes immediately after spawning a worker, carrying the
 * per-worker `worker_config` down the same pipe that later carries `DATA`
 * and `CLOSE`. A forked Python subprocess gets its `client_dict` for free
 * from the fork; a freshly exec'd Rust binary has no address space to
 * inherit it from, so it has to arrive on the wire.
 */
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// WorkerInit — preamble carrying per-worker configuration
// ---------------------------------------------------------------------------

/// Sent once, before any `HostMessage`, immediately after a worker is spawned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerInit<Cfg> {
    pub config: Cfg,
}

// ---------------------------------------------------------------------------
// HostMessage — host -> worker
// ---------------------------------------------------------------------------

/// Messages the coordinator sends down a worker's stdin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HostMessage<Item> {
    /// Process this item.
    Data { item: Item },

    /// Finalize and exit.
    Close,
}

// ---------------------------------------------------------------------------
// WorkerMessage — worker -> host
// ---------------------------------------------------------------------------

/// Messages a worker writes to its stdout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum WorkerMessage<Item, Output> {
    /// Initialization complete.
    InitOk,

    /// Item processed successfully.
    Success { item: Item, result: Output },

    /// Failure. `item` is present when it is known which item was in
    /// flight; `diagnostic` is absent for a silent failure.
    Error {
        item: Option<Item>,
        diagnostic: Option<String>,
    },

    /// Shutdown complete; safe to reap.
    Finalized,

    /// Informational log line.
    LogInfo { text: String },

    /// Error-level log line.
    LogErr { text: String },

    /// Advance a progress counter by `count`.
    Progress { count: u64 },
}
