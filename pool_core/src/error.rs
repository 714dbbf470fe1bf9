/**
 * Fatal conditions surfaced to the caller of `Coordinator::run`.
 *
 * Per-worker failures (bad init, a processing error, a response timeout,
 * a missed shutdown deadline) never reach here — they are absorbed into
 * roster changes. Only the pool-wide unrecoverable states in spec.md §6/§7
 * class 5 become a `PoolError`.
 */
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    #[error("worker pool '{pool}': work producer yielded no worker descriptors")]
    NoDescriptors { pool: String },

    #[error("worker pool '{pool}': failed to spawn worker '{worker}': {source}")]
    SpawnFailed {
        pool: String,
        worker: String,
        #[source]
        source: io::Error,
    },

    #[error("worker pool '{pool}': every spawned worker failed to initialize")]
    AllWorkersFailedInit { pool: String },

    #[error("worker pool '{pool}': all workers were lost during the run phase")]
    RosterExhausted { pool: String },
}
