/*!
 * Pool — the subprocess worker-pool coordinator facade.
 *
 * This crate re-exports `pool_core` (the coordinator engine and wire
 * protocol), `pool_worker` (the child-process harness), and
 * `pool_diagnostics` (the optional `tracing`-backed diagnostics sink), so
 * an embedder depends on one crate instead of three.
 *
 * # Module structure
 *
 * - `pool_core` — coordinator state machine, wire messages, driver/processor
 *   traits, transport abstraction.
 * - `pool_worker` — `serve::<P>()`, the harness a worker binary's `main`
 *   hands its `Processor` to.
 * - `pool_diagnostics` — `TracingDiagnostics`, for embedders already running
 *   a `tracing` subscriber.
 */

pub use pool_core::{
    read_frame, write_frame, ChildTransport, Coordinator, Diagnostics, HostMessage, PoolConfig,
    PoolDriver, PoolError, ProcessDescriptor, ProcessError, ProcessSpawner, Processor,
    StdoutDiagnostics, WorkerContext, WorkerInit, WorkerMessage, WorkerSpawner, WorkerTransport,
};
pub use pool_diagnostics::TracingDiagnostics;
pub use pool_worker::serve;
