/**
 * Host-side engine for running a fixed amount of work across a roster of
 * subprocess workers: spawn, wait for them to initialize, keep them fed
 * until the producer is drained, then shut them down in order.
 *
 * The wire protocol, concurrency model, and phase state machine are
 * described module-by-module below; `Coordinator::run` is the entry point
 * embedders actually call.
 */
mod config;
mod coordinator;
mod diagnostics;
mod driver;
mod error;
mod framing;
mod message;
mod processor;
mod roster;
mod transport;

#[cfg(test)]
mod testing;

pub use config::PoolConfig;
pub use coordinator::Coordinator;
pub use diagnostics::{Diagnostics, StdoutDiagnostics};
pub use driver::{PoolDriver, ProcessDescriptor};
pub use error::PoolError;
pub use framing::{read_frame, write_frame};
pub use message::{HostMessage, WorkerInit, WorkerMessage};
pub use processor::{ProcessError, Processor, WorkerContext};
pub use transport::{ChildTransport, ProcessSpawner, WorkerSpawner, WorkerTransport};
