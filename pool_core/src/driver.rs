/**
 * The embedder-supplied collaborator contract (spec.md §4.3), consolidated
 * into one capability set rather than a handful of loose closures — per
 * the design note that this is "best expressed as a single capability set
 * that the coordinator consumes." One `PoolDriver` is injected into
 * `Coordinator::new`; the coordinator holds no global state.
 */
use std::process::Command;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// One entry yielded during SPAWN: a worker's name, its opaque host
/// context (threaded unchanged through every callback concerning that
/// worker — e.g. a GPU index, for affinity), and the configuration it
/// will receive over the wire.
pub struct ProcessDescriptor<Context, Config> {
    pub name: String,
    pub host_context: Context,
    pub worker_config: Config,
}

impl<Context, Config> ProcessDescriptor<Context, Config> {
    pub fn new(name: impl Into<String>, host_context: Context, worker_config: Config) -> Self {
        Self {
            name: name.into(),
            host_context,
            worker_config,
        }
    }
}

/// The full user-callback surface the coordinator drives.
pub trait PoolDriver {
    /// Opaque per-worker value threaded through every callback for that
    /// worker. The coordinator never inspects it.
    type Context: Clone + Send + 'static;

    /// A unit of work. `Clone` because a dispatched item must be kept
    /// around as `inflight_item` in case it needs to be returned to the
    /// producer, while the original is moved onto the wire.
    type Item: Serialize + DeserializeOwned + Send + Clone + 'static;

    /// The result of processing one item.
    type Output: Serialize + DeserializeOwned + Send + 'static;

    /// Per-worker configuration sent to the spawned process.
    type Config: Serialize + Send + 'static;

    /// The value returned from `Coordinator::run` once the pool is done.
    type Aggregate;

    /// Yields a finite sequence of worker descriptors during SPAWN. An
    /// empty sequence is a fatal condition (spec.md §6).
    fn process_info_generator(&mut self) -> Vec<ProcessDescriptor<Self::Context, Self::Config>>;

    /// Builds the command used to spawn the named worker.
    fn worker_command(&self, name: &str) -> Command;

    /// If false, the pool is skipped entirely and `get_result` is
    /// returned immediately.
    fn on_check_run(&mut self) -> bool {
        true
    }

    /// Runs once, entering RUN, after every surviving worker is `READY`.
    fn on_clients_initialized(&mut self) {}

    /// Returns the next item for a `READY` worker, or `None` if nothing is
    /// available right now.
    fn get_data(&mut self, host_context: &Self::Context) -> Option<Self::Item>;

    /// Re-enqueues an item lost to a dead or unresponsive worker.
    fn on_data_return(&mut self, host_context: &Self::Context, item: Self::Item);

    /// Records the result of a successfully processed item.
    fn on_result(&mut self, host_context: &Self::Context, item: Self::Item, result: Self::Output);

    /// Called once per RUN loop iteration. Returning `true` asserts the
    /// producer is permanently drained ("idle-ok"); combined with every
    /// worker being `READY`, this ends the RUN phase.
    fn on_tick(&mut self) -> bool {
        true
    }

    /// Runs once, in FINALIZE, after every worker has been drained.
    fn on_clients_finalized(&mut self) {}

    /// Returns the final aggregate, consuming the driver.
    fn get_result(self) -> Self::Aggregate;
}
