/**
 * `WorkerHandle` and the roster the coordinator maintains.
 *
 * A roster never contains a `TERMINATED` handle — termination removes it,
 * so "is this worker still around" is always just "is it in the `Vec`".
 */
use std::process::Command;
use std::time::Instant;

use crate::message::{HostMessage, WorkerMessage};
use crate::transport::{WorkerSpawner, WorkerTransport};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WorkerState {
    Spawning,
    Ready,
    Busy,
}

pub(crate) struct WorkerHandle<Context, Item, Output, Transport> {
    pub name: String,
    pub host_context: Context,
    pub state: WorkerState,
    /// The item most recently dispatched, held until acknowledged. Empty
    /// unless `state == Busy`.
    pub inflight_item: Option<Item>,
    /// Fresh only while `state == Busy`; stale otherwise.
    pub dispatch_time: Option<Instant>,
    /// Set when `CLOSE` is sent during DRAIN; used to enforce the 30s
    /// shutdown deadline.
    pub close_sent_at: Option<Instant>,
    transport: Transport,
    _output: std::marker::PhantomData<fn() -> Output>,
}

impl<Context, Item, Output, Transport> WorkerHandle<Context, Item, Output, Transport>
where
    Transport: WorkerTransport<Item, Output>,
{
    pub(crate) fn spawn<S, Config>(
        name: String,
        host_context: Context,
        worker_config: Config,
        command: Command,
        spawner: &S,
    ) -> std::io::Result<Self>
    where
        S: WorkerSpawner<Item, Output, Transport = Transport>,
        Config: serde::Serialize,
    {
        let transport = spawner.spawn(command, worker_config)?;
        Ok(Self {
            name,
            host_context,
            state: WorkerState::Spawning,
            inflight_item: None,
            dispatch_time: None,
            close_sent_at: None,
            transport,
            _output: std::marker::PhantomData,
        })
    }

    pub(crate) fn try_recv(&mut self) -> Option<WorkerMessage<Item, Output>> {
        self.transport.try_recv()
    }

    pub(crate) fn send_data(&mut self, item: Item) -> std::io::Result<()> {
        self.transport.send(&HostMessage::Data { item })
    }

    pub(crate) fn send_close(&mut self) -> std::io::Result<()> {
        self.transport.send(&HostMessage::Close)
    }

    pub(crate) fn kill(&mut self) {
        self.transport.kill();
    }
}
