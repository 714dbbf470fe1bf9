/**
 * An in-process `WorkerSpawner`/`WorkerTransport` double used only by
 * `#[cfg(test)]` code, so `Coordinator`'s state machine can be exercised
 * without ever exec'ing a real child process — the same role
 * `HashMap<K, V, S>`'s default-type-parameter seam plays for a hasher
 * swap in tests.
 *
 * A "worker" here is an OS thread running the same lifecycle
 * `pool_worker::serve` drives inside a real subprocess, exchanging
 * messages over `crossbeam_channel` instead of framed pipes.
 */
use std::io;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::process::Command;
use std::thread;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use serde::Serialize;

use crate::message::{HostMessage, WorkerMessage};
use crate::processor::{Processor, ProcessError, WorkerContext};
use crate::transport::{WorkerSpawner, WorkerTransport};

/// Convenience alias so test code can write `ThreadProcessor` without
/// spelling out the bounds `ThreadSpawner` needs from a `Processor`.
pub trait ThreadProcessor: Processor {}
impl<P: Processor> ThreadProcessor for P {}

pub struct ThreadSpawner<P> {
    _processor: std::marker::PhantomData<fn() -> P>,
}

impl<P> ThreadSpawner<P> {
    pub fn new() -> Self {
        Self {
            _processor: std::marker::PhantomData,
        }
    }
}

impl<P> Default for ThreadSpawner<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P> WorkerSpawner<P::Item, P::Output> for ThreadSpawner<P>
where
    P: Processor + Send + 'static,
{
    type Transport = ThreadTransport<P::Item, P::Output>;

    fn spawn<Config: Serialize>(
        &self,
        _command: Command,
        worker_config: Config,
    ) -> io::Result<Self::Transport> {
        let config_json = serde_json::to_vec(&worker_config)?;
        let config: P::Config = serde_json::from_slice(&config_json)?;

        let (to_worker_tx, to_worker_rx) = crossbeam_channel::unbounded::<HostMessage<P::Item>>();
        let (from_worker_tx, from_worker_rx) =
            crossbeam_channel::unbounded::<WorkerMessage<P::Item, P::Output>>();

        thread::Builder::new()
            .name("pool-test-worker".into())
            .spawn(move || run_worker::<P>(config, to_worker_rx, from_worker_tx))?;

        Ok(ThreadTransport {
            outbox: Some(to_worker_tx),
            inbox: from_worker_rx,
        })
    }
}

fn run_worker<P: Processor>(
    config: P::Config,
    inbox: Receiver<HostMessage<P::Item>>,
    outbox: Sender<WorkerMessage<P::Item, P::Output>>,
) {
    let mut processor = match catch_unwind(AssertUnwindSafe(|| P::initialize(config))) {
        Ok(Ok(p)) => p,
        Ok(Err(err)) => {
            let _ = outbox.send(WorkerMessage::Error {
                item: None,
                diagnostic: Some(err),
            });
            return;
        }
        Err(_) => {
            let _ = outbox.send(WorkerMessage::Error {
                item: None,
                diagnostic: Some("initialize panicked".to_string()),
            });
            return;
        }
    };

    if outbox.send(WorkerMessage::InitOk).is_err() {
        return;
    }

    let ctx = WorkerContext::new();
    loop {
        let msg = match inbox.recv() {
            Ok(msg) => msg,
            Err(_) => return,
        };

        match msg {
            HostMessage::Data { item } => {
                let outcome = catch_unwind(AssertUnwindSafe(|| processor.process(&item, &ctx)));
                let wire = match outcome {
                    Ok(Ok(result)) => WorkerMessage::Success { item, result },
                    Ok(Err(ProcessError::Silent)) => WorkerMessage::Error {
                        item: Some(item),
                        diagnostic: None,
                    },
                    Ok(Err(ProcessError::Diagnostic(text))) => WorkerMessage::Error {
                        item: Some(item),
                        diagnostic: Some(text),
                    },
                    Err(_) => WorkerMessage::Error {
                        item: Some(item),
                        diagnostic: Some("process panicked".to_string()),
                    },
                };
                if outbox.send(wire).is_err() {
                    return;
                }
            }
            HostMessage::Close => {
                let _ = catch_unwind(AssertUnwindSafe(|| processor.finalize()));
                let _ = outbox.send(WorkerMessage::Finalized);
                return;
            }
        }
    }
}

pub struct ThreadTransport<Item, Output> {
    outbox: Option<Sender<HostMessage<Item>>>,
    inbox: Receiver<WorkerMessage<Item, Output>>,
}

impl<Item, Output> WorkerTransport<Item, Output> for ThreadTransport<Item, Output>
where
    Item: Send + Clone,
    Output: Send,
{
    fn send(&mut self, msg: &HostMessage<Item>) -> io::Result<()> {
        match &self.outbox {
            Some(tx) => tx
                .send(msg.clone())
                .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "worker thread is gone")),
            None => Err(io::Error::new(io::ErrorKind::BrokenPipe, "worker was killed")),
        }
    }

    fn try_recv(&mut self) -> Option<WorkerMessage<Item, Output>> {
        match self.inbox.try_recv() {
            Ok(msg) => Some(msg),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    fn kill(&mut self) {
        self.outbox.take();
    }
}
