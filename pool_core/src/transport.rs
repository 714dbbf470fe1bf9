/**
 * The transport layer between a `WorkerHandle` and its actual process.
 *
 * Production code always uses `ProcessSpawner`/`ChildTransport`: a real
 * `std::process::Child` with piped stdin/stdout. The `WorkerSpawner`
 * trait exists so the coordinator's state machine can be exercised in
 * tests against an in-process double instead — the same pattern
 * `HashMap<K, V, S = RandomState>` uses for its hasher: a default type
 * parameter that production code never overrides.
 *
 * A reader thread per worker blocks on that worker's stdout and forwards
 * framed `WorkerMessage`s into a `crossbeam_channel`, which the
 * coordinator drains non-blockingly with `try_recv`. This is the same
 * background-thread-plus-channel shape `hawk_core::transport::worker`
 * uses for its HTTP delivery worker, applied here to "drain a child
 * process's stdout" instead of "drain an event queue".
 *
 * Child processes must never outlive their `WorkerHandle` (spec.md §5: "do
 * not orphan"). `ChildTransport::drop` kills and reaps on every teardown
 * path, including an early `?`-propagated spawn failure or a host panic
 * while workers are `Busy`; on Linux, `PR_SET_PDEATHSIG` additionally
 * covers the host process itself dying abruptly (killed, segfaulted)
 * without running any destructor at all.
 */
use std::io::{self, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, TryRecvError};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::framing;
use crate::message::{HostMessage, WorkerInit, WorkerMessage};

/// The externally-observable half of a spawned worker: send it host
/// messages, drain the messages it has sent back, kill it.
pub trait WorkerTransport<Item, Output>: Send {
    fn send(&mut self, msg: &HostMessage<Item>) -> io::Result<()>;

    /// Returns the next already-buffered message, if any, without
    /// blocking.
    fn try_recv(&mut self) -> Option<WorkerMessage<Item, Output>>;

    /// Forcibly terminates the worker and reaps it. Idempotent.
    fn kill(&mut self);
}

/// Builds a `WorkerTransport` for a freshly described worker.
pub trait WorkerSpawner<Item, Output>: Send + Sync {
    type Transport: WorkerTransport<Item, Output>;

    fn spawn<Config: Serialize>(
        &self,
        command: Command,
        worker_config: Config,
    ) -> io::Result<Self::Transport>;
}

// ---------------------------------------------------------------------------
// Production: a real child process
// ---------------------------------------------------------------------------

/// Arranges for the child to receive `SIGKILL` if the host process dies
/// without ever running a destructor (killed, segfaulted). Covers the gap
/// `ChildTransport::drop` cannot: a `Drop` impl only runs if the host is
/// still alive to run it.
#[cfg(target_os = "linux")]
fn install_pdeathsig(command: &mut Command) {
    use std::os::unix::process::CommandExt;

    unsafe {
        command.pre_exec(|| {
            if libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL) != 0 {
                return Err(io::Error::last_os_error());
            }
            Ok(())
        });
    }
}

#[cfg(not(target_os = "linux"))]
fn install_pdeathsig(_command: &mut Command) {}

/// The default `WorkerSpawner`: launches a real OS process.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessSpawner;

impl<Item, Output> WorkerSpawner<Item, Output> for ProcessSpawner
where
    Item: Serialize + DeserializeOwned + Send + 'static,
    Output: Serialize + DeserializeOwned + Send + 'static,
{
    type Transport = ChildTransport<Item, Output>;

    fn spawn<Config: Serialize>(
        &self,
        command: Command,
        worker_config: Config,
    ) -> io::Result<Self::Transport> {
        ChildTransport::spawn(command, worker_config)
    }
}

/// A worker backed by a real `std::process::Child`.
pub struct ChildTransport<Item, Output> {
    child: Child,
    stdin: ChildStdin,
    inbox: Receiver<WorkerMessage<Item, Output>>,
    // Detached on drop; exits on its own once stdout hits EOF or `kill`
    // closes the pipe out from under it.
    _reader: JoinHandle<()>,
}

impl<Item, Output> ChildTransport<Item, Output>
where
    Item: Serialize + DeserializeOwned + Send + 'static,
    Output: Serialize + DeserializeOwned + Send + 'static,
{
    pub fn spawn<Config: Serialize>(
        mut command: Command,
        worker_config: Config,
    ) -> io::Result<Self> {
        command.stdin(Stdio::piped()).stdout(Stdio::piped());
        install_pdeathsig(&mut command);

        let mut child = command.spawn()?;
        let mut stdin = child.stdin.take().expect("stdin was piped");
        let mut stdout = child.stdout.take().expect("stdout was piped");

        framing::write_frame(&mut stdin, &WorkerInit { config: worker_config })?;

        let (tx, rx) = crossbeam_channel::unbounded();
        let reader = thread::Builder::new()
            .name("pool-worker-reader".into())
            .spawn(move || loop {
                match framing::read_frame::<_, WorkerMessage<Item, Output>>(&mut stdout) {
                    Ok(Some(msg)) => {
                        if tx.send(msg).is_err() {
                            break;
                        }
                    }
                    Ok(None) | Err(_) => break,
                }
            })?;

        Ok(Self {
            child,
            stdin,
            inbox: rx,
            _reader: reader,
        })
    }
}

impl<Item, Output> WorkerTransport<Item, Output> for ChildTransport<Item, Output>
where
    Item: Serialize + DeserializeOwned + Send + 'static,
    Output: Serialize + DeserializeOwned + Send + 'static,
{
    fn send(&mut self, msg: &HostMessage<Item>) -> io::Result<()> {
        framing::write_frame(&mut self.stdin, msg)?;
        self.stdin.flush()
    }

    fn try_recv(&mut self) -> Option<WorkerMessage<Item, Output>> {
        match self.inbox.try_recv() {
            Ok(msg) => Some(msg),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    fn kill(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

impl<Item, Output> Drop for ChildTransport<Item, Output> {
    /// Safety net for every teardown path that bypasses `kill()` — an
    /// early `?`-propagated `PoolError` during spawn, or a host panic
    /// while workers are still `Busy`. `Child::drop` alone does not kill
    /// the process, so without this a worker spawned earlier in a failed
    /// `spawn_phase` would be orphaned.
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
