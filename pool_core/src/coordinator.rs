/**
 * The host-side orchestration state machine: spec.md §4.2 in full.
 *
 * `Coordinator<D>` drives a pool through `SPAWN -> INIT_WAIT -> RUN ->
 * DRAIN -> DONE`. `D` is the embedder's `PoolDriver`; `S` is the
 * `WorkerSpawner` used to bring workers up, defaulted to `ProcessSpawner`
 * so ordinary callers never see it.
 *
 * Roster scans below follow one repeated shape: walk the roster by index,
 * optionally killing and `Vec::remove`-ing the current entry, otherwise
 * advancing. This is the direct translation of the original's
 * `for cli in self.clis[:]: ... self.clis.remove(cli)` snapshot-iteration
 * — Rust has no cheap way to snapshot a `Vec` of non-`Clone` handles, so
 * an index scan that removes in place is the idiomatic equivalent.
 */
use std::process::Command;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::config::{PoolConfig, INIT_POLL_INTERVAL, SHUTDOWN_TIMEOUT};
use crate::diagnostics::{Diagnostics, StdoutDiagnostics};
use crate::driver::PoolDriver;
use crate::error::PoolError;
use crate::message::WorkerMessage;
use crate::roster::{WorkerHandle, WorkerState};
use crate::transport::{ProcessSpawner, WorkerSpawner, WorkerTransport};

pub struct Coordinator<D: PoolDriver, S: WorkerSpawner<D::Item, D::Output> = ProcessSpawner> {
    driver: D,
    config: PoolConfig,
    diagnostics: Arc<dyn Diagnostics>,
    spawner: S,
    roster: Vec<WorkerHandle<D::Context, D::Item, D::Output, S::Transport>>,
}

impl<D: PoolDriver> Coordinator<D, ProcessSpawner> {
    /// Builds a coordinator that spawns real OS processes.
    pub fn new(driver: D, config: PoolConfig) -> Self {
        Self::with_spawner(driver, config, ProcessSpawner)
    }
}

impl<D: PoolDriver, S: WorkerSpawner<D::Item, D::Output>> Coordinator<D, S> {
    pub fn with_spawner(driver: D, config: PoolConfig, spawner: S) -> Self {
        Self {
            driver,
            config,
            diagnostics: Arc::new(StdoutDiagnostics),
            spawner,
            roster: Vec::new(),
        }
    }

    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn Diagnostics>) -> Self {
        self.diagnostics = diagnostics;
        self
    }

    /// Drives the pool from empty to done and returns the embedder's
    /// aggregate result, or the first fatal condition encountered.
    pub fn run(mut self) -> Result<D::Aggregate, PoolError> {
        if !self.driver.on_check_run() {
            return Ok(self.driver.get_result());
        }

        self.spawn_phase()?;
        self.init_wait_phase()?;
        self.driver.on_clients_initialized();
        self.run_phase()?;
        self.drain_phase();
        self.driver.on_clients_finalized();

        Ok(self.driver.get_result())
    }

    // -----------------------------------------------------------------
    // SPAWN
    // -----------------------------------------------------------------

    fn spawn_phase(&mut self) -> Result<(), PoolError> {
        let descriptors = self.driver.process_info_generator();
        if descriptors.is_empty() {
            return Err(PoolError::NoDescriptors {
                pool: self.config.name.clone(),
            });
        }

        for desc in descriptors {
            let command: Command = self.driver.worker_command(&desc.name);
            let handle = WorkerHandle::spawn(
                desc.name.clone(),
                desc.host_context,
                desc.worker_config,
                command,
                &self.spawner,
            )
            .map_err(|source| PoolError::SpawnFailed {
                pool: self.config.name.clone(),
                worker: desc.name.clone(),
                source,
            })?;

            self.roster.push(handle);

            if self.config.initialize_in_serial {
                let idx = self.roster.len() - 1;
                self.spawn_serial_wait(idx);
            }
        }

        if self.roster.is_empty() {
            return Err(PoolError::AllWorkersFailedInit {
                pool: self.config.name.clone(),
            });
        }

        Ok(())
    }

    /// Serial-spawn mode: block until the just-spawned worker is `READY`
    /// or has died, before returning to spawn the next one.
    fn spawn_serial_wait(&mut self, idx: usize) {
        loop {
            let removed = self.pump_one_init(idx);
            if removed {
                return;
            }
            if self.roster[idx].state == WorkerState::Ready {
                return;
            }
            thread::sleep(INIT_POLL_INTERVAL);
        }
    }

    // -----------------------------------------------------------------
    // INIT_WAIT
    // -----------------------------------------------------------------

    fn init_wait_phase(&mut self) -> Result<(), PoolError> {
        loop {
            if self.roster.is_empty() {
                break;
            }
            if self
                .roster
                .iter()
                .all(|w| w.state == WorkerState::Ready)
            {
                break;
            }
            self.pump_all_init();
            if !self.roster.is_empty() {
                thread::sleep(INIT_POLL_INTERVAL);
            }
        }

        if self.roster.is_empty() {
            return Err(PoolError::AllWorkersFailedInit {
                pool: self.config.name.clone(),
            });
        }

        Ok(())
    }

    fn pump_all_init(&mut self) {
        let mut i = 0;
        while i < self.roster.len() {
            if self.pump_one_init(i) {
                // removed in place, don't advance i
            } else {
                i += 1;
            }
        }
    }

    /// Drains `roster[idx]`'s inbox for init-phase messages (`InitOk`,
    /// `Error`, and forwarded logs); everything else is ignored per
    /// spec.md §4.2.2. Returns true if the worker was killed and removed.
    fn pump_one_init(&mut self, idx: usize) -> bool {
        loop {
            let msg = match self.roster[idx].try_recv() {
                Some(m) => m,
                None => return false,
            };
            match msg {
                WorkerMessage::InitOk => {
                    self.roster[idx].state = WorkerState::Ready;
                }
                WorkerMessage::Error { diagnostic, .. } => {
                    if let Some(d) = diagnostic {
                        self.diagnostics
                            .log_err(&self.roster[idx].name, &format!("initialization: {d}"));
                    }
                    self.roster[idx].kill();
                    self.roster.remove(idx);
                    return true;
                }
                WorkerMessage::LogInfo { text } => {
                    self.diagnostics.log_info(&self.roster[idx].name, &text);
                }
                WorkerMessage::LogErr { text } => {
                    self.diagnostics.log_err(&self.roster[idx].name, &text);
                }
                WorkerMessage::Success { .. }
                | WorkerMessage::Finalized
                | WorkerMessage::Progress { .. } => {
                    // Not expected before INIT_OK; ignored per spec.md §4.2.2.
                }
            }
        }
    }

    // -----------------------------------------------------------------
    // RUN
    // -----------------------------------------------------------------

    fn run_phase(&mut self) -> Result<(), PoolError> {
        loop {
            self.sweep_drain_inboxes();
            if self.roster.is_empty() {
                return Err(PoolError::RosterExhausted {
                    pool: self.config.name.clone(),
                });
            }

            self.sweep_enforce_liveness();
            if self.roster.is_empty() {
                return Err(PoolError::RosterExhausted {
                    pool: self.config.name.clone(),
                });
            }

            self.sweep_dispatch();
            if self.roster.is_empty() {
                return Err(PoolError::RosterExhausted {
                    pool: self.config.name.clone(),
                });
            }

            if !self.config.loop_sleep.is_zero() {
                thread::sleep(self.config.loop_sleep);
            }

            let idle_ok = self.driver.on_tick();
            if idle_ok && self.roster.iter().all(|w| w.state == WorkerState::Ready) {
                return Ok(());
            }
        }
    }

    /// Sweep 1: deliver `Success`/`Error` and forward diagnostics.
    fn sweep_drain_inboxes(&mut self) {
        let Self {
            roster,
            driver,
            diagnostics,
            ..
        } = self;

        let mut i = 0;
        while i < roster.len() {
            let mut killed = false;
            while let Some(msg) = roster[i].try_recv() {
                match msg {
                    WorkerMessage::Success { item, result } => {
                        driver.on_result(&roster[i].host_context, item, result);
                        roster[i].state = WorkerState::Ready;
                        roster[i].inflight_item = None;
                        roster[i].dispatch_time = None;
                    }
                    WorkerMessage::Error { item, diagnostic } => {
                        if let Some(d) = &diagnostic {
                            diagnostics.log_err(&roster[i].name, d);
                        }
                        // When no item accompanies the error, nothing is
                        // returned to the producer — preserved verbatim
                        // from the original (spec.md §9 Open Questions).
                        if let Some(item) = item {
                            driver.on_data_return(&roster[i].host_context, item);
                        }
                        roster[i].kill();
                        killed = true;
                    }
                    WorkerMessage::LogInfo { text } => {
                        diagnostics.log_info(&roster[i].name, &text);
                    }
                    WorkerMessage::LogErr { text } => {
                        diagnostics.log_err(&roster[i].name, &text);
                    }
                    WorkerMessage::Progress { count } => {
                        diagnostics.progress(&roster[i].name, count);
                    }
                    WorkerMessage::InitOk | WorkerMessage::Finalized => {
                        // Stray during RUN; nothing to do.
                    }
                }
                if killed {
                    break;
                }
            }

            if killed {
                roster.remove(i);
            } else {
                i += 1;
            }
        }
    }

    /// Sweep 2: kill and reissue work from workers that stopped
    /// responding within `no_response_timeout`.
    fn sweep_enforce_liveness(&mut self) {
        let Self {
            roster,
            driver,
            diagnostics,
            config,
            ..
        } = self;

        if config.no_response_timeout.is_zero() {
            return;
        }

        let now = Instant::now();
        let mut i = 0;
        while i < roster.len() {
            let hung = roster[i].state == WorkerState::Busy
                && roster[i]
                    .dispatch_time
                    .is_some_and(|t| now.duration_since(t) > config.no_response_timeout);

            if hung {
                diagnostics.log_err(&roster[i].name, "no response, terminating");
                if let Some(item) = roster[i].inflight_item.take() {
                    driver.on_data_return(&roster[i].host_context, item);
                }
                roster[i].kill();
                roster.remove(i);
            } else {
                i += 1;
            }
        }
    }

    /// Sweep 3: hand a new item to every `READY` worker that the producer
    /// still has work for.
    fn sweep_dispatch(&mut self) {
        let Self { roster, driver, .. } = self;

        let mut i = 0;
        while i < roster.len() {
            let mut killed = false;

            if roster[i].state == WorkerState::Ready {
                if let Some(item) = driver.get_data(&roster[i].host_context) {
                    match roster[i].send_data(item.clone()) {
                        Ok(()) => {
                            roster[i].dispatch_time = Some(Instant::now());
                            roster[i].inflight_item = Some(item);
                            roster[i].state = WorkerState::Busy;
                        }
                        Err(_) => {
                            driver.on_data_return(&roster[i].host_context, item);
                            roster[i].kill();
                            killed = true;
                        }
                    }
                }
            }

            if killed {
                roster.remove(i);
            } else {
                i += 1;
            }
        }
    }

    // -----------------------------------------------------------------
    // DRAIN
    // -----------------------------------------------------------------

    fn drain_phase(&mut self) {
        let now = Instant::now();
        for w in self.roster.iter_mut() {
            let _ = w.send_close();
            w.close_sent_at = Some(now);
        }

        while !self.roster.is_empty() {
            let mut i = 0;
            while i < self.roster.len() {
                let mut finalized = false;
                while let Some(msg) = self.roster[i].try_recv() {
                    if matches!(msg, WorkerMessage::Finalized) {
                        finalized = true;
                    }
                }

                let elapsed = self.roster[i]
                    .close_sent_at
                    .map_or(SHUTDOWN_TIMEOUT, |t| Instant::now().duration_since(t));

                if finalized || elapsed > SHUTDOWN_TIMEOUT {
                    self.roster[i].kill();
                    self.roster.remove(i);
                } else {
                    i += 1;
                }
            }

            if !self.roster.is_empty() {
                thread::sleep(INIT_POLL_INTERVAL);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::ProcessDescriptor;
    use crate::testing::ThreadSpawner;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// A driver over a fixed in-memory backlog of `u32` items, recording
    /// results and returned items, that reports idle-ok once the backlog
    /// is empty and every dispatched item has come back one way or
    /// another. `C` is the per-worker config handed to
    /// `process_info_generator`, one entry per worker to spawn.
    struct TestDriver<C> {
        backlog: VecDeque<u32>,
        configs: Vec<C>,
        outstanding: usize,
        results: Arc<Mutex<Vec<(u32, u32)>>>,
        returned: Arc<Mutex<Vec<u32>>>,
    }

    impl<C> TestDriver<C> {
        fn new(items: Vec<u32>, configs: Vec<C>) -> Self {
            Self {
                backlog: items.into(),
                configs,
                outstanding: 0,
                results: Arc::new(Mutex::new(Vec::new())),
                returned: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl<C> PoolDriver for TestDriver<C>
    where
        C: serde::Serialize + Send + 'static,
    {
        type Context = usize;
        type Item = u32;
        type Output = u32;
        type Config = C;
        type Aggregate = (Vec<(u32, u32)>, Vec<u32>);

        fn process_info_generator(&mut self) -> Vec<ProcessDescriptor<Self::Context, Self::Config>> {
            self.configs
                .drain(..)
                .enumerate()
                .map(|(i, cfg)| ProcessDescriptor::new(format!("worker-{i}"), i, cfg))
                .collect()
        }

        fn worker_command(&self, _name: &str) -> Command {
            // Never consulted: `ThreadSpawner` ignores the command.
            Command::new("unused")
        }

        fn get_data(&mut self, _ctx: &usize) -> Option<u32> {
            let item = self.backlog.pop_front();
            if item.is_some() {
                self.outstanding += 1;
            }
            item
        }

        fn on_data_return(&mut self, _ctx: &usize, item: u32) {
            self.outstanding -= 1;
            self.returned.lock().unwrap().push(item);
            self.backlog.push_back(item);
        }

        fn on_result(&mut self, _ctx: &usize, item: u32, result: u32) {
            self.outstanding -= 1;
            self.results.lock().unwrap().push((item, result));
        }

        fn on_tick(&mut self) -> bool {
            self.backlog.is_empty() && self.outstanding == 0
        }

        fn get_result(self) -> Self::Aggregate {
            let results = Arc::try_unwrap(self.results).unwrap().into_inner().unwrap();
            let returned = Arc::try_unwrap(self.returned).unwrap().into_inner().unwrap();
            (results, returned)
        }
    }

    #[derive(Clone)]
    struct Doubler;

    impl crate::processor::Processor for Doubler {
        type Config = ();
        type Item = u32;
        type Output = u32;

        fn initialize(_config: ()) -> Result<Self, String> {
            Ok(Doubler)
        }

        fn process(
            &mut self,
            item: &u32,
            _ctx: &crate::processor::WorkerContext,
        ) -> Result<u32, crate::processor::ProcessError> {
            Ok(item * 2)
        }
    }

    fn config(timeout: Duration) -> PoolConfig {
        PoolConfig {
            name: "test".into(),
            no_response_timeout: timeout,
            loop_sleep: Duration::from_millis(1),
            initialize_in_serial: false,
        }
    }

    #[test]
    fn happy_path_processes_every_item() {
        let driver = TestDriver::new(vec![1, 2, 3, 4], vec![(), ()]);
        let spawner = ThreadSpawner::<Doubler>::new();
        let coordinator = Coordinator::with_spawner(driver, config(Duration::ZERO), spawner);

        let (results, returned) = coordinator.run().expect("pool should finish");

        let mut seen: Vec<u32> = results.iter().map(|(item, _)| *item).collect();
        seen.sort();
        assert_eq!(seen, vec![1, 2, 3, 4]);
        for (item, result) in &results {
            assert_eq!(*result, item * 2);
        }
        assert!(returned.is_empty());
    }

    /// Fails its first item iff spawned with `config == true`, then
    /// behaves exactly like `Doubler` from then on.
    #[derive(Clone)]
    struct FlakyOnFirst {
        armed: bool,
    }

    impl crate::processor::Processor for FlakyOnFirst {
        type Config = bool;
        type Item = u32;
        type Output = u32;

        fn initialize(armed: bool) -> Result<Self, String> {
            Ok(FlakyOnFirst { armed })
        }

        fn process(
            &mut self,
            item: &u32,
            _ctx: &crate::processor::WorkerContext,
        ) -> Result<u32, crate::processor::ProcessError> {
            if self.armed {
                self.armed = false;
                return Err(crate::processor::ProcessError::diagnostic("boom"));
            }
            Ok(item * 2)
        }
    }

    #[test]
    fn crash_mid_flight_reissues_the_item() {
        // worker-0 fails its first item and gets killed; worker-1 is
        // healthy throughout and ends up processing both the item
        // worker-0 lost and its own.
        let driver = TestDriver::new(vec![1, 2], vec![true, false]);
        let spawner = ThreadSpawner::<FlakyOnFirst>::new();
        let coordinator = Coordinator::with_spawner(driver, config(Duration::ZERO), spawner);

        let (results, returned) = coordinator.run().expect("pool should finish");

        assert_eq!(returned.len(), 1);
        assert_eq!(results.len(), 2);
        for (item, result) in &results {
            assert_eq!(*result, item * 2);
        }
    }

    struct NeverResponds;

    impl crate::processor::Processor for NeverResponds {
        type Config = ();
        type Item = u32;
        type Output = u32;

        fn initialize(_config: ()) -> Result<Self, String> {
            Ok(NeverResponds)
        }

        fn process(
            &mut self,
            _item: &u32,
            _ctx: &crate::processor::WorkerContext,
        ) -> Result<u32, crate::processor::ProcessError> {
            std::thread::sleep(Duration::from_secs(3600));
            unreachable!("test timeout should fire first")
        }
    }

    #[test]
    fn hang_with_single_worker_fails_fatally_once_timed_out() {
        let driver = TestDriver::new(vec![1], vec![()]);
        let spawner = ThreadSpawner::<NeverResponds>::new();
        let coordinator =
            Coordinator::with_spawner(driver, config(Duration::from_millis(200)), spawner);

        let err = coordinator.run().expect_err("hung worker should be fatal");
        assert!(matches!(err, PoolError::RosterExhausted { .. }));
    }

    #[test]
    fn zero_descriptors_is_fatal_before_run() {
        let driver: TestDriver<()> = TestDriver::new(vec![], vec![]);
        let spawner = ThreadSpawner::<Doubler>::new();
        let coordinator = Coordinator::with_spawner(driver, config(Duration::ZERO), spawner);

        let err = coordinator.run().expect_err("empty descriptor stream is fatal");
        assert!(matches!(err, PoolError::NoDescriptors { .. }));
    }
}
