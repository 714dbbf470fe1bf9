/**
 * Minimal test harness for the worker pool.
 *
 * Spawns a small fleet of `demo_worker` subprocesses, hands them a fixed
 * backlog of frame indices to score, and prints the aggregate once the
 * pool drains. One worker is configured to crash on its first frame so the
 * crash-mid-flight reissue path actually fires.
 *
 *   cargo run -p pool_demo --bin demo_host
 */
use std::env;
use std::process::Command;

use pool::{Coordinator, PoolConfig, PoolDriver, PoolError, ProcessDescriptor};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct FrameJob {
    frame_index: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct FrameScore {
    frame_index: u32,
    score: f64,
}

#[derive(Debug, Serialize)]
struct WorkerConfig {
    poison_frame: Option<u32>,
}

const FRAME_COUNT: u32 = 20;

struct FrameDriver {
    backlog: Vec<u32>,
    outstanding: usize,
    scores: Vec<FrameScore>,
}

impl FrameDriver {
    fn new() -> Self {
        Self {
            backlog: (0..FRAME_COUNT).rev().collect(),
            outstanding: 0,
            scores: Vec::new(),
        }
    }
}

impl PoolDriver for FrameDriver {
    /// Worker index; unused beyond bookkeeping for this demo, but this is
    /// where a real embedder would carry e.g. a GPU index for affinity.
    type Context = usize;
    type Item = FrameJob;
    type Output = FrameScore;
    type Config = WorkerConfig;
    type Aggregate = Vec<FrameScore>;

    fn process_info_generator(&mut self) -> Vec<ProcessDescriptor<Self::Context, Self::Config>> {
        vec![
            ProcessDescriptor::new(
                "worker-0",
                0,
                WorkerConfig {
                    poison_frame: Some(3),
                },
            ),
            ProcessDescriptor::new("worker-1", 1, WorkerConfig { poison_frame: None }),
        ]
    }

    fn worker_command(&self, _name: &str) -> Command {
        let mut exe = env::current_exe().expect("current_exe");
        exe.pop();
        exe.push(if cfg!(windows) {
            "demo_worker.exe"
        } else {
            "demo_worker"
        });
        Command::new(exe)
    }

    fn on_clients_initialized(&mut self) {
        println!("[demo_host] pool is live, dispatching {FRAME_COUNT} frames");
    }

    fn get_data(&mut self, _host_context: &usize) -> Option<FrameJob> {
        self.backlog.pop().map(|frame_index| {
            self.outstanding += 1;
            FrameJob { frame_index }
        })
    }

    fn on_data_return(&mut self, _host_context: &usize, item: FrameJob) {
        self.outstanding -= 1;
        self.backlog.push(item.frame_index);
    }

    fn on_result(&mut self, _host_context: &usize, _item: FrameJob, result: FrameScore) {
        self.outstanding -= 1;
        self.scores.push(result);
    }

    fn on_tick(&mut self) -> bool {
        self.backlog.is_empty() && self.outstanding == 0
    }

    fn on_clients_finalized(&mut self) {
        println!("[demo_host] pool drained");
    }

    fn get_result(self) -> Self::Aggregate {
        self.scores
    }
}

fn main() -> Result<(), PoolError> {
    let config = PoolConfig::new("frame-scoring-demo");
    let coordinator = Coordinator::new(FrameDriver::new(), config);
    let mut scores = coordinator.run()?;

    scores.sort_by_key(|s| s.frame_index);
    println!("[demo_host] scored {} frames:", scores.len());
    for score in &scores {
        println!("  frame {:>3} -> {:.3}", score.frame_index, score.score);
    }

    Ok(())
}
