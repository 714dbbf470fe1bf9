/**
 * A worker binary: a thin `main` handing a `Processor` to `pool::serve`.
 *
 * This process is spawned by `demo_host`, reads `FrameJob`s from stdin, and
 * reports a fake per-frame "quality score" back on stdout. It never
 * constructs a `Coordinator` itself — it only implements the child half of
 * the protocol.
 */
use std::process::ExitCode;

use pool::{ProcessError, Processor, WorkerContext};
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

#[derive(Debug, Deserialize)]
struct WorkerConfig {
    /// Frame index that should trigger a simulated crash, used by the demo
    /// to exercise the coordinator's crash-mid-flight reissue path.
    poison_frame: Option<u32>,
}

struct FrameScorer {
    poison_frame: Option<u32>,
}

impl Processor for FrameScorer {
    type Config = WorkerConfig;
    type Item = FrameJob;
    type Output = FrameScore;

    fn initialize(config: Self::Config) -> Result<Self, String> {
        Ok(FrameScorer {
            poison_frame: config.poison_frame,
        })
    }

    fn process(&mut self, item: &FrameJob, ctx: &WorkerContext) -> Result<FrameScore, ProcessError> {
        if self.poison_frame == Some(item.frame_index) {
            // Fires once: the next frame this worker is handed scores fine.
            self.poison_frame = None;
            return Err(ProcessError::diagnostic(format!(
                "simulated crash on frame {}",
                item.frame_index
            )));
        }

        ctx.progress(1);
        Ok(FrameScore {
            frame_index: item.frame_index,
            score: (item.frame_index as f64 * 1.7) % 1.0,
        })
    }

    fn finalize(&mut self) {}
}

fn main() -> ExitCode {
    pool::serve::<FrameScorer>()
}
