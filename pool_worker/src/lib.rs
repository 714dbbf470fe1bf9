/**
 * The child-process half of the wire protocol: the harness a worker
 * binary's `main` hands its `Processor` to.
 *
 * `serve::<P>()` blocks on stdin, runs `P` through initialize / process*
 * / finalize, and never returns control to `main` except by process exit
 * — a worker binary's `main` is normally just `pool_worker::serve::<MyProcessor>()`.
 */
use std::io::{self, Read, Write};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::process::ExitCode;

use pool_core::{
    read_frame, write_frame, HostMessage, Processor, ProcessError, WorkerContext, WorkerInit,
    WorkerMessage,
};

/// Runs the worker lifecycle to completion and returns the process exit
/// code: success once `FINALIZED` has been emitted, failure if the
/// worker never got to `INIT_OK` at all.
pub fn serve<P: Processor>() -> ExitCode {
    let stdin = io::stdin();
    let mut stdin = stdin.lock();

    let init: WorkerInit<P::Config> = match read_frame(&mut stdin) {
        Ok(Some(init)) => init,
        Ok(None) => return ExitCode::FAILURE,
        Err(_) => return ExitCode::FAILURE,
    };

    let mut processor = match catch_unwind(AssertUnwindSafe(|| P::initialize(init.config))) {
        Ok(Ok(processor)) => processor,
        Ok(Err(message)) => {
            emit::<P::Item, P::Output>(&WorkerMessage::Error {
                item: None,
                diagnostic: Some(message),
            });
            return ExitCode::FAILURE;
        }
        Err(payload) => {
            emit::<P::Item, P::Output>(&WorkerMessage::Error {
                item: None,
                diagnostic: Some(panic_message(payload)),
            });
            return ExitCode::FAILURE;
        }
    };

    emit::<P::Item, P::Output>(&WorkerMessage::InitOk);

    let ctx = WorkerContext::new();
    loop {
        let msg: Option<HostMessage<P::Item>> = match read_frame(&mut stdin) {
            Ok(msg) => msg,
            Err(_) => None,
        };

        let Some(msg) = msg else {
            // Host pipe closed without a CLOSE message. Treat the same
            // as CLOSE: finalize and exit, there's nothing left to read.
            run_finalize(&mut processor);
            return ExitCode::SUCCESS;
        };

        match msg {
            HostMessage::Data { item } => {
                let outcome = catch_unwind(AssertUnwindSafe(|| processor.process(&item, &ctx)));
                match outcome {
                    Ok(Ok(result)) => emit(&WorkerMessage::Success { item, result }),
                    Ok(Err(ProcessError::Silent)) => emit::<P::Item, P::Output>(&WorkerMessage::Error {
                        item: Some(item),
                        diagnostic: None,
                    }),
                    Ok(Err(ProcessError::Diagnostic(text))) => {
                        emit::<P::Item, P::Output>(&WorkerMessage::Error {
                            item: Some(item),
                            diagnostic: Some(text),
                        })
                    }
                    Err(payload) => emit::<P::Item, P::Output>(&WorkerMessage::Error {
                        item: Some(item),
                        diagnostic: Some(panic_message(payload)),
                    }),
                }
            }
            HostMessage::Close => {
                run_finalize(&mut processor);
                return ExitCode::SUCCESS;
            }
        }
    }
}

fn run_finalize<P: Processor>(processor: &mut P) {
    let _ = catch_unwind(AssertUnwindSafe(|| processor.finalize()));
    emit::<P::Item, P::Output>(&WorkerMessage::Finalized);
}

fn emit<Item: serde::Serialize, Output: serde::Serialize>(msg: &WorkerMessage<Item, Output>) {
    let mut stdout = io::stdout();
    let _ = write_frame(&mut stdout, msg);
    let _ = stdout.flush();
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "worker panicked".to_string()
    }
}
