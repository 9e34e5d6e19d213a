// Worker launchers: same-runtime task, or a dedicated OS thread with its own runtime.

use crate::domain::Network;
use crate::use_cases::{worker_task, ActionWorker, WorkerChannels, WorkerLauncher};
use std::sync::Arc;
use tokio::sync::mpsc;

const WORKER_THREAD_NAME: &str = "poker-worker";

// Runs the worker as a task on the caller's runtime.
pub struct TaskLauncher {
    worker: Arc<ActionWorker>,
    channel_capacity: usize,
}

impl TaskLauncher {
    pub fn new(worker: Arc<ActionWorker>, channel_capacity: usize) -> Self {
        Self {
            worker,
            channel_capacity,
        }
    }
}

impl WorkerLauncher for TaskLauncher {
    fn launch(&self, network: Network) -> Result<WorkerChannels, String> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| format!("no tokio runtime to host the worker: {e}"))?;
        let (request_tx, request_rx) = mpsc::channel(self.channel_capacity);
        let (response_tx, response_rx) = mpsc::channel(self.channel_capacity);

        runtime.spawn(worker_task(
            self.worker.clone(),
            request_rx,
            response_tx,
            network,
        ));

        Ok(WorkerChannels {
            requests: request_tx,
            responses: response_rx,
        })
    }
}

/// Runs the worker on its own named thread and single-threaded runtime, so ledger work
/// never competes with the caller's executor.
pub struct ThreadLauncher {
    worker: Arc<ActionWorker>,
    channel_capacity: usize,
}

impl ThreadLauncher {
    pub fn new(worker: Arc<ActionWorker>, channel_capacity: usize) -> Self {
        Self {
            worker,
            channel_capacity,
        }
    }
}

impl WorkerLauncher for ThreadLauncher {
    fn launch(&self, network: Network) -> Result<WorkerChannels, String> {
        let (request_tx, request_rx) = mpsc::channel(self.channel_capacity);
        let (response_tx, response_rx) = mpsc::channel(self.channel_capacity);
        let worker = self.worker.clone();

        std::thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(e) => {
                        // Dropping the channels here fails the init handshake.
                        tracing::error!(error = %e, "failed to build worker runtime");
                        return;
                    }
                };
                runtime.block_on(worker_task(worker, request_rx, response_tx, network));
            })
            .map_err(|e| format!("failed to spawn worker thread: {e}"))?;

        Ok(WorkerChannels {
            requests: request_tx,
            responses: response_rx,
        })
    }
}
