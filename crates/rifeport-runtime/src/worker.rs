use std::time::Instant;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::{InterpolationRequest, InterpolationResponse, Timings, WorkerEngine};

/// Owns one engine. Runs on a blocking thread because kernels are
/// synchronous and may hold the thread for a whole frame.
pub struct Worker {
    pub id: usize,
    pub inbox: mpsc::Receiver<InterpolationRequest>,
    pub engine: Box<dyn WorkerEngine>,
}

impl Worker {
    /// Serves requests until the inbox closes.
    pub fn run_blocking(mut self) {
        info!(worker_id = self.id, "worker started");
        while let Some(req) = self.inbox.blocking_recv() {
            let queued_us = req.enqueued_at.elapsed().as_micros() as u64;

            let started = Instant::now();
            let result = self
                .engine
                .interpolate(&req.frame0, &req.frame1, req.timestep);
            let backend_us = started.elapsed().as_micros() as u64;

            let reply = result.map(|frame| InterpolationResponse {
                frame,
                worker_id: self.id,
                timings: Timings {
                    queued_us,
                    backend_us,
                },
            });
            if let Err(err) = &reply {
                warn!(worker_id = self.id, error = %err, "interpolation failed");
            }
            if req.resp_tx.send(reply).is_err() {
                debug!(worker_id = self.id, "caller went away before the reply");
            }
        }
        info!(worker_id = self.id, "worker stopped");
    }
}
