use anyhow::Result;
use tokio::sync::mpsc;

use crate::InterpolationRequest;

#[derive(Clone)]
pub struct SchedulerHandle {
    tx: mpsc::Sender<InterpolationRequest>,
}

impl SchedulerHandle {
    pub async fn submit(&self, req: InterpolationRequest) -> Result<()> {
        self.tx
            .send(req)
            .await
            .map_err(|_| anyhow::anyhow!("scheduler is shut down"))
    }
}

/// Hands requests to workers in round-robin order.
pub struct Scheduler {
    rx: mpsc::Receiver<InterpolationRequest>,
    worker_txs: Vec<mpsc::Sender<InterpolationRequest>>,
    rr: usize,
}

impl Scheduler {
    pub fn new(
        rx: mpsc::Receiver<InterpolationRequest>,
        worker_txs: Vec<mpsc::Sender<InterpolationRequest>>,
    ) -> Self {
        Self {
            rx,
            worker_txs,
            rr: 0,
        }
    }

    pub fn handle(tx: mpsc::Sender<InterpolationRequest>) -> SchedulerHandle {
        SchedulerHandle { tx }
    }

    /// Runs until every handle is dropped; dropping the worker senders on
    /// return is what stops the workers.
    pub async fn run(mut self) -> Result<()> {
        anyhow::ensure!(!self.worker_txs.is_empty(), "scheduler has no workers");
        while let Some(req) = self.rx.recv().await {
            let idx = self.rr % self.worker_txs.len();
            self.rr += 1;
            self.worker_txs[idx]
                .send(req)
                .await
                .map_err(|_| anyhow::anyhow!("worker {idx} is gone"))?;
        }
        Ok(())
    }
}
