use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use rifeport_core::Frame;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::{
    InterpolationRequest, InterpolationResponse, Scheduler, SchedulerHandle, Worker, WorkerEngine,
};

const SCHEDULER_QUEUE: usize = 1024;
const WORKER_QUEUE: usize = 16;

pub struct EnginePool {
    scheduler: SchedulerHandle,
    scheduler_task: JoinHandle<()>,
    workers: Vec<JoinHandle<()>>,
}

impl EnginePool {
    /// Starts `workers` workers. Each one calls `factory(worker_id)` on its
    /// own blocking thread, so engines never cross threads after loading.
    /// Fails if any engine fails to build.
    pub async fn start<E, F>(workers: usize, factory: F) -> Result<Self>
    where
        E: WorkerEngine + 'static,
        F: Fn(usize) -> rifeport_core::Result<E> + Send + Sync + 'static,
    {
        ensure!(workers > 0, "engine pool needs at least one worker");

        let factory = Arc::new(factory);
        let mut worker_txs = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);
        let mut ready = Vec::with_capacity(workers);

        for id in 0..workers {
            let (tx, inbox) = mpsc::channel(WORKER_QUEUE);
            let (ready_tx, ready_rx) = oneshot::channel();
            let factory = Arc::clone(&factory);

            handles.push(tokio::task::spawn_blocking(move || {
                let engine = match factory(id) {
                    Ok(engine) => {
                        let _ = ready_tx.send(Ok(()));
                        engine
                    }
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                Worker {
                    id,
                    inbox,
                    engine: Box::new(engine),
                }
                .run_blocking();
            }));
            worker_txs.push(tx);
            ready.push(ready_rx);
        }

        for (id, ready_rx) in ready.into_iter().enumerate() {
            let outcome = ready_rx
                .await
                .with_context(|| format!("worker {id} exited during startup"))
                .and_then(|built| built.with_context(|| format!("worker {id} failed to build its engine")));
            if let Err(err) = outcome {
                // Closing the inboxes lets the workers that did start exit.
                drop(worker_txs);
                for handle in handles {
                    let _ = handle.await;
                }
                return Err(err);
            }
        }

        let (sched_tx, sched_rx) = mpsc::channel(SCHEDULER_QUEUE);
        let scheduler = Scheduler::new(sched_rx, worker_txs);
        let scheduler_task = tokio::spawn(async move {
            if let Err(e) = scheduler.run().await {
                error!(error = ?e, "scheduler exited");
            }
        });

        info!(workers, "engine pool started");
        Ok(Self {
            scheduler: Scheduler::handle(sched_tx),
            scheduler_task,
            workers: handles,
        })
    }

    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    /// Interpolates on whichever worker is next in line. Engine failures
    /// come back as [`rifeport_core::InterpError`] inside the error.
    pub async fn submit(
        &self,
        frame0: Frame,
        frame1: Frame,
        timestep: f32,
    ) -> Result<InterpolationResponse> {
        let (resp_tx, resp_rx) = oneshot::channel();
        self.scheduler
            .submit(InterpolationRequest {
                frame0,
                frame1,
                timestep,
                enqueued_at: std::time::Instant::now(),
                resp_tx,
            })
            .await?;

        let reply = resp_rx
            .await
            .context("worker dropped the request without replying")?;
        Ok(reply?)
    }

    /// Stops accepting work, lets queued requests finish, and joins every
    /// worker thread.
    pub async fn shutdown(self) -> Result<()> {
        drop(self.scheduler);
        self.scheduler_task.await.context("scheduler task panicked")?;
        for (id, handle) in self.workers.into_iter().enumerate() {
            handle
                .await
                .with_context(|| format!("worker {id} panicked"))?;
        }
        info!("engine pool stopped");
        Ok(())
    }
}
