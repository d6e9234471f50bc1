use rifeport_core::Frame;
use tokio::sync::oneshot;

#[derive(Debug)]
pub struct InterpolationRequest {
    pub frame0: Frame,
    pub frame1: Frame,
    pub timestep: f32,
    pub enqueued_at: std::time::Instant,
    pub resp_tx: oneshot::Sender<rifeport_core::Result<InterpolationResponse>>,
}

#[derive(Debug)]
pub struct InterpolationResponse {
    pub frame: Frame,
    pub worker_id: usize,
    pub timings: Timings,
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Timings {
    pub queued_us: u64,
    pub backend_us: u64,
}
