use rifeport_core::{Frame, InterpolationEngine, Result};

/// What a pool worker needs from its engine. Only the stateless path is
/// used: requests from one caller may land on different workers, so no
/// worker can assume it saw the previous pair.
pub trait WorkerEngine: Send {
    fn interpolate(&mut self, frame0: &Frame, frame1: &Frame, timestep: f32) -> Result<Frame>;
}

impl WorkerEngine for InterpolationEngine {
    fn interpolate(&mut self, frame0: &Frame, frame1: &Frame, timestep: f32) -> Result<Frame> {
        self.process(frame0, frame1, timestep)
    }
}
