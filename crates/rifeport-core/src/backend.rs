use anyhow::Result;

use crate::{EngineConfig, FrameShape, ModelDescriptor};

#[derive(Clone, Copy, Debug)]
pub struct BackendCapabilities {
    pub supports_gpu: bool,
    /// Kernel accepts any `t`, not just the midpoint.
    pub arbitrary_timestep: bool,
    pub max_channels: u8,
}

pub trait Backend {
    type Kernel: InterpolationKernel;

    fn name(&self) -> &'static str;
    fn capabilities(&self) -> BackendCapabilities;

    /// Acquires the device context and loads weights from an already resolved
    /// model directory.
    fn load(&self, model: &ModelDescriptor, config: &EngineConfig) -> Result<Self::Kernel>;
}

/// A loaded model bound to a device. Dropping it releases both.
pub trait InterpolationKernel: Send + 'static {
    /// Writes the frame at `timestep` between `frame0` and `frame1` into `out`.
    ///
    /// All three slices hold `shape.byte_len()` packed bytes.
    fn interpolate(
        &mut self,
        frame0: &[u8],
        frame1: &[u8],
        shape: FrameShape,
        timestep: f32,
        out: &mut [u8],
    ) -> Result<()>;
}
