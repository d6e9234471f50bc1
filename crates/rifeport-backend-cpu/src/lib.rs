use anyhow::{ensure, Context, Result};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use rifeport_core::{
    Backend, BackendCapabilities, DeviceSelector, EngineConfig, FrameShape, InterpolationKernel,
    ModelDescriptor, MAX_CHANNELS,
};
use tracing::debug;

/// Fixed-point weight scale for the blend.
const WEIGHT_ONE: u32 = 256;

/// Per-byte linear blend. Reads no weights, so the model directory only has to exist.
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

pub struct BlendKernel {
    pool: ThreadPool,
}

impl Backend for CpuBackend {
    type Kernel = BlendKernel;

    fn name(&self) -> &'static str {
        "cpu"
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            supports_gpu: false,
            arbitrary_timestep: true,
            max_channels: MAX_CHANNELS,
        }
    }

    fn load(&self, model: &ModelDescriptor, config: &EngineConfig) -> Result<Self::Kernel> {
        ensure!(
            !matches!(config.device, DeviceSelector::Gpu(_)),
            "cpu backend cannot bind {}",
            config.device
        );

        let pool = ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .thread_name(|i| format!("rifeport-cpu-{i}"))
            .build()
            .context("failed to build blend thread pool")?;

        debug!(
            model = %model.name,
            threads = config.num_threads,
            "cpu blend kernel loaded"
        );
        Ok(BlendKernel { pool })
    }
}

impl InterpolationKernel for BlendKernel {
    fn interpolate(
        &mut self,
        frame0: &[u8],
        frame1: &[u8],
        shape: FrameShape,
        timestep: f32,
        out: &mut [u8],
    ) -> Result<()> {
        let expected = shape.byte_len();
        ensure!(
            frame0.len() == expected && frame1.len() == expected && out.len() == expected,
            "buffer size mismatch for {shape}: {} / {} / {} bytes, expected {expected}",
            frame0.len(),
            frame1.len(),
            out.len()
        );

        let (w0, w1) = blend_weights(timestep);
        let row = shape.row_bytes();
        self.pool.install(|| {
            out.par_chunks_mut(row)
                .zip(frame0.par_chunks(row))
                .zip(frame1.par_chunks(row))
                .for_each(|((dst, a), b)| blend_row(dst, a, b, w0, w1));
        });
        Ok(())
    }
}

fn blend_weights(timestep: f32) -> (u32, u32) {
    let w1 = (timestep.clamp(0.0, 1.0) * WEIGHT_ONE as f32).round() as u32;
    (WEIGHT_ONE - w1, w1)
}

fn blend_row(dst: &mut [u8], a: &[u8], b: &[u8], w0: u32, w1: u32) {
    for ((d, &x), &y) in dst.iter_mut().zip(a).zip(b) {
        *d = ((u32::from(x) * w0 + u32::from(y) * w1 + WEIGHT_ONE / 2) / WEIGHT_ONE) as u8;
    }
}
