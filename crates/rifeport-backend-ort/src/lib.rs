mod bisect;
mod layout;
mod planes;

use std::time::Instant;

use anyhow::{ensure, Context, Result};
use ort::{
    session::{builder::GraphOptimizationLevel, builder::SessionBuilder, Session, SessionInputValue},
    value::DynValue,
};
use rifeport_core::{
    Backend, BackendCapabilities, DeviceSelector, EngineConfig, FrameShape, InterpolationKernel,
    ModelDescriptor, MAX_CHANNELS,
};
use tracing::{debug, info};

pub use layout::InputLayout;
use planes::PlaneGeometry;

/// File the kernel loads from the model directory.
pub const FLOWNET_FILE: &str = "flownet.onnx";

pub struct OrtBackend;

impl OrtBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OrtBackend {
    fn default() -> Self {
        Self::new()
    }
}

pub struct OrtKernel {
    session: Session,
    layout: InputLayout,
    alignment: u32,
}

impl Backend for OrtBackend {
    type Kernel = OrtKernel;

    fn name(&self) -> &'static str {
        "onnxruntime"
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            supports_gpu: cfg!(feature = "cuda"),
            arbitrary_timestep: true,
            max_channels: MAX_CHANNELS,
        }
    }

    fn load(&self, model: &ModelDescriptor, config: &EngineConfig) -> Result<Self::Kernel> {
        let path = model.directory.require_file(FLOWNET_FILE)?;

        let builder = Session::builder()
            .context("failed to create ORT session builder")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("failed to configure ORT session builder")?
            .with_intra_threads(config.num_threads)
            .context("failed to set ORT intra-op threads")?;

        let builder = configure_session_builder(builder, config.device)?;

        let session = builder
            .commit_from_file(&path)
            .with_context(|| format!("failed to load {}", path.display()))?;

        let input_names: Vec<String> = session
            .inputs
            .iter()
            .map(|input| input.name.clone())
            .collect();
        let layout = InputLayout::detect(&input_names)?;
        layout.check_variant(model.variant)?;

        info!(
            model = %model.name,
            variant = %model.variant,
            layout = layout.as_str(),
            inputs = ?input_names,
            "flow network loaded"
        );

        Ok(OrtKernel {
            session,
            layout,
            alignment: model.variant.pad_alignment(),
        })
    }
}

fn configure_session_builder(builder: SessionBuilder, device: DeviceSelector) -> Result<SessionBuilder> {
    match device {
        DeviceSelector::Auto | DeviceSelector::Cpu => Ok(builder),
        DeviceSelector::Gpu(device_id) => configure_cuda(builder, device_id),
    }
}

fn configure_cuda(builder: SessionBuilder, device_id: u32) -> Result<SessionBuilder> {
    #[cfg(feature = "cuda")]
    {
        use ort::execution_providers::cuda::CUDAExecutionProvider;
        let ep = CUDAExecutionProvider::default()
            .with_device_id(device_id as i32)
            .build();
        builder
            .with_execution_providers([ep])
            .context("failed to enable ORT CUDA execution provider")
    }
    #[cfg(not(feature = "cuda"))]
    {
        let _ = (builder, device_id);
        anyhow::bail!("GPU requested but rifeport-backend-ort was built without the `cuda` feature")
    }
}

impl OrtKernel {
    /// One network evaluation on padded planar frames.
    fn run_network(
        &mut self,
        img0: &[f32],
        img1: &[f32],
        geometry: PlaneGeometry,
        timestep: f32,
    ) -> Result<Vec<f32>> {
        let frame_dims = geometry.dims(3);
        let inputs: Vec<(String, SessionInputValue)> = match &self.layout {
            InputLayout::Separate {
                img0: name0,
                img1: name1,
                timestep: name_t,
            } => vec![
                (name0.clone(), input_value(frame_dims.clone(), img0.to_vec())?),
                (name1.clone(), input_value(frame_dims, img1.to_vec())?),
                (name_t.clone(), input_value(vec![1, 1, 1, 1], vec![timestep])?),
            ],
            InputLayout::Concatenated { input } => {
                let data = planes::concat_with_timestep(img0, img1, geometry.plane_len(), timestep);
                vec![(input.clone(), input_value(geometry.dims(7), data)?)]
            }
            InputLayout::MidpointOnly {
                img0: name0,
                img1: name1,
            } => vec![
                (name0.clone(), input_value(frame_dims.clone(), img0.to_vec())?),
                (name1.clone(), input_value(frame_dims, img1.to_vec())?),
            ],
        };

        let outputs = self.session.run(inputs)?;
        let (_, value) = outputs.iter().next().context("flow network produced no outputs")?;
        let array = value.try_extract_array::<f32>()?;
        let slice = array.as_slice().context("non-contiguous output tensor")?;

        let expected = 3 * geometry.plane_len();
        ensure!(
            slice.len() >= expected,
            "flow network output has {} values, expected at least {expected}",
            slice.len()
        );
        Ok(slice[..expected].to_vec())
    }
}

impl InterpolationKernel for OrtKernel {
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

        let started = Instant::now();
        let geometry = PlaneGeometry::new(shape, self.alignment);
        let img0 = planes::to_planes(frame0, shape, geometry);
        let img1 = planes::to_planes(frame1, shape, geometry);

        let output = if self.layout.takes_timestep() {
            self.run_network(&img0, &img1, geometry, timestep)?
        } else {
            bisect::bisect(img0, img1, timestep, |lo, hi| {
                self.run_network(lo, hi, geometry, 0.5)
            })?
        };

        planes::from_planes(&output, geometry, shape, (frame0, frame1), timestep, out);
        debug!(
            %shape,
            padded_w = geometry.padded_width,
            padded_h = geometry.padded_height,
            timestep,
            run_us = started.elapsed().as_micros() as u64,
            "flow network run"
        );
        Ok(())
    }
}

fn input_value(shape: Vec<usize>, data: Vec<f32>) -> Result<SessionInputValue<'static>> {
    let value: DynValue = ort::value::Tensor::from_array((shape, data))?.into_dyn();
    Ok(SessionInputValue::from(value))
}
