use std::time::Instant;

use tracing::{debug, info, warn};

use crate::augment::{flip_horizontal, Accumulator};
use crate::cache::{CacheStatus, FrameCache};
use crate::tiling;
use crate::{
    ArchVariant, Backend, BackendCapabilities, EngineConfig, Frame, FrameShape, InterpError,
    InterpolationKernel, ModelDescriptor, ModelStore, Result,
};

/// Channel count `process_fast` pairs with an explicit shape hint.
pub const DEFAULT_FAST_CHANNELS: u8 = 3;

pub struct InterpolationEngine {
    descriptor: ModelDescriptor,
    config: EngineConfig,
    backend: &'static str,
    capabilities: BackendCapabilities,
    kernel: Box<dyn InterpolationKernel>,
    cache: FrameCache,
}

impl InterpolationEngine {
    /// Builds an engine against the installed model store.
    pub fn create<B: Backend>(backend: &B, config: EngineConfig) -> Result<Self> {
        Self::create_with_store(backend, config, &ModelStore::installed())
    }

    pub fn create_with_store<B: Backend>(
        backend: &B,
        config: EngineConfig,
        store: &ModelStore,
    ) -> Result<Self> {
        config.validate()?;

        let capabilities = backend.capabilities();
        if config.device.is_gpu() && !capabilities.supports_gpu {
            return Err(InterpError::InvalidConfig(format!(
                "{} backend cannot run on {}",
                backend.name(),
                config.device
            )));
        }

        // Resolve before the backend allocates anything.
        let directory = store.resolve(&config.model)?;
        let descriptor = ModelDescriptor {
            name: config.model.clone(),
            directory,
            variant: ArchVariant::classify(&config.model),
            scale: config.scale,
        };

        let started = Instant::now();
        let kernel = backend
            .load(&descriptor, &config)
            .map_err(|err| load_error(&descriptor, err))?;

        info!(
            backend = backend.name(),
            model = %descriptor.name,
            variant = %descriptor.variant,
            device = %config.device,
            threads = config.num_threads,
            tta_spatial = config.tta_spatial,
            tta_temporal = config.tta_temporal,
            uhd = config.uhd_mode,
            load_ms = started.elapsed().as_millis() as u64,
            "interpolation engine ready"
        );

        Ok(Self {
            descriptor,
            config,
            backend: backend.name(),
            capabilities,
            kernel: Box::new(kernel),
            cache: FrameCache::new(),
        })
    }

    pub fn descriptor(&self) -> &ModelDescriptor {
        &self.descriptor
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend
    }

    pub fn capabilities(&self) -> BackendCapabilities {
        self.capabilities
    }

    pub fn cache_status(&self) -> CacheStatus {
        self.cache.status()
    }

    /// Interpolates the frame at `timestep` between `frame0` and `frame1`.
    ///
    /// `timestep == 0.0` returns `frame0` and `timestep == 1.0` returns
    /// `frame1` without running the kernel; the returned frame shares the
    /// caller's storage. Nothing on the engine is mutated.
    pub fn process(&mut self, frame0: &Frame, frame1: &Frame, timestep: f32) -> Result<Frame> {
        check_timestep(timestep)?;
        if frame0.shape() != frame1.shape() {
            return Err(InterpError::ShapeMismatch {
                first: frame0.shape(),
                second: frame1.shape(),
            });
        }
        if timestep == 0.0 {
            return Ok(frame0.clone());
        }
        if timestep == 1.0 {
            return Ok(frame1.clone());
        }

        let shape = frame0.shape();
        self.check_channels(shape)?;

        let started = Instant::now();
        let mut out = vec![0u8; shape.byte_len()];
        run(
            self.kernel.as_mut(),
            &self.config,
            frame0.data(),
            frame1.data(),
            shape,
            timestep,
            &mut out,
        )?;
        debug!(
            %shape,
            timestep,
            elapsed_us = started.elapsed().as_micros() as u64,
            "interpolated"
        );

        Frame::with_shape(shape, out)
    }

    /// Fast path for sequential pairs `(F0, F1), (F1, F2), ...`.
    ///
    /// The caller's `frame0` must equal the previous call's `frame1`: the
    /// engine feeds the kernel from the frame it held over, not from
    /// `frame0`. That is only checked when `verify_fast_path` is set.
    pub fn process_fast(&mut self, frame0: &Frame, frame1: &Frame, timestep: f32) -> Result<Frame> {
        self.process_fast_with_shape(frame0, frame1, timestep, None, DEFAULT_FAST_CHANNELS)
    }

    /// Like [`process_fast`](Self::process_fast), with an explicit
    /// `(height, width)` and channel count for the first call of a sequence.
    pub fn process_fast_with_shape(
        &mut self,
        frame0: &Frame,
        frame1: &Frame,
        timestep: f32,
        shape: Option<(u32, u32)>,
        channels: u8,
    ) -> Result<Frame> {
        check_timestep(timestep)?;
        if timestep == 0.0 {
            return Ok(frame0.clone());
        }
        if timestep == 1.0 {
            return Ok(frame1.clone());
        }

        self.check_channels(frame1.shape())?;
        let call = self.cache.begin(
            frame0,
            frame1,
            shape,
            channels,
            self.config.verify_fast_path,
        )?;

        let started = Instant::now();
        let mut out = vec![0u8; call.shape.byte_len()];
        let result = run(
            self.kernel.as_mut(),
            &self.config,
            &call.held,
            frame1.data(),
            call.shape,
            timestep,
            &mut out,
        );
        if let Err(err) = result {
            warn!(error = %err, "fast-path call failed; cache needs a reset");
            return Err(err);
        }

        let out = Frame::with_shape(call.shape, out);
        debug!(
            shape = %call.shape,
            timestep,
            elapsed_us = started.elapsed().as_micros() as u64,
            "interpolated (fast path)"
        );
        self.cache.commit(call, frame1.bytes().clone());
        out
    }

    /// Forgets the held frame and cached geometry.
    pub fn reset(&mut self) {
        debug!("fast-path cache reset");
        self.cache.reset();
    }

    /// Releases the kernel and its device context now rather than at scope end.
    pub fn close(self) {}

    fn check_channels(&self, shape: FrameShape) -> Result<()> {
        if shape.channels > self.capabilities.max_channels {
            return Err(InterpError::InvalidFrame(format!(
                "{} backend handles at most {} channels, got {}",
                self.backend, self.capabilities.max_channels, shape.channels
            )));
        }
        Ok(())
    }
}

impl Drop for InterpolationEngine {
    fn drop(&mut self) {
        debug!(model = %self.descriptor.name, backend = self.backend, "releasing interpolation engine");
    }
}

fn check_timestep(timestep: f32) -> Result<()> {
    if (0.0..=1.0).contains(&timestep) {
        Ok(())
    } else {
        Err(InterpError::InvalidTimestep(timestep))
    }
}

fn load_error(descriptor: &ModelDescriptor, err: anyhow::Error) -> InterpError {
    match err.downcast::<InterpError>() {
        Ok(err @ InterpError::ModelNotFound { .. }) => err,
        Ok(other) => InterpError::ModelLoad {
            path: descriptor.path().to_path_buf(),
            source: other.into(),
        },
        Err(err) => InterpError::ModelLoad {
            path: descriptor.path().to_path_buf(),
            source: err,
        },
    }
}

/// Splits into UHD tiles when configured and the frame needs more than one.
fn run(
    kernel: &mut dyn InterpolationKernel,
    config: &EngineConfig,
    frame0: &[u8],
    frame1: &[u8],
    shape: FrameShape,
    timestep: f32,
    out: &mut [u8],
) -> Result<()> {
    if config.uhd_mode {
        let tiles = tiling::plan(
            shape.width,
            shape.height,
            config.tile_size,
            config.tile_overlap,
        );
        if tiles.len() > 1 {
            debug!(%shape, tiles = tiles.len(), "tiled interpolation");
            for tile in &tiles {
                let tile_shape = tile.input_shape(shape.channels);
                let tile0 = tiling::crop(frame0, shape, tile.input);
                let tile1 = tiling::crop(frame1, shape, tile.input);
                let mut tile_out = vec![0u8; tile_shape.byte_len()];
                run_augmented(
                    kernel,
                    config,
                    &tile0,
                    &tile1,
                    tile_shape,
                    timestep,
                    &mut tile_out,
                )?;
                tiling::blit_core(&tile_out, tile, out, shape);
            }
            return Ok(());
        }
    }

    run_augmented(kernel, config, frame0, frame1, shape, timestep, out)
}

/// Averages over the temporal swap and the horizontal mirror when enabled.
fn run_augmented(
    kernel: &mut dyn InterpolationKernel,
    config: &EngineConfig,
    frame0: &[u8],
    frame1: &[u8],
    shape: FrameShape,
    timestep: f32,
    out: &mut [u8],
) -> Result<()> {
    if !config.tta_spatial && !config.tta_temporal {
        return kernel
            .interpolate(frame0, frame1, shape, timestep, out)
            .map_err(InterpError::Compute);
    }

    let mirrored = config
        .tta_spatial
        .then(|| (flip_horizontal(frame0, shape), flip_horizontal(frame1, shape)));

    let mut passes: Vec<(&[u8], &[u8], f32, bool)> = vec![(frame0, frame1, timestep, false)];
    if config.tta_temporal {
        passes.push((frame1, frame0, 1.0 - timestep, false));
    }
    if let Some((mirrored0, mirrored1)) = &mirrored {
        passes.push((mirrored0.as_slice(), mirrored1.as_slice(), timestep, true));
        if config.tta_temporal {
            passes.push((mirrored1.as_slice(), mirrored0.as_slice(), 1.0 - timestep, true));
        }
    }

    let mut acc = Accumulator::new(out.len());
    let mut pass = vec![0u8; out.len()];
    for (a, b, t, flipped) in passes {
        kernel
            .interpolate(a, b, shape, t, &mut pass)
            .map_err(InterpError::Compute)?;
        if flipped {
            acc.add(&flip_horizontal(&pass, shape));
        } else {
            acc.add(&pass);
        }
    }

    debug!(passes = acc.passes(), "test-time augmentation");
    acc.finish(out);
    Ok(())
}
