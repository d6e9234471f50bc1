mod cli;

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use cli::{BackendKind, Cli, Command, EngineArgs};
use image::DynamicImage;
use rifeport_backend_cpu::CpuBackend;
use rifeport_backend_ort::OrtBackend;
use rifeport_core::{
    timesteps_for_multiplier, DeviceSelector, EngineConfig, Frame, InterpolationEngine,
    ModelStore, SequenceInterpolator,
};
use rifeport_runtime::EnginePool;
use tokio::task::JoinHandle;
use tracing::info;
use tracing_subscriber::EnvFilter;

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    std::env::set_var("RUST_LOG", &cli.log);
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match cli.command {
        Command::Interpolate {
            frame0,
            frame1,
            output,
            timestep,
            engine,
        } => interpolate(&frame0, &frame1, &output, timestep, &engine),
        Command::Sequence {
            input_dir,
            output_dir,
            multiplier,
            workers,
            engine,
        } => {
            let multiplier = multiplier.unwrap_or(engine.scale);
            sequence(&input_dir, &output_dir, multiplier, workers, engine).await
        }
        Command::Probe { list, engine } => probe(list, &engine),
    }
}

fn engine_config(args: &EngineArgs) -> rifeport_core::Result<EngineConfig> {
    let device: DeviceSelector = args.device.parse()?;
    Ok(EngineConfig::new(args.model.clone())
        .with_device(device)
        .with_scale(args.scale)
        .with_tta(args.tta, args.tta_temporal)
        .with_uhd_mode(args.uhd)
        .with_threads(args.threads))
}

fn model_store(args: &EngineArgs) -> ModelStore {
    match &args.models_dir {
        Some(dir) => ModelStore::from_models_dir(dir),
        None => ModelStore::installed(),
    }
}

fn build_engine(args: &EngineArgs) -> rifeport_core::Result<InterpolationEngine> {
    let config = engine_config(args)?;
    let store = model_store(args);
    match args.backend {
        BackendKind::Ort => InterpolationEngine::create_with_store(&OrtBackend::new(), config, &store),
        BackendKind::Cpu => InterpolationEngine::create_with_store(&CpuBackend::new(), config, &store),
    }
}

fn interpolate(frame0: &Path, frame1: &Path, output: &Path, timestep: f32, args: &EngineArgs) -> Result<()> {
    let a = load_frame(frame0)?;
    let b = load_frame(frame1)?;

    let mut engine = build_engine(args).context("failed to create interpolation engine")?;
    let frame = engine.process(&a, &b, timestep)?;
    save_frame(&frame, output)?;

    info!(output = %output.display(), timestep, "wrote interpolated frame");
    Ok(())
}

async fn sequence(
    input_dir: &Path,
    output_dir: &Path,
    multiplier: u32,
    workers: usize,
    args: EngineArgs,
) -> Result<()> {
    ensure!(multiplier >= 1, "multiplier must be at least 1");
    ensure!(workers >= 1, "need at least one worker");

    let inputs = list_frames(input_dir)?;
    ensure!(!inputs.is_empty(), "no frames found in {}", input_dir.display());
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let written = if workers == 1 {
        sequence_fast_path(&inputs, output_dir, multiplier, &args)?
    } else {
        sequence_pooled(&inputs, output_dir, multiplier, workers, args).await?
    };

    info!(
        inputs = inputs.len(),
        outputs = written,
        multiplier,
        workers,
        "sequence done"
    );
    Ok(())
}

/// One engine, consecutive pairs through the fast-path cache.
fn sequence_fast_path(inputs: &[PathBuf], output_dir: &Path, multiplier: u32, args: &EngineArgs) -> Result<usize> {
    let mut engine = build_engine(args).context("failed to create interpolation engine")?;
    let mut sequence = SequenceInterpolator::new(multiplier);
    let mut writer = FrameWriter::new(output_dir);

    for path in inputs {
        let frame = load_frame(path)?;
        for out in sequence.push(&mut engine, frame)? {
            writer.write(&out)?;
        }
    }
    engine.close();
    Ok(writer.count)
}

enum Pending {
    Ready(Frame),
    Running(JoinHandle<Result<Frame>>),
}

/// Fans every intermediate out to the pool and writes results in order.
async fn sequence_pooled(
    inputs: &[PathBuf],
    output_dir: &Path,
    multiplier: u32,
    workers: usize,
    args: EngineArgs,
) -> Result<usize> {
    let pool = Arc::new(
        EnginePool::start(workers, move |_id| build_engine(&args))
            .await
            .context("failed to start engine pool")?,
    );
    let timesteps = timesteps_for_multiplier(multiplier);
    let window = workers * 4;

    let mut writer = FrameWriter::new(output_dir);
    let mut queue: VecDeque<Pending> = VecDeque::new();
    let mut previous: Option<Frame> = None;

    for path in inputs {
        let frame = load_frame(path)?;
        if let Some(prev) = previous.take() {
            if prev.shape() == frame.shape() {
                for &t in &timesteps {
                    let pool = Arc::clone(&pool);
                    let (a, b) = (prev.clone(), frame.clone());
                    queue.push_back(Pending::Running(tokio::spawn(async move {
                        Ok::<_, anyhow::Error>(pool.submit(a, b, t).await?.frame)
                    })));
                }
            }
        }
        queue.push_back(Pending::Ready(frame.clone()));
        previous = Some(frame);

        while queue.len() > window {
            write_next(&mut queue, &mut writer).await?;
        }
    }
    while !queue.is_empty() {
        write_next(&mut queue, &mut writer).await?;
    }

    let pool = Arc::try_unwrap(pool)
        .map_err(|_| anyhow::anyhow!("engine pool still in use after the last frame"))?;
    pool.shutdown().await?;
    Ok(writer.count)
}

async fn write_next(queue: &mut VecDeque<Pending>, writer: &mut FrameWriter) -> Result<()> {
    let frame = match queue.pop_front() {
        Some(Pending::Ready(frame)) => frame,
        Some(Pending::Running(handle)) => handle.await.context("interpolation task panicked")??,
        None => return Ok(()),
    };
    writer.write(&frame)
}

fn probe(list: bool, args: &EngineArgs) -> Result<()> {
    let store = model_store(args);
    if list {
        println!("models in {}:", store.models_dir().display());
        for name in store.list()? {
            println!("  {name}");
        }
        return Ok(());
    }

    let engine = build_engine(args).context("failed to create interpolation engine")?;
    let descriptor = engine.descriptor();
    let caps = engine.capabilities();
    println!("model:      {}", descriptor.name);
    println!("path:       {}", descriptor.path().display());
    println!("variant:    {}", descriptor.variant);
    println!("alignment:  {}", descriptor.variant.pad_alignment());
    println!("backend:    {}", engine.backend_name());
    println!("device:     {}", engine.config().device);
    println!(
        "supports:   gpu={} arbitrary_timestep={} max_channels={}",
        caps.supports_gpu, caps.arbitrary_timestep, caps.max_channels
    );
    engine.close();
    Ok(())
}

fn list_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = std::fs::read_dir(dir).with_context(|| format!("failed to read {}", dir.display()))?;
    let mut frames: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| FRAME_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false)
        })
        .collect();
    frames.sort();
    Ok(frames)
}

fn load_frame(path: &Path) -> Result<Frame> {
    let image = image::open(path).with_context(|| format!("failed to read {}", path.display()))?;
    Frame::try_from(image).with_context(|| format!("unusable frame {}", path.display()))
}

fn save_frame(frame: &Frame, path: &Path) -> Result<()> {
    let image = DynamicImage::try_from(frame)?;
    image
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))
}

struct FrameWriter {
    dir: PathBuf,
    count: usize,
}

impl FrameWriter {
    fn new(dir: &Path) -> Self {
        Self {
            dir: dir.to_path_buf(),
            count: 0,
        }
    }

    fn write(&mut self, frame: &Frame) -> Result<()> {
        let path = self.dir.join(format!("{:08}.png", self.count));
        save_frame(frame, &path)?;
        self.count += 1;
        Ok(())
    }
}
