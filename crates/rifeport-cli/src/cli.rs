use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use rifeport_core::DEFAULT_MODEL;

#[derive(Parser, Debug)]
#[command(name = "rifeport", version, about = "RIFE video frame interpolation")]
pub struct Cli {
    /// Log level (RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Synthesize one frame between two images
    Interpolate {
        #[arg(long)]
        frame0: PathBuf,

        #[arg(long)]
        frame1: PathBuf,

        #[arg(long)]
        output: PathBuf,

        /// Position between the two frames, 0.0 to 1.0
        #[arg(long, default_value_t = 0.5)]
        timestep: f32,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Multiply the frame rate of a directory of numbered frames
    Sequence {
        #[arg(long)]
        input_dir: PathBuf,

        #[arg(long)]
        output_dir: PathBuf,

        /// Output frames per input frame (defaults to --scale)
        #[arg(long)]
        multiplier: Option<u32>,

        /// Engines to run in parallel; 1 keeps the sequential fast path
        #[arg(long, default_value_t = 1)]
        workers: usize,

        #[command(flatten)]
        engine: EngineArgs,
    },

    /// Inspect installed models or try loading one
    Probe {
        /// List the models in the store and exit
        #[arg(long)]
        list: bool,

        #[command(flatten)]
        engine: EngineArgs,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// ONNX Runtime flow network
    Ort,
    /// Linear blend reference kernel
    Cpu,
}

#[derive(Args, Debug, Clone)]
pub struct EngineArgs {
    #[arg(long, value_enum, default_value_t = BackendKind::Ort)]
    pub backend: BackendKind,

    /// Model name under the models directory, or a model directory path
    #[arg(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Device for inference (auto, cpu, -1, N or gpu:N)
    #[arg(long, default_value = "auto")]
    pub device: String,

    /// Power-of-two frame multiplier
    #[arg(long, default_value_t = 2)]
    pub scale: u32,

    /// Average over horizontally mirrored input
    #[arg(long)]
    pub tta: bool,

    /// Average over the time-reversed pair
    #[arg(long)]
    pub tta_temporal: bool,

    /// Process large frames in overlapping tiles
    #[arg(long)]
    pub uhd: bool,

    #[arg(long, default_value_t = 1)]
    pub threads: usize,

    /// Overrides RIFEPORT_MODELS_DIR and the install location
    #[arg(long)]
    pub models_dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sequence_with_engine_flags() {
        let cli = Cli::try_parse_from([
            "rifeport",
            "sequence",
            "--input-dir",
            "in",
            "--output-dir",
            "out",
            "--backend",
            "cpu",
            "--scale",
            "4",
            "--workers",
            "3",
            "--tta",
            "--log",
            "debug",
        ])
        .unwrap();

        assert_eq!(cli.log, "debug");
        match cli.command {
            Command::Sequence {
                multiplier,
                workers,
                engine,
                ..
            } => {
                assert_eq!(multiplier, None);
                assert_eq!(workers, 3);
                assert_eq!(engine.backend, BackendKind::Cpu);
                assert_eq!(engine.scale, 4);
                assert!(engine.tta && !engine.tta_temporal);
                assert_eq!(engine.model, DEFAULT_MODEL);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn interpolate_defaults_to_midpoint() {
        let cli = Cli::try_parse_from([
            "rifeport",
            "interpolate",
            "--frame0",
            "a.png",
            "--frame1",
            "b.png",
            "--output",
            "mid.png",
        ])
        .unwrap();

        match cli.command {
            Command::Interpolate { timestep, engine, .. } => {
                assert_eq!(timestep, 0.5);
                assert_eq!(engine.backend, BackendKind::Ort);
                assert_eq!(engine.device, "auto");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_backend() {
        assert!(Cli::try_parse_from(["rifeport", "probe", "--backend", "vulkan"]).is_err());
    }
}
