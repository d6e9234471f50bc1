use std::fmt;
use std::str::FromStr;

use crate::{InterpError, Result};

pub const DEFAULT_MODEL: &str = "rife-v2.3";
pub const DEFAULT_TILE_SIZE: u32 = 512;
pub const DEFAULT_TILE_OVERLAP: u32 = 32;

/// Which compute device the kernel should bind to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum DeviceSelector {
    /// Let the backend pick; CPU-only backends treat this as [`DeviceSelector::Cpu`].
    #[default]
    Auto,
    Cpu,
    Gpu(u32),
}

impl DeviceSelector {
    pub fn is_gpu(&self) -> bool {
        matches!(self, Self::Gpu(_))
    }
}

impl FromStr for DeviceSelector {
    type Err = InterpError;

    /// Accepts `auto`, `cpu`, `-1` (CPU), a bare index, or `gpu:N` / `cuda:N` / `vulkan:N`.
    fn from_str(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("auto") {
            return Ok(Self::Auto);
        }
        if raw.eq_ignore_ascii_case("cpu") || raw == "-1" {
            return Ok(Self::Cpu);
        }

        let index = ["gpu:", "cuda:", "vulkan:"]
            .iter()
            .find_map(|prefix| raw.strip_prefix(prefix))
            .unwrap_or(raw);

        index.parse::<u32>().map(Self::Gpu).map_err(|_| {
            InterpError::InvalidConfig(format!(
                "unsupported device: {raw} (expected auto, cpu, -1, N or gpu:N)"
            ))
        })
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Cpu => f.write_str("cpu"),
            Self::Gpu(index) => write!(f, "gpu:{index}"),
        }
    }
}

/// Engine construction parameters. Fixed for the lifetime of an engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    pub device: DeviceSelector,
    /// Model name (looked up under the store) or a directory path.
    pub model: String,
    /// Power-of-two frame multiplier the model is meant to be driven at.
    pub scale: u32,
    pub tta_spatial: bool,
    pub tta_temporal: bool,
    pub uhd_mode: bool,
    pub num_threads: usize,
    /// Compare the caller's first frame with the held frame on every fast call.
    pub verify_fast_path: bool,
    pub tile_size: u32,
    pub tile_overlap: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            device: DeviceSelector::Auto,
            model: DEFAULT_MODEL.to_string(),
            scale: 2,
            tta_spatial: false,
            tta_temporal: false,
            uhd_mode: false,
            num_threads: 1,
            verify_fast_path: cfg!(debug_assertions),
            tile_size: DEFAULT_TILE_SIZE,
            tile_overlap: DEFAULT_TILE_OVERLAP,
        }
    }
}

impl EngineConfig {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    pub fn with_device(mut self, device: DeviceSelector) -> Self {
        self.device = device;
        self
    }

    pub fn with_scale(mut self, scale: u32) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_tta(mut self, spatial: bool, temporal: bool) -> Self {
        self.tta_spatial = spatial;
        self.tta_temporal = temporal;
        self
    }

    pub fn with_uhd_mode(mut self, uhd_mode: bool) -> Self {
        self.uhd_mode = uhd_mode;
        self
    }

    pub fn with_threads(mut self, num_threads: usize) -> Self {
        self.num_threads = num_threads;
        self
    }

    pub fn with_fast_path_verification(mut self, verify: bool) -> Self {
        self.verify_fast_path = verify;
        self
    }

    pub fn with_tiles(mut self, tile_size: u32, tile_overlap: u32) -> Self {
        self.tile_size = tile_size;
        self.tile_overlap = tile_overlap;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !is_power_of_two(self.scale) {
            return Err(InterpError::InvalidConfig(format!(
                "scale should be a power of 2, got {}",
                self.scale
            )));
        }
        if self.num_threads == 0 {
            return Err(InterpError::InvalidConfig(
                "num_threads must be at least 1".into(),
            ));
        }
        if self.model.trim().is_empty() {
            return Err(InterpError::InvalidConfig("model name is empty".into()));
        }
        if self.uhd_mode && self.tile_size <= self.tile_overlap.saturating_mul(2) {
            return Err(InterpError::InvalidConfig(format!(
                "tile size {} must exceed twice the overlap {}",
                self.tile_size, self.tile_overlap
            )));
        }
        Ok(())
    }
}

/// `scale & (scale - 1) == 0`, excluding zero.
pub fn is_power_of_two(scale: u32) -> bool {
    scale != 0 && scale & (scale - 1) == 0
}
