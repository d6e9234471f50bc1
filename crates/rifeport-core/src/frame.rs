use std::fmt;

use bytes::Bytes;

use crate::{InterpError, Result};

pub const MAX_CHANNELS: u8 = 4;

/// Geometry of a packed, row-major frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FrameShape {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
}

impl FrameShape {
    pub const fn new(width: u32, height: u32, channels: u8) -> Self {
        Self {
            width,
            height,
            channels,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    pub fn row_bytes(&self) -> usize {
        self.width as usize * self.channels as usize
    }

    pub fn byte_len(&self) -> usize {
        self.pixel_count() * self.channels as usize
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(InterpError::InvalidFrame(format!(
                "frame dimensions must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(InterpError::InvalidFrame(format!(
                "channel count must be in 1..={MAX_CHANNELS}, got {}",
                self.channels
            )));
        }
        Ok(())
    }
}

impl fmt::Display for FrameShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.channels)
    }
}

/// A single image: packed pixel bytes plus geometry.
///
/// Storage is reference counted, so cloning a frame never copies pixels.
/// Channel order is whatever the caller put in; nothing here converts
/// colour spaces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    shape: FrameShape,
    data: Bytes,
}

impl Frame {
    pub fn new(width: u32, height: u32, channels: u8, data: impl Into<Bytes>) -> Result<Self> {
        Self::with_shape(FrameShape::new(width, height, channels), data)
    }

    pub fn with_shape(shape: FrameShape, data: impl Into<Bytes>) -> Result<Self> {
        shape.validate()?;
        let data = data.into();
        if data.len() != shape.byte_len() {
            return Err(InterpError::InvalidFrame(format!(
                "{shape} frame needs {} bytes, got {}",
                shape.byte_len(),
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// Builds a frame from packed pixels, inferring the channel count from
    /// `len / (width * height)`.
    pub fn from_packed(width: u32, height: u32, data: impl Into<Bytes>) -> Result<Self> {
        let data = data.into();
        let pixels = width as usize * height as usize;
        if pixels == 0 || data.len() % pixels != 0 {
            return Err(InterpError::InvalidFrame(format!(
                "{} bytes do not divide into {width}x{height} pixels",
                data.len()
            )));
        }
        let channels = u8::try_from(data.len() / pixels).map_err(|_| {
            InterpError::InvalidFrame(format!("too many channels for {width}x{height}"))
        })?;
        Self::new(width, height, channels, data)
    }

    pub fn shape(&self) -> FrameShape {
        self.shape
    }

    pub fn width(&self) -> u32 {
        self.shape.width
    }

    pub fn height(&self) -> u32 {
        self.shape.height
    }

    pub fn channels(&self) -> u8 {
        self.shape.channels
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    /// True when both frames share the same backing storage.
    pub fn shares_storage(&self, other: &Frame) -> bool {
        self.data.as_ptr() == other.data.as_ptr() && self.data.len() == other.data.len()
    }
}
