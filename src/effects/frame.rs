use serde::{Deserialize, Serialize};

use crate::effects::error::{EffectError, Result};

/// Pixel layout of a frame buffer. All formats are 8 bits per channel and
/// tightly packed (stride = width * bytes per pixel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    /// Blue, green, red. What webcams hand to the pipeline by default.
    Bgr24,
    Rgb24,
    Gray8,
    Bgra32,
}

impl PixelFormat {
    /// Number of 8-bit channels per pixel.
    pub fn channels(self) -> usize {
        match self {
            Self::Gray8 => 1,
            Self::Bgr24 | Self::Rgb24 => 3,
            Self::Bgra32 => 4,
        }
    }

    /// Byte offsets of the (red, green, blue) channels within a pixel, for
    /// three-channel formats.
    pub fn rgb_offsets(self) -> Option<(usize, usize, usize)> {
        match self {
            Self::Bgr24 => Some((2, 1, 0)),
            Self::Rgb24 => Some((0, 1, 2)),
            Self::Gray8 | Self::Bgra32 => None,
        }
    }
}

/// A single immutable video frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
    timestamp_us: u64,
}

impl Frame {
    /// Wrap a packed pixel buffer.
    ///
    /// Fails with `InvalidFrame` if the buffer length does not match
    /// `width * height * channels`. Zero-sized frames are representable;
    /// the pipeline rejects them when asked to process one.
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        let expected = width as usize * height as usize * format.channels();
        if data.len() != expected {
            return Err(EffectError::InvalidFrame(format!(
                "buffer holds {} bytes, {width}x{height} {format:?} needs {expected}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            format,
            timestamp_us: 0,
        })
    }

    /// Build a frame where every pixel holds the same channel values.
    pub fn filled(width: u32, height: u32, format: PixelFormat, pixel: &[u8]) -> Result<Self> {
        if pixel.len() != format.channels() {
            return Err(EffectError::InvalidFrame(format!(
                "pixel has {} channels, {format:?} needs {}",
                pixel.len(),
                format.channels()
            )));
        }
        let data = pixel.repeat(width as usize * height as usize);
        Self::new(data, width, height, format)
    }

    /// Attach a capture timestamp in microseconds.
    pub fn with_timestamp(mut self, timestamp_us: u64) -> Self {
        self.timestamp_us = timestamp_us;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn timestamp_us(&self) -> u64 {
        self.timestamp_us
    }

    /// Raw packed pixel bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.width as usize * self.format.channels()
    }

    /// Channel values of the pixel at (x, y), or `None` when out of bounds.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let channels = self.format.channels();
        let start = y as usize * self.stride() + x as usize * channels;
        self.data.get(start..start + channels)
    }

    /// Iterate over pixels in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = &[u8]> {
        self.data.chunks_exact(self.format.channels())
    }

    /// Check that the frame is something the effect pipeline can transform:
    /// non-zero dimensions and a three-channel layout.
    pub fn ensure_processable(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(EffectError::InvalidFrame(format!(
                "zero-sized frame {}x{}",
                self.width, self.height
            )));
        }
        if self.format.channels() != 3 {
            return Err(EffectError::InvalidFrame(format!(
                "unsupported pixel format {:?} ({} channels)",
                self.format,
                self.format.channels()
            )));
        }
        Ok(())
    }

    /// Packed RGB copy of a three-channel frame, for encoders that expect RGB.
    pub fn to_rgb_vec(&self) -> Result<Vec<u8>> {
        let (r, g, b) = self.format.rgb_offsets().ok_or_else(|| {
            EffectError::InvalidFrame(format!("cannot convert {:?} to RGB", self.format))
        })?;
        if (r, g, b) == (0, 1, 2) {
            return Ok(self.data.clone());
        }
        let mut out = Vec::with_capacity(self.data.len());
        for px in self.data.chunks_exact(3) {
            out.extend_from_slice(&[px[r], px[g], px[b]]);
        }
        Ok(out)
    }

    /// A frame with this frame's geometry, format and timestamp but new pixels.
    ///
    /// Fails with `InvalidFrame` unless `data` has exactly this frame's length.
    pub(crate) fn derive(&self, data: Vec<u8>) -> Result<Self> {
        if data.len() != self.data.len() {
            return Err(EffectError::InvalidFrame(format!(
                "derived buffer holds {} bytes, {}x{} {:?} needs {}",
                data.len(),
                self.width,
                self.height,
                self.format,
                self.data.len()
            )));
        }
        Ok(Self {
            data,
            width: self.width,
            height: self.height,
            format: self.format,
            timestamp_us: self.timestamp_us,
        })
    }
}
