//! Captured video frames.
//!
//! - `Frame`: Immutable pixel buffer handed to the pipeline for one render callback.
//! - `PixelFormat`: Buffer layouts the call engine can deliver.
//! - `Rotation`: Orientation hint attached by the engine. Carried, never applied.
//!
//! A frame is owned by the pipeline only for the duration of one delivery. It is
//! never cloned or persisted, and its pixel memory is wiped when it is dropped.

use anyhow::{anyhow, Result};
use zeroize::Zeroize;

use crate::geometry::Size;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    /// Packed 8-bit B, G, R, A.
    Bgra,
    /// Packed 8-bit R, G, B, A.
    Rgba,
    /// Planar Y, U, V with 2x2 chroma subsampling.
    I420,
    /// Y plane followed by interleaved UV with 2x2 chroma subsampling.
    Nv12,
}

impl PixelFormat {
    /// Exact byte length of a tightly packed buffer of this format.
    pub fn buffer_len(self, width: u32, height: u32) -> usize {
        let (w, h) = (width as usize, height as usize);
        match self {
            PixelFormat::Bgra | PixelFormat::Rgba => w * h * 4,
            PixelFormat::I420 | PixelFormat::Nv12 => {
                let chroma = w.div_ceil(2) * h.div_ceil(2);
                w * h + 2 * chroma
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Rotation {
    #[default]
    None,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Rotation {
    pub fn degrees(self) -> u16 {
        match self {
            Rotation::None => 0,
            Rotation::Rotate90 => 90,
            Rotation::Rotate180 => 180,
            Rotation::Rotate270 => 270,
        }
    }
}

/// One captured video image. There is no `Clone`: a frame lives exactly as
/// long as the delivery that carries it.
pub struct Frame {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
    rotation: Rotation,
}

impl Frame {
    /// Wrap a pixel buffer. Rejects empty dimensions and buffers whose length
    /// does not match the declared format.
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(anyhow!("frame dimensions must be non-zero ({width}x{height})"));
        }
        let expected = format.buffer_len(width, height);
        if data.len() != expected {
            return Err(anyhow!(
                "{:?} frame {}x{} needs {} bytes, got {}",
                format,
                width,
                height,
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            format,
            rotation: Rotation::None,
        })
    }

    pub fn with_rotation(mut self, rotation: Rotation) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Frame dimensions in pixel units, used as the source space for mapping.
    pub fn size(&self) -> Size {
        Size::new(self.width as f64, self.height as f64)
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn rotation(&self) -> Rotation {
        self.rotation
    }

    /// Read-only pixel access for detection adapters and preview sinks.
    ///
    /// Callers must not retain the slice beyond their own call.
    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    /// Approximate luma (0..=255) of the pixel at `(x, y)`.
    ///
    /// Out-of-range coordinates are clamped to the nearest edge pixel.
    pub fn luma_at(&self, x: u32, y: u32) -> u8 {
        let x = x.min(self.width - 1) as usize;
        let y = y.min(self.height - 1) as usize;
        let w = self.width as usize;
        match self.format {
            PixelFormat::Bgra => {
                let i = (y * w + x) * 4;
                luma(self.data[i + 2], self.data[i + 1], self.data[i])
            }
            PixelFormat::Rgba => {
                let i = (y * w + x) * 4;
                luma(self.data[i], self.data[i + 1], self.data[i + 2])
            }
            PixelFormat::I420 | PixelFormat::Nv12 => self.data[y * w + x],
        }
    }
}

impl std::fmt::Debug for Frame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Frame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("rotation", &self.rotation)
            .finish_non_exhaustive()
    }
}

impl Drop for Frame {
    fn drop(&mut self) {
        self.data.zeroize();
    }
}

// BT.601 integer approximation.
fn luma(r: u8, g: u8, b: u8) -> u8 {
    ((77 * r as u32 + 150 * g as u32 + 29 * b as u32) >> 8) as u8
}
