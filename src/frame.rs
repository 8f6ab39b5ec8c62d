//! Owned frame container and pixel-level helpers.
//!
//! A `Frame` is a packed RGB24 buffer with session-fixed dimensions. The capture
//! layer produces one per cycle; the detector reads a grayscale view of it; the
//! notifier encodes it to JPEG for the mail attachment.
//!
//! Annotation (`annotate_regions`) draws on a frame in place and is purely
//! informational: the detector must only ever see unannotated frames.

use anyhow::{anyhow, Result};
use image::codecs::jpeg::JpegEncoder;
use image::ExtendedColorType;

use crate::detect::MotionRegion;

/// Packed RGB24 frame.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Create a frame from a packed RGB24 buffer.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = width
            .checked_mul(height)
            .and_then(|v| v.checked_mul(3))
            .ok_or_else(|| anyhow!("frame dimensions overflow"))? as usize;
        if data.len() != expected {
            return Err(anyhow!(
                "frame length mismatch: expected {}, got {}",
                expected,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Create a frame filled with a single gray level.
    pub fn filled(width: u32, height: u32, value: u8) -> Self {
        let len = (width as usize)
            .saturating_mul(height as usize)
            .saturating_mul(3);
        Self {
            data: vec![value; len],
            width,
            height,
        }
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Grayscale view of the frame (BT.601 luma, one byte per pixel).
    pub fn to_luma(&self) -> Vec<u8> {
        let mut luma = Vec::with_capacity((self.width * self.height) as usize);
        for rgb in self.data.chunks_exact(3) {
            let y =
                0.299_f32 * rgb[0] as f32 + 0.587_f32 * rgb[1] as f32 + 0.114_f32 * rgb[2] as f32;
            luma.push(y.round().clamp(0.0, 255.0) as u8);
        }
        luma
    }

    /// Fill a rectangle with an RGB color. Clipped to the frame bounds.
    pub fn fill_rect(&mut self, x: u32, y: u32, w: u32, h: u32, color: [u8; 3]) {
        let x1 = x.saturating_add(w).min(self.width);
        let y1 = y.saturating_add(h).min(self.height);
        for row in y.min(self.height)..y1 {
            for col in x.min(self.width)..x1 {
                let offset = (row as usize * self.width as usize + col as usize) * 3;
                self.data[offset..offset + 3].copy_from_slice(&color);
            }
        }
    }

    /// Draw green bounding boxes around the given regions.
    ///
    /// Callers must annotate a copy if the original frame is still flowing
    /// through the detector.
    pub fn annotate_regions(&mut self, regions: &[MotionRegion]) {
        const GREEN: [u8; 3] = [0, 255, 0];
        for region in regions {
            let x1 = (region.x + region.width).min(self.width).saturating_sub(1);
            let y1 = (region.y + region.height).min(self.height).saturating_sub(1);
            self.fill_rect(region.x, region.y, region.width, 1, GREEN);
            self.fill_rect(region.x, y1, region.width, 1, GREEN);
            self.fill_rect(region.x, region.y, 1, region.height, GREEN);
            self.fill_rect(x1, region.y, 1, region.height, GREEN);
        }
    }

    /// Encode the frame as JPEG at the given quality (1-100).
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        let mut encoder = JpegEncoder::new_with_quality(&mut buf, quality);
        encoder.encode(&self.data, self.width, self.height, ExtendedColorType::Rgb8)?;
        Ok(buf)
    }
}
