//! Frame capture.
//!
//! `CameraSource` hands the processing loop an ordered sequence of frames from
//! one device. Two backends:
//! - a deterministic synthetic source for `stub://` device strings (tests,
//!   demos, CI), and
//! - a real V4L2 device behind the `capture-v4l2` feature.
//!
//! Device-open failure is fatal at startup; a failed `next_frame` mid-stream is
//! the caller's to absorb (skip and retry, bounded).

#[cfg(feature = "capture-v4l2")]
mod v4l2;

use anyhow::Result;

use crate::config::CameraSettings;
use crate::frame::Frame;

/// Frame source over the configured camera device.
pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticCameraSource),
    #[cfg(feature = "capture-v4l2")]
    V4l2(v4l2::DeviceCameraSource),
}

impl CameraSource {
    pub fn new(settings: &CameraSettings) -> Result<Self> {
        let device = settings.device_node();
        if device.starts_with("stub://") {
            return Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticCameraSource::new(settings.clone())),
            });
        }
        #[cfg(feature = "capture-v4l2")]
        {
            Ok(Self {
                backend: CameraBackend::V4l2(v4l2::DeviceCameraSource::new(settings.clone())?),
            })
        }
        #[cfg(not(feature = "capture-v4l2"))]
        {
            anyhow::bail!(
                "camera device {} requires the capture-v4l2 feature (stub:// works without it)",
                device
            )
        }
    }

    /// Open the device. Fatal at startup on failure.
    pub fn connect(&mut self) -> Result<()> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.connect(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::V4l2(source) => source.connect(),
        }
    }

    /// Capture the next frame.
    pub fn next_frame(&mut self) -> Result<Frame> {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source.next_frame(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::V4l2(source) => source.next_frame(),
        }
    }

    pub fn is_healthy(&self) -> bool {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.is_healthy(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::V4l2(source) => source.is_healthy(),
        }
    }

    pub fn stats(&self) -> CameraStats {
        match &self.backend {
            CameraBackend::Synthetic(source) => source.stats(),
            #[cfg(feature = "capture-v4l2")]
            CameraBackend::V4l2(source) => source.stats(),
        }
    }
}

/// Capture statistics for the periodic health log.
#[derive(Clone, Debug)]
pub struct CameraStats {
    pub frames_captured: u64,
    pub device: String,
}

// ----------------------------------------------------------------------------
// Synthetic source (stub://) for tests and demos
// ----------------------------------------------------------------------------

/// Frames before the synthetic intruder first appears.
const SYNTHETIC_MOTION_PERIOD: u64 = 200;
/// Frames the intruder stays in the scene per appearance.
const SYNTHETIC_MOTION_DWELL: u64 = 5;

struct SyntheticCameraSource {
    settings: CameraSettings,
    frame_count: u64,
}

impl SyntheticCameraSource {
    fn new(settings: CameraSettings) -> Self {
        Self {
            settings,
            frame_count: 0,
        }
    }

    fn connect(&mut self) -> Result<()> {
        log::info!(
            "CameraSource: connected to {} (synthetic)",
            self.settings.device_node()
        );
        Ok(())
    }

    /// A static gradient scene; every `SYNTHETIC_MOTION_PERIOD` frames a bright
    /// square enters for a few frames so the downstream pipeline has something
    /// to detect.
    fn next_frame(&mut self) -> Result<Frame> {
        self.frame_count += 1;
        let width = self.settings.width;
        let height = self.settings.height;

        let mut data = vec![0u8; (width * height * 3) as usize];
        for y in 0..height {
            let shade = (40 + (y * 60 / height.max(1))) as u8;
            for x in 0..width {
                let offset = ((y * width + x) * 3) as usize;
                data[offset..offset + 3].copy_from_slice(&[shade, shade, shade]);
            }
        }
        let mut frame = Frame::new(data, width, height)?;

        let phase = self.frame_count % SYNTHETIC_MOTION_PERIOD;
        if phase < SYNTHETIC_MOTION_DWELL && self.frame_count >= SYNTHETIC_MOTION_PERIOD {
            let side = (width.min(height) / 8).max(8);
            frame.fill_rect(width / 3, height / 3, side, side, [255, 255, 255]);
        }

        Ok(frame)
    }

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frame_count,
            device: self.settings.device_node(),
        }
    }
}
