//! V4L2 device backend (feature: capture-v4l2).
//!
//! Streams packed RGB24 frames from a local device node through libv4l
//! memory-mapped buffers. The negotiated format must match the configured
//! geometry exactly: the detector's background model is sized once per
//! session, so a driver that settles on a different geometry is rejected at
//! connect time rather than adopted.

use anyhow::{anyhow, bail, Context, Result};
use ouroboros::self_referencing;
use std::time::{Duration, Instant};

use super::CameraStats;
use crate::config::CameraSettings;
use crate::frame::Frame;

/// Buffers kept mapped in the capture queue.
const STREAM_BUFFERS: u32 = 4;

/// Missed frame intervals tolerated before the source reports unhealthy.
const STALL_INTERVALS: u32 = 6;

pub(super) struct DeviceCameraSource {
    settings: CameraSettings,
    state: Option<DeviceState>,
    frames_captured: u64,
    last_frame_at: Option<Instant>,
    last_error: Option<String>,
}

#[self_referencing]
struct DeviceState {
    device: v4l::Device,
    #[borrows(mut device)]
    #[covariant]
    stream: v4l::prelude::MmapStream<'this, v4l::Device>,
}

impl DeviceCameraSource {
    pub(super) fn new(settings: CameraSettings) -> Result<Self> {
        Ok(Self {
            settings,
            state: None,
            frames_captured: 0,
            last_frame_at: None,
            last_error: None,
        })
    }

    pub(super) fn connect(&mut self) -> Result<()> {
        use v4l::buffer::Type;
        use v4l::video::Capture;

        let node = self.settings.device_node();
        let device = v4l::Device::with_path(&node)
            .with_context(|| format!("open camera device {}", node))?;

        let mut requested = device.format().context("read current capture format")?;
        requested.width = self.settings.width;
        requested.height = self.settings.height;
        requested.fourcc = v4l::FourCC::new(b"RGB3");
        let active = device.set_format(&requested).or_else(|err| {
            log::warn!("CameraSource: {} rejected format request: {}", node, err);
            device.format().context("read capture format after rejection")
        })?;
        if &active.fourcc.repr != b"RGB3" {
            bail!(
                "camera {} cannot produce RGB3 frames (driver offers {})",
                node,
                active.fourcc
            );
        }
        if (active.width, active.height) != (self.settings.width, self.settings.height) {
            bail!(
                "camera {} settled on {}x{} instead of the configured {}x{}",
                node,
                active.width,
                active.height,
                self.settings.width,
                self.settings.height
            );
        }

        // Frame pacing is advisory; the run loop sleeps to the target anyway.
        let params = v4l::video::capture::Parameters::with_fps(self.settings.target_fps.max(1));
        if let Err(err) = device.set_params(&params) {
            log::warn!(
                "CameraSource: could not set {} fps on {}: {}",
                self.settings.target_fps,
                node,
                err
            );
        }

        let state = DeviceStateBuilder {
            device,
            stream_builder: |device| {
                v4l::prelude::MmapStream::with_buffers(device, Type::VideoCapture, STREAM_BUFFERS)
                    .context("map capture buffers")
            },
        }
        .try_build()?;
        self.state = Some(state);
        self.last_error = None;

        log::info!(
            "CameraSource: {} streaming RGB3 at {}x{}",
            node,
            self.settings.width,
            self.settings.height
        );
        Ok(())
    }

    pub(super) fn next_frame(&mut self) -> Result<Frame> {
        use v4l::io::traits::CaptureStream;

        let state = self
            .state
            .as_mut()
            .ok_or_else(|| anyhow!("camera device not connected"))?;
        let (buf, _meta) = match state.with_mut(|fields| fields.stream.next()) {
            Ok(captured) => captured,
            Err(err) => {
                self.last_error = Some(err.to_string());
                return Err(anyhow::Error::new(err).context("dequeue camera buffer"));
            }
        };

        self.frames_captured += 1;
        self.last_frame_at = Some(Instant::now());
        // One good frame clears the fault; the run loop's consecutive-failure
        // counter owns the give-up policy.
        self.last_error = None;

        // A short bytesused from the driver fails the length check here and is
        // absorbed by the run loop as a single bad frame.
        Frame::new(buf.to_vec(), self.settings.width, self.settings.height)
    }

    pub(super) fn is_healthy(&self) -> bool {
        if self.last_error.is_some() {
            return false;
        }
        match self.last_frame_at {
            Some(at) => at.elapsed() <= self.stall_grace(),
            None => self.state.is_some(),
        }
    }

    pub(super) fn stats(&self) -> CameraStats {
        CameraStats {
            frames_captured: self.frames_captured,
            device: self.settings.device_node(),
        }
    }

    /// How long the stream may go quiet before it counts as stalled.
    fn stall_grace(&self) -> Duration {
        (self.settings.frame_interval() * STALL_INTERVALS).max(Duration::from_secs(2))
    }
}
