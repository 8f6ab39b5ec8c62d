//! motion-sentry
//!
//! Watches a single camera stream, detects motion by differencing frames
//! against a running background model, and sends a rate-limited email with a
//! snapshot when motion is confirmed.
//!
//! # Architecture
//!
//! Three stages, single-threaded and frame-sequential:
//!
//! 1. `capture`: pulls frames from the device (or a synthetic stub).
//! 2. `detect`: maintains the background model and classifies each frame,
//!    producing bounding regions and a snapshot.
//! 3. `notify`: the cooldown state machine decides whether a detection
//!    actually dispatches mail through the transport boundary.
//!
//! Classification fully completes, including any dispatch attempt, before the
//! next frame is pulled. The background model and cooldown state are owned by
//! the loop; there is no shared mutable state.
//!
//! # Module Structure
//!
//! - `config`: JSON file + env settings, validated once at startup
//! - `frame`: owned RGB24 frames, grayscale/annotation/JPEG helpers
//! - `capture`: camera sources (synthetic stub, V4L2 behind `capture-v4l2`)
//! - `detect`: background model, binary mask, connected components
//! - `notify`: cooldown machine, mail transport trait, SMTP implementation
//! - `status`: observational "Monitoring..." / "Motion Detected!" line

pub mod capture;
pub mod config;
pub mod detect;
pub mod frame;
pub mod notify;
pub mod status;

pub use capture::{CameraSource, CameraStats};
pub use config::{CameraSettings, DetectorSettings, EmailSettings, NotifySettings, SentryConfig};
pub use detect::{DetectionResult, DetectorConfig, MotionDetector, MotionRegion};
pub use frame::Frame;
pub use notify::{
    AlertSettings, CooldownState, MailTransport, MotionAlert, Notifier, NotifyConfig,
    NotifyOutcome, SmtpMailer,
};
pub use status::StatusLine;

/// Consecutive frame-read failures tolerated before the stream is fatal.
pub const MAX_CONSECUTIVE_READ_FAILURES: u32 = 10;
