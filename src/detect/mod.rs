//! Motion detection.
//!
//! One detector per capture session. Frames flow through grayscale conversion,
//! a running-average background model, mask cleanup, and connected-component
//! grouping; see `detector` for the classification contract.

mod detector;
mod mask;
mod result;

pub use detector::{DetectorConfig, MotionDetector};
pub use result::{DetectionResult, MotionRegion};
