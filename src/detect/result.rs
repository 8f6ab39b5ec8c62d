use crate::frame::Frame;

/// Result of classifying one frame. Produced once per input frame and consumed
/// immediately; never retained across cycles.
#[derive(Clone, Debug)]
pub struct DetectionResult {
    /// Did at least one region survive the area filter?
    pub is_motion: bool,
    /// Surviving regions, largest first (ties broken by top-left coordinate).
    pub regions: Vec<MotionRegion>,
    /// The original, unprocessed frame that triggered this result.
    pub snapshot: Frame,
}

/// A connected cluster of changed pixels that passed the area filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MotionRegion {
    /// Bounding box top-left corner.
    pub x: u32,
    pub y: u32,
    /// Bounding box dimensions.
    pub width: u32,
    pub height: u32,
    /// Number of changed pixels in the component (not the box area).
    pub area: u32,
}
