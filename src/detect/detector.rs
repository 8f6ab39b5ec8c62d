//! Frame classification against a running background model.

use anyhow::{anyhow, Result};

use super::mask::{box_blur, connected_components, dilate};
use super::result::{DetectionResult, MotionRegion};
use crate::frame::Frame;

/// Tuning knobs for the motion detector.
#[derive(Clone, Copy, Debug)]
pub struct DetectorConfig {
    /// Minimum component pixel area to count as motion.
    pub min_contour_area: u32,
    /// Global intensity threshold separating changed from unchanged pixels.
    pub diff_threshold: u8,
    /// Background model learning rate (running-average alpha).
    pub learning_rate: f32,
    /// Frames to observe before classifications are trusted.
    pub warmup_frames: u32,
    /// Dilation passes applied to the binary mask before grouping.
    pub dilation_passes: u32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            min_contour_area: 500,
            diff_threshold: 25,
            learning_rate: 0.05,
            warmup_frames: 30,
            dilation_passes: 2,
        }
    }
}

/// Per-session motion detector.
///
/// Owns the background model: a per-pixel f32 running average seeded from the
/// first observed frame and updated every cycle with
/// `model = (1 - alpha) * model + alpha * frame`. Stationary scenes converge to
/// near-zero difference; gradual lighting change is absorbed at the same rate,
/// so a stale scene never stays flagged.
pub struct MotionDetector {
    config: DetectorConfig,
    model: Vec<f32>,
    width: u32,
    height: u32,
    frames_seen: u64,
}

impl MotionDetector {
    pub fn new(config: DetectorConfig) -> Self {
        Self {
            config,
            model: Vec::new(),
            width: 0,
            height: 0,
            frames_seen: 0,
        }
    }

    pub fn frames_seen(&self) -> u64 {
        self.frames_seen
    }

    /// True until `warmup_frames` frames have been observed.
    pub fn warming_up(&self) -> bool {
        self.frames_seen < self.config.warmup_frames as u64
    }

    /// Classify one frame. Called once per frame; no frame is reclassified.
    ///
    /// A frame whose dimensions do not match the session is rejected with an
    /// error; the caller logs and skips it, leaving the model untouched.
    pub fn classify(&mut self, frame: &Frame) -> Result<DetectionResult> {
        let luma = box_blur(&frame.to_luma(), frame.width, frame.height);

        if self.model.is_empty() {
            self.width = frame.width;
            self.height = frame.height;
            self.model = luma.iter().map(|&v| v as f32).collect();
            self.frames_seen = 1;
            return Ok(DetectionResult {
                is_motion: false,
                regions: Vec::new(),
                snapshot: frame.clone(),
            });
        }

        if frame.width != self.width || frame.height != self.height {
            return Err(anyhow!(
                "frame dimensions changed mid-session: expected {}x{}, got {}x{}",
                self.width,
                self.height,
                frame.width,
                frame.height
            ));
        }

        // Difference against the pre-update model, then fold the frame in.
        let threshold = self.config.diff_threshold as f32;
        let alpha = self.config.learning_rate;
        let mut mask = vec![false; luma.len()];
        for (i, &pixel) in luma.iter().enumerate() {
            let value = pixel as f32;
            if (value - self.model[i]).abs() > threshold {
                mask[i] = true;
            }
            self.model[i] = (1.0 - alpha) * self.model[i] + alpha * value;
        }
        self.frames_seen += 1;

        // Warm-up: keep learning, never report motion.
        if self.frames_seen <= self.config.warmup_frames as u64 {
            return Ok(DetectionResult {
                is_motion: false,
                regions: Vec::new(),
                snapshot: frame.clone(),
            });
        }

        for _ in 0..self.config.dilation_passes {
            mask = dilate(&mask, self.width, self.height);
        }

        let mut regions: Vec<MotionRegion> = connected_components(&mask, self.width, self.height)
            .into_iter()
            .filter(|region| region.area >= self.config.min_contour_area)
            .collect();
        regions.sort_by(|a, b| {
            b.area
                .cmp(&a.area)
                .then(a.y.cmp(&b.y))
                .then(a.x.cmp(&b.x))
        });

        Ok(DetectionResult {
            is_motion: !regions.is_empty(),
            regions,
            snapshot: frame.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> DetectorConfig {
        DetectorConfig {
            min_contour_area: 50,
            diff_threshold: 25,
            learning_rate: 0.05,
            warmup_frames: 5,
            dilation_passes: 2,
        }
    }

    fn frame_with_square(background: u8, x: u32, y: u32, side: u32) -> Frame {
        let mut frame = Frame::filled(64, 64, background);
        frame.fill_rect(x, y, side, side, [255, 255, 255]);
        frame
    }

    #[test]
    fn stationary_scene_never_reports_motion() -> Result<()> {
        let mut detector = MotionDetector::new(test_config());
        let frame = Frame::filled(64, 64, 128);
        for _ in 0..20 {
            let result = detector.classify(&frame)?;
            assert!(!result.is_motion);
        }
        Ok(())
    }

    #[test]
    fn warmup_suppresses_motion_regardless_of_content() -> Result<()> {
        let mut detector = MotionDetector::new(test_config());
        detector.classify(&Frame::filled(64, 64, 128))?;
        // Wildly different frames inside the warm-up window stay quiet.
        for i in 0..4 {
            let result = detector.classify(&Frame::filled(64, 64, if i % 2 == 0 { 0 } else { 255 }))?;
            assert!(!result.is_motion);
        }
        assert!(!detector.warming_up());
        Ok(())
    }

    #[test]
    fn square_above_area_threshold_is_reported() -> Result<()> {
        let mut detector = MotionDetector::new(test_config());
        let background = Frame::filled(64, 64, 20);
        for _ in 0..10 {
            detector.classify(&background)?;
        }
        let result = detector.classify(&frame_with_square(20, 10, 12, 16))?;
        assert!(result.is_motion);
        assert_eq!(result.regions.len(), 1);
        let region = result.regions[0];
        // Blur plus two dilation passes can widen the box by a few pixels.
        assert!(region.x >= 7 && region.x <= 10, "x = {}", region.x);
        assert!(region.y >= 9 && region.y <= 12, "y = {}", region.y);
        assert!(region.width >= 16 && region.width <= 22);
        assert!(region.height >= 16 && region.height <= 22);
        assert!(region.area >= 16 * 16);
        Ok(())
    }

    #[test]
    fn tiny_region_below_area_threshold_is_noise() -> Result<()> {
        let mut config = test_config();
        config.min_contour_area = 200;
        let mut detector = MotionDetector::new(config);
        let background = Frame::filled(64, 64, 20);
        for _ in 0..10 {
            detector.classify(&background)?;
        }
        let result = detector.classify(&frame_with_square(20, 30, 30, 4))?;
        assert!(!result.is_motion);
        assert!(result.regions.is_empty());
        Ok(())
    }

    #[test]
    fn regions_ordered_by_descending_area() -> Result<()> {
        let mut detector = MotionDetector::new(test_config());
        let background = Frame::filled(64, 64, 20);
        for _ in 0..10 {
            detector.classify(&background)?;
        }
        let mut frame = Frame::filled(64, 64, 20);
        frame.fill_rect(4, 4, 10, 10, [255, 255, 255]);
        frame.fill_rect(40, 40, 18, 18, [255, 255, 255]);
        let result = detector.classify(&frame)?;
        assert_eq!(result.regions.len(), 2);
        assert!(result.regions[0].area > result.regions[1].area);
        // The larger square sits at (40, 40); it must come first.
        assert!(result.regions[0].x >= 37);
        Ok(())
    }

    #[test]
    fn equal_area_regions_order_by_top_left_coordinate() -> Result<()> {
        let mut detector = MotionDetector::new(test_config());
        let background = Frame::filled(64, 64, 20);
        for _ in 0..10 {
            detector.classify(&background)?;
        }
        // Identical squares well clear of the frame edges, so blur and
        // dilation grow both by the same margin and the areas tie.
        let mut frame = Frame::filled(64, 64, 20);
        frame.fill_rect(40, 8, 12, 12, [255, 255, 255]);
        frame.fill_rect(8, 40, 12, 12, [255, 255, 255]);
        let result = detector.classify(&frame)?;
        assert_eq!(result.regions.len(), 2);
        assert_eq!(result.regions[0].area, result.regions[1].area);
        // The tie breaks on (y, x): the upper square wins despite its larger x.
        assert!(result.regions[0].y < result.regions[1].y);
        assert!(result.regions[0].x > result.regions[1].x);
        Ok(())
    }

    #[test]
    fn model_adapts_to_a_persistent_scene_change() -> Result<()> {
        let mut config = test_config();
        config.learning_rate = 0.3;
        config.warmup_frames = 2;
        let mut detector = MotionDetector::new(config);
        let before = Frame::filled(64, 64, 20);
        let after = Frame::filled(64, 64, 120);
        for _ in 0..4 {
            detector.classify(&before)?;
        }
        // Abrupt change flags motion at first...
        assert!(detector.classify(&after)?.is_motion);
        // ...then the model absorbs it.
        let mut settled = false;
        for _ in 0..10 {
            if !detector.classify(&after)?.is_motion {
                settled = true;
                break;
            }
        }
        assert!(settled, "model never converged to the new scene");
        Ok(())
    }

    #[test]
    fn dimension_change_is_rejected_without_touching_the_model() -> Result<()> {
        let mut detector = MotionDetector::new(test_config());
        detector.classify(&Frame::filled(64, 64, 128))?;
        assert!(detector.classify(&Frame::filled(32, 32, 128)).is_err());
        assert_eq!(detector.frames_seen(), 1);
        Ok(())
    }
}
