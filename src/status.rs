//! Observational status line.
//!
//! Mirrors the classic on-frame overlay ("Monitoring..." / "Motion Detected!")
//! through the log instead of a render window. Transitions are logged at info;
//! each further frame of a continuing detection gets a debug line. No output
//! feeds back into the pipeline.

use crate::detect::DetectionResult;

pub const STATUS_MONITORING: &str = "Monitoring...";
pub const STATUS_MOTION: &str = "Motion Detected!";

#[derive(Default)]
pub struct StatusLine {
    last_motion: Option<bool>,
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record this cycle's classification. Status transitions log at info;
    /// a detection that merely continues the current motion logs at debug.
    pub fn update(&mut self, result: &DetectionResult) {
        let changed = self.last_motion != Some(result.is_motion);
        self.last_motion = Some(result.is_motion);
        if result.is_motion {
            let line = Self::motion_summary(result);
            if changed {
                log::info!("{}", line);
            } else {
                log::debug!("{}", line);
            }
        } else if changed {
            log::info!("{}", STATUS_MONITORING);
        }
    }

    fn motion_summary(result: &DetectionResult) -> String {
        format!(
            "{} {} region(s), largest {} px",
            STATUS_MOTION,
            result.regions.len(),
            result.regions.first().map(|r| r.area).unwrap_or(0)
        )
    }

    pub fn text(&self) -> &'static str {
        match self.last_motion {
            Some(true) => STATUS_MOTION,
            _ => STATUS_MONITORING,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Frame;

    fn result(is_motion: bool) -> DetectionResult {
        DetectionResult {
            is_motion,
            regions: Vec::new(),
            snapshot: Frame::filled(4, 4, 0),
        }
    }

    #[test]
    fn status_text_follows_classification() {
        let mut status = StatusLine::new();
        assert_eq!(status.text(), STATUS_MONITORING);
        status.update(&result(true));
        assert_eq!(status.text(), STATUS_MOTION);
        status.update(&result(false));
        assert_eq!(status.text(), STATUS_MONITORING);
    }

    #[test]
    fn continuing_motion_keeps_status_stable() {
        let mut status = StatusLine::new();
        for _ in 0..5 {
            status.update(&result(true));
            assert_eq!(status.text(), STATUS_MOTION);
        }
    }

    #[test]
    fn motion_summary_reports_region_count_and_largest_area() {
        use crate::detect::MotionRegion;

        let mut detection = result(true);
        detection.regions = vec![
            MotionRegion {
                x: 2,
                y: 2,
                width: 30,
                height: 30,
                area: 900,
            },
            MotionRegion {
                x: 40,
                y: 10,
                width: 8,
                height: 8,
                area: 64,
            },
        ];
        let line = StatusLine::motion_summary(&detection);
        assert_eq!(line, "Motion Detected! 2 region(s), largest 900 px");
    }
}
