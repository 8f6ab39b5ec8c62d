//! End-to-end pipeline behavior: detector and notifier wired together the way
//! sentryd wires them, with a recording transport in place of SMTP.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::Result;

use motion_sentry::{
    AlertSettings, CooldownState, DetectorConfig, Frame, MailTransport, MotionAlert,
    MotionDetector, Notifier, NotifyConfig, NotifyOutcome,
};

struct RecordingTransport {
    sent: Arc<Mutex<Vec<MotionAlert>>>,
}

impl MailTransport for RecordingTransport {
    fn send(&mut self, alert: &MotionAlert) -> Result<()> {
        self.sent.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

fn notifier(cooldown_secs: u64) -> (Notifier, Arc<Mutex<Vec<MotionAlert>>>) {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let notifier = Notifier::new(
        NotifyConfig {
            notification_enabled: true,
            email_enabled: true,
            cooldown: Duration::from_secs(cooldown_secs),
        },
        AlertSettings {
            from: "camera@example.com".into(),
            to: "owner@example.com".into(),
            camera_label: "camera 0".into(),
            jpeg_quality: 85,
        },
        Box::new(RecordingTransport {
            sent: Arc::clone(&sent),
        }),
    );
    (notifier, sent)
}

fn static_frame() -> Frame {
    Frame::filled(80, 60, 128)
}

fn intruder_frame() -> Frame {
    // 40x40 bright square: 1600 px^2, comfortably above the 500 px^2 default.
    let mut frame = static_frame();
    frame.fill_rect(10, 10, 40, 40, [255, 255, 255]);
    frame
}

#[test]
fn static_scene_then_intruder_dispatches_exactly_once() -> Result<()> {
    let mut detector = MotionDetector::new(DetectorConfig::default());
    let (mut notifier, sent) = notifier(60);
    let t0 = Instant::now();

    // 40 identical frames against a 30-frame warm-up: zero notifications.
    for i in 0..40 {
        let result = detector.classify(&static_frame())?;
        assert!(!result.is_motion, "static frame {} reported motion", i);
        notifier.on_detection(&result, t0 + Duration::from_millis(i * 100));
    }
    assert!(sent.lock().unwrap().is_empty());
    assert_eq!(notifier.state(), CooldownState::Idle);

    // One intruder frame: exactly one dispatch attempt, state suppressed.
    let t_motion = t0 + Duration::from_secs(5);
    let result = detector.classify(&intruder_frame())?;
    assert!(result.is_motion);
    assert_eq!(result.regions.len(), 1);
    assert!(result.regions[0].area >= 1600);
    assert_eq!(notifier.on_detection(&result, t_motion), NotifyOutcome::Sent);
    assert_eq!(
        notifier.state(),
        CooldownState::Suppressed { since: t_motion }
    );

    let alerts = sent.lock().unwrap();
    assert_eq!(alerts.len(), 1);
    assert!(alerts[0].subject.starts_with("Motion Detected - "));
    let attachment = alerts[0].attachment.as_ref().expect("snapshot attached");
    assert_eq!(&attachment.jpeg[0..2], &[0xFF, 0xD8]);
    Ok(())
}

#[test]
fn repeated_motion_within_cooldown_is_suppressed() -> Result<()> {
    let mut detector = MotionDetector::new(DetectorConfig::default());
    let (mut notifier, sent) = notifier(60);
    let t0 = Instant::now();

    for _ in 0..35 {
        let result = detector.classify(&static_frame())?;
        notifier.on_detection(&result, t0);
    }

    // A lingering intruder keeps flagging motion for a while (the model only
    // slowly absorbs it); only the first attempt inside the window dispatches.
    let mut outcomes = Vec::new();
    for i in 0..5 {
        let result = detector.classify(&intruder_frame())?;
        assert!(result.is_motion);
        outcomes.push(notifier.on_detection(&result, t0 + Duration::from_secs(10 + i)));
    }
    assert_eq!(outcomes[0], NotifyOutcome::Sent);
    assert!(outcomes[1..]
        .iter()
        .all(|outcome| *outcome == NotifyOutcome::Suppressed));
    assert_eq!(sent.lock().unwrap().len(), 1);

    // Past the window the next motion frame dispatches again.
    let result = detector.classify(&intruder_frame())?;
    let t_after = t0 + Duration::from_secs(75);
    assert_eq!(notifier.on_detection(&result, t_after), NotifyOutcome::Sent);
    assert_eq!(sent.lock().unwrap().len(), 2);
    Ok(())
}

#[test]
fn quiet_frames_after_dispatch_leave_cooldown_untouched() -> Result<()> {
    let mut detector = MotionDetector::new(DetectorConfig {
        warmup_frames: 5,
        ..DetectorConfig::default()
    });
    let (mut notifier, sent) = notifier(60);
    let t0 = Instant::now();

    for _ in 0..10 {
        let result = detector.classify(&static_frame())?;
        notifier.on_detection(&result, t0);
    }
    let result = detector.classify(&intruder_frame())?;
    assert_eq!(notifier.on_detection(&result, t0), NotifyOutcome::Sent);

    // The scene goes quiet; absence of motion must not re-arm the machine.
    for i in 1..20 {
        let result = detector.classify(&static_frame())?;
        let outcome = notifier.on_detection(&result, t0 + Duration::from_secs(i));
        assert_eq!(outcome, NotifyOutcome::NoMotion);
    }
    assert_eq!(notifier.state(), CooldownState::Suppressed { since: t0 });
    assert_eq!(sent.lock().unwrap().len(), 1);
    Ok(())
}
