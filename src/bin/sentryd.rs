//! sentryd - camera motion detection daemon
//!
//! This daemon:
//! 1. Loads and validates configuration (fatal on error)
//! 2. Opens the configured camera (fatal on error)
//! 3. Classifies each frame against a running background model
//! 4. Feeds detections through the cooldown state machine
//! 5. Dispatches rate-limited email notifications with a snapshot attached
//!
//! Frame-read and mail-transport failures are absorbed and logged; only
//! startup-time config/device errors terminate the process.

use anyhow::{anyhow, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use motion_sentry::{
    AlertSettings, CameraSource, DetectorConfig, MailTransport, MotionAlert, MotionDetector,
    Notifier, NotifyConfig, SentryConfig, SmtpMailer, StatusLine, MAX_CONSECUTIVE_READ_FAILURES,
};

#[derive(Debug, Parser)]
#[command(name = "sentryd", about = "Camera motion detection with email alerts")]
struct Args {
    /// Path to a JSON config file (also read from SENTRY_CONFIG).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Camera device override, e.g. /dev/video1 or stub://demo.
    #[arg(long)]
    camera: Option<String>,

    /// Stop after this many frames (0 = run until interrupted).
    #[arg(long, default_value_t = 0)]
    max_frames: u64,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    if let Some(path) = &args.config {
        std::env::set_var("SENTRY_CONFIG", path);
    }
    if let Some(camera) = &args.camera {
        std::env::set_var("SENTRY_CAMERA", camera);
    }

    let cfg = SentryConfig::load()?;

    let transport: Box<dyn MailTransport> = if cfg.notify.enabled && cfg.email.enabled {
        Box::new(SmtpMailer::new(
            &cfg.email.smtp_server,
            cfg.email.smtp_port,
            &cfg.email.from,
            &cfg.email.password,
        )?)
    } else {
        Box::new(NullTransport)
    };

    let mut notifier = Notifier::new(
        NotifyConfig {
            notification_enabled: cfg.notify.enabled,
            email_enabled: cfg.email.enabled,
            cooldown: cfg.notify.cooldown,
        },
        AlertSettings {
            from: cfg.email.from.clone(),
            to: cfg.email.to.clone(),
            camera_label: format!("camera {}", cfg.camera.index),
            jpeg_quality: 85,
        },
        transport,
    );

    let mut detector = MotionDetector::new(DetectorConfig {
        min_contour_area: cfg.detector.min_contour_area,
        warmup_frames: cfg.detector.warmup_frames,
        ..DetectorConfig::default()
    });

    let mut source = CameraSource::new(&cfg.camera)?;
    source.connect()?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))?;
    }

    log::info!(
        "sentryd running. device={} min_contour_area={} cooldown={}s notifications={} email={}",
        cfg.camera.device_node(),
        cfg.detector.min_contour_area,
        cfg.notify.cooldown.as_secs(),
        cfg.notify.enabled,
        cfg.email.enabled
    );

    let frame_interval = cfg.camera.frame_interval();
    let mut status = StatusLine::new();
    let mut consecutive_failures = 0u32;
    let mut processed = 0u64;
    let mut last_health_log = Instant::now();

    // Cooperative shutdown: the flag is checked once per iteration, so the
    // current frame (including any dispatch) always completes.
    while !stop.load(Ordering::SeqCst) {
        if args.max_frames > 0 && processed >= args.max_frames {
            break;
        }

        let frame = match source.next_frame() {
            Ok(frame) => {
                consecutive_failures = 0;
                frame
            }
            Err(e) => {
                consecutive_failures += 1;
                log::warn!(
                    "failed to read frame ({}/{}): {:#}",
                    consecutive_failures,
                    MAX_CONSECUTIVE_READ_FAILURES,
                    e
                );
                if consecutive_failures >= MAX_CONSECUTIVE_READ_FAILURES {
                    return Err(anyhow!(
                        "camera produced {} consecutive read failures, giving up",
                        consecutive_failures
                    ));
                }
                std::thread::sleep(frame_interval);
                continue;
            }
        };
        processed += 1;

        // A corrupt frame is skipped, never fatal.
        let result = match detector.classify(&frame) {
            Ok(result) => result,
            Err(e) => {
                log::warn!("skipping unreadable frame: {:#}", e);
                continue;
            }
        };

        status.update(&result);
        notifier.on_detection(&result, Instant::now());

        if last_health_log.elapsed() >= Duration::from_secs(5) {
            let stats = source.stats();
            log::debug!(
                "camera health={} frames={} device={} status={}",
                source.is_healthy(),
                stats.frames_captured,
                stats.device,
                status.text()
            );
            last_health_log = Instant::now();
        }

        std::thread::sleep(frame_interval);
    }

    log::info!("sentryd stopped after {} frames", processed);
    Ok(())
}

/// Stand-in transport when the email channel is disabled. The notifier never
/// reaches it, but the wiring stays uniform.
struct NullTransport;

impl MailTransport for NullTransport {
    fn send(&mut self, alert: &MotionAlert) -> Result<()> {
        log::debug!("mail transport disabled; dropping alert {:?}", alert.subject);
        Ok(())
    }
}
