//! Startup configuration.
//!
//! Settings come from an optional JSON config file (path in `SENTRY_CONFIG`)
//! with environment-variable overrides on top, then one validation pass.
//! Everything is read once at startup; nothing hot-reloads.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

const DEFAULT_CAMERA_INDEX: u32 = 0;
const DEFAULT_CAMERA_WIDTH: u32 = 640;
const DEFAULT_CAMERA_HEIGHT: u32 = 480;
const DEFAULT_CAMERA_FPS: u32 = 30;
const DEFAULT_MIN_CONTOUR_AREA: u32 = 500;
const DEFAULT_WARMUP_FRAMES: u32 = 30;
const DEFAULT_COOLDOWN_SECS: u64 = 60;
const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 587;

/// Largest accepted capture dimension. Keeps pixel-offset arithmetic well
/// inside u32 range and rejects obviously wrong config values.
pub const MAX_CAMERA_DIMENSION: u32 = 8_192;

#[derive(Debug, Deserialize, Default)]
struct SentryConfigFile {
    camera: Option<CameraConfigFile>,
    detector: Option<DetectorConfigFile>,
    notify: Option<NotifyConfigFile>,
    email: Option<EmailConfigFile>,
}

#[derive(Debug, Deserialize, Default)]
struct CameraConfigFile {
    index: Option<u32>,
    device: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    target_fps: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct DetectorConfigFile {
    min_contour_area: Option<u32>,
    warmup_frames: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct NotifyConfigFile {
    enabled: Option<bool>,
    cooldown_seconds: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct EmailConfigFile {
    enabled: Option<bool>,
    smtp_server: Option<String>,
    smtp_port: Option<u16>,
    from: Option<String>,
    to: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Clone)]
pub struct SentryConfig {
    pub camera: CameraSettings,
    pub detector: DetectorSettings,
    pub notify: NotifySettings,
    pub email: EmailSettings,
}

#[derive(Debug, Clone)]
pub struct CameraSettings {
    pub index: u32,
    /// Explicit device override; `stub://` selects the synthetic source.
    pub device: Option<String>,
    pub width: u32,
    pub height: u32,
    pub target_fps: u32,
}

impl CameraSettings {
    /// Device node for the capture layer, derived from the index unless an
    /// explicit override was set.
    pub fn device_node(&self) -> String {
        self.device
            .clone()
            .unwrap_or_else(|| format!("/dev/video{}", self.index))
    }

    /// Nominal delay between frames at the configured rate.
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(1_000 / u64::from(self.target_fps.max(1)))
    }
}

#[derive(Debug, Clone)]
pub struct DetectorSettings {
    pub min_contour_area: u32,
    pub warmup_frames: u32,
}

#[derive(Debug, Clone)]
pub struct NotifySettings {
    pub enabled: bool,
    pub cooldown: Duration,
}

#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub enabled: bool,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub from: String,
    pub to: String,
    pub password: String,
}

impl SentryConfig {
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("SENTRY_CONFIG").ok();
        let file_cfg = match config_path.as_deref() {
            Some(path) => Some(read_config_file(Path::new(path))?),
            None => None,
        };
        let mut cfg = Self::from_file(file_cfg.unwrap_or_default());
        cfg.apply_env()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn from_file(file: SentryConfigFile) -> Self {
        let camera = CameraSettings {
            index: file
                .camera
                .as_ref()
                .and_then(|camera| camera.index)
                .unwrap_or(DEFAULT_CAMERA_INDEX),
            device: file.camera.as_ref().and_then(|camera| camera.device.clone()),
            width: file
                .camera
                .as_ref()
                .and_then(|camera| camera.width)
                .unwrap_or(DEFAULT_CAMERA_WIDTH),
            height: file
                .camera
                .as_ref()
                .and_then(|camera| camera.height)
                .unwrap_or(DEFAULT_CAMERA_HEIGHT),
            target_fps: file
                .camera
                .and_then(|camera| camera.target_fps)
                .unwrap_or(DEFAULT_CAMERA_FPS),
        };
        let detector = DetectorSettings {
            min_contour_area: file
                .detector
                .as_ref()
                .and_then(|detector| detector.min_contour_area)
                .unwrap_or(DEFAULT_MIN_CONTOUR_AREA),
            warmup_frames: file
                .detector
                .and_then(|detector| detector.warmup_frames)
                .unwrap_or(DEFAULT_WARMUP_FRAMES),
        };
        let notify = NotifySettings {
            enabled: file
                .notify
                .as_ref()
                .and_then(|notify| notify.enabled)
                .unwrap_or(true),
            cooldown: Duration::from_secs(
                file.notify
                    .and_then(|notify| notify.cooldown_seconds)
                    .unwrap_or(DEFAULT_COOLDOWN_SECS),
            ),
        };
        let email = EmailSettings {
            enabled: file
                .email
                .as_ref()
                .and_then(|email| email.enabled)
                .unwrap_or(true),
            smtp_server: file
                .email
                .as_ref()
                .and_then(|email| email.smtp_server.clone())
                .unwrap_or_else(|| DEFAULT_SMTP_SERVER.to_string()),
            smtp_port: file
                .email
                .as_ref()
                .and_then(|email| email.smtp_port)
                .unwrap_or(DEFAULT_SMTP_PORT),
            from: file
                .email
                .as_ref()
                .and_then(|email| email.from.clone())
                .unwrap_or_default(),
            to: file
                .email
                .as_ref()
                .and_then(|email| email.to.clone())
                .unwrap_or_default(),
            password: file
                .email
                .and_then(|email| email.password)
                .unwrap_or_default(),
        };
        Self {
            camera,
            detector,
            notify,
            email,
        }
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(index) = env_parse::<u32>("CAMERA_INDEX")? {
            self.camera.index = index;
        }
        if let Ok(device) = std::env::var("SENTRY_CAMERA") {
            if !device.trim().is_empty() {
                self.camera.device = Some(device);
            }
        }
        if let Some(area) = env_parse::<u32>("MIN_CONTOUR_AREA")? {
            self.detector.min_contour_area = area;
        }
        if let Some(frames) = env_parse::<u32>("SENTRY_WARMUP_FRAMES")? {
            self.detector.warmup_frames = frames;
        }
        if let Some(enabled) = env_bool("NOTIFICATION_ENABLED")? {
            self.notify.enabled = enabled;
        }
        if let Some(secs) = env_parse::<u64>("NOTIFICATION_COOLDOWN_SECONDS")? {
            self.notify.cooldown = Duration::from_secs(secs);
        }
        if let Some(enabled) = env_bool("EMAIL_ENABLED")? {
            self.email.enabled = enabled;
        }
        if let Ok(server) = std::env::var("SMTP_SERVER") {
            if !server.trim().is_empty() {
                self.email.smtp_server = server;
            }
        }
        if let Some(port) = env_parse::<u16>("SMTP_PORT")? {
            self.email.smtp_port = port;
        }
        if let Ok(from) = std::env::var("EMAIL_FROM") {
            if !from.trim().is_empty() {
                self.email.from = from;
            }
        }
        if let Ok(to) = std::env::var("EMAIL_TO") {
            if !to.trim().is_empty() {
                self.email.to = to;
            }
        }
        if let Ok(password) = std::env::var("EMAIL_PASSWORD") {
            if !password.is_empty() {
                self.email.password = password;
            }
        }
        Ok(())
    }

    /// Collect every configuration problem into one startup error.
    fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();
        if self.camera.width == 0 || self.camera.height == 0 {
            errors.push("camera width/height must be greater than zero".to_string());
        } else if self.camera.width > MAX_CAMERA_DIMENSION
            || self.camera.height > MAX_CAMERA_DIMENSION
        {
            errors.push(format!(
                "camera width/height must not exceed {}",
                MAX_CAMERA_DIMENSION
            ));
        }
        if self.camera.target_fps == 0 {
            errors.push("camera target_fps must be greater than zero".to_string());
        }
        if self.notify.enabled && self.email.enabled {
            if self.email.from.is_empty() {
                errors.push("EMAIL_FROM is required when email notifications are enabled".into());
            }
            if self.email.to.is_empty() {
                errors.push("EMAIL_TO is required when email notifications are enabled".into());
            }
            if self.email.password.is_empty() {
                errors
                    .push("EMAIL_PASSWORD is required when email notifications are enabled".into());
            }
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("configuration errors:\n  - {}", errors.join("\n  - ")))
        }
    }
}

fn read_config_file(path: &Path) -> Result<SentryConfigFile> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("failed to read config file {}: {}", path.display(), e))?;
    let cfg = serde_json::from_str(&raw)
        .map_err(|e| anyhow!("invalid config file {}: {}", path.display(), e))?;
    Ok(cfg)
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Result<Option<T>> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| anyhow!("{} must be a valid {}", key, std::any::type_name::<T>())),
        _ => Ok(None),
    }
}

fn env_bool(key: &str) -> Result<Option<bool>> {
    match std::env::var(key) {
        Ok(value) if !value.trim().is_empty() => match value.trim().to_lowercase().as_str() {
            "true" | "1" => Ok(Some(true)),
            "false" | "0" => Ok(Some(false)),
            other => Err(anyhow!("{} must be true or false, got {:?}", key, other)),
        },
        _ => Ok(None),
    }
}
