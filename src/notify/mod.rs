//! Notification policy: the cooldown state machine and the mail boundary.
//!
//! The `Notifier` decides, per detection result, whether a notification is
//! actually dispatched. It is a two-state machine (`Idle` / `Suppressed`) with
//! one input (the detection result) and one clock (`now`, supplied by the
//! caller so the decision stays a pure function of time).
//!
//! Every dispatch attempt counts for cooldown purposes, including transport
//! failures and the email-channel-off no-op. A failed send retrying on the very
//! next frame would spam the transport; the cooldown applies to attempts.
//!
//! Nothing is queued: at most one notification is in flight, synchronously.

mod smtp;

pub use smtp::SmtpMailer;

use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::Local;

use crate::detect::DetectionResult;

/// Addressing and formatting for outgoing alerts.
#[derive(Clone, Debug)]
pub struct AlertSettings {
    pub from: String,
    pub to: String,
    /// Identifies the camera in the alert body (e.g. "camera 0").
    pub camera_label: String,
    pub jpeg_quality: u8,
}

/// A fully rendered alert, ready for the transport.
#[derive(Clone, Debug)]
pub struct MotionAlert {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment: Option<AlertAttachment>,
}

#[derive(Clone, Debug)]
pub struct AlertAttachment {
    pub filename: String,
    pub jpeg: Vec<u8>,
}

/// Boundary to the mail system. Synchronous from the notifier's point of view.
pub trait MailTransport: Send {
    fn send(&mut self, alert: &MotionAlert) -> Result<()>;
}

/// Cooldown machine state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CooldownState {
    Idle,
    /// A dispatch was attempted at `since`; further attempts are suppressed
    /// until the cooldown window has elapsed.
    Suppressed { since: Instant },
}

/// What the notifier did with one detection result.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// No motion in this cycle; no state transition either way.
    NoMotion,
    /// Notifications are globally disabled.
    Disabled,
    /// Inside the cooldown window; nothing dispatched.
    Suppressed,
    /// Transport accepted the alert.
    Sent,
    /// Transport failed; logged, still counts as an attempt.
    SendFailed,
    /// Email channel disabled; no-op attempt, cooldown still armed.
    ChannelOff,
}

#[derive(Clone, Copy, Debug)]
pub struct NotifyConfig {
    pub notification_enabled: bool,
    pub email_enabled: bool,
    pub cooldown: Duration,
}

pub struct Notifier {
    config: NotifyConfig,
    alert: AlertSettings,
    state: CooldownState,
    transport: Box<dyn MailTransport>,
}

impl Notifier {
    pub fn new(
        config: NotifyConfig,
        alert: AlertSettings,
        transport: Box<dyn MailTransport>,
    ) -> Self {
        Self {
            config,
            alert,
            state: CooldownState::Idle,
            transport,
        }
    }

    pub fn state(&self) -> CooldownState {
        self.state
    }

    /// Feed one detection result through the state machine.
    ///
    /// `now` is sampled by the caller once per cycle. Absence of motion never
    /// resets the cooldown; it is purely time-based.
    pub fn on_detection(&mut self, result: &DetectionResult, now: Instant) -> NotifyOutcome {
        if !result.is_motion {
            return NotifyOutcome::NoMotion;
        }
        if !self.config.notification_enabled {
            return NotifyOutcome::Disabled;
        }
        if let CooldownState::Suppressed { since } = self.state {
            if now.duration_since(since) < self.config.cooldown {
                return NotifyOutcome::Suppressed;
            }
            // Window elapsed: re-arm and fire in the same cycle.
        }

        self.state = CooldownState::Suppressed { since: now };
        self.dispatch(result)
    }

    fn dispatch(&mut self, result: &DetectionResult) -> NotifyOutcome {
        if !self.config.email_enabled {
            log::debug!("email channel disabled; motion attempt recorded without dispatch");
            return NotifyOutcome::ChannelOff;
        }

        let alert = self.render_alert(result);
        match self.transport.send(&alert) {
            Ok(()) => {
                log::info!("motion notification sent to {}", alert.to);
                NotifyOutcome::Sent
            }
            Err(e) => {
                log::error!("motion notification failed: {:#}", e);
                NotifyOutcome::SendFailed
            }
        }
    }

    fn render_alert(&self, result: &DetectionResult) -> MotionAlert {
        let now = Local::now();
        let stamp = now.format("%Y-%m-%d %H:%M:%S");
        let body = format!(
            "Motion has been detected by your security camera!\n\n\
             Time: {}\n\
             Camera: {}\n\
             Regions: {}\n\n\
             Please check your camera feed for details.\n",
            stamp,
            self.alert.camera_label,
            result.regions.len(),
        );

        // Attach the annotated snapshot; the detector only ever saw the clone's
        // pristine original. Encoding failure downgrades to a text-only mail.
        let mut snapshot = result.snapshot.clone();
        snapshot.annotate_regions(&result.regions);
        let attachment = match snapshot.encode_jpeg(self.alert.jpeg_quality) {
            Ok(jpeg) => Some(AlertAttachment {
                filename: format!("motion_{}.jpg", now.format("%Y%m%d_%H%M%S")),
                jpeg,
            }),
            Err(e) => {
                log::warn!("could not encode snapshot for email: {:#}", e);
                None
            }
        };

        MotionAlert {
            from: self.alert.from.clone(),
            to: self.alert.to.clone(),
            subject: format!("Motion Detected - {}", stamp),
            body,
            attachment,
        }
    }
}
