//! Transient status banners. A banner is visible until its duration elapses.

use std::time::{Duration, Instant};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StatusKind {
    Success,
    Warning,
    Error,
}

impl std::fmt::Display for StatusKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusKind::Success => write!(f, "ok"),
            StatusKind::Warning => write!(f, "aviso"),
            StatusKind::Error => write!(f, "erro"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusBanner {
    pub message: String,
    pub kind: StatusKind,
    raised_at: Instant,
}

/// Holds at most one banner; a new one replaces the old.
#[derive(Clone, Debug)]
pub struct StatusBoard {
    duration: Duration,
    current: Option<StatusBanner>,
}

impl StatusBoard {
    pub fn new(duration: Duration) -> Self {
        Self { duration, current: None }
    }

    pub fn show(&mut self, message: impl Into<String>, kind: StatusKind) {
        self.show_at(message, kind, Instant::now());
    }

    pub fn show_at(&mut self, message: impl Into<String>, kind: StatusKind, now: Instant) {
        let message = message.into();
        match kind {
            StatusKind::Error => tracing::warn!(%message, "status"),
            _ => tracing::info!(%message, "status"),
        }
        self.current = Some(StatusBanner {
            message,
            kind,
            raised_at: now,
        });
    }

    pub fn visible(&self) -> Option<&StatusBanner> {
        self.visible_at(Instant::now())
    }

    pub fn visible_at(&self, now: Instant) -> Option<&StatusBanner> {
        self.current
            .as_ref()
            .filter(|b| now.saturating_duration_since(b.raised_at) < self.duration)
    }

    /// Last banner regardless of expiry.
    pub fn last(&self) -> Option<&StatusBanner> {
        self.current.as_ref()
    }
}
