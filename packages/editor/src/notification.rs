//! User-visible notifications. The host drains the receiver and shows them as toasts.

use chrono::{DateTime, Utc};
use std::fmt;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{:?}] {}", self.level, self.message)
    }
}

/// Sending half of the notification channel. Sending never fails: with nobody
/// listening, notifications are dropped.
#[derive(Debug, Clone)]
pub struct Notifier {
    sender: UnboundedSender<Notification>,
}

pub fn notification_channel() -> (Notifier, UnboundedReceiver<Notification>) {
    let (sender, receiver) = unbounded_channel();
    (Notifier { sender }, receiver)
}

impl Notifier {
    /// A notifier whose notifications go nowhere.
    pub fn disconnected() -> Self {
        notification_channel().0
    }

    pub fn info(&self, message: impl Into<String>) {
        self.send(NotificationLevel::Info, message.into());
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.send(NotificationLevel::Warning, message.into());
    }

    pub fn error(&self, message: impl Into<String>) {
        self.send(NotificationLevel::Error, message.into());
    }

    fn send(&self, level: NotificationLevel, message: String) {
        let _ = self.sender.send(Notification {
            level,
            message,
            timestamp: Utc::now(),
        });
    }
}
