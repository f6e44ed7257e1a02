use std::collections::VecDeque;
use std::time::{Duration, Instant};

const TOAST_DURATION: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
    /// `None` for alerts, which stay until acknowledged
    pub expires_at: Option<Instant>,
}

impl Notification {
    pub fn toast(message: impl Into<String>, level: NotificationLevel, ttl: Duration) -> Self {
        Self {
            message: message.into(),
            level,
            expires_at: Some(Instant::now() + ttl),
        }
    }

    pub fn alert(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            level: NotificationLevel::Error,
            expires_at: None,
        }
    }

    pub fn is_blocking(&self) -> bool {
        self.expires_at.is_none()
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// Short-lived toasts plus a queue of blocking alerts.
///
/// Alerts are shown oldest first and only leave the queue through
/// `acknowledge`.
#[derive(Debug)]
pub struct NotificationManager {
    toasts: Vec<Notification>,
    alerts: VecDeque<Notification>,
    toast_duration: Duration,
}

impl Default for NotificationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationManager {
    pub fn new() -> Self {
        Self::with_toast_duration(TOAST_DURATION)
    }

    pub fn with_toast_duration(toast_duration: Duration) -> Self {
        Self {
            toasts: Vec::new(),
            alerts: VecDeque::new(),
            toast_duration,
        }
    }

    fn toast(&mut self, message: impl Into<String>, level: NotificationLevel) {
        let toast = Notification::toast(message, level, self.toast_duration);
        self.toasts.insert(0, toast);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.toast(message, NotificationLevel::Info);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.toast(message, NotificationLevel::Success);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.toast(message, NotificationLevel::Warning);
    }

    /// Queue a blocking error alert
    pub fn error(&mut self, message: impl Into<String>) {
        self.alerts.push_back(Notification::alert(message));
    }

    /// Drop expired toasts, returns true if any were removed
    pub fn update(&mut self) -> bool {
        let before = self.toasts.len();
        self.toasts.retain(|toast| !toast.is_expired());
        self.toasts.len() != before
    }

    /// What the UI should show now: a pending alert wins over toasts
    pub fn current(&self) -> Option<&Notification> {
        self.alerts.front().or_else(|| self.toasts.first())
    }

    pub fn pending_alert(&self) -> Option<&Notification> {
        self.alerts.front()
    }

    /// Dismiss the oldest alert
    pub fn acknowledge(&mut self) -> Option<Notification> {
        self.alerts.pop_front()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    #[test]
    fn toasts_expire() {
        let toast = Notification::toast("Copied", NotificationLevel::Info, Duration::from_millis(50));
        assert!(!toast.is_expired());

        thread::sleep(Duration::from_millis(60));
        assert!(toast.is_expired());
    }

    #[test]
    fn alerts_survive_updates() {
        let mut manager = NotificationManager::with_toast_duration(Duration::from_millis(10));

        manager.error("Failed to load document");
        manager.info("Copied");
        thread::sleep(Duration::from_millis(20));
        assert!(manager.update());

        let alert = manager.current().unwrap();
        assert!(alert.is_blocking());
        assert_eq!(alert.message, "Failed to load document");
    }

    #[test]
    fn alerts_take_precedence_and_queue_in_order() {
        let mut manager = NotificationManager::new();

        manager.success("Uploaded");
        manager.error("first");
        manager.error("second");

        assert_eq!(manager.current().unwrap().message, "first");
        assert_eq!(manager.acknowledge().unwrap().message, "first");
        assert_eq!(manager.current().unwrap().message, "second");
        manager.acknowledge();

        let current = manager.current().unwrap();
        assert_eq!(current.message, "Uploaded");
        assert_eq!(current.level, NotificationLevel::Success);
        assert!(manager.acknowledge().is_none());
    }

    #[test]
    fn newest_toast_first() {
        let mut manager = NotificationManager::new();

        manager.info("First");
        manager.warn("Second");

        assert_eq!(manager.current().unwrap().message, "Second");
        assert_eq!(manager.current().unwrap().level, NotificationLevel::Warning);
    }
}
