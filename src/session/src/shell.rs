//! Application shell seams
//!
//! The store never renders or routes itself. It tells a [`Navigator`] to
//! reset the application to a route and hands user-facing messages to a
//! [`Notifier`].

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Severity of a user-facing notice
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Destructive,
}

/// User-facing notice
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub level: NoticeLevel,
}

impl Notice {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            level: NoticeLevel::Info,
        }
    }

    pub fn destructive(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            level: NoticeLevel::Destructive,
        }
    }
}

/// Full application reset
///
/// `hard_navigate` discards every piece of in-memory state and reloads the
/// application at `route`. The caller never touches its own state again
/// afterwards.
pub trait Navigator: Send + Sync {
    fn hard_navigate(&self, route: &str);
}

/// Sink for user-facing notices
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Navigator and notifier that record what they were asked to do
#[derive(Debug, Clone, Default)]
pub struct RecordingShell {
    navigations: Arc<Mutex<Vec<String>>>,
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Routes passed to `hard_navigate`, in call order
    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().clone()
    }

    pub fn navigation_count(&self) -> usize {
        self.navigations.lock().len()
    }

    /// Notices shown, in call order
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    /// Titles of the notices shown
    pub fn notice_titles(&self) -> Vec<String> {
        self.notices.lock().iter().map(|n| n.title.clone()).collect()
    }
}

impl Navigator for RecordingShell {
    fn hard_navigate(&self, route: &str) {
        self.navigations.lock().push(route.to_string());
    }
}

impl Notifier for RecordingShell {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_records() {
        let shell = RecordingShell::new();
        let navigator: Arc<dyn Navigator> = Arc::new(shell.clone());
        let notifier: Arc<dyn Notifier> = Arc::new(shell.clone());

        navigator.hard_navigate("/login");
        notifier.notify(Notice::destructive("Session expired", "Please sign in again"));

        assert_eq!(shell.navigations(), vec!["/login".to_string()]);
        assert_eq!(shell.notice_titles(), vec!["Session expired".to_string()]);
        assert_eq!(shell.notices()[0].level, NoticeLevel::Destructive);
    }
}
