//! User-facing progress notifications (`post -> update -> dismiss`).

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tracing::{error, info};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Variant {
    #[default]
    Default,
    Destructive,
    Success,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotificationAction {
    ViewOnExplorer { url: String },
    Refresh,
}

impl NotificationAction {
    pub fn label(&self) -> &'static str {
        match self {
            NotificationAction::ViewOnExplorer { .. } => "View on explorer",
            NotificationAction::Refresh => "Refresh",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub description: String,
    pub variant: Variant,
    /// `None` keeps the notifier's default lifetime.
    pub duration: Option<Duration>,
    pub action: Option<NotificationAction>,
}

impl Notification {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            variant: Variant::Default,
            duration: None,
            action: None,
        }
    }

    pub fn failure(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            variant: Variant::Destructive,
            ..Self::new(title, description)
        }
    }

    pub fn success(description: impl Into<String>) -> Self {
        Self {
            variant: Variant::Success,
            ..Self::new("Success!", description)
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn with_action(mut self, action: NotificationAction) -> Self {
        self.action = Some(action);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotificationId(pub u64);

pub trait Notifier: Send + Sync {
    fn post(&self, notification: Notification) -> NotificationId;
    fn update(&self, id: NotificationId, notification: Notification);
    fn dismiss(&self, id: NotificationId);
}

/// Writes notifications to the tracing log.
#[derive(Debug, Default)]
pub struct LogNotifier {
    next: AtomicU64,
}

impl LogNotifier {
    fn log(id: NotificationId, n: &Notification) {
        let action = n.action.as_ref().map(|a| match a {
            NotificationAction::ViewOnExplorer { url } => format!("{}: {url}", a.label()),
            NotificationAction::Refresh => a.label().to_string(),
        });
        match n.variant {
            Variant::Destructive => {
                error!(id = id.0, title = %n.title, "{}", n.description)
            }
            _ => info!(id = id.0, title = %n.title, action = action.as_deref(), "{}", n.description),
        }
    }
}

impl Notifier for LogNotifier {
    fn post(&self, notification: Notification) -> NotificationId {
        let id = NotificationId(self.next.fetch_add(1, Ordering::Relaxed));
        Self::log(id, &notification);
        id
    }

    fn update(&self, id: NotificationId, notification: Notification) {
        Self::log(id, &notification);
    }

    fn dismiss(&self, _id: NotificationId) {}
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NotificationEvent {
    Posted(NotificationId, Notification),
    Updated(NotificationId, Notification),
    Dismissed(NotificationId),
}

/// Records every call; shows which notifications are still visible.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    events: Mutex<Vec<NotificationEvent>>,
    next: AtomicU64,
}

impl MemoryNotifier {
    fn lock(&self) -> MutexGuard<'_, Vec<NotificationEvent>> {
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.lock().clone()
    }

    /// Latest content of every notification that was not dismissed, in posting order.
    pub fn visible(&self) -> Vec<Notification> {
        let mut open: Vec<(NotificationId, Notification)> = Vec::new();
        for event in self.lock().iter() {
            match event {
                NotificationEvent::Posted(id, n) => open.push((*id, n.clone())),
                NotificationEvent::Updated(id, n) => {
                    if let Some(slot) = open.iter_mut().find(|(open_id, _)| open_id == id) {
                        slot.1 = n.clone();
                    }
                }
                NotificationEvent::Dismissed(id) => open.retain(|(open_id, _)| open_id != id),
            }
        }
        open.into_iter().map(|(_, n)| n).collect()
    }

    /// Every notification ever shown with the destructive variant.
    pub fn failures(&self) -> Vec<Notification> {
        self.lock()
            .iter()
            .filter_map(|e| match e {
                NotificationEvent::Posted(_, n) | NotificationEvent::Updated(_, n)
                    if n.variant == Variant::Destructive =>
                {
                    Some(n.clone())
                }
                _ => None,
            })
            .collect()
    }
}

impl Notifier for MemoryNotifier {
    fn post(&self, notification: Notification) -> NotificationId {
        let id = NotificationId(self.next.fetch_add(1, Ordering::Relaxed));
        self.lock().push(NotificationEvent::Posted(id, notification));
        id
    }

    fn update(&self, id: NotificationId, notification: Notification) {
        self.lock().push(NotificationEvent::Updated(id, notification));
    }

    fn dismiss(&self, id: NotificationId) {
        self.lock().push(NotificationEvent::Dismissed(id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_notifier_tracks_visibility() {
        let notifier = MemoryNotifier::default();
        let progress = notifier.post(Notification::new("Working", "step 1"));
        notifier.update(progress, Notification::new("Working", "step 2"));
        assert_eq!(notifier.visible()[0].description, "step 2");

        notifier.dismiss(progress);
        notifier.post(Notification::failure("Failed", "boom"));
        let visible = notifier.visible();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].variant, Variant::Destructive);
        assert_eq!(notifier.failures().len(), 1);
    }

    #[test]
    fn success_notifications_are_titled() {
        let n = Notification::success("done").with_action(NotificationAction::Refresh);
        assert_eq!(n.title, "Success!");
        assert_eq!(n.action.as_ref().map(NotificationAction::label), Some("Refresh"));
    }
}
