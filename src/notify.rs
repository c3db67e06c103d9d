use alloy::primitives::Address;
use chrono::{
    DateTime,
    Duration,
    Utc,
};
use std::collections::VecDeque;

pub const DEFAULT_TOAST_LIFETIME_SECS: i64 = 6;
const MAX_TOASTS: usize = 4;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum NotificationKind {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
            created_at: Utc::now(),
        }
    }

    pub fn transaction_complete() -> Self {
        Self::new(
            NotificationKind::Info,
            "Transaction Notification",
            "Transaction Complete",
        )
    }

    pub fn winner_picked(winner: Address) -> Self {
        Self::new(
            NotificationKind::Success,
            "Winner Picked",
            format!("{winner} won the raffle"),
        )
    }
}

/// Fire-and-forget notification consumer.
pub trait NotificationSink {
    fn dispatch(&mut self, notification: Notification);
}

/// Toasts shown in the top-right corner until they expire.
#[derive(Debug)]
pub struct Toasts {
    items: VecDeque<Notification>,
    lifetime: Duration,
}

impl Default for Toasts {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_TOAST_LIFETIME_SECS))
    }
}

impl Toasts {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            items: VecDeque::new(),
            lifetime,
        }
    }

    /// Newest first.
    pub fn visible(&self) -> impl Iterator<Item = &Notification> {
        self.items.iter().rev()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Drop expired toasts; returns whether anything was removed.
    pub fn prune(&mut self, now: DateTime<Utc>) -> bool {
        let before = self.items.len();
        let lifetime = self.lifetime;
        self.items
            .retain(|toast| now.signed_duration_since(toast.created_at) < lifetime);
        before != self.items.len()
    }
}

impl NotificationSink for Toasts {
    fn dispatch(&mut self, notification: Notification) {
        tracing::info!(
            title = %notification.title,
            message = %notification.message,
            "notification"
        );
        self.items.push_back(notification);
        while self.items.len() > MAX_TOASTS {
            self.items.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn transaction_complete__matches_entry_notification_text() {
        let n = Notification::transaction_complete();

        assert_eq!(n.kind, NotificationKind::Info);
        assert_eq!(n.title, "Transaction Notification");
        assert_eq!(n.message, "Transaction Complete");
    }

    #[test]
    fn prune__removes_expired_toasts_only() {
        // given
        let mut toasts = Toasts::new(Duration::seconds(5));
        let mut old = Notification::transaction_complete();
        old.created_at = Utc::now() - Duration::seconds(10);
        toasts.dispatch(old);
        toasts.dispatch(Notification::transaction_complete());

        // when
        let changed = toasts.prune(Utc::now());

        // then
        assert!(changed);
        assert_eq!(toasts.len(), 1);
    }

    #[test]
    fn dispatch__keeps_newest_toasts_when_full() {
        let mut toasts = Toasts::default();
        for i in 0..(MAX_TOASTS + 2) {
            toasts.dispatch(Notification::new(
                NotificationKind::Info,
                "n",
                i.to_string(),
            ));
        }

        assert_eq!(toasts.len(), MAX_TOASTS);
        assert_eq!(
            toasts.visible().next().map(|n| n.message.as_str()),
            Some("5")
        );
    }
}
