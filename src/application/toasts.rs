use crate::domain::models::{Toast, ToastKind};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

const DEFAULT_TTL: Duration = Duration::from_secs(5);

struct ToastEntry {
    toast: Toast,
    expiry: JoinHandle<()>,
}

#[derive(Default)]
struct ToastBoard {
    entries: HashMap<u64, ToastEntry>,
    order: Vec<u64>,
}

/// Ephemeral notification queue. Every toast dismisses itself after the TTL
/// unless removed manually first; each toast owns its own timer.
#[derive(Clone)]
pub struct ToastQueue {
    board: Arc<Mutex<ToastBoard>>,
    next_id: Arc<AtomicU64>,
    ttl: Duration,
}

impl ToastQueue {
    pub fn new(ttl: Duration) -> Self {
        Self {
            board: Arc::new(Mutex::new(ToastBoard::default())),
            next_id: Arc::new(AtomicU64::new(1)),
            ttl,
        }
    }

    pub fn push(&self, kind: ToastKind, title: impl Into<String>, message: Option<String>) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let toast = Toast {
            id,
            kind,
            title: title.into(),
            message,
        };

        let board = Arc::clone(&self.board);
        let ttl = self.ttl;
        let expiry = tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if let Ok(mut guard) = board.lock() {
                guard.entries.remove(&id);
                guard.order.retain(|candidate| *candidate != id);
            }
        });

        if let Ok(mut guard) = self.board.lock() {
            guard.order.push(id);
            guard.entries.insert(id, ToastEntry { toast, expiry });
        } else {
            expiry.abort();
        }
        id
    }

    pub fn dismiss(&self, id: u64) -> bool {
        let Ok(mut guard) = self.board.lock() else {
            return false;
        };
        let Some(entry) = guard.entries.remove(&id) else {
            return false;
        };
        guard.order.retain(|candidate| *candidate != id);
        entry.expiry.abort();
        true
    }

    /// Live toasts in insertion order.
    pub fn active(&self) -> Vec<Toast> {
        let Ok(guard) = self.board.lock() else {
            return Vec::new();
        };
        guard
            .order
            .iter()
            .filter_map(|id| guard.entries.get(id).map(|entry| entry.toast.clone()))
            .collect()
    }
}

impl Default for ToastQueue {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn push_and_list_keeps_insertion_order() {
        let queue = ToastQueue::new(Duration::from_secs(30));
        queue.push(ToastKind::Success, "Signed in", None);
        queue.push(ToastKind::Info, "Syncing", Some("dashboard".to_string()));

        let active = queue.active();
        assert_eq!(active.len(), 2);
        assert_eq!(active[0].title, "Signed in");
        assert_eq!(active[1].title, "Syncing");
    }

    #[tokio::test]
    async fn toasts_auto_dismiss_after_ttl() {
        let queue = ToastQueue::new(Duration::from_millis(20));
        queue.push(ToastKind::Error, "Request failed", None);
        assert_eq!(queue.active().len(), 1);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(queue.active().is_empty());
    }

    #[tokio::test]
    async fn manual_dismiss_cancels_the_timer() {
        let queue = ToastQueue::new(Duration::from_secs(30));
        let id = queue.push(ToastKind::Warning, "Plan expiring", None);

        assert!(queue.dismiss(id));
        assert!(queue.active().is_empty());
        assert!(!queue.dismiss(id));
    }

    #[tokio::test]
    async fn dismissing_one_toast_leaves_others_running() {
        let queue = ToastQueue::new(Duration::from_secs(30));
        let first = queue.push(ToastKind::Info, "First", None);
        queue.push(ToastKind::Info, "Second", None);

        queue.dismiss(first);
        let active = queue.active();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].title, "Second");
    }
}
