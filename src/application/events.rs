use tokio::sync::broadcast;

/// In-process pub/sub for cross-view refreshes. Fired on writes; any
/// listener reloads its own state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    SeedUpdated,
    SessionChanged,
    JobFinished { job_id: String },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<AppEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Delivers to current subscribers; publishing with nobody listening is
    /// not an error.
    pub fn publish(&self, event: AppEvent) -> usize {
        self.sender.send(event).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AppEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(32)
    }
}
