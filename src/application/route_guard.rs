use crate::application::session::AuthState;
use tokio::sync::watch;
use url::form_urlencoded;

pub const SIGN_IN_PATH: &str = "/auth";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Auth state is still resolving; render a placeholder, no redirect.
    Pending,
    Render,
    Redirect { to: String },
}

/// Wraps protected views. Defers entirely to the session manager's state
/// channel and re-evaluates on every call; nothing is cached here.
pub struct RouteGuard {
    states: watch::Receiver<AuthState>,
}

impl RouteGuard {
    pub fn new(states: watch::Receiver<AuthState>) -> Self {
        Self { states }
    }

    pub fn decide(&self, path: &str) -> GuardDecision {
        match &*self.states.borrow() {
            AuthState::Loading => GuardDecision::Pending,
            AuthState::Authenticated(_) => GuardDecision::Render,
            AuthState::Unauthenticated { .. } => GuardDecision::Redirect {
                to: sign_in_redirect(path),
            },
        }
    }

    /// Waits out the loading state, then decides. Returns the best-effort
    /// decision if the session manager goes away while waiting.
    pub async fn resolve(&mut self, path: &str) -> GuardDecision {
        loop {
            let decision = self.decide(path);
            if decision != GuardDecision::Pending {
                return decision;
            }
            if self.states.changed().await.is_err() {
                return self.decide(path);
            }
        }
    }
}

/// Sign-in route with the original path preserved as the return target.
pub fn sign_in_redirect(path: &str) -> String {
    let next: String = form_urlencoded::byte_serialize(path.as_bytes()).collect();
    format!("{SIGN_IN_PATH}?next={next}")
}
