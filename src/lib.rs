pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::commands::{AppState, CommandOutcome};
pub use application::events::{AppEvent, EventBus};
pub use application::route_guard::{GuardDecision, RouteGuard};
pub use application::session::{AuthState, SessionManager, SignOutReason};
pub use application::toasts::ToastQueue;
pub use domain::models::{DailyEntry, SeedBundle, Session, Toast, ToastKind, UserProfile};
pub use infrastructure::error::InfraError;
