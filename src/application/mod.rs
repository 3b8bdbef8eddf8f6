pub mod bootstrap;
pub mod commands;
pub mod events;
pub mod jobs;
pub mod mock_data;
pub mod oauth_callback;
pub mod route_guard;
pub mod session;
pub mod toasts;
pub mod trends;
