use crate::application::bootstrap::bootstrap_workspace;
use crate::application::events::{AppEvent, EventBus};
use crate::application::jobs::{GenerationService, PollHandle};
use crate::application::mock_data::{self, SeedService};
use crate::application::oauth_callback::{CallbackHandler, CallbackOutcome};
use crate::application::route_guard::{GuardDecision, RouteGuard};
use crate::application::session::SessionManager;
use crate::application::toasts::ToastQueue;
use crate::application::trends::{
    DEFAULT_LOOKBACK, DEFAULT_WINDOW, TrendMetric, metric_series, moving_average, naive_forecast,
};
use crate::domain::models::{JobState, SeedBundle, Toast, ToastKind, UserProfile};
use crate::infrastructure::backend_client::{
    ActivityItem, AuthApi, ContactMessage, ContentApi, DashboardStats, GenerationRequest, JobStatus,
    Plan, ProfileUpdate, RegistrationRequest, ReqwestBackendClient, SubscriptionHistoryItem,
    SubscriptionInfo,
};
use crate::infrastructure::config::{ApiConfig, load_api_config_from_env, read_preview_defaults, read_timezone};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::local_store::{LocalStore, SqliteLocalStore, keys};
use crate::infrastructure::session_store::KeyringSessionStore;
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

const MAX_PREVIEW_DAYS: u32 = 366;
const DEFAULT_FORECAST_DAYS: usize = 7;

/// Uniform result shape handed to the UI shell: failures are reported, never
/// thrown, so calling code stays straightforward.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommandOutcome<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<BTreeMap<String, String>>,
}

impl<T> CommandOutcome<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
        }
    }

    pub fn accepted(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
            errors: None,
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            errors: None,
        }
    }

    pub fn fail_with_errors(
        message: impl Into<String>,
        errors: BTreeMap<String, String>,
    ) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message.into()),
            errors: Some(errors),
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GuardResponse {
    pub action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrendSummary {
    pub metric: TrendMetric,
    pub values: Vec<f64>,
    pub moving_average: Vec<f64>,
    pub naive_forecast: Vec<f64>,
}

pub struct AppState {
    config_dir: PathBuf,
    database_path: PathBuf,
    logs_dir: PathBuf,
    api_config: ApiConfig,
    local_store: Arc<SqliteLocalStore>,
    events: EventBus,
    toasts: ToastQueue,
    session: Arc<SessionManager<KeyringSessionStore, ReqwestBackendClient>>,
    backend: Arc<ReqwestBackendClient>,
    callback: CallbackHandler<KeyringSessionStore, ReqwestBackendClient>,
    active_poll: Mutex<Option<PollHandle>>,
    log_guard: Mutex<()>,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let config_dir = workspace_root.join("config");
        let logs_dir = workspace_root.join("logs");

        let api_config = load_api_config_from_env();
        let backend = Arc::new(ReqwestBackendClient::new(api_config.base_url.clone()));
        let session = Arc::new(SessionManager::new(
            Arc::new(KeyringSessionStore::default()),
            Arc::clone(&backend),
            api_config.clone(),
        ));
        let callback = CallbackHandler::new(Arc::clone(&session));

        Ok(Self {
            config_dir,
            database_path: bootstrap.database_path.clone(),
            logs_dir,
            api_config,
            local_store: Arc::new(SqliteLocalStore::new(&bootstrap.database_path)),
            events: EventBus::default(),
            toasts: ToastQueue::default(),
            session,
            backend,
            callback,
            active_poll: Mutex::new(None),
            log_guard: Mutex::new(()),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn api_config(&self) -> &ApiConfig {
        &self.api_config
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn toasts(&self) -> &ToastQueue {
        &self.toasts
    }

    pub fn session(&self) -> &SessionManager<KeyringSessionStore, ReqwestBackendClient> {
        &self.session
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }

    /// Converts an error into the uniform failure shape, surfaces it as an
    /// error toast, and forces logout when the backend said 401.
    fn report_failure<T>(&self, command: &str, title: &str, error: InfraError) -> CommandOutcome<T> {
        if error.is_unauthorized() {
            let _ = self.session.mark_unauthorized();
        }
        let message = error.to_string();
        self.log_error(command, &message);
        self.toasts
            .push(ToastKind::Error, title, Some(message.clone()));
        CommandOutcome::fail(message)
    }

    fn require_access_token(&self) -> Result<String, InfraError> {
        self.session.access_token()?.ok_or(InfraError::Unauthorized)
    }

    fn seed_service(&self) -> SeedService<SqliteLocalStore> {
        SeedService::new(Arc::clone(&self.local_store), self.events.clone())
    }

    fn generation_service(&self) -> GenerationService<ReqwestBackendClient, SqliteLocalStore> {
        GenerationService::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.local_store),
            self.events.clone(),
        )
    }
}

pub async fn restore_session_impl(state: &AppState) -> CommandOutcome<()> {
    match state.session.restore().await {
        Ok(()) => {
            state.log_info("restore_session", "restored persisted session state");
            CommandOutcome::ok(())
        }
        Err(error) => state.report_failure("restore_session", "Could not restore session", error),
    }
}

pub async fn login_impl(state: &AppState, email: String, password: String) -> CommandOutcome<UserProfile> {
    match state.session.login(email.trim(), &password).await {
        Ok(profile) => {
            state.log_info("login", &format!("signed in user_id={}", profile.id));
            state.toasts.push(ToastKind::Success, "Signed in", None);
            state.events.publish(AppEvent::SessionChanged);
            CommandOutcome::ok(profile)
        }
        Err(error) => state.report_failure("login", "Sign in failed", error),
    }
}

pub async fn register_impl(
    state: &AppState,
    name: String,
    email: String,
    password: String,
    captcha_token: Option<String>,
) -> CommandOutcome<UserProfile> {
    let request = RegistrationRequest {
        name: name.trim().to_string(),
        email: email.trim().to_string(),
        password,
        captcha_token,
    };
    match state.session.register(request).await {
        Ok(profile) => {
            state.log_info("register", &format!("registered user_id={}", profile.id));
            state.toasts.push(ToastKind::Success, "Account created", None);
            state.events.publish(AppEvent::SessionChanged);
            CommandOutcome::ok(profile)
        }
        Err(error) => state.report_failure("register", "Registration failed", error),
    }
}

pub async fn google_login_impl(state: &AppState, token_or_code: String) -> CommandOutcome<UserProfile> {
    match state.session.login_with_google(&token_or_code).await {
        Ok(profile) => {
            state.log_info("google_login", &format!("signed in user_id={}", profile.id));
            state.toasts.push(ToastKind::Success, "Signed in", None);
            state.events.publish(AppEvent::SessionChanged);
            CommandOutcome::ok(profile)
        }
        Err(error) => state.report_failure("google_login", "Google sign in failed", error),
    }
}

pub async fn github_login_impl(state: &AppState, code: String) -> CommandOutcome<UserProfile> {
    match state.session.login_with_github(&code).await {
        Ok(profile) => {
            state.log_info("github_login", &format!("signed in user_id={}", profile.id));
            state.toasts.push(ToastKind::Success, "Signed in", None);
            state.events.publish(AppEvent::SessionChanged);
            CommandOutcome::ok(profile)
        }
        Err(error) => state.report_failure("github_login", "GitHub sign in failed", error),
    }
}

pub async fn oauth_callback_impl(state: &AppState, url: String) -> CommandOutcome<String> {
    match state.callback.handle(&url).await {
        Ok(CallbackOutcome::SignedIn { sanitized_url }) => {
            state.log_info("oauth_callback", "completed provider callback");
            state.toasts.push(ToastKind::Success, "Signed in", None);
            state.events.publish(AppEvent::SessionChanged);
            CommandOutcome::ok(sanitized_url)
        }
        Ok(CallbackOutcome::AlreadyHandled) => CommandOutcome::accepted("callback already handled"),
        Ok(CallbackOutcome::Missing) => {
            state.log_error("oauth_callback", "callback carried no token or code");
            CommandOutcome::fail("callback carried no token or code")
        }
        Err(error) => state.report_failure("oauth_callback", "Sign in failed", error),
    }
}

pub async fn logout_impl(state: &AppState) -> CommandOutcome<()> {
    match state.session.logout().await {
        Ok(()) => {
            state.log_info("logout", "cleared local session");
            state.toasts.push(ToastKind::Info, "Signed out", None);
            state.events.publish(AppEvent::SessionChanged);
            CommandOutcome::ok(())
        }
        Err(error) => state.report_failure("logout", "Sign out failed", error),
    }
}

pub async fn refresh_user_impl(state: &AppState) -> CommandOutcome<Option<UserProfile>> {
    match state.session.refresh_user().await {
        Ok(profile) => CommandOutcome::ok(profile),
        Err(error) => state.report_failure("refresh_user", "Could not refresh profile", error),
    }
}

pub fn guard_route_impl(state: &AppState, path: String) -> CommandOutcome<GuardResponse> {
    let guard = RouteGuard::new(state.session.subscribe());
    let response = match guard.decide(&path) {
        GuardDecision::Pending => GuardResponse {
            action: "pending".to_string(),
            redirect_to: None,
        },
        GuardDecision::Render => GuardResponse {
            action: "render".to_string(),
            redirect_to: None,
        },
        GuardDecision::Redirect { to } => GuardResponse {
            action: "redirect".to_string(),
            redirect_to: Some(to),
        },
    };
    CommandOutcome::ok(response)
}

pub fn generate_preview_impl(
    state: &AppState,
    days: Option<u32>,
    variability: Option<f64>,
) -> CommandOutcome<SeedBundle> {
    let defaults = match read_preview_defaults(state.config_dir()) {
        Ok(defaults) => defaults,
        Err(error) => {
            return state.report_failure("generate_preview", "Preview generation failed", error);
        }
    };
    let days = days.unwrap_or(defaults.days);
    let variability = variability.unwrap_or(defaults.variability);
    if days == 0 || days > MAX_PREVIEW_DAYS {
        return CommandOutcome::fail(format!("days must be in 1..={MAX_PREVIEW_DAYS}"));
    }

    let timezone = read_timezone(state.config_dir()).ok().flatten();
    let today = mock_data::local_today(timezone.as_deref(), Utc::now());
    let mut rng = rand::thread_rng();
    let entries = mock_data::generate_preview(days, variability, today, &mut rng);
    let bundle = mock_data::build_bundle(entries, variability, Utc::now());

    state.log_info(
        "generate_preview",
        &format!("generated {days} preview days ending {today}"),
    );
    CommandOutcome::ok(bundle)
}

pub fn save_seed_impl(state: &AppState, bundle: SeedBundle) -> CommandOutcome<()> {
    match state.seed_service().save(&bundle) {
        Ok(()) => {
            state.log_info("save_seed", &format!("saved seed with {} days", bundle.daily.len()));
            state.toasts.push(ToastKind::Success, "Preview data saved", None);
            CommandOutcome::ok(())
        }
        Err(error) => state.report_failure("save_seed", "Could not save preview data", error),
    }
}

pub fn load_seed_impl(state: &AppState) -> CommandOutcome<Option<SeedBundle>> {
    match state.seed_service().load() {
        Ok(bundle) => CommandOutcome::ok(bundle),
        Err(error) => state.report_failure("load_seed", "Could not load preview data", error),
    }
}

pub fn clear_seed_impl(state: &AppState) -> CommandOutcome<()> {
    match state.seed_service().clear() {
        Ok(()) => {
            state.log_info("clear_seed", "cleared stored seed");
            state.toasts.push(ToastKind::Info, "Preview data cleared", None);
            CommandOutcome::ok(())
        }
        Err(error) => state.report_failure("clear_seed", "Could not clear preview data", error),
    }
}

pub fn trend_summary_impl(
    state: &AppState,
    metric: String,
    window: Option<usize>,
    forecast_days: Option<usize>,
) -> CommandOutcome<TrendSummary> {
    let metric = match TrendMetric::parse(&metric) {
        Ok(metric) => metric,
        Err(message) => return CommandOutcome::fail(message),
    };
    let bundle = match state.seed_service().load() {
        Ok(Some(bundle)) => bundle,
        Ok(None) => {
            return CommandOutcome::fail("no preview data saved; generate and save a seed first");
        }
        Err(error) => return state.report_failure("trend_summary", "Could not load preview data", error),
    };

    let values = metric_series(&bundle.daily, metric);
    let summary = TrendSummary {
        metric,
        moving_average: moving_average(&values, window.unwrap_or(DEFAULT_WINDOW)),
        naive_forecast: naive_forecast(
            &values,
            DEFAULT_LOOKBACK,
            forecast_days.unwrap_or(DEFAULT_FORECAST_DAYS),
        ),
        values,
    };
    CommandOutcome::ok(summary)
}

pub async fn submit_generation_impl(
    state: &AppState,
    prompt: String,
    format: Option<String>,
) -> CommandOutcome<String> {
    let access_token = match state.require_access_token() {
        Ok(token) => token,
        Err(error) => return state.report_failure("submit_generation", "Sign in to continue", error),
    };
    let request = GenerationRequest {
        prompt: prompt.trim().to_string(),
        format,
    };
    match state.generation_service().submit(&access_token, &request).await {
        Ok(job_id) => {
            state.log_info("submit_generation", &format!("submitted job_id={job_id}"));
            state.toasts.push(ToastKind::Info, "Generation started", None);
            CommandOutcome::ok(job_id)
        }
        Err(error) => state.report_failure("submit_generation", "Generation failed to start", error),
    }
}

pub async fn job_status_impl(state: &AppState, job_id: String) -> CommandOutcome<JobStatus> {
    let access_token = match state.require_access_token() {
        Ok(token) => token,
        Err(error) => return state.report_failure("job_status", "Sign in to continue", error),
    };
    match state.backend.job_status(&access_token, job_id.trim()).await {
        Ok(status) => CommandOutcome::ok(status),
        Err(error) => state.report_failure("job_status", "Could not check job status", error),
    }
}

/// Polls until the job reaches a terminal state. Starting a new wait cancels
/// the previous one; `cancel_generation_poll_impl` stops it from teardown.
pub async fn await_generation_impl(state: &AppState, job_id: String) -> CommandOutcome<JobStatus> {
    let access_token = match state.require_access_token() {
        Ok(token) => token,
        Err(error) => return state.report_failure("await_generation", "Sign in to continue", error),
    };

    let (handle, mut token) = PollHandle::new();
    {
        let Ok(mut guard) = state.active_poll.lock() else {
            return CommandOutcome::fail("poll registry lock poisoned");
        };
        if let Some(previous) = guard.replace(handle) {
            previous.cancel();
        }
    }

    let result = state
        .generation_service()
        .poll_until_terminal(&access_token, job_id.trim(), &mut token)
        .await;
    match result {
        Ok(Some(status)) => {
            if status.state == JobState::Failed {
                let message = status
                    .message
                    .clone()
                    .unwrap_or_else(|| "generation failed".to_string());
                state.log_error("await_generation", &message);
                state
                    .toasts
                    .push(ToastKind::Error, "Generation failed", Some(message));
            } else {
                state.log_info("await_generation", &format!("job {} completed", status.id));
                state.toasts.push(ToastKind::Success, "Generation finished", None);
            }
            CommandOutcome::ok(status)
        }
        Ok(None) => CommandOutcome::accepted("generation poll cancelled"),
        Err(error) => state.report_failure("await_generation", "Generation polling failed", error),
    }
}

pub fn cancel_generation_poll_impl(state: &AppState) -> CommandOutcome<()> {
    let Ok(mut guard) = state.active_poll.lock() else {
        return CommandOutcome::fail("poll registry lock poisoned");
    };
    match guard.take() {
        Some(handle) => {
            handle.cancel();
            state.log_info("cancel_generation_poll", "cancelled active job poll");
            CommandOutcome::ok(())
        }
        None => CommandOutcome::accepted("no active job poll"),
    }
}

pub async fn dashboard_stats_impl(state: &AppState) -> CommandOutcome<DashboardStats> {
    let access_token = match state.require_access_token() {
        Ok(token) => token,
        Err(error) => return state.report_failure("dashboard_stats", "Sign in to continue", error),
    };
    match state.backend.dashboard_stats(&access_token).await {
        Ok(stats) => CommandOutcome::ok(stats),
        Err(error) => state.report_failure("dashboard_stats", "Could not load dashboard", error),
    }
}

pub async fn dashboard_activity_impl(state: &AppState) -> CommandOutcome<Vec<ActivityItem>> {
    let access_token = match state.require_access_token() {
        Ok(token) => token,
        Err(error) => {
            return state.report_failure("dashboard_activity", "Sign in to continue", error);
        }
    };
    match state.backend.dashboard_activity(&access_token).await {
        Ok(items) => CommandOutcome::ok(items),
        Err(error) => state.report_failure("dashboard_activity", "Could not load activity", error),
    }
}

pub async fn list_plans_impl(state: &AppState) -> CommandOutcome<Vec<Plan>> {
    match state.backend.list_plans().await {
        Ok(plans) => CommandOutcome::ok(plans),
        Err(error) => state.report_failure("list_plans", "Could not load plans", error),
    }
}

pub async fn subscriptions_impl(state: &AppState) -> CommandOutcome<Vec<SubscriptionInfo>> {
    let access_token = match state.require_access_token() {
        Ok(token) => token,
        Err(error) => return state.report_failure("subscriptions", "Sign in to continue", error),
    };
    match state.backend.list_subscriptions(&access_token).await {
        Ok(subscriptions) => CommandOutcome::ok(subscriptions),
        Err(error) => state.report_failure("subscriptions", "Could not load subscriptions", error),
    }
}

pub async fn cancel_subscription_impl(state: &AppState) -> CommandOutcome<()> {
    let access_token = match state.require_access_token() {
        Ok(token) => token,
        Err(error) => {
            return state.report_failure("cancel_subscription", "Sign in to continue", error);
        }
    };
    match state.backend.cancel_subscription(&access_token).await {
        Ok(()) => {
            state.log_info("cancel_subscription", "cancelled active subscription");
            state.toasts.push(ToastKind::Info, "Subscription cancelled", None);
            CommandOutcome::ok(())
        }
        Err(error) => {
            state.report_failure("cancel_subscription", "Could not cancel subscription", error)
        }
    }
}

pub async fn subscription_history_impl(
    state: &AppState,
) -> CommandOutcome<Vec<SubscriptionHistoryItem>> {
    let access_token = match state.require_access_token() {
        Ok(token) => token,
        Err(error) => {
            return state.report_failure("subscription_history", "Sign in to continue", error);
        }
    };
    match state.backend.subscription_history(&access_token).await {
        Ok(history) => CommandOutcome::ok(history),
        Err(error) => {
            state.report_failure("subscription_history", "Could not load billing history", error)
        }
    }
}

/// Optimistic update: the server's immediate response is returned, then the
/// profile is reconciled through the session manager's refresh path.
pub async fn update_profile_impl(
    state: &AppState,
    name: Option<String>,
    avatar: Option<String>,
) -> CommandOutcome<UserProfile> {
    let access_token = match state.require_access_token() {
        Ok(token) => token,
        Err(error) => return state.report_failure("update_profile", "Sign in to continue", error),
    };
    let update = ProfileUpdate { name, avatar };
    match state.backend.update_profile(&access_token, &update).await {
        Ok(profile) => {
            let _ = state.session.refresh_user().await;
            state.log_info("update_profile", &format!("updated user_id={}", profile.id));
            state.toasts.push(ToastKind::Success, "Settings saved", None);
            CommandOutcome::ok(profile)
        }
        Err(error) => state.report_failure("update_profile", "Could not save settings", error),
    }
}

pub async fn forgot_password_impl(state: &AppState, email: String) -> CommandOutcome<()> {
    let email = email.trim().to_string();
    if email.is_empty() || !email.contains('@') {
        return CommandOutcome::fail_with_errors(
            "please correct the highlighted fields",
            BTreeMap::from([("email".to_string(), "a valid email is required".to_string())]),
        );
    }
    match state.backend.forgot_password(&email).await {
        Ok(()) => {
            state.toasts.push(
                ToastKind::Info,
                "Reset email sent",
                Some("check your inbox for the reset link".to_string()),
            );
            CommandOutcome::ok(())
        }
        Err(error) => state.report_failure("forgot_password", "Could not send reset email", error),
    }
}

pub async fn reset_password_impl(
    state: &AppState,
    token: String,
    new_password: String,
) -> CommandOutcome<()> {
    match state.backend.reset_password(token.trim(), &new_password).await {
        Ok(()) => {
            state.toasts.push(ToastKind::Success, "Password updated", None);
            CommandOutcome::ok(())
        }
        Err(error) => state.report_failure("reset_password", "Could not reset password", error),
    }
}

pub async fn change_password_impl(
    state: &AppState,
    current_password: String,
    new_password: String,
) -> CommandOutcome<()> {
    let access_token = match state.require_access_token() {
        Ok(token) => token,
        Err(error) => return state.report_failure("change_password", "Sign in to continue", error),
    };
    match state
        .backend
        .change_password(&access_token, &current_password, &new_password)
        .await
    {
        Ok(()) => {
            state.toasts.push(ToastKind::Success, "Password updated", None);
            CommandOutcome::ok(())
        }
        Err(error) => state.report_failure("change_password", "Could not change password", error),
    }
}

pub async fn verify_email_impl(state: &AppState, token: String) -> CommandOutcome<()> {
    match state.backend.verify_email(token.trim()).await {
        Ok(()) => {
            state.toasts.push(ToastKind::Success, "Email verified", None);
            CommandOutcome::ok(())
        }
        Err(error) => state.report_failure("verify_email", "Could not verify email", error),
    }
}

/// Client-side validation blocks submission before any network call; the
/// caller renders the field errors inline.
pub async fn contact_impl(
    state: &AppState,
    name: String,
    email: String,
    subject: Option<String>,
    message: String,
) -> CommandOutcome<()> {
    let errors = validate_contact(&name, &email, &message);
    if !errors.is_empty() {
        return CommandOutcome::fail_with_errors("please correct the highlighted fields", errors);
    }

    let contact = ContactMessage {
        name: name.trim().to_string(),
        email: email.trim().to_string(),
        subject: subject
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(ToOwned::to_owned),
        message: message.trim().to_string(),
    };
    match state.backend.send_contact(&contact).await {
        Ok(()) => {
            state.log_info("contact", "sent contact message");
            state.toasts.push(ToastKind::Success, "Message sent", None);
            CommandOutcome::ok(())
        }
        Err(error) => state.report_failure("contact", "Could not send message", error),
    }
}

pub fn record_cookie_consent_impl(state: &AppState, decision: String) -> CommandOutcome<()> {
    let decision = decision.trim();
    if decision.is_empty() {
        return CommandOutcome::fail("consent decision must not be empty");
    }
    match state.local_store.put(keys::COOKIE_CONSENT, decision) {
        Ok(()) => CommandOutcome::ok(()),
        Err(error) => state.report_failure("record_cookie_consent", "Could not save preference", error),
    }
}

pub fn read_cookie_consent_impl(state: &AppState) -> CommandOutcome<Option<String>> {
    match state.local_store.get(keys::COOKIE_CONSENT) {
        Ok(value) => CommandOutcome::ok(value),
        Err(error) => state.report_failure("read_cookie_consent", "Could not read preference", error),
    }
}

pub fn active_toasts_impl(state: &AppState) -> CommandOutcome<Vec<Toast>> {
    CommandOutcome::ok(state.toasts.active())
}

pub fn dismiss_toast_impl(state: &AppState, id: u64) -> CommandOutcome<bool> {
    CommandOutcome::ok(state.toasts.dismiss(id))
}

fn validate_contact(name: &str, email: &str, message: &str) -> BTreeMap<String, String> {
    let mut errors = BTreeMap::new();
    if name.trim().is_empty() {
        errors.insert("name".to_string(), "name is required".to_string());
    }
    let email = email.trim();
    if email.is_empty() || !email.contains('@') {
        errors.insert("email".to_string(), "a valid email is required".to_string());
    }
    if message.trim().is_empty() {
        errors.insert("message".to_string(), "message is required".to_string());
    }
    errors
}
