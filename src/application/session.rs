use crate::domain::models::{Session, UserProfile};
use crate::infrastructure::backend_client::{
    AuthApi, GoogleExchange, RegistrationRequest, TokenResponse,
};
use crate::infrastructure::config::ApiConfig;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::session_store::SessionStore;
use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// The expiry timer fires this many seconds before the token would lapse.
pub const EXPIRY_LEEWAY_SECONDS: i64 = 60;

type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignOutReason {
    UserRequested,
    Expired,
    Unauthorized,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    Loading,
    Authenticated(UserProfile),
    Unauthenticated { reason: Option<SignOutReason> },
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// Owns the access-token lifecycle: storage, the single proactive expiry
/// timer, the OAuth exchanges, and the auth-state channel the rest of the
/// app observes.
///
/// The backend exposes no refresh endpoint, so expiry deliberately forces
/// re-authentication instead of rotating a refresh token; the stored
/// `refresh_token` is kept for wire compatibility only.
pub struct SessionManager<S, A>
where
    S: SessionStore + 'static,
    A: AuthApi,
{
    store: Arc<S>,
    auth_api: Arc<A>,
    config: ApiConfig,
    state_tx: Arc<watch::Sender<AuthState>>,
    // Held so the channel always has a live receiver and sends cannot fail.
    _state_rx: watch::Receiver<AuthState>,
    expiry_timer: Mutex<Option<JoinHandle<()>>>,
    timer_generation: AtomicU64,
    now_provider: NowProvider,
}

impl<S, A> SessionManager<S, A>
where
    S: SessionStore + 'static,
    A: AuthApi,
{
    pub fn new(store: Arc<S>, auth_api: Arc<A>, config: ApiConfig) -> Self {
        let (state_tx, state_rx) = watch::channel(AuthState::Loading);
        Self {
            store,
            auth_api,
            config,
            state_tx: Arc::new(state_tx),
            _state_rx: state_rx,
            expiry_timer: Mutex::new(None),
            timer_generation: AtomicU64::new(0),
            now_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state_tx.subscribe()
    }

    pub fn current_state(&self) -> AuthState {
        self.state_tx.borrow().clone()
    }

    pub fn access_token(&self) -> Result<Option<String>, InfraError> {
        Ok(self.store.load()?.map(|session| session.access_token))
    }

    /// How many times the expiry timer has been (re)scheduled. Exactly one
    /// timer exists at any moment.
    pub fn expiry_timer_generation(&self) -> u64 {
        self.timer_generation.load(Ordering::SeqCst)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<UserProfile, InfraError> {
        let token = self.auth_api.login(email, password).await?;
        self.complete_auth(token).await
    }

    /// When a reCAPTCHA site key is configured, a missing captcha token
    /// aborts before any network call.
    pub async fn register(&self, request: RegistrationRequest) -> Result<UserProfile, InfraError> {
        if self.config.bot_check_enabled() {
            let captcha_present = request
                .captcha_token
                .as_deref()
                .map(str::trim)
                .is_some_and(|token| !token.is_empty());
            if !captcha_present {
                return Err(InfraError::InvalidConfig(
                    "captcha verification is required to register".to_string(),
                ));
            }
        }
        let token = self.auth_api.register(&request).await?;
        self.complete_auth(token).await
    }

    /// A value with exactly three dot-separated segments is treated as a JWT
    /// credential, anything else as an authorization code.
    pub async fn login_with_google(&self, token_or_code: &str) -> Result<UserProfile, InfraError> {
        let exchange = classify_google_credential(token_or_code)?;
        let token = self.auth_api.exchange_google(&exchange).await?;
        self.complete_auth(token).await
    }

    pub async fn login_with_github(&self, code: &str) -> Result<UserProfile, InfraError> {
        let token = self.auth_api.exchange_github(code).await?;
        self.complete_auth(token).await
    }

    /// Adopts a token that arrived out-of-band (OAuth callback redirect).
    pub async fn adopt_token(&self, token: TokenResponse) -> Result<UserProfile, InfraError> {
        self.complete_auth(token).await
    }

    /// Single source of truth after any auth event: re-fetches the profile
    /// with the stored token and clears the session on 401 or missing token.
    pub async fn refresh_user(&self) -> Result<Option<UserProfile>, InfraError> {
        let Some(session) = self.store.load()? else {
            self.clear_local(None)?;
            return Ok(None);
        };

        match self.auth_api.fetch_profile(&session.access_token).await {
            Ok(profile) => {
                self.set_state(AuthState::Authenticated(profile.clone()));
                Ok(Some(profile))
            }
            Err(error) if error.is_unauthorized() => {
                self.clear_local(Some(SignOutReason::Unauthorized))?;
                Ok(None)
            }
            Err(error) => Err(error),
        }
    }

    /// Forced logout after a protected call came back 401.
    pub fn mark_unauthorized(&self) -> Result<(), InfraError> {
        self.clear_local(Some(SignOutReason::Unauthorized))
    }

    /// Server-side invalidation is best effort; local state always clears.
    pub async fn logout(&self) -> Result<(), InfraError> {
        if let Ok(Some(session)) = self.store.load() {
            let _ = self.auth_api.logout(&session.access_token).await;
        }
        self.clear_local(Some(SignOutReason::UserRequested))
    }

    /// Loads the persisted session at startup. A session already inside the
    /// expiry leeway is treated as expired.
    pub async fn restore(&self) -> Result<(), InfraError> {
        let now = (self.now_provider)();
        match self.store.load()? {
            Some(session) if session.is_valid_at(now, EXPIRY_LEEWAY_SECONDS) => {
                match self.auth_api.fetch_profile(&session.access_token).await {
                    Ok(profile) => {
                        self.set_state(AuthState::Authenticated(profile));
                        self.schedule_expiry(&session);
                        Ok(())
                    }
                    Err(error) if error.is_unauthorized() => {
                        self.clear_local(Some(SignOutReason::Unauthorized))
                    }
                    Err(error) => Err(error),
                }
            }
            Some(_) => self.clear_local(Some(SignOutReason::Expired)),
            None => {
                self.set_state(AuthState::Unauthenticated { reason: None });
                Ok(())
            }
        }
    }

    async fn complete_auth(&self, token: TokenResponse) -> Result<UserProfile, InfraError> {
        let now = (self.now_provider)();
        let session = Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: now + Duration::seconds(token.expires_in.max(0)),
        };
        self.store.save(&session)?;

        let profile = match self.auth_api.fetch_profile(&session.access_token).await {
            Ok(profile) => profile,
            Err(error) => {
                let reason = error
                    .is_unauthorized()
                    .then_some(SignOutReason::Unauthorized);
                self.clear_local(reason)?;
                return Err(error);
            }
        };

        self.set_state(AuthState::Authenticated(profile.clone()));
        self.schedule_expiry(&session);
        Ok(profile)
    }

    fn clear_local(&self, reason: Option<SignOutReason>) -> Result<(), InfraError> {
        self.cancel_expiry_timer();
        self.store.clear()?;
        self.set_state(AuthState::Unauthenticated { reason });
        Ok(())
    }

    fn set_state(&self, state: AuthState) {
        let _ = self.state_tx.send(state);
    }

    fn cancel_expiry_timer(&self) {
        let Ok(mut guard) = self.expiry_timer.lock() else {
            return;
        };
        if let Some(previous) = guard.take() {
            previous.abort();
        }
    }

    /// Replaces the previous timer before spawning the next one, so timers
    /// never accumulate. When it fires, the session clears and the state
    /// moves to expired, which forces re-authentication.
    fn schedule_expiry(&self, session: &Session) {
        let now = (self.now_provider)();
        let fire_at = session.expires_at - Duration::seconds(EXPIRY_LEEWAY_SECONDS);
        let delay = (fire_at - now).to_std().unwrap_or_default();

        let store = Arc::clone(&self.store);
        let state_tx = Arc::clone(&self.state_tx);
        let Ok(mut guard) = self.expiry_timer.lock() else {
            return;
        };
        if let Some(previous) = guard.take() {
            previous.abort();
        }
        self.timer_generation.fetch_add(1, Ordering::SeqCst);
        *guard = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = store.clear();
            let _ = state_tx.send(AuthState::Unauthenticated {
                reason: Some(SignOutReason::Expired),
            });
        }));
    }
}

fn classify_google_credential(token_or_code: &str) -> Result<GoogleExchange, InfraError> {
    let value = token_or_code.trim();
    if value.is_empty() {
        return Err(InfraError::InvalidConfig(
            "google credential must not be empty".to_string(),
        ));
    }

    let segments: Vec<&str> = value.split('.').collect();
    if segments.len() == 3 && segments.iter().all(|segment| !segment.is_empty()) {
        Ok(GoogleExchange::Credential(value.to_string()))
    } else {
        Ok(GoogleExchange::Code(value.to_string()))
    }
}
