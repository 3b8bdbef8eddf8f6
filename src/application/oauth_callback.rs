use crate::application::session::SessionManager;
use crate::infrastructure::backend_client::{AuthApi, TokenResponse};
use crate::infrastructure::error::InfraError;
use crate::infrastructure::session_store::SessionStore;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use url::{Url, form_urlencoded};

/// Providers land without `expires_in` when the token travels in the URL
/// fragment; assume a standard hour until the next profile fetch settles it.
const DEFAULT_EXPIRES_IN: i64 = 3600;

const SENSITIVE_PARAMS: &[&str] = &[
    "token",
    "access_token",
    "refresh_token",
    "expires_in",
    "code",
    "state",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackProvider {
    Google,
    Github,
}

impl CallbackProvider {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "google" => Some(Self::Google),
            "github" => Some(Self::Github),
            _ => None,
        }
    }
}

/// Parameters normalized across the two redirect conventions: code-in-query
/// and token-in-fragment. Aliases (`token`/`access_token`) collapse into one
/// field; the first occurrence wins, query before fragment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub provider: Option<CallbackProvider>,
    pub code: Option<String>,
}

impl CallbackParams {
    pub fn parse(raw_url: &str) -> Result<Self, InfraError> {
        let url = Url::parse(raw_url)
            .map_err(|error| InfraError::InvalidConfig(format!("invalid callback url: {error}")))?;

        let mut params = Self::default();
        for (key, value) in url.query_pairs() {
            params.absorb(&key, &value);
        }
        if let Some(fragment) = url.fragment() {
            for (key, value) in form_urlencoded::parse(fragment.as_bytes()) {
                params.absorb(&key, &value);
            }
        }
        Ok(params)
    }

    fn absorb(&mut self, key: &str, value: &str) {
        let value = value.trim();
        if value.is_empty() {
            return;
        }
        match key {
            "token" | "access_token" => {
                self.token.get_or_insert_with(|| value.to_string());
            }
            "refresh_token" => {
                self.refresh_token.get_or_insert_with(|| value.to_string());
            }
            "expires_in" => {
                if self.expires_in.is_none() {
                    self.expires_in = value.parse::<i64>().ok();
                }
            }
            "provider" => {
                if self.provider.is_none() {
                    self.provider = CallbackProvider::parse(value);
                }
            }
            "code" => {
                self.code.get_or_insert_with(|| value.to_string());
            }
            _ => {}
        }
    }
}

/// The callback URL with sensitive parameters stripped and the fragment
/// dropped, safe to leave visible in the address bar or logs.
pub fn sanitized_url(raw_url: &str) -> Result<String, InfraError> {
    let mut url = Url::parse(raw_url)
        .map_err(|error| InfraError::InvalidConfig(format!("invalid callback url: {error}")))?;

    let retained: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !SENSITIVE_PARAMS.contains(&key.as_ref()))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.set_fragment(None);
    url.set_query(None);
    if !retained.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for (key, value) in &retained {
            pairs.append_pair(key, value);
        }
    }
    Ok(url.to_string())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    StoreToken(TokenResponse),
    ExchangeCode {
        code: String,
        provider: Option<CallbackProvider>,
    },
    Missing,
}

/// A token anywhere in the URL wins; otherwise any code is treated as an
/// authorization code.
pub fn callback_action(params: &CallbackParams) -> CallbackAction {
    if let Some(token) = params.token.clone() {
        return CallbackAction::StoreToken(TokenResponse {
            access_token: token,
            refresh_token: params.refresh_token.clone(),
            expires_in: params.expires_in.unwrap_or(DEFAULT_EXPIRES_IN),
        });
    }
    if let Some(code) = params.code.clone() {
        return CallbackAction::ExchangeCode {
            code,
            provider: params.provider,
        };
    }
    CallbackAction::Missing
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackOutcome {
    SignedIn { sanitized_url: String },
    Missing,
    AlreadyHandled,
}

/// Runs the exchange at most once per page load, even if the surrounding
/// effect re-invokes it.
pub struct CallbackHandler<S, A>
where
    S: SessionStore + 'static,
    A: AuthApi,
{
    session: Arc<SessionManager<S, A>>,
    handled: AtomicBool,
}

impl<S, A> CallbackHandler<S, A>
where
    S: SessionStore + 'static,
    A: AuthApi,
{
    pub fn new(session: Arc<SessionManager<S, A>>) -> Self {
        Self {
            session,
            handled: AtomicBool::new(false),
        }
    }

    pub async fn handle(&self, raw_url: &str) -> Result<CallbackOutcome, InfraError> {
        if self.handled.swap(true, Ordering::SeqCst) {
            return Ok(CallbackOutcome::AlreadyHandled);
        }

        let params = CallbackParams::parse(raw_url)?;
        match callback_action(&params) {
            CallbackAction::StoreToken(token) => {
                self.session.adopt_token(token).await?;
                Ok(CallbackOutcome::SignedIn {
                    sanitized_url: sanitized_url(raw_url)?,
                })
            }
            CallbackAction::ExchangeCode { code, provider } => {
                self.exchange(&code, provider).await?;
                Ok(CallbackOutcome::SignedIn {
                    sanitized_url: sanitized_url(raw_url)?,
                })
            }
            CallbackAction::Missing => Ok(CallbackOutcome::Missing),
        }
    }

    async fn exchange(
        &self,
        code: &str,
        provider: Option<CallbackProvider>,
    ) -> Result<(), InfraError> {
        match provider {
            Some(CallbackProvider::Google) => {
                self.session.login_with_google(code).await?;
            }
            Some(CallbackProvider::Github) => {
                self.session.login_with_github(code).await?;
            }
            // No provider hint: fixed fallback order, Google then GitHub.
            None => {
                if self.session.login_with_google(code).await.is_err() {
                    self.session.login_with_github(code).await?;
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::UserProfile;
    use crate::infrastructure::backend_client::{GoogleExchange, ProfileUpdate, RegistrationRequest};
    use crate::infrastructure::config::load_api_config_from_lookup;
    use crate::infrastructure::session_store::InMemorySessionStore;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::sync::Mutex;
    use std::sync::atomic::AtomicUsize;

    fn sample_profile() -> UserProfile {
        UserProfile {
            id: "usr-1".to_string(),
            email: "member@example.com".to_string(),
            name: "Member".to_string(),
            avatar: None,
            plan_id: "plan-free".to_string(),
            created_at: DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
                .expect("valid datetime")
                .with_timezone(&Utc),
        }
    }

    #[derive(Default)]
    struct FakeExchangeApi {
        google_calls: AtomicUsize,
        github_calls: AtomicUsize,
        google_fails: Mutex<bool>,
        call_order: Mutex<Vec<&'static str>>,
    }

    impl FakeExchangeApi {
        fn set_google_fails(&self, value: bool) {
            *self.google_fails.lock().expect("google flag lock") = value;
        }

        fn token() -> TokenResponse {
            TokenResponse {
                access_token: "exchanged-token".to_string(),
                refresh_token: None,
                expires_in: 3600,
            }
        }
    }

    #[async_trait]
    impl AuthApi for FakeExchangeApi {
        async fn login(&self, _email: &str, _password: &str) -> Result<TokenResponse, InfraError> {
            Err(InfraError::Api("not implemented in fake".to_string()))
        }

        async fn register(
            &self,
            _request: &RegistrationRequest,
        ) -> Result<TokenResponse, InfraError> {
            Err(InfraError::Api("not implemented in fake".to_string()))
        }

        async fn exchange_google(
            &self,
            _exchange: &GoogleExchange,
        ) -> Result<TokenResponse, InfraError> {
            self.google_calls.fetch_add(1, Ordering::SeqCst);
            self.call_order.lock().expect("order lock").push("google");
            if *self.google_fails.lock().expect("google flag lock") {
                return Err(InfraError::Api("bad verification code".to_string()));
            }
            Ok(Self::token())
        }

        async fn exchange_github(&self, _code: &str) -> Result<TokenResponse, InfraError> {
            self.github_calls.fetch_add(1, Ordering::SeqCst);
            self.call_order.lock().expect("order lock").push("github");
            Ok(Self::token())
        }

        async fn fetch_profile(&self, _access_token: &str) -> Result<UserProfile, InfraError> {
            Ok(sample_profile())
        }

        async fn update_profile(
            &self,
            _access_token: &str,
            _update: &ProfileUpdate,
        ) -> Result<UserProfile, InfraError> {
            Err(InfraError::Api("not implemented in fake".to_string()))
        }

        async fn logout(&self, _access_token: &str) -> Result<(), InfraError> {
            Ok(())
        }

        async fn forgot_password(&self, _email: &str) -> Result<(), InfraError> {
            Err(InfraError::Api("not implemented in fake".to_string()))
        }

        async fn reset_password(
            &self,
            _token: &str,
            _new_password: &str,
        ) -> Result<(), InfraError> {
            Err(InfraError::Api("not implemented in fake".to_string()))
        }

        async fn change_password(
            &self,
            _access_token: &str,
            _current_password: &str,
            _new_password: &str,
        ) -> Result<(), InfraError> {
            Err(InfraError::Api("not implemented in fake".to_string()))
        }

        async fn verify_email(&self, _token: &str) -> Result<(), InfraError> {
            Err(InfraError::Api("not implemented in fake".to_string()))
        }
    }

    fn handler(
        api: Arc<FakeExchangeApi>,
    ) -> CallbackHandler<InMemorySessionStore, FakeExchangeApi> {
        let store = Arc::new(InMemorySessionStore::default());
        let session = Arc::new(SessionManager::new(
            store,
            api,
            load_api_config_from_lookup(|_| None),
        ));
        CallbackHandler::new(session)
    }

    #[test]
    fn fragment_access_token_matches_query_token_extraction() {
        let from_fragment =
            CallbackParams::parse("https://app.technozlife.com/oauth/callback#access_token=tok-1")
                .expect("parse fragment url");
        let from_query =
            CallbackParams::parse("https://app.technozlife.com/oauth/callback?token=tok-1")
                .expect("parse query url");
        assert_eq!(from_fragment.token.as_deref(), Some("tok-1"));
        assert_eq!(from_fragment.token, from_query.token);
    }

    #[test]
    fn parse_collects_refresh_token_provider_and_expiry() {
        let params = CallbackParams::parse(
            "https://app.technozlife.com/cb?provider=github#access_token=tok&refresh_token=ref&expires_in=900",
        )
        .expect("parse url");
        assert_eq!(params.token.as_deref(), Some("tok"));
        assert_eq!(params.refresh_token.as_deref(), Some("ref"));
        assert_eq!(params.expires_in, Some(900));
        assert_eq!(params.provider, Some(CallbackProvider::Github));
    }

    #[test]
    fn token_wins_over_code_when_both_present() {
        let params = CallbackParams::parse(
            "https://app.technozlife.com/cb?code=auth-code#token=tok",
        )
        .expect("parse url");
        match callback_action(&params) {
            CallbackAction::StoreToken(token) => {
                assert_eq!(token.access_token, "tok");
                assert_eq!(token.expires_in, DEFAULT_EXPIRES_IN);
            }
            other => panic!("expected store-token action, got {other:?}"),
        }
    }

    #[test]
    fn missing_token_and_code_yields_missing_action() {
        let params = CallbackParams::parse("https://app.technozlife.com/cb?state=xyz")
            .expect("parse url");
        assert_eq!(callback_action(&params), CallbackAction::Missing);
    }

    #[test]
    fn sanitized_url_strips_sensitive_params_and_fragment() {
        let sanitized = sanitized_url(
            "https://app.technozlife.com/cb?code=auth&state=xyz&view=welcome#access_token=tok",
        )
        .expect("sanitize url");
        assert_eq!(sanitized, "https://app.technozlife.com/cb?view=welcome");
    }

    #[test]
    fn sanitized_url_drops_empty_query_entirely() {
        let sanitized = sanitized_url("https://app.technozlife.com/cb?token=tok")
            .expect("sanitize url");
        assert_eq!(sanitized, "https://app.technozlife.com/cb");
    }

    #[tokio::test]
    async fn handle_stores_fragment_token_and_reports_sanitized_url() {
        let api = Arc::new(FakeExchangeApi::default());
        let callback = handler(Arc::clone(&api));

        let outcome = callback
            .handle("https://app.technozlife.com/cb#access_token=tok&refresh_token=ref")
            .await
            .expect("handle callback");

        assert_eq!(
            outcome,
            CallbackOutcome::SignedIn {
                sanitized_url: "https://app.technozlife.com/cb".to_string()
            }
        );
        assert_eq!(api.google_calls.load(Ordering::SeqCst), 0);
        assert_eq!(api.github_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn handle_runs_at_most_once_per_page_load() {
        let api = Arc::new(FakeExchangeApi::default());
        let callback = handler(Arc::clone(&api));
        let url = "https://app.technozlife.com/cb?code=auth-code&provider=google";

        let first = callback.handle(url).await.expect("first handle");
        assert!(matches!(first, CallbackOutcome::SignedIn { .. }));
        assert_eq!(api.google_calls.load(Ordering::SeqCst), 1);

        let second = callback.handle(url).await.expect("second handle");
        assert_eq!(second, CallbackOutcome::AlreadyHandled);
        assert_eq!(api.google_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_provider_hint_falls_back_google_then_github() {
        let api = Arc::new(FakeExchangeApi::default());
        api.set_google_fails(true);
        let callback = handler(Arc::clone(&api));

        let outcome = callback
            .handle("https://app.technozlife.com/cb?code=auth-code")
            .await
            .expect("handle callback");

        assert!(matches!(outcome, CallbackOutcome::SignedIn { .. }));
        assert_eq!(
            *api.call_order.lock().expect("order lock"),
            vec!["google", "github"]
        );
    }

    #[tokio::test]
    async fn github_provider_hint_skips_google() {
        let api = Arc::new(FakeExchangeApi::default());
        let callback = handler(Arc::clone(&api));

        callback
            .handle("https://app.technozlife.com/cb?code=auth-code&provider=github")
            .await
            .expect("handle callback");

        assert_eq!(api.google_calls.load(Ordering::SeqCst), 0);
        assert_eq!(api.github_calls.load(Ordering::SeqCst), 1);
    }
}
