use crate::domain::models::{JobState, UserProfile};
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use url::Url;

#[derive(Debug, Clone, serde::Deserialize, PartialEq, Eq)]
pub struct TokenResponse {
    #[serde(alias = "token")]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RegistrationRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub captcha_token: Option<String>,
}

/// Google hands back either a JWT credential (One Tap style) or an
/// authorization code; the exchange endpoint accepts both under different
/// parameter names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoogleExchange {
    Credential(String),
    Code(String),
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct JobStatus {
    pub id: String,
    #[serde(alias = "status")]
    pub state: JobState,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub streak_days: u32,
    pub entries_this_week: u32,
    pub habit_completion_rate: f64,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityItem {
    pub id: String,
    pub label: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: String,
    pub name: String,
    pub price_cents: u32,
    pub interval: String,
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionInfo {
    pub id: String,
    pub plan_id: String,
    pub status: String,
    #[serde(default)]
    pub renews_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionHistoryItem {
    pub id: String,
    pub plan_id: String,
    pub amount_cents: u32,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ContactMessage {
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    pub message: String,
}

#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, InfraError>;

    async fn register(&self, request: &RegistrationRequest) -> Result<TokenResponse, InfraError>;

    async fn exchange_google(&self, exchange: &GoogleExchange) -> Result<TokenResponse, InfraError>;

    async fn exchange_github(&self, code: &str) -> Result<TokenResponse, InfraError>;

    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, InfraError>;

    async fn update_profile(
        &self,
        access_token: &str,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, InfraError>;

    async fn logout(&self, access_token: &str) -> Result<(), InfraError>;

    async fn forgot_password(&self, email: &str) -> Result<(), InfraError>;

    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), InfraError>;

    async fn change_password(
        &self,
        access_token: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), InfraError>;

    async fn verify_email(&self, token: &str) -> Result<(), InfraError>;
}

#[async_trait]
pub trait ContentApi: Send + Sync {
    async fn submit_generation(
        &self,
        access_token: &str,
        request: &GenerationRequest,
    ) -> Result<String, InfraError>;

    async fn job_status(&self, access_token: &str, job_id: &str) -> Result<JobStatus, InfraError>;

    async fn dashboard_stats(&self, access_token: &str) -> Result<DashboardStats, InfraError>;

    async fn dashboard_activity(&self, access_token: &str)
    -> Result<Vec<ActivityItem>, InfraError>;

    async fn list_plans(&self) -> Result<Vec<Plan>, InfraError>;

    async fn list_subscriptions(
        &self,
        access_token: &str,
    ) -> Result<Vec<SubscriptionInfo>, InfraError>;

    async fn cancel_subscription(&self, access_token: &str) -> Result<(), InfraError>;

    async fn subscription_history(
        &self,
        access_token: &str,
    ) -> Result<Vec<SubscriptionHistoryItem>, InfraError>;

    async fn send_contact(&self, message: &ContactMessage) -> Result<(), InfraError>;
}

/// Every backend response arrives in the `{success, data?, message?, errors?}`
/// envelope; field-level errors are folded into the message.
#[derive(Debug, serde::Deserialize)]
struct ApiEnvelope {
    success: bool,
    #[serde(default)]
    data: Option<serde_json::Value>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone)]
pub struct ReqwestBackendClient {
    client: Client,
    base_url: String,
}

impl ReqwestBackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, InfraError> {
        let mut url = Url::parse(&self.base_url)
            .map_err(|error| InfraError::InvalidConfig(format!("invalid api base url: {error}")))?;
        {
            let mut parts = url
                .path_segments_mut()
                .map_err(|_| InfraError::InvalidConfig("api base URL cannot be a base".to_string()))?;
            for segment in segments {
                parts.push(segment);
            }
        }
        Ok(url)
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), InfraError> {
        if value.trim().is_empty() {
            return Err(InfraError::Api(format!("{field} must not be empty")));
        }
        Ok(())
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        access_token: Option<&str>,
        payload: &serde_json::Value,
        context: &str,
    ) -> Result<T, InfraError> {
        let endpoint = self.endpoint(segments)?;
        let mut request = self
            .client
            .post(endpoint)
            .header("Content-Type", "application/json")
            .json(payload);
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|error| InfraError::Api(format!("network error while {context}: {error}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Api(format!("failed reading {context} response: {error}")))?;
        parse_data(status, &body, context)
    }

    async fn post_ack(
        &self,
        segments: &[&str],
        access_token: Option<&str>,
        payload: &serde_json::Value,
        context: &str,
    ) -> Result<(), InfraError> {
        let endpoint = self.endpoint(segments)?;
        let mut request = self
            .client
            .post(endpoint)
            .header("Content-Type", "application/json")
            .json(payload);
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|error| InfraError::Api(format!("network error while {context}: {error}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Api(format!("failed reading {context} response: {error}")))?;
        parse_ack(status, &body, context)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        segments: &[&str],
        access_token: Option<&str>,
        context: &str,
    ) -> Result<T, InfraError> {
        let endpoint = self.endpoint(segments)?;
        let mut request = self.client.get(endpoint);
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|error| InfraError::Api(format!("network error while {context}: {error}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|error| InfraError::Api(format!("failed reading {context} response: {error}")))?;
        parse_data(status, &body, context)
    }
}

fn parse_envelope(status: u16, body: &str, context: &str) -> Result<ApiEnvelope, InfraError> {
    if status == 401 {
        return Err(InfraError::Unauthorized);
    }

    let envelope = serde_json::from_str::<ApiEnvelope>(body).map_err(|error| {
        InfraError::Api(format!("invalid {context} payload: {error}; body={body}"))
    })?;

    if status >= 400 || !envelope.success {
        return Err(InfraError::Api(failure_message(status, &envelope, context)));
    }
    Ok(envelope)
}

fn failure_message(status: u16, envelope: &ApiEnvelope, context: &str) -> String {
    let mut message = envelope
        .message
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
        .unwrap_or_else(|| format!("{context} failed: http {status}"));

    if let Some(errors) = envelope.errors.as_ref().filter(|errors| !errors.is_empty()) {
        let details = errors
            .iter()
            .map(|(field, detail)| format!("{field}: {detail}"))
            .collect::<Vec<_>>()
            .join("; ");
        message = format!("{message} ({details})");
    }
    message
}

fn parse_data<T: DeserializeOwned>(status: u16, body: &str, context: &str) -> Result<T, InfraError> {
    let envelope = parse_envelope(status, body, context)?;
    let data = envelope
        .data
        .ok_or_else(|| InfraError::Api(format!("{context} response did not include data")))?;
    serde_json::from_value(data)
        .map_err(|error| InfraError::Api(format!("invalid {context} data: {error}")))
}

fn parse_ack(status: u16, body: &str, context: &str) -> Result<(), InfraError> {
    parse_envelope(status, body, context).map(|_| ())
}

#[async_trait]
impl AuthApi for ReqwestBackendClient {
    async fn login(&self, email: &str, password: &str) -> Result<TokenResponse, InfraError> {
        Self::ensure_non_empty(email, "email")?;
        Self::ensure_non_empty(password, "password")?;
        let payload = serde_json::json!({ "email": email.trim(), "password": password });
        self.post_json(&["auth", "login"], None, &payload, "signing in")
            .await
    }

    async fn register(&self, request: &RegistrationRequest) -> Result<TokenResponse, InfraError> {
        Self::ensure_non_empty(&request.email, "email")?;
        Self::ensure_non_empty(&request.password, "password")?;
        let payload = serde_json::to_value(request)?;
        self.post_json(&["auth", "register"], None, &payload, "registering")
            .await
    }

    async fn exchange_google(&self, exchange: &GoogleExchange) -> Result<TokenResponse, InfraError> {
        let payload = match exchange {
            GoogleExchange::Credential(credential) => {
                Self::ensure_non_empty(credential, "credential")?;
                serde_json::json!({ "credential": credential })
            }
            GoogleExchange::Code(code) => {
                Self::ensure_non_empty(code, "code")?;
                serde_json::json!({ "code": code })
            }
        };
        self.post_json(
            &["auth", "google", "token"],
            None,
            &payload,
            "exchanging google credential",
        )
        .await
    }

    async fn exchange_github(&self, code: &str) -> Result<TokenResponse, InfraError> {
        Self::ensure_non_empty(code, "code")?;
        let payload = serde_json::json!({ "code": code });
        self.post_json(
            &["auth", "github", "token"],
            None,
            &payload,
            "exchanging github code",
        )
        .await
    }

    async fn fetch_profile(&self, access_token: &str) -> Result<UserProfile, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        self.get_json(&["user", "profile"], Some(access_token), "fetching profile")
            .await
    }

    async fn update_profile(
        &self,
        access_token: &str,
        update: &ProfileUpdate,
    ) -> Result<UserProfile, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        let endpoint = self.endpoint(&["user", "profile"])?;
        let response = self
            .client
            .put(endpoint)
            .header("Content-Type", "application/json")
            .bearer_auth(access_token)
            .json(update)
            .send()
            .await
            .map_err(|error| InfraError::Api(format!("network error while updating profile: {error}")))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|error| {
            InfraError::Api(format!("failed reading updating profile response: {error}"))
        })?;
        parse_data(status, &body, "updating profile")
    }

    async fn logout(&self, access_token: &str) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        self.post_ack(
            &["auth", "logout"],
            Some(access_token),
            &serde_json::json!({}),
            "signing out",
        )
        .await
    }

    async fn forgot_password(&self, email: &str) -> Result<(), InfraError> {
        Self::ensure_non_empty(email, "email")?;
        let payload = serde_json::json!({ "email": email.trim() });
        self.post_ack(
            &["auth", "password", "forgot"],
            None,
            &payload,
            "requesting password reset",
        )
        .await
    }

    async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), InfraError> {
        Self::ensure_non_empty(token, "reset token")?;
        Self::ensure_non_empty(new_password, "new password")?;
        let payload = serde_json::json!({ "token": token, "password": new_password });
        self.post_ack(
            &["auth", "password", "reset"],
            None,
            &payload,
            "resetting password",
        )
        .await
    }

    async fn change_password(
        &self,
        access_token: &str,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(new_password, "new password")?;
        let payload = serde_json::json!({
            "currentPassword": current_password,
            "newPassword": new_password,
        });
        self.post_ack(
            &["auth", "password", "change"],
            Some(access_token),
            &payload,
            "changing password",
        )
        .await
    }

    async fn verify_email(&self, token: &str) -> Result<(), InfraError> {
        Self::ensure_non_empty(token, "verification token")?;
        let endpoint = self.endpoint(&["auth", "verify", token.trim()])?;
        let response = self
            .client
            .get(endpoint)
            .send()
            .await
            .map_err(|error| InfraError::Api(format!("network error while verifying email: {error}")))?;

        let status = response.status().as_u16();
        let body = response.text().await.map_err(|error| {
            InfraError::Api(format!("failed reading verifying email response: {error}"))
        })?;
        parse_ack(status, &body, "verifying email")
    }
}

#[async_trait]
impl ContentApi for ReqwestBackendClient {
    async fn submit_generation(
        &self,
        access_token: &str,
        request: &GenerationRequest,
    ) -> Result<String, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(&request.prompt, "prompt")?;
        let payload = serde_json::to_value(request)?;

        #[derive(serde::Deserialize)]
        struct SubmittedJob {
            #[serde(alias = "jobId")]
            id: String,
        }

        let submitted: SubmittedJob = self
            .post_json(
                &["ai", "generate"],
                Some(access_token),
                &payload,
                "submitting generation job",
            )
            .await?;
        Ok(submitted.id)
    }

    async fn job_status(&self, access_token: &str, job_id: &str) -> Result<JobStatus, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        Self::ensure_non_empty(job_id, "job id")?;
        self.get_json(
            &["ai", "jobs", job_id.trim(), "status"],
            Some(access_token),
            "checking job status",
        )
        .await
    }

    async fn dashboard_stats(&self, access_token: &str) -> Result<DashboardStats, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        self.get_json(
            &["dashboard", "stats"],
            Some(access_token),
            "fetching dashboard stats",
        )
        .await
    }

    async fn dashboard_activity(
        &self,
        access_token: &str,
    ) -> Result<Vec<ActivityItem>, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        self.get_json(
            &["dashboard", "activity"],
            Some(access_token),
            "fetching recent activity",
        )
        .await
    }

    async fn list_plans(&self) -> Result<Vec<Plan>, InfraError> {
        self.get_json(&["subscriptions", "plans"], None, "listing plans")
            .await
    }

    async fn list_subscriptions(
        &self,
        access_token: &str,
    ) -> Result<Vec<SubscriptionInfo>, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        self.get_json(
            &["subscriptions"],
            Some(access_token),
            "listing subscriptions",
        )
        .await
    }

    async fn cancel_subscription(&self, access_token: &str) -> Result<(), InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        self.post_ack(
            &["subscriptions", "cancel"],
            Some(access_token),
            &serde_json::json!({}),
            "cancelling subscription",
        )
        .await
    }

    async fn subscription_history(
        &self,
        access_token: &str,
    ) -> Result<Vec<SubscriptionHistoryItem>, InfraError> {
        Self::ensure_non_empty(access_token, "access token")?;
        self.get_json(
            &["subscriptions", "history"],
            Some(access_token),
            "fetching billing history",
        )
        .await
    }

    async fn send_contact(&self, message: &ContactMessage) -> Result<(), InfraError> {
        Self::ensure_non_empty(&message.email, "email")?;
        Self::ensure_non_empty(&message.message, "message")?;
        let payload = serde_json::to_value(message)?;
        self.post_ack(&["mail", "contact"], None, &payload, "sending contact message")
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_data_unwraps_envelope() {
        let body = r#"{"success":true,"data":{"access_token":"tok","expires_in":3600}}"#;
        let token: TokenResponse = parse_data(200, body, "signing in").expect("parse token");
        assert_eq!(token.access_token, "tok");
        assert_eq!(token.expires_in, 3600);
        assert!(token.refresh_token.is_none());
    }

    #[test]
    fn parse_data_accepts_token_alias() {
        let body = r#"{"success":true,"data":{"token":"tok-alias","refresh_token":"r","expires_in":60}}"#;
        let token: TokenResponse = parse_data(200, body, "signing in").expect("parse token");
        assert_eq!(token.access_token, "tok-alias");
        assert_eq!(token.refresh_token.as_deref(), Some("r"));
    }

    #[test]
    fn parse_data_maps_401_to_unauthorized() {
        let result: Result<TokenResponse, _> = parse_data(401, "{}", "fetching profile");
        assert!(matches!(result, Err(InfraError::Unauthorized)));
    }

    #[test]
    fn parse_data_reports_server_message() {
        let body = r#"{"success":false,"message":"Invalid credentials"}"#;
        let result: Result<TokenResponse, _> = parse_data(400, body, "signing in");
        match result {
            Err(InfraError::Api(message)) => assert!(message.contains("Invalid credentials")),
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn parse_data_folds_field_errors_into_message() {
        let body = r#"{"success":false,"message":"Validation failed","errors":{"email":"already taken"}}"#;
        let result: Result<TokenResponse, _> = parse_data(422, body, "registering");
        match result {
            Err(InfraError::Api(message)) => {
                assert!(message.contains("Validation failed"));
                assert!(message.contains("email: already taken"));
            }
            other => panic!("expected api error, got {other:?}"),
        }
    }

    #[test]
    fn parse_ack_accepts_envelope_without_data() {
        let body = r#"{"success":true,"message":"sent"}"#;
        parse_ack(200, body, "sending contact message").expect("ack");
    }

    #[test]
    fn parse_data_rejects_missing_data() {
        let body = r#"{"success":true}"#;
        let result: Result<TokenResponse, _> = parse_data(200, body, "signing in");
        assert!(matches!(result, Err(InfraError::Api(_))));
    }

    #[test]
    fn endpoint_builds_nested_segments() {
        let client = ReqwestBackendClient::new("https://api.technozlife.com/");
        let url = client
            .endpoint(&["ai", "jobs", "job-1", "status"])
            .expect("build endpoint");
        assert_eq!(
            url.as_str(),
            "https://api.technozlife.com/ai/jobs/job-1/status"
        );
    }

    #[test]
    fn job_status_accepts_status_alias() {
        let body = r#"{"success":true,"data":{"id":"job-1","status":"completed","result":"done"}}"#;
        let status: JobStatus = parse_data(200, body, "checking job status").expect("parse status");
        assert_eq!(status.state, JobState::Completed);
        assert_eq!(status.result.as_deref(), Some("done"));
    }
}
