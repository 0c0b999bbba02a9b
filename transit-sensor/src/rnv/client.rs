//! RNV HTTP client: token endpoint and GraphQL endpoint.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::Value;
use tracing::{debug, warn};

use crate::auth::{AuthError, Credential, TokenIssuer};
use crate::source::http::json_or_absent;
use crate::source::{DepartureSource, FetchRequest, RawPayload, SourceError, WindowPolicy};

use super::query::station_journeys;

/// Sandbox GraphQL endpoint.
pub const DEFAULT_API_URL: &str = "https://graphql-sandbox-dds.rnv-online.de/";

/// Token endpoint for an Azure AD tenant.
pub fn oauth_url(tenant_id: &str) -> String {
    format!("https://login.microsoftonline.com/{tenant_id}/oauth2/token")
}

/// Configuration for the RNV client.
#[derive(Clone)]
pub struct RnvConfig {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    /// Resource id the token is requested for.
    pub resource: String,
    /// GraphQL endpoint
    pub api_url: String,
    /// Token endpoint (defaults to the tenant's Azure AD endpoint)
    pub oauth_url: String,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl RnvConfig {
    pub fn new(
        tenant_id: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        resource: impl Into<String>,
    ) -> Self {
        let tenant_id = tenant_id.into();
        Self {
            oauth_url: oauth_url(&tenant_id),
            tenant_id,
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            resource: resource.into(),
            api_url: DEFAULT_API_URL.to_string(),
            timeout_secs: 10,
        }
    }

    /// Set a custom GraphQL endpoint.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Set a custom token endpoint (for testing).
    pub fn with_oauth_url(mut self, url: impl Into<String>) -> Self {
        self.oauth_url = url.into();
        self
    }

    /// Set request timeout.
    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

impl std::fmt::Debug for RnvConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RnvConfig")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("resource", &self.resource)
            .field("api_url", &self.api_url)
            .field("oauth_url", &self.oauth_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// RNV Data Hub client.
#[derive(Debug, Clone)]
pub struct RnvClient {
    http: reqwest::Client,
    config: RnvConfig,
}

impl RnvClient {
    /// Create a new RNV client with the given configuration.
    pub fn new(config: RnvConfig) -> Result<Self, SourceError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("transit-sensor/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &RnvConfig {
        &self.config
    }

    /// Request a token with the client-credentials grant.
    pub async fn request_access_token(&self) -> Result<Credential, AuthError> {
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("resource", self.config.resource.as_str()),
        ];

        let response = self
            .http
            .post(&self.config.oauth_url)
            .form(&form)
            .send()
            .await
            .map_err(|e| AuthError::Unreachable(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED
            || status == StatusCode::FORBIDDEN
            || status == StatusCode::BAD_REQUEST
        {
            return Err(AuthError::Rejected {
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            return Err(AuthError::Unreachable(format!(
                "token endpoint returned status {}",
                status.as_u16()
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| AuthError::Unreachable(e.to_string()))?;

        let credential = credential_from_response(body)?;
        debug!(expires_on = credential.expires_on, "obtained access token");
        Ok(credential)
    }

    /// Run a GraphQL query with the given token.
    pub async fn query(
        &self,
        graphql: &str,
        credential: &Credential,
    ) -> Result<Option<Value>, SourceError> {
        let sent = self
            .http
            .post(&self.config.api_url)
            .bearer_auth(&credential.access_token)
            .json(&serde_json::json!({ "query": graphql }))
            .send()
            .await;

        let payload = json_or_absent(sent, "graphql").await?;

        if let Some(errors) = payload.as_ref().and_then(|p| p.get("errors"))
            && errors.as_array().is_some_and(|e| !e.is_empty())
        {
            warn!(errors = %errors, "GraphQL query returned errors");
        }

        Ok(payload)
    }
}

/// Turn a token endpoint response into a credential.
fn credential_from_response(body: Value) -> Result<Credential, AuthError> {
    let has_token = body
        .get("access_token")
        .and_then(Value::as_str)
        .is_some_and(|t| !t.is_empty());
    if !has_token {
        return Err(AuthError::MissingToken);
    }

    serde_json::from_value(body).map_err(|e| AuthError::Unreachable(e.to_string()))
}

impl TokenIssuer for RnvClient {
    async fn issue_token(&self) -> Result<Credential, AuthError> {
        self.request_access_token().await
    }
}

impl DepartureSource for RnvClient {
    fn window_policy(&self) -> WindowPolicy {
        WindowPolicy::Dynamic
    }

    fn needs_credential(&self) -> bool {
        true
    }

    async fn fetch(&self, request: &FetchRequest<'_>) -> Result<Option<RawPayload>, SourceError> {
        let credential = request
            .credential
            .ok_or(SourceError::MissingCredential { backend: "rnv" })?;

        let graphql = station_journeys(request.query.station_id(), &request.window);
        let payload = self.query(&graphql, credential).await?;
        Ok(payload.map(RawPayload::StationJourneys))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config() -> RnvConfig {
        RnvConfig::new("tenant", "client", "secret", "resource")
    }

    #[test]
    fn config_defaults() {
        let config = config();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(
            config.oauth_url,
            "https://login.microsoftonline.com/tenant/oauth2/token"
        );
        assert_eq!(config.timeout_secs, 10);
    }

    #[test]
    fn config_builder() {
        let config = config()
            .with_api_url("http://localhost:4000/")
            .with_oauth_url("http://localhost:4001/token")
            .with_timeout(2);

        assert_eq!(config.api_url, "http://localhost:4000/");
        assert_eq!(config.oauth_url, "http://localhost:4001/token");
        assert_eq!(config.timeout_secs, 2);
    }

    #[test]
    fn debug_redacts_secret() {
        assert!(!format!("{:?}", config()).contains("secret\""));
        assert!(format!("{:?}", config()).contains("<redacted>"));
    }

    #[test]
    fn token_response_is_parsed() {
        let body = json!({
            "token_type": "Bearer",
            "expires_on": "1700003600",
            "access_token": "abc"
        });
        let credential = credential_from_response(body).unwrap();
        assert_eq!(credential.access_token, "abc");
        assert_eq!(credential.expires_on, 1_700_003_600);
    }

    #[test]
    fn token_response_without_token_is_rejected() {
        let body = json!({"error": "invalid_client"});
        assert_eq!(credential_from_response(body), Err(AuthError::MissingToken));

        let body = json!({"access_token": ""});
        assert_eq!(credential_from_response(body), Err(AuthError::MissingToken));
    }

    #[tokio::test]
    async fn fetch_without_credential_fails() {
        use crate::domain::{Locale, StationQuery};
        use crate::source::QueryWindow;

        let client = RnvClient::new(config()).unwrap();
        let query = StationQuery::new("2417").unwrap();
        let window = QueryWindow::for_policy(
            WindowPolicy::Dynamic,
            chrono::Utc::now(),
            &Locale::default(),
        );
        let request = FetchRequest {
            query: &query,
            window,
            credential: None,
        };

        let err = client.fetch(&request).await.unwrap_err();
        assert!(matches!(err, SourceError::MissingCredential { backend: "rnv" }));
    }
}
