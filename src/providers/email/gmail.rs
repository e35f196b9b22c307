//! Gmail API provider implementation.
//!
//! This module provides a [`MailProvider`] implementation using the Gmail REST
//! API.
//!
//! # Authentication
//!
//! Credentials live in a `token.json` file managed by [`TokenStore`]. On
//! [`GmailProvider::authenticate`] the stored access token is reused while it
//! is valid; otherwise it is refreshed through the OAuth token endpoint and
//! written back to the file.
//!
//! # API Usage
//!
//! This provider uses the Gmail API v1:
//! - `users.messages.list` for listing message ids in a mailbox
//! - `users.messages.get` for fetching headers and snippet
//! - `users.messages.modify` for the unread marker and folder labels
//! - `users.labels.list` for resolving folder names

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE, RETRY_AFTER};
use serde::{Deserialize, Serialize};

use super::{MailProvider, MessageHeader, ProviderError, ProviderMessage, Result};
use crate::domain::{system_labels, EmailId, Label, LabelId};
use crate::storage::{AuthorizedUser, TokenStore};

/// Default Gmail API base for the authenticated user.
pub const GMAIL_API_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

/// OAuth scopes the token must carry.
pub const GMAIL_SCOPES: [&str; 3] = [
    "https://www.googleapis.com/auth/gmail.readonly",
    "https://www.googleapis.com/auth/gmail.modify",
    "https://www.googleapis.com/auth/gmail.labels",
];

/// Gmail API message list response.
#[derive(Debug, Deserialize)]
struct MessageListResponse {
    messages: Option<Vec<GmailMessageRef>>,
}

#[derive(Debug, Deserialize)]
struct GmailMessageRef {
    id: String,
}

/// Gmail API message resource (`format=full`).
#[derive(Debug, Deserialize)]
struct GmailMessage {
    id: String,
    snippet: Option<String>,
    payload: Option<GmailMessagePayload>,
}

#[derive(Debug, Deserialize)]
struct GmailMessagePayload {
    headers: Option<Vec<GmailHeader>>,
}

#[derive(Debug, Deserialize)]
struct GmailHeader {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct GmailLabel {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct LabelsListResponse {
    labels: Option<Vec<GmailLabel>>,
}

/// Gmail modify request body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ModifyRequest {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    add_label_ids: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    remove_label_ids: Vec<String>,
}

/// OAuth token response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

impl From<GmailMessage> for ProviderMessage {
    fn from(msg: GmailMessage) -> Self {
        let headers = msg
            .payload
            .and_then(|p| p.headers)
            .unwrap_or_default()
            .into_iter()
            .map(|h| MessageHeader::new(h.name, h.value))
            .collect();

        ProviderMessage {
            id: EmailId::from(msg.id),
            headers,
            snippet: msg.snippet.unwrap_or_default(),
        }
    }
}

/// Gmail API provider.
///
/// # Example
///
/// ```ignore
/// use mailrules::providers::email::{GmailProvider, MailProvider};
/// use mailrules::storage::TokenStore;
///
/// let mut provider = GmailProvider::new(TokenStore::new("token.json"));
/// provider.authenticate().await?;
///
/// let ids = provider.list_message_ids("INBOX", 10).await?;
/// ```
pub struct GmailProvider {
    /// HTTP client for API requests.
    client: reqwest::Client,
    /// Where the OAuth credentials are persisted.
    token_store: TokenStore,
    /// Base URL every endpoint is appended to.
    api_base: String,
    /// Overrides the token file's `token_uri` when set.
    token_url: Option<String>,
    /// Current OAuth access token.
    access_token: Option<String>,
    /// Whether the provider is authenticated.
    authenticated: bool,
}

impl GmailProvider {
    /// Creates a provider backed by the given token file.
    ///
    /// The provider is not authenticated until [`authenticate`](Self::authenticate) is called.
    pub fn new(token_store: TokenStore) -> Self {
        Self {
            client: reqwest::Client::new(),
            token_store,
            api_base: GMAIL_API_BASE.to_string(),
            token_url: None,
            access_token: None,
            authenticated: false,
        }
    }

    /// Points API requests at a different base URL.
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Refreshes tokens through `token_url` instead of the file's `token_uri`.
    pub fn with_token_url(mut self, token_url: Option<String>) -> Self {
        self.token_url = token_url;
        self
    }

    /// Returns whether the provider is currently authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Loads stored credentials, refreshing and persisting them if the access
    /// token has expired.
    pub async fn authenticate(&mut self) -> Result<()> {
        tracing::debug!(path = %self.token_store.path().display(), "Loading OAuth token");
        let mut user = self
            .token_store
            .load()
            .await
            .map_err(|e| ProviderError::Authentication(e.to_string()))?;

        if user.is_expired(Utc::now()) {
            tracing::info!("Access token expired, refreshing");
            self.refresh_access_token(&mut user).await?;
            self.token_store
                .save(&user)
                .await
                .map_err(|e| ProviderError::Internal(format!("persist token: {}", e)))?;
        }

        let missing: Vec<&str> = GMAIL_SCOPES
            .iter()
            .copied()
            .filter(|s| !user.scopes.iter().any(|granted| granted == s))
            .collect();
        if !user.scopes.is_empty() && !missing.is_empty() {
            tracing::warn!(?missing, "Token is missing expected scopes");
        }

        self.access_token = user.token;
        self.authenticated = true;
        tracing::debug!("Gmail provider authenticated");
        Ok(())
    }

    /// Exchanges the refresh token for a new access token.
    async fn refresh_access_token(&self, user: &mut AuthorizedUser) -> Result<()> {
        let token_url = self.token_url.as_deref().unwrap_or(&user.token_uri);

        let params = [
            ("client_id", user.client_id.as_str()),
            ("client_secret", user.client_secret.as_str()),
            ("refresh_token", user.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .client
            .post(token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Authentication(format!(
                "token refresh failed ({}): {}",
                status, body
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Internal(format!("parse token response: {}", e)))?;

        user.token = Some(token_response.access_token);
        user.expiry = token_response
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
        Ok(())
    }

    fn ensure_authenticated(&self) -> Result<()> {
        if self.authenticated {
            Ok(())
        } else {
            Err(ProviderError::Authentication(
                "not authenticated".to_string(),
            ))
        }
    }

    /// Builds authorization headers for API requests.
    fn auth_headers(&self) -> Result<HeaderMap> {
        let token = self
            .access_token
            .as_ref()
            .ok_or_else(|| ProviderError::Authentication("not authenticated".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|e| ProviderError::Internal(format!("invalid header: {}", e)))?,
        );
        Ok(headers)
    }

    /// Makes an authenticated GET request to the Gmail API.
    async fn get<T: for<'de> Deserialize<'de>>(
        &self,
        endpoint: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        self.ensure_authenticated()?;
        let url = format!("{}{}", self.api_base, endpoint);
        let headers = self.auth_headers()?;

        let response = self
            .client
            .get(&url)
            .headers(headers)
            .query(query)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        self.handle_response(response).await
    }

    /// Makes an authenticated POST request whose response body is ignored.
    async fn post_no_response<B: Serialize>(&self, endpoint: &str, body: &B) -> Result<()> {
        self.ensure_authenticated()?;
        let url = format!("{}{}", self.api_base, endpoint);
        let mut headers = self.auth_headers()?;
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(self.handle_error(response).await);
        }
        Ok(())
    }

    /// Handles API response, checking for errors.
    async fn handle_response<T: for<'de> Deserialize<'de>>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if !response.status().is_success() {
            return Err(self.handle_error(response).await);
        }

        response
            .json()
            .await
            .map_err(|e| ProviderError::Internal(format!("parse response: {}", e)))
    }

    /// Handles API error responses.
    async fn handle_error(&self, response: reqwest::Response) -> ProviderError {
        let status = response.status();
        let retry_after_secs = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok());
        let body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            401 => ProviderError::Authentication(format!("unauthorized: {}", body)),
            404 => ProviderError::NotFound(body),
            429 => ProviderError::RateLimited { retry_after_secs },
            _ => ProviderError::Internal(format!("API error ({}): {}", status, body)),
        }
    }

    async fn modify(&self, id: &EmailId, body: ModifyRequest) -> Result<()> {
        let endpoint = format!("/messages/{}/modify", id);
        self.post_no_response(&endpoint, &body).await
    }
}

#[async_trait]
impl MailProvider for GmailProvider {
    async fn list_message_ids(&self, folder: &str, max_results: u32) -> Result<Vec<EmailId>> {
        let query = [
            ("labelIds", folder.to_string()),
            ("maxResults", max_results.to_string()),
        ];
        let response: MessageListResponse = self.get("/messages", &query).await?;

        let ids: Vec<EmailId> = response
            .messages
            .unwrap_or_default()
            .into_iter()
            .map(|m| EmailId::from(m.id))
            .collect();

        tracing::debug!(folder, count = ids.len(), "Listed messages");
        Ok(ids)
    }

    async fn get_message(&self, id: &EmailId) -> Result<ProviderMessage> {
        let endpoint = format!("/messages/{}", id);
        let message: GmailMessage = self
            .get(&endpoint, &[("format", "full".to_string())])
            .await?;
        Ok(message.into())
    }

    async fn set_unread_label(&self, id: &EmailId, add: bool) -> Result<()> {
        let unread = system_labels::unread().0;
        let body = if add {
            ModifyRequest {
                add_label_ids: vec![unread],
                remove_label_ids: vec![],
            }
        } else {
            ModifyRequest {
                add_label_ids: vec![],
                remove_label_ids: vec![unread],
            }
        };

        self.modify(id, body).await
    }

    async fn add_label(&self, id: &EmailId, label_id: &LabelId) -> Result<()> {
        let body = ModifyRequest {
            add_label_ids: vec![label_id.0.clone()],
            remove_label_ids: vec![],
        };

        self.modify(id, body).await
    }

    async fn list_labels(&self) -> Result<Vec<Label>> {
        let response: LabelsListResponse = self.get("/labels", &[]).await?;

        Ok(response
            .labels
            .unwrap_or_default()
            .into_iter()
            .map(|l| Label::new(l.id, l.name))
            .collect())
    }
}
