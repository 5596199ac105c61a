//! Native Google API client over reqwest.
//!
//! Token format is compatible with the `token.json` written by Google's
//! Python auth library, so an existing token can be dropped in place.
//!
//! Modules:
//! - auth: OAuth2 browser consent flow
//! - token_store: token.json persistence
//! - gmail: Gmail API v1 (thread search, labels, send)
//! - drive: Drive API v3 (lookup, thumbnails, staging uploads)
//! - docs: Docs API v1 (structure read, batchUpdate rewrite)

pub mod auth;
pub mod docs;
pub mod drive;
pub mod gmail;
pub mod token_store;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Google OAuth2 scopes the report run needs.
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/gmail.modify",
    "https://www.googleapis.com/auth/gmail.send",
    "https://www.googleapis.com/auth/drive",
    "https://www.googleapis.com/auth/documents",
];

// ============================================================================
// Token types
// ============================================================================

/// OAuth2 token payload persisted in token.json.
///
/// Both `token` and `access_token` are accepted on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GoogleToken {
    #[serde(alias = "access_token")]
    pub token: String,
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// RFC 3339
    #[serde(default)]
    pub expiry: Option<String>,
    #[serde(default, alias = "email")]
    pub account: Option<String>,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

/// OAuth2 client credentials from credentials.json (Desktop App type).
#[derive(Debug, Clone, Deserialize)]
pub struct ClientCredentials {
    pub installed: InstalledAppCredentials,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InstalledAppCredentials {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub auth_uri: String,
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

// ============================================================================
// Error type
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GoogleApiError {
    #[error("HTTP: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Token expired or revoked")]
    AuthExpired,
    #[error("Credentials not found at {0}")]
    CredentialsNotFound(PathBuf),
    #[error("Token not found at {0}")]
    TokenNotFound(PathBuf),
    #[error("Token refresh failed: {0}")]
    RefreshFailed(String),
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("OAuth flow cancelled")]
    FlowCancelled,
    #[error("Invalid credentials format: {0}")]
    InvalidCredentials(String),
}

/// Map a non-success response to an error; pass successes through.
/// Requests are sent once, never retried.
pub async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, GoogleApiError> {
    let status = resp.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(GoogleApiError::AuthExpired);
    }
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(GoogleApiError::ApiError {
            status: status.as_u16(),
            message: body,
        });
    }
    Ok(resp)
}

// ============================================================================
// Paths and credentials
// ============================================================================

/// Directory holding credentials.json and token.json.
pub fn google_dir() -> PathBuf {
    crate::state::state_dir().join("google")
}

pub fn token_path() -> PathBuf {
    google_dir().join("token.json")
}

pub fn credentials_path() -> PathBuf {
    google_dir().join("credentials.json")
}

/// Load the OAuth client from credentials.json.
pub fn load_credentials() -> Result<ClientCredentials, GoogleApiError> {
    let path = credentials_path();
    if !path.exists() {
        return Err(GoogleApiError::CredentialsNotFound(path));
    }
    let content = std::fs::read_to_string(&path)?;
    serde_json::from_str(&content)
        .map_err(|e| GoogleApiError::InvalidCredentials(format!("{}: {}", path.display(), e)))
}

// ============================================================================
// Token refresh
// ============================================================================

/// True when the token has no parseable expiry or expires within a minute.
pub fn is_token_expired(token: &GoogleToken) -> bool {
    let Some(expiry_str) = token.expiry.as_deref() else {
        return true;
    };
    match chrono::DateTime::parse_from_rfc3339(expiry_str) {
        Ok(expiry) => expiry <= chrono::Utc::now() + chrono::Duration::seconds(60),
        Err(_) => true,
    }
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Exchange the refresh token for a new access token and persist it.
pub async fn refresh_access_token(token: &GoogleToken) -> Result<GoogleToken, GoogleApiError> {
    let refresh_token = token
        .refresh_token
        .as_deref()
        .ok_or(GoogleApiError::AuthExpired)?;

    let mut form = vec![
        ("client_id", token.client_id.as_str()),
        ("refresh_token", refresh_token),
        ("grant_type", "refresh_token"),
    ];
    if let Some(secret) = token.client_secret.as_deref() {
        form.push(("client_secret", secret));
    }

    let resp = reqwest::Client::new()
        .post(&token.token_uri)
        .form(&form)
        .send()
        .await?;
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    if !status.is_success() {
        return Err(map_refresh_error(status.as_u16(), &body));
    }

    let refreshed: RefreshResponse = serde_json::from_str(&body)
        .map_err(|e| GoogleApiError::RefreshFailed(format!("Malformed token response: {}", e)))?;
    let expiry =
        chrono::Utc::now() + chrono::Duration::seconds(refreshed.expires_in.unwrap_or(3600));

    let mut new_token = token.clone();
    new_token.token = refreshed.access_token;
    new_token.expiry = Some(expiry.to_rfc3339());
    token_store::save_token(&new_token)?;
    log::debug!("Refreshed Google access token (expires {})", expiry);

    Ok(new_token)
}

fn map_refresh_error(status: u16, body: &str) -> GoogleApiError {
    let lowered = body.to_lowercase();
    if (status == 400 || status == 401)
        && (lowered.contains("invalid_grant") || lowered.contains("token has been expired"))
    {
        return GoogleApiError::AuthExpired;
    }
    GoogleApiError::RefreshFailed(format!("HTTP {}: {}", status, body))
}

/// Load the stored token, refreshing it first if it is about to expire.
pub async fn get_valid_access_token() -> Result<String, GoogleApiError> {
    let token = token_store::load_token()?;
    if is_token_expired(&token) {
        Ok(refresh_access_token(&token).await?.token)
    } else {
        Ok(token.token)
    }
}
