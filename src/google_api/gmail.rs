//! Gmail API v1: thread search, read-state, sending.
//!
//! Thread search lists thread IDs for a query, then fetches each thread in
//! `format=full` and walks its MIME tree for the text and HTML bodies.

use base64::Engine;
use serde::Deserialize;

use super::{check_status, GoogleApiError};

const GMAIL_BASE: &str = "https://gmail.googleapis.com/gmail/v1/users/me";

// ============================================================================
// API response types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadListResponse {
    #[serde(default)]
    threads: Vec<ThreadStub>,
}

#[derive(Debug, Deserialize)]
struct ThreadStub {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ThreadDetail {
    #[serde(default)]
    messages: Vec<MessageDetail>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageDetail {
    #[serde(default)]
    id: String,
    #[serde(default)]
    label_ids: Vec<String>,
    #[serde(default)]
    payload: Option<MessagePart>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagePart {
    #[serde(default)]
    mime_type: String,
    #[serde(default)]
    headers: Vec<Header>,
    #[serde(default)]
    body: Option<PartBody>,
    #[serde(default)]
    parts: Vec<MessagePart>,
}

#[derive(Debug, Deserialize)]
struct Header {
    #[serde(default)]
    name: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct PartBody {
    #[serde(default)]
    data: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProfileResponse {
    email_address: String,
}

// ============================================================================
// Public types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GmailMessage {
    pub id: String,
    pub subject: String,
    /// Empty when the message has no text/plain part.
    pub plain_body: String,
    /// Empty when the message has no text/html part.
    pub html_body: String,
    pub unread: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GmailThread {
    pub messages: Vec<GmailMessage>,
}

impl From<MessageDetail> for GmailMessage {
    fn from(detail: MessageDetail) -> Self {
        let (subject, plain_body, html_body) = match &detail.payload {
            Some(payload) => (
                payload
                    .headers
                    .iter()
                    .find(|h| h.name.eq_ignore_ascii_case("Subject"))
                    .map(|h| h.value.clone())
                    .unwrap_or_default(),
                find_body(payload, "text/plain").unwrap_or_default(),
                find_body(payload, "text/html").unwrap_or_default(),
            ),
            None => Default::default(),
        };
        GmailMessage {
            unread: detail.label_ids.iter().any(|l| l == "UNREAD"),
            id: detail.id,
            subject,
            plain_body,
            html_body,
        }
    }
}

// ============================================================================
// Queries
// ============================================================================

/// Gmail search string for a subject phrase within the last `newer_than_days`.
pub fn build_search_query(subject: &str, newer_than_days: u32, unread_only: bool) -> String {
    let mut query = format!(
        "subject:\"{}\" newer_than:{}d",
        subject.replace('"', ""),
        newer_than_days
    );
    if unread_only {
        query.push_str(" is:unread");
    }
    query
}

/// Threads matching `query`, newest first, each with all its messages.
pub async fn search_threads(
    client: &reqwest::Client,
    access_token: &str,
    query: &str,
    max_results: u32,
) -> Result<Vec<GmailThread>, GoogleApiError> {
    let resp = client
        .get(format!("{}/threads", GMAIL_BASE))
        .bearer_auth(access_token)
        .query(&[("q", query), ("maxResults", &max_results.to_string())])
        .send()
        .await?;
    let list: ThreadListResponse = check_status(resp).await?.json().await?;
    log::debug!("Gmail query {:?} matched {} threads", query, list.threads.len());

    let mut threads = Vec::with_capacity(list.threads.len());
    for stub in &list.threads {
        threads.push(fetch_thread(client, access_token, &stub.id).await?);
    }
    Ok(threads)
}

async fn fetch_thread(
    client: &reqwest::Client,
    access_token: &str,
    thread_id: &str,
) -> Result<GmailThread, GoogleApiError> {
    let resp = client
        .get(format!("{}/threads/{}", GMAIL_BASE, thread_id))
        .bearer_auth(access_token)
        .query(&[("format", "full")])
        .send()
        .await?;
    let detail: ThreadDetail = check_status(resp).await?.json().await?;
    Ok(GmailThread {
        messages: detail.messages.into_iter().map(GmailMessage::from).collect(),
    })
}

/// Remove the UNREAD label from one message.
pub async fn mark_read(
    client: &reqwest::Client,
    access_token: &str,
    message_id: &str,
) -> Result<(), GoogleApiError> {
    let resp = client
        .post(format!("{}/messages/{}/modify", GMAIL_BASE, message_id))
        .bearer_auth(access_token)
        .json(&serde_json::json!({ "removeLabelIds": ["UNREAD"] }))
        .send()
        .await?;
    check_status(resp).await?;
    Ok(())
}

/// Send an HTML email from the authenticated account.
pub async fn send_html(
    client: &reqwest::Client,
    access_token: &str,
    to: &str,
    subject: &str,
    html: &str,
) -> Result<(), GoogleApiError> {
    let raw = build_raw_html_message(to, subject, html);
    let resp = client
        .post(format!("{}/messages/send", GMAIL_BASE))
        .bearer_auth(access_token)
        .json(&serde_json::json!({ "raw": raw }))
        .send()
        .await?;
    check_status(resp).await?;
    log::info!("Sent \"{}\" to {}", subject, to);
    Ok(())
}

/// Email address of the authenticated account.
pub async fn fetch_profile_email(
    client: &reqwest::Client,
    access_token: &str,
) -> Result<String, GoogleApiError> {
    let resp = client
        .get(format!("{}/profile", GMAIL_BASE))
        .bearer_auth(access_token)
        .send()
        .await?;
    let profile: ProfileResponse = check_status(resp).await?.json().await?;
    Ok(profile.email_address)
}

// ============================================================================
// MIME helpers
// ============================================================================

/// RFC 822 message with an HTML body, URL-safe base64 encoded for `raw`.
pub fn build_raw_html_message(to: &str, subject: &str, html: &str) -> String {
    let std_engine = &base64::engine::general_purpose::STANDARD;
    let encoded_subject = format!("=?UTF-8?B?{}?=", std_engine.encode(subject));
    let encoded_body = std_engine.encode(html);

    let mut message = format!(
        "To: {}\r\nSubject: {}\r\nMIME-Version: 1.0\r\nContent-Type: text/html; charset=UTF-8\r\nContent-Transfer-Encoding: base64\r\n\r\n",
        to, encoded_subject
    );
    // RFC 2045 caps encoded lines at 76 characters
    for chunk in encoded_body.as_bytes().chunks(76) {
        message.push_str(&String::from_utf8_lossy(chunk));
        message.push_str("\r\n");
    }

    base64::engine::general_purpose::URL_SAFE.encode(message)
}

/// Depth-first search for the first part of `target_mime` with body data.
fn find_body(part: &MessagePart, target_mime: &str) -> Option<String> {
    if part.mime_type.eq_ignore_ascii_case(target_mime) {
        if let Some(data) = part.body.as_ref().and_then(|b| b.data.as_deref()) {
            return decode_url_safe_base64(data);
        }
    }
    part.parts
        .iter()
        .find_map(|child| find_body(child, target_mime))
}

/// Decode Gmail's URL-safe base64, with or without padding.
fn decode_url_safe_base64(data: &str) -> Option<String> {
    base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(data.trim_end_matches('='))
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
}
