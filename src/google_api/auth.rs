//! OAuth2 browser consent flow.
//!
//! Opens the browser for consent, captures the redirect on a localhost
//! listener, exchanges the code for tokens and stores them in token.json.

use std::io::{Read, Write};
use std::net::TcpListener;

use serde::Deserialize;

use super::{gmail, load_credentials, token_store, GoogleApiError, GoogleToken, SCOPES};

#[derive(Debug, Deserialize)]
struct CodeExchangeResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
}

/// Run the consent flow and persist the resulting token.
///
/// Returns the authenticated email address.
pub async fn run_consent_flow() -> Result<String, GoogleApiError> {
    let creds = load_credentials()?;
    let installed = &creds.installed;

    let listener = TcpListener::bind("127.0.0.1:0")?;
    let redirect_uri = format!("http://localhost:{}", listener.local_addr()?.port());

    let auth_url = authorization_url(&installed.auth_uri, &installed.client_id, &redirect_uri)?;
    log::info!("Opening browser for Google consent");
    if let Err(e) = open::that(auth_url.as_str()) {
        log::warn!("Could not open browser ({}). Visit: {}", e, auth_url);
    }

    let code = wait_for_auth_code(&listener)?;

    let mut form = vec![
        ("code", code.as_str()),
        ("client_id", installed.client_id.as_str()),
        ("redirect_uri", redirect_uri.as_str()),
        ("grant_type", "authorization_code"),
    ];
    if let Some(secret) = installed.client_secret.as_deref() {
        form.push(("client_secret", secret));
    }

    let client = reqwest::Client::new();
    let resp = client.post(&installed.token_uri).form(&form).send().await?;
    if !resp.status().is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(GoogleApiError::RefreshFailed(format!(
            "Token exchange failed: {}",
            body
        )));
    }
    let exchanged: CodeExchangeResponse = resp.json().await?;
    let expiry =
        chrono::Utc::now() + chrono::Duration::seconds(exchanged.expires_in.unwrap_or(3600));

    let email = gmail::fetch_profile_email(&client, &exchanged.access_token).await?;

    let token = GoogleToken {
        token: exchanged.access_token,
        refresh_token: exchanged.refresh_token,
        token_uri: installed.token_uri.clone(),
        client_id: installed.client_id.clone(),
        client_secret: installed.client_secret.clone(),
        scopes: SCOPES.iter().map(|s| s.to_string()).collect(),
        expiry: Some(expiry.to_rfc3339()),
        account: Some(email.clone()),
    };
    token_store::save_token(&token)?;
    log::info!("Authorized as {}", email);

    Ok(email)
}

fn authorization_url(
    auth_uri: &str,
    client_id: &str,
    redirect_uri: &str,
) -> Result<url::Url, GoogleApiError> {
    let mut url = url::Url::parse(auth_uri)
        .map_err(|e| GoogleApiError::InvalidCredentials(format!("auth_uri: {}", e)))?;
    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("redirect_uri", redirect_uri)
        .append_pair("response_type", "code")
        .append_pair("scope", &SCOPES.join(" "))
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent");
    Ok(url)
}

/// Block until the browser redirect arrives; return its `code` parameter.
fn wait_for_auth_code(listener: &TcpListener) -> Result<String, GoogleApiError> {
    let (mut stream, _) = listener.accept()?;

    let mut buffer = [0u8; 4096];
    let n = stream.read(&mut buffer)?;
    let request = String::from_utf8_lossy(&buffer[..n]);

    match code_from_request_line(request.lines().next().unwrap_or_default()) {
        Some(code) => {
            send_response(&mut stream, "Authorized. You can close this tab.");
            Ok(code)
        }
        None => {
            send_response(&mut stream, "Authorization was not granted. You can close this tab.");
            Err(GoogleApiError::FlowCancelled)
        }
    }
}

/// Extract `code` from `GET /?code=...&scope=... HTTP/1.1`.
fn code_from_request_line(line: &str) -> Option<String> {
    let path = line.split_whitespace().nth(1)?;
    let url = url::Url::parse(&format!("http://localhost{}", path)).ok()?;
    url.query_pairs()
        .find(|(key, _)| key == "code")
        .map(|(_, value)| value.into_owned())
        .filter(|code| !code.is_empty())
}

fn send_response(stream: &mut impl Write, message: &str) {
    let body = format!(
        "<html><body style=\"font-family: sans-serif; text-align: center; padding: 40px;\"><h2>{}</h2></body></html>",
        message
    );
    let response = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/html\r\nContent-Length: {}\r\n\r\n{}",
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}
