//! Spotify authorization-code flow with a loopback redirect listener.
//!
//! The listener binds the host and port of the configured redirect URI,
//! answers exactly one callback carrying `code`/`error`, and is dropped.

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

use crate::config::SpotifyCredentials;
use crate::error::ServiceError;
use crate::services::error_message_from_body;

const SERVICE: &str = "Spotify";
const AUTHORIZE_URL: &str = "https://accounts.spotify.com/authorize";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";
pub const SCOPES: &str =
    "user-read-playback-state user-modify-playback-state user-read-currently-playing user-top-read";
/// Refresh this long before the server-side expiry.
const EXPIRY_SKEW: Duration = Duration::from_secs(60);

const CALLBACK_PAGE: &str = "<!DOCTYPE html><html><head><meta charset=\"utf-8\"><title>codebeat</title></head>\
<body style=\"font-family:sans-serif;text-align:center;margin-top:4rem\">\
<h1>Spotify connected</h1><p>You can close this tab and return to the terminal.</p></body></html>";

/// An access token and, when granted, its refresh token.
#[derive(Debug, Clone)]
pub struct SpotifyToken {
    pub access_token: String,
    pub refresh_token: Option<String>,
    expires_at: Instant,
}

impl SpotifyToken {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>, expires_in_secs: u64) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            expires_at: Instant::now() + Duration::from_secs(expires_in_secs),
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() + EXPIRY_SKEW >= self.expires_at
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

/// Runs the consent flow and the token endpoint calls for one app registration.
#[derive(Debug, Clone)]
pub struct SpotifyAuthorizer {
    http: reqwest::Client,
    credentials: SpotifyCredentials,
    token_url: String,
}

impl SpotifyAuthorizer {
    pub fn new(credentials: SpotifyCredentials, timeout: Duration) -> Self {
        Self::with_token_url(credentials, TOKEN_URL, timeout)
    }

    pub fn with_token_url(credentials: SpotifyCredentials, token_url: &str, timeout: Duration) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(crate::services::USER_AGENT)
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            http,
            credentials,
            token_url: token_url.to_string(),
        }
    }

    /// Consent page URL for `state`.
    pub fn authorize_url(&self, state: &str) -> Result<Url, ServiceError> {
        let mut url = Url::parse(AUTHORIZE_URL).map_err(|e| auth_error(e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.credentials.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.credentials.redirect_uri)
            .append_pair("scope", SCOPES)
            .append_pair("state", state);
        Ok(url)
    }

    /// Full interactive flow: listen, hand the consent URL to `show_url`,
    /// wait up to `wait` for the redirect, then exchange the code.
    pub async fn authorize_interactive(
        &self,
        wait: Duration,
        show_url: impl FnOnce(&Url),
    ) -> Result<SpotifyToken, ServiceError> {
        let redirect = Url::parse(&self.credentials.redirect_uri)
            .map_err(|e| auth_error(format!("invalid SPOTIFY_REDIRECT_URI: {e}")))?;
        let listener = bind_redirect_listener(&redirect).await?;
        let state = random_state();
        show_url(&self.authorize_url(&state)?);

        let code = tokio::time::timeout(wait, accept_callback(&listener, &state))
            .await
            .map_err(|_| {
                auth_error(format!(
                    "no authorization callback within {} seconds",
                    wait.as_secs()
                ))
            })??;
        self.exchange_code(&code).await
    }

    pub async fn exchange_code(&self, code: &str) -> Result<SpotifyToken, ServiceError> {
        self.token_request(&[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.credentials.redirect_uri.as_str()),
        ])
        .await
    }

    /// Trade a refresh token for a new access token. Spotify may omit a new
    /// refresh token, in which case the old one is kept.
    pub async fn refresh(&self, refresh_token: &str) -> Result<SpotifyToken, ServiceError> {
        let mut token = self
            .token_request(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .await?;
        if token.refresh_token.is_none() {
            token.refresh_token = Some(refresh_token.to_string());
        }
        Ok(token)
    }

    async fn token_request(&self, form: &[(&str, &str)]) -> Result<SpotifyToken, ServiceError> {
        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(form)
            .send()
            .await
            .map_err(|source| ServiceError::Http {
                service: SERVICE,
                source,
            })?;
        let status = response.status();
        let body = response.text().await.map_err(|source| ServiceError::Http {
            service: SERVICE,
            source,
        })?;
        if !status.is_success() {
            return Err(auth_error(error_message_from_body(&body)));
        }
        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| ServiceError::InvalidResponse {
                service: SERVICE,
                message: e.to_string(),
            })?;
        Ok(SpotifyToken::new(
            parsed.access_token,
            parsed.refresh_token,
            parsed.expires_in,
        ))
    }
}

fn auth_error(message: impl Into<String>) -> ServiceError {
    ServiceError::Auth {
        service: SERVICE,
        message: message.into(),
    }
}

/// Opaque anti-forgery value echoed back by the consent page.
pub fn random_state() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(24)
        .map(char::from)
        .collect()
}

async fn bind_redirect_listener(redirect: &Url) -> Result<TcpListener, ServiceError> {
    let host = redirect
        .host_str()
        .ok_or_else(|| auth_error("SPOTIFY_REDIRECT_URI has no host"))?;
    let port = redirect
        .port_or_known_default()
        .ok_or_else(|| auth_error("SPOTIFY_REDIRECT_URI has no port"))?;
    let addr = format!("{host}:{port}");
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| auth_error(format!("cannot listen on {addr}: {e}")))?;
    tracing::info!(%addr, "waiting for Spotify authorization callback");
    Ok(listener)
}

/// Serve connections until one carries the authorization result. Requests
/// without `code`/`error` or with the wrong `state` get a 404 and are ignored.
async fn accept_callback(listener: &TcpListener, expected_state: &str) -> Result<String, ServiceError> {
    loop {
        let (mut stream, peer) = listener
            .accept()
            .await
            .map_err(|e| auth_error(format!("callback listener failed: {e}")))?;
        tracing::debug!(%peer, "callback connection");
        let Some(target) = read_request_target(&mut stream).await else {
            continue;
        };
        match parse_callback(&target, expected_state) {
            Some(result) => {
                let _ = respond(&mut stream, "200 OK", CALLBACK_PAGE).await;
                return result;
            }
            None => {
                let _ = respond(&mut stream, "404 Not Found", "").await;
            }
        }
    }
}

async fn read_request_target(stream: &mut TcpStream) -> Option<String> {
    // Redirects are small GETs; the request line fits in one read.
    let mut buf = [0u8; 4096];
    let n = stream.read(&mut buf).await.ok()?;
    let request = String::from_utf8_lossy(&buf[..n]);
    let line = request.lines().next()?;
    let mut parts = line.split_whitespace();
    match (parts.next(), parts.next()) {
        (Some("GET"), Some(target)) => Some(target.to_string()),
        _ => None,
    }
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) -> std::io::Result<()> {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await
}

/// Interpret a callback request target such as `/callback?code=..&state=..`.
/// `None` unless the request carries the expected `state` and a code or an error.
fn parse_callback(target: &str, expected_state: &str) -> Option<Result<String, ServiceError>> {
    let url = Url::parse("http://localhost").ok()?.join(target).ok()?;
    let mut code = None;
    let mut state = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }

    // Stale or forged callbacks are treated like unrelated requests.
    if state.as_deref() != Some(expected_state) {
        if code.is_some() || error.is_some() {
            tracing::debug!("ignoring authorization callback with mismatched state");
        }
        return None;
    }
    if let Some(error) = error {
        return Some(Err(auth_error(format!("authorization denied: {error}"))));
    }
    code.map(Ok)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testsupport::{http_response, spawn_http_server};

    fn credentials(redirect_uri: &str) -> SpotifyCredentials {
        SpotifyCredentials {
            client_id: "client-id".into(),
            client_secret: "client-secret".into(),
            redirect_uri: redirect_uri.into(),
        }
    }

    #[test]
    fn authorize_url_carries_scopes_and_state() {
        let authorizer = SpotifyAuthorizer::new(
            credentials("http://127.0.0.1:8888/callback"),
            Duration::from_secs(5),
        );
        let url = authorizer.authorize_url("abc123").unwrap();
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(url.as_str().starts_with(AUTHORIZE_URL));
        assert!(pairs.contains(&("client_id".into(), "client-id".into())));
        assert!(pairs.contains(&("response_type".into(), "code".into())));
        assert!(pairs.contains(&("scope".into(), SCOPES.into())));
        assert!(pairs.contains(&("state".into(), "abc123".into())));
        assert!(pairs.contains(&(
            "redirect_uri".into(),
            "http://127.0.0.1:8888/callback".into()
        )));
    }

    #[test]
    fn callback_with_matching_state_yields_code() {
        let result = parse_callback("/callback?code=AQB%2Fxyz&state=s1", "s1").unwrap();
        assert_eq!(result.unwrap(), "AQB/xyz");
    }

    #[test]
    fn callbacks_with_wrong_or_missing_state_are_ignored() {
        assert!(parse_callback("/callback?code=c&state=other", "s1").is_none());
        assert!(parse_callback("/callback?code=c", "s1").is_none());
        assert!(parse_callback("/?error=x", "s1").is_none());
        assert!(parse_callback("/callback?error=access_denied&state=stale", "s1").is_none());
    }

    #[test]
    fn callback_error_is_reported() {
        let err = parse_callback("/callback?error=access_denied&state=s1", "s1")
            .unwrap()
            .unwrap_err();
        assert!(err.to_string().contains("access_denied"));
    }

    #[test]
    fn unrelated_requests_are_ignored() {
        assert!(parse_callback("/favicon.ico", "s1").is_none());
    }

    #[test]
    fn random_state_is_alphanumeric_and_varies() {
        let a = random_state();
        assert_eq!(a.len(), 24);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, random_state());
    }

    #[test]
    fn token_expiry_accounts_for_skew() {
        assert!(SpotifyToken::new("t", None, 30).is_expired());
        assert!(!SpotifyToken::new("t", None, 3600).is_expired());
    }

    #[tokio::test]
    async fn code_exchange_uses_basic_auth_and_form() {
        let server = spawn_http_server(vec![http_response(
            200,
            "",
            r#"{"access_token":"at","token_type":"Bearer","expires_in":3600,"refresh_token":"rt"}"#,
        )])
        .await;
        let authorizer = SpotifyAuthorizer::with_token_url(
            credentials("http://127.0.0.1:8888/callback"),
            &format!("{}/api/token", server.base_url()),
            Duration::from_secs(5),
        );
        let token = authorizer.exchange_code("the-code").await.unwrap();
        assert_eq!(token.access_token, "at");
        assert_eq!(token.refresh_token.as_deref(), Some("rt"));

        let requests = server.requests().await;
        // base64("client-id:client-secret")
        assert!(requests[0].contains("Basic Y2xpZW50LWlkOmNsaWVudC1zZWNyZXQ="));
        assert!(requests[0].contains("grant_type=authorization_code"));
        assert!(requests[0].contains("code=the-code"));
    }

    #[tokio::test]
    async fn refresh_keeps_previous_refresh_token() {
        let server = spawn_http_server(vec![http_response(
            200,
            "",
            r#"{"access_token":"fresh","expires_in":3600}"#,
        )])
        .await;
        let authorizer = SpotifyAuthorizer::with_token_url(
            credentials("http://127.0.0.1:8888/callback"),
            &format!("{}/api/token", server.base_url()),
            Duration::from_secs(5),
        );
        let token = authorizer.refresh("old-rt").await.unwrap();
        assert_eq!(token.access_token, "fresh");
        assert_eq!(token.refresh_token.as_deref(), Some("old-rt"));
    }

    #[tokio::test]
    async fn rejected_exchange_reports_oauth_error() {
        let server = spawn_http_server(vec![http_response(
            400,
            "",
            r#"{"error":"invalid_grant","error_description":"Invalid authorization code"}"#,
        )])
        .await;
        let authorizer = SpotifyAuthorizer::with_token_url(
            credentials("http://127.0.0.1:8888/callback"),
            &format!("{}/api/token", server.base_url()),
            Duration::from_secs(5),
        );
        let err = authorizer.exchange_code("bad").await.unwrap_err();
        assert!(err.to_string().contains("invalid_grant"));
    }

    async fn send_callback(addr: std::net::SocketAddr, target: &str) -> String {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(format!("GET {target} HTTP/1.1\r\nHost: localhost\r\n\r\n").as_bytes())
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn listener_skips_stale_callbacks_and_waits_for_the_real_one() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let browser = tokio::spawn(async move {
            let stale = send_callback(addr, "/?error=x").await;
            let forged = send_callback(addr, "/callback?code=evil&state=old").await;
            let real = send_callback(addr, "/callback?code=good&state=s1").await;
            (stale, forged, real)
        });

        let code = accept_callback(&listener, "s1").await.unwrap();
        assert_eq!(code, "good");
        let (stale, forged, real) = browser.await.unwrap();
        assert!(stale.starts_with("HTTP/1.1 404"));
        assert!(forged.starts_with("HTTP/1.1 404"));
        assert!(real.starts_with("HTTP/1.1 200"));
    }

    #[tokio::test]
    async fn interactive_flow_times_out_without_callback() {
        let authorizer = SpotifyAuthorizer::new(
            credentials("http://127.0.0.1:0/callback"),
            Duration::from_secs(5),
        );
        let mut shown = None;
        let err = authorizer
            .authorize_interactive(Duration::from_millis(50), |url| {
                shown = Some(url.to_string())
            })
            .await
            .unwrap_err();
        assert!(shown.unwrap().contains("state="));
        assert!(err.to_string().contains("no authorization callback"));
    }
}
