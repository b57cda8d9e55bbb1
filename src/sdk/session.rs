//! Session-mode authentication and its cookie jar.

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Method, Url};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::sdk::credentials::Credentials;
use crate::sdk::transport::RetryingTransport;
use crate::sdk::types::HEADER_REQUEST_ID;

/// In-memory per-host cookie jar.
///
/// The jar synchronizes internally; clones share the same cookies.
#[derive(Clone, Default)]
pub struct SessionStore {
    jar: Arc<Jar>,
}

impl fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionStore").finish_non_exhaustive()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn jar(&self) -> Arc<Jar> {
        Arc::clone(&self.jar)
    }

    /// The `Cookie` header value that would be sent to `url`, if any.
    pub fn cookies_for(&self, url: &str) -> Option<String> {
        let url = Url::parse(url).ok()?;
        self.jar
            .cookies(&url)
            .and_then(|value| value.to_str().ok().map(String::from))
    }
}

/// Login request body.
#[derive(Debug, Serialize)]
#[serde(untagged)]
enum LoginRequest<'a> {
    UserPassword {
        #[serde(rename = "userName")]
        user_name: &'a str,
        password: &'a str,
    },
    Secret {
        secret: &'a str,
    },
}

impl<'a> From<&'a Credentials> for LoginRequest<'a> {
    fn from(credentials: &'a Credentials) -> Self {
        match credentials {
            Credentials::UserPassword { username, password } => Self::UserPassword {
                user_name: username,
                password,
            },
            Credentials::Secret(secret) => Self::Secret { secret },
        }
    }
}

/// Log in and exchange the login token for a session.
///
/// Cookies set by either response land in the transport's jar and ride along
/// on every later request.
pub async fn establish_session(
    transport: &RetryingTransport,
    api_url: &str,
    credentials: &Credentials,
) -> Result<()> {
    let login_body = serde_json::to_string(&LoginRequest::from(credentials))
        .map_err(|e| Error::AuthenticationFailed(format!("could not encode login body: {}", e)))?;

    let login_url = format!("{}/login", api_url);
    let token = post_for_auth(transport, &login_url, login_body, "login").await?;
    debug!("Login accepted, exchanging for session");

    let session_url = format!("{}/sessions", api_url);
    post_for_auth(transport, &session_url, token, "session exchange").await?;

    info!("Session established with {}", api_url);
    Ok(())
}

/// POST a JSON body and return the response body on 2xx.
async fn post_for_auth(
    transport: &RetryingTransport,
    url: &str,
    body: String,
    step: &str,
) -> Result<String> {
    let request_id = Uuid::new_v4().to_string();
    let mut headers = HeaderMap::new();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        headers.insert(HEADER_REQUEST_ID, value);
    }

    let response = transport
        .execute(Method::POST, url, &headers, Some(&body))
        .await
        .map_err(|e| {
            Error::AuthenticationFailed(format!("{} request {} failed: {}", step, request_id, e))
        })?;

    let status = response.status();
    let text = response.text().await.map_err(|e| {
        Error::AuthenticationFailed(format!("{} response {} unreadable: {}", step, request_id, e))
    })?;

    if !status.is_success() {
        return Err(Error::AuthenticationFailed(format!(
            "{} returned {} (request {}): {}",
            step,
            status.as_u16(),
            request_id,
            text
        )));
    }

    Ok(text)
}
