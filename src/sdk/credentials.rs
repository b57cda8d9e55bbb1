//! Credential resolution for the portal API.
//!
//! Exactly one authentication mode is chosen per client:
//! 1. Header mode - a `Basic` authorization value computed locally
//! 2. Session mode - login + session exchange, cookies held by [`SessionStore`]

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};
use crate::sdk::session::SessionStore;

/// Scheme prefix for header-mode authorization.
const AUTH_SCHEME: &str = "Basic ";

/// How the client authenticates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    #[default]
    Header,
    Session,
}

/// Raw credentials supplied by the caller.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    UserPassword { username: String, password: String },
    Secret(String),
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UserPassword { username, .. } => f
                .debug_struct("UserPassword")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::Secret(_) => f.debug_tuple("Secret").field(&"<redacted>").finish(),
        }
    }
}

impl Credentials {
    /// Pick credentials from optional inputs.
    ///
    /// A non-empty secret wins; otherwise both username and password must be
    /// non-empty.
    pub fn resolve(
        username: Option<&str>,
        password: Option<&str>,
        secret: Option<&str>,
    ) -> Result<Self> {
        let non_empty = |v: Option<&str>| v.filter(|s| !s.is_empty()).map(String::from);

        if let Some(secret) = non_empty(secret) {
            return Ok(Self::Secret(secret));
        }

        match (non_empty(username), non_empty(password)) {
            (Some(username), Some(password)) => Ok(Self::UserPassword { username, password }),
            _ => Err(Error::InvalidCredentials(
                "either a secret or both username and password are required. Provide them via:\n\
                 1. --secret / PORTAL_SECRET\n\
                 2. --username and --password / PORTAL_USERNAME and PORTAL_PASSWORD"
                    .to_string(),
            )),
        }
    }

    /// Header-mode authorization value: scheme prefix plus base64 payload.
    pub fn header_value(&self) -> String {
        let raw = match self {
            Self::Secret(secret) => secret.clone(),
            Self::UserPassword { username, password } => format!("{}:{}", username, password),
        };
        format!("{}{}", AUTH_SCHEME, STANDARD.encode(raw))
    }
}

/// Resolved authorization attached to every request.
#[derive(Debug, Clone)]
pub enum Authorization {
    /// Static `Authorization` header.
    Header(HeaderValue),
    /// Cookies held by the session store; nothing to add per request.
    Session(SessionStore),
}

impl Authorization {
    /// Build header-mode authorization without touching the network.
    pub fn header(credentials: &Credentials) -> Result<Self> {
        let mut value = HeaderValue::from_str(&credentials.header_value())
            .map_err(|e| Error::InvalidCredentials(format!("unusable header value: {}", e)))?;
        value.set_sensitive(true);
        Ok(Self::Header(value))
    }

    /// Add whatever this authorization contributes to outgoing headers.
    pub fn apply(&self, headers: &mut HeaderMap) {
        if let Self::Header(value) = self {
            headers.insert(AUTHORIZATION, value.clone());
        }
    }

    pub fn mode(&self) -> AuthMode {
        match self {
            Self::Header(_) => AuthMode::Header,
            Self::Session(_) => AuthMode::Session,
        }
    }

    pub fn session(&self) -> Option<&SessionStore> {
        match self {
            Self::Session(store) => Some(store),
            Self::Header(_) => None,
        }
    }
}
