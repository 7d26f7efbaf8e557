//! Authentication schemes.
//!
//! A view runs its schemes in order. The first scheme that identifies a user
//! wins. A scheme whose credentials are simply absent (`MissingHeader`,
//! `NoSession`) lets the next one try; credentials that are present but
//! wrong fail the request immediately. When no scheme identifies a user the
//! request proceeds anonymously and permissions decide.

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use axum::http::header;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::request::{RequestContext, User};

/// Session key holding the authenticated user's id.
pub const SESSION_USER_KEY: &str = "user_id";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthFailure {
    #[error("missing authentication header")]
    MissingHeader,

    #[error("malformed authentication header")]
    MalformedHeader,

    #[error("invalid username or password")]
    BadCredentials,

    #[error("no session found")]
    NoSession,

    #[error("unknown user")]
    UnknownUser,
}

impl AuthFailure {
    /// True when the scheme found nothing to check, as opposed to finding
    /// credentials that did not verify.
    pub const fn is_absent(self) -> bool {
        matches!(self, Self::MissingHeader | Self::NoSession)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("could not authenticate: {0}")]
    CouldNotAuthenticate(AuthFailure),

    /// The backing store is inconsistent; not the client's fault.
    #[error("authentication fault: {0}")]
    Fault(String),
}

impl From<AuthFailure> for AuthError {
    fn from(failure: AuthFailure) -> Self {
        Self::CouldNotAuthenticate(failure)
    }
}

#[async_trait]
pub trait Authentication: Send + Sync {
    /// Identify the caller and attach the user to `request`.
    async fn authenticate(&self, request: &mut RequestContext) -> Result<(), AuthError>;

    /// Value for the `WWW-Authenticate` header of a 401 response.
    fn authenticate_header(&self) -> String;
}

#[async_trait]
pub trait UserProvider: Send + Sync {
    async fn get_user(&self, id: u64) -> Result<Option<Arc<dyn User>>, AuthError>;

    async fn find_user(&self, username: &str) -> Result<Option<Arc<dyn User>>, AuthError>;
}

/// Run `schemes` against `request`. See the module docs for the ordering
/// rules.
pub async fn authenticate(
    schemes: &[Arc<dyn Authentication>],
    request: &mut RequestContext,
) -> Result<(), AuthError> {
    for scheme in schemes {
        match scheme.authenticate(request).await {
            Ok(()) => return Ok(()),
            Err(AuthError::CouldNotAuthenticate(failure)) if failure.is_absent() => {
                debug!(scheme = %scheme.authenticate_header(), %failure, "scheme not applicable");
            }
            Err(e) => {
                warn!(scheme = %scheme.authenticate_header(), error = %e, "authentication failed");
                return Err(e);
            }
        }
    }
    Ok(())
}

fn authorization<'a>(request: &'a RequestContext, keyword: &str) -> Result<&'a str, AuthFailure> {
    let value = request
        .header(header::AUTHORIZATION)
        .ok_or(AuthFailure::MissingHeader)?;
    let (scheme, credentials) = value.split_once(' ').unwrap_or((value, ""));
    if !scheme.eq_ignore_ascii_case(keyword) {
        return Err(AuthFailure::MissingHeader);
    }
    let credentials = credentials.trim();
    if credentials.is_empty() || credentials.contains(' ') {
        return Err(AuthFailure::MalformedHeader);
    }
    Ok(credentials)
}

// ============================================================================
// BASIC
// ============================================================================

/// HTTP Basic authentication against a [`UserProvider`].
pub struct BasicAuthentication {
    realm: String,
    provider: Arc<dyn UserProvider>,
}

impl BasicAuthentication {
    pub fn new(realm: impl Into<String>, provider: Arc<dyn UserProvider>) -> Self {
        Self {
            realm: realm.into(),
            provider,
        }
    }

    fn credentials(request: &RequestContext) -> Result<(String, String), AuthFailure> {
        let encoded = authorization(request, "Basic")?;
        let decoded = STANDARD
            .decode(encoded)
            .map_err(|_| AuthFailure::MalformedHeader)?;
        let decoded = String::from_utf8(decoded).map_err(|_| AuthFailure::MalformedHeader)?;
        decoded
            .split_once(':')
            .map(|(user, password)| (user.to_string(), password.to_string()))
            .ok_or(AuthFailure::MalformedHeader)
    }
}

#[async_trait]
impl Authentication for BasicAuthentication {
    async fn authenticate(&self, request: &mut RequestContext) -> Result<(), AuthError> {
        let (username, password) = Self::credentials(request)?;
        let user = self
            .provider
            .find_user(&username)
            .await?
            .filter(|user| user.verify_password(&password))
            .ok_or(AuthFailure::BadCredentials)?;
        request.set_user(user);
        Ok(())
    }

    fn authenticate_header(&self) -> String {
        format!("Basic realm=\"{}\"", self.realm)
    }
}

// ============================================================================
// SESSION
// ============================================================================

/// Server-side session storage keyed by session id.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str, key: &str) -> Option<Value>;
}

/// Session authentication: the session cookie names a stored session whose
/// [`SESSION_USER_KEY`] entry holds the user id.
pub struct SessionAuthentication {
    cookie: String,
    store: Arc<dyn SessionStore>,
    provider: Arc<dyn UserProvider>,
}

impl SessionAuthentication {
    pub fn new(
        cookie: impl Into<String>,
        store: Arc<dyn SessionStore>,
        provider: Arc<dyn UserProvider>,
    ) -> Self {
        Self {
            cookie: cookie.into(),
            store,
            provider,
        }
    }
}

#[async_trait]
impl Authentication for SessionAuthentication {
    async fn authenticate(&self, request: &mut RequestContext) -> Result<(), AuthError> {
        let session_id = request
            .cookie(&self.cookie)
            .ok_or(AuthFailure::NoSession)?
            .to_string();
        let stored = self
            .store
            .get(&session_id, SESSION_USER_KEY)
            .await
            .ok_or(AuthFailure::NoSession)?;
        let id = stored.as_u64().ok_or_else(|| {
            AuthError::Fault(format!(
                "session {SESSION_USER_KEY} is not an unsigned integer: {stored}"
            ))
        })?;
        let user = self
            .provider
            .get_user(id)
            .await?
            .ok_or(AuthFailure::UnknownUser)?;
        request.set_user(user);
        Ok(())
    }

    fn authenticate_header(&self) -> String {
        "Session".to_string()
    }
}

/// In-process [`SessionStore`].
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, HashMap<String, Value>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, session_id: impl Into<String>, key: impl Into<String>, value: Value) {
        self.sessions
            .write()
            .await
            .entry(session_id.into())
            .or_default()
            .insert(key.into(), value);
    }

    pub async fn remove(&self, session_id: &str) {
        self.sessions.write().await.remove(session_id);
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, session_id: &str, key: &str) -> Option<Value> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .and_then(|session| session.get(key))
            .cloned()
    }
}

// ============================================================================
// TOKEN
// ============================================================================

#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn user_for_token(&self, token: &str) -> Result<Option<Arc<dyn User>>, AuthError>;
}

/// `Authorization: <keyword> <token>` authentication.
pub struct TokenAuthentication {
    keyword: String,
    provider: Arc<dyn TokenProvider>,
}

impl TokenAuthentication {
    pub const DEFAULT_KEYWORD: &'static str = "Token";

    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self::with_keyword(Self::DEFAULT_KEYWORD, provider)
    }

    pub fn with_keyword(keyword: impl Into<String>, provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            keyword: keyword.into(),
            provider,
        }
    }
}

#[async_trait]
impl Authentication for TokenAuthentication {
    async fn authenticate(&self, request: &mut RequestContext) -> Result<(), AuthError> {
        let token = authorization(request, &self.keyword)?.to_string();
        let user = self
            .provider
            .user_for_token(&token)
            .await?
            .ok_or(AuthFailure::BadCredentials)?;
        request.set_user(user);
        Ok(())
    }

    fn authenticate_header(&self) -> String {
        self.keyword.clone()
    }
}
