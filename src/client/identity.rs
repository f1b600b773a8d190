//! Identity is an injected capability; the pipeline never talks to a
//! specific identity vendor.

use async_trait::async_trait;
use std::{fmt, sync::RwLock};
use thiserror::Error;

/// Bearer token issued by an identity provider.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthToken(String);

impl AuthToken {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for an `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for AuthToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AuthToken(***)")
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("user `{0}` not found")]
    UserNotFound(String),
    #[error("{0} is not supported by this identity provider")]
    Unsupported(&'static str),
    #[error("identity provider error: {0}")]
    Provider(String),
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn authenticate(&self, username: &str, password: &str)
    -> Result<AuthToken, IdentityError>;

    async fn refresh(&self, token: &AuthToken) -> Result<AuthToken, IdentityError>;

    /// Start a password reset; the provider delivers a confirmation code.
    async fn request_password_reset(&self, username: &str) -> Result<(), IdentityError>;

    async fn confirm_password_reset(
        &self,
        username: &str,
        code: &str,
        new_password: &str,
    ) -> Result<(), IdentityError>;

    /// Token to attach to outgoing calls, if signed in.
    async fn current_token(&self) -> Option<AuthToken>;
}

/// A provider holding a token obtained out of band (environment, keychain).
///
/// It cannot sign users in; it only hands out what it was given.
#[derive(Debug, Default)]
pub struct StaticTokenProvider {
    token: RwLock<Option<AuthToken>>,
}

impl StaticTokenProvider {
    pub fn new(token: Option<AuthToken>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }

    /// A provider that never attaches credentials.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Drop the held token, as on logout.
    pub fn sign_out(&self) {
        if let Ok(mut guard) = self.token.write() {
            *guard = None;
        }
    }
}

#[async_trait]
impl IdentityProvider for StaticTokenProvider {
    async fn authenticate(
        &self,
        _username: &str,
        _password: &str,
    ) -> Result<AuthToken, IdentityError> {
        Err(IdentityError::Unsupported("password sign-in"))
    }

    async fn refresh(&self, token: &AuthToken) -> Result<AuthToken, IdentityError> {
        match self.current_token().await {
            Some(held) if &held == token => Ok(held),
            Some(_) | None => Err(IdentityError::InvalidCredentials),
        }
    }

    async fn request_password_reset(&self, _username: &str) -> Result<(), IdentityError> {
        Err(IdentityError::Unsupported("password reset"))
    }

    async fn confirm_password_reset(
        &self,
        _username: &str,
        _code: &str,
        _new_password: &str,
    ) -> Result<(), IdentityError> {
        Err(IdentityError::Unsupported("password reset"))
    }

    async fn current_token(&self) -> Option<AuthToken> {
        self.token.read().ok().and_then(|guard| guard.clone())
    }
}
