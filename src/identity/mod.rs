use std::collections::HashMap;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::{header::AUTHORIZATION, request::Parts};
use reqwest::{Client, StatusCode};
use tracing::{debug, warn};

use crate::error::AppError;
use crate::models::{AuthUser, Role};
use crate::state::AppState;

/// Resolves bearer tokens to users. Accounts live outside this service.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` means the token is not valid.
    async fn authenticate(&self, token: &str) -> Result<Option<AuthUser>, AppError>;
}

pub struct HttpIdentityProvider {
    client: Client,
    base_url: String,
}

impl HttpIdentityProvider {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AppError> {
        let client = Client::builder()
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to build http client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl IdentityProvider for HttpIdentityProvider {
    async fn authenticate(&self, token: &str) -> Result<Option<AuthUser>, AppError> {
        let url = format!("{}/me", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| AppError::Upstream(format!("identity request failed: {}", e)))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                debug!("identity service rejected token");
                Ok(None)
            }
            status if status.is_success() => {
                let user = response
                    .json::<AuthUser>()
                    .await
                    .map_err(|e| AppError::Upstream(format!("invalid identity response: {}", e)))?;
                Ok(Some(user))
            }
            status => {
                let body = response.text().await.unwrap_or_default();
                Err(AppError::Upstream(format!("identity service error {}: {}", status, body)))
            }
        }
    }
}

/// Fixed token table, for tests and local development.
///
/// With `dev_tokens` enabled, a token of the form `role:user_id` (for example
/// `instructor:alice`) is accepted as-is.
#[derive(Default)]
pub struct StaticIdentityProvider {
    users: HashMap<String, AuthUser>,
    dev_tokens: bool,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dev_tokens() -> Self {
        Self {
            users: HashMap::new(),
            dev_tokens: true,
        }
    }

    pub fn with_user(mut self, token: impl Into<String>, user: AuthUser) -> Self {
        self.users.insert(token.into(), user);
        self
    }

    fn parse_dev_token(token: &str) -> Option<AuthUser> {
        let (role, id) = token.split_once(':')?;
        let role = match role {
            "student" => Role::Student,
            "instructor" => Role::Instructor,
            "admin" => Role::Admin,
            _ => return None,
        };
        (!id.is_empty()).then(|| AuthUser::new(id, role))
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn authenticate(&self, token: &str) -> Result<Option<AuthUser>, AppError> {
        if let Some(user) = self.users.get(token) {
            return Ok(Some(user.clone()));
        }
        if self.dev_tokens {
            return Ok(Self::parse_dev_token(token));
        }
        Ok(None)
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

async fn resolve(parts: &Parts, state: &AppState) -> Result<Option<AuthUser>, AppError> {
    let Some(token) = bearer_token(parts) else {
        return Ok(None);
    };
    let user = state.identity.authenticate(token).await?;
    if user.is_none() {
        warn!("rejected bearer token");
    }
    Ok(user)
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        resolve(parts, &state).await?.ok_or(AppError::Unauthenticated)
    }
}

/// Optional caller: anonymous requests are let through as `Viewer(None)`.
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<AuthUser>);

impl<S> FromRequestParts<S> for Viewer
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        Ok(Viewer(resolve(parts, &state).await?))
    }
}
