//! Caller identity for ranking and profile routes.
//!
//! Login and sessions belong to the external auth provider; this module only
//! turns a bearer token into an [`AuthUser`] for the current request.

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::State,
    http::{header, Request, Response},
    middleware::Next,
};
use std::sync::Arc;

use crate::ranking::StoreResult;
use crate::types::AuthUser;

/// Resolves access tokens to users
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// `Ok(None)` when the token is not accepted
    async fn resolve(&self, access_token: &str) -> StoreResult<Option<AuthUser>>;
}

/// Used when no auth provider is configured: every caller is anonymous
pub struct DisabledIdentity;

#[async_trait]
impl IdentityProvider for DisabledIdentity {
    async fn resolve(&self, _access_token: &str) -> StoreResult<Option<AuthUser>> {
        Ok(None)
    }
}

/// Request extension set by [`resolve_user_middleware`]
#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<AuthUser>);

fn bearer_token(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Middleware resolving the bearer token, if any, into a [`CurrentUser`].
/// Lookup failures degrade to anonymous.
pub async fn resolve_user_middleware(
    State(identity): State<Arc<dyn IdentityProvider>>,
    mut request: Request<Body>,
    next: Next,
) -> Response<Body> {
    let token = bearer_token(&request).map(str::to_owned);
    let user = match token {
        Some(token) => match identity.resolve(&token).await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!("Failed to resolve user from access token: {}", e);
                None
            }
        },
        None => None,
    };

    request.extensions_mut().insert(CurrentUser(user));
    next.run(request).await
}
