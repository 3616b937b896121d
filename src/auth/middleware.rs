//! Authorization gate
//! Resolves the caller from session or bearer token and checks the route's permitted roles

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use std::collections::HashSet;
use std::sync::Arc;

use super::resolver::ResolverChain;
use crate::{
    error::AppError,
    models::{Principal, Role},
    session::Session,
};

/// Authenticated caller, attached to request extensions by the gate
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
}

impl From<Principal> for AuthContext {
    fn from(p: Principal) -> Self {
        Self {
            user_id: p.id,
            username: p.username,
            role: p.role,
        }
    }
}

impl<S> FromRequestParts<S> for AuthContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}

/// Roles allowed through a route. Empty, or containing `PUBLIC`, means no authentication.
#[derive(Debug, Clone, Default)]
pub struct RouteRoles(HashSet<Role>);

impl RouteRoles {
    pub fn new(roles: &[Role]) -> Self {
        Self(roles.iter().copied().collect())
    }

    pub fn is_public(&self) -> bool {
        self.0.is_empty() || self.0.contains(&Role::Public)
    }

    pub fn permits(&self, role: Role) -> bool {
        self.0.contains(&role)
    }
}

#[derive(Clone)]
pub struct GateState {
    pub resolvers: Arc<ResolverChain>,
    pub roles: RouteRoles,
}

/// Gate state for a group of routes sharing a permitted-role set
pub fn require_roles(resolvers: Arc<ResolverChain>, roles: &[Role]) -> GateState {
    GateState {
        resolvers,
        roles: RouteRoles::new(roles),
    }
}

pub async fn authorization_gate(
    State(gate): State<GateState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if gate.roles.is_public() {
        return Ok(next.run(req).await);
    }

    let session = req
        .extensions()
        .get::<Session>()
        .cloned()
        .ok_or_else(|| AppError::Internal("session layer not installed".to_string()))?;

    let principal = match gate.resolvers.resolve(req.headers(), &session) {
        Some(outcome) => outcome?,
        None => {
            tracing::debug!(uri = %req.uri(), "no credentials presented");
            return Err(AppError::Unauthorized);
        }
    };

    if !gate.roles.permits(principal.role) {
        tracing::warn!(
            user_id = principal.id,
            role = %principal.role,
            uri = %req.uri(),
            "role not permitted for route"
        );
        return Err(AppError::Forbidden);
    }

    req.extensions_mut().insert(AuthContext::from(principal));

    Ok(next.run(req).await)
}
