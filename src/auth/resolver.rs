//! Credential resolvers tried in order by the authorization gate
//!
//! Each resolver returns:
//! - `None`: its credential kind is not present on the request
//! - `Some(Ok(principal))`: credential present and valid
//! - `Some(Err(error))`: credential present but unusable; the chain stops here

use axum::http::{header, HeaderMap};
use std::sync::Arc;
use tracing::{debug, trace};

use super::{jwt::TokenCodec, session_holder::SessionHolder};
use crate::{error::AppError, models::Principal, session::Session};

pub trait CredentialResolver: Send + Sync {
    fn name(&self) -> &'static str;

    fn resolve(&self, headers: &HeaderMap, session: &Session) -> Option<Result<Principal, AppError>>;
}

/// Principal cached in the session by an earlier login or token promotion
pub struct SessionResolver;

impl CredentialResolver for SessionResolver {
    fn name(&self) -> &'static str {
        "session"
    }

    fn resolve(&self, _headers: &HeaderMap, session: &Session) -> Option<Result<Principal, AppError>> {
        SessionHolder::get(session).map(Ok)
    }
}

/// `Authorization: Bearer <token>`. A decoded principal is promoted into the session.
pub struct BearerTokenResolver {
    codec: Arc<TokenCodec>,
}

impl BearerTokenResolver {
    pub fn new(codec: Arc<TokenCodec>) -> Self {
        Self { codec }
    }
}

/// Token from the Authorization header; only the `Bearer ` scheme is recognized
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
}

impl CredentialResolver for BearerTokenResolver {
    fn name(&self) -> &'static str {
        "bearer"
    }

    fn resolve(&self, headers: &HeaderMap, session: &Session) -> Option<Result<Principal, AppError>> {
        let token = extract_bearer(headers)?;

        match self.codec.decode(token) {
            Ok(principal) => {
                debug!(user_id = principal.id, "promoting bearer principal into session");
                SessionHolder::establish(session, &principal);
                Some(Ok(principal))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

/// First resolver to find a credential decides the outcome
pub struct ResolverChain {
    resolvers: Vec<Box<dyn CredentialResolver>>,
}

impl ResolverChain {
    pub fn new(resolvers: Vec<Box<dyn CredentialResolver>>) -> Self {
        Self { resolvers }
    }

    /// Session first, then bearer token
    pub fn standard(codec: Arc<TokenCodec>) -> Self {
        let session: Box<dyn CredentialResolver> = Box::new(SessionResolver);
        let bearer: Box<dyn CredentialResolver> = Box::new(BearerTokenResolver::new(codec));
        Self::new(vec![session, bearer])
    }

    pub fn resolve(&self, headers: &HeaderMap, session: &Session) -> Option<Result<Principal, AppError>> {
        for resolver in &self.resolvers {
            if let Some(outcome) = resolver.resolve(headers, session) {
                trace!(resolver = resolver.name(), ok = outcome.is_ok(), "credential resolved");
                return Some(outcome);
            }
        }
        None
    }
}
