//! Route registration and middleware wiring

use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::{
    auth::{authorization_gate, require_roles},
    handlers,
    middleware::{request_tracking_middleware, AppState},
    models::Role,
    session::{session_middleware, SessionLayerState},
};

/// Put every route of `router` behind the authorization gate with the given permitted roles
pub fn with_roles(
    router: Router<Arc<AppState>>,
    state: &AppState,
    roles: &[Role],
) -> Router<Arc<AppState>> {
    router.route_layer(from_fn_with_state(
        require_roles(state.resolvers.clone(), roles),
        authorization_gate,
    ))
}

pub fn create_router(state: Arc<AppState>) -> Router {
    build_router(state, Router::new())
}

/// Full application router with `extra` routes merged in under the same session and
/// tracking layers. `extra` routes carry their own gates (see `with_roles`).
pub fn build_router(state: Arc<AppState>, extra: Router<Arc<AppState>>) -> Router {
    let probe_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check));

    let public_routes = with_roles(
        Router::new()
            .route("/api/auth/register", post(handlers::auth::register))
            .route("/api/auth/login", post(handlers::auth::login)),
        &state,
        &[Role::Public],
    );

    let authenticated_routes = with_roles(
        Router::new()
            .route("/api/auth/logout", post(handlers::auth::logout))
            .route("/api/auth/me", get(handlers::auth::me)),
        &state,
        &[Role::User, Role::Admin],
    );

    let session_layer = SessionLayerState {
        store: state.sessions.clone(),
        config: Arc::new(state.config.session.clone()),
    };

    Router::new()
        .merge(probe_routes)
        .merge(public_routes)
        .merge(authenticated_routes)
        .merge(extra)
        .layer(from_fn_with_state(session_layer, session_middleware))
        .layer(from_fn(request_tracking_middleware))
        .with_state(state)
}
