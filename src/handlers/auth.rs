//! Auth endpoints: register, login, logout, current user

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

use crate::{
    auth::{AuthContext, SessionHolder},
    error::AppError,
    middleware::AppState,
    models::auth::{LoginRequest, LoginResponse, RegisterRequest},
    session::Session,
};

/// POST /api/auth/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    session: Session,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let user = state.auth_service.register(&req.username, &req.password).await?;
    SessionHolder::establish(&session, &user.principal());

    Ok((StatusCode::CREATED, Json(user)))
}

/// POST /api/auth/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;
    let user = state.auth_service.login(&req.username, &req.password).await?;
    let principal = user.principal();

    let token = state.token_codec.issue(&principal)?;
    SessionHolder::establish(&session, &principal);

    Ok(Json(LoginResponse { token, user }))
}

/// POST /api/auth/logout
pub async fn logout(auth: AuthContext, session: Session) -> StatusCode {
    SessionHolder::clear(&session);
    tracing::info!(user_id = auth.user_id, "logged out");

    StatusCode::NO_CONTENT
}

/// GET /api/auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    auth: AuthContext,
    session: Session,
) -> Result<impl IntoResponse, AppError> {
    match state.auth_service.find_user(auth.user_id).await? {
        Some(user) => Ok(Json(user)),
        None => {
            tracing::warn!(user_id = auth.user_id, "authenticated user no longer exists");
            SessionHolder::clear(&session);
            Err(AppError::NotFound("User not found".to_string()))
        }
    }
}
