//! Shared application state and request tracking

use axum::{
    extract::Request,
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    auth::{PasswordHasher, ResolverChain, TokenCodec},
    concurrency::BlockingPool,
    config::AppConfig,
    error::AppError,
    repository::UserStore,
    services::AuthService,
    session::{MemorySessionStore, SessionStore},
};

tokio::task_local! {
    static REQUEST_ID: String;
}

/// Id of the request being served on this task, as echoed in `x-request-id`
pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(|id| id.clone()).ok()
}

/// Application state, cheap to clone; every service sits behind an `Arc`
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth_service: Arc<AuthService>,
    pub token_codec: Arc<TokenCodec>,
    pub resolvers: Arc<ResolverChain>,
    pub sessions: Arc<dyn SessionStore>,
}

impl AppState {
    /// Wire services from configuration on top of the given identity store
    pub fn new(config: AppConfig, store: Arc<dyn UserStore>) -> Result<Self, AppError> {
        let hasher = PasswordHasher::from_config(&config.security)?;
        let pool = BlockingPool::new(
            "password-hash",
            config.security.hash_workers,
            Duration::from_secs(config.security.hash_acquire_timeout_secs),
        );
        let token_codec = Arc::new(TokenCodec::from_config(&config.security));
        let sessions: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new(
            Duration::from_secs(config.session.idle_timeout_secs),
        ));

        Ok(Self {
            auth_service: Arc::new(AuthService::new(store, hasher, pool)),
            resolvers: Arc::new(ResolverChain::standard(token_codec.clone())),
            token_codec,
            sessions,
            config: Arc::new(config),
        })
    }
}

/// Request tracking: trace/request ids on a span and response headers, plus metrics
pub async fn request_tracking_middleware(req: Request, next: Next) -> Response {
    let trace_id = extract_or_generate_trace_id(req.headers());
    let request_id = Uuid::new_v4().to_string();

    let method = req.method().clone();
    let uri = req.uri().to_string();

    let span = tracing::info_span!(
        "http_request",
        trace_id = %trace_id,
        request_id = %request_id,
        method = %method,
        uri = %uri,
    );

    let scoped_id = request_id.clone();
    async move {
        let start = Instant::now();
        let mut response = REQUEST_ID.scope(scoped_id, next.run(req)).await;
        let elapsed = start.elapsed();

        let status = response.status().as_u16();
        let method_name = match method.as_str() {
            "GET" => "GET",
            "POST" => "POST",
            "PUT" => "PUT",
            "DELETE" => "DELETE",
            "PATCH" => "PATCH",
            _ => "OTHER",
        };
        let status_code = match status {
            200 => "200",
            201 => "201",
            204 => "204",
            400 => "400",
            401 => "401",
            403 => "403",
            404 => "404",
            409 => "409",
            500 => "500",
            503 => "503",
            _ => "other",
        };

        metrics::counter!("http_requests_total", "method" => method_name, "status" => status_code)
            .increment(1);
        metrics::histogram!("http_request_duration_seconds").record(elapsed.as_secs_f64());

        tracing::info!(
            method = %method,
            uri = %uri,
            status = status,
            elapsed_ms = elapsed.as_millis() as u64,
            "Request completed"
        );

        if let Ok(value) = HeaderValue::from_str(&trace_id) {
            response.headers_mut().insert("x-trace-id", value);
        }
        if let Ok(value) = HeaderValue::from_str(&request_id) {
            response.headers_mut().insert("x-request-id", value);
        }

        response
    }
    .instrument(span)
    .await
}

fn extract_or_generate_trace_id(headers: &HeaderMap) -> String {
    headers
        .get("x-trace-id")
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string())
}
