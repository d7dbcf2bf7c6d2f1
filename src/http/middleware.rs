use std::net::SocketAddr;
use std::time::Instant;

use axum::body::Body;
use axum::extract::{ConnectInfo, State};
use axum::http::{HeaderMap, HeaderValue, Method, Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use tracing::{info, warn, Instrument};

use super::AppState;
use crate::auth::bearer_token;
use crate::error::AppError;

/// Owner resolved from the bearer token, available to handlers as an
/// extension.
#[derive(Clone, Debug)]
pub struct Owner(pub String);

pub(crate) async fn request_tracing_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().to_string();
    let route = request.uri().path().to_string();
    let span = tracing::info_span!("http.request", method = %method, route = %route);

    let started = Instant::now();
    let response = next.run(request).instrument(span.clone()).await;
    span.in_scope(|| {
        info!(
            status = response.status().as_u16(),
            latency_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
    });
    response
}

pub(crate) async fn cors_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let origin = header_value(req.headers(), "origin");
    let allowed = origin
        .as_deref()
        .filter(|value| {
            state
                .config
                .cors_allowed_origins
                .iter()
                .any(|allowed| allowed == value)
        })
        .and_then(|value| HeaderValue::from_str(value).ok());

    if req.method() == Method::OPTIONS {
        let mut resp = StatusCode::NO_CONTENT.into_response();
        if let Some(value) = allowed {
            let headers = resp.headers_mut();
            headers.insert("access-control-allow-origin", value);
            headers.insert(
                "access-control-allow-methods",
                HeaderValue::from_static("GET,POST,PUT,PATCH,DELETE,OPTIONS"),
            );
            headers.insert(
                "access-control-allow-headers",
                HeaderValue::from_static("authorization,content-type"),
            );
            headers.insert("access-control-max-age", HeaderValue::from_static("600"));
            headers.insert("vary", HeaderValue::from_static("Origin"));
        }
        return resp;
    }

    let mut resp = next.run(req).await;
    if let Some(value) = allowed {
        resp.headers_mut()
            .insert("access-control-allow-origin", value);
        resp.headers_mut()
            .insert("vary", HeaderValue::from_static("Origin"));
    }
    resp
}

pub(crate) async fn rate_limit_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let key = client_key(&req, state.config.trust_forwarded_for);
    if !state.limiter.allow(&key, &state.config.rate_limit).await {
        warn!(client = %key, "rate limit exceeded");
        return AppError::RateLimited.into_response();
    }
    next.run(req).await
}

pub(crate) async fn require_auth(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let owner = {
        let header = header_value(req.headers(), "authorization")
            .ok_or_else(|| AppError::Unauthorized("Not authorized, no token".to_string()))?;
        let token = bearer_token(&header)
            .ok_or_else(|| AppError::Unauthorized("Not authorized, no token".to_string()))?;
        state.tokens.verify(token, Utc::now())?
    };
    req.extensions_mut().insert(Owner(owner));
    Ok(next.run(req).await)
}

fn client_key(req: &Request<Body>, trust_forwarded_for: bool) -> String {
    if trust_forwarded_for {
        if let Some(forwarded) = header_value(req.headers(), "x-forwarded-for") {
            if let Some(first) = forwarded
                .split(',')
                .map(str::trim)
                .find(|value| !value.is_empty())
            {
                return first.to_string();
            }
        }
    }
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
