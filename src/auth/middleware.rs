//! Authentication and authorization middleware
//!
//! `require_auth` must wrap every route that carries an `authorize` layer so
//! an anonymous request fails with 401 before any 403 check runs.

use crate::{
    auth::{policy::Requirement, principal::Principal},
    error::AppError,
    middleware::AppState,
};
use axum::{
    body::{self, Body},
    extract::{FromRequestParts, Query, RawPathParams, Request, State},
    http::{header::CONTENT_TYPE, request::Parts},
    middleware::Next,
    response::Response,
};
use http_body_util::LengthLimitError;
use serde_json::Value;
use std::{collections::HashMap, error::Error as StdError, sync::Arc};

/// Request fields naming the farm a request targets
pub const FARM_REF_KEYS: [&str; 2] = ["farmId", "farm_id"];

/// Per-route state for `authorize`
#[derive(Debug, Clone)]
pub struct RouteGuard {
    pub requirement: Requirement,
    /// Upper bound when buffering a JSON body for the farm reference
    pub body_limit: usize,
}

/// Must authenticate; attaches the `Principal` to request extensions
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = state.verifier.authenticate_headers(req.headers()).await?;

    tracing::debug!(
        account_id = principal.id,
        role = %principal.role,
        kind = principal.kind.as_str(),
        "Request authenticated"
    );

    req.extensions_mut().insert(principal);
    Ok(next.run(req).await)
}

/// Attaches a `Principal` when the token resolves; never fails the request
pub async fn optional_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    if let Some(principal) = state.verifier.try_authenticate_headers(req.headers()).await {
        req.extensions_mut().insert(principal);
    }

    next.run(req).await
}

/// Evaluates a route's `Requirement` against the attached principal
pub async fn authorize(
    State(guard): State<RouteGuard>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let principal = req
        .extensions()
        .get::<Principal>()
        .cloned()
        .ok_or(AppError::AuthenticationRequired)?;

    let (req, farm_ref) = if guard.requirement.needs_farm_ref() {
        extract_farm_ref(req, guard.body_limit).await?
    } else {
        (req, None)
    };

    if let Err(e) = guard.requirement.evaluate(&principal, farm_ref.as_deref()) {
        metrics::counter!("authz_denied_total").increment(1);
        tracing::info!(
            account_id = principal.id,
            role = %principal.role,
            path = %req.uri().path(),
            "Authorization denied"
        );
        return Err(e);
    }

    Ok(next.run(req).await)
}

/// Farm reference from path params, then JSON body, then query string.
/// The body is buffered (at most `body_limit` bytes) and put back so
/// handlers can still read it.
pub async fn extract_farm_ref(
    req: Request,
    body_limit: usize,
) -> Result<(Request, Option<String>), AppError> {
    let (mut parts, body) = req.into_parts();

    if let Some(farm_ref) = farm_ref_from_path(&mut parts).await {
        return Ok((Request::from_parts(parts, body), Some(farm_ref)));
    }

    let (body, from_body) = if is_json(&parts) {
        let bytes = body::to_bytes(body, body_limit).await.map_err(|e| {
            if exceeds_limit(&e) {
                AppError::PayloadTooLarge
            } else {
                AppError::Validation(format!("Failed to read request body: {}", e))
            }
        })?;
        let farm_ref = serde_json::from_slice::<Value>(&bytes)
            .ok()
            .and_then(|json| farm_ref_from_json(&json));
        (Body::from(bytes), farm_ref)
    } else {
        (body, None)
    };

    let farm_ref = from_body.or_else(|| farm_ref_from_query(&parts));
    Ok((Request::from_parts(parts, body), farm_ref))
}

async fn farm_ref_from_path(parts: &mut Parts) -> Option<String> {
    let params = RawPathParams::from_request_parts(parts, &()).await.ok()?;
    params
        .iter()
        .find(|(key, _)| FARM_REF_KEYS.contains(key))
        .map(|(_, value)| value.to_string())
}

fn farm_ref_from_query(parts: &Parts) -> Option<String> {
    let Query(query) = Query::<HashMap<String, String>>::try_from_uri(&parts.uri).ok()?;
    FARM_REF_KEYS
        .iter()
        .find_map(|key| query.get(*key).cloned())
}

fn farm_ref_from_json(json: &Value) -> Option<String> {
    FARM_REF_KEYS.iter().find_map(|key| match json.get(*key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Our own limit or the outer `RequestBodyLimitLayer` tripped
fn exceeds_limit(error: &axum::Error) -> bool {
    let mut source: Option<&(dyn StdError + 'static)> = Some(error);
    while let Some(err) = source {
        if err.is::<LengthLimitError>() {
            return true;
        }
        source = err.source();
    }
    false
}

fn is_json(parts: &Parts) -> bool {
    parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}
