//! Authorization gate for the REST API
//!
//! Every document endpoint is wrapped in [`require_policy`] with its own
//! [`AccessPolicy`]. The middleware takes the bearer token from the
//! `Authorization` header, verifies it, and checks the verified claims against
//! the policy:
//!
//! - missing, malformed, expired or untrusted token: 401 Unauthorized
//! - valid token without a matching group, role or scope: 403 Forbidden
//!
//! On success the [`ClaimSet`] is stored in the request extensions.

use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use crate::auth::{AccessPolicy, ClaimSet, TokenVerifier};
use crate::error::{ApiError, Error};

/// Middleware state: the verifier and the policy of one endpoint
#[derive(Clone)]
pub struct PolicyGuard {
    verifier: Option<Arc<dyn TokenVerifier>>,
    policy: Arc<AccessPolicy>,
}

impl PolicyGuard {
    /// Guard an endpoint with `policy`
    ///
    /// With no verifier the gate is open and every request passes.
    pub fn new(verifier: Option<Arc<dyn TokenVerifier>>, policy: AccessPolicy) -> Self {
        Self {
            verifier,
            policy: Arc::new(policy),
        }
    }
}

/// Authorization middleware enforcing a [`PolicyGuard`]
///
/// # Examples
///
/// ```no_run
/// use axum::{Router, middleware, routing::get};
/// use document_gateway::api::auth::{PolicyGuard, require_policy};
/// use document_gateway::auth::AccessPolicy;
///
/// let guard = PolicyGuard::new(None, AccessPolicy::new(["Editor"], ["Editor"], ["Document.Download"]));
/// let router: Router = Router::new()
///     .route("/documents/download", get(|| async { "ok" }))
///     .route_layer(middleware::from_fn_with_state(guard, require_policy));
/// ```
pub async fn require_policy(
    State(guard): State<PolicyGuard>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(verifier) = guard.verifier else {
        return next.run(request).await;
    };

    let Some(token) = bearer_token(request.headers()) else {
        return unauthorized_response("Missing or malformed bearer token");
    };

    let claims = match verifier.verify(&token).await {
        Ok(claims) => claims,
        Err(Error::Authentication(reason)) => {
            tracing::debug!(reason = %reason, path = %request.uri().path(), "Rejected bearer token");
            return unauthorized_response(&reason);
        }
        Err(e) => {
            // Key retrieval failures are server-side faults, not bad tokens
            tracing::error!(error = %e, "Token verification failed");
            return e.into_response();
        }
    };

    if !guard.policy.allows(&claims) {
        tracing::warn!(
            sub = claims.sub.as_deref().unwrap_or("-"),
            path = %request.uri().path(),
            "Caller lacks a required group, role or scope"
        );
        return (
            StatusCode::FORBIDDEN,
            Json(ApiError::forbidden("Insufficient permissions")),
        )
            .into_response();
    }

    request.extensions_mut().insert::<ClaimSet>(claims);
    next.run(request).await
}

/// Token from an `Authorization: Bearer <token>` header
fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token.to_string())
    } else {
        None
    }
}

fn unauthorized_response(message: &str) -> Response {
    let mut response = (
        StatusCode::UNAUTHORIZED,
        Json(ApiError::unauthorized(message)),
    )
        .into_response();
    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
    response
}
