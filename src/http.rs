//! Axum integration
//!
//! Bearer-token extraction, a middleware that resolves the caller to a
//! [`Principal`], and the HTTP mapping of [`AuthError`].
//!
//! # Status Codes
//!
//! | Error                          | Status | Extra header               |
//! |--------------------------------|--------|----------------------------|
//! | `Unauthorized`, `InvalidToken` | 401    | `WWW-Authenticate: Bearer` |
//! | `AccountInactive`, `Forbidden` | 403    |                            |
//! | `AccountLocked`                | 403    | `Retry-After: <seconds>`   |
//! | store, notifier, config faults | 500    |                            |
//!
//! Server-side faults are logged in full and answered with a generic body.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use axum::{middleware, routing::get, Extension, Router};
//! use review_auth::http::require_principal;
//! use review_auth::principal::Principal;
//!
//! async fn me(Extension(principal): Extension<Principal>) -> String {
//!     principal.username
//! }
//!
//! let gate = Arc::new(gate);
//! let app = Router::new()
//!     .route("/me", get(me))
//!     .layer(middleware::from_fn_with_state(gate, require_principal::<MyStore>));
//! ```

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;

use crate::error::AuthError;
use crate::gate::AuthGate;
use crate::principal::{Principal, PrincipalStore};

/// JSON error response format
#[derive(Debug, Clone, serde::Serialize)]
pub struct ErrorResponse {
    /// Error type/code
    pub error: String,
    /// Human-readable message
    pub message: String,
}

/// Extract the token from `Authorization: Bearer <token>`.
///
/// The scheme is matched case-insensitively; the token is returned exactly
/// as sent.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;

    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return None;
    }
    Some(token)
}

impl AuthError {
    /// HTTP status for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized | Self::InvalidToken(_) => StatusCode::UNAUTHORIZED,
            Self::AccountInactive | Self::AccountLocked { .. } | Self::Forbidden { .. } => {
                StatusCode::FORBIDDEN
            }
            Self::Store(_) | Self::Notification(_) | Self::Hashing(_) | Self::Configuration(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message that is safe to show a client.
    fn public_message(&self) -> String {
        match self {
            Self::Unauthorized | Self::InvalidToken(_) => {
                AuthError::Unauthorized.to_string()
            }
            Self::AccountLocked { .. } => {
                "Account is locked. Please try again later.".to_string()
            }
            Self::AccountInactive | Self::Forbidden { .. } => self.to_string(),
            Self::Store(_) | Self::Notification(_) | Self::Hashing(_) | Self::Configuration(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        if status.is_server_error() {
            tracing::error!(error_kind = self.code(), error = %self, "Internal error");
        }

        let body = ErrorResponse {
            error: self.code().to_string(),
            message: self.public_message(),
        };
        let mut response = (status, Json(body)).into_response();

        match &self {
            Self::Unauthorized | Self::InvalidToken(_) => {
                response
                    .headers_mut()
                    .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            }
            Self::AccountLocked { until } => {
                let secs = (*until - Utc::now()).num_seconds().max(1);
                response
                    .headers_mut()
                    .insert(header::RETRY_AFTER, HeaderValue::from(secs));
            }
            _ => {}
        }

        response
    }
}

/// Resolve the bearer token and attach the [`Principal`] to the request.
///
/// Handlers read it with `Extension<Principal>`. Requests without a usable
/// token are answered here and never reach the handler.
pub async fn require_principal<S>(
    State(gate): State<Arc<AuthGate<S>>>,
    mut request: Request,
    next: Next,
) -> Response
where
    S: PrincipalStore + 'static,
{
    let Some(token) = bearer_token(request.headers()) else {
        return AuthError::Unauthorized.into_response();
    };

    let principal: Principal = match gate.resolve(token, Utc::now()) {
        Ok(principal) => principal,
        Err(e) => return e.into_response(),
    };

    request.extensions_mut().insert(principal);
    next.run(request).await
}
