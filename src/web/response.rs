//! Response envelope and error mapping.
//!
//! Every successful response carries `{data, filters, flash, permissions}`.
//! Errors map onto status codes by [`ErrorKind`].

use crate::{
    core::{context::RequestContext, gate::Revocation},
    errors::{Error, ErrorKind},
};
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{error, warn};

/// Header carrying the CSRF token issued after a revocation.
pub const CSRF_HEADER: &str = "x-csrf-token";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Success,
    Warning,
    Error,
}

/// One-shot message for the next page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }
}

/// The single response shape for successful requests.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub data: T,
    pub filters: Option<Value>,
    pub flash: Option<Flash>,
    /// Permissions of the acting principal, for the UI to hide actions
    pub permissions: Vec<String>,
    #[serde(skip)]
    status: StatusCode,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(ctx: &RequestContext, data: T) -> Self {
        Self {
            data,
            filters: None,
            flash: None,
            permissions: ctx.permission_list(),
            status: StatusCode::OK,
        }
    }

    /// Echoes the applied filters back to the client.
    #[must_use]
    pub fn with_filters(mut self, filters: &impl Serialize) -> Self {
        self.filters = serde_json::to_value(filters).ok();
        self
    }

    #[must_use]
    pub fn with_flash(mut self, flash: Flash) -> Self {
        self.flash = Some(flash);
        self
    }

    #[must_use]
    pub const fn created(mut self) -> Self {
        self.status = StatusCode::CREATED;
        self
    }
}

impl<T: Serialize> IntoResponse for Envelope<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

/// `303 See Other` to the login page with the exit message and new CSRF token.
pub fn revoked_response(revocation: &Revocation) -> Response {
    let body = json!({
        "flash": Flash::error(revocation.message),
        "csrf_token": revocation.csrf_token,
    });
    let mut response = (StatusCode::SEE_OTHER, Json(body)).into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::LOCATION,
        HeaderValue::from_static(revocation.redirect_to),
    );
    if let Ok(token) = HeaderValue::from_str(&revocation.csrf_token) {
        headers.insert(CSRF_HEADER, token);
    }
    response
}

const GENERIC_SERVER_ERROR: &str = "Something went wrong. Please try again later.";

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let kind = self.kind();
        let status = match (&self, kind) {
            (Self::Unauthenticated, _) => StatusCode::UNAUTHORIZED,
            (_, ErrorKind::Validation) => StatusCode::UNPROCESSABLE_ENTITY,
            (_, ErrorKind::Conflict) => StatusCode::CONFLICT,
            (_, ErrorKind::NotFound) => StatusCode::NOT_FOUND,
            (_, ErrorKind::Forbidden) => StatusCode::FORBIDDEN,
            (_, ErrorKind::Transient) => StatusCode::SERVICE_UNAVAILABLE,
            (_, ErrorKind::Fatal) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = match self {
            Self::Validation { errors } => json!({
                "message": "The given data was invalid.",
                "errors": errors,
            }),
            Self::InvalidState { message } => {
                let flash = Flash::error(message.clone());
                json!({ "message": message, "errors": {}, "flash": flash })
            }
            other if kind == ErrorKind::Fatal => {
                error!(error = %other, "Request failed");
                json!({ "message": GENERIC_SERVER_ERROR })
            }
            other if kind == ErrorKind::Transient => {
                warn!(error = %other, "Request failed on an unavailable dependency");
                json!({ "message": other.to_string() })
            }
            other => {
                let message = other.to_string();
                json!({ "flash": Flash::error(message.clone()), "message": message })
            }
        };

        (status, Json(body)).into_response()
    }
}
