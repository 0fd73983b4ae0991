//! Session handling at the HTTP edge: the gate middleware, login and logout.

use super::{AppState, response::revoked_response};
use crate::{
    core::{
        context::RequestContext,
        gate::{GateOutcome, check_exit},
        session::{open_session, prune_expired_sessions, resolve_session, terminate_session},
        user::authenticate,
    },
    entities::{PrincipalModel, PrincipalStatus},
    errors::{Error, Result},
};
use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Extracts the token from `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

enum Admission {
    Admit(RequestContext),
    Revoke(Response),
}

async fn admit(state: &AppState, headers: &HeaderMap) -> Result<Admission> {
    let token = bearer_token(headers).ok_or(Error::Unauthenticated)?;
    let (_, principal) = resolve_session(&*state.db, token, Utc::now(), state.settings.app.session_ttl())
        .await?
        .ok_or(Error::Unauthenticated)?;

    if principal.status == PrincipalStatus::Inactive {
        debug!(principal_id = principal.id, "Inactive principal refused");
        terminate_session(&*state.db, token).await?;
        return Err(Error::Unauthenticated);
    }

    let ctx = RequestContext::for_principal(&*state.db, &state.settings, principal, Utc::now()).await?;
    match check_exit(&*state.db, &ctx, state.settings.app.exit_cutoff_hour).await? {
        GateOutcome::Pass => Ok(Admission::Admit(ctx)),
        GateOutcome::Revoked(revocation) => Ok(Admission::Revoke(revoked_response(&revocation))),
    }
}

/// Identity & status gate. Resolves the session, builds the request context
/// and applies the exit rule before any handler runs.
pub async fn require_session(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    match admit(&state, request.headers()).await {
        Ok(Admission::Admit(ctx)) => {
            request.extensions_mut().insert(ctx);
            next.run(request).await
        }
        Ok(Admission::Revoke(response)) => response,
        Err(e) => e.into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub csrf_token: String,
    pub principal: PrincipalModel,
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let principal = authenticate(&*state.db, &req.email, &req.password).await?;
    let now = Utc::now();
    prune_expired_sessions(&*state.db, now, state.settings.app.session_ttl()).await?;
    let session = open_session(&*state.db, principal.id, now).await?;
    info!(principal_id = principal.id, "Signed in");
    Ok(Json(LoginResponse {
        token: session.token,
        csrf_token: session.csrf_token,
        principal,
    }))
}

/// POST /logout. Unknown or missing tokens are not an error.
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<StatusCode> {
    if let Some(token) = bearer_token(&headers) {
        terminate_session(&*state.db, token).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}
