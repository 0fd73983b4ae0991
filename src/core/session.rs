//! Session tokens for signed-in principals.
//!
//! A session pairs a bearer token with a CSRF token. Ending a session deletes
//! the row; requests presenting a deleted token are unauthenticated. Sessions
//! lapse once they are older than the configured lifetime.

use crate::{
    entities::{Principal, PrincipalModel, Session, session},
    errors::Result,
};
use chrono::{DateTime, TimeDelta, Utc};
use sea_orm::{Set, prelude::*};
use uuid::Uuid;

/// A fresh random token.
#[must_use]
pub fn new_token() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Opens a session for `principal_id`.
pub async fn open_session<C>(db: &C, principal_id: i64, now: DateTime<Utc>) -> Result<session::Model>
where
    C: ConnectionTrait,
{
    let session = session::ActiveModel {
        token: Set(new_token()),
        principal_id: Set(principal_id),
        csrf_token: Set(new_token()),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await?;
    tracing::info!("Opened session {} for principal {}", session.id, principal_id);
    Ok(session)
}

/// Looks up the live session for `token` together with its principal.
///
/// A session older than `ttl` is deleted and reported as missing.
pub async fn resolve_session<C>(
    db: &C,
    token: &str,
    now: DateTime<Utc>,
    ttl: TimeDelta,
) -> Result<Option<(session::Model, PrincipalModel)>>
where
    C: ConnectionTrait,
{
    let found = Session::find()
        .filter(session::Column::Token.eq(token))
        .find_also_related(Principal)
        .one(db)
        .await?;
    let Some((session, Some(principal))) = found else {
        return Ok(None);
    };
    if now.signed_duration_since(session.created_at) >= ttl {
        Session::delete_by_id(session.id).exec(db).await?;
        tracing::debug!("Session {} of principal {} expired", session.id, principal.id);
        return Ok(None);
    }
    Ok(Some((session, principal)))
}

/// Deletes every session older than `ttl`.
pub async fn prune_expired_sessions<C>(db: &C, now: DateTime<Utc>, ttl: TimeDelta) -> Result<u64>
where
    C: ConnectionTrait,
{
    let Some(cutoff) = now.checked_sub_signed(ttl) else {
        return Ok(0);
    };
    let res = Session::delete_many()
        .filter(session::Column::CreatedAt.lte(cutoff))
        .exec(db)
        .await?;
    if res.rows_affected > 0 {
        tracing::info!("Pruned {} expired session(s)", res.rows_affected);
    }
    Ok(res.rows_affected)
}

/// Ends the session for `token`. Returns whether a session existed.
pub async fn terminate_session<C>(db: &C, token: &str) -> Result<bool>
where
    C: ConnectionTrait,
{
    let res = Session::delete_many()
        .filter(session::Column::Token.eq(token))
        .exec(db)
        .await?;
    Ok(res.rows_affected > 0)
}

/// Ends every session held by `principal_id`.
pub async fn terminate_all_sessions<C>(db: &C, principal_id: i64) -> Result<u64>
where
    C: ConnectionTrait,
{
    let res = Session::delete_many()
        .filter(session::Column::PrincipalId.eq(principal_id))
        .exec(db)
        .await?;
    if res.rows_affected > 0 {
        tracing::info!(
            "Terminated {} session(s) of principal {}",
            res.rows_affected,
            principal_id
        );
    }
    Ok(res.rows_affected)
}
