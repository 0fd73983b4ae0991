//! HTTP interface - axum routes over the core operations.
//!
//! Handlers stay thin: extract, check the permission, call one core
//! operation, wrap the result in an [`Envelope`](response::Envelope).

pub mod auth;
pub mod candidates;
pub mod employees;
pub mod health;
pub mod reference;
pub mod response;
pub mod users;

use crate::{
    config::Settings,
    services::{FileStore, Mailer},
};
use axum::{
    Router,
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{get, post, put},
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tower_http::{
    request_id::{MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer},
    trace::TraceLayer,
};
use uuid::Uuid;

const REQUEST_ID_HEADER: &str = "x-request-id";

/// Shared handles every handler needs.
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub settings: Arc<Settings>,
    pub mailer: Arc<dyn Mailer>,
    pub files: Arc<dyn FileStore>,
}

impl AppState {
    pub fn new(
        db: DatabaseConnection,
        settings: Settings,
        mailer: Arc<dyn Mailer>,
        files: Arc<dyn FileStore>,
    ) -> Self {
        Self {
            db: Arc::new(db),
            settings: Arc::new(settings),
            mailer,
            files,
        }
    }
}

#[derive(Clone, Copy)]
struct XRequestId;

impl MakeRequestId for XRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&Uuid::new_v4().to_string())
            .ok()
            .map(RequestId::new)
    }
}

/// Routes that require a session and pass the identity gate.
fn protected_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/candidates",
            get(candidates::index).post(candidates::store),
        )
        .route(
            "/candidates/{id}",
            get(candidates::show)
                .put(candidates::update)
                .delete(candidates::destroy),
        )
        .route("/candidates/{id}/status", put(candidates::update_status))
        .route("/candidates/{id}/send-offer", post(candidates::send_offer))
        .route(
            "/candidates/{id}/convert-to-employee",
            post(candidates::convert),
        )
        .route("/employees", get(employees::index).post(employees::store))
        .route("/employees/next-id", get(employees::next_id))
        .route(
            "/employees/{id}",
            get(employees::show)
                .put(employees::update)
                .delete(employees::destroy),
        )
        .route("/employees/{id}/toggle-status", put(employees::toggle_status))
        .route("/employees/{id}/timeline", get(employees::timeline))
        .route("/employees/{id}/documents", post(employees::upload_document))
        .route(
            "/employees/{id}/documents/{doc}",
            axum::routing::delete(employees::delete_document),
        )
        .route(
            "/employees/{id}/documents/{doc}/download",
            get(employees::download_document),
        )
        .route(
            "/employees/{id}/documents/{doc}/approve",
            put(employees::approve_document),
        )
        .route(
            "/employees/{id}/documents/{doc}/reject",
            put(employees::reject_document),
        )
        .route("/users", get(users::index).post(users::store))
        .route("/users/roles/{role_id}", get(users::by_role))
        .route("/users/{id}", put(users::update).delete(users::destroy))
        .route("/users/{id}/reset-password", put(users::reset_password))
        .route("/users/{id}/toggle-status", put(users::toggle_status))
        .route("/reference", get(reference::index))
}

/// Builds the application router with tracing and request ids.
pub fn build_router(state: AppState) -> Router {
    let gated = protected_routes().route_layer(middleware::from_fn_with_state(
        state.clone(),
        auth::require_session,
    ));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .merge(gated)
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            let request_id = request
                .headers()
                .get(REQUEST_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("-");
            tracing::info_span!(
                "request",
                method = %request.method(),
                uri = %request.uri(),
                request_id = %request_id,
            )
        }))
        .layer(SetRequestIdLayer::new(
            HeaderName::from_static(REQUEST_ID_HEADER),
            XRequestId,
        ))
        .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
            REQUEST_ID_HEADER,
        )))
}

#[cfg(test)]
pub(crate) mod test_support {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::{
        core::session::open_session,
        entities::PrincipalModel,
        services::{MemoryFileStore, MemoryMailer},
        test_utils::{setup_test_db, test_settings},
    };
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Response, header},
    };
    use chrono::Utc;
    use serde_json::Value;

    /// Router over an in-memory database with in-memory mail and files.
    pub struct TestApp {
        pub state: AppState,
        pub mailer: MemoryMailer,
        pub files: MemoryFileStore,
    }

    impl TestApp {
        pub async fn new() -> Self {
            let db = setup_test_db().await.unwrap();
            let mailer = MemoryMailer::new();
            let files = MemoryFileStore::new();
            let state = AppState::new(
                db,
                test_settings(),
                Arc::new(mailer.clone()),
                Arc::new(files.clone()),
            );
            Self {
                state,
                mailer,
                files,
            }
        }

        pub fn db(&self) -> &DatabaseConnection {
            &*self.state.db
        }

        /// Opens a session for `principal` and returns its bearer token.
        pub async fn login_as(&self, principal: &PrincipalModel) -> String {
            open_session(&*self.state.db, principal.id, Utc::now())
                .await
                .unwrap()
                .token
        }

        pub async fn send(&self, request: Request<Body>) -> Response<Body> {
            use tower::ServiceExt;
            build_router(self.state.clone()).oneshot(request).await.unwrap()
        }

        pub async fn json(
            &self,
            method: Method,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> Response<Body> {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
            }
            let request = match body {
                Some(body) => builder
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };
            self.send(request).await
        }
    }

    pub async fn body_json(response: Response<Body>) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::TestApp;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_cloned_state_shares_connection() {
        let app = TestApp::new().await;
        let cloned = app.state.clone();
        assert!(Arc::ptr_eq(&app.state.db, &cloned.db));
        assert!(Arc::ptr_eq(&app.state.settings, &cloned.settings));
    }
}
