//! User administration routes.

use super::{
    AppState,
    response::{Envelope, Flash},
};
use crate::{
    core::{
        context::{RequestContext, permissions},
        pagination::{Page, PageRequest},
        user::{self, PasswordReset, PlanLimits, RoleUsers, UserFilters, UserInput},
    },
    entities::PrincipalModel,
    errors::Result,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserQuery {
    pub search: Option<String>,
    pub role_id: Option<i64>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(default)]
pub struct PageQuery {
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

/// User index plus plan usage.
#[derive(Debug, Serialize)]
pub struct UserIndex {
    pub users: Page<PrincipalModel>,
    pub limits: PlanLimits,
}

/// GET /users
pub async fn index(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<UserQuery>,
) -> Result<Envelope<UserIndex>> {
    ctx.require(permissions::MANAGE_USERS)?;
    let filters = UserFilters {
        search: query.search,
        role_id: query.role_id,
    };
    let users = user::list_users(
        &*state.db,
        &filters,
        PageRequest::from_query(query.page, query.per_page),
    )
    .await?;
    let limits = user::plan_limits(&*state.db, state.settings.app.max_users).await?;
    Ok(Envelope::new(&ctx, UserIndex { users, limits }).with_filters(&filters))
}

/// GET /users/roles/{role_id}
pub async fn by_role(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(role_id): Path<i64>,
    Query(query): Query<PageQuery>,
) -> Result<Envelope<RoleUsers>> {
    ctx.require(permissions::MANAGE_USERS)?;
    let view = user::users_by_role(
        &*state.db,
        role_id,
        PageRequest::from_query(query.page, query.per_page),
    )
    .await?;
    Ok(Envelope::new(&ctx, view))
}

/// POST /users
pub async fn store(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(input): Json<UserInput>,
) -> Result<Envelope<PrincipalModel>> {
    ctx.require(permissions::MANAGE_USERS)?;
    let created = user::create_user(&*state.db, state.settings.app.max_users, &input).await?;
    Ok(Envelope::new(&ctx, created)
        .with_flash(Flash::success("User created successfully."))
        .created())
}

/// PUT /users/{id}
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
    Json(input): Json<UserInput>,
) -> Result<Envelope<PrincipalModel>> {
    ctx.require(permissions::MANAGE_USERS)?;
    let updated = user::update_user(&*state.db, id, &input).await?;
    Ok(Envelope::new(&ctx, updated).with_flash(Flash::success("User updated successfully.")))
}

/// DELETE /users/{id}
pub async fn destroy(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> Result<Envelope<PrincipalModel>> {
    ctx.require(permissions::MANAGE_USERS)?;
    let deleted = user::delete_user(&*state.db, &ctx, id).await?;
    Ok(Envelope::new(&ctx, deleted).with_flash(Flash::success("User deleted successfully.")))
}

/// PUT /users/{id}/reset-password
pub async fn reset_password(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
    Json(form): Json<PasswordReset>,
) -> Result<Envelope<PrincipalModel>> {
    ctx.require(permissions::MANAGE_USERS)?;
    let updated = user::reset_password(&*state.db, id, &form).await?;
    Ok(Envelope::new(&ctx, updated).with_flash(Flash::success("Password reset successfully.")))
}

/// PUT /users/{id}/toggle-status
pub async fn toggle_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> Result<Envelope<PrincipalModel>> {
    ctx.require(permissions::MANAGE_USERS)?;
    let updated = user::toggle_user_status(&*state.db, &ctx, id).await?;
    let message = format!("User is now {}.", updated.status);
    Ok(Envelope::new(&ctx, updated).with_flash(Flash::success(message)))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use crate::{test_utils::*, web::test_support::*};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_user_admin_flow() {
        let app = TestApp::new().await;
        let reference = seed_test_reference(app.db()).await.unwrap();
        let admin = create_test_user(app.db(), "Ada Admin", "ada@example.com").await.unwrap();
        let token = app.login_as(&admin).await;

        let created = app
            .json(
                Method::POST,
                "/users",
                Some(&token),
                Some(json!({
                    "name": "Rae",
                    "email": "rae@example.com",
                    "password": "recruit-pass",
                    "password_confirmation": "recruit-pass",
                    "kind": "recruiter",
                    "role_id": reference.recruiter_role_id,
                })),
            )
            .await;
        assert_eq!(created.status(), StatusCode::CREATED);
        let id = body_json(created).await["data"]["id"].as_i64().unwrap();

        let index = app.json(Method::GET, "/users", Some(&token), None).await;
        let body = body_json(index).await;
        assert_eq!(body["data"]["users"]["total"], 2);
        assert_eq!(body["data"]["limits"]["current_users"], 2);
        assert_eq!(body["data"]["limits"]["can_create"], true);

        let by_role = app
            .json(
                Method::GET,
                &format!("/users/roles/{}", reference.recruiter_role_id),
                Some(&token),
                None,
            )
            .await;
        assert_eq!(body_json(by_role).await["data"]["users"]["items"][0]["email"], "rae@example.com");

        let mismatch = app
            .json(
                Method::PUT,
                &format!("/users/{id}/reset-password"),
                Some(&token),
                Some(json!({"password": "new-password", "password_confirmation": "other"})),
            )
            .await;
        assert_eq!(mismatch.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let toggled = app
            .json(Method::PUT, &format!("/users/{id}/toggle-status"), Some(&token), None)
            .await;
        assert_eq!(body_json(toggled).await["data"]["status"], "inactive");

        let own = app
            .json(Method::DELETE, &format!("/users/{}", admin.id), Some(&token), None)
            .await;
        assert_eq!(own.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let deleted = app
            .json(Method::DELETE, &format!("/users/{id}"), Some(&token), None)
            .await;
        assert_eq!(deleted.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_employee_backed_user_cannot_be_deleted_here() {
        let app = TestApp::new().await;
        let admin = create_test_user(app.db(), "Ada Admin", "ada@example.com").await.unwrap();
        let token = app.login_as(&admin).await;
        let employee = create_test_employee(app.db(), "Ravi Shah", "ravi@example.com")
            .await
            .unwrap();

        let response = app
            .json(
                Method::DELETE,
                &format!("/users/{}", employee.principal_id),
                Some(&token),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
