//! Pick lists for the create and edit forms.

use super::{AppState, response::Envelope};
use crate::{
    core::{
        context::RequestContext,
        reference::{ReferenceOptions, load_reference_options},
    },
    errors::Result,
};
use axum::{Extension, extract::State};

/// GET /reference
pub async fn index(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Envelope<ReferenceOptions>> {
    let options = load_reference_options(&*state.db).await?;
    Ok(Envelope::new(&ctx, options))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use crate::{test_utils::*, web::test_support::*};
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn test_reference_lists_seeded_rows() {
        let app = TestApp::new().await;
        seed_test_reference(app.db()).await.unwrap();
        let admin = create_test_user(app.db(), "Ada Admin", "ada@example.com").await.unwrap();
        let token = app.login_as(&admin).await;

        let response = app.json(Method::GET, "/reference", Some(&token), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["data"]["branches"][0]["name"], "Head Office");
        assert_eq!(body["data"]["document_types"][0]["name"], "Passport");
        assert!(body["permissions"].as_array().unwrap().len() >= 7);
    }
}
