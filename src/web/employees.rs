//! Employee routes, including the document vault and the timeline.

use super::{
    AppState,
    response::{Envelope, Flash},
};
use crate::{
    core::{
        context::{RequestContext, permissions},
        document::{self, DocumentUpload},
        employee::{self, EmployeeDetail, EmployeeFilters, EmployeeInput, EmployeeRecord},
        pagination::{Page, PageRequest},
        sequence::preview_employee_id,
        timeline::{TimelineEvent, employee_timeline},
    },
    entities::EmployeeDocumentModel,
    errors::{Error, Result},
    services::storage::sanitize_file_name,
};
use axum::{
    Extension, Json,
    extract::{Multipart, Path, Query, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Query string of the employee index.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EmployeeQuery {
    pub search: Option<String>,
    pub department_id: Option<i64>,
    pub branch_id: Option<i64>,
    pub employment_status: Option<String>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct NextEmployeeId {
    pub employee_id: String,
}

/// GET /employees
pub async fn index(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<EmployeeQuery>,
) -> Result<Envelope<Page<EmployeeRecord>>> {
    ctx.require(permissions::MANAGE_EMPLOYEES)?;
    let filters = EmployeeFilters {
        search: query.search,
        department_id: query.department_id,
        branch_id: query.branch_id,
        employment_status: query.employment_status,
    };
    let page = employee::list_employees(
        &*state.db,
        &filters,
        PageRequest::from_query(query.page, query.per_page),
    )
    .await?;
    Ok(Envelope::new(&ctx, page).with_filters(&filters))
}

/// GET /employees/next-id
pub async fn next_id(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
) -> Result<Envelope<NextEmployeeId>> {
    ctx.require(permissions::MANAGE_EMPLOYEES)?;
    let employee_id = preview_employee_id(&*state.db, &state.settings.employee_id).await?;
    Ok(Envelope::new(&ctx, NextEmployeeId { employee_id }))
}

/// POST /employees
pub async fn store(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(input): Json<EmployeeInput>,
) -> Result<Envelope<EmployeeRecord>> {
    ctx.require(permissions::MANAGE_EMPLOYEES)?;
    let record = employee::create_employee(
        &*state.db,
        &state.settings.employee_id,
        state.settings.app.max_users,
        &input,
    )
    .await?;
    Ok(Envelope::new(&ctx, record)
        .with_flash(Flash::success("Employee created successfully."))
        .created())
}

/// GET /employees/{id}
pub async fn show(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> Result<Envelope<EmployeeDetail>> {
    ctx.require(permissions::MANAGE_EMPLOYEES)?;
    let detail = employee::employee_detail(&*state.db, id).await?;
    Ok(Envelope::new(&ctx, detail))
}

/// PUT /employees/{id}
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
    Json(input): Json<EmployeeInput>,
) -> Result<Envelope<EmployeeRecord>> {
    ctx.require(permissions::EDIT_EMPLOYEES)?;
    let record = employee::update_employee(&*state.db, id, &input).await?;
    Ok(Envelope::new(&ctx, record).with_flash(Flash::success("Employee updated successfully.")))
}

/// DELETE /employees/{id}
pub async fn destroy(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> Result<Envelope<EmployeeRecord>> {
    ctx.require(permissions::MANAGE_EMPLOYEES)?;
    let record = employee::delete_employee(&*state.db, state.files.as_ref(), id).await?;
    Ok(Envelope::new(&ctx, record).with_flash(Flash::success("Employee deleted successfully.")))
}

/// PUT /employees/{id}/toggle-status
pub async fn toggle_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> Result<Envelope<EmployeeRecord>> {
    ctx.require(permissions::MANAGE_EMPLOYEES)?;
    let record = employee::toggle_employee_status(&*state.db, id).await?;
    let message = format!("Employee is now {}.", record.principal.status);
    Ok(Envelope::new(&ctx, record).with_flash(Flash::success(message)))
}

/// GET /employees/{id}/timeline
pub async fn timeline(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> Result<Envelope<Vec<TimelineEvent>>> {
    ctx.require(permissions::MANAGE_EMPLOYEES)?;
    let events = employee_timeline(&*state.db, id).await?;
    Ok(Envelope::new(&ctx, events))
}

fn multipart_error(err: &axum::extract::multipart::MultipartError) -> Error {
    Error::field("file", format!("The upload could not be read: {err}"))
}

/// Reads the upload form: `document_type_id`, `notes`, `expiry_date` and `file`.
async fn read_upload(mut multipart: Multipart) -> Result<DocumentUpload> {
    let mut upload = DocumentUpload::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                upload.file_name = field.file_name().unwrap_or_default().to_string();
                upload.mime_type = field.content_type().map(str::to_string);
                upload.bytes = field.bytes().await.map_err(|e| multipart_error(&e))?.to_vec();
            }
            "document_type_id" => {
                let text = field.text().await.map_err(|e| multipart_error(&e))?;
                let text = text.trim();
                if !text.is_empty() {
                    let id = text.parse().map_err(|_| {
                        Error::field("document_type_id", "The document type id must be an integer.")
                    })?;
                    upload.document_type_id = Some(id);
                }
            }
            "notes" => {
                let text = field.text().await.map_err(|e| multipart_error(&e))?;
                upload.notes = Some(text).filter(|t| !t.trim().is_empty());
            }
            "expiry_date" => {
                let text = field.text().await.map_err(|e| multipart_error(&e))?;
                let text = text.trim();
                if !text.is_empty() {
                    let date = NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| {
                        Error::field("expiry_date", "The expiry date is not a valid date.")
                    })?;
                    upload.expiry_date = Some(date);
                }
            }
            _ => {}
        }
    }
    Ok(upload)
}

/// POST /employees/{id}/documents
pub async fn upload_document(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> Result<Envelope<EmployeeDocumentModel>> {
    ctx.require(permissions::MANAGE_DOCUMENTS)?;
    let upload = read_upload(multipart).await?;
    let stored = document::upload_document(&*state.db, state.files.as_ref(), id, upload).await?;
    Ok(Envelope::new(&ctx, stored)
        .with_flash(Flash::success("Document uploaded successfully."))
        .created())
}

/// DELETE /employees/{id}/documents/{doc}
pub async fn delete_document(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((id, doc)): Path<(i64, i64)>,
) -> Result<Envelope<EmployeeDocumentModel>> {
    ctx.require(permissions::MANAGE_DOCUMENTS)?;
    let deleted = document::delete_document(&*state.db, state.files.as_ref(), id, doc).await?;
    Ok(Envelope::new(&ctx, deleted).with_flash(Flash::success("Document deleted successfully.")))
}

/// GET /employees/{id}/documents/{doc}/download
pub async fn download_document(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((id, doc)): Path<(i64, i64)>,
) -> Result<Response> {
    ctx.require(permissions::MANAGE_DOCUMENTS)?;
    let download = document::download_document(&*state.db, state.files.as_ref(), id, doc).await?;

    let mut response = download.bytes.into_response();
    let headers = response.headers_mut();
    if let Ok(mime) = HeaderValue::from_str(&download.mime_type) {
        headers.insert(header::CONTENT_TYPE, mime);
    }
    let disposition = format!(
        "attachment; filename=\"{}\"",
        sanitize_file_name(&download.file_name)
    );
    if let Ok(value) = HeaderValue::from_str(&disposition) {
        headers.insert(header::CONTENT_DISPOSITION, value);
    }
    Ok(response)
}

/// PUT /employees/{id}/documents/{doc}/approve
pub async fn approve_document(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((id, doc)): Path<(i64, i64)>,
) -> Result<Envelope<EmployeeDocumentModel>> {
    ctx.require(permissions::MANAGE_DOCUMENTS)?;
    let approved = document::approve_document(&*state.db, id, doc).await?;
    Ok(Envelope::new(&ctx, approved).with_flash(Flash::success("Document approved.")))
}

/// PUT /employees/{id}/documents/{doc}/reject
pub async fn reject_document(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path((id, doc)): Path<(i64, i64)>,
) -> Result<Envelope<EmployeeDocumentModel>> {
    ctx.require(permissions::MANAGE_DOCUMENTS)?;
    let rejected = document::reject_document(&*state.db, id, doc).await?;
    Ok(Envelope::new(&ctx, rejected).with_flash(Flash::success("Document rejected.")))
}
