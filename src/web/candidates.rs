//! Candidate routes: store, status machine, offers and conversion.

use super::{
    AppState,
    response::{Envelope, Flash},
};
use crate::{
    core::{
        candidate::{
            self, CandidateDetail, CandidateFilters, CandidateInput, CandidateSort,
            CandidateSortField, SortDirection,
        },
        context::{RequestContext, permissions},
        conversion::{ConversionForm, ConversionResult, convert_to_employee},
        offer::{Delivery, OfferOutcome, OfferServices, OfferTerms, send_offer as send_offer_letter},
        pagination::{Page, PageRequest},
    },
    entities::CandidateModel,
    errors::Result,
};
use axum::{
    Extension, Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

/// Query string of the candidate index.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CandidateQuery {
    pub search: Option<String>,
    pub status: Option<String>,
    pub job_id: Option<i64>,
    pub source_id: Option<i64>,
    pub sort_field: Option<CandidateSortField>,
    pub sort_direction: Option<SortDirection>,
    pub page: Option<u64>,
    pub per_page: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// GET /candidates
pub async fn index(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<CandidateQuery>,
) -> Result<Envelope<Page<CandidateModel>>> {
    ctx.require(permissions::MANAGE_CANDIDATES)?;
    let filters = CandidateFilters {
        search: query.search,
        status: query.status,
        job_id: query.job_id,
        source_id: query.source_id,
    };
    let sort = CandidateSort {
        sort_field: query.sort_field.unwrap_or_default(),
        sort_direction: query.sort_direction.unwrap_or_default(),
    };
    let page = candidate::list_candidates(
        &*state.db,
        &filters,
        sort,
        PageRequest::from_query(query.page, query.per_page),
    )
    .await?;
    Ok(Envelope::new(&ctx, page).with_filters(&filters))
}

/// POST /candidates
pub async fn store(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Json(input): Json<CandidateInput>,
) -> Result<Envelope<CandidateModel>> {
    ctx.require(permissions::MANAGE_CANDIDATES)?;
    let created = candidate::create_candidate(&*state.db, &ctx, &input).await?;
    Ok(Envelope::new(&ctx, created)
        .with_flash(Flash::success("Candidate created successfully."))
        .created())
}

/// GET /candidates/{id}
pub async fn show(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> Result<Envelope<CandidateDetail>> {
    ctx.require(permissions::MANAGE_CANDIDATES)?;
    let detail = candidate::candidate_detail(&*state.db, id).await?;
    Ok(Envelope::new(&ctx, detail))
}

/// PUT /candidates/{id}
pub async fn update(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
    Json(input): Json<CandidateInput>,
) -> Result<Envelope<CandidateModel>> {
    ctx.require(permissions::MANAGE_CANDIDATES)?;
    let updated = candidate::update_candidate(&*state.db, id, &input).await?;
    Ok(Envelope::new(&ctx, updated).with_flash(Flash::success("Candidate updated successfully.")))
}

/// DELETE /candidates/{id}
pub async fn destroy(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> Result<Envelope<CandidateModel>> {
    ctx.require(permissions::MANAGE_CANDIDATES)?;
    let deleted = candidate::delete_candidate(&*state.db, state.files.as_ref(), id).await?;
    Ok(Envelope::new(&ctx, deleted).with_flash(Flash::success("Candidate deleted successfully.")))
}

/// PUT /candidates/{id}/status
pub async fn update_status(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
    Json(form): Json<StatusForm>,
) -> Result<Envelope<CandidateModel>> {
    ctx.require(permissions::MANAGE_CANDIDATES)?;
    let updated = candidate::update_status(&*state.db, id, &form.status).await?;
    let message = format!("Candidate status updated to {}.", updated.status);
    Ok(Envelope::new(&ctx, updated).with_flash(Flash::success(message)))
}

/// POST /candidates/{id}/send-offer
///
/// A mail failure still answers 200: the offer is recorded and the flash
/// carries the warning.
pub async fn send_offer(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
    Json(terms): Json<OfferTerms>,
) -> Result<Envelope<OfferOutcome>> {
    ctx.require(permissions::SEND_OFFERS)?;
    let services = OfferServices::new(
        state.files.as_ref(),
        state.mailer.as_ref(),
        &state.settings.app,
    );
    let outcome = send_offer_letter(&*state.db, &services, &ctx, id, &terms).await?;
    let flash = match &outcome.delivery {
        Delivery::Sent => Flash::success("Offer letter sent successfully."),
        Delivery::Failed { warning } => Flash::warning(warning.clone()),
    };
    Ok(Envelope::new(&ctx, outcome).with_flash(flash).created())
}

/// POST /candidates/{id}/convert-to-employee
pub async fn convert(
    State(state): State<AppState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
    Json(form): Json<ConversionForm>,
) -> Result<Envelope<ConversionResult>> {
    ctx.require(permissions::CONVERT_CANDIDATES)?;
    let result = convert_to_employee(
        &*state.db,
        &state.settings.employee_id,
        state.settings.app.max_users,
        &ctx,
        id,
        &form,
    )
    .await?;
    let message = format!(
        "Candidate converted to employee {}.",
        result.employee.employee_id
    );
    Ok(Envelope::new(&ctx, result)
        .with_flash(Flash::success(message))
        .created())
}
