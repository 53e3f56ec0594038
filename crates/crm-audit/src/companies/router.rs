use std::io::Cursor;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::json;

use crate::audits::{AuditRepository, UserDirectory};
use crate::error::RepositoryError;
use crate::state::CrmState;

use super::domain::{
    CompanyDraft, CompanyFilter, CompanyId, CompanyPatch, MeetingRecord, PaymentRecord, Tier,
};
use super::import::parse_company_drafts;
use super::repository::CompanyRepository;
use super::service::CompanyServiceError;

type SharedState<C, A, U> = Arc<CrmState<C, A, U>>;

/// Router builder exposing company CRUD, tracking updates, and the bulk tier refresh.
pub fn company_router<C, A, U>(state: SharedState<C, A, U>) -> Router
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
    U: UserDirectory + 'static,
{
    Router::new()
        .route(
            "/api/v1/companies",
            post(create_handler::<C, A, U>).get(list_handler::<C, A, U>),
        )
        .route("/api/v1/companies/import", post(import_handler::<C, A, U>))
        .route(
            "/api/v1/companies/tiers/refresh",
            post(refresh_tiers_handler::<C, A, U>),
        )
        .route(
            "/api/v1/companies/:company_id",
            get(get_handler::<C, A, U>)
                .patch(update_handler::<C, A, U>)
                .delete(delete_handler::<C, A, U>),
        )
        .route(
            "/api/v1/companies/:company_id/payments",
            post(payment_handler::<C, A, U>),
        )
        .route(
            "/api/v1/companies/:company_id/meetings",
            post(meeting_handler::<C, A, U>),
        )
        .with_state(state)
}

pub(crate) async fn create_handler<C, A, U>(
    State(state): State<SharedState<C, A, U>>,
    Json(draft): Json<CompanyDraft>,
) -> Response
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
    U: UserDirectory + 'static,
{
    match state.companies.create(draft, Utc::now()) {
        Ok(company) => {
            state.cache.invalidate_all();
            (StatusCode::CREATED, Json(company)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_handler<C, A, U>(
    State(state): State<SharedState<C, A, U>>,
    Query(filter): Query<CompanyFilter>,
) -> Response
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
    U: UserDirectory + 'static,
{
    let key = format!(
        "companies?tier={}",
        filter.tier.map(Tier::label).unwrap_or("all")
    );
    if let Some(cached) = state.cache.get(&key) {
        return (StatusCode::OK, Json(cached)).into_response();
    }

    match state.companies.list(&filter) {
        Ok(companies) => {
            let payload = json!(companies);
            state.cache.set(key, payload.clone());
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn import_handler<C, A, U>(
    State(state): State<SharedState<C, A, U>>,
    body: String,
) -> Response
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
    U: UserDirectory + 'static,
{
    let drafts = match parse_company_drafts(Cursor::new(body.into_bytes())) {
        Ok(drafts) => drafts,
        Err(err) => {
            let payload = json!({ "error": err.to_string() });
            return (StatusCode::BAD_REQUEST, Json(payload)).into_response();
        }
    };

    let now = Utc::now();
    let today = now.date_naive();
    if let Some((index, err)) = drafts
        .iter()
        .enumerate()
        .find_map(|(index, draft)| draft.validate(today).err().map(|err| (index, err)))
    {
        let payload = json!({ "error": format!("row {}: {err}", index + 2) });
        return (StatusCode::UNPROCESSABLE_ENTITY, Json(payload)).into_response();
    }

    let mut companies = Vec::with_capacity(drafts.len());
    for draft in drafts {
        match state.companies.create(draft, now) {
            Ok(company) => companies.push(company),
            Err(err) => {
                state.cache.invalidate_all();
                return error_response(err);
            }
        }
    }

    state.cache.invalidate_all();
    let payload = json!({ "imported": companies.len(), "companies": companies });
    (StatusCode::CREATED, Json(payload)).into_response()
}

pub(crate) async fn refresh_tiers_handler<C, A, U>(
    State(state): State<SharedState<C, A, U>>,
) -> Response
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
    U: UserDirectory + 'static,
{
    match state.companies.update_all_tiers(Utc::now()) {
        Ok(refresh) => {
            state.cache.invalidate_all();
            (StatusCode::OK, Json(refresh)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_handler<C, A, U>(
    State(state): State<SharedState<C, A, U>>,
    Path(company_id): Path<CompanyId>,
) -> Response
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
    U: UserDirectory + 'static,
{
    match state.companies.get(&company_id) {
        Ok(company) => (StatusCode::OK, Json(company)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_handler<C, A, U>(
    State(state): State<SharedState<C, A, U>>,
    Path(company_id): Path<CompanyId>,
    Json(patch): Json<CompanyPatch>,
) -> Response
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
    U: UserDirectory + 'static,
{
    match state.companies.update(&company_id, patch, Utc::now()) {
        Ok(company) => {
            state.cache.invalidate_all();
            (StatusCode::OK, Json(company)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_handler<C, A, U>(
    State(state): State<SharedState<C, A, U>>,
    Path(company_id): Path<CompanyId>,
) -> Response
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
    U: UserDirectory + 'static,
{
    let result = state.companies.delete(&company_id);
    state.cache.invalidate_all();
    match result {
        Ok(deletion) => (StatusCode::OK, Json(deletion)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn payment_handler<C, A, U>(
    State(state): State<SharedState<C, A, U>>,
    Path(company_id): Path<CompanyId>,
    Json(payment): Json<PaymentRecord>,
) -> Response
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
    U: UserDirectory + 'static,
{
    match state
        .companies
        .record_payment(&company_id, payment, Utc::now())
    {
        Ok(company) => {
            state.cache.invalidate_all();
            (StatusCode::OK, Json(company)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn meeting_handler<C, A, U>(
    State(state): State<SharedState<C, A, U>>,
    Path(company_id): Path<CompanyId>,
    Json(meeting): Json<MeetingRecord>,
) -> Response
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
    U: UserDirectory + 'static,
{
    match state
        .companies
        .record_meeting(&company_id, meeting, Utc::now())
    {
        Ok(company) => {
            state.cache.invalidate_all();
            (StatusCode::OK, Json(company)).into_response()
        }
        Err(err) => error_response(err),
    }
}

fn error_response(err: CompanyServiceError) -> Response {
    let status = match &err {
        CompanyServiceError::NotFound(_)
        | CompanyServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        CompanyServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CompanyServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        CompanyServiceError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": err.to_string() });
    (status, Json(payload)).into_response()
}
