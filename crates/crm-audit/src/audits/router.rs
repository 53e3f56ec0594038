use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::companies::{CompanyId, CompanyRepository};
use crate::error::RepositoryError;
use crate::state::CrmState;

use super::domain::{AuditDraft, AuditFilter, AuditId, AuditPatch, AuditStatus, UserId};
use super::repository::{AuditRepository, UserDirectory};
use super::scheduler::SchedulerError;

type SharedState<C, A, U> = Arc<CrmState<C, A, U>>;

const STATISTICS_KEY: &str = "audits:statistics";

#[derive(Debug, Deserialize)]
pub struct ScheduleAuditRequest {
    pub company_id: CompanyId,
    #[serde(default)]
    pub assigned_to: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RescheduleRequest {
    #[serde(default)]
    pub assigned_to: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CompleteAuditRequest {
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuditListQuery {
    #[serde(default)]
    pub company_id: Option<CompanyId>,
    #[serde(default)]
    pub status: Option<AuditStatus>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpcomingQuery {
    #[serde(default)]
    pub days: Option<i64>,
}

/// Router builder exposing audit CRUD and the scheduling operations.
pub fn audit_router<C, A, U>(state: SharedState<C, A, U>) -> Router
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
    U: UserDirectory + 'static,
{
    Router::new()
        .route(
            "/api/v1/audits",
            post(create_handler::<C, A, U>).get(list_handler::<C, A, U>),
        )
        .route("/api/v1/audits/schedule", post(schedule_handler::<C, A, U>))
        .route(
            "/api/v1/audits/reschedule",
            post(reschedule_handler::<C, A, U>),
        )
        .route(
            "/api/v1/audits/statistics",
            get(statistics_handler::<C, A, U>),
        )
        .route("/api/v1/audits/overdue", get(overdue_handler::<C, A, U>))
        .route(
            "/api/v1/audits/overdue/process",
            post(process_overdue_handler::<C, A, U>),
        )
        .route("/api/v1/audits/upcoming", get(upcoming_handler::<C, A, U>))
        .route(
            "/api/v1/audits/:audit_id",
            get(get_handler::<C, A, U>)
                .patch(update_handler::<C, A, U>)
                .delete(delete_handler::<C, A, U>),
        )
        .route(
            "/api/v1/audits/:audit_id/complete",
            post(complete_handler::<C, A, U>),
        )
        .with_state(state)
}

pub(crate) async fn schedule_handler<C, A, U>(
    State(state): State<SharedState<C, A, U>>,
    Json(request): Json<ScheduleAuditRequest>,
) -> Response
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
    U: UserDirectory + 'static,
{
    let assigned_to = match UserId::parse(request.assigned_to.as_deref()) {
        Ok(user) => user,
        Err(err) => return error_response(err.into()),
    };

    // schedule_initial_audit does not deduplicate on its own
    match state.audits.outstanding_audit(&request.company_id) {
        Ok(Some(existing)) => {
            return error_response(SchedulerError::OutstandingAudit {
                company_id: request.company_id,
                audit_id: existing.id,
            })
        }
        Ok(None) => {}
        Err(err) => return error_response(err),
    }

    match state
        .audits
        .schedule_initial_audit(&request.company_id, &assigned_to, Utc::now())
    {
        Ok(audit) => {
            state.cache.invalidate_all();
            (StatusCode::CREATED, Json(audit)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn complete_handler<C, A, U>(
    State(state): State<SharedState<C, A, U>>,
    Path(audit_id): Path<AuditId>,
    request: Option<Json<CompleteAuditRequest>>,
) -> Response
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
    U: UserDirectory + 'static,
{
    let notes = request.and_then(|Json(body)| body.notes);
    match state.audits.complete_audit(&audit_id, notes, Utc::now()) {
        Ok(completion) => {
            state.cache.invalidate_all();
            (StatusCode::OK, Json(completion)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn process_overdue_handler<C, A, U>(
    State(state): State<SharedState<C, A, U>>,
) -> Response
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
    U: UserDirectory + 'static,
{
    match state.audits.process_overdue_audits(Utc::now()) {
        Ok(sweep) => {
            if sweep.marked_count > 0 {
                state.cache.invalidate_all();
            }
            (StatusCode::OK, Json(sweep)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn reschedule_handler<C, A, U>(
    State(state): State<SharedState<C, A, U>>,
    Json(request): Json<RescheduleRequest>,
) -> Response
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
    U: UserDirectory + 'static,
{
    let fallback = match UserId::parse(request.assigned_to.as_deref()) {
        Ok(user) => user,
        Err(err) => return error_response(err.into()),
    };

    match state.audits.update_all_schedules(&fallback, Utc::now()) {
        Ok(refresh) => {
            state.cache.invalidate_all();
            (StatusCode::OK, Json(refresh)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn statistics_handler<C, A, U>(
    State(state): State<SharedState<C, A, U>>,
) -> Response
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
    U: UserDirectory + 'static,
{
    if let Some(cached) = state.cache.get(STATISTICS_KEY) {
        return (StatusCode::OK, Json(cached)).into_response();
    }

    match state.audits.get_statistics(Utc::now()) {
        Ok(statistics) => {
            let payload = json!(statistics);
            state.cache.set(STATISTICS_KEY.to_string(), payload.clone());
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn create_handler<C, A, U>(
    State(state): State<SharedState<C, A, U>>,
    Json(draft): Json<AuditDraft>,
) -> Response
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
    U: UserDirectory + 'static,
{
    match state.audits.create_audit(draft, Utc::now()) {
        Ok(audit) => {
            state.cache.invalidate_all();
            (StatusCode::CREATED, Json(audit)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn list_handler<C, A, U>(
    State(state): State<SharedState<C, A, U>>,
    Query(query): Query<AuditListQuery>,
) -> Response
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
    U: UserDirectory + 'static,
{
    let filter = AuditFilter {
        company_id: query.company_id,
        status: query.status,
        ..AuditFilter::default()
    };
    match state.audits.list_audits(&filter) {
        Ok(audits) => (StatusCode::OK, Json(audits)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn overdue_handler<C, A, U>(
    State(state): State<SharedState<C, A, U>>,
) -> Response
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
    U: UserDirectory + 'static,
{
    match state.audits.overdue_audits(Utc::now()) {
        Ok(audits) => (StatusCode::OK, Json(audits)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn upcoming_handler<C, A, U>(
    State(state): State<SharedState<C, A, U>>,
    Query(query): Query<UpcomingQuery>,
) -> Response
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
    U: UserDirectory + 'static,
{
    let days = query.days.unwrap_or(7);
    match state.audits.upcoming_audits(Utc::now(), days) {
        Ok(audits) => (StatusCode::OK, Json(audits)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn get_handler<C, A, U>(
    State(state): State<SharedState<C, A, U>>,
    Path(audit_id): Path<AuditId>,
) -> Response
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
    U: UserDirectory + 'static,
{
    match state.audits.get_audit(&audit_id) {
        Ok(audit) => (StatusCode::OK, Json(audit)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn update_handler<C, A, U>(
    State(state): State<SharedState<C, A, U>>,
    Path(audit_id): Path<AuditId>,
    Json(patch): Json<AuditPatch>,
) -> Response
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
    U: UserDirectory + 'static,
{
    match state.audits.update_audit(&audit_id, patch, Utc::now()) {
        Ok(audit) => {
            state.cache.invalidate_all();
            (StatusCode::OK, Json(audit)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn delete_handler<C, A, U>(
    State(state): State<SharedState<C, A, U>>,
    Path(audit_id): Path<AuditId>,
) -> Response
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
    U: UserDirectory + 'static,
{
    match state.audits.delete_audit(&audit_id) {
        Ok(()) => {
            state.cache.invalidate_all();
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => error_response(err),
    }
}

fn error_response(err: SchedulerError) -> Response {
    let status = match &err {
        SchedulerError::CompanyNotFound(_)
        | SchedulerError::AuditNotFound(_)
        | SchedulerError::UserNotFound(_)
        | SchedulerError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        SchedulerError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        SchedulerError::AlreadyCompleted(_)
        | SchedulerError::OutstandingAudit { .. }
        | SchedulerError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        SchedulerError::Repository(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": err.to_string() });
    (status, Json(payload)).into_response()
}
