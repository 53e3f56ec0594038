use crate::infra::{
    classify_preview, deserialize_date, deserialize_optional_date, start_of_day, AppState,
    ClassificationPreview,
};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use chrono::{NaiveDate, Utc};
use crm_audit::audits::{AuditRepository, UserDirectory};
use crm_audit::companies::CompanyRepository;
use crm_audit::{crm_router, CrmState};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct ClassifyRequest {
    #[serde(deserialize_with = "deserialize_date")]
    pub(crate) start_date: NaiveDate,
    #[serde(default)]
    pub(crate) ad_spend: f64,
    #[serde(default, deserialize_with = "deserialize_optional_date")]
    pub(crate) today: Option<NaiveDate>,
}

pub(crate) fn with_crm_routes<C, A, U>(state: Arc<CrmState<C, A, U>>) -> axum::Router
where
    C: CompanyRepository + 'static,
    A: AuditRepository + 'static,
    U: UserDirectory + 'static,
{
    crm_router(state)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/classify", axum::routing::post(classify_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

pub(crate) async fn classify_endpoint(
    Extension(state): Extension<AppState>,
    Json(request): Json<ClassifyRequest>,
) -> Result<Json<ClassificationPreview>, (StatusCode, Json<serde_json::Value>)> {
    if !request.ad_spend.is_finite() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "error": "ad spend must be a finite number" })),
        ));
    }

    let now = request.today.map(start_of_day).unwrap_or_else(Utc::now);
    Ok(Json(classify_preview(
        &state.tier_policy,
        request.start_date,
        request.ad_spend,
        now,
    )))
}
