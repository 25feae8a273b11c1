use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::domain::RequisitionStatus;
use super::forecast::ForecastProvider;
use super::normalize::{normalize_action, normalize_patch, normalize_submission};
use super::repository::{RequisitionFilter, RequisitionStore};
use super::service::{
    RequisitionPatch, RequisitionService, RequisitionServiceError, RequisitionSubmission,
};
use super::transition::{ActionRequest, TransitionError};

type SharedService<S, F> = Arc<RequisitionService<S, F>>;

/// Router builder exposing the requisition workflow over HTTP.
pub fn requisition_router<S, F>(service: SharedService<S, F>) -> Router
where
    S: RequisitionStore + 'static,
    F: ForecastProvider + 'static,
{
    Router::new()
        .route(
            "/api/recruitment/job-requisitions",
            get(list_handler::<S, F>).post(create_handler::<S, F>),
        )
        .route(
            "/api/recruitment/job-requisitions/:requisition_id",
            get(fetch_handler::<S, F>)
                .put(update_handler::<S, F>)
                .delete(delete_handler::<S, F>),
        )
        .route(
            "/api/recruitment/job-requisitions/:requisition_id/workflow/:step_id/action",
            post(action_handler::<S, F>),
        )
        .route("/api/recruitment/stats", get(stats_handler::<S, F>))
        .route(
            "/api/recruitment/headcount-forecast",
            get(forecast_handler::<S, F>),
        )
        .with_state(service)
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ListQuery {
    #[serde(default)]
    skip: Option<usize>,
    #[serde(default)]
    limit: Option<usize>,
    #[serde(default)]
    status: Option<RequisitionStatus>,
    #[serde(default)]
    department: Option<String>,
}

pub(crate) async fn list_handler<S, F>(
    State(service): State<SharedService<S, F>>,
    Query(query): Query<ListQuery>,
) -> Response
where
    S: RequisitionStore + 'static,
    F: ForecastProvider + 'static,
{
    let filter = RequisitionFilter {
        status: query.status,
        department: query.department,
    };
    let skip = query.skip.unwrap_or(0);
    let limit = query.limit.unwrap_or(service.settings().page_limit);

    match service.list(&filter, skip, limit) {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn fetch_handler<S, F>(
    State(service): State<SharedService<S, F>>,
    Path(requisition_id): Path<String>,
) -> Response
where
    S: RequisitionStore + 'static,
    F: ForecastProvider + 'static,
{
    match service.get(&requisition_id) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn create_handler<S, F>(
    State(service): State<SharedService<S, F>>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response
where
    S: RequisitionStore + 'static,
    F: ForecastProvider + 'static,
{
    let submission: RequisitionSubmission = match read_body(payload)
        .and_then(|payload| parse_payload(normalize_submission(payload)))
    {
        Ok(submission) => submission,
        Err(response) => return response,
    };

    match service.create(submission.department_request, &submission.created_by) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_handler<S, F>(
    State(service): State<SharedService<S, F>>,
    Path(requisition_id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response
where
    S: RequisitionStore + 'static,
    F: ForecastProvider + 'static,
{
    let patch: RequisitionPatch = match read_body(payload)
        .and_then(|payload| parse_payload(normalize_patch(payload)))
    {
        Ok(patch) => patch,
        Err(response) => return response,
    };

    match service.update(&requisition_id, patch) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn delete_handler<S, F>(
    State(service): State<SharedService<S, F>>,
    Path(requisition_id): Path<String>,
) -> Response
where
    S: RequisitionStore + 'static,
    F: ForecastProvider + 'static,
{
    match service.soft_delete(&requisition_id) {
        Ok(true) => (StatusCode::OK, Json(json!({ "success": true }))).into_response(),
        Ok(false) => error_response(RequisitionServiceError::NotFound(requisition_id)),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn action_handler<S, F>(
    State(service): State<SharedService<S, F>>,
    Path((requisition_id, step_id)): Path<(String, String)>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Response
where
    S: RequisitionStore + 'static,
    F: ForecastProvider + 'static,
{
    let request: ActionRequest = match read_body(payload)
        .and_then(|payload| parse_payload(normalize_action(payload)))
    {
        Ok(request) => request,
        Err(response) => return response,
    };

    match service.act(&requisition_id, &step_id, &request) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn stats_handler<S, F>(State(service): State<SharedService<S, F>>) -> Response
where
    S: RequisitionStore + 'static,
    F: ForecastProvider + 'static,
{
    match service.stats() {
        Ok(stats) => (StatusCode::OK, Json(stats)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn forecast_handler<S, F>(State(service): State<SharedService<S, F>>) -> Response
where
    S: RequisitionStore + 'static,
    F: ForecastProvider + 'static,
{
    match service.forecast() {
        Ok(forecast) => (StatusCode::OK, Json(forecast)).into_response(),
        Err(error) => error_response(error),
    }
}

/// Malformed bodies get the same error envelope as every other failure.
fn read_body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, Response> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        let body = json!({
            "error": rejection.body_text(),
            "kind": "invalid_payload",
        });
        (rejection.status(), Json(body)).into_response()
    })
}

fn parse_payload<T: DeserializeOwned>(payload: Value) -> Result<T, Response> {
    serde_json::from_value(payload).map_err(|err| {
        let body = json!({
            "error": format!("invalid payload: {err}"),
            "kind": "validation_error",
        });
        (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
    })
}

pub(crate) fn error_response(error: RequisitionServiceError) -> Response {
    let (status, kind) = match &error {
        RequisitionServiceError::Validation(_) => {
            (StatusCode::UNPROCESSABLE_ENTITY, "validation_error")
        }
        RequisitionServiceError::NotFound(_)
        | RequisitionServiceError::Transition(TransitionError::StepNotFound { .. }) => {
            (StatusCode::NOT_FOUND, "not_found")
        }
        RequisitionServiceError::Transition(TransitionError::InvalidTransition { .. }) => {
            (StatusCode::CONFLICT, "invalid_transition")
        }
        RequisitionServiceError::Transition(TransitionError::AlreadyTerminal { .. }) => {
            (StatusCode::CONFLICT, "already_terminal")
        }
        RequisitionServiceError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
        RequisitionServiceError::Duplicate(_) => (StatusCode::CONFLICT, "duplicate"),
        RequisitionServiceError::StoreUnavailable(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "store_unavailable")
        }
        RequisitionServiceError::Forecast(_) => {
            (StatusCode::SERVICE_UNAVAILABLE, "forecast_unavailable")
        }
    };

    let payload = json!({
        "error": error.to_string(),
        "kind": kind,
    });
    (status, Json(payload)).into_response()
}
