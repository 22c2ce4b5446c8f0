use axum::{
    extract::{Path, State},
    routing::{get, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    db::models::{ChangeRequest, ChangeRequestStatus},
    error::Result,
    middleware::auth::Session,
    services::change_requests::{ChangeRequestLog, NewChangeRequest},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/:id/change-requests",
            get(list_change_requests).post(submit_change_request),
        )
        .route(
            "/:id/change-requests/:request_id/status",
            put(review_change_request),
        )
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequestListResponse {
    pub change_requests: Vec<ChangeRequest>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub status: ChangeRequestStatus,
}

#[derive(Debug, Deserialize)]
pub struct RequestPathParams {
    pub id: String,
    pub request_id: String,
}

async fn list_change_requests(
    State(state): State<AppState>,
    session: Session,
    Path(project_id): Path<String>,
) -> Result<Json<ChangeRequestListResponse>> {
    let change_requests = ChangeRequestLog::list(&state.db.pool, &session, &project_id).await?;
    Ok(Json(ChangeRequestListResponse { change_requests }))
}

async fn submit_change_request(
    State(state): State<AppState>,
    session: Session,
    Path(project_id): Path<String>,
    Json(body): Json<NewChangeRequest>,
) -> Result<Json<ChangeRequest>> {
    let request = ChangeRequestLog::submit(&state.db.pool, &session, &project_id, &body).await?;
    Ok(Json(request))
}

async fn review_change_request(
    State(state): State<AppState>,
    session: Session,
    Path(params): Path<RequestPathParams>,
    Json(body): Json<ReviewRequest>,
) -> Result<Json<ChangeRequest>> {
    let request = ChangeRequestLog::review(
        &state.db.pool,
        &session,
        &params.id,
        &params.request_id,
        body.status,
    )
    .await?;
    Ok(Json(request))
}
