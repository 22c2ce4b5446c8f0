use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use crate::{
    db::models::{Invite, Project},
    error::Result,
    middleware::auth::Session,
    services::invites::InviteWorkflow,
    AppState,
};

/// Mounted behind the optional-session middleware.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/:token", get(preview_invite))
        .route("/:token/accept", post(accept_invite))
}

#[derive(Debug, Serialize)]
pub struct InviteResponse {
    pub invite: Invite,
    pub link: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvitePreviewResponse {
    pub invite: Invite,
    pub project_name: String,
    pub project_code: String,
}

#[derive(Debug, Serialize)]
pub struct AcceptInviteResponse {
    pub invite: Invite,
    pub project: Project,
}

async fn preview_invite(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Json<InvitePreviewResponse>> {
    let (invite, project) = InviteWorkflow::preview(&state.db.pool, &token).await?;
    Ok(Json(InvitePreviewResponse {
        invite,
        project_name: project.project_name,
        project_code: project.project_code,
    }))
}

async fn accept_invite(
    State(state): State<AppState>,
    session: Option<Session>,
    Path(token): Path<String>,
) -> Result<Json<AcceptInviteResponse>> {
    let (invite, project) =
        InviteWorkflow::accept(&state.db.pool, &token, session.as_ref()).await?;
    Ok(Json(AcceptInviteResponse { invite, project }))
}
