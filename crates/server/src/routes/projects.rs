use axum::{
    extract::{rejection::JsonRejection, Path, State},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::{
    db::models::{InviteRole, Project},
    error::{AppError, Result},
    middleware::auth::Session,
    services::{
        invites::InviteWorkflow,
        projects::{NewProject, ProjectDetail, ProjectRegistry},
    },
    AppState,
};

use super::invites::InviteResponse;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route("/:id", get(get_project))
        .route("/:id/staff", post(add_staff))
        .route("/:id/staff/:user_id", delete(remove_staff))
        .route("/:id/invites", post(create_invite))
}

#[derive(Debug, Serialize)]
pub struct ProjectListResponse {
    pub projects: Vec<Project>,
}

#[derive(Debug, Deserialize)]
pub struct AddStaffRequest {
    pub email: String,
}

/// The whole body may be omitted; the role defaults to `client`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateInviteRequest {
    #[serde(default)]
    pub role_to_assign: Option<InviteRole>,
}

#[derive(Debug, Deserialize)]
pub struct StaffPathParams {
    pub id: String,
    pub user_id: String,
}

async fn list_projects(
    State(state): State<AppState>,
    session: Session,
) -> Result<Json<ProjectListResponse>> {
    let projects = ProjectRegistry::list(&state.db.pool, &session).await?;
    Ok(Json(ProjectListResponse { projects }))
}

async fn create_project(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<NewProject>,
) -> Result<Json<Project>> {
    let project = ProjectRegistry::create(&state.db.pool, &session, &body).await?;
    Ok(Json(project))
}

async fn get_project(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> Result<Json<ProjectDetail>> {
    let detail = ProjectRegistry::detail(&state.db.pool, &session, &id).await?;
    Ok(Json(detail))
}

async fn add_staff(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    Json(body): Json<AddStaffRequest>,
) -> Result<Json<Project>> {
    let project = ProjectRegistry::add_staff(&state.db.pool, &session, &id, &body.email).await?;
    Ok(Json(project))
}

async fn remove_staff(
    State(state): State<AppState>,
    session: Session,
    Path(params): Path<StaffPathParams>,
) -> Result<Json<Project>> {
    let project =
        ProjectRegistry::remove_staff(&state.db.pool, &session, &params.id, &params.user_id)
            .await?;
    Ok(Json(project))
}

async fn create_invite(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
    body: std::result::Result<Json<CreateInviteRequest>, JsonRejection>,
) -> Result<Json<InviteResponse>> {
    let body = match body {
        Ok(Json(body)) => body,
        Err(JsonRejection::MissingJsonContentType(_)) => CreateInviteRequest::default(),
        Err(rejection) => {
            return Err(AppError::Validation(format!(
                "Invalid invite request: {}",
                rejection.body_text()
            )));
        }
    };
    let role = body.role_to_assign.unwrap_or(InviteRole::Client);
    let invite = InviteWorkflow::create(&state.db.pool, &session, &id, role).await?;
    let link = state.config.invite_link(&invite.id);
    Ok(Json(InviteResponse { invite, link }))
}
