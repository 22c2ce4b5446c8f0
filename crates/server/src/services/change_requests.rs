//! Change-request log.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{types::Json, SqlitePool};
use uuid::Uuid;

use crate::{
    db::models::{ChangeRequest, ChangeRequestStatus, ChangeRequestType},
    error::{AppError, Result},
    middleware::auth::Session,
    policy::Action,
    services::projects::ProjectRegistry,
};

const COLUMNS: &str =
    "id, project_id, title, detail, type, price_impact, status, requested_by, images, created_at";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChangeRequest {
    pub title: String,
    #[serde(default)]
    pub detail: String,
    #[serde(rename = "type")]
    pub kind: ChangeRequestType,
    #[serde(default)]
    pub price_impact: f64,
}

pub struct ChangeRequestLog;

impl ChangeRequestLog {
    /// Requests on a project, newest first.
    pub async fn list(
        pool: &SqlitePool,
        session: &Session,
        project_id: &str,
    ) -> Result<Vec<ChangeRequest>> {
        ProjectRegistry::get_authorized(pool, session, project_id, Action::View).await?;
        Self::list_for_project(pool, project_id).await
    }

    pub(crate) async fn list_for_project(
        pool: &SqlitePool,
        project_id: &str,
    ) -> Result<Vec<ChangeRequest>> {
        let query = format!(
            "SELECT {COLUMNS} FROM change_requests WHERE project_id = ? ORDER BY created_at DESC"
        );
        let requests = sqlx::query_as::<_, ChangeRequest>(&query)
            .bind(project_id)
            .fetch_all(pool)
            .await?;
        Ok(requests)
    }

    /// Appends a draft request from the session user.
    ///
    /// `price_impact` is stored as given, memos included.
    pub async fn submit(
        pool: &SqlitePool,
        session: &Session,
        project_id: &str,
        input: &NewChangeRequest,
    ) -> Result<ChangeRequest> {
        ProjectRegistry::get_authorized(pool, session, project_id, Action::SubmitChangeRequest)
            .await?;
        Self::append(
            pool,
            project_id,
            &session.user.id,
            input,
            ChangeRequestStatus::Draft,
            Utc::now(),
        )
        .await
    }

    pub async fn append(
        pool: &SqlitePool,
        project_id: &str,
        requested_by: &str,
        input: &NewChangeRequest,
        status: ChangeRequestStatus,
        created_at: DateTime<Utc>,
    ) -> Result<ChangeRequest> {
        if input.title.trim().is_empty() {
            return Err(AppError::Validation("Request title is required".to_string()));
        }
        if !input.price_impact.is_finite() {
            return Err(AppError::Validation(
                "Price impact must be a number".to_string(),
            ));
        }

        let query = format!(
            "INSERT INTO change_requests ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
        );
        let request = sqlx::query_as::<_, ChangeRequest>(&query)
            .bind(Uuid::new_v4().to_string())
            .bind(project_id)
            .bind(input.title.trim())
            .bind(&input.detail)
            .bind(input.kind)
            .bind(input.price_impact)
            .bind(status)
            .bind(requested_by)
            .bind(Json(Vec::<String>::new()))
            .bind(created_at)
            .fetch_one(pool)
            .await?;

        tracing::info!(project_id, request_id = %request.id, kind = ?request.kind, "Submitted change request");
        Ok(request)
    }

    /// Admin decision on a request.
    pub async fn review(
        pool: &SqlitePool,
        session: &Session,
        project_id: &str,
        request_id: &str,
        status: ChangeRequestStatus,
    ) -> Result<ChangeRequest> {
        ProjectRegistry::get_authorized(pool, session, project_id, Action::Administer).await?;

        if status == ChangeRequestStatus::Draft {
            return Err(AppError::Validation(
                "A request can only be approved or rejected".to_string(),
            ));
        }

        let query = format!(
            "UPDATE change_requests SET status = ? WHERE id = ? AND project_id = ? RETURNING {COLUMNS}"
        );
        let request = sqlx::query_as::<_, ChangeRequest>(&query)
            .bind(status)
            .bind(request_id)
            .bind(project_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| AppError::NotFound("Change request not found".to_string()))?;

        tracing::info!(project_id, request_id, status = ?status, "Reviewed change request");
        Ok(request)
    }
}
