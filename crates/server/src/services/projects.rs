//! Project registry: role-scoped listing, creation and staff assignment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::{
    db::models::{ChangeRequest, Installment, Project, ProjectRow, ProjectStatus, User},
    error::{AppError, Result},
    middleware::auth::Session,
    policy::{self, Action, ProjectScope},
    services::{
        change_requests::ChangeRequestLog, installments::InstallmentLedger,
        profiles::ProfileStore,
    },
};

/// Upper bound on staff per project.
pub const MAX_ASSIGNED_STAFF: usize = 10;

const SELECT_PROJECT: &str = r#"
    SELECT p.id, p.project_name, p.project_code, p.location, p.total_price, p.status,
           p.owner_id, p.created_at,
           (SELECT json_group_array(ps.user_id) FROM project_staff ps
            WHERE ps.project_id = p.id) AS assigned_staff_ids
    FROM projects p
"#;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProject {
    pub project_name: String,
    pub project_code: String,
    pub location: String,
    pub total_price: f64,
}

/// Everything the project screen shows, fetched together.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectDetail {
    pub project: Project,
    pub installments: Vec<Installment>,
    pub change_requests: Vec<ChangeRequest>,
    pub assigned_staff: Vec<User>,
}

pub struct ProjectRegistry;

impl ProjectRegistry {
    /// Projects visible to `session`, newest first. No role means no projects.
    pub async fn list(pool: &SqlitePool, session: &Session) -> Result<Vec<Project>> {
        let rows = match ProjectScope::for_session(session) {
            ProjectScope::All => {
                let query = format!("{SELECT_PROJECT} ORDER BY p.created_at DESC");
                sqlx::query_as::<_, ProjectRow>(&query)
                    .fetch_all(pool)
                    .await?
            }
            ProjectScope::AssignedStaff(user_id) => {
                let query = format!(
                    "{SELECT_PROJECT}
                     WHERE EXISTS (SELECT 1 FROM project_staff m
                                   WHERE m.project_id = p.id AND m.user_id = ?)
                     ORDER BY p.created_at DESC"
                );
                sqlx::query_as::<_, ProjectRow>(&query)
                    .bind(user_id)
                    .fetch_all(pool)
                    .await?
            }
            ProjectScope::Owner(user_id) => {
                let query = format!(
                    "{SELECT_PROJECT} WHERE p.owner_id = ? AND p.owner_id <> '' ORDER BY p.created_at DESC"
                );
                sqlx::query_as::<_, ProjectRow>(&query)
                    .bind(user_id)
                    .fetch_all(pool)
                    .await?
            }
            ProjectScope::Nothing => Vec::new(),
        };

        Ok(rows.into_iter().map(Project::from).collect())
    }

    /// Unscoped lookup. Callers apply the policy themselves.
    pub async fn find<'e, E>(executor: E, project_id: &str) -> Result<Option<Project>>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        let query = format!("{SELECT_PROJECT} WHERE p.id = ?");
        let row = sqlx::query_as::<_, ProjectRow>(&query)
            .bind(project_id)
            .fetch_optional(executor)
            .await?;
        Ok(row.map(Project::from))
    }

    /// Loads a project and checks `action` against it.
    pub async fn get_authorized(
        pool: &SqlitePool,
        session: &Session,
        project_id: &str,
        action: Action,
    ) -> Result<Project> {
        let project = Self::find(pool, project_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Project not found".to_string()))?;
        policy::authorize(session, action, &project)?;
        Ok(project)
    }

    /// The project with its ledger, change log and staff profiles.
    pub async fn detail(
        pool: &SqlitePool,
        session: &Session,
        project_id: &str,
    ) -> Result<ProjectDetail> {
        let project = Self::get_authorized(pool, session, project_id, Action::View).await?;

        let (installments, change_requests, assigned_staff) = futures::try_join!(
            InstallmentLedger::list_for_project(pool, project_id),
            ChangeRequestLog::list_for_project(pool, project_id),
            ProfileStore::list_assigned_staff(pool, project_id),
        )?;

        Ok(ProjectDetail {
            project,
            installments,
            change_requests,
            assigned_staff,
        })
    }

    pub async fn create(pool: &SqlitePool, session: &Session, input: &NewProject) -> Result<Project> {
        policy::require_admin(session)?;
        Self::insert(pool, input, Utc::now()).await
    }

    /// Inserts an active, unowned project with no staff.
    pub async fn insert(
        pool: &SqlitePool,
        input: &NewProject,
        created_at: DateTime<Utc>,
    ) -> Result<Project> {
        if input.project_name.trim().is_empty() {
            return Err(AppError::Validation("Project name is required".to_string()));
        }
        if !input.total_price.is_finite() || input.total_price < 0.0 {
            return Err(AppError::Validation(
                "Total price must be a non-negative number".to_string(),
            ));
        }

        let project = Project {
            id: Uuid::new_v4().to_string(),
            project_name: input.project_name.trim().to_string(),
            project_code: input.project_code.trim().to_string(),
            location: input.location.trim().to_string(),
            total_price: input.total_price,
            status: ProjectStatus::Active,
            owner_id: String::new(),
            assigned_staff_ids: Vec::new(),
            created_at,
        };

        sqlx::query(
            "INSERT INTO projects (id, project_name, project_code, location, total_price, status, owner_id, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&project.id)
        .bind(&project.project_name)
        .bind(&project.project_code)
        .bind(&project.location)
        .bind(project.total_price)
        .bind(project.status)
        .bind(&project.owner_id)
        .bind(project.created_at)
        .execute(pool)
        .await?;

        tracing::info!(project_id = %project.id, code = %project.project_code, "Created project");
        Ok(project)
    }

    /// Assigns the staff profile registered under `email`.
    pub async fn add_staff(
        pool: &SqlitePool,
        session: &Session,
        project_id: &str,
        email: &str,
    ) -> Result<Project> {
        let project = Self::get_authorized(pool, session, project_id, Action::Administer).await?;

        let staff = ProfileStore::find_staff_by_email(pool, email)
            .await?
            .ok_or_else(|| {
                AppError::NotFound("Staff user not found with this email".to_string())
            })?;

        if project.has_staff(&staff.id) {
            return Ok(project);
        }
        if project.assigned_staff_ids.len() >= MAX_ASSIGNED_STAFF {
            return Err(AppError::Validation(format!(
                "A project can have at most {MAX_ASSIGNED_STAFF} staff members"
            )));
        }

        Self::insert_staff(pool, project_id, &staff.id).await?;
        tracing::info!(project_id, staff_id = %staff.id, "Assigned staff");

        Self::find(pool, project_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Project not found".to_string()))
    }

    /// Adds a membership row; already-assigned users are left as they are.
    pub async fn insert_staff<'e, E>(executor: E, project_id: &str, user_id: &str) -> Result<()>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        sqlx::query(
            "INSERT INTO project_staff (project_id, user_id, added_at) VALUES (?, ?, ?) ON CONFLICT (project_id, user_id) DO NOTHING",
        )
        .bind(project_id)
        .bind(user_id)
        .bind(Utc::now())
        .execute(executor)
        .await?;
        Ok(())
    }

    pub async fn remove_staff(
        pool: &SqlitePool,
        session: &Session,
        project_id: &str,
        user_id: &str,
    ) -> Result<Project> {
        Self::get_authorized(pool, session, project_id, Action::Administer).await?;

        let result = sqlx::query("DELETE FROM project_staff WHERE project_id = ? AND user_id = ?")
            .bind(project_id)
            .bind(user_id)
            .execute(pool)
            .await?;
        if result.rows_affected() > 0 {
            tracing::info!(project_id, staff_id = user_id, "Removed staff");
        }

        Self::find(pool, project_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Project not found".to_string()))
    }
}
