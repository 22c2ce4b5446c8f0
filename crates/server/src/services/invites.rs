//! Invite workflow: single-use tokens that attach a user to a project.
//!
//! An invite moves from `pending` to `used` exactly once. Acceptance binds the
//! project and consumes the invite inside one transaction; the consuming
//! update is conditional on the invite still being pending, so two racing
//! acceptances cannot both succeed.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::{
    db::models::{Invite, InviteRole, InviteStatus, Project},
    error::{AppError, Result},
    middleware::auth::Session,
    policy::Action,
    services::projects::ProjectRegistry,
};

const COLUMNS: &str = "id, project_id, role_to_assign, status, created_at, used_by, used_at";

/// Where an anonymous visitor is sent before coming back to the invite.
pub fn sign_in_redirect(token: &str) -> String {
    format!("/login?redirect=/invite/{token}")
}

pub struct InviteWorkflow;

impl InviteWorkflow {
    pub async fn create(
        pool: &SqlitePool,
        session: &Session,
        project_id: &str,
        role_to_assign: InviteRole,
    ) -> Result<Invite> {
        ProjectRegistry::get_authorized(pool, session, project_id, Action::Administer).await?;

        let query = format!(
            "INSERT INTO invites (id, project_id, role_to_assign, status, created_at) VALUES (?, ?, ?, ?, ?) RETURNING {COLUMNS}"
        );
        let invite = sqlx::query_as::<_, Invite>(&query)
            .bind(Uuid::new_v4().to_string())
            .bind(project_id)
            .bind(role_to_assign)
            .bind(InviteStatus::Pending)
            .bind(Utc::now())
            .fetch_one(pool)
            .await?;

        tracing::info!(project_id, invite_id = %invite.id, role = ?role_to_assign, "Issued invite");
        Ok(invite)
    }

    pub async fn find(pool: &SqlitePool, token: &str) -> Result<Option<Invite>> {
        let query = format!("SELECT {COLUMNS} FROM invites WHERE id = ?");
        let invite = sqlx::query_as::<_, Invite>(&query)
            .bind(token)
            .fetch_optional(pool)
            .await?;
        Ok(invite)
    }

    /// Checks that `token` is still usable and returns it with its project.
    pub async fn preview(pool: &SqlitePool, token: &str) -> Result<(Invite, Project)> {
        let invite = Self::find(pool, token)
            .await?
            .ok_or_else(|| AppError::NotFound("Invalid invite link".to_string()))?;
        if invite.status == InviteStatus::Used {
            return Err(AppError::AlreadyUsed(
                "This invite link has already been used".to_string(),
            ));
        }
        let project = ProjectRegistry::find(pool, &invite.project_id)
            .await?
            .ok_or_else(|| {
                AppError::ProjectMissing(
                    "Project associated with this invite not found".to_string(),
                )
            })?;
        Ok((invite, project))
    }

    /// Consumes `token` on behalf of `session`.
    ///
    /// Without a session the caller gets a sign-in redirect that leads back
    /// to the invite. A client invite replaces any existing owner.
    ///
    /// The invite is claimed by the first statement of the transaction, so
    /// the write lock is taken before anything is read. A concurrent
    /// acceptance waits for it and then finds the invite used.
    pub async fn accept(
        pool: &SqlitePool,
        token: &str,
        session: Option<&Session>,
    ) -> Result<(Invite, Project)> {
        let session = session.ok_or_else(|| AppError::SignInRequired {
            redirect: sign_in_redirect(token),
        })?;
        let user_id = session.user_id();

        let mut tx = pool.begin().await?;

        let claim = format!(
            "UPDATE invites SET status = ?, used_by = ?, used_at = ? WHERE id = ? AND status = ? RETURNING {COLUMNS}"
        );
        let claimed = sqlx::query_as::<_, Invite>(&claim)
            .bind(InviteStatus::Used)
            .bind(user_id)
            .bind(Utc::now())
            .bind(token)
            .bind(InviteStatus::Pending)
            .fetch_optional(&mut *tx)
            .await?;

        let invite = match claimed {
            Some(invite) => invite,
            None => {
                let query = format!("SELECT {COLUMNS} FROM invites WHERE id = ?");
                let existing = sqlx::query_as::<_, Invite>(&query)
                    .bind(token)
                    .fetch_optional(&mut *tx)
                    .await?;
                return Err(match existing {
                    Some(_) => AppError::AlreadyUsed(
                        "This invite link has already been used".to_string(),
                    ),
                    None => AppError::NotFound("Invalid invite link".to_string()),
                });
            }
        };

        // Dropping `tx` on any error below puts the invite back to pending.
        let project = ProjectRegistry::find(&mut *tx, &invite.project_id)
            .await?
            .ok_or_else(|| {
                AppError::ProjectMissing(
                    "Project associated with this invite not found".to_string(),
                )
            })?;

        match invite.role_to_assign {
            InviteRole::Client => {
                if !project.owner_id.is_empty() && project.owner_id != user_id {
                    tracing::warn!(
                        project_id = %project.id,
                        previous_owner = %project.owner_id,
                        new_owner = user_id,
                        "Invite replaces existing project owner"
                    );
                }
                sqlx::query("UPDATE projects SET owner_id = ? WHERE id = ?")
                    .bind(user_id)
                    .bind(&project.id)
                    .execute(&mut *tx)
                    .await?;
            }
            InviteRole::Staff => {
                ProjectRegistry::insert_staff(&mut *tx, &project.id, user_id).await?;
            }
        }

        let project = ProjectRegistry::find(&mut *tx, &invite.project_id)
            .await?
            .ok_or_else(|| {
                AppError::ProjectMissing(
                    "Project associated with this invite not found".to_string(),
                )
            })?;

        tx.commit().await?;

        tracing::info!(
            invite_id = %invite.id,
            project_id = %project.id,
            user_id,
            "Accepted invite"
        );
        Ok((invite, project))
    }
}
