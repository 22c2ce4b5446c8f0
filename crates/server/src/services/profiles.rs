//! Profile store: maps identities to roles and display metadata.

use chrono::Utc;
use serde::Deserialize;
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::{
    db::models::{Role, User},
    error::{AppError, Result},
    middleware::auth::Session,
    policy,
};

const COLUMNS: &str = "id, email, full_name, role, avatar_url, created_at";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewProfile {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

pub struct ProfileStore;

impl ProfileStore {
    /// Role for `user_id`, or `None` when no profile exists yet.
    pub async fn resolve_role(pool: &SqlitePool, user_id: &str) -> Result<Option<Role>> {
        let role = sqlx::query_scalar::<_, Role>("SELECT role FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
        Ok(role)
    }

    pub async fn find(pool: &SqlitePool, user_id: &str) -> Result<Option<User>> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = ?");
        let user = sqlx::query_as::<_, User>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    pub async fn find_staff_by_email(pool: &SqlitePool, email: &str) -> Result<Option<User>> {
        let query = format!(
            "SELECT {COLUMNS} FROM users WHERE email = ? AND role = 'staff' ORDER BY created_at LIMIT 1"
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(email.trim())
            .fetch_optional(pool)
            .await?;
        Ok(user)
    }

    /// Profiles of the staff assigned to `project_id`, by name.
    pub async fn list_assigned_staff(pool: &SqlitePool, project_id: &str) -> Result<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.email, u.full_name, u.role, u.avatar_url, u.created_at
            FROM project_staff ps
            JOIN users u ON u.id = ps.user_id
            WHERE ps.project_id = ?
            ORDER BY u.full_name ASC
            "#,
        )
        .bind(project_id)
        .fetch_all(pool)
        .await?;
        Ok(users)
    }

    /// Inserts a profile. Existing profiles are never overwritten.
    pub async fn insert<'e, E>(executor: E, input: &NewProfile) -> Result<User>
    where
        E: Executor<'e, Database = Sqlite>,
    {
        if input.full_name.trim().is_empty() {
            return Err(AppError::Validation("Full name is required".to_string()));
        }
        if input.id.trim().is_empty() {
            return Err(AppError::Validation("User id is required".to_string()));
        }

        let query = format!(
            "INSERT INTO users ({COLUMNS}) VALUES (?, ?, ?, ?, ?, ?) RETURNING {COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&query)
            .bind(&input.id)
            .bind(input.email.trim())
            .bind(input.full_name.trim())
            .bind(input.role)
            .bind(&input.avatar_url)
            .bind(Utc::now())
            .fetch_one(executor)
            .await
            .map_err(|e| AppError::conflict_on_unique(e, "Profile already exists"))?;

        tracing::info!(user_id = %user.id, role = user.role.as_str(), "Created profile");
        Ok(user)
    }

    /// Self-service profile creation for an identity that has none, such as
    /// an account created outside registration. Always yields a `client`
    /// profile.
    pub async fn create_own(pool: &SqlitePool, session: &Session, full_name: &str) -> Result<User> {
        Self::insert(
            pool,
            &NewProfile {
                id: session.user.id.clone(),
                email: session.user.email.clone(),
                full_name: full_name.to_string(),
                role: Role::Client,
                avatar_url: None,
            },
        )
        .await
    }

    /// Admin seeding of a profile with any role.
    pub async fn create_for(pool: &SqlitePool, session: &Session, input: &NewProfile) -> Result<User> {
        policy::require_admin(session)?;
        Self::insert(pool, input).await
    }
}
