use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Staff,
    Client,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Client => "client",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    OnHold,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum InstallmentStatus {
    Pending,
    ReadyToPay,
    Paid,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ChangeRequestType {
    Memo,
    AddOrder,
    DeductOrder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ChangeRequestStatus {
    Draft,
    Approved,
    Rejected,
}

/// Role an invite grants on acceptance. Admins are never invited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum InviteRole {
    Client,
    Staff,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum InviteStatus {
    Pending,
    Used,
}

/// A profile row. `id` is the identity's account id.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub avatar_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub project_name: String,
    pub project_code: String,
    pub location: String,
    pub total_price: f64,
    pub status: ProjectStatus,
    /// Empty until a client accepts an invite.
    pub owner_id: String,
    pub assigned_staff_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn has_staff(&self, user_id: &str) -> bool {
        self.assigned_staff_ids.iter().any(|id| id == user_id)
    }
}

/// Shape of a project as selected from SQLite, with staff membership folded
/// into a JSON array by the query.
#[derive(Debug, sqlx::FromRow)]
pub struct ProjectRow {
    pub id: String,
    pub project_name: String,
    pub project_code: String,
    pub location: String,
    pub total_price: f64,
    pub status: ProjectStatus,
    pub owner_id: String,
    pub assigned_staff_ids: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

impl From<ProjectRow> for Project {
    fn from(row: ProjectRow) -> Self {
        Self {
            id: row.id,
            project_name: row.project_name,
            project_code: row.project_code,
            location: row.location,
            total_price: row.total_price,
            status: row.status,
            owner_id: row.owner_id,
            assigned_staff_ids: row.assigned_staff_ids.0,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Installment {
    pub id: String,
    pub project_id: String,
    pub sequence: i64,
    pub title: String,
    pub amount: f64,
    pub status: InstallmentStatus,
    pub due_date: DateTime<Utc>,
    pub slip_url: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequest {
    pub id: String,
    pub project_id: String,
    pub title: String,
    pub detail: String,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub kind: ChangeRequestType,
    pub price_impact: f64,
    pub status: ChangeRequestStatus,
    pub requested_by: String,
    pub images: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Invite {
    pub id: String,
    pub project_id: String,
    pub role_to_assign: InviteRole,
    pub status: InviteStatus,
    pub created_at: DateTime<Utc>,
    pub used_by: Option<String>,
    pub used_at: Option<DateTime<Utc>>,
}
