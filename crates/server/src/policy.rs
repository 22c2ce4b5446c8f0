//! Access rules evaluated at the storage boundary.
//!
//! Every service call receives the caller's [`Session`] and consults these
//! rules before reading or writing. Listing queries are built from a
//! [`ProjectScope`]; single-project operations go through [`authorize`].

use crate::{
    db::models::{Project, Role},
    error::{AppError, Result},
    middleware::auth::Session,
};

/// Which projects a session may see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProjectScope {
    All,
    AssignedStaff(String),
    Owner(String),
    Nothing,
}

impl ProjectScope {
    pub fn for_session(session: &Session) -> Self {
        match session.role {
            Some(Role::Admin) => ProjectScope::All,
            Some(Role::Staff) => ProjectScope::AssignedStaff(session.user.id.clone()),
            Some(Role::Client) => ProjectScope::Owner(session.user.id.clone()),
            None => ProjectScope::Nothing,
        }
    }

    pub fn admits(&self, project: &Project) -> bool {
        match self {
            ProjectScope::All => true,
            ProjectScope::AssignedStaff(user_id) => project.has_staff(user_id),
            ProjectScope::Owner(user_id) => !user_id.is_empty() && project.owner_id == *user_id,
            ProjectScope::Nothing => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    View,
    RecordPayment,
    SubmitChangeRequest,
    /// Staff assignment, invites, scheduling and review.
    Administer,
}

/// Checks `action` on `project` for `session`.
///
/// Projects outside the caller's scope are reported as missing.
pub fn authorize(session: &Session, action: Action, project: &Project) -> Result<()> {
    if !ProjectScope::for_session(session).admits(project) {
        return Err(AppError::NotFound("Project not found".to_string()));
    }

    match action {
        Action::View | Action::RecordPayment | Action::SubmitChangeRequest => Ok(()),
        Action::Administer => require_admin(session),
    }
}

pub fn require_admin(session: &Session) -> Result<()> {
    if session.is_admin() {
        Ok(())
    } else {
        Err(AppError::Forbidden("Admin role required".to_string()))
    }
}
