use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use chrono::Utc;
use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{
    db::models::Role,
    error::{AppError, Result},
    routes::auth::Claims,
    services::profiles::ProfileStore,
    AppState,
};

/// Identity issued by the sign-in flow.
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub name: String,
}

/// Per-request session context: who is calling and with which role.
///
/// `role` is `None` for identities without a profile; they see no projects.
#[derive(Clone, Debug)]
pub struct Session {
    pub id: String,
    pub user: AuthUser,
    pub role: Option<Role>,
}

impl Session {
    pub fn user_id(&self) -> &str {
        &self.user.id
    }

    pub fn is_admin(&self) -> bool {
        self.role == Some(Role::Admin)
    }
}

/// Validates a bearer token and loads the live session behind it.
pub async fn load_session(state: &AppState, token: &str) -> Result<Session> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(state.config.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized)?;
    let claims = token_data.claims;

    let identity = sqlx::query_as::<_, (String, String, String)>(
        r#"
        SELECT a.id, a.email, a.display_name
        FROM sessions s
        JOIN accounts a ON a.id = s.account_id
        WHERE s.id = ? AND s.account_id = ? AND s.expires_at > ?
        "#,
    )
    .bind(&claims.sid)
    .bind(&claims.sub)
    .bind(Utc::now())
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or(AppError::Unauthorized)?;

    let (id, email, name) = identity;
    let role = ProfileStore::resolve_role(&state.db.pool, &id).await?;

    Ok(Session {
        id: claims.sid,
        user: AuthUser { id, email, name },
        role,
    })
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Result<Response> {
    let TypedHeader(Authorization(bearer)) = bearer.ok_or(AppError::Unauthorized)?;
    let session = load_session(&state, bearer.token()).await?;

    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

/// Attaches a session when a valid token is presented, but lets anonymous
/// requests through. Invalid or expired tokens count as anonymous.
pub async fn optional_auth_middleware(
    State(state): State<AppState>,
    bearer: Option<TypedHeader<Authorization<Bearer>>>,
    mut request: Request,
    next: Next,
) -> Response {
    if let Some(TypedHeader(Authorization(bearer))) = bearer {
        match load_session(&state, bearer.token()).await {
            Ok(session) => {
                request.extensions_mut().insert(session);
            }
            Err(AppError::Unauthorized) => {}
            Err(err) => return err.into_response(),
        }
    }

    next.run(request).await
}

// Extractor for getting the session from request extensions
#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AppError::Unauthorized)
    }
}
