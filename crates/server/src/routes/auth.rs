use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    middleware as axum_middleware,
    routing::{get, post},
    Json, Router,
};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use sqlx::{Executor, Sqlite, SqlitePool};
use uuid::Uuid;

use crate::{
    config::Config,
    db::models::Role,
    error::{AppError, Result},
    middleware::auth::Session,
    services::profiles::{NewProfile, ProfileStore},
    AppState,
};

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/logout", post(logout))
        .route("/me", get(me))
        .route_layer(axum_middleware::from_fn_with_state(
            state,
            crate::middleware::auth::auth_middleware,
        ))
        // Everything below is reachable without a session
        .route("/register", post(register))
        .route("/login", post(login))
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub name: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Option<Role>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // account id
    pub sid: String, // session id
    pub email: String,
    pub name: String,
    pub exp: usize,
}

pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| AppError::Internal("Failed to hash password".to_string()))
}

fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

/// Opens a server-side session for `account_id` and signs a token for it.
pub async fn start_session(
    pool: &SqlitePool,
    config: &Config,
    account_id: &str,
    email: &str,
    name: &str,
) -> Result<String> {
    let session_id = Uuid::new_v4().to_string();
    let now = Utc::now();
    let expires_at = now
        .checked_add_signed(Duration::days(config.session_ttl_days))
        .ok_or_else(|| AppError::Internal("Session expiry out of range".to_string()))?;

    sqlx::query("INSERT INTO sessions (id, account_id, created_at, expires_at) VALUES (?, ?, ?, ?)")
        .bind(&session_id)
        .bind(account_id)
        .bind(now)
        .bind(expires_at)
        .execute(pool)
        .await?;

    let claims = Claims {
        sub: account_id.to_string(),
        sid: session_id,
        email: email.to_string(),
        name: name.to_string(),
        exp: expires_at.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .map_err(|_| AppError::Internal("Failed to create token".to_string()))
}

/// Stores credentials for a new identity under `id`.
pub async fn create_account<'e, E>(
    executor: E,
    id: &str,
    email: &str,
    name: &str,
    password: &str,
) -> Result<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    let password_hash = hash_password(password)?;

    sqlx::query(
        "INSERT INTO accounts (id, email, display_name, password_hash, created_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(id)
    .bind(email)
    .bind(name)
    .bind(&password_hash)
    .bind(Utc::now())
    .execute(executor)
    .await
    .map_err(|e| AppError::conflict_on_unique(e, "Email already registered"))?;

    Ok(())
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<AuthResponse>> {
    let email = body.email.trim().to_lowercase();

    // Validate input
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }
    if body.name.trim().is_empty() {
        return Err(AppError::Validation("Name is required".to_string()));
    }
    if body.password.len() < 8 {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let user_id = Uuid::new_v4().to_string();
    let name = body.name.trim();

    // Every sign-up starts as a client.
    let mut tx = state.db.pool.begin().await?;
    create_account(&mut *tx, &user_id, &email, name, &body.password).await?;
    let profile = ProfileStore::insert(
        &mut *tx,
        &NewProfile {
            id: user_id.clone(),
            email: email.clone(),
            full_name: name.to_string(),
            role: Role::Client,
            avatar_url: None,
        },
    )
    .await?;
    tx.commit().await?;
    tracing::info!(user_id = %user_id, "Registered account");

    let token = start_session(&state.db.pool, &state.config, &user_id, &email, name).await?;

    Ok(Json(AuthResponse {
        token,
        user: UserResponse {
            id: user_id,
            email,
            name: name.to_string(),
            role: Some(profile.role),
        },
    }))
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<AuthResponse>> {
    // Find account by email
    let account = sqlx::query_as::<_, (String, String, String, String)>(
        "SELECT id, email, display_name, password_hash FROM accounts WHERE email = ?",
    )
    .bind(body.email.trim().to_lowercase())
    .fetch_optional(&state.db.pool)
    .await?
    .ok_or(AppError::Unauthorized)?;

    let (user_id, email, name, password_hash) = account;

    // Verify password
    if !verify_password(&body.password, &password_hash)? {
        return Err(AppError::Unauthorized);
    }

    let token = start_session(&state.db.pool, &state.config, &user_id, &email, &name).await?;
    let role = ProfileStore::resolve_role(&state.db.pool, &user_id).await?;

    Ok(Json(AuthResponse {
        token,
        user: UserResponse {
            id: user_id,
            email,
            name,
            role,
        },
    }))
}

async fn logout(State(state): State<AppState>, session: Session) -> Result<Json<()>> {
    sqlx::query("DELETE FROM sessions WHERE id = ?")
        .bind(&session.id)
        .execute(&state.db.pool)
        .await?;

    tracing::info!(user_id = %session.user.id, "Signed out");
    Ok(Json(()))
}

async fn me(session: Session) -> Json<UserResponse> {
    Json(UserResponse {
        id: session.user.id,
        email: session.user.email,
        name: session.user.name,
        role: session.role,
    })
}
