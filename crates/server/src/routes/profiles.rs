use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;

use crate::{
    db::models::User,
    error::Result,
    middleware::auth::Session,
    services::profiles::{NewProfile, ProfileStore},
    AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", post(create_own_profile))
        .route("/users", post(create_profile))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOwnProfileRequest {
    pub full_name: String,
}

async fn create_own_profile(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<CreateOwnProfileRequest>,
) -> Result<Json<User>> {
    let user = ProfileStore::create_own(&state.db.pool, &session, &body.full_name).await?;
    Ok(Json(user))
}

async fn create_profile(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<NewProfile>,
) -> Result<Json<User>> {
    let user = ProfileStore::create_for(&state.db.pool, &session, &body).await?;
    Ok(Json(user))
}
