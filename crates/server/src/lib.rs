use std::sync::Arc;

use axum::{middleware as axum_middleware, routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

pub mod config;
pub mod db;
pub mod error;
pub mod fixtures;
pub mod middleware;
pub mod policy;
pub mod routes;
pub mod services;

use services::blobs::BlobStore;

#[derive(Clone)]
pub struct AppState {
    pub db: db::Database,
    pub config: config::Config,
    pub blobs: Arc<dyn BlobStore>,
}

/// Builds the full HTTP application around `state`.
pub fn app(state: AppState) -> Router {
    // Routes that require a session
    let projects = routes::projects::router()
        .merge(routes::installments::router(state.config.max_upload_bytes))
        .merge(routes::change_requests::router());

    let protected_routes = Router::new()
        .nest("/projects", projects)
        .merge(routes::profiles::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::auth_middleware,
        ));

    // Invite links work before sign-in
    let invite_routes = routes::invites::router().route_layer(
        axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::auth::optional_auth_middleware,
        ),
    );

    let api_router = Router::new()
        .nest("/auth", routes::auth::router(state.clone()))
        .nest("/invites", invite_routes)
        .merge(protected_routes);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_router)
        .nest_service("/blobs", ServeDir::new(&state.config.storage_path))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn health_check() -> &'static str {
    "OK"
}
