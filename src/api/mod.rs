use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod auth;
mod error;
mod teams;
mod types;
mod users;

pub use error::ApiError;
pub use types::*;

use crate::auth::Authenticator;
use crate::config::Config;
use crate::db::Store;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,

    pub store: Store,

    pub authenticator: Arc<Authenticator>,
}

impl AppState {
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    #[must_use]
    pub fn auth(&self) -> &Authenticator {
        &self.authenticator
    }
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let authenticator = Arc::new(Authenticator::new(
        &config.auth,
        config.server.secure_cookies,
    ));

    Ok(Arc::new(AppState {
        config,
        store,
        authenticator,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config.server.cors_allowed_origins.clone();

    let protected_routes = create_protected_router(state.clone());

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/users", post(users::register))
        .with_state(state.clone());

    let token_router = Router::new()
        .route(
            "/token",
            get(auth::get_token).post(auth::login).delete(auth::logout),
        )
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .merge(token_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}

fn create_protected_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/teams", get(teams::list_teams).post(teams::create_team))
        .route("/teams/{id}", get(teams::get_team).put(teams::update_team))
        .route("/users", get(users::list_users))
        .route("/users/{username}", get(users::get_user))
        .layer(middleware::from_fn_with_state(
            state,
            auth::auth_middleware,
        ))
}
