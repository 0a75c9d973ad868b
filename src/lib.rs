pub mod auth;
pub mod config;
pub mod database;
pub mod error;
pub mod filter;
pub mod handlers;
pub mod middleware;
pub mod state;
pub mod validation;

use axum::{
    handler::Handler,
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers::{protected, public};

pub use crate::state::AppState;

/// Full HTTP surface: `/health` at the root, everything else under `api.base_path`.
pub fn app(state: AppState) -> Router {
    let base_path = normalize_base_path(&state.config.api.base_path);

    let router = Router::new().route("/health", get(public::health));
    let router = match base_path {
        Some(base) => router.nest(&base, api_routes(state.clone())),
        None => router.merge(api_routes(state.clone())),
    };

    let mut router = router.layer(TraceLayer::new_for_http());
    if state.config.security.enable_cors {
        router = router.layer(CorsLayer::permissive());
    }

    router.with_state(state)
}

fn api_routes(state: AppState) -> Router<AppState> {
    // Unmatched paths pass the token gate too.
    let unknown_route = protected::unknown_route
        .layer(from_fn_with_state(state.clone(), middleware::require_token));

    Router::new()
        .route("/authenticate", post(public::authenticate))
        .merge(protected_routes(state.clone()))
        .route_layer(from_fn_with_state(state, middleware::log_request))
        .fallback(unknown_route)
}

fn protected_routes(state: AppState) -> Router<AppState> {
    use protected::{groups, users};

    Router::new()
        .route("/users", get(users::list).post(users::create))
        .route(
            "/users/:id",
            get(users::get).put(users::update).delete(users::delete),
        )
        .route("/groups", get(groups::list).post(groups::create))
        .route(
            "/groups/:id",
            get(groups::get).put(groups::update).delete(groups::delete),
        )
        .route_layer(from_fn_with_state(state, middleware::require_token))
}

/// `None` when routes should sit at the root.
fn normalize_base_path(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    if trimmed.starts_with('/') {
        Some(trimmed.to_string())
    } else {
        Some(format!("/{}", trimmed))
    }
}
