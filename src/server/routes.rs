/// API Routes definition

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::auth;
use super::handlers;
use super::static_files;
use super::AppState;

pub fn create_router(state: AppState, enable_cors: bool) -> Router {
    // Protected routes (require authentication when a token is configured)
    let protected_routes = Router::new()
        .route("/deploy", post(handlers::deploy))
        .route("/backup", post(handlers::backup))
        .route(
            "/restore",
            post(handlers::restore).layer(DefaultBodyLimit::max(state.max_upload_bytes)),
        )
        .route("/add-rule", post(handlers::add_rule))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ));

    // Public routes (read-only, no auth required)
    let public_routes = Router::new()
        .route("/logs", get(handlers::logs))
        .route("/status", get(handlers::status))
        .route("/health", get(handlers::health_check));

    let mut app = Router::new()
        .merge(protected_routes)
        .merge(public_routes)
        // Operator page - must be last to act as catch-all
        .fallback(static_files::static_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    if enable_cors {
        app = app.layer(CorsLayer::permissive());
    }

    app
}
