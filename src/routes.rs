use crate::{errors, handlers, AppState};
use axum::{
    http::StatusCode,
    routing::{get, post},
    Router,
};
use std::{sync::Arc, time::Duration};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

/// Creates the Axum router and associates routes with handlers.
pub fn create_router(state: Arc<AppState>, request_timeout: Duration) -> Router {
    Router::new()
        .route("/memes", get(handlers::list_memes).post(handlers::create_meme))
        .route("/memes/top", get(handlers::top_memes))
        .route("/meme/{id}", get(handlers::get_meme))
        .route("/swipe", post(handlers::swipe_meme))
        .route("/feed/{user_id}", get(handlers::get_feed))
        .route("/health", get(handlers::health))
        // Middleware Layers
        .layer(CatchPanicLayer::custom(errors::panic_response))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            request_timeout,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
