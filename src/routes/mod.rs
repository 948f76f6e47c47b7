//! Route definitions.

use axum::Router;
use axum::routing::{any, get};
use tower_http::trace::TraceLayer;

use crate::handlers::{api, media_stream};
use crate::state::AppState;

/// Build the full application router.
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/", get(api::health))
        .route("/health", get(api::health))
        .route("/calls/{call_sid}", get(api::call_status))
        .route("/media-stream", any(media_stream::media_stream_handler))
        .layer(TraceLayer::new_for_http())
}
