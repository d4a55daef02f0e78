//! HTTP surface over the listing pipeline and tracking relay.

pub mod handlers;
pub mod state;

use axum::routing::{get, post};
use axum::Router;

pub use state::{AppState, EnumCache};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health))
        .route("/api/graphql", post(handlers::graphql_proxy))
        .route("/api/enums", get(handlers::enums))
        .route("/api/locations/search", get(handlers::location_search))
        .route("/api/properties/featured", get(handlers::featured))
        .route("/api/properties/track", post(handlers::track))
        .route("/api/properties/{slug}", get(handlers::property_by_slug))
        .with_state(state)
}
