pub mod api;
pub mod booking;
pub mod itinerary;
pub mod public;

use axum::{middleware, Router};
use tower_http::{services::ServeDir, trace::TraceLayer};

use crate::{session::ensure_session, state::AppState};

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .merge(public::router())
        .nest("/itinerary", itinerary::router())
        .nest("/book", booking::router())
        .nest("/api", api::router())
        .route_layer(middleware::from_fn_with_state(state.clone(), ensure_session))
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn normalize_optional(input: Option<String>) -> Option<String> {
    input.and_then(|value| {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
