use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use tracing::info;

use crate::{
    error::AppError, models::destination::Destination, money::format_money, session::SessionId,
    state::AppState,
};

const FEATURED_COUNT: usize = 4;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(landing))
        .route("/destinations", get(destinations_list))
        .route("/destinations/:id", get(destination_detail))
        .route("/destinations/:id/plan", post(plan_destination))
}

#[derive(Clone)]
struct DestinationCard {
    id: String,
    name: String,
    location: String,
    description: String,
    image: String,
    price: String,
    rating: String,
}

impl From<&Destination> for DestinationCard {
    fn from(destination: &Destination) -> Self {
        Self {
            id: destination.id.clone(),
            name: destination.name.clone(),
            location: destination.location.clone(),
            description: destination.description.clone(),
            image: destination.image_url().to_string(),
            price: format_money(destination.price),
            rating: format!("{:.1}", destination.rating),
        }
    }
}

#[derive(Template)]
#[template(path = "landing.html")]
struct LandingTemplate {
    featured: Vec<DestinationCard>,
    itinerary_count: usize,
    cart_count: usize,
}

async fn landing(
    State(state): State<AppState>,
    session: SessionId,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = state.sessions.snapshot(session.as_str()).await?;
    let featured = state
        .catalog
        .featured(FEATURED_COUNT)
        .into_iter()
        .map(DestinationCard::from)
        .collect();
    Ok(AskamaTemplateResponse::into_response(LandingTemplate {
        featured,
        itinerary_count: snapshot.itinerary.len(),
        cart_count: snapshot.cart.len(),
    }))
}

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
}

#[derive(Template)]
#[template(path = "destinations/list.html")]
struct DestinationsTemplate {
    query: String,
    destinations: Vec<DestinationCard>,
}

async fn destinations_list(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> impl IntoResponse {
    let query = params.q.unwrap_or_default();
    let destinations = state
        .catalog
        .search_destinations(&query)
        .into_iter()
        .map(DestinationCard::from)
        .collect();
    AskamaTemplateResponse::into_response(DestinationsTemplate {
        query,
        destinations,
    })
}

#[derive(Template)]
#[template(path = "destinations/detail.html")]
struct DestinationDetailTemplate {
    card: DestinationCard,
    country: String,
    highlights: Vec<String>,
    best_time_to_visit: String,
    coordinates: String,
}

async fn destination_detail(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let destination = state
        .catalog
        .get_destination_by_id(&id)
        .ok_or(AppError::NotFound)?;
    Ok(AskamaTemplateResponse::into_response(
        DestinationDetailTemplate {
            card: DestinationCard::from(destination),
            country: destination.country.clone(),
            highlights: destination.highlights.clone(),
            best_time_to_visit: destination.best_time_to_visit.clone(),
            coordinates: format!(
                "{:.4}, {:.4}",
                destination.coordinates.lat, destination.coordinates.lng
            ),
        },
    ))
}

async fn plan_destination(
    State(state): State<AppState>,
    session: SessionId,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    let destination = state
        .catalog
        .get_destination_by_id(&id)
        .ok_or(AppError::NotFound)?
        .clone();
    let added = state
        .sessions
        .update(session.as_str(), |snapshot| {
            snapshot.itinerary.add_destination(&destination)
        })
        .await?;
    if let Some(item) = added {
        info!("planned a visit to {} as {}", destination.name, item.id);
    }
    Ok(Redirect::to("/itinerary"))
}
