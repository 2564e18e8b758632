use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::{
    error::AppError,
    models::{
        booking::{BookingReceipt, BookingRequest, StoredBooking},
        cart::{CartItem, NewCartItem},
        destination::Destination,
        itinerary::{ItineraryItem, ItinerarySummary, NewItineraryItem},
    },
    services::booking::{BookingError, BookingGateway, IDEMPOTENCY_HEADER},
    session::SessionId,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/destinations", get(list_destinations))
        .route("/destinations/:id", get(get_destination))
        .route("/itinerary", get(get_itinerary))
        .route("/itinerary/items", post(add_itinerary_item))
        .route("/itinerary/items/:id", delete(remove_itinerary_item))
        .route("/itinerary/move", post(move_itinerary_item))
        .route("/cart", get(get_cart))
        .route("/cart/items", post(add_cart_item))
        .route("/cart/items/:id", delete(remove_cart_item))
        .route("/bookings", post(create_booking))
        .route("/bookings/:id", get(get_booking))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// JSON flavour of [`AppError`] for the `/api` routes.
pub struct ApiError(AppError);

impl<E> From<E> for ApiError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Booking(BookingError::Rejected(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Booking(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let message = if status.is_server_error() {
            error!("api request failed: {}", self.0);
            "internal error".to_string()
        } else {
            self.0.to_string()
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[derive(Deserialize)]
struct SearchParams {
    q: Option<String>,
}

async fn list_destinations(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Json<Vec<Destination>> {
    let query = params.q.unwrap_or_default();
    Json(
        state
            .catalog
            .search_destinations(&query)
            .into_iter()
            .cloned()
            .collect(),
    )
}

async fn get_destination(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Destination>, ApiError> {
    state
        .catalog
        .get_destination_by_id(&id)
        .cloned()
        .map(Json)
        .ok_or(ApiError(AppError::NotFound))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ItineraryResponse {
    pub items: Vec<ItineraryItem>,
    pub summary: ItinerarySummary,
}

async fn get_itinerary(
    State(state): State<AppState>,
    session: SessionId,
) -> Result<Json<ItineraryResponse>, ApiError> {
    let snapshot = state.sessions.snapshot(session.as_str()).await?;
    Ok(Json(ItineraryResponse {
        summary: snapshot.itinerary.aggregate(),
        items: snapshot.itinerary.items().to_vec(),
    }))
}

async fn add_itinerary_item(
    State(state): State<AppState>,
    session: SessionId,
    Json(input): Json<NewItineraryItem>,
) -> Result<Response, ApiError> {
    let added = state
        .sessions
        .update(session.as_str(), |snapshot| snapshot.itinerary.add(input))
        .await?;
    Ok(match added {
        Some(item) => (StatusCode::CREATED, Json(item)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    })
}

async fn remove_itinerary_item(
    State(state): State<AppState>,
    session: SessionId,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .sessions
        .update(session.as_str(), |snapshot| snapshot.itinerary.remove(&id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MoveRequest {
    pub from: usize,
    pub to: usize,
}

async fn move_itinerary_item(
    State(state): State<AppState>,
    session: SessionId,
    Json(request): Json<MoveRequest>,
) -> Result<Json<ItineraryResponse>, ApiError> {
    let itinerary = state
        .sessions
        .update(session.as_str(), |snapshot| {
            snapshot.itinerary.reorder(request.from, request.to);
            snapshot.itinerary.clone()
        })
        .await?;
    Ok(Json(ItineraryResponse {
        summary: itinerary.aggregate(),
        items: itinerary.items().to_vec(),
    }))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CartResponse {
    pub items: Vec<CartItem>,
    pub total: rust_decimal::Decimal,
}

async fn get_cart(
    State(state): State<AppState>,
    session: SessionId,
) -> Result<Json<CartResponse>, ApiError> {
    let snapshot = state.sessions.snapshot(session.as_str()).await?;
    Ok(Json(CartResponse {
        total: snapshot.cart.total(),
        items: snapshot.cart.items().to_vec(),
    }))
}

async fn add_cart_item(
    State(state): State<AppState>,
    session: SessionId,
    Json(item): Json<NewCartItem>,
) -> Result<(StatusCode, Json<CartItem>), ApiError> {
    if item.price < rust_decimal::Decimal::ZERO {
        return Err(ApiError(AppError::BadRequest("price must not be negative".into())));
    }
    let added = state
        .sessions
        .update(session.as_str(), |snapshot| snapshot.cart.add_item(item))
        .await?
        .ok_or_else(|| ApiError(AppError::BadRequest("cart total is out of range".into())))?;
    Ok((StatusCode::CREATED, Json(added)))
}

async fn remove_cart_item(
    State(state): State<AppState>,
    session: SessionId,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .sessions
        .update(session.as_str(), |snapshot| snapshot.cart.remove_item(&id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Records a booking. Replaying an `Idempotency-Key` returns the first receipt.
async fn create_booking(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<BookingRequest>,
) -> Result<(StatusCode, Json<BookingReceipt>), ApiError> {
    let key = headers
        .get(IDEMPOTENCY_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError(AppError::BadRequest(format!("missing {IDEMPOTENCY_HEADER} header"))))?;

    let receipt = state.local_bookings.create_booking(key, &request).await?;
    Ok((StatusCode::CREATED, Json(receipt)))
}

async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<StoredBooking>, ApiError> {
    state
        .local_bookings
        .find_booking(&id)
        .await?
        .map(Json)
        .ok_or(ApiError(AppError::NotFound))
}
