use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::{Path, State},
    http::header,
    response::{IntoResponse, Redirect},
    routing::{get, post},
    Form, Router,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::debug;

use crate::{
    duration::format_minutes,
    error::AppError,
    models::itinerary::{Itinerary, ItineraryCategory, NewItineraryItem, MAX_TITLE_CHARS},
    money::{format_money, parse_amount},
    services::export::{render_itinerary, EXPORT_FILENAME},
    session::SessionId,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(planner))
        .route("/items", post(add_item))
        .route("/items/:id/delete", post(delete_item))
        .route("/items/:id/up", post(move_item_up))
        .route("/items/:id/down", post(move_item_down))
        .route("/move", post(move_item))
        .route("/export", get(export))
}

#[derive(Clone)]
struct PlannerRow {
    id: String,
    index: usize,
    position: usize,
    title: String,
    category: &'static str,
    duration: String,
    travel: String,
    location: String,
    cost: String,
    is_first: bool,
    is_last: bool,
}

struct CategoryOption {
    value: &'static str,
    label: &'static str,
}

#[derive(Template)]
#[template(path = "itinerary/planner.html")]
struct PlannerTemplate {
    rows: Vec<PlannerRow>,
    categories: Vec<CategoryOption>,
    max_title: usize,
    total_cost: String,
    activity_time: String,
    travel_time: String,
    total_time: String,
    location_count: usize,
}

impl PlannerTemplate {
    fn from_itinerary(itinerary: &Itinerary) -> Self {
        let summary = itinerary.aggregate();
        let last = itinerary.len().saturating_sub(1);
        let rows = itinerary
            .items()
            .iter()
            .enumerate()
            .map(|(index, item)| PlannerRow {
                id: item.id.clone(),
                index,
                position: index + 1,
                title: item.title.clone(),
                category: item.category.label(),
                duration: format_minutes(item.duration_minutes()),
                travel: format_minutes(item.travel_minutes()),
                location: item.location.clone(),
                cost: format_money(item.cost),
                is_first: index == 0,
                is_last: index == last,
            })
            .collect();
        Self {
            rows,
            categories: ItineraryCategory::ALL
                .iter()
                .map(|category| CategoryOption {
                    value: category.as_str(),
                    label: category.label(),
                })
                .collect(),
            max_title: MAX_TITLE_CHARS,
            total_cost: format_money(summary.total_cost),
            activity_time: format_minutes(summary.total_activity_minutes),
            travel_time: format_minutes(summary.total_travel_minutes),
            total_time: format_minutes(summary.total_minutes),
            location_count: summary.location_count,
        }
    }
}

async fn planner(
    State(state): State<AppState>,
    session: SessionId,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = state.sessions.snapshot(session.as_str()).await?;
    Ok(AskamaTemplateResponse::into_response(
        PlannerTemplate::from_itinerary(&snapshot.itinerary),
    ))
}

#[derive(Deserialize)]
struct ItemForm {
    title: String,
    #[serde(default)]
    category: String,
    duration: String,
    #[serde(default)]
    travel_time_to_reach: String,
    location: String,
    #[serde(default)]
    cost: String,
}

async fn add_item(
    State(state): State<AppState>,
    session: SessionId,
    Form(form): Form<ItemForm>,
) -> Result<Redirect, AppError> {
    let Some(cost) = parse_amount(&form.cost) else {
        debug!("ignoring itinerary item with unreadable cost `{}`", form.cost);
        return Ok(Redirect::to("/itinerary"));
    };
    let input = NewItineraryItem {
        title: form.title,
        category: form.category.parse().unwrap_or_default(),
        duration: form.duration,
        travel_time_to_reach: form.travel_time_to_reach,
        location: form.location,
        cost,
    };
    state
        .sessions
        .update(session.as_str(), |snapshot| snapshot.itinerary.add(input))
        .await?;
    Ok(Redirect::to("/itinerary"))
}

async fn delete_item(
    State(state): State<AppState>,
    session: SessionId,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    state
        .sessions
        .update(session.as_str(), |snapshot| snapshot.itinerary.remove(&id))
        .await?;
    Ok(Redirect::to("/itinerary"))
}

async fn move_item_up(
    State(state): State<AppState>,
    session: SessionId,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    state
        .sessions
        .update(session.as_str(), |snapshot| snapshot.itinerary.move_up(&id))
        .await?;
    Ok(Redirect::to("/itinerary"))
}

async fn move_item_down(
    State(state): State<AppState>,
    session: SessionId,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    state
        .sessions
        .update(session.as_str(), |snapshot| snapshot.itinerary.move_down(&id))
        .await?;
    Ok(Redirect::to("/itinerary"))
}

/// Raw indices; anything that is not a position in the list is ignored.
#[derive(Deserialize)]
struct MoveForm {
    #[serde(default)]
    from: String,
    #[serde(default)]
    to: String,
}

async fn move_item(
    State(state): State<AppState>,
    session: SessionId,
    Form(form): Form<MoveForm>,
) -> Result<Redirect, AppError> {
    let (Ok(from), Ok(to)) = (form.from.trim().parse::<usize>(), form.to.trim().parse::<usize>()) else {
        return Ok(Redirect::to("/itinerary"));
    };
    state
        .sessions
        .update(session.as_str(), |snapshot| snapshot.itinerary.reorder(from, to))
        .await?;
    Ok(Redirect::to("/itinerary"))
}

async fn export(
    State(state): State<AppState>,
    session: SessionId,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = state.sessions.snapshot(session.as_str()).await?;
    let document = render_itinerary(&snapshot.itinerary, Utc::now())?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/plain; charset=utf-8".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{EXPORT_FILENAME}\""),
            ),
        ],
        document,
    ))
}
