use askama::Template;
use askama_axum::IntoResponse as AskamaTemplateResponse;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use serde_with::{serde_as, NoneAsEmptyString};
use uuid::Uuid;

use super::normalize_optional;
use crate::{
    error::AppError,
    models::{
        cart::CartItemKind,
        flow::SearchTab,
    },
    money::format_money,
    services::{
        catalog::CatalogService,
        checkout::{self, CheckoutError, PaymentDetails, TEST_CARD_APPROVED, TEST_CARD_DECLINED},
    },
    session::SessionId,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(search))
        .route("/select", post(select))
        .route("/cart", get(cart_page))
        .route("/cart/:id/remove", post(remove_from_cart))
        .route("/cart/clear", post(clear_cart))
        .route("/checkout", get(checkout_form).post(checkout_submit))
        .route("/confirmation", get(confirmation))
}

struct TabLink {
    value: &'static str,
    label: &'static str,
    active: bool,
}

struct OfferRow {
    kind: &'static str,
    id: String,
    title: String,
    subtitle: String,
    price: String,
}

fn offers_for(catalog: &CatalogService, tab: SearchTab, query: &str) -> Vec<OfferRow> {
    match tab {
        SearchTab::Flights => catalog
            .search_flights(query)
            .into_iter()
            .map(|flight| OfferRow {
                kind: CartItemKind::Flight.as_str(),
                id: flight.id.clone(),
                title: format!("{}: {} → {}", flight.airline, flight.from, flight.to),
                subtitle: format!(
                    "{} - {} · {}",
                    flight.departure, flight.arrival, flight.duration
                ),
                price: format_money(flight.price),
            })
            .collect(),
        SearchTab::Hotels => catalog
            .search_hotels(query)
            .into_iter()
            .map(|hotel| OfferRow {
                kind: CartItemKind::Hotel.as_str(),
                id: hotel.id.clone(),
                title: format!("{} ({})", hotel.name, hotel.destination),
                subtitle: format!("★ {:.1} · {}", hotel.rating, hotel.amenities.join(", ")),
                price: format!("{} / night", format_money(hotel.nightly_price)),
            })
            .collect(),
        SearchTab::Tours => catalog
            .search_tours(query)
            .into_iter()
            .map(|tour| OfferRow {
                kind: CartItemKind::Tour.as_str(),
                id: tour.id.clone(),
                title: format!("{} ({})", tour.name, tour.destination),
                subtitle: format!("{} · {}", tour.duration, tour.description),
                price: format_money(tour.price),
            })
            .collect(),
    }
}

#[derive(Template)]
#[template(path = "booking/search.html")]
struct SearchTemplate {
    tabs: Vec<TabLink>,
    tab: &'static str,
    tab_label: &'static str,
    query: String,
    offers: Vec<OfferRow>,
    cart_count: usize,
}

#[derive(Deserialize)]
struct SearchParams {
    tab: Option<String>,
    q: Option<String>,
}

async fn search(
    State(state): State<AppState>,
    session: SessionId,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    let requested_tab = params.tab.as_deref().and_then(|tab| tab.parse::<SearchTab>().ok());
    let (flow, cart_count) = state
        .sessions
        .update(session.as_str(), |snapshot| {
            let tab = requested_tab.unwrap_or(snapshot.flow.tab);
            match params.q.as_deref() {
                Some(query) => {
                    snapshot.flow.begin_search(tab, query);
                    snapshot.flow.show_results();
                }
                None => snapshot.flow.switch_tab(tab),
            }
            (snapshot.flow.clone(), snapshot.cart.len())
        })
        .await?;

    let offers = offers_for(&state.catalog, flow.tab, &flow.query);
    Ok(AskamaTemplateResponse::into_response(SearchTemplate {
        tabs: SearchTab::ALL
            .iter()
            .map(|tab| TabLink {
                value: tab.as_str(),
                label: tab.label(),
                active: *tab == flow.tab,
            })
            .collect(),
        tab: flow.tab.as_str(),
        tab_label: flow.tab.label(),
        query: flow.query,
        offers,
        cart_count,
    }))
}

#[derive(Deserialize)]
struct SelectForm {
    kind: String,
    offer_id: String,
}

async fn select(
    State(state): State<AppState>,
    session: SessionId,
    Form(form): Form<SelectForm>,
) -> Result<Redirect, AppError> {
    let kind: CartItemKind = form.kind.parse().map_err(AppError::BadRequest)?;
    let (item, destination) =
        state.catalog.selection(kind, &form.offer_id).ok_or(AppError::NotFound)?;
    let next_tab = state
        .sessions
        .update(session.as_str(), |snapshot| {
            snapshot.cart.add_item(item)?;
            snapshot.flow.select(kind, &destination);
            Some(snapshot.flow.tab)
        })
        .await?
        .ok_or_else(|| AppError::BadRequest("cart total is out of range".into()))?;
    Ok(Redirect::to(&format!("/book?tab={}", next_tab.as_str())))
}

struct CartRow {
    id: String,
    kind: &'static str,
    title: String,
    details: String,
    price: String,
}

#[derive(Template)]
#[template(path = "booking/cart.html")]
struct CartTemplate {
    rows: Vec<CartRow>,
    total: String,
}

async fn cart_page(
    State(state): State<AppState>,
    session: SessionId,
) -> Result<impl IntoResponse, AppError> {
    let snapshot = state.sessions.snapshot(session.as_str()).await?;
    let rows = snapshot
        .cart
        .items()
        .iter()
        .map(|item| CartRow {
            id: item.id.clone(),
            kind: item.kind.as_str(),
            title: item.title.clone(),
            details: item.details.clone(),
            price: format_money(item.price),
        })
        .collect();
    Ok(AskamaTemplateResponse::into_response(CartTemplate {
        rows,
        total: format_money(snapshot.cart.total()),
    }))
}

async fn remove_from_cart(
    State(state): State<AppState>,
    session: SessionId,
    Path(id): Path<String>,
) -> Result<Redirect, AppError> {
    state
        .sessions
        .update(session.as_str(), |snapshot| snapshot.cart.remove_item(&id))
        .await?;
    Ok(Redirect::to("/book/cart"))
}

async fn clear_cart(
    State(state): State<AppState>,
    session: SessionId,
) -> Result<Redirect, AppError> {
    state
        .sessions
        .update(session.as_str(), |snapshot| snapshot.cart.clear())
        .await?;
    Ok(Redirect::to("/book/cart"))
}

#[derive(Template)]
#[template(path = "booking/checkout.html")]
struct CheckoutTemplate {
    idempotency_key: String,
    item_count: usize,
    total: String,
    show_error: bool,
    error_message: String,
    cardholder: String,
    email: String,
    approved_card: &'static str,
    declined_card: &'static str,
}

impl CheckoutTemplate {
    fn blank(idempotency_key: String, item_count: usize, total: String) -> Self {
        Self {
            idempotency_key,
            item_count,
            total,
            show_error: false,
            error_message: String::new(),
            cardholder: String::new(),
            email: String::new(),
            approved_card: TEST_CARD_APPROVED,
            declined_card: TEST_CARD_DECLINED,
        }
    }
}

async fn checkout_form(
    State(state): State<AppState>,
    session: SessionId,
) -> Result<Response, AppError> {
    let snapshot = state.sessions.snapshot(session.as_str()).await?;
    if snapshot.cart.is_empty() {
        return Ok(Redirect::to("/book/cart").into_response());
    }
    Ok(AskamaTemplateResponse::into_response(CheckoutTemplate::blank(
        Uuid::new_v4().to_string(),
        snapshot.cart.len(),
        format_money(snapshot.cart.total()),
    )))
}

#[serde_as]
#[derive(Deserialize)]
struct CheckoutForm {
    idempotency_key: String,
    cardholder: String,
    card_number: String,
    expiry: String,
    cvc: String,
    #[serde_as(as = "NoneAsEmptyString")]
    #[serde(default)]
    email: Option<String>,
}

async fn checkout_submit(
    State(state): State<AppState>,
    session: SessionId,
    Form(form): Form<CheckoutForm>,
) -> Result<Response, AppError> {
    let details = PaymentDetails {
        cardholder: form.cardholder.clone(),
        card_number: form.card_number,
        expiry: form.expiry,
        cvc: form.cvc,
        email: normalize_optional(form.email.clone()),
    };

    let outcome = checkout::checkout(
        &state.sessions,
        state.bookings.as_ref(),
        session.as_str(),
        &form.idempotency_key,
        &details,
    )
    .await;

    let err = match outcome {
        Ok(_) => return Ok(Redirect::to("/book/confirmation").into_response()),
        Err(CheckoutError::Internal(err)) => return Err(err),
        Err(err) => err,
    };

    let status = match err {
        CheckoutError::Gateway(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::BAD_REQUEST,
    };
    let snapshot = state.sessions.snapshot(session.as_str()).await?;
    // Retries reuse the key.
    let mut page = CheckoutTemplate::blank(
        form.idempotency_key,
        snapshot.cart.len(),
        format_money(snapshot.cart.total()),
    );
    page.show_error = true;
    page.error_message = err.to_string();
    page.cardholder = form.cardholder;
    page.email = form.email.unwrap_or_default();
    Ok((status, AskamaTemplateResponse::into_response(page)).into_response())
}

#[derive(Template)]
#[template(path = "booking/confirmation.html")]
struct ConfirmationTemplate {
    booking_id: String,
    total: String,
    status: String,
    message: String,
    items: Vec<String>,
    confirmed_at: String,
}

async fn confirmation(
    State(state): State<AppState>,
    session: SessionId,
) -> Result<Response, AppError> {
    let snapshot = state.sessions.snapshot(session.as_str()).await?;
    let Some(confirmation) = snapshot.last_confirmation else {
        return Ok(Redirect::to("/book/cart").into_response());
    };
    Ok(AskamaTemplateResponse::into_response(ConfirmationTemplate {
        booking_id: confirmation.booking_id,
        total: format_money(confirmation.total_amount),
        status: confirmation.status,
        message: confirmation.message,
        items: confirmation.item_titles,
        confirmed_at: confirmation
            .confirmed_at
            .format("%d %b %Y, %H:%M UTC")
            .to_string(),
    }))
}
