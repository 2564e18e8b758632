use std::{fs::File, net::SocketAddr, sync::Arc};

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    response::Response,
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;
use wayfarer::{
    config::{AppConfig, SessionBackend},
    db::{init_pool, run_migrations},
    routes::create_router,
    services::{booking::LocalBookingGateway, catalog::CatalogService, storage::SqliteSessionStore},
    session::SESSION_COOKIE,
    state::AppState,
};

struct TestApp {
    router: Router,
    cookie: Option<String>,
    _root: TempDir,
}

impl TestApp {
    async fn new() -> Self {
        let root = TempDir::new().unwrap();
        let db_path = root.path().join("http.sqlite");
        File::create(&db_path).unwrap();

        let config = AppConfig {
            database_url: format!("sqlite://{}", db_path.to_string_lossy()),
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
            data_root: root.path().join("data"),
            cookie_secret: "http-test-cookie-secret".into(),
            session_backend: SessionBackend::Sqlite,
            booking_api_url: None,
            catalog_path: None,
        };
        let db = init_pool(&config.database_url).await.unwrap();
        run_migrations(&db).await.unwrap();

        let state = AppState::new(
            config,
            db.clone(),
            CatalogService::builtin().unwrap(),
            Arc::new(SqliteSessionStore::new(db.clone())),
            Arc::new(LocalBookingGateway::new(db)),
        );
        Self {
            router: create_router(state),
            cookie: None,
            _root: root,
        }
    }

    /// Sends a request with the current session cookie and keeps any new one.
    async fn send(&mut self, mut request: Request<Body>) -> Response {
        if let Some(cookie) = &self.cookie {
            request
                .headers_mut()
                .insert(header::COOKIE, cookie.parse().unwrap());
        }
        let response = self.router.clone().oneshot(request).await.unwrap();
        if let Some(set_cookie) = response.headers().get(header::SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap().to_string();
            self.cookie = Some(pair);
        }
        response
    }

    async fn get(&mut self, uri: &str) -> Response {
        self.send(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn post_json(&mut self, uri: &str, body: Value) -> Response {
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn post_form(&mut self, uri: &str, body: &str) -> Response {
        self.send(
            Request::post(uri)
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }
}

async fn json_body(response: Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn text_body(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn booking_payload() -> Value {
    json!({
        "customerEmail": "ana@example.com",
        "customerName": "Ana Traveller",
        "paymentReference": "PAY-TEST",
        "items": [
            { "type": "flight", "title": "Air France London → Paris", "details": "1h 15m", "price": "189.00" },
            { "type": "tour", "title": "Louvre skip-the-line", "details": "3h", "price": "65.00" }
        ]
    })
}

#[tokio::test]
async fn first_visit_issues_session_cookie() {
    let mut app = TestApp::new().await;
    let response = app.get("/").await;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = app.cookie.clone().expect("session cookie issued");
    assert!(cookie.starts_with(&format!("{SESSION_COOKIE}=")));

    let response = app.get("/destinations").await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(header::SET_COOKIE).is_none());
}

#[tokio::test]
async fn itinerary_api_adds_rejects_and_removes_stops() {
    let mut app = TestApp::new().await;

    let response = app
        .post_json(
            "/api/itinerary/items",
            json!({ "title": "Breakfast", "category": "food", "duration": "1h",
                    "travel_time_to_reach": "15m", "location": "Paris", "cost": "110" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let item = json_body(response).await;
    let id = item["id"].as_str().unwrap().to_string();

    let response = app
        .post_json(
            "/api/itinerary/items",
            json!({ "title": "Lunch", "category": "food", "duration": "1.5h",
                    "travel_time_to_reach": "10m", "location": "Le Marais", "cost": "260" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let response = app
        .post_json(
            "/api/itinerary/items",
            json!({ "title": "", "duration": "1h", "location": "Paris" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let itinerary = json_body(app.get("/api/itinerary").await).await;
    assert_eq!(itinerary["items"].as_array().unwrap().len(), 2);
    assert_eq!(itinerary["summary"]["total_activity_minutes"], 150);
    assert_eq!(itinerary["summary"]["total_travel_minutes"], 25);
    assert_eq!(itinerary["summary"]["location_count"], 2);

    let moved = json_body(app.post_json("/api/itinerary/move", json!({ "from": 1, "to": 0 })).await).await;
    assert_eq!(moved["items"][0]["title"], "Lunch");

    let response = app
        .send(
            Request::delete(format!("/api/itinerary/items/{id}"))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let itinerary = json_body(app.get("/api/itinerary").await).await;
    assert_eq!(itinerary["items"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn cart_api_keeps_duplicate_entries() {
    let mut app = TestApp::new().await;
    let entry = json!({ "type": "tour", "title": "Louvre skip-the-line", "price": "65.00" });

    let first = json_body(app.post_json("/api/cart/items", entry.clone()).await).await;
    let second = json_body(app.post_json("/api/cart/items", entry).await).await;
    assert_ne!(first["id"], second["id"]);

    let cart = json_body(app.get("/api/cart").await).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 2);
    assert_eq!(cart["total"], "130.00");

    let negative = app
        .post_json("/api/cart/items", json!({ "type": "hotel", "title": "Nope", "price": "-1" }))
        .await;
    assert_eq!(negative.status(), StatusCode::BAD_REQUEST);
    assert!(json_body(negative).await["error"].is_string());
}

#[tokio::test]
async fn bookings_api_honours_idempotency_key() {
    let mut app = TestApp::new().await;

    let create = |key: &str| {
        Request::post("/api/bookings")
            .header(header::CONTENT_TYPE, "application/json")
            .header("Idempotency-Key", key)
            .body(Body::from(booking_payload().to_string()))
            .unwrap()
    };

    let response = app.send(create("checkout-1")).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let first = json_body(response).await;
    assert_eq!(first["status"], "confirmed");
    assert_eq!(first["totalAmount"], "254.00");

    let replay = json_body(app.send(create("checkout-1")).await).await;
    assert_eq!(replay["id"], first["id"]);

    let other = json_body(app.send(create("checkout-2")).await).await;
    assert_ne!(other["id"], first["id"]);

    let missing_key = app
        .send(
            Request::post("/api/bookings")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(booking_payload().to_string()))
                .unwrap(),
        )
        .await;
    assert_eq!(missing_key.status(), StatusCode::BAD_REQUEST);

    let id = first["id"].as_str().unwrap();
    let stored = json_body(app.get(&format!("/api/bookings/{id}")).await).await;
    assert_eq!(stored["customerEmail"], "ana@example.com");
    assert_eq!(stored["items"].as_array().unwrap().len(), 2);

    let unknown = app.get("/api/bookings/BK-UNKNOWN").await;
    assert_eq!(unknown.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn empty_booking_is_rejected() {
    let mut app = TestApp::new().await;
    let response = app
        .send(
            Request::post("/api/bookings")
                .header(header::CONTENT_TYPE, "application/json")
                .header("Idempotency-Key", "empty")
                .body(Body::from(
                    json!({ "paymentReference": "PAY-TEST", "items": [] }).to_string(),
                ))
                .unwrap(),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unknown_destination_is_not_found() {
    let mut app = TestApp::new().await;
    assert_eq!(app.get("/destinations/atlantis").await.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.get("/api/destinations/atlantis").await.status(), StatusCode::NOT_FOUND);

    let paris = json_body(app.get("/api/destinations/paris").await).await;
    assert_eq!(paris["name"], "Paris");

    let hits = json_body(app.get("/api/destinations?q=KYO").await).await;
    assert_eq!(hits.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn export_downloads_plain_text() {
    let mut app = TestApp::new().await;
    app.post_form("/destinations/rome/plan", "").await;

    let response = app.get("/itinerary/export").await;
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response
        .headers()
        .get(header::CONTENT_DISPOSITION)
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment"));
    let text = text_body(response).await;
    assert!(text.contains("1. Visit Rome"));
}

#[tokio::test]
async fn checkout_form_books_cart_and_clears_it() {
    let mut app = TestApp::new().await;
    let response = app.post_form("/book/select", "kind=tour&offer_id=tr-101").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let declined = app
        .post_form(
            "/book/checkout",
            "idempotency_key=form-key&cardholder=Ana&card_number=4000000000000002&expiry=12%2F39&cvc=123&email=",
        )
        .await;
    assert_eq!(declined.status(), StatusCode::BAD_REQUEST);
    assert!(text_body(declined).await.contains("declined"));
    let cart = json_body(app.get("/api/cart").await).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);

    let approved = app
        .post_form(
            "/book/checkout",
            "idempotency_key=form-key&cardholder=Ana&card_number=4242424242424242&expiry=12%2F39&cvc=123&email=",
        )
        .await;
    assert_eq!(approved.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        approved.headers().get(header::LOCATION).unwrap(),
        "/book/confirmation"
    );

    let cart = json_body(app.get("/api/cart").await).await;
    assert!(cart["items"].as_array().unwrap().is_empty());

    let page = text_body(app.get("/book/confirmation").await).await;
    assert!(page.contains("BK-"));
}

#[tokio::test]
async fn cart_total_cannot_overflow() {
    let mut app = TestApp::new().await;
    let entry = json!({ "type": "hotel", "title": "Palace", "price": "79228162514264337593543950335" });

    let first = app.post_json("/api/cart/items", entry.clone()).await;
    assert_eq!(first.status(), StatusCode::CREATED);
    let second = app.post_json("/api/cart/items", entry).await;
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);

    let response = app.get("/api/cart").await;
    assert_eq!(response.status(), StatusCode::OK);
    let cart = json_body(response).await;
    assert_eq!(cart["items"].as_array().unwrap().len(), 1);

    assert_eq!(app.get("/book/cart").await.status(), StatusCode::OK);
    assert_eq!(app.get("/book/checkout").await.status(), StatusCode::OK);
}

#[tokio::test]
async fn double_submitted_checkout_lands_on_confirmation() {
    let mut app = TestApp::new().await;
    app.post_form("/book/select", "kind=tour&offer_id=tr-101").await;

    let form = "idempotency_key=dup-key&cardholder=Ana&card_number=4242424242424242&expiry=12%2F39&cvc=123&email=";
    let first = app.post_form("/book/checkout", form).await;
    assert_eq!(first.status(), StatusCode::SEE_OTHER);
    let second = app.post_form("/book/checkout", form).await;
    assert_eq!(second.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        second.headers().get(header::LOCATION).unwrap(),
        "/book/confirmation"
    );

    let fresh_key = app
        .post_form(
            "/book/checkout",
            "idempotency_key=other-key&cardholder=Ana&card_number=4242424242424242&expiry=12%2F39&cvc=123&email=",
        )
        .await;
    assert_eq!(fresh_key.status(), StatusCode::BAD_REQUEST);
    assert!(text_body(fresh_key).await.contains("Your cart is empty."));
}

#[tokio::test]
async fn malformed_move_is_ignored() {
    let mut app = TestApp::new().await;
    for title in ["Breakfast", "Museum"] {
        app.post_json(
            "/api/itinerary/items",
            json!({ "title": title, "duration": "1h", "location": "Paris" }),
        )
        .await;
    }

    let response = app.post_form("/itinerary/move", "from=first&to=1").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let response = app.post_form("/itinerary/move", "from=-1&to=0").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let itinerary = json_body(app.get("/api/itinerary").await).await;
    assert_eq!(itinerary["items"][0]["title"], "Breakfast");
    assert_eq!(itinerary["items"][1]["title"], "Museum");

    app.post_form("/itinerary/move", "from=1&to=0").await;
    let itinerary = json_body(app.get("/api/itinerary").await).await;
    assert_eq!(itinerary["items"][0]["title"], "Museum");
}
