use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::Row;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;
use uuid::Uuid;

use crate::{
    db::DbPool,
    models::{
        booking::{BookingReceipt, BookingRequest, BookingRequestItem, StoredBooking},
        cart::CartItemKind,
    },
};

pub const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";
const REMOTE_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("booking rejected: {0}")]
    Rejected(String),
    #[error("booking service unavailable: {0}")]
    Unavailable(String),
    #[error("booking storage error: {0}")]
    Storage(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<reqwest::Error> for BookingError {
    fn from(err: reqwest::Error) -> Self {
        BookingError::Unavailable(err.to_string())
    }
}

/// The booking-creation collaborator. Replaying an idempotency key must
/// return the receipt of the booking it created the first time.
#[async_trait]
pub trait BookingGateway: Send + Sync {
    async fn create_booking(
        &self,
        idempotency_key: &str,
        request: &BookingRequest,
    ) -> Result<BookingReceipt, BookingError>;

    async fn find_booking(&self, booking_id: &str) -> Result<Option<StoredBooking>, BookingError>;
}

fn validate_request(idempotency_key: &str, request: &BookingRequest) -> Result<(), BookingError> {
    if idempotency_key.trim().is_empty() {
        return Err(BookingError::Rejected("missing idempotency key".into()));
    }
    if request.items.is_empty() {
        return Err(BookingError::Rejected("a booking needs at least one item".into()));
    }
    if request.payment_reference.trim().is_empty() {
        return Err(BookingError::Rejected("missing payment reference".into()));
    }
    if request.items.iter().any(|item| item.price < Decimal::ZERO) {
        return Err(BookingError::Rejected("item prices must not be negative".into()));
    }
    if request.total_amount().is_none() {
        return Err(BookingError::Rejected("total amount is out of range".into()));
    }
    Ok(())
}

fn parse_decimal(raw: &str) -> Result<Decimal, BookingError> {
    Decimal::from_str(raw).map_err(|err| BookingError::Storage(format!("bad amount `{raw}`: {err}")))
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, BookingError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|err| BookingError::Storage(format!("bad timestamp `{raw}`: {err}")))
}

/// Bookings recorded in the application's own SQLite database.
#[derive(Clone)]
pub struct LocalBookingGateway {
    db: DbPool,
}

impl LocalBookingGateway {
    pub fn new(db: DbPool) -> Self {
        Self { db }
    }

    async fn receipt_for_key(&self, idempotency_key: &str) -> Result<Option<BookingReceipt>, BookingError> {
        let row = sqlx::query("SELECT id, total_amount, status FROM bookings WHERE idempotency_key = ?1")
            .bind(idempotency_key)
            .fetch_optional(&self.db)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let id: String = row.get("id");
        Ok(Some(BookingReceipt {
            message: format!("Booking {id} was already recorded for this checkout"),
            id,
            total_amount: parse_decimal(&row.get::<String, _>("total_amount"))?,
            status: row.get("status"),
        }))
    }

    pub async fn count(&self) -> Result<i64, BookingError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM bookings")
            .fetch_one(&self.db)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl BookingGateway for LocalBookingGateway {
    async fn create_booking(
        &self,
        idempotency_key: &str,
        request: &BookingRequest,
    ) -> Result<BookingReceipt, BookingError> {
        validate_request(idempotency_key, request)?;

        if let Some(existing) = self.receipt_for_key(idempotency_key).await? {
            info!("replayed checkout for booking {}", existing.id);
            return Ok(existing);
        }

        let id = format!("BK-{}", &Uuid::new_v4().simple().to_string()[..10].to_uppercase());
        let total = request
            .total_amount()
            .ok_or_else(|| BookingError::Rejected("total amount is out of range".into()))?;
        let status = "confirmed".to_string();

        let mut tx = self.db.begin().await?;
        let inserted = sqlx::query(
            r#"INSERT INTO bookings (id, idempotency_key, customer_email, customer_name, payment_reference, total_amount, status, created_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)"#,
        )
        .bind(&id)
        .bind(idempotency_key)
        .bind(&request.customer_email)
        .bind(&request.customer_name)
        .bind(&request.payment_reference)
        .bind(total.to_string())
        .bind(&status)
        .bind(Utc::now().to_rfc3339())
        .execute(&mut *tx)
        .await;

        match inserted {
            Ok(_) => {}
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                // Lost a race against a concurrent submit with the same key.
                drop(tx);
                return self
                    .receipt_for_key(idempotency_key)
                    .await?
                    .ok_or_else(|| BookingError::Storage("duplicate key without booking".into()));
            }
            Err(err) => return Err(err.into()),
        }

        for (position, item) in request.items.iter().enumerate() {
            sqlx::query(
                r#"INSERT INTO booking_items (booking_id, position, kind, title, details, price, image_url)
                   VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
            )
            .bind(&id)
            .bind(position as i64)
            .bind(item.kind.as_str())
            .bind(&item.title)
            .bind(&item.details)
            .bind(item.price.to_string())
            .bind(&item.image_url)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        info!("created booking {id} with {} items", request.items.len());
        Ok(BookingReceipt {
            id,
            total_amount: total,
            status,
            message: "Your booking is confirmed. Have a great trip!".into(),
        })
    }

    async fn find_booking(&self, booking_id: &str) -> Result<Option<StoredBooking>, BookingError> {
        let row = sqlx::query(
            r#"SELECT id, customer_email, customer_name, payment_reference, total_amount, status, created_at
               FROM bookings WHERE id = ?1"#,
        )
        .bind(booking_id)
        .fetch_optional(&self.db)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };

        let item_rows = sqlx::query(
            "SELECT kind, title, details, price, image_url FROM booking_items WHERE booking_id = ?1 ORDER BY position",
        )
        .bind(booking_id)
        .fetch_all(&self.db)
        .await?;

        let mut items = Vec::with_capacity(item_rows.len());
        for item in item_rows {
            let kind: String = item.get("kind");
            items.push(BookingRequestItem {
                kind: kind
                    .parse::<CartItemKind>()
                    .map_err(BookingError::Storage)?,
                title: item.get("title"),
                details: item.get("details"),
                price: parse_decimal(&item.get::<String, _>("price"))?,
                image_url: item.get("image_url"),
            });
        }

        Ok(Some(StoredBooking {
            id: row.get("id"),
            customer_email: row.get("customer_email"),
            customer_name: row.get("customer_name"),
            payment_reference: row.get("payment_reference"),
            total_amount: parse_decimal(&row.get::<String, _>("total_amount"))?,
            status: row.get("status"),
            created_at: parse_timestamp(&row.get::<String, _>("created_at"))?,
            items,
        }))
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(alias = "message")]
    error: String,
}

/// Bookings created by an external HTTP API speaking the `/api/bookings` contract.
#[derive(Clone)]
pub struct RemoteBookingGateway {
    client: Client,
    base: Url,
}

impl RemoteBookingGateway {
    pub fn new(mut base: Url) -> Self {
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = Client::builder()
            .timeout(REMOTE_TIMEOUT)
            .build()
            .unwrap_or_else(|err| {
                warn!("falling back to a default HTTP client: {err}");
                Client::new()
            });
        Self { client, base }
    }

    fn endpoint(&self, path: &str) -> Result<Url, BookingError> {
        self.base
            .join(path)
            .map_err(|err| BookingError::Unavailable(format!("invalid booking endpoint: {err}")))
    }

    /// `None` for ids that are not plain booking references.
    fn booking_url(&self, booking_id: &str) -> Result<Option<Url>, BookingError> {
        let plain = !booking_id.is_empty()
            && booking_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_'));
        if !plain {
            return Ok(None);
        }
        self.endpoint(&format!("api/bookings/{booking_id}")).map(Some)
    }

    async fn error_message(response: reqwest::Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) => parsed.error,
            Err(_) if body.trim().is_empty() => status.to_string(),
            Err(_) => body,
        }
    }
}

#[async_trait]
impl BookingGateway for RemoteBookingGateway {
    async fn create_booking(
        &self,
        idempotency_key: &str,
        request: &BookingRequest,
    ) -> Result<BookingReceipt, BookingError> {
        validate_request(idempotency_key, request)?;
        let url = self.endpoint("api/bookings")?;
        let response = self
            .client
            .post(url)
            .header(IDEMPOTENCY_HEADER, idempotency_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json::<BookingReceipt>().await?);
        }

        let message = Self::error_message(response).await;
        warn!("booking API answered {status}: {message}");
        if status.is_client_error() {
            Err(BookingError::Rejected(message))
        } else {
            Err(BookingError::Unavailable(message))
        }
    }

    async fn find_booking(&self, booking_id: &str) -> Result<Option<StoredBooking>, BookingError> {
        let Some(url) = self.booking_url(booking_id)? else {
            return Ok(None);
        };
        let response = self.client.get(url).send().await?;
        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => Ok(Some(response.json::<StoredBooking>().await?)),
            _ => Err(BookingError::Unavailable(Self::error_message(response).await)),
        }
    }
}
