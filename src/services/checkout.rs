//! Mock payment validation and the checkout that turns a cart into a booking.
//!
//! Cards are checked against two fixed test numbers and a prefix rule.
//! Nothing is charged.

use chrono::{Datelike, NaiveDate, Utc};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::booking::{BookingRequest, BookingRequestItem, Confirmation},
    services::{
        booking::{BookingError, BookingGateway},
        sessions::SessionManager,
    },
};

pub const TEST_CARD_APPROVED: &str = "4242424242424242";
pub const TEST_CARD_DECLINED: &str = "4000000000000002";
const ALLOWED_PREFIXES: [&str; 4] = ["4", "5", "34", "37"];

#[derive(Debug, Clone, Default)]
pub struct PaymentDetails {
    pub cardholder: String,
    pub card_number: String,
    pub expiry: String,
    pub cvc: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardCheck {
    Approved,
    Declined,
    Invalid(String),
}

pub fn card_digits(raw: &str) -> Option<String> {
    let cleaned: String = raw.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(cleaned)
}

/// `MM/YY` or `MM/YYYY`, valid through the end of that month.
fn expiry_is_current(raw: &str, today: NaiveDate) -> bool {
    let Some((month, year)) = raw.trim().split_once('/') else {
        return false;
    };
    let (Ok(month), Ok(year)) = (month.trim().parse::<u32>(), year.trim().parse::<i32>()) else {
        return false;
    };
    if !(1..=12).contains(&month) {
        return false;
    }
    let year = if year < 100 { 2000 + year } else { year };
    (year, month) >= (today.year(), today.month())
}

pub fn validate_card(details: &PaymentDetails, today: NaiveDate) -> CardCheck {
    if details.cardholder.trim().is_empty() {
        return CardCheck::Invalid("Please enter the name on the card.".into());
    }
    let Some(number) = card_digits(&details.card_number) else {
        return CardCheck::Invalid("The card number is not valid.".into());
    };
    if !expiry_is_current(&details.expiry, today) {
        return CardCheck::Invalid("The expiry date is not valid.".into());
    }
    let cvc = details.cvc.trim();
    if !(3..=4).contains(&cvc.len()) || !cvc.chars().all(|c| c.is_ascii_digit()) {
        return CardCheck::Invalid("The security code is not valid.".into());
    }

    match number.as_str() {
        TEST_CARD_APPROVED => CardCheck::Approved,
        TEST_CARD_DECLINED => CardCheck::Declined,
        other
            if (13..=19).contains(&other.len())
                && ALLOWED_PREFIXES.iter().any(|prefix| other.starts_with(prefix)) =>
        {
            CardCheck::Approved
        }
        _ => CardCheck::Invalid("The card number is not valid.".into()),
    }
}

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Your cart is empty.")]
    EmptyCart,
    #[error("{0}")]
    InvalidCard(String),
    #[error("Your card was declined. Please try a different card.")]
    Declined,
    #[error("We could not complete your booking ({0}). Your cart has been kept, please try again.")]
    Gateway(#[from] BookingError),
    #[error(transparent)]
    Internal(#[from] AppError),
}

/// Submits the session's cart. The cart is only cleared once the gateway
/// accepted the booking; every failure leaves it as it was.
pub async fn checkout(
    sessions: &SessionManager,
    gateway: &dyn BookingGateway,
    session_id: &str,
    idempotency_key: &str,
    details: &PaymentDetails,
) -> Result<Confirmation, CheckoutError> {
    let mut session = sessions.lock(session_id).await?;
    if session.cart.is_empty() {
        // A repeated submit of a checkout that already went through.
        if let Some(done) = session
            .last_confirmation
            .as_ref()
            .filter(|done| done.idempotency_key.as_deref() == Some(idempotency_key))
        {
            info!("checkout replayed for booking {}", done.booking_id);
            return Ok(done.clone());
        }
        return Err(CheckoutError::EmptyCart);
    }

    match validate_card(details, Utc::now().date_naive()) {
        CardCheck::Approved => {}
        CardCheck::Declined => {
            info!("mock payment declined for session {session_id}");
            return Err(CheckoutError::Declined);
        }
        CardCheck::Invalid(reason) => return Err(CheckoutError::InvalidCard(reason)),
    }

    let request = BookingRequest {
        customer_email: details.email.clone(),
        customer_name: Some(details.cardholder.trim().to_string()),
        payment_reference: format!(
            "PAY-{}",
            &Uuid::new_v4().simple().to_string()[..12].to_uppercase()
        ),
        items: session.cart.items().iter().map(BookingRequestItem::from).collect(),
    };

    let receipt = match gateway.create_booking(idempotency_key, &request).await {
        Ok(receipt) => receipt,
        Err(err) => {
            warn!("checkout failed for session {session_id}: {err}");
            return Err(err.into());
        }
    };

    let confirmation = Confirmation {
        booking_id: receipt.id,
        total_amount: receipt.total_amount,
        status: receipt.status,
        message: receipt.message,
        item_titles: session.cart.items().iter().map(|item| item.title.clone()).collect(),
        confirmed_at: Utc::now(),
        idempotency_key: Some(idempotency_key.to_string()),
    };
    session.cart.clear();
    session.flow.reset();
    session.last_confirmation = Some(confirmation.clone());
    sessions.persist(session_id, &*session).await?;

    info!("checkout complete: booking {}", confirmation.booking_id);
    Ok(confirmation)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use tempfile::TempDir;

    use super::*;
    use crate::{
        models::{
            booking::{BookingReceipt, StoredBooking},
            cart::{CartItemKind, NewCartItem},
        },
        services::storage::FileSessionStore,
    };

    struct DownGateway;

    #[async_trait]
    impl BookingGateway for DownGateway {
        async fn create_booking(
            &self,
            _idempotency_key: &str,
            _request: &BookingRequest,
        ) -> Result<BookingReceipt, BookingError> {
            Err(BookingError::Unavailable("connection refused".into()))
        }

        async fn find_booking(&self, _booking_id: &str) -> Result<Option<StoredBooking>, BookingError> {
            Ok(None)
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    fn card(number: &str) -> PaymentDetails {
        PaymentDetails {
            cardholder: "Ana Traveller".into(),
            card_number: number.into(),
            expiry: "12/30".into(),
            cvc: "123".into(),
            email: None,
        }
    }

    #[test]
    fn fixed_numbers_approve_and_decline() {
        assert_eq!(validate_card(&card("4242 4242 4242 4242"), today()), CardCheck::Approved);
        assert_eq!(validate_card(&card("4000-0000-0000-0002"), today()), CardCheck::Declined);
    }

    #[test]
    fn allowed_prefixes_pass_others_fail() {
        assert_eq!(validate_card(&card("5555555555554444"), today()), CardCheck::Approved);
        assert_eq!(validate_card(&card("378282246310005"), today()), CardCheck::Approved);
        assert!(matches!(validate_card(&card("6011111111111117"), today()), CardCheck::Invalid(_)));
        assert!(matches!(validate_card(&card("4242"), today()), CardCheck::Invalid(_)));
        assert!(matches!(validate_card(&card("4242abcd42424242"), today()), CardCheck::Invalid(_)));
    }

    #[test]
    fn expiry_and_cvc_are_checked() {
        let mut expired = card(TEST_CARD_APPROVED);
        expired.expiry = "09/26".into();
        assert!(matches!(validate_card(&expired, today()), CardCheck::Invalid(_)));

        let mut this_month = card(TEST_CARD_APPROVED);
        this_month.expiry = "10/2026".into();
        assert_eq!(validate_card(&this_month, today()), CardCheck::Approved);

        let mut bad_month = card(TEST_CARD_APPROVED);
        bad_month.expiry = "13/30".into();
        assert!(matches!(validate_card(&bad_month, today()), CardCheck::Invalid(_)));

        let mut bad_cvc = card(TEST_CARD_APPROVED);
        bad_cvc.cvc = "12".into();
        assert!(matches!(validate_card(&bad_cvc, today()), CardCheck::Invalid(_)));
    }

    #[test]
    fn cardholder_is_required() {
        let mut nameless = card(TEST_CARD_APPROVED);
        nameless.cardholder = "  ".into();
        assert!(matches!(validate_card(&nameless, today()), CardCheck::Invalid(_)));
    }

    #[tokio::test]
    async fn gateway_failure_keeps_the_cart() {
        let dir = TempDir::new().unwrap();
        let sessions = SessionManager::new(Arc::new(FileSessionStore::new(dir.path().to_path_buf())));
        sessions
            .update("s-1", |session| {
                session.cart.add_item(NewCartItem {
                    kind: CartItemKind::Tour,
                    title: "Louvre skip-the-line".into(),
                    details: "3h".into(),
                    price: Decimal::from(65),
                    image: None,
                })
            })
            .await
            .unwrap();

        let result = checkout(&sessions, &DownGateway, "s-1", "key-1", &card(TEST_CARD_APPROVED)).await;
        assert!(matches!(result, Err(CheckoutError::Gateway(BookingError::Unavailable(_)))));

        let session = sessions.snapshot("s-1").await.unwrap();
        assert_eq!(session.cart.len(), 1);
        assert!(session.last_confirmation.is_none());
    }

    struct OkGateway;

    #[async_trait]
    impl BookingGateway for OkGateway {
        async fn create_booking(
            &self,
            _idempotency_key: &str,
            request: &BookingRequest,
        ) -> Result<BookingReceipt, BookingError> {
            Ok(BookingReceipt {
                id: "BK-TEST".into(),
                total_amount: request.total_amount().unwrap_or_default(),
                status: "confirmed".into(),
                message: "ok".into(),
            })
        }

        async fn find_booking(&self, _booking_id: &str) -> Result<Option<StoredBooking>, BookingError> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn repeated_submit_returns_the_same_confirmation() {
        let dir = TempDir::new().unwrap();
        let sessions = SessionManager::new(Arc::new(FileSessionStore::new(dir.path().to_path_buf())));
        sessions
            .update("s-3", |session| {
                session.cart.add_item(NewCartItem {
                    kind: CartItemKind::Tour,
                    title: "Louvre skip-the-line".into(),
                    details: "3h".into(),
                    price: Decimal::from(65),
                    image: None,
                })
            })
            .await
            .unwrap();

        let first = checkout(&sessions, &OkGateway, "s-3", "dup-key", &card(TEST_CARD_APPROVED))
            .await
            .unwrap();
        let second = checkout(&sessions, &OkGateway, "s-3", "dup-key", &card(TEST_CARD_APPROVED))
            .await
            .unwrap();
        assert_eq!(first, second);

        let other = checkout(&sessions, &OkGateway, "s-3", "new-key", &card(TEST_CARD_APPROVED)).await;
        assert!(matches!(other, Err(CheckoutError::EmptyCart)));
    }

    #[tokio::test]
    async fn empty_cart_is_refused() {
        let dir = TempDir::new().unwrap();
        let sessions = SessionManager::new(Arc::new(FileSessionStore::new(dir.path().to_path_buf())));
        let result = checkout(&sessions, &DownGateway, "s-2", "key-1", &card(TEST_CARD_APPROVED)).await;
        assert!(matches!(result, Err(CheckoutError::EmptyCart)));
    }
}
