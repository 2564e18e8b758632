use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{
    models::cart::{CartItem, CartItemKind},
    money::checked_total,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequestItem {
    #[serde(rename = "type")]
    pub kind: CartItemKind,
    pub title: String,
    pub details: String,
    pub price: Decimal,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl From<&CartItem> for BookingRequestItem {
    fn from(item: &CartItem) -> Self {
        Self {
            kind: item.kind,
            title: item.title.clone(),
            details: item.details.clone(),
            price: item.price,
            image_url: item.image.clone(),
        }
    }
}

/// Payload accepted by the booking-creation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    #[serde(default)]
    pub customer_email: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub payment_reference: String,
    pub items: Vec<BookingRequestItem>,
}

impl BookingRequest {
    /// `None` when the prices add up past what a `Decimal` holds.
    pub fn total_amount(&self) -> Option<Decimal> {
        checked_total(self.items.iter().map(|item| item.price))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingReceipt {
    pub id: String,
    pub total_amount: Decimal,
    pub status: String,
    pub message: String,
}

/// What the confirmation page shows after a successful checkout.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Confirmation {
    pub booking_id: String,
    pub total_amount: Decimal,
    pub status: String,
    pub message: String,
    pub item_titles: Vec<String>,
    pub confirmed_at: DateTime<Utc>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoredBooking {
    pub id: String,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub payment_reference: String,
    pub total_amount: Decimal,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<BookingRequestItem>,
}
