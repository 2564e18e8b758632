use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::money::checked_total;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum CartItemKind {
    #[serde(rename = "flight")]
    Flight,
    #[serde(rename = "hotel")]
    Hotel,
    #[serde(rename = "tour")]
    Tour,
}

impl CartItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CartItemKind::Flight => "flight",
            CartItemKind::Hotel => "hotel",
            CartItemKind::Tour => "tour",
        }
    }
}

impl fmt::Display for CartItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CartItemKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "flight" | "flights" => Ok(CartItemKind::Flight),
            "hotel" | "hotels" => Ok(CartItemKind::Hotel),
            "tour" | "tours" => Ok(CartItemKind::Tour),
            other => Err(format!("unknown item type `{other}`")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CartItem {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: CartItemKind,
    pub title: String,
    pub details: String,
    pub price: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCartItem {
    #[serde(rename = "type")]
    pub kind: CartItemKind,
    pub title: String,
    #[serde(default)]
    pub details: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
}

/// Items picked from search results, in the order they were picked.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Always appends; selecting the same offer twice yields two entries.
    /// Returns `None` and leaves the cart alone when the total would overflow.
    pub fn add_item(&mut self, item: NewCartItem) -> Option<CartItem> {
        checked_total(self.items.iter().map(|item| item.price).chain([item.price]))?;
        let item = CartItem {
            id: Uuid::new_v4().to_string(),
            kind: item.kind,
            title: item.title,
            details: item.details,
            price: item.price,
            image: item.image,
        };
        self.items.push(item.clone());
        Some(item)
    }

    pub fn remove_item(&mut self, id: &str) -> Option<CartItem> {
        let index = self.items.iter().position(|item| item.id == id)?;
        Some(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn total(&self) -> Decimal {
        checked_total(self.items.iter().map(|item| item.price)).unwrap_or(Decimal::MAX)
    }
}
