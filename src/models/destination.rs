use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Destination {
    pub id: String,
    pub name: String,
    pub location: String,
    pub country: String,
    pub price: Decimal,
    pub coordinates: Coordinates,
    pub description: String,
    #[serde(default)]
    pub highlights: Vec<String>,
    pub best_time_to_visit: String,
    pub rating: f32,
    #[serde(default)]
    pub image: Option<String>,
}

impl Destination {
    pub fn image_url(&self) -> &str {
        self.image.as_deref().unwrap_or("/static/img/placeholder.svg")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlightOffer {
    pub id: String,
    pub airline: String,
    pub from: String,
    pub to: String,
    pub departure: String,
    pub arrival: String,
    pub duration: String,
    pub price: Decimal,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotelOffer {
    pub id: String,
    pub name: String,
    pub destination: String,
    pub nightly_price: Decimal,
    pub rating: f32,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TourOffer {
    pub id: String,
    pub name: String,
    pub destination: String,
    pub duration: String,
    pub price: Decimal,
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
}
