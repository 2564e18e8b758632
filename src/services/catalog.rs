use std::{path::Path, sync::Arc};

use serde::Deserialize;
use tokio::fs;
use tracing::info;

use crate::{
    error::AppError,
    models::{
        cart::{CartItemKind, NewCartItem},
        destination::{Destination, FlightOffer, HotelOffer, TourOffer},
    },
};

const BUILTIN_CATALOG: &str = include_str!("../../data/catalog.json");

#[derive(Debug, Default, Deserialize)]
struct CatalogData {
    destinations: Vec<Destination>,
    #[serde(default)]
    flights: Vec<FlightOffer>,
    #[serde(default)]
    hotels: Vec<HotelOffer>,
    #[serde(default)]
    tours: Vec<TourOffer>,
}

/// Read-only destination and offer lookup.
#[derive(Clone)]
pub struct CatalogService {
    data: Arc<CatalogData>,
}

impl CatalogService {
    pub fn builtin() -> Result<Self, AppError> {
        Self::from_json(BUILTIN_CATALOG)
    }

    pub async fn load(path: &Path) -> Result<Self, AppError> {
        let raw = fs::read_to_string(path).await?;
        let catalog = Self::from_json(&raw)?;
        info!(
            "loaded catalog from {} ({} destinations)",
            path.display(),
            catalog.data.destinations.len()
        );
        Ok(catalog)
    }

    pub fn from_json(raw: &str) -> Result<Self, AppError> {
        let data: CatalogData = serde_json::from_str(raw)?;
        Ok(Self {
            data: Arc::new(data),
        })
    }

    pub fn destinations(&self) -> &[Destination] {
        &self.data.destinations
    }

    pub fn get_destination_by_id(&self, id: &str) -> Option<&Destination> {
        self.data.destinations.iter().find(|d| d.id == id)
    }

    pub fn search_destinations(&self, query: &str) -> Vec<&Destination> {
        filter_by(&self.data.destinations, query, |d| d.name.as_str())
    }

    pub fn featured(&self, count: usize) -> Vec<&Destination> {
        let mut all: Vec<&Destination> = self.data.destinations.iter().collect();
        all.sort_by(|a, b| b.rating.total_cmp(&a.rating));
        all.truncate(count);
        all
    }

    pub fn search_flights(&self, query: &str) -> Vec<&FlightOffer> {
        filter_by(&self.data.flights, query, |f| f.to.as_str())
    }

    pub fn search_hotels(&self, query: &str) -> Vec<&HotelOffer> {
        filter_by(&self.data.hotels, query, |h| h.destination.as_str())
    }

    pub fn search_tours(&self, query: &str) -> Vec<&TourOffer> {
        filter_by(&self.data.tours, query, |t| t.destination.as_str())
    }

    pub fn flight(&self, id: &str) -> Option<&FlightOffer> {
        self.data.flights.iter().find(|f| f.id == id)
    }

    pub fn hotel(&self, id: &str) -> Option<&HotelOffer> {
        self.data.hotels.iter().find(|h| h.id == id)
    }

    pub fn tour(&self, id: &str) -> Option<&TourOffer> {
        self.data.tours.iter().find(|t| t.id == id)
    }

    /// Turns a catalog offer into a cart entry plus the destination it is for.
    pub fn selection(&self, kind: CartItemKind, offer_id: &str) -> Option<(NewCartItem, String)> {
        match kind {
            CartItemKind::Flight => self.flight(offer_id).map(|flight| {
                (
                    NewCartItem {
                        kind,
                        title: format!("{} {} → {}", flight.airline, flight.from, flight.to),
                        details: format!(
                            "Departs {}, arrives {} ({})",
                            flight.departure, flight.arrival, flight.duration
                        ),
                        price: flight.price,
                        image: flight.image.clone(),
                    },
                    flight.to.clone(),
                )
            }),
            CartItemKind::Hotel => self.hotel(offer_id).map(|hotel| {
                (
                    NewCartItem {
                        kind,
                        title: hotel.name.clone(),
                        details: format!("{}, 1 night", hotel.destination),
                        price: hotel.nightly_price,
                        image: hotel.image.clone(),
                    },
                    hotel.destination.clone(),
                )
            }),
            CartItemKind::Tour => self.tour(offer_id).map(|tour| {
                (
                    NewCartItem {
                        kind,
                        title: tour.name.clone(),
                        details: format!("{} in {}", tour.duration, tour.destination),
                        price: tour.price,
                        image: tour.image.clone(),
                    },
                    tour.destination.clone(),
                )
            }),
        }
    }
}

/// Case-insensitive substring filter; a blank query keeps everything.
fn filter_by<'a, T>(items: &'a [T], query: &str, key: impl Fn(&T) -> &str) -> Vec<&'a T> {
    let needle = query.trim().to_lowercase();
    items
        .iter()
        .filter(|item| needle.is_empty() || key(*item).to_lowercase().contains(&needle))
        .collect()
}
