use serde::{Deserialize, Serialize};

use crate::models::{booking::Confirmation, cart::Cart, flow::BookingFlow, itinerary::Itinerary};

/// Everything a browsing session owns. This is the unit the session stores persist.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionSnapshot {
    #[serde(default)]
    pub cart: Cart,
    #[serde(default)]
    pub itinerary: Itinerary,
    #[serde(default)]
    pub flow: BookingFlow,
    #[serde(default)]
    pub last_confirmation: Option<Confirmation>,
}
