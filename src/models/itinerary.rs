use std::{collections::HashSet, fmt, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{duration::parse_minutes, models::destination::Destination, money::checked_total};

pub const MAX_TITLE_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ItineraryCategory {
    #[default]
    #[serde(rename = "activity")]
    Activity,
    #[serde(rename = "place")]
    Place,
    #[serde(rename = "food")]
    Food,
    #[serde(rename = "accommodation")]
    Accommodation,
}

impl ItineraryCategory {
    pub const ALL: [ItineraryCategory; 4] = [
        ItineraryCategory::Activity,
        ItineraryCategory::Place,
        ItineraryCategory::Food,
        ItineraryCategory::Accommodation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ItineraryCategory::Activity => "activity",
            ItineraryCategory::Place => "place",
            ItineraryCategory::Food => "food",
            ItineraryCategory::Accommodation => "accommodation",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ItineraryCategory::Activity => "Activity",
            ItineraryCategory::Place => "Place",
            ItineraryCategory::Food => "Food",
            ItineraryCategory::Accommodation => "Accommodation",
        }
    }
}

impl fmt::Display for ItineraryCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ItineraryCategory {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown category `{value}`"))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ItineraryItem {
    pub id: String,
    pub title: String,
    pub category: ItineraryCategory,
    pub duration: String,
    pub travel_time_to_reach: String,
    pub location: String,
    pub cost: Decimal,
}

impl ItineraryItem {
    pub fn duration_minutes(&self) -> u32 {
        parse_minutes(&self.duration)
    }

    pub fn travel_minutes(&self) -> u32 {
        parse_minutes(&self.travel_time_to_reach)
    }
}

/// User-supplied fields for a new stop; the id is assigned on insert.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewItineraryItem {
    pub title: String,
    #[serde(default)]
    pub category: ItineraryCategory,
    pub duration: String,
    #[serde(default)]
    pub travel_time_to_reach: String,
    pub location: String,
    #[serde(default)]
    pub cost: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ItinerarySummary {
    pub total_cost: Decimal,
    pub total_activity_minutes: u32,
    pub total_travel_minutes: u32,
    pub total_minutes: u32,
    pub location_count: usize,
}

/// Ordered list of planned stops. Order is the user's planned sequence.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Itinerary {
    items: Vec<ItineraryItem>,
}

impl Itinerary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[ItineraryItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.items.iter().position(|item| item.id == id)
    }

    /// Appends a stop. Returns `None` without touching the list when a
    /// required field is missing or out of bounds.
    pub fn add(&mut self, input: NewItineraryItem) -> Option<ItineraryItem> {
        let title = input.title.trim();
        let duration = input.duration.trim();
        let location = input.location.trim();

        if title.is_empty() || duration.is_empty() || location.is_empty() {
            debug!("ignoring itinerary item with missing fields");
            return None;
        }
        if title.chars().count() > MAX_TITLE_CHARS {
            debug!("ignoring itinerary item with overlong title");
            return None;
        }
        if input.cost < Decimal::ZERO {
            debug!("ignoring itinerary item with negative cost");
            return None;
        }
        if checked_total(self.items.iter().map(|item| item.cost).chain([input.cost])).is_none() {
            debug!("ignoring itinerary item whose cost overflows the total");
            return None;
        }

        let travel = input.travel_time_to_reach.trim();
        let item = ItineraryItem {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            category: input.category,
            duration: duration.to_string(),
            travel_time_to_reach: if travel.is_empty() {
                "0m".to_string()
            } else {
                travel.to_string()
            },
            location: location.to_string(),
            cost: input.cost,
        };
        self.items.push(item.clone());
        Some(item)
    }

    pub fn add_destination(&mut self, destination: &Destination) -> Option<ItineraryItem> {
        let mut title = format!("Visit {}", destination.name);
        if title.chars().count() > MAX_TITLE_CHARS {
            title = title.chars().take(MAX_TITLE_CHARS).collect();
        }
        self.add(NewItineraryItem {
            title,
            category: ItineraryCategory::Place,
            duration: "2h".into(),
            travel_time_to_reach: String::new(),
            location: destination.location.clone(),
            cost: Decimal::ZERO,
        })
    }

    pub fn remove(&mut self, id: &str) -> Option<ItineraryItem> {
        let index = self.position(id)?;
        Some(self.items.remove(index))
    }

    /// Moves the element at `from` to `to`, shifting the ones in between.
    /// Out-of-range indices leave the list untouched.
    pub fn reorder(&mut self, from: usize, to: usize) -> bool {
        let len = self.items.len();
        if from >= len || to >= len {
            return false;
        }
        if from != to {
            let item = self.items.remove(from);
            self.items.insert(to, item);
        }
        true
    }

    pub fn move_up(&mut self, id: &str) -> bool {
        match self.position(id) {
            Some(index) if index > 0 => self.reorder(index, index - 1),
            _ => false,
        }
    }

    pub fn move_down(&mut self, id: &str) -> bool {
        match self.position(id) {
            Some(index) => self.reorder(index, index + 1),
            None => false,
        }
    }

    pub fn aggregate(&self) -> ItinerarySummary {
        let total_cost =
            checked_total(self.items.iter().map(|item| item.cost)).unwrap_or(Decimal::MAX);
        let total_activity_minutes = self
            .items
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(item.duration_minutes()));
        let total_travel_minutes = self
            .items
            .iter()
            .fold(0u32, |acc, item| acc.saturating_add(item.travel_minutes()));
        let location_count = self
            .items
            .iter()
            .map(|item| item.location.as_str())
            .collect::<HashSet<_>>()
            .len();

        ItinerarySummary {
            total_cost,
            total_activity_minutes,
            total_travel_minutes,
            total_minutes: total_activity_minutes.saturating_add(total_travel_minutes),
            location_count,
        }
    }
}
