use askama::Template;
use chrono::{DateTime, Utc};

use crate::{
    duration::format_minutes,
    error::AppError,
    models::itinerary::Itinerary,
    money::format_money,
};

pub const EXPORT_FILENAME: &str = "itinerary.txt";

struct ExportRow {
    position: usize,
    title: String,
    category: &'static str,
    duration: String,
    travel: String,
    location: String,
    cost: String,
}

#[derive(Template)]
#[template(path = "itinerary/export.txt")]
struct ItineraryDocument {
    generated_at: String,
    rows: Vec<ExportRow>,
    total_cost: String,
    activity_time: String,
    travel_time: String,
    total_time: String,
    location_count: usize,
}

/// Renders the itinerary and its totals as a plain-text document.
pub fn render_itinerary(itinerary: &Itinerary, generated_at: DateTime<Utc>) -> Result<String, AppError> {
    let summary = itinerary.aggregate();
    let rows = itinerary
        .items()
        .iter()
        .enumerate()
        .map(|(index, item)| ExportRow {
            position: index + 1,
            title: item.title.clone(),
            category: item.category.label(),
            duration: format_minutes(item.duration_minutes()),
            travel: format_minutes(item.travel_minutes()),
            location: item.location.clone(),
            cost: format_money(item.cost),
        })
        .collect();

    let document = ItineraryDocument {
        generated_at: generated_at.format("%Y-%m-%d %H:%M UTC").to_string(),
        rows,
        total_cost: format_money(summary.total_cost),
        activity_time: format_minutes(summary.total_activity_minutes),
        travel_time: format_minutes(summary.total_travel_minutes),
        total_time: format_minutes(summary.total_minutes),
        location_count: summary.location_count,
    };
    Ok(document.render()?)
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::itinerary::{ItineraryCategory, NewItineraryItem};

    #[test]
    fn document_lists_stops_in_order_with_totals() {
        let mut itinerary = Itinerary::new();
        for (title, duration, cost) in [("Breakfast", "1h", 110), ("Museum", "3h", 200)] {
            itinerary.add(NewItineraryItem {
                title: title.into(),
                category: ItineraryCategory::Activity,
                duration: duration.into(),
                travel_time_to_reach: "15m".into(),
                location: "Paris".into(),
                cost: Decimal::from(cost),
            });
        }
        let at = Utc.with_ymd_and_hms(2026, 10, 17, 9, 30, 0).unwrap();
        let text = render_itinerary(&itinerary, at).unwrap();

        assert!(text.contains("2026-10-17 09:30 UTC"));
        let breakfast = text.find("1. Breakfast").unwrap();
        let museum = text.find("2. Museum").unwrap();
        assert!(breakfast < museum);
        assert!(text.contains("Total cost: $310.00"));
        assert!(text.contains("Activity time: 4h"));
        assert!(text.contains("Travel time: 30m"));
    }

    #[test]
    fn empty_itinerary_still_renders() {
        let text = render_itinerary(&Itinerary::new(), Utc::now()).unwrap();
        assert!(text.contains("No stops planned yet."));
        assert!(text.contains("Total cost: $0.00"));
    }
}
