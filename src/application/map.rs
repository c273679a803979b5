//! Map pins for the businesses on a city or intersection page.

use serde::Serialize;

use crate::application::explore::BusinessCard;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MapPin {
    pub lat: f64,
    pub lng: f64,
    pub title: String,
    pub url: String,
    pub image: String,
    pub rating: f64,
    pub address: String,
}

/// Pins for cards that carry a location; `(0, 0)` means unset.
pub fn extract_pins(cards: &[BusinessCard]) -> Vec<MapPin> {
    cards
        .iter()
        .filter_map(|card| {
            let location = card.location.as_ref()?;
            if location.lat == 0.0 && location.lng == 0.0 {
                return None;
            }
            let address = [location.address.as_str(), location.city.as_str()]
                .into_iter()
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(", ");
            Some(MapPin {
                lat: location.lat,
                lng: location.lng,
                title: card.title.clone(),
                url: card.permalink.clone(),
                image: card.featured_image.clone(),
                rating: card.rating,
                address,
            })
        })
        .collect()
}
