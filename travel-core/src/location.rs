//! Reads the selected map pin out of an address.
//!
//! The map view encodes the pin as `?lat=<lat>&lng=<lng>`. Values are handed
//! back exactly as they appear; [`UrlLocation::position`] is the only place
//! they are interpreted as numbers.

use reqwest::Url;

use crate::model::Position;

const LAT_PARAM: &str = "lat";
const LNG_PARAM: &str = "lng";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlLocation {
    pub lat: Option<String>,
    pub lng: Option<String>,
}

impl UrlLocation {
    /// Accepts a full URL (`http://host/app/form?lat=1&lng=2`), a path with a
    /// query (`/app/form?lat=1&lng=2`) or a bare query (`?lat=1&lng=2`).
    pub fn from_address(address: &str) -> Self {
        let Some(url) = resolve(address) else {
            return Self::default();
        };

        let mut location = Self::default();
        for (key, value) in url.query_pairs() {
            // first occurrence wins, like URLSearchParams::get
            match key.as_ref() {
                LAT_PARAM if location.lat.is_none() => location.lat = Some(value.into_owned()),
                LNG_PARAM if location.lng.is_none() => location.lng = Some(value.into_owned()),
                _ => {}
            }
        }
        location
    }

    pub fn from_pair(lat: impl Into<String>, lng: impl Into<String>) -> Self {
        Self { lat: Some(lat.into()), lng: Some(lng.into()) }
    }

    /// Both values as numbers, or `None` when no usable pin is selected.
    pub fn position(&self) -> Option<Position> {
        let lat = self.lat.as_deref()?.trim().parse::<f64>().ok()?;
        let lng = self.lng.as_deref()?.trim().parse::<f64>().ok()?;
        if !lat.is_finite() || !lng.is_finite() {
            return None;
        }
        Some(Position { lat, lng })
    }

    pub fn to_query(&self) -> String {
        let Some(mut url) = placeholder_base() else {
            return String::new();
        };
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(lat) = &self.lat {
                pairs.append_pair(LAT_PARAM, lat);
            }
            if let Some(lng) = &self.lng {
                pairs.append_pair(LNG_PARAM, lng);
            }
        }
        url.query().filter(|q| !q.is_empty()).map(|q| format!("?{q}")).unwrap_or_default()
    }
}

fn placeholder_base() -> Option<Url> {
    Url::parse("http://localhost/").ok()
}

fn resolve(address: &str) -> Option<Url> {
    let address = address.trim();
    Url::parse(address)
        .ok()
        .filter(|url| url.has_host())
        .or_else(|| placeholder_base()?.join(address).ok())
}
