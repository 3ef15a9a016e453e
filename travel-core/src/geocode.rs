//! Reverse geocoding: turning a map pin into a city name and country.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::{Config, error::GeocodeError};

pub mod bigdatacloud;

pub use bigdatacloud::BigDataCloudGeocoder;

/// Raw reverse-geocoding payload. Only the fields the form reads are kept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeResponse {
    pub city: Option<String>,
    pub locality: Option<String>,
    pub country_name: Option<String>,
    pub country_code: Option<String>,
}

/// A pin resolved to a named place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Place {
    pub city_name: String,
    pub country: String,
    pub country_code: String,
}

impl GeocodeResponse {
    /// City name prefers `city`, then `locality`, else empty. A response without
    /// a country code is not a city location.
    pub fn into_place(self) -> Result<Place, GeocodeError> {
        let country_code = non_empty(self.country_code).ok_or(GeocodeError::NotACity)?;
        let city_name = non_empty(self.city).or(non_empty(self.locality)).unwrap_or_default();

        Ok(Place { city_name, country: self.country_name.unwrap_or_default(), country_code })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|s| !s.trim().is_empty())
}

impl Place {
    pub fn flag(&self) -> String {
        flag_emoji(&self.country_code)
    }
}

/// Regional-indicator flag for a two-letter country code ("fr" -> 🇫🇷).
/// Characters outside A-Z are skipped.
pub fn flag_emoji(country_code: &str) -> String {
    const REGIONAL_INDICATOR_OFFSET: u32 = 127_397;

    country_code
        .chars()
        .filter(char::is_ascii_alphabetic)
        .filter_map(|c| char::from_u32(c.to_ascii_uppercase() as u32 + REGIONAL_INDICATOR_OFFSET))
        .collect()
}

#[async_trait]
pub trait ReverseGeocoder: Send + Sync + Debug {
    async fn reverse_geocode(&self, lat: f64, lng: f64) -> Result<GeocodeResponse, GeocodeError>;
}

/// Construct the configured reverse geocoder.
pub fn geocoder_from_config(config: &Config) -> anyhow::Result<BigDataCloudGeocoder> {
    Ok(BigDataCloudGeocoder::with_client(config.geocoding_url.clone(), config.http_client()?))
}
