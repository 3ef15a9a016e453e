use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::{config::DEFAULT_GEOCODING_URL, error::{GeocodeError, truncate_body}};

use super::{GeocodeResponse, ReverseGeocoder};

/// BigDataCloud's keyless client-side reverse-geocoding endpoint.
#[derive(Debug, Clone)]
pub struct BigDataCloudGeocoder {
    url: String,
    http: Client,
}

impl Default for BigDataCloudGeocoder {
    fn default() -> Self {
        Self::with_client(DEFAULT_GEOCODING_URL, Client::new())
    }
}

impl BigDataCloudGeocoder {
    pub fn with_client(url: impl Into<String>, http: Client) -> Self {
        Self { url: url.into(), http }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl ReverseGeocoder for BigDataCloudGeocoder {
    async fn reverse_geocode(&self, lat: f64, lng: f64) -> Result<GeocodeResponse, GeocodeError> {
        debug!(url = %self.url, lat, lng, "reverse geocoding");

        let res = self
            .http
            .get(&self.url)
            .query(&[("latitude", lat), ("longitude", lng)])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            return Err(GeocodeError::Status { status, body: truncate_body(&body) });
        }

        Ok(serde_json::from_str(&body)?)
    }
}
