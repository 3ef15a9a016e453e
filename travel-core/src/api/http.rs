use async_trait::async_trait;
use reqwest::{Client, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::{
    error::{ApiError, truncate_body},
    model::{City, CityDraft, CityId},
};

use super::CitiesApi;

/// json-server style REST backend exposing `/cities`.
#[derive(Debug, Clone)]
pub struct HttpCitiesApi {
    base_url: String,
    http: Client,
}

impl HttpCitiesApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: impl Into<String>, http: Client) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url, http }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn collection_url(&self) -> String {
        format!("{}/cities", self.base_url)
    }

    /// The id is pushed as a single percent-encoded path segment.
    fn item_url(&self, id: &CityId) -> Result<Url, ApiError> {
        if matches!(id.as_str(), "" | "." | "..") {
            return Err(ApiError::InvalidId(id.to_string()));
        }

        let collection = self.collection_url();
        let invalid = |reason: String| ApiError::InvalidUrl { url: collection.clone(), reason };

        let mut url = Url::parse(&collection).map_err(|e| invalid(e.to_string()))?;
        url.path_segments_mut()
            .map_err(|()| invalid("URL cannot have path segments".to_string()))?
            .push(id.as_str());
        Ok(url)
    }
}

async fn checked_body(res: Response, operation: &'static str) -> Result<String, ApiError> {
    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|source| ApiError::Transport { operation, source })?;

    if !status.is_success() {
        return Err(ApiError::Status { operation, status, body: truncate_body(&body) });
    }

    Ok(body)
}

fn parse<T: DeserializeOwned>(body: &str, operation: &'static str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|source| ApiError::Decode { operation, source })
}

#[async_trait]
impl CitiesApi for HttpCitiesApi {
    async fn list_cities(&self) -> Result<Vec<City>, ApiError> {
        const OP: &str = "list";
        let url = self.collection_url();
        debug!(%url, "GET cities");

        let res = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|source| ApiError::Transport { operation: OP, source })?;

        parse(&checked_body(res, OP).await?, OP)
    }

    async fn get_city(&self, id: &CityId) -> Result<City, ApiError> {
        const OP: &str = "get";
        let url = self.item_url(id)?;
        debug!(%url, "GET city");

        let res = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|source| ApiError::Transport { operation: OP, source })?;

        parse(&checked_body(res, OP).await?, OP)
    }

    async fn create_city(&self, draft: &CityDraft) -> Result<City, ApiError> {
        const OP: &str = "create";
        let url = self.collection_url();
        debug!(%url, city = %draft.city_name, "POST city");

        // .json() sets Content-Type: application/json
        let res = self
            .http
            .post(&url)
            .json(draft)
            .send()
            .await
            .map_err(|source| ApiError::Transport { operation: OP, source })?;

        parse(&checked_body(res, OP).await?, OP)
    }

    async fn delete_city(&self, id: &CityId) -> Result<(), ApiError> {
        const OP: &str = "delete";
        let url = self.item_url(id)?;
        debug!(%url, "DELETE city");

        let res = self
            .http
            .delete(url)
            .send()
            .await
            .map_err(|source| ApiError::Transport { operation: OP, source })?;

        checked_body(res, OP).await.map(|_| ())
    }
}
