use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    Config,
    error::ApiError,
    model::{City, CityDraft, CityId},
};

pub mod http;

pub use http::HttpCitiesApi;

/// CRUD access to the trips collection.
#[async_trait]
pub trait CitiesApi: Send + Sync + Debug {
    async fn list_cities(&self) -> Result<Vec<City>, ApiError>;

    async fn get_city(&self, id: &CityId) -> Result<City, ApiError>;

    /// Persists a draft; the backend assigns the id.
    async fn create_city(&self, draft: &CityDraft) -> Result<City, ApiError>;

    async fn delete_city(&self, id: &CityId) -> Result<(), ApiError>;
}

/// Construct the HTTP backend client from config.
pub fn api_from_config(config: &Config) -> anyhow::Result<HttpCitiesApi> {
    Ok(HttpCitiesApi::with_client(config.backend_url.clone(), config.http_client()?))
}
