//! Core library for the `travel` log.
//!
//! This crate defines:
//! - Configuration (backend and geocoding endpoints)
//! - The trips backend client and reverse geocoder
//! - Providers owning trips and session state
//! - The headless "add a trip" form and the address pin reader
//!
//! It is used by `travel-cli`, but can also be reused by other front-ends.

pub mod api;
pub mod auth;
pub mod cities;
pub mod config;
pub mod error;
pub mod form;
pub mod geocode;
pub mod location;
pub mod model;

pub use api::{CitiesApi, HttpCitiesApi};
pub use auth::{AuthProvider, AuthState, User};
pub use cities::{CitiesError, CitiesProvider, CitiesState};
pub use config::Config;
pub use error::{ApiError, GeocodeError};
pub use form::{FormStatus, Navigation, Submitted, TripForm};
pub use geocode::{BigDataCloudGeocoder, GeocodeResponse, Place, ReverseGeocoder};
pub use location::UrlLocation;
pub use model::{City, CityDraft, CityId, Position};
