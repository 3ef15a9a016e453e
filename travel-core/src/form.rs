//! The "add a trip" form without a UI attached.
//!
//! A form is bound to the pin read from the address. Resolving the pin is
//! split into [`TripForm::begin_lookup`] and [`TripForm::finish_lookup`] so a
//! response for a pin that is no longer current can be recognised and
//! dropped; [`TripForm::lookup`] runs both against a geocoder.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use tracing::{debug, warn};

use crate::{
    api::CitiesApi,
    cities::{CitiesError, CitiesProvider},
    error::GeocodeError,
    geocode::{GeocodeResponse, ReverseGeocoder, flag_emoji},
    location::UrlLocation,
    model::{CityDraft, Position},
};

/// Route of the trips collection view.
pub const COLLECTION_ROUTE: &str = "/app/cities";

pub const NO_LOCATION_MESSAGE: &str = "Start by clicking somewhere on the map";

/// Day-first date format used by the date input.
pub const TRIP_DATE_FORMAT: &str = "%d/%m/%Y";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormStatus {
    NoLocation,
    /// A lookup is due or in flight.
    Loading,
    Failed(String),
    Ready,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Navigation {
    To(String),
    Back,
}

/// Result of an accepted submission. The form navigates whether or not the
/// create succeeded; a failure is also recorded in the provider state.
#[derive(Debug)]
pub struct Submitted {
    pub navigation: Navigation,
    pub error: Option<CitiesError>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LookupTicket {
    generation: u64,
    pub position: Position,
}

#[derive(Debug, Clone)]
pub struct TripForm {
    location: UrlLocation,
    status: FormStatus,
    generation: u64,
    city_name: String,
    country: String,
    country_code: Option<String>,
    date: Option<DateTime<Utc>>,
    notes: String,
}

impl TripForm {
    /// The date defaults to now.
    pub fn new(location: UrlLocation) -> Self {
        let status = initial_status(&location);
        Self {
            location,
            status,
            generation: 0,
            city_name: String::new(),
            country: String::new(),
            country_code: None,
            date: Some(Utc::now()),
            notes: String::new(),
        }
    }

    pub fn location(&self) -> &UrlLocation {
        &self.location
    }

    pub fn status(&self) -> &FormStatus {
        &self.status
    }

    /// Fields are only shown once the pin resolved to a place.
    pub fn is_renderable(&self) -> bool {
        self.status == FormStatus::Ready
    }

    /// Message to show instead of the form, if any.
    pub fn message(&self) -> Option<&str> {
        match &self.status {
            FormStatus::NoLocation => Some(NO_LOCATION_MESSAGE),
            FormStatus::Failed(message) => Some(message),
            FormStatus::Loading | FormStatus::Ready => None,
        }
    }

    pub fn city_name(&self) -> &str {
        &self.city_name
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn flag(&self) -> Option<String> {
        self.country_code.as_deref().map(flag_emoji)
    }

    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.date
    }

    pub fn notes(&self) -> &str {
        &self.notes
    }

    pub fn set_city_name(&mut self, city_name: impl Into<String>) {
        self.city_name = city_name.into();
    }

    pub fn set_date(&mut self, date: Option<DateTime<Utc>>) {
        self.date = date;
    }

    pub fn set_notes(&mut self, notes: impl Into<String>) {
        self.notes = notes.into();
    }

    /// Rebinds the form to a new pin. Returns whether the pair changed; any
    /// lookup still in flight for the old pair becomes stale.
    pub fn set_location(&mut self, location: UrlLocation) -> bool {
        if location == self.location {
            return false;
        }
        self.generation += 1;
        self.status = initial_status(&location);
        self.location = location;
        true
    }

    /// Marks the form as loading and hands out a ticket for the current pin.
    /// `None` when the address carries no usable pin.
    pub fn begin_lookup(&mut self) -> Option<LookupTicket> {
        let Some(position) = self.location.position() else {
            self.status = FormStatus::NoLocation;
            return None;
        };

        self.generation += 1;
        self.status = FormStatus::Loading;
        Some(LookupTicket { generation: self.generation, position })
    }

    /// Applies a geocoding result. Returns `false` if the ticket is stale and
    /// the result was discarded.
    pub fn finish_lookup(
        &mut self,
        ticket: LookupTicket,
        result: Result<GeocodeResponse, GeocodeError>,
    ) -> bool {
        if ticket.generation != self.generation {
            debug!(ticket = ticket.generation, current = self.generation, "stale geocode dropped");
            return false;
        }

        match result.and_then(GeocodeResponse::into_place) {
            Ok(place) => {
                self.city_name = place.city_name;
                self.country = place.country;
                self.country_code = Some(place.country_code);
                self.status = FormStatus::Ready;
            }
            Err(err) => {
                debug!(error = %err, "geocode lookup failed");
                self.status = FormStatus::Failed(err.to_string());
            }
        }
        true
    }

    pub async fn lookup<G>(&mut self, geocoder: &G)
    where
        G: ReverseGeocoder + ?Sized,
    {
        let Some(ticket) = self.begin_lookup() else {
            return;
        };
        let result = geocoder.reverse_geocode(ticket.position.lat, ticket.position.lng).await;
        self.finish_lookup(ticket, result);
    }

    /// The draft to persist, or `None` while the form would refuse to submit.
    /// A city name of only whitespace counts as empty.
    pub fn draft(&self) -> Option<CityDraft> {
        if !self.is_renderable() || self.city_name.trim().is_empty() {
            return None;
        }
        let date = self.date?;
        let position = self.location.position()?;

        Some(CityDraft {
            city_name: self.city_name.clone(),
            country: self.country.clone(),
            date,
            notes: self.notes.clone(),
            position,
        })
    }

    /// Creates the trip, then routes to the collection view. Missing city
    /// name or date is a no-op: no request, no navigation.
    pub async fn submit<A: CitiesApi>(&self, provider: &CitiesProvider<A>) -> Option<Submitted> {
        let Some(draft) = self.draft() else {
            debug!("submit refused: city name or date missing");
            return None;
        };

        let error = provider.create_city(&draft).await.err();
        if let Some(err) = &error {
            warn!(error = %err, cause = %err.source, "trip not saved");
        }
        Some(Submitted { navigation: Navigation::To(COLLECTION_ROUTE.to_string()), error })
    }

    pub fn back(&self) -> Navigation {
        Navigation::Back
    }
}

fn initial_status(location: &UrlLocation) -> FormStatus {
    if location.position().is_some() { FormStatus::Loading } else { FormStatus::NoLocation }
}

/// Parses a `dd/mm/yyyy` date as midnight UTC.
pub fn parse_trip_date(input: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let day = NaiveDate::parse_from_str(input.trim(), TRIP_DATE_FORMAT)?;
    Ok(day.and_time(NaiveTime::MIN).and_utc())
}

pub fn format_trip_date(date: &DateTime<Utc>) -> String {
    date.format(TRIP_DATE_FORMAT).to_string()
}
