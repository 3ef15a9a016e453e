//! Plain-text views over provider state.

use chrono::{DateTime, Utc};
use travel_core::{CitiesState, City, User, form::format_trip_date};

pub const EMPTY_LIST_MESSAGE: &str = "Add your first city by clicking on a city on the map";

pub const UNAVAILABLE_LIST_MESSAGE: &str =
    "The trip list could not be loaded from the backend; run `travel cities list` to retry";

pub fn long_date(date: &DateTime<Utc>) -> String {
    date.format("%A, %B %-d, %Y").to_string()
}

pub fn city_line(city: &City) -> String {
    format!(
        "{} ({})  {}  [{}]",
        city.city_name,
        city.country,
        format_trip_date(&city.date),
        city.id
    )
}

pub fn city_list(state: &CitiesState) -> String {
    if state.cities.is_empty() {
        return EMPTY_LIST_MESSAGE.to_string();
    }
    state.cities.iter().map(city_line).collect::<Vec<_>>().join("\n")
}

/// The collection after a mutation. When the initial load failed, `cities`
/// holds only what was created since, so the list is not shown.
pub fn collection_view(state: &CitiesState) -> String {
    if !state.collection_loaded() {
        return UNAVAILABLE_LIST_MESSAGE.to_string();
    }
    city_list(state)
}

/// Countries visited, first visit order, without repeats.
pub fn country_list(state: &CitiesState) -> String {
    if state.cities.is_empty() {
        return EMPTY_LIST_MESSAGE.to_string();
    }

    let mut countries: Vec<&str> = Vec::new();
    for city in &state.cities {
        if !countries.contains(&city.country.as_str()) {
            countries.push(&city.country);
        }
    }
    countries.join("\n")
}

pub fn city_detail(city: &City) -> String {
    let mut out = format!(
        "City name\n  {}\n\nYou went to {} on\n  {}\n",
        city.city_name,
        city.city_name,
        long_date(&city.date)
    );
    if !city.notes.is_empty() {
        out.push_str(&format!("\nYour notes\n  {}\n", city.notes));
    }
    out.push_str(&format!(
        "\nPosition\n  {}, {}\n\nLearn more\n  https://en.wikipedia.org/wiki/{}",
        city.position.lat,
        city.position.lng,
        city.city_name.replace(' ', "_")
    ));
    out
}

pub fn welcome(user: &User) -> String {
    format!("Welcome, {} <{}>\n  avatar: {}", user.name, user.email, user.avatar)
}
