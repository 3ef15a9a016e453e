use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Identifier assigned by the backend when a trip is persisted.
///
/// json-server style backends emit either numbers or strings here, so both are
/// accepted on decode. Equality is by textual value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CityId(String);

impl CityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CityId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl Serialize for CityId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Text(String),
    Int(i64),
    Float(f64),
}

impl<'de> Deserialize<'de> for CityId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match RawScalar::deserialize(deserializer)? {
            RawScalar::Text(s) => CityId(s),
            RawScalar::Int(n) => CityId(n.to_string()),
            RawScalar::Float(n) => CityId(n.to_string()),
        })
    }
}

/// Coordinates of a pin on the map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    #[serde(deserialize_with = "coordinate")]
    pub lat: f64,
    #[serde(deserialize_with = "coordinate")]
    pub lng: f64,
}

// Older entries carry the raw address-bar strings ("48.8") instead of numbers.
fn coordinate<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    match RawScalar::deserialize(deserializer)? {
        RawScalar::Int(n) => Ok(n as f64),
        RawScalar::Float(n) => Ok(n),
        RawScalar::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid coordinate '{s}'"))),
    }
}

/// A trip that has not been persisted yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CityDraft {
    pub city_name: String,
    pub country: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub notes: String,
    pub position: Position,
}

/// A persisted trip entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct City {
    pub id: CityId,
    pub city_name: String,
    pub country: String,
    pub date: DateTime<Utc>,
    #[serde(default)]
    pub notes: String,
    pub position: Position,
}

impl City {
    pub fn from_draft(id: CityId, draft: CityDraft) -> Self {
        let CityDraft { city_name, country, date, notes, position } = draft;
        Self { id, city_name, country, date, notes, position }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn city_decodes_numeric_id_and_string_coordinates() {
        let json = r#"{
            "id": 73930385,
            "cityName": "Lisbon",
            "country": "Portugal",
            "date": "2027-10-31T15:59:59.138Z",
            "notes": "My favorite city so far!",
            "position": { "lat": "38.727881642324164", "lng": -9.140900099907554 }
        }"#;

        let city: City = serde_json::from_str(json).expect("valid city json");
        assert_eq!(city.id, CityId::new("73930385"));
        assert_eq!(city.city_name, "Lisbon");
        assert!((city.position.lat - 38.727_881_642_324_164).abs() < 1e-12);
        assert!((city.position.lng + 9.140_900_099_907_554).abs() < 1e-12);
    }

    #[test]
    fn city_without_notes_defaults_to_empty() {
        let json = r#"{
            "id": "a1b2",
            "cityName": "Madrid",
            "country": "Spain",
            "date": "2027-07-15T08:22:53.976Z",
            "position": { "lat": 40.46, "lng": -3.75 }
        }"#;

        let city: City = serde_json::from_str(json).expect("valid city json");
        assert_eq!(city.id.as_str(), "a1b2");
        assert!(city.notes.is_empty());
    }

    #[test]
    fn draft_serializes_camel_case_without_id() {
        let draft = CityDraft {
            city_name: "Paris".into(),
            country: "France".into(),
            date: "2027-01-02T00:00:00Z".parse().expect("valid date"),
            notes: String::new(),
            position: Position { lat: 48.8, lng: 2.3 },
        };

        let value = serde_json::to_value(&draft).expect("serializable");
        assert_eq!(value["cityName"], "Paris");
        assert_eq!(value["position"]["lat"], 48.8);
        assert!(value.get("id").is_none());
    }

    #[test]
    fn invalid_coordinate_string_is_rejected() {
        let json = r#"{ "lat": "north", "lng": 1 }"#;
        let err = serde_json::from_str::<Position>(json).unwrap_err();
        assert!(err.to_string().contains("invalid coordinate"));
    }
}
