//! Service directory wire types.
//!
//! Every directory response wraps its payload in `{"data": ...}`;
//! [`Envelope`] captures that pattern generically.

use chrono::{DateTime, NaiveDateTime, Utc};
use fys_core::{GeoPoint, ServiceRecord};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub data: T,
}

/// GeoJSON point as emitted by the directory: `coordinates` is `[lng, lat]`.
#[derive(Debug, Deserialize)]
pub struct GeolocationPoint {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub coordinates: Vec<f64>,
}

impl GeolocationPoint {
    /// Converts to a [`GeoPoint`], or `None` when the coordinates are
    /// missing or out of range.
    #[must_use]
    pub fn to_geo_point(&self) -> Option<GeoPoint> {
        match self.coordinates.as_slice() {
            [lng, lat, ..] => GeoPoint::new(*lat, *lng).ok(),
            _ => None,
        }
    }
}

/// A listing as it appears on the wire.
#[derive(Debug, Deserialize)]
pub struct ServiceResponse {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
    pub geolocation: GeolocationPoint,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl ServiceResponse {
    /// Converts into the domain record. Returns `None` if the listing has no
    /// usable position, since such a listing cannot be placed on the map.
    #[must_use]
    pub fn into_record(self) -> Option<ServiceRecord> {
        let location = self.geolocation.to_geo_point()?;
        Some(ServiceRecord {
            id: self.id,
            title: self.title,
            description: self.description,
            address: self.address.unwrap_or_default(),
            city: self.city.unwrap_or_default(),
            state: self.state.unwrap_or_default(),
            zip_code: self.zip_code.unwrap_or_default(),
            location,
            created_at: self.created_at.as_deref().and_then(parse_timestamp),
            updated_at: self.updated_at.as_deref().and_then(parse_timestamp),
        })
    }
}

/// Body of `POST auth/login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Account behind the current credential, from `GET auth/me`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// Parses directory timestamps, which come either as RFC 3339 or as
/// `YYYY-MM-DD HH:MM:SS` in UTC.
#[must_use]
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
