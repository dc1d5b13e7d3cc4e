//! Service listings as published by the directory.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::geo::GeoPoint;

/// One listing from the service directory. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceRecord {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub location: GeoPoint,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl ServiceRecord {
    /// Case-insensitive match of `needle` against the record's text fields.
    ///
    /// An empty or whitespace-only needle matches everything.
    #[must_use]
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        [
            Some(self.title.as_str()),
            self.description.as_deref(),
            Some(self.address.as_str()),
            Some(self.city.as_str()),
            Some(self.state.as_str()),
            Some(self.zip_code.as_str()),
        ]
        .into_iter()
        .flatten()
        .any(|field| field.to_lowercase().contains(&needle))
    }
}

/// Partial update for an existing listing. Unset fields are left untouched
/// by the directory.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ServiceDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lat: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lng: Option<f64>,
}

impl ServiceDraft {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record() -> ServiceRecord {
        ServiceRecord {
            id: 7,
            title: "Brooklyn Plumbing".to_string(),
            description: Some("24h emergency repairs".to_string()),
            address: "12 Kent Ave".to_string(),
            city: "Brooklyn".to_string(),
            state: "NY".to_string(),
            zip_code: "11249".to_string(),
            location: GeoPoint::DEFAULT_CENTER,
            created_at: None,
            updated_at: None,
        }
    }

    #[test]
    fn empty_search_matches() {
        assert!(record().matches_search(""));
        assert!(record().matches_search("   "));
    }

    #[test]
    fn search_is_case_insensitive_across_fields() {
        let r = record();
        assert!(r.matches_search("plumb"));
        assert!(r.matches_search("EMERGENCY"));
        assert!(r.matches_search("kent"));
        assert!(r.matches_search("11249"));
        assert!(!r.matches_search("electrician"));
    }

    #[test]
    fn draft_serializes_only_set_fields() {
        let draft = ServiceDraft {
            title: Some("New title".to_string()),
            ..ServiceDraft::default()
        };
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json, serde_json::json!({"title": "New title"}));
        assert!(!draft.is_empty());
        assert!(ServiceDraft::default().is_empty());
    }
}
