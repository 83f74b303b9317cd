//! Monument record types and payload decoding

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::LatLng;

#[derive(Error, Debug)]
pub enum MonumentError {
    #[error("Failed to decode monument payload: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Unique identifier for a monument within one fetched set
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonumentId(pub String);

impl MonumentId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MonumentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A heritage-registry record as served by `GET /api/monuments`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Monument {
    /// Unique record identifier
    pub id: MonumentId,
    /// Official registry number (Denkmalnummer)
    #[serde(default)]
    pub official_id: Option<String>,
    /// Monument category (Denkmalart)
    #[serde(rename = "type")]
    pub kind: String,
    /// Free-text address/location label
    #[serde(default)]
    pub address: Option<String>,
    /// External reference URL for the registry entry
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lng: Option<f64>,
    /// Path to a 3D model file (glTF/GLB), if one exists for this record
    #[serde(default)]
    pub model_path: Option<String>,
    /// When the record entered the registry
    #[serde(default)]
    pub entry_date: Option<NaiveDateTime>,
    /// When the record was removed from the registry (display only)
    #[serde(default)]
    pub deletion_date: Option<NaiveDateTime>,
}

impl Monument {
    /// A monument gets a map marker only when both coordinates are present
    /// and non-zero. Everything else is silently skipped.
    pub fn is_map_eligible(&self) -> bool {
        matches!((self.lat, self.lng), (Some(lat), Some(lng)) if lat != 0.0 && lng != 0.0)
    }

    /// Marker position, for eligible records
    pub fn position(&self) -> Option<LatLng> {
        if self.is_map_eligible() {
            Some(LatLng {
                lat: self.lat.unwrap_or_default(),
                lng: self.lng.unwrap_or_default(),
            })
        } else {
            None
        }
    }

    /// Label shown in the hover popup and the panel heading
    pub fn display_name(&self) -> &str {
        self.official_id.as_deref().unwrap_or(self.id.as_str())
    }
}

/// Decode the `/api/monuments` response body
pub fn parse_monuments(body: &str) -> Result<Vec<Monument>, MonumentError> {
    let monuments: Vec<Monument> = serde_json::from_str(body)?;
    tracing::debug!("Decoded {} monument records", monuments.len());
    Ok(monuments)
}

/// State of the single startup fetch
///
/// Transitions exactly once, from `Loading` to one of the settled states.
/// There is no retry path; a settled phase never changes again.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadPhase {
    #[default]
    Loading,
    Failed(String),
    Ready,
}

impl LoadPhase {
    pub fn is_settled(&self) -> bool {
        !matches!(self, LoadPhase::Loading)
    }

    /// Settle into `Ready`. Ignored once settled.
    pub fn resolve_ready(&mut self) {
        if !self.is_settled() {
            *self = LoadPhase::Ready;
        }
    }

    /// Settle into `Failed`. Ignored once settled.
    pub fn resolve_failure(&mut self, message: impl Into<String>) {
        if !self.is_settled() {
            *self = LoadPhase::Failed(message.into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, lat: Option<f64>, lng: Option<f64>) -> Monument {
        Monument {
            id: MonumentId(id.to_string()),
            official_id: None,
            kind: "Baudenkmal".to_string(),
            address: None,
            url: None,
            lat,
            lng,
            model_path: None,
            entry_date: None,
            deletion_date: None,
        }
    }

    #[test]
    fn test_eligibility_requires_both_coordinates() {
        assert!(record("1", Some(50.77), Some(6.08)).is_map_eligible());
        assert!(!record("2", None, None).is_map_eligible());
        assert!(!record("3", Some(50.77), None).is_map_eligible());
        assert!(!record("4", None, Some(6.08)).is_map_eligible());
    }

    #[test]
    fn test_eligibility_rejects_zero_coordinates() {
        assert!(!record("1", Some(0.0), Some(6.08)).is_map_eligible());
        assert!(!record("2", Some(50.77), Some(0.0)).is_map_eligible());
        assert!(record("3", Some(-33.86), Some(151.21)).is_map_eligible());
    }

    #[test]
    fn test_position_only_for_eligible_records() {
        let m = record("1", Some(50.77), Some(6.08));
        let pos = m.position().unwrap();
        assert_eq!(pos.lat, 50.77);
        assert_eq!(pos.lng, 6.08);
        assert!(record("2", None, None).position().is_none());
    }

    #[test]
    fn test_parse_payload_with_null_coordinates() {
        let body = r#"[
            {"id":"1","official_id":"D-001","type":"Baudenkmal","address":"Markt 1","url":"https://example.org/1","lat":50.77,"lng":6.08,"model_path":"models/d001.glb","entry_date":"1985-03-01T00:00:00"},
            {"id":"2","type":"Bodendenkmal","lat":null,"lng":null}
        ]"#;
        let monuments = parse_monuments(body).unwrap();
        assert_eq!(monuments.len(), 2);
        assert_eq!(monuments[0].id.as_str(), "1");
        assert_eq!(monuments[0].display_name(), "D-001");
        assert_eq!(monuments[0].model_path.as_deref(), Some("models/d001.glb"));
        assert!(monuments[0].entry_date.is_some());
        assert!(monuments[0].is_map_eligible());
        assert_eq!(monuments[1].display_name(), "2");
        assert!(!monuments[1].is_map_eligible());
    }

    #[test]
    fn test_parse_empty_array() {
        assert!(parse_monuments("[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_malformed_payload() {
        assert!(parse_monuments("{\"not\":\"a list\"}").is_err());
        assert!(parse_monuments("nonsense").is_err());
    }

    #[test]
    fn test_load_phase_settles_once() {
        let mut phase = LoadPhase::default();
        assert!(!phase.is_settled());

        phase.resolve_ready();
        assert_eq!(phase, LoadPhase::Ready);

        // Already settled, must not regress
        phase.resolve_failure("too late");
        assert_eq!(phase, LoadPhase::Ready);

        let mut phase = LoadPhase::default();
        phase.resolve_failure("HTTP 500");
        assert_eq!(phase, LoadPhase::Failed("HTTP 500".to_string()));
        phase.resolve_ready();
        assert_eq!(phase, LoadPhase::Failed("HTTP 500".to_string()));
    }
}
