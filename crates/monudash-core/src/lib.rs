//! MonuDash Core - Monument records and map geometry
//!
//! This crate provides the foundational types for MonuDash:
//! - Monument record decoding from the `/api/monuments` JSON payload
//! - Map-placement eligibility rules
//! - The one-shot load phase of the startup fetch
//! - Slippy-map tile arithmetic and Web-Mercator projection

pub mod geo;
pub mod monument;

pub use geo::{LatLng, MapFrame, TileId, OSM_ATTRIBUTION, TILE_SIZE};
pub use monument::{LoadPhase, Monument, MonumentError, MonumentId};
