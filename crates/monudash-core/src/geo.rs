//! Slippy-map tile arithmetic and Web-Mercator projection
//!
//! The map view works in a local world space: one world unit is one
//! Web-Mercator pixel at the map zoom level, with the configured center at
//! the origin, X growing east and Y growing north on the ground plane.

use serde::{Deserialize, Serialize};

/// Raster tile edge length in pixels (and world units)
pub const TILE_SIZE: u32 = 256;

/// Attribution string required by the tile provider
pub const OSM_ATTRIBUTION: &str = "© OpenStreetMap contributors";

const OSM_SUBDOMAINS: [char; 3] = ['a', 'b', 'c'];

/// A WGS84 coordinate pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

/// Address of one raster tile in the slippy-map scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileId {
    pub x: i64,
    pub y: i64,
    pub z: u8,
}

impl TileId {
    /// Tile containing the given coordinate at the given zoom.
    /// X wraps around the antimeridian; Y is clamped to the valid range.
    pub fn containing(pos: LatLng, zoom: u8) -> Self {
        let zoom = zoom.min(22);
        let n = 1_i64 << zoom;
        let x_raw = ((pos.lng + 180.0) / 360.0 * (n as f64)).floor() as i64;
        let lat_rad = pos.lat.to_radians();
        let y_raw = ((1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI)
            / 2.0
            * (n as f64))
            .floor() as i64;

        Self {
            x: ((x_raw % n) + n) % n,
            y: y_raw.clamp(0, n - 1),
            z: zoom,
        }
    }

    /// Stable a/b/c subdomain for this tile, rotated the way Leaflet
    /// spreads requests across the provider's mirrors.
    pub fn subdomain(&self) -> char {
        OSM_SUBDOMAINS[(self.x + self.y).rem_euclid(OSM_SUBDOMAINS.len() as i64) as usize]
    }

    /// Full tile image URL on the public OpenStreetMap raster servers
    pub fn url(&self) -> String {
        format!(
            "https://{}.tile.openstreetmap.org/{}/{}/{}.png",
            self.subdomain(),
            self.z,
            self.x,
            self.y
        )
    }
}

/// Project a coordinate to global Web-Mercator pixel space at a zoom level
pub fn project_pixels(pos: LatLng, zoom: u8) -> (f64, f64) {
    let scale = ((1_i64 << zoom.min(22)) * TILE_SIZE as i64) as f64;
    let x = (pos.lng + 180.0) / 360.0 * scale;
    let lat_rad = pos.lat.to_radians();
    let y =
        (1.0 - (lat_rad.tan() + 1.0 / lat_rad.cos()).ln() / std::f64::consts::PI) / 2.0 * scale;
    (x, y)
}

/// Fixed map framing: a center coordinate and a tile zoom level
///
/// Everything the map renders is positioned through this frame, so markers
/// and tiles agree on where the origin is.
#[derive(Debug, Clone, Copy)]
pub struct MapFrame {
    pub center: LatLng,
    pub zoom: u8,
}

impl MapFrame {
    /// Local world position of a coordinate, in pixels-at-zoom relative to
    /// the center. Mercator Y grows south, world Y grows north.
    pub fn world_of(&self, pos: LatLng) -> (f32, f32) {
        let (px, py) = project_pixels(pos, self.zoom);
        let (cx, cy) = project_pixels(self.center, self.zoom);
        ((px - cx) as f32, (cy - py) as f32)
    }

    /// Local world position of a tile's center point
    pub fn tile_world_center(&self, tile: TileId) -> (f32, f32) {
        let half = TILE_SIZE as f64 / 2.0;
        let px = tile.x as f64 * TILE_SIZE as f64 + half;
        let py = tile.y as f64 * TILE_SIZE as f64 + half;
        let (cx, cy) = project_pixels(self.center, self.zoom);
        ((px - cx) as f32, (cy - py) as f32)
    }

    /// The square grid of tiles spanning `radius` tiles around the center.
    /// X wraps; rows outside the valid Y range are dropped.
    pub fn tiles_around(&self, radius: i64) -> Vec<TileId> {
        let center = TileId::containing(self.center, self.zoom);
        let n = 1_i64 << self.zoom;
        let mut tiles = Vec::new();
        for dy in -radius..=radius {
            let y = center.y + dy;
            if y < 0 || y >= n {
                continue;
            }
            for dx in -radius..=radius {
                tiles.push(TileId {
                    x: (center.x + dx).rem_euclid(n),
                    y,
                    z: self.zoom,
                });
            }
        }
        tiles
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AACHEN: LatLng = LatLng {
        lat: 50.7753,
        lng: 6.0839,
    };

    #[test]
    fn test_tile_containing_origin() {
        let tile = TileId::containing(LatLng { lat: 0.0, lng: 0.0 }, 1);
        assert_eq!((tile.x, tile.y, tile.z), (1, 1, 1));
    }

    #[test]
    fn test_tile_containing_aachen() {
        let tile = TileId::containing(AACHEN, 13);
        assert_eq!((tile.x, tile.y), (4234, 2750));
    }

    #[test]
    fn test_tile_x_wraps_antimeridian() {
        let east = TileId::containing(
            LatLng {
                lat: 0.0,
                lng: 181.0,
            },
            2,
        );
        let west = TileId::containing(
            LatLng {
                lat: 0.0,
                lng: -179.0,
            },
            2,
        );
        assert_eq!(east.x, west.x);
    }

    #[test]
    fn test_project_pixels_world_center() {
        let (x, y) = project_pixels(LatLng { lat: 0.0, lng: 0.0 }, 0);
        assert!((x - 128.0).abs() < 1e-9);
        assert!((y - 128.0).abs() < 1e-9);
    }

    #[test]
    fn test_world_of_center_is_origin() {
        let frame = MapFrame {
            center: AACHEN,
            zoom: 13,
        };
        let (x, y) = frame.world_of(AACHEN);
        assert!(x.abs() < 1e-3);
        assert!(y.abs() < 1e-3);
    }

    #[test]
    fn test_world_axes_point_east_and_north() {
        let frame = MapFrame {
            center: AACHEN,
            zoom: 13,
        };
        let (east_x, _) = frame.world_of(LatLng {
            lat: AACHEN.lat,
            lng: AACHEN.lng + 0.01,
        });
        let (_, north_y) = frame.world_of(LatLng {
            lat: AACHEN.lat + 0.01,
            lng: AACHEN.lng,
        });
        assert!(east_x > 0.0);
        assert!(north_y > 0.0);
    }

    #[test]
    fn test_tiles_around_is_a_full_grid() {
        let frame = MapFrame {
            center: AACHEN,
            zoom: 13,
        };
        let tiles = frame.tiles_around(2);
        assert_eq!(tiles.len(), 25);
        let center = TileId::containing(AACHEN, 13);
        assert!(tiles.contains(&center));
    }

    #[test]
    fn test_tile_url_shape() {
        let tile = TileId {
            x: 4234,
            y: 2750,
            z: 13,
        };
        let url = tile.url();
        assert!(url.starts_with("https://"));
        assert!(url.contains(".tile.openstreetmap.org/13/4234/2750.png"));
        assert!(OSM_SUBDOMAINS.contains(&tile.subdomain()));
    }

    #[test]
    fn test_subdomain_is_stable_per_tile() {
        let tile = TileId { x: 7, y: 3, z: 13 };
        assert_eq!(tile.subdomain(), tile.subdomain());
        let neighbor = TileId { x: 8, y: 3, z: 13 };
        // Adjacent tiles rotate to the next mirror
        assert_ne!(tile.subdomain(), neighbor.subdomain());
    }
}
