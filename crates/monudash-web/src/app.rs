//! Bevy application setup

use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use bevy_picking::{prelude::MeshPickingPlugin, DefaultPickingPlugins};

use monudash_core::{LatLng, LoadPhase, MapFrame, Monument};

use crate::map::MapPlugin;
use crate::markers::MarkersPlugin;
use crate::network::NetworkPlugin;
use crate::ui::UiPlugin;
use crate::viewer::ViewerPlugin;

/// Monument data fetched from the backend
#[derive(Debug, Clone, Resource, Default)]
pub struct MonumentRegistry {
    pub monuments: Vec<Monument>,
    pub phase: LoadPhase,
}

impl MonumentRegistry {
    pub fn get(&self, id: &str) -> Option<&Monument> {
        self.monuments.iter().find(|m| m.id.as_str() == id)
    }

    pub fn mapped_count(&self) -> usize {
        self.monuments.iter().filter(|m| m.is_map_eligible()).count()
    }
}

/// Currently selected monument
#[derive(Debug, Clone, Resource, Default)]
pub struct SelectedMonument(pub Option<String>);

/// Monument currently under the pointer, for the hover popup
#[derive(Debug, Clone, Resource, Default)]
pub struct HoveredMonument(pub Option<String>);

/// Fixed map framing: center and tile zoom level of the basemap
#[derive(Debug, Clone, Copy, Resource)]
pub struct MapView {
    pub frame: MapFrame,
    /// Tiles spawned in each direction around the center tile
    pub tile_radius: i64,
}

impl Default for MapView {
    fn default() -> Self {
        Self {
            // Aachen city center
            frame: MapFrame {
                center: LatLng {
                    lat: 50.7753,
                    lng: 6.0839,
                },
                zoom: 13,
            },
            tile_radius: 2,
        }
    }
}

/// Camera controller settings for the map view
#[derive(Debug, Clone, Resource)]
pub struct CameraSettings {
    pub distance: f32,
    pub target_distance: f32, // For smooth zoom
    pub azimuth: f32,
    pub elevation: f32,
    pub target: Vec3,
    pub target_focus: Vec3, // For smooth re-centering
    pub sensitivity: f32,
    pub zoom_speed: f32,
    pub smooth_factor: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            // World units are Mercator pixels at the map zoom, so distances
            // are on the order of a few tile widths
            distance: 700.0,
            target_distance: 700.0,
            azimuth: -std::f32::consts::FRAC_PI_2, // Camera south of center, north up
            elevation: 1.25,                       // Steep, map-like view
            target: Vec3::ZERO,
            target_focus: Vec3::ZERO,
            sensitivity: 0.005,
            zoom_speed: 0.1,
            smooth_factor: 0.15,
        }
    }
}

/// Run the Bevy application
pub fn run() {
    App::new()
        .insert_resource(ClearColor(Color::srgb(0.1, 0.1, 0.15))) // Dark blue-gray background
        .add_plugins(
            DefaultPlugins
                .set(WindowPlugin {
                    primary_window: Some(Window {
                        title: "MonuDash - Monument Map".to_string(),
                        canvas: Some("#monudash-canvas".to_string()),
                        fit_canvas_to_parent: true,
                        prevent_default_event_handling: false,
                        ..default()
                    }),
                    ..default()
                })
                .set(AssetPlugin {
                    // Load assets from root (tiles and models are absolute/static paths)
                    file_path: "".to_string(),
                    // Don't look for .meta files - tile and model servers don't have them
                    meta_check: bevy::asset::AssetMetaCheck::Never,
                    ..default()
                }),
        )
        // Add bevy_picking from the crate (required for bevy_egui picking feature)
        // These must be added BEFORE EguiPlugin so it can detect PickingPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(MeshPickingPlugin)
        .add_plugins(EguiPlugin::default())
        .init_resource::<MonumentRegistry>()
        .init_resource::<SelectedMonument>()
        .init_resource::<HoveredMonument>()
        .init_resource::<MapView>()
        .init_resource::<CameraSettings>()
        .add_plugins(NetworkPlugin)
        .add_plugins(MapPlugin)
        .add_plugins(MarkersPlugin)
        .add_plugins(ViewerPlugin)
        .add_plugins(UiPlugin)
        .run();
}
