//! Embedded 3D model viewer for the selected monument
//!
//! The viewer is its own little world: model, lights and camera live on a
//! dedicated render layer far above the map, and the viewer camera draws
//! into a viewport rectangle supplied by the details panel. Asset failures
//! are contained here - a model that fails to load swaps the region for a
//! static error message and leaves the rest of the page alone.

use bevy::asset::LoadState;
use bevy::prelude::*;
use bevy::camera::visibility::RenderLayers;
use bevy::camera::{ClearColorConfig, Viewport};
use std::collections::HashMap;

use crate::app::{MonumentRegistry, SelectedMonument};

/// Render layer shared by the viewer camera, lights and model
const VIEWER_LAYER: usize = 1;

/// The viewer world sits far above the map plane
const VIEWER_ORIGIN: Vec3 = Vec3::new(0.0, 0.0, 4000.0);

pub struct ViewerPlugin;

impl Plugin for ViewerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ViewerState>()
            .init_resource::<ModelCache>()
            .init_resource::<ViewerRegion>()
            .init_resource::<ViewerInput>()
            .init_resource::<ViewerCameraSettings>()
            .add_systems(Startup, setup_viewer)
            .add_systems(
                Update,
                (
                    drive_model_target,
                    poll_model_loads.after(drive_model_target),
                    apply_viewer_layers,
                    update_placeholder,
                    update_viewer_camera,
                ),
            );
    }
}

/// What the viewer is currently showing
#[derive(Debug, Clone, Resource, Default, PartialEq)]
pub enum ViewerState {
    /// No selection, or the selected monument has no model
    #[default]
    Idle,
    /// Asset load in flight; the placeholder box is shown
    Loading { path: String },
    /// Model scene spawned
    Ready { path: String },
    /// Asset load failed; the region shows a static error message
    Failed { path: String, message: String },
}

impl ViewerState {
    pub fn path(&self) -> Option<&str> {
        match self {
            ViewerState::Idle => None,
            ViewerState::Loading { path }
            | ViewerState::Ready { path }
            | ViewerState::Failed { path, .. } => Some(path),
        }
    }

    pub fn failure_message(&self) -> Option<&str> {
        match self {
            ViewerState::Failed { message, .. } => Some(message),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        !matches!(self, ViewerState::Idle)
    }
}

/// Cache of loaded model handles
#[derive(Resource, Default)]
pub struct ModelCache {
    pub loading: HashMap<String, Handle<Gltf>>,
    pub scenes: HashMap<String, Handle<Scene>>,
    /// Paths that failed to load, with the load error message.
    /// A cached failure is never retried; re-selecting shows it again.
    pub failed: HashMap<String, String>,
}

/// Viewport rectangle of the viewer region inside the details panel,
/// in physical pixels. None while the panel (or the region) is hidden.
#[derive(Resource, Default)]
pub struct ViewerRegion {
    pub rect: Option<URect>,
}

/// Orbit input accumulated by the UI from drags over the viewer region
#[derive(Resource, Default)]
pub struct ViewerInput {
    pub orbit_delta: Vec2,
    pub zoom_delta: f32,
}

/// Orbit camera settings for the viewer world
#[derive(Debug, Clone, Resource)]
pub struct ViewerCameraSettings {
    pub azimuth: f32,
    pub elevation: f32,
    pub distance: f32,
    pub sensitivity: f32,
}

impl Default for ViewerCameraSettings {
    fn default() -> Self {
        Self {
            azimuth: 0.8,
            elevation: 0.5,
            distance: 5.0,
            sensitivity: 0.01,
        }
    }
}

/// Marker component for the viewer camera
#[derive(Component)]
pub struct ViewerCamera;

/// Marker component for the spawned model scene root
#[derive(Component)]
pub struct ViewerModel;

/// Marker component for the gray box shown while a model loads
#[derive(Component)]
pub struct PlaceholderCube;

fn setup_viewer(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    // Viewer camera renders after the map camera, into a viewport set by the UI
    commands.spawn((
        Camera3d { ..default() },
        Camera {
            order: 1,
            is_active: false,
            clear_color: ClearColorConfig::Custom(Color::srgb(0.13, 0.13, 0.17)),
            ..default()
        },
        Projection::Perspective(PerspectiveProjection {
            near: 0.01,
            far: 1000.0,
            ..default()
        }),
        Transform::from_translation(VIEWER_ORIGIN + Vec3::new(0.0, -5.0, 2.0))
            .looking_at(VIEWER_ORIGIN, Vec3::Z),
        RenderLayers::layer(VIEWER_LAYER),
        ViewerCamera,
    ));

    // Fixed lighting rig: the shared ambient light plus four directional
    // lights from the front/back upper corners
    for (x, y) in [(5.0, -5.0), (-5.0, -5.0), (5.0, 5.0), (-5.0, 5.0)] {
        commands.spawn((
            DirectionalLight {
                illuminance: 2500.0,
                shadows_enabled: false,
                ..default()
            },
            Transform::from_translation(VIEWER_ORIGIN + Vec3::new(x, y, 5.0))
                .looking_at(VIEWER_ORIGIN, Vec3::Z),
            RenderLayers::layer(VIEWER_LAYER),
        ));
    }

    // Placeholder shown while a model load is pending
    commands.spawn((
        Mesh3d(meshes.add(Cuboid::new(1.0, 1.0, 1.0))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.5, 0.5, 0.5),
            ..default()
        })),
        Transform::from_translation(VIEWER_ORIGIN),
        Visibility::Hidden,
        RenderLayers::layer(VIEWER_LAYER),
        PlaceholderCube,
    ));
}

/// Normalize model path for asset loading
fn normalize_model_path(path: &str) -> String {
    // If it's an absolute URL, return as-is (Bevy can load from HTTP)
    if path.starts_with("http://") || path.starts_with("https://") {
        return path.to_string();
    }

    // Strip leading slash
    let path = path.trim_start_matches('/');

    // Ensure it starts with "models/" for local paths
    if path.starts_with("models/") {
        path.to_string()
    } else {
        format!("models/{}", path)
    }
}

/// Point the viewer at the selected monument's model, if any.
/// A selection change despawns the previous model and remounts the viewer.
fn drive_model_target(
    mut commands: Commands,
    selected: Res<SelectedMonument>,
    registry: Res<MonumentRegistry>,
    mut state: ResMut<ViewerState>,
    mut cache: ResMut<ModelCache>,
    asset_server: Res<AssetServer>,
    model_query: Query<Entity, With<ViewerModel>>,
) {
    let wanted: Option<String> = selected
        .0
        .as_deref()
        .and_then(|id| registry.get(id))
        .and_then(|m| m.model_path.as_deref())
        .map(normalize_model_path);

    // Already targeting this model
    if state.path() == wanted.as_deref() {
        return;
    }

    // Remount: clear whatever the viewer was showing
    for entity in model_query.iter() {
        commands.entity(entity).despawn();
    }

    let Some(path) = wanted else {
        *state = ViewerState::Idle;
        return;
    };

    if let Some(scene) = cache.scenes.get(&path) {
        spawn_model(&mut commands, scene.clone());
        *state = ViewerState::Ready { path };
    } else if let Some(message) = cache.failed.get(&path) {
        *state = ViewerState::Failed {
            path,
            message: message.clone(),
        };
    } else {
        if !cache.loading.contains_key(&path) {
            tracing::info!("Starting to load model: {}", path);
            let handle: Handle<Gltf> = asset_server.load(path.clone());
            cache.loading.insert(path.clone(), handle);
        }
        *state = ViewerState::Loading { path };
    }
}

fn spawn_model(commands: &mut Commands, scene: Handle<Scene>) {
    commands.spawn((
        SceneRoot(scene),
        Transform::from_translation(VIEWER_ORIGIN),
        RenderLayers::layer(VIEWER_LAYER),
        ViewerModel,
    ));
}

/// Check loading state and extract scenes from loaded GLTFs.
/// This is the viewer's fault boundary: a failed load is recorded and
/// surfaced as a message in the region, never propagated further.
fn poll_model_loads(
    mut commands: Commands,
    mut cache: ResMut<ModelCache>,
    mut state: ResMut<ViewerState>,
    asset_server: Res<AssetServer>,
    gltf_assets: Res<Assets<Gltf>>,
) {
    let loading_keys: Vec<String> = cache.loading.keys().cloned().collect();
    for key in loading_keys {
        let Some(handle) = cache.loading.get(&key) else {
            continue;
        };

        match asset_server.get_load_state(handle.id()) {
            Some(LoadState::Loaded) => {
                let scene_handle = gltf_assets.get(handle).and_then(|gltf| {
                    gltf.default_scene
                        .clone()
                        .or_else(|| gltf.scenes.first().cloned())
                });

                cache.loading.remove(&key);
                match scene_handle {
                    Some(scene) => {
                        tracing::info!("Model loaded: {}", key);
                        cache.scenes.insert(key.clone(), scene.clone());
                        if state.path() == Some(key.as_str()) {
                            spawn_model(&mut commands, scene);
                            *state = ViewerState::Ready { path: key };
                        }
                    }
                    None => {
                        let message = "Model file contains no scenes".to_string();
                        tracing::error!("Failed to load model {}: {}", key, message);
                        cache.failed.insert(key.clone(), message.clone());
                        if state.path() == Some(key.as_str()) {
                            *state = ViewerState::Failed { path: key, message };
                        }
                    }
                }
            }
            Some(LoadState::Failed(err)) => {
                let message = err.to_string();
                tracing::error!("Failed to load model {}: {}", key, message);
                cache.loading.remove(&key);
                cache.failed.insert(key.clone(), message.clone());
                if state.path() == Some(key.as_str()) {
                    *state = ViewerState::Failed { path: key, message };
                }
            }
            _ => {
                // Still loading
            }
        }
    }
}

/// glTF scenes spawn without render layers, which would leak them into the
/// map camera. Keep every descendant of the model root on the viewer layer.
fn apply_viewer_layers(
    mut commands: Commands,
    model_query: Query<Entity, With<ViewerModel>>,
    children_query: Query<&Children>,
) {
    for root in model_query.iter() {
        for child in children_query.iter_descendants(root) {
            commands
                .entity(child)
                .insert(RenderLayers::layer(VIEWER_LAYER));
        }
    }
}

/// Show the gray placeholder box exactly while a load is pending
fn update_placeholder(
    state: Res<ViewerState>,
    mut placeholder_query: Query<&mut Visibility, With<PlaceholderCube>>,
) {
    if !state.is_changed() {
        return;
    }
    let visibility = if matches!(*state, ViewerState::Loading { .. }) {
        Visibility::Visible
    } else {
        Visibility::Hidden
    };
    for mut vis in placeholder_query.iter_mut() {
        *vis = visibility;
    }
}

/// Drive the viewer camera: viewport rect from the UI, orbit from drags
fn update_viewer_camera(
    state: Res<ViewerState>,
    region: Res<ViewerRegion>,
    mut input: ResMut<ViewerInput>,
    mut settings: ResMut<ViewerCameraSettings>,
    windows: Query<&Window>,
    mut camera_query: Query<(&mut Camera, &mut Transform), With<ViewerCamera>>,
) {
    let Ok((mut camera, mut transform)) = camera_query.single_mut() else {
        return;
    };

    // Apply accumulated orbit input
    let drained = std::mem::take(&mut *input);
    settings.azimuth -= drained.orbit_delta.x * settings.sensitivity;
    settings.elevation =
        (settings.elevation + drained.orbit_delta.y * settings.sensitivity).clamp(-1.4, 1.4);
    if drained.zoom_delta != 0.0 {
        let zoom_factor = 1.0 - drained.zoom_delta * 0.002;
        settings.distance = (settings.distance * zoom_factor).clamp(0.5, 50.0);
    }

    // The camera only draws while the panel shows a live viewer region
    let active = region.rect.is_some() && state.is_active();
    camera.is_active = active;

    if let Some(rect) = region.rect {
        // Clamp to the window so a resize can't push the viewport out of bounds
        let Ok(window) = windows.single() else { return };
        let window_size = UVec2::new(window.physical_width(), window.physical_height());
        let min = rect.min.min(window_size);
        let max = rect.max.min(window_size);
        let size = max.saturating_sub(min);
        if size.x == 0 || size.y == 0 {
            camera.is_active = false;
        } else {
            camera.viewport = Some(Viewport {
                physical_position: min,
                physical_size: size,
                ..default()
            });
        }
    }

    // Spherical orbit around the viewer origin (Z up)
    let x = settings.distance * settings.azimuth.cos() * settings.elevation.cos();
    let y = settings.distance * settings.azimuth.sin() * settings.elevation.cos();
    let z = settings.distance * settings.elevation.sin();
    transform.translation = VIEWER_ORIGIN + Vec3::new(x, y, z);
    transform.look_at(VIEWER_ORIGIN, Vec3::Z);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_model_path() {
        assert_eq!(
            normalize_model_path("https://cdn.example.org/m.glb"),
            "https://cdn.example.org/m.glb"
        );
        assert_eq!(normalize_model_path("/models/dom.glb"), "models/dom.glb");
        assert_eq!(normalize_model_path("dom.glb"), "models/dom.glb");
        assert_eq!(normalize_model_path("models/dom.glb"), "models/dom.glb");
    }

    #[test]
    fn test_viewer_state_accessors() {
        assert_eq!(ViewerState::Idle.path(), None);
        assert!(!ViewerState::Idle.is_active());

        let failed = ViewerState::Failed {
            path: "models/dom.glb".to_string(),
            message: "HTTP 404".to_string(),
        };
        assert_eq!(failed.path(), Some("models/dom.glb"));
        assert_eq!(failed.failure_message(), Some("HTTP 404"));
        assert!(failed.is_active());
    }
}
