//! Monument markers on the basemap

use bevy::prelude::*;
use std::collections::{HashMap, HashSet};

use crate::app::{CameraSettings, HoveredMonument, MapView, MonumentRegistry, SelectedMonument};
use crate::map::MainCamera;

/// Pin dimensions in world units (Mercator pixels at the map zoom)
const PIN_HEIGHT: f32 = 16.0;
const PIN_RADIUS: f32 = 4.0;
const HEAD_RADIUS: f32 = 5.5;
/// Picking radius around the pin head
const HIT_RADIUS: f32 = 14.0;

pub struct MarkersPlugin;

impl Plugin for MarkersPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_marker_assets).add_systems(
            Update,
            (
                sync_marker_entities,
                hover_markers,
                select_markers,
                handle_deselection,
            ),
        );
    }
}

/// Marker component tying a pin entity to its monument record
#[derive(Component)]
pub struct MarkerEntity {
    pub monument_id: String,
}

/// Shared meshes and material for all pins
#[derive(Resource)]
pub struct MarkerAssets {
    shaft: Handle<Mesh>,
    head: Handle<Mesh>,
    material: Handle<StandardMaterial>,
}

fn setup_marker_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    commands.insert_resource(MarkerAssets {
        shaft: meshes.add(Cone::new(PIN_RADIUS, PIN_HEIGHT)),
        head: meshes.add(Sphere::new(HEAD_RADIUS)),
        material: materials.add(StandardMaterial {
            base_color: Color::srgb(0.82, 0.18, 0.18),
            metallic: 0.1,
            perceptual_roughness: 0.6,
            ..default()
        }),
    });
}

/// Sync pin entities with the registry, keyed by monument id.
/// Only map-eligible monuments get a pin; everything else is skipped.
fn sync_marker_entities(
    mut commands: Commands,
    registry: Res<MonumentRegistry>,
    map_view: Res<MapView>,
    assets: Res<MarkerAssets>,
    existing_markers: Query<(Entity, &MarkerEntity)>,
) {
    if !registry.is_changed() {
        return;
    }

    // Collect existing marker IDs
    let existing_ids: HashMap<String, Entity> = existing_markers
        .iter()
        .map(|(e, m)| (m.monument_id.clone(), e))
        .collect();

    // IDs that should have a pin
    let eligible_ids: HashSet<&str> = registry
        .monuments
        .iter()
        .filter(|m| m.is_map_eligible())
        .map(|m| m.id.as_str())
        .collect();

    // Remove markers whose monument is gone or no longer eligible
    for (id, entity) in &existing_ids {
        if !eligible_ids.contains(id.as_str()) {
            commands.entity(*entity).despawn();
        }
    }

    // Spawn pins for new monuments
    for monument in &registry.monuments {
        let Some(pos) = monument.position() else {
            continue;
        };
        if existing_ids.contains_key(monument.id.as_str()) {
            continue;
        }

        let (x, y) = map_view.frame.world_of(pos);
        let parent = commands
            .spawn((
                Transform::from_translation(Vec3::new(x, y, 0.0)),
                Visibility::default(),
                MarkerEntity {
                    monument_id: monument.id.as_str().to_string(),
                },
            ))
            .id();

        // Shaft: cone with the tip at the ground point
        let shaft = commands
            .spawn((
                Mesh3d(assets.shaft.clone()),
                MeshMaterial3d(assets.material.clone()),
                Transform::from_translation(Vec3::new(0.0, 0.0, PIN_HEIGHT / 2.0))
                    .with_rotation(Quat::from_rotation_x(-std::f32::consts::FRAC_PI_2)),
            ))
            .id();
        commands.entity(parent).add_child(shaft);

        // Head sphere on top
        let head = commands
            .spawn((
                Mesh3d(assets.head.clone()),
                MeshMaterial3d(assets.material.clone()),
                Transform::from_translation(Vec3::new(0.0, 0.0, PIN_HEIGHT)),
            ))
            .id();
        commands.entity(parent).add_child(head);
    }
}

/// Nearest pin along the cursor ray, within the hit radius
fn pick_marker(
    cursor: Vec2,
    camera: &Camera,
    camera_transform: &GlobalTransform,
    markers: &Query<(&MarkerEntity, &GlobalTransform)>,
) -> Option<(String, Vec3)> {
    let ray = camera.viewport_to_world(camera_transform, cursor).ok()?;

    let mut closest: Option<(f32, String, Vec3)> = None;
    for (marker, transform) in markers.iter() {
        // Aim at the pin head rather than the ground point
        let head = transform.translation() + Vec3::Z * PIN_HEIGHT;
        let to_head = head - ray.origin;
        let t = to_head.dot(*ray.direction);
        if t < 0.0 {
            continue;
        }

        let closest_point = ray.origin + *ray.direction * t;
        let distance_sq = (closest_point - head).length_squared();

        if distance_sq < HIT_RADIUS * HIT_RADIUS {
            let replace = match &closest {
                Some((best_t, _, _)) => t < *best_t,
                None => true,
            };
            if replace {
                closest = Some((t, marker.monument_id.clone(), transform.translation()));
            }
        }
    }

    closest.map(|(_, id, pos)| (id, pos))
}

/// Track the pin under the pointer for the hover popup.
/// Hover is purely visual and never touches the selection.
fn hover_markers(
    mut hovered: ResMut<HoveredMonument>,
    camera_query: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    markers: Query<(&MarkerEntity, &GlobalTransform)>,
    windows: Query<&Window>,
    mut contexts: bevy_egui::EguiContexts,
) {
    let Ok(ctx) = contexts.ctx_mut() else { return };
    if ctx.wants_pointer_input() {
        hovered.0 = None;
        return;
    }

    let Ok(window) = windows.single() else { return };
    let Ok((camera, camera_transform)) = camera_query.single() else {
        return;
    };

    hovered.0 = window
        .cursor_position()
        .and_then(|cursor| pick_marker(cursor, camera, camera_transform, &markers))
        .map(|(id, _)| id);
}

/// Handle monument selection via mouse click.
/// Clicking the already-selected pin is idempotent: the panel stays open.
fn select_markers(
    mut selected: ResMut<SelectedMonument>,
    mut camera_settings: ResMut<CameraSettings>,
    camera_query: Query<(&Camera, &GlobalTransform), With<MainCamera>>,
    markers: Query<(&MarkerEntity, &GlobalTransform)>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window>,
    mut contexts: bevy_egui::EguiContexts,
) {
    let Ok(ctx) = contexts.ctx_mut() else { return };
    if ctx.wants_pointer_input() {
        return;
    }

    if !mouse_button.just_pressed(MouseButton::Left) {
        return;
    }

    let Ok(window) = windows.single() else { return };
    let Some(cursor) = window.cursor_position() else {
        return;
    };
    let Ok((camera, camera_transform)) = camera_query.single() else {
        return;
    };

    if let Some((id, pos)) = pick_marker(cursor, camera, camera_transform, &markers) {
        selected.0 = Some(id);
        // Center camera on the selected pin
        camera_settings.target_focus = pos;
    }
}

/// Handle Escape key to deselect the current monument
fn handle_deselection(
    mut selected: ResMut<SelectedMonument>,
    keyboard: Res<ButtonInput<KeyCode>>,
) {
    if keyboard.just_pressed(KeyCode::Escape) {
        selected.0 = None;
    }
}
