//! Basemap tile layer and map camera

use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::prelude::*;

use monudash_core::{TileId, TILE_SIZE};

use crate::app::{CameraSettings, MapView};

pub struct MapPlugin;

impl Plugin for MapPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_map)
            .add_systems(Update, update_camera);
    }
}

/// Marker component for the map camera
#[derive(Component)]
pub struct MainCamera;

/// Marker component for basemap tile quads
#[derive(Component)]
pub struct MapTile {
    #[allow(dead_code)]
    pub id: TileId,
}

fn setup_map(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    asset_server: Res<AssetServer>,
    map_view: Res<MapView>,
) {
    // World space: X=East, Y=North, Z=Up; one unit = one Mercator pixel
    // at the map zoom level.
    commands.spawn((
        Camera3d { ..default() },
        Projection::Perspective(PerspectiveProjection {
            near: 1.0,
            far: 20000.0,
            ..default()
        }),
        Transform::from_xyz(0.0, -500.0, 500.0).looking_at(Vec3::ZERO, Vec3::Z),
        MainCamera,
    ));

    // Soft ambient so markers stay readable from every azimuth
    commands.insert_resource(AmbientLight {
        color: Color::srgb(0.9, 0.95, 1.0),
        brightness: 300.0,
        ..default()
    });

    // Directional light from above, like sunlight
    commands.spawn((
        DirectionalLight {
            illuminance: 5000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(1000.0, 1000.0, 2000.0).looking_at(Vec3::ZERO, Vec3::Z),
    ));

    // Basemap: fixed grid of OSM raster tiles around the configured center.
    // Each tile is an unlit textured quad on the ground plane; the texture
    // streams in through the asset server's https loading.
    let half = TILE_SIZE as f32 / 2.0;
    let tile_mesh = meshes.add(Plane3d::new(Vec3::Z, Vec2::splat(half)));

    for tile in map_view.frame.tiles_around(map_view.tile_radius) {
        let url = tile.url();
        tracing::debug!("Loading basemap tile: {}", url);
        let texture: Handle<Image> = asset_server.load(url);

        let (x, y) = map_view.frame.tile_world_center(tile);
        commands.spawn((
            Mesh3d(tile_mesh.clone()),
            MeshMaterial3d(materials.add(StandardMaterial {
                base_color_texture: Some(texture),
                unlit: true,
                ..default()
            })),
            Transform::from_translation(Vec3::new(x, y, 0.0)),
            MapTile { id: tile },
        ));
    }
}

fn update_camera(
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
    mut settings: ResMut<CameraSettings>,
    mut mouse_motion: EventReader<MouseMotion>,
    mut mouse_wheel: EventReader<MouseWheel>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    time: Res<Time>,
    mut contexts: bevy_egui::EguiContexts,
) {
    // Check if egui wants the mouse - if so, don't process camera controls
    let Ok(ctx) = contexts.ctx_mut() else { return };
    let egui_wants_pointer = ctx.wants_pointer_input();

    // Collect mouse motion delta
    let mut total_motion = Vec2::ZERO;
    for motion in mouse_motion.read() {
        total_motion += motion.delta;
    }

    // Orbit with left mouse drag (only when UI doesn't want pointer)
    if mouse_button.pressed(MouseButton::Left) && !egui_wants_pointer {
        settings.azimuth -= total_motion.x * settings.sensitivity;
        settings.elevation =
            (settings.elevation - total_motion.y * settings.sensitivity).clamp(0.25, 1.5);
    }

    // Pan with right mouse drag (ground plane X-Y)
    if mouse_button.pressed(MouseButton::Right) && !egui_wants_pointer {
        // Camera's right direction projected onto ground plane
        let right = Vec3::new(-settings.azimuth.sin(), settings.azimuth.cos(), 0.0);
        // Camera's forward direction projected onto ground plane
        let forward = Vec3::new(settings.azimuth.cos(), settings.azimuth.sin(), 0.0);
        let pan_speed = settings.distance * 0.002;
        // Mouse right -> move view right, Mouse up -> move view forward
        settings.target_focus -= right * total_motion.x * pan_speed;
        settings.target_focus += forward * total_motion.y * pan_speed;
    }

    // Zoom with scroll - smooth zoom using target_distance
    // Don't zoom if UI wants the pointer (scrolling in UI panels)
    if !egui_wants_pointer {
        for scroll in mouse_wheel.read() {
            let zoom_factor = 1.0 - scroll.y * settings.zoom_speed * 0.3;
            settings.target_distance = (settings.target_distance * zoom_factor).clamp(100.0, 3000.0);
        }
    } else {
        // Drain the scroll events even if we're not using them
        for _ in mouse_wheel.read() {}
    }

    // Smooth interpolation for zoom and target
    let dt = time.delta_secs();
    let lerp_factor = 1.0 - (-settings.smooth_factor * 60.0 * dt).exp();
    settings.distance =
        settings.distance + (settings.target_distance - settings.distance) * lerp_factor;
    settings.target = settings.target + (settings.target_focus - settings.target) * lerp_factor;

    // Update camera position (Z is up)
    if let Ok(mut transform) = camera_query.single_mut() {
        // Spherical coordinates with Z-up
        let x = settings.distance * settings.azimuth.cos() * settings.elevation.cos();
        let y = settings.distance * settings.azimuth.sin() * settings.elevation.cos();
        let z = settings.distance * settings.elevation.sin();

        transform.translation = settings.target + Vec3::new(x, y, z);
        transform.look_at(settings.target, Vec3::Z);
    }
}
