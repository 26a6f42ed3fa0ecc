//! Camera, lights and ground grid

use bevy::input::mouse::{MouseMotion, MouseWheel};
use bevy::prelude::*;
use bevy_picking::Pickable;
use pinpoint_core::config::{CameraConfig, GridConfig};

use crate::app::ViewerSettings;
use crate::hotspots::{modifier_pressed, HotspotPrompt};
use crate::models::ViewerSession;

pub struct ScenePlugin;

impl Plugin for ScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_scene)
            .add_systems(Update, (
                reset_camera_on_new_model,
                update_camera,
                update_grid_visibility,
            ).chain());
    }
}

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

#[derive(Component)]
pub struct GridLine;

/// Orbit camera state, Y-up spherical coordinates around `target`
#[derive(Debug, Clone, Resource)]
pub struct CameraSettings {
    pub distance: f32,
    pub target_distance: f32,
    pub azimuth: f32,
    pub elevation: f32,
    pub target: Vec3,
    pub target_focus: Vec3,
    pub sensitivity: f32,
    pub zoom_speed: f32,
    pub smooth_factor: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    initial_distance: f32,
}

const INITIAL_AZIMUTH: f32 = 0.8;
const INITIAL_ELEVATION: f32 = 0.5;
const MAX_ELEVATION: f32 = 1.5;

impl CameraSettings {
    pub fn from_config(config: &CameraConfig) -> Self {
        let initial_distance = config.clamp_distance(config.initial_distance);
        Self {
            distance: initial_distance,
            target_distance: initial_distance,
            azimuth: INITIAL_AZIMUTH,
            elevation: INITIAL_ELEVATION,
            target: Vec3::ZERO,
            target_focus: Vec3::ZERO,
            sensitivity: config.sensitivity,
            zoom_speed: config.zoom_speed,
            smooth_factor: config.smooth_factor,
            min_distance: config.min_distance,
            max_distance: config.max_distance,
            initial_distance,
        }
    }

    /// Back to the starting view around the origin
    pub fn reset(&mut self) {
        self.target_distance = self.initial_distance;
        self.azimuth = INITIAL_AZIMUTH;
        self.elevation = INITIAL_ELEVATION;
        self.target_focus = Vec3::ZERO;
    }

    /// Smoothly re-centre the orbit on a world point
    pub fn focus_on(&mut self, point: Vec3) {
        self.target_focus = point;
    }
}

/// Camera position relative to its target
pub fn orbit_offset(distance: f32, azimuth: f32, elevation: f32) -> Vec3 {
    Vec3::new(
        distance * azimuth.sin() * elevation.cos(),
        distance * elevation.sin(),
        distance * azimuth.cos() * elevation.cos(),
    )
}

/// Scale a distance by one scroll step and keep it within bounds
pub fn apply_zoom(distance: f32, scroll: f32, zoom_speed: f32, min: f32, max: f32) -> f32 {
    let zoom_factor = 1.0 - scroll * zoom_speed;
    (distance * zoom_factor.max(0.1)).clamp(min, max)
}

fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    settings: Res<ViewerSettings>,
) {
    let camera = CameraSettings::from_config(&settings.camera);

    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            near: 0.01,
            far: 1000.0,
            ..default()
        }),
        Transform::from_translation(orbit_offset(camera.distance, camera.azimuth, camera.elevation))
            .looking_at(Vec3::ZERO, Vec3::Y),
        MainCamera,
    ));
    commands.insert_resource(camera);

    commands.insert_resource(AmbientLight {
        color: Color::srgb(0.9, 0.95, 1.0),
        brightness: 400.0,
        ..default()
    });

    commands.spawn((
        DirectionalLight {
            illuminance: 5000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(4.0, 8.0, 2.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        PointLight {
            intensity: 200000.0,
            shadows_enabled: false,
            color: Color::srgb(1.0, 0.95, 0.9),
            ..default()
        },
        Transform::from_xyz(-3.0, 4.0, -3.0),
    ));

    spawn_grid(&mut commands, &mut meshes, &mut materials, &settings.grid);
}

/// Ground grid on the X-Z plane, hidden until a model is loaded
fn spawn_grid(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    grid: &GridConfig,
) {
    let half_lines = grid.half_lines as i32;
    let extent = grid.half_lines as f32 * grid.spacing;
    let thickness = grid.spacing * 0.01;

    let line_material = materials.add(StandardMaterial {
        base_color: Color::srgba(0.4, 0.4, 0.4, 0.6),
        unlit: true,
        alpha_mode: AlphaMode::Blend,
        ..default()
    });

    let line_mesh_x = meshes.add(Cuboid::new(extent * 2.0, thickness, thickness));
    let line_mesh_z = meshes.add(Cuboid::new(thickness, thickness, extent * 2.0));

    for i in -half_lines..=half_lines {
        let offset = i as f32 * grid.spacing;
        commands.spawn((
            Mesh3d(line_mesh_x.clone()),
            MeshMaterial3d(line_material.clone()),
            Transform::from_translation(Vec3::new(0.0, 0.0, offset)),
            GridLine,
            Pickable::IGNORE,
            Visibility::Hidden,
        ));
        commands.spawn((
            Mesh3d(line_mesh_z.clone()),
            MeshMaterial3d(line_material.clone()),
            Transform::from_translation(Vec3::new(offset, 0.0, 0.0)),
            GridLine,
            Pickable::IGNORE,
            Visibility::Hidden,
        ));
    }
}

fn reset_camera_on_new_model(
    session: Res<ViewerSession>,
    mut settings: ResMut<CameraSettings>,
    mut last_generation: Local<u64>,
) {
    if session.generation() != *last_generation {
        *last_generation = session.generation();
        settings.reset();
    }
}

fn update_camera(
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
    mut settings: ResMut<CameraSettings>,
    mut mouse_motion: MessageReader<MouseMotion>,
    mut mouse_wheel: MessageReader<MouseWheel>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    keyboard: Res<ButtonInput<KeyCode>>,
    touch_input: Res<Touches>,
    time: Res<Time>,
    viewer: Res<ViewerSettings>,
    prompt: Res<HotspotPrompt>,
    mut contexts: bevy_egui::EguiContexts,
) {
    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input() || ctx.is_pointer_over_area())
        .unwrap_or(false);
    // Modifier clicks belong to hotspot placement
    let suspended = egui_wants_pointer
        || prompt.is_open()
        || modifier_pressed(&keyboard, viewer.interaction.modifier);

    let total_motion: Vec2 = mouse_motion.read().map(|motion| motion.delta).sum();
    let total_scroll: f32 = mouse_wheel.read().map(|scroll| scroll.y.signum()).sum();

    if !suspended {
        // Orbit with left mouse drag
        if mouse_button.pressed(MouseButton::Left) {
            settings.azimuth -= total_motion.x * settings.sensitivity;
            settings.elevation = (settings.elevation + total_motion.y * settings.sensitivity)
                .clamp(-MAX_ELEVATION, MAX_ELEVATION);
        }

        // Pan with right mouse drag in the view plane
        if mouse_button.pressed(MouseButton::Right) {
            if let Ok(transform) = camera_query.single() {
                let right = transform.right();
                let up = transform.up();
                let pan_speed = settings.distance * 0.002;
                settings.target_focus -= right * total_motion.x * pan_speed;
                settings.target_focus += up * total_motion.y * pan_speed;
            }
        }

        if total_scroll != 0.0 {
            settings.target_distance = apply_zoom(
                settings.target_distance,
                total_scroll,
                settings.zoom_speed,
                settings.min_distance,
                settings.max_distance,
            );
        }

        // Touch: one finger orbits, two fingers pinch-zoom
        let touches: Vec<_> = touch_input.iter().collect();
        match touches.as_slice() {
            [touch] => {
                let delta = touch.delta();
                settings.azimuth -= delta.x * settings.sensitivity;
                settings.elevation = (settings.elevation + delta.y * settings.sensitivity)
                    .clamp(-MAX_ELEVATION, MAX_ELEVATION);
            }
            [t1, t2] => {
                let curr_dist = t1.position().distance(t2.position());
                let prev_dist = (t1.position() - t1.delta()).distance(t2.position() - t2.delta());
                let zoom_factor = prev_dist / curr_dist.max(1.0);
                settings.target_distance = (settings.target_distance * zoom_factor)
                    .clamp(settings.min_distance, settings.max_distance);
            }
            _ => {}
        }
    }

    // Smooth interpolation for zoom and target
    let dt = time.delta_secs();
    let lerp_factor = 1.0 - (-settings.smooth_factor * 60.0 * dt).exp();
    settings.distance += (settings.target_distance - settings.distance) * lerp_factor;
    let target = settings.target + (settings.target_focus - settings.target) * lerp_factor;
    settings.target = target;

    if let Ok(mut transform) = camera_query.single_mut() {
        transform.translation =
            settings.target + orbit_offset(settings.distance, settings.azimuth, settings.elevation);
        transform.look_at(settings.target, Vec3::Y);
    }
}

fn update_grid_visibility(
    session: Res<ViewerSession>,
    mut grid_query: Query<&mut Visibility, With<GridLine>>,
) {
    let wanted = if session.model().is_some() {
        Visibility::Visible
    } else {
        Visibility::Hidden
    };

    for mut visibility in grid_query.iter_mut() {
        if *visibility != wanted {
            *visibility = wanted;
        }
    }
}
