//! Hotspot placement and 3D markers
//!
//! A primary click on the model is turned into a [`PointerClick`] and handed
//! to [`resolve_click`]. Annotate clicks stop propagating and open the label
//! prompt; everything else is left to the orbit camera. Markers are small
//! unlit spheres kept in sync with the session's hotspot list, highlighted
//! while the pointer is over them.

use bevy::prelude::*;
use bevy_picking::events::{Click, Out, Over, Pointer};
use bevy_picking::pointer::PointerButton;
use bevy_picking::Pickable;
use pinpoint_core::{resolve_click, ClickIntent, HotspotId, LabelPrompt, ModifierKey, PointerClick};
use std::collections::HashMap;

use crate::app::ViewerSettings;
use crate::models::ViewerSession;

pub struct HotspotsPlugin;

impl Plugin for HotspotsPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<HotspotPrompt>()
            .init_resource::<HoveredHotspot>()
            .add_systems(Startup, setup_marker_assets)
            .add_systems(Update, (
                drop_stale_prompt,
                sync_hotspot_markers,
                update_marker_highlight,
            ).chain());
    }
}

/// The open label prompt, if any
#[derive(Resource, Default)]
pub struct HotspotPrompt {
    pub prompt: LabelPrompt,
    /// Set when the prompt opens so the text field grabs keyboard focus once
    pub focus_requested: bool,
}

impl HotspotPrompt {
    pub fn is_open(&self) -> bool {
        self.prompt.is_open()
    }
}

/// Marker under the pointer (transient, not session state)
#[derive(Resource, Default)]
pub struct HoveredHotspot(pub Option<HotspotId>);

impl HoveredHotspot {
    fn enter(&mut self, id: &HotspotId) {
        self.0 = Some(id.clone());
    }

    /// Only the marker that is currently hovered can clear the highlight
    fn leave(&mut self, id: &HotspotId) {
        if self.0.as_ref() == Some(id) {
            self.0 = None;
        }
    }
}

#[derive(Component)]
pub struct HotspotMarker {
    pub id: HotspotId,
}

#[derive(Resource)]
struct MarkerAssets {
    mesh: Handle<Mesh>,
    normal: Handle<StandardMaterial>,
    hovered: Handle<StandardMaterial>,
}

const HOVER_SCALE: f32 = 1.6;

/// Whether the configured modifier is currently held (either side)
pub fn modifier_pressed(keyboard: &ButtonInput<KeyCode>, modifier: ModifierKey) -> bool {
    let keys = match modifier {
        ModifierKey::Shift => [KeyCode::ShiftLeft, KeyCode::ShiftRight],
        ModifierKey::Control => [KeyCode::ControlLeft, KeyCode::ControlRight],
        ModifierKey::Alt => [KeyCode::AltLeft, KeyCode::AltRight],
    };
    keyboard.any_pressed(keys)
}

/// Click observer attached to the model's scene root
pub fn on_model_click(
    mut click: On<Pointer<Click>>,
    keyboard: Res<ButtonInput<KeyCode>>,
    settings: Res<ViewerSettings>,
    session: Res<ViewerSession>,
    mut prompt: ResMut<HotspotPrompt>,
) {
    if click.event().button != PointerButton::Primary {
        return;
    }

    let pointer_click = PointerClick {
        modifier_held: modifier_pressed(&keyboard, settings.interaction.modifier),
        hit: click.event().hit.position.map(|p| p.to_array()),
    };

    match resolve_click(&pointer_click) {
        ClickIntent::Navigate => {}
        ClickIntent::Annotate { point } => {
            click.propagate(false);
            if prompt.prompt.open(point, session.generation()) {
                tracing::debug!("Prompting for hotspot label at {:?}", point);
                prompt.focus_requested = true;
            }
        }
    }
}

fn on_marker_over(
    over: On<Pointer<Over>>,
    markers: Query<&HotspotMarker>,
    mut hovered: ResMut<HoveredHotspot>,
) {
    if let Ok(marker) = markers.get(over.event().event_target()) {
        hovered.enter(&marker.id);
    }
}

fn on_marker_out(
    out: On<Pointer<Out>>,
    markers: Query<&HotspotMarker>,
    mut hovered: ResMut<HoveredHotspot>,
) {
    if let Ok(marker) = markers.get(out.event().event_target()) {
        hovered.leave(&marker.id);
    }
}

fn setup_marker_assets(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    settings: Res<ViewerSettings>,
) {
    commands.insert_resource(MarkerAssets {
        mesh: meshes.add(Sphere::new(settings.markers.radius)),
        normal: materials.add(StandardMaterial {
            base_color: Color::srgb(1.0, 0.35, 0.2),
            unlit: true,
            ..default()
        }),
        hovered: materials.add(StandardMaterial {
            base_color: Color::srgb(1.0, 0.85, 0.3),
            emissive: LinearRgba::rgb(2.0, 1.6, 0.4),
            unlit: true,
            ..default()
        }),
    });
}

/// A prompt opened on a model that has since been replaced can never commit
fn drop_stale_prompt(
    session: Res<ViewerSession>,
    mut prompt: ResMut<HotspotPrompt>,
    mut last_generation: Local<u64>,
) {
    if session.generation() == *last_generation {
        return;
    }
    *last_generation = session.generation();
    if prompt.is_open() {
        tracing::debug!("Closing label prompt: model changed");
        prompt.prompt.cancel();
        prompt.focus_requested = false;
    }
}

/// Spawn and despawn marker entities to match the session
fn sync_hotspot_markers(
    mut commands: Commands,
    session: Res<ViewerSession>,
    assets: Res<MarkerAssets>,
    markers: Query<(Entity, &HotspotMarker)>,
    mut hovered: ResMut<HoveredHotspot>,
) {
    let mut existing: HashMap<HotspotId, Entity> = markers
        .iter()
        .map(|(entity, marker)| (marker.id.clone(), entity))
        .collect();

    for hotspot in session.hotspots() {
        if existing.remove(&hotspot.id).is_some() {
            continue;
        }
        commands.spawn((
            Name::new(format!("Hotspot {}", hotspot.label)),
            Mesh3d(assets.mesh.clone()),
            MeshMaterial3d(assets.normal.clone()),
            Transform::from_translation(Vec3::from_array(hotspot.position)),
            HotspotMarker { id: hotspot.id.clone() },
            // Hoverable, but clicks still reach the model underneath
            Pickable {
                should_block_lower: false,
                is_hoverable: true,
            },
        ))
        .observe(on_marker_over)
        .observe(on_marker_out);
    }

    // Whatever is left no longer has a hotspot
    for (id, entity) in existing {
        hovered.leave(&id);
        commands.entity(entity).despawn();
    }
}

fn update_marker_highlight(
    hovered: Res<HoveredHotspot>,
    assets: Res<MarkerAssets>,
    mut markers: Query<(&HotspotMarker, &mut Transform, &mut MeshMaterial3d<StandardMaterial>)>,
) {
    for (marker, mut transform, mut material) in markers.iter_mut() {
        let is_hovered = hovered.0.as_ref() == Some(&marker.id);
        let (scale, handle) = if is_hovered {
            (Vec3::splat(HOVER_SCALE), &assets.hovered)
        } else {
            (Vec3::ONE, &assets.normal)
        };
        if transform.scale != scale {
            transform.scale = scale;
        }
        if material.0 != *handle {
            material.0 = handle.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_pressed_either_side() {
        let mut keyboard = ButtonInput::<KeyCode>::default();
        assert!(!modifier_pressed(&keyboard, ModifierKey::Shift));

        keyboard.press(KeyCode::ShiftRight);
        assert!(modifier_pressed(&keyboard, ModifierKey::Shift));
        assert!(!modifier_pressed(&keyboard, ModifierKey::Control));
    }

    #[test]
    fn test_modifier_pressed_alt() {
        let mut keyboard = ButtonInput::<KeyCode>::default();
        keyboard.press(KeyCode::AltLeft);
        assert!(modifier_pressed(&keyboard, ModifierKey::Alt));
        assert!(!modifier_pressed(&keyboard, ModifierKey::Shift));
    }

    #[test]
    fn test_hover_follows_marker_enter_and_leave() {
        let a = HotspotId::generate();
        let b = HotspotId::generate();
        let mut hovered = HoveredHotspot::default();

        hovered.enter(&a);
        assert_eq!(hovered.0.as_ref(), Some(&a));

        // Pointer moves straight from a onto b: Over(b) can arrive before Out(a)
        hovered.enter(&b);
        hovered.leave(&a);
        assert_eq!(hovered.0.as_ref(), Some(&b));

        hovered.leave(&b);
        assert!(hovered.0.is_none());
    }
}
