//! Model resources: in-memory asset storage, glTF loading and the scene root

use bevy::asset::io::memory::Dir;
use bevy::asset::LoadState;
use bevy::gltf::Gltf;
use bevy::prelude::*;
use pinpoint_core::{ModelStore, Session, MODEL_EXTENSION};
use std::path::PathBuf;

use crate::hotspots::on_model_click;

/// Asset source name for imported model bytes
pub const MEMORY_SOURCE: &str = "memory";

/// Plugin for model loading
pub struct ModelsPlugin {
    /// Directory backing the `memory://` asset source
    pub dir: Dir,
}

impl Plugin for ModelsPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(ModelsDir(self.dir.clone()))
            .add_systems(PreStartup, init_session)
            .add_systems(Update, (track_model_load, sync_model_entity).chain());
    }
}

#[derive(Resource)]
struct ModelsDir(Dir);

/// A model's bytes in the memory directory and the glTF loaded from them
#[derive(Debug)]
pub struct ModelAsset {
    pub path: PathBuf,
    pub gltf: Handle<Gltf>,
}

/// [`ModelStore`] backed by Bevy's in-memory asset source
pub struct GltfStore {
    dir: Dir,
    asset_server: AssetServer,
    next_id: u64,
}

impl GltfStore {
    pub fn new(dir: Dir, asset_server: AssetServer) -> Self {
        Self {
            dir,
            asset_server,
            next_id: 0,
        }
    }
}

impl ModelStore for GltfStore {
    type Handle = ModelAsset;

    fn insert(&mut self, name: &str, bytes: Vec<u8>) -> ModelAsset {
        self.next_id += 1;
        // Unique path per import so the asset server never serves a stale cache entry
        let path = PathBuf::from(format!("model-{}.{}", self.next_id, MODEL_EXTENSION));
        self.dir.insert_asset(&path, bytes);
        tracing::debug!("Stored {} as {}://{}", name, MEMORY_SOURCE, path.display());

        let gltf = self
            .asset_server
            .load(format!("{}://{}", MEMORY_SOURCE, path.display()));
        ModelAsset { path, gltf }
    }

    fn release(&mut self, handle: ModelAsset) {
        if self.dir.remove_asset(&handle.path).is_none() {
            tracing::warn!("Model file {} was already gone", handle.path.display());
        }
        // Dropping the strong handle lets the asset server free the glTF
        drop(handle.gltf);
    }
}

/// The viewer's session state
#[derive(Resource, Deref, DerefMut)]
pub struct ViewerSession(pub Session<GltfStore>);

/// Root entity of the current model's scene
#[derive(Component)]
pub struct ModelRoot {
    pub generation: u64,
}

fn init_session(mut commands: Commands, dir: Res<ModelsDir>, asset_server: Res<AssetServer>) {
    let store = GltfStore::new(dir.0.clone(), asset_server.clone());
    commands.insert_resource(ViewerSession(Session::new(store)));
}

/// Report the pending model's load outcome back to the session
fn track_model_load(
    mut session: ResMut<ViewerSession>,
    asset_server: Res<AssetServer>,
    gltf_assets: Res<Assets<Gltf>>,
) {
    let Some(pending) = session.pending() else {
        return;
    };
    let handle = pending.handle.gltf.clone();

    match asset_server.get_load_state(handle.id()) {
        Some(LoadState::Loaded) => {
            let has_scene = gltf_assets
                .get(&handle)
                .is_some_and(|gltf| gltf.default_scene.is_some() || !gltf.scenes.is_empty());
            if has_scene {
                session.confirm_loaded();
            } else {
                session.fail_loading("file contains no scenes");
            }
        }
        Some(LoadState::Failed(err)) => {
            session.fail_loading(err.to_string());
        }
        _ => {
            // Still loading
        }
    }
}

/// Keep exactly one scene root, matching the current model
fn sync_model_entity(
    mut commands: Commands,
    session: Res<ViewerSession>,
    gltf_assets: Res<Assets<Gltf>>,
    roots: Query<(Entity, &ModelRoot)>,
) {
    let generation = session.generation();
    let current = session.model();

    let mut present = false;
    for (entity, root) in roots.iter() {
        if current.is_some() && root.generation == generation {
            present = true;
        } else {
            commands.entity(entity).despawn();
        }
    }

    if present {
        return;
    }
    let Some(model) = current else {
        return;
    };
    let Some(gltf) = gltf_assets.get(&model.handle.gltf) else {
        return;
    };
    let Some(scene) = gltf.default_scene.clone().or_else(|| gltf.scenes.first().cloned()) else {
        return;
    };

    tracing::info!("Spawning scene for {}", model.name);
    commands
        .spawn((
            Name::new(model.name.clone()),
            SceneRoot(scene),
            Transform::IDENTITY,
            ModelRoot { generation },
        ))
        .observe(on_model_click);
}
