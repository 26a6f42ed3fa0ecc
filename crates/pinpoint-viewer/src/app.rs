//! Bevy application setup

use bevy::asset::io::memory::{Dir, MemoryAssetReader};
use bevy::asset::io::AssetSource;
use bevy::asset::AssetApp;
use bevy::prelude::*;
use bevy_egui::EguiPlugin;
use bevy_picking::{DefaultPickingPlugins, prelude::MeshPickingPlugin};
use pinpoint_core::config::QueryRequests;
use pinpoint_core::ViewerConfig;

use crate::file_loader::FileLoaderPlugin;
use crate::file_picker::FilePickerPlugin;
use crate::hotspots::HotspotsPlugin;
use crate::models::{ModelsPlugin, MEMORY_SOURCE};
use crate::scene::ScenePlugin;
use crate::ui::UiPlugin;

const BUILTIN_CONFIG: &str = include_str!("../pinpoint.toml");

/// URL parameters understood as settings overrides
#[cfg(target_arch = "wasm32")]
const QUERY_KEYS: [&str; 5] = ["model", "min_distance", "max_distance", "distance", "modifier"];

/// Viewer configuration, fixed after startup
#[derive(Debug, Clone, Resource, Default, Deref)]
pub struct ViewerSettings(pub ViewerConfig);

/// One-shot requests from the page URL
#[derive(Debug, Clone, Resource, Default)]
pub struct StartupRequests(pub QueryRequests);

/// Built-in TOML, then URL parameters on top
fn load_config() -> (ViewerConfig, QueryRequests) {
    let mut config = match ViewerConfig::from_toml_str(BUILTIN_CONFIG) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Built-in config rejected, using defaults: {}", e);
            ViewerConfig::default()
        }
    };

    let pairs = url_query_pairs();
    let requests = config.apply_query(pairs.iter().map(|(k, v)| (*k, v.as_str())));
    (config, requests)
}

#[cfg(target_arch = "wasm32")]
fn url_query_pairs() -> Vec<(&'static str, String)> {
    let Some(window) = web_sys::window() else {
        return Vec::new();
    };
    let Ok(href) = window.location().href() else {
        return Vec::new();
    };
    let Ok(url) = web_sys::Url::new(&href) else {
        return Vec::new();
    };

    let params = url.search_params();
    QUERY_KEYS
        .iter()
        .filter_map(|key| params.get(key).map(|value| (*key, value)))
        .collect()
}

#[cfg(not(target_arch = "wasm32"))]
fn url_query_pairs() -> Vec<(&'static str, String)> {
    Vec::new()
}

/// Run the Bevy application
pub fn run() {
    let (config, requests) = load_config();

    // Imported bytes live here until their model is released
    let models_dir = Dir::default();
    let reader_dir = models_dir.clone();

    App::new()
        // Must be registered before AssetPlugin is built
        .register_asset_source(
            MEMORY_SOURCE,
            AssetSource::build().with_reader(move || {
                Box::new(MemoryAssetReader {
                    root: reader_dir.clone(),
                })
            }),
        )
        .insert_resource(ClearColor(Color::srgb(0.1, 0.1, 0.15)))
        .add_plugins(DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Pinpoint".to_string(),
                    canvas: Some("#viewer-canvas".to_string()),
                    fit_canvas_to_parent: true,
                    prevent_default_event_handling: true,
                    ..default()
                }),
                ..default()
            })
            .set(AssetPlugin {
                // In-memory models have no .meta files
                meta_check: bevy::asset::AssetMetaCheck::Never,
                ..default()
            })
        )
        // Picking plugins must come before EguiPlugin so it can detect PickingPlugin
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(MeshPickingPlugin)
        .add_plugins(EguiPlugin::default())
        .insert_resource(ViewerSettings(config))
        .insert_resource(StartupRequests(requests))
        .add_plugins(FilePickerPlugin)
        .add_plugins(ModelsPlugin { dir: models_dir })
        .add_plugins(FileLoaderPlugin)
        .add_plugins(ScenePlugin)
        .add_plugins(HotspotsPlugin)
        .add_plugins(UiPlugin)
        .run();
}
