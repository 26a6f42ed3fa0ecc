//! Pinpoint Viewer - glTF model viewer with hotspot annotations
//!
//! Import a `.glb` file, orbit around it, and shift-click the surface to pin
//! labeled hotspots. Everything lives in memory for the session.

mod app;
mod file_loader;
mod file_picker;
mod hotspots;
mod models;
mod scene;
mod ui;

use wasm_bindgen::prelude::*;

/// WASM entry point
#[wasm_bindgen(start)]
pub fn main() {
    // Set up panic hook for better error messages
    console_error_panic_hook::set_once();

    // Initialize logging with filtering to reduce wgpu noise
    tracing_wasm::set_as_global_default_with_config(
        tracing_wasm::WASMLayerConfigBuilder::new()
            .set_max_level(tracing::Level::WARN)
            .build()
    );

    app::run();
}
