//! Browser file picker for model imports
//!
//! Opens a native file dialog through a hidden `<input type="file">`, reads
//! the chosen file with a `FileReader` and queues the bytes for the next
//! frame. JS callbacks only ever touch the shared queue.

use bevy::prelude::*;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// File picker plugin
pub struct FilePickerPlugin;

impl Plugin for FilePickerPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<PendingFileResults>();
    }
}

/// File filter for the picker dialog
#[derive(Debug, Clone)]
pub struct FileFilter {
    /// Display name (e.g., "glTF Binary")
    pub name: String,
    /// File extensions without dots (e.g., ["glb"])
    pub extensions: Vec<String>,
}

impl FileFilter {
    pub fn for_extension(extension: &str) -> Self {
        let extension = extension.trim_start_matches('.').to_ascii_lowercase();
        Self {
            name: format!("{} Files", extension.to_ascii_uppercase()),
            extensions: vec![extension],
        }
    }

    /// Convert to accept string for HTML input element
    pub fn to_accept_string(&self) -> String {
        if self.extensions.is_empty() {
            "*".to_string()
        } else {
            self.extensions
                .iter()
                .map(|ext| format!(".{}", ext))
                .collect::<Vec<_>>()
                .join(",")
        }
    }
}

/// A file the user picked, or why it could not be read
#[derive(Debug, Clone)]
pub struct FilePickerResult {
    /// Filename (without path)
    pub filename: String,
    pub content: Result<Vec<u8>, String>,
}

/// Pending file results from JavaScript callbacks
#[derive(Resource, Default, Clone)]
pub struct PendingFileResults(pub Arc<Mutex<VecDeque<FilePickerResult>>>);

impl PendingFileResults {
    pub fn push(&self, result: FilePickerResult) {
        if let Ok(mut results) = self.0.lock() {
            results.push_back(result);
        }
    }

    /// Take everything that arrived since the last frame
    pub fn drain(&self) -> Vec<FilePickerResult> {
        match self.0.lock() {
            Ok(mut results) => results.drain(..).collect(),
            Err(_) => Vec::new(),
        }
    }
}

// ============================================================================
// JavaScript Interop (WASM only)
// ============================================================================

#[cfg(target_arch = "wasm32")]
mod js_interop {
    use super::*;
    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;
    use web_sys::HtmlInputElement;

    /// Open a file picker dialog using HTML input element
    pub fn open_file_picker(accept: &str, pending: PendingFileResults) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            tracing::error!("open_file_picker: no document object");
            return;
        };

        let input: HtmlInputElement = match document
            .create_element("input")
            .map(|el| el.dyn_into::<HtmlInputElement>())
        {
            Ok(Ok(input)) => input,
            Ok(Err(_)) => {
                tracing::error!("open_file_picker: failed to cast to HtmlInputElement");
                return;
            }
            Err(e) => {
                tracing::error!("open_file_picker: failed to create input element: {:?}", e);
                return;
            }
        };

        input.set_type("file");
        input.set_accept(accept);
        input.style().set_property("display", "none").ok();

        let Some(body) = document.body() else {
            tracing::error!("open_file_picker: no document body");
            return;
        };
        if let Err(e) = body.append_child(&input) {
            tracing::error!("open_file_picker: failed to append input to body: {:?}", e);
            return;
        }

        let input_clone = input.clone();
        let closure = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            if let Some(file) = input_clone.files().and_then(|files| files.get(0)) {
                read_file(file, pending.clone());
            }

            if let Some(parent) = input_clone.parent_node() {
                parent.remove_child(&input_clone).ok();
            }
        }) as Box<dyn FnMut(_)>);

        input.set_onchange(Some(closure.as_ref().unchecked_ref()));
        closure.forget();

        input.click();
    }

    fn read_file(file: web_sys::File, pending: PendingFileResults) {
        let filename = file.name();
        let reader = match web_sys::FileReader::new() {
            Ok(reader) => reader,
            Err(e) => {
                pending.push(FilePickerResult {
                    filename,
                    content: Err(format!("cannot read file: {:?}", e)),
                });
                return;
            }
        };
        let reader_clone = reader.clone();
        let onload_pending = pending.clone();
        let onload_name = filename.clone();

        let onload = Closure::wrap(Box::new(move |_: web_sys::Event| {
            let content = reader_clone
                .result()
                .ok()
                .and_then(|result| result.dyn_into::<js_sys::ArrayBuffer>().ok())
                .map(|buffer| js_sys::Uint8Array::new(&buffer).to_vec())
                .ok_or_else(|| "file reader returned no data".to_string());

            onload_pending.push(FilePickerResult {
                filename: onload_name.clone(),
                content,
            });
        }) as Box<dyn FnMut(_)>);

        let onerror_name = filename.clone();
        let onerror = Closure::wrap(Box::new(move |_: web_sys::Event| {
            pending.push(FilePickerResult {
                filename: onerror_name.clone(),
                content: Err("file could not be read".to_string()),
            });
        }) as Box<dyn FnMut(_)>);

        reader.set_onload(Some(onload.as_ref().unchecked_ref()));
        reader.set_onerror(Some(onerror.as_ref().unchecked_ref()));
        onload.forget();
        onerror.forget();

        if let Err(e) = reader.read_as_array_buffer(&file) {
            tracing::error!("Failed to start reading {}: {:?}", filename, e);
        }
    }
}

// Non-WASM stubs
#[cfg(not(target_arch = "wasm32"))]
mod js_interop {
    use super::*;

    pub fn open_file_picker(_accept: &str, pending: PendingFileResults) {
        pending.push(FilePickerResult {
            filename: String::new(),
            content: Err("File picker not supported on this platform".to_string()),
        });
    }
}

pub use js_interop::open_file_picker;

/// Helper to trigger file open from UI
pub fn trigger_file_open(pending: &PendingFileResults, filter: FileFilter) {
    let accept = filter.to_accept_string();
    tracing::debug!("Opening file picker for {} ({})", filter.name, accept);
    open_file_picker(&accept, pending.clone());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accept_string_for_extension() {
        assert_eq!(FileFilter::for_extension("glb").to_accept_string(), ".glb");
        assert_eq!(FileFilter::for_extension(".GLB").to_accept_string(), ".glb");
    }

    #[test]
    fn test_accept_string_without_extensions() {
        let filter = FileFilter {
            name: "All Files".to_string(),
            extensions: vec![],
        };
        assert_eq!(filter.to_accept_string(), "*");
    }

    #[test]
    fn test_pending_results_drain_in_order() {
        let pending = PendingFileResults::default();
        pending.push(FilePickerResult { filename: "a.glb".into(), content: Ok(vec![1]) });
        pending.push(FilePickerResult { filename: "b.glb".into(), content: Err("x".into()) });

        let drained = pending.drain();
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].filename, "a.glb");
        assert!(drained[1].content.is_err());
        assert!(pending.drain().is_empty());
    }
}
