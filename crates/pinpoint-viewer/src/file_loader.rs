//! Model bytes from a URL parameter or a picked file into the session

use bevy::prelude::*;
use pinpoint_core::SessionError;
use std::sync::{Arc, Mutex};

use crate::app::StartupRequests;
use crate::file_picker::PendingFileResults;
use crate::models::ViewerSession;

/// Plugin for model imports
pub struct FileLoaderPlugin;

impl Plugin for FileLoaderPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<UrlImport>()
            .add_systems(Startup, check_url_parameter)
            .add_systems(Update, process_pending_loads);
    }
}

/// Completed fetch: source URL and the downloaded bytes
type FetchResult = (String, anyhow::Result<Vec<u8>>);

/// In-flight `?model=` download
#[derive(Resource, Default)]
pub struct UrlImport {
    /// True from request until the response is handed to the session
    pub loading: bool,
    pub url: Option<String>,
    pending_result: Arc<Mutex<Option<FetchResult>>>,
}

/// Last path segment of a URL, without query or fragment
pub fn filename_from_url(url: &str) -> String {
    let without_suffix = url
        .split(['?', '#'])
        .next()
        .unwrap_or(url)
        .trim_end_matches('/');
    without_suffix
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .unwrap_or(without_suffix)
        .to_string()
}

/// Start fetching `?model=` on startup
fn check_url_parameter(requests: Res<StartupRequests>, mut import: ResMut<UrlImport>) {
    let Some(model_url) = requests.0.model_url.clone() else {
        return;
    };

    tracing::info!("Loading model from URL parameter: {}", model_url);
    import.loading = true;
    import.url = Some(model_url.clone());
    spawn_fetch(model_url, import.pending_result.clone());
}

#[cfg(target_arch = "wasm32")]
fn spawn_fetch(url: String, slot: Arc<Mutex<Option<FetchResult>>>) {
    wasm_bindgen_futures::spawn_local(async move {
        let result = fetch_model(&url).await;
        if let Ok(mut slot) = slot.lock() {
            *slot = Some((url, result));
        }
    });
}

#[cfg(not(target_arch = "wasm32"))]
fn spawn_fetch(url: String, slot: Arc<Mutex<Option<FetchResult>>>) {
    if let Ok(mut slot) = slot.lock() {
        *slot = Some((url, Err(anyhow::anyhow!("URL loading is only available in the browser"))));
    }
}

/// Fetch model bytes from URL
#[cfg(target_arch = "wasm32")]
async fn fetch_model(url: &str) -> anyhow::Result<Vec<u8>> {
    use anyhow::{anyhow, bail};
    use wasm_bindgen::JsCast;
    use wasm_bindgen_futures::JsFuture;

    let window = web_sys::window().ok_or_else(|| anyhow!("No window"))?;

    let resp = JsFuture::from(window.fetch_with_str(url))
        .await
        .map_err(|e| anyhow!("Fetch failed: {:?}", e))?;
    let resp: web_sys::Response = resp
        .dyn_into()
        .map_err(|_| anyhow!("Response cast failed"))?;

    if !resp.ok() {
        bail!("HTTP {}: {}", resp.status(), resp.status_text());
    }

    let buffer = resp
        .array_buffer()
        .map_err(|e| anyhow!("Failed to read body: {:?}", e))?;
    let buffer = JsFuture::from(buffer)
        .await
        .map_err(|e| anyhow!("Body download failed: {:?}", e))?;

    Ok(js_sys::Uint8Array::new(&buffer).to_vec())
}

/// Hand finished downloads and picked files to the session
fn process_pending_loads(
    mut session: ResMut<ViewerSession>,
    mut import: ResMut<UrlImport>,
    picked: Res<PendingFileResults>,
) {
    let fetched = import.pending_result.try_lock().ok().and_then(|mut slot| slot.take());
    if let Some((url, result)) = fetched {
        import.loading = false;
        match result {
            Ok(bytes) => {
                let filename = filename_from_url(&url);
                // Rejections are recorded on the session and shown in the chrome
                let _ = session.load_model(&filename, bytes);
            }
            Err(e) => {
                session.record_error(SessionError::LoadFailure(format!("{}: {:#}", url, e)));
            }
        }
    }

    for file in picked.drain() {
        match file.content {
            Ok(bytes) => {
                let _ = session.load_model(&file.filename, bytes);
            }
            Err(e) => {
                session.record_error(SessionError::LoadFailure(e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filename_from_plain_url() {
        assert_eq!(filename_from_url("https://example.com/models/robot.glb"), "robot.glb");
    }

    #[test]
    fn test_filename_ignores_query_and_fragment() {
        assert_eq!(filename_from_url("/assets/duck.glb?v=3#top"), "duck.glb");
    }

    #[test]
    fn test_filename_from_bare_name() {
        assert_eq!(filename_from_url("scene.GLB"), "scene.GLB");
    }

    #[test]
    fn test_filename_with_trailing_slash() {
        assert_eq!(filename_from_url("https://example.com/models/"), "models");
    }
}
