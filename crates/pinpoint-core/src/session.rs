//! Session state: the loaded model and its hotspots
//!
//! The session owns the model resource through a [`ModelStore`]. Every
//! handle the store hands out is given back to [`ModelStore::release`]
//! exactly once: when it is replaced, when its load fails, on
//! [`Session::unload`], or when the session is dropped.
//!
//! Imports are two-phase. [`Session::load_model`] validates the file and
//! stages it as pending; the renderer later reports back with
//! [`Session::confirm_loaded`] or [`Session::fail_loading`]. The current
//! model and its hotspots are left alone until the new one is confirmed.

use std::path::Path;

use crate::error::SessionError;
use crate::glb::{self, GlbSummary};
use crate::hotspot::{is_finite_point, Hotspot, HotspotId};

/// Platform side of model ownership
pub trait ModelStore {
    type Handle;

    /// Hand validated container bytes to the platform
    fn insert(&mut self, name: &str, bytes: Vec<u8>) -> Self::Handle;

    /// Give a handle back; called once per handle
    fn release(&mut self, handle: Self::Handle);
}

/// A model resource together with what we know about it
#[derive(Debug)]
pub struct LoadedModel<H> {
    /// Filename or URL it came from
    pub name: String,
    pub size_bytes: usize,
    pub summary: GlbSummary,
    pub handle: H,
}

/// The only container the viewer imports, matched case-insensitively
pub const MODEL_EXTENSION: &str = "glb";

pub struct Session<S: ModelStore> {
    store: S,
    model: Option<LoadedModel<S::Handle>>,
    pending: Option<LoadedModel<S::Handle>>,
    hotspots: Vec<Hotspot>,
    error: Option<SessionError>,
    /// Bumped every time a new model becomes current
    generation: u64,
}

/// Case-insensitive extension check (`extension` without the dot)
pub fn has_extension(filename: &str, extension: &str) -> bool {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}

impl<S: ModelStore> Session<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            model: None,
            pending: None,
            hotspots: Vec::new(),
            error: None,
            generation: 0,
        }
    }

    /// Validate and stage a model import
    ///
    /// A wrong extension only records the error. A malformed container
    /// records a load failure without touching the current model.
    pub fn load_model(&mut self, filename: &str, bytes: Vec<u8>) -> Result<&S::Handle, SessionError> {
        if !has_extension(filename, MODEL_EXTENSION) {
            let err = SessionError::InvalidFileType {
                filename: filename.to_string(),
                expected: MODEL_EXTENSION.to_string(),
            };
            tracing::warn!("Rejected import: {}", err);
            self.error = Some(err.clone());
            return Err(err);
        }

        let summary = match glb::inspect(&bytes) {
            Ok(summary) => summary,
            Err(e) => {
                let err = SessionError::from(e);
                tracing::error!("Rejected {}: {}", filename, err);
                self.error = Some(err.clone());
                return Err(err);
            }
        };

        if let Some(stale) = self.pending.take() {
            tracing::info!("Discarding in-flight load of {}", stale.name);
            self.store.release(stale.handle);
        }

        let size_bytes = bytes.len();
        let handle = self.store.insert(filename, bytes);
        tracing::info!("Loading {} ({} bytes, {} meshes)", filename, size_bytes, summary.mesh_count);

        self.error = None;
        let staged = self.pending.insert(LoadedModel {
            name: filename.to_string(),
            size_bytes,
            summary,
            handle,
        });
        Ok(&staged.handle)
    }

    /// The renderer finished loading the pending model: make it current
    ///
    /// Returns false when nothing was pending.
    pub fn confirm_loaded(&mut self) -> bool {
        let Some(next) = self.pending.take() else {
            return false;
        };

        tracing::info!("Model ready: {}", next.name);
        if let Some(previous) = self.model.replace(next) {
            tracing::info!("Releasing previous model {}", previous.name);
            self.store.release(previous.handle);
        }
        self.hotspots.clear();
        self.generation += 1;
        // A rejected file name stays visible; an older load failure is stale now
        if matches!(self.error, Some(SessionError::LoadFailure(_))) {
            self.error = None;
        }
        true
    }

    /// The renderer could not build a scene from the pending model
    pub fn fail_loading(&mut self, reason: impl Into<String>) {
        let reason = reason.into();
        if let Some(failed) = self.pending.take() {
            tracing::error!("Failed to load {}: {}", failed.name, reason);
            self.store.release(failed.handle);
        }
        self.error = Some(SessionError::LoadFailure(reason));
    }

    /// Release every model resource and drop all hotspots
    pub fn unload(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.store.release(pending.handle);
        }
        if let Some(model) = self.model.take() {
            tracing::info!("Releasing model {}", model.name);
            self.store.release(model.handle);
        }
        self.hotspots.clear();
    }

    /// Append a hotspot at `point`
    ///
    /// No-op (returns `None`) without a model, for a non-finite point,
    /// or when the label is blank. The label is stored trimmed.
    pub fn add_hotspot(&mut self, point: [f32; 3], label: &str) -> Option<&Hotspot> {
        if self.model.is_none() {
            tracing::warn!("Ignoring hotspot: no model loaded");
            return None;
        }
        if !is_finite_point(point) {
            tracing::warn!("Ignoring hotspot at non-finite point {:?}", point);
            return None;
        }
        let label = label.trim();
        if label.is_empty() {
            return None;
        }

        let mut id = HotspotId::generate();
        while self.hotspots.iter().any(|h| h.id == id) {
            id = HotspotId::generate();
        }

        tracing::info!("Added hotspot {} \"{}\" at {:?}", id, label, point);
        self.hotspots.push(Hotspot::new(id, point, label.to_string()));
        self.hotspots.last()
    }

    /// Remove a hotspot by id; returns whether one was removed
    pub fn remove_hotspot(&mut self, id: &HotspotId) -> bool {
        let before = self.hotspots.len();
        self.hotspots.retain(|h| &h.id != id);
        before != self.hotspots.len()
    }

    pub fn clear_hotspots(&mut self) {
        self.hotspots.clear();
    }

    pub fn hotspots(&self) -> &[Hotspot] {
        &self.hotspots
    }

    pub fn hotspot(&self, id: &HotspotId) -> Option<&Hotspot> {
        self.hotspots.iter().find(|h| &h.id == id)
    }

    pub fn model(&self) -> Option<&LoadedModel<S::Handle>> {
        self.model.as_ref()
    }

    pub fn pending(&self) -> Option<&LoadedModel<S::Handle>> {
        self.pending.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    pub fn error(&self) -> Option<&SessionError> {
        self.error.as_ref()
    }

    pub fn dismiss_error(&mut self) {
        self.error = None;
    }

    /// Show an error that happened before the bytes reached the session
    /// (network fetch, file read). Model state is untouched.
    pub fn record_error(&mut self, err: SessionError) {
        tracing::error!("{}", err);
        self.error = Some(err);
    }

    /// Changes whenever a different model becomes current
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S: ModelStore> Drop for Session<S> {
    fn drop(&mut self) {
        self.unload();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::glb::triangle_glb;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Store that hands out numbered handles and logs releases
    #[derive(Default)]
    pub(crate) struct CountingStore {
        next: u32,
        pub released: Rc<RefCell<Vec<u32>>>,
    }

    impl ModelStore for CountingStore {
        type Handle = u32;

        fn insert(&mut self, _name: &str, _bytes: Vec<u8>) -> u32 {
            self.next += 1;
            self.next
        }

        fn release(&mut self, handle: u32) {
            self.released.borrow_mut().push(handle);
        }
    }

    pub(crate) fn scene_bytes() -> Vec<u8> {
        triangle_glb()
    }

    pub(crate) fn loaded_session() -> Session<CountingStore> {
        let mut session = Session::new(CountingStore::default());
        session.load_model("scene.glb", scene_bytes()).unwrap();
        assert!(session.confirm_loaded());
        session
    }

    #[test]
    fn test_annotation_scenario() {
        use crate::interaction::{resolve_click, ClickIntent, LabelPrompt, PointerClick};

        let mut session = Session::new(CountingStore::default());
        let released = session.store().released.clone();
        let mut prompt = LabelPrompt::default();

        assert_eq!(*session.load_model("scene.glb", scene_bytes()).unwrap(), 1);
        assert!(session.is_loading());
        session.confirm_loaded();
        assert!(!session.is_loading());
        assert!(session.hotspots().is_empty());

        // Plain click on the model navigates
        let plain = PointerClick { modifier_held: false, hit: Some([1.0, 2.0, 3.0]) };
        assert_eq!(resolve_click(&plain), ClickIntent::Navigate);
        assert!(!prompt.is_open());
        assert!(session.hotspots().is_empty());

        // Modifier click, type a label, commit
        let click = PointerClick { modifier_held: true, hit: Some([1.0, 2.0, 3.0]) };
        let ClickIntent::Annotate { point } = resolve_click(&click) else {
            panic!("modifier click on the model should annotate");
        };
        assert!(prompt.open(point, session.generation()));
        prompt.text_mut().unwrap().push_str("Engine");
        let id = prompt.commit(&mut session).unwrap();
        assert!(!prompt.is_open());
        assert_eq!(session.hotspots().len(), 1);
        assert_eq!(session.hotspots()[0].id, id);
        assert_eq!(session.hotspots()[0].position, [1.0, 2.0, 3.0]);
        assert_eq!(session.hotspots()[0].label, "Engine");

        // Modifier click, then cancel the prompt
        let ClickIntent::Annotate { point } = resolve_click(&click) else {
            panic!("modifier click on the model should annotate");
        };
        assert!(prompt.open(point, session.generation()));
        prompt.text_mut().unwrap().push_str("Discarded");
        prompt.cancel();
        assert!(!prompt.is_open());
        assert_eq!(session.hotspots().len(), 1);

        assert!(session.remove_hotspot(&id));
        assert!(session.hotspots().is_empty());

        session.load_model("second.glb", scene_bytes()).unwrap();
        session.confirm_loaded();
        assert!(session.hotspots().is_empty());
        assert_eq!(*released.borrow(), vec![1]);
        assert_eq!(session.model().unwrap().name, "second.glb");
    }

    #[test]
    fn test_load_resets_hotspots() {
        let mut session = loaded_session();
        session.add_hotspot([0.0, 0.0, 0.0], "a");
        session.add_hotspot([0.0, 1.0, 0.0], "b");
        let generation = session.generation();

        session.load_model("other.GLB", scene_bytes()).unwrap();
        // Previous hotspots survive until the new model is confirmed
        assert_eq!(session.hotspots().len(), 2);
        session.confirm_loaded();
        assert!(session.hotspots().is_empty());
        assert_eq!(session.generation(), generation + 1);
    }

    #[test]
    fn test_wrong_extension_only_sets_error() {
        let mut session = loaded_session();
        session.add_hotspot([0.0, 0.0, 0.0], "keep");

        let err = session.load_model("scene.gltf", scene_bytes()).unwrap_err();
        assert!(matches!(err, SessionError::InvalidFileType { .. }));
        assert_eq!(session.error(), Some(&err));
        assert!(!session.is_loading());
        assert_eq!(session.hotspots().len(), 1);
        assert_eq!(session.model().unwrap().handle, 1);
        assert!(session.store().released.borrow().is_empty());
    }

    #[test]
    fn test_malformed_container_keeps_current_model() {
        let mut session = loaded_session();
        session.add_hotspot([0.0, 0.0, 0.0], "keep");

        let err = session.load_model("broken.glb", b"not a glb at all, sorry".to_vec()).unwrap_err();
        assert!(matches!(err, SessionError::LoadFailure(_)));
        assert!(!session.is_loading());
        assert_eq!(session.hotspots().len(), 1);
        assert_eq!(session.model().unwrap().name, "scene.glb");
    }

    #[test]
    fn test_failed_load_rolls_back() {
        let mut session = loaded_session();
        session.add_hotspot([0.0, 0.0, 0.0], "keep");
        let released = session.store().released.clone();

        session.load_model("next.glb", scene_bytes()).unwrap();
        session.fail_loading("no scenes");

        assert!(!session.is_loading());
        assert_eq!(session.error(), Some(&SessionError::LoadFailure("no scenes".to_string())));
        assert_eq!(session.model().unwrap().handle, 1);
        assert_eq!(session.hotspots().len(), 1);
        assert_eq!(*released.borrow(), vec![2]);
    }

    #[test]
    fn test_restaging_releases_stale_pending() {
        let mut session = Session::new(CountingStore::default());
        let released = session.store().released.clone();

        session.load_model("a.glb", scene_bytes()).unwrap();
        session.load_model("b.glb", scene_bytes()).unwrap();
        assert_eq!(*released.borrow(), vec![1]);

        session.confirm_loaded();
        assert_eq!(session.model().unwrap().name, "b.glb");
    }

    #[test]
    fn test_drop_releases_everything_once() {
        let mut session = loaded_session();
        let released = session.store().released.clone();
        session.load_model("pending.glb", scene_bytes()).unwrap();

        session.unload();
        assert!(session.hotspots().is_empty());
        assert!(session.model().is_none());
        drop(session);

        let mut log = released.borrow().clone();
        log.sort();
        assert_eq!(log, vec![1, 2]);
    }

    #[test]
    fn test_drop_without_unload() {
        let session = loaded_session();
        let released = session.store().released.clone();
        drop(session);
        assert_eq!(*released.borrow(), vec![1]);
    }

    #[test]
    fn test_confirm_without_pending() {
        let mut session = Session::new(CountingStore::default());
        assert!(!session.confirm_loaded());
        assert_eq!(session.generation(), 0);
    }

    #[test]
    fn test_add_without_model_is_noop() {
        let mut session = Session::new(CountingStore::default());
        assert!(session.add_hotspot([0.0, 0.0, 0.0], "orphan").is_none());
        assert!(session.hotspots().is_empty());
    }

    #[test]
    fn test_add_rejects_non_finite_point() {
        let mut session = loaded_session();
        assert!(session.add_hotspot([f32::NAN, 0.0, 0.0], "nan").is_none());
        assert!(session.hotspots().is_empty());
    }

    #[test]
    fn test_blank_label_is_noop() {
        let mut session = loaded_session();
        assert!(session.add_hotspot([0.0, 0.0, 0.0], "   \t").is_none());
        assert!(session.hotspots().is_empty());
    }

    #[test]
    fn test_label_trimmed_and_duplicates_allowed() {
        let mut session = loaded_session();
        let a = session.add_hotspot([1.0, 1.0, 1.0], "  Wheel ").unwrap().id.clone();
        let b = session.add_hotspot([1.0, 1.0, 1.0], "Wheel").unwrap().id.clone();

        assert_ne!(a, b);
        assert_eq!(session.hotspots().len(), 2);
        assert!(session.hotspots().iter().all(|h| h.label == "Wheel"));
        // Append order is display order
        assert_eq!(session.hotspots()[0].id, a);
        assert_eq!(session.hotspot(&b).unwrap().position, [1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut session = loaded_session();
        session.add_hotspot([0.0, 0.0, 0.0], "a");
        assert!(!session.remove_hotspot(&HotspotId::generate()));
        assert_eq!(session.hotspots().len(), 1);
    }

    #[test]
    fn test_clear_is_idempotent() {
        let mut session = loaded_session();
        session.add_hotspot([0.0, 0.0, 0.0], "a");
        session.add_hotspot([1.0, 0.0, 0.0], "b");
        session.clear_hotspots();
        assert!(session.hotspots().is_empty());
        session.clear_hotspots();
        assert!(session.hotspots().is_empty());
        assert!(session.model().is_some());
    }

    #[test]
    fn test_dismiss_error() {
        let mut session = Session::new(CountingStore::default());
        let _ = session.load_model("notes.txt", Vec::new());
        assert!(session.error().is_some());
        session.dismiss_error();
        assert!(session.error().is_none());
    }

    #[test]
    fn test_record_error_leaves_pending_load() {
        let mut session = Session::new(CountingStore::default());
        session.load_model("a.glb", scene_bytes()).unwrap();
        session.record_error(SessionError::LoadFailure("HTTP 404".to_string()));

        assert!(session.is_loading());
        assert!(session.store().released.borrow().is_empty());
        assert!(session.confirm_loaded());
        // Confirming a good load clears the stale message
        assert!(session.error().is_none());
    }

    #[test]
    fn test_rejected_name_survives_pending_confirm() {
        let mut session = Session::new(CountingStore::default());
        session.load_model("next.glb", scene_bytes()).unwrap();
        let err = session.load_model("bad.obj", scene_bytes()).unwrap_err();

        assert!(session.confirm_loaded());
        assert_eq!(session.model().unwrap().name, "next.glb");
        assert_eq!(session.error(), Some(&err));
    }

    #[test]
    fn test_only_glb_container_accepted() {
        let mut session = Session::new(CountingStore::default());
        let err = session.load_model("scene.gltf", scene_bytes()).unwrap_err();
        assert_eq!(
            err,
            SessionError::InvalidFileType {
                filename: "scene.gltf".to_string(),
                expected: MODEL_EXTENSION.to_string(),
            }
        );
        assert!(session.load_model("SCENE.GLB", scene_bytes()).is_ok());
    }

    #[test]
    fn test_has_extension() {
        assert!(has_extension("scene.glb", "glb"));
        assert!(has_extension("SCENE.GLB", "glb"));
        assert!(has_extension("dir/model.v2.Glb", "glb"));
        assert!(!has_extension("scene.gltf", "glb"));
        assert!(!has_extension("glb", "glb"));
        assert!(!has_extension("scene.glb.zip", "glb"));
    }
}
