//! Pointer click dispatch and the hotspot label prompt

use serde::{Deserialize, Serialize};

use crate::hotspot::HotspotId;
use crate::session::{ModelStore, Session};

/// Keyboard modifier that turns a click into an annotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModifierKey {
    #[default]
    Shift,
    Control,
    Alt,
}

impl ModifierKey {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Shift => "Shift",
            Self::Control => "Ctrl",
            Self::Alt => "Alt",
        }
    }
}

impl std::str::FromStr for ModifierKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shift" => Ok(Self::Shift),
            "ctrl" | "control" => Ok(Self::Control),
            "alt" | "option" => Ok(Self::Alt),
            other => Err(format!("unknown modifier key: {}", other)),
        }
    }
}

/// A click on the model as reported by the renderer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerClick {
    /// Modifier state at the moment of the click
    pub modifier_held: bool,
    /// First intersection of the pointer ray with model geometry
    pub hit: Option<[f32; 3]>,
}

/// What a click should do
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClickIntent {
    /// Leave the event to the camera controls
    Navigate,
    /// Consume the event and ask for a label at `point`
    Annotate { point: [f32; 3] },
}

/// Decide between navigating and annotating
///
/// Only a modifier click that actually hit geometry annotates.
pub fn resolve_click(click: &PointerClick) -> ClickIntent {
    match (click.modifier_held, click.hit) {
        (true, Some(point)) => ClickIntent::Annotate { point },
        _ => ClickIntent::Navigate,
    }
}

#[derive(Debug, Clone, PartialEq)]
struct PendingLabel {
    point: [f32; 3],
    generation: u64,
    text: String,
}

/// Waiting-for-label state between an annotate click and its hotspot
#[derive(Debug, Clone, Default)]
pub struct LabelPrompt {
    pending: Option<PendingLabel>,
}

impl LabelPrompt {
    /// Start asking for a label; refused while another prompt is open
    pub fn open(&mut self, point: [f32; 3], generation: u64) -> bool {
        if self.pending.is_some() {
            return false;
        }
        self.pending = Some(PendingLabel {
            point,
            generation,
            text: String::new(),
        });
        true
    }

    pub fn is_open(&self) -> bool {
        self.pending.is_some()
    }

    pub fn point(&self) -> Option<[f32; 3]> {
        self.pending.as_ref().map(|p| p.point)
    }

    /// Text buffer for the input field, if a prompt is open
    pub fn text_mut(&mut self) -> Option<&mut String> {
        self.pending.as_mut().map(|p| &mut p.text)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }

    /// Close the prompt and add the hotspot
    ///
    /// Nothing is added when the label is blank or when a different model
    /// was loaded while the prompt was open.
    pub fn commit<S: ModelStore>(&mut self, session: &mut Session<S>) -> Option<HotspotId> {
        let pending = self.pending.take()?;
        if pending.generation != session.generation() {
            tracing::warn!("Dropping hotspot label: model changed while prompting");
            return None;
        }
        session
            .add_hotspot(pending.point, &pending.text)
            .map(|h| h.id.clone())
    }
}
