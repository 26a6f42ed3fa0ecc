//! Pinpoint Core - session state and hotspot annotation logic
//!
//! This crate holds everything about the viewer that does not need a renderer:
//! - Session state: the loaded model resource and its ordered hotspots
//! - Click dispatch between camera navigation and hotspot placement
//! - The pending label prompt that sits between a click and a hotspot
//! - GLB container validation
//! - Viewer configuration

pub mod config;
pub mod error;
pub mod glb;
pub mod hotspot;
pub mod interaction;
pub mod session;

pub use config::{ConfigError, ViewerConfig};
pub use error::SessionError;
pub use glb::{GlbError, GlbSummary};
pub use hotspot::{Hotspot, HotspotId};
pub use interaction::{resolve_click, ClickIntent, LabelPrompt, ModifierKey, PointerClick};
pub use session::{LoadedModel, ModelStore, Session, MODEL_EXTENSION};
