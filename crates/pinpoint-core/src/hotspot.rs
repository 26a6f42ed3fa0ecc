//! Hotspot annotations anchored on the model surface

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque hotspot identifier, unique within a session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HotspotId(String);

impl HotspotId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for HotspotId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A labeled point in model space
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    pub id: HotspotId,
    /// World-space position; the model sits at the origin at native scale,
    /// so this is also the model-local position
    pub position: [f32; 3],
    pub label: String,
    pub created_at: DateTime<Utc>,
}

impl Hotspot {
    pub(crate) fn new(id: HotspotId, position: [f32; 3], label: String) -> Self {
        Self {
            id,
            position,
            label,
            created_at: Utc::now(),
        }
    }
}

/// True when every coordinate is a finite number
pub fn is_finite_point(point: [f32; 3]) -> bool {
    point.iter().all(|c| c.is_finite())
}
