//! Binary glTF (GLB) container validation
//!
//! The container and its JSON chunk are parsed with the `gltf` crate, which
//! also validates the document's cross references. Buffers, accessors and
//! textures are not decoded here; that is the renderer's job.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const MAGIC: &[u8; 4] = b"glTF";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum GlbError {
    #[error("missing glTF magic header")]
    BadMagic,
    #[error("unsupported glTF container version {0}")]
    UnsupportedVersion(u32),
    #[error("malformed GLB container: {0}")]
    Container(String),
    #[error("invalid glTF JSON: {0}")]
    InvalidJson(String),
    #[error("invalid glTF document: {0}")]
    InvalidDocument(String),
}

impl From<gltf::Error> for GlbError {
    fn from(err: gltf::Error) -> Self {
        match err {
            gltf::Error::Binary(gltf::binary::Error::Version(version)) => {
                GlbError::UnsupportedVersion(version)
            }
            gltf::Error::Binary(e) => GlbError::Container(e.to_string()),
            gltf::Error::Deserialize(e) => GlbError::InvalidJson(e.to_string()),
            other => GlbError::InvalidDocument(other.to_string()),
        }
    }
}

/// What the document says about the scene, shown next to the model name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlbSummary {
    /// Tool that exported the file, if it says
    pub generator: Option<String>,
    pub scene_count: usize,
    pub mesh_count: usize,
    pub node_count: usize,
}

/// Validate a GLB container and summarize the embedded glTF document
pub fn inspect(bytes: &[u8]) -> Result<GlbSummary, GlbError> {
    // gltf also accepts plain JSON glTF; only the binary container is supported
    if !bytes.starts_with(MAGIC) {
        return Err(GlbError::BadMagic);
    }

    let doc = gltf::Gltf::from_slice(bytes)?;

    Ok(GlbSummary {
        generator: doc.as_json().asset.generator.clone(),
        scene_count: doc.scenes().len(),
        mesh_count: doc.meshes().len(),
        node_count: doc.nodes().len(),
    })
}

/// Build a GLB container around a JSON document and an optional BIN chunk
#[cfg(test)]
pub(crate) fn encode_for_test(json: &str, bin: &[u8]) -> Vec<u8> {
    fn chunk(out: &mut Vec<u8>, kind: &[u8; 4], payload: &[u8], pad: u8) {
        let padded = payload.len().div_ceil(4) * 4;
        out.extend_from_slice(&(padded as u32).to_le_bytes());
        out.extend_from_slice(kind);
        out.extend_from_slice(payload);
        out.resize(out.len() + padded - payload.len(), pad);
    }

    let mut body = Vec::new();
    chunk(&mut body, b"JSON", json.as_bytes(), b' ');
    if !bin.is_empty() {
        chunk(&mut body, b"BIN\0", bin, 0);
    }

    let mut out = Vec::with_capacity(12 + body.len());
    out.extend_from_slice(MAGIC);
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&((12 + body.len()) as u32).to_le_bytes());
    out.extend_from_slice(&body);
    out
}

/// One triangle, two nodes sharing its mesh
#[cfg(test)]
pub(crate) const TRIANGLE_DOC: &str = r#"{
    "asset": {"version": "2.0", "generator": "Blender glTF exporter"},
    "scene": 0,
    "scenes": [{"nodes": [0, 1]}],
    "nodes": [{"mesh": 0}, {"mesh": 0, "translation": [2.0, 0.0, 0.0]}],
    "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}],
    "accessors": [{
        "bufferView": 0,
        "componentType": 5126,
        "count": 3,
        "type": "VEC3",
        "min": [0.0, 0.0, 0.0],
        "max": [1.0, 1.0, 0.0]
    }],
    "bufferViews": [{"buffer": 0, "byteLength": 36}],
    "buffers": [{"byteLength": 36}]
}"#;

/// A valid single-triangle GLB
#[cfg(test)]
pub(crate) fn triangle_glb() -> Vec<u8> {
    let vertices: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let bin: Vec<u8> = vertices.iter().flat_map(|v| v.to_le_bytes()).collect();
    encode_for_test(TRIANGLE_DOC, &bin)
}
