//! Errors surfaced to the user by the session

use thiserror::Error;

use crate::glb::GlbError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// The picked file does not carry the expected extension
    #[error("{filename} is not a .{expected} file")]
    InvalidFileType { filename: String, expected: String },
    /// The bytes could not be turned into a scene
    #[error("Failed to load model: {0}")]
    LoadFailure(String),
}

impl From<GlbError> for SessionError {
    fn from(err: GlbError) -> Self {
        Self::LoadFailure(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_file_type_message() {
        let err = SessionError::InvalidFileType {
            filename: "scene.obj".to_string(),
            expected: "glb".to_string(),
        };
        assert_eq!(err.to_string(), "scene.obj is not a .glb file");
    }

    #[test]
    fn test_glb_error_becomes_load_failure() {
        let err: SessionError = GlbError::BadMagic.into();
        assert!(matches!(err, SessionError::LoadFailure(_)));
    }
}
