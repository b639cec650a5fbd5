//! Error types for tubeqa.

use thiserror::Error;

/// Library-level error type for tubeqa operations.
#[derive(Error, Debug)]
pub enum TubeqaError {
    /// Bad construction or call arguments. The caller must fix them and retry.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Missing, empty or unavailable transcript.
    #[error("Transcript error: {0}")]
    Data(String),

    /// An embedding or completion collaborator failed. Retrying the whole call may succeed.
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Writing a query record failed. Never aborts an answer.
    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),
}

impl TubeqaError {
    /// True for errors caused by bad arguments or settings.
    pub fn is_configuration(&self) -> bool {
        matches!(self, TubeqaError::Config(_) | TubeqaError::TomlParse(_))
    }

    /// True for errors caused by the document itself.
    pub fn is_data(&self) -> bool {
        matches!(self, TubeqaError::Data(_))
    }

    /// True for failures of an external collaborator that may succeed on retry.
    pub fn is_upstream(&self) -> bool {
        matches!(self, TubeqaError::Upstream(_))
    }
}

/// Result type alias for tubeqa operations.
pub type Result<T> = std::result::Result<T, TubeqaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_taxonomy() {
        assert!(TubeqaError::Config("bad".into()).is_configuration());
        assert!(TubeqaError::Data("empty".into()).is_data());
        assert!(TubeqaError::Upstream("429".into()).is_upstream());
        assert!(!TubeqaError::Persistence("locked".into()).is_upstream());
    }
}
