use crate::assets::AssetError;
use crate::engine::EngineError;
use std::path::PathBuf;

/// Coarse classification of a [`SceneError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A required object or pointer was absent.
    MissingInput,
    /// An object was present but semantically incomplete.
    MalformedInput,
    /// A declared variant that has no implementation.
    UnsupportedOperation,
    /// File, decode, or engine resource failure.
    ResourceFailure,
    /// The engine strand is gone or a unit aborted.
    ExecutionContext,
}

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0} must be provided")]
    MustBeProvided(&'static str),
    #[error("{0} is not initialized")]
    NotInitialized(&'static str),
    #[error("invalid color '{0}'")]
    InvalidColor(String),
    #[error("{0}: not implemented")]
    NotImplemented(&'static str),
    #[error("asset path not valid: '{}'", .0.display())]
    InvalidAssetPath(PathBuf),
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not decode HDR file {}: {source}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error(transparent)]
    Asset(#[from] AssetError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error("failed to start engine execution context: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("engine execution context is closed")]
    ExecutionContextClosed,
    #[error("engine unit aborted before completing")]
    UnitAborted,
    #[error("timed out waiting for the engine execution context")]
    Timeout,
    #[error("waiting on the engine execution context from its own thread would deadlock")]
    WouldDeadlock,
}

impl SceneError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::NotInitialized(_) => ErrorKind::MissingInput,
            Self::MustBeProvided(_) | Self::InvalidColor(_) => ErrorKind::MalformedInput,
            Self::NotImplemented(_) => ErrorKind::UnsupportedOperation,
            Self::InvalidAssetPath(_)
            | Self::Read { .. }
            | Self::Decode { .. }
            | Self::Asset(_)
            | Self::Engine(_) => ErrorKind::ResourceFailure,
            Self::Spawn(_)
            | Self::ExecutionContextClosed
            | Self::UnitAborted
            | Self::Timeout
            | Self::WouldDeadlock => ErrorKind::ExecutionContext,
        }
    }
}

/// Textual status returned by every mutating operation.
pub type Outcome = Result<String, SceneError>;

/// Status of a single camera sub-update.
pub type StepStatus = Result<&'static str, SceneError>;

#[cfg(test)]
mod tests {
    use super::{ErrorKind, SceneError};

    #[test]
    fn messages_read_like_status_text() {
        assert_eq!(SceneError::NotFound("Camera").to_string(), "Camera not found");
        assert_eq!(
            SceneError::MustBeProvided("Projection info").to_string(),
            "Projection info must be provided"
        );
        assert_eq!(
            SceneError::NotImplemented("KTX indirect light").to_string(),
            "KTX indirect light: not implemented"
        );
    }

    #[test]
    fn kinds_follow_taxonomy() {
        assert_eq!(SceneError::NotFound("Exposure").kind(), ErrorKind::MissingInput);
        assert_eq!(
            SceneError::MustBeProvided("Projection info").kind(),
            ErrorKind::MalformedInput
        );
        assert_eq!(
            SceneError::NotImplemented("KTX skybox").kind(),
            ErrorKind::UnsupportedOperation
        );
        assert_eq!(
            SceneError::InvalidAssetPath("missing.hdr".into()).kind(),
            ErrorKind::ResourceFailure
        );
        assert_eq!(SceneError::UnitAborted.kind(), ErrorKind::ExecutionContext);
    }
}
