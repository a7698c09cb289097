use crate::pipeline::Stage;

/// Possible errors that arise while ingesting, clustering or exporting graph data.
#[derive(Debug, thiserror::Error)]
pub enum HgcError {
    #[error("Malformed distance record on line {line}: {reason}")]
    MalformedRecord { line: usize, reason: String },

    #[error("Matrix has the wrong shape: {0}")]
    ShapeError(String),

    #[error("Invalid distance: {0}")]
    InvalidDistance(String),

    #[error("{element} of graph \"{graph}\" has an inconvertible value \"{value}\" for key \"{key}\"")]
    InvalidAttributeValue {
        graph: String,
        element: String,
        key: String,
        value: String,
    },

    #[error("Couldn't read \"{path}\": {reason}")]
    UnreadableSource { path: String, reason: String },

    #[error("Invalid configuration: {0}")]
    ConfigurationError(String),

    #[error("Distance computation method is undefined")]
    UndefinedMethod,

    #[error("Invalid clustering criterion passed (\"{0}\")")]
    InvalidCriterion(String),

    #[error("\"{0}\" names a family of criteria; a specific bottom-up criterion is needed: \
        nearest point, farthest point, upgma, wpgma, upgmc, wpgmc, incremental")]
    AmbiguousCriterion(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("Cannot {operation}: the {stage} stage has not been completed")]
    PrerequisiteMissing { stage: Stage, operation: &'static str },

    #[error("Unknown entity: {0}")]
    UnknownEntity(String),

    #[error("Distance engine failure: {0}")]
    EngineFailure(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HgcError {
    pub(crate) fn unreadable(path: impl AsRef<std::path::Path>, reason: impl ToString) -> Self {
        HgcError::UnreadableSource {
            path: path.as_ref().display().to_string(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn missing(stage: Stage, operation: &'static str) -> Self {
        HgcError::PrerequisiteMissing { stage, operation }
    }
}
