use std::path::PathBuf;

use thiserror::Error;

/// Errors at the JSON persistence boundary.
///
/// Only `MissingArtifact` is fatal to a run; the loaders turn every other
/// kind into an empty collection (or a dropped entry) plus a warning.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("missing required artifact: {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{} does not hold a JSON object", .0.display())]
    NotAnObject(PathBuf),

    #[error("schema violation in {} at {key}: {reason}", path.display())]
    SchemaViolation {
        path: PathBuf,
        key: String,
        reason: String,
    },

    #[error("failed to serialize {}: {source}", path.display())]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
