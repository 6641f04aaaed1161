//! CLI command implementations.

pub mod diff;
pub mod keypath;

use livediff_core::{CoreError, Schema};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Errors reported by CLI commands.
#[derive(Debug, Error)]
pub enum CliError {
    /// A file could not be read.
    #[error("cannot read {path:?}: {source}")]
    Io {
        /// The file.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// A file is not valid JSON for what it should contain.
    #[error("cannot parse {path:?}: {source}")]
    Json {
        /// The file.
        path: PathBuf,
        /// Underlying error.
        source: serde_json::Error,
    },

    /// Output could not be serialized.
    #[error("cannot serialize output: {0}")]
    Output(#[from] serde_json::Error),

    /// The core library rejected the input.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The arguments do not make sense together.
    #[error("{0}")]
    Usage(String),

    /// Some key paths did not resolve.
    #[error("{0} key path(s) are invalid")]
    InvalidKeyPaths(usize),
}

/// Reads and deserializes a JSON file.
pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| CliError::Json {
        path: path.to_path_buf(),
        source,
    })
}

/// Reads and validates a schema file.
pub(crate) fn load_schema(path: &Path) -> Result<Arc<Schema>, CliError> {
    let schema: Schema = read_json(path)?;
    schema.validate()?;
    tracing::debug!(path = %path.display(), types = schema.types().count(), "schema loaded");
    Ok(Arc::new(schema))
}
