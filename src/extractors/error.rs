//! Per-file extraction errors
//!
//! An `ExtractError` always describes a single file and never aborts a scan; the
//! scanner turns it into a warning keyed by the file's relative path.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid XML: {0}")]
    Xml(#[from] roxmltree::Error),

    #[error("invalid content: {0}")]
    InvalidContent(String),
}
