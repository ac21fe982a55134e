// Configuration extraction
//
// Extractors turn the content of one configuration file into dependency facts. They
// are pure: no file-system or network access, no shared state. The registry decides
// which extractors see which file.

pub mod error;
pub mod parsers;
pub mod patterns;
pub mod registry;

pub use error::ExtractError;
pub use registry::{ExtractorRegistry, FilePattern};

use crate::model::NetworkDependency;

/// One configuration dialect
pub trait Extractor: Send + Sync {
    /// Short identifier used in logs
    fn name(&self) -> &'static str;

    /// Extracts facts from `content`; `source_label` becomes each fact's `source_file`
    fn extract(
        &self,
        source_label: &str,
        content: &str,
    ) -> Result<Vec<NetworkDependency>, ExtractError>;
}
