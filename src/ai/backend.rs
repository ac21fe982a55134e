//! Backend abstraction for AI-assisted extraction
//!
//! A backend turns a prompt into raw model text. Prompt construction and response
//! parsing live in [`crate::ai::analyzer`] so every backend shares them.

use super::error::BackendError;
use async_trait::async_trait;

#[async_trait]
pub trait DependencyBackend: Send + Sync {
    /// Human-readable backend name for logs and notices
    fn name(&self) -> &str;

    /// True when prompts leave the machine; such backends get one redacted, batched prompt
    fn is_remote(&self) -> bool;

    /// Cheap reachability probe, never an error
    async fn is_available(&self) -> bool;

    /// Sends `prompt` and returns the model's text output
    async fn complete(&self, prompt: &str) -> Result<String, BackendError>;
}
