//! Interactive review of discovered dependencies before rendering

pub mod picker;
pub mod prompt;

pub use picker::Picker;
pub use prompt::run_prompt;
