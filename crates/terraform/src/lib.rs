#![doc = include_str!("../README.md")]

pub mod command;
pub mod module;
pub mod options;
pub mod retry;

// --- Public API Re-exports ---

pub use module::{Provisioner, TerraformModule};
pub use options::TerraformOptions;
pub use retry::{DEFAULT_RETRYABLE_ERRORS, RetryPolicy};
