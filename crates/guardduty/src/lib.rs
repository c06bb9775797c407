#![doc = include_str!("../README.md")]

pub mod checks;
pub mod client;

// --- Public API Re-exports ---

pub use checks::{CheckSet, ENABLED, detector_checks, finding_checks};
pub use client::{AwsCliDetectorApi, DetectorApi};
