#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Report source registry.
//!
//! Loads the publisher's two metadata files (URL instructions and the
//! category/frequency lookup), joins them by report code, and exposes the
//! resulting [`SourceConfig`]s. Also carries the fixed list of
//! [`WeatherLocation`]s polled by the secondary weather source.

pub mod locations;
pub mod registry;

pub use grid_ingest_source_models::{Cadence, SourceConfig, WeatherLocation};
pub use registry::SourceRegistry;

/// Errors that can occur while loading or querying the registry.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// A metadata file is missing or malformed.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of what went wrong.
        message: String,
    },

    /// No source is registered under the requested report code.
    #[error("Unknown report code: {report_code}")]
    NotFound {
        /// The report code that was looked up.
        report_code: String,
    },
}
