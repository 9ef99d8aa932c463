//! CLI command implementations

pub mod app;
pub mod error;
pub mod export;
pub mod sites;
pub mod status;

pub use app::{Cli, Commands, OutputFormat};
pub use error::CliError;
pub use export::{EstimateArgs, ExportArgs};
pub use status::ProgressBarSink;
