pub mod config;
pub mod error;
pub mod sources_file;
pub mod types;

pub use config::Config;
pub use error::{HarvestError, Result};
pub use sources_file::SourcesFile;
pub use types::*;
