pub mod config;
pub mod core;
pub mod domain;
pub mod release;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::{cli::LocalStorage, release_config::ReleaseConfig};
pub use core::dataset::{load, load_raw, load_raw_query, FileFormat, LoadOptions, RawQuery};
pub use core::filename::{FilenameInfo, PsiFilenameParser};
pub use utils::error::{PsiDataError, Result};
