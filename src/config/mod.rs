//! Configuration module for Meeting-Media
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section has production defaults, so an empty file is a valid configuration.
//!
//! # Example
//!
//! ```no_run
//! use meeting_media::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Files are stored under: {}", config.storage.files_path.display());
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{CatalogConfig, Config, HttpConfig, SiteConfig, StorageConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash};
pub use validation::validate;
