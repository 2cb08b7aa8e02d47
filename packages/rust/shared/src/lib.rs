//! Shared types, error model, and configuration for bundlescout.
//!
//! This crate is the foundation depended on by all other bundlescout crates.
//! It provides:
//! - [`BundlescoutError`], the unified error type
//! - Domain types ([`Bundle`], [`BundleItem`], [`BundleId`])
//! - Configuration ([`AppConfig`], [`ResolveOptions`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ProxyConfig, ResolveConfig, ResolveOptions, StorefrontConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{BundlescoutError, FetchAttempt, Result};
pub use types::{Bundle, BundleId, BundleItem};
