//! Shared types, error model, and configuration for the content pipeline.
//!
//! This crate is the foundation depended on by all other contentpipe crates.
//! It provides:
//! - [`ContentPipelineError`] — the unified error type
//! - Domain types ([`Stage`], [`StageResult`], [`PipelineRequest`], [`PipelineResult`], [`RunId`])
//! - Configuration ([`AppConfig`], [`GatewayConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, GatewayConfig, ServerConfig, config_dir, config_file_path, init_config,
    load_config, load_config_from, resolve_api_key,
};
pub use error::{ContentPipelineError, ErrorKind, Result};
pub use types::{PipelineRequest, PipelineResult, RunId, Stage, StageResult};
