//! Prompt-chain orchestration for the content pipeline.
//!
//! This crate wires the chat-completion gateway client and the three fixed
//! prompt templates into the Idea → Draft → Editor run (`run_pipeline`), and
//! assembles retrieval context from inline text and documents.

pub mod context;
pub mod gateway;
pub mod pipeline;
pub mod prompts;

pub use context::join_context;
pub use gateway::GatewayClient;
pub use pipeline::{SilentProgress, StageProgress, run_pipeline};
