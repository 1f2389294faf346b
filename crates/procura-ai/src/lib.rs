//! procura-ai: LLM completion providers
//!
//! This crate provides a common request/response interface over the Gemini
//! and OpenAI-compatible completion APIs, including schema-constrained
//! (structured) output.

pub mod error;
pub mod models;
pub mod providers;
pub mod structured;
pub mod types;

pub use error::{Error, Result};
pub use providers::LlmProvider;
pub use types::*;
