//! FXSIGNAL: forex signal scoring and cycle orchestration.
//!
//! Library crate exposing all modules for use by integration tests
//! and the binary entry point.

pub mod config;
pub mod types;
pub mod data;
pub mod llm;
pub mod scoring;
pub mod engine;
pub mod display;
