//! Lull - Bedtime History Story Generator
//!
//! A CLI tool that turns a historical topic into a long-form, calming
//! bedtime story through a two-stage LLM pipeline: a single outline
//! request, then strictly sequential chapter expansion with 25 scenes per
//! chapter. Every chapter is checkpointed so an interrupted run resumes
//! from the last completed chapter instead of re-billing finished work.

pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod error;
pub mod generator;
pub mod ledger;
pub mod orchestrator;
pub mod retry;
pub mod sanitize;
pub mod story;

pub use error::{LullError, Result};
