//! Test support for pipelines built on this crate.
//!
//! This module provides:
//! - Scripted external tools standing in for real restoration models
//! - Small image fixtures for staging and render tests

mod fixtures;
mod scripted;

pub use fixtures::{sample_inputs, write_png};
pub use scripted::{ScriptedBehavior, ScriptedTool};
