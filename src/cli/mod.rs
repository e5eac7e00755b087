//! Command line interface module
//!
//! This module provides the entry point for parsing command-line arguments and
//! running a mirror batch.

pub mod args;
pub mod runner;

pub use args::Args;
pub use runner::Runner;
