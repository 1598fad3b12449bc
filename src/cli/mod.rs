//! CLI module for the fabric-vrf tool.
//!
//! This module provides the command-line interface for reconciling VRFs
//! on a fabric controller.

mod commands;
mod output;

pub use commands::{Cli, Commands, OutputFormat};
pub use output::OutputFormatter;
