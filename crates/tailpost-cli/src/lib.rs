//! Tailpost CLI library
//!
//! Argument definitions and command implementations for the `tailpost`
//! binary.

pub mod cli;
pub mod commands;
pub mod logging;
