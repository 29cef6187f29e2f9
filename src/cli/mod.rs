//! Command line interface for the `rysig` inspection tool

pub mod args;
pub mod output;

pub use args::{Args, VerbosityLevel};
pub use output::OutputFormatter;
