//! Utility functions for rysig

pub mod cache;
pub mod url;

pub use cache::*;
pub use url::*;
