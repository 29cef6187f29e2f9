//! # rysig - player signature cipher resolver
//!
//! Recovers the signature scrambling routine of an obfuscated video player
//! script without executing it, and applies it to encrypted stream signatures.
//!
//! ## Features
//!
//! - Structural classification of the swap, reverse and remove-at helpers
//! - Recipe recording from the driver function's call sequence
//! - Pure, error-checked recipe interpretation
//! - Per script version caching of resolved ciphers
//! - Stream URL assembly from `signatureCipher` parameters
//!
//! ## Example
//!
//! ```rust,no_run
//! use rysig::platform::{HttpClientConfig, SignatureDecipherer, VideoClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = VideoClient::new(HttpClientConfig::default())?;
//!     let decipherer = SignatureDecipherer::new(client);
//!
//!     let url = decipherer
//!         .resolve_stream_url("s=...&sp=sig&url=...", "VIDEO_URL")
//!         .await?;
//!     println!("{}", url);
//!
//!     Ok(())
//! }
//! ```
//!
//! Working from script text directly:
//!
//! ```rust,no_run
//! use rysig::{build_recipe, classify, DriverHint};
//!
//! # fn main() -> rysig::Result<()> {
//! let script = std::fs::read_to_string("base.js")?;
//! let names = classify(&script)?;
//! let recipe = build_recipe(&script, &DriverHint::Auto, &names)?;
//! println!("{}", recipe.apply("AOq0QJ8wRAIg")?);
//! # Ok(())
//! # }
//! ```

pub mod cipher;
pub mod cli;
pub mod error;
pub mod platform;
pub mod utils;

// Re-export main types
pub use cipher::{
    build_recipe, classify, DriverHint, FunctionNameSet, Operation, OperationKind, Recipe,
    ResolvedCipher, ScriptVersion,
};
pub use error::{ClassificationError, InterpretationError, RecordingError, RysigError};
pub use platform::{SignatureDecipherer, VideoClient};

/// Result type alias for rysig operations
pub type Result<T> = std::result::Result<T, RysigError>;
