//! Signature cipher resolution
//!
//! Raw player script text flows one way through this module: the classifier
//! names the three toolkit helpers, the recorder turns the driver's calls into
//! a [`Recipe`], and the recipe decrypts any signature of that script version.

pub mod classifier;
pub mod recipe;
pub mod recorder;
pub mod resolver;
pub mod script;

pub use classifier::*;
pub use recipe::*;
pub use recorder::*;
pub use resolver::*;
