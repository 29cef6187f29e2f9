//! Video platform client, player script retrieval and signature deciphering

pub mod client;
pub mod decipher;
pub mod player;

pub use client::*;
pub use decipher::*;
pub use player::*;
