//! MirrorLink platform core contracts.
//!
//! This crate contains the display/capture data structures and collaborator
//! traits used by the engine without coupling to a concrete OS backend.

pub mod mode;
pub mod traits;
pub mod types;

pub use mode::{rank_modes, Mode};
pub use traits::*;
pub use types::*;
