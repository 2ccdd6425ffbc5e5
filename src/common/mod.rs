//! Common types and collaborator interfaces
//!
//! Shared by every game variant and the randomness layer.

pub mod types;
pub mod traits;
