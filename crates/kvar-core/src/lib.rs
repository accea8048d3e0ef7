//! # kvar-core
//!
//! Core types, taxonomy, and trait definitions for the kvar issue triage
//! engine.
//!
//! This crate provides the data structures that every other kvar crate
//! depends on: the closed category/priority/room taxonomy, request and result
//! types, the error taxonomy, and the analyzer traits implemented by
//! `kvar-inference`.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod taxonomy;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{AnalysisError, Error, Result};
pub use models::*;
pub use taxonomy::{
    is_valid_category, is_valid_priority, is_valid_room, Category, Priority, Room,
};
pub use traits::*;
