//! Core types shared across the runtime

pub mod error;
pub mod types;
