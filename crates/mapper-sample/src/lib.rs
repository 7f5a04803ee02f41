//! # Mapper Sample Library
//!
//! Typed models and the bootstrap used by the demo binary and the
//! integration tests.

pub mod lifecycle;
pub mod model;
