//! Rental aggregate - domain model and state transitions.
//!
//! This module re-exports types from `domain::rental`.
//! See that module for the actual implementations.

pub use crate::domain::rental::*;
