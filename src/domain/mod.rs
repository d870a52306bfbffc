//! Core domain types for the rental marketplace.
//!
//! Everything here is pure except the store-backed transitions, which reach
//! I/O only through the `RentalStore` trait:
//! - Rental typestate machine and transition validator
//! - Creation-time validation and pricing
//! - Wire records and command bodies exchanged with the API

pub mod rental;
