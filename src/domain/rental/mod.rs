//! Rental aggregate - domain model and state transitions.
//!
//! - Rental types and states (typestate pattern)
//! - Pure transition validator with date gating
//! - Store-backed transitions
//! - New request validation and wire records

pub mod input;
pub mod state;
pub mod transitions;
pub mod validator;
pub mod wire;

pub use input::{NewRentalRequest, ProductListing, RentalQuote, quote, rental_days};
pub use state::*;
pub use validator::{Action, Command, check_transition, validate_rejection_reason};
pub use wire::{
    AdminFilter, AdminListing, AdminListingRecord, AdvanceTo, Decision, EarningsReport, Envelope,
    RentalRecord, SellerDecision, StatusAdvance, StatusGroup, StatusUpdate, decode_records,
    earnings_query,
};
