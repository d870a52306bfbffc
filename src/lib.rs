//! Rental request lifecycle for a tool rental marketplace.
//!
//! A buyer requests a tool for a date range, the seller accepts or rejects it,
//! marks it collected once the rental has started and completed once it has
//! ended. This crate holds the rules for those steps and the read-side views the
//! buyer, seller and admin surfaces build from a listing of rentals:
//!
//! - [`rental`]: typed rental states, the transition validator and wire records
//! - [`aggregate`]: role partitions, date windows, search and earnings
//! - [`manager`]: the [`RentalStore`] seam, a remote store over the marketplace
//!   API, an in-memory store, and [`RentalManager`] in front of either
//!
//! "Today" always comes from a [`Clock`], so every date rule can be tested on a
//! fixed day.

pub mod aggregate;
pub mod clock;
pub mod config;
pub mod domain;
pub mod error;
pub mod http;
pub mod manager;
pub mod metrics;
pub mod rental;

// Re-export commonly used types
pub use aggregate::{DateRange, DateWindow, EarningsSummary, EarningsWindow, Role};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{ClientConfig, Session};
pub use error::{Result, ToolhireError};
pub use http::{ApiRequest, HttpClient, HttpResponse, MockHttpClient, ReqwestHttpClient};
pub use manager::memory::{InMemoryRentalStore, Product};
pub use manager::remote::RemoteRentalStore;
pub use manager::{AdminDashboard, BuyerDashboard, RentalManager, RentalStore, SellerDashboard};
#[cfg(feature = "prometheus")]
pub use metrics::ToolhireMetrics;
pub use rental::*;
