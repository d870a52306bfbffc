//! Aggregation view over a snapshot of rentals.
//!
//! Every function here borrows its input and returns references into it, in
//! input order. Nothing is mutated and nothing depends on ambient state: the
//! current day is passed in where it matters, so identical inputs always give
//! identical outputs.
//!
//! The functions accept any `IntoIterator<Item = &AnyRental>`, which lets a
//! surface chain them (filter by window, then search, then partition).

pub mod earnings;
pub mod partition;
pub mod search;
pub mod window;

pub use earnings::{EarningsSummary, EarningsWindow, compute_earnings, earned_on, earnings_report};
pub use partition::{
    AdminPartition, AdminSummary, BuyerPartition, Role, RolePartition, SellerPartition, is_ongoing,
    partition_admin, partition_buyer, partition_by_role, partition_seller,
};
pub use search::text_search;
pub use window::{DateRange, DateWindow, WindowParams, filter_by_date_window};
