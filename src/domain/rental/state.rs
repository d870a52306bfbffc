//! Core types for the rental lifecycle.
//!
//! Each rental request progresses through distinct states. The typed form
//! `Rental<State>` makes the per-state data (a rejection reason, a completion
//! timestamp) exist only where it is meaningful; `AnyRental` holds a rental in
//! whichever state the store reported.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Flat status of a rental, as stored and transmitted by the marketplace API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RentalStatus {
    Pending,
    Accepted,
    Rejected,
    Collected,
    Completed,
}

/// Visual tone a surface should use for a status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTone {
    Warning,
    Info,
    Accent,
    Success,
    Danger,
}

impl RentalStatus {
    pub const ALL: [RentalStatus; 5] = [
        RentalStatus::Pending,
        RentalStatus::Accepted,
        RentalStatus::Rejected,
        RentalStatus::Collected,
        RentalStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RentalStatus::Pending => "PENDING",
            RentalStatus::Accepted => "ACCEPTED",
            RentalStatus::Rejected => "REJECTED",
            RentalStatus::Collected => "COLLECTED",
            RentalStatus::Completed => "COMPLETED",
        }
    }

    /// Terminal statuses have no outgoing transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RentalStatus::Rejected | RentalStatus::Completed)
    }

    /// Human readable label shared by the buyer, seller and admin surfaces.
    pub fn label(&self) -> &'static str {
        match self {
            RentalStatus::Pending => "Pending",
            RentalStatus::Accepted => "Accepted",
            RentalStatus::Rejected => "Rejected",
            RentalStatus::Collected => "Collected",
            RentalStatus::Completed => "Completed",
        }
    }

    pub fn tone(&self) -> StatusTone {
        match self {
            RentalStatus::Pending => StatusTone::Warning,
            RentalStatus::Accepted => StatusTone::Info,
            RentalStatus::Collected => StatusTone::Accent,
            RentalStatus::Completed => StatusTone::Success,
            RentalStatus::Rejected => StatusTone::Danger,
        }
    }
}

impl std::fmt::Display for RentalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RentalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PENDING" => Ok(RentalStatus::Pending),
            "ACCEPTED" => Ok(RentalStatus::Accepted),
            "REJECTED" => Ok(RentalStatus::Rejected),
            "COLLECTED" => Ok(RentalStatus::Collected),
            "COMPLETED" => Ok(RentalStatus::Completed),
            _ => Err(format!("Invalid rental status: {}", s)),
        }
    }
}

/// Marker trait for valid rental states.
pub trait RentalState: Send + Sync {
    /// The flat status this state corresponds to.
    const STATUS: RentalStatus;
}

/// A rental request in a specific lifecycle state.
#[derive(Debug, Clone, Serialize)]
pub struct Rental<T: RentalState> {
    /// The current state of the rental.
    pub state: T,
    /// The data fixed when the request was created.
    pub data: RentalData,
}

impl<T: RentalState> Rental<T> {
    pub fn id(&self) -> &RentalId {
        &self.data.id
    }

    pub fn status(&self) -> RentalStatus {
        T::STATUS
    }
}

/// Data captured when the buyer created the request. Never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RentalData {
    pub id: RentalId,
    pub product: ProductRef,
    pub buyer: PartyRef,
    /// Not every listing embeds the seller (the buyer's view often omits it)
    pub seller: Option<PartyRef>,
    pub quantity: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Inclusive day count of `start_date..=end_date`
    pub total_days: u32,
    /// `total_days * quantity * price_per_day`, priced at creation (rupees)
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// The product a rental refers to. Owned by the remote catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRef {
    #[serde(alias = "_id")]
    pub id: ProductId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    /// Rupees per unit per day
    #[serde(alias = "price")]
    pub price_per_day: Decimal,
}

/// A buyer or seller as embedded in a rental record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartyRef {
    #[serde(alias = "_id")]
    pub id: UserId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

// ============================================================================
// Rental States
// ============================================================================

/// Waiting for the seller to accept or reject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pending;

impl RentalState for Pending {
    const STATUS: RentalStatus = RentalStatus::Pending;
}

/// Seller accepted; the buyer has not picked the tools up yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Accepted;

impl RentalState for Accepted {
    const STATUS: RentalStatus = RentalStatus::Accepted;
}

/// Seller rejected the request (terminal).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Rejected {
    /// Always non-empty
    pub rejection_reason: String,
}

impl RentalState for Rejected {
    const STATUS: RentalStatus = RentalStatus::Rejected;
}

/// The buyer has the tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Collected;

impl RentalState for Collected {
    const STATUS: RentalStatus = RentalStatus::Collected;
}

/// Tools returned and the rental closed (terminal).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completed {
    /// Older records may lack this; earnings fall back to `created_at`.
    pub completed_at: Option<DateTime<Utc>>,
}

impl RentalState for Completed {
    const STATUS: RentalStatus = RentalStatus::Completed;
}

// ============================================================================
// Identifiers
// ============================================================================

/// Opaque identifier of a rental request, assigned by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RentalId(pub String);

impl std::fmt::Display for RentalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RentalId {
    fn from(s: &str) -> Self {
        RentalId(s.to_string())
    }
}

impl From<String> for RentalId {
    fn from(s: String) -> Self {
        RentalId(s)
    }
}

impl std::ops::Deref for RentalId {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// Identifier of a catalogue product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(s: &str) -> Self {
        ProductId(s.to_string())
    }
}

/// Identifier of a marketplace user (buyer, seller or admin).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId(s.to_string())
    }
}

// ============================================================================
// Unified Rental Representation
// ============================================================================

/// Enum that can hold a rental in any state.
///
/// Listings come back from the store in mixed states, so the aggregation view
/// and the dashboards work over this type.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "state", content = "rental")]
pub enum AnyRental {
    Pending(Rental<Pending>),
    Accepted(Rental<Accepted>),
    Rejected(Rental<Rejected>),
    Collected(Rental<Collected>),
    Completed(Rental<Completed>),
}

impl AnyRental {
    /// Get the rental ID regardless of state.
    pub fn id(&self) -> &RentalId {
        &self.data().id
    }

    /// Get the rental data regardless of state.
    pub fn data(&self) -> &RentalData {
        match self {
            AnyRental::Pending(r) => &r.data,
            AnyRental::Accepted(r) => &r.data,
            AnyRental::Rejected(r) => &r.data,
            AnyRental::Collected(r) => &r.data,
            AnyRental::Completed(r) => &r.data,
        }
    }

    pub fn status(&self) -> RentalStatus {
        match self {
            AnyRental::Pending(_) => RentalStatus::Pending,
            AnyRental::Accepted(_) => RentalStatus::Accepted,
            AnyRental::Rejected(_) => RentalStatus::Rejected,
            AnyRental::Collected(_) => RentalStatus::Collected,
            AnyRental::Completed(_) => RentalStatus::Completed,
        }
    }

    /// Check if this rental is in a terminal state (Rejected or Completed).
    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    pub fn rejection_reason(&self) -> Option<&str> {
        match self {
            AnyRental::Rejected(r) => Some(&r.state.rejection_reason),
            _ => None,
        }
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            AnyRental::Completed(r) => r.state.completed_at,
            _ => None,
        }
    }

    /// Try to take as a Pending rental, consuming self.
    pub fn into_pending(self) -> Option<Rental<Pending>> {
        match self {
            AnyRental::Pending(r) => Some(r),
            _ => None,
        }
    }

    /// Try to take as an Accepted rental, consuming self.
    pub fn into_accepted(self) -> Option<Rental<Accepted>> {
        match self {
            AnyRental::Accepted(r) => Some(r),
            _ => None,
        }
    }

    /// Try to take as a Collected rental, consuming self.
    pub fn into_collected(self) -> Option<Rental<Collected>> {
        match self {
            AnyRental::Collected(r) => Some(r),
            _ => None,
        }
    }
}

// Conversion traits for going from typed Rental to AnyRental

impl From<Rental<Pending>> for AnyRental {
    fn from(r: Rental<Pending>) -> Self {
        AnyRental::Pending(r)
    }
}

impl From<Rental<Accepted>> for AnyRental {
    fn from(r: Rental<Accepted>) -> Self {
        AnyRental::Accepted(r)
    }
}

impl From<Rental<Rejected>> for AnyRental {
    fn from(r: Rental<Rejected>) -> Self {
        AnyRental::Rejected(r)
    }
}

impl From<Rental<Collected>> for AnyRental {
    fn from(r: Rental<Collected>) -> Self {
        AnyRental::Collected(r)
    }
}

impl From<Rental<Completed>> for AnyRental {
    fn from(r: Rental<Completed>) -> Self {
        AnyRental::Completed(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trips_through_wire_names() {
        for status in RentalStatus::ALL {
            let parsed: RentalStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert_eq!("collected".parse::<RentalStatus>().unwrap(), RentalStatus::Collected);
        assert!("CANCELLED".parse::<RentalStatus>().is_err());
    }

    #[test]
    fn test_terminal_statuses() {
        let terminal: Vec<_> = RentalStatus::ALL
            .into_iter()
            .filter(RentalStatus::is_terminal)
            .collect();
        assert_eq!(terminal, vec![RentalStatus::Rejected, RentalStatus::Completed]);
    }

    #[test]
    fn test_status_serializes_screaming_case() {
        let json = serde_json::to_string(&RentalStatus::Collected).unwrap();
        assert_eq!(json, r#""COLLECTED""#);
        assert_eq!(RentalStatus::Rejected.tone(), StatusTone::Danger);
    }
}
