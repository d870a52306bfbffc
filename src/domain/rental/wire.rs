//! JSON shapes exchanged with the marketplace API.
//!
//! Records arrive flat (a status string plus every optional field); decoding
//! into [`AnyRental`] is where the record invariants are enforced, so nothing
//! downstream has to re-check them.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::aggregate::{AdminSummary, DateRange};
use crate::error::{Result, ToolhireError};

use super::input::rental_days;
use super::state::{
    Accepted, AnyRental, Collected, Completed, PartyRef, Pending, ProductRef, Rejected, Rental,
    RentalData, RentalId, RentalStatus,
};
use super::validator::{Action, Command, validate_rejection_reason};

/// A rental request as the API serializes it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalRecord {
    #[serde(alias = "_id")]
    pub id: RentalId,
    #[serde(alias = "productId")]
    pub product: ProductRef,
    #[serde(alias = "buyerId")]
    pub buyer: PartyRef,
    #[serde(default, alias = "sellerId", skip_serializing_if = "Option::is_none")]
    pub seller: Option<PartyRef>,
    /// Signed so that a bad value decodes and is reported as a validation error
    pub quantity: i64,
    #[serde(with = "flexible_date")]
    pub start_date: NaiveDate,
    #[serde(with = "flexible_date")]
    pub end_date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_days: Option<i64>,
    #[serde(alias = "totalPrice")]
    pub total_amount: Decimal,
    pub status: RentalStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl TryFrom<RentalRecord> for AnyRental {
    type Error = ToolhireError;

    fn try_from(record: RentalRecord) -> Result<Self> {
        let invalid = |msg: &str| {
            ToolhireError::validation(format!("rental {} is malformed: {}", record.id, msg))
        };

        let quantity = u32::try_from(record.quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or_else(|| invalid("quantity must be positive"))?;
        let total_days = rental_days(record.start_date, record.end_date)
            .map_err(|_| invalid("end date is before start date"))?;
        if let Some(reported) = record.total_days
            && reported != i64::from(total_days)
        {
            tracing::warn!(
                rental_id = %record.id,
                reported,
                computed = total_days,
                "Rental reports a different day count than its dates, using the dates"
            );
        }
        if record.total_amount.is_sign_negative() {
            return Err(invalid("total amount is negative"));
        }

        let reason = record
            .rejection_reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string);
        match (record.status, &reason) {
            (RentalStatus::Rejected, None) => return Err(invalid("rejected without a reason")),
            (status, Some(_)) if status != RentalStatus::Rejected => {
                return Err(invalid("rejection reason on a rental that is not rejected"));
            }
            _ => {}
        }
        if record.completed_at.is_some() && record.status != RentalStatus::Completed {
            return Err(invalid("completion time on a rental that is not completed"));
        }

        let data = RentalData {
            id: record.id,
            product: record.product,
            buyer: record.buyer,
            seller: record.seller,
            quantity,
            start_date: record.start_date,
            end_date: record.end_date,
            total_days,
            total_amount: record.total_amount,
            created_at: record.created_at,
        };

        Ok(match record.status {
            RentalStatus::Pending => Rental { data, state: Pending }.into(),
            RentalStatus::Accepted => Rental { data, state: Accepted }.into(),
            RentalStatus::Collected => Rental { data, state: Collected }.into(),
            RentalStatus::Rejected => Rental {
                data,
                state: Rejected {
                    rejection_reason: reason.unwrap_or_default(),
                },
            }
            .into(),
            RentalStatus::Completed => Rental {
                data,
                state: Completed {
                    completed_at: record.completed_at,
                },
            }
            .into(),
        })
    }
}

impl From<&AnyRental> for RentalRecord {
    fn from(rental: &AnyRental) -> Self {
        let data = rental.data();
        RentalRecord {
            id: data.id.clone(),
            product: data.product.clone(),
            buyer: data.buyer.clone(),
            seller: data.seller.clone(),
            quantity: i64::from(data.quantity),
            start_date: data.start_date,
            end_date: data.end_date,
            total_days: Some(i64::from(data.total_days)),
            total_amount: data.total_amount,
            status: rental.status(),
            rejection_reason: rental.rejection_reason().map(str::to_string),
            created_at: data.created_at,
            completed_at: rental.completed_at(),
        }
    }
}

/// Decode a whole listing; one malformed record fails the listing.
pub fn decode_records(records: Vec<RentalRecord>) -> Result<Vec<AnyRental>> {
    records.into_iter().map(AnyRental::try_from).collect()
}

/// The API wraps some payloads in `{ "data": ... }` and returns others bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> Envelope<T> {
    pub fn into_inner(self) -> T {
        match self {
            Envelope::Wrapped { data } => data,
            Envelope::Bare(inner) => inner,
        }
    }
}

// ============================================================================
// Commands
// ============================================================================

/// Seller's decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Accepted,
    Rejected,
}

/// Body of the seller action endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerDecision {
    pub action: Decision,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
}

impl SellerDecision {
    pub fn accept() -> Self {
        SellerDecision {
            action: Decision::Accepted,
            rejection_reason: None,
        }
    }

    pub fn reject(reason: &str) -> Result<Self> {
        Ok(SellerDecision {
            action: Decision::Rejected,
            rejection_reason: Some(validate_rejection_reason(reason)?),
        })
    }

    /// Shape check for a decision received from elsewhere.
    pub fn validate(&self) -> Result<()> {
        match (self.action, self.rejection_reason.as_deref()) {
            (Decision::Rejected, Some(reason)) => validate_rejection_reason(reason).map(|_| ()),
            (Decision::Rejected, None) => Err(ToolhireError::validation("reason required")),
            (Decision::Accepted, _) => Ok(()),
        }
    }

    pub fn to_command(&self) -> Result<Command> {
        self.validate()?;
        Ok(match self.action {
            Decision::Accepted => Command::Approve,
            Decision::Rejected => Command::Reject {
                reason: self.rejection_reason.clone().unwrap_or_default(),
            },
        })
    }
}

/// Status a seller can advance an accepted rental to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AdvanceTo {
    Collected,
    Completed,
}

/// Body of the seller status-advance endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusAdvance {
    pub status: AdvanceTo,
}

impl StatusAdvance {
    pub fn collected() -> Self {
        StatusAdvance {
            status: AdvanceTo::Collected,
        }
    }

    pub fn completed() -> Self {
        StatusAdvance {
            status: AdvanceTo::Completed,
        }
    }

    pub fn action(&self) -> Action {
        match self.status {
            AdvanceTo::Collected => Action::MarkCollected,
            AdvanceTo::Completed => Action::MarkCompleted,
        }
    }

    pub fn to_command(&self) -> Command {
        match self.status {
            AdvanceTo::Collected => Command::MarkCollected,
            AdvanceTo::Completed => Command::MarkCompleted,
        }
    }
}

/// What the command endpoints answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: RentalStatus,
}

// ============================================================================
// Admin and earnings
// ============================================================================

/// Status group understood by the admin listing endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusGroup {
    Ongoing,
    Completed,
}

/// Optional filter body of the admin listing endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_group: Option<StatusGroup>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
}

impl AdminFilter {
    pub fn is_empty(&self) -> bool {
        *self == AdminFilter::default()
    }
}

/// Admin listing response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminListingRecord {
    pub data: Vec<RentalRecord>,
    pub summary: AdminSummary,
}

/// Decoded admin listing.
#[derive(Debug, Clone, Default)]
pub struct AdminListing {
    pub rentals: Vec<AnyRental>,
    pub summary: AdminSummary,
}

impl TryFrom<AdminListingRecord> for AdminListing {
    type Error = ToolhireError;

    fn try_from(record: AdminListingRecord) -> Result<Self> {
        Ok(AdminListing {
            rentals: decode_records(record.data)?,
            summary: record.summary,
        })
    }
}

/// Seller earnings as reported by the API (rupees).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsReport {
    #[serde(default)]
    pub total_income: Decimal,
    #[serde(default)]
    pub monthly_income: Decimal,
    #[serde(default)]
    pub yearly_income: Decimal,
    #[serde(default)]
    pub total_rentals: u64,
}

/// Query parameters of the earnings endpoint.
pub fn earnings_query(range: Option<&DateRange>) -> Vec<(String, String)> {
    match range {
        Some(range) => vec![
            ("startDate".to_string(), range.start.format("%Y-%m-%d").to_string()),
            ("endDate".to_string(), range.end.format("%Y-%m-%d").to_string()),
        ],
        None => Vec::new(),
    }
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp (taken as its UTC day).
pub mod flexible_date {
    use chrono::{DateTime, NaiveDate, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.format("%Y-%m-%d").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid date: {}", raw)))
    }

    pub fn parse(raw: &str) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok().or_else(|| {
            DateTime::parse_from_rfc3339(raw)
                .ok()
                .map(|dt| dt.with_timezone(&Utc).date_naive())
        })
    }
}
