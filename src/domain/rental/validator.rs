//! Status transition validator.
//!
//! The lifecycle is a small state machine with two date gates:
//!
//! ```text
//! PENDING ──approve──> ACCEPTED ──mark_collected──> COLLECTED ──mark_completed──> COMPLETED
//!    │                          (today >= start_date)            (today >= end_date)
//!    └──reject(reason)──> REJECTED
//! ```
//!
//! Everything here is pure: the same check decides whether a surface enables
//! an action button ([`AnyRental::can`]) and whether a mutation may be sent to
//! the store at all ([`AnyRental::check`]). Status is checked before dates, so
//! a request in the wrong status always reports `InvalidTransition` even if its
//! dates would also block it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ToolhireError};

use super::state::{
    Accepted, AnyRental, Collected, Completed, Pending, Rejected, Rental, RentalData, RentalStatus,
};

/// An action a seller can take on a rental.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Approve,
    Reject,
    MarkCollected,
    MarkCompleted,
}

impl Action {
    pub const ALL: [Action; 4] = [
        Action::Approve,
        Action::Reject,
        Action::MarkCollected,
        Action::MarkCompleted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Approve => "approve",
            Action::Reject => "reject",
            Action::MarkCollected => "mark_collected",
            Action::MarkCompleted => "mark_completed",
        }
    }

    pub fn past_tense(&self) -> &'static str {
        match self {
            Action::Approve => "approved",
            Action::Reject => "rejected",
            Action::MarkCollected => "collected",
            Action::MarkCompleted => "completed",
        }
    }

    /// The only status this action may be taken from.
    pub fn required_status(&self) -> RentalStatus {
        match self {
            Action::Approve | Action::Reject => RentalStatus::Pending,
            Action::MarkCollected => RentalStatus::Accepted,
            Action::MarkCompleted => RentalStatus::Collected,
        }
    }

    pub fn target_status(&self) -> RentalStatus {
        match self {
            Action::Approve => RentalStatus::Accepted,
            Action::Reject => RentalStatus::Rejected,
            Action::MarkCollected => RentalStatus::Collected,
            Action::MarkCompleted => RentalStatus::Completed,
        }
    }

    /// First day on which the action becomes legal for the given rental, if gated.
    pub fn eligible_from(&self, data: &RentalData) -> Option<NaiveDate> {
        match self {
            Action::Approve | Action::Reject => None,
            Action::MarkCollected => Some(data.start_date),
            Action::MarkCompleted => Some(data.end_date),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An action together with the input it needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Approve,
    Reject { reason: String },
    MarkCollected,
    MarkCompleted,
}

impl Command {
    pub fn action(&self) -> Action {
        match self {
            Command::Approve => Action::Approve,
            Command::Reject { .. } => Action::Reject,
            Command::MarkCollected => Action::MarkCollected,
            Command::MarkCompleted => Action::MarkCompleted,
        }
    }
}

/// Check `action` against a rental's status and dates.
///
/// Returns the status the rental would move to.
pub fn check_transition(
    status: RentalStatus,
    data: &RentalData,
    action: Action,
    today: NaiveDate,
) -> Result<RentalStatus> {
    if status != action.required_status() {
        return Err(ToolhireError::InvalidTransition {
            id: data.id.clone(),
            from: status,
            action,
        });
    }

    if let Some(eligible_on) = action.eligible_from(data)
        && today < eligible_on
    {
        return Err(ToolhireError::NotYetEligible {
            id: data.id.clone(),
            action,
            eligible_on,
        });
    }

    Ok(action.target_status())
}

/// Normalize a rejection reason, failing if nothing is left after trimming.
pub fn validate_rejection_reason(reason: &str) -> Result<String> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(ToolhireError::validation("reason required"));
    }
    Ok(trimmed.to_string())
}

impl AnyRental {
    /// Check whether `action` may be taken today, without side effects.
    pub fn check(&self, action: Action, today: NaiveDate) -> Result<RentalStatus> {
        check_transition(self.status(), self.data(), action, today)
    }

    /// Boolean form of [`AnyRental::check`], for enabling buttons.
    pub fn can(&self, action: Action, today: NaiveDate) -> bool {
        self.check(action, today).is_ok()
    }

    /// Actions currently legal for this rental, in lifecycle order.
    pub fn permitted_actions(&self, today: NaiveDate) -> Vec<Action> {
        Action::ALL
            .into_iter()
            .filter(|action| self.can(*action, today))
            .collect()
    }

    /// Apply a command locally, producing the rental in its next state.
    ///
    /// `now` stamps `completed_at` when the command completes the rental.
    pub fn apply(self, command: &Command, today: NaiveDate, now: DateTime<Utc>) -> Result<AnyRental> {
        self.check(command.action(), today)?;

        let next = match (self, command) {
            (AnyRental::Pending(r), Command::Approve) => r.accepted().into(),
            (AnyRental::Pending(r), Command::Reject { reason }) => r.rejected(reason)?.into(),
            (AnyRental::Accepted(r), Command::MarkCollected) => r.collected(today)?.into(),
            (AnyRental::Collected(r), Command::MarkCompleted) => r.completed(today, now)?.into(),
            (other, command) => {
                // check() already rejected every other pairing
                return Err(ToolhireError::InvalidTransition {
                    id: other.id().clone(),
                    from: other.status(),
                    action: command.action(),
                });
            }
        };
        Ok(next)
    }
}

// Pure typestate transitions. The async, store-backed versions live in
// `transitions.rs` and delegate to these once the store has agreed.

impl Rental<Pending> {
    pub fn accepted(self) -> Rental<Accepted> {
        Rental {
            data: self.data,
            state: Accepted,
        }
    }

    pub fn rejected(self, reason: &str) -> Result<Rental<Rejected>> {
        let rejection_reason = validate_rejection_reason(reason)?;
        Ok(Rental {
            data: self.data,
            state: Rejected { rejection_reason },
        })
    }
}

impl Rental<Accepted> {
    pub fn collected(self, today: NaiveDate) -> Result<Rental<Collected>> {
        check_transition(RentalStatus::Accepted, &self.data, Action::MarkCollected, today)?;
        Ok(Rental {
            data: self.data,
            state: Collected,
        })
    }
}

impl Rental<Collected> {
    pub fn completed(self, today: NaiveDate, now: DateTime<Utc>) -> Result<Rental<Completed>> {
        check_transition(RentalStatus::Collected, &self.data, Action::MarkCompleted, today)?;
        Ok(Rental {
            data: self.data,
            state: Completed {
                completed_at: Some(now),
            },
        })
    }
}
