//! Error types for the rental lifecycle.

use chrono::NaiveDate;
use thiserror::Error;

use crate::rental::{Action, RentalId, RentalStatus};

/// Result type alias using the toolhire error type.
pub type Result<T> = std::result::Result<T, ToolhireError>;

/// Main error type for rental operations.
///
/// The first four variants are local decisions that block a submission before
/// anything is sent to the remote store. The rest describe what the remote
/// store (or the transport to it) reported back.
#[derive(Error, Debug)]
pub enum ToolhireError {
    /// Bad input shape (missing dates, non-positive quantity, missing rejection reason, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// The rental's status does not allow the requested action
    #[error("Invalid transition: rental {id} is {from}, cannot {action}")]
    InvalidTransition {
        id: RentalId,
        from: RentalStatus,
        action: Action,
    },

    /// The status allows the action, but the calendar does not yet
    #[error("Rental {id} cannot {action} before {eligible_on}")]
    NotYetEligible {
        id: RentalId,
        action: Action,
        eligible_on: NaiveDate,
    },

    /// Another mutation on the same rental has not finished yet
    #[error("Another update to rental {0} is still in progress")]
    MutationInFlight(RentalId),

    /// The rental does not exist (or is not visible to this session)
    #[error("Rental not found: {0}")]
    NotFound(RentalId),

    /// The session token was missing, expired or lacks the required role
    #[error("Not authorized")]
    Unauthorized,

    /// Remote API answered with a non-success status
    #[error("Remote API returned {status}: {message}")]
    Remote { status: u16, message: String },

    /// Transport-level failure
    #[error("HTTP request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// General error from anyhow
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ToolhireError {
    /// Shorthand for the most common validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        ToolhireError::Validation(message.into())
    }

    /// Returns true if the user may simply try the same action again.
    ///
    /// Nothing in this crate retries on its own; this only decides whether the
    /// surface shows a "try again" banner or an inline correction.
    pub fn is_retryable(&self) -> bool {
        match self {
            ToolhireError::Network(_) => true,
            ToolhireError::MutationInFlight(_) => true,
            ToolhireError::Remote { status, .. } => *status >= 500 || *status == 429,
            ToolhireError::Other(_) => true,
            ToolhireError::Validation(_)
            | ToolhireError::InvalidTransition { .. }
            | ToolhireError::NotYetEligible { .. }
            | ToolhireError::NotFound(_)
            | ToolhireError::Unauthorized
            | ToolhireError::Serialization(_) => false,
        }
    }

    /// Message suitable for showing to the person who triggered the action.
    pub fn user_message(&self) -> String {
        match self {
            ToolhireError::Validation(msg) => msg.clone(),
            ToolhireError::InvalidTransition { from, action, .. } => {
                format!("This rental is {} and can no longer be {}.", from.label(), action.past_tense())
            }
            ToolhireError::NotYetEligible {
                action,
                eligible_on,
                ..
            } => format!(
                "This rental can be {} from {}.",
                action.past_tense(),
                eligible_on.format("%d %b %Y")
            ),
            ToolhireError::MutationInFlight(_) => {
                "This rental is already being updated. Please wait.".to_string()
            }
            ToolhireError::NotFound(_) => "This rental could not be found.".to_string(),
            ToolhireError::Unauthorized => "Your session has expired. Please log in again.".to_string(),
            ToolhireError::Remote { status, message } if *status < 500 && !message.is_empty() => {
                message.clone()
            }
            ToolhireError::Remote { .. }
            | ToolhireError::Network(_)
            | ToolhireError::Serialization(_)
            | ToolhireError::Other(_) => {
                "Something went wrong while talking to the server. Please refresh and try again."
                    .to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_is_not_retryable() {
        let err = ToolhireError::validation("reason required");
        assert!(!err.is_retryable());
        assert_eq!(err.user_message(), "reason required");
        assert_eq!(err.to_string(), "Validation error: reason required");
    }

    #[test]
    fn test_remote_errors_retryable_only_on_server_side() {
        let server = ToolhireError::Remote {
            status: 503,
            message: "upstream down".to_string(),
        };
        assert!(server.is_retryable());
        assert!(server.user_message().contains("try again"));

        let client = ToolhireError::Remote {
            status: 409,
            message: "Request already processed".to_string(),
        };
        assert!(!client.is_retryable());
        assert_eq!(client.user_message(), "Request already processed");
    }

    #[test]
    fn test_not_yet_eligible_message_names_the_date() {
        let err = ToolhireError::NotYetEligible {
            id: RentalId::from("r-1"),
            action: Action::MarkCollected,
            eligible_on: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
        };
        assert_eq!(err.user_message(), "This rental can be collected from 01 Jun 2025.");
        assert!(err.to_string().contains("2025-06-01"));
    }

    #[test]
    fn test_invalid_transition_message() {
        let err = ToolhireError::InvalidTransition {
            id: RentalId::from("r-2"),
            from: RentalStatus::Rejected,
            action: Action::Approve,
        };
        assert_eq!(
            err.user_message(),
            "This rental is Rejected and can no longer be approved."
        );
    }
}
