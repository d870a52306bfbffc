//! Store-backed state transitions for rentals.
//!
//! Each transition runs the local checks first, asks the store to apply the
//! change, and only then moves the rental into its next typestate:
//!
//! ```text
//! Rental<Pending> ──approve()──> Rental<Accepted> ──mark_collected()──> Rental<Collected>
//!       │                                                                     │
//!       └──reject(reason)──> Rental<Rejected>          mark_completed()──────┘
//!                                                              │
//!                                                              v
//!                                                       Rental<Completed>
//! ```
//!
//! `mark_collected` is only accepted from the rental's start date onwards and
//! `mark_completed` from its end date onwards. A rejection needs a non-blank
//! reason. When a check fails the store is never contacted.

use metrics::counter;

use crate::{
    ToolhireError,
    clock::Clock,
    error::Result,
    manager::RentalStore,
};

use super::state::{Accepted, AnyRental, Collected, Completed, Pending, Rejected, Rental, RentalId, RentalStatus};
use super::validator::{Action, Command, check_transition};
use super::wire::{SellerDecision, StatusAdvance};

impl Rental<Pending> {
    pub async fn approve<S: RentalStore + ?Sized>(self, store: &S) -> Result<Rental<Accepted>> {
        let status = store.submit_decision(self.id(), &SellerDecision::accept()).await?;
        confirm(self.id(), Action::Approve, status)?;
        Ok(self.accepted())
    }

    pub async fn reject<S: RentalStore + ?Sized>(
        self,
        reason: &str,
        store: &S,
    ) -> Result<Rental<Rejected>> {
        let decision = match SellerDecision::reject(reason) {
            Ok(decision) => decision,
            Err(e) => {
                record_denied(Action::Reject, &e);
                return Err(e);
            }
        };
        let status = store.submit_decision(self.id(), &decision).await?;
        confirm(self.id(), Action::Reject, status)?;
        self.rejected(reason)
    }
}

impl Rental<Accepted> {
    pub async fn mark_collected<S, C>(self, clock: &C, store: &S) -> Result<Rental<Collected>>
    where
        S: RentalStore + ?Sized,
        C: Clock + ?Sized,
    {
        let today = clock.today();
        if let Err(e) = check_transition(RentalStatus::Accepted, &self.data, Action::MarkCollected, today) {
            record_denied(Action::MarkCollected, &e);
            return Err(e);
        }

        let status = store.advance_status(self.id(), StatusAdvance::collected()).await?;
        confirm(self.id(), Action::MarkCollected, status)?;
        self.collected(today)
    }
}

impl Rental<Collected> {
    pub async fn mark_completed<S, C>(self, clock: &C, store: &S) -> Result<Rental<Completed>>
    where
        S: RentalStore + ?Sized,
        C: Clock + ?Sized,
    {
        let today = clock.today();
        if let Err(e) = check_transition(RentalStatus::Collected, &self.data, Action::MarkCompleted, today) {
            record_denied(Action::MarkCompleted, &e);
            return Err(e);
        }

        let status = store.advance_status(self.id(), StatusAdvance::completed()).await?;
        confirm(self.id(), Action::MarkCompleted, status)?;
        self.completed(today, clock.now())
    }
}

impl AnyRental {
    /// Run `command` against the store, dispatching on the rental's current state.
    ///
    /// The status is checked before anything else so a stale view of the rental
    /// fails locally with [`ToolhireError::InvalidTransition`].
    pub async fn execute<S, C>(self, command: &Command, clock: &C, store: &S) -> Result<AnyRental>
    where
        S: RentalStore + ?Sized,
        C: Clock + ?Sized,
    {
        let action = command.action();
        if self.status() != action.required_status() {
            let e = ToolhireError::InvalidTransition {
                id: self.id().clone(),
                from: self.status(),
                action,
            };
            record_denied(action, &e);
            return Err(e);
        }

        let result: Result<AnyRental> = match (self, command) {
            (AnyRental::Pending(r), Command::Approve) => r.approve(store).await.map(Into::into),
            (AnyRental::Pending(r), Command::Reject { reason }) => {
                r.reject(reason, store).await.map(Into::into)
            }
            (AnyRental::Accepted(r), Command::MarkCollected) => {
                r.mark_collected(clock, store).await.map(Into::into)
            }
            (AnyRental::Collected(r), Command::MarkCompleted) => {
                r.mark_completed(clock, store).await.map(Into::into)
            }
            (other, _) => Err(ToolhireError::InvalidTransition {
                id: other.id().clone(),
                from: other.status(),
                action,
            }),
        };

        match &result {
            Ok(rental) => {
                tracing::info!(rental_id = %rental.id(), action = %action, status = %rental.status(), "Rental updated");
                counter!(
                    "toolhire_transitions_total",
                    "action" => action.as_str(),
                    "outcome" => "applied"
                )
                .increment(1);
            }
            Err(e) => {
                tracing::warn!(action = %action, error = %e, "Rental update failed");
                counter!(
                    "toolhire_transitions_total",
                    "action" => action.as_str(),
                    "outcome" => "failed"
                )
                .increment(1);
            }
        }
        result
    }
}

/// The store must land the rental exactly where the action says it goes.
fn confirm(id: &RentalId, action: Action, status: RentalStatus) -> Result<()> {
    if status == action.target_status() {
        return Ok(());
    }
    tracing::error!(
        rental_id = %id,
        action = %action,
        expected = %action.target_status(),
        reported = %status,
        "Store reported an unexpected status after update"
    );
    Err(anyhow::anyhow!(
        "rental {} is {} after {}, expected {}",
        id,
        status,
        action,
        action.target_status()
    )
    .into())
}

fn record_denied(action: Action, error: &ToolhireError) {
    let reason = match error {
        ToolhireError::InvalidTransition { .. } => "invalid_transition",
        ToolhireError::NotYetEligible { .. } => "not_yet_eligible",
        ToolhireError::Validation(_) => "validation",
        _ => return,
    };
    tracing::debug!(action = %action, reason, "Transition denied locally");
    counter!(
        "toolhire_transition_denied_total",
        "action" => action.as_str(),
        "reason" => reason
    )
    .increment(1);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use parking_lot::Mutex;

    use super::*;
    use crate::aggregate::DateRange;
    use crate::clock::FixedClock;
    use crate::domain::rental::test_support::{date, rental_in, sample_data};
    use crate::rental::{AdminFilter, AdminListing, Decision, EarningsReport, NewRentalRequest};

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Decision(RentalId, SellerDecision),
        Advance(RentalId, StatusAdvance),
    }

    /// Records calls and echoes back whatever status it is told to report.
    #[derive(Default)]
    struct RecordingStore {
        calls: Mutex<Vec<Call>>,
        report: Mutex<Option<RentalStatus>>,
    }

    impl RecordingStore {
        fn calls(&self) -> Vec<Call> {
            self.calls.lock().clone()
        }

        fn reporting(status: RentalStatus) -> Self {
            let store = Self::default();
            *store.report.lock() = Some(status);
            store
        }
    }

    #[async_trait]
    impl RentalStore for RecordingStore {
        async fn list_buyer_rentals(&self) -> Result<Vec<AnyRental>> {
            Ok(Vec::new())
        }

        async fn list_seller_rentals(&self) -> Result<Vec<AnyRental>> {
            Ok(Vec::new())
        }

        async fn list_admin_rentals(&self, _filter: &AdminFilter) -> Result<AdminListing> {
            Ok(AdminListing::default())
        }

        async fn earnings(&self, _range: Option<DateRange>) -> Result<EarningsReport> {
            Ok(EarningsReport::default())
        }

        async fn create_rental(&self, _request: &NewRentalRequest) -> Result<AnyRental> {
            Err(ToolhireError::validation("not supported"))
        }

        async fn submit_decision(&self, id: &RentalId, decision: &SellerDecision) -> Result<RentalStatus> {
            self.calls.lock().push(Call::Decision(id.clone(), decision.clone()));
            Ok(self.report.lock().unwrap_or(match decision.action {
                Decision::Accepted => RentalStatus::Accepted,
                Decision::Rejected => RentalStatus::Rejected,
            }))
        }

        async fn advance_status(&self, id: &RentalId, advance: StatusAdvance) -> Result<RentalStatus> {
            self.calls.lock().push(Call::Advance(id.clone(), advance));
            Ok(self.report.lock().unwrap_or(advance.action().target_status()))
        }
    }

    fn accepted(start: chrono::NaiveDate, end: chrono::NaiveDate) -> Rental<Accepted> {
        rental_in(RentalStatus::Accepted, sample_data("r-1", start, end))
            .into_accepted()
            .unwrap()
    }

    #[tokio::test]
    async fn test_approve_sends_accept_decision() {
        let store = RecordingStore::default();
        let pending = rental_in(RentalStatus::Pending, sample_data("r-1", date(2025, 6, 1), date(2025, 6, 3)))
            .into_pending()
            .unwrap();

        let accepted = pending.approve(&store).await.unwrap();

        assert_eq!(accepted.status(), RentalStatus::Accepted);
        assert_eq!(
            store.calls(),
            vec![Call::Decision(RentalId::from("r-1"), SellerDecision::accept())]
        );
    }

    #[tokio::test]
    async fn test_reject_with_blank_reason_never_reaches_store() {
        let store = RecordingStore::default();
        let pending = rental_in(RentalStatus::Pending, sample_data("r-1", date(2025, 6, 1), date(2025, 6, 3)))
            .into_pending()
            .unwrap();

        let err = pending.reject("   ", &store).await.unwrap_err();

        assert!(matches!(err, ToolhireError::Validation(ref msg) if msg == "reason required"));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_reject_trims_reason() {
        let store = RecordingStore::default();
        let pending = rental_in(RentalStatus::Pending, sample_data("r-1", date(2025, 6, 1), date(2025, 6, 3)))
            .into_pending()
            .unwrap();

        let rejected = pending.reject("  out of stock ", &store).await.unwrap();

        assert_eq!(rejected.state.rejection_reason, "out of stock");
        let Call::Decision(_, decision) = &store.calls()[0] else {
            panic!("expected a decision call");
        };
        assert_eq!(decision.rejection_reason.as_deref(), Some("out of stock"));
    }

    #[tokio::test]
    async fn test_collect_before_start_date_is_gated_locally() {
        let store = RecordingStore::default();
        let clock = FixedClock::on(date(2025, 5, 31));

        let err = accepted(date(2025, 6, 1), date(2025, 6, 3))
            .mark_collected(&clock, &store)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ToolhireError::NotYetEligible { eligible_on, .. } if eligible_on == date(2025, 6, 1)
        ));
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_collect_on_start_date_then_complete_on_end_date() {
        let store = RecordingStore::default();
        let clock = FixedClock::on(date(2025, 6, 1));

        let collected = accepted(date(2025, 6, 1), date(2025, 6, 3))
            .mark_collected(&clock, &store)
            .await
            .unwrap();
        assert_eq!(collected.status(), RentalStatus::Collected);

        // a day early
        clock.set_date(date(2025, 6, 2));
        let early = collected.clone().mark_completed(&clock, &store).await;
        assert!(matches!(early, Err(ToolhireError::NotYetEligible { .. })));

        clock.set_date(date(2025, 6, 3));
        let completed = collected.mark_completed(&clock, &store).await.unwrap();
        assert_eq!(completed.state.completed_at, Some(clock.now()));
        assert_eq!(
            store.calls(),
            vec![
                Call::Advance(RentalId::from("r-1"), StatusAdvance::collected()),
                Call::Advance(RentalId::from("r-1"), StatusAdvance::completed()),
            ]
        );
    }

    #[tokio::test]
    async fn test_unexpected_store_status_is_an_error() {
        let store = RecordingStore::reporting(RentalStatus::Pending);
        let pending = rental_in(RentalStatus::Pending, sample_data("r-1", date(2025, 6, 1), date(2025, 6, 3)))
            .into_pending()
            .unwrap();

        let err = pending.approve(&store).await.unwrap_err();
        assert!(matches!(err, ToolhireError::Other(_)));
    }

    #[tokio::test]
    async fn test_execute_rejects_stale_status_without_contacting_store() {
        let store = Arc::new(RecordingStore::default());
        let clock = FixedClock::on(date(2025, 6, 10));
        let completed = rental_in(RentalStatus::Completed, sample_data("r-1", date(2025, 6, 1), date(2025, 6, 3)));

        for command in [Command::Approve, Command::MarkCollected, Command::MarkCompleted] {
            let err = completed
                .clone()
                .execute(&command, &clock, store.as_ref())
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                ToolhireError::InvalidTransition { from: RentalStatus::Completed, .. }
            ));
        }
        assert!(store.calls().is_empty());
    }

    #[tokio::test]
    async fn test_execute_dispatches_on_state() {
        let store = RecordingStore::default();
        let clock = FixedClock::on(date(2025, 6, 1));
        let accepted = rental_in(RentalStatus::Accepted, sample_data("r-1", date(2025, 6, 1), date(2025, 6, 3)));

        let next = accepted
            .execute(&Command::MarkCollected, &clock, &store)
            .await
            .unwrap();
        assert_eq!(next.status(), RentalStatus::Collected);
    }
}
