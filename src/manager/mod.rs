//! Main traits for the rental lifecycle.
//!
//! `RentalStore` is the persistence seam: the remote marketplace API in
//! production ([`remote::RemoteRentalStore`]) or an in-process store
//! ([`memory::InMemoryRentalStore`]). `RentalManager` sits in front of a store
//! and is what the buyer, seller and admin surfaces talk to.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::aggregate::{
    AdminSummary, DateRange, DateWindow, EarningsSummary, EarningsWindow, compute_earnings, partition_admin,
    partition_buyer, partition_seller, text_search,
};
use crate::clock::{Clock, SystemClock};
use crate::error::{Result, ToolhireError};
#[cfg(feature = "prometheus")]
use crate::metrics::ToolhireMetrics;
use crate::rental::{
    Action, AdminFilter, AdminListing, AnyRental, Command, EarningsReport, NewRentalRequest, RentalId,
    RentalStatus, SellerDecision, StatusAdvance,
};

pub mod memory;
pub mod remote;

/// Storage trait for reading and mutating rentals.
///
/// Mutations report the status the rental ended up in. Implementations are
/// the authority on whether a change is allowed; callers check locally first
/// so that most refusals never reach the store.
#[async_trait]
pub trait RentalStore: Send + Sync {
    /// All rentals requested by the current buyer.
    async fn list_buyer_rentals(&self) -> Result<Vec<AnyRental>>;

    /// All rentals of the current seller's products.
    async fn list_seller_rentals(&self) -> Result<Vec<AnyRental>>;

    /// Every rental on the marketplace, optionally filtered, with summary counts.
    async fn list_admin_rentals(&self, filter: &AdminFilter) -> Result<AdminListing>;

    /// The current seller's earnings, optionally restricted to a date range.
    async fn earnings(&self, range: Option<DateRange>) -> Result<EarningsReport>;

    /// Create a rental request in `PENDING`.
    async fn create_rental(&self, request: &NewRentalRequest) -> Result<AnyRental>;

    /// Accept or reject a pending rental.
    async fn submit_decision(&self, id: &RentalId, decision: &SellerDecision) -> Result<RentalStatus>;

    /// Move an accepted rental to collected, or a collected one to completed.
    async fn advance_status(&self, id: &RentalId, advance: StatusAdvance) -> Result<RentalStatus>;
}

#[async_trait]
impl<T: RentalStore + ?Sized> RentalStore for Arc<T> {
    async fn list_buyer_rentals(&self) -> Result<Vec<AnyRental>> {
        (**self).list_buyer_rentals().await
    }

    async fn list_seller_rentals(&self) -> Result<Vec<AnyRental>> {
        (**self).list_seller_rentals().await
    }

    async fn list_admin_rentals(&self, filter: &AdminFilter) -> Result<AdminListing> {
        (**self).list_admin_rentals(filter).await
    }

    async fn earnings(&self, range: Option<DateRange>) -> Result<EarningsReport> {
        (**self).earnings(range).await
    }

    async fn create_rental(&self, request: &NewRentalRequest) -> Result<AnyRental> {
        (**self).create_rental(request).await
    }

    async fn submit_decision(&self, id: &RentalId, decision: &SellerDecision) -> Result<RentalStatus> {
        (**self).submit_decision(id, decision).await
    }

    async fn advance_status(&self, id: &RentalId, advance: StatusAdvance) -> Result<RentalStatus> {
        (**self).advance_status(id, advance).await
    }
}

// ============================================================================
// Dashboards
// ============================================================================

/// Buyer's "My Rentals" view.
#[derive(Debug, Clone)]
pub struct BuyerDashboard {
    pub today: NaiveDate,
    /// Everything not yet completed, rejected included
    pub active: Vec<AnyRental>,
    pub history: Vec<AnyRental>,
}

/// Seller's "Rental Actions" view.
#[derive(Debug, Clone)]
pub struct SellerDashboard {
    pub today: NaiveDate,
    pub pending: Vec<AnyRental>,
    pub active: Vec<AnyRental>,
    pub completed: Vec<AnyRental>,
    /// Earnings as reported by the API
    pub earnings: EarningsReport,
}

/// Admin "Rentals" view.
#[derive(Debug, Clone)]
pub struct AdminDashboard {
    pub window: Option<DateWindow>,
    pub ongoing: Vec<AnyRental>,
    pub completed: Vec<AnyRental>,
    /// Counts as reported by the API
    pub summary: AdminSummary,
}

fn owned(rentals: Vec<&AnyRental>) -> Vec<AnyRental> {
    rentals.into_iter().cloned().collect()
}

impl BuyerDashboard {
    pub fn search(&self, term: &str) -> Vec<&AnyRental> {
        text_search(self.active.iter().chain(&self.history), term)
    }
}

impl SellerDashboard {
    fn all(&self) -> impl Iterator<Item = &AnyRental> + Clone {
        self.pending.iter().chain(&self.active).chain(&self.completed)
    }

    /// Buttons to enable for `rental` today.
    pub fn actions_for(&self, rental: &AnyRental) -> Vec<Action> {
        rental.permitted_actions(self.today)
    }

    pub fn search(&self, term: &str) -> Vec<&AnyRental> {
        text_search(self.all(), term)
    }

    /// Earnings over the loaded rentals, for windows the API does not report.
    pub fn local_earnings(&self, window: &EarningsWindow) -> EarningsSummary {
        compute_earnings(self.all(), window, self.today)
    }
}

impl AdminDashboard {
    pub fn search(&self, term: &str) -> Vec<&AnyRental> {
        text_search(self.ongoing.iter().chain(&self.completed), term)
    }
}

// ============================================================================
// Manager
// ============================================================================

/// Front door for the three surfaces.
///
/// Every mutation is checked against the local validator before it is sent,
/// and at most one mutation per rental id is in flight at a time. A second
/// concurrent mutation on the same id fails with
/// [`ToolhireError::MutationInFlight`] instead of racing the first.
pub struct RentalManager<S: RentalStore, C: Clock = SystemClock> {
    store: Arc<S>,
    clock: C,
    in_flight: Arc<DashMap<RentalId, Action>>,
    #[cfg(feature = "prometheus")]
    metrics: Option<Arc<ToolhireMetrics>>,
}

impl<S: RentalStore> RentalManager<S, SystemClock> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: RentalStore, C: Clock> RentalManager<S, C> {
    pub fn with_clock(store: Arc<S>, clock: C) -> Self {
        Self {
            store,
            clock,
            in_flight: Arc::new(DashMap::new()),
            #[cfg(feature = "prometheus")]
            metrics: None,
        }
    }

    /// Also record transitions and admin listings in a Prometheus registry.
    #[cfg(feature = "prometheus")]
    pub fn with_metrics(mut self, metrics: Arc<ToolhireMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Actions currently legal for `rental`.
    pub fn permitted_actions(&self, rental: &AnyRental) -> Vec<Action> {
        rental.permitted_actions(self.today())
    }

    /// The action running on `id`, if any.
    pub fn in_flight(&self, id: &RentalId) -> Option<Action> {
        self.in_flight.get(id).map(|entry| *entry.value())
    }

    fn begin_mutation(&self, id: &RentalId, action: Action) -> Result<MutationGuard> {
        match self.in_flight.entry(id.clone()) {
            Entry::Occupied(running) => {
                tracing::warn!(
                    rental_id = %id,
                    action = %action,
                    running = %running.get(),
                    "Rejecting concurrent mutation"
                );
                Err(ToolhireError::MutationInFlight(id.clone()))
            }
            Entry::Vacant(slot) => {
                slot.insert(action);
                Ok(MutationGuard {
                    in_flight: self.in_flight.clone(),
                    id: id.clone(),
                })
            }
        }
    }

    /// Run `command` against `rental` and return the rental in its new state.
    #[tracing::instrument(skip(self, rental, command), fields(rental_id = %rental.id(), action = %command.action()))]
    pub async fn execute(&self, rental: AnyRental, command: Command) -> Result<AnyRental> {
        let action = command.action();
        // fail before taking the slot so a stale button never blocks a valid one
        rental.check(action, self.today())?;

        let _guard = self.begin_mutation(rental.id(), action)?;
        let result = rental.execute(&command, &self.clock, self.store.as_ref()).await;

        #[cfg(feature = "prometheus")]
        if let Some(metrics) = &self.metrics {
            metrics.record_transition(action, if result.is_ok() { "applied" } else { "failed" });
        }
        result
    }

    pub async fn approve(&self, rental: AnyRental) -> Result<AnyRental> {
        self.execute(rental, Command::Approve).await
    }

    pub async fn reject(&self, rental: AnyRental, reason: &str) -> Result<AnyRental> {
        self.execute(
            rental,
            Command::Reject {
                reason: reason.to_string(),
            },
        )
        .await
    }

    pub async fn mark_collected(&self, rental: AnyRental) -> Result<AnyRental> {
        self.execute(rental, Command::MarkCollected).await
    }

    pub async fn mark_completed(&self, rental: AnyRental) -> Result<AnyRental> {
        self.execute(rental, Command::MarkCompleted).await
    }

    /// Submit a buyer's new request after the checks that need no product data.
    #[tracing::instrument(skip(self, request), fields(product_id = %request.product_id))]
    pub async fn request_rental(&self, request: &NewRentalRequest) -> Result<AnyRental> {
        request.check_shape(self.today())?;
        let rental = self.store.create_rental(request).await?;
        tracing::info!(rental_id = %rental.id(), "Rental requested");
        Ok(rental)
    }

    pub async fn buyer_dashboard(&self) -> Result<BuyerDashboard> {
        let rentals = self.store.list_buyer_rentals().await?;
        let partition = partition_buyer(&rentals);
        Ok(BuyerDashboard {
            today: self.today(),
            active: owned(partition.active),
            history: owned(partition.history),
        })
    }

    /// Seller rentals grouped for the actions page, with earnings over `range`.
    pub async fn seller_dashboard(&self, range: Option<DateRange>) -> Result<SellerDashboard> {
        let rentals = self.store.list_seller_rentals().await?;
        let earnings = self.store.earnings(range).await?;
        let partition = partition_seller(&rentals);
        Ok(SellerDashboard {
            today: self.today(),
            pending: owned(partition.pending),
            active: owned(partition.active),
            completed: owned(partition.completed),
            earnings,
        })
    }

    pub async fn admin_dashboard(&self, window: Option<DateWindow>) -> Result<AdminDashboard> {
        let filter = window.map(|w| w.to_admin_filter()).unwrap_or_default();
        let listing = self.store.list_admin_rentals(&filter).await?;

        #[cfg(feature = "prometheus")]
        if let Some(metrics) = &self.metrics {
            metrics.record_rentals(&listing.rentals);
        }

        let partition = partition_admin(&listing.rentals);
        let local = partition.summary();
        if local != listing.summary {
            tracing::debug!(?local, remote = ?listing.summary, "Admin summary differs from listed rentals");
        }

        Ok(AdminDashboard {
            window,
            ongoing: owned(partition.ongoing),
            completed: owned(partition.completed),
            summary: listing.summary,
        })
    }
}

/// Frees the rental's in-flight slot when dropped, including on cancellation.
struct MutationGuard {
    in_flight: Arc<DashMap<RentalId, Action>>,
    id: RentalId,
}

impl Drop for MutationGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.id);
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::aggregate::Role;
    use crate::clock::FixedClock;
    use crate::config::Session;
    use crate::domain::rental::test_support::date;
    use crate::manager::memory::{InMemoryRentalStore, Product};
    use crate::rental::{PartyRef, ProductId, UserId};

    fn party(id: &str, name: &str) -> PartyRef {
        PartyRef {
            id: UserId::from(id),
            name: name.to_string(),
            email: None,
            phone: None,
            address: None,
        }
    }

    fn setup() -> (InMemoryRentalStore, FixedClock) {
        let clock = FixedClock::on(date(2025, 5, 20));
        let store = InMemoryRentalStore::new(Arc::new(clock.clone()));
        store.add_user(party("u-buyer", "Asha"));
        store.add_user(party("u-seller", "Kiran Tools"));
        store.add_product(Product {
            id: ProductId::from("p-drill"),
            name: "Cordless Drill".to_string(),
            image: None,
            price_per_day: Decimal::new(250, 0),
            available_quantity: 3,
            seller: UserId::from("u-seller"),
        });
        (store, clock)
    }

    fn new_request() -> NewRentalRequest {
        NewRentalRequest {
            product_id: ProductId::from("p-drill"),
            quantity: 1,
            start_date: date(2025, 6, 1),
            end_date: date(2025, 6, 3),
        }
    }

    #[tokio::test]
    async fn test_second_mutation_on_same_rental_fails_fast() {
        let (store, clock) = setup();
        let buyer = RentalManager::with_clock(
            Arc::new(store.for_session(Session::new("b", Role::Buyer, "u-buyer"))),
            clock.clone(),
        );
        let rental = buyer.request_rental(&new_request()).await.unwrap();

        let seller = RentalManager::with_clock(
            Arc::new(store.for_session(Session::new("s", Role::Seller, "u-seller"))),
            clock,
        );
        let held = seller.begin_mutation(rental.id(), Action::Approve).unwrap();
        assert_eq!(seller.in_flight(rental.id()), Some(Action::Approve));

        let err = seller.approve(rental.clone()).await.unwrap_err();
        assert!(matches!(err, ToolhireError::MutationInFlight(_)));

        drop(held);
        assert_eq!(seller.in_flight(rental.id()), None);
        let approved = seller.approve(rental).await.unwrap();
        assert_eq!(approved.status(), RentalStatus::Accepted);
    }

    #[tokio::test]
    async fn test_stale_action_fails_without_taking_slot() {
        let (store, clock) = setup();
        let buyer = RentalManager::with_clock(
            Arc::new(store.for_session(Session::new("b", Role::Buyer, "u-buyer"))),
            clock.clone(),
        );
        let rental = buyer.request_rental(&new_request()).await.unwrap();

        let seller = RentalManager::with_clock(
            Arc::new(store.for_session(Session::new("s", Role::Seller, "u-seller"))),
            clock,
        );
        let err = seller.mark_completed(rental.clone()).await.unwrap_err();
        assert!(matches!(err, ToolhireError::InvalidTransition { .. }));
        assert_eq!(seller.in_flight(rental.id()), None);
    }

    #[tokio::test]
    async fn test_request_rental_checks_shape_first() {
        let (store, clock) = setup();
        let buyer = RentalManager::with_clock(
            Arc::new(store.for_session(Session::new("b", Role::Buyer, "u-buyer"))),
            clock,
        );
        let mut request = new_request();
        request.start_date = date(2025, 5, 20);
        assert!(matches!(
            buyer.request_rental(&request).await,
            Err(ToolhireError::Validation(_))
        ));
        assert!(buyer.buyer_dashboard().await.unwrap().active.is_empty());
    }

    #[tokio::test]
    async fn test_dashboards_group_by_role() {
        let (store, clock) = setup();
        let buyer = RentalManager::with_clock(
            Arc::new(store.for_session(Session::new("b", Role::Buyer, "u-buyer"))),
            clock.clone(),
        );
        let first = buyer.request_rental(&new_request()).await.unwrap();
        buyer.request_rental(&new_request()).await.unwrap();

        let seller = RentalManager::with_clock(
            Arc::new(store.for_session(Session::new("s", Role::Seller, "u-seller"))),
            clock.clone(),
        );
        seller.approve(first).await.unwrap();

        let dashboard = seller.seller_dashboard(None).await.unwrap();
        assert_eq!(dashboard.pending.len(), 1);
        assert_eq!(dashboard.active.len(), 1);
        assert!(dashboard.completed.is_empty());
        assert!(dashboard.actions_for(&dashboard.active[0]).is_empty());
        assert_eq!(dashboard.actions_for(&dashboard.pending[0]), vec![Action::Approve, Action::Reject]);
        assert_eq!(dashboard.search("drill").len(), 2);

        let admin = RentalManager::with_clock(
            Arc::new(store.for_session(Session::new("a", Role::Admin, "u-admin"))),
            clock,
        );
        let overview = admin.admin_dashboard(None).await.unwrap();
        assert_eq!(overview.ongoing.len(), 2);
        assert_eq!(overview.summary.total_rentals, 2);

        let completed_only = admin.admin_dashboard(Some(DateWindow::Completed)).await.unwrap();
        assert!(completed_only.ongoing.is_empty());
        assert_eq!(completed_only.summary.total_rentals, 0);
    }
}
