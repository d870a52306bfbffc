//! In-process rental store.
//!
//! Holds products, users and rentals behind a lock and applies the same
//! validator and clock as the local checks, so it refuses exactly what the
//! marketplace API would. Handles created with [`InMemoryRentalStore::for_session`]
//! share state and differ only in who is calling.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::aggregate::{AdminSummary, DateRange, DateWindow, Role, earnings_report};
use crate::clock::Clock;
use crate::config::Session;
use crate::error::{Result, ToolhireError};
use crate::rental::{
    AdminFilter, AdminListing, AnyRental, Command, EarningsReport, NewRentalRequest, Pending, PartyRef, ProductId,
    ProductListing, ProductRef, Rental, RentalData, RentalId, RentalStatus, SellerDecision, StatusAdvance,
    UserId,
};

use super::RentalStore;

/// A product listed on the marketplace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub image: Option<String>,
    pub price_per_day: Decimal,
    pub available_quantity: u32,
    pub seller: UserId,
}

#[derive(Default)]
struct State {
    users: HashMap<UserId, PartyRef>,
    products: HashMap<ProductId, Product>,
    /// Insertion order is listing order
    rentals: Vec<AnyRental>,
}

impl State {
    fn position(&self, id: &RentalId) -> Result<usize> {
        self.rentals
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| ToolhireError::NotFound(id.clone()))
    }

    fn party(&self, id: &UserId) -> PartyRef {
        self.users.get(id).cloned().unwrap_or_else(|| PartyRef {
            id: id.clone(),
            name: id.to_string(),
            email: None,
            phone: None,
            address: None,
        })
    }
}

#[derive(Clone)]
pub struct InMemoryRentalStore {
    state: Arc<RwLock<State>>,
    clock: Arc<dyn Clock>,
    session: Option<Session>,
}

impl InMemoryRentalStore {
    /// An empty store with no caller. Every call fails with `Unauthorized`
    /// until a session is attached with [`InMemoryRentalStore::for_session`].
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Arc::new(RwLock::new(State::default())),
            clock,
            session: None,
        }
    }

    /// A handle on the same data, acting as `session`.
    pub fn for_session(&self, session: Session) -> Self {
        Self {
            state: self.state.clone(),
            clock: self.clock.clone(),
            session: Some(session),
        }
    }

    pub fn add_user(&self, user: PartyRef) {
        self.state.write().users.insert(user.id.clone(), user);
    }

    pub fn add_product(&self, product: Product) {
        self.state.write().products.insert(product.id.clone(), product);
    }

    /// Insert a rental as-is, bypassing request validation. Used to seed history.
    pub fn insert(&self, rental: AnyRental) {
        let mut state = self.state.write();
        match state.rentals.iter_mut().find(|r| r.id() == rental.id()) {
            Some(existing) => *existing = rental,
            None => state.rentals.push(rental),
        }
    }

    pub fn get(&self, id: &RentalId) -> Option<AnyRental> {
        self.state.read().rentals.iter().find(|r| r.id() == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.state.read().rentals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn caller(&self, role: Role) -> Result<&Session> {
        match &self.session {
            Some(session) if session.role == role => Ok(session),
            _ => Err(ToolhireError::Unauthorized),
        }
    }

    fn owned_by(rental: &AnyRental, seller: &UserId) -> bool {
        rental.data().seller.as_ref().is_some_and(|s| &s.id == seller)
    }

    fn seller_rentals(&self, seller: &UserId) -> Vec<AnyRental> {
        self.state
            .read()
            .rentals
            .iter()
            .filter(|r| Self::owned_by(r, seller))
            .cloned()
            .collect()
    }

    /// Apply a seller command to one of the caller's rentals.
    fn update(&self, id: &RentalId, command: Command) -> Result<RentalStatus> {
        let seller = self.caller(Role::Seller)?.user_id.clone();
        let today = self.clock.today();
        let now = self.clock.now();

        let mut state = self.state.write();
        let index = state.position(id)?;
        if !Self::owned_by(&state.rentals[index], &seller) {
            // other sellers' rentals are invisible
            return Err(ToolhireError::NotFound(id.clone()));
        }

        let next = state.rentals[index].clone().apply(&command, today, now)?;
        let status = next.status();
        state.rentals[index] = next;
        tracing::debug!(rental_id = %id, status = %status, "Stored rental update");
        Ok(status)
    }
}

#[async_trait]
impl RentalStore for InMemoryRentalStore {
    async fn list_buyer_rentals(&self) -> Result<Vec<AnyRental>> {
        let buyer = &self.caller(Role::Buyer)?.user_id;
        Ok(self
            .state
            .read()
            .rentals
            .iter()
            .filter(|r| &r.data().buyer.id == buyer)
            .cloned()
            .collect())
    }

    async fn list_seller_rentals(&self) -> Result<Vec<AnyRental>> {
        let seller = &self.caller(Role::Seller)?.user_id;
        Ok(self.seller_rentals(seller))
    }

    async fn list_admin_rentals(&self, filter: &AdminFilter) -> Result<AdminListing> {
        self.caller(Role::Admin)?;
        let window = DateWindow::from_admin_filter(filter)?;

        let rentals: Vec<AnyRental> = {
            let state = self.state.read();
            match window {
                Some(window) => window.filter(&state.rentals).into_iter().cloned().collect(),
                None => state.rentals.clone(),
            }
        };
        let summary = AdminSummary::from_rentals(&rentals);
        Ok(AdminListing { rentals, summary })
    }

    async fn earnings(&self, range: Option<DateRange>) -> Result<EarningsReport> {
        let seller = &self.caller(Role::Seller)?.user_id;
        let rentals = self.seller_rentals(seller);
        Ok(earnings_report(&rentals, range.as_ref(), self.clock.today()))
    }

    async fn create_rental(&self, request: &NewRentalRequest) -> Result<AnyRental> {
        let buyer = self.caller(Role::Buyer)?.user_id.clone();
        let mut state = self.state.write();

        let product = state
            .products
            .get(&request.product_id)
            .cloned()
            .ok_or_else(|| ToolhireError::validation(format!("product {} not found", request.product_id)))?;
        let listing = ProductListing {
            id: product.id.clone(),
            price_per_day: product.price_per_day,
            available_quantity: product.available_quantity,
        };
        let quote = request.validate(&listing, self.clock.today())?;

        let data = RentalData {
            id: RentalId::from(uuid::Uuid::new_v4().to_string()),
            product: ProductRef {
                id: product.id,
                name: product.name,
                image: product.image,
                price_per_day: product.price_per_day,
            },
            buyer: state.party(&buyer),
            seller: Some(state.party(&product.seller)),
            quantity: request.quantity,
            start_date: request.start_date,
            end_date: request.end_date,
            total_days: quote.total_days,
            total_amount: quote.total_amount,
            created_at: self.clock.now(),
        };
        let rental: AnyRental = Rental { data, state: Pending }.into();
        state.rentals.push(rental.clone());
        tracing::debug!(rental_id = %rental.id(), "Stored new rental");
        Ok(rental)
    }

    async fn submit_decision(&self, id: &RentalId, decision: &SellerDecision) -> Result<RentalStatus> {
        self.update(id, decision.to_command()?)
    }

    async fn advance_status(&self, id: &RentalId, advance: StatusAdvance) -> Result<RentalStatus> {
        self.update(id, advance.to_command())
    }
}
