use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::sync::Arc;
use toolhire::aggregate::{EarningsWindow, WindowParams, filter_by_date_window};
use toolhire::manager::memory::{InMemoryRentalStore, Product};
use toolhire::{
    Action, AnyRental, DateRange, DateWindow, FixedClock, NewRentalRequest, PartyRef, ProductId,
    RentalManager, RentalStatus, RentalStore, Role, Session, ToolhireError, UserId,
};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

fn party(id: &str, name: &str) -> PartyRef {
    PartyRef {
        id: UserId::from(id),
        name: name.to_string(),
        email: None,
        phone: None,
        address: None,
    }
}

struct Marketplace {
    clock: FixedClock,
    buyer: RentalManager<InMemoryRentalStore, FixedClock>,
    seller: RentalManager<InMemoryRentalStore, FixedClock>,
    admin: RentalManager<InMemoryRentalStore, FixedClock>,
}

/// One seller with a ladder (150/day, 4 in stock), one buyer, one admin.
fn marketplace(today: NaiveDate) -> Marketplace {
    let clock = FixedClock::on(today);
    let store = InMemoryRentalStore::new(Arc::new(clock.clone()));
    store.add_user(party("u-buyer", "Meena"));
    store.add_user(party("u-seller", "Ravi Hardware"));
    store.add_product(Product {
        id: ProductId::from("p-ladder"),
        name: "Aluminium Ladder".to_string(),
        image: None,
        price_per_day: Decimal::new(150, 0),
        available_quantity: 4,
        seller: UserId::from("u-seller"),
    });

    let manager = |role: Role, user: &str| {
        RentalManager::with_clock(
            Arc::new(store.for_session(Session::new(format!("{user}-token"), role, user))),
            clock.clone(),
        )
    };

    Marketplace {
        buyer: manager(Role::Buyer, "u-buyer"),
        seller: manager(Role::Seller, "u-seller"),
        admin: manager(Role::Admin, "u-admin"),
        clock,
    }
}

fn ladder(quantity: u32, start: NaiveDate, end: NaiveDate) -> NewRentalRequest {
    NewRentalRequest {
        product_id: ProductId::from("p-ladder"),
        quantity,
        start_date: start,
        end_date: end,
    }
}

#[test_log::test(tokio::test)]
async fn test_full_lifecycle_follows_the_calendar() {
    let market = marketplace(date(2025, 5, 25));

    let rental = market
        .buyer
        .request_rental(&ladder(2, date(2025, 6, 1), date(2025, 6, 3)))
        .await
        .unwrap();
    assert_eq!(rental.status(), RentalStatus::Pending);
    assert_eq!(rental.data().total_days, 3);
    assert_eq!(rental.data().total_amount, Decimal::new(900, 0));

    let accepted = market.seller.approve(rental).await.unwrap();
    assert_eq!(accepted.status(), RentalStatus::Accepted);

    // 2025-05-30: too early to collect
    market.clock.set_date(date(2025, 5, 30));
    let early = market.seller.mark_collected(accepted.clone()).await.unwrap_err();
    assert!(matches!(
        early,
        ToolhireError::NotYetEligible { action: Action::MarkCollected, eligible_on, .. } if eligible_on == date(2025, 6, 1)
    ));
    assert_eq!(early.user_message(), "This rental can be collected from 01 Jun 2025.");

    market.clock.set_date(date(2025, 6, 1));
    let collected = market.seller.mark_collected(accepted).await.unwrap();
    assert_eq!(collected.status(), RentalStatus::Collected);

    market.clock.set_date(date(2025, 6, 2));
    assert!(market.seller.mark_completed(collected.clone()).await.is_err());

    market.clock.set_date(date(2025, 6, 3));
    let completed = market.seller.mark_completed(collected).await.unwrap();
    assert_eq!(completed.status(), RentalStatus::Completed);
    assert!(completed.completed_at().is_some());
    assert!(market.seller.permitted_actions(&completed).is_empty());

    let dashboard = market.buyer.buyer_dashboard().await.unwrap();
    assert!(dashboard.active.is_empty());
    assert_eq!(dashboard.history.len(), 1);
}

#[test_log::test(tokio::test)]
async fn test_rejection_needs_a_reason_and_is_final() {
    let market = marketplace(date(2025, 5, 25));
    let rental = market
        .buyer
        .request_rental(&ladder(1, date(2025, 6, 1), date(2025, 6, 1)))
        .await
        .unwrap();

    let blank = market.seller.reject(rental.clone(), "  ").await.unwrap_err();
    assert!(matches!(blank, ToolhireError::Validation(ref m) if m == "reason required"));

    let rejected = market
        .seller
        .reject(rental, "damaged on arrival")
        .await
        .unwrap();
    assert_eq!(rejected.status(), RentalStatus::Rejected);
    assert_eq!(rejected.rejection_reason(), Some("damaged on arrival"));

    let again = market.seller.approve(rejected).await.unwrap_err();
    assert!(matches!(
        again,
        ToolhireError::InvalidTransition { from: RentalStatus::Rejected, .. }
    ));

    // rejected rentals stay in the buyer's active list
    let dashboard = market.buyer.buyer_dashboard().await.unwrap();
    assert_eq!(dashboard.active.len(), 1);
    assert_eq!(dashboard.search("ladder").len(), 1);
}

#[test_log::test(tokio::test)]
async fn test_stale_view_is_refused_by_the_store() {
    let market = marketplace(date(2025, 5, 25));
    let rental = market
        .buyer
        .request_rental(&ladder(1, date(2025, 6, 1), date(2025, 6, 2)))
        .await
        .unwrap();

    // two tabs showing the same pending rental
    let first_tab = rental.clone();
    let second_tab = rental;

    market.seller.approve(first_tab).await.unwrap();
    let err = market
        .seller
        .reject(second_tab, "changed my mind")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ToolhireError::InvalidTransition { from: RentalStatus::Accepted, .. }
    ));
}

#[test_log::test(tokio::test)]
async fn test_seller_earnings_and_admin_views() {
    let market = marketplace(date(2025, 5, 20));

    let mut rentals: Vec<AnyRental> = Vec::new();
    for (start, end) in [
        (date(2025, 5, 21), date(2025, 5, 22)),
        (date(2025, 5, 25), date(2025, 5, 25)),
        (date(2025, 6, 10), date(2025, 6, 12)),
    ] {
        rentals.push(market.buyer.request_rental(&ladder(1, start, end)).await.unwrap());
    }

    // complete the first two
    for rental in rentals.drain(..2) {
        let accepted = market.seller.approve(rental).await.unwrap();
        let end = accepted.data().end_date;
        market.clock.set_date(accepted.data().start_date);
        let collected = market.seller.mark_collected(accepted).await.unwrap();
        market.clock.set_date(end);
        market.seller.mark_completed(collected).await.unwrap();
    }

    market.clock.set_date(date(2025, 5, 31));
    let dashboard = market
        .seller
        .seller_dashboard(Some(DateRange::new(date(2025, 5, 1), date(2025, 5, 23)).unwrap()))
        .await
        .unwrap();
    assert_eq!(dashboard.pending.len(), 1);
    assert_eq!(dashboard.completed.len(), 2);
    // only the rental completed on 2025-05-22 falls in the range
    assert_eq!(dashboard.earnings.total_rentals, 1);
    assert_eq!(dashboard.earnings.total_income, Decimal::new(300, 0));
    assert_eq!(dashboard.earnings.monthly_income, Decimal::new(450, 0));

    let local = dashboard.local_earnings(&EarningsWindow::ThisMonth);
    assert_eq!(local.total, Decimal::new(450, 0));
    assert_eq!(local.average_per_rental, Decimal::new(225, 0));

    let overview = market.admin.admin_dashboard(None).await.unwrap();
    assert_eq!(overview.summary.total_rentals, 3);
    assert_eq!(overview.summary.ongoing_count, 1);
    assert_eq!(overview.summary.completed_count, 2);

    let june = market
        .admin
        .admin_dashboard(Some(DateWindow::month(6, 2025).unwrap()))
        .await
        .unwrap();
    assert_eq!(june.summary.total_rentals, 1);
    assert_eq!(june.ongoing.len(), 1);

    // the local filter agrees with the store's
    let all = market.admin.store().list_seller_rentals().await;
    assert!(matches!(all, Err(ToolhireError::Unauthorized)));
    let seller_rentals = market.seller.seller_dashboard(None).await.unwrap();
    let everything: Vec<&AnyRental> = seller_rentals
        .pending
        .iter()
        .chain(&seller_rentals.completed)
        .collect();
    let params = WindowParams {
        month: Some(6),
        year: Some(2025),
        ..Default::default()
    };
    let filtered = filter_by_date_window(everything, "month", &params).unwrap();
    assert_eq!(filtered.len(), 1);
}
