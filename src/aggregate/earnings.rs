//! Seller earnings over completed rentals.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::rental::{AnyRental, EarningsReport};

use super::window::DateRange;

/// Period over which earnings are summed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarningsWindow {
    ThisMonth,
    ThisYear,
    AllTime,
    CustomRange(DateRange),
}

impl EarningsWindow {
    fn contains(&self, day: NaiveDate, today: NaiveDate) -> bool {
        match self {
            EarningsWindow::ThisMonth => day.year() == today.year() && day.month() == today.month(),
            EarningsWindow::ThisYear => day.year() == today.year(),
            EarningsWindow::AllTime => true,
            EarningsWindow::CustomRange(range) => range.contains(day),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EarningsSummary {
    /// Sum of `total_amount` (rupees)
    pub total: Decimal,
    pub completed_rentals: usize,
    /// `total / completed_rentals` rounded to paise, or zero when there are none
    pub average_per_rental: Decimal,
}

/// Day a completed rental counts towards: its completion, else its creation.
/// `None` for rentals that have not completed.
pub fn earned_on(rental: &AnyRental) -> Option<NaiveDate> {
    match rental {
        AnyRental::Completed(r) => Some(
            r.state
                .completed_at
                .unwrap_or(r.data.created_at)
                .date_naive(),
        ),
        _ => None,
    }
}

pub fn compute_earnings<'a, I>(requests: I, window: &EarningsWindow, today: NaiveDate) -> EarningsSummary
where
    I: IntoIterator<Item = &'a AnyRental>,
{
    let (total, completed_rentals) = requests
        .into_iter()
        .filter(|rental| earned_on(rental).is_some_and(|day| window.contains(day, today)))
        .fold((Decimal::ZERO, 0usize), |(total, count), rental| {
            (total + rental.data().total_amount, count + 1)
        });

    let average_per_rental = if completed_rentals == 0 {
        Decimal::ZERO
    } else {
        (total / Decimal::from(completed_rentals)).round_dp(2)
    };

    EarningsSummary {
        total,
        completed_rentals,
        average_per_rental,
    }
}

/// Compute the earnings endpoint's report locally, optionally restricted to a range.
///
/// `total_income` and `total_rentals` respect `range`; the monthly and yearly
/// figures are always relative to `today`.
pub fn earnings_report<'a, I>(requests: I, range: Option<&DateRange>, today: NaiveDate) -> EarningsReport
where
    I: IntoIterator<Item = &'a AnyRental>,
    I::IntoIter: Clone,
{
    let requests = requests.into_iter();
    let overall = match range {
        Some(range) => EarningsWindow::CustomRange(*range),
        None => EarningsWindow::AllTime,
    };
    let totals = compute_earnings(requests.clone(), &overall, today);
    EarningsReport {
        total_income: totals.total,
        monthly_income: compute_earnings(requests.clone(), &EarningsWindow::ThisMonth, today).total,
        yearly_income: compute_earnings(requests, &EarningsWindow::ThisYear, today).total,
        total_rentals: totals.completed_rentals as u64,
    }
}
