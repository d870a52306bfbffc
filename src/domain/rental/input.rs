//! Validation of a buyer's new rental request before it is submitted.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{Result, ToolhireError};

use super::state::ProductId;

/// Body of the buyer's "request to rent" call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRentalRequest {
    pub product_id: ProductId,
    pub quantity: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// What the buyer is asking to rent from, as seen at request time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductListing {
    pub id: ProductId,
    pub price_per_day: Decimal,
    pub available_quantity: u32,
}

/// Price of a request, fixed once at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RentalQuote {
    pub total_days: u32,
    pub total_amount: Decimal,
}

/// Inclusive number of days in `start..=end`.
pub fn rental_days(start: NaiveDate, end: NaiveDate) -> Result<u32> {
    if end < start {
        return Err(ToolhireError::validation("end date must not be before start date"));
    }
    let days = (end - start).num_days() + 1;
    u32::try_from(days).map_err(|_| ToolhireError::validation("rental period is too long"))
}

/// `total_days * quantity * price_per_day`.
pub fn quote(
    start: NaiveDate,
    end: NaiveDate,
    quantity: u32,
    price_per_day: Decimal,
) -> Result<RentalQuote> {
    let total_days = rental_days(start, end)?;
    let total_amount = Decimal::from(total_days)
        .checked_mul(Decimal::from(quantity))
        .and_then(|units| units.checked_mul(price_per_day))
        .ok_or_else(|| ToolhireError::validation("rental amount is out of range"))?;
    Ok(RentalQuote {
        total_days,
        total_amount,
    })
}

impl NewRentalRequest {
    /// Checks that need no product: quantity, date order, and a future start.
    pub fn check_shape(&self, today: NaiveDate) -> Result<()> {
        if self.quantity == 0 {
            return Err(ToolhireError::validation("quantity must be at least 1"));
        }
        rental_days(self.start_date, self.end_date)?;
        if self.start_date <= today {
            return Err(ToolhireError::validation("start date must be in the future"));
        }
        Ok(())
    }

    /// Check the request against the product and the current day, and price it.
    ///
    /// Both dates must be strictly after `today` (the day the request is created).
    pub fn validate(&self, product: &ProductListing, today: NaiveDate) -> Result<RentalQuote> {
        if self.product_id != product.id {
            return Err(ToolhireError::validation(format!(
                "product mismatch: request is for {}, listing is {}",
                self.product_id, product.id
            )));
        }
        self.check_shape(today)?;
        if self.quantity > product.available_quantity {
            return Err(ToolhireError::validation(format!(
                "only {} available",
                product.available_quantity
            )));
        }
        if product.price_per_day.is_sign_negative() {
            return Err(ToolhireError::validation("price per day must not be negative"));
        }
        quote(self.start_date, self.end_date, self.quantity, product.price_per_day)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rental::test_support::date;

    fn drill() -> ProductListing {
        ProductListing {
            id: ProductId::from("drill"),
            price_per_day: Decimal::new(250, 0),
            available_quantity: 3,
        }
    }

    fn request(quantity: u32, start: NaiveDate, end: NaiveDate) -> NewRentalRequest {
        NewRentalRequest {
            product_id: ProductId::from("drill"),
            quantity,
            start_date: start,
            end_date: end,
        }
    }

    #[test]
    fn test_total_days_is_inclusive() {
        assert_eq!(rental_days(date(2025, 1, 1), date(2025, 1, 1)).unwrap(), 1);
        assert_eq!(rental_days(date(2025, 1, 1), date(2025, 1, 3)).unwrap(), 3);
        assert_eq!(rental_days(date(2024, 2, 28), date(2024, 3, 1)).unwrap(), 3);
        assert!(rental_days(date(2025, 1, 3), date(2025, 1, 1)).is_err());
    }

    #[test]
    fn test_quote_multiplies_days_quantity_and_price() {
        let quote = request(2, date(2025, 1, 2), date(2025, 1, 4))
            .validate(&drill(), date(2025, 1, 1))
            .unwrap();
        assert_eq!(quote.total_days, 3);
        assert_eq!(quote.total_amount, Decimal::new(1500, 0));
    }

    #[test]
    fn test_fractional_prices_stay_exact() {
        let quote = quote(date(2025, 1, 1), date(2025, 1, 3), 1, Decimal::new(9999, 2)).unwrap();
        assert_eq!(quote.total_amount, Decimal::new(29997, 2));
    }

    #[test]
    fn test_rejects_bad_quantities() {
        let today = date(2025, 1, 1);
        let zero = request(0, date(2025, 1, 2), date(2025, 1, 2)).validate(&drill(), today);
        assert!(matches!(zero, Err(ToolhireError::Validation(_))));

        let too_many = request(4, date(2025, 1, 2), date(2025, 1, 2)).validate(&drill(), today);
        assert!(matches!(too_many, Err(ToolhireError::Validation(ref m)) if m == "only 3 available"));
    }

    #[test]
    fn test_dates_must_be_in_the_future() {
        let today = date(2025, 1, 1);
        let same_day = request(1, today, date(2025, 1, 2)).validate(&drill(), today);
        assert!(same_day.is_err());

        let inverted = request(1, date(2025, 1, 5), date(2025, 1, 3)).validate(&drill(), today);
        assert!(inverted.is_err());
    }
}
