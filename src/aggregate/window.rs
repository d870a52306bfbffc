//! Status and calendar windows used by the admin listing.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Result, ToolhireError};
use crate::rental::{AdminFilter, AnyRental, RentalStatus, StatusGroup};

use super::partition::is_ongoing;

/// Inclusive range of calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if end < start {
            return Err(ToolhireError::validation("end date must not be before start date"));
        }
        Ok(DateRange { start, end })
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Loose parameters as a filter form submits them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowParams {
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub year: Option<i32>,
}

/// A validated window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateWindow {
    Ongoing,
    Completed,
    /// Rentals whose start date falls in the range
    Date(DateRange),
    /// Rentals whose start date falls in the calendar month
    Month { month: u32, year: i32 },
}

impl DateWindow {
    /// Parse a filter mode (`ongoing`, `completed`, `date`, `month`) and its parameters.
    pub fn from_params(mode: &str, params: &WindowParams) -> Result<Self> {
        match mode.trim().to_ascii_lowercase().as_str() {
            "ongoing" => Ok(DateWindow::Ongoing),
            "completed" => Ok(DateWindow::Completed),
            "date" => {
                let (Some(start), Some(end)) = (params.start_date, params.end_date) else {
                    return Err(ToolhireError::validation("start date and end date are required"));
                };
                Ok(DateWindow::Date(DateRange::new(start, end)?))
            }
            "month" => {
                let (Some(month), Some(year)) = (params.month, params.year) else {
                    return Err(ToolhireError::validation("month and year are required"));
                };
                Self::month(month, year)
            }
            other => Err(ToolhireError::validation(format!("unknown filter mode: {}", other))),
        }
    }

    pub fn month(month: u32, year: i32) -> Result<Self> {
        if !(1..=12).contains(&month) {
            return Err(ToolhireError::validation("month must be between 1 and 12"));
        }
        // rejects years chrono cannot represent
        if NaiveDate::from_ymd_opt(year, month, 1).is_none() {
            return Err(ToolhireError::validation(format!("invalid year: {}", year)));
        }
        Ok(DateWindow::Month { month, year })
    }

    pub fn matches(&self, rental: &AnyRental) -> bool {
        let start = rental.data().start_date;
        match self {
            DateWindow::Ongoing => is_ongoing(rental.status()),
            DateWindow::Completed => rental.status() == RentalStatus::Completed,
            DateWindow::Date(range) => range.contains(start),
            DateWindow::Month { month, year } => start.month() == *month && start.year() == *year,
        }
    }

    /// The equivalent admin listing filter body.
    pub fn to_admin_filter(&self) -> AdminFilter {
        match self {
            DateWindow::Ongoing => AdminFilter {
                status_group: Some(StatusGroup::Ongoing),
                ..Default::default()
            },
            DateWindow::Completed => AdminFilter {
                status_group: Some(StatusGroup::Completed),
                ..Default::default()
            },
            DateWindow::Date(range) => AdminFilter {
                start_date: Some(range.start),
                end_date: Some(range.end),
                ..Default::default()
            },
            DateWindow::Month { month, year } => AdminFilter {
                month: Some(*month),
                year: Some(*year),
                ..Default::default()
            },
        }
    }

    pub fn filter<'a, I>(&self, requests: I) -> Vec<&'a AnyRental>
    where
        I: IntoIterator<Item = &'a AnyRental>,
    {
        requests.into_iter().filter(|r| self.matches(r)).collect()
    }

    /// Read an admin filter body back into a window. An empty filter means "no window".
    pub fn from_admin_filter(filter: &AdminFilter) -> Result<Option<Self>> {
        if let Some(group) = filter.status_group {
            return Ok(Some(match group {
                StatusGroup::Ongoing => DateWindow::Ongoing,
                StatusGroup::Completed => DateWindow::Completed,
            }));
        }
        let params = WindowParams {
            start_date: filter.start_date,
            end_date: filter.end_date,
            month: filter.month,
            year: filter.year,
        };
        if params.start_date.is_some() || params.end_date.is_some() {
            return DateWindow::from_params("date", &params).map(Some);
        }
        if params.month.is_some() || params.year.is_some() {
            return DateWindow::from_params("month", &params).map(Some);
        }
        Ok(None)
    }
}

/// Parse `mode`/`params` and keep the rentals inside the window.
pub fn filter_by_date_window<'a, I>(
    requests: I,
    mode: &str,
    params: &WindowParams,
) -> Result<Vec<&'a AnyRental>>
where
    I: IntoIterator<Item = &'a AnyRental>,
{
    let window = DateWindow::from_params(mode, params)?;
    Ok(window.filter(requests))
}
