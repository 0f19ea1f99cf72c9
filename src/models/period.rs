//! Accounting period: the closed date interval trades are fetched for.

use std::fmt;

use anyhow::{ensure, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Closed date interval bounding a fetch. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountingPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl AccountingPeriod {
    /// Build a period, rejecting inverted bounds.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        ensure!(
            start <= end,
            "invalid accounting period: start {start} is after end {end}"
        );
        Ok(Self { start, end })
    }
}

impl fmt::Display for AccountingPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_valid_period() {
        let period = AccountingPeriod::new(date(2023, 1, 1), date(2023, 1, 31)).unwrap();
        assert_eq!(period.to_string(), "2023-01-01..2023-01-31");
    }

    #[test]
    fn test_single_day_period() {
        assert!(AccountingPeriod::new(date(2023, 1, 1), date(2023, 1, 1)).is_ok());
    }

    #[test]
    fn test_inverted_period_rejected() {
        let err = AccountingPeriod::new(date(2023, 2, 1), date(2023, 1, 1)).unwrap_err();
        assert!(err.to_string().contains("2023-02-01"));
        assert!(err.to_string().contains("2023-01-01"));
    }
}
