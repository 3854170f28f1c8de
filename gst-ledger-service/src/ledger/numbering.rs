//! Financial-year labels and sequential invoice numbers (`"<seq>/<yyyy-yy>"`).

use chrono::{Datelike, NaiveDate};
use service_core::error::AppError;
use std::fmt;
use std::str::FromStr;

/// First month of the April–March financial year.
const FY_START_MONTH: u32 = 4;

/// An April 1 – March 31 financial year, identified by its starting calendar year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FinancialYear {
    start_year: i32,
}

impl FinancialYear {
    pub fn starting(start_year: i32) -> Self {
        Self { start_year }
    }

    /// The financial year a date falls in: April onward belongs to the year that
    /// starts in the same calendar year, January–March to the previous one.
    pub fn containing(date: NaiveDate) -> Self {
        if date.month() >= FY_START_MONTH {
            Self::starting(date.year())
        } else {
            Self::starting(date.year() - 1)
        }
    }

    pub fn start_year(&self) -> i32 {
        self.start_year
    }

    pub fn end_year(&self) -> i32 {
        self.start_year + 1
    }

    /// Inclusive `[April 1, March 31]` bounds.
    pub fn date_range(&self) -> Option<(NaiveDate, NaiveDate)> {
        let first = NaiveDate::from_ymd_opt(self.start_year, FY_START_MONTH, 1)?;
        let last = NaiveDate::from_ymd_opt(self.end_year(), FY_START_MONTH - 1, 31)?;
        Some((first, last))
    }
}

impl fmt::Display for FinancialYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.start_year, self.end_year().rem_euclid(100))
    }
}

impl FromStr for FinancialYear {
    type Err = AppError;

    /// Parses `"2024-25"`; the suffix must be the last two digits of the next year.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            AppError::BadRequest(anyhow::anyhow!(
                "Financial year '{}' must look like 2024-25",
                s
            ))
        };

        let (start, end) = s.trim().split_once('-').ok_or_else(invalid)?;
        if start.len() != 4 || end.len() != 2 {
            return Err(invalid());
        }
        let start_year: i32 = start.parse().map_err(|_| invalid())?;
        let end_suffix: i32 = end.parse().map_err(|_| invalid())?;

        let year = Self::starting(start_year);
        if year.end_year().rem_euclid(100) != end_suffix {
            return Err(invalid());
        }
        Ok(year)
    }
}

/// A formatted invoice number: a business-wide running sequence plus the label of
/// the financial year the invoice is dated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvoiceNumber {
    pub sequence: u64,
    pub financial_year: FinancialYear,
}

impl InvoiceNumber {
    /// Numeric prefix of a stored invoice number (`"12/2024-25"` -> 12).
    pub fn sequence_of(invoice_number: &str) -> Option<u64> {
        invoice_number
            .split('/')
            .next()
            .and_then(|prefix| prefix.trim().parse().ok())
    }

    /// Allocate the number following `last_issued`.
    ///
    /// The sequence never resets at a financial-year boundary; only the label
    /// follows the new invoice's date.
    pub fn next_after(last_issued: Option<&str>, invoice_date: NaiveDate) -> Result<Self, AppError> {
        let sequence = match last_issued {
            Some(anchor) => {
                let last = Self::sequence_of(anchor).ok_or_else(|| {
                    AppError::InternalError(anyhow::anyhow!(
                        "Stored invoice number '{}' has no numeric prefix",
                        anchor
                    ))
                })?;
                last + 1
            }
            None => 1,
        };

        Ok(Self {
            sequence,
            financial_year: FinancialYear::containing(invoice_date),
        })
    }
}

impl fmt::Display for InvoiceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.sequence, self.financial_year)
    }
}
