//! Listing filters: a financial year, an explicit date range, or everything.

use super::numbering::FinancialYear;
use chrono::NaiveDate;
use service_core::error::AppError;

/// Inclusive date window applied to invoice or payment dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Period {
    #[default]
    All,
    Between { start: NaiveDate, end: NaiveDate },
}

impl Period {
    /// Build a period from optional query parameters.
    ///
    /// A financial year wins over explicit dates; explicit dates must be given together.
    pub fn resolve(
        financial_year: Option<&str>,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Self, AppError> {
        if let Some(label) = financial_year.map(str::trim).filter(|s| !s.is_empty()) {
            return Self::financial_year(label.parse()?);
        }

        match (start_date, end_date) {
            (Some(start), Some(end)) if start <= end => Ok(Period::Between { start, end }),
            (Some(start), Some(end)) => Err(AppError::BadRequest(anyhow::anyhow!(
                "start_date {} is after end_date {}",
                start,
                end
            ))),
            (None, None) => Ok(Period::All),
            _ => Err(AppError::BadRequest(anyhow::anyhow!(
                "start_date and end_date must be provided together"
            ))),
        }
    }

    pub fn financial_year(year: FinancialYear) -> Result<Self, AppError> {
        let (start, end) = year.date_range().ok_or_else(|| {
            AppError::BadRequest(anyhow::anyhow!("Financial year {} is out of range", year))
        })?;
        Ok(Period::Between { start, end })
    }

    /// Bounds as nullable query parameters.
    pub fn bounds(&self) -> (Option<NaiveDate>, Option<NaiveDate>) {
        match *self {
            Period::All => (None, None),
            Period::Between { start, end } => (Some(start), Some(end)),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        match *self {
            Period::All => true,
            Period::Between { start, end } => start <= date && date <= end,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_financial_year_takes_precedence() {
        let period =
            Period::resolve(Some("2023-24"), Some(date(2020, 1, 1)), Some(date(2020, 2, 1)))
                .unwrap();
        assert_eq!(
            period,
            Period::Between {
                start: date(2023, 4, 1),
                end: date(2024, 3, 31)
            }
        );
        assert!(period.contains(date(2024, 3, 31)));
        assert!(!period.contains(date(2024, 4, 1)));
    }

    #[test]
    fn test_explicit_range() {
        let period = Period::resolve(None, Some(date(2024, 1, 1)), Some(date(2024, 1, 31))).unwrap();
        assert_eq!(period.bounds(), (Some(date(2024, 1, 1)), Some(date(2024, 1, 31))));
    }

    #[test]
    fn test_blank_financial_year_is_ignored() {
        assert_eq!(Period::resolve(Some("  "), None, None).unwrap(), Period::All);
    }

    #[test]
    fn test_half_open_range_is_rejected() {
        assert!(Period::resolve(None, Some(date(2024, 1, 1)), None).is_err());
        assert!(Period::resolve(None, Some(date(2024, 2, 1)), Some(date(2024, 1, 1))).is_err());
    }
}
