//! Pure invoice arithmetic and bookkeeping rules. Nothing in here touches storage.

pub mod amount_words;
pub mod numbering;
pub mod period;
pub mod reconcile;
pub mod tax;

pub use amount_words::amount_in_words;
pub use numbering::{FinancialYear, InvoiceNumber};
pub use period::Period;
pub use reconcile::{distinct_ids, net_amount, total_before_tax, ItemPlan, ItemWrite, WriteKind};
pub use tax::{assess, TaxAssessment, TaxRegime};

use rust_decimal::{Decimal, RoundingStrategy};
use service_core::error::AppError;

/// Largest amount a stored money column holds: `NUMERIC(12, 2)`, i.e. 9,999,999,999.99.
pub const MAX_MONEY: Decimal = Decimal::from_parts(3_567_587_327, 232, 0, false, 2);

/// Round to two decimal places, halves away from zero.
pub fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

pub(crate) fn amount_out_of_range(what: &str) -> AppError {
    AppError::BadRequest(anyhow::anyhow!(
        "{} exceeds the maximum of {}",
        what,
        MAX_MONEY
    ))
}
