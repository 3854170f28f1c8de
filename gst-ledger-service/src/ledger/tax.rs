//! GST split between intra-state (CGST + SGST) and inter-state (IGST) supply.

use super::{amount_out_of_range, round2, MAX_MONEY};
use rust_decimal::Decimal;
use serde::Serialize;
use service_core::error::AppError;

/// CGST and SGST are each charged at 9% on intra-state supply.
pub const HALF_GST_RATE: Decimal = Decimal::from_parts(9, 0, 0, false, 2);

/// IGST is charged at 18% on inter-state supply.
pub const FULL_GST_RATE: Decimal = Decimal::from_parts(18, 0, 0, false, 2);

/// Which side of the intra/inter-state rule an invoice falls on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxRegime {
    IntraState,
    InterState,
}

impl TaxRegime {
    /// Issuer and client share a jurisdiction when their state codes match.
    pub fn between(issuer_state_code: &str, client_state_code: &str) -> Self {
        if issuer_state_code
            .trim()
            .eq_ignore_ascii_case(client_state_code.trim())
        {
            TaxRegime::IntraState
        } else {
            TaxRegime::InterState
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaxRegime::IntraState => "intra_state",
            TaxRegime::InterState => "inter_state",
        }
    }
}

/// Computed tax figures for one invoice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaxAssessment {
    pub regime: TaxRegime,
    pub cgst: Decimal,
    pub sgst: Decimal,
    pub igst: Decimal,
    pub total_after_tax: Decimal,
}

impl TaxAssessment {
    pub fn total_tax(&self) -> Decimal {
        self.cgst + self.sgst + self.igst
    }
}

/// Apply the GST rule and ceil the grand total to a whole currency unit.
///
/// The ceiling is applied once, to the final sum, never to the tax components.
/// A grand total beyond [`MAX_MONEY`] is rejected.
pub fn assess(
    issuer_state_code: &str,
    client_state_code: &str,
    total_before_tax: Decimal,
    shipping_charges: Decimal,
) -> Result<TaxAssessment, AppError> {
    let regime = TaxRegime::between(issuer_state_code, client_state_code);
    let out_of_range = || amount_out_of_range("Invoice total");

    let (cgst, sgst, igst) = match regime {
        TaxRegime::IntraState => {
            let half = total_before_tax
                .checked_mul(HALF_GST_RATE)
                .map(round2)
                .ok_or_else(out_of_range)?;
            (half, half, Decimal::ZERO)
        }
        TaxRegime::InterState => {
            let full = total_before_tax
                .checked_mul(FULL_GST_RATE)
                .map(round2)
                .ok_or_else(out_of_range)?;
            (Decimal::ZERO, Decimal::ZERO, full)
        }
    };

    let total_after_tax = [shipping_charges, cgst, sgst, igst]
        .into_iter()
        .try_fold(total_before_tax, |sum, part| sum.checked_add(part))
        .map(|sum| sum.ceil())
        .filter(|total| *total <= MAX_MONEY)
        .ok_or_else(out_of_range)?;

    Ok(TaxAssessment {
        regime,
        cgst,
        sgst,
        igst,
        total_after_tax,
    })
}
