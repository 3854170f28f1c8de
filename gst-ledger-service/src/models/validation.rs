//! Field validators shared by the write inputs.

use rust_decimal::Decimal;
use std::borrow::Cow;
use validator::ValidationError;

use crate::ledger::MAX_MONEY;

/// Money never carries fractions of a paisa.
const MONEY_SCALE: u32 = 2;

fn error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

/// Scale and upper bound shared by every stored money column.
fn check_money(value: &Decimal) -> Result<(), ValidationError> {
    if *value > MAX_MONEY {
        return Err(error("money_range", "Amount must not exceed 9999999999.99"));
    }
    if value.normalize().scale() > MONEY_SCALE {
        return Err(error("money_scale", "Amount must have at most 2 decimal places"));
    }
    Ok(())
}

pub fn positive_money(value: &Decimal) -> Result<(), ValidationError> {
    if *value <= Decimal::ZERO {
        return Err(error("money_positive", "Amount must be greater than zero"));
    }
    check_money(value)
}

pub fn non_negative_money(value: &Decimal) -> Result<(), ValidationError> {
    if *value < Decimal::ZERO {
        return Err(error("money_non_negative", "Amount cannot be negative"));
    }
    check_money(value)
}

/// HSN codes are 2 to 20 ASCII letters or digits.
pub fn hsn_code(value: &str) -> Result<(), ValidationError> {
    let len = value.len();
    if !(2..=20).contains(&len) || !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(error(
            "hsn_code",
            "HSN code must be 2-20 alphanumeric characters",
        ));
    }
    Ok(())
}

/// 15-character GSTIN: state digits, PAN, entity code, `Z`, check character.
pub fn gstin(value: &str) -> Result<(), ValidationError> {
    let bytes = value.as_bytes();
    let well_formed = bytes.len() == 15
        && bytes[..2].iter().all(u8::is_ascii_digit)
        && bytes[2..7].iter().all(u8::is_ascii_uppercase)
        && bytes[7..11].iter().all(u8::is_ascii_digit)
        && bytes[11].is_ascii_uppercase()
        && (bytes[12].is_ascii_uppercase() || (b'1'..=b'9').contains(&bytes[12]))
        && bytes[13] == b'Z'
        && (bytes[14].is_ascii_uppercase() || bytes[14].is_ascii_digit());

    if !well_formed {
        return Err(error("gstin", "GSTIN must be a valid 15-character GST number"));
    }
    Ok(())
}
