//! Long-form rupee amounts using the Indian numbering system.

use super::round2;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

const ONES: [&str; 20] = [
    "",
    "One",
    "Two",
    "Three",
    "Four",
    "Five",
    "Six",
    "Seven",
    "Eight",
    "Nine",
    "Ten",
    "Eleven",
    "Twelve",
    "Thirteen",
    "Fourteen",
    "Fifteen",
    "Sixteen",
    "Seventeen",
    "Eighteen",
    "Nineteen",
];

const TENS: [&str; 10] = [
    "", "", "Twenty", "Thirty", "Forty", "Fifty", "Sixty", "Seventy", "Eighty", "Ninety",
];

const CRORE: u64 = 10_000_000;
const LAKH: u64 = 100_000;
const THOUSAND: u64 = 1_000;

fn below_hundred(n: u64) -> String {
    debug_assert!(n < 100);
    let n = n as usize;
    if n < 20 {
        ONES[n].to_string()
    } else if n % 10 == 0 {
        TENS[n / 10].to_string()
    } else {
        format!("{} {}", TENS[n / 10], ONES[n % 10])
    }
}

/// Spell out a whole number: crore, lakh, thousand, hundred, then "and" before
/// the last two digits when something larger precedes them.
pub fn number_to_words(n: u64) -> String {
    if n == 0 {
        return "Zero".to_string();
    }

    let mut parts: Vec<String> = Vec::new();

    let crores = n / CRORE;
    if crores > 0 {
        parts.push(format!("{} Crore", number_to_words(crores)));
    }

    let lakhs = (n % CRORE) / LAKH;
    if lakhs > 0 {
        parts.push(format!("{} Lakh", below_hundred(lakhs)));
    }

    let thousands = (n % LAKH) / THOUSAND;
    if thousands > 0 {
        parts.push(format!("{} Thousand", below_hundred(thousands)));
    }

    let hundreds = (n % THOUSAND) / 100;
    if hundreds > 0 {
        parts.push(format!("{} Hundred", ONES[hundreds as usize]));
    }

    let rest = n % 100;
    if n > 100 && rest != 0 {
        parts.push("and".to_string());
    }
    if rest > 0 {
        parts.push(below_hundred(rest));
    }

    parts.join(" ")
}

/// Format an invoice amount, e.g. `295` -> "Two Hundred and Ninety Five Rupees Only".
pub fn amount_in_words(amount: Decimal) -> String {
    let amount = round2(amount.abs());
    let rupees = amount.trunc().to_u64().unwrap_or(u64::MAX);
    let paise = (amount.fract() * Decimal::ONE_HUNDRED).to_u64().unwrap_or(0);

    let mut words = format!("{} Rupees", number_to_words(rupees));
    if paise > 0 {
        words.push_str(&format!(" and {} Paise", number_to_words(paise)));
    }
    words.push_str(" Only");
    words
}
