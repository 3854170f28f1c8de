//! Line-item pricing and the diff between stored and submitted items on update.

use super::{amount_out_of_range, round2, MAX_MONEY};
use rust_decimal::Decimal;
use service_core::error::AppError;
use std::collections::HashSet;
use uuid::Uuid;

/// `rate * quantity`, rounded to two decimals.
pub fn net_amount(rate: Decimal, quantity: i32) -> Result<Decimal, AppError> {
    rate.checked_mul(Decimal::from(quantity))
        .map(round2)
        .filter(|amount| *amount <= MAX_MONEY)
        .ok_or_else(|| amount_out_of_range("Line amount"))
}

/// Sum of unrounded `quantity * rate`, ceiled to a whole currency unit.
pub fn total_before_tax<I>(lines: I) -> Result<Decimal, AppError>
where
    I: IntoIterator<Item = (Decimal, i32)>,
{
    let mut total = Decimal::ZERO;
    for (rate, quantity) in lines {
        total = rate
            .checked_mul(Decimal::from(quantity))
            .and_then(|line| total.checked_add(line))
            .ok_or_else(|| amount_out_of_range("Total before tax"))?;
    }

    let total = total.ceil();
    if total > MAX_MONEY {
        return Err(amount_out_of_range("Total before tax"));
    }
    Ok(total)
}

/// Ids carried by submitted items, rejecting any id given twice.
pub fn distinct_ids(submitted: &[Option<Uuid>]) -> Result<HashSet<Uuid>, AppError> {
    let mut seen = HashSet::new();
    for id in submitted.iter().flatten() {
        if !seen.insert(*id) {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Line item {} appears more than once",
                id
            )));
        }
    }
    Ok(seen)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteKind {
    Update,
    Insert,
}

/// One submitted item and what to do with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemWrite {
    /// Index into the submitted list; also the stored display position.
    pub position: usize,
    pub id: Uuid,
    pub kind: WriteKind,
}

/// Writes that turn the stored item set into the submitted one.
///
/// Deletes are applied first, then `writes` in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPlan {
    pub delete: Vec<Uuid>,
    pub writes: Vec<ItemWrite>,
}

impl ItemPlan {
    /// Diff `stored` item ids against the ids carried by the submitted items.
    ///
    /// Stored items the submission no longer mentions are deleted. Submitted items
    /// without an id, or with an id this invoice does not own, are inserted under a
    /// fresh id. The same id submitted twice is rejected.
    pub fn build(stored: &[Uuid], submitted: &[Option<Uuid>]) -> Result<Self, AppError> {
        let stored_ids: HashSet<Uuid> = stored.iter().copied().collect();
        let seen = distinct_ids(submitted)?;

        let delete = stored
            .iter()
            .filter(|id| !seen.contains(id))
            .copied()
            .collect();

        let writes = submitted
            .iter()
            .enumerate()
            .map(|(position, id)| match id {
                Some(id) if stored_ids.contains(id) => ItemWrite {
                    position,
                    id: *id,
                    kind: WriteKind::Update,
                },
                _ => ItemWrite {
                    position,
                    id: Uuid::new_v4(),
                    kind: WriteKind::Insert,
                },
            })
            .collect();

        Ok(Self { delete, writes })
    }
}
