use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::{EngineError, EngineResult};

/// Largest payout a single win may grant (10 million in currency units).
pub const MAX_PAYOUT_CENTS: i64 = 1_000_000_000;

/// One reward candidate of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WeightedItem {
    pub id: i64,
    pub name: String,
    /// Relative draw weight; 0 keeps the item displayable but never drawn
    pub weight: i32,
    pub min_quantity: i32,
    pub max_quantity: i32,
    /// Value of one unit (cents)
    pub value_cents: i64,
    pub active: bool,
}

impl WeightedItem {
    pub fn is_drawable(&self) -> bool {
        self.active && self.weight > 0
    }

    /// Inclusive quantity range a win may grant. A drawable item always
    /// grants at least one unit.
    pub fn quantity_range(&self) -> (i32, i32) {
        (self.min_quantity.max(1), self.max_quantity)
    }

    /// `value × quantity`, `None` on overflow.
    pub fn payout_for(&self, quantity: i32) -> Option<i64> {
        self.value_cents.checked_mul(quantity as i64)
    }

    /// Largest payout of this item not above `ceiling`, with the quantity
    /// that produces it.
    pub fn largest_fit(&self, ceiling: i64) -> Option<(i32, i64)> {
        if self.value_cents <= 0 || ceiling < 0 {
            return None;
        }
        let (lo, hi) = self.quantity_range();
        let fit = (ceiling / self.value_cents).min(hi as i64);
        if fit < lo as i64 {
            return None;
        }
        Some((fit as i32, fit.checked_mul(self.value_cents)?))
    }

    pub fn validate(&self) -> EngineResult<()> {
        if self.weight < 0 {
            return Err(EngineError::validation(format!(
                "item {}: weight must be >= 0",
                self.id
            )));
        }
        if self.min_quantity < 0 || self.max_quantity < 0 {
            return Err(EngineError::validation(format!(
                "item {}: quantities must be >= 0",
                self.id
            )));
        }
        if self.min_quantity > self.max_quantity {
            return Err(EngineError::validation(format!(
                "item {}: min_quantity {} exceeds max_quantity {}",
                self.id, self.min_quantity, self.max_quantity
            )));
        }
        if self.value_cents < 0 {
            return Err(EngineError::validation(format!(
                "item {}: value must be >= 0",
                self.id
            )));
        }
        // a drawn item must pay something, otherwise a "win" would pay 0
        if self.weight > 0 && (self.value_cents == 0 || self.max_quantity == 0) {
            return Err(EngineError::validation(format!(
                "item {}: a weighted item needs a positive value and max_quantity",
                self.id
            )));
        }
        if self
            .payout_for(self.max_quantity)
            .is_none_or(|max| max > MAX_PAYOUT_CENTS)
        {
            return Err(EngineError::validation(format!(
                "item {}: value x max_quantity exceeds {} cents",
                self.id, MAX_PAYOUT_CENTS
            )));
        }
        Ok(())
    }
}

/// Reward candidates of a single product.
///
/// Items are kept sorted by id; that order is the fixed walk order of the
/// weighted selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightedItemPool {
    items: Vec<WeightedItem>,
}

impl WeightedItemPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool from stored items, validating each one.
    pub fn from_items(items: impl IntoIterator<Item = WeightedItem>) -> EngineResult<Self> {
        let mut pool = Self::new();
        for item in items {
            pool.add_item(item)?;
        }
        Ok(pool)
    }

    pub fn items(&self) -> &[WeightedItem] {
        &self.items
    }

    pub fn get(&self, item_id: i64) -> Option<&WeightedItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    /// Active items with a positive weight, in draw order.
    pub fn effective_items(&self) -> impl Iterator<Item = &WeightedItem> {
        self.items.iter().filter(|i| i.is_drawable())
    }

    /// Sum of effective weights. 0 means the pool cannot be drawn.
    pub fn total_weight(&self) -> i64 {
        self.effective_items().map(|i| i.weight as i64).sum()
    }

    pub fn is_playable(&self) -> bool {
        self.total_weight() > 0
    }

    pub fn add_item(&mut self, item: WeightedItem) -> EngineResult<()> {
        item.validate()?;
        match self.items.binary_search_by_key(&item.id, |i| i.id) {
            Ok(_) => Err(EngineError::validation(format!(
                "item {} already exists",
                item.id
            ))),
            Err(pos) => {
                self.items.insert(pos, item);
                Ok(())
            }
        }
    }

    pub fn set_weight(&mut self, item_id: i64, weight: i32) -> EngineResult<&WeightedItem> {
        let item = self.item_mut(item_id)?;
        let mut updated = item.clone();
        updated.weight = weight;
        updated.validate()?;
        *item = updated;
        Ok(item)
    }

    pub fn deactivate_item(&mut self, item_id: i64) -> EngineResult<&WeightedItem> {
        let item = self.item_mut(item_id)?;
        item.active = false;
        Ok(item)
    }

    /// Pick an item by weight from a uniform draw in `[0, total_weight)`.
    pub fn pick(&self, draw: i64) -> Option<&WeightedItem> {
        let mut acc = 0i64;
        for item in self.effective_items() {
            acc += item.weight as i64;
            if draw < acc {
                return Some(item);
            }
        }
        None
    }

    /// Among effective items strictly cheaper than `below_value`, the one
    /// whose largest payout under `ceiling` is greatest. Ties keep draw order.
    pub fn cheapest_fit(&self, ceiling: i64, below_value: i64) -> Option<(&WeightedItem, i32, i64)> {
        let mut best: Option<(&WeightedItem, i32, i64)> = None;
        for item in self.effective_items().filter(|i| i.value_cents < below_value) {
            if let Some((qty, payout)) = item.largest_fit(ceiling)
                && best.is_none_or(|(_, _, p)| payout > p)
            {
                best = Some((item, qty, payout));
            }
        }
        best
    }

    fn item_mut(&mut self, item_id: i64) -> EngineResult<&mut WeightedItem> {
        self.items
            .iter_mut()
            .find(|i| i.id == item_id)
            .ok_or_else(|| EngineError::validation(format!("item {item_id} not found")))
    }
}

#[cfg(test)]
pub(crate) fn item(id: i64, weight: i32, min: i32, max: i32, value: i64) -> WeightedItem {
    WeightedItem {
        id,
        name: format!("item-{id}"),
        weight,
        min_quantity: min,
        max_quantity: max,
        value_cents: value,
        active: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_items_skip_inactive_and_zero_weight() {
        let mut pool = WeightedItemPool::new();
        pool.add_item(item(3, 5, 1, 1, 100)).unwrap();
        pool.add_item(item(1, 0, 0, 0, 0)).unwrap();
        pool.add_item(item(2, 2, 1, 2, 50)).unwrap();
        pool.deactivate_item(3).unwrap();

        let ids: Vec<i64> = pool.effective_items().map(|i| i.id).collect();
        assert_eq!(ids, vec![2]);
        assert_eq!(pool.total_weight(), 2);
        // zero-weight and inactive items are still listed
        assert_eq!(pool.items().len(), 3);
    }

    #[test]
    fn test_empty_pool_has_zero_weight() {
        let pool = WeightedItemPool::new();
        assert_eq!(pool.total_weight(), 0);
        assert!(!pool.is_playable());
        assert!(pool.pick(0).is_none());
    }

    #[test]
    fn test_add_item_rejects_bad_quantities() {
        let mut pool = WeightedItemPool::new();
        let err = pool.add_item(item(1, 1, 3, 2, 100)).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(pool.items().is_empty());
    }

    #[test]
    fn test_add_item_rejects_duplicate_id() {
        let mut pool = WeightedItemPool::new();
        pool.add_item(item(1, 1, 1, 1, 100)).unwrap();
        assert!(pool.add_item(item(1, 2, 1, 1, 100)).is_err());
    }

    #[test]
    fn test_weighted_item_must_pay() {
        let mut pool = WeightedItemPool::new();
        assert!(pool.add_item(item(1, 1, 0, 0, 100)).is_err());
        assert!(pool.add_item(item(2, 1, 1, 1, 0)).is_err());
    }

    #[test]
    fn test_item_payout_is_bounded() {
        let mut pool = WeightedItemPool::new();
        let err = pool.add_item(item(1, 1, 2, 2, i64::MAX / 2 + 1)).unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
        assert!(pool.add_item(item(2, 1, 1, 3, MAX_PAYOUT_CENTS / 3 + 1)).is_err());
        // zero weight items are displayable only, still bounded
        assert!(pool.add_item(item(3, 0, 1, 10, MAX_PAYOUT_CENTS)).is_err());
        pool.add_item(item(4, 1, 1, 2, MAX_PAYOUT_CENTS / 2)).unwrap();
        assert_eq!(pool.get(4).unwrap().payout_for(2), Some(MAX_PAYOUT_CENTS));
    }

    #[test]
    fn test_set_weight_rejects_negative_and_keeps_old_value() {
        let mut pool = WeightedItemPool::from_items([item(1, 4, 1, 1, 100)]).unwrap();
        assert!(pool.set_weight(1, -1).is_err());
        assert_eq!(pool.get(1).unwrap().weight, 4);
        assert_eq!(pool.set_weight(1, 9).unwrap().weight, 9);
        assert!(pool.set_weight(42, 1).is_err());
    }

    #[test]
    fn test_pick_walks_cumulative_weight() {
        let pool = WeightedItemPool::from_items([item(1, 1, 1, 1, 10), item(2, 3, 1, 1, 20)])
            .unwrap();
        assert_eq!(pool.pick(0).unwrap().id, 1);
        assert_eq!(pool.pick(1).unwrap().id, 2);
        assert_eq!(pool.pick(3).unwrap().id, 2);
        assert!(pool.pick(4).is_none());
    }

    #[test]
    fn test_largest_fit_and_cheapest_fit() {
        let big = item(1, 1, 2, 5, 100);
        assert_eq!(big.largest_fit(450), Some((4, 400)));
        assert_eq!(big.largest_fit(900), Some((5, 500)));
        assert_eq!(big.largest_fit(150), None);

        let pool = WeightedItemPool::from_items([
            item(1, 1, 1, 1, 500),
            item(2, 1, 1, 3, 40),
            item(3, 1, 1, 1, 100),
        ])
        .unwrap();
        let (chosen, qty, payout) = pool.cheapest_fit(130, 500).unwrap();
        assert_eq!((chosen.id, qty, payout), (2, 3, 120));
        assert!(pool.cheapest_fit(30, 500).is_none());
    }
}
