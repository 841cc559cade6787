#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use storefront_contracts::cart::ProductId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MutationKind {
    Increase,
    Decrease,
    Remove,
}

impl MutationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MutationKind::Increase => "INCREASE",
            MutationKind::Decrease => "DECREASE",
            MutationKind::Remove => "REMOVE",
        }
    }
}

/// How a quantity decrement maps onto the two server primitives.
///
/// The server exposes add-quantity and remove-item only, so "quantity - 1"
/// must be synthesized as remove-then-re-add. Decreasing a singleton is
/// defined as removal; a zero-quantity line must never exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecreasePlan {
    RemoveLine,
    RemoveThenReAdd { re_add_quantity: u32 },
}

pub fn plan_decrease(quantity: u32) -> DecreasePlan {
    if quantity <= 1 {
        DecreasePlan::RemoveLine
    } else {
        DecreasePlan::RemoveThenReAdd {
            re_add_quantity: quantity - 1,
        }
    }
}

/// Per-product mutation-in-flight flags.
///
/// At most one mutation per product identifier at a time; an attempt while
/// the flag is set is rejected, never queued. The flag is cleared only by
/// `finish` (success or failure) or by session teardown.
#[derive(Debug, Clone, Default)]
pub struct InFlightGuard {
    in_flight: BTreeSet<ProductId>,
}

impl InFlightGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the flag; returns false if a mutation is already in flight.
    pub fn try_begin(&mut self, product_id: &ProductId) -> bool {
        self.in_flight.insert(product_id.clone())
    }

    pub fn finish(&mut self, product_id: &ProductId) {
        self.in_flight.remove(product_id);
    }

    pub fn is_in_flight(&self, product_id: &ProductId) -> bool {
        self.in_flight.contains(product_id)
    }

    pub fn clear_all(&mut self) {
        self.in_flight.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(id: &str) -> ProductId {
        ProductId::new(id).unwrap()
    }

    #[test]
    fn at_mutation_01_decrease_of_singleton_is_removal() {
        assert_eq!(plan_decrease(1), DecreasePlan::RemoveLine);
    }

    #[test]
    fn at_mutation_02_decrease_decomposes_to_remove_then_re_add() {
        assert_eq!(
            plan_decrease(2),
            DecreasePlan::RemoveThenReAdd { re_add_quantity: 1 }
        );
        assert_eq!(
            plan_decrease(5),
            DecreasePlan::RemoveThenReAdd { re_add_quantity: 4 }
        );
    }

    #[test]
    fn at_mutation_03_guard_rejects_second_begin() {
        let mut guard = InFlightGuard::new();
        let a = product("product_a");
        assert!(guard.try_begin(&a));
        assert!(guard.is_in_flight(&a));
        assert!(!guard.try_begin(&a));
        guard.finish(&a);
        assert!(!guard.is_in_flight(&a));
        assert!(guard.try_begin(&a));
    }

    #[test]
    fn at_mutation_04_guard_tracks_products_independently() {
        let mut guard = InFlightGuard::new();
        assert!(guard.try_begin(&product("product_a")));
        assert!(guard.try_begin(&product("product_b")));
        assert!(!guard.try_begin(&product("product_a")));
        guard.clear_all();
        assert!(!guard.is_in_flight(&product("product_a")));
        assert!(!guard.is_in_flight(&product("product_b")));
    }
}
