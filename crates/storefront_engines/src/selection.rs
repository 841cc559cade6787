#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use storefront_contracts::cart::{CartSnapshot, ProductId};

/// User-chosen subset of cart lines intended for one checkout.
///
/// Always a subset of the product identifiers in the current snapshot:
/// reseeded to the full set on every snapshot replacement, pruned when a
/// line is removed server-side between reloads.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SelectionSet {
    selected: BTreeSet<ProductId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to the full product-identifier set of the snapshot
    /// (default "all selected" on every fresh load).
    pub fn seed_from_snapshot(&mut self, snapshot: &CartSnapshot) {
        self.selected = snapshot.product_ids();
    }

    /// Flips membership. Identifiers absent from the snapshot are ignored
    /// so the set can never grow past the snapshot.
    pub fn toggle(&mut self, product_id: &ProductId, snapshot: &CartSnapshot) {
        if self.selected.contains(product_id) {
            self.selected.remove(product_id);
        } else if snapshot.line_for_product(product_id).is_some() {
            self.selected.insert(product_id.clone());
        }
    }

    pub fn select_all(&mut self, snapshot: &CartSnapshot) {
        self.seed_from_snapshot(snapshot);
    }

    pub fn clear_all(&mut self) {
        self.selected.clear();
    }

    pub fn remove(&mut self, product_id: &ProductId) {
        self.selected.remove(product_id);
    }

    /// Stale-selection invariant: drop every identifier the snapshot no
    /// longer carries.
    pub fn retain_products_of(&mut self, snapshot: &CartSnapshot) {
        let present = snapshot.product_ids();
        self.selected.retain(|id| present.contains(id));
    }

    pub fn is_selected(&self, product_id: &ProductId) -> bool {
        self.selected.contains(product_id)
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProductId> {
        self.selected.iter()
    }

    pub fn to_vec(&self) -> Vec<ProductId> {
        self.selected.iter().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storefront_contracts::cart::{CartId, CartLine, LineId};
    use storefront_contracts::session::UserId;

    fn snapshot(products: &[(&str, u64, u32)]) -> CartSnapshot {
        let lines = products
            .iter()
            .enumerate()
            .map(|(i, (product_id, price, qty))| {
                CartLine::v1(
                    LineId::new(format!("line_{i}")).unwrap(),
                    ProductId::new(*product_id).unwrap(),
                    format!("name:{product_id}"),
                    None,
                    *price,
                    *qty,
                )
                .unwrap()
            })
            .collect();
        CartSnapshot::v1(
            CartId::new("cart_1").unwrap(),
            UserId::new("user_1").unwrap(),
            lines,
            products
                .iter()
                .map(|(_, price, qty)| price * u64::from(*qty))
                .sum(),
        )
        .unwrap()
    }

    fn product(id: &str) -> ProductId {
        ProductId::new(id).unwrap()
    }

    #[test]
    fn at_selection_01_seed_selects_every_line() {
        let snap = snapshot(&[("product_a", 10_000, 2), ("product_b", 5_000, 1)]);
        let mut selection = SelectionSet::new();
        selection.seed_from_snapshot(&snap);
        assert_eq!(selection.len(), snap.lines.len());
        assert!(selection.is_selected(&product("product_a")));
        assert!(selection.is_selected(&product("product_b")));
    }

    #[test]
    fn at_selection_02_select_all_then_clear_all() {
        let snap = snapshot(&[("product_a", 10_000, 2), ("product_b", 5_000, 1)]);
        let mut selection = SelectionSet::new();
        selection.select_all(&snap);
        assert_eq!(selection.len(), 2);
        selection.clear_all();
        assert_eq!(selection.len(), 0);
        assert!(selection.is_empty());
    }

    #[test]
    fn at_selection_03_toggle_flips_membership() {
        let snap = snapshot(&[("product_a", 10_000, 2), ("product_b", 5_000, 1)]);
        let mut selection = SelectionSet::new();
        selection.seed_from_snapshot(&snap);
        selection.toggle(&product("product_b"), &snap);
        assert!(!selection.is_selected(&product("product_b")));
        selection.toggle(&product("product_b"), &snap);
        assert!(selection.is_selected(&product("product_b")));
    }

    #[test]
    fn at_selection_04_toggle_ignores_unknown_product() {
        let snap = snapshot(&[("product_a", 10_000, 2)]);
        let mut selection = SelectionSet::new();
        selection.seed_from_snapshot(&snap);
        selection.toggle(&product("product_zzz"), &snap);
        assert_eq!(selection.len(), 1);
        assert!(!selection.is_selected(&product("product_zzz")));
    }

    #[test]
    fn at_selection_05_retain_prunes_stale_ids() {
        let first = snapshot(&[("product_a", 10_000, 2), ("product_b", 5_000, 1)]);
        let mut selection = SelectionSet::new();
        selection.seed_from_snapshot(&first);

        let second = snapshot(&[("product_a", 10_000, 2)]);
        selection.retain_products_of(&second);
        assert!(selection.is_selected(&product("product_a")));
        assert!(!selection.is_selected(&product("product_b")));
    }
}
