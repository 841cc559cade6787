#![forbid(unsafe_code)]

use std::collections::BTreeMap;

use storefront_contracts::cart::{CartId, ProductId};
use storefront_contracts::session::SessionToken;
use storefront_contracts::ContractViolation;

#[derive(Debug, Clone, PartialEq)]
pub enum StorageError {
    EmptyValue { table: &'static str, key: String },
    ContractViolation(ContractViolation),
}

impl From<ContractViolation> for StorageError {
    fn from(v: ContractViolation) -> Self {
        StorageError::ContractViolation(v)
    }
}

/// Client-local durable key-value store: the session token row and the
/// per-cart selected-identifier list a later screen re-derives the
/// checkout subset from.
#[derive(Debug, Clone, Default)]
pub struct ClientStore {
    session_token: Option<SessionToken>,
    selected_items: BTreeMap<CartId, Vec<ProductId>>,
}

impl ClientStore {
    pub fn new_in_memory() -> Self {
        Self::default()
    }

    pub fn session_token_put(&mut self, token: SessionToken) {
        self.session_token = Some(token);
    }

    pub fn session_token_get(&self) -> Option<&SessionToken> {
        self.session_token.as_ref()
    }

    pub fn session_token_clear(&mut self) {
        self.session_token = None;
    }

    /// Replaces the persisted selected-identifier list for the cart.
    pub fn selected_items_put(
        &mut self,
        cart_id: CartId,
        product_ids: Vec<ProductId>,
    ) -> Result<(), StorageError> {
        if product_ids.is_empty() {
            return Err(StorageError::EmptyValue {
                table: "selected_items",
                key: cart_id.as_str().to_string(),
            });
        }
        self.selected_items.insert(cart_id, product_ids);
        Ok(())
    }

    pub fn selected_items_get(&self, cart_id: &CartId) -> Option<&[ProductId]> {
        self.selected_items.get(cart_id).map(Vec::as_slice)
    }

    pub fn selected_items_clear(&mut self, cart_id: &CartId) {
        self.selected_items.remove(cart_id);
    }
}
