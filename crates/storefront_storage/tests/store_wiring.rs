#![forbid(unsafe_code)]

use storefront_contracts::cart::{CartId, ProductId};
use storefront_contracts::session::SessionToken;
use storefront_storage::{ClientStore, StorageError};

fn cart(id: &str) -> CartId {
    CartId::new(id).unwrap()
}

fn product(id: &str) -> ProductId {
    ProductId::new(id).unwrap()
}

#[test]
fn at_store_01_session_token_put_get_clear() {
    let mut store = ClientStore::new_in_memory();
    assert!(store.session_token_get().is_none());

    let token = SessionToken::new("tok_abc123").unwrap();
    store.session_token_put(token.clone());
    assert_eq!(store.session_token_get(), Some(&token));

    // Put replaces the single row.
    let newer = SessionToken::new("tok_def456").unwrap();
    store.session_token_put(newer.clone());
    assert_eq!(store.session_token_get(), Some(&newer));

    store.session_token_clear();
    assert!(store.session_token_get().is_none());
}

#[test]
fn at_store_02_selected_items_replace_per_cart() {
    let mut store = ClientStore::new_in_memory();
    store
        .selected_items_put(cart("cart_1"), vec![product("product_a"), product("product_b")])
        .unwrap();
    store
        .selected_items_put(cart("cart_2"), vec![product("product_c")])
        .unwrap();

    assert_eq!(
        store.selected_items_get(&cart("cart_1")).unwrap().len(),
        2
    );

    store
        .selected_items_put(cart("cart_1"), vec![product("product_a")])
        .unwrap();
    assert_eq!(
        store.selected_items_get(&cart("cart_1")).unwrap(),
        &[product("product_a")]
    );
    assert_eq!(
        store.selected_items_get(&cart("cart_2")).unwrap(),
        &[product("product_c")]
    );
}

#[test]
fn at_store_03_empty_selected_list_is_rejected() {
    let mut store = ClientStore::new_in_memory();
    let out = store.selected_items_put(cart("cart_1"), Vec::new());
    assert_eq!(
        out,
        Err(StorageError::EmptyValue {
            table: "selected_items",
            key: "cart_1".to_string(),
        })
    );
    assert!(store.selected_items_get(&cart("cart_1")).is_none());
}

#[test]
fn at_store_04_selected_items_clear_removes_row() {
    let mut store = ClientStore::new_in_memory();
    store
        .selected_items_put(cart("cart_1"), vec![product("product_a")])
        .unwrap();
    store.selected_items_clear(&cart("cart_1"));
    assert!(store.selected_items_get(&cart("cart_1")).is_none());
}
