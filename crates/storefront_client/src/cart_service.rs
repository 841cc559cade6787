#![forbid(unsafe_code)]

use std::cell::RefCell;
use std::collections::BTreeMap;

use storefront_contracts::cart::{CartId, CartLine, CartSnapshot, LineId, ProductId};
use storefront_contracts::session::{SessionToken, UserId};
use storefront_contracts::ContractViolation;

use crate::error::ClientError;
use crate::http;
use crate::wire::{FetchCartBody, MutateBody};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartHttpConfig {
    pub endpoint: String,
    pub connect_timeout_ms: u64,
    pub request_timeout_ms: u64,
}

impl CartHttpConfig {
    pub fn from_env() -> Option<Self> {
        let endpoint = http::env_endpoint("STOREFRONT_CART_ENDPOINT")?;
        Some(Self {
            endpoint,
            connect_timeout_ms: http::env_ms(
                "STOREFRONT_HTTP_CONNECT_TIMEOUT_MS",
                100..=60_000,
                http::CONNECT_TIMEOUT_MS_DEFAULT,
            ),
            request_timeout_ms: http::env_ms(
                "STOREFRONT_HTTP_REQUEST_TIMEOUT_MS",
                100..=120_000,
                http::REQUEST_TIMEOUT_MS_DEFAULT,
            ),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CatalogEntry {
    name: String,
    unit_price_minor: u64,
}

/// Deterministic cart backend for tests: a mutable cart table with the
/// same add/remove primitives the remote service exposes, plus scripted
/// transient failures so retry and partial-mutation paths are drivable
/// without a server.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCart {
    cart_id: String,
    user_id: String,
    catalog: BTreeMap<String, CatalogEntry>,
    rows: Vec<(String, u32)>,
    fail_next_fetch: u32,
    fail_next_add: BTreeMap<String, u32>,
    fail_next_remove: BTreeMap<String, u32>,
    pub op_log: Vec<String>,
}

impl InMemoryCart {
    pub fn new(cart_id: &str, user_id: &str) -> Self {
        Self {
            cart_id: cart_id.to_string(),
            user_id: user_id.to_string(),
            ..Self::default()
        }
    }

    /// Registers the product in the price catalog and seeds a line.
    pub fn seed_line(&mut self, product_id: &str, name: &str, unit_price_minor: u64, quantity: u32) {
        self.catalog.insert(
            product_id.to_string(),
            CatalogEntry {
                name: name.to_string(),
                unit_price_minor,
            },
        );
        if quantity > 0 {
            self.rows.push((product_id.to_string(), quantity));
        }
    }

    pub fn fail_next_fetch(&mut self, count: u32) {
        self.fail_next_fetch = count;
    }

    pub fn fail_next_add_for(&mut self, product_id: &str, count: u32) {
        self.fail_next_add.insert(product_id.to_string(), count);
    }

    pub fn fail_next_remove_for(&mut self, product_id: &str, count: u32) {
        self.fail_next_remove.insert(product_id.to_string(), count);
    }

    pub fn quantity_of(&self, product_id: &str) -> Option<u32> {
        self.rows
            .iter()
            .find(|(id, _)| id == product_id)
            .map(|(_, qty)| *qty)
    }

    /// Drops a line without going through the client, simulating a
    /// removal performed by another device between reloads.
    pub fn drop_line_server_side(&mut self, product_id: &str) {
        self.rows.retain(|(id, _)| id != product_id);
    }

    fn take_scripted_failure(table: &mut BTreeMap<String, u32>, product_id: &str) -> bool {
        match table.get_mut(product_id) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                true
            }
            _ => false,
        }
    }

    fn fetch(&mut self) -> Result<CartSnapshot, ClientError> {
        self.op_log.push("fetch".to_string());
        if self.fail_next_fetch > 0 {
            self.fail_next_fetch -= 1;
            return Err(ClientError::transport(
                "connection",
                None,
                "scripted fetch failure",
            ));
        }
        let mut lines = Vec::new();
        let mut total: u64 = 0;
        for (product_id, quantity) in &self.rows {
            let entry = self.catalog.get(product_id).ok_or_else(|| {
                ClientError::transport("contract_invalid", None, "row without catalog entry")
            })?;
            let line = CartLine::v1(
                LineId::new(format!("line_{product_id}"))?,
                ProductId::new(product_id.clone())?,
                entry.name.clone(),
                None,
                entry.unit_price_minor,
                *quantity,
            )?;
            total = total
                .checked_add(line.line_total_minor()?)
                .ok_or(ContractViolation::ArithmeticOverflow {
                    field: "in_memory_cart.total",
                })?;
            lines.push(line);
        }
        Ok(CartSnapshot::v1(
            CartId::new(self.cart_id.clone())?,
            UserId::new(self.user_id.clone())?,
            lines,
            total,
        )?)
    }

    fn add_quantity(&mut self, product_id: &str, quantity: u32) -> Result<(), ClientError> {
        if Self::take_scripted_failure(&mut self.fail_next_add, product_id) {
            self.op_log.push(format!("add_fail:{product_id}:{quantity}"));
            return Err(ClientError::transport(
                "connection",
                None,
                "scripted add failure",
            ));
        }
        if !self.catalog.contains_key(product_id) {
            self.op_log.push(format!("add_reject:{product_id}"));
            return Err(ClientError::transport(
                "rejected",
                None,
                "unknown product for add",
            ));
        }
        self.op_log.push(format!("add:{product_id}:{quantity}"));
        match self.rows.iter_mut().find(|(id, _)| id == product_id) {
            Some((_, existing)) => *existing = existing.saturating_add(quantity),
            None => self.rows.push((product_id.to_string(), quantity)),
        }
        Ok(())
    }

    fn remove_item(&mut self, product_id: &str) -> Result<(), ClientError> {
        if Self::take_scripted_failure(&mut self.fail_next_remove, product_id) {
            self.op_log.push(format!("remove_fail:{product_id}"));
            return Err(ClientError::transport(
                "connection",
                None,
                "scripted remove failure",
            ));
        }
        self.op_log.push(format!("remove:{product_id}"));
        self.rows.retain(|(id, _)| id != product_id);
        Ok(())
    }
}

#[derive(Debug)]
pub enum CartServiceRuntime {
    Http(CartHttpConfig),
    InMemory(RefCell<InMemoryCart>),
}

impl CartServiceRuntime {
    pub fn in_memory(cart: InMemoryCart) -> Self {
        Self::InMemory(RefCell::new(cart))
    }

    pub fn as_in_memory(&self) -> Option<&RefCell<InMemoryCart>> {
        match self {
            Self::InMemory(cell) => Some(cell),
            Self::Http(_) => None,
        }
    }

    pub fn fetch_cart(&self, token: &SessionToken) -> Result<CartSnapshot, ClientError> {
        match self {
            Self::InMemory(cell) => cell.borrow_mut().fetch(),
            Self::Http(config) => http_fetch_cart(config, token),
        }
    }

    /// Increments an existing line or creates one; never decrements.
    pub fn add_quantity(
        &self,
        token: &SessionToken,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<(), ClientError> {
        match self {
            Self::InMemory(cell) => cell.borrow_mut().add_quantity(product_id.as_str(), quantity),
            Self::Http(config) => http_mutate(
                config,
                token,
                "cart/items/add",
                &serde_json::json!({
                    "product_id": product_id.as_str(),
                    "quantity": quantity,
                }),
            ),
        }
    }

    /// Deletes the entire line unconditionally; not a decrement.
    pub fn remove_item(
        &self,
        token: &SessionToken,
        product_id: &ProductId,
    ) -> Result<(), ClientError> {
        match self {
            Self::InMemory(cell) => cell.borrow_mut().remove_item(product_id.as_str()),
            Self::Http(config) => http_mutate(
                config,
                token,
                "cart/items/remove",
                &serde_json::json!({
                    "product_id": product_id.as_str(),
                }),
            ),
        }
    }
}

fn http_fetch_cart(
    config: &CartHttpConfig,
    token: &SessionToken,
) -> Result<CartSnapshot, ClientError> {
    let agent = http::build_agent(config.connect_timeout_ms, config.request_timeout_ms);
    let url = format!("{}/cart", config.endpoint.trim_end_matches('/'));
    let response = agent
        .get(&url)
        .set("accept", "application/json")
        .set("authorization", &format!("Bearer {}", token.as_str()))
        .call()
        .map_err(http::transport_error)?;
    let body: FetchCartBody = serde_json::from_reader(response.into_reader())
        .map_err(|_| ClientError::transport("json_parse", None, "cart fetch body is not valid json"))?;
    Ok(body.into_snapshot()?)
}

fn http_mutate(
    config: &CartHttpConfig,
    token: &SessionToken,
    path: &str,
    payload: &serde_json::Value,
) -> Result<(), ClientError> {
    let agent = http::build_agent(config.connect_timeout_ms, config.request_timeout_ms);
    let url = format!("{}/{path}", config.endpoint.trim_end_matches('/'));
    let response = agent
        .post(&url)
        .set("content-type", "application/json")
        .set("accept", "application/json")
        .set("authorization", &format!("Bearer {}", token.as_str()))
        .send_json(payload.clone())
        .map_err(http::transport_error)?;
    let body: MutateBody = serde_json::from_reader(response.into_reader())
        .map_err(|_| ClientError::transport("json_parse", None, "cart mutate body is not valid json"))?;
    if !body.success {
        return Err(ClientError::transport(
            "rejected",
            None,
            body.message
                .unwrap_or_else(|| "cart mutation rejected by service".to_string()),
        ));
    }
    Ok(())
}
