#![forbid(unsafe_code)]

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::common::validate_text;
use crate::session::UserId;
use crate::{ContractViolation, SchemaVersion, Validate};

pub const CART_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CartId(String);

impl CartId {
    pub fn new(id: impl Into<String>) -> Result<Self, ContractViolation> {
        let id = id.into();
        validate_text("cart_id", &id, 128)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProductId(String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Result<Self, ContractViolation> {
        let id = id.into();
        validate_text("product_id", &id, 128)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Unique within one snapshot; the stable render key for a line.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineId(String);

impl LineId {
    pub fn new(id: impl Into<String>) -> Result<Self, ContractViolation> {
        let id = id.into();
        validate_text("line_id", &id, 128)?;
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub line_id: LineId,
    pub product_id: ProductId,
    pub name: String,
    pub image_ref: Option<String>,
    pub unit_price_minor: u64,
    pub quantity: u32,
}

impl CartLine {
    pub fn v1(
        line_id: LineId,
        product_id: ProductId,
        name: String,
        image_ref: Option<String>,
        unit_price_minor: u64,
        quantity: u32,
    ) -> Result<Self, ContractViolation> {
        let line = Self {
            line_id,
            product_id,
            name,
            image_ref,
            unit_price_minor,
            quantity,
        };
        line.validate()?;
        Ok(line)
    }

    pub fn line_total_minor(&self) -> Result<u64, ContractViolation> {
        self.unit_price_minor
            .checked_mul(u64::from(self.quantity))
            .ok_or(ContractViolation::ArithmeticOverflow {
                field: "cart_line.line_total_minor",
            })
    }
}

impl Validate for CartLine {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("cart_line.name", &self.name, 256)?;
        if let Some(image_ref) = &self.image_ref {
            validate_text("cart_line.image_ref", image_ref, 512)?;
        }
        // A line reduced to zero is deleted by removal, never represented.
        if self.quantity == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "cart_line.quantity",
                reason: "must be >= 1",
            });
        }
        self.line_total_minor()?;
        Ok(())
    }
}

/// Complete, wholesale-replaced copy of server cart state held client-side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSnapshot {
    pub schema_version: SchemaVersion,
    pub cart_id: CartId,
    pub user_id: UserId,
    pub lines: Vec<CartLine>,
    pub server_total_minor: u64,
}

impl CartSnapshot {
    pub fn v1(
        cart_id: CartId,
        user_id: UserId,
        lines: Vec<CartLine>,
        server_total_minor: u64,
    ) -> Result<Self, ContractViolation> {
        let snapshot = Self {
            schema_version: CART_CONTRACT_VERSION,
            cart_id,
            user_id,
            lines,
            server_total_minor,
        };
        snapshot.validate()?;
        Ok(snapshot)
    }

    pub fn line_for_product(&self, product_id: &ProductId) -> Option<&CartLine> {
        self.lines.iter().find(|line| &line.product_id == product_id)
    }

    pub fn product_ids(&self) -> BTreeSet<ProductId> {
        self.lines
            .iter()
            .map(|line| line.product_id.clone())
            .collect()
    }
}

impl Validate for CartSnapshot {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != CART_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "cart_snapshot.schema_version",
                reason: "must match CART_CONTRACT_VERSION",
            });
        }
        if self.lines.len() > 200 {
            return Err(ContractViolation::InvalidValue {
                field: "cart_snapshot.lines",
                reason: "must hold <= 200 lines",
            });
        }
        let mut seen_lines = BTreeSet::new();
        let mut seen_products = BTreeSet::new();
        for line in &self.lines {
            line.validate()?;
            if !seen_lines.insert(&line.line_id) {
                return Err(ContractViolation::InvalidValue {
                    field: "cart_snapshot.lines",
                    reason: "line_id must be unique within snapshot",
                });
            }
            if !seen_products.insert(&line.product_id) {
                return Err(ContractViolation::InvalidValue {
                    field: "cart_snapshot.lines",
                    reason: "product_id must be unique within snapshot",
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(line_id: &str, product_id: &str, price: u64, qty: u32) -> CartLine {
        CartLine::v1(
            LineId::new(line_id).unwrap(),
            ProductId::new(product_id).unwrap(),
            format!("name:{product_id}"),
            None,
            price,
            qty,
        )
        .unwrap()
    }

    #[test]
    fn at_cart_01_zero_quantity_line_is_rejected() {
        let out = CartLine::v1(
            LineId::new("line_1").unwrap(),
            ProductId::new("product_a").unwrap(),
            "widget".to_string(),
            None,
            10_000,
            0,
        );
        assert!(out.is_err());
    }

    #[test]
    fn at_cart_02_snapshot_rejects_duplicate_product_ids() {
        let out = CartSnapshot::v1(
            CartId::new("cart_1").unwrap(),
            UserId::new("user_1").unwrap(),
            vec![
                line("line_1", "product_a", 10_000, 2),
                line("line_2", "product_a", 10_000, 1),
            ],
            30_000,
        );
        assert!(out.is_err());
    }

    #[test]
    fn at_cart_03_snapshot_rejects_duplicate_line_ids() {
        let out = CartSnapshot::v1(
            CartId::new("cart_1").unwrap(),
            UserId::new("user_1").unwrap(),
            vec![
                line("line_1", "product_a", 10_000, 2),
                line("line_1", "product_b", 5_000, 1),
            ],
            25_000,
        );
        assert!(out.is_err());
    }

    #[test]
    fn at_cart_04_line_total_checks_overflow() {
        let line = CartLine {
            line_id: LineId::new("line_1").unwrap(),
            product_id: ProductId::new("product_a").unwrap(),
            name: "widget".to_string(),
            image_ref: None,
            unit_price_minor: u64::MAX,
            quantity: 2,
        };
        assert!(line.line_total_minor().is_err());
        assert!(line.validate().is_err());
    }

    #[test]
    fn at_cart_05_line_lookup_by_product() {
        let snapshot = CartSnapshot::v1(
            CartId::new("cart_1").unwrap(),
            UserId::new("user_1").unwrap(),
            vec![
                line("line_1", "product_a", 10_000, 2),
                line("line_2", "product_b", 5_000, 1),
            ],
            25_000,
        )
        .unwrap();
        let a = ProductId::new("product_a").unwrap();
        assert_eq!(snapshot.line_for_product(&a).unwrap().quantity, 2);
        let missing = ProductId::new("product_zzz").unwrap();
        assert!(snapshot.line_for_product(&missing).is_none());
        assert_eq!(snapshot.product_ids().len(), 2);
    }
}
