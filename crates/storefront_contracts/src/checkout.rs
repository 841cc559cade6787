#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};

use crate::cart::{CartId, ProductId};
use crate::common::validate_text;
use crate::session::UserId;
use crate::{ContractViolation, SchemaVersion, Validate};

pub const CHECKOUT_CONTRACT_VERSION: SchemaVersion = SchemaVersion(1);

/// Projection of one selected cart line into the checkout payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutLine {
    pub product_id: ProductId,
    pub unit_price_minor: u64,
    pub quantity: u32,
}

impl CheckoutLine {
    pub fn v1(
        product_id: ProductId,
        unit_price_minor: u64,
        quantity: u32,
    ) -> Result<Self, ContractViolation> {
        let line = Self {
            product_id,
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
                field: "checkout_line.line_total_minor",
            })
    }
}

impl Validate for CheckoutLine {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.quantity == 0 {
            return Err(ContractViolation::InvalidValue {
                field: "checkout_line.quantity",
                reason: "must be >= 1",
            });
        }
        self.line_total_minor()?;
        Ok(())
    }
}

/// Fixed payment-routing parameters attached to every submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentRouting {
    pub channel: String,
    pub callback_ref: String,
}

impl PaymentRouting {
    pub fn v1(channel: String, callback_ref: String) -> Result<Self, ContractViolation> {
        let routing = Self {
            channel,
            callback_ref,
        };
        routing.validate()?;
        Ok(routing)
    }

    pub fn default_v1() -> Self {
        Self {
            channel: "hosted_page".to_string(),
            callback_ref: "storefront://payment-return".to_string(),
        }
    }
}

impl Validate for PaymentRouting {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("payment_routing.channel", &self.channel, 64)?;
        validate_text("payment_routing.callback_ref", &self.callback_ref, 256)?;
        Ok(())
    }
}

/// Write-once checkout payload. Never persisted; lives for one submit call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutRequest {
    pub schema_version: SchemaVersion,
    pub cart_id: CartId,
    pub user_id: UserId,
    pub lines: Vec<CheckoutLine>,
    pub total_minor: u64,
    pub routing: PaymentRouting,
}

impl CheckoutRequest {
    pub fn v1(
        cart_id: CartId,
        user_id: UserId,
        lines: Vec<CheckoutLine>,
        total_minor: u64,
        routing: PaymentRouting,
    ) -> Result<Self, ContractViolation> {
        let request = Self {
            schema_version: CHECKOUT_CONTRACT_VERSION,
            cart_id,
            user_id,
            lines,
            total_minor,
            routing,
        };
        request.validate()?;
        Ok(request)
    }
}

impl Validate for CheckoutRequest {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.schema_version != CHECKOUT_CONTRACT_VERSION {
            return Err(ContractViolation::InvalidValue {
                field: "checkout_request.schema_version",
                reason: "must match CHECKOUT_CONTRACT_VERSION",
            });
        }
        if self.lines.is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "checkout_request.lines",
                reason: "must not be empty",
            });
        }
        self.routing.validate()?;
        let mut sum: u64 = 0;
        for line in &self.lines {
            line.validate()?;
            sum = sum
                .checked_add(line.line_total_minor()?)
                .ok_or(ContractViolation::ArithmeticOverflow {
                    field: "checkout_request.total_minor",
                })?;
        }
        if sum != self.total_minor {
            return Err(ContractViolation::InvalidValue {
                field: "checkout_request.total_minor",
                reason: "must equal sum of line totals",
            });
        }
        Ok(())
    }
}

/// Externally hosted payment page reference returned by the checkout service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget {
    pub redirect_url: String,
    pub reference: Option<String>,
    pub total_minor: u64,
}

impl RedirectTarget {
    pub fn v1(
        redirect_url: String,
        reference: Option<String>,
        total_minor: u64,
    ) -> Result<Self, ContractViolation> {
        let target = Self {
            redirect_url,
            reference,
            total_minor,
        };
        target.validate()?;
        Ok(target)
    }
}

impl Validate for RedirectTarget {
    fn validate(&self) -> Result<(), ContractViolation> {
        validate_text("redirect_target.redirect_url", &self.redirect_url, 2048)?;
        if let Some(reference) = &self.reference {
            validate_text("redirect_target.reference", reference, 256)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkout_line(product_id: &str, price: u64, qty: u32) -> CheckoutLine {
        CheckoutLine::v1(ProductId::new(product_id).unwrap(), price, qty).unwrap()
    }

    #[test]
    fn at_checkout_01_request_total_must_match_line_sum() {
        let cart_id = CartId::new("cart_1").unwrap();
        let user_id = UserId::new("user_1").unwrap();
        let lines = vec![
            checkout_line("product_a", 10_000, 2),
            checkout_line("product_b", 5_000, 1),
        ];
        let ok = CheckoutRequest::v1(
            cart_id.clone(),
            user_id.clone(),
            lines.clone(),
            25_000,
            PaymentRouting::default_v1(),
        );
        assert!(ok.is_ok());

        let wrong = CheckoutRequest::v1(cart_id, user_id, lines, 24_999, PaymentRouting::default_v1());
        assert!(wrong.is_err());
    }

    #[test]
    fn at_checkout_02_request_rejects_empty_lines() {
        let out = CheckoutRequest::v1(
            CartId::new("cart_1").unwrap(),
            UserId::new("user_1").unwrap(),
            Vec::new(),
            0,
            PaymentRouting::default_v1(),
        );
        assert!(out.is_err());
    }

    #[test]
    fn at_checkout_03_redirect_target_requires_url() {
        assert!(RedirectTarget::v1(String::new(), None, 25_000).is_err());
        let target =
            RedirectTarget::v1("https://pay.example/session/1".to_string(), None, 25_000).unwrap();
        assert_eq!(target.total_minor, 25_000);
    }
}
