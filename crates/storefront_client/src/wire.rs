#![forbid(unsafe_code)]

use serde::{Deserialize, Serialize};
use storefront_contracts::cart::{CartId, CartLine, CartSnapshot, LineId, ProductId};
use storefront_contracts::checkout::{CheckoutRequest, RedirectTarget};
use storefront_contracts::session::UserId;
use storefront_contracts::ContractViolation;

/// JSON shapes are dictated by the remote services; these DTOs convert
/// fallibly into validated contracts and never leak past this crate.

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireCartLine {
    pub line_id: String,
    pub product_id: String,
    pub name: String,
    #[serde(default)]
    pub image_ref: Option<String>,
    pub price: u64,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchCartBody {
    pub cart_id: String,
    pub user_id: String,
    pub lines: Vec<WireCartLine>,
    pub total: u64,
}

impl FetchCartBody {
    pub fn into_snapshot(self) -> Result<CartSnapshot, ContractViolation> {
        let mut lines = Vec::with_capacity(self.lines.len());
        for wire_line in self.lines {
            lines.push(CartLine::v1(
                LineId::new(wire_line.line_id)?,
                ProductId::new(wire_line.product_id)?,
                wire_line.name,
                wire_line.image_ref,
                wire_line.price,
                wire_line.quantity,
            )?);
        }
        CartSnapshot::v1(
            CartId::new(self.cart_id)?,
            UserId::new(self.user_id)?,
            lines,
            self.total,
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutateBody {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireCheckoutLine {
    pub product_id: String,
    pub price: u64,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutWireRequest {
    pub cart_id: String,
    pub user_id: String,
    pub lines: Vec<WireCheckoutLine>,
    pub total: u64,
    pub channel: String,
    pub callback_ref: String,
}

impl CheckoutWireRequest {
    pub fn from_request(request: &CheckoutRequest) -> Self {
        Self {
            cart_id: request.cart_id.as_str().to_string(),
            user_id: request.user_id.as_str().to_string(),
            lines: request
                .lines
                .iter()
                .map(|line| WireCheckoutLine {
                    product_id: line.product_id.as_str().to_string(),
                    price: line.unit_price_minor,
                    quantity: line.quantity,
                })
                .collect(),
            total: request.total_minor,
            channel: request.routing.channel.clone(),
            callback_ref: request.routing.callback_ref.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutBody {
    pub success: bool,
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub reference: Option<String>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub message: Option<String>,
}

impl CheckoutBody {
    /// The provider may omit the echoed total; the submitted one stands in.
    pub fn into_redirect_target(
        self,
        submitted_total_minor: u64,
    ) -> Result<RedirectTarget, ContractViolation> {
        let redirect_url = self.redirect_url.ok_or(ContractViolation::InvalidValue {
            field: "checkout_body.redirect_url",
            reason: "must be present on success",
        })?;
        RedirectTarget::v1(
            redirect_url,
            self.reference,
            self.total.unwrap_or(submitted_total_minor),
        )
    }
}
