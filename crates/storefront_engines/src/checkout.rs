#![forbid(unsafe_code)]

use storefront_contracts::cart::CartSnapshot;
use storefront_contracts::checkout::{CheckoutLine, CheckoutRequest, PaymentRouting};
use storefront_contracts::ReasonCodeId;

use crate::selection::SelectionSet;

pub mod reason_codes {
    use storefront_contracts::ReasonCodeId;

    // CHECKOUT.ASSEMBLE reason-code namespace.
    pub const CHECKOUT_OK_ASSEMBLED: ReasonCodeId = ReasonCodeId(0x434f_0001);

    pub const CHECKOUT_EMPTY_SELECTION: ReasonCodeId = ReasonCodeId(0x434f_00F1);
    pub const CHECKOUT_SELECTION_NOT_IN_SNAPSHOT: ReasonCodeId = ReasonCodeId(0x434f_00F2);
    pub const CHECKOUT_TOTAL_OVERFLOW: ReasonCodeId = ReasonCodeId(0x434f_00F3);
    pub const CHECKOUT_LINE_BUDGET_EXCEEDED: ReasonCodeId = ReasonCodeId(0x434f_00F4);
    pub const CHECKOUT_INTERNAL_ASSEMBLY_ERROR: ReasonCodeId = ReasonCodeId(0x434f_00F5);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckoutAssembleConfig {
    pub max_lines: u16,
}

impl CheckoutAssembleConfig {
    pub fn mvp_v1() -> Self {
        Self { max_lines: 200 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckoutAssembleOutcome {
    Ok {
        reason_code: ReasonCodeId,
        request: CheckoutRequest,
    },
    Refuse {
        reason_code: ReasonCodeId,
        detail: String,
    },
}

#[derive(Debug, Clone)]
pub struct CheckoutAssembler {
    config: CheckoutAssembleConfig,
}

impl CheckoutAssembler {
    pub fn new(config: CheckoutAssembleConfig) -> Self {
        Self { config }
    }

    /// Projects (snapshot x selection) into a checkout request with an
    /// independently recomputed total. The server-reported snapshot total
    /// is never reused: it covers the full cart, not the selected subset.
    pub fn assemble(
        &self,
        snapshot: &CartSnapshot,
        selection: &SelectionSet,
        routing: PaymentRouting,
    ) -> CheckoutAssembleOutcome {
        if selection.is_empty() {
            return refuse(
                reason_codes::CHECKOUT_EMPTY_SELECTION,
                "no cart lines selected for checkout",
            );
        }

        let mut lines = Vec::new();
        let mut total_minor: u64 = 0;
        for cart_line in &snapshot.lines {
            if !selection.is_selected(&cart_line.product_id) {
                continue;
            }
            let line_total = match cart_line.line_total_minor() {
                Ok(v) => v,
                Err(_) => {
                    return refuse(
                        reason_codes::CHECKOUT_TOTAL_OVERFLOW,
                        "selected line total overflows",
                    )
                }
            };
            let line = match CheckoutLine::v1(
                cart_line.product_id.clone(),
                cart_line.unit_price_minor,
                cart_line.quantity,
            ) {
                Ok(line) => line,
                Err(_) => {
                    return refuse(
                        reason_codes::CHECKOUT_INTERNAL_ASSEMBLY_ERROR,
                        "selected cart line failed checkout projection",
                    )
                }
            };
            total_minor = match total_minor.checked_add(line_total) {
                Some(v) => v,
                None => {
                    return refuse(
                        reason_codes::CHECKOUT_TOTAL_OVERFLOW,
                        "selected subset total overflows",
                    )
                }
            };
            lines.push(line);
        }

        if lines.is_empty() {
            // Selection held only identifiers the snapshot no longer carries.
            return refuse(
                reason_codes::CHECKOUT_SELECTION_NOT_IN_SNAPSHOT,
                "selection does not match any snapshot line",
            );
        }
        if lines.len() > usize::from(self.config.max_lines) {
            return refuse(
                reason_codes::CHECKOUT_LINE_BUDGET_EXCEEDED,
                "selected lines exceed configured budget",
            );
        }

        match CheckoutRequest::v1(
            snapshot.cart_id.clone(),
            snapshot.user_id.clone(),
            lines,
            total_minor,
            routing,
        ) {
            Ok(request) => CheckoutAssembleOutcome::Ok {
                reason_code: reason_codes::CHECKOUT_OK_ASSEMBLED,
                request,
            },
            Err(_) => refuse(
                reason_codes::CHECKOUT_INTERNAL_ASSEMBLY_ERROR,
                "failed to construct checkout request",
            ),
        }
    }
}

fn refuse(reason_code: ReasonCodeId, detail: &str) -> CheckoutAssembleOutcome {
    CheckoutAssembleOutcome::Refuse {
        reason_code,
        detail: detail.to_string(),
    }
}

/// Running subtotal over the selected subset; the same arithmetic the
/// assembled request carries, exposed for rendering.
pub fn selected_total(snapshot: &CartSnapshot, selection: &SelectionSet) -> Option<u64> {
    let mut total: u64 = 0;
    for line in &snapshot.lines {
        if !selection.is_selected(&line.product_id) {
            continue;
        }
        let line_total = line.line_total_minor().ok()?;
        total = total.checked_add(line_total)?;
    }
    Some(total)
}
