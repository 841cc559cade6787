#![forbid(unsafe_code)]

use storefront_contracts::cart::{CartSnapshot, ProductId};
use storefront_contracts::checkout::{PaymentRouting, RedirectTarget};
use storefront_contracts::session::SessionToken;
use storefront_engines::checkout::{
    reason_codes, selected_total, CheckoutAssembleConfig, CheckoutAssembleOutcome,
    CheckoutAssembler,
};
use storefront_engines::mutation::{plan_decrease, DecreasePlan, InFlightGuard};
use storefront_engines::selection::SelectionSet;
use storefront_storage::ClientStore;

use crate::cart_service::CartServiceRuntime;
use crate::checkout_service::CheckoutServiceRuntime;
use crate::error::ClientError;

pub const DECREASE_RETRY_LIMIT_DEFAULT: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    Applied,
    /// A newer reload was applied while this one was in flight; the
    /// response is dropped so it cannot clobber fresher state.
    StaleDiscarded,
}

/// Session-scoped cart view: the snapshot cache, the selection set, and
/// the per-product in-flight flags, updated together at every reload
/// application point.
#[derive(Debug, Clone, Default)]
pub struct CartSessionState {
    pub snapshot: Option<CartSnapshot>,
    pub selection: SelectionSet,
    pub in_flight: InFlightGuard,
    applied_reload_seq: u64,
    next_reload_seq: u64,
}

impl CartSessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags a reload about to be issued. Sequence numbers only grow, so a
    /// response can be ordered against whatever was applied meanwhile.
    pub fn begin_reload(&mut self) -> u64 {
        self.next_reload_seq += 1;
        self.next_reload_seq
    }

    /// Wholesale replacement: snapshot swapped, selection reseeded to the
    /// full product set. Responses older than the applied one are dropped.
    pub fn apply_reload(&mut self, seq: u64, snapshot: CartSnapshot) -> ReloadOutcome {
        if seq <= self.applied_reload_seq {
            return ReloadOutcome::StaleDiscarded;
        }
        self.applied_reload_seq = seq;
        self.selection.seed_from_snapshot(&snapshot);
        self.snapshot = Some(snapshot);
        ReloadOutcome::Applied
    }

    /// An obviously-empty cart beats a stale one: load failures clear the
    /// snapshot and selection. In-flight flags stay owned by their calls.
    pub fn clear_cart_view(&mut self) {
        self.snapshot = None;
        self.selection.clear_all();
    }

    pub fn toggle(&mut self, product_id: &ProductId) {
        if let Some(snapshot) = &self.snapshot {
            self.selection.toggle(product_id, snapshot);
        }
    }

    pub fn select_all(&mut self) {
        if let Some(snapshot) = &self.snapshot {
            self.selection.select_all(snapshot);
        }
    }

    pub fn clear_all(&mut self) {
        self.selection.clear_all();
    }

    pub fn is_selected(&self, product_id: &ProductId) -> bool {
        self.selection.is_selected(product_id)
    }

    /// Subtotal over the selected subset, from the same arithmetic the
    /// checkout request carries.
    pub fn selected_total_minor(&self) -> Option<u64> {
        let snapshot = self.snapshot.as_ref()?;
        selected_total(snapshot, &self.selection)
    }

    pub fn unmount(&mut self) {
        self.snapshot = None;
        self.selection.clear_all();
        self.in_flight.clear_all();
        self.applied_reload_seq = 0;
        self.next_reload_seq = 0;
    }
}

/// Orchestrates the cart screen's operations against the remote cart and
/// checkout services, the local store, and one `CartSessionState`.
///
/// Single logical thread of control: every operation runs to completion
/// before the next is issued, so exclusivity is the per-product in-flight
/// flag, not a lock.
#[derive(Debug)]
pub struct CartSessionRuntime {
    cart: CartServiceRuntime,
    checkout: CheckoutServiceRuntime,
    store: ClientStore,
    routing: PaymentRouting,
    assembler: CheckoutAssembler,
    decrease_retry_limit: u32,
}

impl CartSessionRuntime {
    pub fn new(cart: CartServiceRuntime, checkout: CheckoutServiceRuntime, store: ClientStore) -> Self {
        Self {
            cart,
            checkout,
            store,
            routing: PaymentRouting::default_v1(),
            assembler: CheckoutAssembler::new(CheckoutAssembleConfig::mvp_v1()),
            decrease_retry_limit: DECREASE_RETRY_LIMIT_DEFAULT,
        }
    }

    pub fn with_routing(mut self, routing: PaymentRouting) -> Self {
        self.routing = routing;
        self
    }

    pub fn store(&self) -> &ClientStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ClientStore {
        &mut self.store
    }

    pub fn cart_service(&self) -> &CartServiceRuntime {
        &self.cart
    }

    fn session_token(&self) -> Option<SessionToken> {
        self.store.session_token_get().cloned()
    }

    /// Full fetch-and-replace. Triggered on mount, on every return to
    /// foreground, and after each mutation.
    pub fn load(&mut self, state: &mut CartSessionState) -> Result<ReloadOutcome, ClientError> {
        let Some(token) = self.session_token() else {
            state.clear_cart_view();
            return Err(ClientError::NoSession);
        };
        let seq = state.begin_reload();
        match self.cart.fetch_cart(&token) {
            Ok(snapshot) => Ok(state.apply_reload(seq, snapshot)),
            Err(err) => {
                state.clear_cart_view();
                Err(err)
            }
        }
    }

    pub fn increase(
        &mut self,
        state: &mut CartSessionState,
        product_id: &ProductId,
    ) -> Result<(), ClientError> {
        let Some(token) = self.session_token() else {
            return Err(ClientError::NoSession);
        };
        if !state.in_flight.try_begin(product_id) {
            return Err(ClientError::MutationInFlight {
                product_id: product_id.clone(),
            });
        }
        let result = match self.cart.add_quantity(&token, product_id, 1) {
            Ok(()) => self.reload_after_mutation(state),
            Err(err) => Err(err),
        };
        state.in_flight.finish(product_id);
        result
    }

    pub fn decrease(
        &mut self,
        state: &mut CartSessionState,
        product_id: &ProductId,
    ) -> Result<(), ClientError> {
        let Some(token) = self.session_token() else {
            return Err(ClientError::NoSession);
        };
        if !state.in_flight.try_begin(product_id) {
            return Err(ClientError::MutationInFlight {
                product_id: product_id.clone(),
            });
        }
        let result = self.decrease_locked(state, &token, product_id);
        state.in_flight.finish(product_id);
        result
    }

    fn decrease_locked(
        &mut self,
        state: &mut CartSessionState,
        token: &SessionToken,
        product_id: &ProductId,
    ) -> Result<(), ClientError> {
        let quantity = match state
            .snapshot
            .as_ref()
            .and_then(|snapshot| snapshot.line_for_product(product_id))
        {
            Some(line) => line.quantity,
            None => {
                return Err(ClientError::Validation {
                    field: "decrease.product_id",
                    reason: "no cart line for product",
                })
            }
        };
        match plan_decrease(quantity) {
            // Decreasing a singleton removes the line outright; the end
            // state is identical to an explicit remove.
            DecreasePlan::RemoveLine => {
                self.cart.remove_item(token, product_id)?;
                state.selection.remove(product_id);
                self.reload_after_mutation(state)
            }
            // The two-step sequence is not atomic: if the re-add cannot
            // complete after the remove succeeded, the line is gone rather
            // than merely reduced. Retry, then surface the gap distinctly.
            DecreasePlan::RemoveThenReAdd { re_add_quantity } => {
                self.cart.remove_item(token, product_id)?;
                let mut last_err = None;
                for _ in 0..=self.decrease_retry_limit {
                    match self.cart.add_quantity(token, product_id, re_add_quantity) {
                        Ok(()) => {
                            last_err = None;
                            break;
                        }
                        Err(err) => last_err = Some(err),
                    }
                }
                match last_err {
                    None => self.reload_after_mutation(state),
                    Some(err) => {
                        // Resync to whatever the server now holds before
                        // surfacing the failure.
                        let _ = self.reload_after_mutation(state);
                        let detail = match err {
                            ClientError::Transport { detail, .. } => detail,
                            other => format!("{other:?}"),
                        };
                        Err(ClientError::PartialMutation {
                            product_id: product_id.clone(),
                            detail: format!("could not restore quantity: {detail}"),
                        })
                    }
                }
            }
        }
    }

    pub fn remove(
        &mut self,
        state: &mut CartSessionState,
        product_id: &ProductId,
    ) -> Result<(), ClientError> {
        let Some(token) = self.session_token() else {
            return Err(ClientError::NoSession);
        };
        if !state.in_flight.try_begin(product_id) {
            return Err(ClientError::MutationInFlight {
                product_id: product_id.clone(),
            });
        }
        let result = match self.cart.remove_item(&token, product_id) {
            Ok(()) => {
                state.selection.remove(product_id);
                self.reload_after_mutation(state)
            }
            Err(err) => Err(err),
        };
        state.in_flight.finish(product_id);
        result
    }

    /// Assembles the selected subset into a checkout request, persists the
    /// selected identifiers, and hands the submit to the provider. Neither
    /// the snapshot nor the selection is mutated on failure.
    pub fn submit_checkout(
        &mut self,
        state: &mut CartSessionState,
    ) -> Result<RedirectTarget, ClientError> {
        let Some(token) = self.session_token() else {
            return Err(ClientError::NoSession);
        };
        let Some(snapshot) = state.snapshot.as_ref() else {
            return Err(ClientError::Validation {
                field: "checkout.snapshot",
                reason: "cart snapshot is not loaded",
            });
        };
        if state.selection.is_empty() {
            return Err(ClientError::Validation {
                field: "checkout.selection",
                reason: "no cart lines selected",
            });
        }
        let request = match self
            .assembler
            .assemble(snapshot, &state.selection, self.routing.clone())
        {
            CheckoutAssembleOutcome::Ok { request, .. } => request,
            CheckoutAssembleOutcome::Refuse { reason_code, .. } => {
                let reason = if reason_code == reason_codes::CHECKOUT_EMPTY_SELECTION {
                    "no cart lines selected"
                } else if reason_code == reason_codes::CHECKOUT_SELECTION_NOT_IN_SNAPSHOT {
                    "selection does not match any snapshot line"
                } else if reason_code == reason_codes::CHECKOUT_TOTAL_OVERFLOW {
                    "selected subset total overflows"
                } else {
                    "checkout assembly failed"
                };
                return Err(ClientError::Validation {
                    field: "checkout.assemble",
                    reason,
                });
            }
        };
        self.store
            .selected_items_put(request.cart_id.clone(), state.selection.to_vec())?;
        self.checkout.submit(&token, &request)
    }

    fn reload_after_mutation(&mut self, state: &mut CartSessionState) -> Result<(), ClientError> {
        self.load(state).map(|_| ())
    }
}
