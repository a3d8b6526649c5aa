//! Conversation transition function
//!
//! The heart of the ordering flow: a pure, deterministic mapping from
//! (state, cart, event, catalog view) to (new state, new cart, actions).
//! No I/O, no clocks - identical inputs always yield identical outputs,
//! so every branch is unit-testable without mocking anything.
//!
//! The one side-effecting step (requesting a payment link) is emitted as
//! an intent action; the dispatcher performs the call and fills in the
//! order reference before committing the new state.

use crate::models::catalog::CatalogView;
use crate::models::event::EventKind;
use crate::models::order::PaymentStatus;
use crate::models::session::{merge_cart_line, CartLine, ConversationState};

use super::render;

/// Inputs the engine needs beyond the session itself
#[derive(Debug, Clone, Default)]
pub struct EngineContext {
    pub catalog: CatalogView,
    pub shop_name: String,
    pub currency_symbol: String,
}

/// An instruction for the dispatcher to execute after the commit
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Send a text message to the user
    Reply(String),
    /// Create an order from the cart snapshot and request a payment
    /// link; executed by the dispatcher before the commit (two-phase)
    RequestPayment { lines: Vec<CartLine>, address: String },
}

/// Result of one transition
#[derive(Debug, Clone)]
pub struct Transition {
    pub next_state: ConversationState,
    pub cart: Vec<CartLine>,
    pub actions: Vec<Action>,
}

impl Transition {
    fn to(next_state: ConversationState, cart: Vec<CartLine>) -> Self {
        Self { next_state, cart, actions: Vec::new() }
    }

    fn unchanged(state: &ConversationState, cart: &[CartLine]) -> Self {
        Self::to(state.clone(), cart.to_vec())
    }

    fn reply(mut self, message: String) -> Self {
        self.actions.push(Action::Reply(message));
        self
    }
}

/// Compute the transition for one inbound event.
///
/// Total over (state x event): unrecognized input falls through to a
/// contextual help reply with state and cart unchanged, so no input can
/// leave the machine unable to respond.
pub fn transition(
    state: &ConversationState,
    cart: &[CartLine],
    event: &EventKind,
    ctx: &EngineContext,
) -> Transition {
    match event {
        EventKind::PaymentConfirmation { order_ref, status } => {
            handle_payment_confirmation(state, cart, order_ref, *status, ctx)
        }
        EventKind::Text { body } => handle_text(state, cart, body, ctx),
        EventKind::Button { payload } => handle_text(state, cart, payload, ctx),
    }
}

fn handle_payment_confirmation(
    state: &ConversationState,
    cart: &[CartLine],
    confirmed_ref: &str,
    status: PaymentStatus,
    ctx: &EngineContext,
) -> Transition {
    match state {
        ConversationState::AwaitingPayment { order_ref } if order_ref == confirmed_ref => {
            match status {
                PaymentStatus::Paid => {
                    let total = crate::models::session::cart_total_minor(cart);
                    Transition::to(ConversationState::Completed, cart.to_vec()).reply(
                        render::payment_confirmed(confirmed_ref, total, &ctx.currency_symbol),
                    )
                }
                PaymentStatus::Failed | PaymentStatus::Expired => {
                    Transition::to(ConversationState::CartReview, cart.to_vec()).reply(
                        render::payment_not_completed(confirmed_ref, cart, &ctx.currency_symbol),
                    )
                }
                // A PENDING "confirmation" carries no information
                PaymentStatus::Pending => Transition::unchanged(state, cart),
            }
        }
        // Cross-talk guard: confirmations for another order, or arriving
        // while the session is elsewhere, leave the session untouched
        _ => Transition::unchanged(state, cart),
    }
}

fn handle_text(
    state: &ConversationState,
    cart: &[CartLine],
    raw: &str,
    ctx: &EngineContext,
) -> Transition {
    let normalized = raw.trim().to_lowercase();

    // Explicit cancellation works from every state: clear the cart and
    // start the cycle over
    if normalized == "cancel" || normalized == "restart" {
        return Transition::to(ConversationState::Idle, Vec::new()).reply(render::cancelled());
    }

    match state {
        ConversationState::Idle => handle_idle(cart, ctx),
        ConversationState::BrowsingCategories => handle_browsing_categories(state, cart, &normalized, ctx),
        ConversationState::BrowsingItems { category_id } => {
            handle_browsing_items(state, cart, *category_id, &normalized, ctx)
        }
        ConversationState::CartReview => handle_cart_review(state, cart, &normalized, ctx),
        ConversationState::AwaitingAddress => handle_awaiting_address(state, cart, raw, &normalized, ctx),
        ConversationState::AwaitingPayment { order_ref } => {
            let reply = if matches!(normalized.as_str(), "status" | "check" | "paid") {
                render::awaiting_payment_status(order_ref)
            } else {
                render::awaiting_payment_help(order_ref)
            };
            Transition::unchanged(state, cart).reply(reply)
        }
        // The dispatcher resets COMPLETED to IDLE in the same commit, so
        // this only fires on events raced against the reset
        ConversationState::Completed => {
            Transition::unchanged(state, cart).reply(render::idle_help())
        }
    }
}

fn handle_idle(cart: &[CartLine], ctx: &EngineContext) -> Transition {
    if ctx.catalog.is_empty() {
        return Transition::to(ConversationState::Idle, cart.to_vec())
            .reply(render::menu_unavailable(&ctx.shop_name));
    }
    Transition::to(ConversationState::BrowsingCategories, cart.to_vec())
        .reply(render::welcome(&ctx.shop_name, &ctx.catalog))
}

fn handle_browsing_categories(
    state: &ConversationState,
    cart: &[CartLine],
    normalized: &str,
    ctx: &EngineContext,
) -> Transition {
    if normalized == "cart" {
        return Transition::to(ConversationState::CartReview, cart.to_vec())
            .reply(render::cart_summary(cart, &ctx.currency_symbol));
    }

    if let Some((code, _)) = parse_selection(normalized) {
        if let Some(category) = ctx.catalog.category_by_code(code) {
            return Transition::to(
                ConversationState::BrowsingItems { category_id: category.id },
                cart.to_vec(),
            )
            .reply(render::item_list(&ctx.catalog, category.id, &ctx.currency_symbol));
        }
    }

    Transition::unchanged(state, cart).reply(render::invalid_category(&ctx.catalog))
}

fn handle_browsing_items(
    state: &ConversationState,
    cart: &[CartLine],
    category_id: i64,
    normalized: &str,
    ctx: &EngineContext,
) -> Transition {
    match normalized {
        "cart" => {
            return Transition::to(ConversationState::CartReview, cart.to_vec())
                .reply(render::cart_summary(cart, &ctx.currency_symbol));
        }
        "back" | "menu" | "categories" => {
            return Transition::to(ConversationState::BrowsingCategories, cart.to_vec())
                .reply(render::category_list(&ctx.catalog));
        }
        _ => {}
    }

    if let Some((code, quantity)) = parse_selection(normalized) {
        if let Some(item) = ctx.catalog.item_by_code(category_id, code) {
            let mut new_cart = cart.to_vec();
            merge_cart_line(&mut new_cart, item, quantity);
            let reply = render::added_to_cart(quantity, &item.name, &new_cart, &ctx.currency_symbol);
            return Transition::to(state.clone(), new_cart).reply(reply);
        }
    }

    Transition::unchanged(state, cart)
        .reply(render::invalid_item(&ctx.catalog, category_id, &ctx.currency_symbol))
}

fn handle_cart_review(
    state: &ConversationState,
    cart: &[CartLine],
    normalized: &str,
    ctx: &EngineContext,
) -> Transition {
    match normalized {
        "checkout" | "pay" | "order" | "proceed" => {
            return if cart.is_empty() {
                Transition::unchanged(state, cart).reply(render::checkout_empty_cart())
            } else {
                Transition::to(ConversationState::AwaitingAddress, cart.to_vec())
                    .reply(render::address_prompt())
            };
        }
        "menu" | "shop" | "back" | "continue" => {
            return Transition::to(ConversationState::BrowsingCategories, cart.to_vec())
                .reply(render::category_list(&ctx.catalog));
        }
        "clear" | "empty" => {
            return Transition::to(ConversationState::CartReview, Vec::new())
                .reply(render::cart_cleared());
        }
        _ => {}
    }

    if normalized.starts_with("remove") {
        return handle_remove(state, cart, normalized, ctx);
    }

    Transition::unchanged(state, cart).reply(render::cart_summary(cart, &ctx.currency_symbol))
}

fn handle_remove(
    state: &ConversationState,
    cart: &[CartLine],
    normalized: &str,
    ctx: &EngineContext,
) -> Transition {
    let index = normalized
        .strip_prefix("remove")
        .map(str::trim)
        .and_then(|rest| rest.parse::<usize>().ok());

    match index {
        Some(n) if n >= 1 && n <= cart.len() => {
            let mut new_cart = cart.to_vec();
            let removed = new_cart.remove(n - 1);
            let reply = render::removed_line(&removed.name, &new_cart, &ctx.currency_symbol);
            Transition::to(state.clone(), new_cart).reply(reply)
        }
        _ => Transition::unchanged(state, cart)
            .reply(render::invalid_remove(cart, &ctx.currency_symbol)),
    }
}

fn handle_awaiting_address(
    state: &ConversationState,
    cart: &[CartLine],
    raw: &str,
    normalized: &str,
    ctx: &EngineContext,
) -> Transition {
    if normalized == "back" {
        return Transition::to(ConversationState::CartReview, cart.to_vec())
            .reply(render::cart_summary(cart, &ctx.currency_symbol));
    }

    let address = raw.trim();
    if address.is_empty() {
        return Transition::unchanged(state, cart).reply(render::invalid_address());
    }

    // Two-phase payment step: emit the intent and move to a placeholder
    // AWAITING_PAYMENT; the dispatcher creates the order, requests the
    // payment link, and only then commits the real order_ref.
    let mut result = Transition::to(
        ConversationState::awaiting_payment_placeholder(),
        cart.to_vec(),
    );
    result.actions.push(Action::RequestPayment {
        lines: cart.to_vec(),
        address: address.to_string(),
    });
    result
}

/// Parse a numeric selection with an optional quantity suffix:
/// "3" -> (3, 1), "3x2" / "3 x 2" -> (3, 2). Quantity defaults to 1.
fn parse_selection(text: &str) -> Option<(usize, u32)> {
    let mut parts = text.splitn(2, ['x', 'X']);
    let code: usize = parts.next()?.trim().parse().ok()?;
    let quantity = match parts.next() {
        Some(raw) => {
            let quantity: u32 = raw.trim().parse().ok()?;
            if quantity == 0 || quantity > 99 {
                return None;
            }
            quantity
        }
        None => 1,
    };
    Some((code, quantity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::catalog::{Category, MenuItem};
    use std::collections::HashMap;

    fn ctx() -> EngineContext {
        let categories = vec![
            Category { id: 10, name: "Burgers".to_string(), ordering: 0 },
            Category { id: 20, name: "Drinks".to_string(), ordering: 1 },
        ];
        let mut items = HashMap::new();
        items.insert(10, vec![
            MenuItem {
                id: 1,
                category_id: 10,
                name: "Cheeseburger".to_string(),
                price_minor: 500,
                is_available: true,
            },
            MenuItem {
                id: 2,
                category_id: 10,
                name: "Fries".to_string(),
                price_minor: 200,
                is_available: true,
            },
        ]);
        items.insert(20, vec![MenuItem {
            id: 3,
            category_id: 20,
            name: "Cola".to_string(),
            price_minor: 150,
            is_available: true,
        }]);
        EngineContext {
            catalog: CatalogView::new(categories, items),
            shop_name: "ChowBuddy".to_string(),
            currency_symbol: "$".to_string(),
        }
    }

    fn text(body: &str) -> EventKind {
        EventKind::Text { body: body.to_string() }
    }

    #[test]
    fn test_idle_any_text_lists_categories() {
        let result = transition(&ConversationState::Idle, &[], &text("hi"), &ctx());
        assert_eq!(result.next_state, ConversationState::BrowsingCategories);
        assert!(matches!(&result.actions[0], Action::Reply(msg) if msg.contains("1. Burgers")));
    }

    #[test]
    fn test_invalid_category_selection_reprompts() {
        let state = ConversationState::BrowsingCategories;
        let result = transition(&state, &[], &text("9"), &ctx());
        assert_eq!(result.next_state, state);
        assert!(matches!(&result.actions[0], Action::Reply(msg) if msg.contains("valid number")));
    }

    #[test]
    fn test_item_selection_with_quantity() {
        let state = ConversationState::BrowsingItems { category_id: 10 };
        let result = transition(&state, &[], &text("2x3"), &ctx());
        assert_eq!(result.next_state, state);
        assert_eq!(result.cart.len(), 1);
        assert_eq!(result.cart[0].name, "Fries");
        assert_eq!(result.cart[0].quantity, 3);
    }

    #[test]
    fn test_checkout_with_empty_cart_is_rejected() {
        let result = transition(&ConversationState::CartReview, &[], &text("checkout"), &ctx());
        assert_eq!(result.next_state, ConversationState::CartReview);
        assert!(matches!(&result.actions[0], Action::Reply(msg) if msg.contains("empty")));
    }

    #[test]
    fn test_address_emits_payment_intent() {
        let cart = vec![CartLine {
            item_id: 1,
            name: "Cheeseburger".to_string(),
            quantity: 1,
            unit_price_minor: 500,
        }];
        let result = transition(&ConversationState::AwaitingAddress, &cart, &text("12 Palm St"), &ctx());
        assert_eq!(result.next_state, ConversationState::awaiting_payment_placeholder());
        assert!(matches!(
            &result.actions[0],
            Action::RequestPayment { address, lines } if address == "12 Palm St" && lines == &cart
        ));
    }

    #[test]
    fn test_matching_paid_confirmation_completes() {
        let cart = vec![CartLine {
            item_id: 1,
            name: "Cheeseburger".to_string(),
            quantity: 1,
            unit_price_minor: 500,
        }];
        let state = ConversationState::AwaitingPayment { order_ref: "ORD-1".to_string() };
        let event = EventKind::PaymentConfirmation {
            order_ref: "ORD-1".to_string(),
            status: PaymentStatus::Paid,
        };
        let result = transition(&state, &cart, &event, &ctx());
        assert_eq!(result.next_state, ConversationState::Completed);
    }

    #[test]
    fn test_cross_talk_confirmation_ignored() {
        let state = ConversationState::AwaitingPayment { order_ref: "ORD-S".to_string() };
        let event = EventKind::PaymentConfirmation {
            order_ref: "ORD-R".to_string(),
            status: PaymentStatus::Paid,
        };
        let result = transition(&state, &[], &event, &ctx());
        assert_eq!(result.next_state, state);
        assert!(result.actions.is_empty());
    }

    #[test]
    fn test_failed_confirmation_returns_to_cart_review() {
        let cart = vec![CartLine {
            item_id: 1,
            name: "Cheeseburger".to_string(),
            quantity: 1,
            unit_price_minor: 500,
        }];
        let state = ConversationState::AwaitingPayment { order_ref: "ORD-1".to_string() };
        let event = EventKind::PaymentConfirmation {
            order_ref: "ORD-1".to_string(),
            status: PaymentStatus::Failed,
        };
        let result = transition(&state, &cart, &event, &ctx());
        assert_eq!(result.next_state, ConversationState::CartReview);
        assert_eq!(result.cart, cart);
    }

    #[test]
    fn test_cancel_clears_cart_from_any_state() {
        let cart = vec![CartLine {
            item_id: 1,
            name: "Cheeseburger".to_string(),
            quantity: 2,
            unit_price_minor: 500,
        }];
        for state in [
            ConversationState::BrowsingCategories,
            ConversationState::BrowsingItems { category_id: 10 },
            ConversationState::CartReview,
            ConversationState::AwaitingAddress,
            ConversationState::AwaitingPayment { order_ref: "ORD-1".to_string() },
        ] {
            let result = transition(&state, &cart, &text("cancel"), &ctx());
            assert_eq!(result.next_state, ConversationState::Idle);
            assert!(result.cart.is_empty());
        }
    }

    #[test]
    fn test_remove_line_from_cart_review() {
        let cart = vec![
            CartLine {
                item_id: 1,
                name: "Cheeseburger".to_string(),
                quantity: 1,
                unit_price_minor: 500,
            },
            CartLine {
                item_id: 2,
                name: "Fries".to_string(),
                quantity: 1,
                unit_price_minor: 200,
            },
        ];
        let result = transition(&ConversationState::CartReview, &cart, &text("remove 1"), &ctx());
        assert_eq!(result.cart.len(), 1);
        assert_eq!(result.cart[0].name, "Fries");
        assert_eq!(result.next_state, ConversationState::CartReview);
    }

    #[test]
    fn test_parse_selection_formats() {
        assert_eq!(parse_selection("3"), Some((3, 1)));
        assert_eq!(parse_selection("3x2"), Some((3, 2)));
        assert_eq!(parse_selection("3 X 2"), Some((3, 2)));
        assert_eq!(parse_selection("3x0"), None);
        assert_eq!(parse_selection("abc"), None);
        assert_eq!(parse_selection(""), None);
    }
}
