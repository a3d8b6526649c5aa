//! Outbound message rendering
//!
//! All user-facing message text lives here, built from catalog snapshots
//! and cart contents. Selection codes shown to the user are 1-based list
//! positions matching `CatalogView` resolution.

use crate::models::catalog::CatalogView;
use crate::models::session::{cart_item_count, cart_total_minor, CartLine};
use crate::utils::helpers::format_minor;

/// Welcome message with the category list, shown on first contact
pub fn welcome(shop_name: &str, view: &CatalogView) -> String {
    format!(
        "Welcome to {}! 🍽️\n\nHere are our menu categories:\n\n{}\n\nReply with a number to see items, or type 'cart' to view your cart.",
        shop_name,
        category_lines(view)
    )
}

/// Plain category list for re-prompts and "back" navigation
pub fn category_list(view: &CatalogView) -> String {
    format!(
        "📋 Menu Categories:\n\n{}\n\nReply with a number to see items.",
        category_lines(view)
    )
}

pub fn invalid_category(view: &CatalogView) -> String {
    format!(
        "Please reply with a valid number (1-{}).\n\n{}",
        view.categories.len(),
        category_lines(view)
    )
}

pub fn menu_unavailable(shop_name: &str) -> String {
    format!(
        "Welcome to {}! 🍽️\n\nSorry, our menu is currently unavailable. Please try again later.",
        shop_name
    )
}

fn category_lines(view: &CatalogView) -> String {
    view.categories
        .iter()
        .enumerate()
        .map(|(i, cat)| format!("{}. {}", i + 1, cat.name))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Item list for a category
pub fn item_list(view: &CatalogView, category_id: i64, symbol: &str) -> String {
    let category_name = view.category_name(category_id).unwrap_or("Items");
    let items = view.items(category_id);

    if items.is_empty() {
        return "No items available in this category.\n\nType 'back' to see categories.".to_string();
    }

    let lines = items
        .iter()
        .enumerate()
        .map(|(i, item)| format!("{}. {} - {}", i + 1, item.name, format_minor(item.price_minor, symbol)))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "🍽️ {}:\n\n{}\n\nReply with an item number to add to cart (e.g. '1' or '1x2'), 'cart' to review, or 'back' for categories.",
        category_name, lines
    )
}

pub fn invalid_item(view: &CatalogView, category_id: i64, symbol: &str) -> String {
    format!(
        "Please reply with a valid item number.\n\n{}",
        item_list(view, category_id, symbol)
    )
}

pub fn added_to_cart(quantity: u32, item_name: &str, cart: &[CartLine], symbol: &str) -> String {
    format!(
        "✅ Added {}x {} to your cart.\n\nCart total: {} ({} items)\n\nReply with another item number, 'cart' to checkout, or 'back' for categories.",
        quantity,
        item_name,
        format_minor(cart_total_minor(cart), symbol),
        cart_item_count(cart)
    )
}

/// Cart contents with the available commands
pub fn cart_summary(cart: &[CartLine], symbol: &str) -> String {
    if cart.is_empty() {
        return cart_empty();
    }

    let lines = cart
        .iter()
        .enumerate()
        .map(|(i, line)| {
            format!(
                "{}. {}x {} - {}",
                i + 1,
                line.quantity,
                line.name,
                format_minor(line.subtotal_minor(), symbol)
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "🛒 Your Cart:\n\n{}\n\n━━━━━━━━━━━━━━━━\nTotal: {}\n\nReply:\n• 'checkout' - Proceed to payment\n• 'menu' - Continue shopping\n• 'remove 1' - Remove item #1\n• 'clear' - Empty cart",
        lines,
        format_minor(cart_total_minor(cart), symbol)
    )
}

pub fn cart_empty() -> String {
    "🛒 Your cart is empty!\n\nType 'menu' to browse our menu and add items.".to_string()
}

pub fn cart_cleared() -> String {
    "🗑️ Cart cleared!\n\nType 'menu' to start shopping again.".to_string()
}

pub fn removed_line(item_name: &str, cart: &[CartLine], symbol: &str) -> String {
    format!("✅ Removed {}.\n\n{}", item_name, cart_summary(cart, symbol))
}

pub fn invalid_remove(cart: &[CartLine], symbol: &str) -> String {
    format!(
        "Invalid remove command. Use 'remove 1' to remove item #1.\n\n{}",
        cart_summary(cart, symbol)
    )
}

pub fn checkout_empty_cart() -> String {
    "Your cart is empty - there is nothing to check out.\n\nType 'menu' to browse our menu.".to_string()
}

pub fn address_prompt() -> String {
    "Great! Let's complete your order.\n\nPlease enter your delivery address:".to_string()
}

pub fn invalid_address() -> String {
    "Please enter a delivery address.\n\nExample: 123 Main Street, Lekki Phase 1, Lagos\n\nOr type 'back' to return to your cart.".to_string()
}

/// Payment link message, sent after the order is committed
pub fn payment_link(order_ref: &str, amount_minor: u64, url: &str, symbol: &str) -> String {
    format!(
        "💳 Payment Required\n\nOrder: {}\nTotal: {}\n\nPlease use the link below to pay securely:\n{}\n\nOnce paid, your order will be processed automatically.",
        order_ref,
        format_minor(amount_minor, symbol),
        url
    )
}

pub fn payment_confirmed(order_ref: &str, amount_minor: u64, symbol: &str) -> String {
    format!(
        "✅ Payment confirmed!\n\nOrder: {}\nAmount: {}\n\nWe're preparing your order now. Thank you! 🙏",
        order_ref,
        format_minor(amount_minor, symbol)
    )
}

pub fn payment_not_completed(order_ref: &str, cart: &[CartLine], symbol: &str) -> String {
    format!(
        "⚠️ Payment for order {} was not completed.\n\nYour cart is untouched - reply 'checkout' to try again or 'cancel' to abandon the order.\n\n{}",
        order_ref,
        cart_summary(cart, symbol)
    )
}

pub fn awaiting_payment_status(order_ref: &str) -> String {
    format!(
        "⏳ We haven't received your payment for order {} yet.\n\nPlease complete payment using the link sent earlier.\nIf you've already paid, please wait a moment.",
        order_ref
    )
}

pub fn awaiting_payment_help(order_ref: &str) -> String {
    format!(
        "⏳ Awaiting payment for order {}\n\nPlease complete payment using the link sent.\n\nReply:\n• 'status' - Check payment status\n• 'cancel' - Cancel order",
        order_ref
    )
}

pub fn cancelled() -> String {
    "Order cancelled and cart cleared.\n\nSend any message to start again.".to_string()
}

/// Generic apology when an upstream service is unavailable; the session
/// is left unchanged so the user can retry the same action
pub fn try_again_later() -> String {
    "⚠️ Sorry, something went wrong on our side. Please try again in a moment.".to_string()
}

pub fn idle_help() -> String {
    "Send any message to see our menu.".to_string()
}
