//! Terminal rendering for command results.

#![allow(clippy::print_stdout)]

use shopease_core::{Cart, Order, Product};
use shopease_storefront::Notice;
use shopease_storefront::checkout::OrderSummary;

/// Print a notice on one line, marking failures.
pub fn notice(notice: &Notice) {
    if notice.is_destructive() {
        println!("! {notice}");
    } else {
        println!("{notice}");
    }
}

pub fn product(product: &Product) {
    println!("#{} {}  {}", product.id, product.name, product.price);
    println!("  category:  {}", product.category);
    match product.stock_label() {
        Some(label) => println!("  in stock:  {} ({label})", product.inventory),
        None => println!("  in stock:  {}", product.inventory),
    }
    if !product.description.is_empty() {
        println!("  {}", product.description);
    }
}

pub fn products(products: &[Product]) {
    if products.is_empty() {
        println!("No products found");
        return;
    }
    for product in products {
        let label = product.stock_label().unwrap_or_default();
        println!(
            "#{:<5} {:<32} {:>10}  ({} left) {label}",
            product.id, product.name, product.price, product.inventory
        );
    }
}

/// Print the cart lines with the locally derived total.
pub fn cart(cart: &Cart, summary: &OrderSummary) {
    if cart.is_empty() {
        println!("Your cart is empty");
        return;
    }
    for line in &cart.items {
        println!(
            "[{:<5}] {:<32} {:>3} x {:>10} = {:>10}",
            line.id,
            line.product.name,
            line.quantity,
            line.product.price,
            line.line_total()
        );
    }
    println!("Subtotal: {}", summary.subtotal);
    if summary.is_free_shipping() {
        println!("Shipping: Free");
    } else {
        println!("Shipping: {}", summary.shipping);
    }
    println!("Total:    {}", summary.total);
}

pub fn orders(orders: &[Order]) {
    if orders.is_empty() {
        println!("No orders yet");
        return;
    }
    for order in orders {
        println!(
            "#{:<5} {}  {:<10} {:>10}  {}",
            order.id,
            order.created_at.format("%Y-%m-%d"),
            order.status,
            order.total,
            order.shipping_address
        );
    }
}
