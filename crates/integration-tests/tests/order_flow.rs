//! Order placement and cancellation against catalog stock, without a database.
//!
//! Mirrors what `OrderService` does around the repositories: plan from the
//! cart, take stock, then give it back when the order is cancelled.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::collections::HashMap;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use corner_shop_api::models::{
    Cart, CartError, DiscountCode, DiscountError, Order, OrderError, Product, StockChange,
};
use corner_shop_api::services::orders::{order_total, plan_order};
use corner_shop_core::{
    DiscountCodeId, OrderId, OrderSource, OrderStatus, PaymentMethod, PaymentStatus, UserId,
};
use corner_shop_integration_tests::{MemoryCatalog, draft};

fn catalog() -> (MemoryCatalog, Product, Product) {
    let store = MemoryCatalog::new();
    let tee = store.seed(&draft("Tee", &[("S", 2000, 3), ("M", 2000, 1)]));
    let mug = store.seed(&draft("Mug", &[("Default", 1200, 5)]));
    (store, tee, mug)
}

fn index(products: &[&Product]) -> HashMap<corner_shop_core::ProductId, Product> {
    products.iter().map(|p| (p.id, (*p).clone())).collect()
}

fn apply(products: &mut HashMap<corner_shop_core::ProductId, Product>, changes: &[StockChange]) {
    for change in changes {
        let product = products.get_mut(&change.product_id).unwrap();
        product
            .adjust_stock(change.sku.as_deref(), change.delta)
            .unwrap();
    }
}

fn order_from(items: Vec<corner_shop_api::models::OrderItem>, total: Decimal) -> Order {
    let now = Utc::now();
    Order {
        id: OrderId::new(1),
        user_id: Some(UserId::new(7)),
        source: OrderSource::Storefront,
        pos_order_id: None,
        items,
        address: None,
        payment_method: PaymentMethod::CashOnDelivery,
        payment_status: PaymentStatus::Pending,
        status: OrderStatus::Pending,
        total,
        discount_code: None,
        checkout_url: None,
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn test_place_then_cancel_restores_stock() {
    let (_store, tee, mug) = catalog();
    let mut products = index(&[&tee, &mug]);

    let mut cart = Cart::empty(UserId::new(7));
    cart.add(tee.id, Some("TEE-S"), 2, 3).unwrap();
    cart.add(mug.id, Some("MUG-DEFAULT"), 1, 5).unwrap();

    let plan = plan_order(&cart, &products).unwrap();
    assert_eq!(plan.subtotal, Decimal::new(5200, 2));
    apply(&mut products, &plan.changes);
    assert_eq!(products[&tee.id].stock_count, 2);
    assert_eq!(products[&tee.id].variants[0].quantity, 1);
    assert_eq!(products[&mug.id].stock_count, 4);

    let mut order = order_from(plan.items, order_total(plan.subtotal, Decimal::new(500, 2), None));
    assert_eq!(order.total, Decimal::new(5700, 2));

    let restores = order.transition(OrderStatus::Cancelled).unwrap();
    apply(&mut products, &restores);

    assert_eq!(products[&tee.id].stock_count, 4);
    assert_eq!(products[&tee.id].variants[0].quantity, 3);
    assert_eq!(products[&mug.id].stock_count, 5);
    assert!(order.items.iter().all(|i| i.status == OrderStatus::Cancelled));
}

#[test]
fn test_item_cancel_restores_only_that_item() {
    let (_store, tee, mug) = catalog();
    let mut products = index(&[&tee, &mug]);

    let mut cart = Cart::empty(UserId::new(7));
    cart.add(tee.id, Some("TEE-M"), 1, 1).unwrap();
    cart.add(mug.id, Some("MUG-DEFAULT"), 2, 5).unwrap();
    let plan = plan_order(&cart, &products).unwrap();
    apply(&mut products, &plan.changes);
    let mut order = order_from(plan.items, plan.subtotal);

    let restore = order.transition_item(1, OrderStatus::Cancelled).unwrap();
    apply(&mut products, restore.as_slice());
    assert_eq!(products[&mug.id].stock_count, 5);
    assert_eq!(products[&tee.id].stock_count, 3);
    assert_eq!(order.status, OrderStatus::Pending);

    // Cancelling the rest only restores what wasn't cancelled already.
    let restores = order.transition(OrderStatus::Cancelled).unwrap();
    assert_eq!(restores.len(), 1);
    apply(&mut products, &restores);
    assert_eq!(products[&tee.id].stock_count, 4);
    assert_eq!(products[&mug.id].stock_count, 5);
}

#[test]
fn test_shipped_order_cannot_go_back() {
    let (_store, tee, _mug) = catalog();
    let products = index(&[&tee]);
    let mut cart = Cart::empty(UserId::new(7));
    cart.add(tee.id, Some("TEE-S"), 1, 3).unwrap();
    let plan = plan_order(&cart, &products).unwrap();
    let mut order = order_from(plan.items, plan.subtotal);

    order.transition(OrderStatus::Processing).unwrap();
    order.transition(OrderStatus::Shipped).unwrap();
    assert_eq!(
        order.transition(OrderStatus::Processing),
        Err(OrderError::InvalidTransition {
            from: OrderStatus::Shipped,
            to: OrderStatus::Processing,
        })
    );
    order.transition(OrderStatus::Delivered).unwrap();
    assert!(order.transition(OrderStatus::Cancelled).is_err());
}

#[test]
fn test_stock_moved_between_cart_and_checkout_is_caught() {
    let (_store, tee, _mug) = catalog();
    let mut products = index(&[&tee]);
    let mut cart = Cart::empty(UserId::new(7));
    cart.add(tee.id, Some("TEE-S"), 3, 3).unwrap();

    // Someone else bought two in the meantime.
    products
        .get_mut(&tee.id)
        .unwrap()
        .adjust_stock(Some("TEE-S"), -2)
        .unwrap();

    let err = plan_order(&cart, &products).unwrap_err();
    assert!(matches!(err, OrderError::Unavailable { ref name, .. } if name == "Tee"));
}

#[test]
fn test_line_without_sku_draws_on_the_sole_variant() {
    let (_store, _tee, mug) = catalog();
    let mut products = index(&[&mug]);
    let mut cart = Cart::empty(UserId::new(7));
    cart.add(mug.id, None, 3, 5).unwrap();

    let plan = plan_order(&cart, &products).unwrap();
    apply(&mut products, &plan.changes);
    let sold = &products[&mug.id];
    assert_eq!(sold.variants[0].quantity, 2);
    assert_eq!(sold.stock_count, 2);

    let mut recomputed = sold.clone();
    recomputed.recompute_stock();
    assert_eq!(recomputed.stock_count, 2);
}

#[test]
fn test_bare_and_explicit_lines_cannot_oversell_one_variant() {
    let (_store, _tee, mug) = catalog();
    let products = index(&[&mug]);
    let mut cart = Cart::empty(UserId::new(7));
    cart.add(mug.id, None, 5, 5).unwrap();
    cart.add(mug.id, Some("MUG-DEFAULT"), 5, 5).unwrap();

    let err = plan_order(&cart, &products).unwrap_err();
    assert_eq!(err.to_string(), "Mug: only 0 left in stock");
}

#[test]
fn test_hidden_product_cannot_be_ordered() {
    let (_store, mut tee, _mug) = catalog();
    let mut cart = Cart::empty(UserId::new(7));
    cart.add(tee.id, Some("TEE-S"), 1, 3).unwrap();
    tee.hidden = true;

    let err = plan_order(&cart, &index(&[&tee])).unwrap_err();
    assert!(matches!(err, OrderError::Unavailable { .. }));
    assert_eq!(
        plan_order(&Cart::empty(UserId::new(7)), &HashMap::new()),
        Err(OrderError::EmptyCart)
    );
}

#[test]
fn test_cart_is_capped_by_stock() {
    let (_store, tee, _mug) = catalog();
    let mut cart = Cart::empty(UserId::new(7));
    let available = tee.available(Some("TEE-M")).unwrap();

    cart.add(tee.id, Some("TEE-M"), 1, available).unwrap();
    assert_eq!(
        cart.add(tee.id, Some("TEE-M"), 1, available),
        Err(CartError::ExceedsStock { available: 1 })
    );
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 1);

    assert_eq!(
        cart.set_quantity(tee.id, Some("TEE-S"), 4, 3),
        Err(CartError::ExceedsStock { available: 3 })
    );
    cart.set_quantity(tee.id, Some("TEE-M"), 0, available).unwrap();
    assert!(cart.items.is_empty());
}

fn code(starts_in: Option<i64>, ends_in: Option<i64>) -> DiscountCode {
    let now = Utc::now();
    DiscountCode {
        id: DiscountCodeId::new(1),
        code: "WELCOME15".into(),
        percent_off: 15,
        starts_at: starts_in.map(|d| now + Duration::days(d)),
        ends_at: ends_in.map(|d| now + Duration::days(d)),
        max_usage: Some(2),
        usage_count: 0,
        active: true,
        created_at: now,
    }
}

#[test]
fn test_discount_window_and_usage_limit() {
    let now = Utc::now();
    assert_eq!(code(Some(-1), Some(1)).check(now), Ok(()));
    assert_eq!(code(Some(1), None).check(now), Err(DiscountError::NotStarted));
    assert_eq!(code(None, Some(-1)).check(now), Err(DiscountError::Expired));

    let mut used = code(None, None);
    used.usage_count = 2;
    assert_eq!(used.check(now), Err(DiscountError::UsageExhausted));
}

#[test]
fn test_discount_applies_before_shipping() {
    let total = order_total(Decimal::new(4000, 2), Decimal::new(500, 2), Some(15));
    assert_eq!(total, Decimal::new(3900, 2));
}

/// Placement with a discount: the code is only counted after payment setup.
fn place_with_code(code: &mut DiscountCode, checkout: Result<(), &str>) -> Result<(), String> {
    code.check(Utc::now()).map_err(|e| e.to_string())?;
    checkout.map_err(str::to_owned)?;
    code.usage_count += 1;
    Ok(())
}

#[test]
fn test_failed_checkout_does_not_use_up_discount() {
    let mut last_use = code(None, None);
    last_use.usage_count = 1;

    assert!(place_with_code(&mut last_use, Err("checkout unavailable")).is_err());
    assert_eq!(last_use.usage_count, 1);
    assert_eq!(last_use.check(Utc::now()), Ok(()));

    place_with_code(&mut last_use, Ok(())).unwrap();
    assert_eq!(last_use.check(Utc::now()), Err(DiscountError::UsageExhausted));
}
