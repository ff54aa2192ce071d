//! Pull sync against a scripted POS and an in-memory catalog.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use rust_decimal::Decimal;

use corner_shop_api::events::EventKind;
use corner_shop_api::pos::{RemoteLineItem, RemoteModifier, RemoteModifierGroup, RemoteOrder};
use corner_shop_api::sync::PullSync;
use corner_shop_core::{OrderSource, OrderStatus, PaymentMethod, PaymentStatus};
use corner_shop_integration_tests::{FakePos, MemoryCatalog, draft, remote_item};

fn grouped_pos() -> FakePos {
    let pos = FakePos::new();
    pos.add_category("CAT-1", "Coffee");
    pos.add_item_group("G1", "Cold Brew", &["A", "B"]);

    let mut small = remote_item("A", "Cold Brew - Small", 500, 2);
    small.group_id = Some("G1".into());
    small.category_ids = vec!["CAT-1".into()];
    let mut large = remote_item("B", "Cold Brew - Large", 700, 3);
    large.group_id = Some("G1".into());
    pos.add_item(small);
    pos.add_item(large);
    pos.add_item(remote_item("C", "Scone", 350, 0));
    pos
}

#[tokio::test]
async fn test_group_becomes_one_product_with_min_price_and_summed_stock() {
    let pos = grouped_pos();
    let store = MemoryCatalog::new();

    let report = PullSync::new(&pos, &store).run().await;

    assert_eq!(report.products.created, 2);
    assert_eq!(report.failed(), 0);
    let products = store.products();
    let brew = products.iter().find(|p| p.name == "Cold Brew").unwrap();
    assert_eq!(brew.price, Decimal::new(500, 2));
    assert_eq!(brew.stock_count, 5);
    assert_eq!(brew.pos_group_id.as_deref(), Some("G1"));
    assert_eq!(brew.categories, vec!["Coffee"]);
    let labels: Vec<&str> = brew.variants.iter().map(|v| v.label.as_str()).collect();
    assert_eq!(labels, vec!["Small", "Large"]);

    let scone = products.iter().find(|p| p.name == "Scone").unwrap();
    assert_eq!(scone.pos_item_id.as_deref(), Some("C"));
    assert_eq!(scone.variants.len(), 1);
    assert_eq!(store.category_names(), vec!["Coffee"]);
    assert_eq!(store.item_group_count(), 1);
}

#[tokio::test]
async fn test_second_pull_changes_nothing() {
    let pos = grouped_pos();
    pos.add_order(RemoteOrder {
        id: "O1".into(),
        state: Some("locked".into()),
        payment_state: Some("PAID".into()),
        total_minor: 1200,
        created_at: None,
        line_items: vec![RemoteLineItem {
            id: "L1".into(),
            name: "Cold Brew - Large".into(),
            price_minor: 700,
            item_id: Some("B".into()),
            quantity: 1,
        }],
    });
    let store = MemoryCatalog::new();

    PullSync::new(&pos, &store).run().await;
    let before = store.products();
    let second = PullSync::new(&pos, &store).run().await;

    assert_eq!(second.products.written(), 0);
    assert_eq!(second.products.unchanged, 2);
    assert_eq!(second.categories.unchanged, 1);
    assert_eq!(second.item_groups.unchanged, 1);
    assert_eq!(second.orders.unchanged, 1);
    assert!(second.restocked.is_empty());
    assert_eq!(store.products(), before);
}

#[tokio::test]
async fn test_restock_is_reported_once() {
    let pos = grouped_pos();
    let store = MemoryCatalog::new();
    PullSync::new(&pos, &store).run().await;

    pos.set_quantity("C", 4);
    let report = PullSync::new(&pos, &store).run().await;

    let scone = store
        .products()
        .into_iter()
        .find(|p| p.name == "Scone")
        .unwrap();
    assert_eq!(report.restocked, vec![scone.id]);
    assert_eq!(scone.stock_count, 4);

    let again = PullSync::new(&pos, &store).run().await;
    assert!(again.restocked.is_empty());
}

#[tokio::test]
async fn test_created_and_changed_products_are_announced() {
    let pos = grouped_pos();
    let store = MemoryCatalog::new();

    let first = PullSync::new(&pos, &store).run().await;
    let mut created = first.catalog_events();
    created.sort_by_key(|e| format!("{e:?}"));
    let mut expected: Vec<EventKind> = store
        .products()
        .iter()
        .map(|p| EventKind::ProductCreated { product_id: p.id })
        .collect();
    expected.sort_by_key(|e| format!("{e:?}"));
    assert_eq!(created, expected);

    pos.set_quantity("C", 4);
    let second = PullSync::new(&pos, &store).run().await;
    let scone = store
        .products()
        .into_iter()
        .find(|p| p.name == "Scone")
        .unwrap();
    assert_eq!(
        second.catalog_events(),
        vec![EventKind::ProductUpdated { product_id: scone.id }]
    );

    let third = PullSync::new(&pos, &store).run().await;
    assert!(third.catalog_events().is_empty());
}

#[tokio::test]
async fn test_local_fields_survive_pull() {
    let pos = grouped_pos();
    let store = MemoryCatalog::new();
    PullSync::new(&pos, &store).run().await;

    let mut scone = store
        .products()
        .into_iter()
        .find(|p| p.name == "Scone")
        .unwrap();
    scone.description = "Baked daily".into();
    scone.images = vec!["scone.jpg".into()];
    corner_shop_api::sync::CatalogStore::update_product(&store, &scone)
        .await
        .unwrap();

    PullSync::new(&pos, &store).run().await;
    let scone = store.product(scone.id).unwrap();
    assert_eq!(scone.description, "Baked daily");
    assert_eq!(scone.images, vec!["scone.jpg"]);
}

#[tokio::test]
async fn test_name_fallback_adopts_unlinked_product_only() {
    let pos = FakePos::new();
    let mut item = remote_item("X", "Muffin", 300, 6);
    item.sku = None;
    pos.add_item(item);

    let store = MemoryCatalog::new();
    let local = store.seed(&draft("Muffin", &[("Default", 300, 1)]));

    let report = PullSync::new(&pos, &store).run().await;
    assert_eq!(report.products.updated, 1);
    assert_eq!(report.products.created, 0);
    let adopted = store.product(local.id).unwrap();
    assert_eq!(adopted.pos_item_id.as_deref(), Some("X"));

    // A second POS item with the same name can't take the linked product.
    let mut twin = remote_item("Y", "Muffin", 320, 1);
    twin.sku = None;
    pos.add_item(twin);
    let report = PullSync::new(&pos, &store).run().await;
    assert_eq!(report.products.created, 1);
    assert_eq!(store.products().len(), 2);
    assert_eq!(
        store.product(local.id).unwrap().pos_item_id.as_deref(),
        Some("X")
    );
}

#[tokio::test]
async fn test_sku_match_links_existing_variant() {
    let pos = FakePos::new();
    let mut item = remote_item("Z", "Bagel (POS name)", 250, 9);
    item.sku = Some("BAGEL-DEFAULT".into());
    pos.add_item(item);

    let store = MemoryCatalog::new();
    let local = store.seed(&draft("Bagel", &[("Default", 250, 0)]));

    PullSync::new(&pos, &store).run().await;
    let linked = store.product(local.id).unwrap();
    assert_eq!(linked.variants[0].pos_item_id.as_deref(), Some("Z"));
    assert_eq!(linked.stock_count, 9);
    assert_eq!(store.products().len(), 1);
}

#[tokio::test]
async fn test_pos_orders_are_mirrored_once() {
    let pos = grouped_pos();
    pos.add_order(RemoteOrder {
        id: "O9".into(),
        state: Some("open".into()),
        payment_state: Some("OPEN".into()),
        total_minor: 500,
        created_at: None,
        line_items: vec![RemoteLineItem {
            id: "L1".into(),
            name: "Cold Brew - Small".into(),
            price_minor: 500,
            item_id: Some("A".into()),
            quantity: 1,
        }],
    });
    let store = MemoryCatalog::new();

    let report = PullSync::new(&pos, &store).run().await;
    assert_eq!(report.orders.created, 1);

    let orders = store.orders();
    assert_eq!(orders.len(), 1);
    let order = &orders[0];
    assert_eq!(order.source, OrderSource::Pos);
    assert_eq!(order.payment_method, PaymentMethod::InStore);
    assert_eq!(order.payment_status, PaymentStatus::Pending);
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.total, Decimal::new(500, 2));
    assert_eq!(order.items[0].variant_label.as_deref(), Some("Small"));
    assert!(order.items[0].product_id.is_some());

    // Register orders never move local stock.
    let brew = store
        .products()
        .into_iter()
        .find(|p| p.name == "Cold Brew")
        .unwrap();
    assert_eq!(brew.stock_count, 5);
}

#[tokio::test]
async fn test_modifier_groups_are_mirrored() {
    let pos = FakePos::new();
    pos.add_modifier_group(RemoteModifierGroup {
        id: "M1".into(),
        name: "Milk".into(),
        modifiers: vec![RemoteModifier {
            id: "OAT".into(),
            name: "Oat".into(),
            price_minor: 75,
        }],
    });
    let store = MemoryCatalog::new();

    let report = PullSync::new(&pos, &store).run().await;
    assert_eq!(report.modifier_groups.created, 1);
    let (name, modifiers) = store.modifier_group("M1").unwrap();
    assert_eq!(name, "Milk");
    assert_eq!(modifiers[0].price, Decimal::new(75, 2));
}

#[tokio::test]
async fn test_fetch_failure_is_recorded_not_fatal() {
    let pos = grouped_pos();
    pos.fail("list_categories");
    let store = MemoryCatalog::new();

    let report = PullSync::new(&pos, &store).run().await;

    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].contains("categories"));
    assert_eq!(report.products.created, 2);
    // Category names can't be resolved without the category list.
    assert!(store.products().iter().all(|p| p.categories.is_empty()));
}
