//! Mirroring local products onto the POS.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use corner_shop_api::pos::{NewRemoteItem, RemoteItemUpdate};
use corner_shop_api::sync::{PullSync, mirror_product, push_inventory};
use corner_shop_integration_tests::{FakePos, MemoryCatalog, PosCall, draft, remote_item};

#[tokio::test]
async fn test_new_single_variant_product_creates_item() {
    let pos = FakePos::new();
    let store = MemoryCatalog::new();
    let product = store.seed(&draft("Scone", &[("Default", 350, 4)]));

    let outcome = mirror_product(&pos, product).await;

    assert!(outcome.failures.is_empty());
    assert!(outcome.linked);
    let id = outcome.product.pos_item_id.clone().unwrap();
    assert_eq!(outcome.product.variants[0].pos_item_id.as_deref(), Some(id.as_str()));
    assert_eq!(
        pos.calls(),
        vec![
            PosCall::CreateItem(NewRemoteItem {
                name: "Scone".into(),
                price_minor: 350,
                sku: Some("SCONE-DEFAULT".into()),
                hidden: false,
                group_id: None,
            }),
            PosCall::UpdateInventory(id, 4),
        ]
    );
}

#[tokio::test]
async fn test_linked_single_item_is_updated_in_place() {
    let pos = FakePos::new();
    pos.add_item(remote_item("S1", "Scone", 350, 4));
    let store = MemoryCatalog::new();
    PullSync::new(&pos, &store).run().await;

    let mut product = store.products().remove(0);
    product.name = "Cheese Scone".into();
    product.variants[0].price = rust_decimal::Decimal::new(400, 2);
    product.price = product.variants[0].price;

    let outcome = mirror_product(&pos, product).await;

    assert!(outcome.failures.is_empty());
    assert!(!outcome.linked);
    assert_eq!(
        pos.calls(),
        vec![
            PosCall::UpdateItem(
                "S1".into(),
                RemoteItemUpdate {
                    name: Some("Cheese Scone".into()),
                    price_minor: 400,
                    sku: Some("SKU-S1".into()),
                    hidden: false,
                    group_id: None,
                }
            ),
            PosCall::UpdateInventory("S1".into(), 4),
        ]
    );
    assert_eq!(pos.items()[0].name, "Cheese Scone");
}

#[tokio::test]
async fn test_grouped_product_updates_group_and_adds_missing_variant() {
    let pos = FakePos::new();
    pos.add_item_group("G1", "Cold Brew", &["A"]);
    let mut small = remote_item("A", "Cold Brew - Small", 500, 2);
    small.group_id = Some("G1".into());
    pos.add_item(small);
    let store = MemoryCatalog::new();
    PullSync::new(&pos, &store).run().await;

    let mut product = store.products().remove(0);
    let mut large = product.variants[0].clone();
    large.label = "Large".into();
    large.sku = Some("BREW-L".into());
    large.pos_item_id = None;
    large.quantity = 3;
    product.variants.push(large);
    product.recompute_stock();

    let outcome = mirror_product(&pos, product).await;

    assert!(outcome.failures.is_empty());
    assert!(outcome.linked);
    let new_id = outcome.product.variants[1].pos_item_id.clone().unwrap();
    let calls = pos.calls();
    assert_eq!(
        calls[0],
        PosCall::UpdateItemGroup("G1".into(), "Cold Brew".into())
    );
    assert!(matches!(
        &calls[1],
        PosCall::UpdateItem(id, update) if id == "A" && update.name.is_none() && update.group_id.is_none()
    ));
    assert!(matches!(
        &calls[2],
        PosCall::CreateItem(item) if item.name == "Cold Brew - Large" && item.group_id.as_deref() == Some("G1")
    ));
    assert_eq!(calls[3], PosCall::UpdateInventory("A".into(), 2));
    assert_eq!(calls[4], PosCall::UpdateInventory(new_id, 3));
}

#[tokio::test]
async fn test_multi_variant_product_is_promoted_to_group() {
    let pos = FakePos::new();
    pos.add_item(remote_item("OLD", "Latte", 450, 1));
    let store = MemoryCatalog::new();
    PullSync::new(&pos, &store).run().await;

    let mut product = store.products().remove(0);
    product.variants[0].pos_item_id = None;
    let mut oat = product.variants[0].clone();
    oat.label = "Oat".into();
    oat.sku = Some("LATTE-OAT".into());
    oat.quantity = 2;
    product.variants.push(oat);
    product.recompute_stock();

    let outcome = mirror_product(&pos, product).await;

    assert!(outcome.failures.is_empty());
    let product = outcome.product;
    let group_id = product.pos_group_id.clone().unwrap();
    assert_eq!(product.pos_item_id, None);
    assert_eq!(product.variants[0].pos_item_id.as_deref(), Some("OLD"));
    assert!(product.variants[1].pos_item_id.is_some());

    let calls = pos.calls();
    assert_eq!(calls[0], PosCall::CreateItemGroup("Latte".into()));
    assert!(matches!(
        &calls[1],
        PosCall::UpdateItem(id, update) if id == "OLD" && update.group_id.as_deref() == Some(group_id.as_str())
    ));
    assert!(matches!(&calls[2], PosCall::CreateItem(item) if item.name == "Latte - Oat"));
    assert_eq!(pos.items()[0].group_id.as_deref(), Some(group_id.as_str()));
}

#[tokio::test]
async fn test_pos_failures_are_collected_not_raised() {
    let pos = FakePos::new();
    pos.fail("create_item");
    let store = MemoryCatalog::new();
    let product = store.seed(&draft("Scone", &[("Default", 350, 4)]));

    let outcome = mirror_product(&pos, product.clone()).await;

    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].target, "Scone");
    assert!(!outcome.linked);
    assert_eq!(outcome.product, product);
    // Nothing linked, so no stock to push.
    assert_eq!(pos.calls().len(), 1);
}

#[tokio::test]
async fn test_group_rename_failure_still_pushes_variants() {
    let pos = FakePos::new();
    pos.add_item_group("G1", "Tea", &["T1"]);
    let mut item = remote_item("T1", "Tea - Green", 300, 5);
    item.group_id = Some("G1".into());
    pos.add_item(item);
    let store = MemoryCatalog::new();
    PullSync::new(&pos, &store).run().await;
    pos.fail("update_item_group");

    let outcome = mirror_product(&pos, store.products().remove(0)).await;

    assert_eq!(outcome.failures.len(), 1);
    assert!(outcome.failures[0].target.contains("G1"));
    assert!(
        pos.calls()
            .iter()
            .any(|c| matches!(c, PosCall::UpdateInventory(id, 5) if id == "T1"))
    );
}

#[tokio::test]
async fn test_inventory_push_targets_linked_items() {
    let pos = FakePos::new();
    pos.add_item_group("G1", "Cold Brew", &["A", "B"]);
    for (id, name, qty) in [("A", "Cold Brew - Small", 2), ("B", "Cold Brew - Large", 3)] {
        let mut item = remote_item(id, name, 500, qty);
        item.group_id = Some("G1".into());
        pos.add_item(item);
    }
    let store = MemoryCatalog::new();
    PullSync::new(&pos, &store).run().await;

    let mut product = store.products().remove(0);
    product.adjust_stock(Some("SKU-B"), -1).unwrap();
    let failures = push_inventory(&pos, &product).await;

    assert!(failures.is_empty());
    assert_eq!(
        pos.calls(),
        vec![
            PosCall::UpdateInventory("A".into(), 2),
            PosCall::UpdateInventory("B".into(), 2),
        ]
    );
}
