//! Integration tests for typed collections over the in-memory engine.

mod common;

use std::collections::HashSet;

use common::{ids, open_store, products, Product, ShoppingCart, VEHICLES};
use docwrap::prelude::*;

// ============================================================================
// Ordering and filtering
// ============================================================================

#[test]
fn test_fetch_all_ordered_by_quantity_desc() {
    let store = open_store();
    let vehicles = store.create_collection(VEHICLES).unwrap().typed::<Product>();
    vehicles.save_all(&products(), SavePolicy::Replace).unwrap();

    let ordered = vehicles
        .fetch_all(None, Some(vec![Ordering::attribute_desc("quantity")]))
        .unwrap();

    assert_eq!(ids(&ordered), ["1", "3", "2", "4"]);
}

#[test]
fn test_fetch_all_filtered_by_id() {
    let store = open_store();
    let vehicles = store.create_collection(VEHICLES).unwrap().typed::<Product>();
    vehicles.save_all(&products(), SavePolicy::Replace).unwrap();

    let matched = vehicles
        .fetch_all(Some(Field::attribute("id").gt("2")), None)
        .unwrap();
    let matched = matched
        .iter()
        .map(|product| product.id.as_str())
        .collect::<HashSet<_>>();

    assert_eq!(matched, HashSet::from(["3", "4"]));
}

#[test]
fn test_fetch_all_filtered_and_ordered() {
    let store = open_store();
    let vehicles = store.create_collection(VEHICLES).unwrap().typed::<Product>();
    vehicles.save_all(&products(), SavePolicy::Replace).unwrap();

    let ordered = vehicles
        .fetch_all(
            Some(Field::attribute("id").gt("2")),
            Some(vec![Ordering::attribute_asc("quantity")]),
        )
        .unwrap();

    assert_eq!(ids(&ordered), ["4", "3"]);
}

#[test]
fn test_ordering_keys_apply_in_caller_order() {
    let store = open_store();
    let vehicles = store.create_collection(VEHICLES).unwrap().typed::<Product>();
    for product in [
        Product::new("a", "car", 10),
        Product::new("b", "bike", 10),
        Product::new("c", "car", 5),
    ] {
        vehicles.save(&product.envelope()).unwrap();
    }

    let ordered = vehicles
        .fetch_all(
            None,
            Some(vec![Ordering::attribute_desc("quantity"), Ordering::attribute_asc("name")]),
        )
        .unwrap();

    assert_eq!(ids(&ordered), ["b", "a", "c"]);
}

#[test]
fn test_empty_ordering_is_no_ordering() {
    let store = open_store();
    let vehicles = store.create_collection(VEHICLES).unwrap().typed::<Product>();
    vehicles.save_all(&products(), SavePolicy::Replace).unwrap();

    assert_eq!(vehicles.fetch_all(None, Some(vec![])).unwrap().len(), 4);
}

#[test]
fn test_count_with_predicate() {
    let store = open_store();
    let vehicles = store.create_collection(VEHICLES).unwrap();
    vehicles.save_all(&products(), SavePolicy::Replace).unwrap();

    assert_eq!(vehicles.count(None).unwrap(), 4);
    assert_eq!(vehicles.count(Some(Field::attribute("quantity").gte(30))).unwrap(), 2);
}

// ============================================================================
// Save policies
// ============================================================================

#[test]
fn test_replace_keeps_one_record_per_id() {
    let store = open_store();
    let vehicles = store.create_collection(VEHICLES).unwrap().typed::<Product>();

    vehicles.save(&Product::new("1", "car", 40).envelope()).unwrap();
    vehicles.save(&Product::new("1", "car", 41).envelope()).unwrap();

    let all = vehicles.fetch_all(Some(Field::attribute("id").eq("1")), None).unwrap();
    assert_eq!(all, vec![Product::new("1", "car", 41)]);
}

#[test]
fn test_create_new_overwrites_by_identity() {
    let store = open_store();
    let vehicles = store.create_collection(VEHICLES).unwrap().typed::<Product>();

    vehicles.save(&Product::new("1", "car", 40).envelope()).unwrap();
    vehicles
        .save_with(&Product::new("1", "van", 12).envelope(), SavePolicy::CreateNew)
        .unwrap();

    assert_eq!(vehicles.fetch("1").unwrap(), Some(Product::new("1", "van", 12)));
    assert_eq!(vehicles.untyped().count(None).unwrap(), 1);
}

// ============================================================================
// Point lookups and payload shapes
// ============================================================================

#[test]
fn test_fetch_never_saved_id_is_absent() {
    let store = open_store();
    let vehicles = store.create_collection(VEHICLES).unwrap().typed::<Product>();

    assert_eq!(vehicles.fetch("missing").unwrap(), None);
    assert_eq!(vehicles.find("missing").unwrap(), None);
}

#[test]
fn test_nested_payload_round_trip() {
    let store = open_store();
    let carts = store.create_collection("Cart").unwrap().typed::<ShoppingCart>();
    let cart = ShoppingCart {
        id: "cart-1".into(),
        date: "2024-05-01".into(),
        product: Product::new("1", "car", 40),
        extras: vec![Product::new("2", "bike", 20), Product::new("4", "scooter", 10)],
    };

    carts.save(&Envelope::new("cart-1", cart.clone())).unwrap();

    assert_eq!(carts.fetch("cart-1").unwrap(), Some(cart));
    assert_eq!(
        carts
            .fetch_all(Some(Field::attribute("product.name").eq("car")), None)
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn test_primitive_payload_in_database_source() {
    let store = open_store();
    let prices = store.typed_database::<f64>();

    prices.save(&Envelope::new("1", 20.5)).unwrap();

    assert_eq!(prices.fetch("1").unwrap(), Some(20.5));
}

#[test]
fn test_mismatched_payload_type_names_path() {
    #[derive(Debug, serde::Deserialize, serde::Serialize)]
    struct Priced {
        id: String,
        price: f64,
    }

    let store = open_store();
    let vehicles = store.create_collection(VEHICLES).unwrap();
    vehicles.save(&Product::new("1", "car", 40).envelope()).unwrap();

    match vehicles.fetch::<Priced>("1") {
        Err(DocumentStoreError::Decode { path, .. }) => assert_eq!(path, "attributes.price"),
        other => panic!("expected decode error, got {other:?}"),
    }

    match vehicles.fetch_all::<Priced>(None, None) {
        Err(DocumentStoreError::Decode { path, .. }) => assert_eq!(path, "Vehicle.attributes.price"),
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[test]
fn test_decode_path_names_mismatched_field() {
    let store = open_store();
    let vehicles = store.create_collection(VEHICLES).unwrap();
    vehicles
        .save(&Envelope::new(
            "1",
            serde_json::json!({ "id": "1", "name": "car", "quantity": "lots" }),
        ))
        .unwrap();

    match vehicles.fetch::<Product>("1") {
        Err(DocumentStoreError::Decode { path, .. }) => assert_eq!(path, "attributes.quantity"),
        other => panic!("expected decode error, got {other:?}"),
    }
    match vehicles.fetch_all::<Product>(None, None) {
        Err(DocumentStoreError::Decode { path, .. }) => assert_eq!(path, "Vehicle.attributes.quantity"),
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[test]
fn test_decode_path_names_nested_missing_field() {
    let store = open_store();
    let carts = store.create_collection("Cart").unwrap();
    carts
        .save(&Envelope::new(
            "cart-1",
            serde_json::json!({
                "id": "cart-1",
                "date": "2024-05-01",
                "product": { "id": "1", "name": "car" },
                "extras": [],
            }),
        ))
        .unwrap();

    match carts.fetch::<ShoppingCart>("cart-1") {
        Err(DocumentStoreError::Decode { path, .. }) => assert_eq!(path, "attributes.product.quantity"),
        other => panic!("expected decode error, got {other:?}"),
    }
}

#[test]
fn test_typed_views_share_records() {
    let store = open_store();
    let vehicles = store.create_collection(VEHICLES).unwrap().typed::<Product>();
    vehicles.save(&Product::new("1", "car", 40).envelope()).unwrap();

    let raw = vehicles.with_type::<docwrap::bson::Document>();
    let record = raw.fetch("1").unwrap().unwrap();

    assert_eq!(record.get_i64("quantity").unwrap(), 40);
}

// ============================================================================
// Deletes
// ============================================================================

#[test]
fn test_delete_reports_existence() {
    let store = open_store();
    let vehicles = store.create_collection(VEHICLES).unwrap().typed::<Product>();
    vehicles.save(&Product::new("1", "car", 40).envelope()).unwrap();

    assert!(vehicles.delete("1").unwrap());
    assert!(!vehicles.delete("1").unwrap());
    assert_eq!(vehicles.fetch("1").unwrap(), None);
}

#[test]
fn test_delete_all_without_predicate_empties_source() {
    let store = open_store();
    let vehicles = store.create_collection(VEHICLES).unwrap().typed::<Product>();
    vehicles.save_all(&products(), SavePolicy::Replace).unwrap();

    let report = vehicles.delete_all(None).unwrap();

    assert_eq!(report.applied.len(), 4);
    assert!(report.is_complete());
    assert!(vehicles.fetch_all(None, None).unwrap().is_empty());
}

#[test]
fn test_delete_all_with_predicate() {
    let store = open_store();
    let vehicles = store.create_collection(VEHICLES).unwrap().typed::<Product>();
    vehicles.save_all(&products(), SavePolicy::Replace).unwrap();

    vehicles
        .delete_all(Some(Field::attribute("quantity").lt(25)))
        .unwrap();

    let remaining = vehicles
        .fetch_all(None, Some(vec![Ordering::attribute_asc("id")]))
        .unwrap();
    assert_eq!(ids(&remaining), ["1", "3"]);
}

#[test]
fn test_clear_keeps_collection_and_indexes() {
    let store = open_store();
    let vehicles = store.create_collection(VEHICLES).unwrap().typed::<Product>();
    vehicles.save_all(&products(), SavePolicy::Replace).unwrap();
    vehicles.create_index("ByName", ["name"]).unwrap();

    vehicles.clear().unwrap();

    assert_eq!(vehicles.count(None).unwrap(), 0);
    assert_eq!(vehicles.list_indexes().unwrap().len(), 1);
    assert!(store.get_collection(VEHICLES).unwrap().is_some());
    assert!(store.collection("Never").clear().is_err());
}

#[test]
fn test_typed_handle_covers_envelopes_and_counts() {
    let store = open_store();
    let vehicles = store.create_collection(VEHICLES).unwrap().typed::<Product>();
    vehicles.save_all(&products(), SavePolicy::Replace).unwrap();

    assert_eq!(
        vehicles.fetch_envelope("3").unwrap(),
        Some(Product::new("3", "truck", 30).envelope())
    );
    let envelopes = vehicles
        .fetch_all_envelopes(
            Some(Field::attribute("quantity").gt(25)),
            Some(vec![Ordering::asc("id")]),
        )
        .unwrap();
    assert_eq!(
        envelopes.iter().map(|envelope| envelope.id.as_str()).collect::<Vec<_>>(),
        ["1", "3"]
    );
    assert_eq!(vehicles.count(Some(Field::attribute("quantity").lt(25))).unwrap(), 2);
}

#[test]
fn test_delete_many_skips_unknown_ids() {
    let store = open_store();
    let vehicles = store.create_collection(VEHICLES).unwrap().typed::<Product>();
    vehicles.save_all(&products(), SavePolicy::Replace).unwrap();

    let report = vehicles.delete_many(["1", "9", "3"]).unwrap();

    assert_eq!(report.applied, ["1", "3"]);
    assert!(report.failed.is_empty());
    assert_eq!(vehicles.untyped().count(None).unwrap(), 2);
}

// ============================================================================
// Indexes
// ============================================================================

#[test]
fn test_reserved_index_names_rejected() {
    let store = open_store();
    let vehicles = store.create_collection(VEHICLES).unwrap();

    for name in ["index", "Index", "INDEX"] {
        assert!(matches!(
            vehicles.create_index(name, ["name"]),
            Err(DocumentStoreError::InvalidIndexName(_))
        ));
    }
    assert!(vehicles.list_indexes().unwrap().is_empty());
}

#[test]
fn test_create_and_drop_named_index() {
    let store = open_store();
    let vehicles = store.create_collection(VEHICLES).unwrap().typed::<Product>();

    vehicles.create_index("ByName", ["name"]).unwrap();

    let indexes = vehicles.list_indexes().unwrap();
    assert_eq!(indexes.len(), 1);
    assert_eq!(indexes[0].name, "ByName");
    assert_eq!(indexes[0].paths().collect::<Vec<_>>(), ["attributes.name"]);

    vehicles.drop_index("ByName").unwrap();
    assert!(vehicles.list_indexes().unwrap().is_empty());
}
