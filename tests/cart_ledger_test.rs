use rust_decimal_macros::dec;
use souq_api::cart::{
    self, CartEntry, CartError, CartLedger, CartSelector, CartStore, Decrease, InMemoryCartStore,
};
use souq_api::properties::PropertySet;
use uuid::Uuid;

fn props(pairs: &[(&str, &str)]) -> PropertySet {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn entry(product_id: Uuid, variant_id: Uuid, pairs: &[(&str, &str)], stock: i32) -> CartEntry {
    CartEntry {
        product_id,
        variant_id,
        properties: props(pairs),
        unit_price: dec!(49.99),
        stock_snapshot: stock,
    }
}

#[test]
fn add_pushes_one_entry_per_unit() {
    let e = entry(Uuid::new_v4(), Uuid::new_v4(), &[("اللون", "أحمر")], 5);
    let entries = cart::add(&[], e.clone(), 3).unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries.iter().all(|x| x == &e));
}

#[test]
fn add_respects_stock_snapshot() {
    let e = entry(Uuid::new_v4(), Uuid::new_v4(), &[("اللون", "أحمر")], 2);

    // Exactly the snapshot passes
    let entries = cart::add(&[], e.clone(), 2).unwrap();

    // One more unit is refused with no remaining stock
    assert_eq!(
        cart::add(&entries, e.clone(), 1),
        Err(CartError::OutOfStock)
    );

    // Partial headroom is reported
    let one = cart::add(&[], e.clone(), 1).unwrap();
    assert_eq!(
        cart::add(&one, e, 2),
        Err(CartError::InsufficientStock { available: 1 })
    );
}

#[test]
fn matching_considers_variant_and_properties() {
    let product = Uuid::new_v4();
    let variant = Uuid::new_v4();
    let red = entry(product, variant, &[("اللون", "أحمر")], 1);
    let blue = entry(product, variant, &[("اللون", "أزرق")], 1);

    // Different property-sets never count against each other's snapshot
    let entries = cart::add(&[], red, 1).unwrap();
    let entries = cart::add(&entries, blue, 1).unwrap();
    assert_eq!(entries.len(), 2);
}

#[test]
fn decrease_removes_most_recent_and_confirms_last() {
    let e = entry(Uuid::new_v4(), Uuid::new_v4(), &[("المقاس", "كبير")], 5);
    let selector = CartSelector::for_entry(&e);
    let entries = cart::add(&[], e, 2).unwrap();

    let Decrease::Updated(entries) = cart::decrease(&entries, &selector) else {
        panic!("expected removal");
    };
    assert_eq!(entries.len(), 1);

    // Last unit requires explicit confirmation
    assert_eq!(
        cart::decrease(&entries, &selector),
        Decrease::ConfirmationRequired
    );
    let entries = cart::remove(&entries, &selector);
    assert!(entries.is_empty());
}

#[test]
fn decrease_on_absent_entry_reports_not_in_cart() {
    let e = entry(Uuid::new_v4(), Uuid::new_v4(), &[], 5);
    assert_eq!(
        cart::decrease(&[], &CartSelector::for_entry(&e)),
        Decrease::NotInCart
    );
}

#[test]
fn grouping_is_insertion_order_independent() {
    let product_a = Uuid::new_v4();
    let product_b = Uuid::new_v4();
    let variant_a = Uuid::new_v4();
    let variant_b = Uuid::new_v4();

    let forward = vec![
        entry(product_a, variant_a, &[("اللون", "أحمر")], 9),
        entry(product_b, variant_b, &[("المقاس", "صغير")], 9),
        entry(product_a, variant_a, &[("اللون", "أحمر")], 9),
    ];
    let mut backward = forward.clone();
    backward.reverse();

    assert_eq!(cart::group(&forward), cart::group(&backward));

    let groups = cart::group(&forward);
    assert_eq!(groups.len(), 2);
    let a = groups.iter().find(|g| g.product_id == product_a).unwrap();
    assert_eq!(a.quantity, 2);
}

#[test]
fn ledger_persists_after_each_reduction() {
    let store = std::sync::Arc::new(InMemoryCartStore::new());
    let mut ledger = CartLedger::load(store.clone()).unwrap();
    assert!(ledger.entries().is_empty());

    let e = entry(Uuid::new_v4(), Uuid::new_v4(), &[("اللون", "أحمر")], 4);
    let selector = CartSelector::for_entry(&e);

    ledger.add(e.clone(), 2).unwrap();
    assert_eq!(store.load().unwrap().unwrap().len(), 2);

    ledger.increase(&selector).unwrap();
    assert_eq!(store.load().unwrap().unwrap().len(), 3);
    assert_eq!(ledger.grouped()[0].quantity, 3);

    // A reload from the same storage reproduces the ledger
    let reloaded = CartLedger::load(store).unwrap();
    assert_eq!(reloaded.entries(), ledger.entries());
}

#[test]
fn clearing_the_ledger_empties_storage() {
    let store = std::sync::Arc::new(InMemoryCartStore::new());
    let mut ledger = CartLedger::load(store.clone()).unwrap();
    let e = entry(Uuid::new_v4(), Uuid::new_v4(), &[], 4);
    ledger.add(e, 2).unwrap();
    assert!(store.load().unwrap().is_some());

    ledger.clear();
    assert!(ledger.entries().is_empty());
    assert!(store.load().unwrap().is_none());
}

#[test]
fn empty_storage_yields_empty_ledger() {
    let ledger = CartLedger::load(InMemoryCartStore::new()).unwrap();
    assert!(ledger.entries().is_empty());
    assert!(ledger.grouped().is_empty());
}
