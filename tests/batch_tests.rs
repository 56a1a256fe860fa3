//! Batch registration tests
//!
//! Covers buffered adds, atomic drain on commit, concurrent fan-out
//! outcomes, and the documented duplicate-key race.

use typewire::{Registration, RegistrationBatch, TypeRegistry};

#[derive(Debug, PartialEq)]
struct ServiceX(u32);

#[derive(Debug, PartialEq)]
struct ServiceY(&'static str);

#[tokio::test]
async fn commit_registers_every_unit() {
    let registry = TypeRegistry::new();
    let batch = RegistrationBatch::new();
    batch.add(|| ServiceX(7));
    batch.add(|| ServiceY("ready"));
    assert_eq!(batch.unit_count(), 2);

    let outcomes = batch.commit(&registry).await;
    assert_eq!(outcomes.len(), 2);
    for outcome in &outcomes {
        assert_eq!(
            *outcome.result.as_ref().expect("registration cannot fail"),
            Registration::New
        );
    }

    // both keys resolve, in either order
    assert_eq!(registry.resolve::<ServiceY>(), Some(ServiceY("ready")));
    assert_eq!(registry.resolve::<ServiceX>(), Some(ServiceX(7)));
}

#[tokio::test]
async fn commit_drains_the_pending_list() {
    let registry = TypeRegistry::new();
    let batch = RegistrationBatch::new();
    batch.add(|| ServiceX(1));
    batch.commit(&registry).await;
    assert!(batch.is_empty());

    // a unit added after the commit belongs to the next one
    batch.add(|| ServiceY("later"));
    assert_eq!(batch.unit_count(), 1);
    assert_eq!(registry.resolve::<ServiceY>(), None);

    batch.commit(&registry).await;
    assert_eq!(registry.resolve::<ServiceY>(), Some(ServiceY("later")));
}

#[tokio::test]
async fn outcome_distinguishes_new_from_replaced() {
    let registry = TypeRegistry::new();
    registry.register(|| ServiceX(0));

    let batch = RegistrationBatch::new();
    batch.add(|| ServiceX(1));
    batch.add(|| ServiceY("fresh"));
    let outcomes = batch.commit(&registry).await;

    let x_outcome = outcomes
        .iter()
        .find(|outcome| outcome.key == typewire::TypeKey::of::<ServiceX>())
        .expect("outcome for ServiceX");
    assert_eq!(
        *x_outcome.result.as_ref().expect("well-formed unit"),
        Registration::Replaced
    );
    let y_outcome = outcomes
        .iter()
        .find(|outcome| outcome.key == typewire::TypeKey::of::<ServiceY>())
        .expect("outcome for ServiceY");
    assert_eq!(
        *y_outcome.result.as_ref().expect("well-formed unit"),
        Registration::New
    );

    assert_eq!(registry.resolve::<ServiceX>(), Some(ServiceX(1)));
}

#[tokio::test]
async fn duplicate_keys_in_one_commit_last_write_wins() {
    let registry = TypeRegistry::new();
    let batch = RegistrationBatch::new();
    batch.add(|| ServiceX(1));
    batch.add(|| ServiceX(2));

    let outcomes = batch.commit(&registry).await;
    assert_eq!(outcomes.len(), 2);
    // which unit lands last is a documented race; one of the two wins
    let value = registry.resolve::<ServiceX>().expect("key registered");
    assert!(value == ServiceX(1) || value == ServiceX(2));
    assert_eq!(registry.count(), 1);
}

#[tokio::test]
async fn large_commit_fans_out_without_loss() {
    let registry = TypeRegistry::new();
    let batch = RegistrationBatch::new();

    // distinct keys via distinct generic instantiations are impractical in a
    // loop, so exercise volume through repeated commits instead
    for round in 0..50u32 {
        batch.add(move || ServiceX(round));
        batch.add(move || ServiceY("round"));
        let outcomes = batch.commit(&registry).await;
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.iter().all(|outcome| outcome.result.is_ok()));
    }
    assert_eq!(registry.count(), 2);
    assert_eq!(registry.resolve::<ServiceX>(), Some(ServiceX(49)));
}
