mod common;

use assert_matches::assert_matches;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use stockcore::entities::{MovementType, TrackingPolicy};
use stockcore::services::BalanceDelta;
use stockcore::store::BalanceFilter;
use stockcore::ServiceError;

use common::{
    key_of, movement_input, partition, post_receipt, seed_item, seed_location, seed_warehouse,
    setup,
};

#[tokio::test]
async fn missing_rows_read_as_zero_in_the_item_base_uom() {
    let svc = setup();
    let part = partition();
    let wh = seed_warehouse(&svc, &part, "WH-MAIN").await;
    let rack = seed_location(&svc, &part, &wh, None, "RACK-A1").await;
    let item = seed_item(&svc, &part, "STEEL", "kg", TrackingPolicy::None).await;

    let bal = svc
        .balances
        .get_balance(&part, &key_of(&item, &rack, None))
        .await
        .unwrap();
    assert_eq!(bal.quantity, Decimal::ZERO);
    assert_eq!(bal.reserved_quantity, Decimal::ZERO);
    assert_eq!(bal.available(), Decimal::ZERO);
    assert_eq!(bal.uom, "kg");
}

#[tokio::test]
async fn apply_delta_creates_the_row_on_first_touch() {
    let svc = setup();
    let part = partition();
    let wh = seed_warehouse(&svc, &part, "WH-MAIN").await;
    let rack = seed_location(&svc, &part, &wh, None, "RACK-A1").await;
    let item = seed_item(&svc, &part, "STEEL", "kg", TrackingPolicy::None).await;
    let key = key_of(&item, &rack, None);

    let bal = svc
        .balances
        .apply_delta(
            &part,
            BalanceDelta {
                key: key.clone(),
                quantity_delta: dec!(25),
                reserved_delta: Decimal::ZERO,
                uom: "kg".to_string(),
                allow_negative: false,
            },
        )
        .await
        .unwrap();
    assert_eq!(bal.quantity, dec!(25));

    let listed = svc
        .balances
        .list_balances(
            &part,
            &BalanceFilter {
                item_id: Some(item.id),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].key(), key);
}

#[tokio::test]
async fn a_delta_in_the_wrong_uom_is_rejected() {
    let svc = setup();
    let part = partition();
    let wh = seed_warehouse(&svc, &part, "WH-MAIN").await;
    let rack = seed_location(&svc, &part, &wh, None, "RACK-A1").await;
    let item = seed_item(&svc, &part, "STEEL", "kg", TrackingPolicy::None).await;
    post_receipt(&svc, &part, &item, &rack, dec!(10), None).await;

    let err = svc
        .balances
        .apply_delta(
            &part,
            BalanceDelta {
                key: key_of(&item, &rack, None),
                quantity_delta: dec!(1),
                reserved_delta: Decimal::ZERO,
                uom: "t".to_string(),
                allow_negative: false,
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn reservations_are_bounded_by_on_hand_quantity() {
    let svc = setup();
    let part = partition();
    let wh = seed_warehouse(&svc, &part, "WH-MAIN").await;
    let rack = seed_location(&svc, &part, &wh, None, "RACK-A1").await;
    let item = seed_item(&svc, &part, "STEEL", "kg", TrackingPolicy::None).await;
    let key = key_of(&item, &rack, None);
    post_receipt(&svc, &part, &item, &rack, dec!(10), None).await;

    let bal = svc.balances.reserve(&part, &key, dec!(4)).await.unwrap();
    assert_eq!(bal.reserved_quantity, dec!(4));
    assert_eq!(bal.available(), dec!(6));

    // Over-reserving is a business-rule failure.
    let err = svc.balances.reserve(&part, &key, dec!(7)).await.unwrap_err();
    assert_matches!(err, ServiceError::BusinessRule(_));

    // Reserved stock cannot be delivered away.
    let mv = svc
        .movements
        .create_movement(
            &part,
            movement_input(MovementType::Delivery, &item, Some(&rack), None, dec!(7), "kg", None),
        )
        .await
        .unwrap();
    let err = svc.movements.confirm_movement(&part, mv.id).await.unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    // After release the same delivery goes through.
    svc.balances.release(&part, &key, dec!(4)).await.unwrap();
    svc.movements.confirm_movement(&part, mv.id).await.unwrap();
    svc.movements.post_movement(&part, mv.id).await.unwrap();

    let bal = svc.balances.get_balance(&part, &key).await.unwrap();
    assert_eq!(bal.quantity, dec!(3));
    assert_eq!(bal.reserved_quantity, Decimal::ZERO);
}

#[tokio::test]
async fn releasing_more_than_reserved_is_rejected() {
    let svc = setup();
    let part = partition();
    let wh = seed_warehouse(&svc, &part, "WH-MAIN").await;
    let rack = seed_location(&svc, &part, &wh, None, "RACK-A1").await;
    let item = seed_item(&svc, &part, "STEEL", "kg", TrackingPolicy::None).await;
    let key = key_of(&item, &rack, None);
    post_receipt(&svc, &part, &item, &rack, dec!(10), None).await;
    svc.balances.reserve(&part, &key, dec!(2)).await.unwrap();

    let err = svc.balances.release(&part, &key, dec!(3)).await.unwrap_err();
    assert_matches!(err, ServiceError::BusinessRule(_));
}

#[tokio::test]
async fn explicit_override_permits_negative_quantities() {
    let svc = setup();
    let part = partition();
    let wh = seed_warehouse(&svc, &part, "WH-MAIN").await;
    let rack = seed_location(&svc, &part, &wh, None, "RACK-A1").await;
    let item = seed_item(&svc, &part, "STEEL", "kg", TrackingPolicy::None).await;
    let key = key_of(&item, &rack, None);

    let err = svc
        .balances
        .apply_delta(
            &part,
            BalanceDelta {
                key: key.clone(),
                quantity_delta: dec!(-5),
                reserved_delta: Decimal::ZERO,
                uom: "kg".to_string(),
                allow_negative: false,
            },
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    let bal = svc
        .balances
        .apply_delta(
            &part,
            BalanceDelta {
                key,
                quantity_delta: dec!(-5),
                reserved_delta: Decimal::ZERO,
                uom: "kg".to_string(),
                allow_negative: true,
            },
        )
        .await
        .unwrap();
    assert_eq!(bal.quantity, dec!(-5));
}

#[tokio::test]
async fn batches_with_duplicate_keys_are_rejected() {
    let svc = setup();
    let part = partition();
    let wh = seed_warehouse(&svc, &part, "WH-MAIN").await;
    let rack = seed_location(&svc, &part, &wh, None, "RACK-A1").await;
    let item = seed_item(&svc, &part, "STEEL", "kg", TrackingPolicy::None).await;
    let key = key_of(&item, &rack, None);

    let delta = BalanceDelta {
        key,
        quantity_delta: dec!(1),
        reserved_delta: Decimal::ZERO,
        uom: "kg".to_string(),
        allow_negative: false,
    };
    let err = svc
        .balances
        .apply_deltas(&part, vec![delta.clone(), delta])
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::ValidationError(_));
}

#[tokio::test]
async fn a_failing_leg_rejects_the_whole_batch() {
    let svc = setup();
    let part = partition();
    let wh = seed_warehouse(&svc, &part, "WH-MAIN").await;
    let rack_a = seed_location(&svc, &part, &wh, None, "RACK-A1").await;
    let rack_b = seed_location(&svc, &part, &wh, None, "RACK-B1").await;
    let item = seed_item(&svc, &part, "STEEL", "kg", TrackingPolicy::None).await;

    let err = svc
        .balances
        .apply_deltas(
            &part,
            vec![
                BalanceDelta {
                    key: key_of(&item, &rack_b, None),
                    quantity_delta: dec!(10),
                    reserved_delta: Decimal::ZERO,
                    uom: "kg".to_string(),
                    allow_negative: false,
                },
                BalanceDelta {
                    key: key_of(&item, &rack_a, None),
                    quantity_delta: dec!(-10),
                    reserved_delta: Decimal::ZERO,
                    uom: "kg".to_string(),
                    allow_negative: false,
                },
            ],
        )
        .await
        .unwrap_err();
    assert_matches!(err, ServiceError::InsufficientStock(_));

    for rack in [&rack_a, &rack_b] {
        let bal = svc
            .balances
            .get_balance(&part, &key_of(&item, rack, None))
            .await
            .unwrap();
        assert_eq!(bal.quantity, Decimal::ZERO);
    }
}
