mod common;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use stockcore::entities::{MovementStatus, MovementType, TrackingPolicy};
use stockcore::ServiceError;

use common::{key_of, movement_input, partition, post_receipt, seed_item, seed_location, seed_warehouse, setup};

/// Twenty confirmed deliveries of 1 against 10 on hand, posted concurrently.
/// Exactly ten succeed, the rest fail the availability re-check under the
/// balance lock, and the row ends at zero.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_posts_never_oversell_a_balance() {
    let svc = setup();
    let part = partition();
    let wh = seed_warehouse(&svc, &part, "WH-MAIN").await;
    let rack = seed_location(&svc, &part, &wh, None, "RACK-A1").await;
    let item = seed_item(&svc, &part, "STEEL", "kg", TrackingPolicy::None).await;
    let key = key_of(&item, &rack, None);
    post_receipt(&svc, &part, &item, &rack, dec!(10), None).await;

    // Confirm all 20 while stock still covers each individually.
    let mut ids = Vec::new();
    for _ in 0..20 {
        let mv = svc
            .movements
            .create_movement(
                &part,
                movement_input(MovementType::Delivery, &item, Some(&rack), None, dec!(1), "kg", None),
            )
            .await
            .unwrap();
        svc.movements.confirm_movement(&part, mv.id).await.unwrap();
        ids.push(mv.id);
    }

    let mut handles = Vec::new();
    for id in ids.clone() {
        let svc = svc.clone();
        let part = part.clone();
        handles.push(tokio::spawn(async move {
            svc.movements.post_movement(&part, id).await
        }));
    }

    let mut succeeded = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => succeeded += 1,
            Err(ServiceError::InsufficientStock(_)) => insufficient += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(succeeded, 10);
    assert_eq!(insufficient, 10);

    let bal = svc.balances.get_balance(&part, &key).await.unwrap();
    assert_eq!(bal.quantity, Decimal::ZERO);

    // The failed movements are still confirmed and could retry later.
    let mut done = 0;
    for id in ids {
        let mv = svc.movements.get_movement(&part, id).await.unwrap();
        match mv.status {
            MovementStatus::Done => done += 1,
            MovementStatus::Confirmed => {}
            other => panic!("unexpected status: {other}"),
        }
    }
    assert_eq!(done, 10);
}

/// Two tasks racing to post one confirmed movement: exactly one transition
/// commits, the loser fails the status guard, and the delta lands once.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn posting_one_movement_from_two_tasks_applies_it_once() {
    let svc = setup();
    let part = partition();
    let wh = seed_warehouse(&svc, &part, "WH-MAIN").await;
    let rack = seed_location(&svc, &part, &wh, None, "RACK-A1").await;
    let item = seed_item(&svc, &part, "STEEL", "kg", TrackingPolicy::None).await;
    let key = key_of(&item, &rack, None);
    post_receipt(&svc, &part, &item, &rack, dec!(100), None).await;

    for _ in 0..25 {
        let mv = svc
            .movements
            .create_movement(
                &part,
                movement_input(MovementType::Delivery, &item, Some(&rack), None, dec!(1), "kg", None),
            )
            .await
            .unwrap();
        svc.movements.confirm_movement(&part, mv.id).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..2 {
            let svc = svc.clone();
            let part = part.clone();
            handles.push(tokio::spawn(async move {
                svc.movements.post_movement(&part, mv.id).await
            }));
        }

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(ServiceError::InvalidStatus(_)) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
        assert_eq!(ok, 1, "one post must win, the other must see done");
    }

    let bal = svc.balances.get_balance(&part, &key).await.unwrap();
    assert_eq!(bal.quantity, dec!(75));
}

/// A post racing a cancel of the same movement: whichever transition wins,
/// the other fails, and the ledger reflects only the posted ones.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn cancel_and_post_cannot_both_win() {
    let svc = setup();
    let part = partition();
    let wh = seed_warehouse(&svc, &part, "WH-MAIN").await;
    let rack = seed_location(&svc, &part, &wh, None, "RACK-A1").await;
    let item = seed_item(&svc, &part, "STEEL", "kg", TrackingPolicy::None).await;
    let key = key_of(&item, &rack, None);
    post_receipt(&svc, &part, &item, &rack, dec!(100), None).await;

    let mut posted = 0;
    for _ in 0..25 {
        let mv = svc
            .movements
            .create_movement(
                &part,
                movement_input(MovementType::Delivery, &item, Some(&rack), None, dec!(1), "kg", None),
            )
            .await
            .unwrap();
        svc.movements.confirm_movement(&part, mv.id).await.unwrap();

        let post = {
            let svc = svc.clone();
            let part = part.clone();
            tokio::spawn(async move { svc.movements.post_movement(&part, mv.id).await })
        };
        let cancel = {
            let svc = svc.clone();
            let part = part.clone();
            tokio::spawn(async move { svc.movements.cancel_movement(&part, mv.id).await })
        };

        let post = post.await.unwrap();
        let cancel = cancel.await.unwrap();
        assert!(
            post.is_ok() != cancel.is_ok(),
            "exactly one transition must win: post={:?} cancel={:?}",
            post.as_ref().map(|m| m.status),
            cancel.as_ref().map(|m| m.status)
        );
        if post.is_ok() {
            posted += 1;
        }

        let reloaded = svc.movements.get_movement(&part, mv.id).await.unwrap();
        assert!(reloaded.is_terminal());
    }

    let bal = svc.balances.get_balance(&part, &key).await.unwrap();
    assert_eq!(bal.quantity, dec!(100) - Decimal::from(posted));
}

/// Concurrent transfers over disjoint balance keys all go through; the lock
/// is per key, not global.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn disjoint_keys_post_independently() {
    let svc = setup();
    let part = partition();
    let wh = seed_warehouse(&svc, &part, "WH-MAIN").await;
    let item = seed_item(&svc, &part, "STEEL", "kg", TrackingPolicy::None).await;

    let mut pairs = Vec::new();
    for i in 0..8 {
        let src = seed_location(&svc, &part, &wh, None, &format!("SRC-{i}")).await;
        let dst = seed_location(&svc, &part, &wh, None, &format!("DST-{i}")).await;
        post_receipt(&svc, &part, &item, &src, dec!(100), None).await;
        pairs.push((src, dst));
    }

    let mut handles = Vec::new();
    for (src, dst) in &pairs {
        let mv = svc
            .movements
            .create_movement(
                &part,
                movement_input(
                    MovementType::Internal,
                    &item,
                    Some(src),
                    Some(dst),
                    dec!(100),
                    "kg",
                    None,
                ),
            )
            .await
            .unwrap();
        svc.movements.confirm_movement(&part, mv.id).await.unwrap();

        let svc = svc.clone();
        let part = part.clone();
        handles.push(tokio::spawn(async move {
            svc.movements.post_movement(&part, mv.id).await
        }));
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    for (src, dst) in &pairs {
        let src_bal = svc.balances.get_balance(&part, &key_of(&item, src, None)).await.unwrap();
        let dst_bal = svc.balances.get_balance(&part, &key_of(&item, dst, None)).await.unwrap();
        assert_eq!(src_bal.quantity, Decimal::ZERO);
        assert_eq!(dst_bal.quantity, dec!(100));
    }
}

/// Opposite-direction transfers over the same two keys take the locks in
/// sorted order, so they serialize instead of deadlocking.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn opposed_transfers_over_shared_keys_do_not_deadlock() {
    let svc = setup();
    let part = partition();
    let wh = seed_warehouse(&svc, &part, "WH-MAIN").await;
    let rack_a = seed_location(&svc, &part, &wh, None, "RACK-A1").await;
    let rack_b = seed_location(&svc, &part, &wh, None, "RACK-B1").await;
    let item = seed_item(&svc, &part, "STEEL", "kg", TrackingPolicy::None).await;
    post_receipt(&svc, &part, &item, &rack_a, dec!(50), None).await;
    post_receipt(&svc, &part, &item, &rack_b, dec!(50), None).await;

    let mut handles = Vec::new();
    for (src, dst) in [(&rack_a, &rack_b), (&rack_b, &rack_a)] {
        for _ in 0..10 {
            let mv = svc
                .movements
                .create_movement(
                    &part,
                    movement_input(
                        MovementType::Internal,
                        &item,
                        Some(src),
                        Some(dst),
                        dec!(1),
                        "kg",
                        None,
                    ),
                )
                .await
                .unwrap();
            svc.movements.confirm_movement(&part, mv.id).await.unwrap();

            let svc = svc.clone();
            let part = part.clone();
            handles.push(tokio::spawn(async move {
                svc.movements.post_movement(&part, mv.id).await
            }));
        }
    }

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    // Ten units each way: both racks end where they started.
    for rack in [&rack_a, &rack_b] {
        let bal = svc.balances.get_balance(&part, &key_of(&item, rack, None)).await.unwrap();
        assert_eq!(bal.quantity, dec!(50));
    }
}
