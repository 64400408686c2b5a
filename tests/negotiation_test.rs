mod common;

use common::{engine, insert_admin, insert_listing, insert_user, request_status, setup_db};
use sqlx::types::BigDecimal;
use swap_engine::auth::AuthContext;
use swap_engine::db::models::RequestStatus;
use swap_engine::error::AppError;
use swap_engine::services::{CounterInput, ListRole, ProposeInput};

fn offer(from_listing_id: i64, to_listing_id: i64) -> ProposeInput {
    ProposeInput {
        from_listing_id,
        to_listing_id,
        cash_adjustment: None,
        currency: None,
        message: None,
    }
}

#[tokio::test]
async fn test_propose_applies_defaults() {
    let db = setup_db().await;
    let engine = engine(&db.pool);
    let asha = insert_user(&db.pool, "Asha").await;
    let ravi = insert_user(&db.pool, "Ravi").await;
    let camera = insert_listing(&db.pool, asha, "Camera").await;
    let guitar = insert_listing(&db.pool, ravi, "Guitar").await;

    let request = engine
        .proposals
        .propose(
            &AuthContext::user(asha),
            ProposeInput {
                message: Some("  swap?  ".to_string()),
                ..offer(camera, guitar)
            },
        )
        .await
        .unwrap();

    assert_eq!(request.status, RequestStatus::Pending);
    assert_eq!(request.from_user_id, asha);
    assert_eq!(request.to_user_id, ravi);
    assert_eq!(request.currency, "INR");
    assert_eq!(request.cash_adjustment, BigDecimal::from(0));
    assert_eq!(request.message.as_deref(), Some("swap?"));
    assert!(!request.is_seen);
    assert!(request.parent_request_id.is_none());
}

#[tokio::test]
async fn test_propose_requires_ownership_of_offered_listing() {
    let db = setup_db().await;
    let engine = engine(&db.pool);
    let asha = insert_user(&db.pool, "Asha").await;
    let ravi = insert_user(&db.pool, "Ravi").await;
    let mallory = insert_user(&db.pool, "Mallory").await;
    let camera = insert_listing(&db.pool, asha, "Camera").await;
    let guitar = insert_listing(&db.pool, ravi, "Guitar").await;

    let result = engine
        .proposals
        .propose(&AuthContext::user(mallory), offer(camera, guitar))
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    let result = engine
        .proposals
        .propose(&AuthContext::anonymous(), offer(camera, guitar))
        .await;
    assert!(matches!(result, Err(AppError::Unauthenticated)));
}

#[tokio::test]
async fn test_propose_rejects_invalid_input() {
    let db = setup_db().await;
    let engine = engine(&db.pool);
    let asha = insert_user(&db.pool, "Asha").await;
    let ravi = insert_user(&db.pool, "Ravi").await;
    let camera = insert_listing(&db.pool, asha, "Camera").await;
    let lens = insert_listing(&db.pool, asha, "Lens").await;
    let guitar = insert_listing(&db.pool, ravi, "Guitar").await;
    let auth = AuthContext::user(asha);

    let same = engine.proposals.propose(&auth, offer(camera, camera)).await;
    assert!(matches!(same, Err(AppError::InvalidArgument(_))));

    let own = engine.proposals.propose(&auth, offer(camera, lens)).await;
    assert!(matches!(own, Err(AppError::InvalidArgument(_))));

    let currency = engine
        .proposals
        .propose(
            &auth,
            ProposeInput {
                currency: Some("rupees".to_string()),
                ..offer(camera, guitar)
            },
        )
        .await;
    assert!(matches!(currency, Err(AppError::InvalidArgument(_))));

    let cash = engine
        .proposals
        .propose(
            &auth,
            ProposeInput {
                cash_adjustment: Some("10.005".parse().unwrap()),
                ..offer(camera, guitar)
            },
        )
        .await;
    assert!(matches!(cash, Err(AppError::InvalidArgument(_))));

    let missing = engine.proposals.propose(&auth, offer(camera, 999_999)).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
}

#[tokio::test]
async fn test_duplicate_pending_proposal_conflicts() {
    let db = setup_db().await;
    let engine = engine(&db.pool);
    let asha = insert_user(&db.pool, "Asha").await;
    let ravi = insert_user(&db.pool, "Ravi").await;
    let camera = insert_listing(&db.pool, asha, "Camera").await;
    let guitar = insert_listing(&db.pool, ravi, "Guitar").await;
    let auth = AuthContext::user(asha);

    let first = engine.proposals.propose(&auth, offer(camera, guitar)).await.unwrap();
    let second = engine.proposals.propose(&auth, offer(camera, guitar)).await;
    assert!(matches!(second, Err(AppError::Conflict(_))));

    // Once the first is withdrawn the pair is free again.
    engine.proposals.cancel(&auth, first.id).await.unwrap();
    engine.proposals.propose(&auth, offer(camera, guitar)).await.unwrap();
}

#[tokio::test]
async fn test_propose_refused_for_inactive_listing() {
    let db = setup_db().await;
    let engine = engine(&db.pool);
    let asha = insert_user(&db.pool, "Asha").await;
    let ravi = insert_user(&db.pool, "Ravi").await;
    let camera = insert_listing(&db.pool, asha, "Camera").await;
    let guitar = insert_listing(&db.pool, ravi, "Guitar").await;

    sqlx::query("UPDATE listings SET is_active = FALSE WHERE id = $1")
        .bind(guitar)
        .execute(&db.pool)
        .await
        .unwrap();

    let result = engine
        .proposals
        .propose(&AuthContext::user(asha), offer(camera, guitar))
        .await;
    match result {
        Err(AppError::Conflict(msg)) => assert_eq!(msg, format!("listing {} unavailable", guitar)),
        other => panic!("expected conflict, got {:?}", other),
    }
}

#[tokio::test]
async fn test_decline_and_cancel_enforce_party() {
    let db = setup_db().await;
    let engine = engine(&db.pool);
    let asha = insert_user(&db.pool, "Asha").await;
    let ravi = insert_user(&db.pool, "Ravi").await;
    let mallory = insert_user(&db.pool, "Mallory").await;
    let camera = insert_listing(&db.pool, asha, "Camera").await;
    let guitar = insert_listing(&db.pool, ravi, "Guitar").await;

    let request = engine
        .proposals
        .propose(&AuthContext::user(asha), offer(camera, guitar))
        .await
        .unwrap();

    // Proposer may not decline, recipient may not cancel.
    let result = engine.proposals.decline(&AuthContext::user(asha), request.id).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
    let result = engine.proposals.cancel(&AuthContext::user(ravi), request.id).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));

    // Strangers cannot even see it.
    let result = engine.proposals.decline(&AuthContext::user(mallory), request.id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));
    let result = engine.proposals.get(&AuthContext::user(mallory), request.id).await;
    assert!(matches!(result, Err(AppError::NotFound(_))));

    engine
        .proposals
        .decline(&AuthContext::user(ravi), request.id)
        .await
        .unwrap();
    assert_eq!(request_status(&db.pool, request.id).await, "rejected");
}

#[tokio::test]
async fn test_terminal_requests_stay_terminal() {
    let db = setup_db().await;
    let engine = engine(&db.pool);
    let asha = insert_user(&db.pool, "Asha").await;
    let ravi = insert_user(&db.pool, "Ravi").await;
    let camera = insert_listing(&db.pool, asha, "Camera").await;
    let guitar = insert_listing(&db.pool, ravi, "Guitar").await;
    let proposer = AuthContext::user(asha);
    let recipient = AuthContext::user(ravi);

    let request = engine.proposals.propose(&proposer, offer(camera, guitar)).await.unwrap();
    engine.proposals.cancel(&proposer, request.id).await.unwrap();

    let results = vec![
        engine.proposals.cancel(&proposer, request.id).await.map(|_| ()),
        engine.proposals.decline(&recipient, request.id).await.map(|_| ()),
        engine.reservations.accept(&recipient, request.id).await.map(|_| ()),
        engine
            .proposals
            .counter(&recipient, request.id, CounterInput::default())
            .await
            .map(|_| ()),
    ];
    for result in results {
        match result {
            Err(AppError::Conflict(msg)) => assert_eq!(msg, "request already resolved"),
            other => panic!("expected conflict, got {:?}", other),
        }
    }

    assert_eq!(request_status(&db.pool, request.id).await, "cancelled");
}

#[tokio::test]
async fn test_counter_links_reversed_proposal() {
    let db = setup_db().await;
    let engine = engine(&db.pool);
    let asha = insert_user(&db.pool, "Asha").await;
    let ravi = insert_user(&db.pool, "Ravi").await;
    let camera = insert_listing(&db.pool, asha, "Camera").await;
    let guitar = insert_listing(&db.pool, ravi, "Guitar").await;

    let original = engine
        .proposals
        .propose(
            &AuthContext::user(asha),
            ProposeInput {
                cash_adjustment: Some(BigDecimal::from(500)),
                currency: Some("usd".to_string()),
                ..offer(camera, guitar)
            },
        )
        .await
        .unwrap();
    assert_eq!(original.currency, "USD");

    let counter = engine
        .proposals
        .counter(
            &AuthContext::user(ravi),
            original.id,
            CounterInput {
                cash_adjustment: Some(BigDecimal::from(300)),
                message: Some("meet halfway".to_string()),
            },
        )
        .await
        .unwrap();

    assert_eq!(counter.parent_request_id, Some(original.id));
    assert_eq!(counter.from_listing_id, guitar);
    assert_eq!(counter.to_listing_id, camera);
    assert_eq!(counter.from_user_id, ravi);
    assert_eq!(counter.to_user_id, asha);
    assert_eq!(counter.currency, "USD");
    assert_eq!(counter.cash_adjustment, BigDecimal::from(300));
    assert_eq!(counter.status, RequestStatus::Pending);
    assert_eq!(request_status(&db.pool, original.id).await, "rejected");

    // The proposer cannot counter their own request.
    let result = engine
        .proposals
        .counter(&AuthContext::user(ravi), counter.id, CounterInput::default())
        .await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn test_counter_is_all_or_nothing() {
    let db = setup_db().await;
    let engine = engine(&db.pool);
    let asha = insert_user(&db.pool, "Asha").await;
    let ravi = insert_user(&db.pool, "Ravi").await;
    let camera = insert_listing(&db.pool, asha, "Camera").await;
    let guitar = insert_listing(&db.pool, ravi, "Guitar").await;

    let forward = engine
        .proposals
        .propose(&AuthContext::user(asha), offer(camera, guitar))
        .await
        .unwrap();
    // Ravi already has a pending offer in the reverse direction, so the counter
    // cannot be inserted and the original must stay pending.
    engine
        .proposals
        .propose(&AuthContext::user(ravi), offer(guitar, camera))
        .await
        .unwrap();

    let result = engine
        .proposals
        .counter(&AuthContext::user(ravi), forward.id, CounterInput::default())
        .await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
    assert_eq!(request_status(&db.pool, forward.id).await, "pending");
}

#[tokio::test]
async fn test_list_mine_marks_received_seen() {
    let db = setup_db().await;
    let engine = engine(&db.pool);
    let asha = insert_user(&db.pool, "Asha").await;
    let ravi = insert_user(&db.pool, "Ravi").await;
    let camera = insert_listing(&db.pool, asha, "Camera").await;
    let lens = insert_listing(&db.pool, asha, "Lens").await;
    let guitar = insert_listing(&db.pool, ravi, "Guitar").await;
    let proposer = AuthContext::user(asha);
    let recipient = AuthContext::user(ravi);

    let first = engine.proposals.propose(&proposer, offer(camera, guitar)).await.unwrap();
    let second = engine.proposals.propose(&proposer, offer(lens, guitar)).await.unwrap();

    assert_eq!(engine.proposals.unseen_count(&recipient).await.unwrap(), 2);

    let sent = engine.proposals.list_mine(&proposer, ListRole::Sent).await.unwrap();
    assert_eq!(
        sent.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![second.id, first.id]
    );
    // Listing sent requests leaves the recipient's flags alone.
    assert_eq!(engine.proposals.unseen_count(&recipient).await.unwrap(), 2);

    let received = engine.proposals.list_mine(&recipient, ListRole::Received).await.unwrap();
    assert_eq!(received.len(), 2);
    assert!(received.iter().all(|r| !r.is_seen));
    assert_eq!(engine.proposals.unseen_count(&recipient).await.unwrap(), 0);

    let again = engine.proposals.list_mine(&recipient, ListRole::Received).await.unwrap();
    assert!(again.iter().all(|r| r.is_seen));

    let result = engine.proposals.list_mine(&AuthContext::anonymous(), ListRole::Sent).await;
    assert!(matches!(result, Err(AppError::Unauthenticated)));
}

#[tokio::test]
async fn test_mark_seen_only_touches_pending_received() {
    let db = setup_db().await;
    let engine = engine(&db.pool);
    let asha = insert_user(&db.pool, "Asha").await;
    let ravi = insert_user(&db.pool, "Ravi").await;
    let camera = insert_listing(&db.pool, asha, "Camera").await;
    let lens = insert_listing(&db.pool, asha, "Lens").await;
    let guitar = insert_listing(&db.pool, ravi, "Guitar").await;
    let proposer = AuthContext::user(asha);
    let recipient = AuthContext::user(ravi);

    engine.proposals.propose(&proposer, offer(camera, guitar)).await.unwrap();
    let withdrawn = engine.proposals.propose(&proposer, offer(lens, guitar)).await.unwrap();
    engine.proposals.cancel(&proposer, withdrawn.id).await.unwrap();

    assert_eq!(engine.proposals.unseen_count(&recipient).await.unwrap(), 1);
    assert_eq!(engine.proposals.mark_seen(&recipient).await.unwrap(), 1);
    assert_eq!(engine.proposals.mark_seen(&recipient).await.unwrap(), 0);
    assert_eq!(engine.proposals.unseen_count(&recipient).await.unwrap(), 0);
}

#[tokio::test]
async fn test_admin_sees_any_request_but_cannot_act_for_parties() {
    let db = setup_db().await;
    let engine = engine(&db.pool);
    let asha = insert_user(&db.pool, "Asha").await;
    let ravi = insert_user(&db.pool, "Ravi").await;
    let root = insert_admin(&db.pool, "Root").await;
    let camera = insert_listing(&db.pool, asha, "Camera").await;
    let guitar = insert_listing(&db.pool, ravi, "Guitar").await;

    let request = engine
        .proposals
        .propose(&AuthContext::user(asha), offer(camera, guitar))
        .await
        .unwrap();

    let admin = AuthContext::admin(root);
    let seen = engine.proposals.get(&admin, request.id).await.unwrap();
    assert_eq!(seen.id, request.id);

    let result = engine.reservations.accept(&admin, request.id).await;
    assert!(matches!(result, Err(AppError::Forbidden(_))));
    assert_eq!(request_status(&db.pool, request.id).await, "pending");
}
