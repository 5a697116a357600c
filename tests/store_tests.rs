// Copyright (c) 2025 Pixwallet contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Store-level tests for the guarantees the uniqueness constraints and
//! the version column provide on their own, with no command-layer
//! pre-checks in front of them.

use pixwallet::db;
use pixwallet::error::PixError;
use pixwallet::models::KeyType;
use pixwallet::store;
use rusqlite::TransactionBehavior;

#[test]
fn second_idempotency_insert_loses_the_race_as_duplicate_request() {
    // Two units of work that both passed the exists() pre-check; the
    // UNIQUE(scope, idem_key) constraint decides, not the check.
    let mut conn = db::open_in_memory().unwrap();
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .unwrap();

    store::save_idempotency_key(&tx, "pix_transfer", "req-1", "E1").unwrap();
    match store::save_idempotency_key(&tx, "pix_transfer", "req-1", "E2") {
        Err(PixError::DuplicateRequest(k)) => assert_eq!(k, "req-1"),
        other => panic!("expected DuplicateRequest, got {other:?}"),
    }

    // Same key under a different scope is an independent namespace.
    store::save_idempotency_key(&tx, "other_scope", "req-1", "E3").unwrap();
}

#[test]
fn second_pix_key_insert_surfaces_duplicate_key() {
    let mut conn = db::open_in_memory().unwrap();
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .unwrap();
    let alice = store::create_wallet(&tx, "alice").unwrap();
    let bob = store::create_wallet(&tx, "bob").unwrap();

    store::insert_pix_key(&tx, alice.id, KeyType::Email, "shared@example.com").unwrap();
    // Straight to the insert, as a racing registration would go.
    match store::insert_pix_key(&tx, bob.id, KeyType::Email, "shared@example.com") {
        Err(PixError::DuplicateKey(v)) => assert_eq!(v, "shared@example.com"),
        other => panic!("expected DuplicateKey, got {other:?}"),
    }
}

#[test]
fn second_webhook_event_insert_is_rejected_by_event_id() {
    let mut conn = db::open_in_memory().unwrap();
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .unwrap();

    store::save_event(&tx, "evt-1", "E1", "CONFIRMED").unwrap();
    match store::save_event(&tx, "evt-1", "E1", "CONFIRMED") {
        Err(PixError::DuplicateRequest(id)) => assert_eq!(id, "evt-1"),
        other => panic!("expected DuplicateRequest, got {other:?}"),
    }
}

#[test]
fn save_wallet_with_stale_version_is_detected() {
    let mut conn = db::open_in_memory().unwrap();
    let tx = conn
        .transaction_with_behavior(TransactionBehavior::Immediate)
        .unwrap();
    let wallet = store::create_wallet(&tx, "alice").unwrap();

    // Two in-memory copies of the same row, as two callers that both
    // read before either wrote.
    let mut first = store::wallet_for_update(&tx, wallet.id).unwrap().unwrap();
    let mut second = first.clone();

    store::save_wallet(&tx, &mut first).unwrap();
    assert_eq!(first.version, 1);

    // The second copy still carries version 0; its write must not land.
    match store::save_wallet(&tx, &mut second) {
        Err(PixError::StaleWallet(id)) => assert_eq!(id, wallet.id),
        other => panic!("expected StaleWallet, got {other:?}"),
    }
    assert_eq!(second.version, 0);

    let reread = store::wallet_for_update(&tx, wallet.id).unwrap().unwrap();
    assert_eq!(reread.version, 1);
}
