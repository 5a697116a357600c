// Copyright (c) 2025 Pixwallet contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use pixwallet::commands::keys::register_key;
use pixwallet::commands::transfer::transfer_pix;
use pixwallet::commands::wallets::{create_wallet, current_balance, deposit};
use pixwallet::commands::webhook::{settle, Settlement};
use pixwallet::db;
use pixwallet::error::PixError;
use pixwallet::models::{EntryType, KeyType, TransferStatus};
use pixwallet::money::Money;
use pixwallet::store;
use pixwallet::utils::parse_money;
use rusqlite::Connection;

/// Funded source, keyed destination, and one pending transfer of the
/// given amount. Returns (source, destination, endToEndId).
fn setup_pending(conn: &mut Connection, funding: &str, amount: &str) -> (i64, i64, String) {
    let src = create_wallet(conn, "alice").unwrap();
    let dst = create_wallet(conn, "bob").unwrap();
    deposit(conn, src.id, parse_money(funding).unwrap()).unwrap();
    register_key(conn, dst.id, KeyType::Email, "bob@example.com").unwrap();
    let transfer = transfer_pix(
        conn,
        src.id,
        "bob@example.com",
        parse_money(amount).unwrap(),
        "req-1",
    )
    .unwrap();
    (src.id, dst.id, transfer.end_to_end_id)
}

fn ledger_consistent(conn: &Connection, wallet_id: i64) -> bool {
    let replayed = store::entries_for_wallet(conn, wallet_id)
        .unwrap()
        .iter()
        .fold(Money::zero(), |acc, e| acc.add(e.signed_amount()));
    current_balance(conn, wallet_id).unwrap() == replayed
}

#[test]
fn confirmation_credits_destination() {
    // Scenario B, second half.
    let mut conn = db::open_in_memory().unwrap();
    let (src, dst, e2e) = setup_pending(&mut conn, "500.00", "150.00");

    let outcome = settle(&mut conn, "evt-1", &e2e, "CONFIRMED").unwrap();
    assert_eq!(outcome, Settlement::Applied);

    assert_eq!(current_balance(&conn, src).unwrap().to_string(), "350.00");
    assert_eq!(current_balance(&conn, dst).unwrap().to_string(), "150.00");

    let transfer = store::transfer_by_id(&conn, &e2e).unwrap().unwrap();
    assert_eq!(transfer.status, TransferStatus::Confirmed);
    assert!(transfer.confirmed_at.is_some());
    assert!(transfer.rejected_at.is_none());

    let credits: Vec<_> = store::entries_for_wallet(&conn, dst)
        .unwrap()
        .into_iter()
        .filter(|e| e.entry_type == EntryType::TransferCredit)
        .collect();
    assert_eq!(credits.len(), 1);
    assert_eq!(credits[0].end_to_end_id.as_deref(), Some(e2e.as_str()));
    assert_eq!(
        credits[0].metadata.as_deref(),
        Some(format!("Pix transfer confirmed from wallet {src}").as_str())
    );
    assert!(ledger_consistent(&conn, src) && ledger_consistent(&conn, dst));
}

#[test]
fn rejection_refunds_source_as_new_deposit_entry() {
    // Scenario C: 100.00 from a 300.00 wallet, then REJECTED.
    let mut conn = db::open_in_memory().unwrap();
    let (src, dst, e2e) = setup_pending(&mut conn, "300.00", "100.00");
    assert_eq!(current_balance(&conn, src).unwrap().to_string(), "200.00");

    let outcome = settle(&mut conn, "evt-1", &e2e, "REJECTED").unwrap();
    assert_eq!(outcome, Settlement::Applied);

    assert_eq!(current_balance(&conn, src).unwrap().to_string(), "300.00");
    assert_eq!(current_balance(&conn, dst).unwrap().to_string(), "0.00");

    let transfer = store::transfer_by_id(&conn, &e2e).unwrap().unwrap();
    assert_eq!(transfer.status, TransferStatus::Rejected);
    assert!(transfer.rejected_at.is_some());

    // The original debit entry is untouched; the refund is a fresh
    // DEPOSIT entry tagged with the same endToEndId.
    let entries = store::entries_for_wallet(&conn, src).unwrap();
    let debit = entries
        .iter()
        .find(|e| e.entry_type == EntryType::TransferDebit)
        .unwrap();
    assert_eq!(debit.amount.to_string(), "100.00");
    let refund = entries
        .iter()
        .find(|e| e.metadata.as_deref() == Some("Pix transfer rejected - refund"))
        .unwrap();
    assert_eq!(refund.entry_type, EntryType::Deposit);
    assert_eq!(refund.end_to_end_id.as_deref(), Some(e2e.as_str()));
    assert!(ledger_consistent(&conn, src));
}

#[test]
fn duplicate_event_id_changes_nothing() {
    let mut conn = db::open_in_memory().unwrap();
    let (src, dst, e2e) = setup_pending(&mut conn, "500.00", "150.00");

    assert_eq!(settle(&mut conn, "evt-1", &e2e, "CONFIRMED").unwrap(), Settlement::Applied);
    assert_eq!(settle(&mut conn, "evt-1", &e2e, "CONFIRMED").unwrap(), Settlement::Duplicate);

    // Exactly one balance change.
    assert_eq!(current_balance(&conn, dst).unwrap().to_string(), "150.00");
    assert_eq!(current_balance(&conn, src).unwrap().to_string(), "350.00");
    let credits: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM ledger_entries WHERE type='TRANSFER_CREDIT'",
            [],
            |r| r.get(0),
        )
        .unwrap();
    assert_eq!(credits, 1);
}

#[test]
fn stale_event_on_settled_transfer_is_a_tolerated_noop() {
    let mut conn = db::open_in_memory().unwrap();
    let (src, dst, e2e) = setup_pending(&mut conn, "500.00", "150.00");

    assert_eq!(settle(&mut conn, "evt-1", &e2e, "CONFIRMED").unwrap(), Settlement::Applied);
    // A different eventId for an already-terminal transfer: tolerated,
    // recorded, no funds move.
    assert_eq!(settle(&mut conn, "evt-2", &e2e, "REJECTED").unwrap(), Settlement::Stale);
    assert_eq!(settle(&mut conn, "evt-3", &e2e, "CONFIRMED").unwrap(), Settlement::Stale);

    assert_eq!(current_balance(&conn, src).unwrap().to_string(), "350.00");
    assert_eq!(current_balance(&conn, dst).unwrap().to_string(), "150.00");
    let transfer = store::transfer_by_id(&conn, &e2e).unwrap().unwrap();
    assert_eq!(transfer.status, TransferStatus::Confirmed);

    // The stale deliveries are themselves deduped afterwards.
    assert_eq!(settle(&mut conn, "evt-2", &e2e, "REJECTED").unwrap(), Settlement::Duplicate);
}

#[test]
fn unknown_event_type_fails_and_is_not_marked_processed() {
    let mut conn = db::open_in_memory().unwrap();
    let (src, dst, e2e) = setup_pending(&mut conn, "500.00", "150.00");

    match settle(&mut conn, "evt-1", &e2e, "SETTLED") {
        Err(PixError::UnknownEventType(t)) => assert_eq!(t, "SETTLED"),
        other => panic!("expected UnknownEventType, got {other:?}"),
    }
    assert_eq!(current_balance(&conn, dst).unwrap().to_string(), "0.00");

    // The malformed delivery did not burn the eventId: a corrected
    // retry with the same id still applies.
    assert_eq!(settle(&mut conn, "evt-1", &e2e, "CONFIRMED").unwrap(), Settlement::Applied);
    assert_eq!(current_balance(&conn, dst).unwrap().to_string(), "150.00");
    assert_eq!(current_balance(&conn, src).unwrap().to_string(), "350.00");
}

#[test]
fn settling_an_unknown_transfer_fails() {
    let mut conn = db::open_in_memory().unwrap();
    setup_pending(&mut conn, "500.00", "150.00");
    match settle(&mut conn, "evt-1", "E00000000000000000000000000000000", "CONFIRMED") {
        Err(PixError::TransferNotFound(id)) => {
            assert_eq!(id, "E00000000000000000000000000000000")
        }
        other => panic!("expected TransferNotFound, got {other:?}"),
    }
}

#[test]
fn exactly_one_credit_or_refund_never_both() {
    let mut conn = db::open_in_memory().unwrap();
    let (src, dst, e2e) = setup_pending(&mut conn, "500.00", "150.00");

    settle(&mut conn, "evt-1", &e2e, "CONFIRMED").unwrap();
    settle(&mut conn, "evt-2", &e2e, "REJECTED").unwrap();
    settle(&mut conn, "evt-3", &e2e, "CONFIRMED").unwrap();

    let tagged: Vec<(String, String)> = {
        let mut stmt = conn
            .prepare(
                "SELECT type, wallet_id FROM ledger_entries WHERE end_to_end_id=?1 ORDER BY id",
            )
            .unwrap();
        let rows = stmt
            .query_map([&e2e], |r| {
                Ok((r.get::<_, String>(0)?, r.get::<_, i64>(1)?.to_string()))
            })
            .unwrap();
        rows.map(|r| r.unwrap()).collect()
    };
    // One debit at creation, one credit at confirmation, nothing else.
    assert_eq!(
        tagged,
        vec![
            ("TRANSFER_DEBIT".to_string(), src.to_string()),
            ("TRANSFER_CREDIT".to_string(), dst.to_string()),
        ]
    );
}

#[test]
fn direct_transitions_out_of_terminal_states_error() {
    use pixwallet::models::PixTransfer;
    let mut transfer = PixTransfer {
        end_to_end_id: "E11111111111111111111111111111111".to_string(),
        from_wallet_id: 1,
        to_wallet_id: 2,
        amount: parse_money("10.00").unwrap(),
        status: TransferStatus::Pending,
        created_at: "2025-01-01 00:00:00.000000".to_string(),
        confirmed_at: None,
        rejected_at: None,
    };
    transfer.confirm("2025-01-01 00:00:01.000000").unwrap();
    assert!(matches!(
        transfer.confirm("2025-01-01 00:00:02.000000"),
        Err(PixError::InvalidStateTransition { .. })
    ));
    assert!(matches!(
        transfer.reject("2025-01-01 00:00:02.000000"),
        Err(PixError::InvalidStateTransition { .. })
    ));
    // The terminal timestamp was set exactly once and never reset.
    assert_eq!(transfer.confirmed_at.as_deref(), Some("2025-01-01 00:00:01.000000"));
    assert!(transfer.rejected_at.is_none());
}
