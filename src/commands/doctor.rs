// Copyright (c) 2025 Pixwallet contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::money::Money;
use crate::store;
use crate::utils::pretty_table;
use anyhow::Result;
use rusqlite::Connection;

/// Audits the invariant the whole design protects: every wallet's
/// balance must equal the signed sum of its ledger entries. Also flags
/// ledger entries whose endToEndId references no transfer.
pub fn handle(conn: &Connection) -> Result<()> {
    let mut rows = Vec::new();

    // 1) Wallet balance vs. ledger replay
    let mut stmt = conn.prepare("SELECT id, balance FROM wallets ORDER BY id")?;
    let mut cur = stmt.query([])?;
    while let Some(r) = cur.next()? {
        let id: i64 = r.get(0)?;
        let balance: String = r.get(1)?;
        let replayed = store::entries_for_wallet(conn, id)?
            .iter()
            .fold(Money::zero(), |acc, e| acc.add(e.signed_amount()));
        if balance != replayed.to_string() {
            rows.push(vec![
                "balance_ledger_mismatch".into(),
                format!("wallet {} balance {} ledger {}", id, balance, replayed),
            ]);
        }
    }

    // 2) Ledger entries tagged with an unknown transfer
    let mut stmt2 = conn.prepare(
        "SELECT l.id, l.end_to_end_id FROM ledger_entries l
         WHERE l.end_to_end_id IS NOT NULL
           AND NOT EXISTS (SELECT 1 FROM pix_transfers t WHERE t.end_to_end_id = l.end_to_end_id)",
    )?;
    let mut cur2 = stmt2.query([])?;
    while let Some(r) = cur2.next()? {
        let id: i64 = r.get(0)?;
        let e2e: String = r.get(1)?;
        rows.push(vec![
            "dangling_end_to_end_id".into(),
            format!("entry {} -> {}", id, e2e),
        ]);
    }

    // 3) Pending transfers whose debit entry is missing
    let mut stmt3 = conn.prepare(
        "SELECT t.end_to_end_id FROM pix_transfers t
         WHERE NOT EXISTS (
            SELECT 1 FROM ledger_entries l
            WHERE l.end_to_end_id = t.end_to_end_id AND l.type = 'TRANSFER_DEBIT')",
    )?;
    let mut cur3 = stmt3.query([])?;
    while let Some(r) = cur3.next()? {
        let e2e: String = r.get(0)?;
        rows.push(vec!["transfer_missing_debit".into(), e2e]);
    }

    if rows.is_empty() {
        println!("doctor: no issues found");
    } else {
        println!("{}", pretty_table(&["Issue", "Detail"], rows));
    }
    Ok(())
}
