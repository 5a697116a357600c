// Copyright (c) 2025 Pixwallet contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Persistence ports over SQLite. Read helpers take a `Connection`;
//! everything that mutates takes a `Transaction`, so an operation
//! cannot write outside an atomic unit. The orchestrating commands
//! open their transactions with `TransactionBehavior::Immediate`,
//! which takes the database write lock up front and holds it to
//! commit: that is the exclusive-lock discipline for wallet and
//! transfer rows on this storage engine.

use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use rust_decimal::Decimal;

use crate::error::{is_constraint_violation, PixError};
use crate::models::{EntryType, KeyType, LedgerEntry, PixKey, PixTransfer, TransferStatus, Wallet};
use crate::money::Money;
use crate::utils::now_str;

fn money_col(r: &Row, idx: usize) -> rusqlite::Result<Money> {
    let s: String = r.get(idx)?;
    let d = s
        .parse::<Decimal>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))?;
    Ok(Money::of(d))
}

fn text_enum_err(idx: usize, what: &str, s: &str) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(
        idx,
        Type::Text,
        format!("unrecognized {what} '{s}'").into(),
    )
}

// ---- Wallet store ----

fn row_to_wallet(r: &Row) -> rusqlite::Result<Wallet> {
    Ok(Wallet {
        id: r.get(0)?,
        user_id: r.get(1)?,
        balance: money_col(r, 2)?,
        version: r.get(3)?,
        created_at: r.get(4)?,
        updated_at: r.get(5)?,
    })
}

const WALLET_COLS: &str = "id, user_id, balance, version, created_at, updated_at";

pub fn create_wallet(tx: &Transaction, user_id: &str) -> Result<Wallet, PixError> {
    let now = now_str();
    tx.execute(
        "INSERT INTO wallets(user_id, balance, version, created_at, updated_at)
         VALUES (?1, ?2, 0, ?3, ?3)",
        params![user_id, Money::zero().to_string(), now],
    )?;
    let id = tx.last_insert_rowid();
    Ok(Wallet {
        id,
        user_id: user_id.to_string(),
        balance: Money::zero(),
        version: 0,
        created_at: now.clone(),
        updated_at: now,
    })
}

pub fn wallet_by_id(conn: &Connection, id: i64) -> Result<Option<Wallet>, PixError> {
    let w = conn
        .query_row(
            &format!("SELECT {WALLET_COLS} FROM wallets WHERE id=?1"),
            params![id],
            row_to_wallet,
        )
        .optional()?;
    Ok(w)
}

/// Locked read: valid only inside the caller's Immediate transaction,
/// which already holds the write lock for the whole unit.
pub fn wallet_for_update(tx: &Transaction, id: i64) -> Result<Option<Wallet>, PixError> {
    wallet_by_id(tx, id)
}

pub fn wallet_exists(conn: &Connection, id: i64) -> Result<bool, PixError> {
    let found: Option<i64> = conn
        .query_row("SELECT 1 FROM wallets WHERE id=?1", params![id], |r| r.get(0))
        .optional()?;
    Ok(found.is_some())
}

/// Persists a mutated wallet, bumping `version`. The version predicate
/// is an optimistic safety net under the pessimistic transaction; a
/// zero-row update means someone committed in between.
pub fn save_wallet(tx: &Transaction, wallet: &mut Wallet) -> Result<(), PixError> {
    let now = now_str();
    let changed = tx.execute(
        "UPDATE wallets SET balance=?1, version=version+1, updated_at=?2
         WHERE id=?3 AND version=?4",
        params![wallet.balance.to_string(), now, wallet.id, wallet.version],
    )?;
    if changed == 0 {
        return Err(PixError::StaleWallet(wallet.id));
    }
    wallet.version += 1;
    wallet.updated_at = now;
    Ok(())
}

// ---- Ledger store (append + read; entries are never updated) ----

fn row_to_entry(r: &Row) -> rusqlite::Result<LedgerEntry> {
    let type_str: String = r.get(3)?;
    let entry_type =
        EntryType::parse(&type_str).ok_or_else(|| text_enum_err(3, "ledger entry type", &type_str))?;
    Ok(LedgerEntry {
        id: r.get(0)?,
        wallet_id: r.get(1)?,
        amount: money_col(r, 2)?,
        entry_type,
        end_to_end_id: r.get(4)?,
        metadata: r.get(5)?,
        created_at: r.get(6)?,
    })
}

const ENTRY_COLS: &str = "id, wallet_id, amount, type, end_to_end_id, metadata, created_at";

pub fn append_entry(
    tx: &Transaction,
    wallet_id: i64,
    amount: Money,
    entry_type: EntryType,
    end_to_end_id: Option<&str>,
    metadata: Option<&str>,
) -> Result<LedgerEntry, PixError> {
    let now = now_str();
    tx.execute(
        "INSERT INTO ledger_entries(wallet_id, amount, type, end_to_end_id, metadata, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            wallet_id,
            amount.to_string(),
            entry_type.as_str(),
            end_to_end_id,
            metadata,
            now
        ],
    )?;
    Ok(LedgerEntry {
        id: tx.last_insert_rowid(),
        wallet_id,
        amount,
        entry_type,
        end_to_end_id: end_to_end_id.map(|s| s.to_string()),
        metadata: metadata.map(|s| s.to_string()),
        created_at: now,
    })
}

pub fn entries_for_wallet(conn: &Connection, wallet_id: i64) -> Result<Vec<LedgerEntry>, PixError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLS} FROM ledger_entries WHERE wallet_id=?1 ORDER BY created_at, id"
    ))?;
    let rows = stmt.query_map(params![wallet_id], row_to_entry)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn entries_before(
    conn: &Connection,
    wallet_id: i64,
    timestamp: &str,
) -> Result<Vec<LedgerEntry>, PixError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {ENTRY_COLS} FROM ledger_entries
         WHERE wallet_id=?1 AND created_at < ?2 ORDER BY created_at, id"
    ))?;
    let rows = stmt.query_map(params![wallet_id, timestamp], row_to_entry)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

// ---- PixKey store ----

fn row_to_key(r: &Row) -> rusqlite::Result<PixKey> {
    let type_str: String = r.get(2)?;
    let key_type = KeyType::parse(&type_str)
        .map_err(|_| text_enum_err(2, "pix key type", &type_str))?;
    Ok(PixKey {
        id: r.get(0)?,
        wallet_id: r.get(1)?,
        key_type,
        key_value: r.get(3)?,
        created_at: r.get(4)?,
    })
}

const KEY_COLS: &str = "id, wallet_id, key_type, key_value, created_at";

pub fn insert_pix_key(
    tx: &Transaction,
    wallet_id: i64,
    key_type: KeyType,
    key_value: &str,
) -> Result<PixKey, PixError> {
    let now = now_str();
    tx.execute(
        "INSERT INTO pix_keys(wallet_id, key_type, key_value, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![wallet_id, key_type.as_str(), key_value, now],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            PixError::DuplicateKey(key_value.to_string())
        } else {
            PixError::Db(e)
        }
    })?;
    Ok(PixKey {
        id: tx.last_insert_rowid(),
        wallet_id,
        key_type,
        key_value: key_value.to_string(),
        created_at: now,
    })
}

pub fn key_by_value(conn: &Connection, key_value: &str) -> Result<Option<PixKey>, PixError> {
    let k = conn
        .query_row(
            &format!("SELECT {KEY_COLS} FROM pix_keys WHERE key_value=?1"),
            params![key_value],
            row_to_key,
        )
        .optional()?;
    Ok(k)
}

pub fn key_exists(conn: &Connection, key_value: &str) -> Result<bool, PixError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM pix_keys WHERE key_value=?1",
            params![key_value],
            |r| r.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn keys_for_wallet(conn: &Connection, wallet_id: i64) -> Result<Vec<PixKey>, PixError> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {KEY_COLS} FROM pix_keys WHERE wallet_id=?1 ORDER BY id"
    ))?;
    let rows = stmt.query_map(params![wallet_id], row_to_key)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

// ---- Transfer store ----

fn row_to_transfer(r: &Row) -> rusqlite::Result<PixTransfer> {
    let status_str: String = r.get(4)?;
    let status = TransferStatus::parse(&status_str)
        .ok_or_else(|| text_enum_err(4, "transfer status", &status_str))?;
    Ok(PixTransfer {
        end_to_end_id: r.get(0)?,
        from_wallet_id: r.get(1)?,
        to_wallet_id: r.get(2)?,
        amount: money_col(r, 3)?,
        status,
        created_at: r.get(5)?,
        confirmed_at: r.get(6)?,
        rejected_at: r.get(7)?,
    })
}

const TRANSFER_COLS: &str =
    "end_to_end_id, from_wallet_id, to_wallet_id, amount, status, created_at, confirmed_at, rejected_at";

pub fn insert_transfer(tx: &Transaction, transfer: &PixTransfer) -> Result<(), PixError> {
    tx.execute(
        "INSERT INTO pix_transfers(end_to_end_id, from_wallet_id, to_wallet_id, amount, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            transfer.end_to_end_id,
            transfer.from_wallet_id,
            transfer.to_wallet_id,
            transfer.amount.to_string(),
            transfer.status.as_str(),
            transfer.created_at
        ],
    )?;
    Ok(())
}

pub fn transfer_by_id(conn: &Connection, end_to_end_id: &str) -> Result<Option<PixTransfer>, PixError> {
    let t = conn
        .query_row(
            &format!("SELECT {TRANSFER_COLS} FROM pix_transfers WHERE end_to_end_id=?1"),
            params![end_to_end_id],
            row_to_transfer,
        )
        .optional()?;
    Ok(t)
}

/// Locked read of a transfer row; same contract as `wallet_for_update`.
pub fn transfer_for_update(
    tx: &Transaction,
    end_to_end_id: &str,
) -> Result<Option<PixTransfer>, PixError> {
    transfer_by_id(tx, end_to_end_id)
}

/// Persists a state transition. Terminal timestamps are set exactly
/// once by `PixTransfer::confirm`/`reject`; this only writes them out.
pub fn save_transfer_status(tx: &Transaction, transfer: &PixTransfer) -> Result<(), PixError> {
    tx.execute(
        "UPDATE pix_transfers SET status=?1, confirmed_at=?2, rejected_at=?3 WHERE end_to_end_id=?4",
        params![
            transfer.status.as_str(),
            transfer.confirmed_at,
            transfer.rejected_at,
            transfer.end_to_end_id
        ],
    )?;
    Ok(())
}

// ---- Idempotency store ----

pub fn idem_exists(conn: &Connection, scope: &str, key: &str) -> Result<bool, PixError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM idempotency_keys WHERE scope=?1 AND idem_key=?2",
            params![scope, key],
            |r| r.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

/// Write-once per (scope, key). A concurrent check-then-insert race is
/// decided here by the UNIQUE constraint, not by the earlier `exists`.
pub fn save_idempotency_key(
    tx: &Transaction,
    scope: &str,
    key: &str,
    response: &str,
) -> Result<(), PixError> {
    tx.execute(
        "INSERT INTO idempotency_keys(scope, idem_key, response, created_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![scope, key, response, now_str()],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            PixError::DuplicateRequest(key.to_string())
        } else {
            PixError::Db(e)
        }
    })?;
    Ok(())
}

// ---- Webhook event store ----

pub fn event_already_processed(conn: &Connection, event_id: &str) -> Result<bool, PixError> {
    let found: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM webhook_events WHERE event_id=?1",
            params![event_id],
            |r| r.get(0),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn save_event(
    tx: &Transaction,
    event_id: &str,
    end_to_end_id: &str,
    event_type: &str,
) -> Result<(), PixError> {
    tx.execute(
        "INSERT INTO webhook_events(event_id, end_to_end_id, event_type, processed_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![event_id, end_to_end_id, event_type, now_str()],
    )
    .map_err(|e| {
        if is_constraint_violation(&e) {
            PixError::DuplicateRequest(event_id.to_string())
        } else {
            PixError::Db(e)
        }
    })?;
    Ok(())
}
