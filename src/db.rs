// Copyright (c) 2025 Pixwallet contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::Connection;
use std::fs;
use std::path::{Path, PathBuf};

static APP: Lazy<(&str, &str, &str)> = Lazy::new(|| ("dev.pixwallet", "Pixwallet", "pixwallet"));

pub fn db_path() -> Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .context("Could not determine platform-specific data dir")?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir).context("Failed to create data dir")?;
    Ok(data_dir.join("pixwallet.sqlite"))
}

pub fn open_or_init() -> Result<Connection> {
    open_at(&db_path()?)
}

pub fn open_at(path: &Path) -> Result<Connection> {
    let mut conn =
        Connection::open(path).with_context(|| format!("Open DB at {}", path.display()))?;
    init_schema(&mut conn)?;
    Ok(conn)
}

/// In-memory database with the full schema, used by the test suites.
pub fn open_in_memory() -> Result<Connection> {
    let mut conn = Connection::open_in_memory()?;
    init_schema(&mut conn)?;
    Ok(conn)
}

fn init_schema(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS wallets(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        user_id TEXT NOT NULL,
        balance TEXT NOT NULL,
        version INTEGER NOT NULL DEFAULT 0,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );

    -- Append-only audit log. No UPDATE or DELETE path exists in the code.
    CREATE TABLE IF NOT EXISTS ledger_entries(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        wallet_id INTEGER NOT NULL,
        amount TEXT NOT NULL,
        type TEXT NOT NULL CHECK(type IN ('DEPOSIT','WITHDRAW','TRANSFER_DEBIT','TRANSFER_CREDIT')),
        end_to_end_id TEXT,
        metadata TEXT,
        created_at TEXT NOT NULL,
        FOREIGN KEY(wallet_id) REFERENCES wallets(id)
    );
    CREATE INDEX IF NOT EXISTS idx_ledger_wallet_created
        ON ledger_entries(wallet_id, created_at);

    CREATE TABLE IF NOT EXISTS pix_keys(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        wallet_id INTEGER NOT NULL,
        key_type TEXT NOT NULL CHECK(key_type IN ('CPF','EMAIL','PHONE','EVP')),
        key_value TEXT NOT NULL UNIQUE,
        created_at TEXT NOT NULL,
        FOREIGN KEY(wallet_id) REFERENCES wallets(id)
    );

    CREATE TABLE IF NOT EXISTS pix_transfers(
        end_to_end_id TEXT PRIMARY KEY,
        from_wallet_id INTEGER NOT NULL,
        to_wallet_id INTEGER NOT NULL,
        amount TEXT NOT NULL,
        status TEXT NOT NULL CHECK(status IN ('PENDING','CONFIRMED','REJECTED')),
        created_at TEXT NOT NULL,
        confirmed_at TEXT,
        rejected_at TEXT,
        FOREIGN KEY(from_wallet_id) REFERENCES wallets(id),
        FOREIGN KEY(to_wallet_id) REFERENCES wallets(id)
    );

    -- Uniqueness on (scope, idem_key) is the idempotency race arbiter,
    -- not the preceding existence check.
    CREATE TABLE IF NOT EXISTS idempotency_keys(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        scope TEXT NOT NULL,
        idem_key TEXT NOT NULL,
        response TEXT NOT NULL,
        created_at TEXT NOT NULL,
        UNIQUE(scope, idem_key)
    );

    CREATE TABLE IF NOT EXISTS webhook_events(
        event_id TEXT PRIMARY KEY,
        end_to_end_id TEXT NOT NULL,
        event_type TEXT NOT NULL,
        processed_at TEXT NOT NULL
    );
    "#,
    )?;
    Ok(())
}
