// Copyright (c) 2025 Pixwallet contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;

use crate::error::PixError;
use crate::models::{KeyType, PixKey};
use crate::store;
use crate::utils::{maybe_print_json, pretty_table};

/// Registers a Pix key for a wallet. The value must validate for its
/// type and be unique across all wallets; the UNIQUE constraint on
/// key_value settles any concurrent double-registration.
pub fn register_key(
    conn: &mut Connection,
    wallet_id: i64,
    key_type: KeyType,
    key_value: &str,
) -> Result<PixKey, PixError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    if !store::wallet_exists(&tx, wallet_id)? {
        return Err(PixError::WalletNotFound(wallet_id));
    }
    if store::key_exists(&tx, key_value)? {
        return Err(PixError::DuplicateKey(key_value.to_string()));
    }
    let candidate = PixKey {
        id: 0,
        wallet_id,
        key_type,
        key_value: key_value.to_string(),
        created_at: String::new(),
    };
    candidate.validate()?;
    let key = store::insert_pix_key(&tx, wallet_id, key_type, key_value)?;
    tx.commit()?;
    Ok(key)
}

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("register", sub)) => {
            let wallet_id: i64 = *sub.get_one::<i64>("wallet").unwrap();
            let key_type = KeyType::parse(sub.get_one::<String>("type").unwrap())?;
            let key_value = sub.get_one::<String>("value").unwrap().trim();
            let key = register_key(conn, wallet_id, key_type, key_value)?;
            println!(
                "Registered {} key '{}' for wallet {} (id: {})",
                key.key_type.as_str(),
                key.key_value,
                key.wallet_id,
                key.id
            );
        }
        Some(("list", sub)) => {
            let wallet_id: i64 = *sub.get_one::<i64>("wallet").unwrap();
            list(conn, wallet_id, sub.get_flag("json"), sub.get_flag("jsonl"))?;
        }
        _ => {}
    }
    Ok(())
}

#[derive(Serialize)]
pub struct KeyRow {
    pub id: i64,
    pub key_type: String,
    pub key_value: String,
    pub created_at: String,
}

fn list(conn: &Connection, wallet_id: i64, json_flag: bool, jsonl_flag: bool) -> Result<()> {
    if !store::wallet_exists(conn, wallet_id)? {
        return Err(PixError::WalletNotFound(wallet_id).into());
    }
    let data: Vec<KeyRow> = store::keys_for_wallet(conn, wallet_id)?
        .iter()
        .map(|k| KeyRow {
            id: k.id,
            key_type: k.key_type.as_str().to_string(),
            key_value: k.key_value.clone(),
            created_at: k.created_at.clone(),
        })
        .collect();
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|k| {
                vec![
                    k.id.to_string(),
                    k.key_type.clone(),
                    k.key_value.clone(),
                    k.created_at.clone(),
                ]
            })
            .collect();
        println!("{}", pretty_table(&["Id", "Type", "Value", "Created"], rows));
    }
    Ok(())
}
