// Copyright (c) 2025 Pixwallet contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::{Connection, TransactionBehavior};
use serde::Serialize;

use crate::error::PixError;
use crate::models::{EntryType, Wallet};
use crate::money::Money;
use crate::store;
use crate::utils::{format_ts, maybe_print_json, parse_money, parse_timestamp, pretty_table};

/// Creates a wallet with zero balance for the given user.
pub fn create_wallet(conn: &mut Connection, user_id: &str) -> Result<Wallet, PixError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let wallet = store::create_wallet(&tx, user_id)?;
    tx.commit()?;
    Ok(wallet)
}

/// Credits a wallet and books the matching DEPOSIT ledger entry, as
/// one atomic unit.
pub fn deposit(conn: &mut Connection, wallet_id: i64, amount: Money) -> Result<Wallet, PixError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut wallet =
        store::wallet_for_update(&tx, wallet_id)?.ok_or(PixError::WalletNotFound(wallet_id))?;
    wallet.deposit(amount)?;
    store::save_wallet(&tx, &mut wallet)?;
    store::append_entry(
        &tx,
        wallet_id,
        amount,
        EntryType::Deposit,
        None,
        Some("Deposit operation"),
    )?;
    tx.commit()?;
    Ok(wallet)
}

/// Debits a wallet and books the matching WITHDRAW ledger entry, as
/// one atomic unit. Never lets the balance go negative.
pub fn withdraw(conn: &mut Connection, wallet_id: i64, amount: Money) -> Result<Wallet, PixError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
    let mut wallet =
        store::wallet_for_update(&tx, wallet_id)?.ok_or(PixError::WalletNotFound(wallet_id))?;
    wallet.withdraw(amount)?;
    store::save_wallet(&tx, &mut wallet)?;
    store::append_entry(
        &tx,
        wallet_id,
        amount,
        EntryType::Withdraw,
        None,
        Some("Withdraw operation"),
    )?;
    tx.commit()?;
    Ok(wallet)
}

/// Live balance from the wallet row itself.
pub fn current_balance(conn: &Connection, wallet_id: i64) -> Result<Money, PixError> {
    let wallet = store::wallet_by_id(conn, wallet_id)?.ok_or(PixError::WalletNotFound(wallet_id))?;
    Ok(wallet.balance)
}

/// Point-in-time balance, replayed from the ledger alone. The wallet's
/// balance column is a cached projection; the ledger is the source of
/// truth, so this never reads it.
pub fn historical_balance(
    conn: &Connection,
    wallet_id: i64,
    timestamp: &str,
) -> Result<Money, PixError> {
    if !store::wallet_exists(conn, wallet_id)? {
        return Err(PixError::WalletNotFound(wallet_id));
    }
    let entries = store::entries_before(conn, wallet_id, timestamp)?;
    Ok(entries
        .iter()
        .fold(Money::zero(), |acc, e| acc.add(e.signed_amount())))
}

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("create", sub)) => {
            let user = sub.get_one::<String>("user").unwrap();
            let wallet = create_wallet(conn, user)?;
            println!("Created wallet {} for user '{}'", wallet.id, wallet.user_id);
        }
        Some(("deposit", sub)) => {
            let id: i64 = *sub.get_one::<i64>("id").unwrap();
            let amount = parse_money(sub.get_one::<String>("amount").unwrap())?;
            let wallet = deposit(conn, id, amount)?;
            println!("Deposited {} into wallet {}, new balance {}", amount, id, wallet.balance);
        }
        Some(("withdraw", sub)) => {
            let id: i64 = *sub.get_one::<i64>("id").unwrap();
            let amount = parse_money(sub.get_one::<String>("amount").unwrap())?;
            let wallet = withdraw(conn, id, amount)?;
            println!("Withdrew {} from wallet {}, new balance {}", amount, id, wallet.balance);
        }
        Some(("balance", sub)) => {
            let id: i64 = *sub.get_one::<i64>("id").unwrap();
            match sub.get_one::<String>("at") {
                Some(at) => {
                    let ts = format_ts(parse_timestamp(at)?);
                    let balance = historical_balance(conn, id, &ts)?;
                    println!("Balance of wallet {} at {}: {}", id, at.trim(), balance);
                }
                None => {
                    let balance = current_balance(conn, id)?;
                    println!("Balance of wallet {}: {}", id, balance);
                }
            }
        }
        Some(("history", sub)) => {
            let id: i64 = *sub.get_one::<i64>("id").unwrap();
            history(conn, id, sub.get_flag("json"), sub.get_flag("jsonl"))?;
        }
        _ => {}
    }
    Ok(())
}

#[derive(Serialize)]
pub struct HistoryRow {
    pub created_at: String,
    pub entry_type: String,
    pub amount: String,
    pub signed_amount: String,
    pub end_to_end_id: String,
    pub metadata: String,
}

fn history(conn: &Connection, wallet_id: i64, json_flag: bool, jsonl_flag: bool) -> Result<()> {
    if !store::wallet_exists(conn, wallet_id)? {
        return Err(PixError::WalletNotFound(wallet_id).into());
    }
    let data: Vec<HistoryRow> = store::entries_for_wallet(conn, wallet_id)?
        .iter()
        .map(|e| HistoryRow {
            created_at: e.created_at.clone(),
            entry_type: e.entry_type.as_str().to_string(),
            amount: e.amount.to_string(),
            signed_amount: e.signed_amount().to_string(),
            end_to_end_id: e.end_to_end_id.clone().unwrap_or_default(),
            metadata: e.metadata.clone().unwrap_or_default(),
        })
        .collect();
    if !maybe_print_json(json_flag, jsonl_flag, &data)? {
        let rows: Vec<Vec<String>> = data
            .iter()
            .map(|r| {
                vec![
                    r.created_at.clone(),
                    r.entry_type.clone(),
                    r.signed_amount.clone(),
                    r.end_to_end_id.clone(),
                    r.metadata.clone(),
                ]
            })
            .collect();
        println!(
            "{}",
            pretty_table(&["Created", "Type", "Amount", "EndToEndId", "Note"], rows)
        );
    }
    Ok(())
}
