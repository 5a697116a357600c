// Copyright (c) 2025 Pixwallet contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::{Connection, TransactionBehavior};

use crate::error::PixError;
use crate::models::{EntryType, PixTransfer, TransferStatus};
use crate::money::Money;
use crate::store;
use crate::utils::{end_to_end_id, now_str, parse_money};

pub const IDEMPOTENCY_SCOPE: &str = "pix_transfer";

/// Creates a Pix transfer: resolves the key, debits the source wallet
/// immediately and irrevocably, books the TRANSFER_DEBIT entry, and
/// leaves the transfer PENDING for the external confirmer. The
/// destination wallet is only checked for existence here; it is
/// credited at settlement, never at request time. Everything happens
/// in one Immediate transaction, so a failure at any step leaves no
/// partial effect.
pub fn transfer_pix(
    conn: &mut Connection,
    from_wallet_id: i64,
    pix_key_value: &str,
    amount: Money,
    idempotency_key: &str,
) -> Result<PixTransfer, PixError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    // The caller already received a result for this key. The stored
    // response is kept but deliberately not replayed.
    if store::idem_exists(&tx, IDEMPOTENCY_SCOPE, idempotency_key)? {
        return Err(PixError::DuplicateRequest(idempotency_key.to_string()));
    }

    let destination_key = store::key_by_value(&tx, pix_key_value)?
        .ok_or_else(|| PixError::KeyNotFound(pix_key_value.to_string()))?;
    let to_wallet_id = destination_key.wallet_id;

    if from_wallet_id == to_wallet_id {
        return Err(PixError::InvalidTransfer(
            "source and destination wallets are the same".to_string(),
        ));
    }

    let mut source_wallet = store::wallet_for_update(&tx, from_wallet_id)?
        .ok_or(PixError::WalletNotFound(from_wallet_id))?;

    if !source_wallet.has_sufficient_balance(amount) {
        return Err(PixError::InsufficientBalance {
            balance: source_wallet.balance,
            requested: amount,
        });
    }

    if !store::wallet_exists(&tx, to_wallet_id)? {
        return Err(PixError::WalletNotFound(to_wallet_id));
    }

    // Debit the sender now; the money is reserved the instant the
    // transfer is accepted.
    source_wallet.withdraw(amount)?;
    store::save_wallet(&tx, &mut source_wallet)?;

    let transfer = PixTransfer {
        end_to_end_id: end_to_end_id(),
        from_wallet_id,
        to_wallet_id,
        amount,
        status: TransferStatus::Pending,
        created_at: now_str(),
        confirmed_at: None,
        rejected_at: None,
    };
    store::insert_transfer(&tx, &transfer)?;

    store::append_entry(
        &tx,
        from_wallet_id,
        amount,
        EntryType::TransferDebit,
        Some(&transfer.end_to_end_id),
        Some(&format!("Pix transfer to {pix_key_value}")),
    )?;

    store::save_idempotency_key(
        &tx,
        IDEMPOTENCY_SCOPE,
        idempotency_key,
        &transfer.end_to_end_id,
    )?;

    tx.commit()?;
    Ok(transfer)
}

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    match m.subcommand() {
        Some(("send", sub)) => {
            let from: i64 = *sub.get_one::<i64>("from").unwrap();
            let key = sub.get_one::<String>("key").unwrap().trim();
            let amount = parse_money(sub.get_one::<String>("amount").unwrap())?;
            let idem_key = sub.get_one::<String>("idempotency-key").unwrap().trim();
            let transfer = transfer_pix(conn, from, key, amount, idem_key)?;
            println!(
                "Transfer {} created: {} from wallet {} to wallet {} ({})",
                transfer.end_to_end_id,
                transfer.amount,
                transfer.from_wallet_id,
                transfer.to_wallet_id,
                transfer.status.as_str()
            );
        }
        Some(("show", sub)) => {
            let e2e = sub.get_one::<String>("end-to-end-id").unwrap().trim();
            let transfer = store::transfer_by_id(conn, e2e)?
                .ok_or_else(|| PixError::TransferNotFound(e2e.to_string()))?;
            println!("{}", serde_json::to_string_pretty(&transfer)?);
        }
        _ => {}
    }
    Ok(())
}
