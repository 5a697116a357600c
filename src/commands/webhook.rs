// Copyright (c) 2025 Pixwallet contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::Result;
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::error::PixError;
use crate::models::{EntryType, PixTransfer, TransferStatus};
use crate::store;
use crate::utils::now_str;

/// Outcome of applying one external settlement event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    /// The transfer transitioned and funds moved.
    Applied,
    /// This eventId was already processed; nothing happened.
    Duplicate,
    /// The transfer is already terminal; the event is tolerated and
    /// recorded, but no funds move.
    Stale,
}

/// Applies an external CONFIRMED/REJECTED event to a pending transfer.
/// Replays of the same eventId and stale events against an already
/// settled transfer are successful no-ops; an unrecognized event type
/// is an error, raised only after the dedupe and lookup steps so a
/// malformed event is never silently marked processed.
pub fn settle(
    conn: &mut Connection,
    event_id: &str,
    end_to_end_id: &str,
    event_type: &str,
) -> Result<Settlement, PixError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    if store::event_already_processed(&tx, event_id)? {
        return Ok(Settlement::Duplicate);
    }

    let mut transfer = store::transfer_for_update(&tx, end_to_end_id)?
        .ok_or_else(|| PixError::TransferNotFound(end_to_end_id.to_string()))?;

    let outcome = match event_type {
        "CONFIRMED" => process_confirmation(&tx, &mut transfer)?,
        "REJECTED" => process_rejection(&tx, &mut transfer)?,
        other => return Err(PixError::UnknownEventType(other.to_string())),
    };

    // Recorded for stale events too: the delivery itself has now been
    // handled and must not be replayed.
    store::save_event(&tx, event_id, end_to_end_id, event_type)?;
    tx.commit()?;
    Ok(outcome)
}

fn process_confirmation(
    tx: &Transaction,
    transfer: &mut PixTransfer,
) -> Result<Settlement, PixError> {
    if !transfer.status.can_transition_to(TransferStatus::Confirmed) {
        eprintln!(
            "Transfer {} is already {}, ignoring CONFIRMED event",
            transfer.end_to_end_id,
            transfer.status.as_str()
        );
        return Ok(Settlement::Stale);
    }

    transfer.confirm(&now_str())?;
    store::save_transfer_status(tx, transfer)?;

    let mut destination = store::wallet_for_update(tx, transfer.to_wallet_id)?
        .ok_or(PixError::WalletNotFound(transfer.to_wallet_id))?;
    destination.deposit(transfer.amount)?;
    store::save_wallet(tx, &mut destination)?;

    store::append_entry(
        tx,
        transfer.to_wallet_id,
        transfer.amount,
        EntryType::TransferCredit,
        Some(&transfer.end_to_end_id),
        Some(&format!(
            "Pix transfer confirmed from wallet {}",
            transfer.from_wallet_id
        )),
    )?;
    Ok(Settlement::Applied)
}

fn process_rejection(
    tx: &Transaction,
    transfer: &mut PixTransfer,
) -> Result<Settlement, PixError> {
    if !transfer.status.can_transition_to(TransferStatus::Rejected) {
        eprintln!(
            "Transfer {} is already {}, ignoring REJECTED event",
            transfer.end_to_end_id,
            transfer.status.as_str()
        );
        return Ok(Settlement::Stale);
    }

    transfer.reject(&now_str())?;
    store::save_transfer_status(tx, transfer)?;

    // Refund as a fresh deposit entry; the original debit entry stays
    // untouched in the ledger.
    let mut source = store::wallet_for_update(tx, transfer.from_wallet_id)?
        .ok_or(PixError::WalletNotFound(transfer.from_wallet_id))?;
    source.deposit(transfer.amount)?;
    store::save_wallet(tx, &mut source)?;

    store::append_entry(
        tx,
        transfer.from_wallet_id,
        transfer.amount,
        EntryType::Deposit,
        Some(&transfer.end_to_end_id),
        Some("Pix transfer rejected - refund"),
    )?;
    Ok(Settlement::Applied)
}

pub fn handle(conn: &mut Connection, m: &clap::ArgMatches) -> Result<()> {
    if let Some(("settle", sub)) = m.subcommand() {
        let event_id = sub.get_one::<String>("event-id").unwrap().trim();
        let e2e = sub.get_one::<String>("end-to-end-id").unwrap().trim();
        let event_type = sub.get_one::<String>("type").unwrap().trim();
        match settle(conn, event_id, e2e, event_type)? {
            Settlement::Applied => {
                println!("Event {} applied to transfer {}", event_id, e2e)
            }
            Settlement::Duplicate => {
                println!("Event {} already processed, skipping", event_id)
            }
            Settlement::Stale => {
                println!("Event {} ignored: transfer {} already settled", event_id, e2e)
            }
        }
    }
    Ok(())
}
