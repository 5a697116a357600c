// Copyright (c) 2025 Pixwallet contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::models::TransferStatus;
use crate::money::Money;
use thiserror::Error;

/// Everything the core can report upward. Nothing here is retried
/// internally; the caller decides whether to retry the whole unit.
#[derive(Debug, Error)]
pub enum PixError {
    #[error("invalid amount: {0}")]
    InvalidAmount(String),

    #[error("insufficient balance: have {balance}, need {requested}")]
    InsufficientBalance { balance: Money, requested: Money },

    #[error("wallet not found: {0}")]
    WalletNotFound(i64),

    #[error("transfer not found: {0}")]
    TransferNotFound(String),

    #[error("pix key not found: {0}")]
    KeyNotFound(String),

    #[error("invalid pix key: {0}")]
    InvalidPixKey(String),

    #[error("unknown pix key type: {0}")]
    UnknownKeyType(String),

    #[error("pix key already registered: {0}")]
    DuplicateKey(String),

    #[error("duplicate request for idempotency key: {0}")]
    DuplicateRequest(String),

    #[error("invalid transfer: {0}")]
    InvalidTransfer(String),

    #[error("invalid state transition: {from:?} -> {to:?}")]
    InvalidStateTransition { from: TransferStatus, to: TransferStatus },

    #[error("unknown webhook event type: {0}")]
    UnknownEventType(String),

    #[error("wallet {0} was modified concurrently")]
    StaleWallet(i64),

    #[error(transparent)]
    Db(#[from] rusqlite::Error),
}

/// SQLite reports a violated UNIQUE or CHECK constraint with this code;
/// the stores turn it into the domain duplicate errors.
pub fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(f, _)
            if f.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
