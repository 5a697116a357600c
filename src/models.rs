// Copyright (c) 2025 Pixwallet contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PixError;
use crate::money::Money;

/// A user's wallet. `balance` is a cached projection of the ledger;
/// `version` increments on every persisted mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wallet {
    pub id: i64,
    pub user_id: String,
    pub balance: Money,
    pub version: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl Wallet {
    pub fn deposit(&mut self, amount: Money) -> Result<(), PixError> {
        if amount.is_negative() || amount.is_zero() {
            return Err(PixError::InvalidAmount(format!(
                "deposit must be positive, got {amount}"
            )));
        }
        self.balance = self.balance.add(amount);
        Ok(())
    }

    pub fn withdraw(&mut self, amount: Money) -> Result<(), PixError> {
        if amount.is_negative() || amount.is_zero() {
            return Err(PixError::InvalidAmount(format!(
                "withdraw must be positive, got {amount}"
            )));
        }
        if self.balance < amount {
            return Err(PixError::InsufficientBalance {
                balance: self.balance,
                requested: amount,
            });
        }
        self.balance = self.balance.subtract(amount);
        Ok(())
    }

    pub fn has_sufficient_balance(&self, amount: Money) -> bool {
        self.balance >= amount
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryType {
    Deposit,
    Withdraw,
    TransferDebit,
    TransferCredit,
}

impl EntryType {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryType::Deposit => "DEPOSIT",
            EntryType::Withdraw => "WITHDRAW",
            EntryType::TransferDebit => "TRANSFER_DEBIT",
            EntryType::TransferCredit => "TRANSFER_CREDIT",
        }
    }

    pub fn parse(s: &str) -> Option<EntryType> {
        match s {
            "DEPOSIT" => Some(EntryType::Deposit),
            "WITHDRAW" => Some(EntryType::Withdraw),
            "TRANSFER_DEBIT" => Some(EntryType::TransferDebit),
            "TRANSFER_CREDIT" => Some(EntryType::TransferCredit),
            _ => None,
        }
    }
}

/// One immutable balance-affecting event. Never updated or deleted;
/// `amount` is stored positive and signed on read.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub wallet_id: i64,
    pub amount: Money,
    pub entry_type: EntryType,
    pub end_to_end_id: Option<String>,
    pub metadata: Option<String>,
    pub created_at: String,
}

impl LedgerEntry {
    /// Credits positive, debits negative. The sum of these over a
    /// wallet's entries equals the wallet's balance.
    pub fn signed_amount(&self) -> Money {
        match self.entry_type {
            EntryType::Deposit | EntryType::TransferCredit => self.amount,
            EntryType::Withdraw | EntryType::TransferDebit => -self.amount,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyType {
    Cpf,
    Email,
    Phone,
    Evp,
}

impl KeyType {
    pub fn as_str(self) -> &'static str {
        match self {
            KeyType::Cpf => "CPF",
            KeyType::Email => "EMAIL",
            KeyType::Phone => "PHONE",
            KeyType::Evp => "EVP",
        }
    }

    pub fn parse(s: &str) -> Result<KeyType, PixError> {
        match s.to_uppercase().as_str() {
            "CPF" => Ok(KeyType::Cpf),
            "EMAIL" => Ok(KeyType::Email),
            "PHONE" => Ok(KeyType::Phone),
            "EVP" => Ok(KeyType::Evp),
            other => Err(PixError::UnknownKeyType(other.to_string())),
        }
    }
}

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9+_.-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap());

/// A routing alias for a wallet. `key_value` is globally unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PixKey {
    pub id: i64,
    pub wallet_id: i64,
    pub key_type: KeyType,
    pub key_value: String,
    pub created_at: String,
}

impl PixKey {
    pub fn validate(&self) -> Result<(), PixError> {
        if self.key_value.trim().is_empty() {
            return Err(PixError::InvalidPixKey(
                "key value must not be blank".to_string(),
            ));
        }
        let digits = self.key_value.chars().filter(|c| c.is_ascii_digit()).count();
        match self.key_type {
            KeyType::Cpf => {
                if digits != 11 {
                    return Err(PixError::InvalidPixKey(format!(
                        "CPF must have 11 digits: {}",
                        self.key_value
                    )));
                }
            }
            KeyType::Email => {
                if !EMAIL_RE.is_match(&self.key_value) {
                    return Err(PixError::InvalidPixKey(format!(
                        "invalid email: {}",
                        self.key_value
                    )));
                }
            }
            KeyType::Phone => {
                if !(10..=11).contains(&digits) {
                    return Err(PixError::InvalidPixKey(format!(
                        "phone must have 10 or 11 digits: {}",
                        self.key_value
                    )));
                }
            }
            KeyType::Evp => {
                // Length of a canonical UUID string; the structure is
                // deliberately not parsed further.
                if self.key_value.chars().count() != 36 {
                    return Err(PixError::InvalidPixKey(format!(
                        "EVP key must be 36 characters: {}",
                        self.key_value
                    )));
                }
            }
        }
        Ok(())
    }
}

/// PENDING is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransferStatus {
    Pending,
    Confirmed,
    Rejected,
}

impl TransferStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TransferStatus::Pending => "PENDING",
            TransferStatus::Confirmed => "CONFIRMED",
            TransferStatus::Rejected => "REJECTED",
        }
    }

    pub fn parse(s: &str) -> Option<TransferStatus> {
        match s {
            "PENDING" => Some(TransferStatus::Pending),
            "CONFIRMED" => Some(TransferStatus::Confirmed),
            "REJECTED" => Some(TransferStatus::Rejected),
            _ => None,
        }
    }

    pub fn can_transition_to(self, target: TransferStatus) -> bool {
        matches!(
            (self, target),
            (TransferStatus::Pending, TransferStatus::Confirmed)
                | (TransferStatus::Pending, TransferStatus::Rejected)
        )
    }
}

/// A Pix transfer, identified by its endToEndId. Debited from the
/// source at creation, settled later by an external confirmation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PixTransfer {
    pub end_to_end_id: String,
    pub from_wallet_id: i64,
    pub to_wallet_id: i64,
    pub amount: Money,
    pub status: TransferStatus,
    pub created_at: String,
    pub confirmed_at: Option<String>,
    pub rejected_at: Option<String>,
}

impl PixTransfer {
    pub fn confirm(&mut self, now: &str) -> Result<(), PixError> {
        if !self.status.can_transition_to(TransferStatus::Confirmed) {
            return Err(PixError::InvalidStateTransition {
                from: self.status,
                to: TransferStatus::Confirmed,
            });
        }
        self.status = TransferStatus::Confirmed;
        self.confirmed_at = Some(now.to_string());
        Ok(())
    }

    pub fn reject(&mut self, now: &str) -> Result<(), PixError> {
        if !self.status.can_transition_to(TransferStatus::Rejected) {
            return Err(PixError::InvalidStateTransition {
                from: self.status,
                to: TransferStatus::Rejected,
            });
        }
        self.status = TransferStatus::Rejected;
        self.rejected_at = Some(now.to_string());
        Ok(())
    }

    pub fn is_pending(&self) -> bool {
        self.status == TransferStatus::Pending
    }
}

/// Marker that an external settlement event has been durably applied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookEventRecord {
    pub event_id: String,
    pub end_to_end_id: String,
    pub event_type: String,
    pub processed_at: String,
}
