// Copyright (c) 2025 Pixwallet contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::Neg;

/// Monetary value with exactly 2 decimal places, rounded half-up on
/// every construction path. Single-currency system: no currency field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(Decimal);

impl Money {
    /// Every arithmetic result goes back through here, so no `Money`
    /// ever carries more than 2 decimal digits.
    pub fn of(amount: Decimal) -> Money {
        let mut d = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        d.rescale(2);
        Money(d)
    }

    pub fn zero() -> Money {
        Money::of(Decimal::ZERO)
    }

    pub fn add(self, other: Money) -> Money {
        Money::of(self.0 + other.0)
    }

    pub fn subtract(self, other: Money) -> Money {
        Money::of(self.0 - other.0)
    }

    pub fn is_zero(self) -> bool {
        self.0.is_zero()
    }

    pub fn is_positive(self) -> bool {
        self.0 > Decimal::ZERO
    }

    pub fn is_negative(self) -> bool {
        self.0 < Decimal::ZERO
    }

    pub fn amount(self) -> Decimal {
        self.0
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money::of(-self.0)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Canonical scale is 2, so Decimal's own Display prints "350.00".
        write!(f, "{}", self.0)
    }
}
