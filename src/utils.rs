// Copyright (c) 2025 Pixwallet contributors.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use anyhow::{Context, Result};
use chrono::{NaiveDateTime, Utc};
use comfy_table::{presets::UTF8_FULL, Cell, Table};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::PixError;
use crate::money::Money;

/// Fixed-width UTC timestamp; lexicographic order on the stored TEXT
/// equals chronological order.
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

pub fn now_str() -> String {
    Utc::now().naive_utc().format(TS_FORMAT).to_string()
}

pub fn format_ts(ts: NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

pub fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    for fmt in [TS_FORMAT, "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ts);
        }
    }
    // A bare date means midnight at the start of that day.
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map(|d| d.and_hms_opt(0, 0, 0).unwrap())
        .with_context(|| format!("Invalid timestamp '{}', expected YYYY-MM-DD[ HH:MM:SS]", s))
}

pub fn parse_money(s: &str) -> Result<Money, PixError> {
    let d = s
        .trim()
        .parse::<Decimal>()
        .map_err(|_| PixError::InvalidAmount(format!("invalid decimal '{}'", s)))?;
    Ok(Money::of(d))
}

/// Globally unique transfer reference: "E" + 32 hex characters.
pub fn end_to_end_id() -> String {
    format!("E{}", Uuid::new_v4().simple())
}

pub fn pretty_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut t = Table::new();
    t.load_preset(UTF8_FULL);
    t.set_header(headers.iter().map(|h| Cell::new(*h)));
    for r in rows {
        t.add_row(r.into_iter().map(Cell::new));
    }
    t
}

pub fn maybe_print_json<T: serde::Serialize>(
    json_flag: bool,
    jsonl_flag: bool,
    v: &T,
) -> Result<bool> {
    if json_flag {
        println!("{}", serde_json::to_string_pretty(v)?);
        return Ok(true);
    }
    if jsonl_flag {
        // If v is an array, stream each element; else stream single line
        let val = serde_json::to_value(v)?;
        if let Some(arr) = val.as_array() {
            for item in arr {
                println!("{}", serde_json::to_string(item)?);
            }
        } else {
            println!("{}", serde_json::to_string(&val)?);
        }
        return Ok(true);
    }
    Ok(false)
}
