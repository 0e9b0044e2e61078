// Copyright (c) 2025 Pocketledger.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::Result;
use crate::models::{FlowType, Transaction};
use crate::utils::col_decimal;
use rusqlite::{Connection, OptionalExtension, params};
use rust_decimal::Decimal;

/// `initial + Σ income − Σ expense`. The one balance formula; everything
/// else (the cached column, the reports) derives from it.
pub fn compute(initial_balance: Decimal, transactions: &[Transaction]) -> Decimal {
    let mut balance = initial_balance;
    for t in transactions {
        match t.r#type {
            FlowType::Income => balance += t.amount,
            FlowType::Expense => balance -= t.amount,
        }
    }
    balance
}

/// Derives the account balance from persisted rows. Zero for an unknown
/// account.
pub fn balance_of(conn: &Connection, account_id: &str) -> Result<Decimal> {
    let initial: Option<Decimal> = conn
        .query_row(
            "SELECT initial_balance FROM accounts WHERE id=?1",
            params![account_id],
            |r| col_decimal(r, 0),
        )
        .optional()?;
    let Some(initial) = initial else {
        return Ok(Decimal::ZERO);
    };

    let mut stmt =
        conn.prepare("SELECT amount, type FROM transactions WHERE account_id=?1")?;
    let mut rows = stmt.query(params![account_id])?;
    let mut balance = initial;
    while let Some(r) = rows.next()? {
        let amount = col_decimal(r, 0)?;
        let r#type: FlowType = r.get(1)?;
        match r#type {
            FlowType::Income => balance += amount,
            FlowType::Expense => balance -= amount,
        }
    }
    Ok(balance)
}

/// Rewrites the cached `current_balance` column from the formula. Called by
/// the transaction service after every mutation that can move a balance.
pub fn refresh_cached(conn: &Connection, account_id: &str) -> Result<()> {
    let balance = balance_of(conn, account_id)?;
    conn.execute(
        "UPDATE accounts SET current_balance=?2 WHERE id=?1",
        params![account_id, balance.to_string()],
    )?;
    Ok(())
}
