// Copyright (c) 2025 Pocketledger.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{Error, Result};
use crate::models::{FlowType, QueueOperation, QueueTable, SyncStatus, Transaction};
use crate::remote::TransactionRow;
use crate::services::balance;
use crate::sync::{self, Enqueue};
use crate::utils::{col_decimal, new_id, now};
use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;

const COLS: &str =
    "id, account_id, category_id, amount, type, description, date, sync_status, remote_id, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub amount: Decimal,
    pub r#type: FlowType,
    pub category_id: Option<String>,
    pub description: Option<String>,
    pub date: NaiveDate,
}

/// Nullable fields use a double Option: outer None leaves the field alone,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct TransactionPatch {
    pub account_id: Option<String>,
    pub amount: Option<Decimal>,
    pub r#type: Option<FlowType>,
    pub category_id: Option<Option<String>>,
    pub description: Option<Option<String>>,
    pub date: Option<NaiveDate>,
}

fn from_row(r: &Row<'_>) -> rusqlite::Result<Transaction> {
    Ok(Transaction {
        id: r.get(0)?,
        account_id: r.get(1)?,
        category_id: r.get(2)?,
        amount: col_decimal(r, 3)?,
        r#type: r.get(4)?,
        description: r.get(5)?,
        date: r.get(6)?,
        sync_status: r.get(7)?,
        remote_id: r.get(8)?,
        created_at: r.get(9)?,
        updated_at: r.get(10)?,
    })
}

pub fn list(conn: &Connection, account_id: &str) -> Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLS} FROM transactions WHERE account_id=?1 ORDER BY date DESC, created_at DESC"
    ))?;
    let rows = stmt.query_map(params![account_id], from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn get(conn: &Connection, id: &str) -> Result<Option<Transaction>> {
    let tx = conn
        .query_row(
            &format!("SELECT {COLS} FROM transactions WHERE id=?1"),
            params![id],
            from_row,
        )
        .optional()?;
    Ok(tx)
}

fn validate_amount(amount: Decimal) -> Result<()> {
    if amount <= Decimal::ZERO {
        return Err(Error::validation("amount must be positive"));
    }
    Ok(())
}

pub fn create(conn: &Connection, account_id: &str, input: NewTransaction) -> Result<Transaction> {
    validate_amount(input.amount)?;
    let ts = now();
    let tx = Transaction {
        id: new_id(),
        account_id: account_id.to_string(),
        category_id: input.category_id,
        amount: input.amount,
        r#type: input.r#type,
        description: input.description,
        date: input.date,
        sync_status: SyncStatus::Pending,
        remote_id: None,
        created_at: ts.clone(),
        updated_at: ts,
    };
    conn.execute(
        "INSERT INTO transactions(id, account_id, category_id, amount, type, description, date, sync_status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            tx.id,
            tx.account_id,
            tx.category_id,
            tx.amount.to_string(),
            tx.r#type,
            tx.description,
            tx.date,
            tx.sync_status,
            tx.created_at,
            tx.updated_at,
        ],
    )?;
    sync::enqueue(
        conn,
        Enqueue {
            table: QueueTable::Transactions,
            operation: QueueOperation::Insert,
            record_id: tx.id.clone(),
            remote_id: None,
            payload: Some(serde_json::to_string(&TransactionRow::from(&tx))?),
        },
    )?;
    balance::refresh_cached(conn, account_id)?;
    Ok(tx)
}

/// Merges the patch; no-op when the row is missing. The row goes back to
/// `pending` until the update replays remotely. Cached balances are
/// refreshed for every account the change touches.
pub fn update(conn: &Connection, id: &str, patch: TransactionPatch) -> Result<()> {
    let Some(existing) = get(conn, id)? else {
        return Ok(());
    };
    if let Some(amount) = patch.amount {
        validate_amount(amount)?;
    }
    let previous_account = existing.account_id.clone();
    let merged = Transaction {
        account_id: patch.account_id.unwrap_or(existing.account_id),
        amount: patch.amount.unwrap_or(existing.amount),
        r#type: patch.r#type.unwrap_or(existing.r#type),
        category_id: patch.category_id.unwrap_or(existing.category_id),
        description: patch.description.unwrap_or(existing.description),
        date: patch.date.unwrap_or(existing.date),
        sync_status: SyncStatus::Pending,
        updated_at: now(),
        ..existing
    };
    conn.execute(
        "UPDATE transactions SET account_id=?2, category_id=?3, amount=?4, type=?5, description=?6, date=?7, sync_status=?8, updated_at=?9
         WHERE id=?1",
        params![
            merged.id,
            merged.account_id,
            merged.category_id,
            merged.amount.to_string(),
            merged.r#type,
            merged.description,
            merged.date,
            merged.sync_status,
            merged.updated_at,
        ],
    )?;
    sync::enqueue(
        conn,
        Enqueue {
            table: QueueTable::Transactions,
            operation: QueueOperation::Update,
            record_id: merged.id.clone(),
            remote_id: merged.remote_id.clone(),
            payload: Some(serde_json::to_string(&TransactionRow::from(&merged))?),
        },
    )?;
    balance::refresh_cached(conn, &merged.account_id)?;
    if previous_account != merged.account_id {
        balance::refresh_cached(conn, &previous_account)?;
    }
    Ok(())
}

pub fn delete(conn: &Connection, id: &str) -> Result<()> {
    let Some(existing) = get(conn, id)? else {
        return Ok(());
    };
    conn.execute("DELETE FROM transactions WHERE id=?1", params![id])?;
    sync::enqueue(
        conn,
        Enqueue {
            table: QueueTable::Transactions,
            operation: QueueOperation::Delete,
            record_id: existing.id,
            remote_id: existing.remote_id,
            payload: None,
        },
    )?;
    balance::refresh_cached(conn, &existing.account_id)?;
    Ok(())
}
