// Copyright (c) 2025 Pocketledger.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{Error, Result};
use crate::models::{Account, AccountType, QueueOperation, QueueTable};
use crate::remote::AccountRow;
use crate::sync::{self, Enqueue};
use crate::utils::{col_decimal, new_id, now};
use rusqlite::{Connection, OptionalExtension, Row, params};
use rust_decimal::Decimal;

const DEFAULT_COLOR: &str = "#6366f1";
const DEFAULT_ICON: &str = "wallet";

const COLS: &str =
    "id, user_id, name, type, initial_balance, current_balance, color, icon, remote_id, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub r#type: AccountType,
    pub initial_balance: Decimal,
    pub color: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub name: Option<String>,
    pub r#type: Option<AccountType>,
    pub initial_balance: Option<Decimal>,
    pub color: Option<String>,
    pub icon: Option<String>,
}

fn from_row(r: &Row<'_>) -> rusqlite::Result<Account> {
    Ok(Account {
        id: r.get(0)?,
        user_id: r.get(1)?,
        name: r.get(2)?,
        r#type: r.get(3)?,
        initial_balance: col_decimal(r, 4)?,
        current_balance: col_decimal(r, 5)?,
        color: r.get(6)?,
        icon: r.get(7)?,
        remote_id: r.get(8)?,
        created_at: r.get(9)?,
        updated_at: r.get(10)?,
    })
}

pub fn list(conn: &Connection, user_id: &str) -> Result<Vec<Account>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLS} FROM accounts WHERE user_id=?1 ORDER BY created_at"
    ))?;
    let rows = stmt.query_map(params![user_id], from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn get(conn: &Connection, id: &str) -> Result<Option<Account>> {
    let account = conn
        .query_row(
            &format!("SELECT {COLS} FROM accounts WHERE id=?1"),
            params![id],
            from_row,
        )
        .optional()?;
    Ok(account)
}

/// Writes the row locally, then appends an `insert` queue entry with the
/// full row as payload. The local write always commits first.
pub fn create(conn: &Connection, user_id: &str, input: NewAccount) -> Result<Account> {
    if input.name.trim().is_empty() {
        return Err(Error::validation("account name must not be empty"));
    }
    let ts = now();
    let account = Account {
        id: new_id(),
        user_id: user_id.to_string(),
        name: input.name,
        r#type: input.r#type,
        initial_balance: input.initial_balance,
        current_balance: input.initial_balance,
        color: input.color.unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        icon: input.icon.unwrap_or_else(|| DEFAULT_ICON.to_string()),
        remote_id: None,
        created_at: ts.clone(),
        updated_at: ts,
    };
    conn.execute(
        "INSERT INTO accounts(id, user_id, name, type, initial_balance, current_balance, color, icon, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            account.id,
            account.user_id,
            account.name,
            account.r#type,
            account.initial_balance.to_string(),
            account.current_balance.to_string(),
            account.color,
            account.icon,
            account.created_at,
            account.updated_at,
        ],
    )?;
    sync::enqueue(
        conn,
        Enqueue {
            table: QueueTable::Accounts,
            operation: QueueOperation::Insert,
            record_id: account.id.clone(),
            remote_id: None,
            payload: Some(serde_json::to_string(&AccountRow::from(&account))?),
        },
    )?;
    Ok(account)
}

/// Merges the patch into the existing row; no-op when the row is missing.
/// A changed initial balance shifts the cached current balance by the same
/// delta so the balance invariant keeps holding.
pub fn update(conn: &Connection, id: &str, patch: AccountPatch) -> Result<()> {
    let Some(existing) = get(conn, id)? else {
        return Ok(());
    };
    if let Some(name) = &patch.name {
        if name.trim().is_empty() {
            return Err(Error::validation("account name must not be empty"));
        }
    }
    let initial = patch.initial_balance.unwrap_or(existing.initial_balance);
    let current = existing.current_balance - existing.initial_balance + initial;
    let merged = Account {
        name: patch.name.unwrap_or(existing.name),
        r#type: patch.r#type.unwrap_or(existing.r#type),
        initial_balance: initial,
        current_balance: current,
        color: patch.color.unwrap_or(existing.color),
        icon: patch.icon.unwrap_or(existing.icon),
        updated_at: now(),
        ..existing
    };
    conn.execute(
        "UPDATE accounts SET name=?2, type=?3, initial_balance=?4, current_balance=?5, color=?6, icon=?7, updated_at=?8
         WHERE id=?1",
        params![
            merged.id,
            merged.name,
            merged.r#type,
            merged.initial_balance.to_string(),
            merged.current_balance.to_string(),
            merged.color,
            merged.icon,
            merged.updated_at,
        ],
    )?;
    sync::enqueue(
        conn,
        Enqueue {
            table: QueueTable::Accounts,
            operation: QueueOperation::Update,
            record_id: merged.id.clone(),
            remote_id: merged.remote_id.clone(),
            payload: Some(serde_json::to_string(&AccountRow::from(&merged))?),
        },
    )?;
    Ok(())
}

pub fn delete(conn: &Connection, id: &str) -> Result<()> {
    let Some(existing) = get(conn, id)? else {
        return Ok(());
    };
    conn.execute("DELETE FROM accounts WHERE id=?1", params![id])?;
    sync::enqueue(
        conn,
        Enqueue {
            table: QueueTable::Accounts,
            operation: QueueOperation::Delete,
            record_id: existing.id,
            remote_id: existing.remote_id,
            payload: None,
        },
    )?;
    Ok(())
}
