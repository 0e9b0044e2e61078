// Copyright (c) 2025 Pocketledger.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::{Error, Result};
use crate::models::{Category, FlowType, QueueOperation, QueueTable};
use crate::remote::CategoryRow;
use crate::services::transactions;
use crate::sync::{self, Enqueue};
use crate::utils::{new_id, now};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::HashMap;

const DEFAULT_ICON: &str = "tag";

/// Seed catalog. The two system rows cannot be user-deleted.
pub const DEFAULT_CATEGORIES: &[(&str, FlowType, &str, bool)] = &[
    ("Uncategorized", FlowType::Expense, "help-circle", true),
    ("Lost/Unknown", FlowType::Expense, "alert-circle", true),
    ("Groceries", FlowType::Expense, "shopping-cart", false),
    ("Dining", FlowType::Expense, "utensils", false),
    ("Transport", FlowType::Expense, "car", false),
    ("Utilities", FlowType::Expense, "zap", false),
    ("Salary", FlowType::Income, "briefcase", false),
    ("Freelance", FlowType::Income, "laptop", false),
    ("Other Income", FlowType::Income, "dollar-sign", false),
];

const COLS: &str = "id, user_id, name, type, icon, is_system, remote_id, created_at, updated_at";

#[derive(Debug, Clone)]
pub struct NewCategory {
    pub name: String,
    pub r#type: FlowType,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub r#type: Option<FlowType>,
    pub icon: Option<String>,
}

fn from_row(r: &Row<'_>) -> rusqlite::Result<Category> {
    Ok(Category {
        id: r.get(0)?,
        user_id: r.get(1)?,
        name: r.get(2)?,
        r#type: r.get(3)?,
        icon: r.get(4)?,
        is_system: r.get(5)?,
        remote_id: r.get(6)?,
        created_at: r.get(7)?,
        updated_at: r.get(8)?,
    })
}

pub fn list(conn: &Connection, user_id: &str) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COLS} FROM categories WHERE user_id=?1 ORDER BY name"
    ))?;
    let rows = stmt.query_map(params![user_id], from_row)?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn get(conn: &Connection, id: &str) -> Result<Option<Category>> {
    let category = conn
        .query_row(
            &format!("SELECT {COLS} FROM categories WHERE id=?1"),
            params![id],
            from_row,
        )
        .optional()?;
    Ok(category)
}

fn insert_row(conn: &Connection, category: &Category) -> Result<()> {
    conn.execute(
        "INSERT INTO categories(id, user_id, name, type, icon, is_system, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            category.id,
            category.user_id,
            category.name,
            category.r#type,
            category.icon,
            category.is_system,
            category.created_at,
            category.updated_at,
        ],
    )?;
    sync::enqueue(
        conn,
        Enqueue {
            table: QueueTable::Categories,
            operation: QueueOperation::Insert,
            record_id: category.id.clone(),
            remote_id: None,
            payload: Some(serde_json::to_string(&CategoryRow::from(category))?),
        },
    )?;
    Ok(())
}

pub fn create(conn: &Connection, user_id: &str, input: NewCategory) -> Result<Category> {
    if input.name.trim().is_empty() {
        return Err(Error::validation("category name must not be empty"));
    }
    let ts = now();
    let category = Category {
        id: new_id(),
        user_id: user_id.to_string(),
        name: input.name,
        r#type: input.r#type,
        icon: input.icon.unwrap_or_else(|| DEFAULT_ICON.to_string()),
        is_system: false,
        remote_id: None,
        created_at: ts.clone(),
        updated_at: ts,
    };
    insert_row(conn, &category)?;
    Ok(category)
}

pub fn update(conn: &Connection, id: &str, patch: CategoryPatch) -> Result<()> {
    let Some(existing) = get(conn, id)? else {
        return Ok(());
    };
    if let Some(name) = &patch.name {
        if name.trim().is_empty() {
            return Err(Error::validation("category name must not be empty"));
        }
    }
    let merged = Category {
        name: patch.name.unwrap_or(existing.name),
        r#type: patch.r#type.unwrap_or(existing.r#type),
        icon: patch.icon.unwrap_or(existing.icon),
        updated_at: now(),
        ..existing
    };
    conn.execute(
        "UPDATE categories SET name=?2, type=?3, icon=?4, updated_at=?5 WHERE id=?1",
        params![merged.id, merged.name, merged.r#type, merged.icon, merged.updated_at],
    )?;
    sync::enqueue(
        conn,
        Enqueue {
            table: QueueTable::Categories,
            operation: QueueOperation::Update,
            record_id: merged.id.clone(),
            remote_id: merged.remote_id.clone(),
            payload: Some(serde_json::to_string(&CategoryRow::from(&merged))?),
        },
    )?;
    Ok(())
}

pub fn delete(conn: &Connection, id: &str) -> Result<()> {
    let Some(existing) = get(conn, id)? else {
        return Ok(());
    };
    if existing.is_system {
        return Err(Error::validation("system categories cannot be deleted"));
    }
    delete_row(conn, &existing)
}

fn delete_row(conn: &Connection, existing: &Category) -> Result<()> {
    conn.execute("DELETE FROM categories WHERE id=?1", params![existing.id])?;
    sync::enqueue(
        conn,
        Enqueue {
            table: QueueTable::Categories,
            operation: QueueOperation::Delete,
            record_id: existing.id.clone(),
            remote_id: existing.remote_id.clone(),
            payload: None,
        },
    )?;
    Ok(())
}

/// Inserts the default catalog for (name, type) pairs the owner does not
/// already have. Idempotent; safe on every app start. Run
/// `cleanup_duplicates` first so seeding never resurrects a removed row.
pub fn seed_defaults(conn: &Connection, user_id: &str) -> Result<Vec<Category>> {
    for (name, r#type, icon, is_system) in DEFAULT_CATEGORIES {
        let exists: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE user_id=?1 AND name=?2 AND type=?3)",
            params![user_id, name, r#type],
            |r| r.get(0),
        )?;
        if exists {
            continue;
        }
        let ts = now();
        let category = Category {
            id: new_id(),
            user_id: user_id.to_string(),
            name: (*name).to_string(),
            r#type: *r#type,
            icon: (*icon).to_string(),
            is_system: *is_system,
            remote_id: None,
            created_at: ts.clone(),
            updated_at: ts,
        };
        insert_row(conn, &category)?;
    }
    list(conn, user_id)
}

/// Collapses duplicate (name, type) groups: keeps the earliest-created row,
/// repoints transactions from each duplicate to the kept row, deletes the
/// duplicate. Returns the number of duplicates removed.
pub fn cleanup_duplicates(conn: &Connection, user_id: &str) -> Result<u32> {
    let all: Vec<Category> = {
        let mut stmt = conn.prepare(&format!(
            "SELECT {COLS} FROM categories WHERE user_id=?1 ORDER BY created_at ASC, rowid ASC"
        ))?;
        let rows = stmt.query_map(params![user_id], from_row)?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        out
    };

    let mut kept: HashMap<(String, FlowType), String> = HashMap::new();
    let mut removed = 0u32;
    for category in all {
        let key = (category.name.clone(), category.r#type);
        match kept.get(&key) {
            None => {
                kept.insert(key, category.id.clone());
            }
            Some(keep_id) => {
                reassign_transactions(conn, &category.id, keep_id)?;
                delete_row(conn, &category)?;
                removed += 1;
            }
        }
    }
    Ok(removed)
}

fn reassign_transactions(conn: &Connection, from_category: &str, to_category: &str) -> Result<()> {
    let ids: Vec<String> = {
        let mut stmt = conn.prepare("SELECT id FROM transactions WHERE category_id=?1")?;
        let rows = stmt.query_map(params![from_category], |r| r.get(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        out
    };
    // Goes through the transaction service so the repoint is queued for
    // remote replay like any other mutation.
    for id in ids {
        transactions::update(
            conn,
            &id,
            transactions::TransactionPatch {
                category_id: Some(Some(to_category.to_string())),
                ..Default::default()
            },
        )?;
    }
    Ok(())
}
