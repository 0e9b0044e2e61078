// Copyright (c) 2025 Pocketledger.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use crate::error::Result;
use directories::ProjectDirs;
use once_cell::sync::Lazy;
use rusqlite::{Connection, OptionalExtension, params};
use std::fs;
use std::path::PathBuf;

static APP: Lazy<(&str, &str, &str)> =
    Lazy::new(|| ("io.pocketledger", "Pocketledger", "pocketledger"));

pub fn db_path() -> anyhow::Result<PathBuf> {
    let proj = ProjectDirs::from(APP.0, APP.1, APP.2)
        .ok_or_else(|| anyhow::anyhow!("Could not determine platform-specific data dir"))?;
    let data_dir = proj.data_dir();
    fs::create_dir_all(data_dir)?;
    Ok(data_dir.join("pocketledger.sqlite"))
}

/// Opens (creating on demand) the on-device database and applies the schema.
/// Any failure here surfaces as `Error::StorageUnavailable` to callers that
/// go through the crate `Result`.
pub fn open_or_init() -> anyhow::Result<Connection> {
    let path = db_path()?;
    let mut conn = Connection::open(&path)?;
    init_schema(&mut conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS metadata(
        key TEXT PRIMARY KEY,
        value TEXT NOT NULL
    );

    CREATE TABLE IF NOT EXISTS accounts(
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        name TEXT NOT NULL,
        type TEXT NOT NULL CHECK(type IN ('personal','business')),
        initial_balance TEXT NOT NULL,
        current_balance TEXT NOT NULL,
        color TEXT NOT NULL,
        icon TEXT NOT NULL,
        remote_id TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_accounts_user ON accounts(user_id);

    CREATE TABLE IF NOT EXISTS categories(
        id TEXT PRIMARY KEY,
        user_id TEXT NOT NULL,
        name TEXT NOT NULL,
        type TEXT NOT NULL CHECK(type IN ('income','expense')),
        icon TEXT NOT NULL,
        is_system INTEGER NOT NULL DEFAULT 0,
        remote_id TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_categories_user ON categories(user_id);

    -- No foreign key on account_id: deleting an account must not cascade
    -- local transaction deletes that the remote was never told about.
    CREATE TABLE IF NOT EXISTS transactions(
        id TEXT PRIMARY KEY,
        account_id TEXT NOT NULL,
        category_id TEXT,
        amount TEXT NOT NULL,
        type TEXT NOT NULL CHECK(type IN ('income','expense')),
        description TEXT,
        date TEXT NOT NULL,
        sync_status TEXT NOT NULL DEFAULT 'pending',
        remote_id TEXT,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_transactions_account ON transactions(account_id);
    CREATE INDEX IF NOT EXISTS idx_transactions_date ON transactions(date);

    -- The integer rowid doubles as creation order for the drain.
    CREATE TABLE IF NOT EXISTS sync_queue(
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        table_name TEXT NOT NULL CHECK(table_name IN ('accounts','categories','transactions')),
        operation TEXT NOT NULL CHECK(operation IN ('insert','update','delete')),
        record_id TEXT NOT NULL,
        remote_id TEXT,
        payload TEXT,
        status TEXT NOT NULL DEFAULT 'pending' CHECK(status IN ('pending','failed')),
        last_error TEXT,
        created_at TEXT NOT NULL
    );
    CREATE INDEX IF NOT EXISTS idx_sync_queue_status ON sync_queue(status);
    CREATE INDEX IF NOT EXISTS idx_sync_queue_record ON sync_queue(record_id);
    "#,
    )?;
    Ok(())
}

pub fn get_metadata(conn: &Connection, key: &str) -> Result<Option<String>> {
    let v: Option<String> = conn
        .query_row("SELECT value FROM metadata WHERE key=?1", params![key], |r| {
            r.get(0)
        })
        .optional()?;
    Ok(v)
}

pub fn set_metadata(conn: &Connection, key: &str, value: &str) -> Result<()> {
    conn.execute(
        "INSERT INTO metadata(key, value) VALUES(?1, ?2)
         ON CONFLICT(key) DO UPDATE SET value=excluded.value",
        params![key, value],
    )?;
    Ok(())
}

const GUEST_USER_KEY: &str = "guest_user_id";

/// Stable per-device identifier used when no remote session exists.
/// Generated once and persisted in the metadata table.
pub fn guest_user_id(conn: &Connection) -> Result<String> {
    if let Some(id) = get_metadata(conn, GUEST_USER_KEY)? {
        return Ok(id);
    }
    let id = uuid::Uuid::new_v4().to_string();
    set_metadata(conn, GUEST_USER_KEY, &id)?;
    Ok(id)
}
