// Copyright (c) 2025 Pocketledger.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

#![allow(dead_code)]

use pocketledger::error::{Error, Result};
use pocketledger::remote::{AccountRow, CategoryRow, RemoteBackend, TransactionRow};
use pocketledger::db;
use rusqlite::Connection;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

pub fn mem_conn() -> Connection {
    let mut conn = Connection::open_in_memory().unwrap();
    db::init_schema(&mut conn).unwrap();
    conn
}

/// Remote stub: records every call, assigns sequential remote ids, and can
/// be told to fail calls for specific local record ids.
#[derive(Default)]
pub struct StubBackend {
    next_id: AtomicU64,
    /// Call log, e.g. "insert_transaction:t1" or "delete_account:r-1".
    pub calls: Mutex<Vec<String>>,
    /// How many times each call key was sent.
    pub sent: Mutex<HashMap<String, u32>>,
    /// Local record ids whose inserts/updates/deletes should fail.
    pub fail_ids: Mutex<HashSet<String>>,
    /// Artificial latency per call, to widen drain overlap windows.
    pub delay: Option<Duration>,
}

impl StubBackend {
    pub fn new() -> Self {
        StubBackend::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        StubBackend {
            delay: Some(delay),
            ..StubBackend::default()
        }
    }

    pub fn fail_for(&self, id: &str) {
        self.fail_ids.lock().unwrap().insert(id.to_string());
    }

    pub fn clear_failures(&self) {
        self.fail_ids.lock().unwrap().clear();
    }

    pub fn call_count(&self, key: &str) -> u32 {
        self.sent.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, op: &str, id: &str) -> Result<()> {
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        let key = format!("{op}:{id}");
        self.calls.lock().unwrap().push(key.clone());
        *self.sent.lock().unwrap().entry(key).or_insert(0) += 1;
        if self.fail_ids.lock().unwrap().contains(id) {
            return Err(Error::RemoteRequestFailed(format!(
                "stub failure for {id}"
            )));
        }
        Ok(())
    }

    fn assign_id(&self) -> String {
        format!("r-{}", self.next_id.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

impl RemoteBackend for StubBackend {
    fn list_accounts(&self, _user_id: &str) -> Result<Vec<AccountRow>> {
        Ok(Vec::new())
    }

    fn insert_account(&self, row: &AccountRow) -> Result<String> {
        self.record("insert_account", &row.id)?;
        Ok(self.assign_id())
    }

    fn update_account(&self, id: &str, _row: &AccountRow) -> Result<()> {
        self.record("update_account", id)
    }

    fn delete_account(&self, id: &str) -> Result<()> {
        self.record("delete_account", id)
    }

    fn list_categories(&self, _user_id: &str) -> Result<Vec<CategoryRow>> {
        Ok(Vec::new())
    }

    fn insert_category(&self, row: &CategoryRow) -> Result<String> {
        self.record("insert_category", &row.id)?;
        Ok(self.assign_id())
    }

    fn insert_categories(&self, rows: &[CategoryRow]) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for row in rows {
            self.record("insert_category", &row.id)?;
            ids.push(self.assign_id());
        }
        Ok(ids)
    }

    fn update_category(&self, id: &str, _row: &CategoryRow) -> Result<()> {
        self.record("update_category", id)
    }

    fn delete_category(&self, id: &str) -> Result<()> {
        self.record("delete_category", id)
    }

    fn list_transactions(&self, _account_id: &str) -> Result<Vec<TransactionRow>> {
        Ok(Vec::new())
    }

    fn insert_transaction(&self, row: &TransactionRow) -> Result<String> {
        self.record("insert_transaction", &row.id)?;
        Ok(self.assign_id())
    }

    fn update_transaction(&self, id: &str, _row: &TransactionRow) -> Result<()> {
        self.record("update_transaction", id)
    }

    fn delete_transaction(&self, id: &str) -> Result<()> {
        self.record("delete_transaction", id)
    }
}
