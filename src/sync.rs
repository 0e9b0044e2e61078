// Copyright (c) 2025 Pocketledger.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The write-ahead sync queue and its drain loop.
//!
//! Every local mutation appends one queue entry after its row write
//! commits. `SyncEngine::drain` replays entries against the remote in
//! creation order; a successful replay removes the entry, a failed one
//! stays behind as `failed` and is retried on the next drain.
//!
//! Identifier reconciliation: rows keep their locally-generated id as the
//! permanent primary key and gain a `remote_id` once their insert replays.
//! Local references never change. A later update/delete is keyed remotely
//! by the resolved remote id; when its insert has not landed yet, the entry
//! fails softly and waits for a drain in which it has.

use crate::connectivity::ConnectivityMonitor;
use crate::error::{Error, Result};
use crate::models::{QueueEntry, QueueOperation, QueueStatus, QueueTable};
use crate::remote::{AccountRow, CategoryRow, RemoteBackend, TransactionRow};
use crate::utils::now;
use log::{debug, info, warn};
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone)]
pub struct Enqueue {
    pub table: QueueTable,
    pub operation: QueueOperation,
    pub record_id: String,
    pub remote_id: Option<String>,
    pub payload: Option<String>,
}

/// Pure append: new entry, `pending`, stamped now. Fails only on storage
/// failure.
pub fn enqueue(conn: &Connection, item: Enqueue) -> Result<i64> {
    conn.execute(
        "INSERT INTO sync_queue(table_name, operation, record_id, remote_id, payload, status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, 'pending', ?6)",
        params![
            item.table,
            item.operation,
            item.record_id,
            item.remote_id,
            item.payload,
            now(),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn pending_count(conn: &Connection) -> Result<u32> {
    let n: u32 = conn.query_row(
        "SELECT COUNT(*) FROM sync_queue WHERE status='pending'",
        [],
        |r| r.get(0),
    )?;
    Ok(n)
}

pub fn queue_entries(conn: &Connection) -> Result<Vec<QueueEntry>> {
    let mut stmt = conn.prepare(
        "SELECT id, table_name, operation, record_id, remote_id, payload, status, last_error, created_at
         FROM sync_queue ORDER BY id",
    )?;
    let rows = stmt.query_map([], |r| {
        Ok(QueueEntry {
            id: r.get(0)?,
            table: r.get(1)?,
            operation: r.get(2)?,
            record_id: r.get(3)?,
            remote_id: r.get(4)?,
            payload: r.get(5)?,
            status: r.get(6)?,
            last_error: r.get(7)?,
            created_at: r.get(8)?,
        })
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub synced: u32,
    pub failed: u32,
}

pub struct SyncEngine {
    monitor: ConnectivityMonitor,
    backend: Option<Arc<dyn RemoteBackend>>,
    draining: AtomicBool,
}

// Clears the in-progress latch even when a drain bails out early.
struct DrainLatch<'a>(&'a AtomicBool);

impl Drop for DrainLatch<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl SyncEngine {
    pub fn new(monitor: ConnectivityMonitor, backend: Option<Arc<dyn RemoteBackend>>) -> Self {
        SyncEngine {
            monitor,
            backend,
            draining: AtomicBool::new(false),
        }
    }

    /// The configured remote backend, for direct (backend-only) reads.
    pub fn backend(&self) -> Result<&Arc<dyn RemoteBackend>> {
        self.backend.as_ref().ok_or(Error::NotConfigured)
    }

    /// Replays all pending and previously-failed queue entries against the
    /// remote, oldest first. No-op with zero counts while offline, without
    /// a configured backend, or while another drain is in progress. Remote
    /// failures never escape; each is recorded on its entry for the next
    /// drain.
    pub fn drain(&self, conn: &Connection) -> Result<DrainReport> {
        let Some(backend) = self.backend.as_deref() else {
            return Ok(DrainReport::default());
        };
        if !self.monitor.is_online() {
            return Ok(DrainReport::default());
        }
        if self
            .draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("drain already in progress, skipping");
            return Ok(DrainReport::default());
        }
        let _latch = DrainLatch(&self.draining);

        let entries = queue_entries(conn)?;
        // Remote ids resolved earlier in this batch, so an insert followed
        // by an update/delete of the same record drains in one pass.
        let mut resolved: HashMap<String, String> = HashMap::new();
        let mut report = DrainReport::default();
        for entry in entries {
            debug!(
                "replaying queue entry {} ({} {})",
                entry.id,
                entry.operation.as_str(),
                entry.table.as_str()
            );
            match self.replay(conn, backend, &entry, &mut resolved) {
                Ok(()) => {
                    conn.execute("DELETE FROM sync_queue WHERE id=?1", params![entry.id])?;
                    report.synced += 1;
                }
                Err(err) => {
                    warn!("queue entry {} failed: {}", entry.id, err);
                    conn.execute(
                        "UPDATE sync_queue SET status=?2, last_error=?3 WHERE id=?1",
                        params![entry.id, QueueStatus::Failed, err.to_string()],
                    )?;
                    report.failed += 1;
                }
            }
        }
        info!(
            "drain finished: {} synced, {} failed",
            report.synced, report.failed
        );
        Ok(report)
    }

    fn replay(
        &self,
        conn: &Connection,
        backend: &dyn RemoteBackend,
        entry: &QueueEntry,
        resolved: &mut HashMap<String, String>,
    ) -> Result<()> {
        match entry.operation {
            QueueOperation::Insert => {
                let payload = require_payload(entry)?;
                let remote_id = match entry.table {
                    QueueTable::Accounts => {
                        backend.insert_account(&serde_json::from_str::<AccountRow>(payload)?)?
                    }
                    QueueTable::Categories => {
                        backend.insert_category(&serde_json::from_str::<CategoryRow>(payload)?)?
                    }
                    QueueTable::Transactions => backend
                        .insert_transaction(&serde_json::from_str::<TransactionRow>(payload)?)?,
                };
                self.record_inserted(conn, entry, &remote_id)?;
                resolved.insert(entry.record_id.clone(), remote_id);
                Ok(())
            }
            QueueOperation::Update => {
                let remote_id = self.resolve_remote_id(conn, entry, resolved)?;
                let payload = require_payload(entry)?;
                match entry.table {
                    QueueTable::Accounts => backend
                        .update_account(&remote_id, &serde_json::from_str::<AccountRow>(payload)?)?,
                    QueueTable::Categories => backend.update_category(
                        &remote_id,
                        &serde_json::from_str::<CategoryRow>(payload)?,
                    )?,
                    QueueTable::Transactions => backend.update_transaction(
                        &remote_id,
                        &serde_json::from_str::<TransactionRow>(payload)?,
                    )?,
                }
                self.mark_synced(conn, entry)?;
                Ok(())
            }
            QueueOperation::Delete => {
                let remote_id = self.resolve_remote_id(conn, entry, resolved)?;
                match entry.table {
                    QueueTable::Accounts => backend.delete_account(&remote_id)?,
                    QueueTable::Categories => backend.delete_category(&remote_id)?,
                    QueueTable::Transactions => backend.delete_transaction(&remote_id)?,
                }
                Ok(())
            }
        }
    }

    /// Stores the remote id on the local row (same row, primary key
    /// untouched), flags it synced, and back-fills the remote id into any
    /// later queue entries for the same record so queued deletes survive
    /// the local row disappearing.
    fn record_inserted(&self, conn: &Connection, entry: &QueueEntry, remote_id: &str) -> Result<()> {
        match entry.table {
            QueueTable::Accounts => {
                conn.execute(
                    "UPDATE accounts SET remote_id=?2 WHERE id=?1",
                    params![entry.record_id, remote_id],
                )?;
            }
            QueueTable::Categories => {
                conn.execute(
                    "UPDATE categories SET remote_id=?2 WHERE id=?1",
                    params![entry.record_id, remote_id],
                )?;
            }
            QueueTable::Transactions => {
                conn.execute(
                    "UPDATE transactions SET remote_id=?2, sync_status='synced' WHERE id=?1",
                    params![entry.record_id, remote_id],
                )?;
            }
        }
        conn.execute(
            "UPDATE sync_queue SET remote_id=?3 WHERE record_id=?1 AND id>?2",
            params![entry.record_id, entry.id, remote_id],
        )?;
        Ok(())
    }

    fn mark_synced(&self, conn: &Connection, entry: &QueueEntry) -> Result<()> {
        if entry.table == QueueTable::Transactions {
            conn.execute(
                "UPDATE transactions SET sync_status='synced' WHERE id=?1",
                params![entry.record_id],
            )?;
        }
        Ok(())
    }

    /// Remote key for an update/delete: resolved earlier in this batch, or
    /// stored on the local row, or captured on the entry itself. Unresolved
    /// means the record's insert has not replayed; the entry fails softly
    /// and retries after it has.
    fn resolve_remote_id(
        &self,
        conn: &Connection,
        entry: &QueueEntry,
        resolved: &HashMap<String, String>,
    ) -> Result<String> {
        if let Some(id) = resolved.get(&entry.record_id) {
            return Ok(id.clone());
        }
        let on_row: Option<String> = conn
            .query_row(
                &format!(
                    "SELECT remote_id FROM {} WHERE id=?1",
                    entry.table.as_str()
                ),
                params![entry.record_id],
                |r| r.get(0),
            )
            .optional()?
            .flatten();
        if let Some(id) = on_row {
            return Ok(id);
        }
        if let Some(id) = &entry.remote_id {
            return Ok(id.clone());
        }
        Err(Error::RemoteRequestFailed(
            "remote identifier not yet assigned".to_string(),
        ))
    }
}

fn require_payload(entry: &QueueEntry) -> Result<&str> {
    entry
        .payload
        .as_deref()
        .ok_or_else(|| Error::RemoteRequestFailed("queue entry has no payload".to_string()))
}
