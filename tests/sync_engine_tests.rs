// Copyright (c) 2025 Pocketledger.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

mod common;

use chrono::NaiveDate;
use common::{StubBackend, mem_conn};
use pocketledger::connectivity::ConnectivityMonitor;
use pocketledger::models::{AccountType, FlowType, QueueOperation, QueueStatus, SyncStatus};
use pocketledger::services::{accounts, balance, transactions};
use pocketledger::sync::{self, DrainReport, SyncEngine};
use pocketledger::Error;
use std::sync::Arc;

fn dec(s: &str) -> rust_decimal::Decimal {
    s.parse().unwrap()
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn engine_with_stub(online: bool) -> (SyncEngine, Arc<StubBackend>) {
    let monitor = ConnectivityMonitor::new(online);
    let stub = Arc::new(StubBackend::new());
    let engine = SyncEngine::new(monitor, Some(stub.clone()));
    (engine, stub)
}

#[test]
fn create_enqueues_exactly_one_insert_before_any_remote_call() {
    let conn = mem_conn();
    let (_engine, stub) = engine_with_stub(true);

    let account = accounts::create(
        &conn,
        "u1",
        accounts::NewAccount {
            name: "Wallet".into(),
            r#type: AccountType::Personal,
            initial_balance: dec("0"),
            color: None,
            icon: None,
        },
    )
    .unwrap();

    let entries = sync::queue_entries(&conn).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].operation, QueueOperation::Insert);
    assert_eq!(entries[0].record_id, account.id);
    assert_eq!(entries[0].status, QueueStatus::Pending);
    assert!(stub.calls().is_empty());
}

#[test]
fn drain_is_noop_when_offline_or_unconfigured() {
    let conn = mem_conn();
    let (engine, stub) = engine_with_stub(false);
    accounts::create(
        &conn,
        "u1",
        accounts::NewAccount {
            name: "Wallet".into(),
            r#type: AccountType::Personal,
            initial_balance: dec("0"),
            color: None,
            icon: None,
        },
    )
    .unwrap();

    assert_eq!(engine.drain(&conn).unwrap(), DrainReport::default());
    assert!(stub.calls().is_empty());
    assert_eq!(sync::pending_count(&conn).unwrap(), 1);

    let no_backend = SyncEngine::new(ConnectivityMonitor::new(true), None);
    assert_eq!(no_backend.drain(&conn).unwrap(), DrainReport::default());
    assert_eq!(sync::pending_count(&conn).unwrap(), 1);
}

#[test]
fn backend_accessor_reports_not_configured() {
    let engine = SyncEngine::new(ConnectivityMonitor::new(true), None);
    assert!(matches!(engine.backend(), Err(Error::NotConfigured)));
}

#[test]
fn offline_create_then_drain_marks_synced_and_keeps_balance() {
    let conn = mem_conn();
    let (engine, _stub) = engine_with_stub(true);

    let account = accounts::create(
        &conn,
        "u1",
        accounts::NewAccount {
            name: "A".into(),
            r#type: AccountType::Personal,
            initial_balance: dec("100.00"),
            color: None,
            icon: None,
        },
    )
    .unwrap();
    let tx = transactions::create(
        &conn,
        &account.id,
        transactions::NewTransaction {
            amount: dec("30.00"),
            r#type: FlowType::Expense,
            category_id: None,
            description: None,
            date: date("2025-06-01"),
        },
    )
    .unwrap();

    assert_eq!(balance::balance_of(&conn, &account.id).unwrap(), dec("70.00"));
    assert_eq!(tx.sync_status, SyncStatus::Pending);

    let report = engine.drain(&conn).unwrap();
    assert_eq!(report, DrainReport { synced: 2, failed: 0 });

    let tx = transactions::get(&conn, &tx.id).unwrap().unwrap();
    assert_eq!(tx.sync_status, SyncStatus::Synced);
    assert!(tx.remote_id.is_some());
    assert!(sync::queue_entries(&conn).unwrap().is_empty());
    assert_eq!(balance::balance_of(&conn, &account.id).unwrap(), dec("70.00"));
}

#[test]
fn update_in_same_batch_waits_for_inserts_remote_id() {
    let conn = mem_conn();
    let (engine, stub) = engine_with_stub(true);

    let account = accounts::create(
        &conn,
        "u1",
        accounts::NewAccount {
            name: "Old name".into(),
            r#type: AccountType::Personal,
            initial_balance: dec("0"),
            color: None,
            icon: None,
        },
    )
    .unwrap();
    accounts::update(
        &conn,
        &account.id,
        accounts::AccountPatch {
            name: Some("New name".into()),
            ..Default::default()
        },
    )
    .unwrap();

    let report = engine.drain(&conn).unwrap();
    assert_eq!(report, DrainReport { synced: 2, failed: 0 });

    // The insert resolves r-1 first; the update must be keyed by it.
    let calls = stub.calls();
    assert_eq!(
        calls,
        vec![
            format!("insert_account:{}", account.id),
            "update_account:r-1".to_string(),
        ]
    );
    let account = accounts::get(&conn, &account.id).unwrap().unwrap();
    assert_eq!(account.remote_id.as_deref(), Some("r-1"));
}

#[test]
fn queued_delete_of_unsynced_row_uses_resolved_remote_id() {
    let conn = mem_conn();
    let (engine, stub) = engine_with_stub(true);

    let account = accounts::create(
        &conn,
        "u1",
        accounts::NewAccount {
            name: "A".into(),
            r#type: AccountType::Personal,
            initial_balance: dec("0"),
            color: None,
            icon: None,
        },
    )
    .unwrap();
    let tx = transactions::create(
        &conn,
        &account.id,
        transactions::NewTransaction {
            amount: dec("5"),
            r#type: FlowType::Expense,
            category_id: None,
            description: None,
            date: date("2025-02-02"),
        },
    )
    .unwrap();
    // Deleted before ever syncing: the local row is gone, only the queue
    // knows about the record.
    transactions::delete(&conn, &tx.id).unwrap();

    let report = engine.drain(&conn).unwrap();
    assert_eq!(report, DrainReport { synced: 3, failed: 0 });
    assert!(stub.calls().contains(&format!("insert_transaction:{}", tx.id)));
    // Account drains first and takes r-1; the transaction insert takes r-2.
    assert!(stub.calls().contains(&"delete_transaction:r-2".to_string()));
    assert!(sync::queue_entries(&conn).unwrap().is_empty());
}

#[test]
fn one_failure_does_not_abort_the_drain() {
    let conn = mem_conn();
    let (engine, stub) = engine_with_stub(true);

    let bad = accounts::create(
        &conn,
        "u1",
        accounts::NewAccount {
            name: "Bad".into(),
            r#type: AccountType::Personal,
            initial_balance: dec("0"),
            color: None,
            icon: None,
        },
    )
    .unwrap();
    let good = accounts::create(
        &conn,
        "u1",
        accounts::NewAccount {
            name: "Good".into(),
            r#type: AccountType::Personal,
            initial_balance: dec("0"),
            color: None,
            icon: None,
        },
    )
    .unwrap();
    stub.fail_for(&bad.id);

    let report = engine.drain(&conn).unwrap();
    assert_eq!(report, DrainReport { synced: 1, failed: 1 });

    let entries = sync::queue_entries(&conn).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].record_id, bad.id);
    assert_eq!(entries[0].status, QueueStatus::Failed);
    assert!(!entries[0].last_error.as_deref().unwrap_or("").is_empty());
    assert!(accounts::get(&conn, &good.id).unwrap().unwrap().remote_id.is_some());
}

#[test]
fn failed_entries_are_retried_on_the_next_drain() {
    let conn = mem_conn();
    let (engine, stub) = engine_with_stub(true);

    let account = accounts::create(
        &conn,
        "u1",
        accounts::NewAccount {
            name: "Flaky".into(),
            r#type: AccountType::Personal,
            initial_balance: dec("0"),
            color: None,
            icon: None,
        },
    )
    .unwrap();
    stub.fail_for(&account.id);
    assert_eq!(
        engine.drain(&conn).unwrap(),
        DrainReport { synced: 0, failed: 1 }
    );

    stub.clear_failures();
    assert_eq!(
        engine.drain(&conn).unwrap(),
        DrainReport { synced: 1, failed: 0 }
    );
    assert!(sync::queue_entries(&conn).unwrap().is_empty());
    assert_eq!(stub.call_count(&format!("insert_account:{}", account.id)), 2);
}

#[test]
fn update_before_insert_resolves_fails_softly_then_recovers() {
    let conn = mem_conn();
    let (engine, stub) = engine_with_stub(true);

    let account = accounts::create(
        &conn,
        "u1",
        accounts::NewAccount {
            name: "A".into(),
            r#type: AccountType::Personal,
            initial_balance: dec("0"),
            color: None,
            icon: None,
        },
    )
    .unwrap();
    accounts::update(
        &conn,
        &account.id,
        accounts::AccountPatch {
            name: Some("A2".into()),
            ..Default::default()
        },
    )
    .unwrap();

    // Insert fails, so the update has no remote id to be keyed by.
    stub.fail_for(&account.id);
    assert_eq!(
        engine.drain(&conn).unwrap(),
        DrainReport { synced: 0, failed: 2 }
    );
    let entries = sync::queue_entries(&conn).unwrap();
    assert_eq!(entries.len(), 2);
    assert!(entries.iter().all(|e| e.status == QueueStatus::Failed));

    stub.clear_failures();
    assert_eq!(
        engine.drain(&conn).unwrap(),
        DrainReport { synced: 2, failed: 0 }
    );
    assert!(sync::queue_entries(&conn).unwrap().is_empty());
}
