// Copyright (c) 2025 Pocketledger.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Process-wide presentation state: snapshots for rendering, refreshed from
//! the local store, never authoritative. Each field is replaced wholesale
//! through its typed setter by a single owning flow.

use crate::db;
use crate::error::Result;
use crate::models::{Account, Category, SessionUser, Transaction};
use crate::remote::Session;
use crate::services::{accounts, categories, transactions};
use crate::sync;
use rusqlite::Connection;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Inner {
    user_id: Option<String>,
    session_user: Option<SessionUser>,
    accounts: Vec<Account>,
    categories: Vec<Category>,
    transactions: Vec<Transaction>,
    selected_account_id: Option<String>,
    online: bool,
    pending_sync_count: u32,
}

pub struct AppState {
    inner: Mutex<Inner>,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

impl AppState {
    pub fn new() -> Self {
        AppState {
            inner: Mutex::new(Inner {
                online: true,
                ..Inner::default()
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn user_id(&self) -> Option<String> {
        self.lock().user_id.clone()
    }

    pub fn session_user(&self) -> Option<SessionUser> {
        self.lock().session_user.clone()
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.lock().accounts.clone()
    }

    pub fn categories(&self) -> Vec<Category> {
        self.lock().categories.clone()
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.lock().transactions.clone()
    }

    pub fn selected_account_id(&self) -> Option<String> {
        self.lock().selected_account_id.clone()
    }

    pub fn is_online(&self) -> bool {
        self.lock().online
    }

    pub fn pending_sync_count(&self) -> u32 {
        self.lock().pending_sync_count
    }

    pub fn set_user(&self, user_id: Option<String>) {
        self.lock().user_id = user_id;
    }

    pub fn set_session_user(&self, user: Option<SessionUser>) {
        self.lock().session_user = user;
    }

    pub fn set_accounts(&self, accounts: Vec<Account>) {
        self.lock().accounts = accounts;
    }

    pub fn set_categories(&self, categories: Vec<Category>) {
        self.lock().categories = categories;
    }

    pub fn set_transactions(&self, transactions: Vec<Transaction>) {
        self.lock().transactions = transactions;
    }

    pub fn set_selected_account(&self, account_id: Option<String>) {
        self.lock().selected_account_id = account_id;
    }

    pub fn set_online(&self, online: bool) {
        self.lock().online = online;
    }

    pub fn set_pending_sync_count(&self, count: u32) {
        self.lock().pending_sync_count = count;
    }
}

/// Adopts a remote session, or falls back to the per-device guest id when
/// signed out.
pub fn apply_session(conn: &Connection, state: &AppState, session: Option<Session>) -> Result<()> {
    match session {
        Some(session) => {
            state.set_user(Some(session.user.id.clone()));
            state.set_session_user(Some(session.user));
        }
        None => {
            state.set_user(Some(db::guest_user_id(conn)?));
            state.set_session_user(None);
        }
    }
    Ok(())
}

/// Reloads snapshots from the local store. Read-only against storage; safe
/// on pull-to-refresh or app reopen.
pub fn refresh_from_store(conn: &Connection, state: &AppState) -> Result<()> {
    let Some(user_id) = state.user_id() else {
        return Ok(());
    };
    state.set_accounts(accounts::list(conn, &user_id)?);
    state.set_categories(categories::list(conn, &user_id)?);
    if let Some(account_id) = state.selected_account_id() {
        state.set_transactions(transactions::list(conn, &account_id)?);
    }
    state.set_pending_sync_count(sync::pending_count(conn)?);
    Ok(())
}
