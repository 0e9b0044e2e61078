// Copyright (c) 2025 Pocketledger.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! The remote boundary. Rows crossing it are explicit DTO structs mapped
//! from the domain models; the local-only fields (local id is sent as-is,
//! `remote_id` and `sync_status` never cross) stay on this side.

use crate::error::{Error, Result};
use crate::models::{Account, AccountType, Category, FlowType, SessionUser, Transaction};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const UA: &str = concat!(
    "pocketledger/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/pocketledger/pocketledger)"
);

const REMOTE_TIMEOUT_SECS: u64 = 15;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccountRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub r#type: AccountType,
    pub initial_balance: Decimal,
    pub current_balance: Decimal,
    pub color: String,
    pub icon: String,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoryRow {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub r#type: FlowType,
    pub icon: String,
    pub is_system: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TransactionRow {
    pub id: String,
    pub account_id: String,
    pub category_id: Option<String>,
    pub amount: Decimal,
    pub r#type: FlowType,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub created_at: String,
    pub updated_at: String,
}

impl From<&Account> for AccountRow {
    fn from(a: &Account) -> Self {
        AccountRow {
            id: a.id.clone(),
            user_id: a.user_id.clone(),
            name: a.name.clone(),
            r#type: a.r#type,
            initial_balance: a.initial_balance,
            current_balance: a.current_balance,
            color: a.color.clone(),
            icon: a.icon.clone(),
            created_at: a.created_at.clone(),
            updated_at: a.updated_at.clone(),
        }
    }
}

impl From<&Category> for CategoryRow {
    fn from(c: &Category) -> Self {
        CategoryRow {
            id: c.id.clone(),
            user_id: c.user_id.clone(),
            name: c.name.clone(),
            r#type: c.r#type,
            icon: c.icon.clone(),
            is_system: c.is_system,
            created_at: c.created_at.clone(),
            updated_at: c.updated_at.clone(),
        }
    }
}

impl From<&Transaction> for TransactionRow {
    fn from(t: &Transaction) -> Self {
        TransactionRow {
            id: t.id.clone(),
            account_id: t.account_id.clone(),
            category_id: t.category_id.clone(),
            amount: t.amount,
            r#type: t.r#type,
            description: t.description.clone(),
            date: t.date,
            created_at: t.created_at.clone(),
            updated_at: t.updated_at.clone(),
        }
    }
}

/// Remote store operations the sync engine and the backend-only read path
/// need. Inserts return the remote-assigned identifier.
pub trait RemoteBackend: Send + Sync {
    fn list_accounts(&self, user_id: &str) -> Result<Vec<AccountRow>>;
    fn insert_account(&self, row: &AccountRow) -> Result<String>;
    fn update_account(&self, id: &str, row: &AccountRow) -> Result<()>;
    fn delete_account(&self, id: &str) -> Result<()>;

    fn list_categories(&self, user_id: &str) -> Result<Vec<CategoryRow>>;
    fn insert_category(&self, row: &CategoryRow) -> Result<String>;
    /// Bulk insert used when seeding default categories.
    fn insert_categories(&self, rows: &[CategoryRow]) -> Result<Vec<String>>;
    fn update_category(&self, id: &str, row: &CategoryRow) -> Result<()>;
    fn delete_category(&self, id: &str) -> Result<()>;

    fn list_transactions(&self, account_id: &str) -> Result<Vec<TransactionRow>>;
    fn insert_transaction(&self, row: &TransactionRow) -> Result<String>;
    fn update_transaction(&self, id: &str, row: &TransactionRow) -> Result<()>;
    fn delete_transaction(&self, id: &str) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct Session {
    pub user: SessionUser,
}

/// Auth collaborator, specified at its interface boundary only. Session
/// change delivery is the embedding app's concern; it reacts by calling
/// `state::apply_session`.
pub trait AuthProvider: Send + Sync {
    fn current_session(&self) -> Result<Option<Session>>;
    fn sign_in(&self, email: &str, password: &str) -> Result<Session>;
    fn sign_up(&self, email: &str, password: &str) -> Result<Session>;
    fn sign_out(&self) -> Result<()>;
}

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    pub base_url: String,
    pub api_key: String,
}

/// REST implementation of `RemoteBackend`: JSON bodies, bearer auth,
/// bounded timeout. A timed-out call is an ordinary retryable failure.
pub struct HttpBackend {
    client: reqwest::blocking::Client,
    base_url: String,
    api_key: String,
}

#[derive(Deserialize)]
struct InsertedId {
    id: String,
}

#[derive(Deserialize)]
struct InsertedIds {
    ids: Vec<String>,
}

impl HttpBackend {
    pub fn new(config: RemoteConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(REMOTE_TIMEOUT_SECS))
            .user_agent(UA)
            .build()
            .map_err(|e| Error::RemoteUnavailable(e.to_string()))?;
        Ok(HttpBackend {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn send(&self, req: reqwest::blocking::RequestBuilder) -> Result<reqwest::blocking::Response> {
        let resp = req
            .bearer_auth(&self.api_key)
            .send()
            .map_err(|e| Error::RemoteUnavailable(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().unwrap_or_default();
            return Err(Error::RemoteRequestFailed(format!("{status}: {body}")));
        }
        Ok(resp)
    }

    fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str, query: &[(&str, &str)]) -> Result<T> {
        let resp = self.send(self.client.get(self.url(path)).query(query))?;
        resp.json::<T>()
            .map_err(|e| Error::RemoteRequestFailed(format!("bad response body: {e}")))
    }

    fn post_json<B: Serialize, T: serde::de::DeserializeOwned>(&self, path: &str, body: &B) -> Result<T> {
        let resp = self.send(self.client.post(self.url(path)).json(body))?;
        resp.json::<T>()
            .map_err(|e| Error::RemoteRequestFailed(format!("bad response body: {e}")))
    }

    fn put_json<B: Serialize>(&self, path: &str, body: &B) -> Result<()> {
        self.send(self.client.put(self.url(path)).json(body))?;
        Ok(())
    }

    fn delete(&self, path: &str) -> Result<()> {
        self.send(self.client.delete(self.url(path)))?;
        Ok(())
    }
}

impl RemoteBackend for HttpBackend {
    fn list_accounts(&self, user_id: &str) -> Result<Vec<AccountRow>> {
        self.get_json("accounts", &[("user_id", user_id)])
    }

    fn insert_account(&self, row: &AccountRow) -> Result<String> {
        let inserted: InsertedId = self.post_json("accounts", row)?;
        Ok(inserted.id)
    }

    fn update_account(&self, id: &str, row: &AccountRow) -> Result<()> {
        self.put_json(&format!("accounts/{id}"), row)
    }

    fn delete_account(&self, id: &str) -> Result<()> {
        self.delete(&format!("accounts/{id}"))
    }

    fn list_categories(&self, user_id: &str) -> Result<Vec<CategoryRow>> {
        self.get_json("categories", &[("user_id", user_id)])
    }

    fn insert_category(&self, row: &CategoryRow) -> Result<String> {
        let inserted: InsertedId = self.post_json("categories", row)?;
        Ok(inserted.id)
    }

    fn insert_categories(&self, rows: &[CategoryRow]) -> Result<Vec<String>> {
        let inserted: InsertedIds = self.post_json("categories/bulk", &rows)?;
        Ok(inserted.ids)
    }

    fn update_category(&self, id: &str, row: &CategoryRow) -> Result<()> {
        self.put_json(&format!("categories/{id}"), row)
    }

    fn delete_category(&self, id: &str) -> Result<()> {
        self.delete(&format!("categories/{id}"))
    }

    fn list_transactions(&self, account_id: &str) -> Result<Vec<TransactionRow>> {
        self.get_json("transactions", &[("account_id", account_id)])
    }

    fn insert_transaction(&self, row: &TransactionRow) -> Result<String> {
        let inserted: InsertedId = self.post_json("transactions", row)?;
        Ok(inserted.id)
    }

    fn update_transaction(&self, id: &str, row: &TransactionRow) -> Result<()> {
        self.put_json(&format!("transactions/{id}"), row)
    }

    fn delete_transaction(&self, id: &str) -> Result<()> {
        self.delete(&format!("transactions/{id}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_row_serializes_amount_as_decimal_string() {
        let row = TransactionRow {
            id: "t1".into(),
            account_id: "a1".into(),
            category_id: None,
            amount: "30.00".parse().unwrap(),
            r#type: FlowType::Expense,
            description: Some("coffee".into()),
            date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            created_at: "2025-06-01T00:00:00Z".into(),
            updated_at: "2025-06-01T00:00:00Z".into(),
        };
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["amount"], "30.00");
        assert_eq!(json["type"], "expense");
        assert_eq!(json["date"], "2025-06-01");

        let back: TransactionRow = serde_json::from_value(json).unwrap();
        assert_eq!(back, row);
    }
}
