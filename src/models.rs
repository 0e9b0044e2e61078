// Copyright (c) 2025 Pocketledger.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

macro_rules! text_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                match value.as_str()? {
                    $($text => Ok($name::$variant),)+
                    other => Err(FromSqlError::Other(
                        format!("invalid {}: '{}'", stringify!($name), other).into(),
                    )),
                }
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }
    };
}

text_enum!(AccountType {
    Personal => "personal",
    Business => "business",
});

// Shared by categories and transactions; the sign of a transaction's
// contribution to its account balance.
text_enum!(FlowType {
    Income => "income",
    Expense => "expense",
});

text_enum!(SyncStatus {
    Synced => "synced",
    Pending => "pending",
    Failed => "failed",
});

text_enum!(QueueTable {
    Accounts => "accounts",
    Categories => "categories",
    Transactions => "transactions",
});

text_enum!(QueueOperation {
    Insert => "insert",
    Update => "update",
    Delete => "delete",
});

text_enum!(QueueStatus {
    Pending => "pending",
    Failed => "failed",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub r#type: AccountType,
    pub initial_balance: Decimal,
    pub current_balance: Decimal,
    pub color: String,
    pub icon: String,
    /// Remote-assigned identifier, set after the insert replays remotely.
    /// The local id stays the primary key for the row's whole lifetime.
    pub remote_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub r#type: FlowType,
    pub icon: String,
    pub is_system: bool,
    pub remote_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub account_id: String,
    pub category_id: Option<String>,
    /// Positive magnitude; `r#type` carries the sign.
    pub amount: Decimal,
    pub r#type: FlowType,
    pub description: Option<String>,
    pub date: NaiveDate,
    pub sync_status: SyncStatus,
    pub remote_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One pending local mutation awaiting remote replay.
#[derive(Debug, Clone)]
pub struct QueueEntry {
    pub id: i64,
    pub table: QueueTable,
    pub operation: QueueOperation,
    /// Local identifier of the target record.
    pub record_id: String,
    /// Remote identifier when already known (captured at enqueue time for
    /// deletes, or back-filled once the record's insert replays).
    pub remote_id: Option<String>,
    /// Full-row JSON snapshot; None for deletes.
    pub payload: Option<String>,
    pub status: QueueStatus,
    pub last_error: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: String,
    pub email: String,
}
