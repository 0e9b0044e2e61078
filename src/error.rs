// Copyright (c) 2025 Pocketledger.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use thiserror::Error;

/// Crate-wide error taxonomy.
///
/// Remote failures (`RemoteUnavailable`, `RemoteRequestFailed`) are raised
/// only inside the sync engine's per-entry dispatch and are converted there
/// into a `failed` queue-entry status; they never escape a drain. Storage
/// and validation failures propagate to the caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("local storage unavailable: {0}")]
    StorageUnavailable(#[from] rusqlite::Error),

    #[error("remote backend unreachable: {0}")]
    RemoteUnavailable(String),

    #[error("remote request failed: {0}")]
    RemoteRequestFailed(String),

    #[error("{0}")]
    Validation(String),

    #[error("no remote backend configured")]
    NotConfigured,

    #[error("payload encoding failed: {0}")]
    Payload(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }
}
