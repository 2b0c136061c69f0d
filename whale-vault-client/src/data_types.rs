// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

//! Values exchanged with the backend and returned to callers.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::Error;

/// What an activation code entitles its holder to do.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Reader,
    Author,
    Publisher,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Reader => "reader",
            Role::Author => "author",
            Role::Publisher => "publisher",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reader" => Ok(Role::Reader),
            "author" => Ok(Role::Author),
            "publisher" => Ok(Role::Publisher),
            other => Err(Error::MalformedResponse(format!("unknown role {other:?}"))),
        }
    }
}

/// The addresses the backend already associates with a code. Either may be missing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingRecord {
    pub reader_address: Option<String>,
    pub book_address: Option<String>,
}

/// A resolved activation code. It is never changed locally once resolved.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub code_hash: String,
    pub role: Role,
    pub reader_address: Option<String>,
    pub book_address: Option<String>,
}

/// A request to mint the NFT of a book to a reader, gas paid by the relay.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MintRequest {
    pub book_address: String,
    pub reader_address: String,
}

impl MintRequest {
    pub fn new(book_address: impl Into<String>, reader_address: impl Into<String>) -> Self {
        Self {
            book_address: book_address.into(),
            reader_address: reader_address.into(),
        }
    }

    /// Checks that both addresses are present.
    pub fn validate(&self) -> Result<(), Error> {
        if self.book_address.trim().is_empty() {
            return Err(Error::MissingField("bookAddress"));
        }
        if self.reader_address.trim().is_empty() {
            return Err(Error::MissingField("readerAddress"));
        }
        Ok(())
    }
}

/// The status of a relayed transaction. Only `Pending` is not final.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxStatus {
    Pending,
    Success,
    Failed,
}

impl TxStatus {
    /// Reads a status string. Anything other than success or failure counts as pending.
    pub fn from_backend(status: &str) -> Self {
        match status.trim().to_ascii_uppercase().as_str() {
            "SUCCESS" => TxStatus::Success,
            "FAILED" => TxStatus::Failed,
            _ => TxStatus::Pending,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TxStatus::Pending)
    }
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = match self {
            TxStatus::Pending => "PENDING",
            TxStatus::Success => "SUCCESS",
            TxStatus::Failed => "FAILED",
        };
        f.write_str(status)
    }
}

/// One answer of the status endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReport {
    pub status: TxStatus,
    pub token_id: Option<String>,
    pub reader: Option<String>,
    /// The explanation given with a failure, if any.
    pub error: Option<String>,
}

/// A confirmed mint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MintOutcome {
    pub tx_hash: String,
    pub status: TxStatus,
    pub token_id: Option<String>,
    /// The reader reported by the backend, or the one the mint was requested for.
    pub reader: Option<String>,
}

/// The progress of a confirmation session, reported to an optional callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MintState {
    Submitting,
    Polling { tx_hash: String, attempt: u32 },
    Confirmed(MintOutcome),
    Failed { tx_hash: String },
    TimedOut { tx_hash: String },
}

impl fmt::Display for MintState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MintState::Submitting => write!(f, "submitting the mint request"),
            MintState::Polling { tx_hash, attempt } => {
                write!(f, "waiting for {tx_hash} (check {attempt})")
            }
            MintState::Confirmed(outcome) => write!(
                f,
                "confirmed token {} for {}",
                outcome.token_id.as_deref().unwrap_or("?"),
                outcome.reader.as_deref().unwrap_or("?")
            ),
            MintState::Failed { tx_hash } => write!(f, "transaction {tx_hash} failed"),
            MintState::TimedOut { tx_hash } => write!(f, "transaction {tx_hash} is still pending"),
        }
    }
}

/// A reader address and how many referral rewards it has collected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub address: String,
    pub count: u64,
}

/// The result of claiming a referral reward.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardClaim {
    pub tx_hash: Option<String>,
    /// The referral count, `"1"` when the backend could not tell.
    pub referral_count: String,
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("SUCCESS", TxStatus::Success ; "upper case success")]
    #[test_case("success", TxStatus::Success ; "lower case success")]
    #[test_case("FAILED", TxStatus::Failed ; "failed")]
    #[test_case("PENDING", TxStatus::Pending ; "pending")]
    #[test_case("QUEUED", TxStatus::Pending ; "unknown status")]
    #[test_case("", TxStatus::Pending ; "empty status")]
    fn test_status_strings(input: &str, expected: TxStatus) {
        assert_eq!(TxStatus::from_backend(input), expected);
    }

    #[test]
    fn test_mint_request_wire_format() {
        let request = MintRequest::new("0xBook", "0xReader");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            serde_json::json!({ "bookAddress": "0xBook", "readerAddress": "0xReader" })
        );
        assert!(MintRequest::new(" ", "0xReader").validate().is_err());
    }

    #[test]
    fn test_role_parsing() {
        assert_eq!("Publisher".parse::<Role>().unwrap(), Role::Publisher);
        assert!("admin".parse::<Role>().is_err());
    }
}
