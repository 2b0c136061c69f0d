// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

use whale_vault_base::CodeError;
use whale_vault_ethereum::EthereumServiceError;

/// How a caller should react to an [`Error`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Retrying the same request will not help.
    Terminal,
    /// The failure is transient; retrying later may succeed.
    Retryable,
    /// The outcome is unknown: the transaction may still land. The user should refresh
    /// the status rather than start over.
    Ambiguous,
    /// A follow-up step failed after the main action succeeded.
    NonFatal,
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("invalid activation code: {message}")]
    InvalidCode { message: String },
    #[error(transparent)]
    MalformedCode(#[from] CodeError),
    #[error("network error: {0}")]
    Network(String),
    #[error("the receipt of transaction {tx_hash} is still unavailable after {attempts} attempts")]
    ReceiptUnavailable { tx_hash: String, attempts: usize },
    #[error("mint request rejected: {0}")]
    MintRequestRejected(String),
    #[error("mint transaction {tx_hash} failed: {message}")]
    MintFailed { tx_hash: String, message: String },
    #[error("transaction {tx_hash} is still pending after {attempts} status queries")]
    ConfirmationTimeout { tx_hash: String, attempts: u32 },
    #[error("could not infer the token moved by transaction {tx_hash}: {reason}")]
    TokenInferenceFailed { tx_hash: String, reason: String },
    #[error("request rejected by the backend: {0}")]
    Rejected(String),
    #[error("invalid address: {0:?}")]
    InvalidAddress(String),
    #[error("invalid transaction hash: {0:?}")]
    InvalidTransactionHash(String),
    #[error("invalid amount: {0:?}")]
    InvalidAmount(String),
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("the status query budget must be at least 1, got {0}")]
    InvalidPollBudget(u32),
    #[error("malformed backend response: {0}")]
    MalformedResponse(String),
    #[error("a confirmation is already running for this session")]
    AlreadyStarted,
    #[error("all {0} reward slots are taken")]
    SlotsFull(usize),
    #[error("{missing} more code(s) needed before claiming the reward")]
    NotEnoughCodes { missing: usize },
    #[error("chain error: {0}")]
    Chain(#[source] EthereumServiceError),
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<EthereumServiceError> for Error {
    fn from(error: EthereumServiceError) -> Self {
        match error {
            EthereumServiceError::InvalidAddress(address) => Error::InvalidAddress(address),
            EthereumServiceError::InvalidTransactionHash(hash) => {
                Error::InvalidTransactionHash(hash)
            }
            EthereumServiceError::ReceiptUnavailable {
                tx_hash, attempts, ..
            } => Error::ReceiptUnavailable {
                tx_hash: tx_hash.to_string(),
                attempts,
            },
            error => Error::Chain(error),
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(error: reqwest::Error) -> Self {
        Error::Network(error.to_string())
    }
}

impl Error {
    /// Classifies the error for display and retry decisions.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Network(_) | Error::ReceiptUnavailable { .. } => ErrorKind::Retryable,
            Error::Chain(error) if error.is_transient() => ErrorKind::Retryable,
            Error::ConfirmationTimeout { .. } => ErrorKind::Ambiguous,
            Error::TokenInferenceFailed { .. } => ErrorKind::NonFatal,
            _ => ErrorKind::Terminal,
        }
    }

    /// A message suitable for end users: the backend's own explanation when it gave one,
    /// a generic sentence otherwise.
    pub fn user_message(&self) -> String {
        match self {
            Error::InvalidCode { message } => message.clone(),
            Error::MalformedCode(_) => {
                "This does not look like a Whale Vault activation code.".to_string()
            }
            Error::Network(_) => "The service could not be reached. Please try again.".to_string(),
            Error::ReceiptUnavailable { .. } => {
                "The transaction is not indexed yet. Please refresh in a moment.".to_string()
            }
            Error::MintRequestRejected(message) | Error::Rejected(message) => message.clone(),
            Error::MintFailed { message, .. } => message.clone(),
            Error::ConfirmationTimeout { .. } => {
                "The transaction is still being confirmed. Refresh its status later.".to_string()
            }
            Error::TokenInferenceFailed { .. } => {
                "The balance could not be refreshed automatically.".to_string()
            }
            Error::SlotsFull(_) => "All reward slots are already filled.".to_string(),
            Error::NotEnoughCodes { missing } => {
                format!("Collect {missing} more code(s) to claim the reward.")
            }
            Error::InvalidAddress(_)
            | Error::InvalidTransactionHash(_)
            | Error::InvalidAmount(_)
            | Error::InvalidPollBudget(_)
            | Error::MissingField(_) => self.to_string(),
            _ => "Something went wrong. Please try again later.".to_string(),
        }
    }
}

/// The fallback used when a failed response carries no explanation.
pub(crate) fn fallback_message(action: &str, status: u16) -> String {
    format!("{action} failed (HTTP {status})")
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(Error::Network("reset".into()), ErrorKind::Retryable ; "network")]
    #[test_case(Error::InvalidCode { message: "expired".into() }, ErrorKind::Terminal ; "invalid code")]
    #[test_case(Error::ConfirmationTimeout { tx_hash: "0x1".into(), attempts: 30 }, ErrorKind::Ambiguous ; "timeout")]
    #[test_case(Error::TokenInferenceFailed { tx_hash: "0x1".into(), reason: "none".into() }, ErrorKind::NonFatal ; "inference")]
    #[test_case(Error::MintFailed { tx_hash: "0x1".into(), message: "reverted".into() }, ErrorKind::Terminal ; "mint failed")]
    fn test_error_kinds(error: Error, kind: ErrorKind) {
        assert_eq!(error.kind(), kind);
    }

    #[test]
    fn test_backend_message_is_shown_to_users() {
        let error = Error::MintRequestRejected("code already used".into());
        assert_eq!(error.user_message(), "code already used");
        let error = Error::ConfirmationTimeout {
            tx_hash: "0x1".into(),
            attempts: 30,
        };
        assert!(error.user_message().contains("Refresh"));
    }
}
