// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

use alloy_primitives::{Address, Bytes, B256, U64};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EthereumQueryError {
    /// The id should be matching
    #[error("the response id does not match the request id")]
    IdIsNotMatching,

    /// wrong jsonrpc version
    #[error("wrong jsonrpc version")]
    WrongJsonRpcVersion,
}

#[derive(Debug, Error)]
pub enum EthereumServiceError {
    /// The response does not belong to the request
    #[error(transparent)]
    EthereumQueryError(#[from] EthereumQueryError),

    /// The node answered with a JSON-RPC error object
    #[error("JSON-RPC error {code}: {message}")]
    JsonRpcError { code: i64, message: String },

    /// The node answered with a non-success HTTP status
    #[error("the node answered with HTTP status {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("invalid address: {0:?}")]
    InvalidAddress(String),

    #[error("invalid transaction hash: {0:?}")]
    InvalidTransactionHash(String),

    /// The receipt was never returned, most likely because the node has not indexed the
    /// transaction yet.
    #[error("the receipt of transaction {tx_hash} is not available after {attempts} attempts")]
    ReceiptUnavailable {
        tx_hash: B256,
        attempts: usize,
        last_error: Option<String>,
    },

    /// ABI decoding error
    #[error("ABI decoding error: {0}")]
    AbiError(#[from] alloy_sol_types::Error),

    /// Hex parsing error
    #[error(transparent)]
    FromHexError(#[from] alloy_primitives::hex::FromHexError),

    /// `serde_json` error
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    /// URL parsing error
    #[error(transparent)]
    UrlParseError(#[from] url::ParseError),

    /// Reqwest error
    #[error(transparent)]
    ReqwestError(#[from] reqwest::Error),
}

impl EthereumServiceError {
    /// Whether trying again later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EthereumServiceError::ReceiptUnavailable { .. }
                | EthereumServiceError::ReqwestError(_)
                | EthereumServiceError::HttpStatus { .. }
        )
    }
}

/// The part of a transaction receipt this crate relies on, decoded strictly: a log with a
/// malformed address or topic fails the whole decoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: B256,
    #[serde(default)]
    pub block_number: Option<U64>,
    /// `1` for success and `0` for a reverted transaction.
    #[serde(default)]
    pub status: Option<U64>,
    #[serde(default)]
    pub logs: Vec<ReceiptLog>,
}

impl TransactionReceipt {
    /// Returns whether the transaction succeeded, if the node reports it.
    pub fn succeeded(&self) -> Option<bool> {
        self.status.map(|status| status == U64::from(1))
    }
}

/// An event log emitted by a contract during a transaction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiptLog {
    /// The contract that emitted the log.
    pub address: Address,
    #[serde(default)]
    pub topics: Vec<B256>,
    #[serde(default)]
    pub data: Bytes,
    #[serde(default)]
    pub log_index: Option<U64>,
}

/// Reads an address out of an indexed topic, where it is left-padded to 32 bytes.
pub fn address_from_topic(topic: &B256) -> Address {
    Address::from_word(*topic)
}

/// Parses a `0x`-prefixed hex address.
pub fn parse_address(value: &str) -> Result<Address, EthereumServiceError> {
    let value = value.trim();
    if !whale_vault_base::validation::is_hex_address(value) {
        return Err(EthereumServiceError::InvalidAddress(value.to_string()));
    }
    Ok(value.parse::<Address>()?)
}

/// Parses a `0x`-prefixed hex transaction hash.
pub fn parse_tx_hash(value: &str) -> Result<B256, EthereumServiceError> {
    let value = value.trim();
    if !whale_vault_base::validation::is_hex_tx_hash(value) {
        return Err(EthereumServiceError::InvalidTransactionHash(
            value.to_string(),
        ));
    }
    Ok(value.parse::<B256>()?)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_receipt_decoding() {
        let receipt: TransactionReceipt = serde_json::from_value(json!({
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "blockNumber": "0x1b4",
            "status": "0x1",
            "gasUsed": "0x5208",
            "logs": [{
                "address": "0xe250ae653190f2edf3ac79fd9bdf2687a90cde84",
                "topics": [format!("0x{}", "22".repeat(32))],
                "data": "0x",
                "logIndex": "0x0",
                "removed": false,
            }],
        }))
        .unwrap();
        assert_eq!(receipt.block_number, Some(U64::from(436)));
        assert_eq!(receipt.succeeded(), Some(true));
        assert_eq!(receipt.logs.len(), 1);
        assert!(receipt.logs[0].data.is_empty());
    }

    #[test]
    fn test_malformed_log_is_rejected() {
        let result = serde_json::from_value::<TransactionReceipt>(json!({
            "transactionHash": format!("0x{}", "11".repeat(32)),
            "logs": [{ "address": "0x1234", "topics": [] }],
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_topic_address() {
        let mut word = [0u8; 32];
        word[12..].copy_from_slice(&[0xAB; 20]);
        assert_eq!(
            address_from_topic(&B256::from(word)),
            Address::from([0xAB; 20])
        );
    }

    #[test]
    fn test_parsing_checks_shape_first() {
        assert_matches!(
            parse_address("e250ae653190f2edf3ac79fd9bdf2687a90cde84"),
            Err(EthereumServiceError::InvalidAddress(_))
        );
        assert_matches!(
            parse_tx_hash("0xAAA"),
            Err(EthereumServiceError::InvalidTransactionHash(_))
        );
        assert_eq!(
            parse_address("0xE250AE653190F2EDF3AC79FD9BDF2687A90CDE84").unwrap(),
            parse_address("0xe250ae653190f2edf3ac79fd9bdf2687a90cde84").unwrap()
        );
    }
}
