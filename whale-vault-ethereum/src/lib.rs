// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

//! This module provides read-only access to an EVM node: transaction receipts, ERC-20
//! transfer inference and token balances.

pub mod client;
pub mod common;
pub mod erc20;
pub mod provider;
pub mod receipt;

/// Helper types for tests.
#[cfg(with_testing)]
pub mod test_utils;

pub use client::{EthereumClient, EthereumQueries, JsonRpcClient};
pub use common::{EthereumServiceError, ReceiptLog, TransactionReceipt};
pub use erc20::{format_units, TokenBalance};
pub use receipt::{fetch_receipt_with_retry, ReceiptInferencer};
