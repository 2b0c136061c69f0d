// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use alloy_primitives::{Address, Bytes, B256};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::common::{EthereumQueryError, EthereumServiceError, TransactionReceipt};

#[derive(Serialize)]
struct JsonRpcRequest<'a, T> {
    id: u64,
    jsonrpc: &'a str,
    method: &'a str,
    params: T,
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    id: u64,
    jsonrpc: String,
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<JsonRpcErrorObject>,
}

#[derive(Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
}

/// A transport able to carry JSON-RPC 2.0 requests to an EVM node.
#[async_trait]
pub trait JsonRpcClient: Send + Sync {
    /// Returns a fresh request id.
    async fn get_id(&self) -> u64;

    /// Sends a serialized request and returns the raw response body.
    async fn request_inner(&self, payload: Vec<u8>) -> Result<Vec<u8>, EthereumServiceError>;

    /// Calls `method` with `params` and decodes the `result` field as `R`.
    ///
    /// A `null` result is handed to `R` as is, so `Option` results decode to `None`.
    async fn request<T, R>(&self, method: &str, params: T) -> Result<R, EthereumServiceError>
    where
        T: Serialize + Send + Sync,
        R: DeserializeOwned + Send,
    {
        let id = self.get_id().await;
        let payload = JsonRpcRequest {
            id,
            jsonrpc: "2.0",
            method,
            params,
        };
        let payload = serde_json::to_vec(&payload)?;
        debug!(id, method, "sending JSON-RPC request");
        let body = self.request_inner(payload).await?;
        let response: JsonRpcResponse = serde_json::from_slice(&body)?;
        if response.id != id {
            return Err(EthereumQueryError::IdIsNotMatching.into());
        }
        if response.jsonrpc != "2.0" {
            return Err(EthereumQueryError::WrongJsonRpcVersion.into());
        }
        if let Some(error) = response.error {
            return Err(EthereumServiceError::JsonRpcError {
                code: error.code,
                message: error.message,
            });
        }
        Ok(serde_json::from_value(response.result)?)
    }
}

/// The read-only queries needed to reconcile a transaction with token balances.
#[async_trait]
pub trait EthereumQueries: Send + Sync {
    /// Returns the receipt of a transaction, or `None` if the node does not know it yet.
    async fn get_transaction_receipt(
        &self,
        tx_hash: B256,
    ) -> Result<Option<TransactionReceipt>, EthereumServiceError>;

    /// Executes a call against the latest block without creating a transaction.
    async fn non_executive_call(
        &self,
        contract_address: Address,
        data: Bytes,
    ) -> Result<Bytes, EthereumServiceError>;
}

/// The queries of [`EthereumQueries`] issued through any [`JsonRpcClient`].
pub struct EthereumClient<C> {
    pub client: C,
}

impl<C> EthereumClient<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: JsonRpcClient> EthereumQueries for EthereumClient<C> {
    async fn get_transaction_receipt(
        &self,
        tx_hash: B256,
    ) -> Result<Option<TransactionReceipt>, EthereumServiceError> {
        self.client
            .request("eth_getTransactionReceipt", (tx_hash,))
            .await
    }

    async fn non_executive_call(
        &self,
        contract_address: Address,
        data: Bytes,
    ) -> Result<Bytes, EthereumServiceError> {
        let call = json!({ "to": contract_address, "data": data });
        self.client.request("eth_call", (call, "latest")).await
    }
}

#[async_trait]
impl<Q: EthereumQueries + ?Sized> EthereumQueries for Arc<Q> {
    async fn get_transaction_receipt(
        &self,
        tx_hash: B256,
    ) -> Result<Option<TransactionReceipt>, EthereumServiceError> {
        (**self).get_transaction_receipt(tx_hash).await
    }

    async fn non_executive_call(
        &self,
        contract_address: Address,
        data: Bytes,
    ) -> Result<Bytes, EthereumServiceError> {
        (**self).non_executive_call(contract_address, data).await
    }
}
