// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

//! Canned node responses and receipt builders for tests.

use std::{
    collections::{BTreeMap, VecDeque},
    sync::{Arc, Mutex},
};

use alloy_primitives::{Address, Bytes, B256, U256, U64};
use alloy_sol_types::{SolEvent as _, SolValue as _};
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::{
    client::{EthereumClient, JsonRpcClient},
    common::{EthereumServiceError, ReceiptLog, TransactionReceipt},
    erc20::Transfer,
};

/// A scripted answer to one JSON-RPC request.
#[derive(Clone, Debug)]
pub enum ScriptedResponse {
    Result(Value),
    Error { code: i64, message: String },
}

#[derive(Default)]
struct Script {
    next_id: u64,
    responses: BTreeMap<String, VecDeque<ScriptedResponse>>,
    calls: Vec<(String, Value)>,
}

/// A [`JsonRpcClient`] answering each method from its own queue of scripted responses.
///
/// A method whose queue is empty answers with a JSON-RPC error. Every request is recorded.
#[derive(Clone, Default)]
pub struct ScriptedJsonRpc(Arc<Mutex<Script>>);

impl ScriptedJsonRpc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `result` as the next answer to `method`.
    pub fn push_result(&self, method: &str, result: Value) -> &Self {
        self.push(method, ScriptedResponse::Result(result))
    }

    /// Queues an error object as the next answer to `method`.
    pub fn push_error(&self, method: &str, code: i64, message: &str) -> &Self {
        self.push(
            method,
            ScriptedResponse::Error {
                code,
                message: message.to_string(),
            },
        )
    }

    pub fn push(&self, method: &str, response: ScriptedResponse) -> &Self {
        self.lock()
            .responses
            .entry(method.to_string())
            .or_default()
            .push_back(response);
        self
    }

    /// Queues a receipt, or `null` for a receipt the node does not know yet.
    pub fn push_receipt(&self, receipt: Option<&TransactionReceipt>) -> &Self {
        let value = receipt.map_or(Value::Null, |receipt| {
            serde_json::to_value(receipt).expect("receipts are serializable")
        });
        self.push_result("eth_getTransactionReceipt", value)
    }

    /// Queues the ABI-encoded answers of `balanceOf`, `decimals` and `symbol`, in the
    /// order they are called.
    pub fn push_token(&self, balance: U256, decimals: u8, symbol: Option<&str>) -> &Self {
        self.push_result("eth_call", abi_result((balance,).abi_encode_params()));
        self.push_result("eth_call", abi_result((U256::from(decimals),).abi_encode_params()));
        match symbol {
            Some(symbol) => self.push_result(
                "eth_call",
                abi_result((symbol.to_string(),).abi_encode_params()),
            ),
            None => self.push_error("eth_call", 3, "execution reverted"),
        }
    }

    /// The requests received so far, as method and parameters.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.lock().calls.clone()
    }

    /// How many times `method` was called.
    pub fn count(&self, method: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|(name, _)| name == method)
            .count()
    }

    /// Wraps this transport into an [`EthereumClient`]. Clones share the same script.
    pub fn client(&self) -> EthereumClient<ScriptedJsonRpc> {
        EthereumClient::new(self.clone())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.0.lock().expect("poisoned script")
    }
}

#[async_trait]
impl JsonRpcClient for ScriptedJsonRpc {
    async fn get_id(&self) -> u64 {
        let mut script = self.lock();
        script.next_id += 1;
        script.next_id
    }

    async fn request_inner(&self, payload: Vec<u8>) -> Result<Vec<u8>, EthereumServiceError> {
        let request: Value = serde_json::from_slice(&payload)?;
        let method = request["method"].as_str().unwrap_or_default().to_string();
        let mut script = self.lock();
        script.calls.push((method.clone(), request["params"].clone()));
        let response = script
            .responses
            .get_mut(&method)
            .and_then(VecDeque::pop_front);
        let body = match response {
            Some(ScriptedResponse::Result(result)) => json!({
                "jsonrpc": "2.0",
                "id": request["id"],
                "result": result,
            }),
            Some(ScriptedResponse::Error { code, message }) => json!({
                "jsonrpc": "2.0",
                "id": request["id"],
                "error": { "code": code, "message": message },
            }),
            None => json!({
                "jsonrpc": "2.0",
                "id": request["id"],
                "error": { "code": -32601, "message": format!("no scripted response for {method}") },
            }),
        };
        Ok(serde_json::to_vec(&body)?)
    }
}

fn abi_result(data: Vec<u8>) -> Value {
    json!(Bytes::from(data))
}

/// Builds a successful receipt holding `logs`.
pub fn receipt(tx_hash: B256, logs: Vec<ReceiptLog>) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: tx_hash,
        block_number: Some(U64::from(1)),
        status: Some(U64::from(1)),
        logs,
    }
}

/// Builds an ERC-20 `Transfer` log emitted by `token`.
pub fn transfer_log(token: Address, from: Address, to: Address, value: U256) -> ReceiptLog {
    ReceiptLog {
        address: token,
        topics: vec![Transfer::SIGNATURE_HASH, from.into_word(), to.into_word()],
        data: Bytes::from(value.to_be_bytes::<32>().to_vec()),
        log_index: None,
    }
}

/// Builds a log of some other event emitted by `contract`.
pub fn unrelated_log(contract: Address) -> ReceiptLog {
    ReceiptLog {
        address: contract,
        topics: vec![B256::repeat_byte(0x42)],
        data: Bytes::new(),
        log_index: None,
    }
}

/// A transaction hash made of `byte` repeated.
pub fn tx_hash(byte: u8) -> B256 {
    B256::repeat_byte(byte)
}
