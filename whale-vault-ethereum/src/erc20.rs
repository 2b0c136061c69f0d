// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

//! ERC-20 event decoding and read-only contract calls.
//!
//! Inferring the token of a transaction from its logs is a best-effort heuristic: a
//! transaction moving the same token several times to the same owner, or a non-standard
//! token emitting no `Transfer` event, cannot be told apart.

use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::{sol, SolCall, SolEvent};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    client::EthereumQueries,
    common::{address_from_topic, EthereumServiceError, ReceiptLog, TransactionReceipt},
};

/// The label used when a token does not answer `symbol()`, or answers an empty string.
pub const PLACEHOLDER_SYMBOL: &str = "TOKEN";

sol! {
    event Transfer(address indexed from, address indexed to, uint256 value);

    function balanceOf(address owner) external view returns (uint256);
    function decimals() external view returns (uint8);
    function symbol() external view returns (string);
}

/// A decoded ERC-20 `Transfer` log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferLog {
    /// The token contract that emitted the log.
    pub token: Address,
    pub from: Address,
    pub to: Address,
    /// The amount moved, when the log data holds one.
    pub value: Option<U256>,
}

impl TransferLog {
    /// Decodes `log` if it has the shape of an ERC-20 `Transfer`: the event signature
    /// followed by exactly two indexed addresses. ERC-721 transfers, which also index the
    /// token id, are rejected.
    pub fn decode(log: &ReceiptLog) -> Option<Self> {
        let [signature, from, to] = log.topics.as_slice() else {
            return None;
        };
        if *signature != Transfer::SIGNATURE_HASH {
            return None;
        }
        let value = log.data.get(..32).map(U256::from_be_slice);
        Some(Self {
            token: log.address,
            from: address_from_topic(from),
            to: address_from_topic(to),
            value,
        })
    }
}

/// Returns the ERC-20 transfers of `receipt`, in log order.
pub fn transfer_logs(receipt: &TransactionReceipt) -> Vec<TransferLog> {
    receipt.logs.iter().filter_map(TransferLog::decode).collect()
}

/// Picks the token contract a transaction most likely credited.
///
/// A transfer to `expected_owner` wins wherever it appears in the receipt. Otherwise the
/// first transfer is used. Returns `None` when the receipt has no transfer at all.
pub fn infer_token_address(
    receipt: &TransactionReceipt,
    expected_owner: Option<Address>,
) -> Option<Address> {
    let transfers = transfer_logs(receipt);
    if let Some(owner) = expected_owner {
        if let Some(transfer) = transfers.iter().find(|transfer| transfer.to == owner) {
            debug!(token = %transfer.token, "found a transfer to the expected owner");
            return Some(transfer.token);
        }
    }
    let first = transfers.first()?;
    debug!(
        token = %first.token,
        count = transfers.len(),
        "falling back to the first transfer"
    );
    Some(first.token)
}

/// Token metadata together with the balance of one owner.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBalance {
    pub token: Address,
    pub owner: Address,
    pub symbol: String,
    pub decimals: u8,
    /// The balance in the smallest unit of the token.
    pub raw_balance: U256,
    /// The balance scaled by `decimals`, e.g. `"1.0"`.
    pub balance: String,
}

/// Reads `balanceOf(owner)`, `decimals()` and `symbol()` from `token`, one call after the
/// other. A failing or empty `symbol()` is replaced by [`PLACEHOLDER_SYMBOL`].
pub async fn read_token_meta_and_balance<Q>(
    queries: &Q,
    token: Address,
    owner: Address,
) -> Result<TokenBalance, EthereumServiceError>
where
    Q: EthereumQueries + ?Sized,
{
    let raw_balance = call::<_, balanceOfCall>(queries, token, balanceOfCall { owner }).await?;
    let decimals = call::<_, decimalsCall>(queries, token, decimalsCall {}).await?;
    let symbol = match call::<_, symbolCall>(queries, token, symbolCall {}).await {
        Ok(symbol) if !symbol.trim().is_empty() => symbol,
        Ok(_) => {
            debug!(%token, "the token has an empty symbol");
            PLACEHOLDER_SYMBOL.to_string()
        }
        Err(error) => {
            warn!(%token, %error, "could not read the token symbol");
            PLACEHOLDER_SYMBOL.to_string()
        }
    };
    Ok(TokenBalance {
        token,
        owner,
        symbol,
        decimals,
        raw_balance,
        balance: format_units(raw_balance, decimals),
    })
}

async fn call<Q, C>(
    queries: &Q,
    contract: Address,
    request: C,
) -> Result<C::Return, EthereumServiceError>
where
    Q: EthereumQueries + ?Sized,
    C: SolCall,
{
    let data = Bytes::from(request.abi_encode());
    let output = queries.non_executive_call(contract, data).await?;
    Ok(C::abi_decode_returns(&output)?)
}

/// Formats an integer amount of the smallest unit as a decimal number with `decimals`
/// fractional digits, dropping trailing zeros but always keeping one fractional digit.
pub fn format_units(amount: U256, decimals: u8) -> String {
    let digits = amount.to_string();
    let decimals = usize::from(decimals);
    let padded = if digits.len() <= decimals {
        format!("{digits:0>width$}", width = decimals + 1)
    } else {
        digits
    };
    let (integer, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = fraction.trim_end_matches('0');
    if fraction.is_empty() {
        format!("{integer}.0")
    } else {
        format!("{integer}.{fraction}")
    }
}
