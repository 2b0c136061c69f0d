// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

use alloy_primitives::{Address, B256};
use tracing::{info, instrument};
use whale_vault_base::{BackoffPolicy, Clock};

use crate::{
    client::EthereumQueries,
    common::{parse_address, parse_tx_hash, EthereumServiceError, TransactionReceipt},
    erc20::{self, TokenBalance},
};

/// Fetches the receipt of `tx_hash`, asking again after each delay of `policy` while the
/// node does not return it, then one final time.
///
/// Failing requests are retried like missing receipts. When every attempt is spent, the
/// error is [`EthereumServiceError::ReceiptUnavailable`], meaning the transaction may just
/// not be indexed yet.
pub async fn fetch_receipt_with_retry<Q, C>(
    queries: &Q,
    clock: &C,
    policy: &BackoffPolicy,
    tx_hash: B256,
) -> Result<TransactionReceipt, EthereumServiceError>
where
    Q: EthereumQueries + ?Sized,
    C: Clock + ?Sized,
{
    policy
        .run(clock, |_attempt| async move {
            queries.get_transaction_receipt(tx_hash).await
        })
        .await
        .map_err(|exhausted| EthereumServiceError::ReceiptUnavailable {
            tx_hash,
            attempts: exhausted.attempts,
            last_error: exhausted.last_error.map(|error| error.to_string()),
        })
}

/// Finds out which token a transaction moved and what balance an owner has left.
pub struct ReceiptInferencer<Q, C> {
    queries: Q,
    clock: C,
    policy: BackoffPolicy,
}

impl<Q, C> ReceiptInferencer<Q, C>
where
    Q: EthereumQueries,
    C: Clock,
{
    /// Creates an inferencer retrying receipt lookups on the default schedule.
    pub fn new(queries: Q, clock: C) -> Self {
        Self::with_policy(queries, clock, BackoffPolicy::default())
    }

    pub fn with_policy(queries: Q, clock: C, policy: BackoffPolicy) -> Self {
        Self {
            queries,
            clock,
            policy,
        }
    }

    pub fn queries(&self) -> &Q {
        &self.queries
    }

    pub fn policy(&self) -> &BackoffPolicy {
        &self.policy
    }

    /// Fetches a receipt with retries.
    pub async fn fetch_receipt(
        &self,
        tx_hash: &str,
    ) -> Result<TransactionReceipt, EthereumServiceError> {
        let tx_hash = parse_tx_hash(tx_hash)?;
        fetch_receipt_with_retry(&self.queries, &self.clock, &self.policy, tx_hash).await
    }

    /// Returns the token contract credited by the transaction, preferring a transfer to
    /// `expected_owner`, or `None` if the transaction moved no ERC-20 token.
    ///
    /// Both arguments are validated before the node is contacted.
    #[instrument(skip(self))]
    pub async fn infer_token_from_receipt(
        &self,
        tx_hash: &str,
        expected_owner: Option<&str>,
    ) -> Result<Option<Address>, EthereumServiceError> {
        let tx_hash = parse_tx_hash(tx_hash)?;
        let expected_owner = expected_owner.map(parse_address).transpose()?;
        let receipt =
            fetch_receipt_with_retry(&self.queries, &self.clock, &self.policy, tx_hash).await?;
        let token = erc20::infer_token_address(&receipt, expected_owner);
        match token {
            Some(token) => info!(%token, "inferred the token of the transaction"),
            None => info!("the transaction has no ERC-20 transfer"),
        }
        Ok(token)
    }

    /// Reads the symbol, decimals and balance of `owner` for `token`.
    #[instrument(skip(self))]
    pub async fn read_token_meta_and_balance(
        &self,
        token: &str,
        owner: &str,
    ) -> Result<TokenBalance, EthereumServiceError> {
        let token = parse_address(token)?;
        let owner = parse_address(owner)?;
        erc20::read_token_meta_and_balance(&self.queries, token, owner).await
    }

    /// Infers the token of `tx_hash` with `owner` as expected recipient, then reads the
    /// balance of `owner`. Returns `None` if no token could be inferred.
    pub async fn infer_token_balance(
        &self,
        tx_hash: &str,
        owner: &str,
    ) -> Result<Option<TokenBalance>, EthereumServiceError> {
        let owner_address = parse_address(owner)?;
        let Some(token) = self.infer_token_from_receipt(tx_hash, Some(owner)).await? else {
            return Ok(None);
        };
        let balance = erc20::read_token_meta_and_balance(&self.queries, token, owner_address).await?;
        Ok(Some(balance))
    }
}
