// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

//! Administrative top-ups, reconciled against the chain to refresh the recipient's
//! balance without knowing the token in advance.

use tracing::{info, instrument, warn};
use whale_vault_base::{
    validation::{is_hex_address, is_hex_tx_hash},
    Clock,
};
use whale_vault_ethereum::{EthereumQueries, ReceiptInferencer, TokenBalance};

use crate::{backend::Backend, Error};

/// How the balance was refreshed after a top-up.
#[derive(Debug)]
pub enum Reconciliation {
    /// The token was inferred from the transaction receipt.
    Inferred(TokenBalance),
    /// The transaction hash was unusable; the configured default token was read instead.
    DefaultToken(TokenBalance),
    /// The transaction hash was unusable and no default token is configured.
    Skipped,
    /// The balance could not be refreshed. The top-up itself succeeded.
    Failed(Error),
}

impl Reconciliation {
    pub fn balance(&self) -> Option<&TokenBalance> {
        match self {
            Reconciliation::Inferred(balance) | Reconciliation::DefaultToken(balance) => {
                Some(balance)
            }
            Reconciliation::Skipped | Reconciliation::Failed(_) => None,
        }
    }
}

/// A successful top-up.
#[derive(Debug)]
pub struct RechargeOutcome {
    pub tx_hash: String,
    pub reconciliation: Reconciliation,
}

/// Credits stablecoins through the backend, then refreshes the recipient's balance.
pub struct TopUp<B, Q, C> {
    backend: B,
    inferencer: ReceiptInferencer<Q, C>,
    default_token: Option<String>,
}

impl<B, Q, C> TopUp<B, Q, C>
where
    B: Backend,
    Q: EthereumQueries,
    C: Clock,
{
    pub fn new(backend: B, inferencer: ReceiptInferencer<Q, C>) -> Self {
        Self {
            backend,
            inferencer,
            default_token: None,
        }
    }

    /// Sets the token read when the backend returns a malformed transaction hash.
    pub fn with_default_token(mut self, token: Option<String>) -> Self {
        self.default_token = token;
        self
    }

    /// Credits `amount` units to `to`, then finds out which token moved and calls
    /// `refresh` with the new balance of `to`.
    ///
    /// Only a rejected top-up is an error. A failure to refresh the balance is reported
    /// in [`RechargeOutcome::reconciliation`].
    #[instrument(skip(self, refresh))]
    pub async fn recharge<F>(
        &self,
        to: &str,
        amount: u64,
        mut refresh: F,
    ) -> Result<RechargeOutcome, Error>
    where
        F: FnMut(&TokenBalance),
    {
        let to = to.trim();
        if !is_hex_address(to) {
            return Err(Error::InvalidAddress(to.to_string()));
        }
        if amount == 0 {
            return Err(Error::InvalidAmount(amount.to_string()));
        }
        let tx_hash = self.backend.recharge(to, amount).await?;
        info!(%tx_hash, "top-up accepted");
        let reconciliation = self.reconcile(&tx_hash, to).await;
        match &reconciliation {
            Reconciliation::Inferred(balance) | Reconciliation::DefaultToken(balance) => {
                refresh(balance)
            }
            Reconciliation::Skipped => info!("no token to refresh"),
            Reconciliation::Failed(error) => warn!(%error, "could not refresh the balance"),
        }
        Ok(RechargeOutcome {
            tx_hash,
            reconciliation,
        })
    }

    async fn reconcile(&self, tx_hash: &str, owner: &str) -> Reconciliation {
        if !is_hex_tx_hash(tx_hash) {
            let Some(token) = &self.default_token else {
                return Reconciliation::Skipped;
            };
            return match self.inferencer.read_token_meta_and_balance(token, owner).await {
                Ok(balance) => Reconciliation::DefaultToken(balance),
                Err(error) => Reconciliation::Failed(inference_failed(tx_hash, error.to_string())),
            };
        }
        match self.inferencer.infer_token_balance(tx_hash, owner).await {
            Ok(Some(balance)) => Reconciliation::Inferred(balance),
            Ok(None) => Reconciliation::Failed(inference_failed(
                tx_hash,
                "the receipt holds no ERC-20 transfer".to_string(),
            )),
            Err(error) => Reconciliation::Failed(inference_failed(tx_hash, error.to_string())),
        }
    }
}

fn inference_failed(tx_hash: &str, reason: String) -> Error {
    Error::TokenInferenceFailed {
        tx_hash: tx_hash.to_string(),
        reason,
    }
}
