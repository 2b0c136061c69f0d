// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use async_trait::async_trait;
use whale_vault_base::ActivationCode;

use crate::{
    data_types::{BindingRecord, LeaderboardEntry, MintRequest, Role, StatusReport},
    http::HttpBackend,
    mock::MockBackend,
    Error,
};

/// The relay backend holding activation codes, sponsoring mints and paying rewards.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Checks an activation code and returns the role it grants.
    async fn verify(&self, code: &ActivationCode, address: Option<&str>) -> Result<Role, Error>;

    /// Returns the addresses already bound to a code.
    async fn get_binding(&self, code: &ActivationCode) -> Result<BindingRecord, Error>;

    /// Submits a sponsored mint and returns its transaction hash.
    async fn mint(&self, request: &MintRequest) -> Result<String, Error>;

    /// Queries the status of a relayed transaction.
    async fn transaction_status(&self, tx_hash: &str) -> Result<StatusReport, Error>;

    /// Credits `amount` stablecoin units to `to` and returns the transaction hash.
    async fn recharge(&self, to: &str, amount: u64) -> Result<String, Error>;

    /// Stores a verified code for the referral reward of `wallet_address`.
    async fn save_code(&self, code_hash: &str, wallet_address: &str) -> Result<(), Error>;

    /// Exchanges collected codes for a reward paid to `dest`, returning the transaction
    /// hash if the backend reports one.
    async fn claim_reward(&self, dest: &str, codes: &[String]) -> Result<Option<String>, Error>;

    /// Returns the referral count of `address`, if known.
    async fn referral_count(&self, address: &str) -> Result<Option<String>, Error>;

    /// Returns the referral counts of every address, highest first.
    async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, Error>;
}

/// Either the real relay or the demo one, chosen by configuration.
#[derive(Clone)]
pub enum AnyBackend {
    Http(HttpBackend),
    Mock(MockBackend),
}

impl From<HttpBackend> for AnyBackend {
    fn from(backend: HttpBackend) -> Self {
        Self::Http(backend)
    }
}

impl From<MockBackend> for AnyBackend {
    fn from(backend: MockBackend) -> Self {
        Self::Mock(backend)
    }
}

#[async_trait]
impl Backend for AnyBackend {
    async fn verify(&self, code: &ActivationCode, address: Option<&str>) -> Result<Role, Error> {
        match self {
            AnyBackend::Http(backend) => backend.verify(code, address).await,
            AnyBackend::Mock(backend) => backend.verify(code, address).await,
        }
    }

    async fn get_binding(&self, code: &ActivationCode) -> Result<BindingRecord, Error> {
        match self {
            AnyBackend::Http(backend) => backend.get_binding(code).await,
            AnyBackend::Mock(backend) => backend.get_binding(code).await,
        }
    }

    async fn mint(&self, request: &MintRequest) -> Result<String, Error> {
        match self {
            AnyBackend::Http(backend) => backend.mint(request).await,
            AnyBackend::Mock(backend) => backend.mint(request).await,
        }
    }

    async fn transaction_status(&self, tx_hash: &str) -> Result<StatusReport, Error> {
        match self {
            AnyBackend::Http(backend) => backend.transaction_status(tx_hash).await,
            AnyBackend::Mock(backend) => backend.transaction_status(tx_hash).await,
        }
    }

    async fn recharge(&self, to: &str, amount: u64) -> Result<String, Error> {
        match self {
            AnyBackend::Http(backend) => backend.recharge(to, amount).await,
            AnyBackend::Mock(backend) => backend.recharge(to, amount).await,
        }
    }

    async fn save_code(&self, code_hash: &str, wallet_address: &str) -> Result<(), Error> {
        match self {
            AnyBackend::Http(backend) => backend.save_code(code_hash, wallet_address).await,
            AnyBackend::Mock(backend) => backend.save_code(code_hash, wallet_address).await,
        }
    }

    async fn claim_reward(&self, dest: &str, codes: &[String]) -> Result<Option<String>, Error> {
        match self {
            AnyBackend::Http(backend) => backend.claim_reward(dest, codes).await,
            AnyBackend::Mock(backend) => backend.claim_reward(dest, codes).await,
        }
    }

    async fn referral_count(&self, address: &str) -> Result<Option<String>, Error> {
        match self {
            AnyBackend::Http(backend) => backend.referral_count(address).await,
            AnyBackend::Mock(backend) => backend.referral_count(address).await,
        }
    }

    async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, Error> {
        match self {
            AnyBackend::Http(backend) => backend.leaderboard().await,
            AnyBackend::Mock(backend) => backend.leaderboard().await,
        }
    }
}

#[async_trait]
impl<B: Backend + ?Sized> Backend for Arc<B> {
    async fn verify(&self, code: &ActivationCode, address: Option<&str>) -> Result<Role, Error> {
        (**self).verify(code, address).await
    }

    async fn get_binding(&self, code: &ActivationCode) -> Result<BindingRecord, Error> {
        (**self).get_binding(code).await
    }

    async fn mint(&self, request: &MintRequest) -> Result<String, Error> {
        (**self).mint(request).await
    }

    async fn transaction_status(&self, tx_hash: &str) -> Result<StatusReport, Error> {
        (**self).transaction_status(tx_hash).await
    }

    async fn recharge(&self, to: &str, amount: u64) -> Result<String, Error> {
        (**self).recharge(to, amount).await
    }

    async fn save_code(&self, code_hash: &str, wallet_address: &str) -> Result<(), Error> {
        (**self).save_code(code_hash, wallet_address).await
    }

    async fn claim_reward(&self, dest: &str, codes: &[String]) -> Result<Option<String>, Error> {
        (**self).claim_reward(dest, codes).await
    }

    async fn referral_count(&self, address: &str) -> Result<Option<String>, Error> {
        (**self).referral_count(address).await
    }

    async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, Error> {
        (**self).leaderboard().await
    }
}
