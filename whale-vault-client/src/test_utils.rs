// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use whale_vault_base::ActivationCode;

use crate::{
    backend::Backend,
    data_types::{BindingRecord, LeaderboardEntry, MintRequest, Role, StatusReport, TxStatus},
    Error,
};

/// A request received by a [`ScriptedBackend`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendCall {
    Verify {
        code_hash: String,
        address: Option<String>,
    },
    GetBinding {
        code_hash: String,
    },
    Mint(MintRequest),
    TransactionStatus(String),
    Recharge {
        to: String,
        amount: u64,
    },
    SaveCode {
        code_hash: String,
        wallet_address: String,
    },
    ClaimReward {
        dest: String,
        codes: Vec<String>,
    },
    ReferralCount(String),
    Leaderboard,
}

impl BackendCall {
    /// The name of the backend operation.
    pub fn method(&self) -> &'static str {
        match self {
            BackendCall::Verify { .. } => "verify",
            BackendCall::GetBinding { .. } => "get_binding",
            BackendCall::Mint(_) => "mint",
            BackendCall::TransactionStatus(_) => "transaction_status",
            BackendCall::Recharge { .. } => "recharge",
            BackendCall::SaveCode { .. } => "save_code",
            BackendCall::ClaimReward { .. } => "claim_reward",
            BackendCall::ReferralCount(_) => "referral_count",
            BackendCall::Leaderboard => "leaderboard",
        }
    }
}

#[derive(Default)]
struct Script {
    verify: VecDeque<Result<Role, Error>>,
    binding: VecDeque<Result<BindingRecord, Error>>,
    mint: VecDeque<Result<String, Error>>,
    status: VecDeque<Result<StatusReport, Error>>,
    recharge: VecDeque<Result<String, Error>>,
    save_code: VecDeque<Result<(), Error>>,
    claim_reward: VecDeque<Result<Option<String>, Error>>,
    referral_count: VecDeque<Result<Option<String>, Error>>,
    leaderboard: VecDeque<Result<Vec<LeaderboardEntry>, Error>>,
    calls: Vec<BackendCall>,
}

/// A backend answering each operation from its own queue of scripted results and
/// recording every request. An operation with an empty queue fails with a network error,
/// except `save_code`, which succeeds.
#[derive(Clone, Default)]
pub struct ScriptedBackend(Arc<Mutex<Script>>);

fn next<T>(queue: &mut VecDeque<Result<T, Error>>, method: &str) -> Result<T, Error> {
    queue
        .pop_front()
        .unwrap_or_else(|| Err(Error::Network(format!("no scripted response for {method}"))))
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Script> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn push_verify(&self, result: Result<Role, Error>) -> &Self {
        self.lock().verify.push_back(result);
        self
    }

    pub fn push_binding(&self, result: Result<BindingRecord, Error>) -> &Self {
        self.lock().binding.push_back(result);
        self
    }

    pub fn push_mint(&self, result: Result<String, Error>) -> &Self {
        self.lock().mint.push_back(result);
        self
    }

    pub fn push_status(&self, result: Result<StatusReport, Error>) -> &Self {
        self.lock().status.push_back(result);
        self
    }

    pub fn push_recharge(&self, result: Result<String, Error>) -> &Self {
        self.lock().recharge.push_back(result);
        self
    }

    pub fn push_save_code(&self, result: Result<(), Error>) -> &Self {
        self.lock().save_code.push_back(result);
        self
    }

    pub fn push_claim_reward(&self, result: Result<Option<String>, Error>) -> &Self {
        self.lock().claim_reward.push_back(result);
        self
    }

    pub fn push_referral_count(&self, result: Result<Option<String>, Error>) -> &Self {
        self.lock().referral_count.push_back(result);
        self
    }

    pub fn push_leaderboard(&self, result: Result<Vec<LeaderboardEntry>, Error>) -> &Self {
        self.lock().leaderboard.push_back(result);
        self
    }

    /// Every request received so far, in order.
    pub fn calls(&self) -> Vec<BackendCall> {
        self.lock().calls.clone()
    }

    /// How many times `method` was called.
    pub fn count(&self, method: &str) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|call| call.method() == method)
            .count()
    }

    fn record(&self, call: BackendCall) -> MutexGuard<'_, Script> {
        let mut script = self.lock();
        script.calls.push(call);
        script
    }
}

#[async_trait]
impl Backend for ScriptedBackend {
    async fn verify(&self, code: &ActivationCode, address: Option<&str>) -> Result<Role, Error> {
        let mut script = self.record(BackendCall::Verify {
            code_hash: code.hash().to_string(),
            address: address.map(str::to_string),
        });
        next(&mut script.verify, "verify")
    }

    async fn get_binding(&self, code: &ActivationCode) -> Result<BindingRecord, Error> {
        let mut script = self.record(BackendCall::GetBinding {
            code_hash: code.hash().to_string(),
        });
        next(&mut script.binding, "get_binding")
    }

    async fn mint(&self, request: &MintRequest) -> Result<String, Error> {
        let mut script = self.record(BackendCall::Mint(request.clone()));
        next(&mut script.mint, "mint")
    }

    async fn transaction_status(&self, tx_hash: &str) -> Result<StatusReport, Error> {
        let mut script = self.record(BackendCall::TransactionStatus(tx_hash.to_string()));
        next(&mut script.status, "transaction_status")
    }

    async fn recharge(&self, to: &str, amount: u64) -> Result<String, Error> {
        let mut script = self.record(BackendCall::Recharge {
            to: to.to_string(),
            amount,
        });
        next(&mut script.recharge, "recharge")
    }

    async fn save_code(&self, code_hash: &str, wallet_address: &str) -> Result<(), Error> {
        let mut script = self.record(BackendCall::SaveCode {
            code_hash: code_hash.to_string(),
            wallet_address: wallet_address.to_string(),
        });
        script.save_code.pop_front().unwrap_or(Ok(()))
    }

    async fn claim_reward(&self, dest: &str, codes: &[String]) -> Result<Option<String>, Error> {
        let mut script = self.record(BackendCall::ClaimReward {
            dest: dest.to_string(),
            codes: codes.to_vec(),
        });
        next(&mut script.claim_reward, "claim_reward")
    }

    async fn referral_count(&self, address: &str) -> Result<Option<String>, Error> {
        let mut script = self.record(BackendCall::ReferralCount(address.to_string()));
        next(&mut script.referral_count, "referral_count")
    }

    async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, Error> {
        let mut script = self.record(BackendCall::Leaderboard);
        next(&mut script.leaderboard, "leaderboard")
    }
}

/// A status report still waiting for inclusion.
pub fn pending() -> StatusReport {
    StatusReport {
        status: TxStatus::Pending,
        token_id: None,
        reader: None,
        error: None,
    }
}

/// A successful status report.
pub fn success(token_id: &str, reader: Option<&str>) -> StatusReport {
    StatusReport {
        status: TxStatus::Success,
        token_id: Some(token_id.to_string()),
        reader: reader.map(str::to_string),
        error: None,
    }
}

/// A failed status report.
pub fn failed(error: Option<&str>) -> StatusReport {
    StatusReport {
        status: TxStatus::Failed,
        token_id: None,
        reader: None,
        error: error.map(str::to_string),
    }
}
