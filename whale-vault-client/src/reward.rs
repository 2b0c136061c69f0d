// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

//! The referral reward: five verified codes from different books are exchanged for a
//! payment to the collector's wallet.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use whale_vault_base::{validation::is_hex_address, ActivationCode};

use crate::{
    backend::Backend,
    data_types::{LeaderboardEntry, RewardClaim},
    Error,
};

/// The number of codes needed for one reward.
pub const REWARD_SLOT_COUNT: usize = 5;

/// Reported when the backend cannot tell the referral count after a claim.
const DEFAULT_REFERRAL_COUNT: &str = "1";

/// The code hashes collected so far, without duplicates.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSlots {
    codes: Vec<String>,
}

impl RewardSlots {
    pub fn codes(&self) -> &[String] {
        &self.codes
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.codes.len() >= REWARD_SLOT_COUNT
    }

    pub fn contains(&self, code_hash: &str) -> bool {
        self.codes.iter().any(|code| code == code_hash)
    }

    /// Fills the next free slot. Returns `false` if the code was already collected.
    pub fn insert(&mut self, code_hash: &str) -> Result<bool, Error> {
        if self.contains(code_hash) {
            return Ok(false);
        }
        if self.is_full() {
            return Err(Error::SlotsFull(REWARD_SLOT_COUNT));
        }
        self.codes.push(code_hash.to_string());
        Ok(true)
    }

    pub fn clear(&mut self) {
        self.codes.clear();
    }
}

/// Collects codes and claims rewards through the backend.
pub struct RewardProgram<B> {
    backend: B,
}

impl<B: Backend> RewardProgram<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Verifies the code in `input` and adds it to `slots`. Returns whether a slot was
    /// filled, `false` meaning the code was already there.
    ///
    /// When `wallet_address` is known, the code is also saved by the backend; a failure
    /// to do so is only logged.
    #[instrument(skip(self, slots, input))]
    pub async fn add_code(
        &self,
        slots: &mut RewardSlots,
        input: &str,
        wallet_address: Option<&str>,
    ) -> Result<bool, Error> {
        let code = ActivationCode::parse(input)?;
        if slots.contains(code.hash()) {
            return Ok(false);
        }
        if slots.is_full() {
            return Err(Error::SlotsFull(REWARD_SLOT_COUNT));
        }
        self.backend.verify(&code, wallet_address).await?;
        let added = slots.insert(code.hash())?;
        if let Some(wallet_address) = wallet_address {
            if let Err(error) = self.backend.save_code(code.hash(), wallet_address).await {
                warn!(%error, "could not save the code on the backend");
            }
        }
        info!(filled = slots.len(), "reward code added");
        Ok(added)
    }

    /// Exchanges the five collected codes for a reward paid to `wallet_address`, then
    /// empties `slots`.
    #[instrument(skip(self, slots))]
    pub async fn claim(
        &self,
        slots: &mut RewardSlots,
        wallet_address: &str,
    ) -> Result<RewardClaim, Error> {
        let wallet_address = wallet_address.trim();
        if !slots.is_full() {
            return Err(Error::NotEnoughCodes {
                missing: REWARD_SLOT_COUNT - slots.len(),
            });
        }
        if !is_hex_address(wallet_address) {
            return Err(Error::InvalidAddress(wallet_address.to_string()));
        }
        let tx_hash = self
            .backend
            .claim_reward(wallet_address, slots.codes())
            .await?;
        slots.clear();
        let referral_count = match self.backend.referral_count(wallet_address).await {
            Ok(Some(count)) => count,
            Ok(None) => DEFAULT_REFERRAL_COUNT.to_string(),
            Err(error) => {
                warn!(%error, "could not read the referral count");
                DEFAULT_REFERRAL_COUNT.to_string()
            }
        };
        info!(?tx_hash, %referral_count, "reward claimed");
        Ok(RewardClaim {
            tx_hash,
            referral_count,
        })
    }

    /// Returns the referral counts of every address, highest first.
    pub async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, Error> {
        let mut entries = self.backend.leaderboard().await?;
        entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.address.cmp(&b.address)));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn test_slots_reject_a_sixth_code() {
        let mut slots = RewardSlots::default();
        for index in 0..REWARD_SLOT_COUNT {
            assert!(slots.insert(&format!("{index:064}")).unwrap());
        }
        assert!(!slots.insert(&format!("{:064}", 0)).unwrap());
        assert_matches!(slots.insert(&"f".repeat(64)), Err(Error::SlotsFull(5)));
        assert_eq!(slots.len(), 5);
    }
}
