// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

//! A backend answering from canned data, for demos without a relay.

use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use tracing::debug;
use whale_vault_base::{code::hash_code, ActivationCode};

use crate::{
    backend::Backend,
    data_types::{BindingRecord, LeaderboardEntry, MintRequest, Role, StatusReport, TxStatus},
    Error,
};

/// The book contract every demo code is bound to.
pub const DEMO_BOOK_ADDRESS: &str = "0xe250ae653190F2EDF3ac79FD9bdF2687A90CDE84";

/// The reader reported for transactions the demo backend did not relay itself.
pub const DEMO_READER_ADDRESS: &str = "0x5ad82cEB0A10153C06F1215B70d0a5dB97Ad9240";

const DEMO_LEADERBOARD: [(&str, u64); 3] = [
    ("0x5ad82cEB0A10153C06F1215B70d0a5dB97Ad9240", 17),
    ("0x8f3Cf7ad23Cd3CaDbD9735AFf958023239c6A063", 9),
    ("0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174", 4),
];

#[derive(Default)]
struct State {
    nonce: u64,
    mints: BTreeMap<String, MintRequest>,
    saved_codes: BTreeMap<String, Vec<String>>,
}

/// A demo backend: every code is valid, every mint succeeds at once.
///
/// The role follows the code's prefix: `pub…` for publishers, `auth…` for authors and
/// readers otherwise. Transaction hashes are derived from a counter, so runs repeat.
#[derive(Clone, Default)]
pub struct MockBackend(Arc<Mutex<State>>);

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// The codes saved so far for `wallet_address`.
    pub fn saved_codes(&self, wallet_address: &str) -> Vec<String> {
        self.lock()
            .saved_codes
            .get(&wallet_address.to_ascii_lowercase())
            .cloned()
            .unwrap_or_default()
    }

    fn fake_tx_hash(&self, purpose: &str) -> String {
        let mut state = self.lock();
        state.nonce += 1;
        format!("0x{}", hash_code(&format!("{purpose}:{}", state.nonce)))
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        // A panic while holding the lock leaves the state consistent.
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Derives a token id between 1 and 1000 from a transaction hash.
fn token_id_for(tx_hash: &str) -> String {
    let digits = tx_hash.trim_start_matches("0x");
    let prefix = digits.get(..4).unwrap_or(digits);
    let value = u32::from_str_radix(prefix, 16).unwrap_or(0);
    (value % 1000 + 1).to_string()
}

#[async_trait]
impl Backend for MockBackend {
    async fn verify(&self, code: &ActivationCode, _address: Option<&str>) -> Result<Role, Error> {
        let raw = code.raw().to_ascii_lowercase();
        let role = if raw.starts_with("pub") {
            Role::Publisher
        } else if raw.starts_with("auth") {
            Role::Author
        } else {
            Role::Reader
        };
        debug!(%role, "demo verification");
        Ok(role)
    }

    async fn get_binding(&self, code: &ActivationCode) -> Result<BindingRecord, Error> {
        let digits = code.hash().get(..40).unwrap_or(code.hash());
        Ok(BindingRecord {
            reader_address: Some(format!("0x{digits:0<40}")),
            book_address: Some(DEMO_BOOK_ADDRESS.to_string()),
        })
    }

    async fn mint(&self, request: &MintRequest) -> Result<String, Error> {
        let tx_hash = self.fake_tx_hash("mint");
        self.lock().mints.insert(tx_hash.clone(), request.clone());
        Ok(tx_hash)
    }

    async fn transaction_status(&self, tx_hash: &str) -> Result<StatusReport, Error> {
        let reader = self
            .lock()
            .mints
            .get(tx_hash)
            .map(|request| request.reader_address.clone())
            .unwrap_or_else(|| DEMO_READER_ADDRESS.to_string());
        Ok(StatusReport {
            status: TxStatus::Success,
            token_id: Some(token_id_for(tx_hash)),
            reader: Some(reader),
            error: None,
        })
    }

    async fn recharge(&self, _to: &str, _amount: u64) -> Result<String, Error> {
        Ok(self.fake_tx_hash("recharge"))
    }

    async fn save_code(&self, code_hash: &str, wallet_address: &str) -> Result<(), Error> {
        let mut state = self.lock();
        let codes = state
            .saved_codes
            .entry(wallet_address.to_ascii_lowercase())
            .or_default();
        if !codes.iter().any(|saved| saved == code_hash) {
            codes.push(code_hash.to_string());
        }
        Ok(())
    }

    async fn claim_reward(&self, dest: &str, _codes: &[String]) -> Result<Option<String>, Error> {
        self.lock().saved_codes.remove(&dest.to_ascii_lowercase());
        Ok(Some(self.fake_tx_hash("reward")))
    }

    async fn referral_count(&self, address: &str) -> Result<Option<String>, Error> {
        Ok(DEMO_LEADERBOARD
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(address))
            .map(|(_, count)| count.to_string()))
    }

    async fn leaderboard(&self) -> Result<Vec<LeaderboardEntry>, Error> {
        Ok(DEMO_LEADERBOARD
            .iter()
            .map(|(address, count)| LeaderboardEntry {
                address: address.to_string(),
                count: *count,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("pub-0001", Role::Publisher)]
    #[test_case("AUTH-7", Role::Author)]
    #[test_case("abc12345", Role::Reader)]
    #[tokio::test]
    async fn test_role_follows_prefix(code: &str, role: Role) {
        let code = ActivationCode::parse(code).unwrap();
        assert_eq!(MockBackend::new().verify(&code, None).await.unwrap(), role);
    }

    #[tokio::test]
    async fn test_minted_reader_is_reported() {
        let backend = MockBackend::new();
        let tx_hash = backend
            .mint(&MintRequest::new(DEMO_BOOK_ADDRESS, "0xReader"))
            .await
            .unwrap();
        assert_eq!(tx_hash.len(), 66);
        let report = backend.transaction_status(&tx_hash).await.unwrap();
        assert_eq!(report.status, TxStatus::Success);
        assert_eq!(report.reader.as_deref(), Some("0xReader"));
        assert_eq!(
            backend.transaction_status(&tx_hash).await.unwrap(),
            report
        );
    }

    #[tokio::test]
    async fn test_binding_is_derived_from_hash() {
        let code = ActivationCode::parse("abc12345").unwrap();
        let binding = MockBackend::new().get_binding(&code).await.unwrap();
        let reader = binding.reader_address.unwrap();
        assert_eq!(reader.len(), 42);
        assert_eq!(&reader[2..], &code.hash()[..40]);
    }
}
