// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

//! What the client remembers between runs.

use std::path::Path;

use serde::{Deserialize, Serialize};
use whale_vault_persistent::{self as persistent, Persist};

use crate::{
    data_types::{Binding, Role},
    reward::RewardSlots,
    Error,
};

/// The wallet, role and book remembered after resolving a code, and the codes collected
/// toward a referral reward.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub address: Option<String>,
    pub role: Option<Role>,
    pub code_hash: Option<String>,
    pub book_address: Option<String>,
    #[serde(default)]
    pub reward_slots: RewardSlots,
}

impl Session {
    /// Remembers a resolved binding. Addresses the binding does not carry are kept.
    pub fn record_binding(&mut self, binding: &Binding) {
        self.role = Some(binding.role);
        self.code_hash = Some(binding.code_hash.clone());
        if let Some(address) = &binding.reader_address {
            self.address = Some(address.clone());
        }
        if let Some(book_address) = &binding.book_address {
            self.book_address = Some(book_address.clone());
        }
    }

    /// Forgets the wallet and the last resolved code, keeping the collected reward codes.
    pub fn sign_out(&mut self) {
        self.address = None;
        self.role = None;
        self.code_hash = None;
        self.book_address = None;
    }
}

/// Records `binding` in a persisted session and saves it.
pub fn record_binding<P>(session: &mut P, binding: &Binding)
where
    P: Persist<Target = Session>,
{
    Persist::mutate(session).record_binding(binding);
}

/// Opens the session file at `path`, starting an empty session if there is none.
pub fn open_session_file(path: &Path) -> Result<persistent::File<Session>, Error> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs_err::create_dir_all(parent).map_err(|error| Error::Persistence(error.to_string()))?;
    }
    persistent::File::read_or_create(path, || Ok(Session::default()))
        .map_err(|error| Error::Persistence(format!("{error:#}")))
}

#[cfg(test)]
mod tests {
    use whale_vault_persistent::Memory;

    use super::*;

    fn binding(reader_address: Option<&str>) -> Binding {
        Binding {
            code_hash: "ab".repeat(32),
            role: Role::Reader,
            reader_address: reader_address.map(str::to_string),
            book_address: Some("0xBook".to_string()),
        }
    }

    #[test]
    fn test_binding_without_address_keeps_wallet() {
        let mut session = Memory::new(Session {
            address: Some("0xWallet".to_string()),
            ..Session::default()
        });
        record_binding(&mut session, &binding(None));
        assert_eq!(session.address.as_deref(), Some("0xWallet"));
        assert_eq!(session.role, Some(Role::Reader));
        assert_eq!(session.book_address.as_deref(), Some("0xBook"));
        assert_eq!(session.saves(), 1);

        record_binding(&mut session, &binding(Some("0xReader")));
        assert_eq!(session.address.as_deref(), Some("0xReader"));
    }

    #[test]
    fn test_session_file_round_trip() -> Result<(), Error> {
        let directory = tempfile::tempdir().map_err(|error| Error::Persistence(error.to_string()))?;
        let path = directory.path().join("state").join("session.json");
        {
            let mut file = open_session_file(&path)?;
            record_binding(&mut file, &binding(Some("0xReader")));
        }
        let file = open_session_file(&path)?;
        assert_eq!(file.address.as_deref(), Some("0xReader"));
        assert_eq!(file.code_hash.as_deref(), Some("ab".repeat(32).as_str()));
        Ok(())
    }
}
