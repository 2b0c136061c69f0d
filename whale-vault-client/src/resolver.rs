// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

use tracing::{info, instrument, warn};
use whale_vault_base::ActivationCode;

use crate::{backend::Backend, data_types::Binding, Error};

/// Resolves scanned activation codes into bindings.
///
/// Verification is a hard gate: its failure fails the resolution. The binding lookup
/// that follows only enriches the result, and its failure is logged and ignored.
pub struct BindingResolver<B> {
    backend: B,
}

impl<B: Backend> BindingResolver<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Parses `input` as an activation code, then resolves it.
    pub async fn resolve(&self, input: &str, address: Option<&str>) -> Result<Binding, Error> {
        let code = ActivationCode::parse(input)?;
        self.resolve_code(&code, address).await
    }

    /// Verifies `code`, then looks up the addresses already bound to it. The two requests
    /// are sequential.
    #[instrument(skip(self, code), fields(code_hash = %code.hash()))]
    pub async fn resolve_code(
        &self,
        code: &ActivationCode,
        address: Option<&str>,
    ) -> Result<Binding, Error> {
        let role = self.backend.verify(code, address).await?;
        let record = match self.backend.get_binding(code).await {
            Ok(record) => record,
            Err(error) => {
                warn!(%error, "binding lookup failed, continuing without it");
                Default::default()
            }
        };
        info!(%role, "activation code resolved");
        Ok(Binding {
            code_hash: code.hash().to_string(),
            role,
            reader_address: record.reader_address,
            book_address: record.book_address,
        })
    }
}
