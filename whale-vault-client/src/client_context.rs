// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use tracing::info;
use whale_vault_base::{Clock, WallClock};
use whale_vault_ethereum::{provider::HttpEthereumClient, EthereumQueries, ReceiptInferencer};

use crate::{
    backend::{AnyBackend, Backend},
    config::{BackendMode, ClientConfig},
    http::HttpBackend,
    mint::MintConfirmation,
    mock::MockBackend,
    resolver::BindingResolver,
    reward::RewardProgram,
    session::{open_session_file, Session},
    top_up::TopUp,
    Error,
};

/// The backend as shared by every component of a context.
pub type SharedBackend = Arc<dyn Backend>;

/// The chain access as shared by every component of a context.
pub type SharedQueries = Arc<dyn EthereumQueries>;

/// The clock as shared by every component of a context.
pub type SharedClock = Arc<dyn Clock>;

/// Builds the components of a client from one configuration, sharing a single backend,
/// chain connection and clock between them.
pub struct ClientContext {
    config: ClientConfig,
    backend: SharedBackend,
    queries: SharedQueries,
    clock: SharedClock,
}

impl ClientContext {
    /// Connects to the backend and the chain named by `config`.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        config.validate()?;
        let backend: AnyBackend = match config.mode {
            BackendMode::Real => HttpBackend::new(
                &config.backend_url,
                config.timeout(),
                config.admin_api_key.clone(),
            )?
            .into(),
            BackendMode::Mock => MockBackend::new().into(),
        };
        let queries = HttpEthereumClient::connect_with_timeout(&config.rpc_url, config.timeout())?;
        info!(mode = ?config.mode, backend_url = %config.backend_url, rpc_url = %config.rpc_url, "client ready");
        Ok(Self::from_parts(
            config,
            Arc::new(backend),
            Arc::new(queries),
            Arc::new(WallClock),
        ))
    }

    /// Assembles a context from existing parts.
    pub fn from_parts(
        config: ClientConfig,
        backend: SharedBackend,
        queries: SharedQueries,
        clock: SharedClock,
    ) -> Self {
        Self {
            config,
            backend,
            queries,
            clock,
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn backend(&self) -> &SharedBackend {
        &self.backend
    }

    pub fn resolver(&self) -> BindingResolver<SharedBackend> {
        BindingResolver::new(self.backend.clone())
    }

    pub fn mint_confirmation(&self) -> MintConfirmation<SharedBackend, SharedClock> {
        MintConfirmation::with_policy(
            self.backend.clone(),
            self.clock.clone(),
            self.config.poll_policy(),
        )
    }

    pub fn receipt_inferencer(&self) -> ReceiptInferencer<SharedQueries, SharedClock> {
        ReceiptInferencer::with_policy(
            self.queries.clone(),
            self.clock.clone(),
            self.config.backoff_policy(),
        )
    }

    pub fn top_up(&self) -> TopUp<SharedBackend, SharedQueries, SharedClock> {
        TopUp::new(self.backend.clone(), self.receipt_inferencer())
            .with_default_token(self.config.default_token.clone())
    }

    pub fn rewards(&self) -> RewardProgram<SharedBackend> {
        RewardProgram::new(self.backend.clone())
    }

    /// Opens the configured session file.
    pub fn open_session(&self) -> Result<whale_vault_persistent::File<Session>, Error> {
        open_session_file(&self.config.session_path())
    }
}
