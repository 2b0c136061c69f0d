// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

//! Sponsored mint submission and confirmation polling.
//!
//! A confirmation goes through `Submitting`, then `Polling`, and ends `Confirmed`,
//! `Failed` or `TimedOut`. A timeout is not a failure: the transaction may still land, and
//! [`MintConfirmation::poll_until_final`] can be called again for the same hash.

use tracing::{info, instrument, warn};
use whale_vault_base::{Clock, PollOutcome, PollPolicy};

use crate::{
    backend::Backend,
    data_types::{MintOutcome, MintRequest, MintState, StatusReport, TxStatus},
    Error,
};

/// The message used when a failed transaction comes without explanation.
const DEFAULT_FAILURE_MESSAGE: &str = "the mint transaction failed on chain";

/// Submits mint requests and waits for their transactions to become final.
pub struct MintConfirmation<B, C> {
    backend: B,
    clock: C,
    policy: PollPolicy,
}

impl<B, C> MintConfirmation<B, C>
where
    B: Backend,
    C: Clock,
{
    /// Creates a poller using the default budget of 30 queries, 2 seconds apart.
    pub fn new(backend: B, clock: C) -> Self {
        Self::with_policy(backend, clock, PollPolicy::default())
    }

    pub fn with_policy(backend: B, clock: C, policy: PollPolicy) -> Self {
        Self {
            backend,
            clock,
            policy,
        }
    }

    pub fn policy(&self) -> &PollPolicy {
        &self.policy
    }

    /// Submits `request` and returns the hash of the relayed transaction.
    ///
    /// Fails with [`Error::MintRequestRejected`] if the backend refuses the request or
    /// returns no hash.
    #[instrument(skip(self))]
    pub async fn mint(&self, request: &MintRequest) -> Result<String, Error> {
        request.validate()?;
        let tx_hash = self.backend.mint(request).await?;
        if tx_hash.trim().is_empty() {
            return Err(Error::MintRequestRejected(
                "the relay returned no transaction hash".to_string(),
            ));
        }
        info!(%tx_hash, "mint request accepted");
        Ok(tx_hash)
    }

    /// Queries the status of `tx_hash` at most `max_attempts` times and stops at the first
    /// success or failure.
    pub async fn poll_until_final(
        &self,
        tx_hash: &str,
        max_attempts: u32,
    ) -> Result<MintOutcome, Error> {
        self.poll_with_progress(tx_hash, max_attempts, None, |_| {})
            .await
    }

    /// Like [`Self::poll_until_final`], reporting each step to `progress`. The outcome
    /// names `fallback_reader` when the backend does not say who received the token.
    ///
    /// Failing queries are logged and count against the budget. A budget of 0 is
    /// rejected with [`Error::InvalidPollBudget`] before any query.
    #[instrument(skip(self, progress))]
    pub async fn poll_with_progress<F>(
        &self,
        tx_hash: &str,
        max_attempts: u32,
        fallback_reader: Option<&str>,
        mut progress: F,
    ) -> Result<MintOutcome, Error>
    where
        F: FnMut(&MintState),
    {
        if max_attempts == 0 {
            return Err(Error::InvalidPollBudget(max_attempts));
        }
        let policy = self.policy.with_max_attempts(max_attempts);
        let outcome = policy
            .run(
                &self.clock,
                |attempt| {
                    progress(&MintState::Polling {
                        tx_hash: tx_hash.to_string(),
                        attempt,
                    });
                    self.backend.transaction_status(tx_hash)
                },
                |report: &StatusReport| report.status.is_terminal(),
            )
            .await;
        match outcome {
            PollOutcome::Terminal { value, attempts } => {
                if value.status == TxStatus::Failed {
                    warn!(attempts, "mint transaction failed");
                    progress(&MintState::Failed {
                        tx_hash: tx_hash.to_string(),
                    });
                    return Err(Error::MintFailed {
                        tx_hash: tx_hash.to_string(),
                        message: value
                            .error
                            .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string()),
                    });
                }
                let outcome = MintOutcome {
                    tx_hash: tx_hash.to_string(),
                    status: value.status,
                    token_id: value.token_id,
                    reader: value.reader.or_else(|| fallback_reader.map(str::to_string)),
                };
                info!(attempts, token_id = ?outcome.token_id, "mint confirmed");
                progress(&MintState::Confirmed(outcome.clone()));
                Ok(outcome)
            }
            PollOutcome::Exhausted { attempts } => {
                warn!(attempts, "mint transaction still pending");
                progress(&MintState::TimedOut {
                    tx_hash: tx_hash.to_string(),
                });
                Err(Error::ConfirmationTimeout {
                    tx_hash: tx_hash.to_string(),
                    attempts,
                })
            }
        }
    }

    /// Submits `request`, then polls with the configured budget.
    pub async fn mint_and_confirm<F>(
        &self,
        request: &MintRequest,
        mut progress: F,
    ) -> Result<MintOutcome, Error>
    where
        F: FnMut(&MintState),
    {
        progress(&MintState::Submitting);
        let tx_hash = self.mint(request).await?;
        self.poll_with_progress(
            &tx_hash,
            self.policy.max_attempts,
            Some(&request.reader_address),
            progress,
        )
        .await
    }
}

/// One confirmation attempt, as shown on a single screen.
///
/// A session submits at most one mint. Once a transaction hash is known, the session
/// only refreshes its status.
#[derive(Debug, Default)]
pub struct ConfirmationSession {
    started: bool,
    tx_hash: Option<String>,
    reader: Option<String>,
}

impl ConfirmationSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tx_hash(&self) -> Option<&str> {
        self.tx_hash.as_deref()
    }

    /// Submits `request` and waits for the result.
    ///
    /// Fails with [`Error::AlreadyStarted`] if this session already submitted a mint. A
    /// rejected submission leaves nothing in flight, so the session may be run again.
    pub async fn run<B, C, F>(
        &mut self,
        confirmation: &MintConfirmation<B, C>,
        request: &MintRequest,
        mut progress: F,
    ) -> Result<MintOutcome, Error>
    where
        B: Backend,
        C: Clock,
        F: FnMut(&MintState),
    {
        if self.started {
            return Err(Error::AlreadyStarted);
        }
        self.started = true;
        progress(&MintState::Submitting);
        let tx_hash = match confirmation.mint(request).await {
            Ok(tx_hash) => tx_hash,
            Err(error) => {
                self.started = false;
                return Err(error);
            }
        };
        self.tx_hash = Some(tx_hash.clone());
        self.reader = Some(request.reader_address.clone());
        confirmation
            .poll_with_progress(
                &tx_hash,
                confirmation.policy().max_attempts,
                Some(&request.reader_address),
                progress,
            )
            .await
    }

    /// Polls the known transaction again, for instance after a timeout. The outcome names
    /// the same reader as the first run.
    pub async fn refresh<B, C>(
        &self,
        confirmation: &MintConfirmation<B, C>,
    ) -> Result<MintOutcome, Error>
    where
        B: Backend,
        C: Clock,
    {
        let tx_hash = self
            .tx_hash
            .as_deref()
            .ok_or(Error::MissingField("tx_hash"))?;
        confirmation
            .poll_with_progress(
                tx_hash,
                confirmation.policy().max_attempts,
                self.reader.as_deref(),
                |_| {},
            )
            .await
    }
}
