// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

//! Command-line client for Whale Vault.

use std::{path::PathBuf, process::ExitCode};

use anyhow::{bail, Context as _, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use whale_vault_client::{
    client_context::ClientContext,
    config::ClientConfig,
    data_types::MintRequest,
    session::record_binding,
    top_up::Reconciliation,
    Error, ErrorKind,
};
use whale_vault_persistent::Persist;

/// Whale Vault client
#[derive(Parser, Debug)]
#[command(name = "whale-vault", version)]
struct Options {
    /// Read the client settings from this JSON file instead of the flags below, if it
    /// exists.
    #[arg(long = "config", env = "WHALE_VAULT_CONFIG")]
    config_path: Option<PathBuf>,

    #[command(flatten)]
    client: ClientConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Verify an activation code, or the text of a scanned QR code, and remember its
    /// binding
    Resolve {
        code: String,

        /// The wallet address to verify the code for
        #[arg(long)]
        address: Option<String>,
    },

    /// Mint the NFT of a book to a reader and wait until the transaction is final
    Mint {
        /// The book contract, by default the one of the last resolved code
        #[arg(long)]
        book: Option<String>,

        /// The reader wallet, by default the one of the last resolved code
        #[arg(long)]
        reader: Option<String>,

        /// Print the transaction hash without waiting for confirmation
        #[arg(long)]
        no_wait: bool,
    },

    /// Query the status of a relayed transaction until it is final
    Status {
        tx_hash: String,

        /// The maximum number of queries, by default the configured poll budget
        #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
        attempts: Option<u32>,
    },

    /// Credit stablecoins to an address and refresh its balance
    Recharge {
        #[arg(long)]
        to: String,

        /// The amount, in the token's smallest unit
        #[arg(long)]
        amount: u64,
    },

    /// Find the ERC-20 token moved by a transaction
    InferToken {
        tx_hash: String,

        /// Prefer the transfer credited to this address
        #[arg(long)]
        owner: Option<String>,
    },

    /// Read the ERC-20 balance of an address
    Balance {
        #[arg(long)]
        token: String,

        #[arg(long)]
        owner: String,
    },

    /// Collect codes toward the referral reward
    #[command(subcommand)]
    Reward(RewardCommand),

    /// Show the referral leaderboard
    Leaderboard,

    /// Forget the wallet and role of the last resolved code
    SignOut,

    /// Manage the configuration file
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Subcommand, Debug)]
enum RewardCommand {
    /// Verify a code and add it to the reward slots
    Add {
        code: String,

        /// The wallet collecting the reward, by default the remembered one
        #[arg(long)]
        wallet: Option<String>,
    },

    /// Exchange five collected codes for a reward
    Claim {
        /// The wallet receiving the reward, by default the remembered one
        #[arg(long)]
        wallet: Option<String>,
    },

    /// Show the collected codes
    Show,
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the settings given by flags and environment to a file
    Init {
        #[arg(long, default_value = "whale-vault.json")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let options = Options::parse();
    whale_vault_base::tracing::init("whale-vault");

    let result = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the runtime")
        .and_then(|runtime| runtime.block_on(options.run()));
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => report(&error),
    }
}

/// Prints `error` and picks the exit status: 2 when the outcome is unknown and the
/// status should be refreshed later, 1 otherwise.
fn report(error: &anyhow::Error) -> ExitCode {
    eprintln!("Error: {error:#}");
    let Some(error) = error.downcast_ref::<Error>() else {
        return ExitCode::FAILURE;
    };
    eprintln!("{}", error.user_message());
    match error.kind() {
        ErrorKind::Ambiguous => ExitCode::from(2),
        ErrorKind::Terminal | ErrorKind::Retryable | ErrorKind::NonFatal => ExitCode::FAILURE,
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

impl Options {
    fn client_config(&self) -> Result<ClientConfig> {
        if let Some(path) = self.config_path.as_ref().filter(|path| path.exists()) {
            return ClientConfig::read(path)
                .with_context(|| format!("reading the configuration {}", path.display()));
        }
        self.client.validate()?;
        Ok(self.client.clone())
    }

    async fn run(self) -> Result<()> {
        if let Command::Config(ConfigCommand::Init { output, force }) = &self.command {
            if output.exists() && !force {
                bail!("{} already exists, pass --force to overwrite it", output.display());
            }
            self.client.validate()?;
            self.client.write(output)?;
            eprintln!("Configuration written to {}", output.display());
            return Ok(());
        }

        let context = ClientContext::new(self.client_config()?)?;
        match self.command {
            Command::Resolve { code, address } => {
                let mut session = context.open_session()?;
                let address = address.or_else(|| session.address.clone());
                let binding = context
                    .resolver()
                    .resolve(&code, address.as_deref())
                    .await?;
                record_binding(&mut session, &binding);
                print_json(&binding)
            }

            Command::Mint {
                book,
                reader,
                no_wait,
            } => {
                let session = context.open_session()?;
                let book = book
                    .or_else(|| session.book_address.clone())
                    .context("no book address: pass --book or resolve a code first")?;
                let reader = reader
                    .or_else(|| session.address.clone())
                    .context("no reader address: pass --reader or resolve a code first")?;
                drop(session);
                let request = MintRequest::new(book, reader);
                let confirmation = context.mint_confirmation();
                if no_wait {
                    let tx_hash = confirmation.mint(&request).await?;
                    return print_json(&json!({ "tx_hash": tx_hash }));
                }
                let outcome = confirmation
                    .mint_and_confirm(&request, |state| eprintln!("{state}"))
                    .await?;
                print_json(&outcome)
            }

            Command::Status { tx_hash, attempts } => {
                let confirmation = context.mint_confirmation();
                let attempts = attempts.unwrap_or(confirmation.policy().max_attempts);
                let outcome = confirmation
                    .poll_with_progress(&tx_hash, attempts, None, |state| eprintln!("{state}"))
                    .await?;
                print_json(&outcome)
            }

            Command::Recharge { to, amount } => {
                let outcome = context
                    .top_up()
                    .recharge(&to, amount, |balance| {
                        eprintln!("New balance: {} {}", balance.balance, balance.symbol)
                    })
                    .await?;
                let reconciliation = match &outcome.reconciliation {
                    Reconciliation::Inferred(balance) => json!({ "inferred": balance }),
                    Reconciliation::DefaultToken(balance) => json!({ "default_token": balance }),
                    Reconciliation::Skipped => json!("skipped"),
                    Reconciliation::Failed(error) => {
                        eprintln!("{}", error.user_message());
                        json!({ "failed": error.to_string() })
                    }
                };
                print_json(&json!({
                    "tx_hash": outcome.tx_hash,
                    "reconciliation": reconciliation,
                }))
            }

            Command::InferToken { tx_hash, owner } => {
                let token = context
                    .receipt_inferencer()
                    .infer_token_from_receipt(&tx_hash, owner.as_deref())
                    .await
                    .map_err(Error::from)?;
                if token.is_none() {
                    eprintln!("The transaction moved no ERC-20 token.");
                }
                print_json(&json!({ "token": token }))
            }

            Command::Balance { token, owner } => {
                let balance = context
                    .receipt_inferencer()
                    .read_token_meta_and_balance(&token, &owner)
                    .await
                    .map_err(Error::from)?;
                print_json(&balance)
            }

            Command::Reward(command) => {
                let mut session = context.open_session()?;
                let rewards = context.rewards();
                match command {
                    RewardCommand::Add { code, wallet } => {
                        let wallet = wallet.or_else(|| session.address.clone());
                        let mut slots = session.reward_slots.clone();
                        let added = rewards
                            .add_code(&mut slots, &code, wallet.as_deref())
                            .await?;
                        if !added {
                            eprintln!("This code is already collected.");
                        }
                        Persist::mutate(&mut session).reward_slots = slots;
                        print_json(&session.reward_slots)
                    }
                    RewardCommand::Claim { wallet } => {
                        let wallet = wallet
                            .or_else(|| session.address.clone())
                            .context("no wallet: pass --wallet or resolve a code first")?;
                        let mut slots = session.reward_slots.clone();
                        let claim = rewards.claim(&mut slots, &wallet).await?;
                        Persist::mutate(&mut session).reward_slots = slots;
                        print_json(&claim)
                    }
                    RewardCommand::Show => print_json(&session.reward_slots),
                }
            }

            Command::Leaderboard => print_json(&context.rewards().leaderboard().await?),

            Command::SignOut => {
                let mut session = context.open_session()?;
                Persist::mutate(&mut session).sign_out();
                eprintln!("Signed out.");
                Ok(())
            }

            Command::Config(_) => Ok(()),
        }
    }
}
