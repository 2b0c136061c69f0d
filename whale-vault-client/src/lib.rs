// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

//! This module provides the client side of Whale Vault: activation code resolution,
//! sponsored mints with confirmation polling, referral rewards and stablecoin top-ups.

pub mod backend;
pub mod client_context;
pub mod config;
pub mod data_types;
mod error;
pub mod http;
pub mod mint;
pub mod mock;
pub mod resolver;
pub mod reward;
pub mod session;
pub mod top_up;

/// Helper types for tests.
#[cfg(with_testing)]
pub mod test_utils;

pub use error::{Error, ErrorKind};
