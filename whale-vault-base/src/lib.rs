// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

//! Definitions shared by the Whale Vault client crates.

pub mod clock;
pub mod code;
pub mod retry;
pub mod tracing;
pub mod validation;

pub use clock::{Clock, WallClock};
pub use code::{ActivationCode, CodeError};
pub use retry::{BackoffPolicy, Exhausted, PollOutcome, PollPolicy};
