// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

//! Activation codes printed in books, and their canonical hashes.

use std::{fmt, str::FromStr};

use sha2::{Digest as _, Sha256};
use thiserror::Error;

/// The path segment preceding the code hash in the URLs encoded in book QR codes.
const SCAN_PATH_MARKER: &str = "/valut_mint_nft/";

/// The length of a hex-encoded SHA-256 digest.
const HASH_HEX_LENGTH: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CodeError {
    #[error("the activation code is empty")]
    Empty,
    #[error("no activation code hash found in scanned text: {0}")]
    MalformedScan(String),
}

/// An activation code together with the hash the backend knows it by.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ActivationCode {
    raw: String,
    hash: String,
}

impl ActivationCode {
    /// Parses user input: a raw printed code, an already hashed code, or the text of a
    /// scanned QR code pointing at the claim page.
    pub fn parse(input: &str) -> Result<Self, CodeError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(CodeError::Empty);
        }
        if let Some(position) = input.find(SCAN_PATH_MARKER) {
            let tail = &input[position + SCAN_PATH_MARKER.len()..];
            let segment = tail.split(['/', '?', '#']).next().unwrap_or_default();
            let digits = strip_hex_prefix(segment);
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(CodeError::MalformedScan(input.to_string()));
            }
            return Ok(Self {
                raw: segment.to_string(),
                hash: digits.to_ascii_lowercase(),
            });
        }
        let digits = strip_hex_prefix(input);
        if digits.len() == HASH_HEX_LENGTH && digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Ok(Self {
                raw: input.to_string(),
                hash: digits.to_ascii_lowercase(),
            });
        }
        Ok(Self {
            raw: input.to_string(),
            hash: hash_code(input),
        })
    }

    /// The code as it was entered or scanned.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The lowercase hex digest identifying the code on the backend.
    pub fn hash(&self) -> &str {
        &self.hash
    }
}

impl FromStr for ActivationCode {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ActivationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hash)
    }
}

/// Hashes a printed code the same way the code generator does.
pub fn hash_code(raw: &str) -> String {
    hex::encode(Sha256::digest(raw.as_bytes()))
}

fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}
