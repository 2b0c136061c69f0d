// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

//! Shape checks applied to user input before any request is made.

/// Returns whether `value` is a `0x`-prefixed, 20-byte hex address.
pub fn is_hex_address(value: &str) -> bool {
    is_prefixed_hex(value.trim(), 40)
}

/// Returns whether `value` is a `0x`-prefixed, 32-byte hex transaction hash.
pub fn is_hex_tx_hash(value: &str) -> bool {
    is_prefixed_hex(value.trim(), 64)
}

fn is_prefixed_hex(value: &str, digits: usize) -> bool {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .is_some_and(|rest| rest.len() == digits && rest.bytes().all(|b| b.is_ascii_hexdigit()))
}
