// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

use alloy_primitives::{Address, U256};
use assert_matches::assert_matches;
use whale_vault_base::{clock::TestClock, BackoffPolicy};
use whale_vault_client::{
    test_utils::{BackendCall, ScriptedBackend},
    top_up::{Reconciliation, TopUp},
    Error, ErrorKind,
};
use whale_vault_ethereum::{
    client::EthereumClient,
    test_utils::{receipt, transfer_log, tx_hash, unrelated_log, ScriptedJsonRpc},
    ReceiptInferencer,
};

const OWNER: &str = "0x00000000000000000000000000000000000000aa";

type TestTopUp = TopUp<ScriptedBackend, EthereumClient<ScriptedJsonRpc>, TestClock>;

fn owner() -> Address {
    OWNER.parse().unwrap()
}

fn top_up(backend: &ScriptedBackend, rpc: &ScriptedJsonRpc) -> TestTopUp {
    let inferencer = ReceiptInferencer::with_policy(
        rpc.client(),
        TestClock::new(),
        BackoffPolicy::from_millis(&[1, 1]),
    );
    TopUp::new(backend.clone(), inferencer)
}

#[tokio::test]
async fn test_recharge_refreshes_inferred_token() -> anyhow::Result<()> {
    let token = Address::repeat_byte(0x07);
    let backend = ScriptedBackend::new();
    backend.push_recharge(Ok(tx_hash(0x11).to_string()));
    let rpc = ScriptedJsonRpc::new();
    rpc.push_receipt(None)
        .push_receipt(Some(&receipt(
            tx_hash(0x11),
            vec![
                transfer_log(Address::repeat_byte(0x01), owner(), Address::ZERO, U256::from(1)),
                transfer_log(token, Address::ZERO, owner(), U256::from(1_000_000)),
            ],
        )))
        .push_token(U256::from(1_000_000), 6, Some("USDT"));

    let mut refreshed = Vec::new();
    let outcome = top_up(&backend, &rpc)
        .recharge(OWNER, 1_000_000, |balance| refreshed.push(balance.clone()))
        .await?;

    assert_eq!(outcome.tx_hash, tx_hash(0x11).to_string());
    let balance = assert_matches!(outcome.reconciliation, Reconciliation::Inferred(balance) => balance);
    assert_eq!(balance.token, token);
    assert_eq!(balance.symbol, "USDT");
    assert_eq!(balance.balance, "1.0");
    assert_eq!(refreshed, vec![balance]);
    assert_eq!(
        backend.calls(),
        vec![BackendCall::Recharge {
            to: OWNER.to_string(),
            amount: 1_000_000,
        }]
    );
    assert_eq!(rpc.count("eth_getTransactionReceipt"), 2);
    Ok(())
}

#[tokio::test]
async fn test_receipt_without_transfer_is_not_fatal() -> anyhow::Result<()> {
    let backend = ScriptedBackend::new();
    backend.push_recharge(Ok(tx_hash(0x12).to_string()));
    let rpc = ScriptedJsonRpc::new();
    rpc.push_receipt(Some(&receipt(
        tx_hash(0x12),
        vec![unrelated_log(Address::repeat_byte(0x09))],
    )));

    let mut refreshes = 0;
    let outcome = top_up(&backend, &rpc)
        .recharge(OWNER, 5, |_| refreshes += 1)
        .await?;

    let error = assert_matches!(outcome.reconciliation, Reconciliation::Failed(error) => error);
    assert_matches!(error, Error::TokenInferenceFailed { .. });
    assert_eq!(error.kind(), ErrorKind::NonFatal);
    assert_eq!(refreshes, 0);
    assert_eq!(rpc.count("eth_call"), 0);
    Ok(())
}

#[tokio::test]
async fn test_unindexed_receipt_is_not_fatal() -> anyhow::Result<()> {
    let backend = ScriptedBackend::new();
    backend.push_recharge(Ok(tx_hash(0x13).to_string()));
    let rpc = ScriptedJsonRpc::new();

    let outcome = top_up(&backend, &rpc).recharge(OWNER, 5, |_| {}).await?;

    assert_matches!(
        outcome.reconciliation,
        Reconciliation::Failed(Error::TokenInferenceFailed { ref reason, .. })
            if reason.contains("not available")
    );
    assert_eq!(rpc.count("eth_getTransactionReceipt"), 3);
    Ok(())
}

#[tokio::test]
async fn test_malformed_hash_reads_default_token() -> anyhow::Result<()> {
    let token = Address::repeat_byte(0x07);
    let backend = ScriptedBackend::new();
    backend.push_recharge(Ok("0xAAA".to_string()));
    let rpc = ScriptedJsonRpc::new();
    rpc.push_token(U256::from(2_500_000), 6, Some("USDT"));

    let mut refreshes = 0;
    let outcome = top_up(&backend, &rpc)
        .with_default_token(Some(token.to_string()))
        .recharge(OWNER, 5, |_| refreshes += 1)
        .await?;

    let balance =
        assert_matches!(outcome.reconciliation, Reconciliation::DefaultToken(balance) => balance);
    assert_eq!(balance.balance, "2.5");
    assert_eq!(refreshes, 1);
    assert_eq!(rpc.count("eth_getTransactionReceipt"), 0);
    Ok(())
}

#[tokio::test]
async fn test_malformed_hash_without_default_token_is_skipped() -> anyhow::Result<()> {
    let backend = ScriptedBackend::new();
    backend.push_recharge(Ok("pending".to_string()));
    let rpc = ScriptedJsonRpc::new();

    let outcome = top_up(&backend, &rpc).recharge(OWNER, 5, |_| {}).await?;

    assert_matches!(outcome.reconciliation, Reconciliation::Skipped);
    assert!(outcome.reconciliation.balance().is_none());
    assert!(rpc.calls().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_invalid_input_rejected_before_any_request() {
    let backend = ScriptedBackend::new();
    let rpc = ScriptedJsonRpc::new();
    let top_up = top_up(&backend, &rpc);

    assert_matches!(
        top_up.recharge("0xReader", 5, |_| {}).await,
        Err(Error::InvalidAddress(_))
    );
    assert_matches!(
        top_up.recharge(OWNER, 0, |_| {}).await,
        Err(Error::InvalidAmount(_))
    );
    assert!(backend.calls().is_empty());
    assert!(rpc.calls().is_empty());
}

#[tokio::test]
async fn test_rejected_recharge_is_an_error() {
    let backend = ScriptedBackend::new();
    backend.push_recharge(Err(Error::Rejected("unauthorized".to_string())));
    let rpc = ScriptedJsonRpc::new();

    let result = top_up(&backend, &rpc).recharge(OWNER, 5, |_| {}).await;

    assert_matches!(result, Err(Error::Rejected(message)) if message == "unauthorized");
    assert!(rpc.calls().is_empty());
}
