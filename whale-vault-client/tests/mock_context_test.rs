// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

use whale_vault_client::{
    client_context::ClientContext,
    config::{BackendMode, ClientConfig},
    data_types::{MintRequest, Role, TxStatus},
    mock::DEMO_BOOK_ADDRESS,
    reward::RewardSlots,
    session::record_binding,
};

fn mock_config(directory: &tempfile::TempDir) -> ClientConfig {
    ClientConfig {
        mode: BackendMode::Mock,
        session_path: Some(directory.path().join("session.json")),
        ..ClientConfig::default()
    }
}

#[tokio::test]
async fn test_demo_flow_without_relay() -> anyhow::Result<()> {
    let directory = tempfile::tempdir()?;
    let context = ClientContext::new(mock_config(&directory))?;

    let binding = context.resolver().resolve("abc12345", None).await?;
    assert_eq!(binding.role, Role::Reader);
    assert_eq!(binding.book_address.as_deref(), Some(DEMO_BOOK_ADDRESS));

    let reader = binding.reader_address.clone().unwrap_or_default();
    let outcome = context
        .mint_confirmation()
        .mint_and_confirm(&MintRequest::new(DEMO_BOOK_ADDRESS, reader.clone()), |_| {})
        .await?;
    assert_eq!(outcome.status, TxStatus::Success);
    assert_eq!(outcome.reader, Some(reader.clone()));

    {
        let mut session = context.open_session()?;
        record_binding(&mut session, &binding);
    }
    let session = context.open_session()?;
    assert_eq!(session.address.as_deref(), Some(reader.as_str()));
    assert_eq!(session.role, Some(Role::Reader));
    Ok(())
}

#[tokio::test]
async fn test_demo_roles_and_rewards() -> anyhow::Result<()> {
    let directory = tempfile::tempdir()?;
    let context = ClientContext::new(mock_config(&directory))?;

    let binding = context.resolver().resolve("pub-0042", None).await?;
    assert_eq!(binding.role, Role::Publisher);

    let wallet = "0x5ad82cEB0A10153C06F1215B70d0a5dB97Ad9240";
    let rewards = context.rewards();
    let mut slots = RewardSlots::default();
    for index in 0..5 {
        rewards
            .add_code(&mut slots, &format!("reader-{index}"), Some(wallet))
            .await?;
    }
    let claim = rewards.claim(&mut slots, wallet).await?;
    assert!(claim.tx_hash.is_some());
    assert_eq!(claim.referral_count, "17");

    let leaderboard = rewards.leaderboard().await?;
    assert_eq!(leaderboard.len(), 3);
    assert!(leaderboard.windows(2).all(|pair| pair[0].count >= pair[1].count));
    Ok(())
}
