// Copyright (c) Whale Vault
// SPDX-License-Identifier: Apache-2.0

use assert_matches::assert_matches;
use whale_vault_base::ActivationCode;
use whale_vault_client::{
    data_types::{LeaderboardEntry, Role},
    reward::{RewardProgram, RewardSlots, REWARD_SLOT_COUNT},
    test_utils::{BackendCall, ScriptedBackend},
    Error,
};

const WALLET: &str = "0x00000000000000000000000000000000000000aa";

async fn fill(
    program: &RewardProgram<ScriptedBackend>,
    backend: &ScriptedBackend,
    slots: &mut RewardSlots,
) -> anyhow::Result<()> {
    for index in 0..REWARD_SLOT_COUNT {
        backend.push_verify(Ok(Role::Reader));
        assert!(
            program
                .add_code(slots, &format!("book-{index}"), Some(WALLET))
                .await?
        );
    }
    Ok(())
}

#[tokio::test]
async fn test_five_codes_are_exchanged_for_a_reward() -> anyhow::Result<()> {
    let backend = ScriptedBackend::new();
    let program = RewardProgram::new(backend.clone());
    let mut slots = RewardSlots::default();
    fill(&program, &backend, &mut slots).await?;
    assert!(slots.is_full());
    assert_eq!(backend.count("save_code"), REWARD_SLOT_COUNT);

    backend
        .push_claim_reward(Ok(Some("0xBBB".to_string())))
        .push_referral_count(Ok(Some("3".to_string())));
    let claim = program.claim(&mut slots, WALLET).await?;

    assert_eq!(claim.tx_hash.as_deref(), Some("0xBBB"));
    assert_eq!(claim.referral_count, "3");
    assert!(slots.is_empty());
    let expected_codes = (0..REWARD_SLOT_COUNT)
        .map(|index| {
            ActivationCode::parse(&format!("book-{index}")).map(|code| code.hash().to_string())
        })
        .collect::<Result<Vec<_>, _>>()?;
    assert_matches!(
        backend.calls().iter().find(|call| call.method() == "claim_reward"),
        Some(BackendCall::ClaimReward { dest, codes }) if dest == WALLET && codes == &expected_codes
    );
    Ok(())
}

#[tokio::test]
async fn test_duplicate_code_fills_no_slot() -> anyhow::Result<()> {
    let backend = ScriptedBackend::new();
    backend.push_verify(Ok(Role::Reader));
    let program = RewardProgram::new(backend.clone());
    let mut slots = RewardSlots::default();

    assert!(program.add_code(&mut slots, "book-1", None).await?);
    assert!(!program.add_code(&mut slots, " book-1 ", None).await?);

    assert_eq!(slots.len(), 1);
    assert_eq!(backend.count("verify"), 1);
    assert_eq!(backend.count("save_code"), 0);
    Ok(())
}

#[tokio::test]
async fn test_rejected_code_fills_no_slot() {
    let backend = ScriptedBackend::new();
    backend.push_verify(Err(Error::InvalidCode {
        message: "already used".to_string(),
    }));
    let program = RewardProgram::new(backend.clone());
    let mut slots = RewardSlots::default();

    let result = program.add_code(&mut slots, "book-1", Some(WALLET)).await;

    assert_matches!(result, Err(Error::InvalidCode { .. }));
    assert!(slots.is_empty());
    assert_eq!(backend.count("save_code"), 0);
}

#[tokio::test]
async fn test_failed_save_keeps_the_code() -> anyhow::Result<()> {
    let backend = ScriptedBackend::new();
    backend
        .push_verify(Ok(Role::Reader))
        .push_save_code(Err(Error::Network("timeout".to_string())));
    let program = RewardProgram::new(backend.clone());
    let mut slots = RewardSlots::default();

    assert!(program.add_code(&mut slots, "book-1", Some(WALLET)).await?);
    assert_eq!(slots.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_claim_needs_five_codes_and_a_wallet() -> anyhow::Result<()> {
    let backend = ScriptedBackend::new();
    let program = RewardProgram::new(backend.clone());
    let mut slots = RewardSlots::default();
    backend.push_verify(Ok(Role::Reader));
    program.add_code(&mut slots, "book-1", None).await?;

    assert_matches!(
        program.claim(&mut slots, WALLET).await,
        Err(Error::NotEnoughCodes { missing: 4 })
    );

    let mut full = RewardSlots::default();
    fill(&program, &backend, &mut full).await?;
    assert_matches!(
        program.claim(&mut full, "0xReader").await,
        Err(Error::InvalidAddress(_))
    );
    assert_eq!(full.len(), REWARD_SLOT_COUNT);
    assert_eq!(backend.count("claim_reward"), 0);
    Ok(())
}

#[tokio::test]
async fn test_unknown_referral_count_defaults_to_one() -> anyhow::Result<()> {
    let backend = ScriptedBackend::new();
    let program = RewardProgram::new(backend.clone());
    let mut slots = RewardSlots::default();
    fill(&program, &backend, &mut slots).await?;
    backend
        .push_claim_reward(Ok(None))
        .push_referral_count(Err(Error::Network("timeout".to_string())));

    let claim = program.claim(&mut slots, WALLET).await?;

    assert_eq!(claim.tx_hash, None);
    assert_eq!(claim.referral_count, "1");
    Ok(())
}

#[tokio::test]
async fn test_leaderboard_is_sorted() -> anyhow::Result<()> {
    let entry = |address: &str, count| LeaderboardEntry {
        address: address.to_string(),
        count,
    };
    let backend = ScriptedBackend::new();
    backend.push_leaderboard(Ok(vec![entry("0xb", 2), entry("0xc", 9), entry("0xa", 2)]));

    let entries = RewardProgram::new(backend).leaderboard().await?;

    assert_eq!(entries, vec![entry("0xc", 9), entry("0xa", 2), entry("0xb", 2)]);
    Ok(())
}
