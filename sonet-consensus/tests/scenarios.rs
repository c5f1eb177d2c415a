//! End-to-end validation scenarios against the in-memory chain state

use sonet_consensus::{
    ChainFacts, CheckpointRegistry, ConsensusEngine, ConsensusError, ConsensusResult, DuplicateCounts,
    EnforcementPolicy, EngineConfig, LimitName, MemoryChainState, Network, Placement, ProviderError, Stage,
};
use sonet_core::{CandidateBlock, Height, Payload, SocialTransaction, TxType};
use std::collections::BTreeMap;
use tempfile::tempdir;

fn regtest() -> ConsensusEngine {
    ConsensusEngine::new(EngineConfig::for_network(Network::Regtest)).unwrap()
}

fn regtest_with(overrides: &[(LimitName, u64)]) -> ConsensusEngine {
    let mut config = EngineConfig::for_network(Network::Regtest);
    config.limit_overrides = overrides.iter().copied().collect::<BTreeMap<_, _>>();
    ConsensusEngine::new(config).unwrap()
}

fn user(hash: &str, address: &str, name: &str) -> SocialTransaction {
    SocialTransaction::new(hash, TxType::AccountUser, address).with_payload(Payload::with_name(name))
}

fn barter(hash: &str, address: &str) -> SocialTransaction {
    SocialTransaction::new(hash, TxType::BarteronAccount, address).with_payload(Payload::with_name("shop"))
}

fn connect(state: &mut MemoryChainState, transactions: Vec<SocialTransaction>) {
    let height = state.next_height();
    state
        .connect_block(CandidateBlock::new(height, transactions))
        .unwrap();
}

fn pool(state: &MemoryChainState) -> Placement<'static> {
    Placement::Mempool {
        height: state.next_height(),
    }
}

/// Provider that fails every read for one address
struct FailingFacts {
    inner: MemoryChainState,
    broken: &'static str,
}

impl FailingFacts {
    fn guard(&self, address: &str) -> Result<(), ProviderError> {
        if address == self.broken {
            return Err(ProviderError::Unavailable(format!("index for {} locked", address)));
        }
        Ok(())
    }
}

impl ChainFacts for FailingFacts {
    fn count_recent_duplicate_nicknames(
        &self,
        address: &str,
        height_floor: Height,
        nickname: &str,
    ) -> Result<DuplicateCounts, ProviderError> {
        self.guard(address)?;
        self.inner.count_recent_duplicate_nicknames(address, height_floor, nickname)
    }

    fn last_transaction_type(&self, address: &str, types: &[TxType]) -> Result<Option<TxType>, ProviderError> {
        self.guard(address)?;
        self.inner.last_transaction_type(address, types)
    }

    fn edit_count_since(&self, address: &str, types: &[TxType], height_floor: Height) -> Result<u64, ProviderError> {
        self.guard(address)?;
        self.inner.edit_count_since(address, types, height_floor)
    }

    fn pending_edit_exists(&self, address: &str, types: &[TxType]) -> Result<bool, ProviderError> {
        self.guard(address)?;
        self.inner.pending_edit_exists(address, types)
    }
}

#[test]
fn test_fresh_account_accepted() {
    let engine = regtest();
    let state = MemoryChainState::new();
    let tx = user("u1", "addr1", "bob123");

    let outcome = engine.accept(&tx, pool(&state), &state).unwrap();
    assert!(outcome.accepted, "{}", outcome);
    assert_eq!(outcome.stage, Stage::Mempool);

    let block = CandidateBlock::new(0, vec![tx.clone()]);
    let outcome = engine.accept(&tx, Placement::Block(&block), &state).unwrap();
    assert!(outcome.accepted, "{}", outcome);
    assert_eq!(outcome.stage, Stage::Block);
}

#[test]
fn test_same_nickname_in_block() {
    let state = MemoryChainState::new();
    let first = user("u1", "addr1", "bob123");
    let second = user("u2", "addr2", "BOB123");
    let block = CandidateBlock::new(0, vec![first.clone(), second.clone()]);

    let report = regtest().validate_block(&block, &state);
    let outcome = report.entries[1].outcome.as_ref().unwrap();
    assert_eq!(outcome.reason, ConsensusResult::NicknameDouble);
    assert_eq!(outcome.stage, Stage::Block);

    // Both claimants see each other
    let outcome = report.entries[0].outcome.as_ref().unwrap();
    assert_eq!(outcome.reason, ConsensusResult::NicknameDouble);

    let checkpoints = CheckpointRegistry::new().with_social("u2", TxType::AccountUser, ConsensusResult::NicknameDouble);
    let engine = ConsensusEngine::with_checkpoints(EngineConfig::for_network(Network::Regtest), checkpoints).unwrap();
    let outcome = engine.accept(&second, Placement::Block(&block), &state).unwrap();
    assert!(outcome.accepted, "{}", outcome);
}

#[test]
fn test_deleted_account_stays_deleted() {
    let engine = regtest();
    let mut state = MemoryChainState::new();
    connect(&mut state, vec![user("u1", "addr1", "alice")]);
    connect(&mut state, vec![SocialTransaction::new("d1", TxType::AccountDelete, "addr1")]);

    let edit = user("u2", "addr1", "alice");
    let outcome = engine.accept(&edit, pool(&state), &state).unwrap();
    assert_eq!(outcome.reason, ConsensusResult::AccountDeleted);
    assert_eq!(outcome.stage, Stage::Validate);

    // Non-account activity after the delete changes nothing
    connect(&mut state, vec![SocialTransaction::new("p1", TxType::ContentPost, "addr1")]);
    let outcome = engine.accept(&edit, pool(&state), &state).unwrap();
    assert_eq!(outcome.reason, ConsensusResult::AccountDeleted);

    let again = SocialTransaction::new("d2", TxType::AccountDelete, "addr1");
    let outcome = engine.accept(&again, pool(&state), &state).unwrap();
    assert_eq!(outcome.reason, ConsensusResult::AccountDeleted);
}

#[test]
fn test_delete_requires_registration() {
    let engine = regtest();
    let state = MemoryChainState::new();
    let delete = SocialTransaction::new("d1", TxType::AccountDelete, "addr1");

    let outcome = engine.accept(&delete, pool(&state), &state).unwrap();
    assert_eq!(outcome.reason, ConsensusResult::NotRegistered);
}

#[test]
fn test_oversized_payload() {
    let engine = regtest();
    let state = MemoryChainState::new();

    let mut payload = Payload::with_name("bob");
    payload.about = Some("a".repeat(2097));
    let tx = SocialTransaction::new("u1", TxType::AccountUser, "addr1").with_payload(payload);
    assert_eq!(tx.payload_size(), 2100);

    let outcome = engine.accept(&tx, pool(&state), &state).unwrap();
    assert_eq!(outcome.reason, ConsensusResult::ContentSizeLimit);
    assert_eq!(outcome.stage, Stage::Check);
}

#[test]
fn test_pending_barter_account() {
    let engine = regtest();
    let mut state = MemoryChainState::new();
    state.add_pending(barter("b1", "addr1")).unwrap();

    let outcome = engine.accept(&barter("b2", "addr1"), pool(&state), &state).unwrap();
    assert_eq!(outcome.reason, ConsensusResult::ManyTransactions);
    assert_eq!(outcome.stage, Stage::Mempool);

    let outcome = engine.accept(&barter("b3", "addr2"), pool(&state), &state).unwrap();
    assert!(outcome.accepted);
}

#[test]
fn test_barter_block_limit_shares_reason() {
    let engine = regtest();
    let state = MemoryChainState::new();
    let block = CandidateBlock::new(0, vec![barter("b1", "addr1"), barter("b2", "addr1")]);

    let report = engine.validate_block(&block, &state);
    for (_, outcome) in report.rejected() {
        assert_eq!(outcome.reason, ConsensusResult::ManyTransactions);
        assert_eq!(outcome.stage, Stage::Block);
    }
    assert_eq!(report.rejected().count(), 2);
}

#[test]
fn test_duplicate_nickname_window() {
    let engine = regtest_with(&[(LimitName::Depth, 5)]);
    let mut state = MemoryChainState::new();
    connect(&mut state, vec![user("u1", "addr1", "Alice")]);

    let claim = user("u2", "addr2", "alice");
    let outcome = engine.accept(&claim, pool(&state), &state).unwrap();
    assert_eq!(outcome.reason, ConsensusResult::NicknameDouble);
    assert_eq!(outcome.stage, Stage::Validate);

    for _ in 0..10 {
        connect(&mut state, Vec::new());
    }
    let outcome = engine.accept(&claim, pool(&state), &state).unwrap();
    assert!(outcome.accepted, "{}", outcome);
}

#[test]
fn test_edit_rate_limit() {
    let engine = regtest_with(&[(LimitName::EditAccountDailyCount, 2)]);
    let mut state = MemoryChainState::new();
    for i in 0..2 {
        connect(&mut state, vec![user(&format!("u{}", i), "addr1", "alice")]);
    }

    let edit = user("next", "addr1", "alice");
    assert!(engine.accept(&edit, pool(&state), &state).unwrap().accepted);

    connect(&mut state, vec![user("u2", "addr1", "alice")]);
    let outcome = engine.accept(&edit, pool(&state), &state).unwrap();
    assert_eq!(outcome.reason, ConsensusResult::ChangeInfoLimit);
}

#[test]
fn test_provider_fault_isolated() {
    let engine = regtest();
    let facts = FailingFacts {
        inner: MemoryChainState::new(),
        broken: "addr2",
    };
    let block = CandidateBlock::new(0, vec![user("u1", "addr1", "alice"), user("u2", "addr2", "carol")]);

    let report = engine.validate_block(&block, &facts);
    assert!(!report.is_valid());
    assert_eq!(report.accepted_count(), 1);
    assert_eq!(report.rejected().count(), 0);

    let faults: Vec<_> = report.faults().collect();
    assert_eq!(faults.len(), 1);
    assert_eq!(faults[0].0, "u2");
    assert!(faults[0].1.is_transient());
}

#[test]
fn test_checkpoints_never_hide_faults() {
    let mut checkpoints = CheckpointRegistry::new();
    for result in [
        ConsensusResult::NicknameDouble,
        ConsensusResult::AccountDeleted,
        ConsensusResult::ChangeInfoLimit,
    ] {
        checkpoints = checkpoints.with_social("u1", TxType::AccountUser, result);
    }
    let engine = ConsensusEngine::with_checkpoints(EngineConfig::for_network(Network::Regtest), checkpoints).unwrap();
    let facts = FailingFacts {
        inner: MemoryChainState::new(),
        broken: "addr1",
    };

    let err = engine
        .accept(&user("u1", "addr1", "alice"), Placement::Mempool { height: 0 }, &facts)
        .unwrap_err();
    assert!(matches!(err, ConsensusError::Provider(ProviderError::Unavailable(_))));
}

#[test]
fn test_embedded_main_checkpoint() {
    let engine = ConsensusEngine::new(EngineConfig::for_network(Network::Main)).unwrap();
    let state = MemoryChainState::new();
    let grandfathered = user(
        "c02f553b2885e4213763b442036af8616e9d02c88974e18426b4ddfce71bb8a0",
        "addr1",
        "bob",
    );
    let rival = user("rival", "addr2", "Bob");
    let block = CandidateBlock::new(0, vec![grandfathered.clone(), rival.clone()]);

    assert!(engine.accept(&grandfathered, Placement::Block(&block), &state).unwrap().accepted);
    assert_eq!(
        engine.accept(&rival, Placement::Block(&block), &state).unwrap().reason,
        ConsensusResult::NicknameDouble
    );
}

#[test]
fn test_lenient_policy() {
    let mut config = EngineConfig::for_network(Network::Regtest);
    config.enforcement = EnforcementPolicy::lenient();
    let engine = ConsensusEngine::new(config).unwrap();
    let strict = regtest();
    let state = MemoryChainState::new();

    let odd = user("u1", "addr1", "this nickname is far too long");
    assert!(engine.accept(&odd, pool(&state), &state).unwrap().accepted);
    assert!(!strict.accept(&odd, pool(&state), &state).unwrap().accepted);

    let tampered = user("u2", "addr2", "carol").with_embedded_digest("deadbeef");
    assert!(engine.accept(&tampered, pool(&state), &state).unwrap().accepted);
    assert_eq!(
        strict.accept(&tampered, pool(&state), &state).unwrap().reason,
        ConsensusResult::FailedOpReturn
    );

    let block = CandidateBlock::new(0, vec![user("u3", "addr3", "dave"), user("u4", "addr4", "DAVE")]);
    assert!(engine.validate_block(&block, &state).is_valid());
    assert!(!strict.validate_block(&block, &state).is_valid());
}

#[test]
fn test_reorg_revalidates_as_pending() {
    let engine = regtest();
    let mut state = MemoryChainState::new();
    connect(&mut state, vec![user("u1", "addr1", "alice")]);

    let claim = user("u2", "addr2", "alice");
    let outcome = engine.accept(&claim, pool(&state), &state).unwrap();
    assert_eq!(outcome.stage, Stage::Validate);

    assert_eq!(state.disconnect_tip(), Some(0));
    let outcome = engine.accept(&claim, pool(&state), &state).unwrap();
    assert_eq!(outcome.reason, ConsensusResult::NicknameDouble);
    assert_eq!(outcome.stage, Stage::Mempool);

    let original = state.remove_pending("u1").unwrap();
    assert!(original.is_pending());
    assert!(engine.accept(&original, pool(&state), &state).unwrap().accepted);
}

#[test]
fn test_engine_from_config_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("consensus.toml");
    std::fs::write(
        &path,
        "network = \"regtest\"\n\n[limit_overrides]\nmax_nickname_length = 4\n",
    )
    .unwrap();

    let engine = ConsensusEngine::new(EngineConfig::load_from_file(&path).unwrap()).unwrap();
    let state = MemoryChainState::new();

    let outcome = engine.accept(&user("u1", "addr1", "alice"), pool(&state), &state).unwrap();
    assert_eq!(outcome.reason, ConsensusResult::NicknameLong);
}

#[test]
fn test_nickname_folding_is_ascii_only() {
    let kate = user("u1", "addr1", "kate");
    let kelvin = user("u2", "addr2", "\u{212A}ATE");

    let strict = regtest();
    let block = CandidateBlock::new(0, vec![kate.clone(), kelvin.clone()]);
    let outcome = strict.validate_block_step(&kate, &block).unwrap();
    assert!(outcome.accepted, "{}", outcome);

    let mut config = EngineConfig::for_network(Network::Regtest);
    config.enforcement = EnforcementPolicy::lenient();
    let lenient = ConsensusEngine::new(config).unwrap();
    let mut state = MemoryChainState::new();
    connect(&mut state, vec![kelvin]);

    let outcome = lenient.accept(&kate, pool(&state), &state).unwrap();
    assert!(outcome.accepted, "{}", outcome);

    let outcome = lenient.accept(&user("u3", "addr3", "KATE"), pool(&state), &state).unwrap();
    assert!(outcome.accepted, "{}", outcome);
}

/// A rejection reproduced from scratch: chain history, optional block, limit overrides
struct Rejection {
    tx: SocialTransaction,
    history: Vec<Vec<SocialTransaction>>,
    block: Option<Vec<SocialTransaction>>,
    overrides: Vec<(LimitName, u64)>,
    reason: ConsensusResult,
    stage: Stage,
}

impl Rejection {
    fn new(tx: SocialTransaction, reason: ConsensusResult, stage: Stage) -> Self {
        Self {
            tx,
            history: Vec::new(),
            block: None,
            overrides: Vec::new(),
            reason,
            stage,
        }
    }

    fn after(mut self, transactions: Vec<SocialTransaction>) -> Self {
        self.history.push(transactions);
        self
    }

    fn in_block(mut self, transactions: Vec<SocialTransaction>) -> Self {
        self.block = Some(transactions);
        self
    }

    fn with_override(mut self, name: LimitName, value: u64) -> Self {
        self.overrides.push((name, value));
        self
    }

    fn engine(&self, checkpoints: CheckpointRegistry) -> ConsensusEngine {
        let mut config = EngineConfig::for_network(Network::Regtest);
        config.limit_overrides = self.overrides.iter().copied().collect();
        ConsensusEngine::with_checkpoints(config, checkpoints).unwrap()
    }
}

#[test]
fn test_checkpoint_overrides_every_rejection() {
    let cases = vec![
        Rejection::new(
            user("u1", "addr1", "alice"),
            ConsensusResult::ChangeInfoDoubleInBlock,
            Stage::Block,
        )
        .in_block(vec![
            user("u1", "addr1", "alice"),
            SocialTransaction::new("d1", TxType::AccountDelete, "addr1"),
        ]),
        Rejection::new(user("u2", "addr1", "alice"), ConsensusResult::AccountDeleted, Stage::Validate)
            .after(vec![user("u1", "addr1", "alice")])
            .after(vec![SocialTransaction::new("d1", TxType::AccountDelete, "addr1")]),
        Rejection::new(user("u2", "addr1", "alice"), ConsensusResult::ChangeInfoLimit, Stage::Validate)
            .after(vec![user("u1", "addr1", "alice")])
            .with_override(LimitName::EditAccountDailyCount, 0),
        Rejection::new(
            {
                let mut payload = Payload::with_name("bob");
                payload.about = Some("a".repeat(2097));
                SocialTransaction::new("u1", TxType::AccountUser, "addr1").with_payload(payload)
            },
            ConsensusResult::ContentSizeLimit,
            Stage::Check,
        ),
        Rejection::new(
            user("u1", "addr1", "bob").with_referrer("addr1"),
            ConsensusResult::ReferrerSelf,
            Stage::Check,
        ),
        Rejection::new(user("u1", "addr1", "bob smith"), ConsensusResult::Failed, Stage::Check),
        Rejection::new(
            SocialTransaction::new("d1", TxType::AccountDelete, "addr1"),
            ConsensusResult::NotRegistered,
            Stage::Validate,
        ),
        Rejection::new(barter("b1", "addr1"), ConsensusResult::ManyTransactions, Stage::Block)
            .in_block(vec![barter("b1", "addr1"), barter("b2", "addr1")]),
    ];

    for case in cases {
        let mut state = MemoryChainState::new();
        for transactions in &case.history {
            connect(&mut state, transactions.clone());
        }
        let block = case
            .block
            .as_ref()
            .map(|transactions| CandidateBlock::new(state.next_height(), transactions.clone()));
        let placement = match &block {
            Some(block) => Placement::Block(block),
            None => pool(&state),
        };

        let outcome = case
            .engine(CheckpointRegistry::new())
            .accept(&case.tx, placement, &state)
            .unwrap();
        assert_eq!(outcome.reason, case.reason, "{}", case.tx.hash());
        assert_eq!(outcome.stage, case.stage, "{}", case.tx.hash());

        let checkpoints = CheckpointRegistry::new().with_social(case.tx.hash(), case.tx.tx_type(), case.reason);
        let outcome = case.engine(checkpoints).accept(&case.tx, placement, &state).unwrap();
        assert!(outcome.accepted, "{} listed for {}: {}", case.tx.hash(), case.reason, outcome);
    }
}

#[test]
fn test_checkpoints_do_not_apply_to_pool() {
    let mut state = MemoryChainState::new();
    state.add_pending(barter("b1", "addr1")).unwrap();
    state.add_pending(user("u1", "addr2", "alice")).unwrap();

    let second_barter = barter("b2", "addr1");
    let second_edit = user("u2", "addr2", "alice_two");
    let checkpoints = CheckpointRegistry::new()
        .with_social("b2", TxType::BarteronAccount, ConsensusResult::ManyTransactions)
        .with_social("u2", TxType::AccountUser, ConsensusResult::ChangeInfoDoubleInMempool);
    let engine = ConsensusEngine::with_checkpoints(EngineConfig::for_network(Network::Regtest), checkpoints).unwrap();

    let outcome = engine.accept(&second_barter, pool(&state), &state).unwrap();
    assert_eq!(outcome.reason, ConsensusResult::ManyTransactions);
    assert_eq!(outcome.stage, Stage::Mempool);

    let outcome = engine.accept(&second_edit, pool(&state), &state).unwrap();
    assert_eq!(outcome.reason, ConsensusResult::ChangeInfoDoubleInMempool);
    assert_eq!(outcome.stage, Stage::Mempool);
}

/// Provider whose pool index is offline while chain reads keep working
struct PoolOffline(MemoryChainState);

impl ChainFacts for PoolOffline {
    fn count_recent_duplicate_nicknames(
        &self,
        address: &str,
        height_floor: Height,
        nickname: &str,
    ) -> Result<DuplicateCounts, ProviderError> {
        self.0.count_recent_duplicate_nicknames(address, height_floor, nickname)
    }

    fn last_transaction_type(&self, address: &str, types: &[TxType]) -> Result<Option<TxType>, ProviderError> {
        self.0.last_transaction_type(address, types)
    }

    fn edit_count_since(&self, address: &str, types: &[TxType], height_floor: Height) -> Result<u64, ProviderError> {
        self.0.edit_count_since(address, types, height_floor)
    }

    fn pending_edit_exists(&self, _address: &str, _types: &[TxType]) -> Result<bool, ProviderError> {
        Err(ProviderError::Unavailable("pool index offline".to_string()))
    }
}

#[test]
fn test_block_validation_skips_pool_reads() {
    let engine = regtest();
    let mut chain = MemoryChainState::new();
    connect(&mut chain, vec![user("u0", "addr3", "carol")]);
    let facts = PoolOffline(chain);

    let block = CandidateBlock::new(
        1,
        vec![
            user("u1", "addr1", "alice"),
            barter("b1", "addr2"),
            SocialTransaction::new("d1", TxType::AccountDelete, "addr3"),
        ],
    );
    let report = engine.validate_block(&block, &facts);
    assert!(report.is_valid(), "{:?}", report);

    let err = engine
        .accept(&user("u1", "addr1", "alice"), Placement::Mempool { height: 1 }, &facts)
        .unwrap_err();
    assert!(matches!(err, ConsensusError::Provider(ProviderError::Unavailable(_))));
}
