//! # End-to-End Accounting Scenarios
//!
//! Ledger, tree, and cache behavior across subsystem boundaries:
//! distribution arithmetic, deterministic roots, the freeze window, and
//! the pruning horizon.

#[cfg(test)]
mod tests {
    use cv_01_merkle_commitment::{verify_path, MerkleTree};
    use cv_02_ledger_state::{LedgerSettings, LedgerState};
    use cv_04_chain_watcher::ports::outbound::{MockJoinPartChannel, MockRootChain};
    use cv_04_chain_watcher::{WatchError, Watcher, WatcherConfig};
    use cv_05_block_store::MemoryStore;
    use primitive_types::U256;
    use shared_types::{Address, ChannelMessage, Hash, Member, MessageKind};
    use std::sync::Arc;

    // =============================================================================
    // TEST FIXTURES
    // =============================================================================

    fn addr(byte: u8) -> Address {
        Address::from_bytes([byte; 20])
    }

    fn fresh_state(fee: &str, freeze_secs: u64) -> LedgerState {
        let settings = LedgerSettings::fresh(addr(0xAD), fee.parse().unwrap(), freeze_secs);
        LedgerState::new(settings, Arc::new(MemoryStore::new()))
    }

    async fn commit(state: &mut LedgerState, block_number: u64, timestamp_ms: u64) -> Hash {
        let root = MerkleTree::build(&state.snapshot_members(), None)
            .unwrap()
            .root_hash();
        state
            .on_block_created(block_number, timestamp_ms, root)
            .await
            .unwrap();
        root
    }

    /// Conservation invariant: member + admin earnings equal the revenue
    /// applied so far, exactly.
    fn assert_conservation(state: &LedgerState) {
        let sum = state
            .members_realtime()
            .iter()
            .fold(state.admin().earnings, |acc, m| acc + m.earnings);
        assert_eq!(sum, state.total_earnings());
    }

    // =============================================================================
    // SCENARIOS
    // =============================================================================

    /// Single member, single revenue: the whole amount lands on the one
    /// member, and the proof is the single zero sibling.
    #[tokio::test]
    async fn test_single_member_single_revenue() {
        let mut state = fresh_state("0", 1000);
        state.on_join(&[addr(0xAA)], 0);
        state.on_revenue(U256::from(100), 1);

        assert_eq!(state.member(&addr(0xAA)).unwrap().earnings, U256::from(100));
        assert_eq!(state.total_earnings(), U256::from(100));
        assert_conservation(&state);

        let root = commit(&mut state, 1, 1_000).await;
        let path = state.get_proof_at(&addr(0xAA), 1).await.unwrap();
        assert_eq!(path, vec![Hash::zero()]);
        assert!(verify_path(&root, None, &addr(0xAA), U256::from(100), &path));
    }

    /// Admin fee 20% over two active and one inactive member.
    #[tokio::test]
    async fn test_admin_fee_twenty_percent() {
        let mut state = fresh_state("0.2", 1000);
        state.on_join(&[addr(1), addr(2), addr(3)], 1);
        state.on_part(&[addr(3)], 1);
        state.on_revenue(U256::from(1000), 2);

        assert_eq!(state.admin().earnings, U256::from(200));
        assert_eq!(state.member(&addr(1)).unwrap().earnings, U256::from(400));
        assert_eq!(state.member(&addr(2)).unwrap().earnings, U256::from(400));
        assert_eq!(state.member(&addr(3)).unwrap().earnings, U256::zero());
        assert_conservation(&state);
    }

    /// Part and rejoin preserves earnings; revenue with nobody active
    /// accrues to the admin.
    #[tokio::test]
    async fn test_part_and_rejoin_preserves_earnings() {
        let mut state = fresh_state("0", 1000);
        state.on_join(&[addr(0xAA)], 1);
        state.on_revenue(U256::from(100), 2);
        state.on_part(&[addr(0xAA)], 3);
        state.on_revenue(U256::from(100), 4);
        state.on_join(&[addr(0xAA)], 5);
        assert_eq!(state.member(&addr(0xAA)).unwrap().earnings, U256::from(100));
        state.on_revenue(U256::from(100), 6);

        assert_eq!(state.member(&addr(0xAA)).unwrap().earnings, U256::from(200));
        assert_eq!(state.admin().earnings, U256::from(100));
        assert_conservation(&state);
    }

    /// Same members, same sort order: bit-identical roots across builds.
    #[test]
    fn test_deterministic_root_across_insertion_orders() {
        let mut forward: Vec<Member> = (1..=5u8)
            .map(|i| {
                let mut m = Member::new(addr(i));
                m.add_revenue(U256::from(i as u64 * 10));
                m
            })
            .collect();
        let mut backward: Vec<Member> = forward.iter().rev().cloned().collect();

        forward.sort_by_key(|m| m.address);
        backward.sort_by_key(|m| m.address);

        let a = MerkleTree::build(&forward, None).unwrap();
        let b = MerkleTree::build(&backward, None).unwrap();
        assert_eq!(a.root_hash(), b.root_hash());
        assert_eq!(a, b);
    }

    /// Freeze window: at now=3200s with a 1000s freeze, the 2000s block
    /// is withdrawable and the 2500s block is not.
    #[tokio::test]
    async fn test_freeze_window() {
        let mut state = fresh_state("0", 1000);
        state.on_join(&[addr(1)], 0);
        state.on_revenue(U256::from(10), 1);

        commit(&mut state, 1, 1_000_000).await;
        commit(&mut state, 2, 2_000_000).await;
        commit(&mut state, 3, 2_500_000).await;

        let withdrawable = state
            .get_latest_withdrawable_block(3_200_000)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(withdrawable.block_number, 2);
        assert_eq!(state.get_latest_block().unwrap().block_number, 3);
    }

    /// Cache pruning: once the ledger clock reaches 5000 ms and the
    /// cache prunes, playback from 3000 ms is refused.
    #[tokio::test]
    async fn test_cache_pruning_refuses_stale_playback() {
        let chain = Arc::new(MockRootChain::new());
        let channel = Arc::new(MockJoinPartChannel::new());
        channel.seed(ChannelMessage {
            kind: MessageKind::Join,
            addresses: vec![addr(1)],
            timestamp_ms: 5_000,
            seq: 0,
        });

        let (watcher, subscription) = Watcher::start(
            WatcherConfig::for_testing(),
            chain,
            channel,
            Arc::new(MemoryStore::new()),
        )
        .await
        .unwrap();
        let (handle, join) = watcher.spawn(subscription);

        let result = handle.playback_from(3_000).await;
        assert!(matches!(
            result,
            Err(WatchError::CachePruned {
                requested_ms: 3_000,
                pruned_up_to_ms: 5_000,
            })
        ));

        handle.shutdown().await;
        join.await.unwrap().unwrap();
    }

    /// Replay determinism: the merged order is a function of the inputs,
    /// not of their arrival arrangement, so two ledgers fed the same
    /// events end up with bit-identical snapshots.
    #[tokio::test]
    async fn test_replay_order_is_arrival_independent() {
        use cv_03_event_replay::{apply, merge};
        use shared_types::{ChainEvent, ChainEventKind};

        let events = vec![
            ChainEvent {
                kind: ChainEventKind::RevenueReceived {
                    from: addr(0xEE),
                    amount: U256::from(500),
                },
                block_number: 4,
                transaction_index: 1,
                log_index: 0,
                timestamp_ms: 2_000,
                removed: false,
            },
            ChainEvent {
                kind: ChainEventKind::AdminFeeChanged {
                    fee_raw: U256::from(200_000_000_000_000_000u64),
                },
                block_number: 4,
                transaction_index: 0,
                log_index: 0,
                timestamp_ms: 2_000,
                removed: false,
            },
        ];
        let messages = vec![
            ChannelMessage {
                kind: MessageKind::Join,
                addresses: vec![addr(1)],
                timestamp_ms: 1_000,
                seq: 0,
            },
            ChannelMessage {
                kind: MessageKind::Join,
                addresses: vec![addr(2)],
                timestamp_ms: 2_000,
                seq: 1,
            },
        ];

        let mut snapshots = Vec::new();
        for flip in [false, true] {
            let mut ordered_events = events.clone();
            if flip {
                ordered_events.reverse();
            }
            let mut state = fresh_state("0", 1000);
            for event in merge(ordered_events, messages.clone()) {
                apply(&mut state, &event).await.unwrap();
            }
            // Fee change in tx 0 precedes the revenue in tx 1, and the
            // join at the same timestamp comes after both.
            assert_eq!(state.admin().earnings, U256::from(100));
            assert_eq!(state.member(&addr(1)).unwrap().earnings, U256::from(400));
            assert_eq!(state.member(&addr(2)).unwrap().earnings, U256::zero());
            snapshots.push(state.snapshot_members());
        }
        assert_eq!(snapshots[0], snapshots[1]);
    }

    /// Dust from integer division always lands on the admin, keeping the
    /// conservation invariant exact for arbitrary amounts.
    #[tokio::test]
    async fn test_conservation_over_many_uneven_distributions() {
        let mut state = fresh_state("0.07", 1000);
        state.on_join(&[addr(1), addr(2), addr(3), addr(4), addr(5), addr(6), addr(7)], 0);

        let amounts = [1u64, 999, 12_345, 7, 1_000_000_007, 3, 9_999_999];
        for (i, amount) in amounts.iter().enumerate() {
            state.on_revenue(U256::from(*amount), i as u64 + 1);
            assert_conservation(&state);
        }

        let expected: u64 = amounts.iter().sum();
        assert_eq!(state.total_earnings(), U256::from(expected));
    }
}
