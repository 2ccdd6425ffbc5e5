//! End-to-end scenarios for single-slot games
//! Submit, resolve, batch resolve, withdraw and strategy switching against an in-memory ledger

use wager_engine::{
    Address, CoinFlip, CoinFlipGame, Delivery, EngineConfig, Entropy, EntryParams, EntryStatus,
    InMemoryLedger, Ledger, RequestId, Roles, RollOver, RollOverGame, Roulette, RouletteGame,
    SingleEntryGame, Strategy, TxContext, Variant, WagerError, WagerEvent,
};

const OWNER: Address = Address([0xa0; 32]);
const HOST: Address = Address([0xb0; 32]);
const PROTOCOL: Address = Address([0xc0; 32]);
const OPERATOR: Address = Address([0xd0; 32]);
const ENTROPY_PROVIDER: Address = Address([0xe0; 32]);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn roles() -> Roles {
    Roles {
        owner: OWNER,
        host: HOST,
        protocol: PROTOCOL,
        operator: OPERATOR,
    }
}

fn player(n: u8) -> Address {
    Address::from_byte(n)
}

fn at(caller: Address, block: u64) -> TxContext {
    TxContext::new(caller, block)
}

fn funded_ledger(players: &[Address]) -> InMemoryLedger {
    let mut ledger = InMemoryLedger::new();
    ledger.whitelist(OPERATOR);
    for p in players {
        ledger.fund(*p, 100_000);
    }
    ledger
}

/// Game with the entropy service configured and active, so tests choose outcomes
fn entropy_game<V: Variant>(variant: V) -> SingleEntryGame<V> {
    let mut game = SingleEntryGame::new(variant, roles(), EngineConfig::default()).expect("valid config");
    game.core_mut()
        .set_entropy_params(&at(OWNER, 0), ENTROPY_PROVIDER)
        .expect("owner call");
    game.core_mut()
        .set_strategy(&at(OWNER, 0), Strategy::EntropyService)
        .expect("configured strategy");
    game
}

fn deliver(value: u64) -> Delivery {
    Delivery::EntropyService(Entropy::from(value))
}

#[test]
fn test_winning_flip_pays_1980_plus_fees() {
    init_tracing();
    let alice = player(1);
    let mut ledger = funded_ledger(&[alice]);
    let mut game = entropy_game(CoinFlip);
    let supply_before = ledger.total_supply();

    let entropy = Entropy::from(7u64);
    let winning_side = entropy.derive_index(0, 2) as u64;
    let id = game
        .submit_entry(&at(alice, 1), &mut ledger, EntryParams::single(winning_side, 1_000, 1))
        .expect("submit");
    assert_eq!(ledger.balance_of(&alice), 99_000);

    let resolution = game
        .fulfill(&at(ENTROPY_PROVIDER, 2), &mut ledger, id, deliver(7))
        .expect("resolve");

    assert_eq!(resolution.settlement.payout, 1_980);
    assert_eq!(ledger.balance_of(&alice), 99_000 + 1_980);
    assert_eq!(ledger.balance_of(&HOST), 5);
    assert_eq!(ledger.balance_of(&PROTOCOL), 5);
    // Stake burned, payout and both fees minted
    assert_eq!(ledger.total_supply(), supply_before - 1_000 + 1_990);
    assert_eq!(game.entry_status(&alice), EntryStatus::None);
}

#[test]
fn test_stop_loss_skips_second_play() {
    let alice = player(1);
    let mut ledger = funded_ledger(&[alice]);
    let mut game = entropy_game(CoinFlip);

    let losing_side = 1 - Entropy::from(11u64).derive_index(0, 2) as u64;
    let params = EntryParams::single(losing_side, 1_000, 2).with_stop_loss(500);
    let id = game.submit_entry(&at(alice, 1), &mut ledger, params).expect("submit");
    assert_eq!(ledger.balance_of(&alice), 98_000);

    let resolution = game
        .fulfill(&at(ENTROPY_PROVIDER, 2), &mut ledger, id, deliver(11))
        .expect("resolve");

    assert_eq!(resolution.settlement.played, 1);
    assert_eq!(resolution.entry.played_count, 1);
    assert_eq!(resolution.settlement.payout, 0);
    assert_eq!(resolution.settlement.refund, 1_000);
    assert_eq!(ledger.balance_of(&alice), 99_000);
    // Fees only on the played stake
    assert_eq!(ledger.balance_of(&HOST), 5);
}

#[test]
fn test_batch_resolve_reports_already_resolved_id() {
    let players: Vec<Address> = (1..=4).map(player).collect();
    let mut ledger = funded_ledger(&players);
    let mut game = CoinFlipGame::new(CoinFlip, roles(), EngineConfig::default()).expect("valid config");

    let ids: Vec<RequestId> = players
        .iter()
        .map(|p| {
            game.submit_entry(&at(*p, 1), &mut ledger, EntryParams::single(0, 1_000, 3))
                .expect("submit")
        })
        .collect();

    // Settle the second id on its own first
    game.resolve(&at(OWNER, 2), &mut ledger, ids[1]).expect("single resolve");
    game.drain_events();

    let report = game.batch_resolve(&at(OWNER, 3), &mut ledger, &ids).expect("batch");
    assert_eq!(report.failed, vec![ids[1]]);
    assert_eq!(report.resolved.len(), 3);
    for p in &players {
        assert_eq!(game.entry_status(p), EntryStatus::None);
    }

    let events = game.drain_events();
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, WagerEvent::EntryResolved { .. }))
            .count(),
        3
    );
    assert!(events.iter().any(|e| matches!(
        e,
        WagerEvent::BatchResolveFailed { failed, .. } if failed == &vec![ids[1]]
    )));
    assert_eq!(game.core().stats().entries_resolved, 4);
}

#[test]
fn test_batch_resolve_matches_sequential_resolution() {
    let players: Vec<Address> = (1..=3).map(player).collect();

    let run = |batch: bool| {
        let mut ledger = funded_ledger(&players);
        let mut game = CoinFlipGame::new(CoinFlip, roles(), EngineConfig::default()).expect("valid config");
        let ids: Vec<RequestId> = players
            .iter()
            .map(|p| {
                game.submit_entry(&at(*p, 1), &mut ledger, EntryParams::single(1, 1_000, 5))
                    .expect("submit")
            })
            .collect();
        if batch {
            game.batch_resolve(&at(OWNER, 2), &mut ledger, &ids).expect("batch");
        } else {
            for id in &ids {
                game.resolve(&at(OWNER, 2), &mut ledger, *id).expect("resolve");
            }
        }
        players.iter().map(|p| ledger.balance_of(p)).collect::<Vec<_>>()
    };

    assert_eq!(run(true), run(false));
}

#[test]
fn test_batch_resolve_aborts_on_ledger_rejection() {
    let alice = player(1);
    let mut ledger = funded_ledger(&[alice]);
    let mut game = CoinFlipGame::new(CoinFlip, roles(), EngineConfig::default()).expect("valid config");
    let id = game
        .submit_entry(&at(alice, 1), &mut ledger, EntryParams::single(0, 1_000, 1))
        .expect("submit");

    ledger.remove_from_whitelist(&OPERATOR);
    assert!(matches!(
        game.batch_resolve(&at(OWNER, 2), &mut ledger, &[id]),
        Err(WagerError::Ledger(_))
    ));
    assert_eq!(game.entry_status(&alice), EntryStatus::AwaitingRandomness);
}

#[test]
fn test_resolution_is_at_most_once() {
    let alice = player(1);
    let mut ledger = funded_ledger(&[alice]);
    let mut game = entropy_game(Roulette);

    let id = game
        .submit_entry(&at(alice, 1), &mut ledger, EntryParams::single(37, 1_000, 4))
        .expect("submit");
    game.fulfill(&at(ENTROPY_PROVIDER, 2), &mut ledger, id, deliver(1))
        .expect("first delivery");

    let balance = ledger.balance_of(&alice);
    let supply = ledger.total_supply();
    assert_eq!(
        game.fulfill(&at(ENTROPY_PROVIDER, 3), &mut ledger, id, deliver(2)),
        Err(WagerError::RequestNotInProgress(id))
    );
    assert_eq!(ledger.balance_of(&alice), balance);
    assert_eq!(ledger.total_supply(), supply);
}

#[test]
fn test_timeout_withdraw_and_resolve_are_exclusive() {
    let (alice, bob) = (player(1), player(2));
    let mut ledger = funded_ledger(&[alice, bob]);
    let mut game = entropy_game(RollOver);

    let alice_id = game
        .submit_entry(&at(alice, 10), &mut ledger, EntryParams::single(50, 1_000, 1))
        .expect("submit");
    let bob_id = game
        .submit_entry(&at(bob, 10), &mut ledger, EntryParams::single(50, 1_000, 1))
        .expect("submit");

    // Alice resolves in time and can no longer withdraw
    game.fulfill(&at(ENTROPY_PROVIDER, 20), &mut ledger, alice_id, deliver(3))
        .expect("resolve");
    assert_eq!(
        game.withdraw(&at(alice, 10_000), &mut ledger),
        Err(WagerError::EntryNotInProgress(alice))
    );

    // Bob times out and the late delivery is refused
    game.withdraw(&at(bob, 266), &mut ledger).expect("withdraw");
    assert_eq!(ledger.balance_of(&bob), 100_000);
    assert_eq!(
        game.fulfill(&at(ENTROPY_PROVIDER, 267), &mut ledger, bob_id, deliver(4)),
        Err(WagerError::RequestNotInProgress(bob_id))
    );
}

#[test]
fn test_strategy_switch_isolates_request_ids() {
    let (alice, bob) = (player(1), player(2));
    let mut ledger = funded_ledger(&[alice, bob]);
    let mut game = CoinFlipGame::new(CoinFlip, roles(), EngineConfig::default()).expect("valid config");
    game.core_mut()
        .set_entropy_params(&at(OWNER, 0), ENTROPY_PROVIDER)
        .expect("owner call");

    let alice_id = game
        .submit_entry(&at(alice, 1), &mut ledger, EntryParams::single(0, 1_000, 1))
        .expect("submit");

    game.core_mut()
        .set_strategy(&at(OWNER, 2), Strategy::EntropyService)
        .expect("switch");
    let bob_id = game
        .submit_entry(&at(bob, 3), &mut ledger, EntryParams::single(0, 1_000, 1))
        .expect("submit");
    // Same numeric id, different strategy
    assert_eq!(alice_id, bob_id);
    assert_eq!(game.owner_of_request(Strategy::HashChain, alice_id), Some(alice));
    assert_eq!(game.owner_of_request(Strategy::EntropyService, bob_id), Some(bob));

    assert_eq!(
        game.resolve(&at(OWNER, 4), &mut ledger, alice_id),
        Err(WagerError::RequestNotInProgress(alice_id))
    );
    let resolution = game
        .fulfill(&at(ENTROPY_PROVIDER, 4), &mut ledger, bob_id, deliver(9))
        .expect("bob resolves");
    assert_eq!(resolution.entry.owner, bob);
    assert_eq!(game.entry_status(&alice), EntryStatus::AwaitingRandomness);

    // Switching back does not revive alice's request
    game.core_mut()
        .set_strategy(&at(OWNER, 5), Strategy::HashChain)
        .expect("switch back");
    assert_eq!(
        game.resolve(&at(OWNER, 6), &mut ledger, alice_id),
        Err(WagerError::RequestNotInProgress(alice_id))
    );

    // She recovers through the timeout path
    game.withdraw(&at(alice, 1 + 256), &mut ledger).expect("withdraw");
    assert_eq!(ledger.balance_of(&alice), 100_000);
}

#[test]
fn test_ledger_deltas_match_settlement_records() {
    let players: Vec<Address> = (1..=6).map(player).collect();
    let mut ledger = funded_ledger(&players);
    let mut game = RouletteGame::new(Roulette, roles(), EngineConfig::default()).expect("valid config");
    let sides = [0u64, 17, 37, 40, 44, 48];

    for round in 0..5u64 {
        let mut ids = Vec::new();
        let mut before = Vec::new();
        for (p, side) in players.iter().zip(sides) {
            let params = EntryParams::single(side, 700, 6)
                .with_stop_loss(1_500)
                .with_stop_gain(4_000);
            before.push(ledger.balance_of(p));
            ids.push(game.submit_entry(&at(*p, round * 10), &mut ledger, params).expect("submit"));
        }
        let host_before = ledger.balance_of(&HOST);
        let protocol_before = ledger.balance_of(&PROTOCOL);

        let report = game
            .batch_resolve(&at(OWNER, round * 10 + 1), &mut ledger, &ids)
            .expect("batch");
        assert!(report.failed.is_empty());

        let mut host_fees = 0;
        let mut protocol_fees = 0;
        for (resolution, balance_before) in report.resolved.iter().zip(&before) {
            let s = &resolution.settlement;
            assert_eq!(s.played_stake + s.refund, 700 * 6);
            assert_eq!(
                ledger.balance_of(&s.owner),
                balance_before - 700 * 6 + s.payout + s.refund
            );
            host_fees += s.host_fee;
            protocol_fees += s.protocol_fee;
        }
        assert_eq!(ledger.balance_of(&HOST) - host_before, host_fees);
        assert_eq!(ledger.balance_of(&PROTOCOL) - protocol_before, protocol_fees);
    }
}

#[test]
fn test_submission_validation_leaves_no_state() {
    let alice = player(1);
    let mut ledger = funded_ledger(&[alice]);
    let mut game = RollOverGame::new(RollOver, roles(), EngineConfig::default()).expect("valid config");
    game.core_mut()
        .set_min_entry_amount(&at(OWNER, 0), 100)
        .expect("owner call");

    assert_eq!(
        game.submit_entry(&at(alice, 1), &mut ledger, EntryParams::single(96, 1_000, 1)),
        Err(WagerError::InvalidSide(96))
    );
    assert_eq!(
        game.submit_entry(&at(alice, 1), &mut ledger, EntryParams::single(50, 99, 1)),
        Err(WagerError::EntryAmountLowerThanMinEntryAmount {
            average: 99,
            minimum: 100
        })
    );
    assert_eq!(ledger.balance_of(&alice), 100_000);
    assert_eq!(game.entry_status(&alice), EntryStatus::None);
    assert_eq!(game.core().stats().entries_submitted, 0);
}
