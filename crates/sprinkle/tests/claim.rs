use sprinkle::{
    ArchiveStore, Engine, Error, LiveStore, ManualClock, MemoryArchive, MemoryStore, Policy,
    RandSource, Result, RoomId, ThreadRandom, TimeSource, Token, UserId, Window,
};
use std::collections::HashSet;
use std::sync::Barrier;
use std::thread::scope;

const T0: u64 = 1_700_000_000_000;

type TestEngine<R = ThreadRandom> = Engine<MemoryStore, MemoryArchive, ManualClock, R>;

fn engine() -> (TestEngine, ManualClock) {
    engine_with(ThreadRandom, Policy::default())
}

fn engine_with<R: RandSource + Clone>(rng: R, policy: Policy) -> (TestEngine<R>, ManualClock) {
    let clock = ManualClock::new(T0);
    let engine = Engine::new(
        MemoryStore::new(),
        MemoryArchive::new(),
        clock.clone(),
        rng,
        policy,
    );
    (engine, clock)
}

fn user(id: u64) -> UserId {
    UserId::new(id).unwrap()
}

fn lobby() -> RoomId {
    RoomId::new("lobby").unwrap()
}

#[derive(Clone)]
struct ZeroRand;

impl RandSource for ZeroRand {
    fn next_below(&self, _bound: u64) -> u64 {
        0
    }
}

#[test]
fn six_claimants_drain_ten_thousand() {
    let (engine, _clock) = engine();
    let room = lobby();
    let token = engine.create_allocation(user(1), &room, 10_000, 6).unwrap();

    let amounts: Vec<u64> = (2..=7)
        .map(|id| engine.claim(&token, user(id), &room).unwrap())
        .collect();
    assert!(amounts.iter().all(|&a| a >= 1));
    assert_eq!(amounts.iter().sum::<u64>(), 10_000);

    let remaining = engine
        .live()
        .read(&token, |a| (a.remaining_amount(), a.remaining_share_count()));
    assert_eq!(remaining, Some((0, 0)));

    assert_eq!(
        engine.claim(&token, user(8), &room),
        Err(Error::FullyClaimed)
    );
}

#[test]
fn created_allocation_uses_policy_deadlines() {
    let policy = Policy {
        claim_window: Window::minutes(5),
        visibility_window: Window::days(1),
        ..Policy::default()
    };
    let (engine, _clock) = engine_with(ThreadRandom, policy);
    let token = engine.create_allocation(user(1), &lobby(), 100, 4).unwrap();

    let deadlines = engine
        .live()
        .read(&token, |a| (a.created_at(), a.claim_deadline(), a.visibility_deadline()))
        .unwrap();
    assert_eq!(deadlines, (T0, T0 + 5 * 60_000, T0 + 24 * 3_600_000));
}

#[test]
fn invalid_amounts_are_rejected_before_reserving_a_token() {
    let (engine, _clock) = engine();
    let room = lobby();
    for (total, count) in [(5, 6), (5, 0), (0, 0), (0, 1)] {
        assert_eq!(
            engine.create_allocation(user(1), &room, total, count),
            Err(Error::InvalidAmounts { total, count })
        );
    }
    assert_eq!(engine.live_count(), 0);
}

#[test]
fn one_unit_per_share_is_allowed() {
    let (engine, _clock) = engine();
    let room = lobby();
    let token = engine.create_allocation(user(1), &room, 3, 3).unwrap();
    for id in 2..=4 {
        assert_eq!(engine.claim(&token, user(id), &room), Ok(1));
    }
}

#[test]
fn exhausted_token_space_is_a_retryable_rejection() {
    // Every candidate is "aaa", so only the first creation can succeed.
    let (engine, _clock) = engine_with(ZeroRand, Policy::default());
    let room = lobby();
    let first = engine.create_allocation(user(1), &room, 10, 2).unwrap();
    assert_eq!(first.to_string(), "aaa");

    let err = engine.create_allocation(user(2), &room, 10, 2).unwrap_err();
    assert_eq!(err, Error::GenerationExhausted { attempts: 1000 });
    assert!(err.is_user_facing());
    assert_eq!(engine.live_count(), 1);
}

#[test]
fn originator_can_never_claim() {
    let (engine, clock) = engine();
    let room = lobby();
    let originator = user(1);
    let token = engine.create_allocation(originator, &room, 100, 2).unwrap();

    assert_eq!(
        engine.claim(&token, originator, &room),
        Err(Error::SelfClaimForbidden)
    );
    engine.claim(&token, user(2), &room).unwrap();
    assert_eq!(
        engine.claim(&token, originator, &room),
        Err(Error::SelfClaimForbidden)
    );
    engine.claim(&token, user(3), &room).unwrap();
    // Fully claimed is checked after self-claim.
    assert_eq!(
        engine.claim(&token, originator, &room),
        Err(Error::SelfClaimForbidden)
    );
    clock.advance(1);
    assert_eq!(
        engine.claim(&token, originator, &room),
        Err(Error::SelfClaimForbidden)
    );
}

#[test]
fn repeat_claims_are_always_rejected() {
    let (engine, _clock) = engine();
    let room = lobby();
    let token = engine.create_allocation(user(1), &room, 1_000, 5).unwrap();

    let first = engine.claim(&token, user(2), &room).unwrap();
    for _ in 0..10 {
        assert_eq!(
            engine.claim(&token, user(2), &room),
            Err(Error::AlreadyClaimed { claimant: user(2) })
        );
    }
    let snapshot = engine.lookup(user(1), &token).unwrap();
    assert_eq!(snapshot.claims.len(), 1);
    assert_eq!(snapshot.claimed_amount, first);
}

#[test]
fn claims_from_another_room_are_rejected() {
    let (engine, _clock) = engine();
    let token = engine.create_allocation(user(1), &lobby(), 100, 2).unwrap();
    let elsewhere = RoomId::new("elsewhere").unwrap();
    assert_eq!(
        engine.claim(&token, user(2), &elsewhere),
        Err(Error::RoomMismatch)
    );
}

#[test]
fn unknown_tokens_are_rejected() {
    let (engine, _clock) = engine();
    let token: Token = "Nop".parse().unwrap();
    assert_eq!(
        engine.claim(&token, user(2), &lobby()),
        Err(Error::UnknownToken { token })
    );
    assert_eq!(
        engine.lookup(user(1), &token),
        Err(Error::UnknownToken { token })
    );
}

#[test]
fn closed_claim_window_still_allows_lookup() {
    let (engine, clock) = engine();
    let room = lobby();
    let token = engine.create_allocation(user(1), &room, 500, 3).unwrap();
    let amount = engine.claim(&token, user(2), &room).unwrap();

    let claim_deadline = T0 + Window::minutes(10).as_millis();
    clock.set(claim_deadline);
    assert!(engine.claim(&token, user(3), &room).is_ok());

    clock.set(claim_deadline + 1);
    assert_eq!(
        engine.claim(&token, user(4), &room),
        Err(Error::ClaimWindowClosed {
            deadline: claim_deadline
        })
    );
    let snapshot = engine.lookup(user(1), &token).unwrap();
    assert_eq!(snapshot.claims.len(), 2);
    assert_eq!(snapshot.claims[0].amount, amount);
    assert_eq!(snapshot.claims[0].claimant, user(2));
}

#[test]
fn past_visibility_the_allocation_is_gone_for_claimants() {
    let (engine, clock) = engine();
    let room = lobby();
    let token = engine.create_allocation(user(1), &room, 500, 3).unwrap();

    let visibility_deadline = T0 + Window::days(7).as_millis();
    clock.set(visibility_deadline + 1);
    assert_eq!(
        engine.claim(&token, user(2), &room),
        Err(Error::UnknownToken { token })
    );
    assert_eq!(
        engine.lookup(user(1), &token),
        Err(Error::LookupWindowClosed {
            deadline: visibility_deadline
        })
    );
    assert_eq!(engine.lookup(user(2), &token), Err(Error::NotOriginator));
    // Lookups never archive as a side effect.
    assert_eq!(engine.live_count(), 1);
    assert_eq!(engine.archived_count(), 0);
}

#[test]
fn concurrent_claims_never_share_a_share() {
    const CLAIMANTS: u64 = 32;
    const SHARES: u64 = 8;

    let (engine, _clock) = engine();
    let room = lobby();
    let token = engine
        .create_allocation(user(1), &room, 10_000, SHARES)
        .unwrap();
    let barrier = Barrier::new(CLAIMANTS as usize);

    let results: Vec<(UserId, Result<u64>)> = scope(|s| {
        let handles: Vec<_> = (0..CLAIMANTS)
            .map(|i| {
                let (engine, room, barrier) = (&engine, &room, &barrier);
                s.spawn(move || {
                    let claimant = user(100 + i);
                    barrier.wait();
                    (claimant, engine.claim(&token, claimant, room))
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let winners: Vec<_> = results
        .iter()
        .filter_map(|(claimant, result)| result.as_ref().ok().map(|amount| (*claimant, *amount)))
        .collect();
    assert_eq!(winners.len() as u64, SHARES);
    assert_eq!(winners.iter().map(|(_, a)| a).sum::<u64>(), 10_000);
    assert!(
        results
            .iter()
            .filter_map(|(_, r)| r.as_ref().err())
            .all(|e| *e == Error::FullyClaimed)
    );

    let snapshot = engine.lookup(user(1), &token).unwrap();
    let holders: HashSet<UserId> = snapshot.claims.iter().map(|c| c.claimant).collect();
    assert_eq!(holders.len() as u64, SHARES);
    assert_eq!(snapshot.claimed_amount, 10_000);
}

#[test]
fn one_claimant_racing_itself_wins_once() {
    const THREADS: usize = 16;

    let (engine, _clock) = engine();
    let room = lobby();
    let token = engine.create_allocation(user(1), &room, 10_000, 8).unwrap();
    let claimant = user(2);
    let barrier = Barrier::new(THREADS);

    let results: Vec<Result<u64>> = scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let (engine, room, barrier) = (&engine, &room, &barrier);
                s.spawn(move || {
                    barrier.wait();
                    engine.claim(&token, claimant, room)
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let wins: Vec<u64> = results.iter().filter_map(|r| r.as_ref().ok().copied()).collect();
    assert_eq!(wins.len(), 1);
    assert!(
        results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .all(|e| *e == Error::AlreadyClaimed { claimant })
    );

    let snapshot = engine.lookup(user(1), &token).unwrap();
    assert_eq!(snapshot.claims.len(), 1);
    assert_eq!(snapshot.claims[0].claimant, claimant);
    assert_eq!(snapshot.claimed_amount, wins[0]);
    let remaining = engine
        .live()
        .read(&token, |a| a.remaining_share_count());
    assert_eq!(remaining, Some(7));
}

#[test]
fn concurrent_creations_get_distinct_tokens() {
    const THREADS: u64 = 8;
    const PER_THREAD: u64 = 200;

    let (engine, _clock) = engine();
    let room = lobby();
    let tokens: Vec<Token> = scope(|s| {
        let handles: Vec<_> = (0..THREADS)
            .map(|t| {
                let (engine, room) = (&engine, &room);
                s.spawn(move || {
                    (0..PER_THREAD)
                        .map(|_| engine.create_allocation(user(t + 1), room, 50, 5).unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect()
    });

    let distinct: HashSet<Token> = tokens.iter().copied().collect();
    assert_eq!(distinct.len() as u64, THREADS * PER_THREAD);
    assert_eq!(engine.live_count() as u64, THREADS * PER_THREAD);
    assert_eq!(engine.live().len(), engine.live_count());
    assert!(engine.archive().is_empty());
    assert_eq!(engine.clock().now_millis(), T0);
}
