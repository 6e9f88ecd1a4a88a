#![cfg(feature = "serde")]

use sprinkle::{MemoryEngine, Policy, RoomId, Snapshot, SweepReport, Token, UserId};

#[test]
fn token_serializes_as_its_text() {
    let token: Token = "aB3".parse().unwrap();
    let json = serde_json::to_string(&token).unwrap();
    assert_eq!(json, "\"aB3\"");
    assert_eq!(serde_json::from_str::<Token>(&json).unwrap(), token);
}

#[test]
fn malformed_tokens_fail_to_deserialize() {
    assert!(serde_json::from_str::<Token>("\"ab\"").is_err());
    assert!(serde_json::from_str::<Token>("\"a-c\"").is_err());
}

#[test]
fn identities_reject_invalid_values() {
    assert!(serde_json::from_str::<UserId>("0").is_err());
    assert_eq!(serde_json::from_str::<UserId>("7").unwrap().get(), 7);
    assert!(serde_json::from_str::<RoomId>("\"\"").is_err());
}

#[test]
fn snapshot_survives_json() {
    let engine = MemoryEngine::in_memory(Policy::default());
    let room = RoomId::new("lobby").unwrap();
    let alice = UserId::new(1).unwrap();
    let token = engine.create_allocation(alice, &room, 900, 3).unwrap();
    engine.claim(&token, UserId::new(2).unwrap(), &room).unwrap();

    let snapshot = engine.lookup(alice, &token).unwrap();
    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["total_amount"], 900);
    assert_eq!(json["claims"][0]["claimant"], 2);
    assert_eq!(serde_json::from_value::<Snapshot>(json).unwrap(), snapshot);
}

#[test]
fn sweep_report_lists_failed_tokens_as_text() {
    let report = SweepReport {
        found: 2,
        succeeded: 1,
        failed: vec!["xyz".parse().unwrap()],
    };
    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["failed"][0], "xyz");
}
