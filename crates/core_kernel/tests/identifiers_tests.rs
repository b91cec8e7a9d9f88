//! Tests for typed identifiers

use core_kernel::{AccountId, EntryId, SettlementId};
use uuid::Uuid;

#[test]
fn test_prefixes() {
    assert_eq!(AccountId::prefix(), "ACC");
    assert_eq!(EntryId::prefix(), "ENT");
    assert_eq!(SettlementId::prefix(), "STL");
}

#[test]
fn test_uuid_conversion() {
    let uuid = Uuid::new_v4();
    let id = AccountId::from(uuid);
    let back: Uuid = id.into();
    assert_eq!(uuid, back);
    assert_eq!(AccountId::from_uuid(uuid), id);
}

#[test]
fn test_new_ids_are_time_ordered() {
    let first = EntryId::new();
    let second = EntryId::new();
    assert!(first <= second);
    assert_ne!(first, second);
}

#[test]
fn test_serde_is_transparent() {
    let id = SettlementId::new();
    let json = serde_json::to_string(&id).unwrap();
    assert_eq!(json, format!("\"{}\"", id.as_uuid()));

    let back: SettlementId = serde_json::from_str(&json).unwrap();
    assert_eq!(back, id);
}

#[test]
fn test_wrong_prefix_is_rejected() {
    let id = AccountId::new();
    let with_other_prefix = format!("STL-{}", id.as_uuid());
    assert!(with_other_prefix.parse::<AccountId>().is_err());
}
