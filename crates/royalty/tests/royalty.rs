use royalty::{Address, Dataset, DatasetStore, InMemoryStore, JsonFileStore, RoyaltyError};

fn addr(n: u8) -> Address {
    Address::parse(&format!("0x{:040x}", n)).unwrap()
}

#[test]
fn address_parsing_normalizes_case() {
    let a = Address::parse("0xABCDEF0123456789abcdef0123456789ABCDEF01").unwrap();
    assert_eq!(a.as_str(), "0xabcdef0123456789abcdef0123456789abcdef01");

    assert!(Address::parse("abcdef").is_err());
    assert!(Address::parse("0x1234").is_err());
    assert!(Address::parse("0xzzcdef0123456789abcdef0123456789abcdef01").is_err());
}

#[test]
fn add_contributor_happy_path() {
    let owner = addr(1);
    let mut ds = Dataset::new("weather", owner.clone());

    ds.add_contributor(addr(2), 60, &owner).unwrap();
    ds.add_contributor(addr(3), 40, &owner).unwrap();

    assert_eq!(ds.contributors.len(), 2);
    assert_eq!(ds.allocated_percentage(), 100);
    assert_eq!(ds.remaining_percentage(), 0);
    assert_eq!(ds.contributor(&addr(2)).unwrap().cumulative_reward, 0);
}

#[test]
fn add_contributor_rejects_non_owner() {
    let owner = addr(1);
    let mut ds = Dataset::new("weather", owner.clone());

    let err = ds.add_contributor(addr(3), 10, &addr(2)).unwrap_err();
    assert!(matches!(err, RoyaltyError::Unauthorized(_)));
    assert!(ds.contributors.is_empty());
}

#[test]
fn add_contributor_rejects_duplicates() {
    let owner = addr(1);
    let mut ds = Dataset::new("weather", owner.clone());
    ds.add_contributor(addr(2), 10, &owner).unwrap();

    let err = ds.add_contributor(addr(2), 10, &owner).unwrap_err();
    assert_eq!(err, RoyaltyError::DuplicateContributor(addr(2)));
    assert_eq!(ds.contributors.len(), 1);
}

#[test]
fn percentage_overflow_leaves_state_unchanged() {
    let owner = addr(1);
    let mut ds = Dataset::new("weather", owner.clone());
    ds.add_contributor(addr(2), 50, &owner).unwrap();
    ds.add_contributor(addr(3), 20, &owner).unwrap();
    assert_eq!(ds.remaining_percentage(), 30);

    // remaining is 30, adding 50 must fail
    let err = ds.add_contributor(addr(4), 50, &owner).unwrap_err();
    assert_eq!(
        err,
        RoyaltyError::PercentageOverflow {
            allocated: 70,
            requested: 50
        }
    );
    assert_eq!(ds.contributors.len(), 2);
    assert_eq!(ds.allocated_percentage(), 70);
}

#[test]
fn percentage_bounds_are_enforced() {
    let owner = addr(1);
    let mut ds = Dataset::new("weather", owner.clone());
    assert_eq!(
        ds.add_contributor(addr(2), 0, &owner).unwrap_err(),
        RoyaltyError::InvalidPercentage(0)
    );
    assert_eq!(
        ds.add_contributor(addr(2), 101, &owner).unwrap_err(),
        RoyaltyError::InvalidPercentage(101)
    );
}

#[test]
fn remove_contributor_owner_only() {
    let owner = addr(1);
    let mut ds = Dataset::new("weather", owner.clone());
    ds.add_contributor(addr(2), 10, &owner).unwrap();

    assert!(matches!(
        ds.remove_contributor(&addr(2), &addr(2)).unwrap_err(),
        RoyaltyError::Unauthorized(_)
    ));
    ds.remove_contributor(&addr(2), &owner).unwrap();
    assert!(ds.contributors.is_empty());

    assert_eq!(
        ds.remove_contributor(&addr(2), &owner).unwrap_err(),
        RoyaltyError::ContributorNotFound(addr(2))
    );
}

#[test]
fn record_usage_sixty_forty_split() {
    let owner = addr(1);
    let mut ds = Dataset::new("weather", owner.clone());
    ds.add_contributor(addr(2), 60, &owner).unwrap();
    ds.add_contributor(addr(3), 40, &owner).unwrap();

    let split = ds.record_usage(addr(9), "RandomForest", 9150, 100).unwrap();
    assert_eq!(split.distribution[&addr(2)], 60);
    assert_eq!(split.distribution[&addr(3)], 40);
    assert_eq!(split.remainder, 0);

    assert_eq!(ds.usage_events.len(), 1);
    assert_eq!(ds.pending_pool, 100);
    assert_eq!(ds.contributor(&addr(2)).unwrap().cumulative_reward, 60);
    assert_eq!(ds.contributor(&addr(3)).unwrap().cumulative_reward, 40);
}

#[test]
fn record_usage_keeps_rounding_remainder() {
    let owner = addr(1);
    let mut ds = Dataset::new("weather", owner.clone());
    ds.add_contributor(addr(2), 33, &owner).unwrap();
    ds.add_contributor(addr(3), 33, &owner).unwrap();
    ds.add_contributor(addr(4), 34, &owner).unwrap();

    let split = ds.record_usage(addr(9), "NeuralNetwork", 8000, 10).unwrap();
    assert_eq!(split.distributed, 9);
    assert_eq!(split.remainder, 1);
    // remainder is not re-assigned to anyone
    assert_eq!(ds.contributor(&addr(4)).unwrap().cumulative_reward, 3);
    assert_eq!(ds.pending_pool, 10);
}

#[test]
fn record_usage_validates_inputs() {
    let owner = addr(1);
    let mut ds = Dataset::new("weather", owner.clone());

    assert_eq!(
        ds.record_usage(addr(9), "m", 100, 10).unwrap_err(),
        RoyaltyError::NoContributors
    );

    ds.add_contributor(addr(2), 100, &owner).unwrap();
    assert_eq!(
        ds.record_usage(addr(9), "m", 10_001, 10).unwrap_err(),
        RoyaltyError::InvalidAccuracy(10_001)
    );
    assert_eq!(
        ds.record_usage(addr(9), "m", 100, 0).unwrap_err(),
        RoyaltyError::EmptyRewardPool
    );
    assert!(ds.usage_events.is_empty());
    assert_eq!(ds.pending_pool, 0);
}

#[test]
fn usage_events_accumulate_pending_pool() {
    let owner = addr(1);
    let mut ds = Dataset::new("weather", owner.clone());
    ds.add_contributor(addr(2), 100, &owner).unwrap();

    ds.record_usage(addr(9), "m1", 100, 30).unwrap();
    ds.record_usage(addr(9), "m2", 200, 70).unwrap();

    assert_eq!(ds.pending_pool, 100);
    assert_eq!(ds.usage_events.len(), 2);
    assert_eq!(ds.contributor(&addr(2)).unwrap().cumulative_reward, 100);
}

#[test]
fn reward_accumulation_rejects_overflow() {
    let owner = addr(1);
    let mut ds = Dataset::new("weather", owner.clone());
    ds.add_contributor(addr(2), 100, &owner).unwrap();

    ds.record_usage(addr(9), "m1", 100, u64::MAX).unwrap();
    assert_eq!(ds.pending_pool, u64::MAX);

    // a second, individually valid event must be rejected, not wrap around
    let err = ds.record_usage(addr(9), "m2", 100, 2).unwrap_err();
    assert_eq!(err, RoyaltyError::RewardOverflow);
    assert_eq!(ds.usage_events.len(), 1);
    assert_eq!(ds.pending_pool, u64::MAX);
    assert_eq!(ds.contributor(&addr(2)).unwrap().cumulative_reward, u64::MAX);
}

#[test]
fn oversubscribed_persisted_record_reads_as_fully_allocated() {
    // Simulates a hand-edited store file whose shares exceed 100%.
    let owner = addr(1);
    let mut ds = Dataset::new("weather", owner.clone());
    ds.add_contributor(addr(2), 60, &owner).unwrap();
    ds.contributors[0].percentage = 110;

    assert_eq!(ds.allocated_percentage(), 110);
    assert_eq!(ds.remaining_percentage(), 0);
}

#[test]
fn in_memory_store_round_trip() {
    let store = InMemoryStore::new();
    let owner = addr(1);
    let mut ds = Dataset::new("weather", owner.clone());
    ds.add_contributor(addr(2), 25, &owner).unwrap();

    store.save(&ds).unwrap();
    let loaded = store.load(ds.id).unwrap().unwrap();
    assert_eq!(loaded.name, "weather");
    assert_eq!(loaded.contributors.len(), 1);

    assert!(store.load(uuid::Uuid::new_v4()).unwrap().is_none());
}

#[test]
fn json_file_store_round_trip() {
    let path = std::env::temp_dir().join(format!("royalty-store-{}.json", uuid::Uuid::new_v4()));
    let store = JsonFileStore::new(&path).unwrap();

    let owner = addr(1);
    let mut ds = Dataset::new("weather", owner.clone());
    ds.add_contributor(addr(2), 60, &owner).unwrap();
    ds.record_usage(addr(9), "m", 100, 50).unwrap();
    store.save(&ds).unwrap();

    // overwrite semantics: save again with updated state
    ds.ledger_id = Some(7);
    store.save(&ds).unwrap();

    let loaded = store.load(ds.id).unwrap().unwrap();
    assert_eq!(loaded.ledger_id, Some(7));
    assert_eq!(loaded.usage_events.len(), 1);
    assert_eq!(store.list().unwrap().len(), 1);

    let _ = std::fs::remove_file(&path);
}
