use super::*;

fn hourly() -> PartitionManager {
    PartitionManager::new(
        "db",
        PartitionConfig {
            granularity: PartitionGranularity::Hour,
            chunk_interval_ms: 10 * 60 * 1000,
        },
    )
    .unwrap()
}

#[test]
fn test_partition_bounds_and_path() {
    let manager = hourly();
    // 2024-01-05T13:30:00Z
    let t = 1_704_461_400_000;
    let partition = manager.partition_for_time(t);

    assert_eq!(partition.start_time(), 1_704_459_600_000);
    assert_eq!(partition.end_time(), partition.start_time() + 3_600_000);
    assert_eq!(partition.id(), t / 3_600_000);
    assert_eq!(partition.path(), "db/2024-01-05T13");
    assert_eq!(partition.chunks_per_partition(), 6);
}

#[test]
fn test_partitions_are_cached() {
    let manager = hourly();
    let a = manager.partition_for_time(1_000);
    let b = manager.partition_for_time(2_000);

    assert!(Arc::ptr_eq(&a, &b));
    assert_eq!(manager.partitions().len(), 1);
}

#[test]
fn test_chunk_ranges() {
    let manager = hourly();
    let partition = manager.partition_for_time(0);
    let min = partition.chunk_min_time(25 * 60 * 1000);

    assert_eq!(min, 20 * 60 * 1000);
    assert_eq!(partition.chunk_index(min), 2);
    assert_eq!(partition.column_for_chunk("v", 2), "_v2");
    assert!(partition.in_chunk_range(min, 29 * 60 * 1000));
    assert!(!partition.in_chunk_range(min, 30 * 60 * 1000));
    assert!(partition.is_ahead_of_chunk(min, 30 * 60 * 1000));
    assert!(!partition.is_ahead_of_chunk(min, 19 * 60 * 1000));
}

#[test]
fn test_next_partition() {
    let manager = hourly();
    let first = manager.partition_for_time(0);

    let same = manager.next_partition(&first, 59 * 60 * 1000);
    assert!(Arc::ptr_eq(&first, &same));

    let next = manager.next_partition(&first, 3_600_000);
    assert_eq!(next.id(), 1);
}

#[test]
fn test_negative_times() {
    let manager = hourly();
    let partition = manager.partition_for_time(-1);

    assert_eq!(partition.id(), -1);
    assert!(partition.contains(-1));
    assert_eq!(partition.path(), "db/1969-12-31T23");
}

#[test]
fn test_custom_granularity_path() {
    let manager = PartitionManager::new(
        "db",
        PartitionConfig {
            granularity: PartitionGranularity::Custom(3600),
            chunk_interval_ms: 3600,
        },
    )
    .unwrap();

    assert_eq!(manager.partition_for_time(4000).path(), "db/3600");
}

#[test]
fn test_invalid_config() {
    let result = PartitionManager::new(
        "db",
        PartitionConfig {
            granularity: PartitionGranularity::Hour,
            chunk_interval_ms: 7 * 60 * 1000,
        },
    );
    assert!(matches!(result, Err(Error::InvalidConfig(_))));

    let result = PartitionManager::new(
        "db",
        PartitionConfig {
            granularity: PartitionGranularity::Custom(0),
            chunk_interval_ms: 1,
        },
    );
    assert!(matches!(result, Err(Error::InvalidConfig(_))));
}

#[test]
fn test_times_at_the_ends_of_the_range() {
    let manager = hourly();

    let last = manager.partition_for_time(i64::MAX);
    assert_eq!(last.end_time(), i64::MAX);
    let min = last.chunk_min_time(i64::MAX);
    assert!(last.in_chunk_range(min, i64::MAX));
    assert!(!last.is_ahead_of_chunk(min, i64::MAX));

    let first = manager.partition_for_time(i64::MIN);
    assert_eq!(first.start_time(), i64::MIN);
    assert!(first.contains(i64::MIN));
}
