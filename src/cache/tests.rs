use super::*;
use crate::source::{AggregateTrace, MemoryRecord, MemorySource, NativeHandle};
use std::cell::Cell;
use std::rc::Rc;
use proptest::prelude::*;

fn source(n: usize) -> MemorySource {
    let records = (0..n)
        .map(|i| {
            MemoryRecord::new(format!("scan={}", i + 1))
                .level(1)
                .start_time(i as f64 * 0.1)
                .peaks(vec![100.0 + i as f64], vec![1000.0])
        })
        .collect();
    MemorySource::new(records)
}

#[derive(Debug)]
struct Tracked {
    released: Rc<Cell<usize>>,
}

impl Releasable for Tracked {
    fn on_evict(&mut self) {
        self.released.set(self.released.get() + 1);
    }
}

#[test]
fn test_bounded_cache_evicts_first_inserted() {
    let released = Rc::new(Cell::new(0));
    let mut cache = BoundedCache::new(2);

    for i in 0..2 {
        assert_eq!(cache.insert(i, Tracked { released: released.clone() }), None);
    }
    assert_eq!(cache.insert(2, Tracked { released: released.clone() }), Some(0));

    assert_eq!(cache.indices().collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(released.get(), 1);
    assert_eq!(cache.evictions(), 1);
}

#[test]
fn test_bounded_cache_replace_keeps_position() {
    let released = Rc::new(Cell::new(0));
    let mut cache = BoundedCache::new(2);
    cache.insert(0, Tracked { released: released.clone() });
    cache.insert(1, Tracked { released: released.clone() });

    // Replacing 0 releases the old value but does not requeue it
    assert_eq!(cache.insert(0, Tracked { released: released.clone() }), None);
    assert_eq!(released.get(), 1);
    assert_eq!(cache.insert(2, Tracked { released: released.clone() }), Some(0));
    assert_eq!(released.get(), 2);
}

#[test]
fn test_bounded_cache_drop_releases_remaining() {
    let released = Rc::new(Cell::new(0));
    {
        let mut cache = BoundedCache::new(5);
        for i in 0..3 {
            cache.insert(i, Tracked { released: released.clone() });
        }
    }
    assert_eq!(released.get(), 3);
}

#[test]
fn test_zero_capacity_is_raised() {
    let cache: BoundedCache<DecodedSpectrum> = BoundedCache::new(0);
    assert_eq!(cache.capacity(), 1);
}

#[test]
fn test_raw_eviction_releases_record_once() {
    let src = source(3);
    let log = src.log();
    let mut cache: BoundedCache<Record> = BoundedCache::new(2);

    for i in 0..3 {
        cache.insert(i, src.read(i, DetailTier::Instant).unwrap());
    }
    assert_eq!(log.released(), 1);
    assert!(!cache.contains(0));

    drop(cache);
    assert_eq!(log.released(), 3);
    assert_eq!(log.outstanding(), 0);
}

#[test]
fn test_uncached_reads_release_immediately() {
    let src = source(5);
    let log = src.log();
    let mut cache = RecordCache::default();

    for index in [0, 1, 0, 1, 0] {
        let id = cache.with_record(&src, index, DetailTier::Instant, |r| r.id.clone()).unwrap();
        assert_eq!(id, format!("scan={}", index + 1));
    }

    assert_eq!(log.read_count(), 5);
    assert_eq!(log.outstanding(), 0);
    assert!(!cache.is_raw_active());
}

#[test]
fn test_hot_index_activates_raw_table() {
    let src = source(2);
    let log = src.log();
    let mut cache = RecordCache::default();

    for _ in 0..HOT_INDEX_THRESHOLD {
        cache.with_record(&src, 1, DetailTier::Fast, |_| ()).unwrap();
    }
    assert!(cache.is_raw_active());
    assert_eq!(log.read_count(), HOT_INDEX_THRESHOLD);

    for _ in 0..5 {
        cache.with_record(&src, 1, DetailTier::Fast, |_| ()).unwrap();
    }
    assert_eq!(log.read_count(), HOT_INDEX_THRESHOLD);
    assert_eq!(cache.stats().raw_hits, 5);
    assert_eq!(cache.stats().hot_activations, 1);
    // One record retained by the raw table
    assert_eq!(log.outstanding(), 1);

    cache.disable();
    assert_eq!(log.outstanding(), 0);
    assert!(!cache.is_raw_active());
}

#[test]
fn test_raw_hit_requires_sufficient_tier() {
    let src = source(1);
    let log = src.log();
    let mut cache = RecordCache::new(1);

    cache.with_record(&src, 0, DetailTier::Fast, |_| ()).unwrap();
    assert!(cache.is_raw_active());

    cache.with_record(&src, 0, DetailTier::Instant, |_| ()).unwrap();
    assert_eq!(log.read_count(), 1);

    let has_arrays = cache
        .with_record(&src, 0, DetailTier::FullData, Record::has_arrays)
        .unwrap();
    assert!(has_arrays);
    assert_eq!(log.read_count(), 2);
    // The lower-tier record was replaced and released
    assert_eq!(log.outstanding(), 1);
}

#[test]
fn test_hot_detection_off_while_decoded_enabled() {
    let src = source(1);
    let log = src.log();
    let mut cache = RecordCache::default();
    cache.enable(Some(4));

    for _ in 0..(HOT_INDEX_THRESHOLD * 2) {
        cache.with_record(&src, 0, DetailTier::Instant, |_| ()).unwrap();
    }
    assert!(!cache.is_raw_active());
    assert_eq!(log.read_count(), HOT_INDEX_THRESHOLD * 2);
}

#[test]
fn test_decoded_capacity_two_scenario() {
    let src = source(3);
    let log = src.log();
    let mut cache = RecordCache::default();
    cache.enable(Some(2));

    for i in 0..3 {
        cache.get_or_load(&src, i, false).unwrap();
    }
    assert_eq!(cache.decoded_indices(), vec![1, 2]);
    assert_eq!(log.read_count(), 3);

    cache.get_or_load(&src, 0, false).unwrap();
    assert_eq!(log.read_count(), 4);
    assert_eq!(cache.decoded_indices(), vec![2, 0]);
    assert_eq!(cache.stats().evictions, 2);
}

#[test]
fn test_decoded_hit_without_arrays_is_miss_when_arrays_wanted() {
    let src = source(1);
    let log = src.log();
    let mut cache = RecordCache::default();
    cache.enable(None);

    let meta = cache.get_or_load(&src, 0, false).unwrap();
    assert!(!meta.has_arrays());
    let again = cache.get_or_load(&src, 0, false).unwrap();
    assert_eq!(meta, again);
    assert_eq!(log.read_count(), 1);

    let full = cache.get_or_load(&src, 0, true).unwrap();
    assert!(full.has_arrays());
    assert_eq!(log.read_count(), 2);
    assert_eq!(cache.decoded_len(), 1);

    // Arrays satisfy later metadata-only lookups as well
    cache.get_or_load(&src, 0, false).unwrap();
    assert_eq!(log.read_count(), 2);
}

#[test]
fn test_disable_then_enable_starts_empty() {
    let src = source(3);
    let log = src.log();
    let mut cache = RecordCache::default();
    cache.enable(Some(3));
    for i in 0..3 {
        cache.get_or_load(&src, i, true).unwrap();
    }
    assert_eq!(cache.decoded_len(), 3);

    cache.disable();
    cache.enable(Some(3));
    assert_eq!(cache.decoded_len(), 0);

    cache.get_or_load(&src, 0, true).unwrap();
    assert_eq!(log.reads_of(0), 2);
}

#[test]
fn test_source_errors_propagate() {
    let src = source(1);
    let mut cache = RecordCache::default();
    cache.enable(None);

    let err = cache.get_or_load(&src, 9, false).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(cache.decoded_len(), 0);
}

/// Native handle the engine refuses to take back.
#[derive(Debug)]
struct RefusedHandle {
    attempts: Rc<Cell<usize>>,
}

impl NativeHandle for RefusedHandle {
    fn release(&mut self) -> Result<(), SourceError> {
        self.attempts.set(self.attempts.get() + 1);
        Err(SourceError::ReleaseError("engine refused handle".to_string()))
    }
}

fn refused_record(index: usize, tier: DetailTier, attempts: &Rc<Cell<usize>>) -> Record {
    Record::new(index, format!("scan={}", index + 1), tier).with_handle(Box::new(RefusedHandle {
        attempts: Rc::clone(attempts),
    }))
}

/// Every read hands out a handle whose release fails.
#[derive(Debug)]
struct RefusingSource {
    len: usize,
    attempts: Rc<Cell<usize>>,
}

impl RecordSource for RefusingSource {
    fn len(&self) -> usize {
        self.len
    }

    fn read(&self, index: usize, tier: DetailTier) -> Result<Record, SourceError> {
        if index >= self.len {
            return Err(SourceError::NotFound(format!("record index {index} out of range")));
        }
        Ok(refused_record(index, tier, &self.attempts))
    }

    fn read_aggregate(&self, channel: usize, _full: bool) -> Result<AggregateTrace, SourceError> {
        Err(SourceError::NotFound(format!("no aggregate trace at channel {channel}")))
    }
}

#[test]
fn test_explicit_release_failure_is_not_retried() {
    let attempts = Rc::new(Cell::new(0));
    let mut record = refused_record(0, DetailTier::Instant, &attempts);

    assert!(matches!(record.release(), Err(SourceError::ReleaseError(_))));
    assert!(!record.holds_native_handle());
    assert!(record.release().is_ok());
    drop(record);

    assert_eq!(attempts.get(), 1);
}

#[test]
fn test_failed_release_on_evict_clear_and_drop_attempted_once() {
    let attempts = Rc::new(Cell::new(0));
    let mut table: BoundedCache<Record> = BoundedCache::new(1);

    assert_eq!(table.insert(0, refused_record(0, DetailTier::Full, &attempts)), None);
    assert_eq!(table.insert(1, refused_record(1, DetailTier::Full, &attempts)), Some(0));
    assert_eq!(attempts.get(), 1);

    // Replacing in place releases the old record
    table.insert(1, refused_record(1, DetailTier::FullData, &attempts));
    assert_eq!(attempts.get(), 2);

    table.clear();
    assert_eq!(attempts.get(), 3);
    assert!(table.is_empty());

    table.insert(2, refused_record(2, DetailTier::Full, &attempts));
    drop(table);
    assert_eq!(attempts.get(), 4);
}

#[test]
fn test_failed_release_never_fails_a_read() {
    let attempts = Rc::new(Cell::new(0));
    let src = RefusingSource {
        len: 3,
        attempts: Rc::clone(&attempts),
    };

    let mut cache = RecordCache::default();
    for index in 0..3 {
        let id = cache.with_record(&src, index, DetailTier::Instant, |r| r.id.clone()).unwrap();
        assert_eq!(id, format!("scan={}", index + 1));
    }
    assert_eq!(attempts.get(), 3);

    // Raw table on after two requests; the kept record is evicted by index 1
    let mut hot = RecordCache::new(2);
    attempts.set(0);
    hot.with_record(&src, 0, DetailTier::Instant, |_| ()).unwrap();
    hot.with_record(&src, 0, DetailTier::Instant, |_| ()).unwrap();
    assert!(hot.is_raw_active());
    assert_eq!(attempts.get(), 1);

    hot.with_record(&src, 1, DetailTier::Instant, |_| ()).unwrap();
    assert_eq!(attempts.get(), 2);
    assert_eq!(hot.stats().evictions, 1);

    hot.disable();
    drop(hot);
    drop(cache);
    assert_eq!(attempts.get(), 3);
}

proptest! {
    #[test]
    fn prop_decoded_table_stays_bounded(
        capacity in 1usize..8,
        requests in proptest::collection::vec(0usize..16, 1..64),
    ) {
        let src = source(16);
        let mut cache = RecordCache::default();
        cache.enable(Some(capacity));

        for index in &requests {
            cache.get_or_load(&src, *index, false).unwrap();
            prop_assert!(cache.decoded_len() <= capacity);
        }

        let held = cache.decoded_indices();
        let mut unique = held.clone();
        unique.sort_unstable();
        unique.dedup();
        prop_assert_eq!(unique.len(), held.len());
    }

    #[test]
    fn prop_every_raw_record_released_once(
        capacity in 1usize..6,
        requests in proptest::collection::vec(0usize..10, 0..40),
    ) {
        let src = source(10);
        let log = src.log();
        {
            let mut table: BoundedCache<Record> = BoundedCache::new(capacity);
            for index in &requests {
                table.insert(*index, src.read(*index, DetailTier::Instant).unwrap());
                prop_assert_eq!(log.outstanding(), table.len());
            }
        }
        prop_assert_eq!(log.released(), requests.len());
        prop_assert_eq!(log.outstanding(), 0);
    }
}
