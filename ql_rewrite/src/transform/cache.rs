//! Memoization of sorted renderings
//!
//! The strategy is picked once per declared query:
//!
//! - [`SortCacheStrategy::NoCache`] renders on every call, for callers whose
//!   returned type changes between calls;
//! - [`SortCacheStrategy::UnsortedOnly`] keeps the single unsorted rendering
//!   and rejects sorted requests;
//! - [`SortCacheStrategy::Lru`] keeps the unsorted rendering in its own slot
//!   and sorted renderings in a bounded LRU split into independently locked
//!   shards.
//!
//! The unsorted rendering is computed once. Concurrent callers may render the
//! same sorted entry twice; the first stored value wins and both see identical
//! text.

use super::dto::ReturnedType;
use super::{TransformError, TransformResult};
use crate::config::runtime::RewritePreferences;
use crate::logging::codes;
use crate::sort::Sort;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::{Mutex, OnceLock};

/// Cache key for one sorted rendering
///
/// Equality and hashing cover the query text and the sort only. The returned
/// type is carried so a miss can render, but a cache only ever sees one
/// returned type per query.
#[derive(Debug, Clone)]
pub struct CachableQuery {
    pub query: String,
    pub sort: Sort,
    pub returned_type: ReturnedType,
}

impl CachableQuery {
    pub fn new(query: impl Into<String>, sort: Sort, returned_type: ReturnedType) -> Self {
        Self {
            query: query.into(),
            sort,
            returned_type,
        }
    }
}

impl PartialEq for CachableQuery {
    fn eq(&self, other: &Self) -> bool {
        self.query == other.query && self.sort == other.sort
    }
}

impl Eq for CachableQuery {}

impl Hash for CachableQuery {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.query.hash(state);
        self.sort.hash(state);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortCacheStrategy {
    NoCache,
    UnsortedOnly,
    Lru { capacity: usize },
}

#[derive(Debug)]
struct CacheEntry {
    value: String,
    last_used: u64,
}

/// One independently locked slice of the LRU
#[derive(Debug)]
struct LruSegment {
    entries: HashMap<CachableQuery, CacheEntry>,
    capacity: usize,
    clock: u64,
}

impl LruSegment {
    fn new(capacity: usize) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            capacity,
            clock: 0,
        }
    }

    fn tick(&mut self) -> u64 {
        self.clock += 1;
        self.clock
    }

    fn get(&mut self, key: &CachableQuery) -> Option<String> {
        let now = self.tick();
        let entry = self.entries.get_mut(key)?;
        entry.last_used = now;
        Some(entry.value.clone())
    }

    /// Store `value` unless another caller got there first; returns the stored text
    fn insert(&mut self, key: CachableQuery, value: String) -> String {
        let now = self.tick();
        if let Some(existing) = self.entries.get_mut(&key) {
            existing.last_used = now;
            return existing.value.clone();
        }

        if self.entries.len() >= self.capacity {
            self.evict_one();
        }
        self.entries.insert(
            key,
            CacheEntry {
                value: value.clone(),
                last_used: now,
            },
        );
        value
    }

    fn evict_one(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone());
        if let Some(key) = oldest {
            self.entries.remove(&key);
        }
    }
}

/// The single unsorted rendering, filled by exactly one caller
#[derive(Debug, Default)]
struct UnsortedSlot {
    value: OnceLock<String>,
    filling: Mutex<()>,
}

impl UnsortedSlot {
    fn get_or_render<F>(&self, key: &CachableQuery, render: F) -> TransformResult<String>
    where
        F: FnOnce(&CachableQuery) -> TransformResult<String>,
    {
        if let Some(value) = self.value.get() {
            return Ok(value.clone());
        }

        let _filling = self.filling.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(value) = self.value.get() {
            return Ok(value.clone());
        }
        let value = render(key)?;
        Ok(self.value.get_or_init(|| value).clone())
    }
}

#[derive(Debug)]
enum CacheState {
    NoCache,
    UnsortedOnly {
        unsorted: UnsortedSlot,
    },
    Lru {
        unsorted: UnsortedSlot,
        segments: Vec<Mutex<LruSegment>>,
        capacity: usize,
    },
}

/// Rendering cache for one declared query
#[derive(Debug)]
pub struct SortRewriteCache {
    state: CacheState,
}

impl SortRewriteCache {
    /// Cache with the configured default shard count
    pub fn new(strategy: SortCacheStrategy) -> Self {
        Self::with_shards(strategy, RewritePreferences::default().sort_cache_shards)
    }

    /// Bounded LRU sized from `preferences`
    pub fn from_preferences(preferences: &RewritePreferences) -> Self {
        Self::with_shards(
            SortCacheStrategy::Lru {
                capacity: preferences.sort_cache_capacity,
            },
            preferences.sort_cache_shards,
        )
    }

    pub fn with_shards(strategy: SortCacheStrategy, shards: usize) -> Self {
        let state = match strategy {
            SortCacheStrategy::NoCache => CacheState::NoCache,
            SortCacheStrategy::UnsortedOnly => CacheState::UnsortedOnly {
                unsorted: UnsortedSlot::default(),
            },
            SortCacheStrategy::Lru { capacity } => {
                let capacity = capacity.max(1);
                let shards = shards.clamp(1, capacity);
                let segments = (0..shards)
                    .map(|index| {
                        let share = capacity / shards + usize::from(index < capacity % shards);
                        Mutex::new(LruSegment::new(share))
                    })
                    .collect();
                CacheState::Lru {
                    unsorted: UnsortedSlot::default(),
                    segments,
                    capacity,
                }
            }
        };
        Self { state }
    }

    pub fn strategy(&self) -> SortCacheStrategy {
        match &self.state {
            CacheState::NoCache => SortCacheStrategy::NoCache,
            CacheState::UnsortedOnly { .. } => SortCacheStrategy::UnsortedOnly,
            CacheState::Lru { capacity, .. } => SortCacheStrategy::Lru { capacity: *capacity },
        }
    }

    /// Sorted renderings currently held
    pub fn len(&self) -> usize {
        match &self.state {
            CacheState::Lru { segments, .. } => segments
                .iter()
                .map(|segment| segment.lock().map_or(0, |segment| segment.entries.len()))
                .sum(),
            _ => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cached rendering for `key`, calling `render` on a miss
    pub fn get_or_render<F>(&self, key: &CachableQuery, render: F) -> TransformResult<String>
    where
        F: FnOnce(&CachableQuery) -> TransformResult<String>,
    {
        match &self.state {
            CacheState::NoCache => render(key),

            CacheState::UnsortedOnly { unsorted } => {
                if key.sort.is_sorted() {
                    let error = TransformError::SortNotSupported {
                        sort: key.sort.to_string(),
                    };
                    log_error!(error.error_code(), "Sorted request against an unsorted-only cache",
                        "sort" => key.sort
                    );
                    return Err(error);
                }
                unsorted.get_or_render(key, render)
            }

            CacheState::Lru {
                unsorted, segments, ..
            } => {
                if key.sort.is_unsorted() {
                    return unsorted.get_or_render(key, render);
                }

                let index = segment_index(key, segments.len());
                let segment = &segments[index];

                if let Some(hit) = lock_segment(segment, index).get(key) {
                    log_debug!("Sort cache hit", "segment" => index);
                    return Ok(hit);
                }

                let value = render(key)?;
                Ok(lock_segment(segment, index).insert(key.clone(), value))
            }
        }
    }
}

fn segment_index(key: &CachableQuery, segments: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % segments as u64) as usize
}

/// A poisoned segment only lost cached text; start it over empty
fn lock_segment(segment: &Mutex<LruSegment>, index: usize) -> std::sync::MutexGuard<'_, LruSegment> {
    segment.lock().unwrap_or_else(|poisoned| {
        log_warning!(codes::warning::SORT_CACHE_SHARD_POISONED,
            "Sort cache segment poisoned, clearing it",
            "segment" => index
        );
        let mut guard = poisoned.into_inner();
        guard.entries.clear();
        guard
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sort::Order;
    use assert_matches::assert_matches;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    const QUERY: &str = "select u from User u";

    fn key(sort: Sort) -> CachableQuery {
        CachableQuery::new(QUERY, sort, ReturnedType::Entity)
    }

    fn render_counting(calls: &AtomicUsize) -> impl FnOnce(&CachableQuery) -> TransformResult<String> + '_ {
        move |key: &CachableQuery| {
            calls.fetch_add(1, Ordering::SeqCst);
            Ok(format!("{} /* {} */", key.query, key.sort))
        }
    }

    #[test]
    fn test_key_ignores_returned_type() {
        let entity = key(Sort::by([Order::asc("name")]));
        let dto = CachableQuery::new(QUERY, entity.sort.clone(), ReturnedType::dto("Dto", ["name"]));
        assert_eq!(entity, dto);
        assert_ne!(entity, key(Sort::by([Order::desc("name")])));
    }

    #[test]
    fn test_no_cache_always_renders() {
        let cache = SortRewriteCache::new(SortCacheStrategy::NoCache);
        let calls = AtomicUsize::new(0);
        for _ in 0..3 {
            cache.get_or_render(&key(Sort::unsorted()), render_counting(&calls)).unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_unsorted_only() {
        let cache = SortRewriteCache::new(SortCacheStrategy::UnsortedOnly);
        let calls = AtomicUsize::new(0);
        let first = cache.get_or_render(&key(Sort::unsorted()), render_counting(&calls)).unwrap();
        let second = cache.get_or_render(&key(Sort::unsorted()), render_counting(&calls)).unwrap();
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let error = cache
            .get_or_render(&key(Sort::by([Order::asc("name")])), render_counting(&calls))
            .unwrap_err();
        assert_matches!(error, TransformError::SortNotSupported { .. });
    }

    #[test]
    fn test_lru_hits_and_bounds() {
        let cache = SortRewriteCache::with_shards(SortCacheStrategy::Lru { capacity: 4 }, 2);
        let calls = AtomicUsize::new(0);

        let sorted = key(Sort::by([Order::asc("name")]));
        cache.get_or_render(&sorted, render_counting(&calls)).unwrap();
        cache.get_or_render(&sorted, render_counting(&calls)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        for i in 0..50 {
            let sort = Sort::by([Order::asc(format!("p{}", i))]);
            cache.get_or_render(&key(sort), render_counting(&calls)).unwrap();
            assert!(cache.len() <= 4);
        }
        assert_eq!(cache.strategy(), SortCacheStrategy::Lru { capacity: 4 });
    }

    #[test]
    fn test_lru_unsorted_slot() {
        let cache = SortRewriteCache::new(SortCacheStrategy::Lru { capacity: 8 });
        let calls = AtomicUsize::new(0);
        cache.get_or_render(&key(Sort::unsorted()), render_counting(&calls)).unwrap();
        cache.get_or_render(&key(Sort::unsorted()), render_counting(&calls)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_least_recently_used_is_evicted() {
        let cache = SortRewriteCache::with_shards(SortCacheStrategy::Lru { capacity: 2 }, 1);
        let calls = AtomicUsize::new(0);
        let a = key(Sort::by([Order::asc("a")]));
        let b = key(Sort::by([Order::asc("b")]));
        let c = key(Sort::by([Order::asc("c")]));

        cache.get_or_render(&a, render_counting(&calls)).unwrap();
        cache.get_or_render(&b, render_counting(&calls)).unwrap();
        cache.get_or_render(&a, render_counting(&calls)).unwrap();
        cache.get_or_render(&c, render_counting(&calls)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        cache.get_or_render(&a, render_counting(&calls)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        cache.get_or_render(&b, render_counting(&calls)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_concurrent_callers_see_identical_text() {
        let cache = Arc::new(SortRewriteCache::with_shards(SortCacheStrategy::Lru { capacity: 16 }, 4));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                thread::spawn(move || {
                    (0..32)
                        .map(|i| {
                            let sort = Sort::by([Order::desc(format!("p{}", i % 20))]);
                            cache
                                .get_or_render(&key(sort), |key| Ok(format!("{} order by {}", key.query, key.sort)))
                                .unwrap()
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let results: Vec<Vec<String>> = handles.into_iter().map(|handle| handle.join().unwrap()).collect();
        for result in &results[1..] {
            assert_eq!(result, &results[0]);
        }
        assert!(cache.len() <= 16);
    }

    #[test]
    fn test_unsorted_slot_renders_once_under_contention() {
        use crate::grammar::Dialect;
        use crate::introspect::introspect;
        use crate::syntax::parse;
        use crate::transform::apply_sorting_with;
        use std::sync::Barrier;

        let statement = parse("select u from User u where u.active = true", Dialect::Jpql).unwrap();
        let info = introspect(&statement);
        let cache = SortRewriteCache::with_shards(SortCacheStrategy::Lru { capacity: 8 }, 2);
        let calls = AtomicUsize::new(0);
        let barrier = Barrier::new(8);

        let results: Vec<String> = thread::scope(|scope| {
            let handles: Vec<_> = (0..8)
                .map(|_| {
                    scope.spawn(|| {
                        barrier.wait();
                        let key = CachableQuery::new(QUERY, Sort::unsorted(), ReturnedType::Entity);
                        cache
                            .get_or_render(&key, |key| {
                                calls.fetch_add(1, Ordering::SeqCst);
                                thread::sleep(std::time::Duration::from_millis(5));
                                apply_sorting_with(&statement, &info, &key.sort, &key.returned_type)
                                    .map(|stream| stream.render())
                            })
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|handle| handle.join().unwrap()).collect()
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(results
            .iter()
            .all(|result| result == "select u from User u where u.active = true"));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_capacity_split_across_segments() {
        let cache = SortRewriteCache::with_shards(SortCacheStrategy::Lru { capacity: 5 }, 3);
        let CacheState::Lru { segments, .. } = &cache.state else {
            panic!("expected an lru cache");
        };
        let capacities: Vec<usize> = segments
            .iter()
            .map(|segment| segment.lock().unwrap().capacity)
            .collect();
        assert_eq!(capacities, vec![2, 2, 1]);
    }
}
