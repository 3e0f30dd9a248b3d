//! Memoizing highlighter keyed by `(source, language)`.
//!
//! Highlighting is a pure function of its inputs, so results can be shared
//! freely. The cache is bounded by entry count; when full it is cleared
//! wholesale (replays of the same snippet dominate, fancy eviction buys
//! nothing here).

use crate::{HighlightError, Highlighter, Language};
use ahash::AHashMap;
use core_text::StyledRun;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

pub const DEFAULT_CACHE_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheMetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub clears: u64,
}

#[derive(Debug, Default)]
struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    clears: AtomicU64,
}

pub struct CachedHighlighter<H> {
    inner: H,
    entries: Mutex<AHashMap<Language, AHashMap<String, Arc<[StyledRun]>>>>,
    capacity: usize,
    metrics: CacheMetrics,
}

impl<H: Highlighter> CachedHighlighter<H> {
    pub fn new(inner: H) -> Self {
        Self::with_capacity(inner, DEFAULT_CACHE_CAPACITY)
    }

    pub fn with_capacity(inner: H, capacity: usize) -> Self {
        Self {
            inner,
            entries: Mutex::new(AHashMap::new()),
            capacity: capacity.max(1),
            metrics: CacheMetrics::default(),
        }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    pub fn metrics_snapshot(&self) -> CacheMetricsSnapshot {
        CacheMetricsSnapshot {
            hits: self.metrics.hits.load(Ordering::Relaxed),
            misses: self.metrics.misses.load(Ordering::Relaxed),
            clears: self.metrics.clears.load(Ordering::Relaxed),
        }
    }

    pub fn len(&self) -> usize {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.values().map(|by_source| by_source.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, source: &str, language: Language) -> Option<Arc<[StyledRun]>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.get(&language)?.get(source).cloned()
    }

    fn store(&self, source: &str, language: Language, runs: Arc<[StyledRun]>) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        let total: usize = entries.values().map(|by_source| by_source.len()).sum();
        if total >= self.capacity {
            entries.clear();
            self.metrics.clears.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(target: "highlight.cache", capacity = self.capacity, "cache_cleared");
        }
        entries
            .entry(language)
            .or_default()
            .insert(source.to_string(), runs);
    }
}

impl<H: Highlighter> Highlighter for CachedHighlighter<H> {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    fn highlight(&self, source: &str, language: Language) -> Result<Vec<StyledRun>, HighlightError> {
        if let Some(runs) = self.lookup(source, language) {
            self.metrics.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(target: "highlight.cache", language = language.label(), "cache_hit");
            return Ok(runs.to_vec());
        }
        self.metrics.misses.fetch_add(1, Ordering::Relaxed);
        // Failures are not cached: the next call retries the backend.
        let runs = self.inner.highlight(source, language)?;
        self.store(source, language, Arc::from(runs.as_slice()));
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingHighlighter {
        calls: AtomicUsize,
        fail: bool,
    }

    impl CountingHighlighter {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    impl Highlighter for CountingHighlighter {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn highlight(&self, source: &str, _language: Language) -> Result<Vec<StyledRun>, HighlightError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(HighlightError::Unavailable("backend down".into()));
            }
            Ok(vec![StyledRun::plain(source)])
        }
    }

    #[test]
    fn second_call_is_served_from_cache() {
        let cache = CachedHighlighter::new(CountingHighlighter::new(false));
        let a = cache.highlight("x = 1", Language::Python).unwrap();
        let b = cache.highlight("x = 1", Language::Python).unwrap();
        assert_eq!(a, b);
        assert_eq!(cache.inner().calls.load(Ordering::SeqCst), 1);
        let m = cache.metrics_snapshot();
        assert_eq!((m.hits, m.misses), (1, 1));
    }

    #[test]
    fn language_is_part_of_the_key() {
        let cache = CachedHighlighter::new(CountingHighlighter::new(false));
        cache.highlight("x", Language::Python).unwrap();
        cache.highlight("x", Language::Bash).unwrap();
        assert_eq!(cache.inner().calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn failures_are_not_cached() {
        let cache = CachedHighlighter::new(CountingHighlighter::new(true));
        assert!(cache.highlight("x", Language::Python).is_err());
        assert!(cache.highlight("x", Language::Python).is_err());
        assert_eq!(cache.inner().calls.load(Ordering::SeqCst), 2);
        assert!(cache.is_empty());
    }

    #[test]
    fn full_cache_is_cleared_before_insert() {
        let cache = CachedHighlighter::with_capacity(CountingHighlighter::new(false), 2);
        cache.highlight("a", Language::Python).unwrap();
        cache.highlight("b", Language::Python).unwrap();
        cache.highlight("c", Language::Python).unwrap();
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.metrics_snapshot().clears, 1);
    }
}
