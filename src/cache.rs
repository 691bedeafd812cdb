//! Response cache for repeated-question deduplication.
//!
//! [`ResponseCache`] maps a fingerprint of (caller, context, message) to a
//! previously relayed reply. A hit within the TTL window skips the
//! completion engine entirely; the caller still passes the budget gate
//! first, and the relay releases the reservation on a hit.
//!
//! # Failure semantics
//!
//! The cache is fail-open: it must never fail the caller's request. With
//! the in-memory moka backend the operations are infallible, so "fail
//! open" degenerates to "an absent entry is a miss". A distributed
//! backend slotted in behind the same surface must swallow its own errors
//! and report a miss.
//!
//! # Fingerprint
//!
//! The key hashes the caller id, context label, and the *complete*
//! whitespace-normalized message (SipHash via `DefaultHasher`). Distinct
//! messages sharing a prefix therefore never collide by construction;
//! residual risk is limited to 64-bit hash collisions.
//!
//! # Concurrency
//!
//! Shared process-wide across concurrent requests. Entries are immutable
//! once written; a racing overwrite of the same fingerprint is
//! last-write-wins, which is acceptable because both writers hold an
//! equivalent payload for the same inputs.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use moka::future::Cache;

use crate::telemetry;
use crate::types::{CallerId, Usage};

/// Configuration for the response cache.
///
/// ```rust
/// # use heimdallr::CacheConfig;
/// # use std::time::Duration;
/// let config = CacheConfig::new()
///     .max_entries(5_000)
///     .ttl(Duration::from_secs(60));
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Maximum number of cached entries. Default: 1,000.
    pub max_entries: u64,
    /// Time-to-live for cached entries. Default: 5 minutes.
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            ttl: Duration::from_secs(300),
        }
    }
}

impl CacheConfig {
    /// Create a new config with the default capacity and TTL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of cached entries.
    pub fn max_entries(mut self, n: u64) -> Self {
        self.max_entries = n;
        self
    }

    /// Set the time-to-live for cached entries.
    pub fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }
}

/// Cached reply payload: the relayed text plus echo metadata.
#[derive(Debug, Clone)]
pub struct CachedReply {
    pub text: String,
    pub model: Option<String>,
    pub usage: Option<Usage>,
}

/// In-memory reply cache keyed on (caller, context, message).
///
/// Uses moka's async LRU + TTL cache, the same backend the rest of the
/// stack uses for bounded in-process caches. Expiry is lazy — an expired
/// entry is simply not returned, and physical eviction happens during
/// moka's maintenance (see [`sweep`](Self::sweep)).
pub struct ResponseCache {
    cache: Cache<u64, CachedReply>,
}

impl ResponseCache {
    /// Create a new response cache with the given configuration.
    pub fn new(config: &CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.max_entries)
            .time_to_live(config.ttl)
            .build();
        Self { cache }
    }

    /// Look up a cached reply.
    ///
    /// Returns `None` on miss or when the entry has aged past the TTL.
    /// Emits cache hit/miss metrics.
    pub async fn lookup(
        &self,
        caller: &CallerId,
        context: Option<&str>,
        message: &str,
    ) -> Option<CachedReply> {
        let key = fingerprint(caller, context, message);
        match self.cache.get(&key).await {
            Some(reply) => {
                metrics::counter!(telemetry::CACHE_HITS_TOTAL).increment(1);
                Some(reply)
            }
            None => {
                metrics::counter!(telemetry::CACHE_MISSES_TOTAL).increment(1);
                None
            }
        }
    }

    /// Insert a reply, overwriting any existing entry for the fingerprint.
    pub async fn insert(
        &self,
        caller: &CallerId,
        context: Option<&str>,
        message: &str,
        reply: CachedReply,
    ) {
        let key = fingerprint(caller, context, message);
        self.cache.insert(key, reply).await;
    }

    /// Run pending maintenance: evict expired entries and enforce the
    /// capacity bound. Returns the number of entries removed.
    ///
    /// Calling this is optional — expired entries are never *served*
    /// either way — but it reclaims memory eagerly.
    pub async fn sweep(&self) -> u64 {
        let before = self.cache.entry_count();
        self.cache.run_pending_tasks().await;
        before.saturating_sub(self.cache.entry_count())
    }

    /// Number of entries currently in the cache (may include entries
    /// pending eviction).
    pub fn len(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict all entries.
    pub fn clear(&self) {
        self.cache.invalidate_all();
    }
}

/// Compute the cache fingerprint for (caller, context, message).
///
/// The message is whitespace-normalized first so that trivial reflows of
/// the same question dedupe to one entry. Deterministic within a process
/// lifetime; a distributed backend would need a cross-process stable
/// hash instead.
fn fingerprint(caller: &CallerId, context: Option<&str>, message: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    caller.as_str().hash(&mut hasher);
    context.unwrap_or("").hash(&mut hasher);
    for word in message.split_whitespace() {
        word.hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(id: &str) -> CallerId {
        CallerId::new(id)
    }

    #[test]
    fn fingerprint_deterministic() {
        let k1 = fingerprint(&caller("u1"), Some("general"), "What is forgiveness?");
        let k2 = fingerprint(&caller("u1"), Some("general"), "What is forgiveness?");
        assert_eq!(k1, k2);
    }

    #[test]
    fn fingerprint_differs_on_caller() {
        let k1 = fingerprint(&caller("u1"), None, "hello");
        let k2 = fingerprint(&caller("u2"), None, "hello");
        assert_ne!(k1, k2);
    }

    #[test]
    fn fingerprint_differs_on_context() {
        let k1 = fingerprint(&caller("u1"), Some("general"), "hello");
        let k2 = fingerprint(&caller("u1"), Some("lesson-1"), "hello");
        assert_ne!(k1, k2);
    }

    #[test]
    fn fingerprint_covers_whole_message() {
        // A shared long prefix must not collide — the full content is hashed.
        let prefix = "please explain the meaning of ".repeat(20);
        let k1 = fingerprint(&caller("u1"), None, &format!("{prefix}peace"));
        let k2 = fingerprint(&caller("u1"), None, &format!("{prefix}fear"));
        assert_ne!(k1, k2);
    }

    #[test]
    fn fingerprint_normalizes_whitespace() {
        let k1 = fingerprint(&caller("u1"), None, "what  is\n forgiveness");
        let k2 = fingerprint(&caller("u1"), None, "what is forgiveness");
        assert_eq!(k1, k2);
    }
}
