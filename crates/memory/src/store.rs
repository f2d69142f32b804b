//! Document storage for one bucket
//!
//! # Design
//!
//! - DashMap: sharded by key, each mutation locks only the target shard
//! - CAS values come from a cluster-wide hybrid clock: nanoseconds since the
//!   epoch, bumped past the last issued value so tokens never repeat
//! - Expiry is lazy: every access checks the document's own deadline, and
//!   scans sweep the [`ExpiryIndex`] first
//!
//! # Locks
//!
//! `get_and_lock` gives the document a fresh CAS and remembers it as the
//! lock token. Until the lock expires or is released:
//!
//! - plain reads report [`LOCKED_CAS`] instead of the real CAS
//! - mutations carrying the lock token succeed and release the lock
//! - every other mutation fails with `DocumentLocked`

use crate::ttl::ExpiryIndex;
use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use datastore_client::{
    decode, ClientError, ClientResult, GetResult, MutateOptions, MutationResult, MutationToken,
    RELATIVE_EXPIRY_LIMIT,
};
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// CAS reported by plain reads of a locked document
pub const LOCKED_CAS: u64 = u64::MAX;

/// Lock time used when the requested one is zero or above the maximum
pub const DEFAULT_LOCK_TIME: Duration = Duration::from_secs(15);

/// Longest lock the store grants as requested
pub const MAX_LOCK_TIME: Duration = Duration::from_secs(30);

/// Number of partitions keys are hashed into for mutation tokens
pub const PARTITIONS: u64 = 1024;

// =============================================================================
// CAS clock
// =============================================================================

/// Monotonic CAS source shared by every bucket of a cluster
#[derive(Debug)]
pub struct CasClock {
    last: AtomicU64,
}

impl CasClock {
    /// Create a clock seeded from wall time
    pub fn new() -> Self {
        CasClock {
            last: AtomicU64::new(wall_nanos()),
        }
    }

    /// Next CAS: wall time in nanoseconds, or last + 1 if the clock lags
    pub fn next(&self) -> u64 {
        let now = wall_nanos();
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(previous + 1)
    }
}

impl Default for CasClock {
    fn default() -> Self {
        Self::new()
    }
}

fn wall_nanos() -> u64 {
    Utc::now()
        .timestamp_nanos_opt()
        .map(|n| n.max(1) as u64)
        .unwrap_or(1)
}

// =============================================================================
// Stored documents
// =============================================================================

#[derive(Debug, Clone, Copy)]
struct DocumentLock {
    cas: u64,
    until: Instant,
}

#[derive(Debug, Clone)]
struct StoredDocument {
    content: Vec<u8>,
    flags: u32,
    cas: u64,
    expires_at: Option<DateTime<Utc>>,
    lock: Option<DocumentLock>,
}

impl StoredDocument {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        matches!(self.expires_at, Some(deadline) if deadline <= now)
    }

    fn active_lock(&self, now: Instant) -> Option<DocumentLock> {
        self.lock.filter(|lock| lock.until > now)
    }

    /// Lock and CAS checks shared by replace and remove
    fn check_writable(&self, key: &str, cas: u64) -> ClientResult<()> {
        if let Some(lock) = self.active_lock(Instant::now()) {
            if cas == lock.cas {
                return Ok(());
            }
            return Err(ClientError::DocumentLocked {
                key: key.to_string(),
            });
        }
        if cas != 0 && cas != self.cas {
            return Err(ClientError::CasMismatch {
                key: key.to_string(),
            });
        }
        Ok(())
    }
}

/// Convert a wire expiry into a deadline
///
/// Zero means no expiry; up to 30 days is relative to `now`; anything larger
/// is an absolute unix timestamp.
pub fn resolve_expiry(expiry: u32, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    match expiry {
        0 => None,
        secs if secs <= RELATIVE_EXPIRY_LIMIT => Some(now + chrono::Duration::seconds(i64::from(secs))),
        secs => DateTime::<Utc>::from_timestamp(i64::from(secs), 0),
    }
}

/// Clamp a requested lock time the way the server does
pub fn effective_lock_time(requested: Duration) -> Duration {
    if requested.is_zero() || requested > MAX_LOCK_TIME {
        DEFAULT_LOCK_TIME
    } else {
        requested
    }
}

fn partition_for(key: &str) -> u16 {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % PARTITIONS) as u16
}

fn not_found(key: &str) -> ClientError {
    ClientError::DocumentNotFound {
        key: key.to_string(),
    }
}

// =============================================================================
// DocumentStore
// =============================================================================

/// All documents of one bucket
pub struct DocumentStore {
    bucket: String,
    docs: DashMap<String, StoredDocument>,
    expiry: Mutex<ExpiryIndex>,
    clock: Arc<CasClock>,
    seqno: AtomicU64,
}

impl DocumentStore {
    /// Create an empty store drawing CAS values from `clock`
    pub fn new(bucket: impl Into<String>, clock: Arc<CasClock>) -> Self {
        DocumentStore {
            bucket: bucket.into(),
            docs: DashMap::new(),
            expiry: Mutex::new(ExpiryIndex::new()),
            clock,
            seqno: AtomicU64::new(0),
        }
    }

    /// Highest mutation sequence number issued so far
    pub fn high_seqno(&self) -> u64 {
        self.seqno.load(Ordering::SeqCst)
    }

    /// Number of live documents (expired ones may still be counted until swept)
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    /// Check if the store holds no documents
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    // ========== Reads ==========

    /// Current value; a locked document reports `LOCKED_CAS`
    pub fn get(&self, key: &str) -> ClientResult<GetResult> {
        let now = Utc::now();
        match self.docs.entry(key.to_string()) {
            Entry::Occupied(entry) if entry.get().is_expired(now) => {
                let doc = entry.remove();
                self.untrack(key, doc.expires_at);
                Err(not_found(key))
            }
            Entry::Occupied(entry) => {
                let doc = entry.get();
                let cas = if doc.active_lock(Instant::now()).is_some() {
                    LOCKED_CAS
                } else {
                    doc.cas
                };
                Ok(GetResult {
                    content: doc.content.clone(),
                    flags: doc.flags,
                    cas,
                })
            }
            Entry::Vacant(_) => Err(not_found(key)),
        }
    }

    /// Fetch and lock; the returned CAS is the lock token
    pub fn get_and_lock(&self, key: &str, lock_time: Duration) -> ClientResult<GetResult> {
        let now = Utc::now();
        match self.docs.entry(key.to_string()) {
            Entry::Occupied(entry) if entry.get().is_expired(now) => {
                let doc = entry.remove();
                self.untrack(key, doc.expires_at);
                Err(not_found(key))
            }
            Entry::Occupied(mut entry) => {
                let doc = entry.get_mut();
                if doc.active_lock(Instant::now()).is_some() {
                    return Err(ClientError::DocumentLocked {
                        key: key.to_string(),
                    });
                }
                let cas = self.clock.next();
                doc.cas = cas;
                doc.lock = Some(DocumentLock {
                    cas,
                    until: Instant::now() + effective_lock_time(lock_time),
                });
                Ok(GetResult {
                    content: doc.content.clone(),
                    flags: doc.flags,
                    cas,
                })
            }
            Entry::Vacant(_) => Err(not_found(key)),
        }
    }

    /// Release a lock held under `cas`
    pub fn unlock(&self, key: &str, cas: u64) -> ClientResult<()> {
        let now = Utc::now();
        match self.docs.entry(key.to_string()) {
            Entry::Occupied(entry) if entry.get().is_expired(now) => {
                let doc = entry.remove();
                self.untrack(key, doc.expires_at);
                Err(not_found(key))
            }
            Entry::Occupied(mut entry) => {
                let doc = entry.get_mut();
                match doc.active_lock(Instant::now()) {
                    None => {
                        doc.lock = None;
                        Err(ClientError::DocumentNotLocked {
                            key: key.to_string(),
                        })
                    }
                    Some(lock) if lock.cas != cas => Err(ClientError::DocumentLocked {
                        key: key.to_string(),
                    }),
                    Some(_) => {
                        doc.lock = None;
                        Ok(())
                    }
                }
            }
            Entry::Vacant(_) => Err(not_found(key)),
        }
    }

    // ========== Mutations ==========

    /// Create; fails if a live document exists
    pub fn insert(
        &self,
        key: &str,
        content: Vec<u8>,
        flags: u32,
        options: &MutateOptions,
    ) -> ClientResult<MutationResult> {
        let now = Utc::now();
        match self.docs.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                if !entry.get().is_expired(now) {
                    return Err(ClientError::DocumentExists {
                        key: key.to_string(),
                    });
                }
                let old_expiry = entry.get().expires_at;
                self.untrack(key, old_expiry);
                let doc = self.fresh_document(key, content, flags, options.expiry, now);
                let cas = doc.cas;
                entry.insert(doc);
                Ok(self.mutation_result(key, cas))
            }
            Entry::Vacant(entry) => {
                let doc = self.fresh_document(key, content, flags, options.expiry, now);
                let cas = doc.cas;
                entry.insert(doc);
                Ok(self.mutation_result(key, cas))
            }
        }
    }

    /// Overwrite; fails if absent, locked by someone else, or CAS mismatches
    pub fn replace(
        &self,
        key: &str,
        content: Vec<u8>,
        flags: u32,
        options: &MutateOptions,
    ) -> ClientResult<MutationResult> {
        let now = Utc::now();
        match self.docs.entry(key.to_string()) {
            Entry::Occupied(entry) if entry.get().is_expired(now) => {
                let doc = entry.remove();
                self.untrack(key, doc.expires_at);
                Err(not_found(key))
            }
            Entry::Occupied(mut entry) => {
                entry.get().check_writable(key, options.cas)?;
                let old_expiry = entry.get().expires_at;
                self.untrack(key, old_expiry);
                let doc = self.fresh_document(key, content, flags, options.expiry, now);
                let cas = doc.cas;
                entry.insert(doc);
                Ok(self.mutation_result(key, cas))
            }
            Entry::Vacant(_) => Err(not_found(key)),
        }
    }

    /// Create or overwrite
    ///
    /// The CAS option is ignored: an upsert is unconditional. A locked
    /// document still rejects it.
    pub fn upsert(
        &self,
        key: &str,
        content: Vec<u8>,
        flags: u32,
        options: &MutateOptions,
    ) -> ClientResult<MutationResult> {
        let now = Utc::now();
        match self.docs.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                let expired = entry.get().is_expired(now);
                if !expired {
                    entry.get().check_writable(key, 0)?;
                }
                let old_expiry = entry.get().expires_at;
                self.untrack(key, old_expiry);
                let doc = self.fresh_document(key, content, flags, options.expiry, now);
                let cas = doc.cas;
                entry.insert(doc);
                Ok(self.mutation_result(key, cas))
            }
            Entry::Vacant(entry) => {
                let doc = self.fresh_document(key, content, flags, options.expiry, now);
                let cas = doc.cas;
                entry.insert(doc);
                Ok(self.mutation_result(key, cas))
            }
        }
    }

    /// Delete; fails if absent, locked by someone else, or CAS mismatches
    pub fn remove(&self, key: &str, options: &MutateOptions) -> ClientResult<MutationResult> {
        let now = Utc::now();
        match self.docs.entry(key.to_string()) {
            Entry::Occupied(entry) if entry.get().is_expired(now) => {
                let doc = entry.remove();
                self.untrack(key, doc.expires_at);
                Err(not_found(key))
            }
            Entry::Occupied(entry) => {
                entry.get().check_writable(key, options.cas)?;
                let doc = entry.remove();
                self.untrack(key, doc.expires_at);
                let cas = self.clock.next();
                Ok(self.mutation_result(key, cas))
            }
            Entry::Vacant(_) => Err(not_found(key)),
        }
    }

    // ========== Scans ==========

    /// Drop every document whose deadline has passed; returns how many
    pub fn purge_expired(&self) -> usize {
        let now = Utc::now();
        let expired = self.expiry.lock().take_expired(now);
        let mut removed = 0;
        for (deadline, key) in expired {
            let gone = self
                .docs
                .remove_if(&key, |_, doc| doc.expires_at == Some(deadline))
                .is_some();
            if gone {
                removed += 1;
            }
        }
        if removed > 0 {
            self.seqno.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(target: "datastore::memory", bucket = %self.bucket, removed, "Purged expired documents");
        }
        removed
    }

    /// Every live document decoded, ordered by key
    ///
    /// Documents that fail to decode are skipped.
    pub fn scan(&self) -> Vec<(String, Value)> {
        self.purge_expired();
        let now = Utc::now();
        let mut docs: Vec<(String, Value)> = self
            .docs
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .filter_map(|entry| {
                let doc = entry.value();
                decode(&doc.content, doc.flags)
                    .ok()
                    .map(|value| (entry.key().clone(), value))
            })
            .collect();
        docs.sort_by(|a, b| a.0.cmp(&b.0));
        docs
    }

    /// Remove everything
    pub fn flush(&self) {
        self.docs.clear();
        self.expiry.lock().clear();
        self.seqno.fetch_add(1, Ordering::SeqCst);
    }

    // ========== Internals ==========

    fn fresh_document(
        &self,
        key: &str,
        content: Vec<u8>,
        flags: u32,
        expiry: u32,
        now: DateTime<Utc>,
    ) -> StoredDocument {
        let expires_at = resolve_expiry(expiry, now);
        if let Some(deadline) = expires_at {
            self.expiry.lock().insert(deadline, key);
        }
        StoredDocument {
            content,
            flags,
            cas: self.clock.next(),
            expires_at,
            lock: None,
        }
    }

    fn untrack(&self, key: &str, expires_at: Option<DateTime<Utc>>) {
        if let Some(deadline) = expires_at {
            self.expiry.lock().remove(deadline, key);
        }
    }

    fn mutation_result(&self, key: &str, cas: u64) -> MutationResult {
        let sequence = self.seqno.fetch_add(1, Ordering::SeqCst) + 1;
        MutationResult {
            cas,
            token: Some(MutationToken {
                bucket: self.bucket.clone(),
                partition: partition_for(key),
                sequence,
            }),
        }
    }
}
