//! Disposable read cache in front of the ledger.
//!
//! Entries go stale after a TTL. Stale entries are not served as fresh, but
//! they are kept until the next purge so a reader that cannot get the key's
//! lock still has something to show. Local skips live next to the reads,
//! with their own TTL, and are persisted in the same snapshot.

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error::ClientResult;
use crate::lock::NamedLocks;
use crate::model::{BottleRecord, LocalSkip, ReplyRecord};

const SNAPSHOT_LOCK: &str = "cache:snapshot";

const DEFAULT_SKIP_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    pub value: V,
    pub stored_at: DateTime<Utc>,
}

#[derive(Debug)]
pub struct TtlCache<K, V> {
    ttl: Duration,
    entries: HashMap<K, CacheEntry<V>>,
}

impl<K: Eq + Hash + Clone, V: Clone> TtlCache<K, V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    fn is_fresh(&self, entry: &CacheEntry<V>, now: DateTime<Utc>) -> bool {
        match now.signed_duration_since(entry.stored_at).to_std() {
            Ok(age) => age < self.ttl,
            // stored "in the future": clock moved back, keep it
            Err(_) => true,
        }
    }

    /// Fresh value for `key`, if any.
    pub fn get_at(&self, key: &K, now: DateTime<Utc>) -> Option<V> {
        self.entries
            .get(key)
            .filter(|entry| self.is_fresh(entry, now))
            .map(|entry| entry.value.clone())
    }

    /// Value for `key` regardless of age.
    pub fn peek(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value.clone())
    }

    pub fn insert_at(&mut self, key: K, value: V, now: DateTime<Utc>) {
        self.entries.insert(
            key,
            CacheEntry {
                value,
                stored_at: now,
            },
        );
    }

    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|entry| entry.value)
    }

    /// Drops stale entries and returns how many went.
    pub fn purge_at(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, entry| match now.signed_duration_since(entry.stored_at).to_std() {
            Ok(age) => age < ttl,
            Err(_) => true,
        });
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&K, &CacheEntry<V>)> {
        self.entries.iter()
    }

    pub fn restore(&mut self, key: K, entry: CacheEntry<V>) {
        self.entries.insert(key, entry);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CacheKey {
    Bottle(u64),
    Reply(u64),
    BottleReplies(u64),
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheKey::Bottle(id) => write!(f, "bottle:{id}"),
            CacheKey::Reply(id) => write!(f, "reply:{id}"),
            CacheKey::BottleReplies(id) => write!(f, "bottle-replies:{id}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CachedValue {
    Bottle(BottleRecord),
    Reply(ReplyRecord),
    ReplyIds(Vec<u64>),
}

/// Types that can live in the read cache.
pub trait Cacheable: Clone + Sized {
    fn wrap(self) -> CachedValue;
    fn unwrap(value: CachedValue) -> Option<Self>;
}

impl Cacheable for BottleRecord {
    fn wrap(self) -> CachedValue {
        CachedValue::Bottle(self)
    }

    fn unwrap(value: CachedValue) -> Option<Self> {
        match value {
            CachedValue::Bottle(bottle) => Some(bottle),
            _ => None,
        }
    }
}

impl Cacheable for ReplyRecord {
    fn wrap(self) -> CachedValue {
        CachedValue::Reply(self)
    }

    fn unwrap(value: CachedValue) -> Option<Self> {
        match value {
            CachedValue::Reply(reply) => Some(reply),
            _ => None,
        }
    }
}

impl Cacheable for Vec<u64> {
    fn wrap(self) -> CachedValue {
        CachedValue::ReplyIds(self)
    }

    fn unwrap(value: CachedValue) -> Option<Self> {
        match value {
            CachedValue::ReplyIds(ids) => Some(ids),
            _ => None,
        }
    }
}

/// On-disk form of the cache.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CacheSnapshot {
    pub entries: Vec<(CacheKey, CacheEntry<CachedValue>)>,
    #[serde(default)]
    pub skips: Vec<(LocalSkip, DateTime<Utc>)>,
}

#[derive(Debug)]
pub struct ReadCache {
    table: Mutex<TtlCache<CacheKey, CachedValue>>,
    skips: Mutex<TtlCache<LocalSkip, ()>>,
}

impl ReadCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            table: Mutex::new(TtlCache::new(ttl)),
            skips: Mutex::new(TtlCache::new(DEFAULT_SKIP_TTL)),
        }
    }

    pub fn with_skip_ttl(self, ttl: Duration) -> Self {
        Self {
            skips: Mutex::new(TtlCache::new(ttl)),
            ..self
        }
    }

    /// Records a local skip. Returns false when it was already on record.
    pub async fn skip(&self, skip: LocalSkip) -> bool {
        self.skip_at(skip, Utc::now()).await
    }

    pub async fn skip_at(&self, skip: LocalSkip, now: DateTime<Utc>) -> bool {
        let mut skips = self.skips.lock().await;
        skips.purge_at(now);
        let fresh = skips.get_at(&skip, now).is_none();
        if fresh {
            skips.insert_at(skip, (), now);
        }
        fresh
    }

    pub async fn is_skipped(&self, skip: LocalSkip) -> bool {
        self.is_skipped_at(skip, Utc::now()).await
    }

    pub async fn is_skipped_at(&self, skip: LocalSkip, now: DateTime<Utc>) -> bool {
        self.skips.lock().await.get_at(&skip, now).is_some()
    }

    pub async fn skip_count(&self) -> usize {
        self.skips.lock().await.len()
    }

    pub async fn get<T: Cacheable>(&self, key: CacheKey) -> Option<T> {
        self.get_at(key, Utc::now()).await
    }

    pub async fn get_at<T: Cacheable>(&self, key: CacheKey, now: DateTime<Utc>) -> Option<T> {
        self.table.lock().await.get_at(&key, now).and_then(T::unwrap)
    }

    pub async fn peek<T: Cacheable>(&self, key: CacheKey) -> Option<T> {
        self.table.lock().await.peek(&key).and_then(T::unwrap)
    }

    pub async fn put<T: Cacheable>(&self, key: CacheKey, value: T) {
        self.put_at(key, value, Utc::now()).await
    }

    pub async fn put_at<T: Cacheable>(&self, key: CacheKey, value: T, now: DateTime<Utc>) {
        self.table.lock().await.insert_at(key, value.wrap(), now);
    }

    pub async fn invalidate(&self, keys: &[CacheKey]) {
        let mut table = self.table.lock().await;
        for key in keys {
            table.remove(key);
        }
    }

    pub async fn len(&self) -> usize {
        self.table.lock().await.len()
    }

    pub async fn snapshot(&self) -> CacheSnapshot {
        let entries = self
            .table
            .lock()
            .await
            .entries()
            .map(|(key, entry)| (*key, entry.clone()))
            .collect();
        let skips = self
            .skips
            .lock()
            .await
            .entries()
            .map(|(skip, entry)| (*skip, entry.stored_at))
            .collect();
        CacheSnapshot { entries, skips }
    }

    /// Purges stale entries and skips, then writes the rest to `path` as JSON.
    pub async fn save(&self, path: &Path) -> ClientResult<usize> {
        let now = Utc::now();
        let purged = self.table.lock().await.purge_at(now) + self.skips.lock().await.purge_at(now);
        let snapshot = self.snapshot().await;
        let raw = serde_json::to_vec_pretty(&snapshot)?;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        // write-then-rename so a crash mid-write leaves the old snapshot
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, raw).await?;
        tokio::fs::rename(&tmp, path).await?;
        debug!(
            path = %path.display(),
            entries = snapshot.entries.len(),
            skips = snapshot.skips.len(),
            purged,
            "cache saved"
        );
        Ok(snapshot.entries.len())
    }

    pub async fn load(path: &Path, ttl: Duration) -> ClientResult<Self> {
        Self::new(ttl).restore(path).await
    }

    /// Fills this cache from a snapshot. A missing file leaves it empty; a
    /// corrupt one is discarded with a warning, since the cache may always
    /// be wrong.
    pub async fn restore(self, path: &Path) -> ClientResult<Self> {
        let raw = match tokio::fs::read(path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(self),
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_slice::<CacheSnapshot>(&raw) {
            Ok(snapshot) => {
                let now = Utc::now();
                let mut table = self.table.lock().await;
                for (key, entry) in snapshot.entries {
                    table.restore(key, entry);
                }
                table.purge_at(now);
                let mut skips = self.skips.lock().await;
                for (skip, stored_at) in snapshot.skips {
                    skips.restore(skip, CacheEntry { value: (), stored_at });
                }
                skips.purge_at(now);
                info!(
                    path = %path.display(),
                    entries = table.len(),
                    skips = skips.len(),
                    "cache restored"
                );
            }
            Err(err) => warn!(path = %path.display(), error = %err, "discarding unreadable cache snapshot"),
        }
        Ok(self)
    }

    /// Saves the cache every `interval` under the snapshot lock, so it never
    /// interleaves with an explicit save.
    pub fn spawn_autosave(
        self: Arc<Self>,
        path: PathBuf,
        interval: Duration,
        locks: NamedLocks,
        lock_wait: Duration,
        lock_lease: Duration,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let _guard = match locks.acquire(SNAPSHOT_LOCK, lock_wait, lock_lease).await {
                    Ok(guard) => guard,
                    Err(err) => {
                        warn!(error = %err, "autosave skipped");
                        continue;
                    }
                };
                if let Err(err) = self.save(&path).await {
                    warn!(path = %path.display(), error = %err, "autosave failed");
                }
            }
        })
    }

    pub(crate) fn snapshot_lock() -> &'static str {
        SNAPSHOT_LOCK
    }
}

#[cfg(test)]
mod tests {
    use anchor_lang::prelude::Pubkey;
    use chrono::TimeDelta;

    use super::*;

    fn bottle(id: u64) -> BottleRecord {
        BottleRecord {
            id,
            sender: Pubkey::new_unique(),
            content: format!("bottle {id}"),
            created_at: 0,
            active: true,
            reply_count: 0,
        }
    }

    #[test]
    fn entries_expire_after_ttl() {
        let mut cache = TtlCache::new(Duration::from_secs(30 * 60));
        let t0 = Utc::now();
        cache.insert_at(1u64, "a", t0);
        assert_eq!(cache.get_at(&1, t0 + TimeDelta::minutes(29)), Some("a"));
        assert_eq!(cache.get_at(&1, t0 + TimeDelta::minutes(30)), None);
        // stale but still visible as a fallback
        assert_eq!(cache.peek(&1), Some("a"));
        assert_eq!(cache.purge_at(t0 + TimeDelta::minutes(31)), 1);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn typed_access_checks_the_variant() {
        let cache = ReadCache::new(Duration::from_secs(60));
        cache.put(CacheKey::Bottle(1), bottle(1)).await;
        cache.put(CacheKey::BottleReplies(1), vec![4u64, 5]).await;
        assert_eq!(cache.get::<BottleRecord>(CacheKey::Bottle(1)).await.unwrap().id, 1);
        assert!(cache.get::<ReplyRecord>(CacheKey::Bottle(1)).await.is_none());
        assert_eq!(
            cache.get::<Vec<u64>>(CacheKey::BottleReplies(1)).await,
            Some(vec![4, 5])
        );
        cache.invalidate(&[CacheKey::Bottle(1)]).await;
        assert!(cache.get::<BottleRecord>(CacheKey::Bottle(1)).await.is_none());
    }

    #[tokio::test]
    async fn snapshot_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");
        let cache = ReadCache::new(Duration::from_secs(600));
        cache.put(CacheKey::Bottle(3), bottle(3)).await;
        cache
            .put_at(CacheKey::Bottle(4), bottle(4), Utc::now() - TimeDelta::hours(1))
            .await;
        assert_eq!(cache.save(&path).await.unwrap(), 1);

        let restored = ReadCache::load(&path, Duration::from_secs(600)).await.unwrap();
        assert_eq!(restored.len().await, 1);
        assert_eq!(
            restored.get::<BottleRecord>(CacheKey::Bottle(3)).await.unwrap().content,
            "bottle 3"
        );
    }

    #[tokio::test]
    async fn corrupt_or_missing_snapshot_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = ReadCache::load(&dir.path().join("none.json"), Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(missing.len().await, 0);

        let path = dir.path().join("bad.json");
        tokio::fs::write(&path, b"{not json").await.unwrap();
        let corrupt = ReadCache::load(&path, Duration::from_secs(1)).await.unwrap();
        assert_eq!(corrupt.len().await, 0);
    }

    #[test]
    fn keys_name_their_locks() {
        assert_eq!(CacheKey::Bottle(9).to_string(), "bottle:9");
        assert_eq!(CacheKey::BottleReplies(9).to_string(), "bottle-replies:9");
    }
    #[tokio::test]
    async fn skips_expire_and_survive_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        let cache = ReadCache::new(Duration::from_secs(600)).with_skip_ttl(Duration::from_secs(3600));
        let user = Pubkey::new_unique();
        let now = Utc::now();

        assert!(cache.skip_at(LocalSkip::new(user, 1), now).await);
        assert!(!cache.skip_at(LocalSkip::new(user, 1), now).await);
        cache
            .skip_at(LocalSkip::new(user, 2), now - TimeDelta::hours(2))
            .await;
        assert!(!cache.is_skipped_at(LocalSkip::new(user, 2), now).await);
        assert!(!cache.is_skipped(LocalSkip::new(Pubkey::new_unique(), 1)).await);

        cache.save(&path).await.unwrap();
        let restored = ReadCache::new(Duration::from_secs(600))
            .with_skip_ttl(Duration::from_secs(3600))
            .restore(&path)
            .await
            .unwrap();
        assert_eq!(restored.skip_count().await, 1);
        assert!(restored.is_skipped(LocalSkip::new(user, 1)).await);
    }

    #[tokio::test]
    async fn snapshots_without_skips_still_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("old.json");
        tokio::fs::write(&path, br#"{"entries":[]}"#).await.unwrap();
        let cache = ReadCache::load(&path, Duration::from_secs(60)).await.unwrap();
        assert_eq!(cache.skip_count().await, 0);
    }

    async fn wait_for_file(path: &Path, present: bool) -> bool {
        for _ in 0..10 {
            if path.exists() == present {
                return true;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        path.exists() == present
    }

    #[tokio::test(start_paused = true)]
    async fn autosave_runs_on_schedule_and_yields_to_a_held_lock() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("auto.json");
        let cache = Arc::new(ReadCache::new(Duration::from_secs(3600)));
        cache.put(CacheKey::Bottle(1), bottle(1)).await;
        let locks = NamedLocks::new(Duration::from_millis(50));
        let task = Arc::clone(&cache).spawn_autosave(
            path.clone(),
            Duration::from_secs(60),
            locks.clone(),
            Duration::from_millis(200),
            Duration::from_secs(10),
        );

        // nothing before the first interval
        tokio::time::sleep(Duration::from_secs(30)).await;
        assert!(!path.exists());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(wait_for_file(&path, true).await);
        std::fs::remove_file(&path).unwrap();

        // a save in progress elsewhere holds the lock across the next tick
        let held = locks
            .acquire(ReadCache::snapshot_lock(), Duration::ZERO, Duration::from_secs(600))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(!path.exists());
        assert!(locks.is_held(ReadCache::snapshot_lock()));

        drop(held);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert!(wait_for_file(&path, true).await);
        task.abort();
    }
}
