use std::future::Future;
use std::sync::Arc;

use anchor_lang::prelude::Pubkey;
use message_bottle::errors::BottleError;
use message_bottle::events::{BottleDeactivated, BottleReceived, BottleReplied, BottleSent, BottleSkipped};
use message_bottle::utils::validate_content;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheKey, Cacheable, ReadCache};
use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::lock::NamedLocks;
use crate::messages::friendly_message;
use crate::model::{BottleRecord, LocalSkip, ReplyRecord, UserBottleFlags};
use crate::retry::{with_retry, RetryPolicy};
use crate::source::LedgerSource;
use crate::upload::{plan_content, ContentPlan};

/// A bottle handed to the user by [`BottleClient::discover`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Discovery {
    pub bottle: BottleRecord,
    /// Draws it took to get here.
    pub attempts: u32,
    /// True when the re-roll budget ran out and the last draw was surfaced
    /// even though the caller had already skipped or answered it.
    pub exhausted: bool,
}

pub struct BottleClient<S> {
    source: S,
    cache: Arc<ReadCache>,
    locks: NamedLocks,
    retry: RetryPolicy,
    config: ClientConfig,
}

impl<S: LedgerSource> BottleClient<S> {
    pub fn new(source: S, config: ClientConfig) -> Self {
        let cache = Arc::new(ReadCache::new(config.cache_ttl()).with_skip_ttl(config.skip_ttl()));
        Self::with_cache(source, config, cache)
    }

    pub fn with_cache(source: S, config: ClientConfig, cache: Arc<ReadCache>) -> Self {
        Self {
            source,
            cache,
            locks: NamedLocks::new(config.lock_poll()),
            retry: config.retry_policy(),
            config,
        }
    }

    /// Builds a client, restoring the cache snapshot named in `config` if present.
    pub async fn open(source: S, config: ClientConfig) -> ClientResult<Self> {
        config.validate()?;
        let cache = ReadCache::new(config.cache_ttl()).with_skip_ttl(config.skip_ttl());
        let cache = match &config.snapshot_path {
            Some(path) => cache.restore(path).await?,
            None => cache,
        };
        Ok(Self::with_cache(source, config, Arc::new(cache)))
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn cache(&self) -> &Arc<ReadCache> {
        &self.cache
    }

    pub fn locks(&self) -> &NamedLocks {
        &self.locks
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Localized text for a failure, in the configured locale.
    pub fn describe(&self, err: &ClientError) -> String {
        friendly_message(err, self.config.locale)
    }

    async fn retrying<T, F, Fut>(&self, what: &str, op: F) -> ClientResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        with_retry(&self.retry, what, op).await
    }

    /// Serves `key` from the cache, or fetches it under the key's lock.
    /// When the lock cannot be had in time, a stale entry is better than nothing.
    async fn read_through<T, F, Fut>(&self, key: CacheKey, fetch: F) -> ClientResult<T>
    where
        T: Cacheable,
        F: FnMut() -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        if let Some(hit) = self.cache.get::<T>(key).await {
            return Ok(hit);
        }

        let name = key.to_string();
        let _guard = match self
            .locks
            .acquire(&name, self.config.lock_wait(), self.config.lock_lease())
            .await
        {
            Ok(guard) => guard,
            Err(err) => {
                return match self.cache.peek::<T>(key).await {
                    Some(stale) => {
                        warn!(%key, "lock busy, serving stale entry");
                        Ok(stale)
                    }
                    None => Err(err),
                };
            }
        };

        // someone may have filled it while we waited
        if let Some(hit) = self.cache.get::<T>(key).await {
            return Ok(hit);
        }

        let value = self.retrying(&name, fetch).await?;
        self.cache.put(key, value.clone()).await;
        debug!(%key, "cache filled");
        Ok(value)
    }

    pub async fn get_bottle(&self, bottle_id: u64) -> ClientResult<BottleRecord> {
        self.read_through(CacheKey::Bottle(bottle_id), || self.source.get_bottle(bottle_id))
            .await
    }

    pub async fn get_reply(&self, reply_id: u64) -> ClientResult<ReplyRecord> {
        self.read_through(CacheKey::Reply(reply_id), || self.source.get_reply(reply_id))
            .await
    }

    pub async fn get_bottle_replies(&self, bottle_id: u64) -> ClientResult<Vec<u64>> {
        self.read_through(CacheKey::BottleReplies(bottle_id), || {
            self.source.get_bottle_replies(bottle_id)
        })
        .await
    }

    /// Replies attached to a bottle, oldest first.
    pub async fn get_thread(&self, bottle_id: u64) -> ClientResult<Vec<ReplyRecord>> {
        let ids = self.get_bottle_replies(bottle_id).await?;
        let mut thread = Vec::with_capacity(ids.len());
        for id in ids {
            thread.push(self.get_reply(id).await?);
        }
        Ok(thread)
    }

    pub async fn get_user_bottles(&self, user: &Pubkey) -> ClientResult<Vec<u64>> {
        self.retrying("user bottles", || self.source.get_user_bottles(user))
            .await
    }

    pub async fn get_user_replies(&self, user: &Pubkey) -> ClientResult<Vec<u64>> {
        self.retrying("user replies", || self.source.get_user_replies(user))
            .await
    }

    pub async fn get_user_bottle_state(
        &self,
        user: &Pubkey,
        bottle_id: u64,
    ) -> ClientResult<UserBottleFlags> {
        self.retrying("user bottle state", || {
            self.source.get_user_bottle_state(user, bottle_id)
        })
        .await
    }

    pub async fn has_user_replied_to_bottle(
        &self,
        user: &Pubkey,
        bottle_id: u64,
    ) -> ClientResult<bool> {
        self.retrying("reply guard", || {
            self.source.has_user_replied_to_bottle(user, bottle_id)
        })
        .await
    }

    pub async fn get_active_bottle_count(&self) -> ClientResult<u64> {
        self.retrying("active count", || self.source.get_active_bottle_count())
            .await
    }

    pub async fn get_bottle_count(&self) -> ClientResult<u64> {
        self.retrying("bottle count", || self.source.get_bottle_count())
            .await
    }

    pub async fn get_total_replies(&self) -> ClientResult<u64> {
        self.retrying("reply count", || self.source.get_total_replies())
            .await
    }

    /// Draws a bottle for `caller`. Own bottles, bottles skipped here and
    /// bottles already answered are re-rolled up to the configured number of
    /// draws; after that the last drawn bottle is surfaced anyway.
    #[instrument(skip(self), fields(caller = %caller))]
    pub async fn discover(&self, caller: &Pubkey) -> ClientResult<Discovery> {
        let attempts = self.config.reroll_attempts.max(1);
        let mut last_bottle = None;
        let mut last_err = None;

        for attempt in 1..=attempts {
            match self
                .retrying("random bottle", || self.source.get_random_bottle(caller))
                .await
            {
                Ok(bottle_id) => {
                    let bottle = self.get_bottle(bottle_id).await?;
                    if !self.already_handled(caller, &bottle).await? {
                        info!(bottle_id, attempt, "bottle discovered");
                        return Ok(Discovery {
                            bottle,
                            attempts: attempt,
                            exhausted: false,
                        });
                    }
                    debug!(bottle_id, attempt, "already handled, re-rolling");
                    last_bottle = Some(bottle);
                }
                Err(ClientError::Rejected(BottleError::CannotViewOwnBottle)) => {
                    debug!(attempt, "drew own bottle, re-rolling");
                    last_err = Some(ClientError::Rejected(BottleError::CannotViewOwnBottle));
                }
                Err(err) => return Err(err),
            }
        }

        match (last_bottle, last_err) {
            (Some(bottle), _) => Ok(Discovery {
                bottle,
                attempts,
                exhausted: true,
            }),
            (None, Some(err)) => Err(err),
            (None, None) => Err(ClientError::Rejected(BottleError::NoBottlesAvailable)),
        }
    }

    async fn already_handled(&self, caller: &Pubkey, bottle: &BottleRecord) -> ClientResult<bool> {
        if bottle.sender == *caller || self.is_skipped_locally(caller, bottle.id).await {
            return Ok(true);
        }
        self.has_user_replied_to_bottle(caller, bottle.id).await
    }

    /// Stages the chunks of `plan`, if any, as the author's draft.
    async fn stage(&self, author: &Pubkey, plan: &ContentPlan<'_>) -> ClientResult<()> {
        for chunk in &plan.chunks {
            let staged = self.source.stage_content(author, chunk).await?;
            debug!(staged, "content chunk staged");
        }
        Ok(())
    }

    /// Runs a write whose content may need staging first. A failed write
    /// drops whatever it staged, so the next attempt starts from scratch.
    async fn write_with_content<T, F, Fut>(&self, author: &Pubkey, content: &str, write: F) -> ClientResult<T>
    where
        F: FnOnce(String, bool) -> Fut,
        Fut: Future<Output = ClientResult<T>>,
    {
        // same check the ledger runs; saves a doomed transaction
        validate_content(content)?;
        let plan = plan_content(content);
        let staged = plan.is_staged();
        let result = match self.stage(author, &plan).await {
            Ok(()) => write(plan.inline.to_owned(), staged).await,
            Err(err) => Err(err),
        };
        if staged && result.is_err() {
            if let Err(err) = self.source.discard_draft(author).await {
                warn!(error = %err, "could not discard staged draft");
            }
        }
        result
    }

    #[instrument(skip(self, content), fields(sender = %sender))]
    pub async fn send_bottle(&self, sender: &Pubkey, content: &str) -> ClientResult<BottleSent> {
        let event = self
            .write_with_content(sender, content, |inline, staged| async move {
                self.source.send_bottle(sender, &inline, staged).await
            })
            .await?;
        info!(bottle_id = event.bottle_id, "bottle sent");
        Ok(event)
    }

    pub async fn open_bottle(&self, receiver: &Pubkey, bottle_id: u64) -> ClientResult<BottleReceived> {
        self.source.open_bottle(receiver, bottle_id).await
    }

    #[instrument(skip(self, content), fields(replier = %replier))]
    pub async fn reply_to_bottle(
        &self,
        replier: &Pubkey,
        bottle_id: u64,
        content: &str,
    ) -> ClientResult<BottleReplied> {
        let event = self
            .write_with_content(replier, content, |inline, staged| async move {
                self.source
                    .reply_to_bottle(replier, bottle_id, &inline, staged)
                    .await
            })
            .await?;
        self.cache
            .invalidate(&[CacheKey::Bottle(bottle_id), CacheKey::BottleReplies(bottle_id)])
            .await;
        info!(reply_id = event.reply_id, "reply sent");
        Ok(event)
    }

    #[instrument(skip(self, content), fields(replier = %replier))]
    pub async fn reply_to_reply(
        &self,
        replier: &Pubkey,
        reply_id: u64,
        content: &str,
    ) -> ClientResult<BottleReplied> {
        let event = self
            .write_with_content(replier, content, |inline, staged| async move {
                self.source
                    .reply_to_reply(replier, reply_id, &inline, staged)
                    .await
            })
            .await?;
        self.cache
            .invalidate(&[
                CacheKey::Bottle(event.bottle_id),
                CacheKey::BottleReplies(event.bottle_id),
            ])
            .await;
        info!(reply_id = event.reply_id, parent = reply_id, "threaded reply sent");
        Ok(event)
    }

    /// Passes on a bottle without touching the ledger. Costs nothing, is
    /// only remembered by this client and lapses after the skip TTL.
    /// Returns false when the skip was already on record.
    pub async fn skip_locally(&self, caller: &Pubkey, bottle_id: u64) -> bool {
        self.cache.skip(LocalSkip::new(*caller, bottle_id)).await
    }

    pub async fn is_skipped_locally(&self, caller: &Pubkey, bottle_id: u64) -> bool {
        self.cache.is_skipped(LocalSkip::new(*caller, bottle_id)).await
    }

    /// Records the skip on the ledger as well as locally.
    pub async fn skip_on_chain(&self, caller: &Pubkey, bottle_id: u64) -> ClientResult<BottleSkipped> {
        let event = self.source.skip_bottle(caller, bottle_id).await?;
        self.skip_locally(caller, bottle_id).await;
        Ok(event)
    }

    #[instrument(skip(self), fields(sender = %sender))]
    pub async fn deactivate_bottle(
        &self,
        sender: &Pubkey,
        bottle_id: u64,
    ) -> ClientResult<BottleDeactivated> {
        let event = self.source.deactivate_bottle(sender, bottle_id).await?;
        self.cache.invalidate(&[CacheKey::Bottle(bottle_id)]).await;
        info!("bottle deactivated");
        Ok(event)
    }

    /// Writes the cache snapshot now, if a snapshot path is configured.
    pub async fn save_snapshot(&self) -> ClientResult<Option<usize>> {
        let Some(path) = &self.config.snapshot_path else {
            return Ok(None);
        };
        let _guard = self
            .locks
            .acquire(
                ReadCache::snapshot_lock(),
                self.config.lock_wait(),
                self.config.lock_lease(),
            )
            .await?;
        Ok(Some(self.cache.save(path).await?))
    }

    /// Starts the periodic snapshot writer, if a snapshot path is configured.
    pub fn spawn_autosave(&self) -> Option<JoinHandle<()>> {
        let path = self.config.snapshot_path.clone()?;
        Some(Arc::clone(&self.cache).spawn_autosave(
            path,
            self.config.autosave_interval(),
            self.locks.clone(),
            self.config.lock_wait(),
            self.config.lock_lease(),
        ))
    }
}
