//! In-process ledger for local development and tests.
//!
//! Runs the program's own bookkeeping over in-memory maps. One mutex around
//! the whole state gives the same total order as the chain, and every write
//! is staged on copies that are only committed when the transition succeeds.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

use anchor_lang::prelude::Pubkey;
use chrono::Utc;
use message_bottle::bookkeeping::{self, DrawContext, ReplyIndex};
use message_bottle::errors::BottleError;
use message_bottle::events::{
    BottleDeactivated, BottleReceived, BottleReplied, BottleSent, BottleSkipped,
};
use message_bottle::state::*;
use message_bottle::utils::{
    TxShape, PACKET_DATA_SIZE, REPLY_TO_BOTTLE_TX, REPLY_TO_REPLY_TX, SEND_BOTTLE_TX,
    STAGE_CONTENT_TX,
};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::model::{BottleRecord, ReplyRecord};
use crate::source::{LedgerEvent, LedgerSource};

#[derive(Default)]
struct LedgerState {
    ledger: Ledger,
    active_set: ActiveSet,
    bottles: BTreeMap<u64, Bottle>,
    replies: BTreeMap<u64, Reply>,
    profiles: HashMap<Pubkey, UserProfile>,
    user_bottles: HashMap<(Pubkey, u64), ListEntry>,
    user_replies: HashMap<(Pubkey, u64), ListEntry>,
    bottle_replies: HashMap<(u64, u64), ListEntry>,
    user_states: HashMap<(Pubkey, u64), UserBottleState>,
    drafts: HashMap<Pubkey, Draft>,
    events: Vec<LedgerEvent>,
    slot: u64,
}

impl LedgerState {
    /// Advances the slot and returns the transaction timestamp.
    fn tick(&mut self) -> i64 {
        self.slot += 1;
        Utc::now().timestamp()
    }

    fn bottle(&self, bottle_id: u64) -> ClientResult<&Bottle> {
        self.ledger.ensure_bottle(bottle_id)?;
        self.bottles
            .get(&bottle_id)
            .ok_or(ClientError::Rejected(BottleError::BottleNotFound))
    }

    fn reply(&self, reply_id: u64) -> ClientResult<&Reply> {
        self.ledger.ensure_reply(reply_id)?;
        self.replies
            .get(&reply_id)
            .ok_or(ClientError::Rejected(BottleError::ReplyNotFound))
    }

    fn profile(&self, user: &Pubkey) -> UserProfile {
        self.profiles.get(user).cloned().unwrap_or_default()
    }

    fn user_state(&self, user: &Pubkey, bottle_id: u64) -> UserBottleState {
        self.user_states
            .get(&(*user, bottle_id))
            .cloned()
            .unwrap_or_default()
    }

    /// The author's draft when the write asks for one. A missing draft fails
    /// the way an uninitialized account does on chain.
    fn draft(&self, author: &Pubkey, with_draft: bool) -> ClientResult<Option<Draft>> {
        if !with_draft {
            return Ok(None);
        }
        self.drafts
            .get(author)
            .cloned()
            .map(Some)
            .ok_or_else(|| ClientError::Program(format!("no draft staged for {author}")))
    }

    fn commit_draft_use(&mut self, author: &Pubkey, used: bool) {
        if used {
            self.drafts.remove(author);
        }
    }
}

fn ensure_fits(shape: TxShape, content: &str) -> ClientResult<()> {
    let bytes = shape.size(content.len());
    if bytes > PACKET_DATA_SIZE {
        return Err(ClientError::PacketTooLarge {
            bytes,
            limit: PACKET_DATA_SIZE,
        });
    }
    Ok(())
}

fn collect_ids<K>(entries: &HashMap<K, ListEntry>, count: u64, key: impl Fn(u64) -> K) -> Vec<u64>
where
    K: std::hash::Hash + Eq,
{
    (0..count)
        .filter_map(|index| entries.get(&key(index)).map(|entry| entry.item_id))
        .collect()
}

pub struct MemoryLedger {
    state: Mutex<LedgerState>,
    pending_faults: AtomicU32,
    calls: AtomicU64,
}

impl MemoryLedger {
    pub fn new(authority: Pubkey) -> Self {
        let state = LedgerState {
            ledger: Ledger {
                authority,
                updated_at: Utc::now().timestamp(),
                ..Default::default()
            },
            ..Default::default()
        };
        Self {
            state: Mutex::new(state),
            pending_faults: AtomicU32::new(0),
            calls: AtomicU64::new(0),
        }
    }

    /// Makes the next `count` calls fail as if the network dropped them.
    pub fn fail_next_calls(&self, count: u32) {
        self.pending_faults.store(count, Ordering::SeqCst);
    }

    /// Calls that reached the ledger, failed ones included.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    pub async fn events(&self) -> Vec<LedgerEvent> {
        self.state.lock().await.events.clone()
    }

    pub async fn active_bottle_ids(&self) -> Vec<u64> {
        let state = self.state.lock().await;
        state.active_set.entries.iter().map(|e| e.bottle_id).collect()
    }

    /// Slot recorded on the bottle, for checking the reverse index.
    pub async fn active_slot(&self, bottle_id: u64) -> ClientResult<u32> {
        let state = self.state.lock().await;
        Ok(state.bottle(bottle_id)?.active_slot)
    }

    pub async fn update_config(
        &self,
        caller: &Pubkey,
        new_authority: Option<Pubkey>,
        paused: Option<bool>,
    ) -> ClientResult<()> {
        self.enter()?;
        let mut state = self.state.lock().await;
        let now = state.tick();
        if state.ledger.authority != *caller {
            return Err(ClientError::Rejected(BottleError::Unauthorized));
        }
        if let Some(authority) = new_authority {
            state.ledger.authority = authority;
        }
        if let Some(paused) = paused {
            state.ledger.paused = paused;
        }
        state.ledger.updated_at = now;
        Ok(())
    }

    fn enter(&self) -> ClientResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let faulted = self
            .pending_faults
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if faulted {
            return Err(ClientError::Transport("connection dropped".into()));
        }
        Ok(())
    }
}

impl LedgerSource for MemoryLedger {
    async fn send_bottle(
        &self,
        sender: &Pubkey,
        content: &str,
        with_draft: bool,
    ) -> ClientResult<BottleSent> {
        ensure_fits(SEND_BOTTLE_TX, content)?;
        self.enter()?;
        let mut state = self.state.lock().await;
        let now = state.tick();

        let draft = state.draft(sender, with_draft)?;
        let mut ledger = state.ledger.clone();
        let mut active_set = state.active_set.clone();
        let mut profile = state.profile(sender);
        let mut by_user = ListEntry::default();
        let mut bottle = Bottle::default();
        let event = bookkeeping::send_bottle(
            &mut ledger,
            &mut active_set,
            &mut profile,
            &mut by_user,
            &mut bottle,
            *sender,
            bookkeeping::compose_content(draft.as_ref(), content.to_owned()),
            now,
        )?;

        state.ledger = ledger;
        state.active_set = active_set;
        state.profiles.insert(*sender, profile);
        state.user_bottles.insert((*sender, by_user.index), by_user);
        state.bottles.insert(bottle.id, bottle);
        state.commit_draft_use(sender, with_draft);
        state.events.push(LedgerEvent::Sent(event.clone()));
        debug!(bottle_id = event.bottle_id, %sender, "bottle committed");
        Ok(event)
    }

    async fn stage_content(&self, author: &Pubkey, chunk: &str) -> ClientResult<usize> {
        ensure_fits(STAGE_CONTENT_TX, chunk)?;
        self.enter()?;
        let mut state = self.state.lock().await;
        state.tick();

        let mut draft = state.drafts.get(author).cloned().unwrap_or_default();
        let staged = bookkeeping::stage_content(&mut draft, *author, chunk)?;
        state.drafts.insert(*author, draft);
        debug!(%author, staged, "draft chunk staged");
        Ok(staged)
    }

    async fn discard_draft(&self, author: &Pubkey) -> ClientResult<()> {
        self.enter()?;
        let mut state = self.state.lock().await;
        state.tick();
        state
            .drafts
            .remove(author)
            .map(|_| ())
            .ok_or_else(|| ClientError::Program(format!("no draft staged for {author}")))
    }

    async fn get_random_bottle(&self, caller: &Pubkey) -> ClientResult<u64> {
        self.enter()?;
        let mut state = self.state.lock().await;
        let now = state.tick();
        let draw = DrawContext {
            unix_timestamp: now,
            slot: state.slot,
            slot_hash: rand::random(),
        };
        let bottle_id = bookkeeping::draw_bottle(&state.ledger, &state.active_set, caller, &draw)?;
        state.bottle(bottle_id)?.ensure_active()?;
        Ok(bottle_id)
    }

    async fn open_bottle(&self, receiver: &Pubkey, bottle_id: u64) -> ClientResult<BottleReceived> {
        self.enter()?;
        let mut state = self.state.lock().await;
        let now = state.tick();

        let bottle = state.bottle(bottle_id)?.clone();
        let mut user_state = state.user_state(receiver, bottle_id);
        let event = bookkeeping::open_bottle(&bottle, &mut user_state, *receiver, now)?;

        state.user_states.insert((*receiver, bottle_id), user_state);
        state.events.push(LedgerEvent::Received(event.clone()));
        Ok(event)
    }

    async fn reply_to_bottle(
        &self,
        replier: &Pubkey,
        bottle_id: u64,
        content: &str,
        with_draft: bool,
    ) -> ClientResult<BottleReplied> {
        ensure_fits(REPLY_TO_BOTTLE_TX, content)?;
        self.enter()?;
        let mut state = self.state.lock().await;
        let now = state.tick();

        let draft = state.draft(replier, with_draft)?;
        let mut ledger = state.ledger.clone();
        let mut bottle = state.bottle(bottle_id)?.clone();
        let mut user_state = state.user_state(replier, bottle_id);
        let mut profile = state.profile(replier);
        let mut by_bottle = ListEntry::default();
        let mut by_user = ListEntry::default();
        let mut reply = Reply::default();
        let event = bookkeeping::reply_to_bottle(
            &mut ledger,
            &mut bottle,
            &mut user_state,
            ReplyIndex {
                profile: &mut profile,
                by_bottle: &mut by_bottle,
                by_user: &mut by_user,
            },
            &mut reply,
            *replier,
            bookkeeping::compose_content(draft.as_ref(), content.to_owned()),
            now,
        )?;

        state.ledger = ledger;
        state.bottles.insert(bottle.id, bottle);
        state.user_states.insert((*replier, bottle_id), user_state);
        state.profiles.insert(*replier, profile);
        state.bottle_replies.insert((bottle_id, by_bottle.index), by_bottle);
        state.user_replies.insert((*replier, by_user.index), by_user);
        state.replies.insert(reply.id, reply);
        state.commit_draft_use(replier, with_draft);
        state.events.push(LedgerEvent::Replied(event.clone()));
        debug!(bottle_id, reply_id = event.reply_id, %replier, "reply committed");
        Ok(event)
    }

    async fn reply_to_reply(
        &self,
        replier: &Pubkey,
        reply_id: u64,
        content: &str,
        with_draft: bool,
    ) -> ClientResult<BottleReplied> {
        ensure_fits(REPLY_TO_REPLY_TX, content)?;
        self.enter()?;
        let mut state = self.state.lock().await;
        let now = state.tick();

        let draft = state.draft(replier, with_draft)?;
        let parent = state.reply(reply_id)?.clone();
        let mut ledger = state.ledger.clone();
        let mut bottle = state.bottle(parent.bottle_id)?.clone();
        let mut profile = state.profile(replier);
        let mut by_bottle = ListEntry::default();
        let mut by_user = ListEntry::default();
        let mut reply = Reply::default();
        let event = bookkeeping::reply_to_reply(
            &mut ledger,
            &parent,
            &mut bottle,
            ReplyIndex {
                profile: &mut profile,
                by_bottle: &mut by_bottle,
                by_user: &mut by_user,
            },
            &mut reply,
            *replier,
            bookkeeping::compose_content(draft.as_ref(), content.to_owned()),
            now,
        )?;

        state.ledger = ledger;
        state.bottles.insert(bottle.id, bottle);
        state.profiles.insert(*replier, profile);
        state.bottle_replies.insert((parent.bottle_id, by_bottle.index), by_bottle);
        state.user_replies.insert((*replier, by_user.index), by_user);
        state.replies.insert(reply.id, reply);
        state.commit_draft_use(replier, with_draft);
        state.events.push(LedgerEvent::Replied(event.clone()));
        debug!(parent = reply_id, reply_id = event.reply_id, %replier, "threaded reply committed");
        Ok(event)
    }

    async fn skip_bottle(&self, skipper: &Pubkey, bottle_id: u64) -> ClientResult<BottleSkipped> {
        self.enter()?;
        let mut state = self.state.lock().await;
        let now = state.tick();

        let bottle = state.bottle(bottle_id)?.clone();
        let mut user_state = state.user_state(skipper, bottle_id);
        let event = bookkeeping::skip_bottle(&bottle, &mut user_state, *skipper, now)?;

        state.user_states.insert((*skipper, bottle_id), user_state);
        state.events.push(LedgerEvent::Skipped(event.clone()));
        Ok(event)
    }

    async fn deactivate_bottle(
        &self,
        sender: &Pubkey,
        bottle_id: u64,
    ) -> ClientResult<BottleDeactivated> {
        self.enter()?;
        let mut state = self.state.lock().await;
        let now = state.tick();

        let mut bottle = state.bottle(bottle_id)?.clone();
        let mut active_set = state.active_set.clone();
        let (event, moved) =
            bookkeeping::deactivate_bottle(&mut bottle, &mut active_set, *sender, now)?;
        let moved_bottle = match moved {
            Some((moved_id, slot)) => {
                let mut moved_bottle = state.bottle(moved_id)?.clone();
                bookkeeping::relocate(&mut moved_bottle, moved_id, slot)?;
                Some(moved_bottle)
            }
            None => None,
        };

        state.active_set = active_set;
        state.bottles.insert(bottle.id, bottle);
        if let Some(moved_bottle) = moved_bottle {
            state.bottles.insert(moved_bottle.id, moved_bottle);
        }
        state.events.push(LedgerEvent::Deactivated(event.clone()));
        debug!(bottle_id, "bottle deactivated");
        Ok(event)
    }

    async fn get_bottle(&self, bottle_id: u64) -> ClientResult<BottleRecord> {
        self.enter()?;
        let state = self.state.lock().await;
        Ok(BottleRecord::from(state.bottle(bottle_id)?))
    }

    async fn get_reply(&self, reply_id: u64) -> ClientResult<ReplyRecord> {
        self.enter()?;
        let state = self.state.lock().await;
        Ok(ReplyRecord::from(state.reply(reply_id)?))
    }

    async fn get_bottle_replies(&self, bottle_id: u64) -> ClientResult<Vec<u64>> {
        self.enter()?;
        let state = self.state.lock().await;
        let count = state.bottle(bottle_id)?.reply_count;
        Ok(collect_ids(&state.bottle_replies, count, |index| (bottle_id, index)))
    }

    async fn get_user_bottles(&self, user: &Pubkey) -> ClientResult<Vec<u64>> {
        self.enter()?;
        let state = self.state.lock().await;
        let count = state.profile(user).bottle_count;
        Ok(collect_ids(&state.user_bottles, count, |index| (*user, index)))
    }

    async fn get_user_replies(&self, user: &Pubkey) -> ClientResult<Vec<u64>> {
        self.enter()?;
        let state = self.state.lock().await;
        let count = state.profile(user).reply_count;
        Ok(collect_ids(&state.user_replies, count, |index| (*user, index)))
    }

    async fn get_user_bottle_state(
        &self,
        user: &Pubkey,
        bottle_id: u64,
    ) -> ClientResult<UserBottleFlags> {
        self.enter()?;
        let state = self.state.lock().await;
        state.ledger.ensure_bottle(bottle_id)?;
        Ok(state.user_state(user, bottle_id).flags())
    }

    async fn get_active_bottle_count(&self) -> ClientResult<u64> {
        self.enter()?;
        Ok(self.state.lock().await.active_set.len() as u64)
    }

    async fn get_bottle_count(&self) -> ClientResult<u64> {
        self.enter()?;
        Ok(self.state.lock().await.ledger.bottle_count)
    }

    async fn get_total_replies(&self) -> ClientResult<u64> {
        self.enter()?;
        Ok(self.state.lock().await.ledger.reply_count)
    }
}
