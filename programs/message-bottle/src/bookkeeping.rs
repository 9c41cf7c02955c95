//! State transitions shared by the instruction handlers and by off-chain
//! replicas of the ledger. Each function assumes it runs inside a single
//! transaction: on error the caller discards every account it touched.

use anchor_lang::prelude::*;

use crate::errors::BottleError;
use crate::events::*;
use crate::state::*;
use crate::utils::{draw_seed, validate_content};

/// Entropy sampled from the cluster when drawing a random bottle.
#[derive(Clone, Copy, Debug)]
pub struct DrawContext {
    pub unix_timestamp: i64,
    pub slot: u64,
    pub slot_hash: [u8; 32],
}

/// The replier's profile and the two list entries that will point at a new
/// reply: one in the bottle's reply list, one in the replier's.
pub struct ReplyIndex<'a> {
    pub profile: &'a mut UserProfile,
    pub by_bottle: &'a mut ListEntry,
    pub by_user: &'a mut ListEntry,
}

/// Appends a chunk to the author's draft.
pub fn stage_content(draft: &mut Draft, author: Pubkey, chunk: &str) -> Result<usize> {
    if draft.author == Pubkey::default() {
        draft.author = author;
    }
    draft.append(chunk)
}

/// Full content of a write: the staged draft, if any, followed by `tail`.
pub fn compose_content(draft: Option<&Draft>, tail: String) -> String {
    match draft {
        Some(draft) => {
            let mut content = String::with_capacity(draft.content.len() + tail.len());
            content.push_str(&draft.content);
            content.push_str(&tail);
            content
        }
        None => tail,
    }
}

#[allow(clippy::too_many_arguments)]
pub fn send_bottle(
    ledger: &mut Ledger,
    active_set: &mut impl ActiveEntriesMut,
    profile: &mut UserProfile,
    by_user: &mut ListEntry,
    bottle: &mut Bottle,
    sender: Pubkey,
    content: String,
    now: i64,
) -> Result<BottleSent> {
    ledger.ensure_open()?;
    validate_content(&content)?;

    let bottle_id = ledger.next_bottle_id()?;
    let active_slot = active_set.insert(bottle_id, sender)?;

    bind_profile(profile, sender);
    let position = profile.push_bottle()?;
    by_user.fill(position, bottle_id);

    bottle.id = bottle_id;
    bottle.sender = sender;
    bottle.content = content;
    bottle.created_at = now;
    bottle.active = true;
    bottle.reply_count = 0;
    bottle.active_slot = active_slot;

    Ok(BottleSent {
        bottle_id,
        sender,
        timestamp: now,
    })
}

pub fn draw_bottle(
    ledger: &Ledger,
    active_set: &impl ActiveEntries,
    caller: &Pubkey,
    draw: &DrawContext,
) -> Result<u64> {
    let seed = draw_seed(
        draw.unix_timestamp,
        draw.slot,
        &draw.slot_hash,
        caller,
        active_set.len(),
        ledger.bottle_count,
    );
    let entry = active_set.pick(seed, caller)?;
    Ok(entry.bottle_id)
}

pub fn open_bottle(
    bottle: &Bottle,
    state: &mut UserBottleState,
    receiver: Pubkey,
    now: i64,
) -> Result<BottleReceived> {
    bottle.ensure_active()?;
    require!(receiver != bottle.sender, BottleError::CannotViewOwnBottle);

    bind_state(state, receiver, bottle.id);
    state.mark_viewed();

    Ok(BottleReceived {
        bottle_id: bottle.id,
        receiver,
        timestamp: now,
    })
}

#[allow(clippy::too_many_arguments)]
pub fn reply_to_bottle(
    ledger: &mut Ledger,
    bottle: &mut Bottle,
    state: &mut UserBottleState,
    index: ReplyIndex<'_>,
    reply: &mut Reply,
    replier: Pubkey,
    content: String,
    now: i64,
) -> Result<BottleReplied> {
    ledger.ensure_open()?;
    validate_content(&content)?;
    bottle.ensure_active()?;
    require!(replier != bottle.sender, BottleError::CannotReplyOwnBottle);

    bind_state(state, replier, bottle.id);
    state.mark_replied()?;

    write_reply(ledger, bottle, index, reply, replier, content, 0, now)
}

#[allow(clippy::too_many_arguments)]
pub fn reply_to_reply(
    ledger: &mut Ledger,
    parent: &Reply,
    bottle: &mut Bottle,
    index: ReplyIndex<'_>,
    reply: &mut Reply,
    replier: Pubkey,
    content: String,
    now: i64,
) -> Result<BottleReplied> {
    ledger.ensure_open()?;
    validate_content(&content)?;
    require!(replier != parent.replier, BottleError::CannotReplyOwnReply);
    require!(bottle.id == parent.bottle_id, BottleError::BottleNotFound);
    bottle.ensure_active()?;

    write_reply(ledger, bottle, index, reply, replier, content, parent.id, now)
}

pub fn skip_bottle(
    bottle: &Bottle,
    state: &mut UserBottleState,
    skipper: Pubkey,
    now: i64,
) -> Result<BottleSkipped> {
    bottle.ensure_active()?;
    require!(skipper != bottle.sender, BottleError::CannotSkipOwnBottle);

    bind_state(state, skipper, bottle.id);
    state.mark_skipped()?;

    Ok(BottleSkipped {
        bottle_id: bottle.id,
        skipper,
        timestamp: now,
    })
}

/// Retires a bottle and swap-removes it from the active set. When another
/// bottle was moved into the vacated slot, returns `(moved_id, slot)`; the
/// caller must pass that bottle to [`relocate`].
pub fn deactivate_bottle(
    bottle: &mut Bottle,
    active_set: &mut impl ActiveEntriesMut,
    caller: Pubkey,
    now: i64,
) -> Result<(BottleDeactivated, Option<(u64, u32)>)> {
    require!(caller == bottle.sender, BottleError::NotBottleOwner);
    bottle.ensure_active()?;

    let slot = bottle.active_slot;
    let moved = active_set.swap_remove(slot, bottle.id)?;
    bottle.active = false;

    let event = BottleDeactivated {
        bottle_id: bottle.id,
        sender: caller,
        timestamp: now,
    };
    Ok((event, moved.map(|id| (id, slot))))
}

/// Points a swapped bottle's reverse index at its new slot.
pub fn relocate(moved: &mut Bottle, moved_id: u64, slot: u32) -> Result<()> {
    require!(moved.id == moved_id, BottleError::ActiveIndexMismatch);
    moved.active_slot = slot;
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn write_reply(
    ledger: &mut Ledger,
    bottle: &mut Bottle,
    index: ReplyIndex<'_>,
    reply: &mut Reply,
    replier: Pubkey,
    content: String,
    parent_reply_id: u64,
    now: i64,
) -> Result<BottleReplied> {
    let reply_id = ledger.next_reply_id()?;

    bind_profile(index.profile, replier);
    let user_position = index.profile.push_reply()?;
    index.by_user.fill(user_position, reply_id);
    let bottle_position = bottle.record_reply()?;
    index.by_bottle.fill(bottle_position, reply_id);

    reply.id = reply_id;
    reply.bottle_id = bottle.id;
    reply.replier = replier;
    reply.content = content;
    reply.created_at = now;
    reply.parent_reply_id = parent_reply_id;

    Ok(BottleReplied {
        bottle_id: bottle.id,
        reply_id,
        parent_reply_id,
        replier,
        timestamp: now,
    })
}

// init_if_needed hands over zeroed accounts; stamp the owner on first use.
fn bind_profile(profile: &mut UserProfile, owner: Pubkey) {
    if profile.owner == Pubkey::default() {
        profile.owner = owner;
    }
}

fn bind_state(state: &mut UserBottleState, user: Pubkey, bottle_id: u64) {
    if state.user == Pubkey::default() {
        state.user = user;
        state.bottle_id = bottle_id;
    }
}
