//! Message Bottle, a message-in-a-bottle ledger on Solana.
//!
//! Users cast short text bottles into a shared sea, draw a pseudo-random
//! bottle written by someone else, and may answer each bottle once. Answers
//! can be threaded. Senders may retire their bottles, which takes them out of
//! the draw for good.

use anchor_lang::prelude::*;

pub mod bookkeeping;
pub mod errors;
pub mod events;
pub mod instructions;
pub mod state;
pub mod utils;

use instructions::*;
use state::UserBottleFlags;

declare_id!("BtLmsgPz7kRq3WvXhN5cYdE2uJfA9oGs4TbKeH8iMwQ");

#[program]
pub mod message_bottle {
    use super::*;

    /// Create the ledger config and the empty active set. Can only be called once.
    pub fn initialize(ctx: Context<Initialize>) -> Result<()> {
        instructions::initialize::handler(ctx)
    }

    /// Hand over authority or toggle the pause switch (authority only).
    pub fn update_config(
        ctx: Context<UpdateConfig>,
        new_authority: Option<Pubkey>,
        paused: Option<bool>,
    ) -> Result<()> {
        instructions::update_config::handler(ctx, new_authority, paused)
    }

    /// Cast a new bottle. The id is reported through `BottleSent`.
    pub fn send_bottle(ctx: Context<SendBottle>, content: String) -> Result<()> {
        instructions::send_bottle::handler(ctx, content)
    }

    /// Append a chunk to the caller's draft. The next send or reply that
    /// passes the draft prepends it, so content longer than one transaction
    /// can carry is uploaded in pieces.
    pub fn stage_content(ctx: Context<StageContent>, chunk: String) -> Result<()> {
        instructions::stage_content::handler(ctx, chunk)
    }

    /// Drop a staged draft and reclaim its rent.
    pub fn discard_draft(ctx: Context<DiscardDraft>) -> Result<()> {
        instructions::discard_draft::handler(ctx)
    }

    /// Draw a random active bottle id. Meant to be simulated, not sent.
    pub fn get_random_bottle(ctx: Context<GetRandomBottle>) -> Result<u64> {
        instructions::get_random_bottle::handler(ctx)
    }

    /// Record that the caller picked up a bottle.
    pub fn open_bottle(ctx: Context<OpenBottle>, bottle_id: u64) -> Result<()> {
        instructions::open_bottle::handler(ctx, bottle_id)
    }

    pub fn reply_to_bottle(
        ctx: Context<ReplyToBottle>,
        bottle_id: u64,
        content: String,
    ) -> Result<()> {
        instructions::reply_to_bottle::handler(ctx, bottle_id, content)
    }

    pub fn reply_to_reply(
        ctx: Context<ReplyToReply>,
        reply_id: u64,
        content: String,
    ) -> Result<()> {
        instructions::reply_to_reply::handler(ctx, reply_id, content)
    }

    pub fn skip_bottle(ctx: Context<SkipBottle>, bottle_id: u64) -> Result<()> {
        instructions::skip_bottle::handler(ctx, bottle_id)
    }

    /// Retire a bottle (sender only). Irreversible.
    pub fn deactivate_bottle(ctx: Context<DeactivateBottle>, bottle_id: u64) -> Result<()> {
        instructions::deactivate_bottle::handler(ctx, bottle_id)
    }

    pub fn get_user_bottle_state(
        ctx: Context<ReadUserBottleState>,
        user: Pubkey,
        bottle_id: u64,
    ) -> Result<UserBottleFlags> {
        instructions::views::user_bottle_flags(ctx, user, bottle_id)
    }

    pub fn has_user_replied_to_bottle(
        ctx: Context<ReadUserBottleState>,
        user: Pubkey,
        bottle_id: u64,
    ) -> Result<bool> {
        let flags = instructions::views::user_bottle_flags(ctx, user, bottle_id)?;
        Ok(flags.has_replied)
    }

    pub fn get_active_bottle_count(ctx: Context<ReadLedger>) -> Result<u64> {
        instructions::views::active_bottle_count(ctx)
    }

    pub fn get_bottle_count(ctx: Context<ReadLedger>) -> Result<u64> {
        instructions::views::bottle_count(ctx)
    }

    pub fn get_total_replies(ctx: Context<ReadLedger>) -> Result<u64> {
        instructions::views::total_replies(ctx)
    }
}
