use anchor_lang::prelude::*;
use anchor_lang::solana_program::sysvar::slot_hashes;

use crate::bookkeeping::{self, DrawContext};
use crate::state::*;
use crate::utils::latest_slot_hash;

#[derive(Accounts)]
pub struct GetRandomBottle<'info> {
    pub caller: Signer<'info>,

    #[account(
        seeds = [b"ledger"],
        bump = ledger.bump,
    )]
    pub ledger: Account<'info, Ledger>,

    /// CHECK: ActiveSet, read in place
    #[account(
        seeds = [b"active_set"],
        bump,
        owner = crate::ID,
    )]
    pub active_set: UncheckedAccount<'info>,

    /// CHECK: SlotHashes sysvar, read raw for entropy
    #[account(address = slot_hashes::ID)]
    pub slot_hashes: UncheckedAccount<'info>,
}

/// Read-only draw. Callers simulate it and re-roll on their side.
pub fn handler(ctx: Context<GetRandomBottle>) -> Result<u64> {
    let clock = Clock::get()?;
    let slot_hash = {
        let data = ctx.accounts.slot_hashes.try_borrow_data()?;
        latest_slot_hash(&data)?
    };
    let draw = DrawContext {
        unix_timestamp: clock.unix_timestamp,
        slot: clock.slot,
        slot_hash,
    };
    let data = ctx.accounts.active_set.try_borrow_data()?;
    let active_set = ActiveSetData::new(&data[..])?;
    bookkeeping::draw_bottle(
        &ctx.accounts.ledger,
        &active_set,
        &ctx.accounts.caller.key(),
        &draw,
    )
}
