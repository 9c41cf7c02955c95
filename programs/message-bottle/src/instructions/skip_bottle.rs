use anchor_lang::prelude::*;

use crate::bookkeeping;
use crate::state::*;

#[derive(Accounts)]
#[instruction(bottle_id: u64)]
pub struct SkipBottle<'info> {
    #[account(mut)]
    pub skipper: Signer<'info>,

    #[account(
        seeds = [b"bottle", bottle_id.to_le_bytes().as_ref()],
        bump = bottle.bump,
    )]
    pub bottle: Account<'info, Bottle>,

    #[account(
        init_if_needed,
        payer = skipper,
        space = UserBottleState::SIZE,
        seeds = [b"user_state", skipper.key().as_ref(), bottle_id.to_le_bytes().as_ref()],
        bump,
    )]
    pub user_state: Account<'info, UserBottleState>,

    pub system_program: Program<'info, System>,
}

pub fn handler(ctx: Context<SkipBottle>, _bottle_id: u64) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let skipper = ctx.accounts.skipper.key();
    let accounts = &mut *ctx.accounts;

    let event = bookkeeping::skip_bottle(&accounts.bottle, &mut accounts.user_state, skipper, now)?;
    accounts.user_state.bump = ctx.bumps.user_state;

    emit!(event);
    Ok(())
}
