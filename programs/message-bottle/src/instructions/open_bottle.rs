use anchor_lang::prelude::*;

use crate::bookkeeping;
use crate::state::*;

#[derive(Accounts)]
#[instruction(bottle_id: u64)]
pub struct OpenBottle<'info> {
    #[account(mut)]
    pub receiver: Signer<'info>,

    #[account(
        seeds = [b"bottle", bottle_id.to_le_bytes().as_ref()],
        bump = bottle.bump,
    )]
    pub bottle: Account<'info, Bottle>,

    #[account(
        init_if_needed,
        payer = receiver,
        space = UserBottleState::SIZE,
        seeds = [b"user_state", receiver.key().as_ref(), bottle_id.to_le_bytes().as_ref()],
        bump,
    )]
    pub user_state: Account<'info, UserBottleState>,

    pub system_program: Program<'info, System>,
}

pub fn handler(ctx: Context<OpenBottle>, _bottle_id: u64) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let receiver = ctx.accounts.receiver.key();
    let accounts = &mut *ctx.accounts;

    let event = bookkeeping::open_bottle(&accounts.bottle, &mut accounts.user_state, receiver, now)?;
    accounts.user_state.bump = ctx.bumps.user_state;

    emit!(event);
    Ok(())
}
