use anchor_lang::prelude::*;

use crate::state::*;

#[derive(Accounts)]
pub struct Initialize<'info> {
    #[account(mut)]
    pub authority: Signer<'info>,

    #[account(
        init,
        payer = authority,
        space = Ledger::SIZE,
        seeds = [b"ledger"],
        bump,
    )]
    pub ledger: Account<'info, Ledger>,

    #[account(
        init,
        payer = authority,
        space = ActiveSet::space(0),
        seeds = [b"active_set"],
        bump,
    )]
    pub active_set: Account<'info, ActiveSet>,

    pub system_program: Program<'info, System>,
}

pub fn handler(ctx: Context<Initialize>) -> Result<()> {
    let ledger = &mut ctx.accounts.ledger;
    ledger.authority = ctx.accounts.authority.key();
    ledger.bottle_count = 0;
    ledger.reply_count = 0;
    ledger.paused = false;
    ledger.updated_at = Clock::get()?.unix_timestamp;
    ledger.bump = ctx.bumps.ledger;

    let active_set = &mut ctx.accounts.active_set;
    active_set.entries = Vec::new();
    active_set.bump = ctx.bumps.active_set;

    msg!("Ledger initialized, authority {}", ledger.authority);
    Ok(())
}
