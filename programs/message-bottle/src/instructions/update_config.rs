use anchor_lang::prelude::*;

use crate::errors::BottleError;
use crate::state::*;

#[derive(Accounts)]
pub struct UpdateConfig<'info> {
    pub authority: Signer<'info>,

    #[account(
        mut,
        seeds = [b"ledger"],
        bump = ledger.bump,
        constraint = ledger.authority == authority.key() @ BottleError::Unauthorized,
    )]
    pub ledger: Account<'info, Ledger>,
}

pub fn handler(
    ctx: Context<UpdateConfig>,
    new_authority: Option<Pubkey>,
    paused: Option<bool>,
) -> Result<()> {
    let ledger = &mut ctx.accounts.ledger;
    if let Some(authority) = new_authority {
        ledger.authority = authority;
    }
    if let Some(paused) = paused {
        ledger.paused = paused;
    }
    ledger.updated_at = Clock::get()?.unix_timestamp;

    msg!("Config updated, paused={}", ledger.paused);
    Ok(())
}
