use anchor_lang::prelude::*;

use crate::state::*;

#[derive(Accounts)]
pub struct DiscardDraft<'info> {
    #[account(mut)]
    pub author: Signer<'info>,

    #[account(
        mut,
        close = author,
        seeds = [b"draft", author.key().as_ref()],
        bump = draft.bump,
    )]
    pub draft: Account<'info, Draft>,
}

pub fn handler(ctx: Context<DiscardDraft>) -> Result<()> {
    msg!("Draft of {} discarded", ctx.accounts.author.key());
    Ok(())
}
