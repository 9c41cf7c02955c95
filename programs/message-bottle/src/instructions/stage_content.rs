use anchor_lang::prelude::*;

use crate::bookkeeping;
use crate::state::*;

#[derive(Accounts)]
pub struct StageContent<'info> {
    #[account(mut)]
    pub author: Signer<'info>,

    #[account(
        init_if_needed,
        payer = author,
        space = Draft::SIZE,
        seeds = [b"draft", author.key().as_ref()],
        bump,
    )]
    pub draft: Account<'info, Draft>,

    pub system_program: Program<'info, System>,
}

pub fn handler(ctx: Context<StageContent>, chunk: String) -> Result<()> {
    let author = ctx.accounts.author.key();
    let staged = bookkeeping::stage_content(&mut ctx.accounts.draft, author, &chunk)?;
    ctx.accounts.draft.bump = ctx.bumps.draft;

    msg!("Draft of {} holds {} bytes", author, staged);
    Ok(())
}
