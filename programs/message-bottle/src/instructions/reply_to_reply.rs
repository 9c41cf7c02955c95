use anchor_lang::prelude::*;

use crate::bookkeeping::{self, ReplyIndex};
use crate::state::*;

#[derive(Accounts)]
#[instruction(reply_id: u64, content: String)]
pub struct ReplyToReply<'info> {
    #[account(mut)]
    pub replier: Signer<'info>,

    #[account(
        mut,
        seeds = [b"ledger"],
        bump = ledger.bump,
    )]
    pub ledger: Account<'info, Ledger>,

    #[account(
        seeds = [b"reply", reply_id.to_le_bytes().as_ref()],
        bump = parent.bump,
    )]
    pub parent: Box<Account<'info, Reply>>,

    #[account(
        mut,
        seeds = [b"bottle", parent.bottle_id.to_le_bytes().as_ref()],
        bump = bottle.bump,
    )]
    pub bottle: Box<Account<'info, Bottle>>,

    #[account(
        mut,
        seeds = [b"draft", replier.key().as_ref()],
        bump = draft.bump,
    )]
    pub draft: Option<Account<'info, Draft>>,

    #[account(
        init,
        payer = replier,
        space = Reply::space(draft.as_ref().map_or(0, |d| d.content.len()) + content.len()),
        seeds = [b"reply", (ledger.reply_count + 1).to_le_bytes().as_ref()],
        bump,
    )]
    pub reply: Box<Account<'info, Reply>>,

    #[account(
        init,
        payer = replier,
        space = ListEntry::SIZE,
        seeds = [b"bottle_reply", parent.bottle_id.to_le_bytes().as_ref(), bottle.reply_count.to_le_bytes().as_ref()],
        bump,
    )]
    pub bottle_reply: Account<'info, ListEntry>,

    #[account(
        init_if_needed,
        payer = replier,
        space = UserProfile::SIZE,
        seeds = [b"profile", replier.key().as_ref()],
        bump,
    )]
    pub profile: Account<'info, UserProfile>,

    #[account(
        init,
        payer = replier,
        space = ListEntry::SIZE,
        seeds = [b"user_reply", replier.key().as_ref(), profile.reply_count.to_le_bytes().as_ref()],
        bump,
    )]
    pub user_reply: Account<'info, ListEntry>,

    pub system_program: Program<'info, System>,
}

pub fn handler(ctx: Context<ReplyToReply>, _reply_id: u64, content: String) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let replier = ctx.accounts.replier.key();
    let accounts = &mut *ctx.accounts;

    let content = bookkeeping::compose_content(accounts.draft.as_deref(), content);
    let event = bookkeeping::reply_to_reply(
        &mut accounts.ledger,
        &accounts.parent,
        &mut accounts.bottle,
        ReplyIndex {
            profile: &mut accounts.profile,
            by_bottle: &mut accounts.bottle_reply,
            by_user: &mut accounts.user_reply,
        },
        &mut accounts.reply,
        replier,
        content,
        now,
    )?;
    accounts.reply.bump = ctx.bumps.reply;
    accounts.bottle_reply.bump = ctx.bumps.bottle_reply;
    accounts.profile.bump = ctx.bumps.profile;
    accounts.user_reply.bump = ctx.bumps.user_reply;

    if let Some(draft) = &accounts.draft {
        draft.close(accounts.replier.to_account_info())?;
    }

    msg!(
        "Reply {} to reply {} on bottle {}",
        event.reply_id,
        event.parent_reply_id,
        event.bottle_id
    );
    emit!(event);
    Ok(())
}
