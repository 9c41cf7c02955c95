use anchor_lang::prelude::*;

use crate::bookkeeping;
use crate::state::*;

use super::resize::resize_active_set;

#[derive(Accounts)]
#[instruction(content: String)]
pub struct SendBottle<'info> {
    #[account(mut)]
    pub sender: Signer<'info>,

    #[account(
        mut,
        seeds = [b"ledger"],
        bump = ledger.bump,
    )]
    pub ledger: Account<'info, Ledger>,

    /// CHECK: ActiveSet, grown by one entry and written in place
    #[account(
        mut,
        seeds = [b"active_set"],
        bump,
        owner = crate::ID,
    )]
    pub active_set: UncheckedAccount<'info>,

    /// Content staged with `stage_content`, prepended and then closed.
    #[account(
        mut,
        seeds = [b"draft", sender.key().as_ref()],
        bump = draft.bump,
    )]
    pub draft: Option<Account<'info, Draft>>,

    #[account(
        init,
        payer = sender,
        space = Bottle::space(draft.as_ref().map_or(0, |d| d.content.len()) + content.len()),
        seeds = [b"bottle", (ledger.bottle_count + 1).to_le_bytes().as_ref()],
        bump,
    )]
    pub bottle: Box<Account<'info, Bottle>>,

    #[account(
        init_if_needed,
        payer = sender,
        space = UserProfile::SIZE,
        seeds = [b"profile", sender.key().as_ref()],
        bump,
    )]
    pub profile: Account<'info, UserProfile>,

    #[account(
        init,
        payer = sender,
        space = ListEntry::SIZE,
        seeds = [b"user_bottle", sender.key().as_ref(), profile.bottle_count.to_le_bytes().as_ref()],
        bump,
    )]
    pub user_bottle: Account<'info, ListEntry>,

    pub system_program: Program<'info, System>,
}

pub fn handler(ctx: Context<SendBottle>, content: String) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let sender = ctx.accounts.sender.key();
    let accounts = &mut *ctx.accounts;

    let active_info = accounts.active_set.to_account_info();
    let len = stored_active_len(&active_info.try_borrow_data()?)?;
    resize_active_set(
        &active_info,
        &accounts.sender.to_account_info(),
        &accounts.system_program.to_account_info(),
        len + 1,
    )?;

    let content = bookkeeping::compose_content(accounts.draft.as_deref(), content);
    let event = {
        let mut data = active_info.try_borrow_mut_data()?;
        let mut active_set = ActiveSetData::new(&mut data[..])?;
        bookkeeping::send_bottle(
            &mut accounts.ledger,
            &mut active_set,
            &mut accounts.profile,
            &mut accounts.user_bottle,
            &mut accounts.bottle,
            sender,
            content,
            now,
        )?
    };
    accounts.bottle.bump = ctx.bumps.bottle;
    accounts.profile.bump = ctx.bumps.profile;
    accounts.user_bottle.bump = ctx.bumps.user_bottle;

    if let Some(draft) = &accounts.draft {
        draft.close(accounts.sender.to_account_info())?;
    }

    msg!("Bottle {} sent", event.bottle_id);
    emit!(event);
    Ok(())
}
