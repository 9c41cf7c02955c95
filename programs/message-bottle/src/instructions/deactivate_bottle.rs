use anchor_lang::prelude::*;

use crate::bookkeeping;
use crate::errors::BottleError;
use crate::state::*;

use super::resize::resize_active_set;

#[derive(Accounts)]
#[instruction(bottle_id: u64)]
pub struct DeactivateBottle<'info> {
    #[account(mut)]
    pub sender: Signer<'info>,

    #[account(
        mut,
        seeds = [b"bottle", bottle_id.to_le_bytes().as_ref()],
        bump = bottle.bump,
        constraint = bottle.sender == sender.key() @ BottleError::NotBottleOwner,
    )]
    pub bottle: Account<'info, Bottle>,

    /// CHECK: ActiveSet, written in place and shrunk by one entry
    #[account(
        mut,
        seeds = [b"active_set"],
        bump,
        owner = crate::ID,
    )]
    pub active_set: UncheckedAccount<'info>,

    /// The bottle currently in the last active slot. Omit when `bottle` is
    /// itself the last entry.
    #[account(mut)]
    pub moved_bottle: Option<Account<'info, Bottle>>,

    pub system_program: Program<'info, System>,
}

pub fn handler(ctx: Context<DeactivateBottle>, _bottle_id: u64) -> Result<()> {
    let now = Clock::get()?.unix_timestamp;
    let sender = ctx.accounts.sender.key();
    let accounts = &mut *ctx.accounts;

    let active_info = accounts.active_set.to_account_info();
    let (event, moved, len) = {
        let mut data = active_info.try_borrow_mut_data()?;
        let mut active_set = ActiveSetData::new(&mut data[..])?;
        let (event, moved) =
            bookkeeping::deactivate_bottle(&mut accounts.bottle, &mut active_set, sender, now)?;
        (event, moved, active_set.len())
    };
    resize_active_set(
        &active_info,
        &accounts.sender.to_account_info(),
        &accounts.system_program.to_account_info(),
        len,
    )?;

    if let Some((moved_id, slot)) = moved {
        let moved_bottle = accounts
            .moved_bottle
            .as_mut()
            .ok_or(BottleError::ActiveIndexMismatch)?;
        bookkeeping::relocate(moved_bottle, moved_id, slot)?;
    }

    msg!("Bottle {} deactivated", event.bottle_id);
    emit!(event);
    Ok(())
}
