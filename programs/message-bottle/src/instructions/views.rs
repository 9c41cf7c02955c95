use anchor_lang::prelude::*;

use crate::state::*;

#[derive(Accounts)]
pub struct ReadLedger<'info> {
    #[account(
        seeds = [b"ledger"],
        bump = ledger.bump,
    )]
    pub ledger: Account<'info, Ledger>,

    /// CHECK: ActiveSet, only its entry count is read
    #[account(
        seeds = [b"active_set"],
        bump,
        owner = crate::ID,
    )]
    pub active_set: UncheckedAccount<'info>,
}

#[derive(Accounts)]
#[instruction(user: Pubkey, bottle_id: u64)]
pub struct ReadUserBottleState<'info> {
    #[account(
        seeds = [b"ledger"],
        bump = ledger.bump,
    )]
    pub ledger: Account<'info, Ledger>,

    /// CHECK: may be uninitialized; an empty account means no interaction yet
    #[account(
        seeds = [b"user_state", user.as_ref(), bottle_id.to_le_bytes().as_ref()],
        bump,
    )]
    pub user_state: UncheckedAccount<'info>,
}

pub fn bottle_count(ctx: Context<ReadLedger>) -> Result<u64> {
    Ok(ctx.accounts.ledger.bottle_count)
}

pub fn total_replies(ctx: Context<ReadLedger>) -> Result<u64> {
    Ok(ctx.accounts.ledger.reply_count)
}

pub fn active_bottle_count(ctx: Context<ReadLedger>) -> Result<u64> {
    let data = ctx.accounts.active_set.try_borrow_data()?;
    Ok(stored_active_len(&data)? as u64)
}

pub fn user_bottle_flags(
    ctx: Context<ReadUserBottleState>,
    _user: Pubkey,
    bottle_id: u64,
) -> Result<UserBottleFlags> {
    ctx.accounts.ledger.ensure_bottle(bottle_id)?;

    let data = ctx.accounts.user_state.try_borrow_data()?;
    if data.is_empty() {
        return Ok(UserBottleFlags::default());
    }
    let state = UserBottleState::try_deserialize(&mut &data[..])?;
    Ok(state.flags())
}
