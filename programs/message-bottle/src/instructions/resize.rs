use anchor_lang::prelude::*;
use anchor_lang::system_program;

use crate::state::ActiveSet;

/// Resizes the active set account to hold `len` entries. Rent for a larger
/// account is paid by `payer`; the surplus of a smaller one is returned to it.
pub(crate) fn resize_active_set<'info>(
    active_set: &AccountInfo<'info>,
    payer: &AccountInfo<'info>,
    system_program: &AccountInfo<'info>,
    len: usize,
) -> Result<()> {
    let space = ActiveSet::space(len);
    let rent = Rent::get()?.minimum_balance(space);
    let held = active_set.lamports();

    if rent > held {
        system_program::transfer(
            CpiContext::new(
                system_program.clone(),
                system_program::Transfer {
                    from: payer.clone(),
                    to: active_set.clone(),
                },
            ),
            rent - held,
        )?;
    } else if held > rent {
        **active_set.try_borrow_mut_lamports()? -= held - rent;
        **payer.try_borrow_mut_lamports()? += held - rent;
    }

    #[allow(deprecated)]
    active_set.realloc(space, false)?;
    Ok(())
}
