use anchor_lang::error::Error;
use anchor_lang::prelude::*;

#[error_code]
pub enum BottleError {
    #[msg("Bottle does not exist")]
    BottleNotFound,
    #[msg("Reply does not exist")]
    ReplyNotFound,
    #[msg("Content cannot be empty")]
    EmptyContent,
    #[msg("Content exceeds maximum length of 1000 characters")]
    ContentTooLong,
    #[msg("Cannot view own bottle")]
    CannotViewOwnBottle,
    #[msg("Cannot reply to own bottle")]
    CannotReplyOwnBottle,
    #[msg("Cannot reply to own reply")]
    CannotReplyOwnReply,
    #[msg("Cannot skip own bottle")]
    CannotSkipOwnBottle,
    #[msg("Only the sender can deactivate this bottle")]
    NotBottleOwner,
    #[msg("Already replied to this bottle")]
    AlreadyReplied,
    #[msg("Already skipped this bottle")]
    AlreadySkipped,
    #[msg("Bottle is not active")]
    BottleInactive,
    #[msg("No bottles available")]
    NoBottlesAvailable,
    #[msg("Swapped bottle does not match the active set")]
    ActiveIndexMismatch,
    #[msg("Unauthorized: caller is not the authority")]
    Unauthorized,
    #[msg("Ledger is paused")]
    LedgerPaused,
    #[msg("Slot hashes sysvar is malformed")]
    InvalidSlotHashes,
    #[msg("Math overflow")]
    MathOverflow,
}

impl BottleError {
    pub const ALL: [BottleError; 18] = [
        BottleError::BottleNotFound,
        BottleError::ReplyNotFound,
        BottleError::EmptyContent,
        BottleError::ContentTooLong,
        BottleError::CannotViewOwnBottle,
        BottleError::CannotReplyOwnBottle,
        BottleError::CannotReplyOwnReply,
        BottleError::CannotSkipOwnBottle,
        BottleError::NotBottleOwner,
        BottleError::AlreadyReplied,
        BottleError::AlreadySkipped,
        BottleError::BottleInactive,
        BottleError::NoBottlesAvailable,
        BottleError::ActiveIndexMismatch,
        BottleError::Unauthorized,
        BottleError::LedgerPaused,
        BottleError::InvalidSlotHashes,
        BottleError::MathOverflow,
    ];

    /// Looks up a variant by its on-chain error number (offset included).
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|e| u32::from(*e) == code)
    }

    /// Recovers the variant from an error returned by the bookkeeping
    /// functions or reported in a failed transaction.
    pub fn from_error(err: &Error) -> Option<Self> {
        match err {
            Error::AnchorError(e) => Self::from_code(e.error_code_number),
            Error::ProgramError(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_round_trip_through_lookup() {
        for variant in BottleError::ALL {
            let found = BottleError::from_code(u32::from(variant)).unwrap();
            assert_eq!(u32::from(found), u32::from(variant));
        }
        assert!(BottleError::from_code(0).is_none());
    }

    #[test]
    fn error_values_carry_their_variant() {
        let err: Error = BottleError::AlreadyReplied.into();
        let variant = BottleError::from_error(&err).unwrap();
        assert_eq!(u32::from(variant), u32::from(BottleError::AlreadyReplied));
    }
}
