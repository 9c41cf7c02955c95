use anchor_lang::prelude::*;
use sha2::{Digest, Sha256};

use crate::errors::BottleError;
use crate::state::MAX_CONTENT_CHARS;

/// Rejects content that is blank after trimming or longer than the cap.
pub fn validate_content(content: &str) -> Result<()> {
    require!(!content.trim().is_empty(), BottleError::EmptyContent);
    require!(
        content.chars().count() <= MAX_CONTENT_CHARS,
        BottleError::ContentTooLong
    );
    Ok(())
}

/// Reads the most recent hash out of the raw SlotHashes sysvar data.
/// Layout: u64 entry count, then (u64 slot, [u8; 32] hash) entries.
pub fn latest_slot_hash(data: &[u8]) -> Result<[u8; 32]> {
    require!(data.len() >= 48, BottleError::InvalidSlotHashes);
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&data[16..48]);
    Ok(hash)
}

/// Pseudo-random seed for picking from the active set. Mixes the clock, the
/// chain-supplied slot hash, the caller, the active-set size and the bottle
/// sequence number. Predictable to validators; good enough for discovery.
pub fn draw_seed(
    unix_timestamp: i64,
    slot: u64,
    slot_hash: &[u8; 32],
    caller: &Pubkey,
    active_len: usize,
    bottle_count: u64,
) -> u64 {
    let digest = Sha256::new()
        .chain_update(unix_timestamp.to_le_bytes())
        .chain_update(slot.to_le_bytes())
        .chain_update(slot_hash)
        .chain_update(caller.as_ref())
        .chain_update((active_len as u64).to_le_bytes())
        .chain_update(bottle_count.to_le_bytes())
        .finalize();
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(head)
}

/// Largest serialized transaction the cluster accepts.
pub const PACKET_DATA_SIZE: usize = 1232;

/// Content bytes a client may pass inline to `send_bottle`,
/// `reply_to_bottle` or `reply_to_reply`. Longer content is staged first.
pub const MAX_INLINE_CONTENT_BYTES: usize = 640;

/// Largest chunk a client passes to `stage_content`.
pub const MAX_CHUNK_BYTES: usize = 900;

/// Shape of a single-signer legacy transaction carrying one instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TxShape {
    /// Account keys in the message, program id included.
    pub keys: usize,
    /// Account metas on the instruction.
    pub accounts: usize,
    /// Instruction data other than the content bytes: discriminator, fixed
    /// arguments and the string length prefix.
    pub fixed_data: usize,
}

/// `send_bottle` with a draft attached: sender, ledger, active set, draft,
/// bottle, profile, user list entry, system program.
pub const SEND_BOTTLE_TX: TxShape = TxShape {
    keys: 9,
    accounts: 8,
    fixed_data: 8 + 4,
};

/// `reply_to_bottle` with a draft attached: replier, ledger, bottle, draft,
/// reply, bottle list entry, user state, profile, user list entry, system
/// program.
pub const REPLY_TO_BOTTLE_TX: TxShape = TxShape {
    keys: 11,
    accounts: 10,
    fixed_data: 8 + 8 + 4,
};

/// `reply_to_reply` with a draft attached: replier, ledger, parent, bottle,
/// draft, reply, bottle list entry, profile, user list entry, system program.
pub const REPLY_TO_REPLY_TX: TxShape = TxShape {
    keys: 11,
    accounts: 10,
    fixed_data: 8 + 8 + 4,
};

/// `stage_content`: author, draft, system program.
pub const STAGE_CONTENT_TX: TxShape = TxShape {
    keys: 4,
    accounts: 3,
    fixed_data: 8 + 4,
};

fn compact_len(n: usize) -> usize {
    match n {
        0..=0x7f => 1,
        0x80..=0x3fff => 2,
        _ => 3,
    }
}

impl TxShape {
    /// Serialized size with `content_len` bytes of content.
    pub fn size(&self, content_len: usize) -> usize {
        let data = self.fixed_data + content_len;
        let signatures = compact_len(1) + 64;
        let header = 3;
        let keys = compact_len(self.keys) + 32 * self.keys;
        let blockhash = 32;
        let instruction = 1
            + compact_len(self.accounts)
            + self.accounts
            + compact_len(data)
            + data;
        signatures + header + keys + blockhash + compact_len(1) + instruction
    }

    pub fn fits(&self, content_len: usize) -> bool {
        self.size(content_len) <= PACKET_DATA_SIZE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_content_is_rejected() {
        assert!(validate_content("").is_err());
        assert!(validate_content("   \n\t").is_err());
        assert!(validate_content(" hi ").is_ok());
    }

    #[test]
    fn length_is_counted_in_characters() {
        assert!(validate_content(&"a".repeat(1000)).is_ok());
        assert!(validate_content(&"a".repeat(1001)).is_err());
        // 1000 three-byte characters still fit
        assert!(validate_content(&"瓶".repeat(1000)).is_ok());
        assert!(validate_content(&"瓶".repeat(1001)).is_err());
    }

    #[test]
    fn slot_hash_needs_one_entry() {
        assert!(latest_slot_hash(&[0u8; 47]).is_err());
        let mut data = vec![0u8; 48];
        data[16..48].copy_from_slice(&[7u8; 32]);
        assert_eq!(latest_slot_hash(&data).unwrap(), [7u8; 32]);
    }

    #[test]
    fn seed_depends_on_caller() {
        let a = Pubkey::new_unique();
        let b = Pubkey::new_unique();
        let hash = [3u8; 32];
        assert_eq!(
            draw_seed(100, 5, &hash, &a, 3, 3),
            draw_seed(100, 5, &hash, &a, 3, 3)
        );
        assert_ne!(
            draw_seed(100, 5, &hash, &a, 3, 3),
            draw_seed(100, 5, &hash, &b, 3, 3)
        );
    }

    #[test]
    fn seed_is_the_le_head_of_the_digest() {
        let caller = Pubkey::new_from_array([9u8; 32]);
        let seed = draw_seed(42, 7, &[1u8; 32], &caller, 3, 5);
        assert_eq!(seed, 0xe4af_587e_5b20_24e0);
        assert_eq!(seed, 16_478_486_861_289_891_040);
        // three active bottles: the draw lands on slot 1
        assert_eq!(seed % 3, 1);
    }

    #[test]
    fn inline_content_fits_every_write() {
        for shape in [SEND_BOTTLE_TX, REPLY_TO_BOTTLE_TX, REPLY_TO_REPLY_TX] {
            assert!(shape.fits(MAX_INLINE_CONTENT_BYTES), "{shape:?}");
        }
        assert!(STAGE_CONTENT_TX.fits(MAX_CHUNK_BYTES));
        assert_eq!(SEND_BOTTLE_TX.size(0), 413);
        assert_eq!(SEND_BOTTLE_TX.size(640), 1054);
    }

    #[test]
    fn full_message_does_not_fit_inline() {
        assert!(!SEND_BOTTLE_TX.fits(1000));
        assert!(!REPLY_TO_BOTTLE_TX.fits(1000));
        // 1000 three-byte characters need staging in several chunks
        assert!(!STAGE_CONTENT_TX.fits(3000));
    }
}
