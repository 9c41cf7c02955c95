use anchor_lang::prelude::*;

use anchor_lang::error::ErrorCode;

use crate::errors::BottleError;

/// Upper bound on content length, counted in characters.
pub const MAX_CONTENT_CHARS: usize = 1000;

/// UTF-8 size of the longest valid content.
pub const MAX_CONTENT_BYTES: usize = 4 * MAX_CONTENT_CHARS;

// ── Ledger PDA ── seeds: ["ledger"]
#[account]
#[derive(Default, Debug, PartialEq, Eq)]
pub struct Ledger {
    pub authority: Pubkey,
    pub bottle_count: u64,
    pub reply_count: u64,
    pub paused: bool,
    pub updated_at: i64,
    pub bump: u8,
}

impl Ledger {
    pub const SIZE: usize = 8 + 32 + 8 + 8 + 1 + 8 + 1;

    pub fn has_bottle(&self, bottle_id: u64) -> bool {
        bottle_id >= 1 && bottle_id <= self.bottle_count
    }

    pub fn has_reply(&self, reply_id: u64) -> bool {
        reply_id >= 1 && reply_id <= self.reply_count
    }

    pub fn ensure_bottle(&self, bottle_id: u64) -> Result<()> {
        require!(self.has_bottle(bottle_id), BottleError::BottleNotFound);
        Ok(())
    }

    pub fn ensure_reply(&self, reply_id: u64) -> Result<()> {
        require!(self.has_reply(reply_id), BottleError::ReplyNotFound);
        Ok(())
    }

    pub fn ensure_open(&self) -> Result<()> {
        require!(!self.paused, BottleError::LedgerPaused);
        Ok(())
    }

    /// Allocates the next bottle id.
    pub fn next_bottle_id(&mut self) -> Result<u64> {
        self.bottle_count = self
            .bottle_count
            .checked_add(1)
            .ok_or(BottleError::MathOverflow)?;
        Ok(self.bottle_count)
    }

    /// Allocates the next reply id. Independent of the bottle id space.
    pub fn next_reply_id(&mut self) -> Result<u64> {
        self.reply_count = self
            .reply_count
            .checked_add(1)
            .ok_or(BottleError::MathOverflow)?;
        Ok(self.reply_count)
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct ActiveEntry {
    pub bottle_id: u64,
    pub sender: Pubkey,
}

impl ActiveEntry {
    pub const SIZE: usize = 8 + 32;
}

// ── ActiveSet PDA ── seeds: ["active_set"]
// Dense array of active bottles. Each bottle stores its own slot, which is
// the reverse index used for swap-and-pop removal. The account is resized
// by one entry on every insert and removal. `bump` comes first so the
// entries sit at a fixed offset for in-place access.
#[account]
#[derive(Default, Debug, PartialEq, Eq)]
pub struct ActiveSet {
    pub bump: u8,
    pub entries: Vec<ActiveEntry>,
}

impl ActiveSet {
    /// Discriminator, bump and the entry count prefix.
    pub const HEADER: usize = 8 + 1 + 4;

    pub fn space(len: usize) -> usize {
        Self::HEADER + ActiveEntry::SIZE * len
    }

    pub fn contains(&self, bottle_id: u64) -> bool {
        self.entries.iter().any(|e| e.bottle_id == bottle_id)
    }
}

/// Read access to the active set, whether deserialized into an
/// [`ActiveSet`] or viewed in place through [`ActiveSetData`].
pub trait ActiveEntries {
    fn len(&self) -> usize;
    fn get(&self, slot: usize) -> Option<ActiveEntry>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Picks the entry addressed by `seed`, rejecting the caller's own bottle.
    fn pick(&self, seed: u64, caller: &Pubkey) -> Result<ActiveEntry> {
        require!(!self.is_empty(), BottleError::NoBottlesAvailable);
        let entry = self
            .get((seed % self.len() as u64) as usize)
            .ok_or(BottleError::ActiveIndexMismatch)?;
        require!(entry.sender != *caller, BottleError::CannotViewOwnBottle);
        Ok(entry)
    }
}

pub trait ActiveEntriesMut: ActiveEntries {
    fn set(&mut self, slot: usize, entry: ActiveEntry);
    fn push(&mut self, entry: ActiveEntry) -> Result<()>;
    fn pop(&mut self) -> Option<ActiveEntry>;

    /// Appends a bottle and returns the slot it landed in.
    fn insert(&mut self, bottle_id: u64, sender: Pubkey) -> Result<u32> {
        let slot = u32::try_from(self.len()).map_err(|_| BottleError::MathOverflow)?;
        self.push(ActiveEntry { bottle_id, sender })?;
        Ok(slot)
    }

    /// Removes the bottle at `slot` by moving the last entry into its place.
    /// Returns the id of the bottle that now occupies `slot`, if any, so the
    /// caller can update that bottle's reverse index.
    fn swap_remove(&mut self, slot: u32, bottle_id: u64) -> Result<Option<u64>> {
        let index = slot as usize;
        require!(
            self.get(index).map(|e| e.bottle_id) == Some(bottle_id),
            BottleError::ActiveIndexMismatch
        );
        let last = self.pop().ok_or(BottleError::ActiveIndexMismatch)?;
        if index < self.len() {
            self.set(index, last);
            Ok(Some(last.bottle_id))
        } else {
            Ok(None)
        }
    }
}

impl ActiveEntries for ActiveSet {
    fn len(&self) -> usize {
        self.entries.len()
    }

    fn get(&self, slot: usize) -> Option<ActiveEntry> {
        self.entries.get(slot).copied()
    }
}

impl ActiveEntriesMut for ActiveSet {
    fn set(&mut self, slot: usize, entry: ActiveEntry) {
        self.entries[slot] = entry;
    }

    fn push(&mut self, entry: ActiveEntry) -> Result<()> {
        self.entries.push(entry);
        Ok(())
    }

    fn pop(&mut self) -> Option<ActiveEntry> {
        self.entries.pop()
    }
}

/// In-place view over the serialized `ActiveSet` account. Touches only the
/// count and the entries it reads or writes, so the cost of a draw or an
/// update does not grow with the set.
pub struct ActiveSetData<D> {
    data: D,
}

const LEN_AT: usize = 9;

impl<D: AsRef<[u8]>> ActiveSetData<D> {
    pub fn new(data: D) -> Result<Self> {
        let bytes = data.as_ref();
        require!(bytes.len() >= ActiveSet::HEADER, ErrorCode::AccountDidNotDeserialize);
        require!(
            &bytes[..8] == ActiveSet::DISCRIMINATOR,
            ErrorCode::AccountDiscriminatorMismatch
        );
        require!(
            ActiveSet::space(read_len(bytes)) <= bytes.len(),
            ErrorCode::AccountDidNotDeserialize
        );
        Ok(Self { data })
    }
}

/// Entry count stored in an `ActiveSet` account.
pub fn stored_active_len(data: &[u8]) -> Result<usize> {
    require!(data.len() >= ActiveSet::HEADER, ErrorCode::AccountDidNotDeserialize);
    Ok(read_len(data))
}

fn read_len(data: &[u8]) -> usize {
    let mut len = [0u8; 4];
    len.copy_from_slice(&data[LEN_AT..ActiveSet::HEADER]);
    u32::from_le_bytes(len) as usize
}

fn entry_offset(slot: usize) -> usize {
    ActiveSet::HEADER + ActiveEntry::SIZE * slot
}

impl<D: AsRef<[u8]>> ActiveEntries for ActiveSetData<D> {
    fn len(&self) -> usize {
        read_len(self.data.as_ref())
    }

    fn get(&self, slot: usize) -> Option<ActiveEntry> {
        if slot >= self.len() {
            return None;
        }
        let data = self.data.as_ref();
        let at = entry_offset(slot);
        let mut id = [0u8; 8];
        id.copy_from_slice(&data[at..at + 8]);
        let mut sender = [0u8; 32];
        sender.copy_from_slice(&data[at + 8..at + ActiveEntry::SIZE]);
        Some(ActiveEntry {
            bottle_id: u64::from_le_bytes(id),
            sender: Pubkey::new_from_array(sender),
        })
    }
}

impl<D: AsRef<[u8]> + AsMut<[u8]>> ActiveSetData<D> {
    fn set_len(&mut self, len: usize) {
        self.data.as_mut()[LEN_AT..ActiveSet::HEADER].copy_from_slice(&(len as u32).to_le_bytes());
    }
}

impl<D: AsRef<[u8]> + AsMut<[u8]>> ActiveEntriesMut for ActiveSetData<D> {
    fn set(&mut self, slot: usize, entry: ActiveEntry) {
        let at = entry_offset(slot);
        let data = self.data.as_mut();
        data[at..at + 8].copy_from_slice(&entry.bottle_id.to_le_bytes());
        data[at + 8..at + ActiveEntry::SIZE].copy_from_slice(entry.sender.as_ref());
    }

    /// The account must already be sized for one more entry.
    fn push(&mut self, entry: ActiveEntry) -> Result<()> {
        let len = self.len();
        require!(
            ActiveSet::space(len + 1) <= self.data.as_ref().len(),
            ErrorCode::AccountDidNotSerialize
        );
        self.set(len, entry);
        self.set_len(len + 1);
        Ok(())
    }

    fn pop(&mut self) -> Option<ActiveEntry> {
        let len = self.len();
        let last = self.get(len.checked_sub(1)?)?;
        self.set_len(len - 1);
        Some(last)
    }
}

// ── Bottle PDA ── seeds: ["bottle", bottle_id (u64 LE)]
#[account]
#[derive(Default, Debug, PartialEq, Eq)]
pub struct Bottle {
    pub id: u64,
    pub sender: Pubkey,
    pub content: String,
    pub created_at: i64,
    pub active: bool,
    pub reply_count: u64,
    /// Position in the active set while `active` holds.
    pub active_slot: u32,
    pub bump: u8,
}

impl Bottle {
    pub fn space(content_len: usize) -> usize {
        8 + 8 + 32 + (4 + content_len) + 8 + 1 + 8 + 4 + 1
    }

    pub fn ensure_active(&self) -> Result<()> {
        require!(self.active, BottleError::BottleInactive);
        Ok(())
    }

    /// Counts a reply and returns its position in the bottle's reply list.
    /// Threaded replies land here too.
    pub fn record_reply(&mut self) -> Result<u64> {
        let index = self.reply_count;
        self.reply_count = index.checked_add(1).ok_or(BottleError::MathOverflow)?;
        Ok(index)
    }
}

// ── Reply PDA ── seeds: ["reply", reply_id (u64 LE)]
#[account]
#[derive(Default, Debug, PartialEq, Eq)]
pub struct Reply {
    pub id: u64,
    pub bottle_id: u64,
    pub replier: Pubkey,
    pub content: String,
    pub created_at: i64,
    /// 0 for a direct reply to the bottle.
    pub parent_reply_id: u64,
    pub bump: u8,
}

impl Reply {
    pub fn space(content_len: usize) -> usize {
        8 + 8 + 8 + 32 + (4 + content_len) + 8 + 8 + 1
    }
}

// ── UserProfile PDA ── seeds: ["profile", owner]
// Lengths of the owner's bottle and reply lists. The items live in
// `ListEntry` accounts.
#[account]
#[derive(Default, Debug, PartialEq, Eq)]
pub struct UserProfile {
    pub owner: Pubkey,
    pub bottle_count: u64,
    pub reply_count: u64,
    pub bump: u8,
}

impl UserProfile {
    pub const SIZE: usize = 8 + 32 + 8 + 8 + 1;

    /// Position the next bottle takes in the owner's list.
    pub fn push_bottle(&mut self) -> Result<u64> {
        let index = self.bottle_count;
        self.bottle_count = index.checked_add(1).ok_or(BottleError::MathOverflow)?;
        Ok(index)
    }

    pub fn push_reply(&mut self) -> Result<u64> {
        let index = self.reply_count;
        self.reply_count = index.checked_add(1).ok_or(BottleError::MathOverflow)?;
        Ok(index)
    }
}

// ── ListEntry PDAs ──
//   ["user_bottle", owner, index (u64 LE)]
//   ["user_reply", owner, index (u64 LE)]
//   ["bottle_reply", bottle_id (u64 LE), index (u64 LE)]
// One account per list item, so lists grow without resizing anything.
#[account]
#[derive(Default, Debug, PartialEq, Eq)]
pub struct ListEntry {
    pub index: u64,
    pub item_id: u64,
    pub bump: u8,
}

impl ListEntry {
    pub const SIZE: usize = 8 + 8 + 8 + 1;

    pub fn fill(&mut self, index: u64, item_id: u64) {
        self.index = index;
        self.item_id = item_id;
    }
}

// ── Draft PDA ── seeds: ["draft", author]
// Content staged over several transactions. The next send or reply by the
// author that passes the draft prepends it and closes the account.
#[account]
#[derive(Default, Debug, PartialEq, Eq)]
pub struct Draft {
    pub author: Pubkey,
    pub content: String,
    pub bump: u8,
}

impl Draft {
    pub const SIZE: usize = 8 + 32 + (4 + MAX_CONTENT_BYTES) + 1;

    /// Appends a chunk and returns the staged length in bytes.
    pub fn append(&mut self, chunk: &str) -> Result<usize> {
        require!(!chunk.is_empty(), BottleError::EmptyContent);
        let staged = self
            .content
            .len()
            .checked_add(chunk.len())
            .ok_or(BottleError::MathOverflow)?;
        require!(staged <= MAX_CONTENT_BYTES, BottleError::ContentTooLong);
        self.content.push_str(chunk);
        Ok(staged)
    }
}

// ── UserBottleState PDA ── seeds: ["user_state", user, bottle_id (u64 LE)]
// One account per (user, bottle) pair. `has_replied` is the reply guard.
#[account]
#[derive(Default, Debug, PartialEq, Eq)]
pub struct UserBottleState {
    pub user: Pubkey,
    pub bottle_id: u64,
    pub has_viewed: bool,
    pub has_replied: bool,
    pub has_skipped: bool,
    pub bump: u8,
}

impl UserBottleState {
    pub const SIZE: usize = 8 + 32 + 8 + 1 + 1 + 1 + 1;

    pub fn flags(&self) -> UserBottleFlags {
        UserBottleFlags {
            has_viewed: self.has_viewed,
            has_replied: self.has_replied,
            has_skipped: self.has_skipped,
        }
    }

    pub fn mark_viewed(&mut self) {
        self.has_viewed = true;
    }

    pub fn mark_replied(&mut self) -> Result<()> {
        require!(!self.has_replied, BottleError::AlreadyReplied);
        self.has_viewed = true;
        self.has_replied = true;
        Ok(())
    }

    pub fn mark_skipped(&mut self) -> Result<()> {
        require!(!self.has_replied, BottleError::AlreadyReplied);
        require!(!self.has_skipped, BottleError::AlreadySkipped);
        self.has_viewed = true;
        self.has_skipped = true;
        Ok(())
    }
}

#[derive(AnchorSerialize, AnchorDeserialize, Clone, Copy, Default, Debug, PartialEq, Eq)]
pub struct UserBottleFlags {
    pub has_viewed: bool,
    pub has_replied: bool,
    pub has_skipped: bool,
}
