use anchor_lang::prelude::Pubkey;
use message_bottle::events::{
    BottleDeactivated, BottleReceived, BottleReplied, BottleSent, BottleSkipped,
};

use crate::error::ClientResult;
use crate::model::{BottleRecord, ReplyRecord, UserBottleFlags};

/// Events as an indexer sees them, in commit order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LedgerEvent {
    Sent(BottleSent),
    Received(BottleReceived),
    Replied(BottleReplied),
    Skipped(BottleSkipped),
    Deactivated(BottleDeactivated),
}

/// The ledger's external surface. Writes are signed by the given account
/// and report their outcome through the emitted event.
///
/// Every write travels in one transaction, so inline content is bounded by
/// the packet size. With `with_draft` set, the author's staged draft is
/// prepended to the inline content and then discarded.
#[allow(async_fn_in_trait)]
pub trait LedgerSource {
    async fn send_bottle(
        &self,
        sender: &Pubkey,
        content: &str,
        with_draft: bool,
    ) -> ClientResult<BottleSent>;

    /// Appends `chunk` to the author's draft and returns the staged length
    /// in bytes.
    async fn stage_content(&self, author: &Pubkey, chunk: &str) -> ClientResult<usize>;

    async fn discard_draft(&self, author: &Pubkey) -> ClientResult<()>;

    async fn get_random_bottle(&self, caller: &Pubkey) -> ClientResult<u64>;

    async fn open_bottle(&self, receiver: &Pubkey, bottle_id: u64) -> ClientResult<BottleReceived>;

    async fn reply_to_bottle(
        &self,
        replier: &Pubkey,
        bottle_id: u64,
        content: &str,
        with_draft: bool,
    ) -> ClientResult<BottleReplied>;

    async fn reply_to_reply(
        &self,
        replier: &Pubkey,
        reply_id: u64,
        content: &str,
        with_draft: bool,
    ) -> ClientResult<BottleReplied>;

    async fn skip_bottle(&self, skipper: &Pubkey, bottle_id: u64) -> ClientResult<BottleSkipped>;

    async fn deactivate_bottle(
        &self,
        sender: &Pubkey,
        bottle_id: u64,
    ) -> ClientResult<BottleDeactivated>;

    async fn get_bottle(&self, bottle_id: u64) -> ClientResult<BottleRecord>;

    async fn get_reply(&self, reply_id: u64) -> ClientResult<ReplyRecord>;

    async fn get_bottle_replies(&self, bottle_id: u64) -> ClientResult<Vec<u64>>;

    async fn get_user_bottles(&self, user: &Pubkey) -> ClientResult<Vec<u64>>;

    async fn get_user_replies(&self, user: &Pubkey) -> ClientResult<Vec<u64>>;

    async fn get_user_bottle_state(
        &self,
        user: &Pubkey,
        bottle_id: u64,
    ) -> ClientResult<UserBottleFlags>;

    async fn has_user_replied_to_bottle(&self, user: &Pubkey, bottle_id: u64) -> ClientResult<bool> {
        Ok(self.get_user_bottle_state(user, bottle_id).await?.has_replied)
    }

    async fn get_active_bottle_count(&self) -> ClientResult<u64>;

    async fn get_bottle_count(&self) -> ClientResult<u64>;

    async fn get_total_replies(&self) -> ClientResult<u64>;
}
