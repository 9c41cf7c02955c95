//! Plain, serializable copies of ledger records as the client sees them.

use anchor_lang::prelude::Pubkey;
use message_bottle::state::{Bottle, Reply};
use serde::{Deserialize, Serialize};

pub use message_bottle::state::UserBottleFlags;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BottleRecord {
    pub id: u64,
    #[serde(with = "pubkey_str")]
    pub sender: Pubkey,
    pub content: String,
    pub created_at: i64,
    pub active: bool,
    pub reply_count: u64,
}

impl From<&Bottle> for BottleRecord {
    fn from(bottle: &Bottle) -> Self {
        Self {
            id: bottle.id,
            sender: bottle.sender,
            content: bottle.content.clone(),
            created_at: bottle.created_at,
            active: bottle.active,
            reply_count: bottle.reply_count,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyRecord {
    pub id: u64,
    pub bottle_id: u64,
    #[serde(with = "pubkey_str")]
    pub replier: Pubkey,
    pub content: String,
    pub created_at: i64,
    pub parent_reply_id: u64,
}

impl ReplyRecord {
    pub fn is_threaded(&self) -> bool {
        self.parent_reply_id != 0
    }
}

impl From<&Reply> for ReplyRecord {
    fn from(reply: &Reply) -> Self {
        Self {
            id: reply.id,
            bottle_id: reply.bottle_id,
            replier: reply.replier,
            content: reply.content.clone(),
            created_at: reply.created_at,
            parent_reply_id: reply.parent_reply_id,
        }
    }
}

/// A bottle a user passed on without telling the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LocalSkip {
    #[serde(with = "pubkey_str")]
    pub user: Pubkey,
    pub bottle_id: u64,
}

impl LocalSkip {
    pub fn new(user: Pubkey, bottle_id: u64) -> Self {
        Self { user, bottle_id }
    }
}

/// Pubkeys travel as base58 strings in cache snapshots.
mod pubkey_str {
    use std::str::FromStr;

    use anchor_lang::prelude::Pubkey;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(key)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Pubkey::from_str(&raw).map_err(serde::de::Error::custom)
    }
}
