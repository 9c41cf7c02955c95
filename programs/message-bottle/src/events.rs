use anchor_lang::prelude::*;

#[event]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BottleSent {
    pub bottle_id: u64,
    pub sender: Pubkey,
    pub timestamp: i64,
}

#[event]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BottleReceived {
    pub bottle_id: u64,
    pub receiver: Pubkey,
    pub timestamp: i64,
}

#[event]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BottleReplied {
    pub bottle_id: u64,
    pub reply_id: u64,
    pub parent_reply_id: u64,
    pub replier: Pubkey,
    pub timestamp: i64,
}

#[event]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BottleSkipped {
    pub bottle_id: u64,
    pub skipper: Pubkey,
    pub timestamp: i64,
}

#[event]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BottleDeactivated {
    pub bottle_id: u64,
    pub sender: Pubkey,
    pub timestamp: i64,
}
