//! Human-readable text for every failure the client can surface.

use message_bottle::errors::BottleError;
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, RecoveryHint};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Zh,
}

fn rejection_text(code: BottleError, locale: Locale) -> &'static str {
    use BottleError::*;
    match locale {
        Locale::En => match code {
            BottleNotFound => "That bottle has drifted away and can't be found.",
            ReplyNotFound => "That reply can't be found.",
            EmptyContent => "Write something before sending.",
            ContentTooLong => "Messages are limited to 1000 characters.",
            CannotViewOwnBottle => "You fished up your own bottle. Try again!",
            CannotReplyOwnBottle => "You can't reply to your own bottle.",
            CannotReplyOwnReply => "You can't reply to your own reply.",
            CannotSkipOwnBottle => "You can't skip your own bottle.",
            NotBottleOwner => "Only the sender can take this bottle out of the sea.",
            AlreadyReplied => "You already replied to this bottle.",
            AlreadySkipped => "You already passed on this bottle.",
            BottleInactive => "This bottle is no longer floating.",
            NoBottlesAvailable => "The sea is empty right now. Check back later.",
            Unauthorized => "You are not allowed to change the settings.",
            LedgerPaused => "Sending is paused for maintenance.",
            ActiveIndexMismatch | InvalidSlotHashes | MathOverflow => {
                "Something went wrong on the ledger. Please try again."
            }
        },
        Locale::Zh => match code {
            BottleNotFound => "这个漂流瓶已经漂走了，找不到了。",
            ReplyNotFound => "找不到这条回复。",
            EmptyContent => "请先写点什么再发送。",
            ContentTooLong => "内容不能超过 1000 个字符。",
            CannotViewOwnBottle => "你捞到了自己的漂流瓶，再试一次吧！",
            CannotReplyOwnBottle => "不能回复自己的漂流瓶。",
            CannotReplyOwnReply => "不能回复自己的回复。",
            CannotSkipOwnBottle => "不能跳过自己的漂流瓶。",
            NotBottleOwner => "只有发送者可以收回这个漂流瓶。",
            AlreadyReplied => "你已经回复过这个漂流瓶了。",
            AlreadySkipped => "你已经跳过这个漂流瓶了。",
            BottleInactive => "这个漂流瓶已不在海上。",
            NoBottlesAvailable => "海里暂时没有漂流瓶，稍后再来看看。",
            Unauthorized => "你没有权限修改设置。",
            LedgerPaused => "发送功能维护中，请稍后再试。",
            ActiveIndexMismatch | InvalidSlotHashes | MathOverflow => {
                "链上处理出错，请重试。"
            }
        },
    }
}

fn hint_text(hint: RecoveryHint, locale: Locale) -> &'static str {
    match (locale, hint) {
        (Locale::En, RecoveryHint::Retry) => "Check your connection and retry.",
        (Locale::En, RecoveryHint::AlreadyDone) => "No need to do it again.",
        (Locale::En, RecoveryHint::EditInput) => "Edit your message and send again.",
        (Locale::En, RecoveryHint::ChooseAnother) => "Pick another bottle.",
        (Locale::En, RecoveryHint::TryLater) => "Try again in a little while.",
        (Locale::En, RecoveryHint::Contact) => "If this keeps happening, contact support.",
        (Locale::Zh, RecoveryHint::Retry) => "请检查网络后重试。",
        (Locale::Zh, RecoveryHint::AlreadyDone) => "无需重复操作。",
        (Locale::Zh, RecoveryHint::EditInput) => "请修改内容后重新发送。",
        (Locale::Zh, RecoveryHint::ChooseAnother) => "换一个漂流瓶吧。",
        (Locale::Zh, RecoveryHint::TryLater) => "请稍后再试。",
        (Locale::Zh, RecoveryHint::Contact) => "如果问题持续，请联系客服。",
    }
}

/// Localized message for `err`, followed by what the user can do about it.
pub fn friendly_message(err: &ClientError, locale: Locale) -> String {
    let headline = match err {
        ClientError::Rejected(code) => rejection_text(*code, locale),
        ClientError::Program(_) => match locale {
            Locale::En => "The ledger refused the request.",
            Locale::Zh => "链上拒绝了该请求。",
        },
        ClientError::PacketTooLarge { .. } => match locale {
            Locale::En => "This message is too large to send in one go.",
            Locale::Zh => "这条消息太大，无法一次发送。",
        },
        ClientError::Transport(_) => match locale {
            Locale::En => "Couldn't reach the network.",
            Locale::Zh => "无法连接网络。",
        },
        ClientError::LockTimeout { .. } => match locale {
            Locale::En => "Still loading, the data is busy.",
            Locale::Zh => "数据正忙，仍在加载。",
        },
        ClientError::Storage(_) | ClientError::Encoding(_) | ClientError::Config(_) => {
            match locale {
                Locale::En => "Local storage is unavailable.",
                Locale::Zh => "本地存储不可用。",
            }
        }
    };
    format!("{headline} {}", hint_text(err.hint(), locale))
}
