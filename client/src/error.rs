use anchor_lang::error::Error as AnchorError;
use message_bottle::errors::BottleError;
use thiserror::Error;

pub type ClientResult<T> = std::result::Result<T, ClientError>;

#[derive(Debug, Error)]
pub enum ClientError {
    /// The ledger refused the transaction; nothing was written.
    #[error("ledger rejected the request: {0}")]
    Rejected(BottleError),

    /// The ledger refused the transaction with an error outside this program's set
    /// (framework constraint, missing account, ...).
    #[error("ledger rejected the request: {0}")]
    Program(String),

    /// The ledger could not be reached or did not answer. May be retried.
    #[error("transport failure: {0}")]
    Transport(String),

    /// The transaction would exceed the cluster's packet size. Longer
    /// content has to be staged first.
    #[error("transaction of {bytes} bytes exceeds the {limit} byte packet limit")]
    PacketTooLarge { bytes: usize, limit: usize },

    #[error("timed out waiting for lock on {key}")]
    LockTimeout { key: String },

    #[error("cache storage: {0}")]
    Storage(#[from] std::io::Error),

    #[error("cache encoding: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl From<AnchorError> for ClientError {
    fn from(err: AnchorError) -> Self {
        match BottleError::from_error(&err) {
            Some(code) => ClientError::Rejected(code),
            None => ClientError::Program(err.to_string()),
        }
    }
}

impl From<BottleError> for ClientError {
    fn from(code: BottleError) -> Self {
        ClientError::Rejected(code)
    }
}

/// Coarse classification of failures, independent of the exact reason.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureKind {
    NotFound,
    ContentInvalid,
    OwnershipViolation,
    DuplicateAction,
    InactiveTarget,
    CapacityEmpty,
    Paused,
    Unauthorized,
    Internal,
    Transport,
    LockTimeout,
    Storage,
}

/// What the user can do about a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RecoveryHint {
    Retry,
    AlreadyDone,
    EditInput,
    ChooseAnother,
    TryLater,
    Contact,
}

pub fn rejection_kind(code: BottleError) -> FailureKind {
    match code {
        BottleError::BottleNotFound | BottleError::ReplyNotFound => FailureKind::NotFound,
        BottleError::EmptyContent | BottleError::ContentTooLong => FailureKind::ContentInvalid,
        BottleError::CannotViewOwnBottle
        | BottleError::CannotReplyOwnBottle
        | BottleError::CannotReplyOwnReply
        | BottleError::CannotSkipOwnBottle
        | BottleError::NotBottleOwner => FailureKind::OwnershipViolation,
        BottleError::AlreadyReplied | BottleError::AlreadySkipped => FailureKind::DuplicateAction,
        BottleError::BottleInactive => FailureKind::InactiveTarget,
        BottleError::NoBottlesAvailable => FailureKind::CapacityEmpty,
        BottleError::LedgerPaused => FailureKind::Paused,
        BottleError::Unauthorized => FailureKind::Unauthorized,
        BottleError::ActiveIndexMismatch
        | BottleError::InvalidSlotHashes
        | BottleError::MathOverflow => FailureKind::Internal,
    }
}

impl ClientError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ClientError::Rejected(code) => rejection_kind(*code),
            ClientError::Program(_) => FailureKind::Internal,
            ClientError::PacketTooLarge { .. } => FailureKind::ContentInvalid,
            ClientError::Transport(_) => FailureKind::Transport,
            ClientError::LockTimeout { .. } => FailureKind::LockTimeout,
            ClientError::Storage(_) | ClientError::Encoding(_) | ClientError::Config(_) => {
                FailureKind::Storage
            }
        }
    }

    /// Only transport failures are worth retrying; rejections are final.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Transport(_))
    }

    pub fn is_rejection(&self) -> bool {
        matches!(self, ClientError::Rejected(_) | ClientError::Program(_))
    }

    pub fn rejection(&self) -> Option<BottleError> {
        match self {
            ClientError::Rejected(code) => Some(*code),
            _ => None,
        }
    }

    pub fn hint(&self) -> RecoveryHint {
        match self.kind() {
            FailureKind::Transport | FailureKind::LockTimeout => RecoveryHint::Retry,
            FailureKind::DuplicateAction => RecoveryHint::AlreadyDone,
            FailureKind::ContentInvalid => RecoveryHint::EditInput,
            FailureKind::NotFound
            | FailureKind::OwnershipViolation
            | FailureKind::InactiveTarget => RecoveryHint::ChooseAnother,
            FailureKind::CapacityEmpty | FailureKind::Paused => RecoveryHint::TryLater,
            FailureKind::Unauthorized | FailureKind::Internal | FailureKind::Storage => {
                RecoveryHint::Contact
            }
        }
    }
}
