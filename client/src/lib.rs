//! Off-chain companion to the `message-bottle` program: cached reads,
//! retries, re-rolled discovery, staged upload of long content and an
//! in-memory ledger for development.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod lock;
pub mod memory;
pub mod messages;
pub mod model;
pub mod retry;
pub mod source;
pub mod upload;

pub use cache::{CacheKey, ReadCache};
pub use client::{BottleClient, Discovery};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult, FailureKind, RecoveryHint};
pub use lock::{LockGuard, NamedLocks};
pub use memory::MemoryLedger;
pub use messages::{friendly_message, Locale};
pub use model::{BottleRecord, LocalSkip, ReplyRecord, UserBottleFlags};
pub use retry::RetryPolicy;
pub use source::{LedgerEvent, LedgerSource};
pub use upload::{plan_content, ContentPlan};
