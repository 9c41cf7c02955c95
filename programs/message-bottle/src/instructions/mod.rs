pub mod deactivate_bottle;
pub mod discard_draft;
pub mod get_random_bottle;
pub mod initialize;
pub mod open_bottle;
pub mod reply_to_bottle;
pub mod reply_to_reply;
pub(crate) mod resize;
pub mod send_bottle;
pub mod skip_bottle;
pub mod stage_content;
pub mod update_config;
pub mod views;

#[allow(ambiguous_glob_reexports)]
pub use deactivate_bottle::*;
pub use discard_draft::*;
pub use get_random_bottle::*;
pub use initialize::*;
pub use open_bottle::*;
pub use reply_to_bottle::*;
pub use reply_to_reply::*;
pub use send_bottle::*;
pub use skip_bottle::*;
pub use stage_content::*;
pub use update_config::*;
pub use views::*;
