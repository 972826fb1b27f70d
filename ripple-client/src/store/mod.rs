//! Optimistic in-memory state: each store pairs a cursor-paged
//! collection with the mutations the UI issues against it, applying
//! locally first and rolling back on failure.

pub mod comments;
pub mod messages;
pub mod optimistic;
pub mod posts;
pub mod reels;

#[cfg(test)]
pub(crate) mod testutil;

pub use comments::{comment_order, CommentStore};
pub use messages::MessageStore;
pub use optimistic::{apply_with_rollback, InFlightSet, MutationOutcome};
pub use posts::PostStore;
pub use reels::ReelStore;
