use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use crate::socket::events::ServerEvent;
use crate::store::optimistic::lock;
use crate::store::{CommentStore, MessageStore, PostStore, ReelStore};

/// Pending local mutations keyed by (entity id, acting user id).
///
/// A store claims an entry for the duration of its own network call;
/// the reconciler consults it to drop the socket echo of that same
/// action, which would otherwise double-apply on top of the optimistic
/// update. Clones share the underlying set.
#[derive(Debug, Default, Clone)]
pub struct EchoRegistry {
    inner: Arc<Mutex<HashSet<(String, String)>>>,
}

impl EchoRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an action as locally pending until the claim drops.
    pub fn claim(&self, entity_id: &str, user_id: &str) -> EchoClaim {
        lock(&self.inner).insert((entity_id.to_string(), user_id.to_string()));
        EchoClaim {
            set: Arc::clone(&self.inner),
            key: (entity_id.to_string(), user_id.to_string()),
        }
    }

    pub fn is_pending(&self, entity_id: &str, user_id: &str) -> bool {
        lock(&self.inner).contains(&(entity_id.to_string(), user_id.to_string()))
    }
}

pub struct EchoClaim {
    set: Arc<Mutex<HashSet<(String, String)>>>,
    key: (String, String),
}

impl Drop for EchoClaim {
    fn drop(&mut self) {
        lock(&self.set).remove(&self.key);
    }
}

/// Routes server-pushed events into the stores.
///
/// Events carrying a user id are checked against the [`EchoRegistry`]
/// first: an event echoing the viewer's own in-flight action is
/// dropped, because the optimistic update already holds that state and
/// the REST response settles it.
pub struct Reconciler {
    posts: Arc<PostStore>,
    reels: Arc<ReelStore>,
    messages: Arc<MessageStore>,
    comments: Mutex<HashMap<String, Arc<CommentStore>>>,
    echoes: EchoRegistry,
}

impl Reconciler {
    pub fn new(
        posts: Arc<PostStore>,
        reels: Arc<ReelStore>,
        messages: Arc<MessageStore>,
        echoes: EchoRegistry,
    ) -> Self {
        Self {
            posts,
            reels,
            messages,
            comments: Mutex::new(HashMap::new()),
            echoes,
        }
    }

    /// Starts routing comment events for an open post. Call when the
    /// comment view opens, alongside the join-room socket message.
    pub fn register_comments(&self, store: Arc<CommentStore>) {
        lock(&self.comments).insert(store.post_id().to_string(), store);
    }

    pub fn unregister_comments(&self, post_id: &str) {
        lock(&self.comments).remove(post_id);
    }

    pub fn apply(&self, event: ServerEvent) {
        match event {
            ServerEvent::NewComment {
                post_id,
                user_id,
                comment,
            } => {
                if self.echoes.is_pending(&post_id, &user_id) {
                    log::debug!("dropping comment echo on post {}", post_id);
                    return;
                }
                let inserted = lock(&self.comments)
                    .get(&post_id)
                    .map(|store| store.apply_server_comment(comment))
                    .unwrap_or(false);
                if inserted {
                    self.posts.increment_comment_count(&post_id);
                }
            }
            ServerEvent::LikeCountChanged {
                entity_id,
                user_id,
                likes_count,
            } => {
                if self.echoes.is_pending(&entity_id, &user_id) {
                    log::debug!("dropping like-count echo on {}", entity_id);
                    return;
                }
                // The id namespace is shared; at most one store holds it
                if self.posts.apply_like_count(&entity_id, likes_count.clone()) {
                    return;
                }
                if self.reels.apply_like_count(&entity_id, likes_count.clone()) {
                    return;
                }
                for store in lock(&self.comments).values() {
                    if store.apply_like_count(&entity_id, likes_count.clone()) {
                        return;
                    }
                }
                log::debug!("like-count event for unheld entity {}", entity_id);
            }
            ServerEvent::ViewCountChanged {
                reel_id,
                views_count,
            } => {
                self.reels.apply_view_count(&reel_id, views_count);
            }
            ServerEvent::Typing {
                conversation_id,
                user_id,
                typing,
            } => {
                self.messages
                    .apply_typing(&conversation_id, &user_id, typing);
            }
            ServerEvent::MessageDelivered {
                conversation_id,
                message_id,
            } => {
                self.messages.apply_delivered(&conversation_id, &message_id);
            }
            ServerEvent::MessageRead {
                conversation_id,
                message_id,
                user_id: _,
            } => {
                self.messages.apply_read(&conversation_id, &message_id);
            }
            ServerEvent::MessageDeleted {
                conversation_id,
                message_id,
            } => {
                self.messages.apply_deleted(&conversation_id, &message_id);
            }
        }
    }
}
