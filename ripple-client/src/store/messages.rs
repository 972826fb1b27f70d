use chrono::Utc;
use ripple_types::{Conversation, Message, SendMessageRequest};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

use crate::api::{ApiClient, ApiError, ApiResult};
use crate::pager::CursorPager;
use crate::session::Session;
use crate::socket::EchoRegistry;
use crate::store::optimistic::{apply_with_rollback, lock, InFlightSet, MutationOutcome};

/// Direct messages: the paged conversation list plus one paged message
/// thread per open conversation.
///
/// Sends are optimistic under a client-generated uuid, swapped for the
/// server id on success. Delivery, read, and deletion state arrive over
/// the socket and are applied as authoritative.
pub struct MessageStore {
    client: ApiClient,
    session: Arc<Session>,
    echoes: EchoRegistry,
    conversations: Mutex<CursorPager<Conversation>>,
    threads: Mutex<HashMap<String, CursorPager<Message>>>,
    typing: Mutex<HashMap<String, HashSet<String>>>,
    pending: InFlightSet,
}

impl MessageStore {
    pub fn new(client: ApiClient, session: Arc<Session>, echoes: EchoRegistry) -> Self {
        Self {
            client,
            session,
            echoes,
            conversations: Mutex::new(CursorPager::new()),
            threads: Mutex::new(HashMap::new()),
            typing: Mutex::new(HashMap::new()),
            pending: InFlightSet::new(),
        }
    }

    fn user_id(&self) -> String {
        self.session.current_user_id().unwrap_or_default()
    }

    pub async fn load_conversations(&self) -> ApiResult<bool> {
        let Some(cursor) = lock(&self.conversations).begin_load() else {
            return Ok(false);
        };

        match self.client.get_conversations(cursor.as_deref()).await {
            Ok(page) => {
                lock(&self.conversations).complete(page);
                Ok(true)
            }
            Err(error) => {
                lock(&self.conversations).fail();
                Err(error)
            }
        }
    }

    pub fn conversations(&self) -> Vec<Conversation> {
        lock(&self.conversations).items().to_vec()
    }

    pub fn conversation(&self, conversation_id: &str) -> Option<Conversation> {
        lock(&self.conversations).get(conversation_id).cloned()
    }

    /// Fetches the next page of a conversation's thread, creating the
    /// thread pager on first use.
    pub async fn load_messages(&self, conversation_id: &str) -> ApiResult<bool> {
        let cursor = {
            let mut threads = lock(&self.threads);
            let thread = threads.entry(conversation_id.to_string()).or_default();
            match thread.begin_load() {
                Some(cursor) => cursor,
                None => return Ok(false),
            }
        };

        match self
            .client
            .get_messages(conversation_id, cursor.as_deref())
            .await
        {
            Ok(page) => {
                let mut threads = lock(&self.threads);
                if let Some(thread) = threads.get_mut(conversation_id) {
                    thread.complete(page);
                }
                Ok(true)
            }
            Err(error) => {
                let mut threads = lock(&self.threads);
                if let Some(thread) = threads.get_mut(conversation_id) {
                    thread.fail();
                }
                Err(error)
            }
        }
    }

    pub fn messages(&self, conversation_id: &str) -> Vec<Message> {
        lock(&self.threads)
            .get(conversation_id)
            .map(|thread| thread.items().to_vec())
            .unwrap_or_default()
    }

    /// Sends a message optimistically. The local copy appears at once
    /// under a uuid, marked undelivered; on success the id is swapped
    /// for the server's, on failure the copy is removed. Returns the
    /// authoritative id.
    pub async fn send_message(&self, conversation_id: &str, text: &str) -> ApiResult<String> {
        let sender_id = self.session.current_user_id().ok_or_else(|| {
            ApiError::BadRequest("not authenticated".to_string())
        })?;

        let temp_id = Uuid::new_v4().to_string();
        let optimistic = Message {
            id: temp_id.clone(),
            conversation_id: conversation_id.to_string(),
            sender_id: sender_id.clone(),
            text: text.to_string(),
            delivered: false,
            read: false,
            created_at: Utc::now(),
        };

        let _echo = self.echoes.claim(conversation_id, &sender_id);

        let conversation = conversation_id.to_string();
        let forward = {
            let conversation = conversation.clone();
            let optimistic = optimistic.clone();
            move |threads: &mut HashMap<String, CursorPager<Message>>| {
                let thread = threads.entry(conversation).or_default();
                let index = thread.len();
                thread.insert_at(index, optimistic);
            }
        };
        let inverse = {
            let conversation = conversation.clone();
            let temp_id = temp_id.clone();
            move |threads: &mut HashMap<String, CursorPager<Message>>| {
                if let Some(thread) = threads.get_mut(&conversation) {
                    thread.remove(&temp_id);
                }
            }
        };
        let request = SendMessageRequest {
            text: text.to_string(),
        };
        let remote = self.client.send_message(conversation_id, &request);

        let response = apply_with_rollback(&self.threads, forward, inverse, remote).await?;

        let mut threads = lock(&self.threads);
        if let Some(thread) = threads.get_mut(conversation_id) {
            if let Some(message) = thread.get_mut(&temp_id) {
                log::debug!("message {} confirmed as {}", temp_id, response.message_id);
                message.id = response.message_id.clone();
                message.delivered = true;
            }
            thread.mark_seen(&response.message_id);
        }
        Ok(response.message_id)
    }

    /// Zeroes the conversation's unread counter locally and tells the
    /// backend; the counter is restored if the call fails.
    pub async fn mark_read(&self, conversation_id: &str) -> ApiResult<MutationOutcome> {
        let Some(_claim) = self.pending.try_claim(&format!("read:{}", conversation_id)) else {
            return Ok(MutationOutcome::InFlight);
        };

        let prior_unread = {
            let conversations = lock(&self.conversations);
            conversations
                .get(conversation_id)
                .map(|c| c.unread_count)
                .ok_or_else(|| {
                    ApiError::BadRequest(format!("unknown conversation: {}", conversation_id))
                })?
        };
        if prior_unread == 0 {
            return Ok(MutationOutcome::Applied);
        }

        let id = conversation_id.to_string();
        let set = |value: u32| {
            let id = id.clone();
            move |conversations: &mut CursorPager<Conversation>| {
                if let Some(conversation) = conversations.get_mut(&id) {
                    conversation.unread_count = value;
                }
            }
        };
        let remote = self.client.mark_conversation_read(&id);

        apply_with_rollback(&self.conversations, set(0), set(prior_unread), remote).await?;
        Ok(MutationOutcome::Applied)
    }

    /// Removes a message immediately; a failed delete reinserts it.
    pub async fn delete_message(
        &self,
        conversation_id: &str,
        message_id: &str,
    ) -> ApiResult<MutationOutcome> {
        let Some(_claim) = self.pending.try_claim(&format!("delete:{}", message_id)) else {
            return Ok(MutationOutcome::InFlight);
        };

        let held = lock(&self.threads)
            .get(conversation_id)
            .and_then(|thread| thread.get(message_id).cloned())
            .is_some();
        if !held {
            return Err(ApiError::BadRequest(format!(
                "unknown message: {}",
                message_id
            )));
        }

        let removed: Arc<Mutex<Option<(usize, Message)>>> = Arc::new(Mutex::new(None));
        let conversation = conversation_id.to_string();
        let id = message_id.to_string();
        let forward = {
            let removed = Arc::clone(&removed);
            let conversation = conversation.clone();
            let id = id.clone();
            move |threads: &mut HashMap<String, CursorPager<Message>>| {
                if let Some(thread) = threads.get_mut(&conversation) {
                    *lock(&removed) = thread.remove(&id);
                }
            }
        };
        let inverse = {
            let removed = Arc::clone(&removed);
            let conversation = conversation.clone();
            move |threads: &mut HashMap<String, CursorPager<Message>>| {
                if let Some((index, message)) = lock(&removed).take() {
                    if let Some(thread) = threads.get_mut(&conversation) {
                        thread.insert_at(index, message);
                    }
                }
            }
        };

        apply_with_rollback(
            &self.threads,
            forward,
            inverse,
            self.client.delete_message(&id),
        )
        .await?;
        Ok(MutationOutcome::Applied)
    }

    pub fn typing_users(&self, conversation_id: &str) -> Vec<String> {
        lock(&self.typing)
            .get(conversation_id)
            .map(|users| users.iter().cloned().collect())
            .unwrap_or_default()
    }

    // --- socket-fed state ---

    pub fn apply_typing(&self, conversation_id: &str, user_id: &str, typing: bool) {
        // Our own typing indicator never renders locally
        if user_id == self.user_id() {
            return;
        }
        let mut map = lock(&self.typing);
        let users = map.entry(conversation_id.to_string()).or_default();
        if typing {
            users.insert(user_id.to_string());
        } else {
            users.remove(user_id);
        }
    }

    pub fn apply_delivered(&self, conversation_id: &str, message_id: &str) {
        if let Some(thread) = lock(&self.threads).get_mut(conversation_id) {
            if let Some(message) = thread.get_mut(message_id) {
                message.delivered = true;
            }
        }
    }

    pub fn apply_read(&self, conversation_id: &str, message_id: &str) {
        if let Some(thread) = lock(&self.threads).get_mut(conversation_id) {
            if let Some(message) = thread.get_mut(message_id) {
                message.delivered = true;
                message.read = true;
            }
        }
    }

    /// A message was deleted elsewhere; authoritative, no rollback.
    pub fn apply_deleted(&self, conversation_id: &str, message_id: &str) {
        if let Some(thread) = lock(&self.threads).get_mut(conversation_id) {
            thread.remove(message_id);
        }
    }
}
