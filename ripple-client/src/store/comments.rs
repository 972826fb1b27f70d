use chrono::Utc;
use ripple_types::{Comment, Count, CreateCommentRequest, EditCommentRequest};
use std::cmp::Ordering;
use std::sync::{Arc, Mutex};

use crate::api::{ApiClient, ApiError, ApiResult};
use crate::pager::CursorPager;
use crate::session::Session;
use crate::socket::EchoRegistry;
use crate::store::optimistic::{apply_with_rollback, lock, InFlightSet, MutationOutcome};

/// Composite ordering for comment lists: pinned first, then like count
/// descending (compared as arbitrary-precision integers, never as
/// strings or machine words), then creation time ascending.
pub fn comment_order(a: &Comment, b: &Comment) -> Ordering {
    b.pinned
        .cmp(&a.pinned)
        .then_with(|| b.likes_count.cmp(&a.likes_count))
        .then_with(|| a.created_at.cmp(&b.created_at))
}

/// Re-applies the composite sort to the whole tree. Every mutation
/// (add, like, edit, delete, socket insert) runs this so list order
/// stays invariant.
fn sort_comment_tree(list: &mut [Comment]) {
    list.sort_by(comment_order);
    for comment in list.iter_mut() {
        comment.replies.sort_by(comment_order);
    }
}

fn find_comment_mut<'a>(list: &'a mut [Comment], id: &str) -> Option<&'a mut Comment> {
    for comment in list.iter_mut() {
        if comment.id == id {
            return Some(comment);
        }
        if let Some(reply) = comment.replies.iter_mut().find(|r| r.id == id) {
            return Some(reply);
        }
    }
    None
}

fn find_comment<'a>(list: &'a [Comment], id: &str) -> Option<&'a Comment> {
    for comment in list {
        if comment.id == id {
            return Some(comment);
        }
        if let Some(reply) = comment.replies.iter().find(|r| r.id == id) {
            return Some(reply);
        }
    }
    None
}

/// Comments for one post: paged top-level comments carrying one level
/// of replies, kept sorted by [`comment_order`], with optimistic
/// create/like/edit/delete.
pub struct CommentStore {
    client: ApiClient,
    session: Arc<Session>,
    echoes: EchoRegistry,
    post_id: String,
    comments: Mutex<CursorPager<Comment>>,
    pending: InFlightSet,
}

impl CommentStore {
    pub fn new(
        client: ApiClient,
        session: Arc<Session>,
        echoes: EchoRegistry,
        post_id: impl Into<String>,
    ) -> Self {
        Self {
            client,
            session,
            echoes,
            post_id: post_id.into(),
            comments: Mutex::new(CursorPager::new()),
            pending: InFlightSet::new(),
        }
    }

    pub fn post_id(&self) -> &str {
        &self.post_id
    }

    pub async fn load_more(&self) -> ApiResult<bool> {
        let Some(cursor) = lock(&self.comments).begin_load() else {
            return Ok(false);
        };

        match self.client.get_comments(&self.post_id, cursor.as_deref()).await {
            Ok(page) => {
                let mut comments = lock(&self.comments);
                comments.complete(page);
                sort_comment_tree(comments.items_mut());
                Ok(true)
            }
            Err(error) => {
                lock(&self.comments).fail();
                Err(error)
            }
        }
    }

    pub fn comments(&self) -> Vec<Comment> {
        lock(&self.comments).items().to_vec()
    }

    pub fn get(&self, comment_id: &str) -> Option<Comment> {
        find_comment(lock(&self.comments).items(), comment_id).cloned()
    }

    /// Creates a comment (or a reply when `parent_comment_id` is given)
    /// optimistically under a client-generated temporary id, swapped
    /// for the server-assigned id on success and discarded on failure.
    /// Returns the authoritative id.
    ///
    /// The tree is one level deep: a reply's parent must be a top-level
    /// comment.
    pub async fn add_comment(
        &self,
        text: &str,
        parent_comment_id: Option<&str>,
    ) -> ApiResult<String> {
        let user = self
            .session
            .current_user()
            .ok_or_else(|| ApiError::BadRequest("not authenticated".to_string()))?;

        if let Some(parent_id) = parent_comment_id {
            let comments = lock(&self.comments);
            match find_comment(comments.items(), parent_id) {
                None => {
                    return Err(ApiError::BadRequest(format!(
                        "unknown parent comment: {}",
                        parent_id
                    )))
                }
                Some(parent) if parent.parent_comment_id.is_some() => {
                    return Err(ApiError::BadRequest(
                        "replies cannot be nested".to_string(),
                    ))
                }
                Some(_) => {}
            }
        }

        let temp_id = Utc::now().timestamp_millis().to_string();
        let optimistic = Comment {
            id: temp_id.clone(),
            post_id: self.post_id.clone(),
            author: user.clone(),
            text: text.to_string(),
            parent_comment_id: parent_comment_id.map(String::from),
            likes_count: Count::new(0),
            replies_count: Count::new(0),
            user_liked: false,
            edited: false,
            pinned: false,
            replies: Vec::new(),
            created_at: Utc::now(),
        };

        // Suppress the socket echo of our own new-comment event for the
        // duration of the call.
        let _echo = self.echoes.claim(&self.post_id, &user.id);

        let forward = {
            let optimistic = optimistic.clone();
            move |comments: &mut CursorPager<Comment>| {
                insert_into_tree(comments, optimistic);
            }
        };
        let inverse = {
            let temp_id = temp_id.clone();
            move |comments: &mut CursorPager<Comment>| {
                remove_from_tree(comments, &temp_id);
            }
        };
        let request = CreateCommentRequest {
            text: text.to_string(),
            parent_comment_id: parent_comment_id.map(String::from),
        };
        let remote = self.client.create_comment(&self.post_id, &request);

        let response = apply_with_rollback(&self.comments, forward, inverse, remote).await?;

        let mut comments = lock(&self.comments);
        if let Some(comment) = find_comment_mut(comments.items_mut(), &temp_id) {
            log::debug!(
                "comment {} confirmed as {}",
                temp_id,
                response.comment_id
            );
            comment.id = response.comment_id.clone();
        }
        comments.mark_seen(&response.comment_id);
        sort_comment_tree(comments.items_mut());
        Ok(response.comment_id)
    }

    /// Like/unlike toggle on a comment or reply.
    pub async fn toggle_like(&self, comment_id: &str) -> ApiResult<MutationOutcome> {
        let Some(_claim) = self.pending.try_claim(&format!("like:{}", comment_id)) else {
            return Ok(MutationOutcome::InFlight);
        };

        let (was_liked, prior_count) = {
            let comments = lock(&self.comments);
            let comment = find_comment(comments.items(), comment_id).ok_or_else(|| {
                ApiError::BadRequest(format!("unknown comment: {}", comment_id))
            })?;
            (comment.user_liked, comment.likes_count.clone())
        };

        let _echo = self
            .echoes
            .claim(comment_id, &self.session.current_user_id().unwrap_or_default());

        let id = comment_id.to_string();
        let forward = {
            let id = id.clone();
            move |comments: &mut CursorPager<Comment>| {
                if let Some(comment) = find_comment_mut(comments.items_mut(), &id) {
                    comment.user_liked = !was_liked;
                    if was_liked {
                        comment.likes_count.saturating_decrement();
                    } else {
                        comment.likes_count.increment();
                    }
                }
                sort_comment_tree(comments.items_mut());
            }
        };
        let inverse = {
            let id = id.clone();
            move |comments: &mut CursorPager<Comment>| {
                if let Some(comment) = find_comment_mut(comments.items_mut(), &id) {
                    comment.user_liked = was_liked;
                    comment.likes_count = prior_count;
                }
                sort_comment_tree(comments.items_mut());
            }
        };
        let remote = async {
            if was_liked {
                self.client.unlike_comment(&id).await
            } else {
                self.client.like_comment(&id).await
            }
        };

        apply_with_rollback(&self.comments, forward, inverse, remote).await?;
        Ok(MutationOutcome::Applied)
    }

    /// Edits the text, setting the edited flag; both restored on
    /// failure.
    pub async fn edit_comment(&self, comment_id: &str, text: &str) -> ApiResult<MutationOutcome> {
        let Some(_claim) = self.pending.try_claim(&format!("edit:{}", comment_id)) else {
            return Ok(MutationOutcome::InFlight);
        };

        let (prior_text, was_edited) = {
            let comments = lock(&self.comments);
            let comment = find_comment(comments.items(), comment_id).ok_or_else(|| {
                ApiError::BadRequest(format!("unknown comment: {}", comment_id))
            })?;
            (comment.text.clone(), comment.edited)
        };

        let id = comment_id.to_string();
        let new_text = text.to_string();
        let forward = {
            let id = id.clone();
            move |comments: &mut CursorPager<Comment>| {
                if let Some(comment) = find_comment_mut(comments.items_mut(), &id) {
                    comment.text = new_text;
                    comment.edited = true;
                }
                sort_comment_tree(comments.items_mut());
            }
        };
        let inverse = {
            let id = id.clone();
            move |comments: &mut CursorPager<Comment>| {
                if let Some(comment) = find_comment_mut(comments.items_mut(), &id) {
                    comment.text = prior_text;
                    comment.edited = was_edited;
                }
                sort_comment_tree(comments.items_mut());
            }
        };
        let request = EditCommentRequest {
            text: text.to_string(),
        };
        let remote = self.client.edit_comment(&id, &request);

        apply_with_rollback(&self.comments, forward, inverse, remote).await?;
        Ok(MutationOutcome::Applied)
    }

    /// Removes a comment (with its replies) or a single reply; a failed
    /// delete reinserts it.
    pub async fn delete_comment(&self, comment_id: &str) -> ApiResult<MutationOutcome> {
        let Some(_claim) = self.pending.try_claim(&format!("delete:{}", comment_id)) else {
            return Ok(MutationOutcome::InFlight);
        };

        if self.get(comment_id).is_none() {
            return Err(ApiError::BadRequest(format!(
                "unknown comment: {}",
                comment_id
            )));
        }

        let removed: Arc<Mutex<Option<Comment>>> = Arc::new(Mutex::new(None));
        let id = comment_id.to_string();
        let forward = {
            let removed = Arc::clone(&removed);
            let id = id.clone();
            move |comments: &mut CursorPager<Comment>| {
                *lock(&removed) = remove_from_tree(comments, &id);
            }
        };
        let inverse = {
            let removed = Arc::clone(&removed);
            move |comments: &mut CursorPager<Comment>| {
                if let Some(comment) = lock(&removed).take() {
                    insert_into_tree(comments, comment);
                }
            }
        };

        apply_with_rollback(
            &self.comments,
            forward,
            inverse,
            self.client.delete_comment(&id),
        )
        .await?;
        Ok(MutationOutcome::Applied)
    }

    /// Inserts a server-pushed comment (socket event) unless it is
    /// already held. Echo suppression happens in the reconciler before
    /// this is called. Returns whether the comment actually entered the
    /// tree: a duplicate, or a reply whose parent is not held, does not.
    pub fn apply_server_comment(&self, comment: Comment) -> bool {
        let mut comments = lock(&self.comments);
        if find_comment(comments.items(), &comment.id).is_some() {
            return false;
        }
        insert_into_tree(&mut comments, comment)
    }

    /// Authoritative like count pushed over the socket.
    pub fn apply_like_count(&self, comment_id: &str, likes_count: Count) -> bool {
        let mut comments = lock(&self.comments);
        let found = match find_comment_mut(comments.items_mut(), comment_id) {
            Some(comment) => {
                comment.likes_count = likes_count;
                true
            }
            None => false,
        };
        if found {
            sort_comment_tree(comments.items_mut());
        }
        found
    }
}

/// Places a comment in the tree, returning whether it landed. A reply
/// whose parent is not held is dropped.
fn insert_into_tree(comments: &mut CursorPager<Comment>, comment: Comment) -> bool {
    match comment.parent_comment_id.clone() {
        Some(parent_id) => {
            let Some(parent) = comments.items_mut().iter_mut().find(|c| c.id == parent_id) else {
                log::warn!(
                    "dropping reply {} to unknown parent {}",
                    comment.id,
                    parent_id
                );
                return false;
            };
            parent.replies.push(comment);
            parent.replies_count.increment();
        }
        None => {
            let index = comments.len();
            comments.insert_at(index, comment);
        }
    }
    sort_comment_tree(comments.items_mut());
    true
}

fn remove_from_tree(comments: &mut CursorPager<Comment>, comment_id: &str) -> Option<Comment> {
    if let Some((_, comment)) = comments.remove(comment_id) {
        sort_comment_tree(comments.items_mut());
        return Some(comment);
    }
    for parent in comments.items_mut().iter_mut() {
        if let Some(index) = parent.replies.iter().position(|r| r.id == comment_id) {
            let reply = parent.replies.remove(index);
            parent.replies_count.saturating_decrement();
            return Some(reply);
        }
    }
    None
}

/// True when no two adjacent elements violate [`comment_order`].
#[cfg(test)]
pub(crate) fn is_ordered(list: &[Comment]) -> bool {
    list.windows(2)
        .all(|pair| comment_order(&pair[0], &pair[1]) != Ordering::Greater)
}
