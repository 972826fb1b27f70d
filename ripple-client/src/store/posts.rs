use ripple_types::{Count, Post};
use std::sync::{Arc, Mutex};

use crate::api::{ApiClient, ApiError, ApiResult};
use crate::pager::CursorPager;
use crate::session::Session;
use crate::socket::EchoRegistry;
use crate::store::optimistic::{apply_with_rollback, lock, InFlightSet, MutationOutcome};

/// In-memory feed: cursor-paged posts plus the optimistic toggle
/// mutations (like, save, follow-author, delete).
///
/// Toggles apply locally before the network call and roll back to the
/// exact prior state on failure. A toggle on a post with a mutation
/// still pending is refused ([`MutationOutcome::InFlight`]).
pub struct PostStore {
    client: ApiClient,
    session: Arc<Session>,
    echoes: EchoRegistry,
    feed: Mutex<CursorPager<Post>>,
    pending: InFlightSet,
}

impl PostStore {
    pub fn new(client: ApiClient, session: Arc<Session>, echoes: EchoRegistry) -> Self {
        Self {
            client,
            session,
            echoes,
            feed: Mutex::new(CursorPager::new()),
            pending: InFlightSet::new(),
        }
    }

    /// Fetches the next feed page. Returns `Ok(false)` without issuing
    /// a request when a load is already in flight or the feed is
    /// exhausted.
    pub async fn load_more(&self) -> ApiResult<bool> {
        let Some(cursor) = lock(&self.feed).begin_load() else {
            return Ok(false);
        };

        match self.client.get_feed(cursor.as_deref()).await {
            Ok(page) => {
                log::debug!("feed page merged: {} items", page.items.len());
                lock(&self.feed).complete(page);
                Ok(true)
            }
            Err(error) => {
                lock(&self.feed).fail();
                Err(error)
            }
        }
    }

    pub fn refresh(&self) {
        lock(&self.feed).reset();
    }

    pub fn posts(&self) -> Vec<Post> {
        lock(&self.feed).items().to_vec()
    }

    pub fn get(&self, post_id: &str) -> Option<Post> {
        lock(&self.feed).get(post_id).cloned()
    }

    fn user_id(&self) -> String {
        self.session.current_user_id().unwrap_or_default()
    }

    /// Like/unlike toggle: flips `user_liked` and moves `likes_count`
    /// by one (clamped at zero) before the call; restores the exact
    /// prior values on failure.
    pub async fn toggle_like(&self, post_id: &str) -> ApiResult<MutationOutcome> {
        let Some(_claim) = self.pending.try_claim(&format!("like:{}", post_id)) else {
            log::debug!("like toggle refused, mutation pending on {}", post_id);
            return Ok(MutationOutcome::InFlight);
        };

        let (was_liked, prior_count) = {
            let feed = lock(&self.feed);
            let post = feed
                .get(post_id)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown post: {}", post_id)))?;
            (post.user_liked, post.likes_count.clone())
        };

        let _echo = self.echoes.claim(post_id, &self.user_id());

        let id = post_id.to_string();
        let forward = {
            let id = id.clone();
            move |feed: &mut CursorPager<Post>| {
                if let Some(post) = feed.get_mut(&id) {
                    post.user_liked = !was_liked;
                    if was_liked {
                        post.likes_count.saturating_decrement();
                    } else {
                        post.likes_count.increment();
                    }
                }
            }
        };
        let inverse = {
            let id = id.clone();
            move |feed: &mut CursorPager<Post>| {
                if let Some(post) = feed.get_mut(&id) {
                    post.user_liked = was_liked;
                    post.likes_count = prior_count;
                }
            }
        };
        let remote = async {
            if was_liked {
                self.client.unlike_post(&id).await
            } else {
                self.client.like_post(&id).await
            }
        };

        apply_with_rollback(&self.feed, forward, inverse, remote).await?;
        Ok(MutationOutcome::Applied)
    }

    /// Save/unsave toggle. No counter on this one, just the flag.
    pub async fn toggle_save(&self, post_id: &str) -> ApiResult<MutationOutcome> {
        let Some(_claim) = self.pending.try_claim(&format!("save:{}", post_id)) else {
            return Ok(MutationOutcome::InFlight);
        };

        let was_saved = {
            let feed = lock(&self.feed);
            feed.get(post_id)
                .map(|post| post.user_saved)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown post: {}", post_id)))?
        };

        let id = post_id.to_string();
        let set = |value: bool| {
            let id = id.clone();
            move |feed: &mut CursorPager<Post>| {
                if let Some(post) = feed.get_mut(&id) {
                    post.user_saved = value;
                }
            }
        };
        let remote = async {
            if was_saved {
                self.client.unsave_post(&id).await
            } else {
                self.client.save_post(&id).await
            }
        };

        apply_with_rollback(&self.feed, set(!was_saved), set(was_saved), remote).await?;
        Ok(MutationOutcome::Applied)
    }

    /// Follow/unfollow the author of `post_id`, updating the
    /// `following_author` flag on every held post by that author.
    pub async fn toggle_follow_author(&self, post_id: &str) -> ApiResult<MutationOutcome> {
        let (author_id, was_following) = {
            let feed = lock(&self.feed);
            let post = feed
                .get(post_id)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown post: {}", post_id)))?;
            (post.author.id.clone(), post.following_author)
        };

        let Some(_claim) = self.pending.try_claim(&format!("follow:{}", author_id)) else {
            return Ok(MutationOutcome::InFlight);
        };

        let set = |value: bool| {
            let author_id = author_id.clone();
            move |feed: &mut CursorPager<Post>| {
                for post in feed.items_mut() {
                    if post.author.id == author_id {
                        post.following_author = value;
                    }
                }
            }
        };
        let remote = async {
            if was_following {
                self.client.unfollow_user(&author_id).await
            } else {
                self.client.follow_user(&author_id).await
            }
        };

        apply_with_rollback(&self.feed, set(!was_following), set(was_following), remote).await?;
        Ok(MutationOutcome::Applied)
    }

    /// Removes the post immediately; a failed delete reinserts it at
    /// its prior position.
    pub async fn delete(&self, post_id: &str) -> ApiResult<MutationOutcome> {
        let Some(_claim) = self.pending.try_claim(&format!("delete:{}", post_id)) else {
            return Ok(MutationOutcome::InFlight);
        };

        if lock(&self.feed).get(post_id).is_none() {
            return Err(ApiError::BadRequest(format!("unknown post: {}", post_id)));
        }

        let removed: Arc<Mutex<Option<(usize, Post)>>> = Arc::new(Mutex::new(None));
        let id = post_id.to_string();
        let forward = {
            let removed = Arc::clone(&removed);
            let id = id.clone();
            move |feed: &mut CursorPager<Post>| {
                *lock(&removed) = feed.remove(&id);
            }
        };
        let inverse = {
            let removed = Arc::clone(&removed);
            move |feed: &mut CursorPager<Post>| {
                if let Some((index, post)) = lock(&removed).take() {
                    feed.insert_at(index, post);
                }
            }
        };

        apply_with_rollback(&self.feed, forward, inverse, self.client.delete_post(&id)).await?;
        Ok(MutationOutcome::Applied)
    }

    /// Authoritative like count pushed over the socket. Does not touch
    /// the viewer's own `user_liked` flag.
    pub fn apply_like_count(&self, post_id: &str, likes_count: Count) -> bool {
        let mut feed = lock(&self.feed);
        match feed.get_mut(post_id) {
            Some(post) => {
                post.likes_count = likes_count;
                true
            }
            None => false,
        }
    }

    /// A comment was added to a held post (socket-pushed).
    pub fn increment_comment_count(&self, post_id: &str) {
        if let Some(post) = lock(&self.feed).get_mut(post_id) {
            post.comments_count.increment();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testutil::{
        error_response, feed_page_body, ok_response, post_json, seq_client, test_session,
    };
    use crate::store::MutationOutcome;

    async fn seeded_store(responses: Vec<crate::api::HttpResponse>) -> PostStore {
        let mut all = vec![ok_response(feed_page_body(
            vec![
                post_json("p1", "u9", "10", false),
                post_json("p2", "u9", "0", false),
            ],
            None,
        ))];
        all.extend(responses);
        let store = PostStore::new(seq_client(all), test_session("u1"), EchoRegistry::new());
        store.load_more().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_like_applies_immediately_and_sticks_on_success() {
        let store = seeded_store(vec![ok_response(
            serde_json::json!({"success": true, "data": null}),
        )])
        .await;

        let outcome = store.toggle_like("p1").await.unwrap();
        assert_eq!(outcome, MutationOutcome::Applied);

        let post = store.get("p1").unwrap();
        assert!(post.user_liked);
        assert_eq!(post.likes_count.to_string(), "11");
    }

    #[tokio::test]
    async fn test_like_rolls_back_on_failure() {
        let store = seeded_store(vec![error_response(500, "INTERNAL", "oops")]).await;

        let result = store.toggle_like("p1").await;
        assert!(result.is_err());

        let post = store.get("p1").unwrap();
        assert!(!post.user_liked, "flag restored");
        assert_eq!(post.likes_count.to_string(), "10", "count restored");
    }

    #[tokio::test]
    async fn test_unlike_at_zero_clamps_and_rolls_back_exactly() {
        let store = seeded_store(vec![error_response(500, "INTERNAL", "oops")]).await;

        // Corrupt-ish server state: liked with a zero count
        {
            let mut feed = lock(&store.feed);
            let post = feed.get_mut("p2").unwrap();
            post.user_liked = true;
        }

        let result = store.toggle_like("p2").await;
        assert!(result.is_err());

        let post = store.get("p2").unwrap();
        assert!(post.user_liked);
        assert_eq!(
            post.likes_count.to_string(),
            "0",
            "rollback restores the prior value, not prior+1"
        );
    }

    #[tokio::test]
    async fn test_second_toggle_refused_while_first_pending() {
        let store = seeded_store(vec![]).await;

        let _claim = store.pending.try_claim("like:p1").unwrap();
        let outcome = store.toggle_like("p1").await.unwrap();
        assert_eq!(outcome, MutationOutcome::InFlight);

        let post = store.get("p1").unwrap();
        assert!(!post.user_liked, "refused toggle applies nothing");
        assert_eq!(post.likes_count.to_string(), "10");
    }

    #[tokio::test]
    async fn test_follow_author_updates_all_their_posts() {
        let store = seeded_store(vec![ok_response(
            serde_json::json!({"success": true, "data": null}),
        )])
        .await;

        store.toggle_follow_author("p1").await.unwrap();
        assert!(store.get("p1").unwrap().following_author);
        assert!(
            store.get("p2").unwrap().following_author,
            "both posts share author u9"
        );
    }

    #[tokio::test]
    async fn test_delete_failure_reinserts_at_prior_position() {
        let store = seeded_store(vec![error_response(404, "NOT_FOUND", "gone")]).await;

        assert!(store.delete("p1").await.is_err());
        let ids: Vec<String> = store.posts().iter().map(|p| p.id.clone()).collect();
        assert_eq!(ids, vec!["p1", "p2"], "post back at its old index");
    }

    #[tokio::test]
    async fn test_delete_success_removes_post() {
        let store = seeded_store(vec![ok_response(
            serde_json::json!({"success": true, "data": null}),
        )])
        .await;

        assert_eq!(
            store.delete("p1").await.unwrap(),
            MutationOutcome::Applied
        );
        assert!(store.get("p1").is_none());
    }

    #[tokio::test]
    async fn test_socket_like_count_is_authoritative() {
        let store = seeded_store(vec![]).await;
        assert!(store.apply_like_count("p1", Count::new(99)));

        let post = store.get("p1").unwrap();
        assert_eq!(post.likes_count.to_string(), "99");
        assert!(!post.user_liked, "viewer flag untouched");
    }

    #[tokio::test]
    async fn test_load_more_skipped_while_in_flight() {
        let store = seeded_store(vec![]).await;
        // Feed is exhausted after the seed page (no cursor returned)
        assert!(!store.load_more().await.unwrap());
    }
}
