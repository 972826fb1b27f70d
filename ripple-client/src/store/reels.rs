use ripple_types::{Count, Reel};
use std::sync::{Arc, Mutex};

use crate::api::{ApiClient, ApiError, ApiResult};
use crate::pager::CursorPager;
use crate::session::Session;
use crate::socket::EchoRegistry;
use crate::store::optimistic::{apply_with_rollback, lock, InFlightSet, MutationOutcome};

/// Vertical-video feed. Same optimistic toggles as the post feed, plus
/// the socket-fed view counter.
pub struct ReelStore {
    client: ApiClient,
    session: Arc<Session>,
    echoes: EchoRegistry,
    reels: Mutex<CursorPager<Reel>>,
    pending: InFlightSet,
}

impl ReelStore {
    pub fn new(client: ApiClient, session: Arc<Session>, echoes: EchoRegistry) -> Self {
        Self {
            client,
            session,
            echoes,
            reels: Mutex::new(CursorPager::new()),
            pending: InFlightSet::new(),
        }
    }

    pub async fn load_more(&self) -> ApiResult<bool> {
        let Some(cursor) = lock(&self.reels).begin_load() else {
            return Ok(false);
        };

        match self.client.get_reels(cursor.as_deref()).await {
            Ok(page) => {
                lock(&self.reels).complete(page);
                Ok(true)
            }
            Err(error) => {
                lock(&self.reels).fail();
                Err(error)
            }
        }
    }

    pub fn refresh(&self) {
        lock(&self.reels).reset();
    }

    pub fn reels(&self) -> Vec<Reel> {
        lock(&self.reels).items().to_vec()
    }

    pub fn get(&self, reel_id: &str) -> Option<Reel> {
        lock(&self.reels).get(reel_id).cloned()
    }

    fn user_id(&self) -> String {
        self.session.current_user_id().unwrap_or_default()
    }

    pub async fn toggle_like(&self, reel_id: &str) -> ApiResult<MutationOutcome> {
        let Some(_claim) = self.pending.try_claim(&format!("like:{}", reel_id)) else {
            return Ok(MutationOutcome::InFlight);
        };

        let (was_liked, prior_count) = {
            let reels = lock(&self.reels);
            let reel = reels
                .get(reel_id)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown reel: {}", reel_id)))?;
            (reel.user_liked, reel.likes_count.clone())
        };

        let _echo = self.echoes.claim(reel_id, &self.user_id());

        let id = reel_id.to_string();
        let forward = {
            let id = id.clone();
            move |reels: &mut CursorPager<Reel>| {
                if let Some(reel) = reels.get_mut(&id) {
                    reel.user_liked = !was_liked;
                    if was_liked {
                        reel.likes_count.saturating_decrement();
                    } else {
                        reel.likes_count.increment();
                    }
                }
            }
        };
        let inverse = {
            let id = id.clone();
            move |reels: &mut CursorPager<Reel>| {
                if let Some(reel) = reels.get_mut(&id) {
                    reel.user_liked = was_liked;
                    reel.likes_count = prior_count;
                }
            }
        };
        let remote = async {
            if was_liked {
                self.client.unlike_reel(&id).await
            } else {
                self.client.like_reel(&id).await
            }
        };

        apply_with_rollback(&self.reels, forward, inverse, remote).await?;
        Ok(MutationOutcome::Applied)
    }

    pub async fn toggle_save(&self, reel_id: &str) -> ApiResult<MutationOutcome> {
        let Some(_claim) = self.pending.try_claim(&format!("save:{}", reel_id)) else {
            return Ok(MutationOutcome::InFlight);
        };

        let was_saved = {
            let reels = lock(&self.reels);
            reels
                .get(reel_id)
                .map(|reel| reel.user_saved)
                .ok_or_else(|| ApiError::BadRequest(format!("unknown reel: {}", reel_id)))?
        };

        let id = reel_id.to_string();
        let set = |value: bool| {
            let id = id.clone();
            move |reels: &mut CursorPager<Reel>| {
                if let Some(reel) = reels.get_mut(&id) {
                    reel.user_saved = value;
                }
            }
        };
        let remote = async {
            if was_saved {
                self.client.unsave_reel(&id).await
            } else {
                self.client.save_reel(&id).await
            }
        };

        apply_with_rollback(&self.reels, set(!was_saved), set(was_saved), remote).await?;
        Ok(MutationOutcome::Applied)
    }

    /// Authoritative like count pushed over the socket.
    pub fn apply_like_count(&self, reel_id: &str, likes_count: Count) -> bool {
        let mut reels = lock(&self.reels);
        match reels.get_mut(reel_id) {
            Some(reel) => {
                reel.likes_count = likes_count;
                true
            }
            None => false,
        }
    }

    pub fn apply_view_count(&self, reel_id: &str, views_count: Count) {
        if let Some(reel) = lock(&self.reels).get_mut(reel_id) {
            reel.views_count = views_count;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::testutil::{
        ack_response, error_response, ok_response, page_body, reel_json, seq_client, test_session,
    };

    async fn seeded_store(responses: Vec<crate::api::HttpResponse>) -> ReelStore {
        let mut all = vec![ok_response(page_body(
            vec![reel_json("r1", "u9", "10"), reel_json("r2", "u9", "0")],
            None,
        ))];
        all.extend(responses);
        let store = ReelStore::new(seq_client(all), test_session("u1"), EchoRegistry::new());
        store.load_more().await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_like_applies_and_sticks_on_success() {
        let store = seeded_store(vec![ack_response()]).await;

        assert_eq!(
            store.toggle_like("r1").await.unwrap(),
            MutationOutcome::Applied
        );
        let reel = store.get("r1").unwrap();
        assert!(reel.user_liked);
        assert_eq!(reel.likes_count.to_string(), "11");
    }

    #[tokio::test]
    async fn test_like_rolls_back_on_failure() {
        let store = seeded_store(vec![error_response(500, "INTERNAL", "oops")]).await;

        assert!(store.toggle_like("r1").await.is_err());
        let reel = store.get("r1").unwrap();
        assert!(!reel.user_liked);
        assert_eq!(reel.likes_count.to_string(), "10");
    }

    #[tokio::test]
    async fn test_second_toggle_refused_while_pending() {
        let store = seeded_store(vec![]).await;

        let _claim = store.pending.try_claim("like:r1").unwrap();
        assert_eq!(
            store.toggle_like("r1").await.unwrap(),
            MutationOutcome::InFlight
        );
    }

    #[tokio::test]
    async fn test_view_count_applies_only_to_held_reel() {
        let store = seeded_store(vec![]).await;
        store.apply_view_count("r1", Count::new(250));
        store.apply_view_count("missing", Count::new(1));
        assert_eq!(store.get("r1").unwrap().views_count.to_string(), "250");
    }
}
