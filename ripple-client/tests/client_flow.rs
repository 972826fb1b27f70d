//! End-to-end flows over a scripted transport: session expiry recovery
//! under concurrency, and the optimistic mutation lifecycle as the UI
//! observes it.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use ripple_client::api::{ApiClient, ApiError, ApiResult, HttpRequest, HttpResponse, Transport};
use ripple_client::socket::EchoRegistry;
use ripple_client::store::{CommentStore, PostStore};
use ripple_client::Session;
use ripple_types::User;

fn test_session(user_id: &str) -> Arc<Session> {
    let session = Arc::new(Session::new());
    session.establish(User {
        id: user_id.to_string(),
        username: format!("user-{}", user_id),
        display_name: None,
        avatar_url: None,
        bio: None,
    });
    session
}

fn ok(body: serde_json::Value) -> HttpResponse {
    HttpResponse::new(200, body.to_string().into_bytes())
}

fn feed_page() -> serde_json::Value {
    serde_json::json!({
        "success": true,
        "data": [{
            "id": "p1",
            "author": {"id": "u9", "username": "user-u9"},
            "caption": "first",
            "media": [],
            "likesCount": "10",
            "commentsCount": "0",
            "sharesCount": "0",
            "createdAt": "2024-03-01T12:00:00Z"
        }],
        "pagination": {"hasMore": false, "nextCursor": null}
    })
}

/// Replays responses in order, regardless of route.
struct ScriptedTransport {
    responses: Mutex<Vec<HttpResponse>>,
}

impl ScriptedTransport {
    fn client(responses: Vec<HttpResponse>) -> ApiClient {
        let transport = Arc::new(ScriptedTransport {
            responses: Mutex::new(responses),
        });
        ApiClient::new("http://api.test", transport)
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: HttpRequest) -> ApiResult<HttpResponse> {
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(ApiError::Api(format!(
                "no scripted response for {}",
                request.url
            )));
        }
        Ok(responses.remove(0))
    }
}

/// Routes by path: everything 401s until `/auth/refresh` lands, which
/// itself pauses long enough for concurrent callers to pile up.
struct ExpiringSessionTransport {
    refreshed: AtomicBool,
    refresh_calls: AtomicUsize,
}

#[async_trait]
impl Transport for ExpiringSessionTransport {
    async fn send(&self, request: HttpRequest) -> ApiResult<HttpResponse> {
        if request.url.ends_with("/auth/refresh") {
            self.refresh_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.refreshed.store(true, Ordering::SeqCst);
            return Ok(ok(serde_json::json!({"success": true, "data": null})));
        }
        if !self.refreshed.load(Ordering::SeqCst) {
            return Ok(HttpResponse::new(
                401,
                serde_json::json!({"code": "TOKEN_EXPIRED", "message": "expired"})
                    .to_string()
                    .into_bytes(),
            ));
        }
        Ok(ok(feed_page()))
    }
}

#[tokio::test]
async fn test_concurrent_expiry_coalesces_to_one_refresh() {
    // Step 1: both calls hit an expired session
    let transport = Arc::new(ExpiringSessionTransport {
        refreshed: AtomicBool::new(false),
        refresh_calls: AtomicUsize::new(0),
    });
    let client = ApiClient::new("http://api.test", transport.clone());

    // Step 2: issue them concurrently; both should recover
    let (a, b) = tokio::join!(client.get_feed(None), client.get_feed(None));
    assert!(a.is_ok(), "first caller recovered: {:?}", a.err());
    assert!(b.is_ok(), "second caller recovered: {:?}", b.err());

    // Step 3: exactly one refresh went over the wire
    assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_like_lifecycle_success_and_rollback() {
    // Step 1: seed the feed
    let client = ScriptedTransport::client(vec![
        ok(feed_page()),
        ok(serde_json::json!({"success": true, "data": null})),
        HttpResponse::new(
            500,
            serde_json::json!({"code": "INTERNAL", "message": "oops"})
                .to_string()
                .into_bytes(),
        ),
    ]);
    let store = PostStore::new(client, test_session("u1"), EchoRegistry::new());
    store.load_more().await.unwrap();
    assert_eq!(store.get("p1").unwrap().likes_count.to_string(), "10");

    // Step 2: like succeeds and sticks
    store.toggle_like("p1").await.unwrap();
    let post = store.get("p1").unwrap();
    assert!(post.user_liked);
    assert_eq!(post.likes_count.to_string(), "11");

    // Step 3: unlike fails and rolls back to the liked state
    assert!(store.toggle_like("p1").await.is_err());
    let post = store.get("p1").unwrap();
    assert!(post.user_liked, "rolled back to liked");
    assert_eq!(post.likes_count.to_string(), "11");
}

#[tokio::test]
async fn test_comment_appears_instantly_then_adopts_server_id() {
    // Step 1: open an empty comment view
    let client = ScriptedTransport::client(vec![
        ok(serde_json::json!({
            "success": true,
            "data": [],
            "pagination": {"hasMore": false, "nextCursor": null}
        })),
        ok(serde_json::json!({"success": true, "data": {"commentId": "abc"}})),
    ]);
    let store = CommentStore::new(client, test_session("u1"), EchoRegistry::new(), "p1");
    store.load_more().await.unwrap();

    // Step 2: post a comment; the settled list holds it under the
    // server id with no timestamp-shaped temp id left behind
    let id = store.add_comment("first!", None).await.unwrap();
    assert_eq!(id, "abc");

    let comments = store.comments();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].id, "abc");
    assert_eq!(comments[0].text, "first!");
    assert!(comments[0].id.parse::<i64>().is_err());
}
