//! Shared helpers for store tests: a scripted transport plus wire-shaped
//! JSON builders.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::api::{ApiClient, ApiError, ApiResult, HttpRequest, HttpResponse, Transport};
use crate::session::Session;
use ripple_types::User;

/// Replays scripted responses in order; runs dry with an error.
pub(crate) struct SeqTransport {
    responses: Mutex<VecDeque<HttpResponse>>,
}

#[async_trait]
impl Transport for SeqTransport {
    async fn send(&self, request: HttpRequest) -> ApiResult<HttpResponse> {
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| ApiError::Api(format!("no scripted response for {}", request.url)))
    }
}

pub(crate) fn seq_client(responses: Vec<HttpResponse>) -> ApiClient {
    let transport = Arc::new(SeqTransport {
        responses: Mutex::new(responses.into()),
    });
    ApiClient::new("http://api.test", transport)
}

pub(crate) fn test_session(user_id: &str) -> Arc<Session> {
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

pub(crate) fn ok_response(body: serde_json::Value) -> HttpResponse {
    HttpResponse::new(200, body.to_string().into_bytes())
}

pub(crate) fn error_response(status: u16, code: &str, message: &str) -> HttpResponse {
    HttpResponse::new(
        status,
        serde_json::json!({"code": code, "message": message})
            .to_string()
            .into_bytes(),
    )
}

/// Success envelope for a unit-result endpoint.
pub(crate) fn ack_response() -> HttpResponse {
    ok_response(serde_json::json!({"success": true, "data": null}))
}

pub(crate) fn page_body(items: Vec<serde_json::Value>, cursor: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "success": true,
        "data": items,
        "pagination": {"hasMore": cursor.is_some(), "nextCursor": cursor}
    })
}

pub(crate) fn feed_page_body(
    items: Vec<serde_json::Value>,
    cursor: Option<&str>,
) -> serde_json::Value {
    page_body(items, cursor)
}

pub(crate) fn post_json(
    id: &str,
    author_id: &str,
    likes_count: &str,
    user_liked: bool,
) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "author": {"id": author_id, "username": format!("user-{}", author_id)},
        "caption": format!("post {}", id),
        "media": [],
        "likesCount": likes_count,
        "commentsCount": "0",
        "sharesCount": "0",
        "userLiked": user_liked,
        "createdAt": "2024-03-01T12:00:00Z"
    })
}

pub(crate) fn reel_json(id: &str, author_id: &str, likes_count: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "author": {"id": author_id, "username": format!("user-{}", author_id)},
        "caption": "",
        "media": {"url": format!("https://cdn.test/{}.mp4", id), "kind": "video"},
        "likesCount": likes_count,
        "commentsCount": "0",
        "sharesCount": "0",
        "viewsCount": "100",
        "createdAt": "2024-03-01T12:00:00Z"
    })
}

pub(crate) fn comment_json(
    id: &str,
    post_id: &str,
    author_id: &str,
    likes_count: &str,
    pinned: bool,
    created_at: &str,
) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "postId": post_id,
        "author": {"id": author_id, "username": format!("user-{}", author_id)},
        "text": format!("comment {}", id),
        "likesCount": likes_count,
        "repliesCount": "0",
        "pinned": pinned,
        "createdAt": created_at
    })
}

pub(crate) fn message_json(
    id: &str,
    conversation_id: &str,
    sender_id: &str,
    created_at: &str,
) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "conversationId": conversation_id,
        "senderId": sender_id,
        "text": format!("message {}", id),
        "delivered": true,
        "createdAt": created_at
    })
}

pub(crate) fn conversation_json(id: &str, participant_ids: &[&str]) -> serde_json::Value {
    let participants: Vec<serde_json::Value> = participant_ids
        .iter()
        .map(|uid| serde_json::json!({"id": uid, "username": format!("user-{}", uid)}))
        .collect();
    serde_json::json!({
        "id": id,
        "participants": participants,
        "unreadCount": 2
    })
}
