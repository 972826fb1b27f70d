use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::count::Count;
use crate::enums::{MediaKind, NotificationKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

/// Full profile view, including the viewer's relationship to the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
    pub followers_count: Count,
    pub following_count: Count,
    pub posts_count: Count,
    #[serde(default)]
    pub following: bool,
    #[serde(default)]
    pub follows_you: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaDescriptor {
    pub url: String,
    pub kind: MediaKind,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default)]
    pub duration_secs: Option<f64>,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
}

/// A feed post.
///
/// Engagement counters arrive as decimal strings (see [`Count`]); the
/// `user_*` / `following_author` booleans are the viewer's relationship
/// to the post and are the fields optimistic mutations toggle.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub author: User,
    pub caption: String,
    #[serde(default)]
    pub media: Vec<MediaDescriptor>,
    pub likes_count: Count,
    pub comments_count: Count,
    pub shares_count: Count,
    #[serde(default)]
    pub user_liked: bool,
    #[serde(default)]
    pub user_saved: bool,
    #[serde(default)]
    pub following_author: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reel {
    pub id: String,
    pub author: User,
    #[serde(default)]
    pub caption: String,
    pub media: MediaDescriptor,
    pub likes_count: Count,
    pub comments_count: Count,
    pub shares_count: Count,
    pub views_count: Count,
    #[serde(default)]
    pub user_liked: bool,
    #[serde(default)]
    pub user_saved: bool,
    #[serde(default)]
    pub following_author: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    pub id: String,
    pub author: User,
    pub media: MediaDescriptor,
    #[serde(default)]
    pub viewed: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A comment, optionally carrying one level of replies.
///
/// The model caps reply depth at one: a reply's `parent_comment_id`
/// always names a top-level comment, and its own `replies` list is
/// empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub author: User,
    pub text: String,
    #[serde(default)]
    pub parent_comment_id: Option<String>,
    pub likes_count: Count,
    #[serde(default)]
    pub replies_count: Count,
    #[serde(default)]
    pub user_liked: bool,
    #[serde(default)]
    pub edited: bool,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub replies: Vec<Comment>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Conversation {
    pub id: String,
    pub participants: Vec<User>,
    #[serde(default)]
    pub last_message: Option<Message>,
    #[serde(default)]
    pub unread_count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub sender_id: String,
    pub text: String,
    #[serde(default)]
    pub delivered: bool,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: String,
    pub kind: NotificationKind,
    pub actor: User,
    #[serde(default)]
    pub entity_id: Option<String>,
    #[serde(default)]
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

// Request/Response types for the API

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePostRequest {
    pub caption: String,
    #[serde(default)]
    pub media: Vec<MediaDescriptor>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentRequest {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_comment_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCommentResponse {
    pub comment_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditCommentRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub message_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_wire_format() {
        let json = r#"{
            "id": "p1",
            "author": {"id": "u1", "username": "ada"},
            "caption": "first light",
            "media": [{"url": "https://cdn.example/p1.jpg", "kind": "image"}],
            "likesCount": "18446744073709551616",
            "commentsCount": "3",
            "sharesCount": "0",
            "userLiked": true,
            "createdAt": "2024-03-01T12:00:00Z"
        }"#;
        let post: Post = serde_json::from_str(json).unwrap();
        assert_eq!(post.id, "p1");
        assert_eq!(post.likes_count.to_string(), "18446744073709551616");
        assert!(post.user_liked);
        assert!(!post.user_saved, "absent viewer flags default to false");
        assert_eq!(post.media.len(), 1);
    }

    #[test]
    fn test_comment_reply_nesting() {
        let json = r#"{
            "id": "c1",
            "postId": "p1",
            "author": {"id": "u1", "username": "ada"},
            "text": "nice",
            "likesCount": "2",
            "pinned": true,
            "replies": [{
                "id": "c2",
                "postId": "p1",
                "author": {"id": "u2", "username": "lin"},
                "text": "agreed",
                "parentCommentId": "c1",
                "likesCount": "0",
                "createdAt": "2024-03-01T12:05:00Z"
            }],
            "createdAt": "2024-03-01T12:00:00Z"
        }"#;
        let comment: Comment = serde_json::from_str(json).unwrap();
        assert!(comment.pinned);
        assert_eq!(comment.replies.len(), 1);
        assert_eq!(comment.replies[0].parent_comment_id.as_deref(), Some("c1"));
        assert!(comment.replies[0].replies.is_empty());
    }

    #[test]
    fn test_create_comment_request_omits_absent_parent() {
        let request = CreateCommentRequest {
            text: "hello".to_string(),
            parent_comment_id: None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("parentCommentId"));
    }
}
