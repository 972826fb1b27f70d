use ripple_types::{Comment, Count};
use serde::{Deserialize, Serialize};

/// Server-pushed events, tagged `{ "event": ..., "data": {...} }`.
///
/// Where an event can echo a viewer's own action (comments, likes), the
/// payload carries the originating user id so the reconciler can match
/// it against pending local mutations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    #[serde(rename_all = "camelCase")]
    NewComment {
        post_id: String,
        user_id: String,
        comment: Comment,
    },
    #[serde(rename_all = "camelCase")]
    LikeCountChanged {
        entity_id: String,
        user_id: String,
        likes_count: Count,
    },
    #[serde(rename_all = "camelCase")]
    ViewCountChanged {
        reel_id: String,
        views_count: Count,
    },
    #[serde(rename_all = "camelCase")]
    Typing {
        conversation_id: String,
        user_id: String,
        typing: bool,
    },
    #[serde(rename_all = "camelCase")]
    MessageDelivered {
        conversation_id: String,
        message_id: String,
    },
    #[serde(rename_all = "camelCase")]
    MessageRead {
        conversation_id: String,
        message_id: String,
        user_id: String,
    },
    #[serde(rename_all = "camelCase")]
    MessageDeleted {
        conversation_id: String,
        message_id: String,
    },
}

/// Outbound socket messages: room membership per post/reel or
/// conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    JoinRoom { room: String },
    LeaveRoom { room: String },
}

impl ClientEvent {
    pub fn join_post(post_id: &str) -> Self {
        ClientEvent::JoinRoom {
            room: format!("post:{}", post_id),
        }
    }

    pub fn leave_post(post_id: &str) -> Self {
        ClientEvent::LeaveRoom {
            room: format!("post:{}", post_id),
        }
    }

    pub fn join_reel(reel_id: &str) -> Self {
        ClientEvent::JoinRoom {
            room: format!("reel:{}", reel_id),
        }
    }

    pub fn leave_reel(reel_id: &str) -> Self {
        ClientEvent::LeaveRoom {
            room: format!("reel:{}", reel_id),
        }
    }

    pub fn join_conversation(conversation_id: &str) -> Self {
        ClientEvent::JoinRoom {
            room: format!("conversation:{}", conversation_id),
        }
    }

    pub fn leave_conversation(conversation_id: &str) -> Self {
        ClientEvent::LeaveRoom {
            room: format!("conversation:{}", conversation_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_count_event_wire_format() {
        let json = r#"{
            "event": "like_count_changed",
            "data": {"entityId": "p1", "userId": "u2", "likesCount": "12"}
        }"#;
        let event: ServerEvent = serde_json::from_str(json).unwrap();
        match event {
            ServerEvent::LikeCountChanged {
                entity_id,
                user_id,
                likes_count,
            } => {
                assert_eq!(entity_id, "p1");
                assert_eq!(user_id, "u2");
                assert_eq!(likes_count.to_string(), "12");
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_join_room_serialization() {
        let event = ClientEvent::join_post("p1");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "join_room");
        assert_eq!(json["data"]["room"], "post:p1");
    }
}
