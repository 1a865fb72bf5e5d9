// SPDX-License-Identifier: MPL-2.0

use serde::{Deserialize, Serialize};

/// Decoupled from the PostgREST row shapes so the rest of the app only sees
/// our own types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub nickname: String,
    pub pin: String,
    pub avatar: String,
    #[serde(default)]
    pub status_message: String,
}

/// One chat log entry. `nickname` and `avatar` are the sender's identity as
/// it was at send time; later profile changes do not rewrite old rows.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub id: i64,
    pub nickname: String,
    /// Rows written before avatars existed have no value here.
    #[serde(default)]
    pub avatar: Option<String>,
    pub contents: String,
    /// Server-assigned timestamp, RFC 3339. Kept as delivered; ordering is
    /// the server's.
    pub created_at: String,
}

/// Insert payload for the message table. `id` and `created_at` are assigned
/// by the server.
#[derive(Debug, Clone, Serialize)]
pub struct NewMessage {
    pub nickname: String,
    pub avatar: String,
    pub contents: String,
}

/// Insert payload for the user table.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct NewUser<'a> {
    pub nickname: &'a str,
    pub avatar: &'a str,
    pub pin: &'a str,
    pub status_message: &'a str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn user_row_without_status_deserializes() {
        let row = r#"{"nickname":"Aria","pin":"4821","avatar":"🦊"}"#;
        let user: User = serde_json::from_str(row).unwrap();
        assert_eq!(user.nickname, "Aria");
        assert_eq!(user.status_message, "");
    }

    #[test]
    fn message_row_without_avatar_deserializes() {
        let row = r#"{
            "id": 7,
            "nickname": "Aria",
            "contents": "hello",
            "created_at": "2024-05-01T12:00:00+00:00"
        }"#;
        let msg: Message = serde_json::from_str(row).unwrap();
        assert_eq!(msg.id, 7);
        assert_eq!(msg.avatar, None);
    }
}
