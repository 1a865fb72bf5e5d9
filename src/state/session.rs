// SPDX-License-Identifier: MPL-2.0

use crate::config::STATUS_MESSAGE_MAX;
use crate::supabase::{Message, NewMessage, User};
use unicode_segmentation::UnicodeSegmentation;

/// The ordered message log: the history batch fetched at connect time,
/// followed by live feed deliveries in arrival order.
#[derive(Debug, Default)]
pub struct MessageLog {
    messages: Vec<Message>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install the connect-time history batch. The server already ordered it
    /// by creation time; the client never re-sorts.
    pub fn replace(&mut self, history: Vec<Message>) {
        self.messages = history;
    }

    /// Append one feed delivery to the tail. Appends blindly: an insert
    /// landing between the history fetch and the channel join is not
    /// reconciled here, so it may be missing or doubled.
    pub fn append(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Everything owned by one authenticated session: the identity and the log
/// it watches. The feed handler only ever appends; nothing else mutates the
/// log.
pub struct ChatSession {
    pub user: User,
    pub log: MessageLog,
}

impl ChatSession {
    pub fn new(user: User) -> Self {
        Self {
            user,
            log: MessageLog::new(),
        }
    }

    /// Build the insert payload for a composed message, or `None` for
    /// blank input (no insert is issued). The sender snapshot is taken from
    /// the stored identity at send time; old rows never change with it.
    pub fn compose(&self, contents: &str) -> Option<NewMessage> {
        if contents.trim().is_empty() {
            return None;
        }
        Some(NewMessage {
            nickname: self.user.nickname.clone(),
            avatar: self.user.avatar.clone(),
            contents: contents.to_string(),
        })
    }

    /// Whether a log entry was sent under this session's nickname.
    pub fn is_own(&self, message: &Message) -> bool {
        message.nickname == self.user.nickname
    }
}

/// Cap status-message input at its column limit, counting grapheme clusters
/// so multi-byte avatars and accents are not split.
pub fn clip_status(input: &str) -> String {
    input.graphemes(true).take(STATUS_MESSAGE_MAX).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn msg(id: i64, nickname: &str, contents: &str, created_at: &str) -> Message {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "nickname": nickname,
            "avatar": "🐸",
            "contents": contents,
            "created_at": created_at,
        }))
        .unwrap()
    }

    fn session() -> ChatSession {
        ChatSession::new(User {
            nickname: "Aria".into(),
            pin: "4821".into(),
            avatar: "🦊".into(),
            status_message: String::new(),
        })
    }

    #[test]
    fn log_is_history_followed_by_feed_deliveries() {
        let mut log = MessageLog::new();
        log.replace(vec![
            msg(1, "Aria", "first", "2024-05-01T10:00:00+00:00"),
            msg(2, "Bram", "second", "2024-05-01T10:01:00+00:00"),
        ]);
        log.append(msg(3, "Aria", "third", "2024-05-01T10:02:00+00:00"));

        let ids: Vec<i64> = log.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn feed_deliveries_are_not_resorted() {
        let mut log = MessageLog::new();
        log.replace(vec![msg(5, "Aria", "later", "2024-05-01T12:00:00+00:00")]);

        // Out-of-order delivery stays where it arrived.
        log.append(msg(4, "Bram", "earlier", "2024-05-01T11:00:00+00:00"));

        let ids: Vec<i64> = log.messages().iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![5, 4]);
    }

    #[test]
    fn feed_deliveries_are_not_deduplicated() {
        let mut log = MessageLog::new();
        log.replace(vec![msg(7, "Aria", "hello", "2024-05-01T12:00:00+00:00")]);
        log.append(msg(7, "Aria", "hello", "2024-05-01T12:00:00+00:00"));

        assert_eq!(log.len(), 2);
    }

    #[test]
    fn compose_rejects_blank_input() {
        let session = session();
        assert!(session.compose("").is_none());
        assert!(session.compose("   ").is_none());
    }

    #[test]
    fn compose_snapshots_the_stored_identity() {
        let session = session();
        let new_message = session.compose("hello there").unwrap();

        assert_eq!(new_message.nickname, "Aria");
        assert_eq!(new_message.avatar, "🦊");
        assert_eq!(new_message.contents, "hello there");
    }

    #[test]
    fn own_messages_are_matched_by_nickname() {
        let session = session();
        let own = msg(1, "Aria", "mine", "2024-05-01T12:00:00+00:00");
        let other = msg(2, "Bram", "theirs", "2024-05-01T12:00:00+00:00");

        assert!(session.is_own(&own));
        assert!(!session.is_own(&other));
    }

    #[test]
    fn status_is_clipped_by_grapheme_count() {
        let long = "a".repeat(40);
        assert_eq!(clip_status(&long).chars().count(), STATUS_MESSAGE_MAX);

        let emoji = "🦊".repeat(40);
        let clipped = clip_status(&emoji);
        assert_eq!(clipped.graphemes(true).count(), STATUS_MESSAGE_MAX);

        assert_eq!(clip_status("short"), "short");
    }
}
