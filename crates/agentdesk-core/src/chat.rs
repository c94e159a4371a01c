//! Simulated chat responder.
//!
//! Replies are synthesized by template substitution; nothing is generated.
//! Each agent keeps a rolling [`ChatHistory`] that is trimmed to the last
//! `2 * max(1, context_rounds)` entries after every turn.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_CONTEXT_ROUNDS: i64 = 3;
pub const DEFAULT_MAX_TOKENS: usize = 512;
pub const DEFAULT_HISTORY_LIMIT: i64 = 100;

const PERSONA_PREFIX: &str = "[persona active] ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One history entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub content: String,
}

impl ChatEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// Ordered, bounded conversation history of a single agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChatHistory {
    entries: VecDeque<ChatEntry>,
}

impl ChatHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append a user/assistant pair and evict the oldest entries beyond the
    /// window of `context_rounds` pairs.
    pub fn record_turn(&mut self, user: ChatEntry, assistant: ChatEntry, context_rounds: i64) {
        self.entries.push_back(user);
        self.entries.push_back(assistant);
        let window = window_len(context_rounds);
        while self.entries.len() > window {
            self.entries.pop_front();
        }
    }

    /// Last `limit` entries in chronological order; `limit <= 0` is empty.
    pub fn recent(&self, limit: i64) -> Vec<ChatEntry> {
        if limit <= 0 {
            return Vec::new();
        }
        let skip = self.entries.len().saturating_sub(limit as usize);
        self.entries.iter().skip(skip).cloned().collect()
    }
}

/// Number of entries retained for `context_rounds` (at least one pair).
pub fn window_len(context_rounds: i64) -> usize {
    (context_rounds.max(1) as usize).saturating_mul(2)
}

/// Parameters of one chat turn, after request defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub message: String,
    pub model: String,
    pub context_rounds: i64,
    pub max_tokens: usize,
}

impl Default for ChatTurn {
    fn default() -> Self {
        Self {
            message: String::new(),
            model: DEFAULT_MODEL.to_owned(),
            context_rounds: DEFAULT_CONTEXT_ROUNDS,
            max_tokens: DEFAULT_MAX_TOKENS,
        }
    }
}

/// Truncate `text` to at most `max_chars` characters.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Build the canned assistant reply for `message`.
///
/// `persona` is the agent's profile markdown; a non-blank persona marks the
/// reply with a prefix.
pub fn synthesize_reply(persona: Option<&str>, model: &str, message: &str, max_tokens: usize) -> String {
    let prefix = match persona {
        Some(p) if !p.trim().is_empty() => PERSONA_PREFIX,
        _ => "",
    };
    format!("{prefix}Model({model}) reply: {}", truncate_chars(message, max_tokens))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn history_keeps_last_pairs() {
        let mut history = ChatHistory::new();
        for i in 0..5 {
            history.record_turn(
                ChatEntry::user(format!("q{i}")),
                ChatEntry::assistant(format!("a{i}")),
                2,
            );
            assert!(history.len() <= 4);
        }
        let all = history.recent(100);
        assert_eq!(
            all,
            vec![
                ChatEntry::user("q3"),
                ChatEntry::assistant("a3"),
                ChatEntry::user("q4"),
                ChatEntry::assistant("a4"),
            ]
        );
    }

    #[test]
    fn zero_or_negative_rounds_keep_one_pair() {
        let mut history = ChatHistory::new();
        history.record_turn(ChatEntry::user("a"), ChatEntry::assistant("b"), 0);
        history.record_turn(ChatEntry::user("c"), ChatEntry::assistant("d"), -4);
        assert_eq!(history.recent(10), vec![ChatEntry::user("c"), ChatEntry::assistant("d")]);
    }

    #[test]
    fn recent_respects_limit() {
        let mut history = ChatHistory::new();
        history.record_turn(ChatEntry::user("1"), ChatEntry::assistant("2"), 3);
        history.record_turn(ChatEntry::user("3"), ChatEntry::assistant("4"), 3);
        assert_eq!(history.recent(3).len(), 3);
        assert_eq!(history.recent(3)[0], ChatEntry::assistant("2"));
        assert!(history.recent(0).is_empty());
        assert!(history.recent(-1).is_empty());
    }

    #[test]
    fn reply_truncates_by_characters() {
        let reply = synthesize_reply(None, "m", "héllo wörld", 4);
        assert_eq!(reply, "Model(m) reply: héll");
    }

    #[test]
    fn persona_prefix_only_when_set() {
        assert!(synthesize_reply(Some("be nice"), "m", "x", 10).starts_with(PERSONA_PREFIX));
        assert!(!synthesize_reply(Some("  "), "m", "x", 10).starts_with(PERSONA_PREFIX));
    }

    #[test]
    fn roles_serialize_lowercase() {
        let json = serde_json::to_string(&ChatEntry::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }
}
