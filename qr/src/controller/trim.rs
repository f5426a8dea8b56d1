//! Context trimming
//!
//! Keeps the newest messages that fit a token budget. The kept window always
//! starts on a human message so tool results are never separated from the
//! call that produced them. The system prompt travels outside the message
//! list and is never trimmed.

use tracing::debug;

use crate::llm::Message;

/// Newest messages fitting `max_tokens`, starting on a human message
///
/// Returns an empty list when no human message fits.
pub fn trim_messages(messages: &[Message], max_tokens: usize) -> Vec<Message> {
    let mut total = 0;
    let mut start = messages.len();
    for (i, message) in messages.iter().enumerate().rev() {
        let tokens = message.estimated_tokens();
        if total + tokens > max_tokens {
            break;
        }
        total += tokens;
        start = i;
    }

    let window = &messages[start..];
    let kept = match window.iter().position(Message::is_human) {
        Some(first_human) => window[first_human..].to_vec(),
        None => Vec::new(),
    };
    debug!(before = %messages.len(), after = %kept.len(), %total, "trim_messages: trimmed");
    kept
}

/// Trim, then append `reminder` if no human message survived
pub fn trim_with_reminder(messages: &[Message], max_tokens: usize, reminder: impl FnOnce() -> String) -> Vec<Message> {
    let mut kept = trim_messages(messages, max_tokens);
    if !kept.iter().any(Message::is_human) {
        debug!("trim_with_reminder: no human message left, appending reminder");
        kept.push(Message::user(reminder()));
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ContentBlock;

    fn tool_result(text: &str) -> Message {
        Message::user_blocks(vec![ContentBlock::tool_result("id", text, false)])
    }

    fn reminder() -> String {
        "Context trimmed. Current quiz URL: https://host/quiz-4".to_string()
    }

    #[test]
    fn test_everything_fits() {
        let messages = vec![Message::user("start"), Message::assistant("ok")];
        assert_eq!(trim_messages(&messages, 10_000).len(), 2);
    }

    #[test]
    fn test_drops_oldest_first() {
        let messages = vec![
            Message::user("a".repeat(400)),
            Message::assistant("b".repeat(400)),
            Message::user("newest question"),
            Message::assistant("answer"),
        ];
        let kept = trim_messages(&messages, 40);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].text(), "newest question");
    }

    #[test]
    fn test_window_starts_on_human() {
        let messages = vec![
            Message::user("x".repeat(400)),
            Message::assistant("calling tool"),
            tool_result("tool output"),
            Message::user("Next quiz URL received"),
            Message::assistant("ok"),
        ];
        // Budget fits the last four, but the window must not begin on the assistant turn
        let budget: usize = messages[1..].iter().map(Message::estimated_tokens).sum();
        let kept = trim_messages(&messages, budget);
        assert!(kept[0].is_human());
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_reminder_when_no_human_survives() {
        let messages = vec![
            Message::user("y".repeat(4_000)),
            Message::assistant("calling tool"),
            tool_result("short"),
        ];
        let kept = trim_with_reminder(&messages, 50, reminder);
        assert_eq!(kept.len(), 1);
        assert!(kept[0].is_human());
        assert_eq!(kept[0].text(), reminder());
    }

    #[test]
    fn test_no_reminder_when_human_survives() {
        let messages = vec![Message::user("start"), Message::assistant("ok")];
        let kept = trim_with_reminder(&messages, 10_000, reminder);
        assert_eq!(kept.len(), 2);
        assert!(!kept.iter().any(|m| m.text().contains("Context trimmed")));
    }

    #[test]
    fn test_tool_results_do_not_count_as_human() {
        let kept = trim_with_reminder(&[tool_result("data")], 10_000, reminder);
        assert_eq!(kept.len(), 1);
        assert!(kept[0].is_human());
    }
}
