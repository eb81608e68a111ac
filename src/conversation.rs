//! Conversation flattening.
//!
//! A conversation is ingested as a single message-typed episode. Each
//! message becomes one line:
//!
//! ```text
//! <role>(<role_type>): <content> (Timestamp: <timestamp>)
//! ```
//!
//! Lines keep the input order and are joined with `\n`. The timestamp keeps
//! the offset it was submitted with, and stays offset-less if it had none.
//! A message without a custom role renders its role as `None`.

use crate::models::Message;

/// Render one message as a transcript line.
pub fn format_message(message: &Message) -> String {
    format!(
        "{}({}): {} (Timestamp: {})",
        message.role.as_deref().unwrap_or("None"),
        message.role_type,
        message.content,
        message.timestamp.to_iso(),
    )
}

/// Flatten messages into a transcript, one line per message.
pub fn flatten_conversation(messages: &[Message]) -> String {
    messages
        .iter()
        .map(format_message)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{RoleType, Timestamp};

    fn message(role: Option<&str>, role_type: RoleType, content: &str, ts: &str) -> Message {
        Message {
            content: content.to_string(),
            uuid: None,
            name: String::new(),
            role_type,
            role: role.map(str::to_string),
            timestamp: Timestamp::parse(ts).unwrap(),
            source_description: String::new(),
        }
    }

    #[test]
    fn test_single_message_line() {
        let m = message(Some("ana"), RoleType::User, "hi there", "2024-05-01T09:30:00Z");
        assert_eq!(
            format_message(&m),
            "ana(user): hi there (Timestamp: 2024-05-01T09:30:00+00:00)"
        );
    }

    #[test]
    fn test_offset_is_preserved() {
        let m = message(Some("bot"), RoleType::Assistant, "ok", "2024-05-01T09:30:00.250-03:00");
        assert!(format_message(&m).ends_with("(Timestamp: 2024-05-01T09:30:00.250000-03:00)"));
    }

    #[test]
    fn test_offsetless_timestamp_stays_offsetless() {
        let m = message(Some("ana"), RoleType::User, "hi", "2024-05-01T09:30:00");
        assert_eq!(
            format_message(&m),
            "ana(user): hi (Timestamp: 2024-05-01T09:30:00)"
        );
    }

    #[test]
    fn test_missing_role_renders_none() {
        let m = message(None, RoleType::System, "rules", "2024-05-01T09:30:00Z");
        assert!(format_message(&m).starts_with("None(system): rules"));
    }

    #[test]
    fn test_order_and_line_count_preserved() {
        let messages: Vec<Message> = (0..5)
            .map(|i| {
                message(
                    Some(&format!("speaker{}", i)),
                    if i % 2 == 0 { RoleType::User } else { RoleType::Assistant },
                    &format!("line {}", i),
                    &format!("2024-05-01T09:3{}:00Z", i),
                )
            })
            .collect();

        let text = flatten_conversation(&messages);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), messages.len());
        for (i, line) in lines.iter().enumerate() {
            assert!(line.starts_with(&format!("speaker{}(", i)));
            assert!(line.contains(&format!(": line {} ", i)));
            assert!(line.contains(&format!("2024-05-01T09:3{}:00+00:00", i)));
        }
    }

    #[test]
    fn test_empty_conversation() {
        assert_eq!(flatten_conversation(&[]), "");
    }
}
