//! Result extraction — turns the thread's message list into the user-visible
//! answer for one completed run.

use crate::assistant::types::{ContentBlock, ThreadMessage};

/// Select the first assistant-authored message produced by `run_id` and join
/// its text segments, newline-separated and trimmed.
///
/// A run can complete via tool calls alone without writing any message; that
/// case yields an empty string rather than an error.
pub fn extract_reply(messages: &[ThreadMessage], run_id: &str) -> String {
    let Some(message) = messages
        .iter()
        .find(|m| m.role == "assistant" && m.run_id.as_deref() == Some(run_id))
    else {
        return String::new();
    };

    let mut content = String::new();
    for block in &message.content {
        if let ContentBlock::Text { text } = block {
            content.push_str(&text.value);
            content.push('\n');
        }
    }
    content.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::types::TextContent;

    fn message(id: &str, role: &str, run_id: &str, texts: &[&str]) -> ThreadMessage {
        ThreadMessage {
            id: id.into(),
            role: role.into(),
            run_id: Some(run_id.into()),
            content: texts
                .iter()
                .map(|t| ContentBlock::Text {
                    text: TextContent {
                        value: (*t).to_string(),
                    },
                })
                .collect(),
        }
    }

    #[test]
    fn picks_only_the_matching_run() {
        let messages = vec![
            message("m1", "assistant", "run_other", &["stale answer"]),
            message("m2", "assistant", "run_1", &["fresh answer"]),
            message("m3", "user", "run_1", &["question"]),
        ];
        assert_eq!(extract_reply(&messages, "run_1"), "fresh answer");
    }

    #[test]
    fn first_match_wins_when_several_qualify() {
        let messages = vec![
            message("m1", "assistant", "run_1", &["latest"]),
            message("m2", "assistant", "run_1", &["earlier"]),
        ];
        // list order is newest-first; the extractor takes the first.
        assert_eq!(extract_reply(&messages, "run_1"), "latest");
    }

    #[test]
    fn joins_segments_with_newlines_and_trims() {
        let messages = vec![message("m1", "assistant", "run_1", &["part one", "part two "])];
        assert_eq!(extract_reply(&messages, "run_1"), "part one\npart two");
    }

    #[test]
    fn no_matching_message_yields_empty_content() {
        let messages = vec![message("m1", "assistant", "run_other", &["text"])];
        assert_eq!(extract_reply(&messages, "run_1"), "");
        assert_eq!(extract_reply(&[], "run_1"), "");
    }

    #[test]
    fn non_text_blocks_are_skipped() {
        let mut msg = message("m1", "assistant", "run_1", &["caption"]);
        msg.content.insert(0, ContentBlock::Other);
        assert_eq!(extract_reply(&[msg], "run_1"), "caption");
    }

    #[test]
    fn user_messages_from_the_run_are_ignored() {
        let messages = vec![message("m1", "user", "run_1", &["echoed input"])];
        assert_eq!(extract_reply(&messages, "run_1"), "");
    }
}
