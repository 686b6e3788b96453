use std::fmt;

use serde::{Deserialize, Serialize};

/// What ties images of one conversation into the same submission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Grouping {
    /// Album identifier supplied by the platform.
    Album(String),
    /// Images sent without an album id. All of them in one conversation
    /// share a single slot.
    Solo,
}

/// Identifies one in-flight submission: a conversation plus its grouping.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubmissionKey {
    pub conversation: String,
    pub grouping: Grouping,
}

impl SubmissionKey {
    pub fn album(conversation: impl Into<String>, album_id: impl Into<String>) -> Self {
        Self {
            conversation: conversation.into(),
            grouping: Grouping::Album(album_id.into()),
        }
    }

    pub fn solo(conversation: impl Into<String>) -> Self {
        Self {
            conversation: conversation.into(),
            grouping: Grouping::Solo,
        }
    }

    /// Build a key from an optional platform album id.
    pub fn for_message(conversation: impl Into<String>, album_id: Option<String>) -> Self {
        match album_id.filter(|id| !id.is_empty()) {
            Some(id) => Self::album(conversation, id),
            None => Self::solo(conversation),
        }
    }
}

impl fmt::Display for SubmissionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.grouping {
            Grouping::Album(id) => write!(f, "{}/album:{id}", self.conversation),
            Grouping::Solo => write!(f, "{}/solo", self.conversation),
        }
    }
}

#[cfg(test)]
mod tests {
    use {super::*, rstest::rstest};

    #[rstest]
    #[case(Some("g1".to_string()), SubmissionKey::album("42", "g1"))]
    #[case(None, SubmissionKey::solo("42"))]
    #[case(Some(String::new()), SubmissionKey::solo("42"))]
    fn key_from_message(#[case] album: Option<String>, #[case] expected: SubmissionKey) {
        assert_eq!(SubmissionKey::for_message("42", album), expected);
    }

    #[test]
    fn same_album_in_different_chats_never_merges() {
        assert_ne!(SubmissionKey::album("1", "g"), SubmissionKey::album("2", "g"));
        assert_ne!(SubmissionKey::solo("1"), SubmissionKey::album("1", "solo"));
    }

    #[test]
    fn display_is_log_friendly() {
        assert_eq!(SubmissionKey::album("42", "g1").to_string(), "42/album:g1");
        assert_eq!(SubmissionKey::solo("42").to_string(), "42/solo");
    }
}
