use {
    async_trait::async_trait,
    serde::{Deserialize, Serialize},
};

use crate::Result;

/// One inline button attached to a message.
///
/// `data` is echoed back by the platform when the button is pressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub data: String,
}

impl Choice {
    pub fn new(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            data: data.into(),
        }
    }
}

/// Send messages to a conversation.
///
/// `to` is the platform's conversation identifier in string form.
#[async_trait]
pub trait ChannelOutbound: Send + Sync {
    /// Send text verbatim, with no markup interpretation.
    async fn send_text(&self, to: &str, text: &str) -> Result<()>;

    /// Send text already rendered to the platform's rich markup.
    ///
    /// Implementations should retry as plain text when the platform rejects
    /// the markup, so a formatting bug never loses the message.
    async fn send_html(&self, to: &str, html: &str) -> Result<()>;

    /// Send a message with a row of inline choices.
    async fn send_choices(&self, to: &str, text: &str, choices: &[Choice]) -> Result<()>;

    /// Send a "typing" indicator. No-op by default.
    async fn send_typing(&self, _to: &str) -> Result<()> {
        Ok(())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, std::sync::Mutex};

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChannelOutbound for Recorder {
        async fn send_text(&self, to: &str, text: &str) -> Result<()> {
            self.sent.lock().unwrap().push(format!("{to}:{text}"));
            Ok(())
        }

        async fn send_html(&self, to: &str, html: &str) -> Result<()> {
            self.send_text(to, html).await
        }

        async fn send_choices(&self, to: &str, text: &str, choices: &[Choice]) -> Result<()> {
            let labels: Vec<_> = choices.iter().map(|c| c.label.as_str()).collect();
            self.send_text(to, &format!("{text} [{}]", labels.join("|")))
                .await
        }
    }

    #[tokio::test]
    async fn typing_defaults_to_noop() {
        let recorder = Recorder::default();
        recorder.send_typing("42").await.unwrap();
        assert!(recorder.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn choices_are_usable_through_trait_object() {
        let recorder = Recorder::default();
        let outbound: &dyn ChannelOutbound = &recorder;
        outbound
            .send_choices("42", "Pick", &[Choice::new("A", "a"), Choice::new("B", "b")])
            .await
            .unwrap();
        assert_eq!(*recorder.sent.lock().unwrap(), vec!["42:Pick [A|B]"]);
    }
}
