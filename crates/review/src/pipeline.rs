use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    folio_album::{SubmissionHandler, SubmissionKey},
    folio_channels::ChannelOutbound,
    folio_common::Mode,
    folio_config::ReviewConfig,
    folio_markup::{TELEGRAM_MAX_MESSAGE_LEN, number_fragments},
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

use crate::{
    error::{Error, Result},
    evaluator::Evaluator,
    image::{ImageRef, release_all},
    mode::ModeStore,
};

pub const PROGRESS_NOTICE: &str = "⏳ Analyzing your portfolio, this may take a moment...";
pub const REVIEW_HEADER: &str = "📊 **Portfolio review:**";
pub const DELIVERY_FAILED_NOTICE: &str =
    "⚠️ The review is ready but could not be delivered in full. Please send the images again.";

/// Knobs of the dispatch step.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub fragment_limit: usize,
    pub evaluation_timeout: Duration,
    pub default_mode: Mode,
}

impl From<&ReviewConfig> for PipelineSettings {
    /// Out-of-range limits are clamped to what Telegram accepts.
    fn from(config: &ReviewConfig) -> Self {
        Self {
            fragment_limit: config.fragment_limit.clamp(1, TELEGRAM_MAX_MESSAGE_LEN),
            evaluation_timeout: config.evaluation_timeout(),
            default_mode: config.default_mode,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from(&ReviewConfig::default())
    }
}

/// Turns one completed submission into delivered feedback.
pub struct SubmissionPipeline {
    evaluator: Arc<dyn Evaluator>,
    outbound: Arc<dyn ChannelOutbound>,
    modes: Arc<dyn ModeStore>,
    settings: PipelineSettings,
    stop: CancellationToken,
}

impl SubmissionPipeline {
    pub fn new(
        evaluator: Arc<dyn Evaluator>,
        outbound: Arc<dyn ChannelOutbound>,
        modes: Arc<dyn ModeStore>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            evaluator,
            outbound,
            modes,
            settings,
            stop: CancellationToken::new(),
        }
    }

    /// Abandon running submissions once `stop` is cancelled. Their files are
    /// still released.
    #[must_use]
    pub fn with_stop(mut self, stop: CancellationToken) -> Self {
        self.stop = stop;
        self
    }

    /// Evaluate `images` and deliver the feedback to the key's conversation.
    ///
    /// Evaluation failures are delivered as an error notice instead of
    /// feedback. Returns the number of fragments delivered. The images are
    /// left in place; see [`SubmissionHandler::on_submission`] for cleanup.
    pub async fn dispatch(&self, key: &SubmissionKey, images: &[ImageRef]) -> Result<usize> {
        let to = key.conversation.as_str();
        let mode = self
            .modes
            .get(to)
            .await
            .unwrap_or(self.settings.default_mode);
        info!(%key, %mode, images = images.len(), "dispatching submission");

        if let Err(e) = self.outbound.send_text(to, PROGRESS_NOTICE).await {
            warn!(%key, error = %e, "failed to send progress notice");
        }
        if let Err(e) = self.outbound.send_typing(to).await {
            warn!(%key, error = %e, "failed to send typing indicator");
        }

        let text = match self.evaluate(mode, images).await {
            Ok(feedback) => format!("{REVIEW_HEADER}\n\n{feedback}"),
            Err(e) => {
                warn!(%key, %mode, error = %e, "evaluation failed");
                failure_notice(&e)
            },
        };

        let fragments = number_fragments(&text, self.settings.fragment_limit);
        if fragments.is_empty() {
            warn!(%key, limit = self.settings.fragment_limit, "review rendered to no messages");
            self.outbound.send_text(to, DELIVERY_FAILED_NOTICE).await?;
            return Err(Error::message("review rendered to no messages"));
        }
        for (index, fragment) in fragments.iter().enumerate() {
            if let Err(e) = self.outbound.send_html(to, fragment).await {
                warn!(%key, fragment = index, error = %e, "failed to deliver review fragment");
                self.outbound.send_text(to, DELIVERY_FAILED_NOTICE).await?;
                return Err(e.into());
            }
        }

        info!(%key, fragments = fragments.len(), "review delivered");
        Ok(fragments.len())
    }

    async fn evaluate(&self, mode: Mode, images: &[ImageRef]) -> Result<String> {
        let limit = self.settings.evaluation_timeout;
        match tokio::time::timeout(limit, self.evaluator.evaluate(mode, images)).await {
            Ok(result) => result,
            Err(_) => Err(Error::Timeout(limit)),
        }
    }
}

/// User-facing text substituted for feedback when evaluation fails.
pub fn failure_notice(error: &Error) -> String {
    let reason = match error {
        Error::Timeout(_) => "the reviewer took too long to answer".to_string(),
        Error::NotConfigured(_) => "the reviewer is not configured".to_string(),
        other => other.to_string(),
    };
    format!("⚠️ Could not evaluate the portfolio: {reason}. Please try again later.")
}

#[async_trait]
impl SubmissionHandler<ImageRef> for SubmissionPipeline {
    async fn on_submission(&self, key: SubmissionKey, images: Vec<ImageRef>) {
        tokio::select! {
            result = self.dispatch(&key, &images) => {
                if let Err(e) = result {
                    warn!(%key, error = %e, "submission ended without full delivery");
                }
            },
            () = self.stop.cancelled() => {
                warn!(%key, images = images.len(), "submission abandoned at shutdown");
            },
        }
        let failed = release_all(&images).await;
        if failed > 0 {
            warn!(%key, failed, "some temporary images were not removed");
        }
    }
}
