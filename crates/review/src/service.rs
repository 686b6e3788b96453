use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use {
    folio_album::{Aggregator, Slot, SubmissionKey},
    folio_channels::ChannelOutbound,
    folio_common::Mode,
    folio_config::ReviewConfig,
    tokio_util::sync::CancellationToken,
    tracing::{info, warn},
};

use crate::{
    evaluator::Evaluator,
    image::{ImageRef, release_all},
    mode::ModeStore,
    pipeline::{PipelineSettings, SubmissionPipeline},
};

/// Entry point for chat transports.
///
/// Owns the debounce buffer and the pipeline behind it. Cheap to share
/// behind an `Arc`; every method takes `&self`.
/// How long shutdown lets running reviews finish before abandoning them.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

pub struct ReviewService {
    aggregator: Aggregator<ImageRef>,
    stop: CancellationToken,
    modes: Arc<dyn ModeStore>,
    default_mode: Mode,
    download_dir: PathBuf,
}

impl ReviewService {
    pub fn new(
        config: &ReviewConfig,
        evaluator: Arc<dyn Evaluator>,
        outbound: Arc<dyn ChannelOutbound>,
        modes: Arc<dyn ModeStore>,
    ) -> Self {
        let stop = CancellationToken::new();
        let pipeline = SubmissionPipeline::new(
            evaluator,
            outbound,
            Arc::clone(&modes),
            PipelineSettings::from(config),
        )
        .with_stop(stop.clone());
        Self {
            aggregator: Aggregator::new(config.debounce(), Arc::new(pipeline)),
            stop,
            modes,
            default_mode: config.default_mode,
            download_dir: config.resolved_download_dir(),
        }
    }

    /// Add a downloaded image to its submission.
    pub fn submit(&self, key: SubmissionKey, image: ImageRef) {
        self.aggregator.enqueue(key, image);
    }

    /// Keep the submission for `key` open while an image is being fetched.
    /// Fill the slot with the stored image, or drop it if the fetch failed.
    pub fn reserve(&self, key: SubmissionKey) -> Slot<ImageRef> {
        self.aggregator.reserve(key)
    }

    /// Drop everything `conversation` has buffered and delete the files.
    /// Returns the number of images dropped.
    pub async fn cancel_conversation(&self, conversation: &str) -> usize {
        let images: Vec<ImageRef> = self
            .aggregator
            .cancel_conversation(conversation)
            .into_iter()
            .flat_map(|(_, images)| images)
            .collect();
        release_all(&images).await;
        images.len()
    }

    /// Images buffered for `key` and not yet dispatched.
    pub fn pending_images(&self, key: &SubmissionKey) -> usize {
        self.aggregator.pending_len(key)
    }

    pub async fn mode(&self, conversation: &str) -> Mode {
        self.modes
            .get(conversation)
            .await
            .unwrap_or(self.default_mode)
    }

    pub async fn set_mode(&self, conversation: &str, mode: Mode) {
        self.modes.set(conversation, mode).await;
        info!(conversation, %mode, "review mode changed");
    }

    /// Directory transports should download images into.
    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    /// Discard all pending submissions and delete their files.
    ///
    /// Reviews already running get [`SHUTDOWN_GRACE`] to finish; after that
    /// they are abandoned and release their own files. Returns the number of
    /// pending images discarded.
    pub async fn shutdown(&self) -> usize {
        let images: Vec<ImageRef> = self
            .aggregator
            .drain()
            .into_iter()
            .flat_map(|(_, images)| images)
            .collect();
        release_all(&images).await;

        if !self.aggregator.wait_in_flight(SHUTDOWN_GRACE).await {
            warn!(
                running = self.aggregator.in_flight(),
                "reviews still running at shutdown, abandoning them"
            );
            self.stop.cancel();
            if !self.aggregator.wait_in_flight(SHUTDOWN_GRACE).await {
                warn!(running = self.aggregator.in_flight(), "abandoned reviews did not stop");
            }
        }
        info!(discarded = images.len(), "review service stopped");
        images.len()
    }
}
