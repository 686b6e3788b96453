//! Portfolio review flow: buffered images in, formatted feedback out.
//!
//! [`ReviewService`] is the entry point for chat transports. It feeds images
//! into a debounced [`folio_album::Aggregator`]; each completed submission is
//! run through the [`SubmissionPipeline`], which asks an [`Evaluator`] for
//! feedback, delivers it via a [`folio_channels::ChannelOutbound`], and
//! deletes the downloaded files.

pub mod behance;
pub mod error;
pub mod evaluator;
pub mod image;
pub mod mode;
pub mod pipeline;
pub mod prompts;
pub mod service;

pub use {
    behance::{BehanceImporter, BehanceProject, find_project_link},
    error::{Error, Result},
    evaluator::{Evaluator, OpenAiEvaluator},
    image::ImageRef,
    mode::{InMemoryModeStore, ModeStore},
    pipeline::{PipelineSettings, SubmissionPipeline},
    service::ReviewService,
};
