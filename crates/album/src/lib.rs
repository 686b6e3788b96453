//! Debounced grouping of incoming images into portfolio submissions.
//!
//! Chat platforms deliver an album as a burst of independent messages. The
//! [`Aggregator`] buffers them per [`SubmissionKey`] and hands the complete,
//! ordered set to a [`SubmissionHandler`] once the burst has gone quiet.

pub mod aggregator;
pub mod key;

pub use {
    aggregator::{Aggregator, Slot, SubmissionHandler},
    key::{Grouping, SubmissionKey},
};
