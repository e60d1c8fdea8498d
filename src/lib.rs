//! Outcome-indicator aggregation for a Learning through Play rollout.
//!
//! Calculators in [`indicators`] are pure functions over survey responses;
//! [`aggregate::load_and_aggregate`] is the only entry point that performs I/O.

pub mod aggregate;
pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod indicators;
pub mod mapping;
pub mod models;
pub mod report;
pub mod scoring;
pub mod source;

pub use aggregate::{aggregate, load_and_aggregate, AggregateOptions};
pub use error::IndicatorError;
pub use indicators::Thresholds;
pub use mapping::QuestionMappings;
pub use models::{
    Answer, Instrument, OutcomeIndicators, ResponseRecord, ResponseSet, SubmissionId,
};
pub use source::ResponseSource;
