//! services/api/src/generation/mod.rs
//!
//! The lesson/sermon generation pipeline: source material aggregation,
//! prompt composition, response extraction and the orchestrating service.

pub mod extract;
pub mod prompt;
pub mod service;
pub mod source;

use devotional_core::ports::PortError;

/// Errors that cross the pipeline boundary.
///
/// Malformed model output is deliberately NOT represented here: the response
/// extractor absorbs it with a fallback structure so a lesson is always
/// produced once source material exists and the API call itself succeeds.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// The user has no highlights or favorites to build a lesson from.
    #[error("no highlighted or favorited verses to generate from")]
    EmptySourceMaterial,

    /// The external generation API call failed outright
    /// (network, auth, rate limit or timeout). Not retried.
    #[error("text generation request failed: {0}")]
    GenerationFailure(String),

    /// A database port failure.
    #[error(transparent)]
    Port(#[from] PortError),
}

pub use service::{
    LessonGenerationOptions, LessonGenerator, SermonGenerationOptions, ANALYSIS_UNAVAILABLE,
    DEFAULT_THEME,
};
pub use source::{SourceKind, SourceMaterial, VerseContext};
