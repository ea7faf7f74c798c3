//! crates/devotional_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases or APIs.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Favorite, Highlight, Lesson, NewLesson, NewSermon, Sermon};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Generation Request
//=========================================================================================

/// The transient input bundle for one text-generation call.
///
/// Exists only for the duration of a single API round trip; the three call
/// sites (lesson, theme, analysis) build their own with independent token
/// budgets.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub system: String,
    pub prompt: String,
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: u32,
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait DatabaseService: Send + Sync {
    // --- Annotation reads ---

    /// Loads a user's highlights joined to verse, chapter and book.
    /// An empty `ids` slice means "all of the user's highlights"; a non-empty
    /// slice restricts the result to those ids. Row order is deterministic
    /// (creation order).
    async fn get_highlights_for_user(&self, user_id: Uuid, ids: &[Uuid])
        -> PortResult<Vec<Highlight>>;

    /// Loads a user's favorites, with the same allow-list and ordering
    /// semantics as `get_highlights_for_user`.
    async fn get_favorites_for_user(&self, user_id: Uuid, ids: &[Uuid])
        -> PortResult<Vec<Favorite>>;

    // --- Lessons ---
    async fn create_lesson(&self, lesson: NewLesson) -> PortResult<Lesson>;

    async fn get_lesson_by_id(&self, lesson_id: Uuid) -> PortResult<Lesson>;

    async fn get_lessons_for_user(&self, user_id: Uuid) -> PortResult<Vec<Lesson>>;

    /// Moves a lesson into (or out of) a sermon at the given position.
    async fn set_lesson_placement(
        &self,
        lesson_id: Uuid,
        sermon_id: Option<Uuid>,
        position: i32,
    ) -> PortResult<()>;

    // --- Sermons ---
    async fn create_sermon(&self, sermon: NewSermon) -> PortResult<Sermon>;

    async fn get_sermon_by_id(&self, sermon_id: Uuid) -> PortResult<Sermon>;

    async fn get_sermon_by_share_token(&self, token: &str) -> PortResult<Sermon>;

    async fn get_sermons_for_user(&self, user_id: Uuid) -> PortResult<Vec<Sermon>>;

    /// The sermon's lessons ordered by position.
    async fn get_lessons_for_sermon(&self, sermon_id: Uuid) -> PortResult<Vec<Lesson>>;

    async fn count_lessons_in_sermon(&self, sermon_id: Uuid) -> PortResult<i64>;

    async fn set_sermon_analysis(
        &self,
        sermon_id: Uuid,
        detected_theme: &str,
        analysis: &str,
    ) -> PortResult<()>;

    async fn set_sermon_visibility(&self, sermon_id: Uuid, is_public: bool) -> PortResult<()>;
}

#[async_trait]
pub trait TextGenerationService: Send + Sync {
    /// Runs one completion and returns the first choice's raw text,
    /// unmodified. Transport and API failures surface as `PortError`.
    async fn complete(&self, request: &GenerationRequest) -> PortResult<String>;
}
