//! crates/devotional_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// The fixed set of color tags a highlight can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HighlightColor {
    Yellow,
    Green,
    Blue,
    Pink,
    Purple,
    Orange,
}

impl HighlightColor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Yellow => "yellow",
            Self::Green => "green",
            Self::Blue => "blue",
            Self::Pink => "pink",
            Self::Purple => "purple",
            Self::Orange => "orange",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "yellow" => Some(Self::Yellow),
            "green" => Some(Self::Green),
            "blue" => Some(Self::Blue),
            "pink" => Some(Self::Pink),
            "purple" => Some(Self::Purple),
            "orange" => Some(Self::Orange),
            _ => None,
        }
    }
}

/// A scripture verse joined to its chapter and book for display.
///
/// The relation fields are optional so a broken join never panics the
/// pipeline; `reference()` substitutes placeholders instead.
#[derive(Debug, Clone)]
pub struct AnnotatedVerse {
    pub id: Uuid,
    pub book_name: Option<String>,
    pub chapter_number: Option<i32>,
    pub verse_number: Option<i32>,
    pub text: String,
}

impl AnnotatedVerse {
    /// Formats the human-readable reference, e.g. "John 3:16".
    pub fn reference(&self) -> String {
        let book = self.book_name.as_deref().unwrap_or("Unknown");
        let chapter = self
            .chapter_number
            .map(|c| c.to_string())
            .unwrap_or_else(|| "?".to_string());
        let verse = self
            .verse_number
            .map(|v| v.to_string())
            .unwrap_or_else(|| "?".to_string());
        format!("{} {}:{}", book, chapter, verse)
    }
}

/// A user's highlighted verse, with a color tag and an optional note.
/// Unique per (user, verse).
#[derive(Debug, Clone)]
pub struct Highlight {
    pub id: Uuid,
    pub user_id: Uuid,
    pub verse: AnnotatedVerse,
    pub color: HighlightColor,
    pub note: Option<String>,
}

/// A user's favorited verse with an optional note. Unique per (user, verse).
#[derive(Debug, Clone)]
pub struct Favorite {
    pub id: Uuid,
    pub user_id: Uuid,
    pub verse: AnnotatedVerse,
    pub note: Option<String>,
}

/// A generated devotional lesson.
///
/// `position` orders the lesson inside its sermon and is 0 for a
/// standalone lesson. The source id lists record which verses,
/// highlights and favorites fed the generation.
#[derive(Debug, Clone)]
pub struct Lesson {
    pub id: Uuid,
    pub user_id: Uuid,
    pub sermon_id: Option<Uuid>,
    pub position: i32,
    pub title: String,
    pub content: String,
    pub theme: Option<String>,
    pub source_verses: Vec<Uuid>,
    pub source_highlights: Vec<Uuid>,
    pub source_favorites: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// The insert shape for a new lesson.
#[derive(Debug, Clone)]
pub struct NewLesson {
    pub user_id: Uuid,
    pub sermon_id: Option<Uuid>,
    pub position: i32,
    pub title: String,
    pub content: String,
    pub theme: Option<String>,
    pub source_verses: Vec<Uuid>,
    pub source_highlights: Vec<Uuid>,
    pub source_favorites: Vec<Uuid>,
}

/// A named, ordered collection of lessons belonging to one user.
///
/// The share token is generated once at creation and never regenerated.
/// `detected_theme` and `analysis` are filled in by the analysis pass.
#[derive(Debug, Clone)]
pub struct Sermon {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub share_token: String,
    pub is_public: bool,
    pub detected_theme: Option<String>,
    pub analysis: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The insert shape for a new sermon.
#[derive(Debug, Clone)]
pub struct NewSermon {
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub share_token: String,
    pub is_public: bool,
}

/// A sermon together with its lessons, ordered by position.
#[derive(Debug, Clone)]
pub struct SermonWithLessons {
    pub sermon: Sermon,
    pub lessons: Vec<Lesson>,
}

/// The unifying theme and closing narrative produced for a sermon.
#[derive(Debug, Clone)]
pub struct SermonAnalysis {
    pub detected_theme: String,
    pub analysis: String,
}

/// Produces an opaque share token for a new sermon.
pub fn new_share_token() -> String {
    Uuid::new_v4().simple().to_string()
}
