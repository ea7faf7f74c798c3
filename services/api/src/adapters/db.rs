//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `DatabaseService` port from the `core` crate. It handles all interactions
//! with the PostgreSQL database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use devotional_core::domain::{
    AnnotatedVerse, Favorite, Highlight, HighlightColor, Lesson, NewLesson, NewSermon, Sermon,
};
use devotional_core::ports::{DatabaseService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `DatabaseService` port.
#[derive(Clone)]
pub struct DbAdapter {
    pool: PgPool,
}

impl DbAdapter {
    /// Creates a new `DbAdapter`.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct AnnotationRecord {
    id: Uuid,
    user_id: Uuid,
    color: Option<String>,
    note: Option<String>,
    verse_id: Uuid,
    verse_number: Option<i32>,
    verse_text: String,
    chapter_number: Option<i32>,
    book_name: Option<String>,
}

impl AnnotationRecord {
    fn verse(&self) -> AnnotatedVerse {
        AnnotatedVerse {
            id: self.verse_id,
            book_name: self.book_name.clone(),
            chapter_number: self.chapter_number,
            verse_number: self.verse_number,
            text: self.verse_text.clone(),
        }
    }

    fn to_highlight(self) -> PortResult<Highlight> {
        let raw_color = self.color.clone().unwrap_or_default();
        let color = HighlightColor::parse(&raw_color).ok_or_else(|| {
            PortError::Unexpected(format!("Unknown highlight color '{}'", raw_color))
        })?;
        Ok(Highlight {
            verse: self.verse(),
            id: self.id,
            user_id: self.user_id,
            color,
            note: self.note,
        })
    }

    fn to_favorite(self) -> Favorite {
        Favorite {
            verse: self.verse(),
            id: self.id,
            user_id: self.user_id,
            note: self.note,
        }
    }
}

#[derive(FromRow)]
struct LessonRecord {
    id: Uuid,
    user_id: Uuid,
    sermon_id: Option<Uuid>,
    position: i32,
    title: String,
    content: String,
    theme: Option<String>,
    source_verses: Vec<Uuid>,
    source_highlights: Vec<Uuid>,
    source_favorites: Vec<Uuid>,
    created_at: DateTime<Utc>,
}

impl LessonRecord {
    fn to_domain(self) -> Lesson {
        Lesson {
            id: self.id,
            user_id: self.user_id,
            sermon_id: self.sermon_id,
            position: self.position,
            title: self.title,
            content: self.content,
            theme: self.theme,
            source_verses: self.source_verses,
            source_highlights: self.source_highlights,
            source_favorites: self.source_favorites,
            created_at: self.created_at,
        }
    }
}

#[derive(FromRow)]
struct SermonRecord {
    id: Uuid,
    user_id: Uuid,
    title: String,
    description: Option<String>,
    share_token: String,
    is_public: bool,
    detected_theme: Option<String>,
    analysis: Option<String>,
    created_at: DateTime<Utc>,
}

impl SermonRecord {
    fn to_domain(self) -> Sermon {
        Sermon {
            id: self.id,
            user_id: self.user_id,
            title: self.title,
            description: self.description,
            share_token: self.share_token,
            is_public: self.is_public,
            detected_theme: self.detected_theme,
            analysis: self.analysis,
            created_at: self.created_at,
        }
    }
}

//=========================================================================================
// Query Fragments
//=========================================================================================

const HIGHLIGHT_SELECT: &str = r#"
SELECT h.id, h.user_id, h.color, h.note,
       v.id AS verse_id, v.number AS verse_number, v.text AS verse_text,
       c.number AS chapter_number, b.name AS book_name
FROM highlights h
JOIN verses v ON v.id = h.verse_id
LEFT JOIN chapters c ON c.id = v.chapter_id
LEFT JOIN books b ON b.id = c.book_id
WHERE h.user_id = $1
"#;

const FAVORITE_SELECT: &str = r#"
SELECT f.id, f.user_id, NULL::text AS color, f.note,
       v.id AS verse_id, v.number AS verse_number, v.text AS verse_text,
       c.number AS chapter_number, b.name AS book_name
FROM favorites f
JOIN verses v ON v.id = f.verse_id
LEFT JOIN chapters c ON c.id = v.chapter_id
LEFT JOIN books b ON b.id = c.book_id
WHERE f.user_id = $1
"#;

const LESSON_COLUMNS: &str = r#"id, user_id, sermon_id, "position", title, content, theme,
source_verses, source_highlights, source_favorites, created_at"#;

const SERMON_COLUMNS: &str =
    "id, user_id, title, description, share_token, is_public, detected_theme, analysis, created_at";

//=========================================================================================
// `DatabaseService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DatabaseService for DbAdapter {
    async fn get_highlights_for_user(
        &self,
        user_id: Uuid,
        ids: &[Uuid],
    ) -> PortResult<Vec<Highlight>> {
        let records = fetch_annotations(&self.pool, HIGHLIGHT_SELECT, "h", user_id, ids).await?;
        records.into_iter().map(AnnotationRecord::to_highlight).collect()
    }

    async fn get_favorites_for_user(
        &self,
        user_id: Uuid,
        ids: &[Uuid],
    ) -> PortResult<Vec<Favorite>> {
        let records = fetch_annotations(&self.pool, FAVORITE_SELECT, "f", user_id, ids).await?;
        Ok(records.into_iter().map(AnnotationRecord::to_favorite).collect())
    }

    async fn create_lesson(&self, lesson: NewLesson) -> PortResult<Lesson> {
        let sql = format!(
            r#"INSERT INTO lessons (id, user_id, sermon_id, "position", title, content, theme,
                source_verses, source_highlights, source_favorites)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
               RETURNING {LESSON_COLUMNS}"#
        );
        let record = sqlx::query_as::<_, LessonRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(lesson.user_id)
            .bind(lesson.sermon_id)
            .bind(lesson.position)
            .bind(lesson.title)
            .bind(lesson.content)
            .bind(lesson.theme)
            .bind(lesson.source_verses)
            .bind(lesson.source_highlights)
            .bind(lesson.source_favorites)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_lesson_by_id(&self, lesson_id: Uuid) -> PortResult<Lesson> {
        let sql = format!("SELECT {LESSON_COLUMNS} FROM lessons WHERE id = $1");
        let record = sqlx::query_as::<_, LessonRecord>(&sql)
            .bind(lesson_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    PortError::NotFound(format!("Lesson {} not found", lesson_id))
                }
                _ => unexpected(e),
            })?;
        Ok(record.to_domain())
    }

    async fn get_lessons_for_user(&self, user_id: Uuid) -> PortResult<Vec<Lesson>> {
        let sql = format!(
            "SELECT {LESSON_COLUMNS} FROM lessons WHERE user_id = $1 ORDER BY created_at DESC, id"
        );
        let records = sqlx::query_as::<_, LessonRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(LessonRecord::to_domain).collect())
    }

    async fn set_lesson_placement(
        &self,
        lesson_id: Uuid,
        sermon_id: Option<Uuid>,
        position: i32,
    ) -> PortResult<()> {
        let result = sqlx::query(r#"UPDATE lessons SET sermon_id = $1, "position" = $2 WHERE id = $3"#)
            .bind(sermon_id)
            .bind(position)
            .bind(lesson_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Lesson {} not found", lesson_id)));
        }
        Ok(())
    }

    async fn create_sermon(&self, sermon: NewSermon) -> PortResult<Sermon> {
        let sql = format!(
            r#"INSERT INTO sermons (id, user_id, title, description, share_token, is_public)
               VALUES ($1, $2, $3, $4, $5, $6)
               RETURNING {SERMON_COLUMNS}"#
        );
        let record = sqlx::query_as::<_, SermonRecord>(&sql)
            .bind(Uuid::new_v4())
            .bind(sermon.user_id)
            .bind(sermon.title)
            .bind(sermon.description)
            .bind(sermon.share_token)
            .bind(sermon.is_public)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(record.to_domain())
    }

    async fn get_sermon_by_id(&self, sermon_id: Uuid) -> PortResult<Sermon> {
        let sql = format!("SELECT {SERMON_COLUMNS} FROM sermons WHERE id = $1");
        let record = sqlx::query_as::<_, SermonRecord>(&sql)
            .bind(sermon_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => {
                    PortError::NotFound(format!("Sermon {} not found", sermon_id))
                }
                _ => unexpected(e),
            })?;
        Ok(record.to_domain())
    }

    async fn get_sermon_by_share_token(&self, token: &str) -> PortResult<Sermon> {
        let sql = format!("SELECT {SERMON_COLUMNS} FROM sermons WHERE share_token = $1");
        let record = sqlx::query_as::<_, SermonRecord>(&sql)
            .bind(token)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| match e {
                sqlx::Error::RowNotFound => PortError::NotFound("Sermon not found".to_string()),
                _ => unexpected(e),
            })?;
        Ok(record.to_domain())
    }

    async fn get_sermons_for_user(&self, user_id: Uuid) -> PortResult<Vec<Sermon>> {
        let sql = format!(
            "SELECT {SERMON_COLUMNS} FROM sermons WHERE user_id = $1 ORDER BY created_at DESC, id"
        );
        let records = sqlx::query_as::<_, SermonRecord>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(SermonRecord::to_domain).collect())
    }

    async fn get_lessons_for_sermon(&self, sermon_id: Uuid) -> PortResult<Vec<Lesson>> {
        let sql = format!(
            r#"SELECT {LESSON_COLUMNS} FROM lessons WHERE sermon_id = $1 ORDER BY "position""#
        );
        let records = sqlx::query_as::<_, LessonRecord>(&sql)
            .bind(sermon_id)
            .fetch_all(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(records.into_iter().map(LessonRecord::to_domain).collect())
    }

    async fn count_lessons_in_sermon(&self, sermon_id: Uuid) -> PortResult<i64> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM lessons WHERE sermon_id = $1")
            .bind(sermon_id)
            .fetch_one(&self.pool)
            .await
            .map_err(unexpected)
    }

    async fn set_sermon_analysis(
        &self,
        sermon_id: Uuid,
        detected_theme: &str,
        analysis: &str,
    ) -> PortResult<()> {
        let result = sqlx::query("UPDATE sermons SET detected_theme = $1, analysis = $2 WHERE id = $3")
            .bind(detected_theme)
            .bind(analysis)
            .bind(sermon_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Sermon {} not found", sermon_id)));
        }
        Ok(())
    }

    async fn set_sermon_visibility(&self, sermon_id: Uuid, is_public: bool) -> PortResult<()> {
        let result = sqlx::query("UPDATE sermons SET is_public = $1 WHERE id = $2")
            .bind(is_public)
            .bind(sermon_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Sermon {} not found", sermon_id)));
        }
        Ok(())
    }
}

/// Runs one of the annotation selects, optionally restricted to an id
/// allow-list, ordered by creation so aggregation stays deterministic.
async fn fetch_annotations(
    pool: &PgPool,
    base_select: &str,
    alias: &str,
    user_id: Uuid,
    ids: &[Uuid],
) -> PortResult<Vec<AnnotationRecord>> {
    let sql = if ids.is_empty() {
        format!("{base_select} ORDER BY {alias}.created_at, {alias}.id")
    } else {
        format!(
            "{base_select} AND {alias}.id = ANY($2) ORDER BY {alias}.created_at, {alias}.id"
        )
    };

    let mut query = sqlx::query_as::<_, AnnotationRecord>(&sql).bind(user_id);
    if !ids.is_empty() {
        query = query.bind(ids.to_vec());
    }
    query.fetch_all(pool).await.map_err(unexpected)
}
