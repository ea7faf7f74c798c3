//! services/api/src/test_support.rs
//!
//! In-memory port implementations shared by the unit tests: a vec-backed
//! `DatabaseService` and a scripted `TextGenerationService` that records
//! every request it receives.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use devotional_core::domain::{
    new_share_token, AnnotatedVerse, Favorite, Highlight, HighlightColor, Lesson, NewLesson,
    NewSermon, Sermon,
};
use devotional_core::ports::{
    DatabaseService, GenerationRequest, PortError, PortResult, TextGenerationService,
};
use uuid::Uuid;

pub fn verse(book: &str, chapter: i32, number: i32, text: &str) -> AnnotatedVerse {
    AnnotatedVerse {
        id: Uuid::new_v4(),
        book_name: Some(book.to_string()),
        chapter_number: Some(chapter),
        verse_number: Some(number),
        text: text.to_string(),
    }
}

pub fn highlight(
    user_id: Uuid,
    verse: AnnotatedVerse,
    color: HighlightColor,
    note: Option<&str>,
) -> Highlight {
    Highlight {
        id: Uuid::new_v4(),
        user_id,
        verse,
        color,
        note: note.map(str::to_string),
    }
}

pub fn favorite(user_id: Uuid, verse: AnnotatedVerse, note: Option<&str>) -> Favorite {
    Favorite {
        id: Uuid::new_v4(),
        user_id,
        verse,
        note: note.map(str::to_string),
    }
}

/// Replays a scripted list of completion results and records every request.
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<PortResult<String>>>,
    pub calls: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<PortResult<String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl TextGenerationService for ScriptedLlm {
    async fn complete(&self, request: &GenerationRequest) -> PortResult<String> {
        self.calls.lock().unwrap().push(request.clone());
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(PortError::Unexpected("no scripted response left".to_string())))
    }
}

/// A vec-backed `DatabaseService` for tests.
#[derive(Default)]
pub struct MemoryDb {
    pub highlights: Mutex<Vec<Highlight>>,
    pub favorites: Mutex<Vec<Favorite>>,
    pub lessons: Mutex<Vec<Lesson>>,
    pub sermons: Mutex<Vec<Sermon>>,
    /// When set, `set_sermon_analysis` fails, for exercising the
    /// best-effort persistence paths.
    pub fail_analysis_writes: AtomicBool,
}

impl MemoryDb {
    pub fn seed_sermon(&self, user_id: Uuid, title: &str) -> Sermon {
        let sermon = Sermon {
            id: Uuid::new_v4(),
            user_id,
            title: title.to_string(),
            description: None,
            share_token: new_share_token(),
            is_public: false,
            detected_theme: None,
            analysis: None,
            created_at: Utc::now(),
        };
        self.sermons.lock().unwrap().push(sermon.clone());
        sermon
    }

    pub fn seed_lesson(&self, user_id: Uuid, title: &str) -> Lesson {
        let lesson = Lesson {
            id: Uuid::new_v4(),
            user_id,
            sermon_id: None,
            position: 0,
            title: title.to_string(),
            content: format!("Body of {}", title),
            theme: Some("General".to_string()),
            source_verses: vec![],
            source_highlights: vec![],
            source_favorites: vec![],
            created_at: Utc::now(),
        };
        self.lessons.lock().unwrap().push(lesson.clone());
        lesson
    }
}

#[async_trait]
impl DatabaseService for MemoryDb {
    async fn get_highlights_for_user(
        &self,
        user_id: Uuid,
        ids: &[Uuid],
    ) -> PortResult<Vec<Highlight>> {
        Ok(self
            .highlights
            .lock()
            .unwrap()
            .iter()
            .filter(|h| h.user_id == user_id && (ids.is_empty() || ids.contains(&h.id)))
            .cloned()
            .collect())
    }

    async fn get_favorites_for_user(
        &self,
        user_id: Uuid,
        ids: &[Uuid],
    ) -> PortResult<Vec<Favorite>> {
        Ok(self
            .favorites
            .lock()
            .unwrap()
            .iter()
            .filter(|f| f.user_id == user_id && (ids.is_empty() || ids.contains(&f.id)))
            .cloned()
            .collect())
    }

    async fn create_lesson(&self, lesson: NewLesson) -> PortResult<Lesson> {
        let lesson = Lesson {
            id: Uuid::new_v4(),
            user_id: lesson.user_id,
            sermon_id: lesson.sermon_id,
            position: lesson.position,
            title: lesson.title,
            content: lesson.content,
            theme: lesson.theme,
            source_verses: lesson.source_verses,
            source_highlights: lesson.source_highlights,
            source_favorites: lesson.source_favorites,
            created_at: Utc::now(),
        };
        self.lessons.lock().unwrap().push(lesson.clone());
        Ok(lesson)
    }

    async fn get_lesson_by_id(&self, lesson_id: Uuid) -> PortResult<Lesson> {
        self.lessons
            .lock()
            .unwrap()
            .iter()
            .find(|l| l.id == lesson_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Lesson {} not found", lesson_id)))
    }

    async fn get_lessons_for_user(&self, user_id: Uuid) -> PortResult<Vec<Lesson>> {
        Ok(self
            .lessons
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn set_lesson_placement(
        &self,
        lesson_id: Uuid,
        sermon_id: Option<Uuid>,
        position: i32,
    ) -> PortResult<()> {
        let mut lessons = self.lessons.lock().unwrap();
        let lesson = lessons
            .iter_mut()
            .find(|l| l.id == lesson_id)
            .ok_or_else(|| PortError::NotFound(format!("Lesson {} not found", lesson_id)))?;
        lesson.sermon_id = sermon_id;
        lesson.position = position;
        Ok(())
    }

    async fn create_sermon(&self, sermon: NewSermon) -> PortResult<Sermon> {
        let sermon = Sermon {
            id: Uuid::new_v4(),
            user_id: sermon.user_id,
            title: sermon.title,
            description: sermon.description,
            share_token: sermon.share_token,
            is_public: sermon.is_public,
            detected_theme: None,
            analysis: None,
            created_at: Utc::now(),
        };
        self.sermons.lock().unwrap().push(sermon.clone());
        Ok(sermon)
    }

    async fn get_sermon_by_id(&self, sermon_id: Uuid) -> PortResult<Sermon> {
        self.sermons
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id == sermon_id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("Sermon {} not found", sermon_id)))
    }

    async fn get_sermon_by_share_token(&self, token: &str) -> PortResult<Sermon> {
        self.sermons
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.share_token == token)
            .cloned()
            .ok_or_else(|| PortError::NotFound("Sermon not found".to_string()))
    }

    async fn get_sermons_for_user(&self, user_id: Uuid) -> PortResult<Vec<Sermon>> {
        Ok(self
            .sermons
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn get_lessons_for_sermon(&self, sermon_id: Uuid) -> PortResult<Vec<Lesson>> {
        let mut lessons: Vec<Lesson> = self
            .lessons
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.sermon_id == Some(sermon_id))
            .cloned()
            .collect();
        lessons.sort_by_key(|l| l.position);
        Ok(lessons)
    }

    async fn count_lessons_in_sermon(&self, sermon_id: Uuid) -> PortResult<i64> {
        Ok(self
            .lessons
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.sermon_id == Some(sermon_id))
            .count() as i64)
    }

    async fn set_sermon_analysis(
        &self,
        sermon_id: Uuid,
        detected_theme: &str,
        analysis: &str,
    ) -> PortResult<()> {
        if self.fail_analysis_writes.load(Ordering::SeqCst) {
            return Err(PortError::Unexpected("analysis write rejected".to_string()));
        }
        let mut sermons = self.sermons.lock().unwrap();
        let sermon = sermons
            .iter_mut()
            .find(|s| s.id == sermon_id)
            .ok_or_else(|| PortError::NotFound(format!("Sermon {} not found", sermon_id)))?;
        sermon.detected_theme = Some(detected_theme.to_string());
        sermon.analysis = Some(analysis.to_string());
        Ok(())
    }

    async fn set_sermon_visibility(&self, sermon_id: Uuid, is_public: bool) -> PortResult<()> {
        let mut sermons = self.sermons.lock().unwrap();
        let sermon = sermons
            .iter_mut()
            .find(|s| s.id == sermon_id)
            .ok_or_else(|| PortError::NotFound(format!("Sermon {} not found", sermon_id)))?;
        sermon.is_public = is_public;
        Ok(())
    }
}
