//! services/api/src/sermons.rs
//!
//! Sermon composition: attaching, removing and combining lessons while
//! keeping each sermon's positions a dense, zero-based sequence, and
//! refreshing the sermon analysis after every change.

use std::sync::Arc;

use devotional_core::domain::{new_share_token, Lesson, NewSermon, Sermon, SermonWithLessons};
use devotional_core::ports::{DatabaseService, PortError, PortResult};
use tracing::info;
use uuid::Uuid;

use crate::generation::LessonGenerator;

pub struct SermonService {
    db: Arc<dyn DatabaseService>,
    generator: Arc<LessonGenerator>,
}

impl SermonService {
    pub fn new(db: Arc<dyn DatabaseService>, generator: Arc<LessonGenerator>) -> Self {
        Self { db, generator }
    }

    /// Appends a lesson to a sermon at the next free position, then
    /// refreshes the sermon analysis best-effort.
    pub async fn add_lesson(
        &self,
        user_id: Uuid,
        sermon_id: Uuid,
        lesson_id: Uuid,
    ) -> PortResult<Lesson> {
        let sermon = self.owned_sermon(user_id, sermon_id).await?;
        let lesson = self.owned_lesson(user_id, lesson_id).await?;
        if lesson.sermon_id == Some(sermon.id) {
            return Ok(lesson);
        }

        {
            let _guard = self.generator.position_lock().lock().await;
            // A lesson can only sit in one sermon; pull it out of its
            // current one first so that sermon stays gap-free.
            if lesson.sermon_id.is_some() {
                self.detach_and_resequence(&lesson).await?;
            }
            let position = self.db.count_lessons_in_sermon(sermon.id).await? as i32;
            self.db
                .set_lesson_placement(lesson.id, Some(sermon.id), position)
                .await?;
            info!(sermon_id = %sermon.id, lesson_id = %lesson.id, position, "lesson added to sermon");
        }

        self.generator.refresh_sermon_analysis(sermon.id).await;
        self.db.get_lesson_by_id(lesson_id).await
    }

    /// Removes a lesson from a sermon, shifting every trailing lesson down
    /// one position and resetting the removed lesson to a standalone one.
    pub async fn remove_lesson(
        &self,
        user_id: Uuid,
        sermon_id: Uuid,
        lesson_id: Uuid,
    ) -> PortResult<()> {
        let sermon = self.owned_sermon(user_id, sermon_id).await?;
        let lesson = self.owned_lesson(user_id, lesson_id).await?;
        if lesson.sermon_id != Some(sermon.id) {
            return Err(PortError::NotFound(format!(
                "Lesson {} is not part of sermon {}",
                lesson_id, sermon_id
            )));
        }

        {
            let _guard = self.generator.position_lock().lock().await;
            self.detach_and_resequence(&lesson).await?;
            info!(sermon_id = %sermon.id, lesson_id = %lesson.id, "lesson removed from sermon");
        }

        self.generator.refresh_sermon_analysis(sermon.id).await;
        Ok(())
    }

    /// Creates a sermon from existing standalone lessons, adopting them at
    /// positions 0..M-1 in the submitted order.
    pub async fn combine_lessons(
        &self,
        user_id: Uuid,
        title: &str,
        description: Option<String>,
        lesson_ids: &[Uuid],
    ) -> PortResult<SermonWithLessons> {
        let mut lessons = Vec::with_capacity(lesson_ids.len());
        for lesson_id in lesson_ids {
            lessons.push(self.owned_lesson(user_id, *lesson_id).await?);
        }

        let sermon = self
            .db
            .create_sermon(NewSermon {
                user_id,
                title: title.to_string(),
                description,
                share_token: new_share_token(),
                is_public: false,
            })
            .await?;

        {
            let _guard = self.generator.position_lock().lock().await;
            for (position, lesson) in lessons.iter().enumerate() {
                if lesson.sermon_id.is_some() {
                    self.detach_and_resequence(lesson).await?;
                }
                self.db
                    .set_lesson_placement(lesson.id, Some(sermon.id), position as i32)
                    .await?;
            }
        }
        info!(sermon_id = %sermon.id, lesson_count = lesson_ids.len(), "sermon combined from lessons");

        self.generator.refresh_sermon_analysis(sermon.id).await;
        let sermon = self.db.get_sermon_by_id(sermon.id).await?;
        let lessons = self.db.get_lessons_for_sermon(sermon.id).await?;
        Ok(SermonWithLessons { sermon, lessons })
    }

    /// Flips the sermon's public share flag.
    pub async fn set_visibility(
        &self,
        user_id: Uuid,
        sermon_id: Uuid,
        is_public: bool,
    ) -> PortResult<Sermon> {
        self.owned_sermon(user_id, sermon_id).await?;
        self.db.set_sermon_visibility(sermon_id, is_public).await?;
        self.db.get_sermon_by_id(sermon_id).await
    }

    /// Loads one of the user's sermons together with its lessons.
    pub async fn sermon_with_lessons(
        &self,
        user_id: Uuid,
        sermon_id: Uuid,
    ) -> PortResult<SermonWithLessons> {
        let sermon = self.owned_sermon(user_id, sermon_id).await?;
        let lessons = self.db.get_lessons_for_sermon(sermon.id).await?;
        Ok(SermonWithLessons { sermon, lessons })
    }

    /// Looks up a sermon by share token. Private sermons stay invisible.
    pub async fn shared_sermon(&self, token: &str) -> PortResult<SermonWithLessons> {
        let sermon = self.db.get_sermon_by_share_token(token).await?;
        if !sermon.is_public {
            return Err(PortError::NotFound("Sermon not found".to_string()));
        }
        let lessons = self.db.get_lessons_for_sermon(sermon.id).await?;
        Ok(SermonWithLessons { sermon, lessons })
    }

    /// Clears the lesson's sermon reference and closes the position gap it
    /// leaves behind. Caller holds the position lock.
    async fn detach_and_resequence(&self, lesson: &Lesson) -> PortResult<()> {
        let sermon_id = match lesson.sermon_id {
            Some(id) => id,
            None => return Ok(()),
        };
        let siblings = self.db.get_lessons_for_sermon(sermon_id).await?;
        self.db.set_lesson_placement(lesson.id, None, 0).await?;
        for sibling in siblings.iter().filter(|s| s.position > lesson.position) {
            self.db
                .set_lesson_placement(sibling.id, Some(sermon_id), sibling.position - 1)
                .await?;
        }
        Ok(())
    }

    async fn owned_sermon(&self, user_id: Uuid, sermon_id: Uuid) -> PortResult<Sermon> {
        let sermon = self.db.get_sermon_by_id(sermon_id).await?;
        if sermon.user_id != user_id {
            return Err(PortError::NotFound(format!("Sermon {} not found", sermon_id)));
        }
        Ok(sermon)
    }

    async fn owned_lesson(&self, user_id: Uuid, lesson_id: Uuid) -> PortResult<Lesson> {
        let lesson = self.db.get_lesson_by_id(lesson_id).await?;
        if lesson.user_id != user_id {
            return Err(PortError::NotFound(format!("Lesson {} not found", lesson_id)));
        }
        Ok(lesson)
    }
}
