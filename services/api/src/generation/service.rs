//! services/api/src/generation/service.rs
//!
//! The orchestrating service: aggregate source material, compose a prompt,
//! run the generation call, extract the structure and persist the result.

use std::sync::Arc;

use devotional_core::domain::{
    new_share_token, Lesson, NewLesson, NewSermon, Sermon, SermonAnalysis, SermonWithLessons,
};
use devotional_core::ports::{DatabaseService, GenerationRequest, TextGenerationService};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::generation::extract::{self, FALLBACK_THEME, FALLBACK_TITLE};
use crate::generation::source::{self, SourceMaterial};
use crate::generation::{prompt, GenerateError};

/// Theme used when theme detection returns something other than an array.
pub const DEFAULT_THEME: &str = "Faith and Life";

/// Analysis text persisted when the analysis call fails or comes back
/// without the required keys.
pub const ANALYSIS_UNAVAILABLE: &str = "Unable to generate analysis at this time.";

const DEFAULT_LESSON_COUNT: usize = 3;

/// Sampling and budget settings for the three generation call sites.
#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub temperature: f32,
    pub lesson_max_tokens: u32,
    pub theme_max_tokens: u32,
    pub analysis_max_tokens: u32,
}

impl GenerationSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            model: config.generation_model.clone(),
            temperature: config.generation_temperature,
            lesson_max_tokens: config.lesson_max_tokens,
            theme_max_tokens: config.theme_max_tokens,
            analysis_max_tokens: config.analysis_max_tokens,
        }
    }
}

/// Options for a single lesson generation. Empty id lists mean
/// "use all of the user's highlights/favorites".
#[derive(Debug, Clone, Default)]
pub struct LessonGenerationOptions {
    pub theme: Option<String>,
    pub highlight_ids: Vec<Uuid>,
    pub favorite_ids: Vec<Uuid>,
    pub sermon_id: Option<Uuid>,
}

/// Options for generating a whole sermon. With no explicit themes,
/// `lesson_count` themes are detected from the user's annotations.
#[derive(Debug, Clone)]
pub struct SermonGenerationOptions {
    pub description: Option<String>,
    pub lesson_count: usize,
    pub themes: Vec<String>,
}

impl Default for SermonGenerationOptions {
    fn default() -> Self {
        Self {
            description: None,
            lesson_count: DEFAULT_LESSON_COUNT,
            themes: Vec::new(),
        }
    }
}

/// Generates lessons and sermons from a user's annotated verses.
pub struct LessonGenerator {
    db: Arc<dyn DatabaseService>,
    llm: Arc<dyn TextGenerationService>,
    settings: GenerationSettings,
    /// Serializes position assignment so two concurrent writes to the same
    /// sermon cannot observe the same lesson count.
    positions: Mutex<()>,
}

impl LessonGenerator {
    pub fn new(
        db: Arc<dyn DatabaseService>,
        llm: Arc<dyn TextGenerationService>,
        settings: GenerationSettings,
    ) -> Self {
        Self {
            db,
            llm,
            settings,
            positions: Mutex::new(()),
        }
    }

    pub(crate) fn position_lock(&self) -> &Mutex<()> {
        &self.positions
    }

    /// Generates and persists one lesson from the user's annotations.
    ///
    /// Nothing is written until the generation call has succeeded, so a
    /// failure leaves no partial lesson behind.
    pub async fn generate_lesson(
        &self,
        user_id: Uuid,
        options: LessonGenerationOptions,
    ) -> Result<Lesson, GenerateError> {
        let highlights = self
            .db
            .get_highlights_for_user(user_id, &options.highlight_ids)
            .await?;
        let favorites = self
            .db
            .get_favorites_for_user(user_id, &options.favorite_ids)
            .await?;
        let material = source::aggregate(&highlights, &favorites)?;

        self.generate_lesson_from_material(
            user_id,
            &material,
            options.theme.as_deref(),
            options.sermon_id,
        )
        .await
    }

    /// Generates a sermon: detect themes (unless supplied), create the
    /// sermon, generate one lesson per theme in order, then attach a
    /// best-effort analysis.
    pub async fn generate_sermon(
        &self,
        user_id: Uuid,
        title: &str,
        options: SermonGenerationOptions,
    ) -> Result<SermonWithLessons, GenerateError> {
        let highlights = self.db.get_highlights_for_user(user_id, &[]).await?;
        let favorites = self.db.get_favorites_for_user(user_id, &[]).await?;
        let material = source::aggregate(&highlights, &favorites)?;
        let context = prompt::render_context(&material.entries);

        let themes = if options.themes.is_empty() {
            self.detect_themes(&context, options.lesson_count).await?
        } else {
            options.themes
        };

        let sermon = self
            .db
            .create_sermon(NewSermon {
                user_id,
                title: title.to_string(),
                description: options.description,
                share_token: new_share_token(),
                is_public: false,
            })
            .await?;
        info!(sermon_id = %sermon.id, lesson_count = themes.len(), "generating sermon");

        let mut lessons = Vec::with_capacity(themes.len());
        for theme in &themes {
            let lesson = self
                .generate_lesson_from_material(user_id, &material, Some(theme), Some(sermon.id))
                .await?;
            lessons.push(lesson);
        }

        let analysis = self.generate_sermon_analysis(&sermon, &lessons).await;
        if let Err(e) = self
            .db
            .set_sermon_analysis(sermon.id, &analysis.detected_theme, &analysis.analysis)
            .await
        {
            warn!(sermon_id = %sermon.id, "failed to store sermon analysis: {}", e);
        }

        let sermon = self.db.get_sermon_by_id(sermon.id).await?;
        Ok(SermonWithLessons { sermon, lessons })
    }

    /// Asks the model for `count` short thematic labels.
    ///
    /// A non-array response falls back to `count` copies of
    /// [`DEFAULT_THEME`]; an over-long array is truncated, a short one is
    /// accepted as-is.
    pub async fn detect_themes(
        &self,
        context: &str,
        count: usize,
    ) -> Result<Vec<String>, GenerateError> {
        let raw = self
            .complete(prompt::themes_prompt(context, count), self.settings.theme_max_tokens)
            .await?;
        let value = extract::extract_structure(&raw);

        let themes = match value.as_array() {
            Some(items) => {
                let mut themes: Vec<String> = items
                    .iter()
                    .filter_map(|item| item.as_str().map(str::to_string))
                    .collect();
                themes.truncate(count);
                themes
            }
            None => {
                warn!("theme detection returned a non-array response; using the default theme");
                vec![DEFAULT_THEME.to_string(); count]
            }
        };
        Ok(themes)
    }

    /// Synthesizes a unifying theme and closing narrative for a sermon.
    ///
    /// Never fails: an API error, malformed output or a response missing
    /// either key all yield the sermon's own title plus a fixed notice.
    pub async fn generate_sermon_analysis(
        &self,
        sermon: &Sermon,
        lessons: &[Lesson],
    ) -> SermonAnalysis {
        let fallback = || SermonAnalysis {
            detected_theme: sermon.title.clone(),
            analysis: ANALYSIS_UNAVAILABLE.to_string(),
        };

        let raw = match self
            .complete(prompt::analysis_prompt(lessons), self.settings.analysis_max_tokens)
            .await
        {
            Ok(raw) => raw,
            Err(e) => {
                warn!(sermon_id = %sermon.id, "sermon analysis generation failed: {}", e);
                return fallback();
            }
        };

        let value = extract::extract_structure(&raw);
        let theme = value.get("detected_theme").and_then(Value::as_str);
        let analysis = value.get("analysis").and_then(Value::as_str);
        match (theme, analysis) {
            (Some(theme), Some(analysis)) => SermonAnalysis {
                detected_theme: theme.to_string(),
                analysis: analysis.to_string(),
            },
            _ => {
                warn!(sermon_id = %sermon.id, "sermon analysis response missing required keys");
                fallback()
            }
        }
    }

    /// Regenerates and persists a sermon's analysis after its lesson set
    /// changed. Best-effort: every failure is logged and swallowed so the
    /// triggering mutation is never blocked.
    pub async fn refresh_sermon_analysis(&self, sermon_id: Uuid) {
        let sermon = match self.db.get_sermon_by_id(sermon_id).await {
            Ok(sermon) => sermon,
            Err(e) => {
                warn!(sermon_id = %sermon_id, "skipping analysis refresh, sermon load failed: {}", e);
                return;
            }
        };
        let lessons = match self.db.get_lessons_for_sermon(sermon_id).await {
            Ok(lessons) => lessons,
            Err(e) => {
                warn!(sermon_id = %sermon_id, "skipping analysis refresh, lesson load failed: {}", e);
                return;
            }
        };

        let analysis = self.generate_sermon_analysis(&sermon, &lessons).await;
        if let Err(e) = self
            .db
            .set_sermon_analysis(sermon_id, &analysis.detected_theme, &analysis.analysis)
            .await
        {
            warn!(sermon_id = %sermon_id, "failed to store refreshed sermon analysis: {}", e);
        }
    }

    async fn generate_lesson_from_material(
        &self,
        user_id: Uuid,
        material: &SourceMaterial,
        theme: Option<&str>,
        sermon_id: Option<Uuid>,
    ) -> Result<Lesson, GenerateError> {
        let context = prompt::render_context(&material.entries);
        let raw = self
            .complete(
                prompt::lesson_prompt(&context, theme),
                self.settings.lesson_max_tokens,
            )
            .await?;
        let structure = extract::extract_structure(&raw);

        let title = structure
            .get("title")
            .and_then(Value::as_str)
            .unwrap_or(FALLBACK_TITLE)
            .to_string();
        let content = structure
            .get("content")
            .and_then(Value::as_str)
            .unwrap_or(&raw)
            .to_string();
        let detected_theme = structure
            .get("detected_theme")
            .and_then(Value::as_str)
            .unwrap_or(FALLBACK_THEME);
        // The explicit theme wins; the model's detected theme fills in
        // otherwise.
        let theme = theme.map(str::to_string).unwrap_or_else(|| detected_theme.to_string());

        let new_lesson = |position: i32| NewLesson {
            user_id,
            sermon_id,
            position,
            title: title.clone(),
            content: content.clone(),
            theme: Some(theme.clone()),
            source_verses: material.verse_ids.clone(),
            source_highlights: material.highlight_ids.clone(),
            source_favorites: material.favorite_ids.clone(),
        };

        let lesson = match sermon_id {
            Some(sermon_id) => {
                // Count and insert under the lock so the appended position
                // stays dense under concurrent requests.
                let _guard = self.positions.lock().await;
                let position = self.db.count_lessons_in_sermon(sermon_id).await? as i32;
                self.db.create_lesson(new_lesson(position)).await?
            }
            None => self.db.create_lesson(new_lesson(0)).await?,
        };

        info!(lesson_id = %lesson.id, position = lesson.position, "lesson generated");
        Ok(lesson)
    }

    async fn complete(&self, prompt_text: String, max_output_tokens: u32) -> Result<String, GenerateError> {
        let request = GenerationRequest {
            system: prompt::JSON_SYSTEM_INSTRUCTION.to_string(),
            prompt: prompt_text,
            model: self.settings.model.clone(),
            temperature: self.settings.temperature,
            max_output_tokens,
        };
        self.llm
            .complete(&request)
            .await
            .map_err(|e| GenerateError::GenerationFailure(e.to_string()))
    }
}
