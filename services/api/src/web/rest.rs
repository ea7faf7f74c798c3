//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the REST API endpoints and the master
//! definition for the OpenAPI specification.

use crate::generation::{GenerateError, LessonGenerationOptions, SermonGenerationOptions};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use devotional_core::domain::{Lesson, Sermon, SermonWithLessons};
use devotional_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::error;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        generate_lesson_handler,
        list_lessons_handler,
        generate_sermon_handler,
        combine_sermon_handler,
        list_sermons_handler,
        get_sermon_handler,
        add_lesson_handler,
        remove_lesson_handler,
        set_visibility_handler,
        shared_sermon_handler,
    ),
    components(
        schemas(
            GenerateLessonRequest,
            GenerateSermonRequest,
            CombineSermonRequest,
            VisibilityRequest,
            LessonResponse,
            SermonResponse,
            SermonSummaryResponse,
        )
    ),
    tags(
        (name = "Devotional API", description = "API endpoints for AI-assisted devotional lessons and sermons.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Request and Response Structs
//=========================================================================================

/// Request payload for generating a single lesson.
#[derive(Deserialize, ToSchema)]
pub struct GenerateLessonRequest {
    /// Center the lesson on this theme instead of deriving one.
    pub theme: Option<String>,
    /// Restrict generation to these highlights; empty means all.
    #[serde(default)]
    pub highlight_ids: Vec<Uuid>,
    /// Restrict generation to these favorites; empty means all.
    #[serde(default)]
    pub favorite_ids: Vec<Uuid>,
    /// Append the lesson to this sermon.
    pub sermon_id: Option<Uuid>,
}

/// Request payload for generating a whole sermon.
#[derive(Deserialize, ToSchema)]
pub struct GenerateSermonRequest {
    pub title: String,
    pub description: Option<String>,
    /// How many lessons to plan when no themes are supplied.
    pub lesson_count: Option<usize>,
    /// Explicit themes, one lesson each; empty means auto-detect.
    #[serde(default)]
    pub themes: Vec<String>,
}

/// Request payload for combining existing lessons into a sermon.
#[derive(Deserialize, ToSchema)]
pub struct CombineSermonRequest {
    pub title: String,
    pub description: Option<String>,
    /// Lesson ids in the order they should appear.
    pub lesson_ids: Vec<Uuid>,
}

#[derive(Deserialize, ToSchema)]
pub struct VisibilityRequest {
    pub is_public: bool,
}

#[derive(Serialize, ToSchema)]
pub struct LessonResponse {
    pub id: Uuid,
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

impl From<Lesson> for LessonResponse {
    fn from(lesson: Lesson) -> Self {
        Self {
            id: lesson.id,
            sermon_id: lesson.sermon_id,
            position: lesson.position,
            title: lesson.title,
            content: lesson.content,
            theme: lesson.theme,
            source_verses: lesson.source_verses,
            source_highlights: lesson.source_highlights,
            source_favorites: lesson.source_favorites,
            created_at: lesson.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SermonSummaryResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub share_token: String,
    pub is_public: bool,
    pub detected_theme: Option<String>,
    pub analysis: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<Sermon> for SermonSummaryResponse {
    fn from(sermon: Sermon) -> Self {
        Self {
            id: sermon.id,
            title: sermon.title,
            description: sermon.description,
            share_token: sermon.share_token,
            is_public: sermon.is_public,
            detected_theme: sermon.detected_theme,
            analysis: sermon.analysis,
            created_at: sermon.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SermonResponse {
    #[serde(flatten)]
    pub sermon: SermonSummaryResponse,
    pub lessons: Vec<LessonResponse>,
}

impl From<SermonWithLessons> for SermonResponse {
    fn from(bundle: SermonWithLessons) -> Self {
        Self {
            sermon: bundle.sermon.into(),
            lessons: bundle.lessons.into_iter().map(LessonResponse::from).collect(),
        }
    }
}

//=========================================================================================
// Error Mapping Helpers
//=========================================================================================

fn user_id_from_headers(headers: &HeaderMap) -> Result<Uuid, (StatusCode, String)> {
    let raw = headers
        .get("x-user-id")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            (
                StatusCode::BAD_REQUEST,
                "x-user-id header is required".to_string(),
            )
        })?;
    Uuid::parse_str(raw).map_err(|_| {
        (
            StatusCode::BAD_REQUEST,
            "Invalid x-user-id format".to_string(),
        )
    })
}

fn port_error_response(err: PortError) -> (StatusCode, String) {
    match err {
        PortError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        PortError::Unexpected(msg) => {
            error!("port failure: {}", msg);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            )
        }
    }
}

fn generate_error_response(err: GenerateError) -> (StatusCode, String) {
    match err {
        GenerateError::EmptySourceMaterial => (
            StatusCode::UNPROCESSABLE_ENTITY,
            "You have no highlighted or favorited verses to generate from yet.".to_string(),
        ),
        GenerateError::GenerationFailure(reason) => {
            error!("generation failure: {}", reason);
            (
                StatusCode::BAD_GATEWAY,
                "Generation is unavailable right now. Please try again later.".to_string(),
            )
        }
        GenerateError::Port(err) => port_error_response(err),
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// Generate a devotional lesson from the user's highlights and favorites.
#[utoipa::path(
    post,
    path = "/lessons/generate",
    request_body = GenerateLessonRequest,
    responses(
        (status = 201, description = "Lesson generated successfully", body = LessonResponse),
        (status = 422, description = "No highlights or favorites to generate from"),
        (status = 502, description = "The generation API call failed")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn generate_lesson_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<GenerateLessonRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    let options = LessonGenerationOptions {
        theme: payload.theme,
        highlight_ids: payload.highlight_ids,
        favorite_ids: payload.favorite_ids,
        sermon_id: payload.sermon_id,
    };
    let lesson = app_state
        .generator
        .generate_lesson(user_id, options)
        .await
        .map_err(generate_error_response)?;
    Ok((StatusCode::CREATED, Json(LessonResponse::from(lesson))))
}

/// List the user's lessons.
#[utoipa::path(
    get,
    path = "/lessons",
    responses(
        (status = 200, description = "The user's lessons", body = [LessonResponse])
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn list_lessons_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    let lessons = app_state
        .db
        .get_lessons_for_user(user_id)
        .await
        .map_err(port_error_response)?;
    let body: Vec<LessonResponse> = lessons.into_iter().map(LessonResponse::from).collect();
    Ok(Json(body))
}

/// Generate a sermon: plan themes, generate one lesson per theme, and
/// synthesize a closing analysis.
#[utoipa::path(
    post,
    path = "/sermons/generate",
    request_body = GenerateSermonRequest,
    responses(
        (status = 201, description = "Sermon generated successfully", body = SermonResponse),
        (status = 422, description = "No highlights or favorites to generate from"),
        (status = 502, description = "The generation API call failed")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn generate_sermon_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<GenerateSermonRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    let mut options = SermonGenerationOptions {
        description: payload.description,
        themes: payload.themes,
        ..Default::default()
    };
    if let Some(lesson_count) = payload.lesson_count {
        options.lesson_count = lesson_count;
    }
    let sermon = app_state
        .generator
        .generate_sermon(user_id, &payload.title, options)
        .await
        .map_err(generate_error_response)?;
    Ok((StatusCode::CREATED, Json(SermonResponse::from(sermon))))
}

/// Combine existing lessons into a new sermon, in the submitted order.
#[utoipa::path(
    post,
    path = "/sermons/combine",
    request_body = CombineSermonRequest,
    responses(
        (status = 201, description = "Sermon created from lessons", body = SermonResponse),
        (status = 404, description = "A submitted lesson does not exist or is not yours")
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn combine_sermon_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(payload): Json<CombineSermonRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    let sermon = app_state
        .sermons
        .combine_lessons(user_id, &payload.title, payload.description, &payload.lesson_ids)
        .await
        .map_err(port_error_response)?;
    Ok((StatusCode::CREATED, Json(SermonResponse::from(sermon))))
}

/// List the user's sermons.
#[utoipa::path(
    get,
    path = "/sermons",
    responses(
        (status = 200, description = "The user's sermons", body = [SermonSummaryResponse])
    ),
    params(
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn list_sermons_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    let sermons = app_state
        .db
        .get_sermons_for_user(user_id)
        .await
        .map_err(port_error_response)?;
    let body: Vec<SermonSummaryResponse> = sermons
        .into_iter()
        .map(SermonSummaryResponse::from)
        .collect();
    Ok(Json(body))
}

/// Fetch one of the user's sermons with its lessons.
#[utoipa::path(
    get,
    path = "/sermons/{sermon_id}",
    responses(
        (status = 200, description = "The sermon with its lessons", body = SermonResponse),
        (status = 404, description = "Sermon not found")
    ),
    params(
        ("sermon_id" = Uuid, Path, description = "The sermon to fetch."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn get_sermon_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(sermon_id): Path<Uuid>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    let sermon = app_state
        .sermons
        .sermon_with_lessons(user_id, sermon_id)
        .await
        .map_err(port_error_response)?;
    Ok(Json(SermonResponse::from(sermon)))
}

/// Append an existing lesson to a sermon.
#[utoipa::path(
    post,
    path = "/sermons/{sermon_id}/lessons/{lesson_id}",
    responses(
        (status = 200, description = "Lesson added", body = LessonResponse),
        (status = 404, description = "Sermon or lesson not found")
    ),
    params(
        ("sermon_id" = Uuid, Path, description = "The sermon to add to."),
        ("lesson_id" = Uuid, Path, description = "The lesson to add."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn add_lesson_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((sermon_id, lesson_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    let lesson = app_state
        .sermons
        .add_lesson(user_id, sermon_id, lesson_id)
        .await
        .map_err(port_error_response)?;
    Ok(Json(LessonResponse::from(lesson)))
}

/// Remove a lesson from a sermon, closing the position gap it leaves.
#[utoipa::path(
    delete,
    path = "/sermons/{sermon_id}/lessons/{lesson_id}",
    responses(
        (status = 204, description = "Lesson removed"),
        (status = 404, description = "Sermon or lesson not found")
    ),
    params(
        ("sermon_id" = Uuid, Path, description = "The sermon to remove from."),
        ("lesson_id" = Uuid, Path, description = "The lesson to remove."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn remove_lesson_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path((sermon_id, lesson_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    app_state
        .sermons
        .remove_lesson(user_id, sermon_id, lesson_id)
        .await
        .map_err(port_error_response)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Make a sermon public (shareable via its token) or private.
#[utoipa::path(
    patch,
    path = "/sermons/{sermon_id}/visibility",
    request_body = VisibilityRequest,
    responses(
        (status = 200, description = "Visibility updated", body = SermonSummaryResponse),
        (status = 404, description = "Sermon not found")
    ),
    params(
        ("sermon_id" = Uuid, Path, description = "The sermon to update."),
        ("x-user-id" = Uuid, Header, description = "The unique ID of the user.")
    )
)]
pub async fn set_visibility_handler(
    State(app_state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(sermon_id): Path<Uuid>,
    Json(payload): Json<VisibilityRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let user_id = user_id_from_headers(&headers)?;
    let sermon = app_state
        .sermons
        .set_visibility(user_id, sermon_id, payload.is_public)
        .await
        .map_err(port_error_response)?;
    Ok(Json(SermonSummaryResponse::from(sermon)))
}

/// Fetch a publicly shared sermon by its share token. No user header
/// required.
#[utoipa::path(
    get,
    path = "/shared/{token}",
    responses(
        (status = 200, description = "The shared sermon", body = SermonResponse),
        (status = 404, description = "No public sermon with that token")
    ),
    params(
        ("token" = String, Path, description = "The sermon's share token.")
    )
)]
pub async fn shared_sermon_handler(
    State(app_state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let sermon = app_state
        .sermons
        .shared_sermon(&token)
        .await
        .map_err(port_error_response)?;
    Ok(Json(SermonResponse::from(sermon)))
}
