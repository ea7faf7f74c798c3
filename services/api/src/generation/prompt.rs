//! services/api/src/generation/prompt.rs
//!
//! Prompt composition for the three generation call sites. Every function
//! here is pure string construction: no I/O, no timestamps, no randomness,
//! so identical inputs always produce byte-identical prompts.

use devotional_core::domain::Lesson;

use crate::generation::source::VerseContext;

/// System-role instruction shared by all three call sites.
pub const JSON_SYSTEM_INSTRUCTION: &str =
    "You are a thoughtful devotional writer. Always respond with valid JSON.";

/// How much of each lesson body feeds the sermon analysis prompt.
pub const LESSON_EXCERPT_CHARS: usize = 500;

/// Renders the aggregated verse entries as a single text block:
/// `Reference: "Text"` with the user's note appended when present,
/// entries separated by a blank line.
pub fn render_context(entries: &[VerseContext]) -> String {
    entries
        .iter()
        .map(|entry| {
            let mut line = format!("{}: \"{}\"", entry.reference, entry.text);
            if let Some(note) = entry.note.as_deref().filter(|n| !n.trim().is_empty()) {
                line.push_str(&format!(" (User's note: {})", note));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The full lesson-generation instruction document.
pub fn lesson_prompt(context: &str, theme: Option<&str>) -> String {
    let theme_directive = match theme {
        Some(theme) => format!("Center the entire lesson on this theme: \"{}\".", theme),
        None => "Derive a single unifying proposition from the passages below and center the lesson on it.".to_string(),
    };

    format!(
        r#"Write a devotional lesson from the following scripture passages.

{theme_directive}

Scripture passages:

{context}

The lesson must follow this structure:
- Proposition: one sentence stating the lesson's central claim.
- Introduction: an attention-getter, an introduction of the subject and the text, and a transition sentence.
- 2-3 Main Points, each broken down into an Explanation, an Application, and an Illustration.
- Conclusion: a summary, an exhortation, and a closing prayer.

Respond with a JSON object containing exactly these keys:
- "title": a lesson title of 5-10 words
- "detected_theme": the single theme the lesson centers on
- "content": the full lesson as markdown, with ## headers for Proposition, Introduction, each Main Point, and Conclusion, and ### headers for their subsections"#
    )
}

/// Asks for exactly `count` short thematic labels as a JSON string array.
pub fn themes_prompt(context: &str, count: usize) -> String {
    format!(
        r#"Read the following scripture passages and propose exactly {count} short themes, each 2-4 words long, that could each anchor a separate devotional lesson.

Scripture passages:

{context}

Respond with a JSON array of exactly {count} strings and nothing else."#
    )
}

/// Summarizes a sermon's lessons and asks for a unifying theme plus a
/// closing narrative analysis as a two-key JSON object.
pub fn analysis_prompt(lessons: &[Lesson]) -> String {
    let summaries = lessons
        .iter()
        .map(|lesson| {
            let excerpt: String = lesson.content.chars().take(LESSON_EXCERPT_CHARS).collect();
            format!(
                "Title: {}\nTheme: {}\nExcerpt: {}",
                lesson.title,
                lesson.theme.as_deref().unwrap_or("General"),
                excerpt
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        r#"Below are the lessons of a sermon series.

{summaries}

Identify the theme unifying these lessons in 3-5 words, and write a 200-300 word closing narrative analysis that ties the lessons together.

Respond with a JSON object containing exactly these keys:
- "detected_theme": the unifying theme
- "analysis": the closing narrative analysis"#
    )
}
