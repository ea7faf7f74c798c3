//! services/api/src/generation/source.rs
//!
//! Aggregates a user's annotated verses into the ordered, deduplicated
//! source material a generation prompt is built from.

use std::collections::HashSet;

use devotional_core::domain::{Favorite, Highlight, HighlightColor};
use uuid::Uuid;

use crate::generation::GenerateError;

/// Which annotation a context entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Highlight,
    Favorite,
}

/// One formatted verse record fed into a generation prompt.
#[derive(Debug, Clone)]
pub struct VerseContext {
    pub reference: String,
    pub text: String,
    pub note: Option<String>,
    pub kind: SourceKind,
    pub color: Option<HighlightColor>,
}

/// The aggregated inputs for one generation: the ordered context entries
/// plus the provenance id lists recorded on the resulting lesson.
#[derive(Debug, Clone)]
pub struct SourceMaterial {
    pub entries: Vec<VerseContext>,
    /// Highlights' verse ids followed by favorites', deduplicated by id,
    /// original order preserved.
    pub verse_ids: Vec<Uuid>,
    pub highlight_ids: Vec<Uuid>,
    pub favorite_ids: Vec<Uuid>,
}

/// Builds the ordered context list: every highlight's verse first, in
/// storage order, then every favorite whose formatted reference string is
/// not already present.
///
/// The dedup key is the reference string, not the verse id, so two verse
/// records carrying the same reference count as duplicates.
pub fn aggregate(
    highlights: &[Highlight],
    favorites: &[Favorite],
) -> Result<SourceMaterial, GenerateError> {
    if highlights.is_empty() && favorites.is_empty() {
        return Err(GenerateError::EmptySourceMaterial);
    }

    let mut entries = Vec::with_capacity(highlights.len() + favorites.len());
    let mut seen_references = HashSet::new();
    let mut verse_ids = Vec::new();
    let mut seen_verse_ids = HashSet::new();

    for highlight in highlights {
        let reference = highlight.verse.reference();
        seen_references.insert(reference.clone());
        entries.push(VerseContext {
            reference,
            text: highlight.verse.text.clone(),
            note: highlight.note.clone(),
            kind: SourceKind::Highlight,
            color: Some(highlight.color),
        });
        if seen_verse_ids.insert(highlight.verse.id) {
            verse_ids.push(highlight.verse.id);
        }
    }

    for favorite in favorites {
        if seen_verse_ids.insert(favorite.verse.id) {
            verse_ids.push(favorite.verse.id);
        }
        let reference = favorite.verse.reference();
        if seen_references.insert(reference.clone()) {
            entries.push(VerseContext {
                reference,
                text: favorite.verse.text.clone(),
                note: favorite.note.clone(),
                kind: SourceKind::Favorite,
                color: None,
            });
        }
    }

    Ok(SourceMaterial {
        entries,
        verse_ids,
        highlight_ids: highlights.iter().map(|h| h.id).collect(),
        favorite_ids: favorites.iter().map(|f| f.id).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use devotional_core::domain::AnnotatedVerse;

    fn verse(book: &str, chapter: i32, number: i32, text: &str) -> AnnotatedVerse {
        AnnotatedVerse {
            id: Uuid::new_v4(),
            book_name: Some(book.to_string()),
            chapter_number: Some(chapter),
            verse_number: Some(number),
            text: text.to_string(),
        }
    }

    fn highlight(verse: AnnotatedVerse, note: Option<&str>) -> Highlight {
        Highlight {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            verse,
            color: HighlightColor::Yellow,
            note: note.map(str::to_string),
        }
    }

    fn favorite(verse: AnnotatedVerse, note: Option<&str>) -> Favorite {
        Favorite {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            verse,
            note: note.map(str::to_string),
        }
    }

    #[test]
    fn rejects_empty_input() {
        let result = aggregate(&[], &[]);
        assert!(matches!(result, Err(GenerateError::EmptySourceMaterial)));
    }

    #[test]
    fn highlights_come_first_then_undeduplicated_favorites() {
        let h = highlight(verse("John", 3, 16, "For God so loved the world"), None);
        let f = favorite(verse("Romans", 8, 28, "All things work together"), None);
        let material = aggregate(&[h], &[f]).unwrap();

        assert_eq!(material.entries.len(), 2);
        assert_eq!(material.entries[0].reference, "John 3:16");
        assert_eq!(material.entries[0].kind, SourceKind::Highlight);
        assert_eq!(material.entries[1].reference, "Romans 8:28");
        assert_eq!(material.entries[1].kind, SourceKind::Favorite);
    }

    #[test]
    fn verse_both_highlighted_and_favorited_appears_once_as_highlight() {
        let shared = verse("John", 3, 16, "For God so loved the world");
        let h = highlight(shared.clone(), Some("God's love"));
        // A distinct verse record with the same reference still counts as a
        // duplicate: the dedup key is the formatted reference string.
        let f = favorite(verse("John", 3, 16, "For God so loved the world"), None);
        let material = aggregate(&[h.clone()], &[f.clone()]).unwrap();

        assert_eq!(material.entries.len(), 1);
        assert_eq!(material.entries[0].kind, SourceKind::Highlight);
        assert_eq!(material.entries[0].color, Some(HighlightColor::Yellow));
        // Both ids are still recorded as provenance, and both verse records
        // (distinct ids) enter the verse id list.
        assert_eq!(material.highlight_ids, vec![h.id]);
        assert_eq!(material.favorite_ids, vec![f.id]);
        assert_eq!(material.verse_ids, vec![h.verse.id, f.verse.id]);
    }

    #[test]
    fn verse_ids_deduplicate_by_id_preserving_order() {
        let shared = verse("Psalm", 23, 1, "The Lord is my shepherd");
        let h1 = highlight(shared.clone(), None);
        let h2 = highlight(verse("Psalm", 23, 2, "He makes me lie down"), None);
        let f = favorite(shared.clone(), None);
        let material = aggregate(&[h1, h2.clone()], &[f]).unwrap();

        assert_eq!(material.verse_ids, vec![shared.id, h2.verse.id]);
    }

    #[test]
    fn aggregation_is_deterministic() {
        let highlights = vec![
            highlight(verse("John", 1, 1, "In the beginning was the Word"), None),
            highlight(verse("John", 1, 14, "The Word became flesh"), Some("incarnation")),
        ];
        let favorites = vec![favorite(verse("Genesis", 1, 1, "In the beginning"), None)];

        let first = aggregate(&highlights, &favorites).unwrap();
        let second = aggregate(&highlights, &favorites).unwrap();

        let refs = |m: &SourceMaterial| {
            m.entries.iter().map(|e| e.reference.clone()).collect::<Vec<_>>()
        };
        assert_eq!(refs(&first), refs(&second));
        assert_eq!(first.verse_ids, second.verse_ids);
        assert_eq!(first.highlight_ids, second.highlight_ids);
        assert_eq!(first.favorite_ids, second.favorite_ids);
    }

    #[test]
    fn broken_relations_fall_back_to_placeholders() {
        let mut broken = verse("John", 3, 16, "text");
        broken.book_name = None;
        broken.chapter_number = None;
        let material = aggregate(&[highlight(broken, None)], &[]).unwrap();
        assert_eq!(material.entries[0].reference, "Unknown ?:16");
    }
}
