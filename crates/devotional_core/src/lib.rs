pub mod domain;
pub mod ports;

pub use domain::{
    new_share_token, AnnotatedVerse, Favorite, Highlight, HighlightColor, Lesson, NewLesson,
    NewSermon, Sermon, SermonAnalysis, SermonWithLessons,
};
pub use ports::{DatabaseService, GenerationRequest, PortError, PortResult, TextGenerationService};
