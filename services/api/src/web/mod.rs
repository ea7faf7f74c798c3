pub mod rest;
pub mod state;

// Re-export the handlers so the binary that builds the web server router
// can reach them directly.
pub use rest::{
    add_lesson_handler, combine_sermon_handler, generate_lesson_handler, generate_sermon_handler,
    get_sermon_handler, list_lessons_handler, list_sermons_handler, remove_lesson_handler,
    set_visibility_handler, shared_sermon_handler,
};
