pub mod library;
pub mod protocol;
pub mod rest;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Router,
};
use std::sync::Arc;

use state::AppState;

/// Largest accepted request body; whiteboard photos can be large.
pub const MAX_BODY_BYTES: usize = 25 * 1024 * 1024;

/// Builds the API router over the shared state.
pub fn build_router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/workspace", get(rest::workspace_handler))
        .route("/uploads", post(rest::upload_images_handler))
        .route("/uploads/{id}", delete(rest::remove_upload_handler))
        .route("/selection", put(rest::set_selection_handler))
        .route("/session/new", post(rest::new_session_handler))
        .route("/analyze", post(rest::analyze_handler))
        .route("/result", get(rest::get_result_handler))
        .route("/result/diagram", get(rest::get_diagram_handler))
        .route("/result/archive", post(rest::archive_result_handler))
        .route("/quiz", post(rest::generate_quiz_handler))
        .route("/quiz/score", post(rest::score_quiz_handler))
        .route(
            "/chat",
            get(rest::get_chat_handler).post(rest::send_chat_handler),
        )
        .route("/chat/action", post(rest::chat_action_handler))
        .route(
            "/history",
            get(library::list_history_handler).delete(library::clear_history_handler),
        )
        .route("/history/{id}/open", post(library::open_history_handler))
        .route(
            "/flashcards",
            get(library::list_flashcards_handler)
                .post(library::save_flashcards_handler)
                .delete(library::clear_flashcards_handler),
        )
        .route("/flashcards/{id}", delete(library::delete_flashcard_handler))
        .route(
            "/theme",
            get(library::get_theme_handler).put(library::set_theme_handler),
        )
        .route("/theme/toggle", post(library::toggle_theme_handler))
        .route(
            "/review",
            get(library::get_review_handler).post(library::start_review_handler),
        )
        .route("/review/{action}", post(library::review_action_handler))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(app_state)
}
