//! services/api/src/web/library.rs
//!
//! Handlers for the persisted collections (history, saved flashcards, theme)
//! and for reviewing saved flashcards.

use crate::web::protocol::*;
use crate::web::rest::{port_error, HandlerError};
use crate::web::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use boardvision_core::review::ReviewSession;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

//=========================================================================================
// History
//=========================================================================================

/// Past results, newest first.
#[utoipa::path(
    get,
    path = "/history",
    responses((status = 200, description = "History entries", body = HistoryResponse))
)]
pub async fn list_history_handler(State(app_state): State<Arc<AppState>>) -> Json<HistoryResponse> {
    let session = app_state.session.lock().await;
    Json(HistoryResponse {
        items: session.history().to_vec(),
    })
}

#[utoipa::path(
    delete,
    path = "/history",
    responses((status = 204, description = "History cleared"))
)]
pub async fn clear_history_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<StatusCode, HandlerError> {
    app_state
        .session
        .lock()
        .await
        .clear_history()
        .await
        .map_err(port_error)?;
    info!("History cleared");
    Ok(StatusCode::NO_CONTENT)
}

/// Make a past result the current one.
#[utoipa::path(
    post,
    path = "/history/{id}/open",
    params(("id" = Uuid, Path, description = "The history entry to open.")),
    responses(
        (status = 200, description = "Restored result", body = ResultResponse),
        (status = 404, description = "No such history entry")
    )
)]
pub async fn open_history_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ResultResponse>, HandlerError> {
    let result = app_state
        .session
        .lock()
        .await
        .open_history(id)
        .map_err(port_error)?;
    Ok(Json(ResultResponse { result }))
}

//=========================================================================================
// Saved Flashcards
//=========================================================================================

#[utoipa::path(
    get,
    path = "/flashcards",
    responses((status = 200, description = "Saved flashcards", body = FlashcardsResponse))
)]
pub async fn list_flashcards_handler(
    State(app_state): State<Arc<AppState>>,
) -> Json<FlashcardsResponse> {
    let session = app_state.session.lock().await;
    Json(FlashcardsResponse {
        cards: session.flashcards().to_vec(),
    })
}

/// Save the current result's flashcards into a deck named after its title.
///
/// Cards already in that deck are skipped.
#[utoipa::path(
    post,
    path = "/flashcards",
    request_body = SaveFlashcardsRequest,
    responses(
        (status = 200, description = "How many cards were added", body = SaveFlashcardsResponse),
        (status = 400, description = "Nothing analyzed yet or an index is out of range")
    )
)]
pub async fn save_flashcards_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<SaveFlashcardsRequest>,
) -> Result<Json<SaveFlashcardsResponse>, HandlerError> {
    let mut session = app_state.session.lock().await;
    let added = session
        .save_current_flashcards(request.indices.as_deref())
        .await
        .map_err(port_error)?;
    Ok(Json(SaveFlashcardsResponse {
        added,
        total: session.flashcards().len(),
    }))
}

#[utoipa::path(
    delete,
    path = "/flashcards",
    responses((status = 204, description = "All saved flashcards removed"))
)]
pub async fn clear_flashcards_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<StatusCode, HandlerError> {
    app_state
        .session
        .lock()
        .await
        .clear_flashcards()
        .await
        .map_err(port_error)?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    delete,
    path = "/flashcards/{id}",
    params(("id" = Uuid, Path, description = "The saved flashcard to delete.")),
    responses(
        (status = 204, description = "Flashcard deleted"),
        (status = 404, description = "No such flashcard")
    )
)]
pub async fn delete_flashcard_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HandlerError> {
    let removed = app_state
        .session
        .lock()
        .await
        .delete_flashcard(id)
        .await
        .map_err(port_error)?;
    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, format!("Flashcard {} not found", id)))
    }
}

//=========================================================================================
// Theme
//=========================================================================================

#[utoipa::path(
    get,
    path = "/theme",
    responses((status = 200, description = "Current theme", body = ThemeResponse))
)]
pub async fn get_theme_handler(State(app_state): State<Arc<AppState>>) -> Json<ThemeResponse> {
    let theme = app_state.session.lock().await.theme();
    Json(ThemeResponse { theme })
}

#[utoipa::path(
    put,
    path = "/theme",
    request_body = ThemeRequest,
    responses((status = 200, description = "Theme stored", body = ThemeResponse))
)]
pub async fn set_theme_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<ThemeRequest>,
) -> Result<Json<ThemeResponse>, HandlerError> {
    app_state
        .session
        .lock()
        .await
        .set_theme(request.theme)
        .await
        .map_err(port_error)?;
    Ok(Json(ThemeResponse {
        theme: request.theme,
    }))
}

#[utoipa::path(
    post,
    path = "/theme/toggle",
    responses((status = 200, description = "The theme after toggling", body = ThemeResponse))
)]
pub async fn toggle_theme_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<ThemeResponse>, HandlerError> {
    let theme = app_state
        .session
        .lock()
        .await
        .toggle_theme()
        .await
        .map_err(port_error)?;
    Ok(Json(ThemeResponse { theme }))
}

//=========================================================================================
// Flashcard Review
//=========================================================================================

/// Start reviewing saved flashcards, optionally a single deck.
#[utoipa::path(
    post,
    path = "/review",
    request_body = ReviewRequest,
    responses((status = 200, description = "The first review step", body = ReviewResponse))
)]
pub async fn start_review_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<ReviewRequest>,
) -> Json<ReviewResponse> {
    let cards = app_state.session.lock().await.flashcards().to_vec();
    let review = ReviewSession::new(&cards, request.deck.as_deref());
    let view = review.view();
    *app_state.review.lock().await = Some(review);
    Json(ReviewResponse { review: view })
}

fn no_review() -> HandlerError {
    (StatusCode::NOT_FOUND, "No review in progress".to_string())
}

#[utoipa::path(
    get,
    path = "/review",
    responses(
        (status = 200, description = "The current review step", body = ReviewResponse),
        (status = 404, description = "No review started")
    )
)]
pub async fn get_review_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<ReviewResponse>, HandlerError> {
    let review = app_state.review.lock().await;
    let view = review.as_ref().map(ReviewSession::view).ok_or_else(no_review)?;
    Ok(Json(ReviewResponse { review: view }))
}

/// Move through the review: `flip`, `next`, `prev` or `restart`.
#[utoipa::path(
    post,
    path = "/review/{action}",
    params(("action" = String, Path, description = "One of flip, next, prev, restart.")),
    responses(
        (status = 200, description = "The review step after the action", body = ReviewResponse),
        (status = 400, description = "Unknown action"),
        (status = 404, description = "No review started")
    )
)]
pub async fn review_action_handler(
    State(app_state): State<Arc<AppState>>,
    Path(action): Path<String>,
) -> Result<Json<ReviewResponse>, HandlerError> {
    let mut guard = app_state.review.lock().await;
    let review = guard.as_mut().ok_or_else(no_review)?;
    match action.as_str() {
        "flip" => review.flip(),
        "next" => review.next(),
        "prev" => review.prev(),
        "restart" => review.restart(),
        other => {
            return Err((
                StatusCode::BAD_REQUEST,
                format!("Unknown review action '{}'", other),
            ))
        }
    }
    Ok(Json(ReviewResponse {
        review: review.view(),
    }))
}
