//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the workspace endpoints (uploads, analysis,
//! quiz, chat) and the master definition for the OpenAPI specification.

use crate::web::library;
use crate::web::protocol::*;
use crate::web::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use boardvision_core::{
    diagram::normalize_diagram,
    ingestion::{ingest_batch, is_image_mime, mime_from_file_name, RawUpload},
    ports::PortError,
    quiz,
};
use futures::future;
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::OpenApi;
use uuid::Uuid;

/// Notice returned when an analysis call fails for any reason.
pub const ANALYSIS_FAILURE_NOTICE: &str = "Analysis engine failure.";
/// Notice returned when quiz generation fails for any reason.
pub const QUIZ_FAILURE_NOTICE: &str = "Quiz failed.";

/// The error half of every handler's result.
pub type HandlerError = (StatusCode, String);

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        workspace_handler,
        upload_images_handler,
        remove_upload_handler,
        set_selection_handler,
        analyze_handler,
        get_result_handler,
        get_diagram_handler,
        archive_result_handler,
        generate_quiz_handler,
        score_quiz_handler,
        get_chat_handler,
        send_chat_handler,
        chat_action_handler,
        new_session_handler,
        library::list_history_handler,
        library::clear_history_handler,
        library::open_history_handler,
        library::list_flashcards_handler,
        library::save_flashcards_handler,
        library::clear_flashcards_handler,
        library::delete_flashcard_handler,
        library::get_theme_handler,
        library::set_theme_handler,
        library::toggle_theme_handler,
        library::start_review_handler,
        library::get_review_handler,
        library::review_action_handler,
    ),
    components(
        schemas(
            SelectionRequest, AnalyzeRequest, QuizScoreRequest, ChatRequest,
            ChatActionRequest, SaveFlashcardsRequest, ThemeRequest, ReviewRequest,
            UploadSummary, UploadsResponse, WorkspaceSnapshot, ResultResponse,
            AnalyzeResponse, DiagramResponse, QuizResponse, QuizScoreResponse,
            ChatTranscript, ChatResponse, HistoryResponse, FlashcardsResponse,
            SaveFlashcardsResponse, ThemeResponse, ReviewResponse
        )
    ),
    tags(
        (name = "BoardVision API", description = "Whiteboard analysis, study aids and follow-up chat.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Error Mapping
//=========================================================================================

/// Maps a port failure onto an HTTP status and message.
pub fn port_error(e: PortError) -> HandlerError {
    let status = match &e {
        PortError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        PortError::NotFound(_) => StatusCode::NOT_FOUND,
        PortError::Busy(_) => StatusCode::CONFLICT,
        PortError::Transport(_) | PortError::EmptyResponse | PortError::MalformedResponse(_) => {
            StatusCode::BAD_GATEWAY
        }
        PortError::Storage(_) | PortError::Unexpected(_) => {
            error!("Internal failure: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, e.to_string())
}

//=========================================================================================
// Workspace Handlers
//=========================================================================================

/// Snapshot of the current workspace.
#[utoipa::path(
    get,
    path = "/workspace",
    responses((status = 200, description = "Current workspace", body = WorkspaceSnapshot))
)]
pub async fn workspace_handler(State(app_state): State<Arc<AppState>>) -> Json<WorkspaceSnapshot> {
    let session = app_state.session.lock().await;
    Json(WorkspaceSnapshot {
        theme: session.theme(),
        language: session.language(),
        mode: session.mode(),
        flags: session.flags(),
        uploads: session.uploads().iter().map(UploadSummary::from).collect(),
        has_result: session.result().is_some(),
        chat_length: session.chat().len(),
    })
}

/// Add images to the pending uploads.
///
/// Accepts a multipart/form-data request with one or more file parts.
/// Non-image parts are skipped. If any part cannot be read nothing is added.
#[utoipa::path(
    post,
    path = "/uploads",
    request_body(content_type = "multipart/form-data", description = "The images to upload."),
    responses(
        (status = 201, description = "Images added", body = UploadsResponse),
        (status = 400, description = "Bad request (e.g., missing or unreadable file)")
    )
)]
pub async fn upload_images_handler(
    State(app_state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, HandlerError> {
    let mut uploads = Vec::new();
    while let Some(field) = multipart.next_field().await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            format!("Failed to read multipart data: {}", e),
        )
    })? {
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let declared = field.content_type().map(str::to_string);
        let mime_type = declared
            .clone()
            .filter(|m| is_image_mime(m))
            .or_else(|| mime_from_file_name(&file_name).map(str::to_string))
            .or(declared)
            .unwrap_or_else(|| "application/octet-stream".to_string());
        let bytes = field.bytes().await.map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                format!("Failed to read file bytes for '{}': {}", file_name, e),
            )
        })?;
        uploads.push(RawUpload {
            file_name,
            mime_type,
            bytes: bytes.to_vec(),
        });
    }

    if uploads.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Multipart form must include at least one file".to_string(),
        ));
    }

    let assets = ingest_batch(uploads.into_iter().map(|u| future::ready(Ok::<_, PortError>(u))))
        .await
        .map_err(port_error)?;
    let added = assets.len();

    let mut session = app_state.session.lock().await;
    session.add_uploads(assets);
    let response = UploadsResponse {
        added,
        uploads: session.uploads().iter().map(UploadSummary::from).collect(),
    };
    Ok((StatusCode::CREATED, Json(response)))
}

/// Remove one pending upload.
#[utoipa::path(
    delete,
    path = "/uploads/{id}",
    params(("id" = Uuid, Path, description = "The upload to remove.")),
    responses(
        (status = 204, description = "Upload removed"),
        (status = 404, description = "No such upload")
    )
)]
pub async fn remove_upload_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, HandlerError> {
    let mut session = app_state.session.lock().await;
    if session.remove_upload(id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err((StatusCode::NOT_FOUND, format!("Upload {} not found", id)))
    }
}

/// Choose the output language and mode for the next analysis.
#[utoipa::path(
    put,
    path = "/selection",
    request_body = SelectionRequest,
    responses((status = 204, description = "Selection stored"))
)]
pub async fn set_selection_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<SelectionRequest>,
) -> StatusCode {
    app_state
        .session
        .lock()
        .await
        .set_selection(request.language, request.mode);
    StatusCode::NO_CONTENT
}

/// Start a new session: clears uploads, the current result and the chat.
#[utoipa::path(
    post,
    path = "/session/new",
    responses((status = 204, description = "Workspace cleared"))
)]
pub async fn new_session_handler(State(app_state): State<Arc<AppState>>) -> StatusCode {
    app_state.session.lock().await.new_session();
    StatusCode::NO_CONTENT
}

//=========================================================================================
// Analysis Handlers
//=========================================================================================

/// Analyze the pending uploads, optionally with a refinement instruction.
#[utoipa::path(
    post,
    path = "/analyze",
    request_body = AnalyzeRequest,
    responses(
        (status = 200, description = "Analysis result, also committed to history", body = AnalyzeResponse),
        (status = 400, description = "No images uploaded"),
        (status = 409, description = "An analysis is already running"),
        (status = 502, description = "The AI service failed or answered with unusable output")
    )
)]
pub async fn analyze_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<AnalyzeRequest>,
) -> Result<Json<AnalyzeResponse>, HandlerError> {
    let ticket = app_state
        .session
        .lock()
        .await
        .begin_analysis(request.refinement)
        .map_err(port_error)?;

    run_detached(async move {
        let outcome = app_state
            .gateway
            .analyze(
                &ticket.images,
                ticket.language,
                ticket.mode,
                ticket.refinement.as_deref(),
            )
            .await;

        let mut session = app_state.session.lock().await;
        match outcome {
            Ok(result) => {
                let item = session
                    .complete_analysis(&ticket, result)
                    .await
                    .map_err(port_error)?;
                Ok(Json(AnalyzeResponse {
                    history_id: item.id,
                    result: item.result,
                }))
            }
            Err(e) => {
                session.abort_analysis();
                warn!("Analysis request failed: {}", e);
                Err((StatusCode::BAD_GATEWAY, ANALYSIS_FAILURE_NOTICE.to_string()))
            }
        }
    })
    .await
}

/// Runs an AI-backed action on its own task. The action settles its
/// in-progress flag even when the client disconnects and this handler is
/// dropped.
async fn run_detached<T, F>(action: F) -> Result<T, HandlerError>
where
    T: Send + 'static,
    F: Future<Output = Result<T, HandlerError>> + Send + 'static,
{
    tokio::spawn(action).await.map_err(|e| {
        error!("Background action did not finish: {}", e);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal error".to_string(),
        )
    })?
}

fn no_result() -> HandlerError {
    (StatusCode::NOT_FOUND, "No analysis result yet".to_string())
}

/// The current analysis result.
#[utoipa::path(
    get,
    path = "/result",
    responses(
        (status = 200, description = "Current result", body = ResultResponse),
        (status = 404, description = "Nothing analyzed yet")
    )
)]
pub async fn get_result_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<ResultResponse>, HandlerError> {
    let session = app_state.session.lock().await;
    let result = session.result().cloned().ok_or_else(no_result)?;
    Ok(Json(ResultResponse { result }))
}

/// The current result's diagram, cleaned up for a Mermaid renderer.
#[utoipa::path(
    get,
    path = "/result/diagram",
    responses(
        (status = 200, description = "Normalized diagram source", body = DiagramResponse),
        (status = 404, description = "Nothing analyzed yet")
    )
)]
pub async fn get_diagram_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<DiagramResponse>, HandlerError> {
    let session = app_state.session.lock().await;
    let result = session.result().ok_or_else(no_result)?;
    let diagram = result
        .diagram
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map(normalize_diagram);
    Ok(Json(DiagramResponse { diagram }))
}

/// Commit the current result to history again.
#[utoipa::path(
    post,
    path = "/result/archive",
    responses(
        (status = 200, description = "Result archived", body = AnalyzeResponse),
        (status = 400, description = "Nothing to archive")
    )
)]
pub async fn archive_result_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<AnalyzeResponse>, HandlerError> {
    let mut session = app_state.session.lock().await;
    let item = session.archive_current().await.map_err(port_error)?;
    info!(title = %item.result.title, "Result archived");
    Ok(Json(AnalyzeResponse {
        history_id: item.id,
        result: item.result,
    }))
}

//=========================================================================================
// Quiz Handlers
//=========================================================================================

/// Generate a quiz from the current result's explanation.
#[utoipa::path(
    post,
    path = "/quiz",
    responses(
        (status = 200, description = "Quiz attached to the current result", body = QuizResponse),
        (status = 400, description = "Nothing analyzed yet"),
        (status = 409, description = "A quiz is already being generated"),
        (status = 502, description = "The AI service failed")
    )
)]
pub async fn generate_quiz_handler(
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<QuizResponse>, HandlerError> {
    let ticket = app_state
        .session
        .lock()
        .await
        .begin_quiz()
        .map_err(port_error)?;

    run_detached(async move {
        let outcome = app_state.gateway.generate_quiz(&ticket.explanation).await;

        let mut session = app_state.session.lock().await;
        match outcome {
            Ok(questions) => {
                let updated = session
                    .complete_quiz(ticket, questions)
                    .await
                    .map_err(port_error)?;
                Ok(Json(QuizResponse {
                    quiz: updated.quiz.unwrap_or_default(),
                }))
            }
            Err(e) => {
                session.abort_quiz();
                warn!("Quiz request failed: {}", e);
                Err((StatusCode::BAD_GATEWAY, QUIZ_FAILURE_NOTICE.to_string()))
            }
        }
    })
    .await
}

/// Grade a set of answers against the current quiz.
#[utoipa::path(
    post,
    path = "/quiz/score",
    request_body = QuizScoreRequest,
    responses(
        (status = 200, description = "Score and grade", body = QuizScoreResponse),
        (status = 400, description = "No quiz to grade")
    )
)]
pub async fn score_quiz_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<QuizScoreRequest>,
) -> Result<Json<QuizScoreResponse>, HandlerError> {
    let session = app_state.session.lock().await;
    let questions = session
        .result()
        .and_then(|r| r.quiz.as_deref())
        .ok_or_else(|| (StatusCode::BAD_REQUEST, "No quiz to grade".to_string()))?;
    Ok(Json(quiz::evaluate(questions, &request.answers).into()))
}

//=========================================================================================
// Chat Handlers
//=========================================================================================

/// The chat transcript for the current result.
#[utoipa::path(
    get,
    path = "/chat",
    responses((status = 200, description = "Messages in send order", body = ChatTranscript))
)]
pub async fn get_chat_handler(State(app_state): State<Arc<AppState>>) -> Json<ChatTranscript> {
    let session = app_state.session.lock().await;
    Json(ChatTranscript {
        messages: session.chat().to_vec(),
    })
}

async fn run_chat_turn(
    app_state: Arc<AppState>,
    message: &str,
) -> Result<Json<ChatResponse>, HandlerError> {
    let ticket = app_state
        .session
        .lock()
        .await
        .begin_chat(message)
        .map_err(port_error)?;

    run_detached(async move {
        let reply = app_state
            .gateway
            .send_follow_up(&ticket.history, &ticket.message, &ticket.context, &ticket.images)
            .await;

        let reply = app_state.session.lock().await.complete_chat(reply);
        Ok::<_, HandlerError>(Json(ChatResponse { reply }))
    })
    .await
}

/// Send a follow-up message about the current result.
#[utoipa::path(
    post,
    path = "/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "The model's reply", body = ChatResponse),
        (status = 400, description = "Empty message or nothing analyzed yet"),
        (status = 409, description = "A chat message is already being sent")
    )
)]
pub async fn send_chat_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, HandlerError> {
    run_chat_turn(app_state, &request.message).await
}

/// Send a quick action, phrased as "Please {action}.".
#[utoipa::path(
    post,
    path = "/chat/action",
    request_body = ChatActionRequest,
    responses(
        (status = 200, description = "The model's reply", body = ChatResponse),
        (status = 400, description = "Empty action or nothing analyzed yet"),
        (status = 409, description = "A chat message is already being sent")
    )
)]
pub async fn chat_action_handler(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<ChatActionRequest>,
) -> Result<Json<ChatResponse>, HandlerError> {
    let action = request.action.trim();
    if action.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Action is empty".to_string()));
    }
    let message = format!("Please {}.", action);
    run_chat_turn(app_state, &message).await
}
