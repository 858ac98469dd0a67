//! crates/boardvision_core/src/session.rs
//!
//! The Session State Store: the volatile workspace (pending uploads, current
//! result, chat transcript, in-progress flags) plus the persisted collections
//! (history, saved flashcards, theme) mirrored to a `KeyValueStore`.
//!
//! Every mutation of a persisted collection rewrites that collection in full.
//! History and flashcards are written independently of each other.

use std::sync::Arc;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{
    AnalysisResult, ChatMessage, ChatRole, Flashcard, HistoryItem, ImageAsset, OutputMode,
    ProgrammingLanguage, QuizQuestion, SavedFlashcard, Theme,
};
use crate::ingestion::without_asset;
use crate::ports::{KeyValueStore, PortError, PortResult};

pub const HISTORY_KEY: &str = "boardvision_history";
pub const FLASHCARDS_KEY: &str = "boardvision_flashcards";
pub const THEME_KEY: &str = "boardvision_theme";

/// Most recent history entries kept.
pub const HISTORY_LIMIT: usize = 20;

//=========================================================================================
// Tickets handed out when an action starts
//=========================================================================================

/// How a history entry is labelled: thumbnail, language and mode as they
/// were when the action that produced it started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryLabels {
    pub thumbnail: String,
    pub language: ProgrammingLanguage,
    pub mode: OutputMode,
}

/// Inputs captured for one analysis call.
#[derive(Debug, Clone)]
pub struct AnalysisTicket {
    pub images: Vec<ImageAsset>,
    pub language: ProgrammingLanguage,
    pub mode: OutputMode,
    pub refinement: Option<String>,
    pub labels: EntryLabels,
}

/// The result a quiz is being built for.
#[derive(Debug, Clone)]
pub struct QuizTicket {
    pub explanation: String,
    pub source: AnalysisResult,
    pub labels: EntryLabels,
    generation: u64,
}

/// Inputs captured for one chat turn.
#[derive(Debug, Clone)]
pub struct ChatTicket {
    /// Messages before the new one.
    pub history: Vec<ChatMessage>,
    pub message: String,
    pub context: String,
    pub images: Vec<ImageAsset>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityFlags {
    pub is_processing: bool,
    pub is_chat_sending: bool,
    pub is_generating_quiz: bool,
}

//=========================================================================================
// SessionStore
//=========================================================================================

pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
    uploads: Vec<ImageAsset>,
    result: Option<AnalysisResult>,
    /// Bumped whenever `result` is replaced or cleared.
    result_generation: u64,
    /// Thumbnail of the history entry the current result was reopened from.
    restored_thumbnail: Option<String>,
    chat: Vec<ChatMessage>,
    language: ProgrammingLanguage,
    mode: OutputMode,
    flags: ActivityFlags,
    history: Vec<HistoryItem>,
    flashcards: Vec<SavedFlashcard>,
    theme: Theme,
}

impl SessionStore {
    /// Loads the persisted collections and starts an empty workspace.
    ///
    /// Missing keys are empty collections. Values that cannot be read or
    /// decoded are logged and treated as missing.
    pub async fn load(store: Arc<dyn KeyValueStore>) -> Self {
        let history: Vec<HistoryItem> = read_collection(store.as_ref(), HISTORY_KEY).await;
        let flashcards: Vec<SavedFlashcard> =
            read_collection(store.as_ref(), FLASHCARDS_KEY).await;
        let theme = read_theme(store.as_ref()).await;

        info!(
            history = history.len(),
            flashcards = flashcards.len(),
            ?theme,
            "Loaded persisted session state"
        );

        Self {
            store,
            uploads: Vec::new(),
            result: None,
            result_generation: 0,
            restored_thumbnail: None,
            chat: Vec::new(),
            language: ProgrammingLanguage::default(),
            mode: OutputMode::default(),
            flags: ActivityFlags::default(),
            history,
            flashcards,
            theme,
        }
    }

    // --- Accessors ---

    pub fn uploads(&self) -> &[ImageAsset] {
        &self.uploads
    }

    pub fn result(&self) -> Option<&AnalysisResult> {
        self.result.as_ref()
    }

    pub fn chat(&self) -> &[ChatMessage] {
        &self.chat
    }

    pub fn history(&self) -> &[HistoryItem] {
        &self.history
    }

    pub fn flashcards(&self) -> &[SavedFlashcard] {
        &self.flashcards
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn language(&self) -> ProgrammingLanguage {
        self.language
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn flags(&self) -> ActivityFlags {
        self.flags
    }

    // --- Workspace ---

    pub fn add_uploads(&mut self, assets: Vec<ImageAsset>) {
        self.uploads.extend(assets);
    }

    /// Removes one pending upload. Returns whether it was present.
    pub fn remove_upload(&mut self, id: Uuid) -> bool {
        let before = self.uploads.len();
        self.uploads = without_asset(&self.uploads, id);
        self.uploads.len() != before
    }

    pub fn set_selection(&mut self, language: ProgrammingLanguage, mode: OutputMode) {
        self.language = language;
        self.mode = mode;
    }

    /// Clears uploads, the current result and the chat transcript.
    pub fn new_session(&mut self) {
        self.uploads.clear();
        self.chat.clear();
        self.restored_thumbnail = None;
        self.replace_result(None);
    }

    fn replace_result(&mut self, result: Option<AnalysisResult>) {
        self.result = result;
        self.result_generation += 1;
    }

    /// Labels for an entry committed from the workspace as it is now.
    fn current_labels(&self) -> EntryLabels {
        EntryLabels {
            thumbnail: self
                .uploads
                .first()
                .map(|u| u.preview_ref.clone())
                .or_else(|| self.restored_thumbnail.clone())
                .unwrap_or_default(),
            language: self.language,
            mode: self.mode,
        }
    }

    // --- Analysis lifecycle ---

    pub fn begin_analysis(&mut self, refinement: Option<String>) -> PortResult<AnalysisTicket> {
        if self.flags.is_processing {
            return Err(PortError::Busy("analysis"));
        }
        if self.uploads.is_empty() {
            return Err(PortError::InvalidInput(
                "upload at least one image before analyzing".to_string(),
            ));
        }
        self.flags.is_processing = true;
        Ok(AnalysisTicket {
            images: self.uploads.clone(),
            language: self.language,
            mode: self.mode,
            refinement: refinement.filter(|r| !r.trim().is_empty()),
            labels: self.current_labels(),
        })
    }

    /// Installs a fresh result and commits it to history, labelled with the
    /// inputs the ticket captured.
    pub async fn complete_analysis(
        &mut self,
        ticket: &AnalysisTicket,
        result: AnalysisResult,
    ) -> PortResult<HistoryItem> {
        self.flags.is_processing = false;
        self.restored_thumbnail = None;
        self.replace_result(Some(result.clone()));
        self.commit_entry(result, ticket.labels.clone()).await
    }

    /// Ends a failed analysis. Uploads, result and history stay as they were.
    pub fn abort_analysis(&mut self) {
        self.flags.is_processing = false;
    }

    // --- Quiz lifecycle ---

    /// Captures the current result so the quiz lands on it later.
    pub fn begin_quiz(&mut self) -> PortResult<QuizTicket> {
        if self.flags.is_generating_quiz {
            return Err(PortError::Busy("quiz"));
        }
        let source = self
            .result
            .clone()
            .ok_or_else(|| PortError::InvalidInput("no analysis result to quiz on".to_string()))?;
        self.flags.is_generating_quiz = true;
        Ok(QuizTicket {
            explanation: source.explanation.clone(),
            source,
            labels: self.current_labels(),
            generation: self.result_generation,
        })
    }

    /// Attaches the quiz to the result it was built from and re-commits that
    /// result. The workspace only picks it up if it still shows that result.
    pub async fn complete_quiz(
        &mut self,
        ticket: QuizTicket,
        quiz: Vec<QuizQuestion>,
    ) -> PortResult<AnalysisResult> {
        self.flags.is_generating_quiz = false;
        let mut updated = ticket.source;
        updated.quiz = Some(quiz);
        if ticket.generation == self.result_generation {
            self.result = Some(updated.clone());
        } else {
            info!(title = %updated.title, "Result changed while the quiz was generated; saving it to history only");
        }
        self.commit_entry(updated.clone(), ticket.labels).await?;
        Ok(updated)
    }

    pub fn abort_quiz(&mut self) {
        self.flags.is_generating_quiz = false;
    }

    // --- Chat lifecycle ---

    /// Appends the user's message and captures what the gateway needs.
    pub fn begin_chat(&mut self, message: &str) -> PortResult<ChatTicket> {
        if self.flags.is_chat_sending {
            return Err(PortError::Busy("chat"));
        }
        if message.trim().is_empty() {
            return Err(PortError::InvalidInput("message is empty".to_string()));
        }
        let context = self
            .result
            .as_ref()
            .map(AnalysisResult::chat_context)
            .ok_or_else(|| PortError::InvalidInput("no analysis result to chat about".to_string()))?;

        let history = self.chat.clone();
        self.chat.push(ChatMessage::new(ChatRole::User, message));
        self.flags.is_chat_sending = true;

        Ok(ChatTicket {
            history,
            message: message.to_string(),
            context,
            images: self.uploads.clone(),
        })
    }

    /// Appends the model's reply once the request has settled.
    pub fn complete_chat(&mut self, reply: String) -> ChatMessage {
        let message = ChatMessage::new(ChatRole::Model, reply);
        self.chat.push(message.clone());
        self.flags.is_chat_sending = false;
        message
    }

    // --- History ---

    /// Prepends a history entry for `result`, replacing entries with the same
    /// title and keeping at most `HISTORY_LIMIT`.
    pub async fn commit_result(&mut self, result: AnalysisResult) -> PortResult<HistoryItem> {
        let labels = self.current_labels();
        self.commit_entry(result, labels).await
    }

    async fn commit_entry(
        &mut self,
        result: AnalysisResult,
        labels: EntryLabels,
    ) -> PortResult<HistoryItem> {
        let item = HistoryItem {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            thumbnail: labels.thumbnail,
            language: labels.language,
            mode: labels.mode,
            result,
        };

        self.history.retain(|h| h.result.title != item.result.title);
        self.history.insert(0, item.clone());
        self.history.truncate(HISTORY_LIMIT);
        self.persist(HISTORY_KEY, &self.history).await?;
        Ok(item)
    }

    /// Commits the current result again (the "archive" action).
    pub async fn archive_current(&mut self) -> PortResult<HistoryItem> {
        let result = self
            .result
            .clone()
            .ok_or_else(|| PortError::InvalidInput("no analysis result to archive".to_string()))?;
        self.commit_result(result).await
    }

    /// Restores a past result into the workspace.
    pub fn open_history(&mut self, id: Uuid) -> PortResult<AnalysisResult> {
        let item = self
            .history
            .iter()
            .find(|h| h.id == id)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("History item {} not found", id)))?;

        self.uploads.clear();
        self.chat.clear();
        self.language = item.language;
        self.mode = item.mode;
        self.restored_thumbnail = Some(item.thumbnail).filter(|t| !t.is_empty());
        self.replace_result(Some(item.result.clone()));
        Ok(item.result)
    }

    pub async fn clear_history(&mut self) -> PortResult<()> {
        self.history.clear();
        self.persist(HISTORY_KEY, &self.history).await
    }

    // --- Flashcards ---

    /// Saves cards into `deck_name`, skipping (term, definition, deck)
    /// duplicates. Returns how many were added.
    pub async fn save_flashcards(&mut self, cards: &[Flashcard], deck_name: &str) -> PortResult<usize> {
        let mut added = 0;
        for card in cards {
            if self.flashcards.iter().any(|s| s.matches(card, deck_name)) {
                continue;
            }
            self.flashcards.push(SavedFlashcard {
                id: Uuid::new_v4(),
                term: card.term.clone(),
                definition: card.definition.clone(),
                deck_name: deck_name.to_string(),
                date_added: Utc::now(),
            });
            added += 1;
        }
        self.persist(FLASHCARDS_KEY, &self.flashcards).await?;
        Ok(added)
    }

    /// Saves the current result's flashcards (all, or the selected indices)
    /// into a deck named after the result's title.
    pub async fn save_current_flashcards(&mut self, indices: Option<&[usize]>) -> PortResult<usize> {
        let result = self
            .result
            .as_ref()
            .ok_or_else(|| PortError::InvalidInput("no analysis result with flashcards".to_string()))?;
        let available = result.flashcards.clone().unwrap_or_default();
        let deck_name = result.title.clone();

        let selected: Vec<Flashcard> = match indices {
            None => available,
            Some(indices) => indices
                .iter()
                .map(|&i| {
                    available.get(i).cloned().ok_or_else(|| {
                        PortError::InvalidInput(format!("flashcard index {} out of range", i))
                    })
                })
                .collect::<PortResult<_>>()?,
        };

        self.save_flashcards(&selected, &deck_name).await
    }

    /// Deletes one saved card. Returns whether it was present.
    pub async fn delete_flashcard(&mut self, id: Uuid) -> PortResult<bool> {
        let before = self.flashcards.len();
        self.flashcards.retain(|c| c.id != id);
        if self.flashcards.len() == before {
            return Ok(false);
        }
        self.persist(FLASHCARDS_KEY, &self.flashcards).await?;
        Ok(true)
    }

    pub async fn clear_flashcards(&mut self) -> PortResult<()> {
        self.flashcards.clear();
        self.persist(FLASHCARDS_KEY, &self.flashcards).await
    }

    // --- Theme ---

    pub async fn set_theme(&mut self, theme: Theme) -> PortResult<()> {
        self.theme = theme;
        self.persist(THEME_KEY, &self.theme).await
    }

    pub async fn toggle_theme(&mut self) -> PortResult<Theme> {
        let next = self.theme.toggled();
        self.set_theme(next).await?;
        Ok(next)
    }

    // --- Persistence ---

    async fn persist<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> PortResult<()> {
        let json = serde_json::to_string(value)
            .map_err(|e| PortError::Unexpected(format!("failed to serialize {}: {}", key, e)))?;
        self.store.set(key, &json).await.map_err(|e| {
            warn!("Failed to persist {}: {}", key, e);
            e
        })
    }
}

async fn read_raw(store: &dyn KeyValueStore, key: &str) -> Option<String> {
    match store.get(key).await {
        Ok(value) => value,
        Err(e) => {
            warn!("Could not read {}, starting empty: {}", key, e);
            None
        }
    }
}

async fn read_collection<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Vec<T> {
    let Some(raw) = read_raw(store, key).await else {
        return Vec::new();
    };
    serde_json::from_str(&raw).unwrap_or_else(|e| {
        warn!("Ignoring incompatible stored value for {}: {}", key, e);
        Vec::new()
    })
}

/// Accepts both the JSON form (`"dark"`) and a bare string (`dark`).
async fn read_theme(store: &dyn KeyValueStore) -> Theme {
    let Some(raw) = read_raw(store, THEME_KEY).await else {
        return Theme::default();
    };
    serde_json::from_str::<Theme>(&raw).unwrap_or_else(|_| match raw.trim() {
        "dark" => Theme::Dark,
        "light" => Theme::Light,
        other => {
            warn!("Ignoring unknown stored theme '{}'", other);
            Theme::default()
        }
    })
}
