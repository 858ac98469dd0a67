//! crates/boardvision_core/src/review.rs
//!
//! A flashcard review run over a snapshot of the saved deck.

use serde::Serialize;

use crate::domain::SavedFlashcard;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Empty,
    InProgress,
    Finished,
}

/// What a client needs to render the current review step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewView {
    pub status: ReviewStatus,
    pub deck: Option<String>,
    pub position: usize,
    pub total: usize,
    pub flipped: bool,
    pub card: Option<SavedFlashcard>,
}

#[derive(Debug, Clone)]
pub struct ReviewSession {
    cards: Vec<SavedFlashcard>,
    deck: Option<String>,
    index: usize,
    flipped: bool,
    finished: bool,
}

impl ReviewSession {
    /// Starts a review of `cards`, optionally only those in `deck`.
    pub fn new(cards: &[SavedFlashcard], deck: Option<&str>) -> Self {
        let cards = cards
            .iter()
            .filter(|c| deck.map_or(true, |d| c.deck_name == d))
            .cloned()
            .collect();
        Self {
            cards,
            deck: deck.map(str::to_string),
            index: 0,
            flipped: false,
            finished: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn current(&self) -> Option<&SavedFlashcard> {
        if self.finished {
            return None;
        }
        self.cards.get(self.index)
    }

    pub fn flip(&mut self) {
        if !self.is_empty() && !self.finished {
            self.flipped = !self.flipped;
        }
    }

    /// Advances to the next card; past the last card the run is finished.
    pub fn next(&mut self) {
        if self.is_empty() || self.finished {
            return;
        }
        if self.index + 1 < self.cards.len() {
            self.index += 1;
            self.flipped = false;
        } else {
            self.finished = true;
        }
    }

    pub fn prev(&mut self) {
        if self.finished || self.index == 0 {
            return;
        }
        self.index -= 1;
        self.flipped = false;
    }

    pub fn restart(&mut self) {
        self.index = 0;
        self.flipped = false;
        self.finished = false;
    }

    pub fn view(&self) -> ReviewView {
        let status = if self.is_empty() {
            ReviewStatus::Empty
        } else if self.finished {
            ReviewStatus::Finished
        } else {
            ReviewStatus::InProgress
        };
        ReviewView {
            status,
            deck: self.deck.clone(),
            position: self.index,
            total: self.cards.len(),
            flipped: self.flipped,
            card: self.current().cloned(),
        }
    }
}
