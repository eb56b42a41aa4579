//! Flashcard deck.
//!
//! A deck is fetched as one batch and shown as a grid of two-faced cards.
//! Refetching throws the previous batch away, flip state included.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::api::{ChatRequest, Mode};
use crate::batch::parse_batch;
use crate::error::{GenerationErrorKind, Result, TutorError};

/// Banner shown when the backend answered with something other than an array.
pub const DECK_FORMAT_ERROR: &str = "데이터 형식이 올바르지 않습니다.";

/// Banner shown for every other fetch failure.
pub const DECK_FAILURE_ERROR: &str = "암기 카드를 생성하지 못했습니다. (PDF 내용을 확인해주세요)";

/// One generated card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    /// Prompt side.
    pub front: String,
    /// Answer side.
    pub back: String,
}

/// Side of a card currently shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardFace {
    /// The prompt.
    Front,
    /// The answer.
    Back,
}

impl CardFace {
    fn from_flipped(flipped: bool) -> Self {
        if flipped {
            Self::Back
        } else {
            Self::Front
        }
    }
}

/// What the deck view shows. The variants exclude each other.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DeckStatus {
    /// Nothing fetched yet.
    #[default]
    Empty,
    /// A fetch is in flight.
    Loading,
    /// The last fetch failed; the banner text is kept.
    Failed(String),
    /// Cards are available.
    Ready,
}

impl std::fmt::Display for DeckStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty"),
            Self::Loading => write!(f, "loading"),
            Self::Failed(_) => write!(f, "failed"),
            Self::Ready => write!(f, "ready"),
        }
    }
}

/// A batch of flashcards with per-card flip state.
#[derive(Debug, Clone)]
pub struct FlashcardDeck {
    prompt: String,
    status: DeckStatus,
    cards: Vec<Flashcard>,
    flipped: Vec<bool>,
}

impl FlashcardDeck {
    /// Creates an empty deck that requests cards with `prompt`.
    #[must_use]
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            status: DeckStatus::Empty,
            cards: Vec::new(),
            flipped: Vec::new(),
        }
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> &DeckStatus {
        &self.status
    }

    /// Returns `true` while a fetch is in flight.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self.status, DeckStatus::Loading)
    }

    /// Error banner of the last fetch, if it failed.
    #[must_use]
    pub fn banner(&self) -> Option<&str> {
        match &self.status {
            DeckStatus::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Number of cards in the current batch.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Returns `true` if the deck holds no cards.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    /// Starts a fetch, discarding the current batch and its flip state.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::InvalidStateTransition` while a fetch is in flight.
    pub fn begin_fetch(&mut self) -> Result<ChatRequest> {
        if self.is_loading() {
            return Err(TutorError::invalid_transition(
                &self.status,
                DeckStatus::Loading,
            ));
        }

        self.cards.clear();
        self.flipped.clear();
        self.status = DeckStatus::Loading;
        info!("Flashcard batch requested");

        Ok(ChatRequest::new(self.prompt.clone(), Vec::new(), Mode::Flashcard))
    }

    /// Applies the fetch outcome.
    ///
    /// On success the batch replaces the deck with every card unflipped and
    /// the card count is returned. On failure the deck stays empty, the
    /// banner is set and the failure is returned.
    ///
    /// # Errors
    ///
    /// Returns the generation or transport error, or
    /// `TutorError::InvalidStateTransition` if no fetch is in flight.
    pub fn finish_fetch(&mut self, outcome: Result<String>) -> Result<usize> {
        if !self.is_loading() {
            return Err(TutorError::invalid_transition(&self.status, DeckStatus::Ready));
        }

        match outcome.and_then(|payload| parse_batch::<Flashcard>(&payload)) {
            Ok(cards) => {
                let count = cards.len();
                self.flipped = vec![false; count];
                self.cards = cards;
                self.status = DeckStatus::Ready;
                info!(cards = count, "Flashcard batch received");
                Ok(count)
            }
            Err(error) => {
                let banner = if error.is_generation(&GenerationErrorKind::NotAnArray) {
                    DECK_FORMAT_ERROR
                } else {
                    DECK_FAILURE_ERROR
                };
                warn!(error = %error, "Flashcard fetch failed");
                self.status = DeckStatus::Failed(banner.to_string());
                Err(error)
            }
        }
    }

    /// Toggles the face of card `index` and returns the face now shown.
    ///
    /// # Errors
    ///
    /// Returns `TutorError::IndexOutOfRange` if there is no such card.
    pub fn flip(&mut self, index: usize) -> Result<CardFace> {
        let count = self.cards.len();
        let flipped = self
            .flipped
            .get_mut(index)
            .ok_or(TutorError::IndexOutOfRange { index, count })?;
        *flipped = !*flipped;
        Ok(CardFace::from_flipped(*flipped))
    }

    /// Face currently shown for card `index`.
    #[must_use]
    pub fn face(&self, index: usize) -> Option<CardFace> {
        self.flipped.get(index).copied().map(CardFace::from_flipped)
    }

    /// Cards to display with their current face; empty unless `Ready`.
    pub fn visible(&self) -> impl Iterator<Item = (usize, &Flashcard, CardFace)> + '_ {
        let ready = matches!(self.status, DeckStatus::Ready);
        self.cards
            .iter()
            .zip(&self.flipped)
            .enumerate()
            .filter(move |_| ready)
            .map(|(index, (card, flipped))| (index, card, CardFace::from_flipped(*flipped)))
    }
}
