//! One user's card session: current question, busy flag, quota gate and the
//! collection store, wired together.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use chrono::{Local, NaiveDate, TimeZone};

use crate::client::{InsightClient, InsightError, RemoteCardGenerator};
use crate::config::NowwitConfig;
use crate::error::NowwitError;
use crate::models::Card;
use crate::questions::QuestionPicker;
use crate::quota::{local_today, QuotaGate};
use crate::store::{CollectionStore, FileSlot, StorageSlot};
use crate::views::{self, ConceptSummary};

/// Whether the generate action is currently enabled, and if not, why.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    Ready,
    BlankAnswer,
    Busy,
    QuotaExhausted,
}

impl Availability {
    pub fn is_ready(&self) -> bool {
        matches!(self, Availability::Ready)
    }

    /// Explanatory text for a disabled action.
    pub fn message(&self) -> &'static str {
        match self {
            Availability::Ready => "ready",
            Availability::BlankAnswer => "write an answer first",
            Availability::Busy => "a card is already being generated",
            Availability::QuotaExhausted => "today's cards are all used up, come back tomorrow",
        }
    }
}

#[derive(Debug)]
pub enum Outcome {
    Generated(Card),
    Disabled(Availability),
}

/// Clears the busy flag however the generation ends.
struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct CardSession<S: StorageSlot, G: RemoteCardGenerator> {
    store: Mutex<CollectionStore<S>>,
    generator: G,
    picker: QuestionPicker,
    gate: QuotaGate,
    question: Mutex<String>,
    busy: AtomicBool,
}

impl<S: StorageSlot, G: RemoteCardGenerator> CardSession<S, G> {
    pub fn new(store: CollectionStore<S>, generator: G, picker: QuestionPicker, gate: QuotaGate) -> Self {
        let question = picker.pick().to_string();
        Self {
            store: Mutex::new(store),
            generator,
            picker,
            gate,
            question: Mutex::new(question),
            busy: AtomicBool::new(false),
        }
    }

    fn store(&self) -> MutexGuard<'_, CollectionStore<S>> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn current_question(&self) -> String {
        self.question
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replace the current question with a fresh random pick.
    pub fn next_question(&self) -> String {
        let q = self.picker.pick().to_string();
        *self.question.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = q.clone();
        q
    }

    pub fn set_question(&self, question: impl Into<String>) {
        *self.question.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) = question.into();
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn gate(&self) -> QuotaGate {
        self.gate
    }

    pub fn availability_on<Tz: TimeZone>(&self, answer: &str, today: NaiveDate, tz: &Tz) -> Availability {
        if answer.trim().is_empty() {
            Availability::BlankAnswer
        } else if self.is_busy() {
            Availability::Busy
        } else if self.gate.is_exhausted_on(self.store().cards(), today, tz) {
            Availability::QuotaExhausted
        } else {
            Availability::Ready
        }
    }

    pub fn availability(&self, answer: &str) -> Availability {
        self.availability_on(answer, local_today(), &Local)
    }

    /// Generate a card for the current question. The store is not touched;
    /// call [`collect`](Self::collect) to keep the card.
    pub async fn generate(&self, answer: &str) -> Result<Outcome, InsightError> {
        self.generate_on(answer, local_today(), &Local).await
    }

    pub async fn generate_on<Tz: TimeZone>(
        &self,
        answer: &str,
        today: NaiveDate,
        tz: &Tz,
    ) -> Result<Outcome, InsightError> {
        let availability = self.availability_on(answer, today, tz);
        if !availability.is_ready() {
            return Ok(Outcome::Disabled(availability));
        }

        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Ok(Outcome::Disabled(Availability::Busy));
        }
        let _guard = BusyGuard(&self.busy);

        let question = self.current_question();
        let card = self.generator.generate(&question, answer).await?;
        tracing::info!(id = %card.id, concept = %card.insight.concept, rarity = %card.insight.rarity, "Card generated");
        Ok(Outcome::Generated(card))
    }

    /// Keep a generated card. Returns false if it was already collected.
    pub fn collect(&self, card: Card) -> bool {
        self.store().insert_if_absent(card)
    }

    pub fn cards(&self) -> Vec<Card> {
        self.store().cards().to_vec()
    }

    pub fn remaining_today(&self) -> u32 {
        self.gate.remaining_today(self.store().cards())
    }

    pub fn calendar(&self) -> BTreeMap<String, Vec<Card>> {
        views::group_by_local_date(self.store().cards(), &Local)
    }

    pub fn concepts(&self) -> Vec<ConceptSummary> {
        views::summarize_by_concept(self.store().cards(), &Local)
    }
}

impl CardSession<FileSlot, InsightClient> {
    /// Session backed by the configured store file and insight server.
    pub fn from_config(config: &NowwitConfig, store_path: PathBuf) -> Result<Self, NowwitError> {
        let picker = QuestionPicker::new(config.collection.questions.iter().cloned())
            .ok_or_else(|| NowwitError::Other("no questions configured".to_string()))?;
        let client = InsightClient::from_config(&config.client)?;
        let store = CollectionStore::open(FileSlot::new(store_path));
        Ok(Self::new(
            store,
            client,
            picker,
            QuotaGate::new(config.collection.daily_limit),
        ))
    }
}
