//! Collection store: an append-only, id-deduplicated list of cards mirrored
//! to a single persistence slot on every mutation.
//!
//! The slot is a port so the store can be backed by a file in production and
//! by memory in tests. Read and write failures never reach the caller; they
//! are logged and the collection degrades to empty (on load) or stale (on
//! save). Concurrent writers to the same slot are not coordinated: the last
//! write wins.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::StorageError;
use crate::models::Card;

/// One opaque key-value slot.
pub trait StorageSlot: Send + Sync {
    /// `Ok(None)` when nothing has been written yet.
    fn read(&self) -> Result<Option<Vec<u8>>, StorageError>;

    fn write(&self, bytes: &[u8]) -> Result<(), StorageError>;

    /// Human-readable location for logs.
    fn describe(&self) -> String;
}

/// A JSON file on disk, replaced atomically via a temp file and rename.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl StorageSlot for FileSlot {
    fn read(&self) -> Result<Option<Vec<u8>>, StorageError> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_err(e)),
        }
    }

    fn write(&self, bytes: &[u8]) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| self.io_err(e))?;
        }

        let temp_path = self.path.with_extension("tmp");
        let mut temp_file = File::create(&temp_path).map_err(|e| self.io_err(e))?;
        temp_file.write_all(bytes).map_err(|e| self.io_err(e))?;
        temp_file.sync_all().map_err(|e| self.io_err(e))?;
        fs::rename(&temp_path, &self.path).map_err(|e| self.io_err(e))?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-process slot. Contents are lost with the process.
#[derive(Debug, Default)]
pub struct MemorySlot {
    bytes: Mutex<Option<Vec<u8>>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: Mutex::new(Some(bytes.into())),
        }
    }

    pub fn snapshot(&self) -> Option<Vec<u8>> {
        self.bytes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl StorageSlot for MemorySlot {
    fn read(&self) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.snapshot())
    }

    fn write(&self, bytes: &[u8]) -> Result<(), StorageError> {
        *self
            .bytes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(bytes.to_vec());
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

/// Read the collection from a slot. Never fails: missing, unreadable, or
/// malformed content yields an empty collection.
pub fn load(slot: &dyn StorageSlot) -> Vec<Card> {
    let bytes = match slot.read() {
        Ok(Some(b)) => b,
        Ok(None) => return Vec::new(),
        Err(e) => {
            tracing::error!(slot = %slot.describe(), error = %e, "Failed to read card collection");
            return Vec::new();
        }
    };

    if bytes.iter().all(|b| b.is_ascii_whitespace()) {
        return Vec::new();
    }

    match serde_json::from_slice::<Vec<Card>>(&bytes) {
        Ok(cards) => cards,
        Err(e) => {
            tracing::warn!(
                slot = %slot.describe(),
                error = %e,
                "Stored card collection is malformed, starting empty"
            );
            Vec::new()
        }
    }
}

/// Write the full collection. Failures are logged and swallowed.
pub fn save(slot: &dyn StorageSlot, cards: &[Card]) {
    let result = serde_json::to_vec_pretty(cards)
        .map_err(StorageError::from)
        .and_then(|bytes| slot.write(&bytes));

    if let Err(e) = result {
        tracing::error!(slot = %slot.describe(), error = %e, "Failed to save card collection");
    }
}

/// The in-memory collection, newest first, plus its persistence slot.
pub struct CollectionStore<S: StorageSlot> {
    slot: S,
    cards: Vec<Card>,
}

impl<S: StorageSlot> CollectionStore<S> {
    /// Open the store and restore whatever the slot holds.
    pub fn open(slot: S) -> Self {
        let cards = load(&slot);
        tracing::debug!(slot = %slot.describe(), count = cards.len(), "Card collection loaded");
        Self { slot, cards }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.cards.iter().any(|c| c.id == id)
    }

    /// Prepend `card` unless a card with the same id exists. Returns whether
    /// the collection changed. Each change is flushed to the slot.
    pub fn insert_if_absent(&mut self, card: Card) -> bool {
        if self.contains(&card.id) {
            return false;
        }
        self.cards.insert(0, card);
        save(&self.slot, &self.cards);
        true
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }
}
