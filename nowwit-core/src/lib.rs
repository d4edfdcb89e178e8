pub mod client;
pub mod config;
pub mod error;
pub mod generator;
pub mod models;
pub mod questions;
pub mod quota;
pub mod session;
pub mod store;
pub mod views;

pub use client::{InsightClient, InsightError, RemoteCardGenerator};
pub use config::NowwitConfig;
pub use error::{NowwitError, StorageError};
pub use generator::{CardGenerator, ChatCompletionClient, ChatModelConfig, GenerationError};
pub use models::{Card, GeneratedCard, Insight, InsightResponse, Rarity};
pub use questions::QuestionPicker;
pub use quota::QuotaGate;
pub use session::{Availability, CardSession, Outcome};
pub use store::{CollectionStore, FileSlot, MemorySlot, StorageSlot};
pub use views::ConceptSummary;
