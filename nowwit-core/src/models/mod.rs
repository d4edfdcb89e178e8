pub mod card;

pub use card::{Card, GeneratedCard, Insight, InsightResponse, InsightValidationError, Rarity};
