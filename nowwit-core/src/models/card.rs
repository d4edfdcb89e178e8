use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Concept difficulty tier. Variant order is ascending difficulty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rarity {
    Common,
    Rare,
    Epic,
    Mythic,
}

impl Rarity {
    pub const ALL: [Rarity; 4] = [Rarity::Common, Rarity::Rare, Rarity::Epic, Rarity::Mythic];

    pub fn as_str(&self) -> &'static str {
        match self {
            Rarity::Common => "Common",
            Rarity::Rare => "Rare",
            Rarity::Epic => "Epic",
            Rarity::Mythic => "Mythic",
        }
    }
}

impl std::fmt::Display for Rarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The eight fields the model produces for one answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Insight {
    pub spirit_name: String,
    pub emoji: String,
    pub rarity: Rarity,
    pub concept: String,
    pub concept_description: String,
    pub base_project: String,
    pub base_url: String,
    pub story: String,
}

/// Why a model reply could not be turned into an [`Insight`].
#[derive(Error, Debug, PartialEq, Eq)]
pub enum InsightValidationError {
    #[error("content is not valid JSON: {0}")]
    NotJson(String),

    #[error("content is JSON but not an object")]
    NotObject,

    #[error("object does not match the card shape: {0}")]
    Shape(String),

    #[error("field `{0}` is empty")]
    EmptyField(&'static str),

    #[error("baseUrl is not an absolute http(s) URL: {0}")]
    BadUrl(String),
}

impl Insight {
    /// Parse the raw message content of a chat completion into a validated
    /// insight. The whole object is rejected on the first problem found.
    pub fn from_model_output(content: &str) -> Result<Self, InsightValidationError> {
        let value: serde_json::Value = serde_json::from_str(content.trim())
            .map_err(|e| InsightValidationError::NotJson(e.to_string()))?;

        if !value.is_object() {
            return Err(InsightValidationError::NotObject);
        }

        let insight: Insight = serde_json::from_value(value)
            .map_err(|e| InsightValidationError::Shape(e.to_string()))?;
        insight.validate()?;
        Ok(insight)
    }

    pub fn validate(&self) -> Result<(), InsightValidationError> {
        let fields: [(&'static str, &str); 7] = [
            ("spiritName", self.spirit_name.as_str()),
            ("emoji", self.emoji.as_str()),
            ("concept", self.concept.as_str()),
            ("conceptDescription", self.concept_description.as_str()),
            ("baseProject", self.base_project.as_str()),
            ("baseUrl", self.base_url.as_str()),
            ("story", self.story.as_str()),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(InsightValidationError::EmptyField(name));
            }
        }

        match url::Url::parse(self.base_url.trim()) {
            Ok(u) if u.scheme() == "http" || u.scheme() == "https" => Ok(()),
            _ => Err(InsightValidationError::BadUrl(self.base_url.clone())),
        }
    }
}

/// An insight stamped by the server with its bookkeeping fields. This is the
/// `card` object of a `POST /insight` response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedCard {
    pub id: String,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub insight: Insight,
}

impl GeneratedCard {
    pub fn stamp(insight: Insight) -> Self {
        Self::stamp_at(insight, Utc::now())
    }

    pub fn stamp_at(insight: Insight, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at,
            insight,
        }
    }

    /// Attach the question/answer pair the client sent.
    pub fn into_card(self, question: impl Into<String>, answer: impl Into<String>) -> Card {
        Card {
            id: self.id,
            created_at: self.created_at,
            question: question.into(),
            answer: answer.into(),
            insight: self.insight,
        }
    }
}

/// Body of a successful `POST /insight`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightResponse {
    pub card: GeneratedCard,
}

/// One collected card. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub question: String,
    pub answer: String,
    #[serde(flatten)]
    pub insight: Insight,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use chrono::TimeZone;

    pub fn insight(concept: &str) -> Insight {
        Insight {
            spirit_name: "Liquidity Flux".to_string(),
            emoji: "🌧️".to_string(),
            rarity: Rarity::Rare,
            concept: concept.to_string(),
            concept_description: "AMM은 유동성을 자동으로 교환해주는 온체인 마켓 메커니즘이에요.".to_string(),
            base_project: "Uniswap".to_string(),
            base_url: "https://app.uniswap.org".to_string(),
            story: "잔잔하지만 계속 변하는 시장의 mood를 닮았어.".to_string(),
        }
    }

    /// Card created at the given UTC instant.
    pub fn card(id: &str, concept: &str, y: i32, m: u32, d: u32, h: u32, min: u32) -> Card {
        Card {
            id: id.to_string(),
            created_at: Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap(),
            question: "오늘의 기분은 어때?".to_string(),
            answer: "비 오는 날처럼 차분해".to_string(),
            insight: insight(concept),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model_reply() -> serde_json::Value {
        serde_json::json!({
            "spiritName": "Quiet Rollup",
            "emoji": "🌙",
            "rarity": "Epic",
            "concept": "Optimistic Rollup",
            "conceptDescription": "트랜잭션을 묶어 L1에 게시하는 확장 기법이에요.",
            "baseProject": "Base",
            "baseUrl": "https://www.base.org",
            "story": "조용한 밤처럼 거래가 한데 모여요."
        })
    }

    #[test]
    fn test_rarity_order_is_ascending_difficulty() {
        assert!(Rarity::Common < Rarity::Rare);
        assert!(Rarity::Rare < Rarity::Epic);
        assert!(Rarity::Epic < Rarity::Mythic);
    }

    #[test]
    fn test_from_model_output_accepts_valid_object() {
        let insight = Insight::from_model_output(&model_reply().to_string()).unwrap();
        assert_eq!(insight.rarity, Rarity::Epic);
        assert_eq!(insight.concept, "Optimistic Rollup");
        assert_eq!(insight.base_url, "https://www.base.org");
    }

    #[test]
    fn test_from_model_output_tolerates_surrounding_whitespace() {
        let content = format!("\n  {}\n", model_reply());
        assert!(Insight::from_model_output(&content).is_ok());
    }

    #[test]
    fn test_from_model_output_rejects_prose() {
        let err = Insight::from_model_output("Sure! Here is your card:").unwrap_err();
        assert!(matches!(err, InsightValidationError::NotJson(_)));
    }

    #[test]
    fn test_from_model_output_rejects_empty_content() {
        let err = Insight::from_model_output("").unwrap_err();
        assert!(matches!(err, InsightValidationError::NotJson(_)));
    }

    #[test]
    fn test_from_model_output_rejects_array() {
        let content = serde_json::json!([model_reply()]).to_string();
        assert_eq!(
            Insight::from_model_output(&content).unwrap_err(),
            InsightValidationError::NotObject
        );
    }

    #[test]
    fn test_from_model_output_rejects_unknown_rarity() {
        let mut reply = model_reply();
        reply["rarity"] = serde_json::json!("Legendary");
        let err = Insight::from_model_output(&reply.to_string()).unwrap_err();
        assert!(matches!(err, InsightValidationError::Shape(_)));
    }

    #[test]
    fn test_from_model_output_rejects_missing_emoji() {
        let mut reply = model_reply();
        reply.as_object_mut().unwrap().remove("emoji");
        let err = Insight::from_model_output(&reply.to_string()).unwrap_err();
        assert!(matches!(err, InsightValidationError::Shape(_)));
    }

    #[test]
    fn test_from_model_output_rejects_blank_field() {
        let mut reply = model_reply();
        reply["story"] = serde_json::json!("   ");
        assert_eq!(
            Insight::from_model_output(&reply.to_string()).unwrap_err(),
            InsightValidationError::EmptyField("story")
        );
    }

    #[test]
    fn test_from_model_output_rejects_relative_url() {
        let mut reply = model_reply();
        reply["baseUrl"] = serde_json::json!("base.org/ecosystem");
        let err = Insight::from_model_output(&reply.to_string()).unwrap_err();
        assert!(matches!(err, InsightValidationError::BadUrl(_)));
    }

    #[test]
    fn test_from_model_output_ignores_extra_keys() {
        let mut reply = model_reply();
        reply["confidence"] = serde_json::json!(0.9);
        assert!(Insight::from_model_output(&reply.to_string()).is_ok());
    }

    #[test]
    fn test_card_serializes_flat_camel_case() {
        let card = fixtures::card("c1", "AMM", 2026, 10, 17, 3, 0);
        let v = serde_json::to_value(&card).unwrap();
        assert_eq!(v["id"], "c1");
        assert_eq!(v["spiritName"], "Liquidity Flux");
        assert_eq!(v["rarity"], "Rare");
        assert_eq!(v["conceptDescription"], card.insight.concept_description);
        assert!(v["createdAt"].as_str().unwrap().starts_with("2026-10-17T03:00:00"));
        assert!(v.get("insight").is_none(), "insight must be flattened");
    }

    #[test]
    fn test_card_reads_browser_timestamp() {
        let mut v = serde_json::to_value(fixtures::card("x", "AMM", 2026, 1, 1, 0, 0)).unwrap();
        v["createdAt"] = serde_json::json!("2025-11-20T12:34:56.789Z");
        let card: Card = serde_json::from_value(v).unwrap();
        assert_eq!(card.created_at.timestamp_millis() % 1000, 789);
    }

    #[test]
    fn test_stamp_sets_fresh_id_and_time() {
        let a = GeneratedCard::stamp(fixtures::insight("AMM"));
        let b = GeneratedCard::stamp(fixtures::insight("AMM"));
        assert_ne!(a.id, b.id);
        assert!(uuid::Uuid::parse_str(&a.id).is_ok());
    }

    #[test]
    fn test_into_card_appends_question_and_answer() {
        let generated = GeneratedCard::stamp(fixtures::insight("AMM"));
        let id = generated.id.clone();
        let card = generated.into_card("좋아하는 색깔은?", "파란색");
        assert_eq!(card.id, id);
        assert_eq!(card.question, "좋아하는 색깔은?");
        assert_eq!(card.answer, "파란색");
    }
}
