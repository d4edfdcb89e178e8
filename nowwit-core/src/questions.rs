//! Daily question selection.

use rand::seq::SliceRandom;
use rand::Rng;

pub const DEFAULT_QUESTIONS: [&str; 5] = [
    "오늘의 기분은 어때?",
    "지금 보는 창 밖의 풍경을 한 단어로 말해줘.",
    "지금 가장 갖고 싶은 능력은 뭐야?",
    "좋아하는 색깔은?",
    "오늘 하루의 vibe를 한 문장으로 적어줘.",
];

/// A fixed, ordered, non-empty list of prompts.
#[derive(Debug, Clone)]
pub struct QuestionPicker {
    questions: Vec<String>,
}

impl QuestionPicker {
    /// Returns `None` when no usable prompt remains after dropping blank entries.
    pub fn new<I, S>(questions: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let questions: Vec<String> = questions
            .into_iter()
            .map(Into::into)
            .filter(|q| !q.trim().is_empty())
            .collect();
        if questions.is_empty() {
            None
        } else {
            Some(Self { questions })
        }
    }

    pub fn questions(&self) -> &[String] {
        &self.questions
    }

    /// Uniform pick driven by the given random source. No memory of earlier picks.
    pub fn pick_with<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        // non-empty by construction
        self.questions
            .choose(rng)
            .map(String::as_str)
            .unwrap_or_default()
    }

    pub fn pick(&self) -> &str {
        self.pick_with(&mut rand::thread_rng())
    }
}

impl Default for QuestionPicker {
    fn default() -> Self {
        Self {
            questions: DEFAULT_QUESTIONS.iter().map(|q| q.to_string()).collect(),
        }
    }
}
