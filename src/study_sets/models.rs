//! Data models for saved study sets

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::api::GeneratedMaterial;

/// Kind of study material a set holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StudyMode {
    Flashcards,
    Quiz,
    Test,
}

impl StudyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            StudyMode::Flashcards => "flashcards",
            StudyMode::Quiz => "quiz",
            StudyMode::Test => "test",
        }
    }
}

impl fmt::Display for StudyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StudyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "flashcards" | "flashcard" => Ok(StudyMode::Flashcards),
            "quiz" => Ok(StudyMode::Quiz),
            "test" => Ok(StudyMode::Test),
            other => Err(format!(
                "unknown study mode '{}' (expected flashcards, quiz or test)",
                other
            )),
        }
    }
}

/// A single question/answer card
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlashcardItem {
    pub question: String,
    pub answer: String,
}

/// Multiple choice question with exactly four options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question: String,
    pub options: [String; 4],
    /// Text of the correct option
    #[serde(alias = "correct_answer")]
    pub correct_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

impl QuizQuestion {
    /// Index of the correct option, if the answer matches one of them
    pub fn correct_index(&self) -> Option<usize> {
        let answer = self.correct_answer.trim();
        self.options
            .iter()
            .position(|o| o.trim().eq_ignore_ascii_case(answer))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrueFalseQuestion {
    pub statement: String,
    pub answer: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShortAnswerQuestion {
    pub question: String,
    pub answer: String,
    /// Terms a correct free-text answer is expected to mention
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
}

/// The three sections of a generated test, each in study order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestData {
    #[serde(default, alias = "multiple_choice")]
    pub multiple_choice: Vec<QuizQuestion>,
    #[serde(default, alias = "true_false")]
    pub true_false: Vec<TrueFalseQuestion>,
    #[serde(default, alias = "short_answer")]
    pub short_answer: Vec<ShortAnswerQuestion>,
}

impl TestData {
    pub fn question_count(&self) -> usize {
        self.multiple_choice.len() + self.true_false.len() + self.short_answer.len()
    }
}

/// Study material of a set. The variant is the set's mode, so the two can
/// never disagree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum StudyPayload {
    Flashcards {
        flashcards: Vec<FlashcardItem>,
    },
    Quiz {
        #[serde(rename = "quizQuestions")]
        quiz_questions: Vec<QuizQuestion>,
    },
    Test {
        #[serde(rename = "testData")]
        test_data: TestData,
    },
}

impl StudyPayload {
    pub fn mode(&self) -> StudyMode {
        match self {
            StudyPayload::Flashcards { .. } => StudyMode::Flashcards,
            StudyPayload::Quiz { .. } => StudyMode::Quiz,
            StudyPayload::Test { .. } => StudyMode::Test,
        }
    }

    /// Number of cards or questions in the payload
    pub fn item_count(&self) -> usize {
        match self {
            StudyPayload::Flashcards { flashcards } => flashcards.len(),
            StudyPayload::Quiz { quiz_questions } => quiz_questions.len(),
            StudyPayload::Test { test_data } => test_data.question_count(),
        }
    }
}

/// A named, persisted set of generated study material
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudySet {
    pub id: Uuid,
    pub name: String,
    #[serde(flatten)]
    pub payload: StudyPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_text: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StudySet {
    pub fn new(request: CreateStudySet) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: request.name,
            payload: request.payload,
            source_text: request.source_text,
            tags: normalize_tags(request.tags),
            summary: request.summary,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mode(&self) -> StudyMode {
        self.payload.mode()
    }

    /// Refresh `updated_at`. It always moves forward, even when the clock
    /// reads the same instant as the previous mutation.
    pub(crate) fn touch(&mut self) {
        let now = Utc::now();
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::microseconds(1)
        };
    }

    /// Case-insensitive substring match on the name or any tag.
    /// `needle` must already be lowercase.
    pub(crate) fn matches(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(needle)
            || self.tags.iter().any(|t| t.to_lowercase().contains(needle))
    }
}

/// Request to create a new study set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStudySet {
    pub name: String,
    #[serde(flatten)]
    pub payload: StudyPayload,
    #[serde(default)]
    pub source_text: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

impl CreateStudySet {
    pub fn new(name: impl Into<String>, payload: StudyPayload) -> Self {
        Self {
            name: name.into(),
            payload,
            source_text: None,
            tags: Vec::new(),
            summary: None,
        }
    }

    /// Request for a set holding freshly generated material and its summary
    pub fn from_generated(name: impl Into<String>, material: GeneratedMaterial) -> Self {
        let summary = Some(material.summary).filter(|s| !s.trim().is_empty());
        Self {
            summary,
            ..Self::new(name, material.payload)
        }
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_source_text(mut self, source_text: impl Into<String>) -> Self {
        self.source_text = Some(source_text.into());
        self
    }

    pub fn with_summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }
}

/// Partial update for a study set; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStudySet {
    pub name: Option<String>,
    pub tags: Option<Vec<String>>,
    pub source_text: Option<String>,
    pub summary: Option<String>,
    /// Replacement material; must keep the set's mode
    pub payload: Option<StudyPayload>,
}

impl UpdateStudySet {
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Default::default()
        }
    }
}

/// Trim tags, drop empty ones and case-insensitive duplicates (first spelling wins)
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(tags.len());
    let mut result = Vec::with_capacity(tags.len());
    for tag in tags {
        let trimmed = tag.trim();
        if trimmed.is_empty() {
            continue;
        }
        let key = trimmed.to_lowercase();
        if seen.contains(&key) {
            continue;
        }
        seen.push(key);
        result.push(trimmed.to_string());
    }
    result
}
