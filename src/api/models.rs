//! Wire types of the study generation service

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::study_sets::{
    FlashcardItem, QuizQuestion, ShortAnswerQuestion, StudyMode, StudyPayload, TestData,
    TrueFalseQuestion,
};

/// Metadata about a processed upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    pub filename: String,
    pub size_bytes: u64,
    pub extracted_chars: u64,
    pub processed: bool,
}

/// Response from `POST /upload`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub extracted_text: String,
    #[serde(default)]
    pub chunks: Vec<String>,
    #[serde(default)]
    pub file_info: Option<FileInfo>,
}

/// Body of `POST /generate`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub text: String,
    pub mode: StudyMode,
    pub num_cards: u32,
}

/// Body of a flashcards `/generate` response
#[derive(Debug, Deserialize)]
pub struct FlashcardsResponse {
    pub flashcards: Vec<FlashcardItem>,
    #[serde(default)]
    pub summary: String,
}

/// Body of a quiz `/generate` response
#[derive(Debug, Deserialize)]
pub struct QuizResponse {
    pub questions: Vec<QuizQuestion>,
    #[serde(default)]
    pub summary: String,
}

/// Body of a test `/generate` response. All three sections are required,
/// even when empty.
#[derive(Debug, Deserialize)]
pub struct TestResponse {
    pub multiple_choice: Vec<QuizQuestion>,
    pub true_false: Vec<TrueFalseQuestion>,
    pub short_answer: Vec<ShortAnswerQuestion>,
    #[serde(default)]
    pub summary: String,
}

/// Study material decoded from a `/generate` response
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedMaterial {
    pub payload: StudyPayload,
    pub summary: String,
}

impl From<FlashcardsResponse> for GeneratedMaterial {
    fn from(response: FlashcardsResponse) -> Self {
        Self {
            payload: StudyPayload::Flashcards {
                flashcards: response.flashcards,
            },
            summary: response.summary,
        }
    }
}

impl From<QuizResponse> for GeneratedMaterial {
    fn from(response: QuizResponse) -> Self {
        Self {
            payload: StudyPayload::Quiz {
                quiz_questions: response.questions,
            },
            summary: response.summary,
        }
    }
}

impl From<TestResponse> for GeneratedMaterial {
    fn from(response: TestResponse) -> Self {
        Self {
            payload: StudyPayload::Test {
                test_data: TestData {
                    multiple_choice: response.multiple_choice,
                    true_false: response.true_false,
                    short_answer: response.short_answer,
                },
            },
            summary: response.summary,
        }
    }
}

impl GeneratedMaterial {
    /// Decode an already-parsed `/generate` body for `mode`
    pub fn from_response(mode: StudyMode, body: serde_json::Value) -> serde_json::Result<Self> {
        let material = match mode {
            StudyMode::Flashcards => serde_json::from_value::<FlashcardsResponse>(body)?.into(),
            StudyMode::Quiz => serde_json::from_value::<QuizResponse>(body)?.into(),
            StudyMode::Test => serde_json::from_value::<TestResponse>(body)?.into(),
        };
        Ok(material)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Response from `GET /health`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    /// `<backend>_configured` flags, e.g. `ollama_configured`
    #[serde(flatten)]
    pub backends: BTreeMap<String, serde_json::Value>,
}

impl HealthResponse {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }

    /// Names of AI backends the service reports as configured
    pub fn configured_backends(&self) -> Vec<&str> {
        self.backends
            .iter()
            .filter(|(_, v)| v.as_bool() == Some(true))
            .filter_map(|(k, _)| k.strip_suffix("_configured"))
            .collect()
    }

    pub fn ai_backend_configured(&self) -> bool {
        !self.configured_backends().is_empty()
    }
}
