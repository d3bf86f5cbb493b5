//! Typed operations against the study generation service

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use super::client::{ApiRequest, MultipartForm, RequestClient, RequestOptions, Result};
use super::error::RequestError;
use super::models::{
    FlashcardsResponse, GenerateRequest, GeneratedMaterial, HealthResponse, QuizResponse,
    TestResponse, UploadResponse,
};
use super::validation::InputLimits;
use crate::study_sets::StudyMode;

const PDF_MIME: &str = "application/pdf";

/// Source material for `/upload`: a PDF, pasted text, or both
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadInput {
    pub file: Option<PathBuf>,
    pub text: Option<String>,
}

impl UploadInput {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            file: None,
            text: Some(text.into()),
        }
    }

    pub fn from_file(path: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(path.into()),
            text: None,
        }
    }
}

/// Client for the upload / generate / health endpoints
#[derive(Clone)]
pub struct StudyApi {
    client: RequestClient,
    options: RequestOptions,
    limits: InputLimits,
}

impl StudyApi {
    pub fn new(client: RequestClient, options: RequestOptions) -> Self {
        Self {
            client,
            options,
            limits: InputLimits::default(),
        }
    }

    pub fn with_limits(mut self, limits: InputLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn client(&self) -> &RequestClient {
        &self.client
    }

    pub fn options(&self) -> &RequestOptions {
        &self.options
    }

    pub fn limits(&self) -> &InputLimits {
        &self.limits
    }

    /// `GET /health`, single attempt
    pub async fn health(&self) -> Result<HealthResponse> {
        self.client.get("/health").await
    }

    pub async fn upload_text(&self, text: &str) -> Result<UploadResponse> {
        self.upload(UploadInput::from_text(text)).await
    }

    pub async fn upload_file(&self, path: &Path) -> Result<UploadResponse> {
        self.upload(UploadInput::from_file(path)).await
    }

    pub async fn upload(&self, input: UploadInput) -> Result<UploadResponse> {
        self.upload_with_cancel(input, &CancellationToken::new())
            .await
    }

    /// Validate and send `input` as a multipart form to `/upload`
    pub async fn upload_with_cancel(
        &self,
        input: UploadInput,
        cancel: &CancellationToken,
    ) -> Result<UploadResponse> {
        if input.file.is_none() && input.text.is_none() {
            return Err(RequestError::invalid_input(
                "Please provide either a PDF file or text input",
            ));
        }

        let mut form = MultipartForm::new();
        if let Some(path) = &input.file {
            let (file_name, bytes) = self.read_pdf(path).await?;
            form = form.file("file", file_name, bytes, PDF_MIME);
        }
        if let Some(text) = &input.text {
            let text = self.limits.validate_text(text)?;
            form = form.text("text", text);
        }

        let request = ApiRequest::post_form("/upload", form);
        let response: UploadResponse = self
            .client
            .request_with_cancel(&request, &self.options, cancel)
            .await?;
        log::info!(
            "Uploaded source material ({} chars extracted)",
            response.extracted_text.chars().count()
        );
        Ok(response)
    }

    async fn read_pdf(&self, path: &Path) -> Result<(String, Vec<u8>)> {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| {
                RequestError::invalid_input(format!("Not a file path: {}", path.display()))
            })?;

        let metadata = tokio::fs::metadata(path).await.map_err(|e| {
            RequestError::invalid_input(format!("Cannot read {}: {}", path.display(), e))
        })?;
        self.limits.validate_file(&file_name, metadata.len())?;

        let bytes = tokio::fs::read(path).await.map_err(|e| {
            RequestError::invalid_input(format!("Cannot read {}: {}", path.display(), e))
        })?;
        Ok((file_name, bytes))
    }

    pub async fn generate(
        &self,
        text: &str,
        mode: StudyMode,
        num_cards: Option<u32>,
    ) -> Result<GeneratedMaterial> {
        self.generate_with_cancel(text, mode, num_cards, &CancellationToken::new())
            .await
    }

    /// Ask the service to generate `mode` material from `text`.
    ///
    /// `num_cards` falls back to the configured default; for test mode the
    /// service spreads the count across its question kinds.
    pub async fn generate_with_cancel(
        &self,
        text: &str,
        mode: StudyMode,
        num_cards: Option<u32>,
        cancel: &CancellationToken,
    ) -> Result<GeneratedMaterial> {
        let text = self.limits.validate_text(text)?;
        let num_cards = self.limits.resolve_num_cards(num_cards)?;

        let body = GenerateRequest {
            text: text.to_string(),
            mode,
            num_cards,
        };
        let request = ApiRequest::post_json("/generate", &body)?;

        // Decode inside each attempt so a misshapen body is retried like any
        // other server error
        let material = match mode {
            StudyMode::Flashcards => {
                self.generate_as::<FlashcardsResponse>(&request, cancel)
                    .await?
            }
            StudyMode::Quiz => self.generate_as::<QuizResponse>(&request, cancel).await?,
            StudyMode::Test => self.generate_as::<TestResponse>(&request, cancel).await?,
        };
        log::info!(
            "Generated {} {} item(s)",
            material.payload.item_count(),
            mode
        );
        Ok(material)
    }

    async fn generate_as<R>(
        &self,
        request: &ApiRequest,
        cancel: &CancellationToken,
    ) -> Result<GeneratedMaterial>
    where
        R: DeserializeOwned + Into<GeneratedMaterial>,
    {
        let response: R = self
            .client
            .request_with_cancel(request, &self.options, cancel)
            .await?;
        Ok(response.into())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use axum::extract::{Multipart, State};
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use tempfile::TempDir;

    use super::*;
    use crate::api::error::RequestErrorKind;
    use crate::study_sets::StudyPayload;

    type Hits = Arc<AtomicUsize>;

    async fn health() -> Json<Value> {
        Json(json!({"status": "healthy", "version": "0.1.0", "ollama_configured": false}))
    }

    async fn generate(
        State(hits): State<Hits>,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        hits.fetch_add(1, Ordering::SeqCst);
        let count = body["num_cards"].as_u64().unwrap_or(0) as usize;
        let response = match body["mode"].as_str() {
            Some("flashcards") => json!({
                "flashcards": (0..count)
                    .map(|i| json!({"question": format!("Q{}", i), "answer": format!("A{}", i)}))
                    .collect::<Vec<_>>(),
                "summary": format!("Generated {} flashcards", count)
            }),
            Some("quiz") => json!({
                "questions": [{
                    "question": "Which organelle makes ATP?",
                    "options": ["Nucleus", "Mitochondria", "Ribosome", "Golgi"],
                    "correct_answer": "Mitochondria"
                }],
                "summary": "1 question"
            }),
            _ => json!({
                "multiple_choice": [],
                "true_false": [{"statement": "ATP stores energy", "answer": true}],
                "short_answer": [],
                "summary": "1 question"
            }),
        };
        (StatusCode::OK, Json(response))
    }

    /// Answers every mode with a body shaped for some other mode
    async fn misshapen(State(hits): State<Hits>, Json(body): Json<Value>) -> Json<Value> {
        hits.fetch_add(1, Ordering::SeqCst);
        match body["mode"].as_str() {
            Some("flashcards") => Json(json!({"questions": [], "summary": ""})),
            _ => Json(json!({"flashcards": []})),
        }
    }

    async fn upload(
        State(hits): State<Hits>,
        mut multipart: Multipart,
    ) -> (StatusCode, Json<Value>) {
        hits.fetch_add(1, Ordering::SeqCst);
        let mut names = Vec::new();
        let mut text = String::new();
        while let Ok(Some(field)) = multipart.next_field().await {
            let name = field.name().unwrap_or_default().to_string();
            if name == "text" {
                text = field.text().await.unwrap_or_default();
            }
            names.push(name);
        }
        if names.is_empty() {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"detail": "Please provide either a PDF file or text input"})),
            );
        }
        (
            StatusCode::OK,
            Json(json!({
                "extracted_text": text,
                "chunks": names,
                "file_info": null
            })),
        )
    }

    async fn serve(app: Router<Hits>, max_retries: u32) -> (StudyApi, Hits) {
        let hits: Hits = Arc::new(AtomicUsize::new(0));
        let app = app.with_state(Arc::clone(&hits));
        let base_url = crate::api::client::test_server::spawn(app).await;
        let options = RequestOptions::default()
            .with_max_retries(max_retries)
            .with_retry_delay(Duration::from_millis(5));
        let api = StudyApi::new(RequestClient::new(base_url).unwrap(), options);
        (api, hits)
    }

    async fn start() -> (StudyApi, Hits) {
        let app = Router::new()
            .route("/health", get(health))
            .route("/generate", post(generate))
            .route("/upload", post(upload));
        serve(app, 1).await
    }

    #[tokio::test]
    async fn test_health() {
        let (api, _) = start().await;
        let health = api.health().await.unwrap();
        assert!(health.is_healthy());
        assert!(!health.ai_backend_configured());
    }

    #[tokio::test]
    async fn test_generate_flashcards_uses_default_count() {
        let (api, hits) = start().await;
        let material = api
            .generate("  Cells are the unit of life.  ", StudyMode::Flashcards, None)
            .await
            .unwrap();

        assert_eq!(material.payload.item_count(), 5);
        assert_eq!(material.summary, "Generated 5 flashcards");
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_generate_quiz() {
        let (api, _) = start().await;
        let material = api
            .generate("Mitochondria produce ATP.", StudyMode::Quiz, Some(1))
            .await
            .unwrap();
        match material.payload {
            StudyPayload::Quiz { quiz_questions } => {
                assert_eq!(quiz_questions[0].correct_index(), Some(1));
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_test() {
        let (api, _) = start().await;
        let material = api
            .generate("ATP stores energy.", StudyMode::Test, Some(3))
            .await
            .unwrap();
        assert_eq!(material.payload.mode(), StudyMode::Test);
        assert_eq!(material.payload.item_count(), 1);
    }

    #[tokio::test]
    async fn test_misshapen_body_is_retried_server_error_in_every_mode() {
        let app = Router::new().route("/generate", post(misshapen));
        let (api, hits) = serve(app, 2).await;

        let mut expected_hits = 0;
        for mode in [StudyMode::Flashcards, StudyMode::Quiz, StudyMode::Test] {
            let err = api.generate("Some notes", mode, Some(3)).await.unwrap_err();
            expected_hits += 3;

            assert_eq!(err.kind, RequestErrorKind::ServerError, "mode {}", mode);
            assert_eq!(err.status_code, Some(200), "mode {}", mode);
            assert_eq!(hits.load(Ordering::SeqCst), expected_hits, "mode {}", mode);
        }
    }

    #[tokio::test]
    async fn test_invalid_input_never_reaches_service() {
        let (api, hits) = start().await;

        let err = api.generate("   ", StudyMode::Quiz, None).await.unwrap_err();
        assert_eq!(err.kind, RequestErrorKind::ClientError);
        assert!(api
            .generate("notes", StudyMode::Quiz, Some(21))
            .await
            .is_err());
        assert!(api.upload(UploadInput::default()).await.is_err());

        let temp_dir = TempDir::new().unwrap();
        let docx = temp_dir.path().join("notes.docx");
        std::fs::write(&docx, b"not a pdf").unwrap();
        let err = api.upload_file(&docx).await.unwrap_err();
        assert_eq!(err.error_code.as_deref(), Some("invalid_input"));

        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_upload_text_and_file() {
        let (api, hits) = start().await;

        let response = api.upload_text("Photosynthesis").await.unwrap();
        assert_eq!(response.extracted_text, "Photosynthesis");
        assert_eq!(response.chunks, vec!["text"]);

        let temp_dir = TempDir::new().unwrap();
        let pdf = temp_dir.path().join("notes.pdf");
        std::fs::write(&pdf, b"%PDF-1.4 minimal").unwrap();
        let response = api.upload_file(&pdf).await.unwrap();
        assert_eq!(response.chunks, vec!["file"]);

        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }
}
