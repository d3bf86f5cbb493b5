//! Resilient HTTP client for the study generation service.
//!
//! Every call runs as a sequence of attempts. Each attempt is bounded by
//! `RequestOptions::timeout`; retryable failures (server errors, timeouts,
//! network failures) are retried up to `max_retries` times with an
//! exponential delay of `retry_delay * 2^(n-1)` before retry `n`. Client
//! errors are returned immediately. A cancelled token aborts the in-flight
//! attempt and any pending delay.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;

use super::error::{RequestError, RequestErrorKind};

pub type Result<T> = std::result::Result<T, RequestError>;

/// Default per-attempt deadline
pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(60_000);
/// Default base delay before the first retry
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(1_000);

/// Timeout and retry policy for a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestOptions {
    /// Maximum wall-clock time of a single attempt
    pub timeout: Duration,
    /// Additional attempts after the first failure
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each further retry
    pub retry_delay: Duration,
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_retries: 0,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

impl RequestOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }

    /// Delay before retry `retry` (1-indexed)
    pub fn delay_before_retry(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        self.retry_delay.saturating_mul(factor)
    }
}

/// One field of a multipart form
#[derive(Debug, Clone)]
pub enum FormField {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        bytes: Vec<u8>,
        mime: String,
    },
}

/// Multipart body description. Kept as plain data so the form can be
/// rebuilt for every attempt.
#[derive(Debug, Clone, Default)]
pub struct MultipartForm {
    fields: Vec<FormField>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(FormField::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        mime: impl Into<String>,
    ) -> Self {
        self.fields.push(FormField::File {
            name: name.into(),
            file_name: file_name.into(),
            bytes,
            mime: mime.into(),
        });
        self
    }

    pub fn fields(&self) -> &[FormField] {
        &self.fields
    }

    fn to_form(&self) -> Result<Form> {
        let mut form = Form::new();
        for field in &self.fields {
            form = match field {
                FormField::Text { name, value } => form.text(name.clone(), value.clone()),
                FormField::File {
                    name,
                    file_name,
                    bytes,
                    mime,
                } => {
                    let part = Part::bytes(bytes.clone())
                        .file_name(file_name.clone())
                        .mime_str(mime)
                        .map_err(|e| {
                            RequestError::invalid_input(format!(
                                "Invalid MIME type '{}': {}",
                                mime, e
                            ))
                        })?;
                    form.part(name.clone(), part)
                }
            };
        }
        Ok(form)
    }
}

/// Request body variants
#[derive(Debug, Clone, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(serde_json::Value),
    /// Multipart form; the transport sets the content type and boundary
    Form(MultipartForm),
}

/// A request against the service. `target` is a path relative to the
/// client's base URL, or an absolute URL.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub target: String,
    pub body: RequestBody,
    pub headers: HeaderMap,
}

impl ApiRequest {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self {
            method,
            target: target.into(),
            body: RequestBody::Empty,
            headers: HeaderMap::new(),
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::GET, target)
    }

    pub fn post_json<B: Serialize + ?Sized>(target: impl Into<String>, body: &B) -> Result<Self> {
        let value = serde_json::to_value(body).map_err(|e| {
            RequestError::invalid_input(format!("Request body is not serializable: {}", e))
        })?;
        let mut request = Self::new(Method::POST, target);
        request.body = RequestBody::Json(value);
        Ok(request)
    }

    pub fn post_form(target: impl Into<String>, form: MultipartForm) -> Self {
        let mut request = Self::new(Method::POST, target);
        request.body = RequestBody::Form(form);
        request
    }

    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }
}

/// HTTP client with per-attempt timeout, bounded retry and error classification
#[derive(Clone)]
pub struct RequestClient {
    client: Client,
    base_url: String,
}

impl RequestClient {
    /// Create a client for the service at `base_url`
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        // Normalize URL - ensure no trailing slash
        let base_url = base_url.into().trim_end_matches('/').to_string();

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(RequestError::invalid_input(format!(
                "Service URL must start with http:// or https://: {}",
                base_url
            )));
        }

        let client = Client::builder()
            .user_agent(concat!("studyforge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| {
                RequestError::new(
                    RequestErrorKind::Network,
                    format!("HTTP client build failed: {}", e),
                )
            })?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build full URL for a target
    fn url(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            return target.to_string();
        }
        let path = target.trim_start_matches('/');
        if path.is_empty() {
            self.base_url.clone()
        } else {
            format!("{}/{}", self.base_url, path)
        }
    }

    /// Perform `request`, retrying per `options`, and decode the JSON body as `T`
    pub async fn request<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        options: &RequestOptions,
    ) -> Result<T> {
        self.request_with_cancel(request, options, &CancellationToken::new())
            .await
    }

    /// Like [`request`](Self::request), aborting as soon as `cancel` fires
    pub async fn request_with_cancel<T: DeserializeOwned>(
        &self,
        request: &ApiRequest,
        options: &RequestOptions,
        cancel: &CancellationToken,
    ) -> Result<T> {
        let url = self.url(&request.target);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RequestError::cancelled()),
                result = self.attempt::<T>(&url, request, options) => result,
            };

            let err = match result {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            if !err.is_retryable() || attempt > options.max_retries {
                if attempt > 1 {
                    log::error!(
                        "{} {} failed after {} attempts: {}",
                        request.method,
                        url,
                        attempt,
                        err
                    );
                }
                return Err(err);
            }

            let delay = options.delay_before_retry(attempt);
            log::warn!(
                "{} {} failed ({}), retry {}/{} in {} ms",
                request.method,
                url,
                err,
                attempt,
                options.max_retries,
                delay.as_millis()
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RequestError::cancelled()),
                _ = sleep(delay) => {}
            }
        }
    }

    /// One attempt bounded by the configured timeout
    async fn attempt<T: DeserializeOwned>(
        &self,
        url: &str,
        request: &ApiRequest,
        options: &RequestOptions,
    ) -> Result<T> {
        match tokio::time::timeout(options.timeout, self.send_once(url, request)).await {
            Ok(result) => result,
            Err(_) => Err(RequestError::timeout(options.timeout.as_millis())),
        }
    }

    async fn send_once<T: DeserializeOwned>(&self, url: &str, request: &ApiRequest) -> Result<T> {
        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .headers(request.headers.clone());

        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Form(form) => builder.multipart(form.to_form()?),
        };

        let response = builder
            .send()
            .await
            .map_err(|e| RequestError::from_transport(&e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| RequestError::from_transport(&e))?;

        if !status.is_success() {
            return Err(RequestError::from_response(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| RequestError {
            kind: RequestErrorKind::ServerError,
            message: format!("Invalid response body: {}", e),
            status_code: Some(status.as_u16()),
            error_code: None,
        })
    }

    /// GET with default options (no retries)
    pub async fn get<T: DeserializeOwned>(&self, target: &str) -> Result<T> {
        self.request(&ApiRequest::get(target), &RequestOptions::default())
            .await
    }

    /// POST a JSON body
    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        target: &str,
        body: &B,
        options: &RequestOptions,
    ) -> Result<T> {
        self.request(&ApiRequest::post_json(target, body)?, options)
            .await
    }

    /// POST a multipart form
    pub async fn post_form<T: DeserializeOwned>(
        &self,
        target: &str,
        form: MultipartForm,
        options: &RequestOptions,
    ) -> Result<T> {
        self.request(&ApiRequest::post_form(target, form), options)
            .await
    }
}
