//! Input checks run before anything is sent to the service.
//!
//! The limits mirror the ones the service enforces, so obviously bad input
//! fails fast with a `client_error` instead of costing a round trip.

use serde::{Deserialize, Serialize};

use super::error::RequestError;

const BYTES_PER_MB: u64 = 1024 * 1024;

/// Accepted upload file extensions
pub const ALLOWED_FILE_EXTENSIONS: &[&str] = &["pdf"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputLimits {
    /// Maximum characters of pasted or extracted text (~500KB)
    pub max_text_chars: usize,
    /// Maximum upload size in MiB
    pub max_file_mb: u64,
    pub default_num_cards: u32,
    pub min_num_cards: u32,
    pub max_num_cards: u32,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            max_text_chars: 500_000,
            max_file_mb: 10,
            default_num_cards: 5,
            min_num_cards: 1,
            max_num_cards: 20,
        }
    }
}

type Result<T> = std::result::Result<T, RequestError>;

impl InputLimits {
    pub fn max_file_bytes(&self) -> u64 {
        self.max_file_mb * BYTES_PER_MB
    }

    /// Check the limits themselves are coherent
    pub fn check(&self) -> std::result::Result<(), String> {
        if self.max_file_mb < 1 {
            return Err("max_file_mb must be at least 1".to_string());
        }
        if self.max_text_chars < 1000 {
            return Err("max_text_chars must be at least 1000 characters".to_string());
        }
        if self.min_num_cards < 1 || self.min_num_cards > self.max_num_cards {
            return Err("min_num_cards must be between 1 and max_num_cards".to_string());
        }
        if self.default_num_cards < self.min_num_cards {
            return Err("default_num_cards cannot be less than min_num_cards".to_string());
        }
        if self.default_num_cards > self.max_num_cards {
            return Err("default_num_cards cannot exceed max_num_cards".to_string());
        }
        Ok(())
    }

    /// Trim `text` and make sure it is non-empty and within the size limit
    pub fn validate_text<'a>(&self, text: &'a str) -> Result<&'a str> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(RequestError::invalid_input("Text cannot be empty"));
        }
        if trimmed.chars().count() > self.max_text_chars {
            return Err(RequestError::invalid_input(format!(
                "Text too large. Maximum size is {} characters",
                self.max_text_chars
            )));
        }
        Ok(trimmed)
    }

    /// Apply the default card count and check the range
    pub fn resolve_num_cards(&self, requested: Option<u32>) -> Result<u32> {
        let count = requested.unwrap_or(self.default_num_cards);
        if count < self.min_num_cards || count > self.max_num_cards {
            return Err(RequestError::invalid_input(format!(
                "Number of cards must be between {} and {}",
                self.min_num_cards, self.max_num_cards
            )));
        }
        Ok(count)
    }

    /// Check an upload's name and size
    pub fn validate_file(&self, file_name: &str, size_bytes: u64) -> Result<()> {
        let extension = std::path::Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_lowercase());
        let allowed = extension
            .as_deref()
            .map(|e| ALLOWED_FILE_EXTENSIONS.contains(&e))
            .unwrap_or(false);
        if !allowed {
            return Err(RequestError::invalid_input(
                "Only PDF files are supported. Please upload a .pdf file.",
            ));
        }
        if size_bytes == 0 {
            return Err(RequestError::invalid_input("Uploaded file is empty"));
        }
        if size_bytes > self.max_file_bytes() {
            return Err(RequestError::invalid_input(format!(
                "File size exceeds {}MB limit",
                self.max_file_mb
            )));
        }
        Ok(())
    }
}
