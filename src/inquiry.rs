//! OCR-extraction payloads handed in by the upstream image pipeline.
//!
//! The core consumes only two fields: the inquiry text (falling back to the
//! full extracted text when the inquiry is missing or too short to be real)
//! and the client name used to personalize the greeting.

use serde::{Deserialize, Serialize};

/// An inquiry shorter than this is treated as extraction noise.
const MIN_INQUIRY_CHARS: usize = 5;

/// What the OCR/image-extraction collaborator produces for one upload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtractedInquiry {
    pub extracted_text: String,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub inquiry: String,
    #[serde(default)]
    pub questions: Vec<String>,
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
}

impl ExtractedInquiry {
    /// The text to actually answer: the extracted inquiry, unless it is
    /// empty or under 5 characters, in which case the raw extracted text.
    pub fn effective_inquiry(&self) -> &str {
        let inquiry = self.inquiry.trim();
        if inquiry.len() >= MIN_INQUIRY_CHARS {
            inquiry
        } else {
            self.extracted_text.trim()
        }
    }

    pub fn client_name(&self) -> Option<&str> {
        self.client_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}
