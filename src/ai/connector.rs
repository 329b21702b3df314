// src/ai/connector.rs
use super::error::GenerationError;

/// An image returned by a generator.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    /// `data:image/png;base64,...` payload for display and download.
    pub data_uri: String,
    /// Decoded image bytes.
    pub bytes: Vec<u8>,
    /// MIME type reported by the API.
    pub mime_type: String,
}

/// Trait defining the interface for hug image generation
pub trait HugGenerator: Send + Sync {
    /// Compose one image from a childhood photo and an adult photo.
    ///
    /// Both inputs are base64 payloads, with or without a data URI prefix.
    /// A single attempt is made; every failure is terminal for this call.
    fn generate(&self, child_image: &str, adult_image: &str) -> Result<GeneratedImage, GenerationError>;

    /// Name of the backend for logs and the UI footer.
    fn name(&self) -> &str;
}
