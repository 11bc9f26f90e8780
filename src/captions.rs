//! Caption generation: input checks, prompt construction, provider call and
//! normalisation of the model's JSON into `{captions, hashtags}`.

use base64::{engine::general_purpose, Engine as _};
use image::ImageFormat;
use serde::{Deserialize, Serialize};

use crate::errors::Error;
use crate::provider::{ChatCompletionRequest, ChatMessage, ContentPart, ImageUrl, ProviderClient, ProviderError};

pub const ALLOWED_TYPES: [&str; 4] = ["image/jpeg", "image/png", "image/webp", "image/gif"];
pub const DEFAULT_TONE: &str = "Witty";
pub const DEFAULT_COUNT: &str = "3";
pub const DEFAULT_MIME: &str = "image/jpeg";
pub const HASHTAG_COUNT: usize = 8;
pub const MAX_TOKENS: u32 = 1024;
pub const TEMPERATURE: f32 = 0.8;

#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct CaptionRequest {
    pub image: Option<UploadedImage>,
    pub tone: String,
    /// Passed to the model as-is; never parsed
    pub count: String,
}

impl Default for CaptionRequest {
    fn default() -> Self {
        Self {
            image: None,
            tone: DEFAULT_TONE.to_string(),
            count: DEFAULT_COUNT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionResult {
    #[serde(default)]
    pub captions: Vec<String>,
    #[serde(default)]
    pub hashtags: Vec<String>,
}

/// Settings that stay fixed for the life of the server
#[derive(Debug, Clone)]
pub struct CaptionSettings {
    pub model: String,
    pub verify_image_bytes: bool,
}

fn format_for(mime: &str) -> Option<ImageFormat> {
    match mime {
        "image/jpeg" => Some(ImageFormat::Jpeg),
        "image/png" => Some(ImageFormat::Png),
        "image/webp" => Some(ImageFormat::WebP),
        "image/gif" => Some(ImageFormat::Gif),
        _ => None,
    }
}

/// Check the upload and return the validated image.
pub fn validate_image(image: Option<&UploadedImage>, verify_bytes: bool) -> Result<&UploadedImage, Error> {
    let image = image.ok_or(Error::MissingImage { message: None })?;
    if image.file_name.is_empty() {
        return Err(Error::MissingImage {
            message: Some("No file selected.".to_string()),
        });
    }

    let unsupported = || Error::UnsupportedType {
        mime: image.mime_type.clone(),
    };
    let declared = format_for(&image.mime_type).ok_or_else(unsupported)?;

    if verify_bytes {
        match image::guess_format(&image.bytes) {
            Ok(actual) if actual == declared => {}
            Ok(actual) => {
                tracing::debug!(declared = %image.mime_type, ?actual, "Image bytes do not match declared type");
                return Err(unsupported());
            }
            Err(_) => return Err(unsupported()),
        }
    }

    Ok(image)
}

pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", general_purpose::STANDARD.encode(bytes))
}

pub fn build_prompt(tone: &str, count: &str) -> String {
    let tone = tone.to_lowercase();
    format!(
        r#"Analyze this image and generate exactly {count} Instagram caption(s) with a {tone} tone.

Return ONLY valid JSON, no markdown and no extra text:
{{
  "captions": ["caption 1", "caption 2"],
  "hashtags": ["tag1","tag2","tag3","tag4","tag5","tag6","tag7","tag8"]
}}

Rules:
- Match the {tone} tone perfectly
- Use emojis naturally inside captions
- Each caption: 1-3 sentences
- Exactly {count} caption(s)
- Exactly {HASHTAG_COUNT} relevant hashtags WITHOUT the # symbol"#
    )
}

pub fn build_chat_request(model: &str, image: &UploadedImage, tone: &str, count: &str) -> ChatCompletionRequest {
    ChatCompletionRequest {
        model: model.to_string(),
        messages: vec![ChatMessage {
            role: "user".to_string(),
            content: vec![
                ContentPart::ImageUrl {
                    image_url: ImageUrl {
                        url: data_uri(&image.mime_type, &image.bytes),
                    },
                },
                ContentPart::Text {
                    text: build_prompt(tone, count),
                },
            ],
        }],
        max_tokens: MAX_TOKENS,
        temperature: TEMPERATURE,
    }
}

/// Remove Markdown code fences the model sometimes adds around its JSON.
pub fn strip_code_fences(raw: &str) -> String {
    raw.trim().replace("```json", "").replace("```", "").trim().to_string()
}

/// Parse the model's reply into the fixed result shape. Missing keys become
/// empty lists and unknown keys are dropped.
pub fn parse_completion(raw: &str) -> Result<CaptionResult, Error> {
    let cleaned = strip_code_fences(raw);
    let mut result: CaptionResult =
        serde_json::from_str(&cleaned).map_err(|e| Error::MalformedResponse { detail: e.to_string() })?;

    for tag in result.hashtags.iter_mut() {
        let trimmed = tag.trim_start_matches('#');
        if trimmed.len() != tag.len() {
            *tag = trimmed.to_string();
        }
    }
    Ok(result)
}

fn is_auth_failure(err: &ProviderError) -> bool {
    match err {
        ProviderError::Http { status, body } => status.as_u16() == 401 || body.contains("invalid_api_key"),
        _ => false,
    }
}

fn map_provider_error(err: ProviderError, client: &ProviderClient) -> Error {
    if is_auth_failure(&err) {
        return Error::Unauthenticated {
            message: Some("API key is invalid. Please re-enter your Groq key.".to_string()),
        };
    }
    match err {
        ProviderError::Timeout => Error::ProviderTimeout {
            secs: client.timeout().as_secs(),
        },
        ProviderError::Decode(detail) => Error::MalformedResponse { detail },
        other => Error::Provider {
            message: other.to_string(),
        },
    }
}

/// Validate the request, ask the provider for captions, and normalise the reply.
pub async fn generate(
    client: &ProviderClient,
    settings: &CaptionSettings,
    api_key: &str,
    request: &CaptionRequest,
) -> Result<CaptionResult, Error> {
    if api_key.is_empty() {
        return Err(Error::Unauthenticated { message: None });
    }
    let image = validate_image(request.image.as_ref(), settings.verify_image_bytes)?;

    tracing::info!(
        mime = %image.mime_type,
        size = image.bytes.len(),
        tone = %request.tone,
        count = %request.count,
        "Generating captions"
    );

    let chat = build_chat_request(&settings.model, image, &request.tone, &request.count);
    let raw = client
        .chat_completion(api_key, &chat)
        .await
        .map_err(|e| map_provider_error(e, client))?;

    let result = parse_completion(&raw)?;
    if result.hashtags.len() != HASHTAG_COUNT {
        tracing::debug!(hashtags = result.hashtags.len(), "Model returned an unexpected number of hashtags");
    }
    Ok(result)
}
