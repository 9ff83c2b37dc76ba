//! OpenAI chat-completions (vision) and images clients.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};
use url::Url;

use crate::constants::{
    DEFAULT_API_BASE, DEFAULT_IMAGE_MODEL, DEFAULT_IMAGE_QUALITY, DEFAULT_IMAGE_SIZE,
    DEFAULT_MAX_DESCRIPTION_TOKENS, DEFAULT_VISION_MODEL,
};
use crate::error::DeghiblifyError;
use crate::imaging::SourceImage;
use crate::pipeline::{ImageModel, VisionModel};

/// Knobs for both OpenAI calls.
#[derive(Clone, Debug)]
pub struct OpenAiSettings {
    /// API base URL, e.g. `https://api.openai.com/v1/`
    pub api_base: String,
    /// Chat model that accepts image input
    pub vision_model: String,
    /// Image generation model
    pub image_model: String,
    /// `max_tokens` for the description
    pub max_description_tokens: u32,
    /// Requested image resolution
    pub image_size: String,
    /// Requested image quality tier
    pub image_quality: String,
    /// Client-side request timeout; `None` waits on the transport/provider
    pub timeout: Option<Duration>,
}

impl Default for OpenAiSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            vision_model: DEFAULT_VISION_MODEL.to_string(),
            image_model: DEFAULT_IMAGE_MODEL.to_string(),
            max_description_tokens: DEFAULT_MAX_DESCRIPTION_TOKENS,
            image_size: DEFAULT_IMAGE_SIZE.to_string(),
            image_quality: DEFAULT_IMAGE_QUALITY.to_string(),
            timeout: None,
        }
    }
}

/// Authenticated client for both pipeline stages.
#[derive(Clone)]
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    api_base: Url,
    settings: OpenAiSettings,
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("api_base", &self.api_base.as_str())
            .field("vision_model", &self.settings.vision_model)
            .field("image_model", &self.settings.image_model)
            .finish_non_exhaustive()
    }
}

// -----------------------------
// Chat completions API (vision)
// -----------------------------

#[derive(Serialize, Debug)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
}

#[derive(Serialize, Debug)]
struct ChatMessage<'a> {
    role: &'a str,
    content: ChatContent<'a>,
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
enum ChatContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Serialize, Debug)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Serialize, Debug)]
struct ImageUrl {
    url: String,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Debug)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

// -----------------------------
// Images API
// -----------------------------

/// Request body for POST /images/generations
#[derive(Serialize, Debug)]
struct ImagesGenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    n: u8,
    size: &'a str,
    quality: &'a str,
}

#[derive(Deserialize, Debug)]
struct ImagesGenerateResponse {
    #[serde(default)]
    data: Vec<ImageData>,
}

#[derive(Deserialize, Debug)]
struct ImageData {
    url: Option<String>,
    revised_prompt: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize, Debug)]
struct ApiErrorDetail {
    message: String,
}

/// Pulls `error.message` out of an OpenAI error body, else returns the body.
fn api_error_message(body: &[u8]) -> String {
    match serde_json::from_slice::<ApiErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => String::from_utf8_lossy(body).trim().to_string(),
    }
}

impl OpenAiClient {
    /// Builds a client; a missing or blank key fails immediately.
    pub fn new(api_key: Option<String>, settings: OpenAiSettings) -> Result<Self, DeghiblifyError> {
        let api_key = api_key
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
            .ok_or(DeghiblifyError::MissingApiKey)?;

        let mut base = settings.api_base.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let api_base = Url::parse(&base)?;

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;

        Ok(Self {
            http,
            api_key,
            api_base,
            settings,
        })
    }

    /// The underlying HTTP client, shared for result downloads.
    pub fn http_client(&self) -> &reqwest::Client {
        &self.http
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, DeghiblifyError> {
        let endpoint = self.api_base.join(path)?;
        let resp = self
            .http
            .post(endpoint.as_str())
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await?;

        let status = resp.status();
        let bytes = resp.bytes().await?;
        if !status.is_success() {
            return Err(DeghiblifyError::Api {
                status: status.as_u16(),
                message: api_error_message(&bytes),
            });
        }

        serde_json::from_slice(&bytes).map_err(|err| {
            DeghiblifyError::InvalidResponse(format!("{path}: {err}"))
        })
    }
}

impl VisionModel for OpenAiClient {
    #[instrument(skip_all, fields(model = %self.settings.vision_model, format = ?image.format()))]
    async fn describe(
        &self,
        system: &str,
        user: &str,
        image: &SourceImage,
    ) -> Result<String, DeghiblifyError> {
        let data_url = format!("data:{};base64,{}", image.mime_type(), image.to_base64());
        let request = ChatRequest {
            model: &self.settings.vision_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: ChatContent::Text(system),
                },
                ChatMessage {
                    role: "user",
                    content: ChatContent::Parts(vec![
                        ContentPart::Text { text: user },
                        ContentPart::ImageUrl {
                            image_url: ImageUrl { url: data_url },
                        },
                    ]),
                },
            ],
            max_tokens: self.settings.max_description_tokens,
        };

        let response: ChatResponse = self.post_json("chat/completions", &request).await?;
        response
            .choices
            .into_iter()
            .next()
            .ok_or(DeghiblifyError::EmptyResponse("choices"))
            .map(|choice| choice.message.content.unwrap_or_default())
    }
}

impl ImageModel for OpenAiClient {
    #[instrument(skip_all, fields(model = %self.settings.image_model, size = %self.settings.image_size))]
    async fn generate(&self, prompt: &str) -> Result<String, DeghiblifyError> {
        let request = ImagesGenerateRequest {
            model: &self.settings.image_model,
            prompt,
            n: 1,
            size: &self.settings.image_size,
            quality: &self.settings.image_quality,
        };

        let response: ImagesGenerateResponse =
            self.post_json("images/generations", &request).await?;
        let first = response
            .data
            .into_iter()
            .next()
            .ok_or(DeghiblifyError::EmptyResponse("image data"))?;
        if let Some(revised_prompt) = first.revised_prompt {
            debug!("Revised prompt from OpenAI: {revised_prompt}");
        }
        first.url.ok_or(DeghiblifyError::EmptyResponse("image url"))
    }
}
