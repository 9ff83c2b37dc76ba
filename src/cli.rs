//! CLI parser
use clap::{Args, Parser};
use std::num::{NonZeroU16, NonZeroU64};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{
    DEFAULT_API_BASE, DEFAULT_IMAGE_MODEL, DEFAULT_IMAGE_QUALITY, DEFAULT_IMAGE_SIZE,
    DEFAULT_MAX_DESCRIPTION_TOKENS, DEFAULT_OUTPUT_PREFIX, DEFAULT_VISION_MODEL,
};
use crate::error::DeghiblifyError;
use crate::imaging::OutputSize;
use crate::openai::{OpenAiClient, OpenAiSettings};
use crate::pipeline::Pipeline;
use crate::prompts::PromptTemplates;

#[derive(Parser, Debug)]
/// CLI Options
pub struct CliOptions {
    #[clap(long, help = "Enable debug logging", env = "DEGHIBLIFY_DEBUG")]
    /// Enable debug logging. Env: DEGHIBLIFY_DEBUG
    pub debug: bool,
    #[clap(long, short, default_value = "9000", env = "DEGHIBLIFY_PORT")]
    /// http listener, defaults to `9000`.
    /// Env: DEGHIBLIFY_PORT
    pub port: NonZeroU16,
    #[clap(
        long,
        short,
        default_value = "127.0.0.1",
        env = "DEGHIBLIFY_LISTEN_ADDRESS"
    )]
    /// Listen address, defaults to `127.0.0.1`.
    /// Env: DEGHIBLIFY_LISTEN_ADDRESS
    pub listen_address: String,

    #[clap(long, env = "DEGHIBLIFY_OUTPUT_SIZE")]
    /// Resize results to `WIDTHxHEIGHT` before display, eg `512x512`.
    /// Env: DEGHIBLIFY_OUTPUT_SIZE
    pub output_size: Option<OutputSize>,

    #[command(flatten)]
    /// Provider settings
    pub openai: OpenAiOptions,
}

/// Provider and prompt settings shared by every binary.
#[derive(Args, Debug, Clone)]
pub struct OpenAiOptions {
    /// OpenAI API key. Env: OPENAI_API_KEY
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// API base URL. Env: DEGHIBLIFY_API_BASE
    #[arg(long, default_value = DEFAULT_API_BASE, env = "DEGHIBLIFY_API_BASE")]
    pub api_base: String,

    /// Vision model for the description stage. Env: DEGHIBLIFY_VISION_MODEL
    #[arg(long, default_value = DEFAULT_VISION_MODEL, env = "DEGHIBLIFY_VISION_MODEL")]
    pub vision_model: String,

    /// Image model for the generation stage. Env: DEGHIBLIFY_IMAGE_MODEL
    #[arg(long, default_value = DEFAULT_IMAGE_MODEL, env = "DEGHIBLIFY_IMAGE_MODEL")]
    pub image_model: String,

    /// Request timeout in seconds; unset waits for the provider.
    /// Env: DEGHIBLIFY_TIMEOUT_SECS
    #[arg(long, env = "DEGHIBLIFY_TIMEOUT_SECS")]
    pub timeout_secs: Option<NonZeroU64>,

    /// JSON file overriding the prompt templates. Env: DEGHIBLIFY_PROMPTS
    #[arg(long, env = "DEGHIBLIFY_PROMPTS")]
    pub prompts: Option<PathBuf>,

    /// Prefix for output filenames. Env: DEGHIBLIFY_OUTPUT_PREFIX
    #[arg(long, default_value = DEFAULT_OUTPUT_PREFIX, env = "DEGHIBLIFY_OUTPUT_PREFIX")]
    pub output_prefix: String,
}

impl OpenAiOptions {
    /// Provider settings from the parsed options.
    pub fn settings(&self) -> OpenAiSettings {
        OpenAiSettings {
            api_base: self.api_base.clone(),
            vision_model: self.vision_model.clone(),
            image_model: self.image_model.clone(),
            max_description_tokens: DEFAULT_MAX_DESCRIPTION_TOKENS,
            image_size: DEFAULT_IMAGE_SIZE.to_string(),
            image_quality: DEFAULT_IMAGE_QUALITY.to_string(),
            timeout: self
                .timeout_secs
                .map(|secs| Duration::from_secs(secs.get())),
        }
    }

    /// Loads the prompt templates, falling back to the built-in ones.
    pub fn prompt_templates(&self) -> Result<PromptTemplates, DeghiblifyError> {
        match &self.prompts {
            Some(path) => PromptTemplates::from_json_file(path),
            None => Ok(PromptTemplates::default()),
        }
    }

    /// Builds the client and pipeline; fails fast without a credential.
    pub fn build_pipeline(
        &self,
    ) -> Result<(OpenAiClient, Pipeline<OpenAiClient, OpenAiClient>), DeghiblifyError> {
        let client = OpenAiClient::new(self.openai_api_key.clone(), self.settings())?;
        let pipeline = Pipeline::new(client.clone(), client.clone(), self.prompt_templates()?);
        Ok((client, pipeline))
    }
}
