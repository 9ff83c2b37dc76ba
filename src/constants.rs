//! Shared constants/defaults
//!

/// Default OpenAI API base; endpoint paths are joined onto it
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1/";

/// Vision-capable chat model used for the description stage
pub const DEFAULT_VISION_MODEL: &str = "gpt-4o";

/// Image model used for the generation stage
pub const DEFAULT_IMAGE_MODEL: &str = "dall-e-3";

/// Response size limit for the description
pub const DEFAULT_MAX_DESCRIPTION_TOKENS: u32 = 700;

/// Generated image resolution
pub const DEFAULT_IMAGE_SIZE: &str = "1024x1024";

/// Generated image quality tier
pub const DEFAULT_IMAGE_QUALITY: &str = "standard";

/// Prefix for downloaded result filenames
pub const DEFAULT_OUTPUT_PREFIX: &str = "deghiblified";

/// `chrono` format for filename timestamps
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Upload extensions accepted by the web front end
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp"];

/// Largest accepted upload, in bytes
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Placeholder replaced by the description in the generation template
pub const DESCRIPTION_PLACEHOLDER: &str = "{description}";
