//! Describe-then-generate pipeline.
//!
//! Stage one sends the source image to a vision model and gets back a
//! description of the character as a real person. Stage two wraps that text
//! in the generation template and asks an image model for a portrait. Both
//! calls are made once, in order, and any error is returned unchanged.

use std::future::Future;
use std::path::Path;

use tracing::{debug, info, instrument};
use url::Url;

use crate::error::DeghiblifyError;
use crate::imaging::SourceImage;
use crate::prompts::PromptTemplates;

/// A model that describes an image in text.
pub trait VisionModel {
    /// Returns the raw description for `image` under the given instructions.
    fn describe(
        &self,
        system: &str,
        user: &str,
        image: &SourceImage,
    ) -> impl Future<Output = Result<String, DeghiblifyError>> + Send;
}

/// A model that renders a text prompt into a hosted image.
pub trait ImageModel {
    /// Returns the URL of the single generated image.
    fn generate(&self, prompt: &str)
    -> impl Future<Output = Result<String, DeghiblifyError>> + Send;
}

/// Text produced by the description stage.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CharacterDescription(String);

impl CharacterDescription {
    /// The description text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CharacterDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Remote location of a generated image. Providers expire these, so download promptly.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GeneratedImageReference(Url);

impl GeneratedImageReference {
    /// The image URL.
    pub fn url(&self) -> &Url {
        &self.0
    }

    /// The image URL as text.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl std::fmt::Display for GeneratedImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// The two stages plus the prompts that drive them.
#[derive(Clone, Debug)]
pub struct Pipeline<V, I> {
    vision: V,
    images: I,
    prompts: PromptTemplates,
}

impl<V, I> Pipeline<V, I>
where
    V: VisionModel + Sync,
    I: ImageModel + Sync,
{
    /// Wires up the stages.
    pub fn new(vision: V, images: I, prompts: PromptTemplates) -> Self {
        Self {
            vision,
            images,
            prompts,
        }
    }

    /// Describes raw image bytes. Bytes that don't decode as an image fail
    /// here, before anything is sent.
    pub async fn describe(&self, image_bytes: Vec<u8>) -> Result<CharacterDescription, DeghiblifyError> {
        let image = SourceImage::from_bytes(image_bytes)?;
        self.describe_image(&image).await
    }

    /// Describes an already-checked image.
    #[instrument(skip_all, fields(bytes = image.bytes().len()))]
    pub async fn describe_image(
        &self,
        image: &SourceImage,
    ) -> Result<CharacterDescription, DeghiblifyError> {
        let raw = self
            .vision
            .describe(
                &self.prompts.description_system,
                &self.prompts.description_user,
                image,
            )
            .await?;
        let description = raw.trim().to_string();
        debug!("Character description: {description}");
        Ok(CharacterDescription(description))
    }

    /// Renders a portrait for `description`. Any string is accepted, including
    /// an empty one; the provider decides what is valid.
    #[instrument(skip_all, fields(chars = description.chars().count()))]
    pub async fn generate(
        &self,
        description: &str,
    ) -> Result<GeneratedImageReference, DeghiblifyError> {
        let prompt = self.prompts.render_generation(description);
        let url = self.images.generate(&prompt).await?;
        Ok(GeneratedImageReference(Url::parse(url.trim())?))
    }

    /// Runs both stages on the image at `path`.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub async fn transform(&self, path: &Path) -> Result<GeneratedImageReference, DeghiblifyError> {
        let image = SourceImage::read(path).await?;
        info!("Describing {:?} image", image.format());
        let description = self.describe_image(&image).await?;
        info!("Generating portrait");
        let reference = self.generate(description.as_str()).await?;
        info!("Generated image at {}", reference.url().host_str().unwrap_or_default());
        Ok(reference)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::tests::sample_png;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeVision {
        reply: String,
        calls: Mutex<Vec<(String, String)>>,
    }

    impl VisionModel for FakeVision {
        async fn describe(
            &self,
            system: &str,
            user: &str,
            _image: &SourceImage,
        ) -> Result<String, DeghiblifyError> {
            if let Ok(mut calls) = self.calls.lock() {
                calls.push((system.to_string(), user.to_string()));
            }
            Ok(self.reply.clone())
        }
    }

    #[derive(Default)]
    struct FakeImages {
        reply: Option<String>,
        prompts: Mutex<Vec<String>>,
    }

    impl ImageModel for FakeImages {
        async fn generate(&self, prompt: &str) -> Result<String, DeghiblifyError> {
            if let Ok(mut prompts) = self.prompts.lock() {
                prompts.push(prompt.to_string());
            }
            self.reply.clone().ok_or(DeghiblifyError::Api {
                status: 429,
                message: "Rate limit reached for requests".to_string(),
            })
        }
    }

    fn pipeline(description: &str, url: Option<&str>) -> Pipeline<FakeVision, FakeImages> {
        Pipeline::new(
            FakeVision {
                reply: description.to_string(),
                ..FakeVision::default()
            },
            FakeImages {
                reply: url.map(str::to_string),
                ..FakeImages::default()
            },
            PromptTemplates::default(),
        )
    }

    #[tokio::test]
    async fn transform_returns_generated_url() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("chihiro.png");
        std::fs::write(&path, sample_png(6, 6)).expect("write");

        let pipeline = pipeline(
            "  a young woman with short brown hair\n",
            Some("https://example/img.png"),
        );
        let reference = pipeline.transform(&path).await.expect("transform");
        assert_eq!(reference.as_str(), "https://example/img.png");

        let prompts = pipeline.images.prompts.lock().expect("lock");
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("based on this description: a young woman with short brown hair."));

        let calls = pipeline.vision.calls.lock().expect("lock");
        assert_eq!(calls[0].0, PromptTemplates::default().description_system);
    }

    #[tokio::test]
    async fn describe_rejects_non_images_without_calling_out() {
        let pipeline = pipeline("unused", Some("https://example/img.png"));
        let result = pipeline.describe(b"GIF? no, just text".to_vec()).await;
        assert!(matches!(result, Err(DeghiblifyError::Image(_))));
        assert!(pipeline.vision.calls.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn describe_passes_empty_text_through() {
        let pipeline = pipeline("   ", None);
        let description = pipeline.describe(sample_png(2, 2)).await.expect("describe");
        assert_eq!(description.as_str(), "");
    }

    #[tokio::test]
    async fn empty_description_still_calls_generator() {
        let pipeline = pipeline("", None);
        let result = pipeline.generate("").await;
        assert!(matches!(result, Err(DeghiblifyError::Api { status: 429, .. })));
        assert_eq!(pipeline.images.prompts.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn transform_surfaces_missing_file() {
        let pipeline = pipeline("x", Some("https://example/img.png"));
        let result = pipeline.transform(Path::new("/definitely/not/here.png")).await;
        assert!(matches!(result, Err(DeghiblifyError::Io(_))));
    }

    #[tokio::test]
    async fn bad_url_from_provider_is_an_error() {
        let pipeline = pipeline("x", Some("not a url"));
        assert!(matches!(
            pipeline.generate("x").await,
            Err(DeghiblifyError::InvalidUrl(_))
        ));
    }
}
