//! Prompt text for both pipeline stages, kept as data.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::constants::DESCRIPTION_PLACEHOLDER;
use crate::error::DeghiblifyError;

const DESCRIPTION_SYSTEM: &str = "You are an expert in character realism transformation. Your job is to convert anime-style characters \
into their most faithful, photorealistic versions while preserving recognizable features such as face shape, \
hairstyle, and expression. Ensure the description remains natural and suitable for generating realistic portraits \
with DALL·E or similar models. Do not describe the image as anime or cartoon.";

const DESCRIPTION_USER: &str = "Please describe what this anime-style character would look like as a real human. \
Keep the age, gender, hairstyle, and clothing style close to the original. \
Do not use anime-related terms. Provide a realistic, vivid description suitable for photorealistic rendering.";

const GENERATION: &str = "Photorealistic portrait of a person based on this description: {description}. \
The person should closely resemble the facial structure, hairstyle, and outfit in the reference image, \
but rendered as a realistic human in a natural studio portrait. No anime or fantasy elements.";

/// The prompt-template pair driving the describe-then-generate pipeline.
#[derive(Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PromptTemplates {
    /// System instruction sent with the image
    pub description_system: String,
    /// User instruction sent with the image
    pub description_user: String,
    /// Image prompt; `{description}` is replaced by the stage 1 output
    pub generation: String,
}

impl Default for PromptTemplates {
    fn default() -> Self {
        Self {
            description_system: DESCRIPTION_SYSTEM.to_string(),
            description_user: DESCRIPTION_USER.to_string(),
            generation: GENERATION.to_string(),
        }
    }
}

impl PromptTemplates {
    /// Reads templates from a JSON file; absent keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, DeghiblifyError> {
        let raw = std::fs::read_to_string(path).map_err(|err| {
            DeghiblifyError::Config(format!(
                "Failed to read prompt file {}: {err}",
                path.display()
            ))
        })?;
        Ok(serde_json::from_str(&raw)?)
    }

    /// Fills the generation template with a description.
    ///
    /// A template without the placeholder gets the description appended.
    pub fn render_generation(&self, description: &str) -> String {
        if self.generation.contains(DESCRIPTION_PLACEHOLDER) {
            self.generation.replace(DESCRIPTION_PLACEHOLDER, description)
        } else {
            format!("{} {}", self.generation, description)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_generation_wraps_description() {
        let prompt = PromptTemplates::default().render_generation("a young woman with short brown hair");
        assert!(prompt.starts_with(
            "Photorealistic portrait of a person based on this description: a young woman with short brown hair. "
        ));
        assert!(prompt.ends_with("No anime or fantasy elements."));
    }

    #[test]
    fn template_without_placeholder_appends() {
        let templates = PromptTemplates {
            generation: "Studio photo:".to_string(),
            ..PromptTemplates::default()
        };
        assert_eq!(templates.render_generation("a boy"), "Studio photo: a boy");
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prompts.json");
        std::fs::write(&path, r#"{"generation": "Portrait of {description}"}"#).expect("write");

        let templates = PromptTemplates::from_json_file(&path).expect("load prompts");
        assert_eq!(templates.generation, "Portrait of {description}");
        assert_eq!(templates.description_user, DESCRIPTION_USER);
    }

    #[test]
    fn bad_json_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("prompts.json");
        std::fs::write(&path, "not json").expect("write");

        assert!(matches!(
            PromptTemplates::from_json_file(&path),
            Err(DeghiblifyError::Config(_))
        ));
    }
}
