//! Assembly of the generation request snapshot.

use serde::Serialize;

use crate::ingest::Upload;
use crate::options::GenerationOptions;

/// The optional reference images sent alongside the subject.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AuxiliaryImages {
    /// Product to interact with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub product: Option<Upload>,
    /// Clothing to wear.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clothing: Option<Upload>,
    /// Logo to place.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<Upload>,
}

impl AuxiliaryImages {
    /// Present images with their role labels, in product, clothing, logo order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Upload)> {
        [("product", &self.product), ("clothing", &self.clothing), ("logo", &self.logo)]
            .into_iter()
            .filter_map(|(role, slot)| slot.as_ref().map(|u| (role, u)))
    }

    /// Number of images present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.iter().count()
    }
}

/// Everything sent to the generation service for one attempt.
///
/// Built fresh per attempt and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationRequest {
    /// The subject image, already cropped to `options.aspect`.
    pub cropped_model: Upload,
    /// Whichever auxiliary images were supplied.
    pub auxiliary: AuxiliaryImages,
    /// Styles, quality, aspect, and count.
    pub options: GenerationOptions,
    /// The final prompt, synthesized if the user left it blank.
    pub prompt: String,
}

/// Build a request from already-validated parts.
#[must_use]
pub fn build(
    cropped_model: Upload,
    auxiliary: AuxiliaryImages,
    options: GenerationOptions,
    prompt: String,
) -> GenerationRequest {
    GenerationRequest { cropped_model, auxiliary, options, prompt }
}
