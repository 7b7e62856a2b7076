//! Generation options: styles, quality, aspect, and image count.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};

use crate::aspect::AspectRatio;

/// Smallest number of images a request may ask for.
pub const MIN_COUNT: u32 = 1;
/// Largest number of images a request may ask for.
pub const MAX_COUNT: u32 = 8;

/// Aspect ratios offered by the option picker.
pub const ASPECT_CHOICES: &[&str] = &["9:16", "16:9", "1:1"];

/// A style tag. Variant order is the canonical display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Style {
    /// "Chuyên nghiệp" (professional).
    Professional,
    /// "Sang trọng" (luxurious).
    Luxurious,
    /// "Tự nhiên" (natural).
    Natural,
    /// "Hiện đại" (modern).
    Modern,
    /// "Tập trung vào da" (skin-focused).
    SkinFocus,
}

impl Style {
    /// Every style in canonical order.
    pub const ALL: [Style; 5] =
        [Self::Professional, Self::Luxurious, Self::Natural, Self::Modern, Self::SkinFocus];

    /// The label shown to the user and sent in prompts.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Professional => "Chuyên nghiệp",
            Self::Luxurious => "Sang trọng",
            Self::Natural => "Tự nhiên",
            Self::Modern => "Hiện đại",
            Self::SkinFocus => "Tập trung vào da",
        }
    }
}

impl fmt::Display for Style {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Style {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL.into_iter().find(|style| style.label() == s).ok_or_else(|| {
            let valid: Vec<&str> = Self::ALL.iter().map(|st| st.label()).collect();
            format!("Unsupported style '{s}'. Valid: {}", valid.join(", "))
        })
    }
}

impl Serialize for Style {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Output quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quality {
    /// 1080p.
    Hd,
    /// 2K.
    TwoK,
    /// 4K.
    FourK,
    /// 8K.
    EightK,
}

impl Quality {
    /// Every quality tier in display order.
    pub const ALL: [Quality; 4] = [Self::Hd, Self::TwoK, Self::FourK, Self::EightK];

    /// The label shown to the user and sent to the service.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Hd => "1080p",
            Self::TwoK => "2K",
            Self::FourK => "4K",
            Self::EightK => "8K",
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Quality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|q| q.label().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("Unsupported quality '{s}'. Valid: 1080p, 2K, 4K, 8K"))
    }
}

impl Serialize for Quality {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

/// Validate that an aspect ratio is one of the offered choices.
///
/// # Errors
///
/// Returns an error if the ratio is not offered or cannot be parsed.
pub fn validate_aspect(ratio: &str) -> Result<AspectRatio, String> {
    if !ASPECT_CHOICES.contains(&ratio.trim()) {
        return Err(format!("Unsupported aspect ratio '{ratio}'. Valid: {ASPECT_CHOICES:?}"));
    }
    AspectRatio::parse(ratio).map_err(|e| e.to_string())
}

/// Clamp a requested image count into the supported range.
#[must_use]
pub fn clamp_count(count: i64) -> u32 {
    let clamped = count.clamp(i64::from(MIN_COUNT), i64::from(MAX_COUNT));
    u32::try_from(clamped).unwrap_or(MIN_COUNT)
}

/// User-selected options for a generation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerationOptions {
    /// Selected styles, unique and kept in canonical order.
    pub styles: BTreeSet<Style>,
    /// Quality tier.
    pub quality: Quality,
    /// Target aspect ratio for cropping and generation.
    #[serde(serialize_with = "serialize_aspect")]
    pub aspect: AspectRatio,
    count: u32,
}

fn serialize_aspect<S: Serializer>(aspect: &AspectRatio, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(aspect.as_str())
}

impl GenerationOptions {
    /// Build options, clamping `count` into range.
    #[must_use]
    pub fn new(
        styles: impl IntoIterator<Item = Style>,
        quality: Quality,
        aspect: AspectRatio,
        count: i64,
    ) -> Self {
        Self { styles: styles.into_iter().collect(), quality, aspect, count: clamp_count(count) }
    }

    /// Number of images to request, always within `[1, 8]`.
    #[must_use]
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Set the image count, clamping into range.
    pub fn set_count(&mut self, count: i64) {
        self.count = clamp_count(count);
    }

    /// Select or deselect a style.
    pub fn toggle_style(&mut self, style: Style, checked: bool) {
        if checked {
            self.styles.insert(style);
        } else {
            self.styles.remove(&style);
        }
    }
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self::new([Style::Professional], Quality::EightK, AspectRatio::default(), 2)
    }
}
