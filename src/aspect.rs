//! Center-cropping of the subject image to a target aspect ratio.
//!
//! The geometry lives in [`crop_region`] so it can be checked without any
//! image codec; [`crop_to_aspect`] wraps it with decoding and re-encoding.

use std::fmt;
use std::io::Cursor;

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageDecoder, ImageFormat, ImageReader};

use crate::error::StudioError;
use crate::ingest::RawFile;

/// JPEG quality used when re-encoding cropped images (0-100).
pub const JPEG_QUALITY: u8 = 95;

/// A target width:height proportion.
#[derive(Debug, Clone, PartialEq)]
pub struct AspectRatio {
    width: f64,
    height: f64,
    label: String,
}

impl AspectRatio {
    /// Parse a `"W:H"` string. Both components must be finite and positive.
    ///
    /// # Errors
    ///
    /// Returns [`StudioError::InvalidAspectRatio`] for anything else.
    pub fn parse(input: &str) -> Result<Self, StudioError> {
        let invalid = || StudioError::InvalidAspectRatio(input.to_string());
        let (w, h) = input.split_once(':').ok_or_else(invalid)?;
        let width: f64 = w.trim().parse().map_err(|_| invalid())?;
        let height: f64 = h.trim().parse().map_err(|_| invalid())?;
        if !(width.is_finite() && height.is_finite() && width > 0.0 && height > 0.0) {
            return Err(invalid());
        }
        Ok(Self { width, height, label: input.trim().to_string() })
    }

    /// The ratio as a single number, `W / H`.
    #[must_use]
    pub fn value(&self) -> f64 {
        self.width / self.height
    }

    /// The string this ratio was parsed from, e.g. `"9:16"`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.label
    }
}

impl Default for AspectRatio {
    /// Portrait `9:16`.
    fn default() -> Self {
        Self { width: 9.0, height: 16.0, label: "9:16".to_string() }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// A rectangle within the source image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropRect {
    /// Left edge.
    pub x: u32,
    /// Top edge.
    pub y: u32,
    /// Width of the kept region.
    pub width: u32,
    /// Height of the kept region.
    pub height: u32,
}

/// Compute the centered region of a `width`×`height` image matching `ratio`.
///
/// A relatively wider source keeps its full height, a relatively taller one
/// its full width, and an exact match keeps the full frame. The cropped
/// extent is truncated to whole pixels.
#[must_use]
pub fn crop_region(width: u32, height: u32, ratio: &AspectRatio) -> CropRect {
    let source = f64::from(width) / f64::from(height);
    let target = ratio.value();

    if source > target {
        let crop_width = whole_pixels(f64::from(height) * target).clamp(1, width);
        CropRect { x: (width - crop_width) / 2, y: 0, width: crop_width, height }
    } else if source < target {
        let crop_height = whole_pixels(f64::from(width) / target).clamp(1, height);
        CropRect { x: 0, y: (height - crop_height) / 2, width, height: crop_height }
    } else {
        CropRect { x: 0, y: 0, width, height }
    }
}

// Absorbs float error such as 1079.9999999 before truncating.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_pixels(value: f64) -> u32 {
    (value + 1e-6).floor() as u32
}

/// Crop an image file to `ratio`, keeping its name and encoding format.
///
/// The source's EXIF orientation is applied before measuring, so the crop
/// works on the image as displayed; the output carries no orientation tag.
/// Pixels are copied without scaling. Formats without an encoder fall back
/// to PNG, and the returned MIME type always matches the returned bytes.
///
/// # Errors
///
/// Returns [`StudioError::DecodeFailure`] if the source is not a readable
/// image, or [`StudioError::EncodeFailure`] if the result cannot be encoded.
pub fn crop_to_aspect(file: &RawFile, ratio: &AspectRatio) -> Result<RawFile, StudioError> {
    let img = decode_upright(file)?;
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(StudioError::DecodeFailure(format!("{}: image has no pixels", file.name)));
    }

    let rect = crop_region(width, height, ratio);
    tracing::debug!(
        source = %format!("{width}x{height}"),
        ratio = %ratio,
        x = rect.x,
        y = rect.y,
        width = rect.width,
        height = rect.height,
        "cropping subject image"
    );
    let cropped = img.crop_imm(rect.x, rect.y, rect.width, rect.height);

    let (bytes, mime_type) = encode(&cropped, &file.mime_type)?;
    Ok(RawFile { name: file.name.clone(), mime_type, bytes })
}

fn decode_upright(file: &RawFile) -> Result<DynamicImage, StudioError> {
    let failed = |e: &dyn fmt::Display| StudioError::DecodeFailure(format!("{}: {e}", file.name));
    let mut decoder = ImageReader::new(Cursor::new(&file.bytes))
        .with_guessed_format()
        .map_err(|e| failed(&e))?
        .into_decoder()
        .map_err(|e| failed(&e))?;
    let orientation = decoder.orientation().map_err(|e| failed(&e))?;
    let mut img = DynamicImage::from_decoder(decoder).map_err(|e| failed(&e))?;
    img.apply_orientation(orientation);
    Ok(img)
}

fn encode(img: &DynamicImage, mime_type: &str) -> Result<(Vec<u8>, String), StudioError> {
    let format = ImageFormat::from_mime_type(mime_type)
        .filter(|f| matches!(f, ImageFormat::Png | ImageFormat::Jpeg | ImageFormat::WebP))
        .unwrap_or(ImageFormat::Png);

    let mut buf = Cursor::new(Vec::new());
    let written = match format {
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
            DynamicImage::ImageRgb8(img.to_rgb8()).write_with_encoder(encoder)
        }
        ImageFormat::WebP => DynamicImage::ImageRgba8(img.to_rgba8()).write_to(&mut buf, format),
        _ => img.write_to(&mut buf, format),
    };
    written.map_err(|e| StudioError::EncodeFailure(e.to_string()))?;

    Ok((buf.into_inner(), format.to_mime_type().to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratio(s: &str) -> AspectRatio {
        AspectRatio::parse(s).unwrap()
    }

    fn encoded(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::new_rgb8(width, height);
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, format).unwrap();
        buf.into_inner()
    }

    #[test]
    fn parse_valid_ratios() {
        assert!((ratio("16:9").value() - 16.0 / 9.0).abs() < f64::EPSILON);
        assert!((ratio("1.5:1").value() - 1.5).abs() < f64::EPSILON);
        assert_eq!(ratio("9:16").as_str(), "9:16");
    }

    #[test]
    fn parse_rejects_malformed_input() {
        for bad in ["", "16", "16:", ":9", "a:b", "0:1", "1:0", "-1:1", "1:2:3", "inf:1", "NaN:1"] {
            assert!(
                matches!(AspectRatio::parse(bad), Err(StudioError::InvalidAspectRatio(_))),
                "expected '{bad}' to be rejected"
            );
        }
    }

    #[test]
    fn landscape_to_square_crops_width_centered() {
        let rect = crop_region(1920, 1080, &ratio("1:1"));
        assert_eq!(rect, CropRect { x: 420, y: 0, width: 1080, height: 1080 });
    }

    #[test]
    fn portrait_to_landscape_crops_height_centered() {
        let rect = crop_region(1080, 1920, &ratio("16:9"));
        assert_eq!(rect, CropRect { x: 0, y: 656, width: 1080, height: 607 });
    }

    #[test]
    fn matching_ratio_keeps_full_frame() {
        let rect = crop_region(1920, 1080, &ratio("16:9"));
        assert_eq!(rect, CropRect { x: 0, y: 0, width: 1920, height: 1080 });
    }

    #[test]
    fn region_matches_target_within_a_pixel() {
        let sources = [(1920, 1080), (1080, 1920), (640, 480), (333, 777), (1, 1), (4000, 3)];
        for r in ["9:16", "16:9", "1:1", "4:5", "21:9"] {
            let target = ratio(r).value();
            for (w, h) in sources {
                let rect = crop_region(w, h, &ratio(r));
                assert!(rect.x + rect.width <= w && rect.y + rect.height <= h);

                let (rw, rh) = (f64::from(rect.width), f64::from(rect.height));
                // one pixel of slack on the axis that was cut, as a ratio error
                let (pixel_error, tolerance) = if rect.height == h {
                    ((rw - rh * target).abs(), 1.0 / rh)
                } else {
                    ((rh - rw / target).abs(), target / rh)
                };
                assert!(pixel_error <= 1.0, "{w}x{h} -> {r} gave {rect:?}");
                assert!(
                    (rw / rh - target).abs() <= tolerance + 1e-9,
                    "{w}x{h} -> {r} gave ratio {} (tolerance {tolerance})",
                    rw / rh
                );
            }
        }
    }

    #[test]
    fn crop_file_produces_cropped_dimensions() {
        let source = RawFile::new("model.png", "image/png", encoded(1920, 1080, ImageFormat::Png));
        let out = crop_to_aspect(&source, &ratio("1:1")).unwrap();

        assert_eq!(out.name, "model.png");
        assert_eq!(out.mime_type, "image/png");
        let decoded = image::load_from_memory(&out.bytes).unwrap();
        assert_eq!(decoded.dimensions(), (1080, 1080));
    }

    #[test]
    fn crop_preserves_jpeg_format() {
        let source = RawFile::new("model.jpg", "image/jpeg", encoded(300, 400, ImageFormat::Jpeg));
        let out = crop_to_aspect(&source, &ratio("16:9")).unwrap();

        assert_eq!(out.mime_type, "image/jpeg");
        assert_eq!(image::guess_format(&out.bytes).unwrap(), ImageFormat::Jpeg);
        assert_eq!(image::load_from_memory(&out.bytes).unwrap().dimensions(), (300, 168));
    }

    /// Insert an EXIF APP1 segment carrying only an Orientation tag.
    fn with_exif_orientation(jpeg: &[u8], orientation: u8) -> Vec<u8> {
        let mut app1 = vec![0xFF, 0xE1, 0x00, 0x22];
        app1.extend_from_slice(b"Exif\0\0");
        app1.extend_from_slice(&[b'M', b'M', 0x00, 0x2A, 0x00, 0x00, 0x00, 0x08]);
        app1.extend_from_slice(&[0x00, 0x01]);
        app1.extend_from_slice(&[0x01, 0x12, 0x00, 0x03, 0x00, 0x00, 0x00, 0x01]);
        app1.extend_from_slice(&[0x00, orientation, 0x00, 0x00]);
        app1.extend_from_slice(&[0x00, 0x00, 0x00, 0x00]);

        let mut out = jpeg[..2].to_vec();
        out.extend(app1);
        out.extend_from_slice(&jpeg[2..]);
        out
    }

    #[test]
    fn rotated_phone_photo_is_cropped_as_displayed() {
        // stored landscape, displayed portrait (Orientation=6)
        let stored = encoded(40, 20, ImageFormat::Jpeg);
        let source = RawFile::new("phone.jpg", "image/jpeg", with_exif_orientation(&stored, 6));

        let out = crop_to_aspect(&source, &ratio("9:16")).unwrap();

        assert_eq!(image::load_from_memory(&out.bytes).unwrap().dimensions(), (20, 35));
    }

    #[test]
    fn untagged_jpeg_keeps_stored_orientation() {
        let source = RawFile::new("flat.jpg", "image/jpeg", encoded(40, 20, ImageFormat::Jpeg));
        let out = crop_to_aspect(&source, &ratio("9:16")).unwrap();
        assert_eq!(image::load_from_memory(&out.bytes).unwrap().dimensions(), (11, 20));
    }

    #[test]
    fn unknown_mime_falls_back_to_png() {
        let source = RawFile::new("model.bin", "image/x-custom", encoded(10, 10, ImageFormat::Png));
        let out = crop_to_aspect(&source, &ratio("1:1")).unwrap();
        assert_eq!(out.mime_type, "image/png");
    }

    #[test]
    fn undecodable_source_fails() {
        let source = RawFile::new("model.png", "image/png", b"not an image".to_vec());
        assert!(matches!(
            crop_to_aspect(&source, &ratio("1:1")),
            Err(StudioError::DecodeFailure(_))
        ));
    }
}
