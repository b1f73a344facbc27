//! Upload compression: decode, fix orientation, cap the width, re-encode as
//! JPEG.
//!
//! Pure bytes-to-bytes transform with no I/O, so it runs on a blocking worker
//! and is fully testable with in-memory fixtures.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageOutputFormat, RgbImage};
use tracing::debug;

use super::types::{EncounterImage, NormalizeOptions, RawUpload, ResizeQuality, JPEG_MEDIA_TYPE};
use super::ImageError;

/// Maximum accepted upload size in bytes.
const MAX_IMAGE_BYTES: usize = 50 * 1024 * 1024; // 50 MB

/// Minimum valid image size in bytes (smallest valid PNG is ~67 bytes).
const MIN_IMAGE_BYTES: usize = 67;

/// Turns a raw upload into the image that is actually transmitted.
pub trait ImageNormalizer: Send + Sync {
    fn normalize(&self, upload: &RawUpload) -> Result<EncounterImage, ImageError>;
}

/// Production normalizer: width cap + JPEG re-encode.
#[derive(Debug, Clone, Default)]
pub struct JpegNormalizer {
    options: NormalizeOptions,
}

impl JpegNormalizer {
    pub fn new(options: NormalizeOptions) -> Result<Self, ImageError> {
        options.validate()?;
        Ok(Self { options })
    }

    pub fn options(&self) -> &NormalizeOptions {
        &self.options
    }
}

impl ImageNormalizer for JpegNormalizer {
    fn normalize(&self, upload: &RawUpload) -> Result<EncounterImage, ImageError> {
        self.options.validate()?;
        validate_image_bytes(&upload.bytes)?;

        let img = image::load_from_memory(&upload.bytes)
            .map_err(|e| ImageError::Decode(e.to_string()))?;

        // Phone photos store rotation in EXIF; measure after applying it.
        let img = apply_orientation(img, read_exif_orientation(&upload.bytes));
        let (orig_w, orig_h) = img.dimensions();
        let rgb = img.to_rgb8();

        let (width, height) = compute_target_dimensions(orig_w, orig_h, self.options.max_width);
        let rendered = if (width, height) == (orig_w, orig_h) {
            rgb
        } else {
            let filter = match self.options.resize_filter {
                ResizeQuality::High => FilterType::CatmullRom,
                ResizeQuality::Fast => FilterType::Triangle,
            };
            image::imageops::resize(&rgb, width, height, filter)
        };

        let bytes = encode_jpeg(rendered, self.options.jpeg_quality())?;

        debug!(
            orig_w,
            orig_h,
            width,
            height,
            input_size = upload.bytes.len(),
            jpeg_size = bytes.len(),
            "Upload normalized"
        );

        Ok(EncounterImage {
            file_name: upload.file_name.clone(),
            media_type: JPEG_MEDIA_TYPE,
            bytes,
            width,
            height,
        })
    }
}

/// Validate image bytes before decoding.
/// Rejects empty, truncated or oversized input before decoding.
pub fn validate_image_bytes(bytes: &[u8]) -> Result<(), ImageError> {
    if bytes.len() < MIN_IMAGE_BYTES {
        return Err(ImageError::InvalidInput(
            "Image data too small to be valid".into(),
        ));
    }
    if bytes.len() > MAX_IMAGE_BYTES {
        return Err(ImageError::InvalidInput(format!(
            "Image data exceeds {}MB limit",
            MAX_IMAGE_BYTES / (1024 * 1024)
        )));
    }
    Ok(())
}

/// Output size for a `width x height` source under a width cap.
///
/// Wider sources are scaled to exactly `max_width` with
/// `round(max_width / width * height)` rows (never fewer than one).
/// Anything at or under the cap keeps its size; images are never upscaled.
pub fn compute_target_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if width <= max_width {
        return (width, height);
    }
    let scaled = (f64::from(max_width) / f64::from(width) * f64::from(height)).round();
    (max_width, (scaled as u32).max(1))
}

/// Read EXIF orientation tag from raw image bytes.
/// Returns 1 (normal) if no EXIF data or tag not present.
pub fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut cursor = Cursor::new(bytes);
    let reader = match exif::Reader::new().read_from_container(&mut cursor) {
        Ok(r) => r,
        Err(_) => return 1,
    };

    reader
        .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

/// Apply EXIF orientation transform to a `DynamicImage`.
///
/// 1 = Normal, 2 = Mirrored, 3 = 180deg, 4 = Flipped V,
/// 5 = Mirrored + 90deg CW, 6 = 90deg CW, 7 = Mirrored + 270deg CW, 8 = 270deg CW
pub fn apply_orientation(img: DynamicImage, orientation: u32) -> DynamicImage {
    match orientation {
        2 => img.fliph(),
        3 => img.rotate180(),
        4 => img.flipv(),
        5 => img.rotate90().fliph(),
        6 => img.rotate90(),
        7 => img.rotate270().fliph(),
        8 => img.rotate270(),
        _ => img,
    }
}

/// Encode an RGB buffer as baseline JPEG at the given 1–100 quality.
pub fn encode_jpeg(img: RgbImage, quality: u8) -> Result<Vec<u8>, ImageError> {
    let dynamic = DynamicImage::ImageRgb8(img);
    let mut cursor = Cursor::new(Vec::new());
    dynamic
        .write_to(&mut cursor, ImageOutputFormat::Jpeg(quality))
        .map_err(|e| ImageError::Encode(e.to_string()))?;
    Ok(cursor.into_inner())
}

/// Mock normalizer for testing.
/// Skips decoding and returns a fixed 1x1 image, or fails on demand.
pub struct MockImageNormalizer {
    fail: bool,
}

impl MockImageNormalizer {
    pub fn new() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

impl Default for MockImageNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageNormalizer for MockImageNormalizer {
    fn normalize(&self, upload: &RawUpload) -> Result<EncounterImage, ImageError> {
        if self.fail {
            return Err(ImageError::Decode("Mock decode failure".into()));
        }
        Ok(EncounterImage {
            file_name: upload.file_name.clone(),
            media_type: JPEG_MEDIA_TYPE,
            bytes: vec![0xFF, 0xD8, 0xFF, 0xD9],
            width: 1,
            height: 1,
        })
    }
}
