use std::path::Path;

use base64::Engine as _;

use super::ImageError;

/// Media type of every normalized image.
pub const JPEG_MEDIA_TYPE: &str = "image/jpeg";

pub const DEFAULT_MAX_WIDTH: u32 = 800;
pub const DEFAULT_QUALITY: f32 = 0.7;

/// A file exactly as the user picked it. Never transmitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawUpload {
    pub file_name: String,
    /// Media type guessed from the file name; informational only.
    pub declared_type: String,
    pub bytes: Vec<u8>,
}

impl RawUpload {
    pub fn new(file_name: &str, bytes: Vec<u8>) -> Self {
        let declared_type = mime_guess::from_path(file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        Self {
            file_name: base_name(file_name),
            declared_type,
            bytes,
        }
    }

    /// Read an upload from disk.
    pub fn from_path(path: &Path) -> Result<Self, ImageError> {
        let bytes = std::fs::read(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        Ok(Self::new(&name, bytes))
    }
}

/// Last path component, tolerating both separator styles from browsers.
fn base_name(file_name: &str) -> String {
    file_name
        .rsplit(['/', '\\'])
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("upload")
        .to_string()
}

/// Re-encoded image ready for upload. Only the normalizer creates these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncounterImage {
    /// Base name of the original upload.
    pub file_name: String,
    pub media_type: &'static str,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl EncounterImage {
    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }

    /// `data:image/jpeg;base64,...` form used by the JSON triage endpoint.
    pub fn to_data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.to_base64())
    }
}

/// Resize filter quality levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeQuality {
    /// CatmullRom: sharp downscales without ringing.
    High,
    /// Triangle (bilinear): faster, softer.
    Fast,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NormalizeOptions {
    /// Output never exceeds this width.
    pub max_width: u32,
    /// Lossy quality factor in (0, 1].
    pub quality: f32,
    pub resize_filter: ResizeQuality,
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_MAX_WIDTH,
            quality: DEFAULT_QUALITY,
            resize_filter: ResizeQuality::High,
        }
    }
}

impl NormalizeOptions {
    pub fn validate(&self) -> Result<(), ImageError> {
        if self.max_width == 0 {
            return Err(ImageError::InvalidOptions(
                "max_width must be at least 1".into(),
            ));
        }
        if !(self.quality > 0.0 && self.quality <= 1.0) {
            return Err(ImageError::InvalidOptions(format!(
                "quality must be in (0, 1], got {}",
                self.quality
            )));
        }
        Ok(())
    }

    /// JPEG encoder quality on its 1–100 scale.
    pub fn jpeg_quality(&self) -> u8 {
        (self.quality * 100.0).round().clamp(1.0, 100.0) as u8
    }
}
