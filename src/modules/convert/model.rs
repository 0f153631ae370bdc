use crate::constants::{self, DEFAULT_FILENAME};

/// One buffered `images` part. Lives only for the duration of the request.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Quality tier selected by the `compressionLevel` form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionLevel {
    #[default]
    Normal,
    Compressed,
    Ultra,
}

impl CompressionLevel {
    /// Unknown values fall back to `Normal`.
    pub fn from_form(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "ultra" => CompressionLevel::Ultra,
            "compressed" => CompressionLevel::Compressed,
            _ => CompressionLevel::Normal,
        }
    }

    /// JPEG quality (0-100) used when re-encoding.
    pub fn quality(self) -> u8 {
        match self {
            CompressionLevel::Ultra => 30,
            CompressionLevel::Compressed => 60,
            CompressionLevel::Normal => 90,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CompressionLevel::Ultra => "ultra",
            CompressionLevel::Compressed => "compressed",
            CompressionLevel::Normal => "normal",
        }
    }
}

/// A validated batch: non-empty, in arrival order, filename already sanitized.
#[derive(Debug)]
pub struct ConversionRequest {
    pub files: Vec<UploadedFile>,
    pub level: CompressionLevel,
    pub filename: String,
}

impl ConversionRequest {
    pub fn total_size(&self) -> usize {
        self.files.iter().map(UploadedFile::size).sum()
    }
}

/// Intake limits
#[derive(Debug, Clone)]
pub struct UploadConfig {
    pub max_file_size: usize,
    pub max_files: usize,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_file_size: constants::DEFAULT_MAX_FILE_SIZE,
            max_files: constants::DEFAULT_MAX_FILES,
        }
    }
}

impl From<&constants::Env> for UploadConfig {
    fn from(env: &constants::Env) -> Self {
        Self { max_file_size: env.max_file_size, max_files: env.max_files }
    }
}

pub fn default_filename() -> String {
    DEFAULT_FILENAME.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_from_form() {
        assert_eq!(CompressionLevel::from_form("ultra"), CompressionLevel::Ultra);
        assert_eq!(CompressionLevel::from_form(" Compressed "), CompressionLevel::Compressed);
        assert_eq!(CompressionLevel::from_form("normal"), CompressionLevel::Normal);
        assert_eq!(CompressionLevel::from_form("extreme"), CompressionLevel::Normal);
        assert_eq!(CompressionLevel::from_form(""), CompressionLevel::Normal);
    }

    #[test]
    fn test_quality_ordering() {
        let ultra = CompressionLevel::Ultra.quality();
        let compressed = CompressionLevel::Compressed.quality();
        let normal = CompressionLevel::Normal.quality();
        assert!(ultra < compressed);
        assert!(compressed < normal);
        assert_eq!((ultra, compressed, normal), (30, 60, 90));
    }

    #[test]
    fn test_quality_is_stable_across_calls() {
        for level in [CompressionLevel::Ultra, CompressionLevel::Compressed, CompressionLevel::Normal]
        {
            assert_eq!(level.quality(), level.quality());
            assert_eq!(CompressionLevel::from_form(level.as_str()), level);
        }
    }

    #[test]
    fn test_default_upload_config() {
        let cfg = UploadConfig::default();
        assert_eq!(cfg.max_file_size, 10 * 1024 * 1024);
        assert_eq!(cfg.max_files, 20);
    }
}
