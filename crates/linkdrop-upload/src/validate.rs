use crate::error::Rejection;
use crate::policy::{
    extension_of, extensions_for, is_raster_image, is_text_like, size_limit, DANGEROUS_EXTENSIONS,
    DANGEROUS_KEYWORDS, MALICIOUS_PATTERNS, MAX_FILENAME_LENGTH, MAX_IMAGE_DIMENSION,
    RESERVED_NAMES,
};
use image::ImageReader;
use regex::{RegexSet, RegexSetBuilder};
use std::io::Cursor;

const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Runs the upload checks in order: name, type, size, then content.
#[derive(Debug, Clone)]
pub struct Validator {
    patterns: RegexSet,
}

impl Validator {
    pub fn new() -> Result<Self, regex::Error> {
        let patterns = RegexSetBuilder::new(MALICIOUS_PATTERNS)
            .case_insensitive(true)
            .build()?;
        Ok(Self { patterns })
    }

    /// Returns the first rejection hit by the file, if any.
    pub fn validate(&self, filename: &str, mimetype: &str, data: &[u8]) -> Result<(), Rejection> {
        validate_filename(filename)?;
        validate_mime(mimetype, filename)?;
        validate_size(data.len() as u64, mimetype)?;
        self.analyze_content(mimetype, data)
    }

    pub fn analyze_content(&self, mimetype: &str, data: &[u8]) -> Result<(), Rejection> {
        if is_text_like(mimetype) {
            let text = String::from_utf8_lossy(data);
            if let Some(idx) = self.patterns.matches(&text).into_iter().next() {
                return Err(Rejection::MaliciousContent(MALICIOUS_PATTERNS[idx].to_string()));
            }
        }

        if is_raster_image(mimetype) {
            let (width, height) = ImageReader::new(Cursor::new(data))
                .with_guessed_format()
                .ok()
                .and_then(|reader| reader.into_dimensions().ok())
                .ok_or(Rejection::InvalidImage)?;
            if width == 0 || height == 0 {
                return Err(Rejection::InvalidImage);
            }
            if width > MAX_IMAGE_DIMENSION || height > MAX_IMAGE_DIMENSION {
                return Err(Rejection::ImageTooLarge {
                    width,
                    height,
                    max: MAX_IMAGE_DIMENSION,
                });
            }
        }

        Ok(())
    }
}

pub fn validate_filename(filename: &str) -> Result<(), Rejection> {
    if filename.chars().count() > MAX_FILENAME_LENGTH {
        return Err(Rejection::NameTooLong {
            max: MAX_FILENAME_LENGTH,
        });
    }

    if filename
        .chars()
        .any(|c| FORBIDDEN_CHARS.contains(&c) || c.is_control())
    {
        return Err(Rejection::ForbiddenCharacters);
    }

    let extension = extension_of(filename);
    if DANGEROUS_EXTENSIONS.contains(&extension.as_str()) {
        return Err(Rejection::DangerousExtension(extension));
    }

    let lower = filename.to_lowercase();
    if let Some(keyword) = DANGEROUS_KEYWORDS.iter().find(|k| lower.contains(*k)) {
        return Err(Rejection::DangerousKeyword(keyword.to_string()));
    }

    let stem = lower.split('.').next().unwrap_or_default();
    if RESERVED_NAMES.contains(&stem) {
        return Err(Rejection::ReservedName(stem.to_string()));
    }

    Ok(())
}

pub fn validate_mime(mimetype: &str, filename: &str) -> Result<(), Rejection> {
    let allowed =
        extensions_for(mimetype).ok_or_else(|| Rejection::MimeNotAllowed(mimetype.to_string()))?;

    let extension = extension_of(filename);
    if !allowed.contains(&extension.as_str()) {
        return Err(Rejection::ExtensionMismatch {
            mimetype: mimetype.to_string(),
            extension,
        });
    }
    Ok(())
}

pub fn validate_size(size: u64, mimetype: &str) -> Result<(), Rejection> {
    let limit = size_limit(mimetype);
    if size > limit {
        return Err(Rejection::TooLarge {
            size,
            max_mib: limit / (1024 * 1024),
        });
    }
    Ok(())
}
