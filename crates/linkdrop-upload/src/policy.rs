//! Static rule tables for uploads.

const MIB: u64 = 1024 * 1024;

/// Most files accepted in one request.
pub const MAX_FILES_PER_REQUEST: usize = 5;

/// Hard per-file limit enforced while the request body is read.
pub const MAX_TRANSPORT_FILE_BYTES: u64 = 50 * MIB;

pub const MAX_FILENAME_LENGTH: usize = 255;

/// Images wider or taller than this are refused outright.
pub const MAX_IMAGE_DIMENSION: u32 = 10_000;

/// Stored images are shrunk to fit inside this square.
pub const COMPRESSION_BOX: u32 = 2048;

/// Accepted MIME types and the extensions each may carry.
pub const ALLOWED_TYPES: &[(&str, &[&str])] = &[
    ("image/jpeg", &[".jpg", ".jpeg"]),
    ("image/png", &[".png"]),
    ("image/gif", &[".gif"]),
    ("image/webp", &[".webp"]),
    ("image/svg+xml", &[".svg"]),
    ("application/pdf", &[".pdf"]),
    ("application/zip", &[".zip"]),
    ("application/x-rar-compressed", &[".rar"]),
    ("application/x-7z-compressed", &[".7z"]),
    ("text/plain", &[".txt"]),
    ("text/csv", &[".csv"]),
    ("application/json", &[".json"]),
    ("text/javascript", &[".js"]),
    ("text/css", &[".css"]),
    ("text/html", &[".html"]),
    ("audio/mpeg", &[".mp3"]),
    ("audio/wav", &[".wav"]),
    ("video/mp4", &[".mp4"]),
    ("video/webm", &[".webm"]),
];

pub const DANGEROUS_EXTENSIONS: &[&str] = &[
    ".exe", ".bat", ".cmd", ".com", ".pif", ".scr", ".vbs", ".js", ".jar", ".php", ".asp",
    ".aspx", ".jsp", ".py", ".pl", ".sh", ".ps1", ".psm1", ".dll", ".so", ".dylib", ".app",
    ".deb", ".rpm", ".msi", ".dmg", ".sql", ".db", ".sqlite", ".mdb", ".accdb",
];

/// Matched as case-insensitive substrings of the whole file name.
pub const DANGEROUS_KEYWORDS: &[&str] = &[
    "script",
    "exec",
    "eval",
    "system",
    "shell",
    "cmd",
    "powershell",
    "bash",
    "sh",
    "php",
    "asp",
    "jsp",
    "python",
    "perl",
    "ruby",
    "javascript",
    "vbscript",
    "applet",
    "embed",
    "object",
    "iframe",
];

/// Windows device names, compared against the part before the first dot.
pub const RESERVED_NAMES: &[&str] = &[
    "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "com5", "com6", "com7", "com8",
    "com9", "lpt1", "lpt2", "lpt3", "lpt4", "lpt5", "lpt6", "lpt7", "lpt8", "lpt9",
];

/// Case-insensitive patterns searched for in text-like uploads.
pub const MALICIOUS_PATTERNS: &[&str] = &[
    r"<script[^>]*>",
    r"javascript:",
    r"vbscript:",
    r"onload\s*=",
    r"onerror\s*=",
    r"onclick\s*=",
    r"eval\s*\(",
    r"function\s*\(",
    r"setTimeout\s*\(",
    r"setInterval\s*\(",
    r"document\.write",
    r"innerHTML\s*=",
    r"outerHTML\s*=",
    r"exec\s*\(",
    r"system\s*\(",
    r"shell_exec\s*\(",
    r"passthru\s*\(",
    r"proc_open\s*\(",
    r"popen\s*\(",
    r"file_get_contents\s*\(",
    r"fopen\s*\(",
    r"fwrite\s*\(",
    r"include\s*\(",
    r"require\s*\(",
    r"import\s+",
    r"from\s+",
    r"__import__\s*\(",
    r"subprocess",
    r"os\.system",
    r"os\.popen",
];

/// Size limits by MIME prefix; the first matching entry wins.
const SIZE_LIMITS: &[(&str, u64)] = &[
    ("image/", 10 * MIB),
    ("video/", 50 * MIB),
    ("audio/", 20 * MIB),
    ("application/pdf", 25 * MIB),
    ("application/zip", 100 * MIB),
];

const DEFAULT_SIZE_LIMIT: u64 = 5 * MIB;

/// Extensions allowed for `mimetype`, or `None` if the type is not accepted.
pub fn extensions_for(mimetype: &str) -> Option<&'static [&'static str]> {
    ALLOWED_TYPES
        .iter()
        .find(|(mime, _)| *mime == mimetype)
        .map(|(_, extensions)| *extensions)
}

pub fn size_limit(mimetype: &str) -> u64 {
    SIZE_LIMITS
        .iter()
        .find(|(prefix, _)| mimetype.starts_with(prefix))
        .map_or(DEFAULT_SIZE_LIMIT, |(_, limit)| *limit)
}

/// Content of these types is searched for [`MALICIOUS_PATTERNS`].
pub fn is_text_like(mimetype: &str) -> bool {
    mimetype.starts_with("text/") || mimetype == "application/json" || mimetype == "image/svg+xml"
}

/// Image types whose pixels can be decoded and re-encoded.
pub fn is_raster_image(mimetype: &str) -> bool {
    matches!(
        mimetype,
        "image/jpeg" | "image/png" | "image/gif" | "image/webp"
    )
}

/// JPEG quality used when recompressing an image of `size` bytes.
pub fn jpeg_quality(size: u64) -> u8 {
    if size > 5 * MIB {
        80
    } else if size > 2 * MIB {
        85
    } else {
        90
    }
}

/// Lower-cased extension including the dot (`".png"`), or `""` when the
/// name has none. A leading dot alone (`.bashrc`) is not an extension.
pub fn extension_of(filename: &str) -> String {
    match filename.rfind('.') {
        Some(0) | None => String::new(),
        Some(idx) => filename[idx..].to_lowercase(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_limits_follow_mime_prefix() {
        assert_eq!(size_limit("image/png"), 10 * MIB);
        assert_eq!(size_limit("video/mp4"), 50 * MIB);
        assert_eq!(size_limit("audio/wav"), 20 * MIB);
        assert_eq!(size_limit("application/pdf"), 25 * MIB);
        assert_eq!(size_limit("application/zip"), 100 * MIB);
        assert_eq!(size_limit("text/plain"), 5 * MIB);
    }

    #[test]
    fn quality_drops_for_big_images() {
        assert_eq!(jpeg_quality(MIB), 90);
        assert_eq!(jpeg_quality(3 * MIB), 85);
        assert_eq!(jpeg_quality(6 * MIB), 80);
    }

    #[test]
    fn extension_of_takes_last_segment() {
        assert_eq!(extension_of("photo.JPG"), ".jpg");
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
        assert_eq!(extension_of("README"), "");
        assert_eq!(extension_of(".bashrc"), "");
    }

    #[test]
    fn allowed_types_lookup() {
        assert_eq!(extensions_for("image/jpeg"), Some(&[".jpg", ".jpeg"][..]));
        assert!(extensions_for("application/x-msdownload").is_none());
    }
}
