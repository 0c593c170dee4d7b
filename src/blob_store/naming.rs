/// Stored-name rules
///
/// Two directions cross the trust boundary here: the client-supplied upload
/// filename (only its extension survives) and the stored name requested on
/// retrieval (must never resolve outside the upload directory).

/// Longest extension kept from an uploaded filename, including the dot
pub const MAX_EXTENSION_LEN: usize = 16;

/// Longest stored name accepted on retrieval
pub const MAX_STORED_NAME_LEN: usize = 255;

/// Extract a safe extension from an optional original filename
///
/// Directory components are stripped first. Anything that is not a short
/// run of `[A-Za-z0-9_-]` after the final dot yields an empty extension, so
/// a hostile filename degrades to "no extension" instead of failing the upload.
pub fn extension_of(original_filename: Option<&str>) -> String {
    let Some(original) = original_filename else {
        return String::new();
    };

    let base = original
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default();

    let Some(dot) = base.rfind('.') else {
        return String::new();
    };

    // ".bashrc" is a hidden file with no extension
    if dot == 0 {
        return String::new();
    }

    let ext = &base[dot..];
    let body = &ext[1..];

    if body.is_empty()
        || ext.len() > MAX_EXTENSION_LEN
        || !body
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
    {
        return String::new();
    }

    ext.to_string()
}

/// Extension of an already-stored name, including the dot
pub fn extension_of_stored(stored_name: &str) -> &str {
    match stored_name.rfind('.') {
        Some(dot) if dot > 0 => &stored_name[dot..],
        _ => "",
    }
}

/// Why a requested stored name was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameRejection {
    Empty,
    TooLong,
    Traversal,
    Separator,
    Hidden,
    IllegalCharacter,
}

impl std::fmt::Display for NameRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let reason = match self {
            NameRejection::Empty => "empty name",
            NameRejection::TooLong => "name too long",
            NameRejection::Traversal => "path traversal",
            NameRejection::Separator => "path separator",
            NameRejection::Hidden => "hidden file",
            NameRejection::IllegalCharacter => "illegal character",
        };
        f.write_str(reason)
    }
}

/// Check that a requested stored name addresses a single file directly
/// under the store root
///
/// Pure string inspection; never touches the filesystem.
pub fn validate_stored_name(name: &str) -> Result<&str, NameRejection> {
    if name.is_empty() {
        return Err(NameRejection::Empty);
    }
    if name.len() > MAX_STORED_NAME_LEN {
        return Err(NameRejection::TooLong);
    }
    if name.contains("..") {
        return Err(NameRejection::Traversal);
    }
    if name.contains('/') || name.contains('\\') {
        return Err(NameRejection::Separator);
    }
    // Covers temp uploads as well as dotfiles
    if name.starts_with('.') {
        return Err(NameRejection::Hidden);
    }
    // ':' covers Windows drive prefixes and alternate data streams
    if name.chars().any(|c| c == ':' || c == '\0' || c.is_control()) {
        return Err(NameRejection::IllegalCharacter);
    }

    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_simple() {
        assert_eq!(extension_of(Some("notes.txt")), ".txt");
        assert_eq!(extension_of(Some("archive.tar.gz")), ".gz");
        assert_eq!(extension_of(Some("Photo.JPEG")), ".JPEG");
    }

    #[test]
    fn test_extension_absent() {
        assert_eq!(extension_of(None), "");
        assert_eq!(extension_of(Some("")), "");
        assert_eq!(extension_of(Some("Makefile")), "");
        assert_eq!(extension_of(Some(".bashrc")), "");
        assert_eq!(extension_of(Some("trailing.")), "");
    }

    #[test]
    fn test_extension_strips_directories() {
        assert_eq!(extension_of(Some("/home/user/report.pdf")), ".pdf");
        assert_eq!(extension_of(Some("C:\\Users\\me\\image.png")), ".png");
        assert_eq!(extension_of(Some("dir.d/noext")), "");
        assert_eq!(extension_of(Some("../../etc/passwd")), "");
    }

    #[test]
    fn test_malicious_extension_becomes_empty() {
        assert_eq!(extension_of(Some("evil.tx\0t")), "");
        assert_eq!(extension_of(Some("evil.a b")), "");
        assert_eq!(extension_of(Some("evil.%2e%2e")), "");
        assert_eq!(extension_of(Some("evil.abcdefghijklmnopqrstuvwxyz")), "");
        assert_eq!(extension_of(Some("evil.php:stream")), "");
    }

    #[test]
    fn test_extension_of_stored() {
        assert_eq!(extension_of_stored("V1StGXR8_Z5jdHi6B-myT.txt"), ".txt");
        assert_eq!(extension_of_stored("V1StGXR8_Z5jdHi6B-myT"), "");
    }

    #[test]
    fn test_validate_accepts_generated_names() {
        assert!(validate_stored_name("V1StGXR8_Z5jdHi6B-myT.txt").is_ok());
        assert!(validate_stored_name("doesNotExist123.png").is_ok());
        assert!(validate_stored_name("noextension").is_ok());
    }

    #[test]
    fn test_validate_rejects_traversal() {
        assert_eq!(
            validate_stored_name("../../etc/passwd"),
            Err(NameRejection::Traversal)
        );
        assert_eq!(validate_stored_name(".."), Err(NameRejection::Traversal));
        assert_eq!(validate_stored_name("a..b"), Err(NameRejection::Traversal));
    }

    #[test]
    fn test_validate_rejects_separators_and_absolute_paths() {
        assert_eq!(
            validate_stored_name("/etc/passwd"),
            Err(NameRejection::Separator)
        );
        assert_eq!(
            validate_stored_name("sub/file.txt"),
            Err(NameRejection::Separator)
        );
        assert_eq!(
            validate_stored_name("sub\\file.txt"),
            Err(NameRejection::Separator)
        );
        assert_eq!(
            validate_stored_name("C:passwd"),
            Err(NameRejection::IllegalCharacter)
        );
    }

    #[test]
    fn test_validate_rejects_hidden_and_control() {
        assert_eq!(
            validate_stored_name(".upload-abc.part"),
            Err(NameRejection::Hidden)
        );
        assert_eq!(validate_stored_name("."), Err(NameRejection::Hidden));
        assert_eq!(
            validate_stored_name("abc\0.txt"),
            Err(NameRejection::IllegalCharacter)
        );
        assert_eq!(
            validate_stored_name("abc\n.txt"),
            Err(NameRejection::IllegalCharacter)
        );
        assert_eq!(validate_stored_name(""), Err(NameRejection::Empty));
        assert_eq!(
            validate_stored_name(&"a".repeat(300)),
            Err(NameRejection::TooLong)
        );
    }
}
