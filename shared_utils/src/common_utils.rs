//! Common Utilities Module
//!
//! Small path helpers shared by the walker and the idempotence gate.

use std::path::Path;

/// 安全地获取文件扩展名（小写）
///
/// # Examples
/// ```
/// use std::path::Path;
/// use shared_utils::common_utils::get_extension_lowercase;
///
/// assert_eq!(get_extension_lowercase(Path::new("test.JPG")), "jpg");
/// assert_eq!(get_extension_lowercase(Path::new("noext")), "");
/// ```
pub fn get_extension_lowercase(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
        .unwrap_or_default()
}

/// 检查文件扩展名是否在给定列表中（不区分大小写）
///
/// # Examples
/// ```
/// use std::path::Path;
/// use shared_utils::common_utils::has_extension;
///
/// let extensions = &["jpg", "png"];
/// assert!(has_extension(Path::new("photo.JPG"), extensions));
/// assert!(!has_extension(Path::new("video.mp4"), extensions));
/// ```
pub fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    let ext = get_extension_lowercase(path);
    extensions.contains(&ext.as_str())
}

/// Case-insensitive substring test.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_helpers() {
        assert_eq!(get_extension_lowercase(Path::new("/a/b/IMG_1.HEIC")), "heic");
        assert_eq!(get_extension_lowercase(Path::new(".hidden")), "");
        assert!(has_extension(Path::new("x.Jpeg"), &["jpg", "jpeg"]));
        assert!(!has_extension(Path::new("x"), &["jpg"]));
    }

    #[test]
    fn test_contains_ignore_case() {
        assert!(contains_ignore_case("Holiday_LOW", "_low"));
        assert!(contains_ignore_case("a_Low_b", "_LOW"));
        assert!(!contains_ignore_case("lowkey", "_low"));
    }
}
