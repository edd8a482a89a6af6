//! FileSize Type-Safe Wrapper
//!
//! 提供类型安全的文件大小操作，防止溢出和负数。

use std::fmt;

/// 类型安全的文件大小（字节）
///
/// # Examples
/// ```
/// use shared_utils::types::file_size::FileSize;
///
/// let size = FileSize::new(1024 * 1024);
/// assert_eq!(size.bytes(), 1048576);
/// assert_eq!(size.display(), "1.00 MB");
///
/// let smaller = FileSize::new(500);
/// assert_eq!(smaller.saturating_sub(size).bytes(), 0);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileSize(u64);

impl FileSize {
    pub const ZERO: FileSize = FileSize(0);

    pub const KB: u64 = 1024;
    pub const MB: u64 = 1024 * 1024;
    pub const GB: u64 = 1024 * 1024 * 1024;

    #[inline]
    pub const fn new(bytes: u64) -> Self {
        Self(bytes)
    }

    /// Size of an in-memory buffer.
    #[inline]
    pub fn of(buffer: &[u8]) -> Self {
        Self(buffer.len() as u64)
    }

    #[inline]
    pub const fn bytes(&self) -> u64 {
        self.0
    }

    /// 安全减法（不会下溢）
    #[inline]
    pub fn saturating_sub(&self, other: FileSize) -> FileSize {
        FileSize(self.0.saturating_sub(other.0))
    }

    /// 计算压缩比（处理零除）
    ///
    /// Returns `self / original`, or `None` when `original` is zero.
    pub fn compression_ratio(&self, original: FileSize) -> Option<f64> {
        if original.0 == 0 {
            None
        } else {
            Some(self.0 as f64 / original.0 as f64)
        }
    }

    /// Percentage saved relative to `original`; negative when `self` is larger.
    pub fn savings_percent(&self, original: FileSize) -> Option<f64> {
        self.compression_ratio(original)
            .map(|ratio| (1.0 - ratio) * 100.0)
    }

    /// Strictly smaller than `original`. Equal sizes do not count.
    #[inline]
    pub fn is_smaller_than(&self, original: FileSize) -> bool {
        self.0 < original.0
    }

    /// 格式化显示（自动选择单位）
    pub fn display(&self) -> String {
        if self.0 >= Self::GB {
            format!("{:.2} GB", self.0 as f64 / Self::GB as f64)
        } else if self.0 >= Self::MB {
            format!("{:.2} MB", self.0 as f64 / Self::MB as f64)
        } else if self.0 >= Self::KB {
            format!("{:.2} KB", self.0 as f64 / Self::KB as f64)
        } else {
            format!("{} B", self.0)
        }
    }
}

impl fmt::Debug for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileSize({} = {})", self.0, self.display())
    }
}

impl fmt::Display for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // pad, so report columns like `{:>10}` line up
        f.pad(&self.display())
    }
}

impl Default for FileSize {
    fn default() -> Self {
        Self::ZERO
    }
}

impl From<u64> for FileSize {
    fn from(bytes: u64) -> Self {
        Self::new(bytes)
    }
}

impl From<FileSize> for u64 {
    fn from(size: FileSize) -> Self {
        size.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saturating_sub() {
        let a = FileSize::new(100);
        let b = FileSize::new(30);

        assert_eq!(a.saturating_sub(b).bytes(), 70);
        // 不会下溢
        assert_eq!(b.saturating_sub(a).bytes(), 0);
        assert_eq!(a.saturating_sub(a).bytes(), 0);
    }

    #[test]
    fn test_compression_ratio() {
        let output = FileSize::new(500);
        let input = FileSize::new(1000);

        assert_eq!(output.compression_ratio(input), Some(0.5));
        assert_eq!(output.compression_ratio(FileSize::ZERO), None);
    }

    #[test]
    fn test_savings_percent() {
        let input = FileSize::new(1000);
        assert_eq!(FileSize::new(800).savings_percent(input), Some(20.0));
        assert_eq!(FileSize::new(1200).savings_percent(input), Some(-20.0));
        assert_eq!(FileSize::new(1).savings_percent(FileSize::ZERO), None);
    }

    #[test]
    fn test_is_smaller_than_is_strict() {
        let input = FileSize::new(1000);
        assert!(FileSize::new(999).is_smaller_than(input));
        assert!(!FileSize::new(1000).is_smaller_than(input));
        assert!(!FileSize::new(1001).is_smaller_than(input));
    }

    #[test]
    fn test_of_buffer() {
        assert_eq!(FileSize::of(&[0u8; 42]).bytes(), 42);
        assert_eq!(FileSize::of(&[]), FileSize::ZERO);
    }

    #[test]
    fn test_display() {
        assert_eq!(FileSize::new(500).display(), "500 B");
        assert_eq!(FileSize::new(1024).display(), "1.00 KB");
        assert_eq!(FileSize::new(1024 * 1024).display(), "1.00 MB");
        assert_eq!(FileSize::new(1024 * 1024 * 1024).display(), "1.00 GB");
    }

    #[test]
    fn test_display_honours_width() {
        assert_eq!(format!("{:>10}", FileSize::new(512)), "     512 B");
        assert_eq!(format!("{:<8}|", FileSize::new(5)), "5 B     |");
        assert_eq!(format!("{}", FileSize::new(2048)), "2.00 KB");
    }
}
