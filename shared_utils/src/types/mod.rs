//! Type-Safe Wrappers Module
//!
//! - `file_size`: 文件大小类型安全包装

pub mod file_size;

pub use file_size::FileSize;

// ============================================================================
// Property-Based Tests
// ============================================================================
