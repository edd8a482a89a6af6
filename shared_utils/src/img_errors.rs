//! Shared error type for the img_lowq pipeline.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LowqError {
    #[error("Directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    #[error("Failed to list directory {}: {message}", path.display())]
    ReadDir { path: PathBuf, message: String },

    #[error("Failed to read {}: {source}", path.display())]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Failed to encode {format}: {message}")]
    Encode { format: String, message: String },

    #[error("HEIC codec error: {0}")]
    Heic(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),
}

impl LowqError {
    pub fn encode(format: impl Into<String>, message: impl ToString) -> Self {
        LowqError::Encode {
            format: format.into(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LowqError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_paths() {
        let err = LowqError::DirectoryNotFound(PathBuf::from("/no/such/dir"));
        assert_eq!(err.to_string(), "Directory not found: /no/such/dir");

        let err = LowqError::ReadFile {
            path: PathBuf::from("a.jpg"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().starts_with("Failed to read a.jpg"));
    }

    #[test]
    fn test_encode_helper() {
        let err = LowqError::encode("webp", "bad layout");
        assert_eq!(err.to_string(), "Failed to encode webp: bad layout");
    }
}
