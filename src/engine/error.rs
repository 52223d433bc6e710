use std::path::PathBuf;

use thiserror::Error;

use super::format::TargetFormat;

/// Why a single job did not produce an output file.
///
/// Errors are stored on the job and copied into the batch result, so they
/// carry rendered messages instead of the underlying io/codec errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("unsupported target format: {0:?}")]
    InvalidFormat(String),

    #[error("cannot read {}: {reason}", path.display())]
    UnreadableSource { path: PathBuf, reason: String },

    #[error("{} is already a {format} file", path.display())]
    AlreadyTargetFormat { path: PathBuf, format: TargetFormat },

    #[error("{} already exists and overwriting is disabled", path.display())]
    OutputExists { path: PathBuf },

    #[error("failed to write {}: {reason}", path.display())]
    WriteFailure { path: PathBuf, reason: String },

    #[error("conversion cancelled")]
    Cancelled,
}

impl ConversionError {
    pub(crate) fn unreadable(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ConversionError::UnreadableSource {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn write_failure(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        ConversionError::WriteFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ConversionError::Cancelled)
    }

    pub fn is_skip(&self) -> bool {
        matches!(self, ConversionError::AlreadyTargetFormat { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_name_the_file() {
        let err = ConversionError::unreadable("/tmp/a.png", "bad header");
        assert_eq!(err.to_string(), "cannot read /tmp/a.png: bad header");

        let err = ConversionError::AlreadyTargetFormat {
            path: PathBuf::from("/tmp/a.jpg"),
            format: TargetFormat::Jpg,
        };
        assert_eq!(err.to_string(), "/tmp/a.jpg is already a JPG file");
        assert!(err.is_skip());
        assert!(!err.is_cancelled());
    }
}
