//! Resource cache errors.

use std::fmt;

use crate::asset::AssetKindTag;
use crate::record::ResourceHandle;

/// Errors surfaced by the dispatch table, the manager and the helpers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// No loader is registered for the path's extension.
    UnsupportedFormat { path: String, extension: String },
    /// The loader ran but produced no usable payload.
    LoadFailed { path: String, reason: String },
    /// The handle has no live record (unknown, or already released).
    InvalidHandle(ResourceHandle),
    /// An extension was registered twice during bootstrap.
    DuplicateExtension(String),
    /// An extension key that can never match a path suffix.
    InvalidExtension(String),
    /// Typed access asked for a different asset kind than the one loaded.
    WrongKind {
        handle: ResourceHandle,
        expected: AssetKindTag,
        found: AssetKindTag,
    },
    /// Another reference would overflow the record's counter.
    RefCountOverflow(ResourceHandle),
}

impl ResourceError {
    /// True for errors that are a bootstrap misconfiguration rather than a
    /// runtime condition.
    pub fn is_registration_error(&self) -> bool {
        matches!(
            self,
            ResourceError::DuplicateExtension(_) | ResourceError::InvalidExtension(_)
        )
    }
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::UnsupportedFormat { path, extension } if extension.is_empty() => {
                write!(f, "unsupported format: '{}' has no extension", path)
            }
            ResourceError::UnsupportedFormat { path, extension } => {
                write!(f, "unsupported format '.{}' for '{}'", extension, path)
            }
            ResourceError::LoadFailed { path, reason } => {
                write!(f, "failed to load '{}': {}", path, reason)
            }
            ResourceError::InvalidHandle(handle) => write!(f, "invalid resource handle {}", handle),
            ResourceError::DuplicateExtension(ext) => {
                write!(f, "extension '.{}' is already registered", ext)
            }
            ResourceError::InvalidExtension(ext) => write!(f, "invalid extension key '{}'", ext),
            ResourceError::WrongKind {
                handle,
                expected,
                found,
            } => write!(
                f,
                "resource {} is a {} but a {} was requested",
                handle, found, expected
            ),
            ResourceError::RefCountOverflow(handle) => {
                write!(f, "resource {} has too many references", handle)
            }
        }
    }
}

impl std::error::Error for ResourceError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_mentions_path_and_extension() {
        let err = ResourceError::UnsupportedFormat {
            path: "props/crate.xyz".into(),
            extension: "xyz".into(),
        };
        assert_eq!(err.to_string(), "unsupported format '.xyz' for 'props/crate.xyz'");

        let err = ResourceError::UnsupportedFormat {
            path: "README".into(),
            extension: String::new(),
        };
        assert!(err.to_string().contains("no extension"));
    }

    #[test]
    fn registration_errors_are_classified() {
        assert!(ResourceError::DuplicateExtension("bmp".into()).is_registration_error());
        assert!(ResourceError::InvalidExtension("".into()).is_registration_error());
        assert!(!ResourceError::LoadFailed {
            path: "a.bmp".into(),
            reason: "missing".into()
        }
        .is_registration_error());
    }
}
