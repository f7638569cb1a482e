use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

/// Location of the illustration attached to a question.
///
/// Exam content references images either by absolute URL or by a path into the
/// bundled asset directory. Loading the image is the host's concern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum PhotoUri {
    FilePath(PathBuf),
    Url(Url),
}

impl PhotoUri {
    /// Parses a raw reference, returning `None` for blank input.
    ///
    /// Anything that parses as an absolute URL is a URL; everything else is
    /// treated as a file path.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }
        Some(match Url::parse(s) {
            Ok(url) => PhotoUri::Url(url),
            Err(_) => PhotoUri::FilePath(PathBuf::from(s)),
        })
    }

    #[must_use]
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            PhotoUri::FilePath(p) => Some(p.as_path()),
            PhotoUri::Url(_) => None,
        }
    }

    #[must_use]
    pub fn as_url(&self) -> Option<&Url> {
        match self {
            PhotoUri::Url(u) => Some(u),
            PhotoUri::FilePath(_) => None,
        }
    }
}

impl fmt::Display for PhotoUri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PhotoUri::FilePath(p) => write!(f, "{}", p.display()),
            PhotoUri::Url(u) => f.write_str(u.as_str()),
        }
    }
}

impl From<String> for PhotoUri {
    fn from(value: String) -> Self {
        Self::parse(&value).unwrap_or_else(|| PhotoUri::FilePath(PathBuf::from(value)))
    }
}

impl From<PhotoUri> for String {
    fn from(value: PhotoUri) -> Self {
        value.to_string()
    }
}
