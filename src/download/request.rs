//! Download request data model.

use std::fmt;
use std::str::FromStr;

const LOW_TAG: &str = "low";

/// Quality tier of a track.
///
/// `Low` is delivered as a single progressive file; every other tier is an
/// HLS media playlist that has to be assembled from segments. Build tiers
/// with [`Quality::new`] or `str::parse`, which map the `low` tag to
/// [`Quality::Low`]. A hand-built `Other("low")` still behaves as `Low`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Quality {
    /// Progressive single-file download.
    Low,
    /// Any HLS tier, keeping the caller's tag for the file name.
    Other(String),
}

impl Quality {
    /// Creates the tier named by `tag`.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        let tag = tag.into();
        if tag == LOW_TAG {
            Self::Low
        } else {
            Self::Other(tag)
        }
    }

    /// Returns the tag used in file names.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Low => LOW_TAG,
            Self::Other(tag) => tag,
        }
    }

    /// Returns true when the resource is an HLS manifest.
    #[must_use]
    pub fn is_hls(&self) -> bool {
        self.as_str() != LOW_TAG
    }
}

impl FromStr for Quality {
    type Err = std::convert::Infallible;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(value))
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single track to download. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    source_url: String,
    title: String,
    quality: Quality,
    extension: String,
}

impl DownloadRequest {
    /// Creates a request for `source_url`, saved as `"{title}[{quality}].{extension}"`.
    pub fn new(
        source_url: impl Into<String>,
        title: impl Into<String>,
        quality: Quality,
        extension: impl Into<String>,
    ) -> Self {
        Self {
            source_url: source_url.into(),
            title: title.into(),
            quality,
            extension: extension.into(),
        }
    }

    /// URL of the progressive file or the HLS manifest.
    #[must_use]
    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Display name of the track.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Requested quality tier.
    #[must_use]
    pub fn quality(&self) -> &Quality {
        &self.quality
    }

    /// File extension without the leading dot.
    #[must_use]
    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// File name the track is saved under.
    #[must_use]
    pub fn file_name(&self) -> String {
        format!(
            "{}[{}].{}",
            self.title,
            self.quality,
            self.extension.trim_start_matches('.')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_parses_low_as_direct() {
        let quality: Quality = "low".parse().unwrap_or(Quality::Low);
        assert_eq!(quality, Quality::Low);
        assert!(!quality.is_hls());
    }

    #[test]
    fn test_quality_other_tiers_are_hls() {
        let quality: Quality = "high".parse().unwrap_or(Quality::Low);
        assert_eq!(quality, Quality::Other("high".to_string()));
        assert!(quality.is_hls());
        assert_eq!(quality.as_str(), "high");
    }

    #[test]
    fn test_quality_new_normalizes_low_tag() {
        assert_eq!(Quality::new("low"), Quality::Low);
        assert_eq!(Quality::new("hq"), Quality::Other("hq".to_string()));
    }

    #[test]
    fn test_hand_built_low_tag_is_direct() {
        let quality = Quality::Other("low".to_string());
        assert!(!quality.is_hls());
        assert_eq!(quality.to_string(), Quality::Low.to_string());
    }

    #[test]
    fn test_file_name_includes_quality_tag() {
        let request = DownloadRequest::new(
            "https://cdn.example.com/a.m3u8",
            "Night Drive",
            Quality::Other("hq".to_string()),
            "m4a",
        );
        assert_eq!(request.file_name(), "Night Drive[hq].m4a");
    }

    #[test]
    fn test_file_name_tolerates_leading_dot_in_extension() {
        let request = DownloadRequest::new("https://x/a.mp3", "Song", Quality::Low, ".mp3");
        assert_eq!(request.file_name(), "Song[low].mp3");
    }
}
