//! Destination path resolution for downloads.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::error::DownloadError;
use super::request::DownloadRequest;

const HOME_MARKER: &str = "~";

/// Expands a leading `~` component to the current user's home directory.
///
/// `~` and `~/rest` are expanded; `~user/...` and paths without a leading
/// `~` component are returned unchanged.
///
/// # Errors
///
/// Returns [`DownloadError::HomeDirUnavailable`] if the path starts with `~`
/// and no home directory can be determined.
pub fn expand_home(path: &Path) -> Result<PathBuf, DownloadError> {
    let Ok(rest) = path.strip_prefix(HOME_MARKER) else {
        return Ok(path.to_path_buf());
    };

    let home = dirs::home_dir().ok_or_else(|| DownloadError::HomeDirUnavailable {
        path: path.to_path_buf(),
    })?;

    Ok(if rest.as_os_str().is_empty() {
        home
    } else {
        home.join(rest)
    })
}

/// Resolves where `request` is saved under `base_dir`.
///
/// # Errors
///
/// - [`DownloadError::HomeDirUnavailable`] if `~` cannot be expanded
/// - [`DownloadError::DestinationExists`] if something already exists at the
///   resolved path
pub fn resolve_destination(
    base_dir: &Path,
    request: &DownloadRequest,
) -> Result<PathBuf, DownloadError> {
    let path = expand_home(&base_dir.join(request.file_name()))?;

    // symlink_metadata so a dangling link also counts as "exists"
    if path.symlink_metadata().is_ok() {
        return Err(DownloadError::destination_exists(path));
    }

    debug!(path = %path.display(), "resolved destination");
    Ok(path)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::download::request::Quality;
    use tempfile::TempDir;

    fn request(quality: Quality) -> DownloadRequest {
        DownloadRequest::new("https://cdn.example.com/t", "Track", quality, "mp3")
    }

    #[test]
    fn test_expand_home_root_level() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(expand_home(Path::new("~/Music")).unwrap(), home.join("Music"));
    }

    #[test]
    fn test_expand_home_nested() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(
            expand_home(Path::new("~/a/b/c")).unwrap(),
            home.join("a").join("b").join("c")
        );
    }

    #[test]
    fn test_expand_home_bare_marker() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        assert_eq!(expand_home(Path::new("~")).unwrap(), home);
    }

    #[test]
    fn test_expand_home_leaves_other_paths_alone() {
        assert_eq!(
            expand_home(Path::new("/srv/music")).unwrap(),
            PathBuf::from("/srv/music")
        );
        assert_eq!(
            expand_home(Path::new("relative/dir")).unwrap(),
            PathBuf::from("relative/dir")
        );
        assert_eq!(
            expand_home(Path::new("~user/dir")).unwrap(),
            PathBuf::from("~user/dir")
        );
    }

    #[test]
    fn test_resolve_destination_joins_file_name() {
        let temp_dir = TempDir::new().unwrap();
        let path = resolve_destination(temp_dir.path(), &request(Quality::Low)).unwrap();
        assert_eq!(path, temp_dir.path().join("Track[low].mp3"));
    }

    #[test]
    fn test_resolve_destination_expands_home() {
        let Some(home) = dirs::home_dir() else {
            return;
        };
        let quality = Quality::Other("trackfetch-test-nonexistent-tier".to_string());
        let path = resolve_destination(Path::new("~/Music"), &request(quality)).unwrap();
        assert_eq!(
            path,
            home.join("Music")
                .join("Track[trackfetch-test-nonexistent-tier].mp3")
        );
    }

    #[test]
    fn test_resolve_destination_existing_file_rejected_for_every_tier() {
        let temp_dir = TempDir::new().unwrap();
        for quality in [Quality::Low, Quality::Other("high".to_string())] {
            let request = request(quality);
            std::fs::write(temp_dir.path().join(request.file_name()), b"old").unwrap();

            let result = resolve_destination(temp_dir.path(), &request);
            assert!(
                matches!(result, Err(DownloadError::DestinationExists { .. })),
                "Expected DestinationExists, got: {result:?}"
            );
        }
    }
}
