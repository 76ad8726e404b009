//! HLS manifest decoding.
//!
//! Only media playlists produce segments. Master playlists and bodies that
//! fail to decode yield an empty list; the caller treats that as "nothing to
//! do" rather than as an error.

use m3u8_rs::Playlist;
use tracing::{debug, warn};
use url::Url;

/// One fetchable segment, positioned by its place in the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentLocator {
    /// 0-based position in the manifest; also the byte order of the output.
    pub index: usize,
    /// Absolute URI when it could be resolved, otherwise the manifest text.
    pub uri: String,
}

/// Decodes `body` into segment locators in manifest order.
///
/// Relative segment URIs are resolved against `base_url` (the manifest's own
/// URL). Duplicates are kept and nothing is reordered.
#[must_use]
pub fn parse_segments(body: &[u8], base_url: Option<&Url>) -> Vec<SegmentLocator> {
    let playlist = match m3u8_rs::parse_playlist_res(body) {
        Ok(playlist) => playlist,
        Err(e) => {
            warn!(error = %e, "failed to decode manifest; treating as zero segments");
            return Vec::new();
        }
    };

    let media = match playlist {
        Playlist::MediaPlaylist(media) => media,
        Playlist::MasterPlaylist(master) => {
            warn!(
                variants = master.variants.len(),
                "manifest is a master playlist; no segments to fetch"
            );
            return Vec::new();
        }
    };

    let locators: Vec<SegmentLocator> = media
        .segments
        .iter()
        .map(|segment| segment.uri.trim())
        .filter(|uri| !uri.is_empty())
        .enumerate()
        .map(|(index, uri)| SegmentLocator {
            index,
            uri: resolve_uri(uri, base_url),
        })
        .collect();

    debug!(segments = locators.len(), "decoded media playlist");
    locators
}

fn resolve_uri(uri: &str, base_url: Option<&Url>) -> String {
    if Url::parse(uri).is_ok() {
        return uri.to_string();
    }
    base_url
        .and_then(|base| base.join(uri).ok())
        .map_or_else(|| uri.to_string(), String::from)
}
