//! User-Agent string sent with every request.

/// Project URL for User-Agent identification.
const PROJECT_UA_URL: &str = "https://github.com/fierce/trackfetch";

/// Default User-Agent for manifest, segment and direct downloads.
#[must_use]
pub(crate) fn default_download_user_agent() -> String {
    let version = env!("CARGO_PKG_VERSION");
    format!("trackfetch/{version} (+{PROJECT_UA_URL})")
}
