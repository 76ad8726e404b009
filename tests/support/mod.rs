#![allow(dead_code)]

#[path = "../../src/test_support/socket_guard.rs"]
pub mod socket_guard;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Builds a VOD media playlist listing `uris` in order.
pub fn media_playlist(uris: &[String]) -> String {
    let mut text = String::from(
        "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:10\n#EXT-X-MEDIA-SEQUENCE:0\n",
    );
    for uri in uris {
        text.push_str("#EXTINF:10.0,\n");
        text.push_str(uri);
        text.push('\n');
    }
    text.push_str("#EXT-X-ENDLIST\n");
    text
}

/// Serves `body` at `path_str` with status 200.
pub async fn mount_bytes(server: &MockServer, path_str: &str, body: &[u8]) {
    Mock::given(method("GET"))
        .and(path(path_str))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(body.to_vec()))
        .mount(server)
        .await;
}

/// Serves an empty response with `status` at `path_str`.
pub async fn mount_status(server: &MockServer, path_str: &str, status: u16) {
    Mock::given(method("GET"))
        .and(path(path_str))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}
