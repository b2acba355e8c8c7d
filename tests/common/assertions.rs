//! Response assertions shared by the integration tests

use std::io::{Cursor, Read};

/// Assert the status and the `error.code` of an error envelope
pub async fn assert_error(response: reqwest::Response, status: u16, code: &str) -> serde_json::Value {
    assert_eq!(response.status().as_u16(), status, "unexpected status");

    let body: serde_json::Value = response.json().await.expect("error body must be JSON");
    assert_eq!(body["error"]["code"], code, "unexpected error code in {body}");
    body
}

/// Names and contents of every entry in a zip archive, in archive order
pub fn zip_entries(bytes: &[u8]) -> Vec<(String, Vec<u8>)> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).expect("valid zip archive");

    (0..archive.len())
        .map(|i| {
            let mut entry = archive.by_index(i).expect("zip entry");
            let mut content = Vec::new();
            entry.read_to_end(&mut content).expect("read zip entry");
            (entry.name().to_string(), content)
        })
        .collect()
}

/// Header value as a string, if present
pub fn header<'a>(response: &'a reqwest::Response, name: &str) -> Option<&'a str> {
    response.headers().get(name).and_then(|v| v.to_str().ok())
}
