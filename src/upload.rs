//! Multipart image upload to the configured asset host.
//!
//! The host accepts an unsigned `multipart/form-data` POST with two parts,
//! `upload_preset` and `file`, and answers with JSON carrying the hosted
//! `secure_url`. That URL becomes a post's image reference.

use anyhow::{anyhow, Context, Result};
use std::path::Path;
use uuid::Uuid;

/// Upload a local file, returning the hosted URL.
pub fn upload_image(endpoint: &str, upload_preset: &str, path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload".to_string());

    let boundary = format!("----vitrina-{}", Uuid::new_v4().simple());
    let body = multipart_body(&boundary, upload_preset, &filename, &bytes);

    let resp = ureq::post(endpoint)
        .set(
            "Content-Type",
            &format!("multipart/form-data; boundary={}", boundary),
        )
        .send_bytes(&body);

    let value: serde_json::Value = match resp {
        Ok(r) => r.into_json().context("decoding upload response")?,
        Err(ureq::Error::Status(code, r)) => {
            let body = r.into_string().unwrap_or_default();
            return Err(anyhow!("upload failed with {}: {}", code, body));
        }
        Err(e) => return Err(anyhow!("upload request failed: {}", e)),
    };

    value
        .get("secure_url")
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| anyhow!("upload response carried no secure_url"))
}

/// Assemble the two-part form body by hand; the host ignores part
/// content-types, so the file goes up as an octet stream.
fn multipart_body(boundary: &str, upload_preset: &str, filename: &str, bytes: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(bytes.len() + 512);

    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Disposition: form-data; name=\"upload_preset\"\r\n\r\n");
    body.extend_from_slice(upload_preset.as_bytes());
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\n",
            filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");

    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multipart_body_layout() {
        let body = multipart_body("----vitrina-abc", "unsigned", "photo.jpg", b"JPEGDATA");
        let text = String::from_utf8_lossy(&body);

        assert!(text.starts_with("------vitrina-abc\r\n"));
        assert!(text.contains("name=\"upload_preset\"\r\n\r\nunsigned\r\n"));
        assert!(text.contains("name=\"file\"; filename=\"photo.jpg\"\r\n"));
        assert!(text.contains("JPEGDATA"));
        assert!(text.ends_with("------vitrina-abc--\r\n"));
    }

    #[test]
    fn test_multipart_parts_are_boundary_separated() {
        let body = multipart_body("B", "p", "f.png", b"x");
        let text = String::from_utf8_lossy(&body);
        // Two opening boundaries plus the closing one.
        assert_eq!(text.matches("--B\r\n").count(), 2);
        assert_eq!(text.matches("--B--\r\n").count(), 1);
    }
}
