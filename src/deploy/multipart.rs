//! `multipart/form-data` body for a module-syntax script upload.
//!
//! Layout is fixed by the receiving API: a `metadata` JSON part, then the
//! bundle part named after the main module.

use std::fmt::Write as _;
use std::path::Path;

use rand::Rng;
use tracing::debug;

use super::bindings::ScriptMetadata;
use super::error::UploadError;

const BOUNDARY_BYTES: usize = 30;

pub const METADATA_CONTENT_TYPE: &str = "application/json";
pub const MODULE_CONTENT_TYPE: &str = "application/javascript+module";

/// A fully materialised request body and its `Content-Type` header value.
#[derive(Debug, Clone)]
pub struct EncodedBody {
    pub bytes: Vec<u8>,
    pub content_type: String,
    pub boundary: String,
}

/// Builds upload bodies with a fresh boundary per body.
#[derive(Debug, Default, Clone, Copy)]
pub struct MultipartEncoder;

impl MultipartEncoder {
    pub fn new() -> Self {
        Self
    }

    /// Read the bundle at `bundle_path` and encode it with `metadata`.
    ///
    /// Nothing is returned unless the whole bundle was read.
    pub async fn encode_file(
        &self,
        metadata: &ScriptMetadata,
        bundle_path: &Path,
    ) -> Result<EncodedBody, UploadError> {
        let bundle = tokio::fs::read(bundle_path)
            .await
            .map_err(|source| UploadError::Bundle {
                path: bundle_path.to_path_buf(),
                source,
            })?;
        debug!(path = %bundle_path.display(), bytes = bundle.len(), "Read worker bundle");
        self.encode(metadata, &bundle)
    }

    pub fn encode(&self, metadata: &ScriptMetadata, bundle: &[u8]) -> Result<EncodedBody, UploadError> {
        self.encode_with_boundary(metadata, bundle, random_boundary())
    }

    fn encode_with_boundary(
        &self,
        metadata: &ScriptMetadata,
        bundle: &[u8],
        boundary: String,
    ) -> Result<EncodedBody, UploadError> {
        let metadata_json = serde_json::to_vec(metadata)?;
        let module = escape_quotes(&metadata.main_module);

        let mut bytes = Vec::with_capacity(metadata_json.len() + bundle.len() + 512);

        bytes.extend_from_slice(
            part_header(
                &boundary,
                true,
                r#"name="metadata"; filename="metadata.json""#,
                METADATA_CONTENT_TYPE,
            )
            .as_bytes(),
        );
        bytes.extend_from_slice(&metadata_json);

        bytes.extend_from_slice(
            part_header(
                &boundary,
                false,
                &format!(r#"name="{module}"; filename="{module}""#),
                MODULE_CONTENT_TYPE,
            )
            .as_bytes(),
        );
        bytes.extend_from_slice(bundle);

        bytes.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Ok(EncodedBody {
            content_type: format!("multipart/form-data; boundary={boundary}"),
            bytes,
            boundary,
        })
    }
}

fn part_header(boundary: &str, first: bool, disposition: &str, content_type: &str) -> String {
    let lead = if first { "" } else { "\r\n" };
    format!(
        "{lead}--{boundary}\r\nContent-Disposition: form-data; {disposition}\r\nContent-Type: {content_type}\r\n\r\n"
    )
}

fn escape_quotes(s: &str) -> String {
    s.replace('\\', "\\\\").replace('"', "\\\"")
}

fn random_boundary() -> String {
    let mut raw = [0u8; BOUNDARY_BYTES];
    rand::rng().fill(&mut raw[..]);
    raw.iter().fold(String::with_capacity(BOUNDARY_BYTES * 2), |mut s, b| {
        let _ = write!(s, "{b:02x}");
        s
    })
}
