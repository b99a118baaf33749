//! Worker bundle acquisition.

use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{info, instrument};

use crate::config::WorkerConfig;
use crate::deploy::UploadError;

/// Where the bundle read by the upload step lives.
///
/// A downloaded bundle sits in a private temporary directory removed on drop.
#[derive(Debug)]
pub enum BundleSource {
    Local(PathBuf),
    Downloaded { dir: TempDir, path: PathBuf },
}

impl BundleSource {
    pub fn path(&self) -> &Path {
        match self {
            Self::Local(path) => path,
            Self::Downloaded { path, .. } => path,
        }
    }
}

/// Use the configured local bundle, or download `bundle_url`.
#[instrument(skip_all)]
pub async fn fetch_bundle(
    http: &reqwest::Client,
    config: &WorkerConfig,
) -> Result<BundleSource, UploadError> {
    if let Some(path) = &config.bundle_path {
        tokio::fs::metadata(path)
            .await
            .map_err(|source| UploadError::Bundle {
                path: path.clone(),
                source,
            })?;
        info!(path = %path.display(), "Using local worker bundle");
        return Ok(BundleSource::Local(path.clone()));
    }

    let url = &config.bundle_url;
    let download_err = |reason: String| UploadError::Download {
        url: url.clone(),
        reason,
    };

    info!(%url, "Downloading worker bundle");
    let response = http
        .get(url)
        .send()
        .await
        .map_err(|e| download_err(e.to_string()))?;
    let status = response.status();
    if !status.is_success() {
        return Err(download_err(format!("HTTP {}", status.as_u16())));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|e| download_err(e.to_string()))?;

    let dir = tempfile::Builder::new()
        .prefix(".bpb-wizard")
        .tempdir()
        .map_err(|source| UploadError::Bundle {
            path: std::env::temp_dir(),
            source,
        })?;
    let path = dir.path().join(&config.main_module);
    tokio::fs::write(&path, &bytes)
        .await
        .map_err(|source| UploadError::Bundle {
            path: path.clone(),
            source,
        })?;
    info!(path = %path.display(), bytes = bytes.len(), "Worker bundle downloaded");

    Ok(BundleSource::Downloaded { dir, path })
}
