//! QR code artifacts
//!
//! Each authorization attempt gets one `<uuid-v4>.png` in the QR directory.
//! Every challenge refresh of that attempt overwrites the same file. What
//! happens to the file afterwards depends on [`QrRetentionMode`]:
//!
//! - `DeleteOnCompletion`: the [`QrArtifact`] removes its file when dropped,
//!   i.e. when the attempt ends either way.
//! - `KeepForTtl`: the file stays; [`QrStore::sweep_expired`] (run by the
//!   background sweeper) removes files older than the TTL.
//!
//! Only files named `<uuid-v4>.png` are ever removed.

use image::Luma;
use qrcode::QrCode;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tgbridge_common::config::QrRetentionMode;
use tgbridge_common::uuid_utils;
use tokio::task::JoinHandle;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::client::ClientError;

const QR_EXTENSION: &str = "png";
const QR_MIN_DIMENSION: u32 = 256;

/// Owner of the QR directory
#[derive(Debug, Clone)]
pub struct QrStore {
    dir: PathBuf,
    retention: QrRetentionMode,
    ttl: Duration,
}

impl QrStore {
    /// Create the QR directory (if needed) and return a store rooted there
    pub async fn init(
        dir: impl Into<PathBuf>,
        retention: QrRetentionMode,
        ttl: Duration,
    ) -> std::io::Result<Self> {
        let dir = dir.into();
        tokio::fs::create_dir_all(&dir).await?;
        debug!("QR directory ready: {}", dir.display());
        Ok(Self {
            dir,
            retention,
            ttl,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn retention(&self) -> QrRetentionMode {
        self.retention
    }

    /// Reserve a fresh file name for one authorization attempt
    ///
    /// Nothing is written until the first challenge arrives.
    pub fn allocate(&self) -> QrArtifact {
        QrArtifact {
            path: self.dir.join(uuid_utils::unique_file_name(QR_EXTENSION)),
            delete_on_drop: self.retention == QrRetentionMode::DeleteOnCompletion,
        }
    }

    /// Remove QR files older than the TTL, returning how many were removed
    pub async fn sweep_expired(&self) -> std::io::Result<usize> {
        let now = SystemTime::now();
        let mut removed = 0;
        let mut entries = tokio::fs::read_dir(&self.dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let file_name = entry.file_name();
            let Some(name) = file_name.to_str() else {
                continue;
            };
            if uuid_utils::parse_file_name(name, QR_EXTENSION).is_none() {
                continue;
            }

            let metadata = match entry.metadata().await {
                Ok(m) if m.is_file() => m,
                Ok(_) => continue,
                Err(e) => {
                    warn!("Cannot stat {}: {}", entry.path().display(), e);
                    continue;
                }
            };
            let age = metadata
                .modified()
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .unwrap_or_default();
            if age < self.ttl {
                continue;
            }

            match tokio::fs::remove_file(entry.path()).await {
                Ok(()) => removed += 1,
                // Already removed by its attempt
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove {}: {}", entry.path().display(), e),
            }
        }

        Ok(removed)
    }

    /// Run [`sweep_expired`](Self::sweep_expired) now and then every `every`
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut tick = interval(every);
            loop {
                tick.tick().await;
                match self.sweep_expired().await {
                    Ok(0) => {}
                    Ok(n) => info!("QR sweep removed {} expired file(s)", n),
                    Err(e) => warn!("QR sweep of {} failed: {}", self.dir.display(), e),
                }
            }
        })
    }
}

/// The QR image file of one authorization attempt
#[derive(Debug)]
pub struct QrArtifact {
    path: PathBuf,
    delete_on_drop: bool,
}

impl QrArtifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render `link` as a PNG QR code, replacing the previous image
    pub async fn write_challenge(&self, link: &str) -> Result<(), ClientError> {
        let path = self.path.clone();
        let link = link.to_owned();

        tokio::task::spawn_blocking(move || render_png(&link, &path))
            .await
            .map_err(|e| ClientError::QrRender(format!("render task failed: {e}")))?
    }
}

impl Drop for QrArtifact {
    fn drop(&mut self) {
        if !self.delete_on_drop {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!("Removed QR code {}", self.path.display()),
            // No challenge was ever written
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove QR code {}: {}", self.path.display(), e),
        }
    }
}

fn render_png(data: &str, path: &Path) -> Result<(), ClientError> {
    let code = QrCode::new(data.as_bytes()).map_err(|e| ClientError::QrRender(e.to_string()))?;
    let image = code
        .render::<Luma<u8>>()
        .min_dimensions(QR_MIN_DIMENSION, QR_MIN_DIMENSION)
        .build();
    image
        .save(path)
        .map_err(|e| ClientError::QrRender(format!("{}: {}", path.display(), e)))
}
